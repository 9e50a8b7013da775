//! Crate-wide error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::device::DeviceError;
use crate::layout::FieldType;

/// Error type covering resource loading, caching, and GPU object creation.
#[derive(Error, Debug)]
pub enum FirethornError {
    /// An asset path could not be resolved against any configured root.
    #[error("asset not found: {}", path.display())]
    AssetNotFound { path: PathBuf },

    /// Reading a file from disk failed after the path resolved.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An image file could not be decoded.
    #[error("failed to decode image {}: {reason}", path.display())]
    ImageDecode { path: PathBuf, reason: String },

    /// The decoded image has a channel count the engine cannot upload.
    #[error("unsupported channel count {channels} in {}", path.display())]
    UnsupportedChannelCount { path: PathBuf, channels: u8 },

    /// Cube map faces disagree on dimensions or channel count.
    #[error("cube map face {} is {got}, expected {expected}", path.display())]
    CubeFaceMismatch {
        path: PathBuf,
        expected: String,
        got: String,
    },

    /// A model file could not be parsed.
    #[error("failed to parse model {}: {reason}", path.display())]
    ModelParse { path: PathBuf, reason: String },

    /// A uniform name was set that the buffer never declared.
    #[error("unknown uniform '{name}' in block '{block}'")]
    UnknownUniform { block: String, name: String },

    /// A uniform value does not match the declared field type.
    #[error("uniform '{name}' is declared {expected:?}, value is {got}")]
    UniformTypeMismatch {
        name: String,
        expected: FieldType,
        got: &'static str,
    },

    /// A render target failed its completeness check after attachment.
    #[error("render target incomplete: {reason}")]
    IncompleteRenderTarget { reason: String },

    /// A driver diagnostic escalated to a hard failure.
    #[error("driver diagnostic: {message}")]
    DriverDiagnostic { message: String },

    /// Failure reported by the graphics device.
    #[error(transparent)]
    Device(#[from] DeviceError),
}

pub type Result<T> = std::result::Result<T, FirethornError>;
