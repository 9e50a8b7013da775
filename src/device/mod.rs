//! Graphics device abstraction
//!
//! The [`GraphicsDevice`] trait is the boundary to the driver binding: it
//! allocates, uploads to, and frees the six GPU object kinds by opaque
//! integer handle. The engine core never talks to a graphics API directly;
//! everything goes through this trait.

pub mod headless;

pub use headless::{DeviceStats, HeadlessDevice};

use thiserror::Error;

/// Device error type
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("failed to create {kind}: {reason}")]
    CreationFailed { kind: ResourceKind, reason: String },
    #[error("shader compilation failed for '{label}': {reason}")]
    ShaderCompilation { label: String, reason: String },
    #[error("upload size mismatch for '{label}': expected {expected} bytes, got {actual}")]
    UploadSizeMismatch {
        label: String,
        expected: u64,
        actual: u64,
    },
    #[error("write past end of buffer {handle:?}: offset {offset} + {len} > size {size}")]
    WriteOutOfBounds {
        handle: RawHandle,
        offset: u64,
        len: u64,
        size: u64,
    },
    #[error("unknown handle {handle:?} for kind {kind}")]
    UnknownHandle { kind: ResourceKind, handle: RawHandle },
    #[error("out of memory")]
    OutOfMemory,
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Opaque identifier for one live GPU object of a given kind.
///
/// Zero is the sentinel "no object". A handle is unique within its kind for
/// as long as it is live; kinds never share a numeric namespace, and devices
/// never reuse a handle value after it is freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(pub(crate) u64);

impl RawHandle {
    /// Sentinel value meaning "no object".
    pub const NONE: Self = Self(0);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// Numeric value, for diagnostics.
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Resource category a handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Texture,
    RenderBuffer,
    RenderTarget,
    ShaderProgram,
    UniformBuffer,
    MeshBuffers,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Texture,
        ResourceKind::RenderBuffer,
        ResourceKind::RenderTarget,
        ResourceKind::ShaderProgram,
        ResourceKind::UniformBuffer,
        ResourceKind::MeshBuffers,
    ];

    pub(crate) fn index(&self) -> usize {
        match self {
            ResourceKind::Texture => 0,
            ResourceKind::RenderBuffer => 1,
            ResourceKind::RenderTarget => 2,
            ResourceKind::ShaderProgram => 3,
            ResourceKind::UniformBuffer => 4,
            ResourceKind::MeshBuffers => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Texture => "texture",
            ResourceKind::RenderBuffer => "render buffer",
            ResourceKind::RenderTarget => "render target",
            ResourceKind::ShaderProgram => "shader program",
            ResourceKind::UniformBuffer => "uniform buffer",
            ResourceKind::MeshBuffers => "mesh buffers",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8Unorm,
    Rgb8Unorm,
    Rgba8Unorm,
    Rgb8Srgb,
    Rgba8Srgb,
    Rgba16Float,
    Depth32Float,
    Depth24PlusStencil8,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth32Float | TextureFormat::Depth24PlusStencil8
        )
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8Unorm => 1,
            TextureFormat::Rgb8Unorm | TextureFormat::Rgb8Srgb => 3,
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8Srgb
            | TextureFormat::Depth32Float
            | TextureFormat::Depth24PlusStencil8 => 4,
            TextureFormat::Rgba16Float => 8,
        }
    }
}

/// Texture shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    Flat2D,
    Cube,
}

/// Filter mode for samplers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Address mode for samplers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    ClampToEdge,
    ClampToBorder,
    Repeat,
    MirrorRepeat,
}

/// Compare function for depth samplers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Sampler state carried by a texture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerSettings {
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub compare: Option<CompareFunction>,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            compare: None,
        }
    }
}

impl SamplerSettings {
    /// Settings for depth textures sampled with a comparison (shadow maps).
    pub fn depth_compare() -> Self {
        Self {
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            address_mode_u: AddressMode::ClampToBorder,
            address_mode_v: AddressMode::ClampToBorder,
            compare: Some(CompareFunction::LessEqual),
        }
    }
}

/// Texture descriptor
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub target: TextureTarget,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    /// Sample count; values above one are only valid for render storage.
    pub samples: u32,
    /// Whether the texture may be attached to a render target.
    pub render_attachment: bool,
    pub sampler: SamplerSettings,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            target: TextureTarget::Flat2D,
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8Unorm,
            samples: 1,
            render_attachment: false,
            sampler: SamplerSettings::default(),
        }
    }
}

/// Render buffer descriptor
#[derive(Debug, Clone)]
pub struct RenderBufferDescriptor {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub samples: u32,
}

/// Shader program sources, already read from disk.
#[derive(Debug, Clone)]
pub struct ShaderSources {
    pub label: String,
    pub vertex: String,
    pub fragment: String,
    pub geometry: Option<String>,
}

/// Mesh buffer set descriptor; vertex and index bytes travel separately.
#[derive(Debug, Clone)]
pub struct MeshBufferDescriptor {
    pub label: Option<String>,
    pub vertex_count: u32,
    pub index_count: u32,
    pub vertex_stride: u64,
}

/// Attachment point of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentPoint {
    Color,
    Depth,
    DepthStencil,
}

/// Storage bound to an attachment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentRef {
    Texture(RawHandle),
    /// One face of a cube texture (0..6).
    CubeFace(RawHandle, u8),
    RenderBuffer(RawHandle),
}

/// Result of a render target completeness query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTargetStatus {
    Complete,
    Incomplete(String),
}

/// Severity of a queued driver diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Warning,
    Error,
}

/// Message reported by the driver outside the normal error path.
#[derive(Debug, Clone)]
pub struct DriverDiagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
}

/// Driver binding for the six GPU object kinds.
///
/// Implementations allocate fresh, never-reused handles per kind and free
/// exactly what they allocated. All calls are synchronous; creation either
/// returns a usable handle or an error, never a partial object.
pub trait GraphicsDevice: Send {
    /// Create a 2D texture and upload `data` (tightly packed rows).
    fn create_texture(&mut self, desc: &TextureDescriptor, data: &[u8]) -> DeviceResult<RawHandle>;

    /// Create a cube texture from six equally sized faces.
    fn create_cubemap(
        &mut self,
        desc: &TextureDescriptor,
        faces: &[Vec<u8>; 6],
    ) -> DeviceResult<RawHandle>;

    /// Create a texture with render storage and no initial data.
    fn create_attachment_texture(&mut self, desc: &TextureDescriptor) -> DeviceResult<RawHandle>;

    /// Create a render buffer (write-only attachment storage).
    fn create_render_buffer(&mut self, desc: &RenderBufferDescriptor) -> DeviceResult<RawHandle>;

    /// Create an empty render target.
    fn create_render_target(&mut self, label: Option<&str>) -> DeviceResult<RawHandle>;

    /// Bind storage to an attachment point, replacing what was there.
    fn attach(
        &mut self,
        target: RawHandle,
        point: AttachmentPoint,
        storage: AttachmentRef,
    ) -> DeviceResult<()>;

    /// Query completeness of a render target after attachment.
    fn render_target_status(&mut self, target: RawHandle) -> RenderTargetStatus;

    /// Compile and link a shader program.
    fn create_shader_program(&mut self, sources: &ShaderSources) -> DeviceResult<RawHandle>;

    /// Allocate a uniform buffer of `size` bytes.
    fn create_uniform_buffer(&mut self, label: Option<&str>, size: u64) -> DeviceResult<RawHandle>;

    /// Write bytes into a uniform buffer at a byte offset.
    fn write_uniform_buffer(
        &mut self,
        buffer: RawHandle,
        offset: u64,
        data: &[u8],
    ) -> DeviceResult<()>;

    /// Bind a uniform buffer to a numbered slot.
    fn bind_uniform_slot(&mut self, buffer: RawHandle, slot: u32);

    /// Upload a vertex/index buffer pair as one mesh buffer set.
    fn create_mesh_buffers(
        &mut self,
        desc: &MeshBufferDescriptor,
        vertices: &[u8],
        indices: &[u8],
    ) -> DeviceResult<RawHandle>;

    /// Free one GPU object. Freeing an already-freed or unknown handle is
    /// reported through diagnostics, not a panic.
    fn destroy(&mut self, kind: ResourceKind, handle: RawHandle);

    /// Drain queued driver diagnostics (warnings the driver reported outside
    /// the error path). Default: none.
    fn drain_diagnostics(&mut self) -> Vec<DriverDiagnostic> {
        Vec::new()
    }
}
