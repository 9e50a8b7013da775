//! Render buffer wrapper

use std::fmt;

use crate::device::{RawHandle, ResourceKind, TextureFormat};

use super::ContextRef;

/// Shared-ownership wrapper around one render buffer: write-only attachment
/// storage that can never be sampled.
pub struct RenderBuffer {
    ctx: ContextRef,
    handle: RawHandle,
    width: u32,
    height: u32,
    format: TextureFormat,
    samples: u32,
}

impl RenderBuffer {
    pub const KIND: ResourceKind = ResourceKind::RenderBuffer;

    /// Take ownership of a freshly allocated render buffer handle.
    pub(crate) fn adopt(
        ctx: ContextRef,
        handle: RawHandle,
        width: u32,
        height: u32,
        format: TextureFormat,
        samples: u32,
    ) -> Self {
        ctx.retain(Self::KIND, handle);
        Self {
            ctx,
            handle,
            width,
            height,
            format,
            samples,
        }
    }

    pub fn handle(&self) -> RawHandle {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }
}

impl Clone for RenderBuffer {
    fn clone(&self) -> Self {
        self.ctx.retain(Self::KIND, self.handle);
        Self {
            ctx: ContextRef::clone(&self.ctx),
            handle: self.handle,
            width: self.width,
            height: self.height,
            format: self.format,
            samples: self.samples,
        }
    }
}

impl Drop for RenderBuffer {
    fn drop(&mut self) {
        self.ctx.release_resource(Self::KIND, self.handle);
    }
}

impl fmt::Debug for RenderBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderBuffer")
            .field("handle", &self.handle)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("samples", &self.samples)
            .finish_non_exhaustive()
    }
}
