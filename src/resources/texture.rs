//! Texture wrapper

use std::fmt;
use std::path::{Path, PathBuf};

use crate::cache::TextureRecord;
use crate::device::{RawHandle, ResourceKind, SamplerSettings, TextureFormat, TextureTarget};

use super::ContextRef;

/// Logical role a texture plays in a material.
///
/// Purely descriptive metadata: changing it on one wrapper copy does not
/// affect other copies or the cached original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRole {
    BaseColor,
    Normal,
    MetallicRoughness,
    Occlusion,
    Emissive,
    Height,
    Generic,
}

/// Shared-ownership wrapper around one GPU texture.
///
/// Cloning aliases the same GPU object and increments its reference count;
/// the last wrapper to drop frees it and evicts any cache entry for it.
pub struct Texture {
    ctx: ContextRef,
    handle: RawHandle,
    target: TextureTarget,
    format: TextureFormat,
    width: u32,
    height: u32,
    samples: u32,
    sampler: SamplerSettings,
    source: Option<PathBuf>,
    flip_y: bool,
    srgb: bool,
    role: TextureRole,
    unit: u32,
}

impl Texture {
    pub const KIND: ResourceKind = ResourceKind::Texture;

    /// Mint a wrapper from a cache record, incrementing the handle's count.
    pub(crate) fn from_record(ctx: ContextRef, record: &TextureRecord) -> Self {
        ctx.retain(Self::KIND, record.handle);
        Self {
            ctx,
            handle: record.handle,
            target: record.target,
            format: record.format,
            width: record.width,
            height: record.height,
            samples: record.samples,
            sampler: record.sampler,
            source: record.source.clone(),
            flip_y: record.flip_y,
            srgb: record.srgb,
            role: record.role,
            unit: 0,
        }
    }

    /// Snapshot of this texture's identity-independent state, used as the
    /// cache-resident blueprint. Does not hold a reference count.
    pub(crate) fn to_record(&self) -> TextureRecord {
        TextureRecord {
            handle: self.handle,
            target: self.target,
            format: self.format,
            width: self.width,
            height: self.height,
            samples: self.samples,
            sampler: self.sampler,
            source: self.source.clone(),
            flip_y: self.flip_y,
            srgb: self.srgb,
            role: self.role,
        }
    }

    pub fn handle(&self) -> RawHandle {
        self.handle
    }

    pub fn target(&self) -> TextureTarget {
        self.target
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn sampler(&self) -> &SamplerSettings {
        &self.sampler
    }

    /// Path the texture was loaded from, if it came from disk.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn flip_y(&self) -> bool {
        self.flip_y
    }

    pub fn srgb(&self) -> bool {
        self.srgb
    }

    pub fn role(&self) -> TextureRole {
        self.role
    }

    /// Change the logical role on this copy only.
    pub fn set_role(&mut self, role: TextureRole) {
        self.role = role;
    }

    pub fn unit(&self) -> u32 {
        self.unit
    }

    /// Change the texture unit on this copy only.
    pub fn set_unit(&mut self, unit: u32) {
        self.unit = unit;
    }
}

impl Clone for Texture {
    fn clone(&self) -> Self {
        self.ctx.retain(Self::KIND, self.handle);
        Self {
            ctx: ContextRef::clone(&self.ctx),
            handle: self.handle,
            target: self.target,
            format: self.format,
            width: self.width,
            height: self.height,
            samples: self.samples,
            sampler: self.sampler,
            source: self.source.clone(),
            flip_y: self.flip_y,
            srgb: self.srgb,
            role: self.role,
            unit: self.unit,
        }
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.ctx.release_resource(Self::KIND, self.handle);
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("handle", &self.handle)
            .field("target", &self.target)
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("source", &self.source)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}
