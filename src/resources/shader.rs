//! Shader program wrapper

use std::fmt;
use std::path::{Path, PathBuf};

use crate::cache::ShaderRecord;
use crate::device::{RawHandle, ResourceKind};

use super::ContextRef;

/// Shared-ownership wrapper around one linked shader program.
pub struct ShaderProgram {
    ctx: ContextRef,
    handle: RawHandle,
    vertex_path: PathBuf,
    fragment_path: PathBuf,
    geometry_path: Option<PathBuf>,
}

impl ShaderProgram {
    pub const KIND: ResourceKind = ResourceKind::ShaderProgram;

    pub(crate) fn from_record(ctx: ContextRef, record: &ShaderRecord) -> Self {
        ctx.retain(Self::KIND, record.handle);
        Self {
            ctx,
            handle: record.handle,
            vertex_path: record.vertex.clone(),
            fragment_path: record.fragment.clone(),
            geometry_path: record.geometry.clone(),
        }
    }

    pub fn handle(&self) -> RawHandle {
        self.handle
    }

    pub fn vertex_path(&self) -> &Path {
        &self.vertex_path
    }

    pub fn fragment_path(&self) -> &Path {
        &self.fragment_path
    }

    pub fn geometry_path(&self) -> Option<&Path> {
        self.geometry_path.as_deref()
    }
}

impl Clone for ShaderProgram {
    fn clone(&self) -> Self {
        self.ctx.retain(Self::KIND, self.handle);
        Self {
            ctx: ContextRef::clone(&self.ctx),
            handle: self.handle,
            vertex_path: self.vertex_path.clone(),
            fragment_path: self.fragment_path.clone(),
            geometry_path: self.geometry_path.clone(),
        }
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.ctx.release_resource(Self::KIND, self.handle);
    }
}

impl fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("handle", &self.handle)
            .field("vertex", &self.vertex_path)
            .field("fragment", &self.fragment_path)
            .field("geometry", &self.geometry_path)
            .finish_non_exhaustive()
    }
}
