//! Model aggregate
//!
//! A model owns a set of uploaded meshes plus the textures its materials
//! reference. The meshes are the cache-addressable unit: when the last owner
//! of any of its mesh buffers goes away, the whole cached aggregate is
//! evicted.

use std::path::{Path, PathBuf};

use crate::cache::ModelRecord;

use super::{ContextRef, MeshBuffers, Texture};

/// One mesh of a model with the textures its material references.
#[derive(Debug, Clone)]
pub struct ModelMesh {
    pub name: String,
    pub buffers: MeshBuffers,
    pub textures: Vec<Texture>,
}

/// A loaded model: meshes plus material textures, all tracked by the same
/// reference-count table as directly loaded resources.
#[derive(Debug, Clone)]
pub struct Model {
    source: PathBuf,
    pub meshes: Vec<ModelMesh>,
}

impl Model {
    pub(crate) fn new(source: PathBuf, meshes: Vec<ModelMesh>) -> Self {
        Self { source, meshes }
    }

    /// Mint a model from a cached aggregate, incrementing every mesh and
    /// texture handle it references.
    pub(crate) fn from_record(ctx: &ContextRef, record: &ModelRecord) -> Self {
        let meshes = record
            .meshes
            .iter()
            .map(|m| ModelMesh {
                name: m.mesh.name.clone(),
                buffers: MeshBuffers::from_record(ContextRef::clone(ctx), &m.mesh),
                textures: m
                    .textures
                    .iter()
                    .map(|t| Texture::from_record(ContextRef::clone(ctx), t))
                    .collect(),
            })
            .collect();
        Self {
            source: record.source.clone(),
            meshes,
        }
    }

    /// Canonical path the model was loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Total triangle count across all meshes.
    pub fn triangle_count(&self) -> u32 {
        self.meshes.iter().map(|m| m.buffers.triangle_count()).sum()
    }
}
