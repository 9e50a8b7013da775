//! Resource cache
//!
//! Deduplicates expensive loads by logical identity: shader programs by
//! source paths, textures and cubemaps by file name plus load flags, models
//! by canonical path plus flags. At most one entry exists per identity key.
//!
//! Entries are non-owning blueprints: a raw handle plus the metadata needed
//! to mint a fresh wrapper on a hit. They do not contribute to a handle's
//! reference count; eviction is driven exclusively by the release path, when
//! a handle's count reaches zero.
//!
//! Texture and cubemap identity matches on file name only by default, so two
//! directories holding identically named files with identical flags share
//! one cached resource. This is a known, deliberate limitation of the
//! matching rule; `ContextConfig::path_qualified_cache` switches the keys to
//! full canonical paths.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::device::{
    RawHandle, ResourceKind, SamplerSettings, TextureFormat, TextureTarget,
};
use crate::resources::TextureRole;

/// Cache-resident blueprint of a texture.
#[derive(Debug, Clone)]
pub(crate) struct TextureRecord {
    pub handle: RawHandle,
    pub target: TextureTarget,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub sampler: SamplerSettings,
    pub source: Option<PathBuf>,
    pub flip_y: bool,
    pub srgb: bool,
    pub role: TextureRole,
}

/// Cache-resident blueprint of a shader program.
#[derive(Debug, Clone)]
pub(crate) struct ShaderRecord {
    pub handle: RawHandle,
    pub vertex: PathBuf,
    pub fragment: PathBuf,
    pub geometry: Option<PathBuf>,
}

/// Cache-resident blueprint of one uploaded mesh buffer set.
#[derive(Debug, Clone)]
pub(crate) struct MeshRecord {
    pub handle: RawHandle,
    pub name: String,
    pub vertex_count: u32,
    pub index_count: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct ModelMeshRecord {
    pub mesh: MeshRecord,
    pub textures: Vec<TextureRecord>,
}

/// Cache-resident blueprint of a whole model aggregate.
#[derive(Debug, Clone)]
pub(crate) struct ModelRecord {
    pub source: PathBuf,
    pub meshes: Vec<ModelMeshRecord>,
}

impl ModelRecord {
    /// Whether the aggregate references a handle of the given kind.
    fn references(&self, kind: ResourceKind, handle: RawHandle) -> bool {
        match kind {
            ResourceKind::MeshBuffers => self.meshes.iter().any(|m| m.mesh.handle == handle),
            ResourceKind::Texture => self
                .meshes
                .iter()
                .any(|m| m.textures.iter().any(|t| t.handle == handle)),
            _ => false,
        }
    }
}

/// Identity key for a 2D texture load.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct TextureKey {
    name: String,
    flip_y: bool,
    srgb: bool,
}

impl TextureKey {
    pub(crate) fn new(resolved: &Path, flip_y: bool, srgb: bool, path_qualified: bool) -> Self {
        Self {
            name: key_name(resolved, path_qualified),
            flip_y,
            srgb,
        }
    }
}

/// Identity key for a cubemap load: the ordered six face names plus flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CubemapKey {
    faces: [String; 6],
    flip_y: bool,
    srgb: bool,
}

impl CubemapKey {
    pub(crate) fn new(resolved: &[PathBuf; 6], flip_y: bool, srgb: bool, path_qualified: bool) -> Self {
        Self {
            faces: std::array::from_fn(|i| key_name(&resolved[i], path_qualified)),
            flip_y,
            srgb,
        }
    }
}

/// Identity key for a shader program: the tuple of source paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ShaderKey {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
    pub geometry: Option<PathBuf>,
}

/// Identity key for a model: canonical path plus load flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ModelKey {
    pub path: PathBuf,
    pub flip_y: bool,
    pub srgb: bool,
}

fn key_name(resolved: &Path, path_qualified: bool) -> String {
    if path_qualified {
        resolved.display().to_string()
    } else {
        resolved
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| resolved.display().to_string())
    }
}

/// All cache tables of one context.
#[derive(Default)]
pub(crate) struct CacheTables {
    textures: HashMap<TextureKey, TextureRecord>,
    cubemaps: HashMap<CubemapKey, TextureRecord>,
    shaders: HashMap<ShaderKey, ShaderRecord>,
    models: HashMap<ModelKey, ModelRecord>,
}

impl CacheTables {
    pub(crate) fn texture(&self, key: &TextureKey) -> Option<&TextureRecord> {
        self.textures.get(key)
    }

    pub(crate) fn insert_texture(&mut self, key: TextureKey, record: TextureRecord) {
        self.textures.insert(key, record);
    }

    pub(crate) fn cubemap(&self, key: &CubemapKey) -> Option<&TextureRecord> {
        self.cubemaps.get(key)
    }

    pub(crate) fn insert_cubemap(&mut self, key: CubemapKey, record: TextureRecord) {
        self.cubemaps.insert(key, record);
    }

    pub(crate) fn shader(&self, key: &ShaderKey) -> Option<&ShaderRecord> {
        self.shaders.get(key)
    }

    pub(crate) fn insert_shader(&mut self, key: ShaderKey, record: ShaderRecord) {
        self.shaders.insert(key, record);
    }

    pub(crate) fn model(&self, key: &ModelKey) -> Option<&ModelRecord> {
        self.models.get(key)
    }

    pub(crate) fn insert_model(&mut self, key: ModelKey, record: ModelRecord) {
        self.models.insert(key, record);
    }

    /// Remove every entry whose blueprint owns this exact handle.
    ///
    /// Called from the release path when a handle's count reaches zero. For
    /// mesh handles the enclosing model aggregate is the addressable unit, so
    /// the whole aggregate goes; the same applies to a model whose material
    /// texture dies, which prevents a later hit from minting a freed handle.
    pub(crate) fn evict_for_handle(&mut self, kind: ResourceKind, handle: RawHandle) {
        match kind {
            ResourceKind::Texture => {
                self.textures.retain(|key, record| {
                    let keep = record.handle != handle;
                    if !keep {
                        log::debug!("evicting texture cache entry {key:?}");
                    }
                    keep
                });
                self.cubemaps.retain(|key, record| {
                    let keep = record.handle != handle;
                    if !keep {
                        log::debug!("evicting cubemap cache entry {key:?}");
                    }
                    keep
                });
                self.evict_models_referencing(kind, handle);
            }
            ResourceKind::ShaderProgram => {
                self.shaders.retain(|key, record| {
                    let keep = record.handle != handle;
                    if !keep {
                        log::debug!("evicting shader cache entry {key:?}");
                    }
                    keep
                });
            }
            ResourceKind::MeshBuffers => {
                self.evict_models_referencing(kind, handle);
            }
            // Render targets, render buffers, and uniform buffers are never
            // cached.
            _ => {}
        }
    }

    fn evict_models_referencing(&mut self, kind: ResourceKind, handle: RawHandle) {
        self.models.retain(|key, record| {
            let keep = !record.references(kind, handle);
            if !keep {
                log::debug!("evicting model cache entry {}", key.path.display());
            }
            keep
        });
    }

    pub(crate) fn clear(&mut self) {
        self.textures.clear();
        self.cubemaps.clear();
        self.shaders.clear();
        self.models.clear();
    }

    /// (textures, cubemaps, shaders, models) entry counts, for diagnostics.
    pub(crate) fn entry_counts(&self) -> (usize, usize, usize, usize) {
        (
            self.textures.len(),
            self.cubemaps.len(),
            self.shaders.len(),
            self.models.len(),
        )
    }
}
