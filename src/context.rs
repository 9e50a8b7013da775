//! Render context
//!
//! [`RenderContext`] is the explicit owner of the shared resource state: the
//! graphics device, the per-kind reference-count registry, and the resource
//! cache. Every wrapper holds a reference back to it, so multiple contexts
//! can coexist (one per test, for instance) without sharing any state.
//!
//! All operations are synchronous and expected to run on the thread that
//! owns the graphics context; the internal mutexes exist to keep each
//! compound operation atomic, not to enable parallel loading.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::assets;
use crate::cache::{
    CacheTables, CubemapKey, MeshRecord, ModelKey, ModelMeshRecord, ModelRecord, ShaderKey,
    ShaderRecord, TextureKey, TextureRecord,
};
use crate::device::{
    DeviceStats, DiagnosticSeverity, GraphicsDevice, HeadlessDevice, MeshBufferDescriptor,
    RawHandle, ResourceKind, SamplerSettings, TextureDescriptor, TextureFormat, TextureTarget,
};
use crate::error::{FirethornError, Result};
use crate::layout::{FieldType, Std140Layout};
use crate::registry::{HandleRegistry, ReleaseOutcome};
use crate::resources::{
    self, MeshBuffers, MeshData, Model, ModelMesh, RenderTarget, RenderTargetKind, ShaderProgram,
    Texture, TextureRole, UniformBuffer, UniformField, Vertex,
};

/// Context configuration
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Label used in log output.
    pub label: String,
    /// Roots tried in order when resolving relative asset paths.
    pub asset_roots: Vec<PathBuf>,
    /// Key textures and cubemaps by full canonical path instead of file
    /// name. Off by default: the file-name rule means identically named
    /// files in different directories alias one cached resource.
    pub path_qualified_cache: bool,
    /// Downgrade driver warnings to log output instead of failing the
    /// operation that produced them.
    pub lenient_driver_diagnostics: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            label: "firethorn".to_string(),
            asset_roots: vec![PathBuf::from(".")],
            path_qualified_cache: false,
            lenient_driver_diagnostics: false,
        }
    }
}

/// Shared internals reachable from every wrapper.
pub(crate) struct ContextShared {
    config: ContextConfig,
    device: Mutex<Box<dyn GraphicsDevice>>,
    registry: Mutex<HandleRegistry>,
    cache: Mutex<CacheTables>,
}

impl ContextShared {
    /// Increment the count for a handle.
    pub(crate) fn retain(&self, kind: ResourceKind, handle: RawHandle) {
        self.registry.lock().retain(kind, handle);
    }

    /// Decrement the count for a handle; on the last release, evict any
    /// cache entry owning it and free the GPU object. The increment side of
    /// an overwrite must already have happened by the time this runs.
    pub(crate) fn release_resource(&self, kind: ResourceKind, handle: RawHandle) {
        if handle.is_none() {
            return;
        }
        let outcome = self.registry.lock().release(kind, handle);
        if outcome == ReleaseOutcome::LastOwner {
            self.cache.lock().evict_for_handle(kind, handle);
            self.device.lock().destroy(kind, handle);
        }
    }

    /// Run a closure against the device.
    pub(crate) fn with_device<R>(&self, f: impl FnOnce(&mut dyn GraphicsDevice) -> R) -> R {
        let mut guard = self.device.lock();
        f(guard.as_mut())
    }

    /// Drain driver diagnostics queued by the last device calls. Warnings
    /// fail the current operation unless the context is configured lenient;
    /// errors always fail.
    pub(crate) fn check_diagnostics(&self) -> Result<()> {
        let diagnostics = self.device.lock().drain_diagnostics();
        let mut failure = None;
        for diagnostic in diagnostics {
            match diagnostic.severity {
                DiagnosticSeverity::Error => {
                    log::error!("[{}] driver: {}", self.config.label, diagnostic.message);
                    failure.get_or_insert(diagnostic.message);
                }
                DiagnosticSeverity::Warning if self.config.lenient_driver_diagnostics => {
                    log::warn!("[{}] driver: {}", self.config.label, diagnostic.message);
                }
                DiagnosticSeverity::Warning => {
                    log::warn!("[{}] driver: {}", self.config.label, diagnostic.message);
                    failure.get_or_insert(diagnostic.message);
                }
            }
        }
        match failure {
            Some(message) => Err(FirethornError::DriverDiagnostic { message }),
            None => Ok(()),
        }
    }
}

impl Drop for ContextShared {
    fn drop(&mut self) {
        // Runs after the last wrapper is gone; anything still tracked was
        // leaked (e.g. mem::forget) and gets force-freed.
        let leaked = self.registry.get_mut().drain_all();
        if !leaked.is_empty() {
            log::warn!(
                "[{}] force-freeing {} leaked GPU object(s) at teardown",
                self.config.label,
                leaked.len()
            );
        }
        self.cache.get_mut().clear();
        let device = self.device.get_mut();
        for (kind, handle) in leaked {
            device.destroy(kind, handle);
        }
    }
}

/// Handle to one resource-management session.
///
/// Cheap to clone; clones share the device, registry, and cache. Dropping
/// the last handle (after the last wrapper) tears the session down and
/// force-frees anything still allocated.
#[derive(Clone)]
pub struct RenderContext {
    shared: Arc<ContextShared>,
}

impl RenderContext {
    /// Create a context around a graphics device.
    pub fn new(device: Box<dyn GraphicsDevice>, config: ContextConfig) -> Self {
        log::debug!("[{}] context created", config.label);
        Self {
            shared: Arc::new(ContextShared {
                config,
                device: Mutex::new(device),
                registry: Mutex::new(HandleRegistry::new()),
                cache: Mutex::new(CacheTables::default()),
            }),
        }
    }

    /// Create a context backed by the headless device, returning the device
    /// statistics handle alongside it.
    pub fn headless(config: ContextConfig) -> (Self, DeviceStats) {
        let device = HeadlessDevice::new();
        let stats = device.stats();
        (Self::new(Box::new(device), config), stats)
    }

    pub fn config(&self) -> &ContextConfig {
        &self.shared.config
    }

    // ========================================================================
    // Cached loads
    // ========================================================================

    /// Load a 2D texture, or return the cached one for the same identity
    /// (file name plus flags by default).
    pub fn load_texture(
        &self,
        path: impl AsRef<Path>,
        role: TextureRole,
        flip_y: bool,
        srgb: bool,
    ) -> Result<Texture> {
        let resolved = assets::resolve_path(&self.shared.config.asset_roots, path.as_ref())?;
        let key = TextureKey::new(&resolved, flip_y, srgb, self.shared.config.path_qualified_cache);

        let cached = self.shared.cache.lock().texture(&key).cloned();
        if let Some(record) = cached {
            log::debug!("texture cache hit: {}", resolved.display());
            let mut texture = Texture::from_record(Arc::clone(&self.shared), &record);
            texture.set_role(role);
            return Ok(texture);
        }

        let img = assets::load_image(&resolved, flip_y)?;
        let desc = TextureDescriptor {
            label: Some(resolved.display().to_string()),
            target: TextureTarget::Flat2D,
            width: img.width,
            height: img.height,
            format: assets::format_for_channels(img.channels, srgb),
            samples: 1,
            render_attachment: false,
            sampler: SamplerSettings::default(),
        };
        let handle = self
            .shared
            .with_device(|device| device.create_texture(&desc, &img.data))?;

        let record = TextureRecord {
            handle,
            target: TextureTarget::Flat2D,
            format: desc.format,
            width: img.width,
            height: img.height,
            samples: 1,
            sampler: desc.sampler,
            source: Some(resolved.clone()),
            flip_y,
            srgb,
            role,
        };
        let texture = Texture::from_record(Arc::clone(&self.shared), &record);
        self.shared.check_diagnostics()?;
        self.shared.cache.lock().insert_texture(key, record);
        log::debug!("texture loaded: {} -> {:?}", resolved.display(), handle);
        Ok(texture)
    }

    /// Load a cubemap from six face files, or return the cached one for the
    /// same ordered faces plus flags.
    pub fn load_cubemap(
        &self,
        faces: [impl AsRef<Path>; 6],
        flip_y: bool,
        srgb: bool,
    ) -> Result<Texture> {
        let roots = &self.shared.config.asset_roots;
        let mut resolved: [PathBuf; 6] = Default::default();
        for (slot, face) in resolved.iter_mut().zip(faces.iter()) {
            *slot = assets::resolve_path(roots, face.as_ref())?;
        }
        let key = CubemapKey::new(&resolved, flip_y, srgb, self.shared.config.path_qualified_cache);

        let cached = self.shared.cache.lock().cubemap(&key).cloned();
        if let Some(record) = cached {
            log::debug!("cubemap cache hit: {}", resolved[0].display());
            return Ok(Texture::from_record(Arc::clone(&self.shared), &record));
        }

        let first = assets::load_image(&resolved[0], flip_y)?;
        let mut face_data: [Vec<u8>; 6] = Default::default();
        face_data[0] = first.data;
        for i in 1..6 {
            let img = assets::load_image(&resolved[i], flip_y)?;
            if (img.width, img.height, img.channels) != (first.width, first.height, first.channels)
            {
                return Err(FirethornError::CubeFaceMismatch {
                    path: resolved[i].clone(),
                    expected: format!(
                        "{}x{} with {} channels",
                        first.width, first.height, first.channels
                    ),
                    got: format!("{}x{} with {} channels", img.width, img.height, img.channels),
                });
            }
            face_data[i] = img.data;
        }

        let desc = TextureDescriptor {
            label: Some(resolved[0].display().to_string()),
            target: TextureTarget::Cube,
            width: first.width,
            height: first.height,
            format: assets::format_for_channels(first.channels, srgb),
            samples: 1,
            render_attachment: false,
            sampler: SamplerSettings {
                address_mode_u: crate::device::AddressMode::ClampToEdge,
                address_mode_v: crate::device::AddressMode::ClampToEdge,
                ..SamplerSettings::default()
            },
        };
        let handle = self
            .shared
            .with_device(|device| device.create_cubemap(&desc, &face_data))?;

        let record = TextureRecord {
            handle,
            target: TextureTarget::Cube,
            format: desc.format,
            width: first.width,
            height: first.height,
            samples: 1,
            sampler: desc.sampler,
            source: Some(resolved[0].clone()),
            flip_y,
            srgb,
            role: TextureRole::Generic,
        };
        let texture = Texture::from_record(Arc::clone(&self.shared), &record);
        self.shared.check_diagnostics()?;
        self.shared.cache.lock().insert_cubemap(key, record);
        log::debug!("cubemap loaded: {} -> {:?}", resolved[0].display(), handle);
        Ok(texture)
    }

    /// Load and link a shader program, or return the cached one for the same
    /// source path tuple.
    pub fn load_shader(
        &self,
        vertex: impl AsRef<Path>,
        fragment: impl AsRef<Path>,
        geometry: Option<impl AsRef<Path>>,
    ) -> Result<ShaderProgram> {
        let roots = &self.shared.config.asset_roots;
        let vertex = assets::resolve_path(roots, vertex.as_ref())?;
        let fragment = assets::resolve_path(roots, fragment.as_ref())?;
        let geometry = geometry
            .map(|g| assets::resolve_path(roots, g.as_ref()))
            .transpose()?;
        let key = ShaderKey {
            vertex: vertex.clone(),
            fragment: fragment.clone(),
            geometry: geometry.clone(),
        };

        let cached = self.shared.cache.lock().shader(&key).cloned();
        if let Some(record) = cached {
            log::debug!("shader cache hit: {}", vertex.display());
            return Ok(ShaderProgram::from_record(Arc::clone(&self.shared), &record));
        }

        let label = vertex
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "shader".to_string());
        let sources = assets::load_shader_sources(label, &vertex, &fragment, geometry.as_deref())?;
        let handle = self
            .shared
            .with_device(|device| device.create_shader_program(&sources))?;

        let record = ShaderRecord {
            handle,
            vertex: vertex.clone(),
            fragment,
            geometry,
        };
        let shader = ShaderProgram::from_record(Arc::clone(&self.shared), &record);
        self.shared.check_diagnostics()?;
        self.shared.cache.lock().insert_shader(key, record);
        log::debug!("shader loaded: {} -> {:?}", vertex.display(), handle);
        Ok(shader)
    }

    /// Load a model, or return the cached aggregate for the same canonical
    /// path plus flags. Material textures go through the texture cache.
    pub fn load_model(&self, path: impl AsRef<Path>, flip_y: bool, srgb: bool) -> Result<Model> {
        let resolved = assets::resolve_path(&self.shared.config.asset_roots, path.as_ref())?;
        let key = ModelKey {
            path: resolved.clone(),
            flip_y,
            srgb,
        };

        let cached = self.shared.cache.lock().model(&key).cloned();
        if let Some(record) = cached {
            log::debug!("model cache hit: {}", resolved.display());
            return Ok(Model::from_record(&self.shared, &record));
        }

        let base_dir = resolved
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mesh_sources = assets::load_model_meshes(&resolved)?;

        let mut meshes = Vec::with_capacity(mesh_sources.len());
        let mut mesh_records = Vec::with_capacity(mesh_sources.len());
        for source in &mesh_sources {
            let buffers = self.create_mesh(&source.data)?;
            let mut textures = Vec::with_capacity(source.textures.len());
            let mut texture_records = Vec::with_capacity(source.textures.len());
            for (texture_role, file) in &source.textures {
                let texture = self.load_texture(base_dir.join(file), *texture_role, flip_y, srgb)?;
                texture_records.push(texture.to_record());
                textures.push(texture);
            }
            mesh_records.push(ModelMeshRecord {
                mesh: buffers.to_record(),
                textures: texture_records,
            });
            meshes.push(ModelMesh {
                name: source.data.name.clone(),
                buffers,
                textures,
            });
        }

        let model = Model::new(resolved.clone(), meshes);
        if mesh_records.is_empty() {
            // Aggregates are evicted through their mesh handles; an empty one
            // would never leave the cache.
            log::warn!("model {} has no meshes, not caching it", resolved.display());
        } else {
            self.shared.cache.lock().insert_model(
                key,
                ModelRecord {
                    source: resolved.clone(),
                    meshes: mesh_records,
                },
            );
        }
        log::debug!(
            "model loaded: {} ({} meshes)",
            resolved.display(),
            model.mesh_count()
        );
        Ok(model)
    }

    // ========================================================================
    // Uncached creation
    // ========================================================================

    /// Create a fresh render target. Never cached.
    pub fn create_render_target(
        &self,
        width: u32,
        height: u32,
        kind: RenderTargetKind,
    ) -> Result<RenderTarget> {
        let attachments =
            resources::render_target::build_attachments(&self.shared, width, height, kind)?;
        let handle = self
            .shared
            .with_device(|device| device.create_render_target(Some("render target")))?;
        let target = RenderTarget::from_parts(
            Arc::clone(&self.shared),
            handle,
            width,
            height,
            kind,
            attachments,
        );
        resources::render_target::wire_attachments(&self.shared, handle, target.attachments(), 0)?;
        self.shared.check_diagnostics()?;
        log::debug!(
            "render target created: {}x{} {:?} -> {:?}",
            width,
            height,
            kind,
            handle
        );
        Ok(target)
    }

    /// Create a uniform buffer for an ordered field declaration.
    ///
    /// Field placements follow the std140 rules; the declaration order must
    /// match the consuming shader's uniform block exactly.
    pub fn create_uniform_buffer(
        &self,
        label: &str,
        fields: &[(&str, FieldType)],
    ) -> Result<UniformBuffer> {
        let layout = Std140Layout::compute(&fields.iter().map(|(_, ty)| *ty).collect::<Vec<_>>());
        let named: Vec<UniformField> = fields
            .iter()
            .zip(layout.fields.iter())
            .map(|((name, ty), placed)| UniformField {
                name: (*name).to_string(),
                ty: *ty,
                offset: placed.offset,
                size: placed.size,
            })
            .collect();
        let handle = self
            .shared
            .with_device(|device| device.create_uniform_buffer(Some(label), layout.total_size))?;
        let buffer = UniformBuffer::from_parts(
            Arc::clone(&self.shared),
            handle,
            label.to_string(),
            named,
            layout.total_size,
        );
        self.shared.check_diagnostics()?;
        log::debug!(
            "uniform buffer '{}' created ({} bytes) -> {:?}",
            label,
            layout.total_size,
            handle
        );
        Ok(buffer)
    }

    /// Upload mesh data. Never cached; models go through [`Self::load_model`].
    pub fn create_mesh(&self, data: &MeshData) -> Result<MeshBuffers> {
        let desc = MeshBufferDescriptor {
            label: Some(data.name.clone()),
            vertex_count: data.vertex_count(),
            index_count: data.index_count(),
            vertex_stride: Vertex::STRIDE,
        };
        let handle = self.shared.with_device(|device| {
            device.create_mesh_buffers(&desc, data.vertex_bytes(), data.index_bytes())
        })?;
        let record = MeshRecord {
            handle,
            name: data.name.clone(),
            vertex_count: desc.vertex_count,
            index_count: desc.index_count,
        };
        let buffers = MeshBuffers::from_record(Arc::clone(&self.shared), &record);
        self.shared.check_diagnostics()?;
        Ok(buffers)
    }

    /// Create a 1x1 solid-color texture. Never cached.
    pub fn create_solid_texture(&self, label: &str, rgba: [u8; 4]) -> Result<Texture> {
        let desc = TextureDescriptor {
            label: Some(label.to_string()),
            ..TextureDescriptor::default()
        };
        let handle = self
            .shared
            .with_device(|device| device.create_texture(&desc, &rgba))?;
        let record = TextureRecord {
            handle,
            target: TextureTarget::Flat2D,
            format: TextureFormat::Rgba8Unorm,
            width: 1,
            height: 1,
            samples: 1,
            sampler: SamplerSettings::default(),
            source: None,
            flip_y: false,
            srgb: false,
            role: TextureRole::Generic,
        };
        let texture = Texture::from_record(Arc::clone(&self.shared), &record);
        self.shared.check_diagnostics()?;
        Ok(texture)
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Current reference count of a handle; zero if untracked. Diagnostic
    /// only, not meant to drive logic.
    pub fn ref_count(&self, kind: ResourceKind, handle: RawHandle) -> u32 {
        self.shared.registry.lock().count(kind, handle)
    }

    /// Number of live handles of a kind.
    pub fn live(&self, kind: ResourceKind) -> usize {
        self.shared.registry.lock().live(kind)
    }

    /// Log current reference counts per kind and cache entry counts.
    pub fn dump_ref_counts(&self) {
        log::debug!("[{}] reference counts:", self.shared.config.label);
        self.shared.registry.lock().dump();
        let (textures, cubemaps, shaders, models) = self.shared.cache.lock().entry_counts();
        log::debug!(
            "[{}] cache entries: {} texture(s), {} cubemap(s), {} shader(s), {} model(s)",
            self.shared.config.label,
            textures,
            cubemaps,
            shaders,
            models
        );
    }
}
