//! Headless device for tests, CI, and development without a GPU.
//!
//! Performs no real GPU work but keeps full bookkeeping: per-kind handle
//! allocation, upload validation, attachment tracking, completeness checks,
//! and double-free detection. Statistics stay readable through
//! [`DeviceStats`] after the device has been handed to a context.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{
    AttachmentPoint, AttachmentRef, DeviceError, DeviceResult, DiagnosticSeverity,
    DriverDiagnostic, GraphicsDevice, MeshBufferDescriptor, RawHandle, RenderBufferDescriptor,
    RenderTargetStatus, ResourceKind, ShaderSources, TextureDescriptor,
};

/// Highest sample count the headless device accepts before clamping.
const MAX_SAMPLES: u32 = 8;

const KIND_COUNT: usize = ResourceKind::ALL.len();

#[derive(Debug, Clone)]
struct TextureState {
    samples: u32,
    faces: u8,
}

#[derive(Debug, Clone)]
struct RenderBufferState {
    samples: u32,
}

#[derive(Debug, Default)]
struct RenderTargetState {
    attachments: Vec<(AttachmentPoint, AttachmentRef)>,
}

#[derive(Debug)]
struct UniformBufferState {
    contents: Vec<u8>,
    last_slot: Option<u32>,
}

#[derive(Default)]
struct Inner {
    next_id: [u64; KIND_COUNT],
    created: [u64; KIND_COUNT],
    freed: [u64; KIND_COUNT],
    double_frees: u64,

    textures: HashMap<u64, TextureState>,
    render_buffers: HashMap<u64, RenderBufferState>,
    render_targets: HashMap<u64, RenderTargetState>,
    shader_programs: HashMap<u64, ()>,
    uniform_buffers: HashMap<u64, UniformBufferState>,
    mesh_buffers: HashMap<u64, ()>,

    diagnostics: Vec<DriverDiagnostic>,
}

impl Inner {
    fn allocate(&mut self, kind: ResourceKind) -> RawHandle {
        let slot = kind.index();
        self.next_id[slot] += 1;
        self.created[slot] += 1;
        RawHandle(self.next_id[slot])
    }

    fn live(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Texture => self.textures.len(),
            ResourceKind::RenderBuffer => self.render_buffers.len(),
            ResourceKind::RenderTarget => self.render_targets.len(),
            ResourceKind::ShaderProgram => self.shader_programs.len(),
            ResourceKind::UniformBuffer => self.uniform_buffers.len(),
            ResourceKind::MeshBuffers => self.mesh_buffers.len(),
        }
    }

    fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("headless device: {message}");
        self.diagnostics.push(DriverDiagnostic {
            severity: DiagnosticSeverity::Warning,
            message,
        });
    }

    fn clamp_samples(&mut self, requested: u32, label: &str) -> u32 {
        let samples = requested.max(1);
        if samples > MAX_SAMPLES {
            self.warn(format!(
                "sample count {samples} for '{label}' clamped to {MAX_SAMPLES}"
            ));
            MAX_SAMPLES
        } else {
            samples
        }
    }

    /// Sample count of whatever an attachment reference points at, if it is
    /// still alive.
    fn attachment_samples(&self, storage: &AttachmentRef) -> Option<u32> {
        match storage {
            AttachmentRef::Texture(h) | AttachmentRef::CubeFace(h, _) => {
                self.textures.get(&h.0).map(|t| t.samples)
            }
            AttachmentRef::RenderBuffer(h) => self.render_buffers.get(&h.0).map(|b| b.samples),
        }
    }
}

/// Read-only view of the headless device's bookkeeping.
///
/// Cheap to clone and stays valid after the device moves into a context;
/// the test suite uses this to observe allocations and frees.
#[derive(Clone)]
pub struct DeviceStats {
    inner: Arc<Mutex<Inner>>,
}

impl DeviceStats {
    /// Objects of `kind` created over the device's lifetime.
    pub fn created(&self, kind: ResourceKind) -> u64 {
        self.inner.lock().created[kind.index()]
    }

    /// Objects of `kind` freed over the device's lifetime.
    pub fn freed(&self, kind: ResourceKind) -> u64 {
        self.inner.lock().freed[kind.index()]
    }

    /// Objects of `kind` currently alive.
    pub fn live(&self, kind: ResourceKind) -> usize {
        self.inner.lock().live(kind)
    }

    /// Number of destroy calls on handles that were not alive.
    pub fn double_frees(&self) -> u64 {
        self.inner.lock().double_frees
    }

    /// Current contents of a uniform buffer.
    pub fn uniform_contents(&self, buffer: RawHandle) -> Option<Vec<u8>> {
        self.inner
            .lock()
            .uniform_buffers
            .get(&buffer.0)
            .map(|b| b.contents.clone())
    }

    /// Slot a uniform buffer was last bound to.
    pub fn uniform_slot(&self, buffer: RawHandle) -> Option<u32> {
        self.inner
            .lock()
            .uniform_buffers
            .get(&buffer.0)
            .and_then(|b| b.last_slot)
    }

    /// Effective sample count of a live texture.
    pub fn texture_samples(&self, texture: RawHandle) -> Option<u32> {
        self.inner.lock().textures.get(&texture.0).map(|t| t.samples)
    }
}

/// Headless [`GraphicsDevice`] implementation.
pub struct HeadlessDevice {
    inner: Arc<Mutex<Inner>>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Statistics handle; keep a clone before moving the device into a
    /// context.
    pub fn stats(&self) -> DeviceStats {
        DeviceStats {
            inner: Arc::clone(&self.inner),
        }
    }

    fn expect_upload(label: &str, expected: u64, actual: u64) -> DeviceResult<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(DeviceError::UploadSizeMismatch {
                label: label.to_string(),
                expected,
                actual,
            })
        }
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_texture(&mut self, desc: &TextureDescriptor, data: &[u8]) -> DeviceResult<RawHandle> {
        let label = desc.label.as_deref().unwrap_or("texture");
        let expected =
            u64::from(desc.width) * u64::from(desc.height) * u64::from(desc.format.bytes_per_pixel());
        Self::expect_upload(label, expected, data.len() as u64)?;

        let mut inner = self.inner.lock();
        let handle = inner.allocate(ResourceKind::Texture);
        log::trace!(
            "headless: create texture {} '{}' ({}x{}, {:?})",
            handle.get(),
            label,
            desc.width,
            desc.height,
            desc.format
        );
        inner.textures.insert(handle.0, TextureState { samples: 1, faces: 1 });
        Ok(handle)
    }

    fn create_cubemap(
        &mut self,
        desc: &TextureDescriptor,
        faces: &[Vec<u8>; 6],
    ) -> DeviceResult<RawHandle> {
        let label = desc.label.as_deref().unwrap_or("cubemap");
        let expected =
            u64::from(desc.width) * u64::from(desc.height) * u64::from(desc.format.bytes_per_pixel());
        for (i, face) in faces.iter().enumerate() {
            Self::expect_upload(&format!("{label}[{i}]"), expected, face.len() as u64)?;
        }

        let mut inner = self.inner.lock();
        let handle = inner.allocate(ResourceKind::Texture);
        log::trace!(
            "headless: create cubemap {} '{}' ({}x{} per face)",
            handle.get(),
            label,
            desc.width,
            desc.height
        );
        inner.textures.insert(handle.0, TextureState { samples: 1, faces: 6 });
        Ok(handle)
    }

    fn create_attachment_texture(&mut self, desc: &TextureDescriptor) -> DeviceResult<RawHandle> {
        let label = desc.label.as_deref().unwrap_or("attachment texture");
        let mut inner = self.inner.lock();
        let samples = inner.clamp_samples(desc.samples, label);
        let handle = inner.allocate(ResourceKind::Texture);
        log::trace!(
            "headless: create attachment texture {} '{}' ({}x{}, {} samples)",
            handle.get(),
            label,
            desc.width,
            desc.height,
            samples
        );
        let faces = match desc.target {
            super::TextureTarget::Flat2D => 1,
            super::TextureTarget::Cube => 6,
        };
        inner.textures.insert(handle.0, TextureState { samples, faces });
        Ok(handle)
    }

    fn create_render_buffer(&mut self, desc: &RenderBufferDescriptor) -> DeviceResult<RawHandle> {
        let label = desc.label.as_deref().unwrap_or("render buffer");
        let mut inner = self.inner.lock();
        let samples = inner.clamp_samples(desc.samples, label);
        let handle = inner.allocate(ResourceKind::RenderBuffer);
        log::trace!(
            "headless: create render buffer {} '{}' ({}x{}, {} samples)",
            handle.get(),
            label,
            desc.width,
            desc.height,
            samples
        );
        inner
            .render_buffers
            .insert(handle.0, RenderBufferState { samples });
        Ok(handle)
    }

    fn create_render_target(&mut self, label: Option<&str>) -> DeviceResult<RawHandle> {
        let mut inner = self.inner.lock();
        let handle = inner.allocate(ResourceKind::RenderTarget);
        log::trace!(
            "headless: create render target {} '{}'",
            handle.get(),
            label.unwrap_or("render target")
        );
        inner
            .render_targets
            .insert(handle.0, RenderTargetState::default());
        Ok(handle)
    }

    fn attach(
        &mut self,
        target: RawHandle,
        point: AttachmentPoint,
        storage: AttachmentRef,
    ) -> DeviceResult<()> {
        let mut inner = self.inner.lock();
        let storage_alive = inner.attachment_samples(&storage).is_some();
        if !storage_alive {
            let (kind, handle) = match storage {
                AttachmentRef::Texture(h) | AttachmentRef::CubeFace(h, _) => {
                    (ResourceKind::Texture, h)
                }
                AttachmentRef::RenderBuffer(h) => (ResourceKind::RenderBuffer, h),
            };
            return Err(DeviceError::UnknownHandle { kind, handle });
        }
        if let AttachmentRef::CubeFace(h, face) = storage {
            let faces = inner.textures.get(&h.0).map(|t| t.faces).unwrap_or(1);
            if faces != 6 || face >= 6 {
                inner.warn(format!(
                    "cube-face attachment of texture {} rejected (face {face} of {faces})",
                    h.get()
                ));
            }
        }
        let state = inner.render_targets.get_mut(&target.0).ok_or(
            DeviceError::UnknownHandle {
                kind: ResourceKind::RenderTarget,
                handle: target,
            },
        )?;
        log::trace!(
            "headless: attach {:?} to target {} at {:?}",
            storage,
            target.get(),
            point
        );
        state.attachments.retain(|(p, _)| *p != point);
        state.attachments.push((point, storage));
        Ok(())
    }

    fn render_target_status(&mut self, target: RawHandle) -> RenderTargetStatus {
        let inner = self.inner.lock();
        let Some(state) = inner.render_targets.get(&target.0) else {
            return RenderTargetStatus::Incomplete("unknown render target".into());
        };
        if state.attachments.is_empty() {
            return RenderTargetStatus::Incomplete("no attachments".into());
        }
        let mut samples: Option<u32> = None;
        for (_, storage) in &state.attachments {
            let Some(s) = inner.attachment_samples(storage) else {
                return RenderTargetStatus::Incomplete("attachment storage was freed".into());
            };
            match samples {
                None => samples = Some(s),
                Some(prev) if prev != s => {
                    return RenderTargetStatus::Incomplete(format!(
                        "attachment sample counts differ ({prev} vs {s})"
                    ));
                }
                Some(_) => {}
            }
        }
        RenderTargetStatus::Complete
    }

    fn create_shader_program(&mut self, sources: &ShaderSources) -> DeviceResult<RawHandle> {
        if sources.vertex.trim().is_empty() || sources.fragment.trim().is_empty() {
            return Err(DeviceError::ShaderCompilation {
                label: sources.label.clone(),
                reason: "empty shader stage source".into(),
            });
        }
        let mut inner = self.inner.lock();
        let handle = inner.allocate(ResourceKind::ShaderProgram);
        log::trace!(
            "headless: create shader program {} '{}' (geometry: {})",
            handle.get(),
            sources.label,
            sources.geometry.is_some()
        );
        inner.shader_programs.insert(handle.0, ());
        Ok(handle)
    }

    fn create_uniform_buffer(&mut self, label: Option<&str>, size: u64) -> DeviceResult<RawHandle> {
        let mut inner = self.inner.lock();
        let handle = inner.allocate(ResourceKind::UniformBuffer);
        log::trace!(
            "headless: create uniform buffer {} '{}' ({} bytes)",
            handle.get(),
            label.unwrap_or("uniform buffer"),
            size
        );
        inner.uniform_buffers.insert(
            handle.0,
            UniformBufferState {
                contents: vec![0; size as usize],
                last_slot: None,
            },
        );
        Ok(handle)
    }

    fn write_uniform_buffer(
        &mut self,
        buffer: RawHandle,
        offset: u64,
        data: &[u8],
    ) -> DeviceResult<()> {
        let mut inner = self.inner.lock();
        let state = inner.uniform_buffers.get_mut(&buffer.0).ok_or(
            DeviceError::UnknownHandle {
                kind: ResourceKind::UniformBuffer,
                handle: buffer,
            },
        )?;
        let size = state.contents.len() as u64;
        let len = data.len() as u64;
        if offset + len > size {
            return Err(DeviceError::WriteOutOfBounds {
                handle: buffer,
                offset,
                len,
                size,
            });
        }
        state.contents[offset as usize..(offset + len) as usize].copy_from_slice(data);
        Ok(())
    }

    fn bind_uniform_slot(&mut self, buffer: RawHandle, slot: u32) {
        let mut inner = self.inner.lock();
        if let Some(state) = inner.uniform_buffers.get_mut(&buffer.0) {
            log::trace!("headless: bind uniform buffer {} to slot {}", buffer.get(), slot);
            state.last_slot = Some(slot);
        } else {
            inner.warn(format!(
                "bind_uniform_slot on unknown buffer {}",
                buffer.get()
            ));
        }
    }

    fn create_mesh_buffers(
        &mut self,
        desc: &MeshBufferDescriptor,
        vertices: &[u8],
        indices: &[u8],
    ) -> DeviceResult<RawHandle> {
        let label = desc.label.as_deref().unwrap_or("mesh buffers");
        Self::expect_upload(
            label,
            u64::from(desc.vertex_count) * desc.vertex_stride,
            vertices.len() as u64,
        )?;
        Self::expect_upload(
            label,
            u64::from(desc.index_count) * std::mem::size_of::<u32>() as u64,
            indices.len() as u64,
        )?;

        let mut inner = self.inner.lock();
        let handle = inner.allocate(ResourceKind::MeshBuffers);
        log::trace!(
            "headless: create mesh buffers {} '{}' ({} vertices, {} indices)",
            handle.get(),
            label,
            desc.vertex_count,
            desc.index_count
        );
        inner.mesh_buffers.insert(handle.0, ());
        Ok(handle)
    }

    fn destroy(&mut self, kind: ResourceKind, handle: RawHandle) {
        let mut inner = self.inner.lock();
        let removed = match kind {
            ResourceKind::Texture => inner.textures.remove(&handle.0).is_some(),
            ResourceKind::RenderBuffer => inner.render_buffers.remove(&handle.0).is_some(),
            ResourceKind::RenderTarget => inner.render_targets.remove(&handle.0).is_some(),
            ResourceKind::ShaderProgram => inner.shader_programs.remove(&handle.0).is_some(),
            ResourceKind::UniformBuffer => inner.uniform_buffers.remove(&handle.0).is_some(),
            ResourceKind::MeshBuffers => inner.mesh_buffers.remove(&handle.0).is_some(),
        };
        if removed {
            log::trace!("headless: destroy {} {}", kind, handle.get());
            inner.freed[kind.index()] += 1;
        } else {
            inner.double_frees += 1;
            inner.warn(format!("destroy of dead {} handle {}", kind, handle.get()));
        }
    }

    fn drain_diagnostics(&mut self) -> Vec<DriverDiagnostic> {
        std::mem::take(&mut self.inner.lock().diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::TextureTarget;

    fn rgba_desc(width: u32, height: u32) -> TextureDescriptor {
        TextureDescriptor {
            width,
            height,
            ..TextureDescriptor::default()
        }
    }

    #[test]
    fn handles_are_monotonic_and_never_reused() {
        let mut device = HeadlessDevice::new();
        let a = device.create_texture(&rgba_desc(1, 1), &[0; 4]).unwrap();
        device.destroy(ResourceKind::Texture, a);
        let b = device.create_texture(&rgba_desc(1, 1), &[0; 4]).unwrap();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn upload_size_is_validated() {
        let mut device = HeadlessDevice::new();
        let err = device.create_texture(&rgba_desc(2, 2), &[0; 3]).unwrap_err();
        assert!(matches!(err, DeviceError::UploadSizeMismatch { .. }));
    }

    #[test]
    fn double_free_is_counted_not_fatal() {
        let mut device = HeadlessDevice::new();
        let stats = device.stats();
        let a = device.create_texture(&rgba_desc(1, 1), &[0; 4]).unwrap();
        device.destroy(ResourceKind::Texture, a);
        device.destroy(ResourceKind::Texture, a);
        assert_eq!(stats.double_frees(), 1);
        assert_eq!(stats.freed(ResourceKind::Texture), 1);
    }

    #[test]
    fn sample_count_clamp_queues_warning() {
        let mut device = HeadlessDevice::new();
        let desc = TextureDescriptor {
            target: TextureTarget::Flat2D,
            samples: 16,
            render_attachment: true,
            ..TextureDescriptor::default()
        };
        let handle = device.create_attachment_texture(&desc).unwrap();
        assert_eq!(device.stats().texture_samples(handle), Some(MAX_SAMPLES));
        let diagnostics = device.drain_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, DiagnosticSeverity::Warning);
        assert!(device.drain_diagnostics().is_empty());
    }
}
