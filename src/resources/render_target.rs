//! Render target wrapper
//!
//! A render target owns its attachments exclusively: resizing, resampling,
//! or re-attaching replaces them wholesale, dropping the old wrappers (and
//! with them the old GPU storage once nothing else references it).

use std::fmt;

use crate::cache::TextureRecord;
use crate::device::{
    AttachmentPoint, AttachmentRef, RawHandle, RenderBufferDescriptor, RenderTargetStatus,
    ResourceKind, SamplerSettings, TextureDescriptor, TextureFormat, TextureTarget,
};
use crate::error::{FirethornError, Result};

use super::texture::TextureRole;
use super::{ContextRef, RenderBuffer, Texture};

/// Attachment layouts the engine builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTargetKind {
    /// Color texture plus depth-stencil render buffer.
    Standard,
    /// Multisampled color texture plus multisampled depth-stencil render
    /// buffer.
    Multisampled { samples: u32 },
    /// Depth texture only, sampled with comparison (shadow maps).
    DepthOnly,
    /// Cube color texture plus depth-stencil render buffer (reflection
    /// probes); one face is bound at a time.
    CubeColor,
}

/// Role of one attachment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentRole {
    ColorFlat,
    ColorCube,
    Depth,
    DepthStencil,
}

/// Storage backing an attachment slot.
#[derive(Clone, Debug)]
pub enum AttachmentStorage {
    Texture(Texture),
    RenderBuffer(RenderBuffer),
}

/// One attachment slot of a render target.
#[derive(Clone, Debug)]
pub struct Attachment {
    pub role: AttachmentRole,
    pub storage: AttachmentStorage,
}

impl Attachment {
    fn point(&self) -> AttachmentPoint {
        match self.role {
            AttachmentRole::ColorFlat | AttachmentRole::ColorCube => AttachmentPoint::Color,
            AttachmentRole::Depth => AttachmentPoint::Depth,
            AttachmentRole::DepthStencil => AttachmentPoint::DepthStencil,
        }
    }

    fn reference(&self, cube_face: u8) -> AttachmentRef {
        match (&self.storage, self.role) {
            (AttachmentStorage::Texture(t), AttachmentRole::ColorCube) => {
                AttachmentRef::CubeFace(t.handle(), cube_face)
            }
            (AttachmentStorage::Texture(t), _) => AttachmentRef::Texture(t.handle()),
            (AttachmentStorage::RenderBuffer(b), _) => AttachmentRef::RenderBuffer(b.handle()),
        }
    }
}

/// Shared-ownership wrapper around one render target.
pub struct RenderTarget {
    ctx: ContextRef,
    handle: RawHandle,
    width: u32,
    height: u32,
    kind: RenderTargetKind,
    cube_face: u8,
    attachments: Vec<Attachment>,
}

impl RenderTarget {
    pub const KIND: ResourceKind = ResourceKind::RenderTarget;

    pub(crate) fn from_parts(
        ctx: ContextRef,
        handle: RawHandle,
        width: u32,
        height: u32,
        kind: RenderTargetKind,
        attachments: Vec<Attachment>,
    ) -> Self {
        ctx.retain(Self::KIND, handle);
        Self {
            ctx,
            handle,
            width,
            height,
            kind,
            cube_face: 0,
            attachments,
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

    pub fn kind(&self) -> RenderTargetKind {
        self.kind
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Color attachment texture, if this target renders to a sampleable one.
    pub fn color_texture(&self) -> Option<&Texture> {
        self.attachments.iter().find_map(|a| match (&a.storage, a.role) {
            (AttachmentStorage::Texture(t), AttachmentRole::ColorFlat | AttachmentRole::ColorCube) => {
                Some(t)
            }
            _ => None,
        })
    }

    /// Depth attachment texture, if depth is texture-backed.
    pub fn depth_texture(&self) -> Option<&Texture> {
        self.attachments.iter().find_map(|a| match (&a.storage, a.role) {
            (AttachmentStorage::Texture(t), AttachmentRole::Depth | AttachmentRole::DepthStencil) => {
                Some(t)
            }
            _ => None,
        })
    }

    /// Rebuild the attachments for new dimensions. The old attachments are
    /// dropped wholesale.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == self.width && height == self.height {
            return Ok(());
        }
        let rebuilt = build_attachments(&self.ctx, width, height, self.kind)?;
        wire_attachments(&self.ctx, self.handle, &rebuilt, self.cube_face)?;
        self.ctx.check_diagnostics()?;
        self.attachments = rebuilt;
        self.width = width;
        self.height = height;
        log::debug!(
            "render target {} resized to {}x{}",
            self.handle.get(),
            width,
            height
        );
        Ok(())
    }

    /// Change the sample count, rebuilding the attachments. A count of one
    /// falls back to the standard layout. Only color targets carry a sample
    /// knob.
    pub fn set_sample_count(&mut self, samples: u32) -> Result<()> {
        let kind = match self.kind {
            RenderTargetKind::Standard | RenderTargetKind::Multisampled { .. } => {
                if samples <= 1 {
                    RenderTargetKind::Standard
                } else {
                    RenderTargetKind::Multisampled { samples }
                }
            }
            other => {
                return Err(FirethornError::IncompleteRenderTarget {
                    reason: format!("{other:?} targets do not support multisampling"),
                });
            }
        };
        if kind == self.kind {
            return Ok(());
        }
        let rebuilt = build_attachments(&self.ctx, self.width, self.height, kind)?;
        wire_attachments(&self.ctx, self.handle, &rebuilt, self.cube_face)?;
        self.ctx.check_diagnostics()?;
        self.attachments = rebuilt;
        self.kind = kind;
        Ok(())
    }

    /// Re-attach the color slot to another face of the cube texture.
    pub fn select_cube_face(&mut self, face: u8) -> Result<()> {
        if self.kind != RenderTargetKind::CubeColor {
            return Err(FirethornError::IncompleteRenderTarget {
                reason: format!("{:?} targets have no cube faces", self.kind),
            });
        }
        debug_assert!(face < 6);
        let color = self
            .attachments
            .iter()
            .find(|a| a.role == AttachmentRole::ColorCube)
            .expect("cube target always has a cube color attachment");
        self.ctx
            .with_device(|device| device.attach(self.handle, color.point(), color.reference(face)))?;
        self.cube_face = face;
        Ok(())
    }
}

impl Clone for RenderTarget {
    fn clone(&self) -> Self {
        self.ctx.retain(Self::KIND, self.handle);
        Self {
            ctx: ContextRef::clone(&self.ctx),
            handle: self.handle,
            width: self.width,
            height: self.height,
            kind: self.kind,
            cube_face: self.cube_face,
            attachments: self.attachments.clone(),
        }
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        // The target handle goes first; the attachment wrappers release
        // themselves afterwards.
        self.ctx.release_resource(Self::KIND, self.handle);
    }
}

impl fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderTarget")
            .field("handle", &self.handle)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("kind", &self.kind)
            .field("attachments", &self.attachments.len())
            .finish_non_exhaustive()
    }
}

/// Allocate the attachment set for a target kind.
pub(crate) fn build_attachments(
    ctx: &ContextRef,
    width: u32,
    height: u32,
    kind: RenderTargetKind,
) -> Result<Vec<Attachment>> {
    let mut attachments = Vec::with_capacity(2);
    match kind {
        RenderTargetKind::Standard => {
            attachments.push(color_texture_attachment(ctx, width, height, 1)?);
            attachments.push(depth_stencil_buffer_attachment(ctx, width, height, 1)?);
        }
        RenderTargetKind::Multisampled { samples } => {
            attachments.push(color_texture_attachment(ctx, width, height, samples)?);
            attachments.push(depth_stencil_buffer_attachment(ctx, width, height, samples)?);
        }
        RenderTargetKind::DepthOnly => {
            let desc = TextureDescriptor {
                label: Some("depth target".into()),
                target: TextureTarget::Flat2D,
                width,
                height,
                format: TextureFormat::Depth32Float,
                samples: 1,
                render_attachment: true,
                sampler: SamplerSettings::depth_compare(),
            };
            let handle = ctx.with_device(|device| device.create_attachment_texture(&desc))?;
            attachments.push(Attachment {
                role: AttachmentRole::Depth,
                storage: AttachmentStorage::Texture(adopt_attachment_texture(
                    ctx, handle, &desc,
                )),
            });
        }
        RenderTargetKind::CubeColor => {
            let desc = TextureDescriptor {
                label: Some("cube color target".into()),
                target: TextureTarget::Cube,
                width,
                height,
                format: TextureFormat::Rgba8Unorm,
                samples: 1,
                render_attachment: true,
                sampler: SamplerSettings::default(),
            };
            let handle = ctx.with_device(|device| device.create_attachment_texture(&desc))?;
            attachments.push(Attachment {
                role: AttachmentRole::ColorCube,
                storage: AttachmentStorage::Texture(adopt_attachment_texture(
                    ctx, handle, &desc,
                )),
            });
            attachments.push(depth_stencil_buffer_attachment(ctx, width, height, 1)?);
        }
    }
    Ok(attachments)
}

/// Bind every attachment and verify completeness.
pub(crate) fn wire_attachments(
    ctx: &ContextRef,
    target: RawHandle,
    attachments: &[Attachment],
    cube_face: u8,
) -> Result<()> {
    for attachment in attachments {
        ctx.with_device(|device| {
            device.attach(target, attachment.point(), attachment.reference(cube_face))
        })?;
    }
    let status = ctx.with_device(|device| device.render_target_status(target));
    match status {
        RenderTargetStatus::Complete => Ok(()),
        RenderTargetStatus::Incomplete(reason) => {
            Err(FirethornError::IncompleteRenderTarget { reason })
        }
    }
}

fn color_texture_attachment(
    ctx: &ContextRef,
    width: u32,
    height: u32,
    samples: u32,
) -> Result<Attachment> {
    let desc = TextureDescriptor {
        label: Some("color target".into()),
        target: TextureTarget::Flat2D,
        width,
        height,
        format: TextureFormat::Rgba8Unorm,
        samples,
        render_attachment: true,
        sampler: SamplerSettings::default(),
    };
    let handle = ctx.with_device(|device| device.create_attachment_texture(&desc))?;
    Ok(Attachment {
        role: AttachmentRole::ColorFlat,
        storage: AttachmentStorage::Texture(adopt_attachment_texture(ctx, handle, &desc)),
    })
}

fn depth_stencil_buffer_attachment(
    ctx: &ContextRef,
    width: u32,
    height: u32,
    samples: u32,
) -> Result<Attachment> {
    let desc = RenderBufferDescriptor {
        label: Some("depth-stencil target".into()),
        width,
        height,
        format: TextureFormat::Depth24PlusStencil8,
        samples,
    };
    let handle = ctx.with_device(|device| device.create_render_buffer(&desc))?;
    Ok(Attachment {
        role: AttachmentRole::DepthStencil,
        storage: AttachmentStorage::RenderBuffer(RenderBuffer::adopt(
            ContextRef::clone(ctx),
            handle,
            width,
            height,
            desc.format,
            samples,
        )),
    })
}

fn adopt_attachment_texture(ctx: &ContextRef, handle: RawHandle, desc: &TextureDescriptor) -> Texture {
    Texture::from_record(
        ContextRef::clone(ctx),
        &TextureRecord {
            handle,
            target: desc.target,
            format: desc.format,
            width: desc.width,
            height: desc.height,
            samples: desc.samples,
            sampler: desc.sampler,
            source: None,
            flip_y: false,
            srgb: false,
            role: TextureRole::Generic,
        },
    )
}
