//! Firethorn - resource-ownership core of a real-time rendering engine
//!
//! Manages GPU-side objects (textures, render targets, shader programs,
//! uniform buffers, mesh buffers) whose lifetime must track multiple
//! independent owners while the underlying graphics objects are allocated
//! and freed exactly once.
//!
//! # Features
//! - Shared-handle reference counting: resource wrappers are cheap values;
//!   cloning aliases the same GPU object, the last owner frees it
//! - Resource cache deduplicating loads by logical identity
//!   (source path plus load flags)
//! - std140-style uniform buffer layout engine
//! - Pluggable graphics device boundary with a headless implementation for
//!   tests and CI
//!
//! # Example
//!
//! ```
//! use firethorn::{ContextConfig, FieldType, RenderContext, UniformValue};
//!
//! let (context, _stats) = RenderContext::headless(ContextConfig::default());
//! let camera = context
//!     .create_uniform_buffer("camera", &[("view_proj", FieldType::Mat4)])
//!     .unwrap();
//! camera.set("view_proj", UniformValue::Mat4(glam::Mat4::IDENTITY)).unwrap();
//! camera.bind_to_slot(0);
//! ```

mod assets;
mod cache;
pub mod context;
pub mod device;
pub mod error;
pub mod layout;
mod registry;
pub mod resources;

pub use context::{ContextConfig, RenderContext};
pub use device::{
    DeviceError, DeviceStats, GraphicsDevice, HeadlessDevice, RawHandle, ResourceKind,
};
pub use error::{FirethornError, Result};
pub use layout::{FieldLayout, FieldType, Std140Layout};
pub use resources::{
    Attachment, AttachmentRole, AttachmentStorage, MeshBuffers, MeshData, Model, ModelMesh,
    RenderBuffer, RenderTarget, RenderTargetKind, ShaderProgram, Texture, TextureRole,
    UniformBuffer, UniformField, UniformValue, Vertex,
};
