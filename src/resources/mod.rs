//! Resource wrappers
//!
//! Small value types that each wrap one GPU handle plus kind-specific
//! metadata. Many wrappers may alias the same handle: cloning increments the
//! shared reference count, moving transfers ownership without touching it,
//! and dropping decrements. The wrapper that observes the count reach zero
//! evicts any cache entry for the handle and frees the GPU object.

mod mesh;
mod model;
mod render_buffer;
pub(crate) mod render_target;
mod shader;
mod texture;
mod uniform;

pub use mesh::{MeshBuffers, MeshData, Vertex};
pub use model::{Model, ModelMesh};
pub use render_buffer::RenderBuffer;
pub use render_target::{
    Attachment, AttachmentRole, AttachmentStorage, RenderTarget, RenderTargetKind,
};
pub use shader::ShaderProgram;
pub use texture::{Texture, TextureRole};
pub use uniform::{UniformBuffer, UniformField, UniformValue};

/// Shared reference to the owning context's internals; every wrapper carries
/// one so its `Clone`/`Drop` can reach the registry, cache, and device.
pub(crate) type ContextRef = std::sync::Arc<crate::context::ContextShared>;
