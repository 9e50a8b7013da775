//! Mesh data and mesh buffer wrappers

use std::fmt;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

use crate::cache::MeshRecord;
use crate::device::{RawHandle, ResourceKind};

use super::ContextRef;

/// Standard vertex with position, normal, UV, and tangent
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub tangent: Vec4,
}

impl Vertex {
    pub const STRIDE: u64 = std::mem::size_of::<Self>() as u64;
}

/// CPU-side mesh data awaiting upload.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Vertex data as bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index data as bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Unit cube centered at the origin.
    pub fn cube() -> Self {
        let mut mesh = MeshData::new("cube");

        // One quad per face; normals axis-aligned.
        let faces = [
            (Vec3::Z, Vec3::X, Vec3::Y),
            (-Vec3::Z, -Vec3::X, Vec3::Y),
            (Vec3::X, -Vec3::Z, Vec3::Y),
            (-Vec3::X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, -Vec3::Z),
            (-Vec3::Y, Vec3::X, Vec3::Z),
        ];

        for (normal, right, up) in faces {
            let base = mesh.vertices.len() as u32;
            let corners = [
                (-0.5, -0.5, Vec2::new(0.0, 1.0)),
                (0.5, -0.5, Vec2::new(1.0, 1.0)),
                (0.5, 0.5, Vec2::new(1.0, 0.0)),
                (-0.5, 0.5, Vec2::new(0.0, 0.0)),
            ];
            for (u, v, uv) in corners {
                mesh.vertices.push(Vertex {
                    position: normal * 0.5 + right * u + up * v,
                    normal,
                    uv,
                    tangent: right.extend(1.0),
                });
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        mesh
    }

    /// Flat plane on the XZ axis.
    pub fn plane(width: f32, depth: f32) -> Self {
        let mut mesh = MeshData::new("plane");
        let (hw, hd) = (width / 2.0, depth / 2.0);
        let corners = [
            (Vec3::new(-hw, 0.0, -hd), Vec2::new(0.0, 0.0)),
            (Vec3::new(hw, 0.0, -hd), Vec2::new(1.0, 0.0)),
            (Vec3::new(hw, 0.0, hd), Vec2::new(1.0, 1.0)),
            (Vec3::new(-hw, 0.0, hd), Vec2::new(0.0, 1.0)),
        ];
        for (position, uv) in corners {
            mesh.vertices.push(Vertex {
                position,
                normal: Vec3::Y,
                uv,
                tangent: Vec4::new(1.0, 0.0, 0.0, 1.0),
            });
        }
        mesh.indices.extend_from_slice(&[0, 2, 1, 0, 3, 2]);
        mesh
    }
}

/// Shared-ownership wrapper around one uploaded vertex/index buffer set.
pub struct MeshBuffers {
    ctx: ContextRef,
    handle: RawHandle,
    name: String,
    vertex_count: u32,
    index_count: u32,
}

impl MeshBuffers {
    pub const KIND: ResourceKind = ResourceKind::MeshBuffers;

    pub(crate) fn from_record(ctx: ContextRef, record: &MeshRecord) -> Self {
        ctx.retain(Self::KIND, record.handle);
        Self {
            ctx,
            handle: record.handle,
            name: record.name.clone(),
            vertex_count: record.vertex_count,
            index_count: record.index_count,
        }
    }

    pub(crate) fn to_record(&self) -> MeshRecord {
        MeshRecord {
            handle: self.handle,
            name: self.name.clone(),
            vertex_count: self.vertex_count,
            index_count: self.index_count,
        }
    }

    pub fn handle(&self) -> RawHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }
}

impl Clone for MeshBuffers {
    fn clone(&self) -> Self {
        self.ctx.retain(Self::KIND, self.handle);
        Self {
            ctx: ContextRef::clone(&self.ctx),
            handle: self.handle,
            name: self.name.clone(),
            vertex_count: self.vertex_count,
            index_count: self.index_count,
        }
    }
}

impl Drop for MeshBuffers {
    fn drop(&mut self) {
        self.ctx.release_resource(Self::KIND, self.handle);
    }
}

impl fmt::Debug for MeshBuffers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshBuffers")
            .field("handle", &self.handle)
            .field("name", &self.name)
            .field("vertex_count", &self.vertex_count)
            .field("index_count", &self.index_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_shape() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.index_count(), 36);
        assert_eq!(
            cube.vertex_bytes().len() as u64,
            u64::from(cube.vertex_count()) * Vertex::STRIDE
        );
    }

    #[test]
    fn plane_shape() {
        let plane = MeshData::plane(2.0, 2.0);
        assert_eq!(plane.vertex_count(), 4);
        assert_eq!(plane.index_count(), 6);
        assert!(plane.vertices.iter().all(|v| v.normal == Vec3::Y));
    }
}
