//! Uniform buffer wrapper
//!
//! A uniform buffer declares an ordered field sequence once, lays it out with
//! the std140 rules, and then accepts typed writes by field name. Field
//! placements are immutable after declaration; only the buffer bytes change.

use std::fmt;

use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::device::{RawHandle, ResourceKind};
use crate::error::{FirethornError, Result};
use crate::layout::FieldType;

use super::ContextRef;

/// A typed value written into a uniform field.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
    FloatArray(Vec<f32>),
    Vec2Array(Vec<Vec2>),
    Vec3Array(Vec<Vec3>),
    Vec4Array(Vec<Vec4>),
}

impl UniformValue {
    fn kind_name(&self) -> &'static str {
        match self {
            UniformValue::Float(_) => "float",
            UniformValue::Int(_) => "int",
            UniformValue::Bool(_) => "bool",
            UniformValue::Vec2(_) => "vec2",
            UniformValue::Vec3(_) => "vec3",
            UniformValue::Vec4(_) => "vec4",
            UniformValue::Mat2(_) => "mat2",
            UniformValue::Mat3(_) => "mat3",
            UniformValue::Mat4(_) => "mat4",
            UniformValue::FloatArray(_) => "float array",
            UniformValue::Vec2Array(_) => "vec2 array",
            UniformValue::Vec3Array(_) => "vec3 array",
            UniformValue::Vec4Array(_) => "vec4 array",
        }
    }

    /// Whether this value satisfies a declared field type, element count
    /// included.
    fn matches(&self, ty: FieldType) -> bool {
        match (self, ty) {
            (UniformValue::Float(_), FieldType::Float)
            | (UniformValue::Int(_), FieldType::Int)
            | (UniformValue::Bool(_), FieldType::Bool)
            | (UniformValue::Vec2(_), FieldType::Vec2)
            | (UniformValue::Vec3(_), FieldType::Vec3)
            | (UniformValue::Vec4(_), FieldType::Vec4)
            | (UniformValue::Mat2(_), FieldType::Mat2)
            | (UniformValue::Mat3(_), FieldType::Mat3)
            | (UniformValue::Mat4(_), FieldType::Mat4) => true,
            (UniformValue::FloatArray(v), FieldType::FloatArray(n)) => v.len() == n as usize,
            (UniformValue::Vec2Array(v), FieldType::Vec2Array(n)) => v.len() == n as usize,
            (UniformValue::Vec3Array(v), FieldType::Vec3Array(n)) => v.len() == n as usize,
            (UniformValue::Vec4Array(v), FieldType::Vec4Array(n)) => v.len() == n as usize,
            _ => false,
        }
    }

    /// Encode into std140 bytes. Matrix columns and array elements are padded
    /// to their slot stride; trailing holes after vec3-sized payloads are
    /// left to the layout's declared size.
    fn encode(&self) -> Vec<u8> {
        match self {
            UniformValue::Float(v) => v.to_le_bytes().to_vec(),
            UniformValue::Int(v) => v.to_le_bytes().to_vec(),
            UniformValue::Bool(v) => u32::from(*v).to_le_bytes().to_vec(),
            UniformValue::Vec2(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Vec3(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Vec4(v) => bytemuck::bytes_of(v).to_vec(),
            // mat2 occupies a single 16-byte slot: two vec2 columns, packed.
            UniformValue::Mat2(m) => bytemuck::cast_slice(&m.to_cols_array()).to_vec(),
            // mat3 is three vec4-padded columns.
            UniformValue::Mat3(m) => {
                let mut bytes = Vec::with_capacity(48);
                for col in [m.x_axis, m.y_axis, m.z_axis] {
                    bytes.extend_from_slice(bytemuck::bytes_of(&col));
                    bytes.extend_from_slice(&[0u8; 4]);
                }
                bytes
            }
            UniformValue::Mat4(m) => bytemuck::cast_slice(&m.to_cols_array()).to_vec(),
            UniformValue::FloatArray(values) => encode_array(values, 4),
            UniformValue::Vec2Array(values) => encode_array(values, 8),
            UniformValue::Vec3Array(values) => encode_array(values, 12),
            UniformValue::Vec4Array(values) => encode_array(values, 16),
        }
    }
}

/// Pack array elements into 16-byte slots.
fn encode_array<T: bytemuck::Pod>(values: &[T], payload: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 16);
    for value in values {
        bytes.extend_from_slice(&bytemuck::bytes_of(value)[..payload]);
        bytes.resize(bytes.len() + (16 - payload), 0);
    }
    bytes
}

/// One declared field: name, type tag, and computed placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformField {
    pub name: String,
    pub ty: FieldType,
    pub offset: u64,
    pub size: u64,
}

/// Shared-ownership wrapper around one GPU-side uniform buffer.
pub struct UniformBuffer {
    ctx: ContextRef,
    handle: RawHandle,
    label: String,
    fields: Vec<UniformField>,
    size: u64,
}

impl UniformBuffer {
    pub const KIND: ResourceKind = ResourceKind::UniformBuffer;

    pub(crate) fn from_parts(
        ctx: ContextRef,
        handle: RawHandle,
        label: String,
        fields: Vec<UniformField>,
        size: u64,
    ) -> Self {
        ctx.retain(Self::KIND, handle);
        Self {
            ctx,
            handle,
            label,
            fields,
            size,
        }
    }

    pub fn handle(&self) -> RawHandle {
        self.handle
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Total byte size of the backing GPU allocation.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    /// Look up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Write a value into a declared field.
    ///
    /// Fails on unknown names and on values that do not match the declared
    /// type, element count included.
    pub fn set(&self, name: &str, value: UniformValue) -> Result<()> {
        let field = self
            .field(name)
            .ok_or_else(|| FirethornError::UnknownUniform {
                block: self.label.clone(),
                name: name.to_string(),
            })?;
        if !value.matches(field.ty) {
            return Err(FirethornError::UniformTypeMismatch {
                name: name.to_string(),
                expected: field.ty,
                got: value.kind_name(),
            });
        }
        let bytes = value.encode();
        debug_assert!(bytes.len() as u64 <= field.size);
        self.ctx
            .with_device(|device| device.write_uniform_buffer(self.handle, field.offset, &bytes))?;
        Ok(())
    }

    /// Bind the buffer to a numbered uniform slot.
    pub fn bind_to_slot(&self, slot: u32) {
        self.ctx
            .with_device(|device| device.bind_uniform_slot(self.handle, slot));
    }
}

impl Clone for UniformBuffer {
    fn clone(&self) -> Self {
        self.ctx.retain(Self::KIND, self.handle);
        Self {
            ctx: ContextRef::clone(&self.ctx),
            handle: self.handle,
            label: self.label.clone(),
            fields: self.fields.clone(),
            size: self.size,
        }
    }
}

impl Drop for UniformBuffer {
    fn drop(&mut self) {
        self.ctx.release_resource(Self::KIND, self.handle);
    }
}

impl fmt::Debug for UniformBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniformBuffer")
            .field("handle", &self.handle)
            .field("label", &self.label)
            .field("fields", &self.fields.len())
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
