//! std140-style uniform block layout.
//!
//! Computes byte offsets and alignments for an ordered field sequence using
//! the fixed std140 alignment table. The algorithm is pure and
//! order-dependent: fields must be declared in the exact order they appear in
//! the consuming shader's uniform block; no reordering or packing
//! optimization happens here.

/// Type tag of one declared uniform field.
///
/// Arrays carry their element count and are limited to scalar and vector
/// element types; every array element occupies a full 16-byte slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Float,
    Int,
    Bool,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    FloatArray(u32),
    Vec2Array(u32),
    Vec3Array(u32),
    Vec4Array(u32),
}

impl FieldType {
    /// Base alignment in bytes.
    pub fn base_alignment(&self) -> u64 {
        match self {
            FieldType::Float | FieldType::Int | FieldType::Bool => 4,
            FieldType::Vec2 => 8,
            FieldType::Vec3 | FieldType::Vec4 => 16,
            FieldType::Mat2 | FieldType::Mat3 | FieldType::Mat4 => 16,
            FieldType::FloatArray(_)
            | FieldType::Vec2Array(_)
            | FieldType::Vec3Array(_)
            | FieldType::Vec4Array(_) => 16,
        }
    }

    /// Size in bytes, padding included for matrix columns and array slots.
    pub fn size(&self) -> u64 {
        match self {
            FieldType::Float | FieldType::Int | FieldType::Bool => 4,
            FieldType::Vec2 => 8,
            FieldType::Vec3 | FieldType::Vec4 => 16,
            FieldType::Mat2 => 16,
            FieldType::Mat3 => 48,
            FieldType::Mat4 => 64,
            FieldType::FloatArray(n)
            | FieldType::Vec2Array(n)
            | FieldType::Vec3Array(n)
            | FieldType::Vec4Array(n) => 16 * u64::from(*n),
        }
    }
}

/// Placement of one field inside the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub offset: u64,
    pub size: u64,
    pub base_alignment: u64,
}

/// Computed layout of a whole uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Std140Layout {
    pub fields: Vec<FieldLayout>,
    /// Total allocation size for the backing GPU buffer.
    pub total_size: u64,
}

impl Std140Layout {
    /// Lay out `fields` in declaration order.
    ///
    /// The running offset starts at zero; before each field it is padded up
    /// to the field's base alignment, then advanced by the field's size. The
    /// final offset is the buffer allocation size.
    pub fn compute(fields: &[FieldType]) -> Self {
        let mut offset = 0u64;
        let mut placed = Vec::with_capacity(fields.len());
        for field in fields {
            let base_alignment = field.base_alignment();
            let size = field.size();
            offset = align_up(offset, base_alignment);
            placed.push(FieldLayout {
                offset,
                size,
                base_alignment,
            });
            offset += size;
        }
        Self {
            fields: placed,
            total_size: offset,
        }
    }
}

fn align_up(offset: u64, alignment: u64) -> u64 {
    let rem = offset % alignment;
    if rem == 0 {
        offset
    } else {
        offset + (alignment - rem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets(fields: &[FieldType]) -> Vec<u64> {
        Std140Layout::compute(fields)
            .fields
            .iter()
            .map(|f| f.offset)
            .collect()
    }

    #[test]
    fn float_vec3_mat4_layout() {
        let layout = Std140Layout::compute(&[FieldType::Float, FieldType::Vec3, FieldType::Mat4]);
        assert_eq!(offsets(&[FieldType::Float, FieldType::Vec3, FieldType::Mat4]), [0, 16, 32]);
        assert_eq!(layout.total_size, 96);
    }

    #[test]
    fn vec2_packs_after_scalar() {
        // float at 0, vec2 padded to its 8-byte alignment.
        assert_eq!(offsets(&[FieldType::Float, FieldType::Vec2]), [0, 8]);
        let layout = Std140Layout::compute(&[FieldType::Float, FieldType::Vec2]);
        assert_eq!(layout.total_size, 16);
    }

    #[test]
    fn consecutive_scalars_pack_tightly() {
        assert_eq!(
            offsets(&[FieldType::Float, FieldType::Int, FieldType::Bool]),
            [0, 4, 8]
        );
    }

    #[test]
    fn vec3_consumes_a_full_slot() {
        // vec3 has size 16 in this rule set; a following scalar starts at 16,
        // not 12.
        assert_eq!(offsets(&[FieldType::Vec3, FieldType::Float]), [0, 16]);
    }

    #[test]
    fn matrix_sizes() {
        assert_eq!(FieldType::Mat2.size(), 16);
        assert_eq!(FieldType::Mat3.size(), 48);
        assert_eq!(FieldType::Mat4.size(), 64);
        assert_eq!(offsets(&[FieldType::Float, FieldType::Mat2]), [0, 16]);
        let layout = Std140Layout::compute(&[FieldType::Mat3, FieldType::Mat3]);
        assert_eq!(layout.total_size, 96);
    }

    #[test]
    fn arrays_use_sixteen_byte_slots() {
        let layout = Std140Layout::compute(&[FieldType::Float, FieldType::FloatArray(3)]);
        assert_eq!(layout.fields[1].offset, 16);
        assert_eq!(layout.fields[1].size, 48);
        assert_eq!(layout.total_size, 64);
    }

    #[test]
    fn empty_block_is_zero_sized() {
        let layout = Std140Layout::compute(&[]);
        assert!(layout.fields.is_empty());
        assert_eq!(layout.total_size, 0);
    }
}
