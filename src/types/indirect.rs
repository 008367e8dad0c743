//! Indirect argument wire structs.
//!
//! These layouts are the GPU-visible contract for indirect execution: the
//! argument buffer contents must match them byte for byte, and command
//! signature strides equal their sizes. Field order and widths must not
//! change.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

/// Indirect operation families a command signature can encode.
///
/// Mesh draws consume the same group-count layout as [`Dispatch`] and do not
/// get a distinct entry.
///
/// [`Dispatch`]: IndirectOpKind::Dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndirectOpKind {
    /// Non-indexed draw, arguments are [`DrawIndirectArgs`].
    Draw,
    /// Indexed draw, arguments are [`DrawIndexedIndirectArgs`].
    DrawIndexed,
    /// Compute or mesh dispatch, arguments are [`DispatchIndirectArgs`].
    Dispatch,
    /// Ray dispatch, arguments are [`DispatchRaysIndirectArgs`].
    DispatchRays,
}

impl IndirectOpKind {
    /// Byte stride of one argument record of this kind.
    pub fn byte_stride(self) -> u32 {
        match self {
            Self::Draw => std::mem::size_of::<DrawIndirectArgs>() as u32,
            Self::DrawIndexed => std::mem::size_of::<DrawIndexedIndirectArgs>() as u32,
            Self::Dispatch => std::mem::size_of::<DispatchIndirectArgs>() as u32,
            Self::DispatchRays => std::mem::size_of::<DispatchRaysIndirectArgs>() as u32,
        }
    }
}

/// Arguments for an indirect compute or mesh dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct DispatchIndirectArgs {
    /// Thread groups along X.
    pub group_count_x: u32,
    /// Thread groups along Y.
    pub group_count_y: u32,
    /// Thread groups along Z.
    pub group_count_z: u32,
}

impl DispatchIndirectArgs {
    /// Create dispatch arguments.
    pub fn new(group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Self {
        Self {
            group_count_x,
            group_count_y,
            group_count_z,
        }
    }
}

/// Arguments for an indirect non-indexed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct DrawIndirectArgs {
    /// Vertices per instance.
    pub vertex_count: u32,
    /// Number of instances.
    pub instance_count: u32,
    /// Index of the first vertex.
    pub first_vertex: u32,
    /// Index of the first instance.
    pub first_instance: u32,
}

impl DrawIndirectArgs {
    /// Create draw arguments.
    pub fn new(vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Self {
        Self {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        }
    }
}

/// Arguments for an indirect indexed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct DrawIndexedIndirectArgs {
    /// Indices per instance.
    pub index_count: u32,
    /// Number of instances.
    pub instance_count: u32,
    /// Index of the first index.
    pub first_index: u32,
    /// Signed value added to each index before vertex lookup.
    pub base_vertex: i32,
    /// Index of the first instance.
    pub first_instance: u32,
}

impl DrawIndexedIndirectArgs {
    /// Create indexed draw arguments.
    pub fn new(
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) -> Self {
        Self {
            index_count,
            instance_count,
            first_index,
            base_vertex,
            first_instance,
        }
    }
}

/// GPU virtual address range of a single shader record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ShaderRecordRange {
    /// GPU virtual address of the record start.
    pub start_address: u64,
    /// Size of the record in bytes.
    pub size: u64,
}

/// GPU virtual address range of a strided shader table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ShaderTableRange {
    /// GPU virtual address of the table start.
    pub start_address: u64,
    /// Size of the table in bytes.
    pub size: u64,
    /// Stride between consecutive records in bytes.
    pub stride: u64,
}

/// Arguments for an indirect ray dispatch.
///
/// The padding field (`_pad0`) is required for `bytemuck::Pod` because the
/// `u64` table addresses give the struct 8-byte alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct DispatchRaysIndirectArgs {
    /// Ray generation shader record.
    pub ray_generation_record: ShaderRecordRange,
    /// Miss shader table.
    pub miss_table: ShaderTableRange,
    /// Hit group table.
    pub hit_group_table: ShaderTableRange,
    /// Callable shader table.
    pub callable_table: ShaderTableRange,
    /// Ray grid width.
    pub width: u32,
    /// Ray grid height.
    pub height: u32,
    /// Ray grid depth.
    pub depth: u32,
    _pad0: u32,
}

impl DispatchRaysIndirectArgs {
    /// Create ray dispatch arguments from the shader tables and grid size.
    pub fn new(
        ray_generation_record: ShaderRecordRange,
        miss_table: ShaderTableRange,
        hit_group_table: ShaderTableRange,
        callable_table: ShaderTableRange,
        width: u32,
        height: u32,
        depth: u32,
    ) -> Self {
        Self {
            ray_generation_record,
            miss_table,
            hit_group_table,
            callable_table,
            width,
            height,
            depth,
            _pad0: 0,
        }
    }
}

const_assert_eq!(std::mem::size_of::<DispatchIndirectArgs>(), 12);
const_assert_eq!(std::mem::size_of::<DrawIndirectArgs>(), 16);
const_assert_eq!(std::mem::size_of::<DrawIndexedIndirectArgs>(), 20);
const_assert_eq!(std::mem::size_of::<DispatchRaysIndirectArgs>(), 104);

/// Descriptor for a pre-recorded indirect command buffer.
///
/// The device exposes one factory per encoder family; each checks that
/// `op_kind` belongs to that family.
#[derive(Debug, Clone)]
pub struct IndirectCommandBufferDescriptor {
    /// Debug name.
    pub label: Option<String>,
    /// Operation family every record encodes.
    pub op_kind: IndirectOpKind,
    /// Maximum number of argument records the buffer holds.
    pub max_command_count: u32,
}

impl IndirectCommandBufferDescriptor {
    /// Create a descriptor for `max_command_count` records of `op_kind`.
    pub fn new(op_kind: IndirectOpKind, max_command_count: u32) -> Self {
        Self {
            label: None,
            op_kind,
            max_command_count,
        }
    }

    /// Set the debug name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_strides_match_struct_sizes() {
        assert_eq!(IndirectOpKind::Draw.byte_stride(), 16);
        assert_eq!(IndirectOpKind::DrawIndexed.byte_stride(), 20);
        assert_eq!(IndirectOpKind::Dispatch.byte_stride(), 12);
        assert_eq!(IndirectOpKind::DispatchRays.byte_stride(), 104);
    }

    #[test]
    fn test_draw_args_field_order() {
        let args = DrawIndirectArgs::new(3, 1, 7, 2);
        let bytes = bytemuck::bytes_of(&args);
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..4], &3u32.to_ne_bytes());
        assert_eq!(&bytes[4..8], &1u32.to_ne_bytes());
        assert_eq!(&bytes[8..12], &7u32.to_ne_bytes());
        assert_eq!(&bytes[12..16], &2u32.to_ne_bytes());
    }

    #[test]
    fn test_indexed_draw_negative_base_vertex() {
        let args = DrawIndexedIndirectArgs::new(36, 1, 0, -4, 0);
        let bytes = bytemuck::bytes_of(&args);
        assert_eq!(&bytes[12..16], &(-4i32).to_ne_bytes());
    }

    #[test]
    fn test_dispatch_rays_grid_offset() {
        let args = DispatchRaysIndirectArgs::new(
            ShaderRecordRange {
                start_address: 0x1000,
                size: 64,
            },
            ShaderTableRange {
                start_address: 0x2000,
                size: 128,
                stride: 32,
            },
            ShaderTableRange {
                start_address: 0x3000,
                size: 256,
                stride: 64,
            },
            ShaderTableRange {
                start_address: 0,
                size: 0,
                stride: 0,
            },
            1920,
            1080,
            1,
        );
        let bytes = bytemuck::bytes_of(&args);
        assert_eq!(bytes.len(), 104);
        // Grid dimensions start after the 16-byte record and three
        // 24-byte tables.
        assert_eq!(&bytes[88..92], &1920u32.to_ne_bytes());
        assert_eq!(&bytes[92..96], &1080u32.to_ne_bytes());
        assert_eq!(&bytes[96..100], &1u32.to_ne_bytes());
    }
}
