//! Buffer types and descriptors.

use std::sync::Arc;

use bitflags::bitflags;

use crate::resources::Buffer;

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 1;
        /// Buffer can be used as a constant/uniform buffer.
        const UNIFORM = 1 << 2;
        /// Buffer can be used as a storage buffer.
        const STORAGE = 1 << 3;
        /// Buffer can hold indirect argument records.
        const INDIRECT = 1 << 4;
        /// Buffer can be copied from.
        const COPY_SRC = 1 << 5;
        /// Buffer can be copied to.
        const COPY_DST = 1 << 6;
        /// Buffer is mappable for CPU reads.
        const MAP_READ = 1 << 7;
        /// Buffer is mappable for CPU writes.
        const MAP_WRITE = 1 << 8;
        /// Buffer backs acceleration structure storage.
        const ACCEL_STRUCT = 1 << 9;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Resource state of a buffer, declared in explicit memory barriers.
///
/// The RHI never infers transitions; a barrier names both the state the
/// buffer is leaving and the state it is entering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferState {
    /// No pending access.
    #[default]
    Common,
    /// Source of a copy operation.
    CopySrc,
    /// Destination of a copy operation.
    CopyDst,
    /// Bound as an index buffer.
    IndexBuffer,
    /// Bound as a vertex or constant buffer.
    VertexOrConstantBuffer,
    /// Read as a shader resource.
    ShaderResource,
    /// Read and written as an unordered-access resource.
    UnorderedAccess,
    /// Read as indirect arguments.
    IndirectArgument,
    /// Read during acceleration structure builds.
    AccelStructRead,
    /// Written during acceleration structure builds.
    AccelStructWrite,
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// One side of a buffer/texture copy, addressing linear buffer memory.
///
/// `bytes_per_row` and `rows_per_image` describe the row-major footprint the
/// texture data occupies in the buffer.
#[derive(Debug, Clone)]
pub struct BufferCopyView {
    /// Buffer holding the copied bytes.
    pub buffer: Arc<Buffer>,
    /// Byte offset of the first texel row.
    pub offset: u64,
    /// Stride in bytes between texel rows.
    pub bytes_per_row: u32,
    /// Rows per image slice, for 3D and array copies.
    pub rows_per_image: u32,
}

impl BufferCopyView {
    /// Create a copy view starting at `offset` with the given row stride.
    pub fn new(buffer: Arc<Buffer>, offset: u64, bytes_per_row: u32, rows_per_image: u32) -> Self {
        Self {
            buffer,
            offset,
            bytes_per_row,
            rows_per_image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_descriptor_builder() {
        let desc = BufferDescriptor::new(4096, BufferUsage::STORAGE | BufferUsage::COPY_DST)
            .with_label("particles");
        assert_eq!(desc.size, 4096);
        assert!(desc.usage.contains(BufferUsage::STORAGE));
        assert_eq!(desc.label.as_deref(), Some("particles"));
    }

    #[test]
    fn test_buffer_usage_default_empty() {
        assert_eq!(BufferUsage::default(), BufferUsage::empty());
    }
}
