//! GPU-visible descriptor heap allocation.
//!
//! Each heap kind gets one fixed-capacity allocator created with the device.
//! Allocation hands out the lowest free slot index and recomputes handle
//! values from the heap base on every call; indices are recycled through
//! `free` and never remapped.

use std::collections::BTreeSet;

use parking_lot::Mutex;

use crate::error::{RhiError, RhiResult};

// ============================================================================
// Heap Kinds
// ============================================================================

/// Descriptor heap families managed by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorHeapKind {
    /// Render target views. CPU-only.
    RenderTarget,
    /// Depth-stencil views. CPU-only.
    DepthStencil,
    /// Sampler states. Shader-visible.
    Sampler,
    /// Constant buffer, shader resource, and unordered access views.
    /// Shader-visible.
    ShaderResource,
}

impl DescriptorHeapKind {
    /// Heap capacity used at device creation.
    pub fn default_capacity(self) -> u32 {
        match self {
            Self::RenderTarget => 1024,
            Self::DepthStencil => 1024,
            Self::Sampler => 2048,
            Self::ShaderResource => 32768,
        }
    }

    /// Whether descriptors in this heap are addressable from shaders.
    ///
    /// Shader-visible heaps carry GPU handles; CPU-only heaps do not.
    pub fn shader_visible(self) -> bool {
        matches!(self, Self::Sampler | Self::ShaderResource)
    }
}

// ============================================================================
// Handles
// ============================================================================

/// CPU-side address of a descriptor slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CpuDescriptorHandle {
    /// Backend address value.
    pub ptr: u64,
}

/// GPU-side address of a descriptor slot in a shader-visible heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuDescriptorHandle {
    /// Backend address value.
    pub ptr: u64,
}

/// One allocated descriptor slot.
///
/// Returned by [`DescriptorAllocator::allocate`]; the index is owed back to
/// the same allocator through [`DescriptorAllocator::free`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorAllocation {
    /// Heap the slot belongs to.
    pub heap_kind: DescriptorHeapKind,
    /// Slot index within the heap.
    pub index: u32,
    /// CPU handle of the slot.
    pub cpu_handle: CpuDescriptorHandle,
    /// GPU handle of the slot; present only on shader-visible heaps.
    pub gpu_handle: Option<GpuDescriptorHandle>,
}

// ============================================================================
// Allocator
// ============================================================================

/// Slot bookkeeping behind the allocator mutex.
///
/// `recycled` holds only indices below `watermark`, so its smallest element
/// is always the lowest free index overall.
#[derive(Debug)]
struct AllocatorState {
    /// Next index that has never been handed out.
    watermark: u32,
    /// Freed indices available for reuse.
    recycled: BTreeSet<u32>,
}

/// Fixed-capacity slot allocator over one descriptor heap.
///
/// Thread-safe: recording threads allocate and free concurrently through a
/// single internal lock. The heap never grows; exhaustion is an error, not a
/// resize.
#[derive(Debug)]
pub struct DescriptorAllocator {
    kind: DescriptorHeapKind,
    capacity: u32,
    descriptor_size: u32,
    cpu_base: u64,
    gpu_base: Option<u64>,
    state: Mutex<AllocatorState>,
}

impl DescriptorAllocator {
    /// Create an allocator over a heap at `cpu_base`/`gpu_base` with
    /// `capacity` slots of `descriptor_size` bytes each.
    ///
    /// # Panics
    ///
    /// Panics if `gpu_base` presence disagrees with the heap kind's shader
    /// visibility.
    pub fn new(
        kind: DescriptorHeapKind,
        capacity: u32,
        descriptor_size: u32,
        cpu_base: u64,
        gpu_base: Option<u64>,
    ) -> Self {
        assert_eq!(
            gpu_base.is_some(),
            kind.shader_visible(),
            "gpu base must be provided exactly for shader-visible heaps, got {:?}",
            kind
        );
        log::debug!(
            "Created {:?} descriptor allocator: {} slots, descriptor size {}",
            kind,
            capacity,
            descriptor_size
        );
        Self {
            kind,
            capacity,
            descriptor_size,
            cpu_base,
            gpu_base,
            state: Mutex::new(AllocatorState {
                watermark: 0,
                recycled: BTreeSet::new(),
            }),
        }
    }

    /// Heap kind this allocator manages.
    pub fn kind(&self) -> DescriptorHeapKind {
        self.kind
    }

    /// Total slot capacity.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Allocate the lowest free slot.
    ///
    /// Handle values are recomputed from the heap base and the slot index on
    /// every call. Returns [`RhiError::DescriptorHeapExhausted`] when no slot
    /// is free.
    pub fn allocate(&self) -> RhiResult<DescriptorAllocation> {
        let index = {
            let mut state = self.state.lock();
            match state.recycled.pop_first() {
                Some(index) => index,
                None if state.watermark < self.capacity => {
                    let index = state.watermark;
                    state.watermark += 1;
                    index
                }
                None => {
                    return Err(RhiError::DescriptorHeapExhausted {
                        kind: self.kind,
                        capacity: self.capacity,
                    });
                }
            }
        };

        log::trace!("Allocated {:?} descriptor {}", self.kind, index);
        Ok(DescriptorAllocation {
            heap_kind: self.kind,
            index,
            cpu_handle: self.cpu_handle_at(index),
            gpu_handle: self.gpu_handle_at(index),
        })
    }

    /// Return `index` to the free pool.
    ///
    /// Returns [`RhiError::InvalidDescriptorFree`] when the index is out of
    /// range, was never allocated, or is already free.
    pub fn free(&self, index: u32) -> RhiResult<()> {
        let mut state = self.state.lock();
        let live = index < self.capacity
            && index < state.watermark
            && !state.recycled.contains(&index);
        if !live {
            return Err(RhiError::InvalidDescriptorFree {
                kind: self.kind,
                index,
            });
        }
        state.recycled.insert(index);
        log::trace!("Freed {:?} descriptor {}", self.kind, index);
        Ok(())
    }

    /// Number of slots currently allocated.
    pub fn allocated_count(&self) -> u32 {
        let state = self.state.lock();
        state.watermark - state.recycled.len() as u32
    }

    fn cpu_handle_at(&self, index: u32) -> CpuDescriptorHandle {
        CpuDescriptorHandle {
            ptr: self.cpu_base + u64::from(index) * u64::from(self.descriptor_size),
        }
    }

    fn gpu_handle_at(&self, index: u32) -> Option<GpuDescriptorHandle> {
        self.gpu_base.map(|base| GpuDescriptorHandle {
            ptr: base + u64::from(index) * u64::from(self.descriptor_size),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_allocator(capacity: u32) -> DescriptorAllocator {
        DescriptorAllocator::new(
            DescriptorHeapKind::RenderTarget,
            capacity,
            32,
            0x1000,
            None,
        )
    }

    #[test]
    fn test_allocates_lowest_free_index() {
        let allocator = test_allocator(8);
        assert_eq!(allocator.allocate().unwrap().index, 0);
        assert_eq!(allocator.allocate().unwrap().index, 1);
        assert_eq!(allocator.allocate().unwrap().index, 2);

        allocator.free(1).unwrap();
        assert_eq!(allocator.allocate().unwrap().index, 1);
        assert_eq!(allocator.allocate().unwrap().index, 3);
    }

    #[test]
    fn test_handles_recomputed_from_base() {
        let allocator = DescriptorAllocator::new(
            DescriptorHeapKind::ShaderResource,
            16,
            64,
            0x10_0000,
            Some(0x20_0000),
        );
        let a = allocator.allocate().unwrap();
        let b = allocator.allocate().unwrap();
        assert_eq!(a.cpu_handle.ptr, 0x10_0000);
        assert_eq!(b.cpu_handle.ptr, 0x10_0000 + 64);
        assert_eq!(b.gpu_handle.unwrap().ptr, 0x20_0000 + 64);

        // Recycled slots get identical handle values back.
        allocator.free(0).unwrap();
        let again = allocator.allocate().unwrap();
        assert_eq!(again.index, 0);
        assert_eq!(again.cpu_handle, a.cpu_handle);
        assert_eq!(again.gpu_handle, a.gpu_handle);
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let allocator = test_allocator(2);
        allocator.allocate().unwrap();
        allocator.allocate().unwrap();
        let err = allocator.allocate().unwrap_err();
        assert!(matches!(
            err,
            RhiError::DescriptorHeapExhausted {
                kind: DescriptorHeapKind::RenderTarget,
                capacity: 2,
            }
        ));

        // Freeing makes the same capacity available again.
        allocator.free(0).unwrap();
        assert_eq!(allocator.allocate().unwrap().index, 0);
    }

    #[test]
    fn test_invalid_frees() {
        let allocator = test_allocator(4);
        let a = allocator.allocate().unwrap();

        // Out of range.
        assert!(allocator.free(4).is_err());
        // Never allocated.
        assert!(allocator.free(2).is_err());
        // Double free.
        allocator.free(a.index).unwrap();
        let err = allocator.free(a.index).unwrap_err();
        assert!(matches!(err, RhiError::InvalidDescriptorFree { index: 0, .. }));
    }

    #[test]
    fn test_gpu_handles_only_on_shader_visible_heaps() {
        let rtv = test_allocator(4);
        assert!(rtv.allocate().unwrap().gpu_handle.is_none());

        let sampler = DescriptorAllocator::new(
            DescriptorHeapKind::Sampler,
            4,
            16,
            0x4000,
            Some(0x8000),
        );
        assert!(sampler.allocate().unwrap().gpu_handle.is_some());
    }

    #[test]
    fn test_allocated_count_tracks_frees() {
        let allocator = test_allocator(8);
        let allocations: Vec<_> = (0..5).map(|_| allocator.allocate().unwrap()).collect();
        assert_eq!(allocator.allocated_count(), 5);
        allocator.free(allocations[2].index).unwrap();
        allocator.free(allocations[4].index).unwrap();
        assert_eq!(allocator.allocated_count(), 3);
    }
}
