//! Pre-recorded indirect command buffers.
//!
//! An indirect command buffer pairs a device-cached signature with a
//! capacity; the argument records themselves live in GPU buffers filled
//! outside this crate. Each family replays only on the matching encoder
//! (`execute_indirect`).

use std::sync::{Arc, Weak};

use crate::device::Device;
use crate::signature::IndirectSignature;
use crate::types::{IndirectCommandBufferDescriptor, IndirectOpKind};

/// Indirect commands replayed by a compute encoder (dispatch records).
pub struct ComputeIndirectCommandBuffer {
    device: Weak<Device>,
    descriptor: IndirectCommandBufferDescriptor,
    signature: IndirectSignature,
}

impl ComputeIndirectCommandBuffer {
    /// Create a new indirect command buffer (called by Device).
    pub(crate) fn new(
        device: Weak<Device>,
        descriptor: IndirectCommandBufferDescriptor,
        signature: IndirectSignature,
    ) -> Self {
        Self {
            device,
            descriptor,
            signature,
        }
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<Device>> {
        self.device.upgrade()
    }

    pub(crate) fn device_weak(&self) -> &Weak<Device> {
        &self.device
    }

    /// Operation family the records execute.
    pub fn op_kind(&self) -> IndirectOpKind {
        self.descriptor.op_kind
    }

    /// Signature the records execute through.
    pub fn signature(&self) -> IndirectSignature {
        self.signature
    }

    /// Maximum number of records the buffer replays.
    pub fn max_command_count(&self) -> u32 {
        self.descriptor.max_command_count
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for ComputeIndirectCommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeIndirectCommandBuffer")
            .field("op_kind", &self.descriptor.op_kind)
            .field("max_command_count", &self.descriptor.max_command_count)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

/// Indirect commands replayed by a raster encoder (draw, indexed-draw, or
/// mesh-draw records; mesh draws use the dispatch group-count layout).
pub struct RasterIndirectCommandBuffer {
    device: Weak<Device>,
    descriptor: IndirectCommandBufferDescriptor,
    signature: IndirectSignature,
}

impl RasterIndirectCommandBuffer {
    /// Create a new indirect command buffer (called by Device).
    pub(crate) fn new(
        device: Weak<Device>,
        descriptor: IndirectCommandBufferDescriptor,
        signature: IndirectSignature,
    ) -> Self {
        Self {
            device,
            descriptor,
            signature,
        }
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<Device>> {
        self.device.upgrade()
    }

    pub(crate) fn device_weak(&self) -> &Weak<Device> {
        &self.device
    }

    /// Operation family the records execute.
    pub fn op_kind(&self) -> IndirectOpKind {
        self.descriptor.op_kind
    }

    /// Signature the records execute through.
    pub fn signature(&self) -> IndirectSignature {
        self.signature
    }

    /// Maximum number of records the buffer replays.
    pub fn max_command_count(&self) -> u32 {
        self.descriptor.max_command_count
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for RasterIndirectCommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterIndirectCommandBuffer")
            .field("op_kind", &self.descriptor.op_kind)
            .field("max_command_count", &self.descriptor.max_command_count)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

/// Indirect commands replayed by a raytracing encoder (dispatch-rays
/// records).
pub struct RaytracingIndirectCommandBuffer {
    device: Weak<Device>,
    descriptor: IndirectCommandBufferDescriptor,
    signature: IndirectSignature,
}

impl RaytracingIndirectCommandBuffer {
    /// Create a new indirect command buffer (called by Device).
    pub(crate) fn new(
        device: Weak<Device>,
        descriptor: IndirectCommandBufferDescriptor,
        signature: IndirectSignature,
    ) -> Self {
        Self {
            device,
            descriptor,
            signature,
        }
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<Device>> {
        self.device.upgrade()
    }

    pub(crate) fn device_weak(&self) -> &Weak<Device> {
        &self.device
    }

    /// Operation family the records execute.
    pub fn op_kind(&self) -> IndirectOpKind {
        self.descriptor.op_kind
    }

    /// Signature the records execute through.
    pub fn signature(&self) -> IndirectSignature {
        self.signature
    }

    /// Maximum number of records the buffer replays.
    pub fn max_command_count(&self) -> u32 {
        self.descriptor.max_command_count
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for RaytracingIndirectCommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaytracingIndirectCommandBuffer")
            .field("op_kind", &self.descriptor.op_kind)
            .field("max_command_count", &self.descriptor.max_command_count)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(ComputeIndirectCommandBuffer: Send, Sync);
static_assertions::assert_impl_all!(RasterIndirectCommandBuffer: Send, Sync);
static_assertions::assert_impl_all!(RaytracingIndirectCommandBuffer: Send, Sync);
