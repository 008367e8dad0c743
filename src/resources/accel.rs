//! Raytracing acceleration structures.

use std::sync::{Arc, Weak};

use crate::backend::GpuAccelStruct;
use crate::device::Device;
use crate::types::{BottomLevelAccelStructDescriptor, TopLevelAccelStructDescriptor};

/// A bottom-level acceleration structure over triangle geometry.
///
/// Creation allocates the structure; the geometry is built on the GPU
/// timeline by [`RaytracingEncoder::build_bottom_level`](crate::encoder::RaytracingEncoder::build_bottom_level).
pub struct BottomLevelAccelStruct {
    device: Weak<Device>,
    descriptor: BottomLevelAccelStructDescriptor,
    gpu: GpuAccelStruct,
}

impl BottomLevelAccelStruct {
    /// Create a new bottom-level structure (called by Device).
    pub(crate) fn new(
        device: Weak<Device>,
        descriptor: BottomLevelAccelStructDescriptor,
        gpu: GpuAccelStruct,
    ) -> Self {
        Self {
            device,
            descriptor,
            gpu,
        }
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<Device>> {
        self.device.upgrade()
    }

    pub(crate) fn device_weak(&self) -> &Weak<Device> {
        &self.device
    }

    pub(crate) fn gpu(&self) -> &GpuAccelStruct {
        &self.gpu
    }

    /// Get the structure descriptor.
    pub fn descriptor(&self) -> &BottomLevelAccelStructDescriptor {
        &self.descriptor
    }

    /// Number of geometry ranges the structure covers.
    pub fn geometry_count(&self) -> usize {
        self.descriptor.geometries.len()
    }

    /// Get the structure label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for BottomLevelAccelStruct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BottomLevelAccelStruct")
            .field("geometries", &self.descriptor.geometries.len())
            .field("label", &self.descriptor.label)
            .finish()
    }
}

/// A top-level acceleration structure over bottom-level instances.
pub struct TopLevelAccelStruct {
    device: Weak<Device>,
    descriptor: TopLevelAccelStructDescriptor,
    gpu: GpuAccelStruct,
}

impl TopLevelAccelStruct {
    /// Create a new top-level structure (called by Device).
    pub(crate) fn new(
        device: Weak<Device>,
        descriptor: TopLevelAccelStructDescriptor,
        gpu: GpuAccelStruct,
    ) -> Self {
        Self {
            device,
            descriptor,
            gpu,
        }
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<Device>> {
        self.device.upgrade()
    }

    pub(crate) fn device_weak(&self) -> &Weak<Device> {
        &self.device
    }

    pub(crate) fn gpu(&self) -> &GpuAccelStruct {
        &self.gpu
    }

    /// Get the structure descriptor.
    pub fn descriptor(&self) -> &TopLevelAccelStructDescriptor {
        &self.descriptor
    }

    /// Number of instances the structure references.
    pub fn instance_count(&self) -> usize {
        self.descriptor.instances.len()
    }

    /// Get the structure label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for TopLevelAccelStruct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopLevelAccelStruct")
            .field("instances", &self.descriptor.instances.len())
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(BottomLevelAccelStruct: Send, Sync);
static_assertions::assert_impl_all!(TopLevelAccelStruct: Send, Sync);
