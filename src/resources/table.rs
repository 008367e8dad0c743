//! Resource tables and raytracing function tables.

use std::sync::{Arc, Weak};

use crate::descriptor::DescriptorAllocation;
use crate::device::Device;
use crate::resources::RaytracingPipeline;
use crate::types::{
    FunctionTableDescriptor, ResourceTableDescriptor, ResourceTableLayoutDescriptor,
};

// ============================================================================
// Resource Table Layout
// ============================================================================

/// The binding slots a resource table exposes to shaders.
///
/// Layouts carry no backend state; the same layout can be shared by many
/// tables and pipeline layouts.
pub struct ResourceTableLayout {
    descriptor: ResourceTableLayoutDescriptor,
}

impl ResourceTableLayout {
    /// Create a new resource table layout (called by Device).
    pub(crate) fn new(descriptor: ResourceTableLayoutDescriptor) -> Self {
        Self { descriptor }
    }

    /// Get the layout descriptor.
    pub fn descriptor(&self) -> &ResourceTableLayoutDescriptor {
        &self.descriptor
    }

    /// Total descriptors a table with this layout occupies, counting
    /// array slots.
    pub fn descriptor_count(&self) -> u32 {
        self.descriptor.descriptor_count()
    }

    /// Get the layout label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for ResourceTableLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceTableLayout")
            .field("slots", &self.descriptor.slots.len())
            .field("descriptor_count", &self.descriptor_count())
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// ============================================================================
// Resource Table
// ============================================================================

/// A table of shader-visible descriptor slots bound as one unit.
///
/// Tables are created by [`Device::create_resource_table`]; creation
/// reserves one shader-visible heap slot per descriptor the layout
/// declares (sampler slots from the sampler heap, everything else from
/// the shader-resource heap). The slots are returned on drop.
pub struct ResourceTable {
    device: Weak<Device>,
    layout: Arc<ResourceTableLayout>,
    label: Option<String>,
    slots: Vec<DescriptorAllocation>,
}

impl ResourceTable {
    /// Create a new resource table (called by Device).
    pub(crate) fn new(
        device: Weak<Device>,
        descriptor: ResourceTableDescriptor,
        slots: Vec<DescriptorAllocation>,
    ) -> Self {
        Self {
            device,
            layout: descriptor.layout,
            label: descriptor.label,
            slots,
        }
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<Device>> {
        self.device.upgrade()
    }

    pub(crate) fn device_weak(&self) -> &Weak<Device> {
        &self.device
    }

    /// Layout the table was created with.
    pub fn layout(&self) -> &Arc<ResourceTableLayout> {
        &self.layout
    }

    /// Heap slots the table occupies, in layout order.
    pub fn slots(&self) -> &[DescriptorAllocation] {
        &self.slots
    }

    /// Get the table label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl Drop for ResourceTable {
    fn drop(&mut self) {
        if let Some(device) = self.device.upgrade() {
            for slot in self.slots.drain(..) {
                device.release_descriptor(&slot);
            }
        }
    }
}

impl std::fmt::Debug for ResourceTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceTable")
            .field("slots", &self.slots.len())
            .field("label", &self.label)
            .finish()
    }
}

// ============================================================================
// Function Table
// ============================================================================

/// The shader-binding table a raytracing dispatch reads its records from.
///
/// Each `dispatch_rays` names the function table holding the
/// ray-generation, miss, hit-group, and callable records for that launch.
pub struct FunctionTable {
    device: Weak<Device>,
    pipeline: Arc<RaytracingPipeline>,
    label: Option<String>,
}

impl FunctionTable {
    /// Create a new function table (called by Device).
    pub(crate) fn new(device: Weak<Device>, descriptor: FunctionTableDescriptor) -> Self {
        Self {
            device,
            pipeline: descriptor.pipeline,
            label: descriptor.label,
        }
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<Device>> {
        self.device.upgrade()
    }

    pub(crate) fn device_weak(&self) -> &Weak<Device> {
        &self.device
    }

    /// Raytracing pipeline the table records functions of.
    pub fn pipeline(&self) -> &Arc<RaytracingPipeline> {
        &self.pipeline
    }

    /// Get the table label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl std::fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTable")
            .field("pipeline", &self.pipeline.label())
            .field("label", &self.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(ResourceTableLayout: Send, Sync);
static_assertions::assert_impl_all!(ResourceTable: Send, Sync);
static_assertions::assert_impl_all!(FunctionTable: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ResourceBindingKind, ResourceBindingSlot};

    #[test]
    fn test_layout_descriptor_count_sums_array_slots() {
        let desc = ResourceTableLayoutDescriptor::new(vec![
            ResourceBindingSlot::new(0, ResourceBindingKind::ConstantBuffer),
            ResourceBindingSlot::new(1, ResourceBindingKind::ShaderResource).with_count(4),
        ]);
        let layout = ResourceTableLayout::new(desc);
        assert_eq!(layout.descriptor_count(), 5);
    }

    #[test]
    fn test_table_without_device_holds_no_slots() {
        let layout = Arc::new(ResourceTableLayout::new(ResourceTableLayoutDescriptor::new(
            vec![ResourceBindingSlot::new(0, ResourceBindingKind::Sampler)],
        )));
        let table = ResourceTable::new(
            Weak::new(),
            ResourceTableDescriptor::new(layout),
            Vec::new(),
        );
        assert!(table.slots().is_empty());
        assert!(table.device().is_none());
    }
}
