//! GPU sampler resource.

use std::sync::{Arc, Weak};

use crate::backend::GpuSampler;
use crate::descriptor::DescriptorAllocation;
use crate::device::Device;
use crate::types::SamplerDescriptor;

/// A GPU texture sampler.
///
/// Samplers are created by [`Device::create_sampler`] and are
/// reference-counted. They hold a weak reference back to their parent device
/// and one slot in the shader-visible sampler heap, returned on drop.
///
/// # Example
///
/// ```ignore
/// let sampler = device.create_sampler(&SamplerDescriptor::linear())?;
/// ```
pub struct Sampler {
    device: Weak<Device>,
    descriptor: SamplerDescriptor,
    gpu: GpuSampler,
    slot: Option<DescriptorAllocation>,
}

impl Sampler {
    /// Create a new sampler (called by Device).
    pub(crate) fn new(
        device: Weak<Device>,
        descriptor: SamplerDescriptor,
        gpu: GpuSampler,
        slot: Option<DescriptorAllocation>,
    ) -> Self {
        Self {
            device,
            descriptor,
            gpu,
            slot,
        }
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<Device>> {
        self.device.upgrade()
    }

    pub(crate) fn gpu(&self) -> &GpuSampler {
        &self.gpu
    }

    /// Get the sampler descriptor.
    pub fn descriptor(&self) -> &SamplerDescriptor {
        &self.descriptor
    }

    /// Get the sampler label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Sampler heap slot the sampler occupies.
    pub fn slot(&self) -> Option<&DescriptorAllocation> {
        self.slot.as_ref()
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        if let Some(device) = self.device.upgrade() {
            if let Some(slot) = self.slot.take() {
                device.release_descriptor(&slot);
            }
        }
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("mag_filter", &self.descriptor.mag_filter)
            .field("min_filter", &self.descriptor.min_filter)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// Ensure Sampler is Send + Sync
static_assertions::assert_impl_all!(Sampler: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_debug() {
        let desc = SamplerDescriptor::linear();
        let sampler = Sampler::new(Weak::new(), desc, GpuSampler::Null, None);
        let debug = format!("{:?}", sampler);
        assert!(debug.contains("Sampler"));
        assert!(debug.contains("Linear"));
    }

    #[test]
    fn test_sampler_label() {
        let desc = SamplerDescriptor::linear().with_label("test_sampler");
        let sampler = Sampler::new(Weak::new(), desc, GpuSampler::Null, None);
        assert_eq!(sampler.label(), Some("test_sampler"));
    }
}
