//! GPU texture resource.

use std::sync::{Arc, Weak};

use crate::backend::GpuTexture;
use crate::descriptor::DescriptorAllocation;
use crate::device::Device;
use crate::types::{Extent3d, SwapChainDescriptor, TextureDescriptor, TextureFormat, TextureUsage};

/// A GPU texture resource.
///
/// Textures are created by [`Device::create_texture`] and are
/// reference-counted. They hold a weak reference back to their parent device.
/// Descriptor slots matching the usage flags (render target, depth stencil,
/// shader resource) are allocated at creation and returned to their heaps on
/// drop.
///
/// # Example
///
/// ```ignore
/// let texture = device.create_texture(&TextureDescriptor::new_2d(
///     1920, 1080,
///     TextureFormat::Rgba8Unorm,
///     TextureUsage::RENDER_TARGET,
/// ))?;
/// println!("Texture size: {}x{}", texture.width(), texture.height());
/// ```
pub struct Texture {
    device: Weak<Device>,
    descriptor: TextureDescriptor,
    gpu: GpuTexture,
    render_target_slot: Option<DescriptorAllocation>,
    depth_stencil_slot: Option<DescriptorAllocation>,
    shader_resource_slot: Option<DescriptorAllocation>,
}

impl Texture {
    /// Create a new texture (called by Device).
    pub(crate) fn new(
        device: Weak<Device>,
        descriptor: TextureDescriptor,
        gpu: GpuTexture,
        render_target_slot: Option<DescriptorAllocation>,
        depth_stencil_slot: Option<DescriptorAllocation>,
        shader_resource_slot: Option<DescriptorAllocation>,
    ) -> Self {
        Self {
            device,
            descriptor,
            gpu,
            render_target_slot,
            depth_stencil_slot,
            shader_resource_slot,
        }
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<Device>> {
        self.device.upgrade()
    }

    pub(crate) fn device_weak(&self) -> &Weak<Device> {
        &self.device
    }

    pub(crate) fn gpu(&self) -> &GpuTexture {
        &self.gpu
    }

    /// Get the texture descriptor.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    /// Get the texture size.
    pub fn size(&self) -> Extent3d {
        self.descriptor.size
    }

    /// Get the texture width.
    pub fn width(&self) -> u32 {
        self.descriptor.size.width
    }

    /// Get the texture height.
    pub fn height(&self) -> u32 {
        self.descriptor.size.height
    }

    /// Get the texture format.
    pub fn format(&self) -> TextureFormat {
        self.descriptor.format
    }

    /// Get the texture usage flags.
    pub fn usage(&self) -> TextureUsage {
        self.descriptor.usage
    }

    /// Get the texture label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Render-target heap slot, present when created with
    /// `TextureUsage::RENDER_TARGET`.
    pub fn render_target_slot(&self) -> Option<&DescriptorAllocation> {
        self.render_target_slot.as_ref()
    }

    /// Depth-stencil heap slot, present when created with
    /// `TextureUsage::DEPTH_STENCIL`.
    pub fn depth_stencil_slot(&self) -> Option<&DescriptorAllocation> {
        self.depth_stencil_slot.as_ref()
    }

    /// Shader-resource heap slot, present when created with
    /// `TextureUsage::SHADER_RESOURCE` or `TextureUsage::UNORDERED_ACCESS`.
    pub fn shader_resource_slot(&self) -> Option<&DescriptorAllocation> {
        self.shader_resource_slot.as_ref()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        // The heaps die with the device, so a dead backref means there is
        // nothing left to return the slots to.
        if let Some(device) = self.device.upgrade() {
            for slot in [
                self.render_target_slot.take(),
                self.depth_stencil_slot.take(),
                self.shader_resource_slot.take(),
            ]
            .into_iter()
            .flatten()
            {
                device.release_descriptor(&slot);
            }
        }
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("size", &self.descriptor.size)
            .field("format", &self.descriptor.format)
            .field("usage", &self.descriptor.usage)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// Ensure Texture is Send + Sync
static_assertions::assert_impl_all!(Texture: Send, Sync);

/// A presentation swap chain.
///
/// Created by [`Device::create_swap_chain`] on backends with a window
/// system; the headless Null backend refuses with `NotSupported`.
pub struct SwapChain {
    device: Weak<Device>,
    descriptor: SwapChainDescriptor,
}

impl SwapChain {
    /// Create a new swap chain (called by Device).
    pub(crate) fn new(device: Weak<Device>, descriptor: SwapChainDescriptor) -> Self {
        Self { device, descriptor }
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<Device>> {
        self.device.upgrade()
    }

    /// Get the swap chain descriptor.
    pub fn descriptor(&self) -> &SwapChainDescriptor {
        &self.descriptor
    }

    /// Get the backbuffer width.
    pub fn width(&self) -> u32 {
        self.descriptor.width
    }

    /// Get the backbuffer height.
    pub fn height(&self) -> u32 {
        self.descriptor.height
    }

    /// Get the backbuffer format.
    pub fn format(&self) -> TextureFormat {
        self.descriptor.format
    }
}

impl std::fmt::Debug for SwapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapChain")
            .field("width", &self.descriptor.width)
            .field("height", &self.descriptor.height)
            .field("format", &self.descriptor.format)
            .field("buffer_count", &self.descriptor.buffer_count)
            .finish()
    }
}

static_assertions::assert_impl_all!(SwapChain: Send, Sync);
