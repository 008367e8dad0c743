//! Texture types and descriptors.

use std::sync::Arc;

use bitflags::bitflags;

use super::common::{Extent3d, Origin3d, SampleCount};
use crate::resources::Texture;

/// Texture format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TextureFormat {
    // 8-bit formats
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,
    /// 8-bit red channel, unsigned integer.
    R8Uint,

    // 16-bit formats
    /// 16-bit red channel, float.
    R16Float,
    /// 8-bit RG channels, unsigned normalized.
    Rg8Unorm,

    // 32-bit formats
    /// 32-bit red channel, float.
    R32Float,
    /// 32-bit red channel, unsigned integer.
    R32Uint,
    /// 16-bit RG channels, float.
    Rg16Float,
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// 10-bit RGB with 2-bit alpha, unsigned normalized.
    Rgb10a2Unorm,
    /// 11-bit RG with 10-bit B, float.
    Rg11b10Float,

    // 64-bit formats
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 32-bit RG channels, float.
    Rg32Float,

    // 128-bit formats
    /// 32-bit RGBA channels, float.
    Rgba32Float,

    // Depth/stencil formats
    /// 16-bit depth.
    Depth16Unorm,
    /// 24-bit depth with 8-bit stencil.
    Depth24Stencil8,
    /// 32-bit depth, float.
    Depth32Float,
    /// 32-bit depth float with 8-bit stencil.
    Depth32FloatStencil8,
}

impl TextureFormat {
    /// Returns true if this is a depth or stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        matches!(
            self,
            Self::Depth16Unorm
                | Self::Depth24Stencil8
                | Self::Depth32Float
                | Self::Depth32FloatStencil8
        )
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::Depth24Stencil8 | Self::Depth32FloatStencil8)
    }

    /// Returns the size in bytes per pixel.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::R8Unorm | Self::R8Uint => 1,
            Self::R16Float | Self::Rg8Unorm | Self::Depth16Unorm => 2,
            Self::R32Float
            | Self::R32Uint
            | Self::Rg16Float
            | Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Bgra8Unorm
            | Self::Rgb10a2Unorm
            | Self::Rg11b10Float
            | Self::Depth24Stencil8
            | Self::Depth32Float => 4,
            Self::Rgba16Float | Self::Rg32Float | Self::Depth32FloatStencil8 => 8,
            Self::Rgba32Float => 16,
        }
    }
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be copied from.
        const COPY_SRC = 1 << 0;
        /// Texture can be copied to.
        const COPY_DST = 1 << 1;
        /// Texture can be sampled in a shader.
        const SHADER_RESOURCE = 1 << 2;
        /// Texture can be written as an unordered-access resource.
        const UNORDERED_ACCESS = 1 << 3;
        /// Texture can be bound as a color render target.
        const RENDER_TARGET = 1 << 4;
        /// Texture can be bound as a depth-stencil target.
        const DEPTH_STENCIL = 1 << 5;
        /// Texture drives per-region shading rate in a raster pass.
        const SHADING_RATE = 1 << 6;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Resource state of a texture, declared in explicit memory barriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureState {
    /// No pending access.
    #[default]
    Common,
    /// Source of a copy operation.
    CopySrc,
    /// Destination of a copy operation.
    CopyDst,
    /// Read as a shader resource.
    ShaderResource,
    /// Read and written as an unordered-access resource.
    UnorderedAccess,
    /// Bound as a color render target.
    RenderTarget,
    /// Bound as a read-write depth target.
    DepthWrite,
    /// Bound as a read-only depth target.
    DepthRead,
    /// Source of an MSAA resolve.
    ResolveSrc,
    /// Destination of an MSAA resolve.
    ResolveDst,
    /// Read as a shading-rate source.
    ShadingRate,
    /// Presented by a swap chain.
    Present,
}

/// Descriptor for creating a texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    /// Size of the texture.
    pub size: Extent3d,
    /// Number of array slices.
    pub array_layers: u32,
    /// Mip level count.
    pub mip_level_count: u32,
    /// Sample count for multisampling.
    pub sample_count: SampleCount,
    /// Texture format.
    pub format: TextureFormat,
    /// Usage flags.
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Create a new 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            size: Extent3d::new_2d(width, height),
            array_layers: 1,
            mip_level_count: 1,
            sample_count: SampleCount::One,
            format,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the number of array slices.
    pub fn with_array_layers(mut self, layers: u32) -> Self {
        self.array_layers = layers;
        self
    }

    /// Set the mip level count.
    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_level_count = count;
        self
    }

    /// Set the sample count for multisampling.
    pub fn with_sample_count(mut self, count: SampleCount) -> Self {
        self.sample_count = count;
        self
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            size: Extent3d::default(),
            array_layers: 1,
            mip_level_count: 1,
            sample_count: SampleCount::One,
            format: TextureFormat::default(),
            usage: TextureUsage::empty(),
        }
    }
}

/// One side of a buffer/texture or texture/texture copy, addressing a
/// texture sub-resource region.
#[derive(Debug, Clone)]
pub struct TextureCopyView {
    /// Texture holding the copied texels.
    pub texture: Arc<Texture>,
    /// Mip level being copied.
    pub mip_level: u32,
    /// First array slice being copied.
    pub base_slice: u32,
    /// Number of array slices being copied.
    pub slice_count: u32,
    /// Texel origin of the copied region.
    pub origin: Origin3d,
}

impl TextureCopyView {
    /// Create a copy view of mip 0, slice 0, origin (0, 0, 0).
    pub fn new(texture: Arc<Texture>) -> Self {
        Self {
            texture,
            mip_level: 0,
            base_slice: 0,
            slice_count: 1,
            origin: Origin3d::ZERO,
        }
    }

    /// Select the copied mip level.
    pub fn with_mip_level(mut self, mip_level: u32) -> Self {
        self.mip_level = mip_level;
        self
    }

    /// Select the copied array slice range.
    pub fn with_slices(mut self, base_slice: u32, slice_count: u32) -> Self {
        self.base_slice = base_slice;
        self.slice_count = slice_count;
        self
    }

    /// Set the texel origin of the copied region.
    pub fn with_origin(mut self, origin: Origin3d) -> Self {
        self.origin = origin;
        self
    }
}

// ============================================================================
// Swap Chain
// ============================================================================

/// Presentation scheduling mode of a swap chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresentMode {
    /// Vertical-sync queued presentation.
    #[default]
    Fifo,
    /// Low-latency presentation replacing queued images.
    Mailbox,
    /// Immediate presentation, tearing allowed.
    Immediate,
}

/// Descriptor for a swap chain over a native window surface.
///
/// Only native backends can present; the headless backend rejects swap
/// chain creation.
#[derive(Debug, Clone)]
pub struct SwapChainDescriptor {
    /// Debug name.
    pub label: Option<String>,
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    /// Format of the backbuffer images.
    pub format: TextureFormat,
    /// Number of backbuffer images.
    pub buffer_count: u32,
    /// Presentation scheduling mode.
    pub present_mode: PresentMode,
}

impl SwapChainDescriptor {
    /// Create a double-buffered FIFO swap chain descriptor.
    pub fn new(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            label: None,
            width,
            height,
            format,
            buffer_count: 2,
            present_mode: PresentMode::Fifo,
        }
    }

    /// Set the debug name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the backbuffer image count.
    pub fn with_buffer_count(mut self, buffer_count: u32) -> Self {
        self.buffer_count = buffer_count;
        self
    }

    /// Set the presentation mode.
    pub fn with_present_mode(mut self, present_mode: PresentMode) -> Self {
        self.present_mode = present_mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_format_classification() {
        assert!(TextureFormat::Depth32Float.is_depth_stencil());
        assert!(!TextureFormat::Depth32Float.has_stencil());
        assert!(TextureFormat::Depth24Stencil8.has_stencil());
        assert!(!TextureFormat::Rgba8Unorm.is_depth_stencil());
    }

    #[test]
    fn test_block_sizes() {
        assert_eq!(TextureFormat::R8Unorm.block_size(), 1);
        assert_eq!(TextureFormat::Rgba8Unorm.block_size(), 4);
        assert_eq!(TextureFormat::Rgba32Float.block_size(), 16);
    }

    #[test]
    fn test_texture_descriptor_builder() {
        let desc = TextureDescriptor::new_2d(
            256,
            256,
            TextureFormat::Rgba16Float,
            TextureUsage::RENDER_TARGET | TextureUsage::SHADER_RESOURCE,
        )
        .with_mip_levels(4)
        .with_array_layers(6)
        .with_label("env_probe");
        assert_eq!(desc.mip_level_count, 4);
        assert_eq!(desc.array_layers, 6);
        assert_eq!(desc.size.depth, 1);
    }
}
