//! Pass descriptors and query bindings.
//!
//! A pass descriptor is a plain value constructed by the caller and consumed
//! when the pass begins; encoders never retain it afterwards.

use std::sync::Arc;

use super::attachment::{ColorAttachmentDescriptor, DepthStencilAttachmentDescriptor, SubPassDescriptor};
use super::common::SampleCount;
use crate::resources::{Query, Texture};

// ============================================================================
// Query Bindings
// ============================================================================

/// Timestamp query binding for a pass.
///
/// The encoder writes `begin_index` when the pass begins and `end_index`
/// when it ends.
#[derive(Debug, Clone)]
pub struct TimestampBinding {
    /// Timestamp query heap receiving the writes.
    pub query: Arc<Query>,
    /// Slot written at pass begin.
    pub begin_index: u32,
    /// Slot written at pass end.
    pub end_index: u32,
}

impl TimestampBinding {
    /// Bind `query`, writing `begin_index` and `end_index` at the pass
    /// boundaries.
    pub fn new(query: Arc<Query>, begin_index: u32, end_index: u32) -> Self {
        Self {
            query,
            begin_index,
            end_index,
        }
    }
}

/// Occlusion query binding for a raster pass.
#[derive(Debug, Clone)]
pub struct OcclusionBinding {
    /// Occlusion query heap scoped by begin/end occlusion calls.
    pub query: Arc<Query>,
}

impl OcclusionBinding {
    /// Bind `query` for occlusion scopes recorded inside the pass.
    pub fn new(query: Arc<Query>) -> Self {
        Self { query }
    }
}

/// Pipeline-statistics query binding for a pass.
#[derive(Debug, Clone)]
pub struct StatisticsBinding {
    /// Statistics query heap scoped by begin/end statistics calls.
    pub query: Arc<Query>,
    /// Slot receiving the accumulated statistics.
    pub write_index: u32,
}

impl StatisticsBinding {
    /// Bind `query`, accumulating into `write_index`.
    pub fn new(query: Arc<Query>, write_index: u32) -> Self {
        Self { query, write_index }
    }
}

// ============================================================================
// Shading Rate
// ============================================================================

/// Coarse shading rate applied to rasterized fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShadingRate {
    /// One shading sample per pixel.
    #[default]
    Rate1x1,
    Rate1x2,
    Rate2x1,
    Rate2x2,
    Rate2x4,
    Rate4x2,
    Rate4x4,
}

/// How per-draw, per-primitive, and image-based shading rates combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShadingRateCombiner {
    /// Keep the previous-stage rate.
    #[default]
    Passthrough,
    /// Replace with the new rate.
    Override,
    /// Take the finer of the two rates.
    Min,
    /// Take the coarser of the two rates.
    Max,
}

// ============================================================================
// Pass Descriptors
// ============================================================================

/// Configuration for a transfer pass.
#[derive(Debug, Clone, Default)]
pub struct TransferPassDescriptor {
    /// Debug name of the pass.
    pub name: String,
    /// Optional pass-boundary timestamp writes.
    pub timestamp: Option<TimestampBinding>,
}

impl TransferPassDescriptor {
    /// Create a transfer pass descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamp: None,
        }
    }

    /// Write pass-boundary timestamps into `binding`.
    pub fn with_timestamp(mut self, binding: TimestampBinding) -> Self {
        self.timestamp = Some(binding);
        self
    }
}

/// Configuration for a compute pass.
#[derive(Debug, Clone, Default)]
pub struct ComputePassDescriptor {
    /// Debug name of the pass.
    pub name: String,
    /// Optional pass-boundary timestamp writes.
    pub timestamp: Option<TimestampBinding>,
    /// Optional pipeline-statistics scope.
    pub statistics: Option<StatisticsBinding>,
}

impl ComputePassDescriptor {
    /// Create a compute pass descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamp: None,
            statistics: None,
        }
    }

    /// Write pass-boundary timestamps into `binding`.
    pub fn with_timestamp(mut self, binding: TimestampBinding) -> Self {
        self.timestamp = Some(binding);
        self
    }

    /// Allow statistics scopes against `binding` inside the pass.
    pub fn with_statistics(mut self, binding: StatisticsBinding) -> Self {
        self.statistics = Some(binding);
        self
    }
}

/// Configuration for a raytracing pass.
#[derive(Debug, Clone, Default)]
pub struct RaytracingPassDescriptor {
    /// Debug name of the pass.
    pub name: String,
    /// Optional pass-boundary timestamp writes.
    pub timestamp: Option<TimestampBinding>,
    /// Optional pipeline-statistics scope.
    pub statistics: Option<StatisticsBinding>,
}

impl RaytracingPassDescriptor {
    /// Create a raytracing pass descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamp: None,
            statistics: None,
        }
    }

    /// Write pass-boundary timestamps into `binding`.
    pub fn with_timestamp(mut self, binding: TimestampBinding) -> Self {
        self.timestamp = Some(binding);
        self
    }

    /// Allow statistics scopes against `binding` inside the pass.
    pub fn with_statistics(mut self, binding: StatisticsBinding) -> Self {
        self.statistics = Some(binding);
        self
    }
}

/// Configuration for a raster pass.
///
/// When `sub_passes` is empty the pass runs as a single implicit sub-pass
/// writing every color attachment.
#[derive(Debug, Clone, Default)]
pub struct RasterPassDescriptor {
    /// Debug name of the pass.
    pub name: String,
    /// Number of render-target array slices rendered per draw.
    pub array_length: u32,
    /// MSAA sample count of the attachment set.
    pub sample_count: SampleCount,
    /// Optional pass-boundary timestamp writes.
    pub timestamp: Option<TimestampBinding>,
    /// Optional occlusion scope.
    pub occlusion: Option<OcclusionBinding>,
    /// Optional pipeline-statistics scope.
    pub statistics: Option<StatisticsBinding>,
    /// Optional image driving per-region shading rate.
    pub shading_rate_texture: Option<Arc<Texture>>,
    /// Color attachments, at most [`MAX_COLOR_ATTACHMENTS`].
    ///
    /// [`MAX_COLOR_ATTACHMENTS`]: super::attachment::MAX_COLOR_ATTACHMENTS
    pub color_attachments: Vec<ColorAttachmentDescriptor>,
    /// Optional depth-stencil attachment.
    pub depth_stencil_attachment: Option<DepthStencilAttachmentDescriptor>,
    /// Declared sub-passes, advanced through in order.
    pub sub_passes: Vec<SubPassDescriptor>,
}

impl RasterPassDescriptor {
    /// Create a raster pass descriptor with no attachments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            array_length: 1,
            sample_count: SampleCount::One,
            ..Default::default()
        }
    }

    /// Append a color attachment.
    pub fn with_color_attachment(mut self, attachment: ColorAttachmentDescriptor) -> Self {
        self.color_attachments.push(attachment);
        self
    }

    /// Set the depth-stencil attachment.
    pub fn with_depth_stencil(mut self, attachment: DepthStencilAttachmentDescriptor) -> Self {
        self.depth_stencil_attachment = Some(attachment);
        self
    }

    /// Append a sub-pass.
    pub fn with_sub_pass(mut self, sub_pass: SubPassDescriptor) -> Self {
        self.sub_passes.push(sub_pass);
        self
    }

    /// Set the MSAA sample count.
    pub fn with_sample_count(mut self, sample_count: SampleCount) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Set the rendered array slice count.
    pub fn with_array_length(mut self, array_length: u32) -> Self {
        self.array_length = array_length;
        self
    }

    /// Write pass-boundary timestamps into `binding`.
    pub fn with_timestamp(mut self, binding: TimestampBinding) -> Self {
        self.timestamp = Some(binding);
        self
    }

    /// Allow occlusion scopes against `binding` inside the pass.
    pub fn with_occlusion(mut self, binding: OcclusionBinding) -> Self {
        self.occlusion = Some(binding);
        self
    }

    /// Allow statistics scopes against `binding` inside the pass.
    pub fn with_statistics(mut self, binding: StatisticsBinding) -> Self {
        self.statistics = Some(binding);
        self
    }

    /// Drive per-region shading rate from `texture`.
    pub fn with_shading_rate_texture(mut self, texture: Arc<Texture>) -> Self {
        self.shading_rate_texture = Some(texture);
        self
    }

    /// Number of sub-passes the encoder will advance through.
    ///
    /// A pass with no declared sub-passes still runs one implicit sub-pass.
    pub fn sub_pass_count(&self) -> usize {
        self.sub_passes.len().max(1)
    }
}
