//! Common types and descriptors for RHI resources and passes.
//!
//! This module contains format enums, usage flags, descriptor structs, and
//! the indirect-argument wire structs used throughout the RHI.

mod attachment;
mod buffer;
mod common;
mod indirect;
mod pass;
mod pipeline;
mod query;
mod sampler;
mod texture;

pub use attachment::{
    AttachmentIndexList, ColorAttachmentDescriptor, DepthStencilAttachmentDescriptor, LoadAction,
    ResolveMode, StoreAction, SubPassDescriptor, SubPassFlags, MAX_COLOR_ATTACHMENTS,
};
pub use buffer::{BufferCopyView, BufferDescriptor, BufferState, BufferUsage};
pub use common::{Extent3d, Origin3d, SampleCount, ScissorRect, Viewport};
pub use indirect::{
    DispatchIndirectArgs, DispatchRaysIndirectArgs, DrawIndexedIndirectArgs, DrawIndirectArgs,
    IndirectCommandBufferDescriptor, IndirectOpKind, ShaderRecordRange, ShaderTableRange,
};
pub use pass::{
    ComputePassDescriptor, OcclusionBinding, RasterPassDescriptor, RaytracingPassDescriptor,
    ShadingRate, ShadingRateCombiner, StatisticsBinding, TimestampBinding,
    TransferPassDescriptor,
};
pub use pipeline::{
    AccelGeometryDescriptor, AccelInstanceDescriptor, BottomLevelAccelStructDescriptor,
    ComputePipelineDescriptor, CullMode, DepthState, FrontFace, FunctionTableDescriptor,
    HitGroupDescriptor, MeshPipelineDescriptor, PipelineLayoutDescriptor, PrimitiveTopology,
    RasterPipelineDescriptor, RaytracingPipelineDescriptor, ResourceBindingKind,
    ResourceBindingSlot, ResourceTableDescriptor, ResourceTableLayoutDescriptor,
    ShaderFunctionDescriptor, ShaderStage, TopLevelAccelStructDescriptor,
};
pub use query::{QueryDescriptor, QueryKind};
pub use sampler::{AddressMode, CompareFunction, FilterMode, SamplerDescriptor};
pub use texture::{
    PresentMode, SwapChainDescriptor, TextureCopyView, TextureDescriptor, TextureFormat,
    TextureState, TextureUsage,
};
