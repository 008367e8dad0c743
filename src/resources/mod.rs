//! GPU resources.
//!
//! This module contains the resource objects created by [`Device`]:
//! buffers, textures, samplers, query heaps, shader functions, layouts,
//! pipelines, resource and function tables, acceleration structures, and
//! pre-recorded indirect command buffers.
//!
//! Resources are reference-counted with [`Arc`] and can be shared across
//! threads. Each device-backed resource holds a weak reference back to its
//! parent device; resources occupying descriptor heap slots return them on
//! drop.
//!
//! [`Device`]: crate::Device
//! [`Arc`]: std::sync::Arc

mod accel;
mod buffer;
mod indirect;
mod pipeline;
mod query;
mod sampler;
mod table;
mod texture;

pub use accel::{BottomLevelAccelStruct, TopLevelAccelStruct};
pub use buffer::Buffer;
pub use indirect::{
    ComputeIndirectCommandBuffer, RasterIndirectCommandBuffer, RaytracingIndirectCommandBuffer,
};
pub use pipeline::{
    ComputePipeline, PipelineLayout, RasterPipeline, RaytracingPipeline, ShaderFunction,
};
pub use query::Query;
pub use sampler::Sampler;
pub use table::{FunctionTable, ResourceTable, ResourceTableLayout};
pub use texture::{SwapChain, Texture};
