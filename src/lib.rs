//! # Ember RHI
//!
//! Backend-agnostic rendering hardware interface built around pass-scoped
//! command encoders.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`Device`] - Resource creation, descriptor heaps, and command queues
//! - [`CommandBuffer`] - CPU-side command recording with typed pass encoders
//! - [`encoder`] - Transfer, compute, raster, and raytracing pass encoders
//! - [`DescriptorAllocator`] - Slot allocation over fixed-capacity descriptor heaps
//! - Null backend for headless recording and tests
//!
//! ## Example
//!
//! ```ignore
//! use ember_rhi::{CommandQueueKind, ComputePassDescriptor, Device, DeviceDescriptor};
//!
//! let device = Device::new(&DeviceDescriptor::new())?;
//! let queue = device.create_command_queue(CommandQueueKind::Compute);
//! let mut commands = queue.create_command_buffer("frame");
//!
//! let mut pass = commands.compute_encoder();
//! pass.begin_pass(ComputePassDescriptor::new("simulate"));
//! pass.set_pipeline(&pipeline);
//! pass.dispatch(64, 1, 1);
//! pass.end_pass();
//!
//! queue.submit(&commands, Some(&fence))?;
//! ```
//!
//! [`DescriptorAllocator`]: descriptor::DescriptorAllocator

pub mod backend;
pub mod capability;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod encoder;
pub mod error;
pub mod resources;
pub mod signature;
pub mod types;

// Re-export main types for convenience
pub use capability::{AdapterProfile, DeviceCapabilities, DeviceProperties, FeatureLevel};
pub use command::{Command, CommandBuffer, CommandQueue, CommandQueueKind, Fence, PassKind};
pub use descriptor::{DescriptorAllocation, DescriptorHeapKind};
pub use device::{Device, DeviceDescriptor};
pub use encoder::{ComputeEncoder, RasterEncoder, RaytracingEncoder, TransferEncoder};
pub use error::{RhiError, RhiResult};
pub use resources::{
    Buffer, ComputePipeline, FunctionTable, Query, RasterPipeline, RaytracingPipeline,
    ResourceTable, Sampler, ShaderFunction, SwapChain, Texture,
};
pub use types::{
    BufferDescriptor, BufferUsage, ComputePassDescriptor, Extent3d, RasterPassDescriptor,
    RaytracingPassDescriptor, SamplerDescriptor, TextureDescriptor, TextureFormat, TextureUsage,
    TransferPassDescriptor,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the RHI.
///
/// This should be called before creating any device.
pub fn init() {
    log::info!("Ember RHI v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_device_creation() {
        let device = Device::new(&DeviceDescriptor::new()).unwrap();
        assert_eq!(device.name(), "Null Adapter");
    }

    #[test]
    fn test_queue_submit_signals_fence() {
        let device = Device::new(&DeviceDescriptor::new()).unwrap();
        let queue = device.create_command_queue(CommandQueueKind::Transfer);
        let fence = device.create_fence();
        let commands = queue.create_command_buffer("empty");
        queue.submit(&commands, Some(&fence)).unwrap();
        assert!(fence.is_signaled());
    }
}
