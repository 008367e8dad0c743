//! Common utilities for RHI integration tests.

use std::sync::Arc;

use ember_rhi::types::{
    ComputePipelineDescriptor, PipelineLayoutDescriptor, RasterPipelineDescriptor,
    ShaderFunctionDescriptor, ShaderStage, TextureDescriptor,
};
use ember_rhi::{
    ComputePipeline, Device, DeviceDescriptor, RasterPipeline, Texture, TextureFormat,
    TextureUsage,
};

/// Initialize logging for test output.
pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Warn)
        .is_test(true)
        .try_init();
}

/// Create a device on the default adapter.
pub fn test_device() -> Arc<Device> {
    init_logging();
    Device::new(&DeviceDescriptor::new()).expect("device creation should succeed")
}

/// Create a small render target texture.
#[allow(dead_code)]
pub fn render_target(device: &Arc<Device>, width: u32, height: u32) -> Arc<Texture> {
    device
        .create_texture(&TextureDescriptor::new_2d(
            width,
            height,
            TextureFormat::Rgba8Unorm,
            TextureUsage::RENDER_TARGET,
        ))
        .expect("render target creation should succeed")
}

/// Create a compute pipeline with an empty layout.
#[allow(dead_code)]
pub fn compute_pipeline(device: &Arc<Device>) -> Arc<ComputePipeline> {
    let layout = device
        .create_pipeline_layout(&PipelineLayoutDescriptor::new(Vec::new()))
        .expect("layout creation should succeed");
    let function = device
        .create_shader_function(&ShaderFunctionDescriptor::new(
            ShaderStage::Compute,
            vec![0u8; 16],
            "cs_main",
        ))
        .expect("shader creation should succeed");
    device
        .create_compute_pipeline(&ComputePipelineDescriptor::new(layout, function))
        .expect("pipeline creation should succeed")
}

/// Create a raster pipeline rendering to one `Rgba8Unorm` target.
#[allow(dead_code)]
pub fn raster_pipeline(device: &Arc<Device>) -> Arc<RasterPipeline> {
    let layout = device
        .create_pipeline_layout(&PipelineLayoutDescriptor::new(Vec::new()))
        .expect("layout creation should succeed");
    let vertex = device
        .create_shader_function(&ShaderFunctionDescriptor::new(
            ShaderStage::Vertex,
            vec![0u8; 16],
            "vs_main",
        ))
        .expect("shader creation should succeed");
    device
        .create_raster_pipeline(
            &RasterPipelineDescriptor::new(layout, vertex)
                .with_color_formats(vec![TextureFormat::Rgba8Unorm]),
        )
        .expect("pipeline creation should succeed")
}
