//! Shader functions, pipeline layouts, and pipeline state objects.

use std::sync::{Arc, Weak};

use crate::backend::GpuPipeline;
use crate::device::Device;
use crate::types::{
    ComputePipelineDescriptor, MeshPipelineDescriptor, PipelineLayoutDescriptor,
    RasterPipelineDescriptor, RaytracingPipelineDescriptor, ShaderFunctionDescriptor, ShaderStage,
};

// ============================================================================
// Shader Function
// ============================================================================

/// A precompiled shader entry point.
///
/// Shader functions wrap externally compiled bytecode; no compilation
/// happens here. They carry no backend state and are freely shared
/// between pipelines.
pub struct ShaderFunction {
    descriptor: ShaderFunctionDescriptor,
}

impl ShaderFunction {
    /// Create a new shader function (called by Device).
    pub(crate) fn new(descriptor: ShaderFunctionDescriptor) -> Self {
        Self { descriptor }
    }

    /// Get the shader function descriptor.
    pub fn descriptor(&self) -> &ShaderFunctionDescriptor {
        &self.descriptor
    }

    /// Pipeline stage the function runs at.
    pub fn stage(&self) -> ShaderStage {
        self.descriptor.stage
    }

    /// Entry point name inside the bytecode.
    pub fn entry_point(&self) -> &str {
        &self.descriptor.entry_point
    }

    /// The compiled bytecode.
    pub fn bytecode(&self) -> &[u8] {
        &self.descriptor.bytecode
    }

    /// Get the function label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for ShaderFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderFunction")
            .field("stage", &self.descriptor.stage)
            .field("entry_point", &self.descriptor.entry_point)
            .field("bytecode_len", &self.descriptor.bytecode.len())
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// ============================================================================
// Pipeline Layout
// ============================================================================

/// The resource-table layouts and push-constant space a pipeline binds.
///
/// Pipeline layouts carry no backend state; the same layout object can be
/// consumed by pipelines on any device.
pub struct PipelineLayout {
    descriptor: PipelineLayoutDescriptor,
}

impl PipelineLayout {
    /// Create a new pipeline layout (called by Device).
    pub(crate) fn new(descriptor: PipelineLayoutDescriptor) -> Self {
        Self { descriptor }
    }

    /// Get the pipeline layout descriptor.
    pub fn descriptor(&self) -> &PipelineLayoutDescriptor {
        &self.descriptor
    }

    /// Number of resource-table slots the layout declares.
    pub fn table_count(&self) -> usize {
        self.descriptor.table_layouts.len()
    }

    /// Push-constant size in bytes.
    pub fn push_constant_size(&self) -> u32 {
        self.descriptor.push_constant_size
    }

    /// Get the layout label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for PipelineLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineLayout")
            .field("table_count", &self.table_count())
            .field("push_constant_size", &self.descriptor.push_constant_size)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// ============================================================================
// Raster Pipeline
// ============================================================================

enum RasterPipelineDesc {
    Vertex(RasterPipelineDescriptor),
    Mesh(MeshPipelineDescriptor),
}

/// A raster pipeline state object.
///
/// Created by [`Device::create_raster_pipeline`] for the classic
/// vertex/fragment form or [`Device::create_mesh_pipeline`] for the
/// task/mesh/fragment form. Both forms bind through
/// [`RasterEncoder::set_pipeline`](crate::encoder::RasterEncoder::set_pipeline).
pub struct RasterPipeline {
    device: Weak<Device>,
    descriptor: RasterPipelineDesc,
    gpu: GpuPipeline,
}

impl RasterPipeline {
    /// Create a vertex/fragment pipeline (called by Device).
    pub(crate) fn new_vertex(
        device: Weak<Device>,
        descriptor: RasterPipelineDescriptor,
        gpu: GpuPipeline,
    ) -> Self {
        Self {
            device,
            descriptor: RasterPipelineDesc::Vertex(descriptor),
            gpu,
        }
    }

    /// Create a task/mesh/fragment pipeline (called by Device).
    pub(crate) fn new_mesh(
        device: Weak<Device>,
        descriptor: MeshPipelineDescriptor,
        gpu: GpuPipeline,
    ) -> Self {
        Self {
            device,
            descriptor: RasterPipelineDesc::Mesh(descriptor),
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

    pub(crate) fn gpu(&self) -> &GpuPipeline {
        &self.gpu
    }

    /// Whether the pipeline uses mesh shading instead of vertex input.
    pub fn is_mesh(&self) -> bool {
        matches!(self.descriptor, RasterPipelineDesc::Mesh(_))
    }

    /// The vertex/fragment descriptor, when created as one.
    pub fn vertex_descriptor(&self) -> Option<&RasterPipelineDescriptor> {
        match &self.descriptor {
            RasterPipelineDesc::Vertex(desc) => Some(desc),
            RasterPipelineDesc::Mesh(_) => None,
        }
    }

    /// The task/mesh/fragment descriptor, when created as one.
    pub fn mesh_descriptor(&self) -> Option<&MeshPipelineDescriptor> {
        match &self.descriptor {
            RasterPipelineDesc::Vertex(_) => None,
            RasterPipelineDesc::Mesh(desc) => Some(desc),
        }
    }

    /// Get the pipeline label, if set.
    pub fn label(&self) -> Option<&str> {
        match &self.descriptor {
            RasterPipelineDesc::Vertex(desc) => desc.label.as_deref(),
            RasterPipelineDesc::Mesh(desc) => desc.label.as_deref(),
        }
    }
}

impl std::fmt::Debug for RasterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterPipeline")
            .field("mesh", &self.is_mesh())
            .field("label", &self.label())
            .finish()
    }
}

// ============================================================================
// Compute Pipeline
// ============================================================================

/// A compute pipeline state object.
pub struct ComputePipeline {
    device: Weak<Device>,
    descriptor: ComputePipelineDescriptor,
    gpu: GpuPipeline,
}

impl ComputePipeline {
    /// Create a new compute pipeline (called by Device).
    pub(crate) fn new(
        device: Weak<Device>,
        descriptor: ComputePipelineDescriptor,
        gpu: GpuPipeline,
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

    pub(crate) fn gpu(&self) -> &GpuPipeline {
        &self.gpu
    }

    /// Get the pipeline descriptor.
    pub fn descriptor(&self) -> &ComputePipelineDescriptor {
        &self.descriptor
    }

    /// Get the pipeline label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for ComputePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputePipeline")
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// ============================================================================
// Raytracing Pipeline
// ============================================================================

/// A raytracing pipeline state object.
///
/// Holds the ray-generation, miss, hit-group, and callable functions.
/// Function tables referencing the pipeline are created through
/// [`Device::create_function_table`].
pub struct RaytracingPipeline {
    device: Weak<Device>,
    descriptor: RaytracingPipelineDescriptor,
    gpu: GpuPipeline,
}

impl RaytracingPipeline {
    /// Create a new raytracing pipeline (called by Device).
    pub(crate) fn new(
        device: Weak<Device>,
        descriptor: RaytracingPipelineDescriptor,
        gpu: GpuPipeline,
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

    pub(crate) fn gpu(&self) -> &GpuPipeline {
        &self.gpu
    }

    /// Get the pipeline descriptor.
    pub fn descriptor(&self) -> &RaytracingPipelineDescriptor {
        &self.descriptor
    }

    /// Maximum trace recursion depth the pipeline was created with.
    pub fn max_recursion_depth(&self) -> u32 {
        self.descriptor.max_recursion_depth
    }

    /// Get the pipeline label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for RaytracingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaytracingPipeline")
            .field("miss_functions", &self.descriptor.miss_functions.len())
            .field("hit_groups", &self.descriptor.hit_groups.len())
            .field("max_recursion_depth", &self.descriptor.max_recursion_depth)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(ShaderFunction: Send, Sync);
static_assertions::assert_impl_all!(PipelineLayout: Send, Sync);
static_assertions::assert_impl_all!(RasterPipeline: Send, Sync);
static_assertions::assert_impl_all!(ComputePipeline: Send, Sync);
static_assertions::assert_impl_all!(RaytracingPipeline: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceTableLayoutDescriptor;

    #[test]
    fn test_shader_function_accessors() {
        let desc = ShaderFunctionDescriptor::new(ShaderStage::Compute, vec![0u8; 16], "cs_main");
        let function = ShaderFunction::new(desc);
        assert_eq!(function.stage(), ShaderStage::Compute);
        assert_eq!(function.entry_point(), "cs_main");
        assert_eq!(function.bytecode().len(), 16);
    }

    #[test]
    fn test_pipeline_layout_table_count() {
        let table_layout = Arc::new(crate::resources::ResourceTableLayout::new(
            ResourceTableLayoutDescriptor::new(vec![]),
        ));
        let desc = PipelineLayoutDescriptor::new(vec![table_layout]).with_push_constants(16);
        let layout = PipelineLayout::new(desc);
        assert_eq!(layout.table_count(), 1);
        assert_eq!(layout.push_constant_size(), 16);
    }
}
