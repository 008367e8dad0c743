//! Pipeline, shader, binding-table, and acceleration-structure descriptors.
//!
//! Shader functions carry opaque precompiled bytecode; no compiler runs in
//! this crate.

use std::sync::Arc;

use super::common::SampleCount;
use super::sampler::CompareFunction;
use super::texture::TextureFormat;
use crate::resources::{
    BottomLevelAccelStruct, Buffer, PipelineLayout, RaytracingPipeline, ResourceTableLayout,
    ShaderFunction,
};

// ============================================================================
// Shader Functions
// ============================================================================

/// Pipeline stage a shader function targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
    Task,
    Mesh,
    RayGeneration,
    Miss,
    ClosestHit,
    AnyHit,
    Intersection,
    Callable,
}

/// Descriptor for a precompiled shader function.
#[derive(Debug, Clone)]
pub struct ShaderFunctionDescriptor {
    /// Debug name.
    pub label: Option<String>,
    /// Stage the bytecode was compiled for.
    pub stage: ShaderStage,
    /// Backend-specific precompiled bytecode.
    pub bytecode: Vec<u8>,
    /// Entry point symbol inside the bytecode.
    pub entry_point: String,
}

impl ShaderFunctionDescriptor {
    /// Create a descriptor for `stage` from precompiled `bytecode`.
    pub fn new(stage: ShaderStage, bytecode: Vec<u8>, entry_point: impl Into<String>) -> Self {
        Self {
            label: None,
            stage,
            bytecode,
            entry_point: entry_point.into(),
        }
    }

    /// Set the debug name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

// ============================================================================
// Resource Tables
// ============================================================================

/// Kind of resource a table slot binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceBindingKind {
    /// Constant (uniform) buffer view.
    ConstantBuffer,
    /// Read-only shader resource view.
    ShaderResource,
    /// Read-write unordered access view.
    UnorderedAccess,
    /// Sampler state.
    Sampler,
}

/// One slot in a resource table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBindingSlot {
    /// Binding index within the table.
    pub binding: u32,
    /// Kind of resource bound at this slot.
    pub kind: ResourceBindingKind,
    /// Number of descriptors bound at this slot (arrays > 1).
    pub count: u32,
}

impl ResourceBindingSlot {
    /// Create a single-descriptor slot.
    pub fn new(binding: u32, kind: ResourceBindingKind) -> Self {
        Self {
            binding,
            kind,
            count: 1,
        }
    }

    /// Set the descriptor array length.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// Descriptor for a resource table layout.
#[derive(Debug, Clone, Default)]
pub struct ResourceTableLayoutDescriptor {
    /// Debug name.
    pub label: Option<String>,
    /// Slots of the layout, in binding order.
    pub slots: Vec<ResourceBindingSlot>,
}

impl ResourceTableLayoutDescriptor {
    /// Create a layout descriptor from its slots.
    pub fn new(slots: Vec<ResourceBindingSlot>) -> Self {
        Self { label: None, slots }
    }

    /// Set the debug name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Total descriptor count across all slots.
    pub fn descriptor_count(&self) -> u32 {
        self.slots.iter().map(|slot| slot.count).sum()
    }
}

/// Descriptor for a resource table instance.
#[derive(Debug, Clone)]
pub struct ResourceTableDescriptor {
    /// Debug name.
    pub label: Option<String>,
    /// Layout the table instantiates.
    pub layout: Arc<ResourceTableLayout>,
}

impl ResourceTableDescriptor {
    /// Create a table descriptor over `layout`.
    pub fn new(layout: Arc<ResourceTableLayout>) -> Self {
        Self {
            label: None,
            layout,
        }
    }

    /// Set the debug name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Descriptor for a pipeline layout.
#[derive(Debug, Clone, Default)]
pub struct PipelineLayoutDescriptor {
    /// Debug name.
    pub label: Option<String>,
    /// Resource table layouts, in set-index order.
    pub table_layouts: Vec<Arc<ResourceTableLayout>>,
    /// Size of the root/push constant range in bytes (0 for none).
    pub push_constant_size: u32,
}

impl PipelineLayoutDescriptor {
    /// Create a pipeline layout descriptor from its table layouts.
    pub fn new(table_layouts: Vec<Arc<ResourceTableLayout>>) -> Self {
        Self {
            label: None,
            table_layouts,
            push_constant_size: 0,
        }
    }

    /// Set the debug name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Reserve a push constant range.
    pub fn with_push_constants(mut self, size: u32) -> Self {
        self.push_constant_size = size;
        self
    }
}

// ============================================================================
// Raster Pipeline State
// ============================================================================

/// Primitive assembly topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
}

/// Triangle faces discarded before rasterization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

/// Winding order treated as front-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    #[default]
    CounterClockwise,
    Clockwise,
}

/// Depth test and write configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    /// Whether depth results are written back.
    pub write_enabled: bool,
    /// Comparison applied against the stored depth.
    pub compare: CompareFunction,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            write_enabled: true,
            compare: CompareFunction::Less,
        }
    }
}

/// Descriptor for a raster (vertex + fragment) pipeline.
#[derive(Debug, Clone)]
pub struct RasterPipelineDescriptor {
    /// Debug name.
    pub label: Option<String>,
    /// Layout of the bindable resources.
    pub layout: Arc<PipelineLayout>,
    /// Vertex stage function.
    pub vertex_function: Arc<ShaderFunction>,
    /// Fragment stage function (None for depth-only pipelines).
    pub fragment_function: Option<Arc<ShaderFunction>>,
    /// Primitive assembly topology.
    pub topology: PrimitiveTopology,
    /// Face culling mode.
    pub cull_mode: CullMode,
    /// Front-facing winding order.
    pub front_face: FrontFace,
    /// Formats of the color attachments, in slot order.
    pub color_formats: Vec<TextureFormat>,
    /// Format of the depth-stencil attachment, if any.
    pub depth_stencil_format: Option<TextureFormat>,
    /// Depth test configuration; None disables the depth test.
    pub depth_state: Option<DepthState>,
    /// MSAA sample count of the target attachments.
    pub sample_count: SampleCount,
}

impl RasterPipelineDescriptor {
    /// Create a raster pipeline descriptor with default raster state.
    pub fn new(layout: Arc<PipelineLayout>, vertex_function: Arc<ShaderFunction>) -> Self {
        Self {
            label: None,
            layout,
            vertex_function,
            fragment_function: None,
            topology: PrimitiveTopology::default(),
            cull_mode: CullMode::default(),
            front_face: FrontFace::default(),
            color_formats: Vec::new(),
            depth_stencil_format: None,
            depth_state: None,
            sample_count: SampleCount::One,
        }
    }

    /// Set the debug name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the fragment stage function.
    pub fn with_fragment_function(mut self, function: Arc<ShaderFunction>) -> Self {
        self.fragment_function = Some(function);
        self
    }

    /// Set the color attachment formats.
    pub fn with_color_formats(mut self, formats: Vec<TextureFormat>) -> Self {
        self.color_formats = formats;
        self
    }

    /// Set the depth-stencil format and depth state.
    pub fn with_depth_stencil(mut self, format: TextureFormat, state: DepthState) -> Self {
        self.depth_stencil_format = Some(format);
        self.depth_state = Some(state);
        self
    }

    /// Set the MSAA sample count.
    pub fn with_sample_count(mut self, sample_count: SampleCount) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Set the primitive topology.
    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Set the cull mode.
    pub fn with_cull_mode(mut self, cull_mode: CullMode) -> Self {
        self.cull_mode = cull_mode;
        self
    }
}

/// Descriptor for a mesh-shading pipeline.
///
/// Requires mesh-shading support on the device.
#[derive(Debug, Clone)]
pub struct MeshPipelineDescriptor {
    /// Debug name.
    pub label: Option<String>,
    /// Layout of the bindable resources.
    pub layout: Arc<PipelineLayout>,
    /// Optional task (amplification) stage function.
    pub task_function: Option<Arc<ShaderFunction>>,
    /// Mesh stage function.
    pub mesh_function: Arc<ShaderFunction>,
    /// Fragment stage function.
    pub fragment_function: Option<Arc<ShaderFunction>>,
    /// Formats of the color attachments, in slot order.
    pub color_formats: Vec<TextureFormat>,
    /// Format of the depth-stencil attachment, if any.
    pub depth_stencil_format: Option<TextureFormat>,
    /// MSAA sample count of the target attachments.
    pub sample_count: SampleCount,
}

impl MeshPipelineDescriptor {
    /// Create a mesh pipeline descriptor.
    pub fn new(layout: Arc<PipelineLayout>, mesh_function: Arc<ShaderFunction>) -> Self {
        Self {
            label: None,
            layout,
            task_function: None,
            mesh_function,
            fragment_function: None,
            color_formats: Vec::new(),
            depth_stencil_format: None,
            sample_count: SampleCount::One,
        }
    }

    /// Set the debug name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the task (amplification) stage function.
    pub fn with_task_function(mut self, function: Arc<ShaderFunction>) -> Self {
        self.task_function = Some(function);
        self
    }

    /// Set the fragment stage function.
    pub fn with_fragment_function(mut self, function: Arc<ShaderFunction>) -> Self {
        self.fragment_function = Some(function);
        self
    }

    /// Set the color attachment formats.
    pub fn with_color_formats(mut self, formats: Vec<TextureFormat>) -> Self {
        self.color_formats = formats;
        self
    }
}

// ============================================================================
// Compute and Raytracing Pipelines
// ============================================================================

/// Descriptor for a compute pipeline.
#[derive(Debug, Clone)]
pub struct ComputePipelineDescriptor {
    /// Debug name.
    pub label: Option<String>,
    /// Layout of the bindable resources.
    pub layout: Arc<PipelineLayout>,
    /// Compute stage function.
    pub compute_function: Arc<ShaderFunction>,
}

impl ComputePipelineDescriptor {
    /// Create a compute pipeline descriptor.
    pub fn new(layout: Arc<PipelineLayout>, compute_function: Arc<ShaderFunction>) -> Self {
        Self {
            label: None,
            layout,
            compute_function,
        }
    }

    /// Set the debug name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// One hit group of a raytracing pipeline.
#[derive(Debug, Clone)]
pub struct HitGroupDescriptor {
    /// Closest-hit function.
    pub closest_hit_function: Option<Arc<ShaderFunction>>,
    /// Any-hit function.
    pub any_hit_function: Option<Arc<ShaderFunction>>,
    /// Intersection function for procedural geometry.
    pub intersection_function: Option<Arc<ShaderFunction>>,
}

impl HitGroupDescriptor {
    /// Create a triangle hit group with only a closest-hit function.
    pub fn closest_hit(function: Arc<ShaderFunction>) -> Self {
        Self {
            closest_hit_function: Some(function),
            any_hit_function: None,
            intersection_function: None,
        }
    }
}

/// Descriptor for a raytracing pipeline.
///
/// Requires raytracing support on the device.
#[derive(Debug, Clone)]
pub struct RaytracingPipelineDescriptor {
    /// Debug name.
    pub label: Option<String>,
    /// Layout of the bindable resources.
    pub layout: Arc<PipelineLayout>,
    /// Ray generation function.
    pub ray_generation_function: Arc<ShaderFunction>,
    /// Miss functions, in shader table order.
    pub miss_functions: Vec<Arc<ShaderFunction>>,
    /// Hit groups, in shader table order.
    pub hit_groups: Vec<HitGroupDescriptor>,
    /// Callable functions, in shader table order.
    pub callable_functions: Vec<Arc<ShaderFunction>>,
    /// Maximum trace recursion depth.
    pub max_recursion_depth: u32,
}

impl RaytracingPipelineDescriptor {
    /// Create a raytracing pipeline descriptor with recursion depth 1.
    pub fn new(layout: Arc<PipelineLayout>, ray_generation_function: Arc<ShaderFunction>) -> Self {
        Self {
            label: None,
            layout,
            ray_generation_function,
            miss_functions: Vec::new(),
            hit_groups: Vec::new(),
            callable_functions: Vec::new(),
            max_recursion_depth: 1,
        }
    }

    /// Set the debug name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Append a miss function.
    pub fn with_miss_function(mut self, function: Arc<ShaderFunction>) -> Self {
        self.miss_functions.push(function);
        self
    }

    /// Append a hit group.
    pub fn with_hit_group(mut self, hit_group: HitGroupDescriptor) -> Self {
        self.hit_groups.push(hit_group);
        self
    }

    /// Set the maximum trace recursion depth.
    pub fn with_max_recursion_depth(mut self, depth: u32) -> Self {
        self.max_recursion_depth = depth;
        self
    }
}

/// Descriptor for a raytracing function (shader binding) table.
#[derive(Debug, Clone)]
pub struct FunctionTableDescriptor {
    /// Debug name.
    pub label: Option<String>,
    /// Pipeline whose functions the table references.
    pub pipeline: Arc<RaytracingPipeline>,
}

impl FunctionTableDescriptor {
    /// Create a function table descriptor over `pipeline`.
    pub fn new(pipeline: Arc<RaytracingPipeline>) -> Self {
        Self {
            label: None,
            pipeline,
        }
    }

    /// Set the debug name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

// ============================================================================
// Acceleration Structures
// ============================================================================

/// Triangle geometry feeding a bottom-level acceleration structure.
#[derive(Debug, Clone)]
pub struct AccelGeometryDescriptor {
    /// Buffer holding the vertex positions.
    pub vertex_buffer: Arc<Buffer>,
    /// Byte offset of the first vertex.
    pub vertex_offset: u64,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Byte stride between vertices.
    pub vertex_stride: u32,
    /// Optional index buffer; None builds from unindexed triangles.
    pub index_buffer: Option<Arc<Buffer>>,
    /// Byte offset of the first index.
    pub index_offset: u64,
    /// Number of indices.
    pub index_count: u32,
    /// Whether the geometry never invokes any-hit shaders.
    pub opaque: bool,
}

impl AccelGeometryDescriptor {
    /// Create unindexed triangle geometry.
    pub fn triangles(vertex_buffer: Arc<Buffer>, vertex_count: u32, vertex_stride: u32) -> Self {
        Self {
            vertex_buffer,
            vertex_offset: 0,
            vertex_count,
            vertex_stride,
            index_buffer: None,
            index_offset: 0,
            index_count: 0,
            opaque: true,
        }
    }

    /// Index the geometry through `index_buffer`.
    pub fn with_indices(mut self, index_buffer: Arc<Buffer>, index_count: u32) -> Self {
        self.index_buffer = Some(index_buffer);
        self.index_count = index_count;
        self
    }
}

/// Descriptor for a bottom-level acceleration structure.
#[derive(Debug, Clone)]
pub struct BottomLevelAccelStructDescriptor {
    /// Debug name.
    pub label: Option<String>,
    /// Geometries merged into the structure.
    pub geometries: Vec<AccelGeometryDescriptor>,
}

impl BottomLevelAccelStructDescriptor {
    /// Create a descriptor from its geometries.
    pub fn new(geometries: Vec<AccelGeometryDescriptor>) -> Self {
        Self {
            label: None,
            geometries,
        }
    }

    /// Set the debug name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// One instance referenced by a top-level acceleration structure.
#[derive(Debug, Clone)]
pub struct AccelInstanceDescriptor {
    /// Bottom-level structure this instance points at.
    pub bottom_level: Arc<BottomLevelAccelStruct>,
    /// Row-major 3x4 object-to-world transform.
    pub transform: [f32; 12],
    /// Application-defined instance id surfaced to shaders.
    pub instance_id: u32,
    /// Visibility mask tested against the trace-ray mask.
    pub mask: u8,
}

impl AccelInstanceDescriptor {
    /// Create an instance with an identity transform and full mask.
    pub fn new(bottom_level: Arc<BottomLevelAccelStruct>, instance_id: u32) -> Self {
        Self {
            bottom_level,
            transform: [
                1.0, 0.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0,
            ],
            instance_id,
            mask: 0xff,
        }
    }

    /// Set the object-to-world transform.
    pub fn with_transform(mut self, transform: [f32; 12]) -> Self {
        self.transform = transform;
        self
    }
}

/// Descriptor for a top-level acceleration structure.
#[derive(Debug, Clone)]
pub struct TopLevelAccelStructDescriptor {
    /// Debug name.
    pub label: Option<String>,
    /// Instances referenced by the structure.
    pub instances: Vec<AccelInstanceDescriptor>,
}

impl TopLevelAccelStructDescriptor {
    /// Create a descriptor from its instances.
    pub fn new(instances: Vec<AccelInstanceDescriptor>) -> Self {
        Self {
            label: None,
            instances,
        }
    }

    /// Set the debug name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
