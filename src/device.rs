//! The device: backend probing, descriptor heaps, signature cache, and
//! every resource factory.

use std::sync::{Arc, RwLock, Weak};

use crate::backend::GpuDevice;
use crate::capability::{AdapterProfile, DeviceCapabilities, DeviceProperties};
use crate::command::{CommandQueue, CommandQueueKind, Fence};
use crate::descriptor::{DescriptorAllocation, DescriptorAllocator, DescriptorHeapKind};
use crate::error::{RhiError, RhiResult};
use crate::resources::{
    BottomLevelAccelStruct, Buffer, ComputeIndirectCommandBuffer, ComputePipeline, FunctionTable,
    PipelineLayout, Query, RasterIndirectCommandBuffer, RasterPipeline,
    RaytracingIndirectCommandBuffer, RaytracingPipeline, ResourceTable, ResourceTableLayout,
    Sampler, ShaderFunction, SwapChain, Texture, TopLevelAccelStruct,
};
use crate::signature::{IndirectSignature, SignatureCache};
use crate::types::{
    BottomLevelAccelStructDescriptor, BufferDescriptor, ComputePipelineDescriptor,
    FunctionTableDescriptor, IndirectCommandBufferDescriptor, IndirectOpKind,
    MeshPipelineDescriptor, PipelineLayoutDescriptor, QueryDescriptor, RasterPipelineDescriptor,
    RaytracingPipelineDescriptor, ResourceBindingKind, ResourceTableDescriptor,
    ResourceTableLayoutDescriptor, SamplerDescriptor, ShaderFunctionDescriptor, ShaderStage,
    SwapChainDescriptor, TextureDescriptor, TextureUsage, TopLevelAccelStructDescriptor,
    MAX_COLOR_ATTACHMENTS,
};

/// Descriptor for creating a device.
#[derive(Debug, Clone, Default)]
pub struct DeviceDescriptor {
    /// Debug label for the device.
    pub label: Option<String>,
    /// Adapter the device is created on.
    pub adapter_profile: AdapterProfile,
}

impl DeviceDescriptor {
    /// Create a descriptor for the default adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the adapter profile.
    pub fn with_adapter_profile(mut self, profile: AdapterProfile) -> Self {
        self.adapter_profile = profile;
        self
    }
}

/// A GPU device.
///
/// The device owns the backend connection, the four fixed-capacity
/// descriptor heaps, and the indirect-signature cache, and is the single
/// factory for every GPU resource. Construction probes feature levels in
/// descending order and fails with [`RhiError::DeviceCreationFailed`] when
/// the adapter supports none of them.
///
/// # Thread Safety
///
/// `Device` is `Send + Sync`. The descriptor heaps lock internally, so
/// resources can be created and dropped from multiple recording threads
/// concurrently.
///
/// # Example
///
/// ```ignore
/// let device = Device::new(&DeviceDescriptor::new())?;
///
/// let buffer = device.create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX))?;
/// let texture = device.create_texture(&TextureDescriptor::new_2d(
///     1920, 1080,
///     TextureFormat::Rgba8Unorm,
///     TextureUsage::RENDER_TARGET,
/// ))?;
/// ```
pub struct Device {
    gpu: GpuDevice,
    name: String,
    properties: DeviceProperties,
    capabilities: DeviceCapabilities,
    render_target_heap: DescriptorAllocator,
    depth_stencil_heap: DescriptorAllocator,
    sampler_heap: DescriptorAllocator,
    shader_resource_heap: DescriptorAllocator,
    signatures: SignatureCache,
    // Track allocated resources (weak references for cleanup/debugging)
    buffers: RwLock<Vec<Weak<Buffer>>>,
    textures: RwLock<Vec<Weak<Texture>>>,
    samplers: RwLock<Vec<Weak<Sampler>>>,
}

impl Device {
    /// Create a device on the described adapter.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::DeviceCreationFailed`] if the adapter supports
    /// no feature level.
    pub fn new(descriptor: &DeviceDescriptor) -> RhiResult<Arc<Self>> {
        let gpu = GpuDevice::probe(descriptor.adapter_profile.clone())?;
        let properties = gpu.properties();
        let capabilities = gpu.capabilities();

        let render_target_heap = Self::create_heap(&gpu, DescriptorHeapKind::RenderTarget);
        let depth_stencil_heap = Self::create_heap(&gpu, DescriptorHeapKind::DepthStencil);
        let sampler_heap = Self::create_heap(&gpu, DescriptorHeapKind::Sampler);
        let shader_resource_heap = Self::create_heap(&gpu, DescriptorHeapKind::ShaderResource);

        let signatures = SignatureCache::new(capabilities.raytracing_supported());

        log::debug!(
            "Device {:?} ready: feature level {:?}, render pass {:?}, raytracing {:?}",
            descriptor.adapter_profile.name,
            capabilities.feature_level,
            capabilities.render_pass_tier,
            capabilities.raytracing_tier
        );

        Ok(Arc::new(Self {
            gpu,
            name: descriptor.adapter_profile.name.clone(),
            properties,
            capabilities,
            render_target_heap,
            depth_stencil_heap,
            sampler_heap,
            shader_resource_heap,
            signatures,
            buffers: RwLock::new(Vec::new()),
            textures: RwLock::new(Vec::new()),
            samplers: RwLock::new(Vec::new()),
        }))
    }

    fn create_heap(gpu: &GpuDevice, kind: DescriptorHeapKind) -> DescriptorAllocator {
        let info = gpu.heap_info(kind);
        DescriptorAllocator::new(
            kind,
            kind.default_capacity(),
            info.descriptor_size,
            info.cpu_base,
            info.gpu_base,
        )
    }

    /// Get the adapter name the device was created on.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the adapter properties.
    pub fn properties(&self) -> DeviceProperties {
        self.properties
    }

    /// Get the device capabilities.
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    pub(crate) fn gpu(&self) -> &GpuDevice {
        &self.gpu
    }

    pub(crate) fn allocator(&self, kind: DescriptorHeapKind) -> &DescriptorAllocator {
        match kind {
            DescriptorHeapKind::RenderTarget => &self.render_target_heap,
            DescriptorHeapKind::DepthStencil => &self.depth_stencil_heap,
            DescriptorHeapKind::Sampler => &self.sampler_heap,
            DescriptorHeapKind::ShaderResource => &self.shader_resource_heap,
        }
    }

    /// Return a descriptor slot to its heap, complaining instead of
    /// panicking when the bookkeeping disagrees.
    pub(crate) fn release_descriptor(&self, slot: &DescriptorAllocation) {
        if let Err(err) = self.allocator(slot.heap_kind).free(slot.index) {
            log::error!(
                "Failed to free {:?} descriptor {}: {}",
                slot.heap_kind,
                slot.index,
                err
            );
        }
    }

    fn rollback_slots(&self, slots: &[&Option<DescriptorAllocation>]) {
        for slot in slots.iter().filter_map(|s| s.as_ref()) {
            self.release_descriptor(slot);
        }
    }

    /// Number of live descriptors in the given heap.
    pub fn allocated_descriptor_count(&self, kind: DescriptorHeapKind) -> u32 {
        self.allocator(kind).allocated_count()
    }

    /// Capacity of the given descriptor heap.
    pub fn descriptor_heap_capacity(&self, kind: DescriptorHeapKind) -> u32 {
        self.allocator(kind).capacity()
    }

    /// The cached signature for an indirect operation kind.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::NotSupported`] for
    /// [`IndirectOpKind::DispatchRays`] on a device without raytracing.
    pub fn indirect_signature(&self, kind: IndirectOpKind) -> RhiResult<IndirectSignature> {
        self.signatures.get(kind).copied()
    }

    pub(crate) fn signatures(&self) -> &SignatureCache {
        &self.signatures
    }

    // ========================================================================
    // Plain resources
    // ========================================================================

    /// Create a GPU buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is zero or backend allocation fails.
    pub fn create_buffer(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
    ) -> RhiResult<Arc<Buffer>> {
        // Validate
        if descriptor.size == 0 {
            return Err(RhiError::InvalidParameter(
                "buffer size cannot be zero".to_string(),
            ));
        }

        let gpu = self.gpu.create_buffer(descriptor)?;
        let buffer = Arc::new(Buffer::new(Arc::downgrade(self), descriptor.clone(), gpu));

        // Track it
        if let Ok(mut buffers) = self.buffers.write() {
            buffers.push(Arc::downgrade(&buffer));
        }

        log::trace!(
            "Device: created buffer {:?}, size={}",
            descriptor.label,
            descriptor.size
        );

        Ok(buffer)
    }

    /// Create a GPU texture.
    ///
    /// Reserves one descriptor slot per heap the usage flags require:
    /// render-target, depth-stencil, and shader-resource (the latter also
    /// for unordered access).
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is zero, a required descriptor heap
    /// is exhausted, or backend allocation fails.
    pub fn create_texture(
        self: &Arc<Self>,
        descriptor: &TextureDescriptor,
    ) -> RhiResult<Arc<Texture>> {
        // Validate
        if descriptor.size.width == 0 || descriptor.size.height == 0 || descriptor.size.depth == 0
        {
            return Err(RhiError::InvalidParameter(
                "texture dimensions cannot be zero".to_string(),
            ));
        }

        let gpu = self.gpu.create_texture(descriptor)?;

        // Reserve the descriptor slots the usage asks for; on exhaustion,
        // slots taken so far go back to their heaps.
        let render_target_slot = if descriptor.usage.contains(TextureUsage::RENDER_TARGET) {
            Some(self.render_target_heap.allocate()?)
        } else {
            None
        };
        let depth_stencil_slot = if descriptor.usage.contains(TextureUsage::DEPTH_STENCIL) {
            match self.depth_stencil_heap.allocate() {
                Ok(slot) => Some(slot),
                Err(err) => {
                    self.rollback_slots(&[&render_target_slot]);
                    return Err(err);
                }
            }
        } else {
            None
        };
        let shader_resource_slot = if descriptor
            .usage
            .intersects(TextureUsage::SHADER_RESOURCE | TextureUsage::UNORDERED_ACCESS)
        {
            match self.shader_resource_heap.allocate() {
                Ok(slot) => Some(slot),
                Err(err) => {
                    self.rollback_slots(&[&render_target_slot, &depth_stencil_slot]);
                    return Err(err);
                }
            }
        } else {
            None
        };

        let texture = Arc::new(Texture::new(
            Arc::downgrade(self),
            descriptor.clone(),
            gpu,
            render_target_slot,
            depth_stencil_slot,
            shader_resource_slot,
        ));

        // Track it
        if let Ok(mut textures) = self.textures.write() {
            textures.push(Arc::downgrade(&texture));
        }

        log::trace!(
            "Device: created texture {:?}, size={}x{}",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height
        );

        Ok(texture)
    }

    /// Create a texture sampler.
    ///
    /// Reserves one slot in the shader-visible sampler heap.
    ///
    /// # Errors
    ///
    /// Returns an error if the sampler heap is exhausted or backend
    /// creation fails.
    pub fn create_sampler(
        self: &Arc<Self>,
        descriptor: &SamplerDescriptor,
    ) -> RhiResult<Arc<Sampler>> {
        let gpu = self.gpu.create_sampler(descriptor)?;
        let slot = self.sampler_heap.allocate()?;
        let sampler = Arc::new(Sampler::new(
            Arc::downgrade(self),
            descriptor.clone(),
            gpu,
            Some(slot),
        ));

        // Track it
        if let Ok(mut samplers) = self.samplers.write() {
            samplers.push(Arc::downgrade(&sampler));
        }

        log::trace!("Device: created sampler {:?}", descriptor.label);

        Ok(sampler)
    }

    /// Create a query heap.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot count is zero or backend creation
    /// fails.
    pub fn create_query(
        self: &Arc<Self>,
        descriptor: &QueryDescriptor,
    ) -> RhiResult<Arc<Query>> {
        // Validate
        if descriptor.count == 0 {
            return Err(RhiError::InvalidParameter(
                "query heap slot count cannot be zero".to_string(),
            ));
        }

        let gpu = self.gpu.create_query(descriptor)?;
        let query = Arc::new(Query::new(Arc::downgrade(self), descriptor.clone(), gpu));

        log::trace!(
            "Device: created query heap {:?}, kind={:?}, count={}",
            descriptor.label,
            descriptor.kind,
            descriptor.count
        );

        Ok(query)
    }

    /// Create a CPU-GPU fence, initially unsignaled.
    pub fn create_fence(self: &Arc<Self>) -> Fence {
        Fence::new(Arc::clone(self), self.gpu.create_fence(false))
    }

    /// Create a command queue of the given kind.
    pub fn create_command_queue(self: &Arc<Self>, kind: CommandQueueKind) -> CommandQueue {
        CommandQueue::new(Arc::clone(self), kind)
    }

    /// Create a swap chain for presentation.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::NotSupported`] on the headless Null backend,
    /// or an error if a dimension is zero.
    pub fn create_swap_chain(
        self: &Arc<Self>,
        descriptor: &SwapChainDescriptor,
    ) -> RhiResult<Arc<SwapChain>> {
        // Validate
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(RhiError::InvalidParameter(
                "swap chain dimensions cannot be zero".to_string(),
            ));
        }

        self.gpu.create_swap_chain(descriptor)?;
        Ok(Arc::new(SwapChain::new(
            Arc::downgrade(self),
            descriptor.clone(),
        )))
    }

    // ========================================================================
    // Shaders, layouts, tables
    // ========================================================================

    /// Create a shader function from precompiled bytecode.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytecode or entry point is empty.
    pub fn create_shader_function(
        self: &Arc<Self>,
        descriptor: &ShaderFunctionDescriptor,
    ) -> RhiResult<Arc<ShaderFunction>> {
        // Validate
        if descriptor.bytecode.is_empty() {
            return Err(RhiError::InvalidParameter(
                "shader bytecode cannot be empty".to_string(),
            ));
        }
        if descriptor.entry_point.is_empty() {
            return Err(RhiError::InvalidParameter(
                "shader entry point cannot be empty".to_string(),
            ));
        }

        Ok(Arc::new(ShaderFunction::new(descriptor.clone())))
    }

    /// Create a pipeline layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the push-constant size is not a multiple of 4.
    pub fn create_pipeline_layout(
        self: &Arc<Self>,
        descriptor: &PipelineLayoutDescriptor,
    ) -> RhiResult<Arc<PipelineLayout>> {
        // Validate
        if descriptor.push_constant_size % 4 != 0 {
            return Err(RhiError::InvalidParameter(format!(
                "push constant size must be a multiple of 4, got {}",
                descriptor.push_constant_size
            )));
        }

        Ok(Arc::new(PipelineLayout::new(descriptor.clone())))
    }

    /// Create a resource table layout.
    ///
    /// # Errors
    ///
    /// Returns an error if a slot declares a zero count or a binding index
    /// repeats.
    pub fn create_resource_table_layout(
        self: &Arc<Self>,
        descriptor: &ResourceTableLayoutDescriptor,
    ) -> RhiResult<Arc<ResourceTableLayout>> {
        // Validate
        let mut seen = std::collections::BTreeSet::new();
        for slot in &descriptor.slots {
            if slot.count == 0 {
                return Err(RhiError::InvalidParameter(format!(
                    "binding {} declares a zero descriptor count",
                    slot.binding
                )));
            }
            if !seen.insert(slot.binding) {
                return Err(RhiError::InvalidParameter(format!(
                    "binding {} declared twice",
                    slot.binding
                )));
            }
        }

        Ok(Arc::new(ResourceTableLayout::new(descriptor.clone())))
    }

    /// Create a resource table.
    ///
    /// Reserves one shader-visible heap slot per descriptor the layout
    /// declares: sampler bindings from the sampler heap, everything else
    /// from the shader-resource heap.
    ///
    /// # Errors
    ///
    /// Returns an error when a heap is exhausted; slots taken before the
    /// failure go back to their heaps.
    pub fn create_resource_table(
        self: &Arc<Self>,
        descriptor: &ResourceTableDescriptor,
    ) -> RhiResult<Arc<ResourceTable>> {
        let layout = Arc::clone(&descriptor.layout);
        let mut slots = Vec::with_capacity(layout.descriptor_count() as usize);
        for slot_desc in &layout.descriptor().slots {
            let heap = match slot_desc.kind {
                ResourceBindingKind::Sampler => &self.sampler_heap,
                _ => &self.shader_resource_heap,
            };
            for _ in 0..slot_desc.count {
                match heap.allocate() {
                    Ok(slot) => slots.push(slot),
                    Err(err) => {
                        for taken in &slots {
                            self.release_descriptor(taken);
                        }
                        return Err(err);
                    }
                }
            }
        }

        log::trace!(
            "Device: created resource table {:?} with {} descriptors",
            descriptor.label,
            slots.len()
        );

        Ok(Arc::new(ResourceTable::new(
            Arc::downgrade(self),
            descriptor.clone(),
            slots,
        )))
    }

    /// Create a raytracing function table.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::NotSupported`] on a device without raytracing.
    ///
    /// # Panics
    ///
    /// Panics if the referenced pipeline was created by another device.
    pub fn create_function_table(
        self: &Arc<Self>,
        descriptor: &FunctionTableDescriptor,
    ) -> RhiResult<Arc<FunctionTable>> {
        if !self.capabilities.raytracing_supported() {
            return Err(RhiError::NotSupported(
                "function tables require raytracing support".to_string(),
            ));
        }
        assert!(
            Weak::ptr_eq(descriptor.pipeline.device_weak(), &Arc::downgrade(self)),
            "function table pipeline was created by another device"
        );

        Ok(Arc::new(FunctionTable::new(
            Arc::downgrade(self),
            descriptor.clone(),
        )))
    }

    // ========================================================================
    // Pipelines
    // ========================================================================

    /// Create a vertex/fragment raster pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if a function runs at the wrong stage, the pipeline
    /// declares no attachments, or more than 8 color formats.
    pub fn create_raster_pipeline(
        self: &Arc<Self>,
        descriptor: &RasterPipelineDescriptor,
    ) -> RhiResult<Arc<RasterPipeline>> {
        // Validate
        Self::check_stage(&descriptor.vertex_function, ShaderStage::Vertex)?;
        if let Some(fragment) = &descriptor.fragment_function {
            Self::check_stage(fragment, ShaderStage::Fragment)?;
        }
        Self::check_attachment_formats(
            descriptor.color_formats.len(),
            descriptor.depth_stencil_format.is_some(),
        )?;

        let gpu = self.gpu.create_pipeline(descriptor.label.as_deref())?;
        log::trace!("Device: created raster pipeline {:?}", descriptor.label);

        Ok(Arc::new(RasterPipeline::new_vertex(
            Arc::downgrade(self),
            descriptor.clone(),
            gpu,
        )))
    }

    /// Create a task/mesh/fragment raster pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::NotSupported`] on a device without mesh
    /// shading, or an error for wrong-stage functions or bad attachments.
    pub fn create_mesh_pipeline(
        self: &Arc<Self>,
        descriptor: &MeshPipelineDescriptor,
    ) -> RhiResult<Arc<RasterPipeline>> {
        if !self.capabilities.mesh_shading {
            return Err(RhiError::NotSupported(
                "mesh pipelines require mesh shading support".to_string(),
            ));
        }

        // Validate
        Self::check_stage(&descriptor.mesh_function, ShaderStage::Mesh)?;
        if let Some(task) = &descriptor.task_function {
            Self::check_stage(task, ShaderStage::Task)?;
        }
        if let Some(fragment) = &descriptor.fragment_function {
            Self::check_stage(fragment, ShaderStage::Fragment)?;
        }
        Self::check_attachment_formats(
            descriptor.color_formats.len(),
            descriptor.depth_stencil_format.is_some(),
        )?;

        let gpu = self.gpu.create_pipeline(descriptor.label.as_deref())?;
        log::trace!("Device: created mesh pipeline {:?}", descriptor.label);

        Ok(Arc::new(RasterPipeline::new_mesh(
            Arc::downgrade(self),
            descriptor.clone(),
            gpu,
        )))
    }

    /// Create a compute pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the function does not run at the compute stage.
    pub fn create_compute_pipeline(
        self: &Arc<Self>,
        descriptor: &ComputePipelineDescriptor,
    ) -> RhiResult<Arc<ComputePipeline>> {
        // Validate
        Self::check_stage(&descriptor.compute_function, ShaderStage::Compute)?;

        let gpu = self.gpu.create_pipeline(descriptor.label.as_deref())?;
        log::trace!("Device: created compute pipeline {:?}", descriptor.label);

        Ok(Arc::new(ComputePipeline::new(
            Arc::downgrade(self),
            descriptor.clone(),
            gpu,
        )))
    }

    /// Create a raytracing pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::NotSupported`] on a device without raytracing,
    /// or an error for wrong-stage functions.
    pub fn create_raytracing_pipeline(
        self: &Arc<Self>,
        descriptor: &RaytracingPipelineDescriptor,
    ) -> RhiResult<Arc<RaytracingPipeline>> {
        if !self.capabilities.raytracing_supported() {
            return Err(RhiError::NotSupported(
                "raytracing pipelines require raytracing support".to_string(),
            ));
        }

        // Validate
        Self::check_stage(&descriptor.ray_generation_function, ShaderStage::RayGeneration)?;
        for miss in &descriptor.miss_functions {
            Self::check_stage(miss, ShaderStage::Miss)?;
        }

        let gpu = self.gpu.create_pipeline(descriptor.label.as_deref())?;
        log::trace!("Device: created raytracing pipeline {:?}", descriptor.label);

        Ok(Arc::new(RaytracingPipeline::new(
            Arc::downgrade(self),
            descriptor.clone(),
            gpu,
        )))
    }

    fn check_stage(function: &Arc<ShaderFunction>, expected: ShaderStage) -> RhiResult<()> {
        if function.stage() != expected {
            return Err(RhiError::InvalidParameter(format!(
                "expected a {:?} function, got {:?}",
                expected,
                function.stage()
            )));
        }
        Ok(())
    }

    fn check_attachment_formats(color_count: usize, has_depth: bool) -> RhiResult<()> {
        if color_count > MAX_COLOR_ATTACHMENTS {
            return Err(RhiError::InvalidParameter(format!(
                "raster pipelines support at most {} color formats, got {}",
                MAX_COLOR_ATTACHMENTS, color_count
            )));
        }
        if color_count == 0 && !has_depth {
            return Err(RhiError::InvalidParameter(
                "raster pipelines need a color or depth-stencil format".to_string(),
            ));
        }
        Ok(())
    }

    // ========================================================================
    // Acceleration structures
    // ========================================================================

    /// Create a bottom-level acceleration structure.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::NotSupported`] on a device without raytracing,
    /// or an error if the descriptor declares no geometry.
    pub fn create_bottom_level_accel_struct(
        self: &Arc<Self>,
        descriptor: &BottomLevelAccelStructDescriptor,
    ) -> RhiResult<Arc<BottomLevelAccelStruct>> {
        if !self.capabilities.raytracing_supported() {
            return Err(RhiError::NotSupported(
                "acceleration structures require raytracing support".to_string(),
            ));
        }

        // Validate
        if descriptor.geometries.is_empty() {
            return Err(RhiError::InvalidParameter(
                "bottom-level structure declares no geometry".to_string(),
            ));
        }

        let gpu = self.gpu.create_accel_struct(descriptor.label.as_deref())?;
        Ok(Arc::new(BottomLevelAccelStruct::new(
            Arc::downgrade(self),
            descriptor.clone(),
            gpu,
        )))
    }

    /// Create a top-level acceleration structure.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::NotSupported`] on a device without raytracing.
    pub fn create_top_level_accel_struct(
        self: &Arc<Self>,
        descriptor: &TopLevelAccelStructDescriptor,
    ) -> RhiResult<Arc<TopLevelAccelStruct>> {
        if !self.capabilities.raytracing_supported() {
            return Err(RhiError::NotSupported(
                "acceleration structures require raytracing support".to_string(),
            ));
        }

        let gpu = self.gpu.create_accel_struct(descriptor.label.as_deref())?;
        Ok(Arc::new(TopLevelAccelStruct::new(
            Arc::downgrade(self),
            descriptor.clone(),
            gpu,
        )))
    }

    // ========================================================================
    // Indirect command buffers
    // ========================================================================

    /// Create an indirect command buffer replayed by compute encoders.
    ///
    /// # Errors
    ///
    /// Returns an error unless the operation kind is
    /// [`IndirectOpKind::Dispatch`] and the capacity is nonzero.
    pub fn create_compute_indirect_command_buffer(
        self: &Arc<Self>,
        descriptor: &IndirectCommandBufferDescriptor,
    ) -> RhiResult<Arc<ComputeIndirectCommandBuffer>> {
        Self::check_indirect_capacity(descriptor)?;
        if descriptor.op_kind != IndirectOpKind::Dispatch {
            return Err(RhiError::InvalidParameter(format!(
                "compute indirect command buffers execute dispatch records, got {:?}",
                descriptor.op_kind
            )));
        }

        let signature = self.indirect_signature(descriptor.op_kind)?;
        Ok(Arc::new(ComputeIndirectCommandBuffer::new(
            Arc::downgrade(self),
            descriptor.clone(),
            signature,
        )))
    }

    /// Create an indirect command buffer replayed by raster encoders.
    ///
    /// `Draw` and `DrawIndexed` records are always accepted; `Dispatch`
    /// records carry mesh draws and need mesh shading support.
    ///
    /// # Errors
    ///
    /// Returns an error for dispatch-rays records, a zero capacity, or
    /// mesh-draw records without mesh shading.
    pub fn create_raster_indirect_command_buffer(
        self: &Arc<Self>,
        descriptor: &IndirectCommandBufferDescriptor,
    ) -> RhiResult<Arc<RasterIndirectCommandBuffer>> {
        Self::check_indirect_capacity(descriptor)?;
        match descriptor.op_kind {
            IndirectOpKind::Draw | IndirectOpKind::DrawIndexed => {}
            IndirectOpKind::Dispatch => {
                if !self.capabilities.mesh_shading {
                    return Err(RhiError::NotSupported(
                        "mesh-draw records require mesh shading support".to_string(),
                    ));
                }
            }
            IndirectOpKind::DispatchRays => {
                return Err(RhiError::InvalidParameter(
                    "raster indirect command buffers cannot execute dispatch-rays records"
                        .to_string(),
                ));
            }
        }

        let signature = self.indirect_signature(descriptor.op_kind)?;
        Ok(Arc::new(RasterIndirectCommandBuffer::new(
            Arc::downgrade(self),
            descriptor.clone(),
            signature,
        )))
    }

    /// Create an indirect command buffer replayed by raytracing encoders.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::NotSupported`] on a device without raytracing,
    /// or an error unless the operation kind is
    /// [`IndirectOpKind::DispatchRays`].
    pub fn create_raytracing_indirect_command_buffer(
        self: &Arc<Self>,
        descriptor: &IndirectCommandBufferDescriptor,
    ) -> RhiResult<Arc<RaytracingIndirectCommandBuffer>> {
        if !self.capabilities.raytracing_supported() {
            return Err(RhiError::NotSupported(
                "raytracing indirect command buffers require raytracing support".to_string(),
            ));
        }
        Self::check_indirect_capacity(descriptor)?;
        if descriptor.op_kind != IndirectOpKind::DispatchRays {
            return Err(RhiError::InvalidParameter(format!(
                "raytracing indirect command buffers execute dispatch-rays records, got {:?}",
                descriptor.op_kind
            )));
        }

        let signature = self.indirect_signature(descriptor.op_kind)?;
        Ok(Arc::new(RaytracingIndirectCommandBuffer::new(
            Arc::downgrade(self),
            descriptor.clone(),
            signature,
        )))
    }

    fn check_indirect_capacity(descriptor: &IndirectCommandBufferDescriptor) -> RhiResult<()> {
        if descriptor.max_command_count == 0 {
            return Err(RhiError::InvalidParameter(
                "indirect command buffer capacity cannot be zero".to_string(),
            ));
        }
        Ok(())
    }

    // ========================================================================
    // Bookkeeping
    // ========================================================================

    /// Get the number of live buffers created by this device.
    pub fn buffer_count(&self) -> usize {
        self.buffers
            .read()
            .map(|b| b.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Get the number of live textures created by this device.
    pub fn texture_count(&self) -> usize {
        self.textures
            .read()
            .map(|t| t.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Get the number of live samplers created by this device.
    pub fn sampler_count(&self) -> usize {
        self.samplers
            .read()
            .map(|s| s.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Clean up dead weak references to released resources.
    pub fn cleanup_dead_resources(&self) {
        if let Ok(mut buffers) = self.buffers.write() {
            buffers.retain(|w| w.strong_count() > 0);
        }
        if let Ok(mut textures) = self.textures.write() {
            textures.retain(|w| w.strong_count() > 0);
        }
        if let Ok(mut samplers) = self.samplers.write() {
            samplers.retain(|w| w.strong_count() > 0);
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("feature_level", &self.capabilities.feature_level)
            .field("raytracing_tier", &self.capabilities.raytracing_tier)
            .finish()
    }
}

// Ensure Device is Send + Sync
static_assertions::assert_impl_all!(Device: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::RaytracingTier;
    use crate::types::{BufferUsage, TextureFormat};

    fn create_test_device() -> Arc<Device> {
        Device::new(&DeviceDescriptor::new()).unwrap()
    }

    fn device_with_profile(profile: AdapterProfile) -> Arc<Device> {
        Device::new(&DeviceDescriptor::new().with_adapter_profile(profile)).unwrap()
    }

    #[test]
    fn test_device_name() {
        let device = create_test_device();
        assert_eq!(device.name(), "Null Adapter");
    }

    #[test]
    fn test_device_creation_fails_without_feature_level() {
        let result =
            Device::new(&DeviceDescriptor::new().with_adapter_profile(AdapterProfile::unsupported()));
        assert!(matches!(result, Err(RhiError::DeviceCreationFailed(_))));
    }

    #[test]
    fn test_create_buffer() {
        let device = create_test_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX))
            .unwrap();
        assert_eq!(buffer.size(), 1024);
        assert_eq!(device.buffer_count(), 1);
    }

    #[test]
    fn test_create_buffer_zero_size() {
        let device = create_test_device();
        let result = device.create_buffer(&BufferDescriptor::new(0, BufferUsage::VERTEX));
        assert!(matches!(result, Err(RhiError::InvalidParameter(_))));
    }

    #[test]
    fn test_create_texture_reserves_slots() {
        let device = create_test_device();
        let texture = device
            .create_texture(&TextureDescriptor::new_2d(
                512,
                512,
                TextureFormat::Rgba8Unorm,
                TextureUsage::RENDER_TARGET | TextureUsage::SHADER_RESOURCE,
            ))
            .unwrap();
        assert!(texture.render_target_slot().is_some());
        assert!(texture.depth_stencil_slot().is_none());
        assert!(texture.shader_resource_slot().is_some());
        assert_eq!(
            device.allocated_descriptor_count(DescriptorHeapKind::RenderTarget),
            1
        );
        assert_eq!(
            device.allocated_descriptor_count(DescriptorHeapKind::ShaderResource),
            1
        );
    }

    #[test]
    fn test_texture_drop_returns_slots() {
        let device = create_test_device();
        {
            let _texture = device
                .create_texture(&TextureDescriptor::new_2d(
                    64,
                    64,
                    TextureFormat::Rgba8Unorm,
                    TextureUsage::RENDER_TARGET,
                ))
                .unwrap();
            assert_eq!(
                device.allocated_descriptor_count(DescriptorHeapKind::RenderTarget),
                1
            );
        }
        assert_eq!(
            device.allocated_descriptor_count(DescriptorHeapKind::RenderTarget),
            0
        );
        device.cleanup_dead_resources();
        assert_eq!(device.texture_count(), 0);
    }

    #[test]
    fn test_create_texture_zero_size() {
        let device = create_test_device();
        let result = device.create_texture(&TextureDescriptor::new_2d(
            0,
            512,
            TextureFormat::Rgba8Unorm,
            TextureUsage::SHADER_RESOURCE,
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_create_sampler_takes_sampler_slot() {
        let device = create_test_device();
        let sampler = device.create_sampler(&SamplerDescriptor::linear()).unwrap();
        let slot = sampler.slot().unwrap();
        assert_eq!(slot.heap_kind, DescriptorHeapKind::Sampler);
        assert!(slot.gpu_handle.is_some());
        assert_eq!(device.sampler_count(), 1);
    }

    #[test]
    fn test_signature_cache_strides() {
        let device = create_test_device();
        assert_eq!(
            device.indirect_signature(IndirectOpKind::Draw).unwrap().byte_stride(),
            16
        );
        assert_eq!(
            device
                .indirect_signature(IndirectOpKind::DrawIndexed)
                .unwrap()
                .byte_stride(),
            20
        );
        assert_eq!(
            device
                .indirect_signature(IndirectOpKind::Dispatch)
                .unwrap()
                .byte_stride(),
            12
        );
    }

    #[test]
    fn test_dispatch_rays_signature_missing_without_raytracing() {
        let device = device_with_profile(
            AdapterProfile::default().with_raytracing_tier(RaytracingTier::NotSupported),
        );
        let result = device.indirect_signature(IndirectOpKind::DispatchRays);
        assert!(matches!(result, Err(RhiError::NotSupported(_))));
    }

    #[test]
    fn test_mesh_pipeline_requires_support() {
        let device = device_with_profile(AdapterProfile::default().with_mesh_shading(false));
        let layout = device
            .create_pipeline_layout(&PipelineLayoutDescriptor::new(vec![]))
            .unwrap();
        let mesh = device
            .create_shader_function(&ShaderFunctionDescriptor::new(
                ShaderStage::Mesh,
                vec![0u8; 8],
                "ms_main",
            ))
            .unwrap();
        let result = device.create_mesh_pipeline(&MeshPipelineDescriptor::new(layout, mesh)
            .with_color_formats(vec![TextureFormat::Rgba8Unorm]));
        assert!(matches!(result, Err(RhiError::NotSupported(_))));
    }

    #[test]
    fn test_wrong_stage_function_rejected() {
        let device = create_test_device();
        let layout = device
            .create_pipeline_layout(&PipelineLayoutDescriptor::new(vec![]))
            .unwrap();
        let fragment = device
            .create_shader_function(&ShaderFunctionDescriptor::new(
                ShaderStage::Fragment,
                vec![0u8; 8],
                "fs_main",
            ))
            .unwrap();
        let result =
            device.create_compute_pipeline(&ComputePipelineDescriptor::new(layout, fragment));
        assert!(matches!(result, Err(RhiError::InvalidParameter(_))));
    }

    #[test]
    fn test_swap_chain_not_supported_on_null() {
        let device = create_test_device();
        let result = device.create_swap_chain(&SwapChainDescriptor::new(
            800,
            600,
            TextureFormat::Bgra8Unorm,
        ));
        assert!(matches!(result, Err(RhiError::NotSupported(_))));
    }

    #[test]
    fn test_raster_indirect_rejects_dispatch_rays() {
        let device = create_test_device();
        let result = device.create_raster_indirect_command_buffer(
            &IndirectCommandBufferDescriptor::new(IndirectOpKind::DispatchRays, 16),
        );
        assert!(matches!(result, Err(RhiError::InvalidParameter(_))));
    }

    #[test]
    fn test_raytracing_indirect_requires_tier() {
        let device = device_with_profile(
            AdapterProfile::default().with_raytracing_tier(RaytracingTier::NotSupported),
        );
        let result = device.create_raytracing_indirect_command_buffer(
            &IndirectCommandBufferDescriptor::new(IndirectOpKind::DispatchRays, 16),
        );
        assert!(matches!(result, Err(RhiError::NotSupported(_))));
    }
}
