//! Raytracing pass encoder.

use std::sync::{Arc, Weak};

use crate::command::{Command, CommandBuffer, PassKind};
use crate::resources::{
    BottomLevelAccelStruct, Buffer, FunctionTable, RaytracingIndirectCommandBuffer,
    RaytracingPipeline, ResourceTable, Texture, TopLevelAccelStruct,
};
use crate::types::{
    BufferState, IndirectOpKind, RaytracingPassDescriptor, StatisticsBinding, TextureState,
    TimestampBinding,
};

use super::{
    check_indirect_args, check_same_device, check_statistics_binding, check_timestamp_binding,
};

struct RaytracingPassState {
    name: String,
    timestamp: Option<TimestampBinding>,
    statistics: Option<StatisticsBinding>,
    statistics_open: bool,
    debug_groups: u32,
}

/// Records acceleration-structure builds and ray dispatches inside
/// raytracing passes.
///
/// Acquired through [`CommandBuffer::raytracing_encoder`], which fails on
/// devices without raytracing support. Every ray dispatch names the
/// [`FunctionTable`] resolving its shader records. Like compute, hazards
/// are not tracked; builds that feed dispatches need an explicit barrier
/// between them.
pub struct RaytracingEncoder<'a> {
    buffer: &'a mut CommandBuffer,
    pass: Option<RaytracingPassState>,
    bound_pipeline: Weak<RaytracingPipeline>,
}

impl<'a> RaytracingEncoder<'a> {
    pub(crate) fn new(buffer: &'a mut CommandBuffer) -> Self {
        Self {
            buffer,
            pass: None,
            bound_pipeline: Weak::new(),
        }
    }

    /// Whether a pass is currently open on this encoder.
    pub fn is_open(&self) -> bool {
        self.pass.is_some()
    }

    /// Open a raytracing pass.
    ///
    /// # Panics
    ///
    /// Panics if a pass is already open on this encoder or its command
    /// buffer, or if a query binding is invalid.
    pub fn begin_pass(&mut self, descriptor: RaytracingPassDescriptor) {
        assert!(
            self.pass.is_none(),
            "raytracing encoder already has an open pass"
        );
        if let Some(binding) = &descriptor.timestamp {
            check_timestamp_binding(self.buffer, binding);
        }
        if let Some(binding) = &descriptor.statistics {
            check_statistics_binding(self.buffer, binding);
        }

        self.buffer.mark_pass_open(PassKind::Raytracing);
        self.buffer.push_command(Command::BeginRaytracingPass {
            name: descriptor.name.clone(),
        });
        if let Some(binding) = &descriptor.timestamp {
            self.buffer.push_command(Command::WriteTimestamp {
                query: Arc::clone(&binding.query),
                index: binding.begin_index,
            });
        }
        self.bound_pipeline = Weak::new();
        self.pass = Some(RaytracingPassState {
            name: descriptor.name,
            timestamp: descriptor.timestamp,
            statistics: descriptor.statistics,
            statistics_open: false,
            debug_groups: 0,
        });
    }

    /// Close the open pass.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open, a debug group was left open, or a
    /// statistics scope was left open.
    pub fn end_pass(&mut self) {
        let state = match self.pass.take() {
            Some(state) => state,
            None => panic!("no open raytracing pass to end"),
        };
        assert!(
            state.debug_groups == 0,
            "raytracing pass {:?} ended with {} open debug groups",
            state.name,
            state.debug_groups
        );
        assert!(
            !state.statistics_open,
            "raytracing pass {:?} ended with an open statistics scope",
            state.name
        );
        if let Some(binding) = &state.timestamp {
            self.buffer.push_command(Command::WriteTimestamp {
                query: Arc::clone(&binding.query),
                index: binding.end_index,
            });
        }
        self.buffer.push_command(Command::EndPass);
        self.buffer.mark_pass_closed();
    }

    /// Open a named debug group.
    pub fn push_debug_group(&mut self, name: impl Into<String>) {
        self.state().debug_groups += 1;
        self.buffer
            .push_command(Command::PushDebugGroup { name: name.into() });
    }

    /// Close the innermost debug group.
    ///
    /// # Panics
    ///
    /// Panics if no debug group is open.
    pub fn pop_debug_group(&mut self) {
        let state = self.state();
        assert!(
            state.debug_groups > 0,
            "pop_debug_group without a matching push_debug_group in raytracing pass {:?}",
            state.name
        );
        state.debug_groups -= 1;
        self.buffer.push_command(Command::PopDebugGroup);
    }

    /// Write a timestamp into slot `index` of the pass's bound query.
    ///
    /// # Panics
    ///
    /// Panics if the pass has no timestamp binding or `index` is out of
    /// range.
    pub fn write_timestamp(&mut self, index: u32) {
        let state = self.state();
        let query = match &state.timestamp {
            Some(binding) => Arc::clone(&binding.query),
            None => panic!("raytracing pass {:?} has no timestamp binding", state.name),
        };
        assert!(
            index < query.count(),
            "timestamp index {} out of range for query with {} slots",
            index,
            query.count()
        );
        self.buffer
            .push_command(Command::WriteTimestamp { query, index });
    }

    /// Start accumulating pipeline statistics into the pass's bound query.
    ///
    /// # Panics
    ///
    /// Panics if the pass has no statistics binding or a scope is already
    /// open.
    pub fn begin_statistics(&mut self) {
        let state = self.state();
        assert!(
            !state.statistics_open,
            "statistics scope already open in raytracing pass {:?}",
            state.name
        );
        let (query, index) = match &state.statistics {
            Some(binding) => (Arc::clone(&binding.query), binding.write_index),
            None => panic!("raytracing pass {:?} has no statistics binding", state.name),
        };
        state.statistics_open = true;
        self.buffer
            .push_command(Command::BeginStatistics { query, index });
    }

    /// Stop accumulating pipeline statistics.
    ///
    /// # Panics
    ///
    /// Panics if no statistics scope is open.
    pub fn end_statistics(&mut self) {
        let state = self.state();
        assert!(
            state.statistics_open,
            "no open statistics scope in raytracing pass {:?}",
            state.name
        );
        let (query, index) = match &state.statistics {
            Some(binding) => (Arc::clone(&binding.query), binding.write_index),
            None => panic!("raytracing pass {:?} has no statistics binding", state.name),
        };
        state.statistics_open = false;
        self.buffer
            .push_command(Command::EndStatistics { query, index });
    }

    /// Record a buffer memory barrier.
    ///
    /// Barriers are explicit; no recording call inserts one on its own.
    pub fn buffer_barrier(
        &mut self,
        barrier_buffer: &Arc<Buffer>,
        src_state: BufferState,
        dst_state: BufferState,
    ) {
        self.expect_open("buffer_barrier");
        check_same_device(self.buffer, barrier_buffer.device_weak(), "barrier buffer");
        self.buffer.push_command(Command::BufferBarrier {
            buffer: Arc::clone(barrier_buffer),
            src_state,
            dst_state,
        });
    }

    /// Record a texture memory barrier.
    pub fn texture_barrier(
        &mut self,
        texture: &Arc<Texture>,
        src_state: TextureState,
        dst_state: TextureState,
    ) {
        self.expect_open("texture_barrier");
        check_same_device(self.buffer, texture.device_weak(), "barrier texture");
        self.buffer.push_command(Command::TextureBarrier {
            texture: Arc::clone(texture),
            src_state,
            dst_state,
        });
    }

    /// Bind a raytracing pipeline.
    ///
    /// Rebinding the pipeline that is already bound records nothing.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open or the pipeline belongs to another device.
    pub fn set_pipeline(&mut self, pipeline: &Arc<RaytracingPipeline>) {
        self.expect_open("set_pipeline");
        check_same_device(self.buffer, pipeline.device_weak(), "raytracing pipeline");
        if self.bound_pipeline.ptr_eq(&Arc::downgrade(pipeline)) {
            return;
        }
        self.bound_pipeline = Arc::downgrade(pipeline);
        self.buffer.push_command(Command::SetRaytracingPipeline {
            pipeline: Arc::clone(pipeline),
        });
    }

    /// Bind a resource table at `table_index`.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open or the table belongs to another device.
    pub fn set_resource_table(&mut self, table: &Arc<ResourceTable>, table_index: u32) {
        self.expect_open("set_resource_table");
        check_same_device(self.buffer, table.device_weak(), "resource table");
        self.buffer.push_command(Command::SetResourceTable {
            table: Arc::clone(table),
            table_index,
        });
    }

    /// Build a bottom-level acceleration structure from its geometries.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open or the structure belongs to another
    /// device.
    pub fn build_bottom_level(&mut self, accel: &Arc<BottomLevelAccelStruct>) {
        self.expect_open("build_bottom_level");
        check_same_device(self.buffer, accel.device_weak(), "acceleration structure");
        self.buffer.push_command(Command::BuildBottomLevelAccelStruct {
            accel: Arc::clone(accel),
        });
    }

    /// Build a top-level acceleration structure from its instances.
    ///
    /// Instanced bottom-level structures must already be built when the
    /// command executes; inserting the barrier between the builds is the
    /// caller's job.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open or the structure belongs to another
    /// device.
    pub fn build_top_level(&mut self, accel: &Arc<TopLevelAccelStruct>) {
        self.expect_open("build_top_level");
        check_same_device(self.buffer, accel.device_weak(), "acceleration structure");
        self.buffer.push_command(Command::BuildTopLevelAccelStruct {
            accel: Arc::clone(accel),
        });
    }

    /// Dispatch a `width x height x depth` ray grid, resolving shader
    /// records through `function_table`.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open or the function table belongs to another
    /// device.
    pub fn dispatch_rays(
        &mut self,
        width: u32,
        height: u32,
        depth: u32,
        function_table: &Arc<FunctionTable>,
    ) {
        self.expect_open("dispatch_rays");
        check_same_device(self.buffer, function_table.device_weak(), "function table");
        self.buffer.push_command(Command::DispatchRays {
            width,
            height,
            depth,
            function_table: Arc::clone(function_table),
        });
    }

    /// Dispatch rays with the grid and shader tables read from
    /// `args_buffer` at `offset` as one [`DispatchRaysIndirectArgs`]
    /// record.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open, the function table belongs to another
    /// device, or the argument buffer fails the indirect contract (device,
    /// `INDIRECT` usage, alignment, size).
    ///
    /// [`DispatchRaysIndirectArgs`]: crate::types::DispatchRaysIndirectArgs
    pub fn dispatch_rays_indirect(
        &mut self,
        args_buffer: &Arc<Buffer>,
        offset: u64,
        function_table: &Arc<FunctionTable>,
    ) {
        self.expect_open("dispatch_rays_indirect");
        check_same_device(self.buffer, function_table.device_weak(), "function table");
        check_indirect_args(
            self.buffer,
            args_buffer,
            offset,
            IndirectOpKind::DispatchRays.byte_stride() as u64,
        );
        self.buffer.push_command(Command::DispatchRaysIndirect {
            args_buffer: Arc::clone(args_buffer),
            offset,
            function_table: Arc::clone(function_table),
        });
    }

    /// Execute a pre-recorded indirect command buffer.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open or `commands` belongs to another device.
    pub fn execute_indirect(&mut self, commands: &Arc<RaytracingIndirectCommandBuffer>) {
        self.expect_open("execute_indirect");
        check_same_device(self.buffer, commands.device_weak(), "indirect command buffer");
        self.buffer.push_command(Command::ExecuteRaytracingIndirect {
            commands: Arc::clone(commands),
        });
    }

    fn state(&mut self) -> &mut RaytracingPassState {
        match &mut self.pass {
            Some(state) => state,
            None => panic!("no open raytracing pass to record into"),
        }
    }

    fn expect_open(&self, op: &str) {
        assert!(self.pass.is_some(), "{op} requires an open raytracing pass");
    }
}

impl Drop for RaytracingEncoder<'_> {
    fn drop(&mut self) {
        if let Some(state) = &self.pass {
            log::warn!(
                "Raytracing pass {:?} dropped without end_pass; its command buffer can no longer be submitted",
                state.name
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{AdapterProfile, RaytracingTier};
    use crate::command::CommandQueueKind;
    use crate::device::{Device, DeviceDescriptor};
    use crate::types::{
        AccelGeometryDescriptor, BottomLevelAccelStructDescriptor, BufferDescriptor, BufferUsage,
        FunctionTableDescriptor, PipelineLayoutDescriptor, RaytracingPipelineDescriptor,
        ShaderFunctionDescriptor, ShaderStage,
    };

    fn raytracing_setup() -> (Arc<Device>, CommandBuffer) {
        let device = Device::new(&DeviceDescriptor::new()).unwrap();
        let queue = device.create_command_queue(CommandQueueKind::Graphics);
        let buffer = queue.create_command_buffer("raytracing test");
        (device, buffer)
    }

    fn test_function_table(device: &Arc<Device>) -> Arc<FunctionTable> {
        let layout = device
            .create_pipeline_layout(&PipelineLayoutDescriptor::new(Vec::new()))
            .unwrap();
        let ray_generation = device
            .create_shader_function(&ShaderFunctionDescriptor::new(
                ShaderStage::RayGeneration,
                vec![0u8; 16],
                "raygen_main",
            ))
            .unwrap();
        let miss = device
            .create_shader_function(&ShaderFunctionDescriptor::new(
                ShaderStage::Miss,
                vec![0u8; 16],
                "miss_main",
            ))
            .unwrap();
        let pipeline = device
            .create_raytracing_pipeline(
                &RaytracingPipelineDescriptor::new(layout, ray_generation)
                    .with_miss_function(miss),
            )
            .unwrap();
        device
            .create_function_table(&FunctionTableDescriptor::new(pipeline))
            .unwrap()
    }

    #[test]
    fn test_build_then_dispatch_stream() {
        let (device, mut buffer) = raytracing_setup();
        let vertices = device
            .create_buffer(&BufferDescriptor::new(36 * 12, BufferUsage::STORAGE))
            .unwrap();
        let blas = device
            .create_bottom_level_accel_struct(&BottomLevelAccelStructDescriptor::new(vec![
                AccelGeometryDescriptor::triangles(vertices, 36, 12),
            ]))
            .unwrap();
        let table = test_function_table(&device);

        let mut encoder = buffer.raytracing_encoder().unwrap();
        encoder.begin_pass(RaytracingPassDescriptor::new("trace"));
        encoder.build_bottom_level(&blas);
        encoder.dispatch_rays(1920, 1080, 1, &table);
        encoder.end_pass();
        drop(encoder);

        let commands = buffer.commands();
        assert_eq!(commands.len(), 4);
        assert!(matches!(commands[0], Command::BeginRaytracingPass { .. }));
        assert!(matches!(
            commands[1],
            Command::BuildBottomLevelAccelStruct { .. }
        ));
        assert!(matches!(
            commands[2],
            Command::DispatchRays {
                width: 1920,
                height: 1080,
                depth: 1,
                ..
            }
        ));
        assert!(matches!(commands[3], Command::EndPass));
    }

    #[test]
    fn test_encoder_unavailable_without_raytracing() {
        let profile =
            AdapterProfile::default().with_raytracing_tier(RaytracingTier::NotSupported);
        let device = Device::new(&DeviceDescriptor::new().with_adapter_profile(profile)).unwrap();
        let queue = device.create_command_queue(CommandQueueKind::Graphics);
        let mut buffer = queue.create_command_buffer("no tier");
        assert!(buffer.raytracing_encoder().is_err());
    }

    #[test]
    #[should_panic(expected = "requires an open raytracing pass")]
    fn test_dispatch_outside_pass_panics() {
        let (device, mut buffer) = raytracing_setup();
        let table = test_function_table(&device);
        buffer
            .raytracing_encoder()
            .unwrap()
            .dispatch_rays(1, 1, 1, &table);
    }

    #[test]
    #[should_panic(expected = "overrun buffer of size")]
    fn test_indirect_record_size_checked() {
        let (device, mut buffer) = raytracing_setup();
        let table = test_function_table(&device);
        // One DispatchRays record needs 104 bytes.
        let args = device
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::INDIRECT))
            .unwrap();

        let mut encoder = buffer.raytracing_encoder().unwrap();
        encoder.begin_pass(RaytracingPassDescriptor::new("short args"));
        encoder.dispatch_rays_indirect(&args, 0, &table);
    }
}
