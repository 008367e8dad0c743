//! Compute pass encoder.

use std::sync::{Arc, Weak};

use crate::command::{Command, CommandBuffer, PassKind};
use crate::resources::{Buffer, ComputeIndirectCommandBuffer, ComputePipeline, ResourceTable, Texture};
use crate::types::{
    BufferState, ComputePassDescriptor, IndirectOpKind, StatisticsBinding, TextureState,
    TimestampBinding,
};

use super::{
    check_indirect_args, check_same_device, check_statistics_binding, check_timestamp_binding,
};

struct ComputePassState {
    name: String,
    timestamp: Option<TimestampBinding>,
    statistics: Option<StatisticsBinding>,
    statistics_open: bool,
    debug_groups: u32,
}

/// Records dispatch work inside compute passes.
///
/// Acquired through [`CommandBuffer::compute_encoder`]. Hazards between
/// dispatches are not tracked; the caller inserts
/// [`buffer_barrier`](Self::buffer_barrier) and
/// [`texture_barrier`](Self::texture_barrier) calls where needed.
pub struct ComputeEncoder<'a> {
    buffer: &'a mut CommandBuffer,
    pass: Option<ComputePassState>,
    bound_pipeline: Weak<ComputePipeline>,
}

impl<'a> ComputeEncoder<'a> {
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

    /// Open a compute pass.
    ///
    /// # Panics
    ///
    /// Panics if a pass is already open on this encoder or its command
    /// buffer, or if a query binding is invalid.
    pub fn begin_pass(&mut self, descriptor: ComputePassDescriptor) {
        assert!(
            self.pass.is_none(),
            "compute encoder already has an open pass"
        );
        if let Some(binding) = &descriptor.timestamp {
            check_timestamp_binding(self.buffer, binding);
        }
        if let Some(binding) = &descriptor.statistics {
            check_statistics_binding(self.buffer, binding);
        }

        self.buffer.mark_pass_open(PassKind::Compute);
        self.buffer.push_command(Command::BeginComputePass {
            name: descriptor.name.clone(),
        });
        if let Some(binding) = &descriptor.timestamp {
            self.buffer.push_command(Command::WriteTimestamp {
                query: Arc::clone(&binding.query),
                index: binding.begin_index,
            });
        }
        self.bound_pipeline = Weak::new();
        self.pass = Some(ComputePassState {
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
            None => panic!("no open compute pass to end"),
        };
        assert!(
            state.debug_groups == 0,
            "compute pass {:?} ended with {} open debug groups",
            state.name,
            state.debug_groups
        );
        assert!(
            !state.statistics_open,
            "compute pass {:?} ended with an open statistics scope",
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
            "pop_debug_group without a matching push_debug_group in compute pass {:?}",
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
            None => panic!("compute pass {:?} has no timestamp binding", state.name),
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
            "statistics scope already open in compute pass {:?}",
            state.name
        );
        let (query, index) = match &state.statistics {
            Some(binding) => (Arc::clone(&binding.query), binding.write_index),
            None => panic!("compute pass {:?} has no statistics binding", state.name),
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
            "no open statistics scope in compute pass {:?}",
            state.name
        );
        let (query, index) = match &state.statistics {
            Some(binding) => (Arc::clone(&binding.query), binding.write_index),
            None => panic!("compute pass {:?} has no statistics binding", state.name),
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

    /// Bind a compute pipeline.
    ///
    /// Rebinding the pipeline that is already bound records nothing.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open or the pipeline belongs to another device.
    pub fn set_pipeline(&mut self, pipeline: &Arc<ComputePipeline>) {
        self.expect_open("set_pipeline");
        check_same_device(self.buffer, pipeline.device_weak(), "compute pipeline");
        if self.bound_pipeline.ptr_eq(&Arc::downgrade(pipeline)) {
            return;
        }
        self.bound_pipeline = Arc::downgrade(pipeline);
        self.buffer.push_command(Command::SetComputePipeline {
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

    /// Dispatch thread groups.
    pub fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) {
        self.expect_open("dispatch");
        self.buffer.push_command(Command::Dispatch {
            group_count_x,
            group_count_y,
            group_count_z,
        });
    }

    /// Dispatch thread groups with counts read from `args_buffer` at
    /// `offset`.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open or the argument buffer fails the indirect
    /// contract (device, `INDIRECT` usage, alignment, size).
    pub fn dispatch_indirect(&mut self, args_buffer: &Arc<Buffer>, offset: u64) {
        self.expect_open("dispatch_indirect");
        check_indirect_args(
            self.buffer,
            args_buffer,
            offset,
            IndirectOpKind::Dispatch.byte_stride() as u64,
        );
        self.buffer.push_command(Command::DispatchIndirect {
            args_buffer: Arc::clone(args_buffer),
            offset,
        });
    }

    /// Execute a pre-recorded indirect command buffer.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open or `commands` belongs to another device.
    pub fn execute_indirect(&mut self, commands: &Arc<ComputeIndirectCommandBuffer>) {
        self.expect_open("execute_indirect");
        check_same_device(self.buffer, commands.device_weak(), "indirect command buffer");
        self.buffer.push_command(Command::ExecuteComputeIndirect {
            commands: Arc::clone(commands),
        });
    }

    fn state(&mut self) -> &mut ComputePassState {
        match &mut self.pass {
            Some(state) => state,
            None => panic!("no open compute pass to record into"),
        }
    }

    fn expect_open(&self, op: &str) {
        assert!(self.pass.is_some(), "{op} requires an open compute pass");
    }
}

impl Drop for ComputeEncoder<'_> {
    fn drop(&mut self) {
        if let Some(state) = &self.pass {
            log::warn!(
                "Compute pass {:?} dropped without end_pass; its command buffer can no longer be submitted",
                state.name
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandQueueKind;
    use crate::device::{Device, DeviceDescriptor};
    use crate::types::{
        BufferDescriptor, BufferUsage, ComputePipelineDescriptor, PipelineLayoutDescriptor,
        QueryDescriptor, QueryKind, ShaderFunctionDescriptor, ShaderStage,
    };

    fn test_setup() -> (Arc<Device>, CommandBuffer) {
        let device = Device::new(&DeviceDescriptor::new()).unwrap();
        let queue = device.create_command_queue(CommandQueueKind::Compute);
        let buffer = queue.create_command_buffer("compute test");
        (device, buffer)
    }

    fn test_pipeline(device: &Arc<Device>) -> Arc<ComputePipeline> {
        let layout = device
            .create_pipeline_layout(&PipelineLayoutDescriptor::new(Vec::new()))
            .unwrap();
        let function = device
            .create_shader_function(&ShaderFunctionDescriptor::new(
                ShaderStage::Compute,
                vec![0u8; 16],
                "cs_main",
            ))
            .unwrap();
        device
            .create_compute_pipeline(&ComputePipelineDescriptor::new(layout, function))
            .unwrap()
    }

    #[test]
    fn test_dispatch_stream_shape() {
        let (device, mut buffer) = test_setup();
        let pipeline = test_pipeline(&device);

        let mut encoder = buffer.compute_encoder();
        encoder.begin_pass(ComputePassDescriptor::new("reduce"));
        encoder.set_pipeline(&pipeline);
        encoder.dispatch(64, 1, 1);
        encoder.end_pass();
        drop(encoder);

        let commands = buffer.commands();
        assert_eq!(commands.len(), 4);
        assert!(matches!(commands[0], Command::BeginComputePass { .. }));
        assert!(matches!(commands[1], Command::SetComputePipeline { .. }));
        assert!(matches!(
            commands[2],
            Command::Dispatch {
                group_count_x: 64,
                group_count_y: 1,
                group_count_z: 1,
            }
        ));
        assert!(matches!(commands[3], Command::EndPass));
    }

    #[test]
    fn test_pipeline_rebind_elided() {
        let (device, mut buffer) = test_setup();
        let pipeline = test_pipeline(&device);

        let mut encoder = buffer.compute_encoder();
        encoder.begin_pass(ComputePassDescriptor::new("elide"));
        encoder.set_pipeline(&pipeline);
        encoder.set_pipeline(&pipeline);
        encoder.dispatch(1, 1, 1);
        encoder.end_pass();
        drop(encoder);

        let binds = buffer
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::SetComputePipeline { .. }))
            .count();
        assert_eq!(binds, 1);
    }

    #[test]
    fn test_rebind_recorded_after_new_pass() {
        let (device, mut buffer) = test_setup();
        let pipeline = test_pipeline(&device);

        let mut encoder = buffer.compute_encoder();
        encoder.begin_pass(ComputePassDescriptor::new("first"));
        encoder.set_pipeline(&pipeline);
        encoder.end_pass();
        encoder.begin_pass(ComputePassDescriptor::new("second"));
        encoder.set_pipeline(&pipeline);
        encoder.end_pass();
        drop(encoder);

        let binds = buffer
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::SetComputePipeline { .. }))
            .count();
        assert_eq!(binds, 2);
    }

    #[test]
    fn test_statistics_scope() {
        let (device, mut buffer) = test_setup();
        let query = device
            .create_query(&QueryDescriptor::new(QueryKind::PipelineStatistics, 2))
            .unwrap();

        let mut encoder = buffer.compute_encoder();
        encoder.begin_pass(
            ComputePassDescriptor::new("counted")
                .with_statistics(StatisticsBinding::new(Arc::clone(&query), 1)),
        );
        encoder.begin_statistics();
        encoder.dispatch(8, 8, 1);
        encoder.end_statistics();
        encoder.end_pass();
        drop(encoder);

        let commands = buffer.commands();
        assert!(matches!(commands[1], Command::BeginStatistics { index: 1, .. }));
        assert!(matches!(commands[3], Command::EndStatistics { index: 1, .. }));
    }

    #[test]
    #[should_panic(expected = "ended with an open statistics scope")]
    fn test_open_statistics_scope_blocks_end_pass() {
        let (device, mut buffer) = test_setup();
        let query = device
            .create_query(&QueryDescriptor::new(QueryKind::PipelineStatistics, 1))
            .unwrap();

        let mut encoder = buffer.compute_encoder();
        encoder.begin_pass(
            ComputePassDescriptor::new("leaky")
                .with_statistics(StatisticsBinding::new(query, 0)),
        );
        encoder.begin_statistics();
        encoder.end_pass();
    }

    #[test]
    #[should_panic(expected = "requires a PipelineStatistics query")]
    fn test_statistics_binding_kind_checked() {
        let (device, mut buffer) = test_setup();
        let query = device
            .create_query(&QueryDescriptor::new(QueryKind::Timestamp, 1))
            .unwrap();

        buffer.compute_encoder().begin_pass(
            ComputePassDescriptor::new("mismatched")
                .with_statistics(StatisticsBinding::new(query, 0)),
        );
    }

    #[test]
    #[should_panic(expected = "is not 4-byte aligned")]
    fn test_indirect_offset_alignment_checked() {
        let (device, mut buffer) = test_setup();
        let args = device
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::INDIRECT))
            .unwrap();

        let mut encoder = buffer.compute_encoder();
        encoder.begin_pass(ComputePassDescriptor::new("misaligned"));
        encoder.dispatch_indirect(&args, 2);
    }

    #[test]
    #[should_panic(expected = "missing INDIRECT usage")]
    fn test_indirect_usage_checked() {
        let (device, mut buffer) = test_setup();
        let args = device
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::STORAGE))
            .unwrap();

        let mut encoder = buffer.compute_encoder();
        encoder.begin_pass(ComputePassDescriptor::new("unusable"));
        encoder.dispatch_indirect(&args, 0);
    }

    #[test]
    #[should_panic(expected = "overrun buffer of size")]
    fn test_indirect_overrun_checked() {
        let (device, mut buffer) = test_setup();
        let args = device
            .create_buffer(&BufferDescriptor::new(16, BufferUsage::INDIRECT))
            .unwrap();

        let mut encoder = buffer.compute_encoder();
        encoder.begin_pass(ComputePassDescriptor::new("overrun"));
        encoder.dispatch_indirect(&args, 8);
    }
}
