//! Raster pass encoder.

use std::sync::{Arc, Weak};

use crate::command::{Command, CommandBuffer, PassKind};
use crate::resources::{Buffer, RasterIndirectCommandBuffer, RasterPipeline, ResourceTable};
use crate::types::{
    BufferUsage, IndirectOpKind, OcclusionBinding, RasterPassDescriptor, ScissorRect, ShadingRate,
    ShadingRateCombiner, StatisticsBinding, StoreAction, TextureUsage, TimestampBinding, Viewport,
    MAX_COLOR_ATTACHMENTS,
};

use super::{
    check_indirect_args, check_occlusion_binding, check_same_device, check_statistics_binding,
    check_timestamp_binding,
};

struct RasterPassState {
    name: String,
    sub_pass_count: usize,
    sub_pass_index: usize,
    timestamp: Option<TimestampBinding>,
    occlusion: Option<OcclusionBinding>,
    statistics: Option<StatisticsBinding>,
    open_occlusion: Option<u32>,
    statistics_open: bool,
    debug_groups: u32,
}

/// Records draw work inside raster passes.
///
/// Acquired through [`CommandBuffer::raster_encoder`]. A raster pass owns a
/// fixed attachment set and a declared sub-pass sequence; `begin_pass`
/// enters sub-pass 0 and [`next_sub_pass`](Self::next_sub_pass) advances in
/// order. Dynamic state and bindings persist across sub-pass transitions;
/// nothing is reset until the pass ends.
pub struct RasterEncoder<'a> {
    buffer: &'a mut CommandBuffer,
    pass: Option<RasterPassState>,
    bound_pipeline: Weak<RasterPipeline>,
}

impl<'a> RasterEncoder<'a> {
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

    /// Zero-based index of the current sub-pass, if a pass is open.
    pub fn sub_pass_index(&self) -> Option<u32> {
        self.pass.as_ref().map(|state| state.sub_pass_index as u32)
    }

    /// Open a raster pass and enter sub-pass 0.
    ///
    /// The attachment set is validated up front: attachment and resolve
    /// textures must come from the encoder's device and carry the matching
    /// usage flags, a `Resolve` store action requires a resolve target, and
    /// every sub-pass input/output index must address a declared color
    /// attachment.
    ///
    /// # Panics
    ///
    /// Panics if a pass is already open on this encoder or its command
    /// buffer, or on any descriptor validation failure.
    pub fn begin_pass(&mut self, descriptor: RasterPassDescriptor) {
        assert!(
            self.pass.is_none(),
            "raster encoder already has an open pass"
        );
        self.validate_descriptor(&descriptor);

        let color_attachment_count = descriptor.color_attachments.len();
        let sub_pass_count = descriptor.sub_pass_count();
        self.buffer.mark_pass_open(PassKind::Raster);
        self.buffer.push_command(Command::BeginRasterPass {
            name: descriptor.name.clone(),
            color_attachment_count: color_attachment_count as u32,
            sub_pass_count: sub_pass_count as u32,
        });
        if let Some(binding) = &descriptor.timestamp {
            self.buffer.push_command(Command::WriteTimestamp {
                query: Arc::clone(&binding.query),
                index: binding.begin_index,
            });
        }
        self.bound_pipeline = Weak::new();
        self.pass = Some(RasterPassState {
            name: descriptor.name,
            sub_pass_count,
            sub_pass_index: 0,
            timestamp: descriptor.timestamp,
            occlusion: descriptor.occlusion,
            statistics: descriptor.statistics,
            open_occlusion: None,
            statistics_open: false,
            debug_groups: 0,
        });
    }

    /// Close the open pass.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open, or a debug group, occlusion scope, or
    /// statistics scope was left open.
    pub fn end_pass(&mut self) {
        let state = match self.pass.take() {
            Some(state) => state,
            None => panic!("no open raster pass to end"),
        };
        assert!(
            state.debug_groups == 0,
            "raster pass {:?} ended with {} open debug groups",
            state.name,
            state.debug_groups
        );
        assert!(
            state.open_occlusion.is_none(),
            "raster pass {:?} ended with an open occlusion scope",
            state.name
        );
        assert!(
            !state.statistics_open,
            "raster pass {:?} ended with an open statistics scope",
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

    /// Advance to the next declared sub-pass.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open or the pass is already in its last
    /// sub-pass.
    pub fn next_sub_pass(&mut self) {
        let state = self.state();
        assert!(
            state.sub_pass_index + 1 < state.sub_pass_count,
            "raster pass {:?} has {} sub-passes, cannot advance past the last",
            state.name,
            state.sub_pass_count
        );
        state.sub_pass_index += 1;
        let index = state.sub_pass_index as u32;
        self.buffer.push_command(Command::NextSubPass { index });
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
            "pop_debug_group without a matching push_debug_group in raster pass {:?}",
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
            None => panic!("raster pass {:?} has no timestamp binding", state.name),
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

    /// Start counting passed samples into slot `index` of the pass's bound
    /// occlusion query.
    ///
    /// # Panics
    ///
    /// Panics if the pass has no occlusion binding, a scope is already
    /// open, or `index` is out of range.
    pub fn begin_occlusion(&mut self, index: u32) {
        let state = self.state();
        assert!(
            state.open_occlusion.is_none(),
            "occlusion scope already open in raster pass {:?}",
            state.name
        );
        let query = match &state.occlusion {
            Some(binding) => Arc::clone(&binding.query),
            None => panic!("raster pass {:?} has no occlusion binding", state.name),
        };
        assert!(
            index < query.count(),
            "occlusion index {} out of range for query with {} slots",
            index,
            query.count()
        );
        state.open_occlusion = Some(index);
        self.buffer
            .push_command(Command::BeginOcclusion { query, index });
    }

    /// Stop counting passed samples for slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if no occlusion scope is open or `index` does not match the
    /// open scope.
    pub fn end_occlusion(&mut self, index: u32) {
        let state = self.state();
        let query = match &state.occlusion {
            Some(binding) => Arc::clone(&binding.query),
            None => panic!("raster pass {:?} has no occlusion binding", state.name),
        };
        match state.open_occlusion {
            Some(open) => assert!(
                open == index,
                "occlusion scope was opened with index {open}, ended with {index}"
            ),
            None => panic!("no open occlusion scope in raster pass {:?}", state.name),
        }
        state.open_occlusion = None;
        self.buffer
            .push_command(Command::EndOcclusion { query, index });
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
            "statistics scope already open in raster pass {:?}",
            state.name
        );
        let (query, index) = match &state.statistics {
            Some(binding) => (Arc::clone(&binding.query), binding.write_index),
            None => panic!("raster pass {:?} has no statistics binding", state.name),
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
            "no open statistics scope in raster pass {:?}",
            state.name
        );
        let (query, index) = match &state.statistics {
            Some(binding) => (Arc::clone(&binding.query), binding.write_index),
            None => panic!("raster pass {:?} has no statistics binding", state.name),
        };
        state.statistics_open = false;
        self.buffer
            .push_command(Command::EndStatistics { query, index });
    }

    /// Bind a raster pipeline, vertex or mesh.
    ///
    /// Rebinding the pipeline that is already bound records nothing.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open or the pipeline belongs to another device.
    pub fn set_pipeline(&mut self, pipeline: &Arc<RasterPipeline>) {
        self.expect_open("set_pipeline");
        check_same_device(self.buffer, pipeline.device_weak(), "raster pipeline");
        if self.bound_pipeline.ptr_eq(&Arc::downgrade(pipeline)) {
            return;
        }
        self.bound_pipeline = Arc::downgrade(pipeline);
        self.buffer.push_command(Command::SetRasterPipeline {
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

    /// Bind the index buffer for indexed draws.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open, the buffer belongs to another device, or
    /// it lacks `INDEX` usage.
    pub fn set_index_buffer(&mut self, index_buffer: &Arc<Buffer>, offset: u64) {
        self.expect_open("set_index_buffer");
        check_same_device(self.buffer, index_buffer.device_weak(), "index buffer");
        assert!(
            index_buffer.usage().contains(BufferUsage::INDEX),
            "index buffer {:?} missing INDEX usage",
            index_buffer.label()
        );
        self.buffer.push_command(Command::SetIndexBuffer {
            buffer: Arc::clone(index_buffer),
            offset,
        });
    }

    /// Bind a vertex buffer at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open, the buffer belongs to another device, or
    /// it lacks `VERTEX` usage.
    pub fn set_vertex_buffer(&mut self, vertex_buffer: &Arc<Buffer>, slot: u32, offset: u64) {
        self.expect_open("set_vertex_buffer");
        check_same_device(self.buffer, vertex_buffer.device_weak(), "vertex buffer");
        assert!(
            vertex_buffer.usage().contains(BufferUsage::VERTEX),
            "vertex buffer {:?} missing VERTEX usage",
            vertex_buffer.label()
        );
        self.buffer.push_command(Command::SetVertexBuffer {
            buffer: Arc::clone(vertex_buffer),
            slot,
            offset,
        });
    }

    /// Set a single scissor rectangle.
    pub fn set_scissor(&mut self, rect: ScissorRect) {
        self.expect_open("set_scissor");
        self.buffer
            .push_command(Command::SetScissors { rects: vec![rect] });
    }

    /// Set one scissor rectangle per viewport.
    pub fn set_scissors(&mut self, rects: &[ScissorRect]) {
        self.expect_open("set_scissors");
        self.buffer.push_command(Command::SetScissors {
            rects: rects.to_vec(),
        });
    }

    /// Set a single viewport.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.expect_open("set_viewport");
        self.buffer.push_command(Command::SetViewports {
            viewports: vec![viewport],
        });
    }

    /// Set multiple viewports.
    pub fn set_viewports(&mut self, viewports: &[Viewport]) {
        self.expect_open("set_viewports");
        self.buffer.push_command(Command::SetViewports {
            viewports: viewports.to_vec(),
        });
    }

    /// Set the stencil reference value.
    pub fn set_stencil_reference(&mut self, value: u32) {
        self.expect_open("set_stencil_reference");
        self.buffer
            .push_command(Command::SetStencilReference { value });
    }

    /// Set the blend constant factor.
    pub fn set_blend_factor(&mut self, value: [f32; 4]) {
        self.expect_open("set_blend_factor");
        self.buffer.push_command(Command::SetBlendFactor { value });
    }

    /// Set the per-draw shading rate and its combiner.
    pub fn set_shading_rate(&mut self, rate: ShadingRate, combiner: ShadingRateCombiner) {
        self.expect_open("set_shading_rate");
        self.buffer
            .push_command(Command::SetShadingRate { rate, combiner });
    }

    /// Draw unindexed primitives.
    pub fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.expect_open("draw");
        self.buffer.push_command(Command::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }

    /// Draw indexed primitives.
    ///
    /// `base_vertex` is added to each fetched index before vertex lookup
    /// and may be negative.
    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) {
        self.expect_open("draw_indexed");
        self.buffer.push_command(Command::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            base_vertex,
            first_instance,
        });
    }

    /// Draw `draw_count` times with arguments read from `args_buffer` at
    /// `offset`, one [`DrawIndirectArgs`] record per draw.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open or the argument buffer fails the indirect
    /// contract (device, `INDIRECT` usage, alignment, size).
    ///
    /// [`DrawIndirectArgs`]: crate::types::DrawIndirectArgs
    pub fn draw_indirect(&mut self, args_buffer: &Arc<Buffer>, offset: u64, draw_count: u32) {
        self.expect_open("draw_indirect");
        let bytes = IndirectOpKind::Draw.byte_stride() as u64 * draw_count as u64;
        check_indirect_args(self.buffer, args_buffer, offset, bytes);
        self.buffer.push_command(Command::DrawIndirect {
            args_buffer: Arc::clone(args_buffer),
            offset,
            draw_count,
        });
    }

    /// Draw indexed `draw_count` times with arguments read from
    /// `args_buffer` at `offset`, one [`DrawIndexedIndirectArgs`] record per
    /// draw.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open or the argument buffer fails the indirect
    /// contract (device, `INDIRECT` usage, alignment, size).
    ///
    /// [`DrawIndexedIndirectArgs`]: crate::types::DrawIndexedIndirectArgs
    pub fn draw_indexed_indirect(
        &mut self,
        args_buffer: &Arc<Buffer>,
        offset: u64,
        draw_count: u32,
    ) {
        self.expect_open("draw_indexed_indirect");
        let bytes = IndirectOpKind::DrawIndexed.byte_stride() as u64 * draw_count as u64;
        check_indirect_args(self.buffer, args_buffer, offset, bytes);
        self.buffer.push_command(Command::DrawIndexedIndirect {
            args_buffer: Arc::clone(args_buffer),
            offset,
            draw_count,
        });
    }

    /// Launch mesh shader groups.
    ///
    /// The bound pipeline must have been created through
    /// [`Device::create_mesh_pipeline`](crate::device::Device::create_mesh_pipeline).
    pub fn draw_mesh(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) {
        self.expect_open("draw_mesh");
        self.buffer.push_command(Command::DrawMesh {
            group_count_x,
            group_count_y,
            group_count_z,
        });
    }

    /// Launch mesh shader groups with counts read from `args_buffer` at
    /// `offset`.
    ///
    /// Mesh draw arguments share the [`DispatchIndirectArgs`] layout.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open or the argument buffer fails the indirect
    /// contract (device, `INDIRECT` usage, alignment, size).
    ///
    /// [`DispatchIndirectArgs`]: crate::types::DispatchIndirectArgs
    pub fn draw_mesh_indirect(&mut self, args_buffer: &Arc<Buffer>, offset: u64) {
        self.expect_open("draw_mesh_indirect");
        check_indirect_args(
            self.buffer,
            args_buffer,
            offset,
            IndirectOpKind::Dispatch.byte_stride() as u64,
        );
        self.buffer.push_command(Command::DrawMeshIndirect {
            args_buffer: Arc::clone(args_buffer),
            offset,
        });
    }

    /// Execute a pre-recorded indirect command buffer.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open or `commands` belongs to another device.
    pub fn execute_indirect(&mut self, commands: &Arc<RasterIndirectCommandBuffer>) {
        self.expect_open("execute_indirect");
        check_same_device(self.buffer, commands.device_weak(), "indirect command buffer");
        self.buffer.push_command(Command::ExecuteRasterIndirect {
            commands: Arc::clone(commands),
        });
    }

    fn validate_descriptor(&self, descriptor: &RasterPassDescriptor) {
        let color_count = descriptor.color_attachments.len();
        assert!(
            color_count <= MAX_COLOR_ATTACHMENTS,
            "raster pass {:?} declares {} color attachments, limit is {}",
            descriptor.name,
            color_count,
            MAX_COLOR_ATTACHMENTS
        );
        for (i, attachment) in descriptor.color_attachments.iter().enumerate() {
            check_same_device(
                self.buffer,
                attachment.texture.device_weak(),
                "color attachment texture",
            );
            assert!(
                attachment.texture.usage().contains(TextureUsage::RENDER_TARGET),
                "color attachment {i} texture {:?} missing RENDER_TARGET usage",
                attachment.texture.label()
            );
            if attachment.store_action == StoreAction::Resolve {
                match &attachment.resolve_target {
                    Some(target) => check_same_device(
                        self.buffer,
                        target.device_weak(),
                        "resolve target texture",
                    ),
                    None => panic!(
                        "color attachment {i} stores with Resolve but has no resolve target"
                    ),
                }
            }
        }
        if let Some(depth) = &descriptor.depth_stencil_attachment {
            check_same_device(
                self.buffer,
                depth.texture.device_weak(),
                "depth-stencil attachment texture",
            );
            assert!(
                depth.texture.usage().contains(TextureUsage::DEPTH_STENCIL),
                "depth-stencil attachment texture {:?} missing DEPTH_STENCIL usage",
                depth.texture.label()
            );
            let resolves = depth.depth_store_action == StoreAction::Resolve
                || depth.stencil_store_action == StoreAction::Resolve;
            if resolves {
                match &depth.resolve_target {
                    Some(target) => check_same_device(
                        self.buffer,
                        target.device_weak(),
                        "depth resolve target texture",
                    ),
                    None => panic!(
                        "depth-stencil attachment stores with Resolve but has no resolve target"
                    ),
                }
            }
        }
        if let Some(texture) = &descriptor.shading_rate_texture {
            check_same_device(self.buffer, texture.device_weak(), "shading rate texture");
            assert!(
                texture.usage().contains(TextureUsage::SHADING_RATE),
                "shading rate texture {:?} missing SHADING_RATE usage",
                texture.label()
            );
        }
        for (i, sub_pass) in descriptor.sub_passes.iter().enumerate() {
            for index in sub_pass.color_inputs.iter().chain(sub_pass.color_outputs.iter()) {
                assert!(
                    index >= 0 && (index as usize) < color_count,
                    "sub-pass {i} references color attachment {index} but the pass declares {color_count}"
                );
            }
        }
        if let Some(binding) = &descriptor.timestamp {
            check_timestamp_binding(self.buffer, binding);
        }
        if let Some(binding) = &descriptor.occlusion {
            check_occlusion_binding(self.buffer, binding);
        }
        if let Some(binding) = &descriptor.statistics {
            check_statistics_binding(self.buffer, binding);
        }
    }

    fn state(&mut self) -> &mut RasterPassState {
        match &mut self.pass {
            Some(state) => state,
            None => panic!("no open raster pass to record into"),
        }
    }

    fn expect_open(&self, op: &str) {
        assert!(self.pass.is_some(), "{op} requires an open raster pass");
    }
}

impl Drop for RasterEncoder<'_> {
    fn drop(&mut self) {
        if let Some(state) = &self.pass {
            log::warn!(
                "Raster pass {:?} dropped without end_pass; its command buffer can no longer be submitted",
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
    use crate::resources::Texture;
    use crate::types::{
        ColorAttachmentDescriptor, PipelineLayoutDescriptor, QueryDescriptor, QueryKind,
        RasterPipelineDescriptor, ShaderFunctionDescriptor, ShaderStage, SubPassDescriptor,
        TextureDescriptor, TextureFormat,
    };

    fn test_setup() -> (Arc<Device>, CommandBuffer) {
        let device = Device::new(&DeviceDescriptor::new()).unwrap();
        let queue = device.create_command_queue(CommandQueueKind::Graphics);
        let buffer = queue.create_command_buffer("raster test");
        (device, buffer)
    }

    fn render_target(device: &Arc<Device>) -> Arc<Texture> {
        device
            .create_texture(&TextureDescriptor::new_2d(
                64,
                64,
                TextureFormat::Rgba8Unorm,
                TextureUsage::RENDER_TARGET,
            ))
            .unwrap()
    }

    fn test_pipeline(device: &Arc<Device>) -> Arc<RasterPipeline> {
        let layout = device
            .create_pipeline_layout(&PipelineLayoutDescriptor::new(Vec::new()))
            .unwrap();
        let vertex = device
            .create_shader_function(&ShaderFunctionDescriptor::new(
                ShaderStage::Vertex,
                vec![0u8; 16],
                "vs_main",
            ))
            .unwrap();
        device
            .create_raster_pipeline(
                &RasterPipelineDescriptor::new(layout, vertex)
                    .with_color_formats(vec![TextureFormat::Rgba8Unorm]),
            )
            .unwrap()
    }

    #[test]
    fn test_two_sub_pass_stream_shape() {
        let (device, mut buffer) = test_setup();
        let target_a = render_target(&device);
        let target_b = render_target(&device);
        let pipeline = test_pipeline(&device);

        let mut encoder = buffer.raster_encoder();
        encoder.begin_pass(
            RasterPassDescriptor::new("gbuffer")
                .with_color_attachment(ColorAttachmentDescriptor::from_texture(target_a))
                .with_color_attachment(ColorAttachmentDescriptor::from_texture(target_b))
                .with_sub_pass(SubPassDescriptor::with_outputs(&[0, 1]))
                .with_sub_pass(SubPassDescriptor::with_outputs(&[1]).with_inputs(&[0])),
        );
        assert_eq!(encoder.sub_pass_index(), Some(0));
        encoder.set_pipeline(&pipeline);
        encoder.draw(3, 1, 0, 0);
        encoder.next_sub_pass();
        assert_eq!(encoder.sub_pass_index(), Some(1));
        encoder.draw(3, 1, 0, 0);
        encoder.end_pass();
        drop(encoder);

        let commands = buffer.commands();
        assert!(matches!(
            commands[0],
            Command::BeginRasterPass {
                color_attachment_count: 2,
                sub_pass_count: 2,
                ..
            }
        ));
        assert!(matches!(commands[1], Command::SetRasterPipeline { .. }));
        assert!(matches!(commands[2], Command::Draw { vertex_count: 3, .. }));
        assert!(matches!(commands[3], Command::NextSubPass { index: 1 }));
        assert!(matches!(commands[4], Command::Draw { .. }));
        assert!(matches!(commands[5], Command::EndPass));
    }

    #[test]
    fn test_state_not_reemitted_across_sub_pass() {
        let (device, mut buffer) = test_setup();
        let target = render_target(&device);

        let mut encoder = buffer.raster_encoder();
        encoder.begin_pass(
            RasterPassDescriptor::new("persist")
                .with_color_attachment(ColorAttachmentDescriptor::from_texture(target))
                .with_sub_pass(SubPassDescriptor::with_outputs(&[0]))
                .with_sub_pass(SubPassDescriptor::with_outputs(&[0])),
        );
        encoder.set_scissor(ScissorRect::new(0, 0, 64, 64));
        encoder.next_sub_pass();
        encoder.end_pass();
        drop(encoder);

        let scissors = buffer
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::SetScissors { .. }))
            .count();
        assert_eq!(scissors, 1);
    }

    #[test]
    fn test_implicit_single_sub_pass() {
        let (device, mut buffer) = test_setup();
        let target = render_target(&device);

        let mut encoder = buffer.raster_encoder();
        encoder.begin_pass(
            RasterPassDescriptor::new("flat")
                .with_color_attachment(ColorAttachmentDescriptor::from_texture(target)),
        );
        encoder.end_pass();
        drop(encoder);

        assert!(matches!(
            buffer.commands()[0],
            Command::BeginRasterPass {
                sub_pass_count: 1,
                ..
            }
        ));
    }

    #[test]
    #[should_panic(expected = "cannot advance past the last")]
    fn test_next_sub_pass_past_end_panics() {
        let (device, mut buffer) = test_setup();
        let target = render_target(&device);

        let mut encoder = buffer.raster_encoder();
        encoder.begin_pass(
            RasterPassDescriptor::new("single")
                .with_color_attachment(ColorAttachmentDescriptor::from_texture(target)),
        );
        encoder.next_sub_pass();
    }

    #[test]
    #[should_panic(expected = "references color attachment")]
    fn test_sub_pass_index_out_of_range_panics() {
        let (device, mut buffer) = test_setup();
        let target = render_target(&device);

        buffer.raster_encoder().begin_pass(
            RasterPassDescriptor::new("dangling")
                .with_color_attachment(ColorAttachmentDescriptor::from_texture(target))
                .with_sub_pass(SubPassDescriptor::with_outputs(&[1])),
        );
    }

    #[test]
    #[should_panic(expected = "has no resolve target")]
    fn test_resolve_without_target_panics() {
        let (device, mut buffer) = test_setup();
        let target = render_target(&device);

        buffer.raster_encoder().begin_pass(
            RasterPassDescriptor::new("unresolved").with_color_attachment(
                ColorAttachmentDescriptor::from_texture(target)
                    .with_store_action(StoreAction::Resolve),
            ),
        );
    }

    #[test]
    #[should_panic(expected = "missing RENDER_TARGET usage")]
    fn test_color_attachment_usage_checked() {
        let (device, mut buffer) = test_setup();
        let sampled = device
            .create_texture(&TextureDescriptor::new_2d(
                64,
                64,
                TextureFormat::Rgba8Unorm,
                TextureUsage::SHADER_RESOURCE,
            ))
            .unwrap();

        buffer.raster_encoder().begin_pass(
            RasterPassDescriptor::new("not a target")
                .with_color_attachment(ColorAttachmentDescriptor::from_texture(sampled)),
        );
    }

    #[test]
    #[should_panic(expected = "requires an open raster pass")]
    fn test_draw_outside_pass_panics() {
        let (_device, mut buffer) = test_setup();
        buffer.raster_encoder().draw(3, 1, 0, 0);
    }

    #[test]
    #[should_panic(expected = "ended with an open occlusion scope")]
    fn test_open_occlusion_scope_blocks_end_pass() {
        let (device, mut buffer) = test_setup();
        let target = render_target(&device);
        let query = device
            .create_query(&QueryDescriptor::new(QueryKind::Occlusion, 4))
            .unwrap();

        let mut encoder = buffer.raster_encoder();
        encoder.begin_pass(
            RasterPassDescriptor::new("leaky")
                .with_color_attachment(ColorAttachmentDescriptor::from_texture(target))
                .with_occlusion(OcclusionBinding::new(query)),
        );
        encoder.begin_occlusion(0);
        encoder.end_pass();
    }

    #[test]
    fn test_occlusion_scope_stream() {
        let (device, mut buffer) = test_setup();
        let target = render_target(&device);
        let query = device
            .create_query(&QueryDescriptor::new(QueryKind::Occlusion, 4))
            .unwrap();

        let mut encoder = buffer.raster_encoder();
        encoder.begin_pass(
            RasterPassDescriptor::new("counted")
                .with_color_attachment(ColorAttachmentDescriptor::from_texture(target))
                .with_occlusion(OcclusionBinding::new(query)),
        );
        encoder.begin_occlusion(2);
        encoder.draw(3, 1, 0, 0);
        encoder.end_occlusion(2);
        encoder.end_pass();
        drop(encoder);

        let commands = buffer.commands();
        assert!(matches!(commands[1], Command::BeginOcclusion { index: 2, .. }));
        assert!(matches!(commands[3], Command::EndOcclusion { index: 2, .. }));
    }

    #[test]
    fn test_pipeline_rebind_elided() {
        let (device, mut buffer) = test_setup();
        let target = render_target(&device);
        let pipeline = test_pipeline(&device);

        let mut encoder = buffer.raster_encoder();
        encoder.begin_pass(
            RasterPassDescriptor::new("elide")
                .with_color_attachment(ColorAttachmentDescriptor::from_texture(target)),
        );
        encoder.set_pipeline(&pipeline);
        encoder.set_pipeline(&pipeline);
        encoder.draw(3, 1, 0, 0);
        encoder.end_pass();
        drop(encoder);

        let binds = buffer
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::SetRasterPipeline { .. }))
            .count();
        assert_eq!(binds, 1);
    }
}
