//! Command queues, command buffers, and fences.
//!
//! A command buffer records a [`Command`] stream through the pass encoders
//! and hands it to the backend at submission. Recording is single-threaded
//! per buffer; separate buffers record concurrently on separate threads.

use std::sync::Arc;

use crate::backend::GpuFence;
use crate::device::Device;
use crate::encoder::{ComputeEncoder, RasterEncoder, RaytracingEncoder, TransferEncoder};
use crate::error::{RhiError, RhiResult};
use crate::resources::{
    BottomLevelAccelStruct, Buffer, ComputeIndirectCommandBuffer, ComputePipeline, FunctionTable,
    Query, RasterIndirectCommandBuffer, RasterPipeline, RaytracingIndirectCommandBuffer,
    RaytracingPipeline, ResourceTable, Texture, TopLevelAccelStruct,
};
use crate::types::{
    BufferCopyView, BufferState, Extent3d, ScissorRect, ShadingRate, ShadingRateCombiner,
    TextureCopyView, TextureState, Viewport,
};

// ============================================================================
// Recorded Commands
// ============================================================================

/// Kind of pass currently open on a command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    Transfer,
    Compute,
    Raster,
    Raytracing,
}

/// One recorded command.
///
/// The stream is the contract between the recording frontend and the
/// backend: encoders validate and append, backends translate. It is
/// inspectable (see [`CommandBuffer::commands`]) so recording behavior can
/// be asserted without a driver.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone)]
pub enum Command {
    // Pass scope
    BeginTransferPass { name: String },
    BeginComputePass { name: String },
    BeginRaytracingPass { name: String },
    BeginRasterPass {
        name: String,
        color_attachment_count: u32,
        sub_pass_count: u32,
    },
    NextSubPass { index: u32 },
    EndPass,

    // Debug scope
    PushDebugGroup { name: String },
    PopDebugGroup,

    // Queries
    WriteTimestamp { query: Arc<Query>, index: u32 },
    ResolveQuery {
        query: Arc<Query>,
        first_index: u32,
        count: u32,
    },
    BeginOcclusion { query: Arc<Query>, index: u32 },
    EndOcclusion { query: Arc<Query>, index: u32 },
    BeginStatistics { query: Arc<Query>, index: u32 },
    EndStatistics { query: Arc<Query>, index: u32 },

    // Copies
    CopyBufferToBuffer {
        src: Arc<Buffer>,
        src_offset: u64,
        dst: Arc<Buffer>,
        dst_offset: u64,
        size: u64,
    },
    CopyBufferToTexture {
        src: BufferCopyView,
        dst: TextureCopyView,
        extent: Extent3d,
    },
    CopyTextureToBuffer {
        src: TextureCopyView,
        dst: BufferCopyView,
        extent: Extent3d,
    },
    CopyTextureToTexture {
        src: TextureCopyView,
        dst: TextureCopyView,
        extent: Extent3d,
    },

    // Barriers
    BufferBarrier {
        buffer: Arc<Buffer>,
        src_state: BufferState,
        dst_state: BufferState,
    },
    TextureBarrier {
        texture: Arc<Texture>,
        src_state: TextureState,
        dst_state: TextureState,
    },

    // Bindings
    SetComputePipeline { pipeline: Arc<ComputePipeline> },
    SetRasterPipeline { pipeline: Arc<RasterPipeline> },
    SetRaytracingPipeline { pipeline: Arc<RaytracingPipeline> },
    SetResourceTable {
        table: Arc<ResourceTable>,
        table_index: u32,
    },
    SetIndexBuffer { buffer: Arc<Buffer>, offset: u64 },
    SetVertexBuffer {
        buffer: Arc<Buffer>,
        slot: u32,
        offset: u64,
    },

    // Dynamic raster state
    SetScissors { rects: Vec<ScissorRect> },
    SetViewports { viewports: Vec<Viewport> },
    SetStencilReference { value: u32 },
    SetBlendFactor { value: [f32; 4] },
    SetShadingRate {
        rate: ShadingRate,
        combiner: ShadingRateCombiner,
    },

    // Work submission
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    },
    DrawIndirect {
        args_buffer: Arc<Buffer>,
        offset: u64,
        draw_count: u32,
    },
    DrawIndexedIndirect {
        args_buffer: Arc<Buffer>,
        offset: u64,
        draw_count: u32,
    },
    DrawMesh {
        group_count_x: u32,
        group_count_y: u32,
        group_count_z: u32,
    },
    DrawMeshIndirect { args_buffer: Arc<Buffer>, offset: u64 },
    Dispatch {
        group_count_x: u32,
        group_count_y: u32,
        group_count_z: u32,
    },
    DispatchIndirect { args_buffer: Arc<Buffer>, offset: u64 },
    DispatchRays {
        width: u32,
        height: u32,
        depth: u32,
        function_table: Arc<FunctionTable>,
    },
    DispatchRaysIndirect {
        args_buffer: Arc<Buffer>,
        offset: u64,
        function_table: Arc<FunctionTable>,
    },
    ExecuteComputeIndirect {
        commands: Arc<ComputeIndirectCommandBuffer>,
    },
    ExecuteRasterIndirect {
        commands: Arc<RasterIndirectCommandBuffer>,
    },
    ExecuteRaytracingIndirect {
        commands: Arc<RaytracingIndirectCommandBuffer>,
    },

    // Acceleration structure builds
    BuildBottomLevelAccelStruct { accel: Arc<BottomLevelAccelStruct> },
    BuildTopLevelAccelStruct { accel: Arc<TopLevelAccelStruct> },
}

// ============================================================================
// Command Buffer
// ============================================================================

/// A recorded stream of GPU commands.
///
/// Created by [`CommandQueue::create_command_buffer`]. Passes are opened
/// through the encoder accessors ([`transfer_encoder`](Self::transfer_encoder)
/// and friends); one pass may be open at a time, and an open pass must reach
/// `end_pass` before the buffer can be submitted.
pub struct CommandBuffer {
    device: Arc<Device>,
    name: String,
    commands: Vec<Command>,
    open_pass: Option<PassKind>,
}

impl CommandBuffer {
    pub(crate) fn new(device: Arc<Device>, name: String) -> Self {
        log::trace!("Created command buffer {:?}", name);
        Self {
            device,
            name,
            commands: Vec::new(),
            open_pass: None,
        }
    }

    /// Debug name of the buffer.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device the buffer records against.
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// The recorded command stream.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of recorded commands.
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Whether a pass is currently open.
    pub fn is_pass_open(&self) -> bool {
        self.open_pass.is_some()
    }

    /// Kind of the currently open pass, if any.
    pub fn open_pass(&self) -> Option<PassKind> {
        self.open_pass
    }

    /// Acquire a transfer encoder over this buffer.
    ///
    /// The encoder starts closed; open a pass with its `begin_pass`.
    pub fn transfer_encoder(&mut self) -> TransferEncoder<'_> {
        TransferEncoder::new(self)
    }

    /// Acquire a compute encoder over this buffer.
    pub fn compute_encoder(&mut self) -> ComputeEncoder<'_> {
        ComputeEncoder::new(self)
    }

    /// Acquire a raster encoder over this buffer.
    pub fn raster_encoder(&mut self) -> RasterEncoder<'_> {
        RasterEncoder::new(self)
    }

    /// Acquire a raytracing encoder over this buffer.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::NotSupported`] on a device without raytracing.
    pub fn raytracing_encoder(&mut self) -> RhiResult<RaytracingEncoder<'_>> {
        if !self.device.capabilities().raytracing_supported() {
            return Err(RhiError::NotSupported(
                "raytracing passes require raytracing support".to_string(),
            ));
        }
        Ok(RaytracingEncoder::new(self))
    }

    /// Discard all recorded commands.
    ///
    /// # Panics
    ///
    /// Panics if a pass is open.
    pub fn reset(&mut self) {
        assert!(
            self.open_pass.is_none(),
            "command buffer {:?} reset with an open {:?} pass",
            self.name,
            self.open_pass
        );
        self.commands.clear();
    }

    pub(crate) fn push_command(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub(crate) fn mark_pass_open(&mut self, kind: PassKind) {
        assert!(
            self.open_pass.is_none(),
            "command buffer {:?} already has an open {:?} pass",
            self.name,
            self.open_pass
        );
        self.open_pass = Some(kind);
    }

    pub(crate) fn mark_pass_closed(&mut self) {
        self.open_pass = None;
    }
}

impl std::fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("name", &self.name)
            .field("commands", &self.commands.len())
            .field("open_pass", &self.open_pass)
            .finish()
    }
}

// ============================================================================
// Command Queue
// ============================================================================

/// Hardware queue family a command queue submits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandQueueKind {
    /// Graphics queue, accepts every pass kind.
    Graphics,
    /// Async compute queue.
    Compute,
    /// Copy queue.
    Transfer,
}

/// A submission queue of the device.
pub struct CommandQueue {
    device: Arc<Device>,
    kind: CommandQueueKind,
}

impl CommandQueue {
    pub(crate) fn new(device: Arc<Device>, kind: CommandQueueKind) -> Self {
        log::debug!("Created {:?} command queue", kind);
        Self { device, kind }
    }

    /// Queue family this queue submits to.
    pub fn kind(&self) -> CommandQueueKind {
        self.kind
    }

    /// Device the queue belongs to.
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Create a command buffer recording against this queue's device.
    pub fn create_command_buffer(&self, name: impl Into<String>) -> CommandBuffer {
        CommandBuffer::new(Arc::clone(&self.device), name.into())
    }

    /// Submit a recorded command buffer, optionally signaling `fence` when
    /// the work completes.
    ///
    /// # Panics
    ///
    /// Panics if the buffer still has an open pass, or if the buffer or
    /// fence was created by another device.
    pub fn submit(&self, buffer: &CommandBuffer, signal_fence: Option<&Fence>) -> RhiResult<()> {
        assert!(
            !buffer.is_pass_open(),
            "command buffer {:?} submitted with an open {:?} pass",
            buffer.name(),
            buffer.open_pass()
        );
        assert!(
            Arc::ptr_eq(buffer.device(), &self.device),
            "command buffer {:?} was created by another device",
            buffer.name()
        );
        if let Some(fence) = signal_fence {
            assert!(
                Arc::ptr_eq(fence.device(), &self.device),
                "signal fence was created by another device"
            );
        }

        log::trace!(
            "Submitting command buffer {:?} ({} commands) to {:?} queue",
            buffer.name(),
            buffer.command_count(),
            self.kind
        );
        self.device
            .gpu()
            .submit(buffer.name(), buffer.commands(), signal_fence.map(|f| &f.gpu))
    }
}

impl std::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandQueue")
            .field("kind", &self.kind)
            .finish()
    }
}

// ============================================================================
// Fence
// ============================================================================

/// CPU-GPU synchronization fence.
///
/// Signaled by the backend when a submission carrying it completes.
pub struct Fence {
    device: Arc<Device>,
    pub(crate) gpu: GpuFence,
}

impl Fence {
    pub(crate) fn new(device: Arc<Device>, gpu: GpuFence) -> Self {
        Self { device, gpu }
    }

    /// Device the fence belongs to.
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Check whether the fence is signaled without blocking.
    pub fn is_signaled(&self) -> bool {
        self.device.gpu().is_fence_signaled(&self.gpu)
    }

    /// Block the calling thread until the fence is signaled.
    pub fn wait(&self) {
        self.device.gpu().wait_fence(&self.gpu);
    }
}

impl std::fmt::Debug for Fence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fence")
            .field("signaled", &self.is_signaled())
            .finish()
    }
}

static_assertions::assert_impl_all!(CommandQueue: Send, Sync);
static_assertions::assert_impl_all!(CommandBuffer: Send);
static_assertions::assert_impl_all!(Fence: Send, Sync);
