//! Transfer pass encoder.

use std::sync::Arc;

use crate::command::{Command, CommandBuffer, PassKind};
use crate::resources::{Buffer, Query};
use crate::types::{
    BufferCopyView, BufferUsage, Extent3d, TextureCopyView, TextureUsage, TimestampBinding,
    TransferPassDescriptor,
};

use super::{check_same_device, check_timestamp_binding};

struct TransferPassState {
    name: String,
    timestamp: Option<TimestampBinding>,
    debug_groups: u32,
}

/// Records copy and query-resolve work inside transfer passes.
///
/// Acquired through [`CommandBuffer::transfer_encoder`]. Copies never
/// synchronize against other GPU work; ordering is the caller's
/// responsibility.
pub struct TransferEncoder<'a> {
    buffer: &'a mut CommandBuffer,
    pass: Option<TransferPassState>,
}

impl<'a> TransferEncoder<'a> {
    pub(crate) fn new(buffer: &'a mut CommandBuffer) -> Self {
        Self { buffer, pass: None }
    }

    /// Whether a pass is currently open on this encoder.
    pub fn is_open(&self) -> bool {
        self.pass.is_some()
    }

    /// Open a transfer pass.
    ///
    /// When `descriptor` carries a timestamp binding, the begin slot is
    /// written immediately and the end slot when the pass closes.
    ///
    /// # Panics
    ///
    /// Panics if a pass is already open on this encoder or its command
    /// buffer, or if the timestamp binding is invalid.
    pub fn begin_pass(&mut self, descriptor: TransferPassDescriptor) {
        assert!(
            self.pass.is_none(),
            "transfer encoder already has an open pass"
        );
        if let Some(binding) = &descriptor.timestamp {
            check_timestamp_binding(self.buffer, binding);
        }

        self.buffer.mark_pass_open(PassKind::Transfer);
        self.buffer.push_command(Command::BeginTransferPass {
            name: descriptor.name.clone(),
        });
        if let Some(binding) = &descriptor.timestamp {
            self.buffer.push_command(Command::WriteTimestamp {
                query: Arc::clone(&binding.query),
                index: binding.begin_index,
            });
        }
        self.pass = Some(TransferPassState {
            name: descriptor.name,
            timestamp: descriptor.timestamp,
            debug_groups: 0,
        });
    }

    /// Close the open pass.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open or a debug group was left open.
    pub fn end_pass(&mut self) {
        let state = match self.pass.take() {
            Some(state) => state,
            None => panic!("no open transfer pass to end"),
        };
        assert!(
            state.debug_groups == 0,
            "transfer pass {:?} ended with {} open debug groups",
            state.name,
            state.debug_groups
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
            "pop_debug_group without a matching push_debug_group in transfer pass {:?}",
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
            None => panic!("transfer pass {:?} has no timestamp binding", state.name),
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

    /// Copy `count` query results starting at `first_index` into readable
    /// memory.
    ///
    /// Resolving happens on the transfer timeline only; no other encoder
    /// exposes it.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open, the query belongs to another device, or
    /// the range overruns the query heap.
    pub fn resolve_query(&mut self, query: &Arc<Query>, first_index: u32, count: u32) {
        self.expect_open("resolve_query");
        check_same_device(self.buffer, query.device_weak(), "resolved query");
        assert!(
            first_index + count <= query.count(),
            "query resolve range {}..{} out of range for query with {} slots",
            first_index,
            first_index + count,
            query.count()
        );
        self.buffer.push_command(Command::ResolveQuery {
            query: Arc::clone(query),
            first_index,
            count,
        });
    }

    /// Copy `size` bytes from one buffer range to another.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open, a buffer belongs to another device, the
    /// source lacks `COPY_SRC`, the destination lacks `COPY_DST`, or a
    /// range overruns its buffer.
    pub fn copy_buffer_to_buffer(
        &mut self,
        src: &Arc<Buffer>,
        src_offset: u64,
        dst: &Arc<Buffer>,
        dst_offset: u64,
        size: u64,
    ) {
        self.expect_open("copy_buffer_to_buffer");
        check_same_device(self.buffer, src.device_weak(), "copy source buffer");
        check_same_device(self.buffer, dst.device_weak(), "copy destination buffer");
        assert!(
            src.usage().contains(BufferUsage::COPY_SRC),
            "copy source buffer {:?} missing COPY_SRC usage",
            src.label()
        );
        assert!(
            dst.usage().contains(BufferUsage::COPY_DST),
            "copy destination buffer {:?} missing COPY_DST usage",
            dst.label()
        );
        assert!(
            src_offset + size <= src.size(),
            "copy source range {}..{} overruns buffer of size {}",
            src_offset,
            src_offset + size,
            src.size()
        );
        assert!(
            dst_offset + size <= dst.size(),
            "copy destination range {}..{} overruns buffer of size {}",
            dst_offset,
            dst_offset + size,
            dst.size()
        );
        self.buffer.push_command(Command::CopyBufferToBuffer {
            src: Arc::clone(src),
            src_offset,
            dst: Arc::clone(dst),
            dst_offset,
            size,
        });
    }

    /// Copy linear buffer memory into a texture region.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open, a resource belongs to another device, the
    /// source lacks `COPY_SRC`, or the destination lacks `COPY_DST`.
    pub fn copy_buffer_to_texture(
        &mut self,
        src: BufferCopyView,
        dst: TextureCopyView,
        extent: Extent3d,
    ) {
        self.expect_open("copy_buffer_to_texture");
        check_same_device(self.buffer, src.buffer.device_weak(), "copy source buffer");
        check_same_device(self.buffer, dst.texture.device_weak(), "copy destination texture");
        assert!(
            src.buffer.usage().contains(BufferUsage::COPY_SRC),
            "copy source buffer {:?} missing COPY_SRC usage",
            src.buffer.label()
        );
        assert!(
            dst.texture.usage().contains(TextureUsage::COPY_DST),
            "copy destination texture {:?} missing COPY_DST usage",
            dst.texture.label()
        );
        self.buffer
            .push_command(Command::CopyBufferToTexture { src, dst, extent });
    }

    /// Copy a texture region into linear buffer memory.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open, a resource belongs to another device, the
    /// source lacks `COPY_SRC`, or the destination lacks `COPY_DST`.
    pub fn copy_texture_to_buffer(
        &mut self,
        src: TextureCopyView,
        dst: BufferCopyView,
        extent: Extent3d,
    ) {
        self.expect_open("copy_texture_to_buffer");
        check_same_device(self.buffer, src.texture.device_weak(), "copy source texture");
        check_same_device(self.buffer, dst.buffer.device_weak(), "copy destination buffer");
        assert!(
            src.texture.usage().contains(TextureUsage::COPY_SRC),
            "copy source texture {:?} missing COPY_SRC usage",
            src.texture.label()
        );
        assert!(
            dst.buffer.usage().contains(BufferUsage::COPY_DST),
            "copy destination buffer {:?} missing COPY_DST usage",
            dst.buffer.label()
        );
        self.buffer
            .push_command(Command::CopyTextureToBuffer { src, dst, extent });
    }

    /// Copy a texture region into another texture.
    ///
    /// # Panics
    ///
    /// Panics if no pass is open, a texture belongs to another device, the
    /// source lacks `COPY_SRC`, or the destination lacks `COPY_DST`.
    pub fn copy_texture_to_texture(
        &mut self,
        src: TextureCopyView,
        dst: TextureCopyView,
        extent: Extent3d,
    ) {
        self.expect_open("copy_texture_to_texture");
        check_same_device(self.buffer, src.texture.device_weak(), "copy source texture");
        check_same_device(self.buffer, dst.texture.device_weak(), "copy destination texture");
        assert!(
            src.texture.usage().contains(TextureUsage::COPY_SRC),
            "copy source texture {:?} missing COPY_SRC usage",
            src.texture.label()
        );
        assert!(
            dst.texture.usage().contains(TextureUsage::COPY_DST),
            "copy destination texture {:?} missing COPY_DST usage",
            dst.texture.label()
        );
        self.buffer
            .push_command(Command::CopyTextureToTexture { src, dst, extent });
    }

    fn state(&mut self) -> &mut TransferPassState {
        match &mut self.pass {
            Some(state) => state,
            None => panic!("no open transfer pass to record into"),
        }
    }

    fn expect_open(&self, op: &str) {
        assert!(
            self.pass.is_some(),
            "{op} requires an open transfer pass"
        );
    }
}

impl Drop for TransferEncoder<'_> {
    fn drop(&mut self) {
        if let Some(state) = &self.pass {
            log::warn!(
                "Transfer pass {:?} dropped without end_pass; its command buffer can no longer be submitted",
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
    use crate::types::{BufferDescriptor, QueryDescriptor, QueryKind};
    use std::sync::Weak;

    fn test_setup() -> (Arc<Device>, CommandBuffer) {
        let device = Device::new(&DeviceDescriptor::new()).unwrap();
        let queue = device.create_command_queue(CommandQueueKind::Transfer);
        let buffer = queue.create_command_buffer("transfer test");
        (device, buffer)
    }

    fn copyable_buffers(device: &Arc<Device>) -> (Arc<Buffer>, Arc<Buffer>) {
        let src = device
            .create_buffer(&BufferDescriptor::new(256, BufferUsage::COPY_SRC))
            .unwrap();
        let dst = device
            .create_buffer(&BufferDescriptor::new(256, BufferUsage::COPY_DST))
            .unwrap();
        (src, dst)
    }

    #[test]
    fn test_copy_records_inside_pass() {
        let (device, mut buffer) = test_setup();
        let (src, dst) = copyable_buffers(&device);

        let mut encoder = buffer.transfer_encoder();
        encoder.begin_pass(TransferPassDescriptor::new("upload"));
        encoder.copy_buffer_to_buffer(&src, 0, &dst, 64, 128);
        encoder.end_pass();
        drop(encoder);

        let commands = buffer.commands();
        assert_eq!(commands.len(), 3);
        assert!(matches!(commands[0], Command::BeginTransferPass { .. }));
        assert!(matches!(
            commands[1],
            Command::CopyBufferToBuffer {
                src_offset: 0,
                dst_offset: 64,
                size: 128,
                ..
            }
        ));
        assert!(matches!(commands[2], Command::EndPass));
        assert!(!buffer.is_pass_open());
    }

    #[test]
    fn test_timestamps_written_at_pass_boundaries() {
        let (device, mut buffer) = test_setup();
        let query = device
            .create_query(&QueryDescriptor::new(QueryKind::Timestamp, 4))
            .unwrap();

        let mut encoder = buffer.transfer_encoder();
        encoder.begin_pass(
            TransferPassDescriptor::new("timed")
                .with_timestamp(TimestampBinding::new(Arc::clone(&query), 0, 1)),
        );
        encoder.end_pass();
        drop(encoder);

        let commands = buffer.commands();
        assert!(matches!(commands[1], Command::WriteTimestamp { index: 0, .. }));
        assert!(matches!(commands[2], Command::WriteTimestamp { index: 1, .. }));
        assert!(matches!(commands[3], Command::EndPass));
    }

    #[test]
    #[should_panic(expected = "requires an open transfer pass")]
    fn test_copy_outside_pass_panics() {
        let (device, mut buffer) = test_setup();
        let (src, dst) = copyable_buffers(&device);
        buffer
            .transfer_encoder()
            .copy_buffer_to_buffer(&src, 0, &dst, 0, 16);
    }

    #[test]
    #[should_panic(expected = "already has an open pass")]
    fn test_begin_pass_twice_panics() {
        let (_device, mut buffer) = test_setup();
        let mut encoder = buffer.transfer_encoder();
        encoder.begin_pass(TransferPassDescriptor::new("first"));
        encoder.begin_pass(TransferPassDescriptor::new("second"));
    }

    #[test]
    #[should_panic(expected = "missing COPY_SRC usage")]
    fn test_copy_source_usage_checked() {
        let (device, mut buffer) = test_setup();
        let src = device
            .create_buffer(&BufferDescriptor::new(256, BufferUsage::VERTEX))
            .unwrap();
        let dst = device
            .create_buffer(&BufferDescriptor::new(256, BufferUsage::COPY_DST))
            .unwrap();

        let mut encoder = buffer.transfer_encoder();
        encoder.begin_pass(TransferPassDescriptor::new("bad"));
        encoder.copy_buffer_to_buffer(&src, 0, &dst, 0, 16);
    }

    #[test]
    #[should_panic(expected = "overruns buffer of size")]
    fn test_copy_range_checked() {
        let (device, mut buffer) = test_setup();
        let (src, dst) = copyable_buffers(&device);

        let mut encoder = buffer.transfer_encoder();
        encoder.begin_pass(TransferPassDescriptor::new("overrun"));
        encoder.copy_buffer_to_buffer(&src, 128, &dst, 0, 256);
    }

    #[test]
    #[should_panic(expected = "created by another device")]
    fn test_foreign_query_rejected() {
        let (_device, mut buffer) = test_setup();
        let foreign = Arc::new(Query::new(
            Weak::new(),
            QueryDescriptor::new(QueryKind::Timestamp, 4),
            crate::backend::GpuQuery::Null,
        ));

        let mut encoder = buffer.transfer_encoder();
        encoder.begin_pass(TransferPassDescriptor::new("foreign"));
        encoder.resolve_query(&foreign, 0, 4);
    }

    #[test]
    #[should_panic(expected = "open debug groups")]
    fn test_unbalanced_debug_group_panics() {
        let (_device, mut buffer) = test_setup();
        let mut encoder = buffer.transfer_encoder();
        encoder.begin_pass(TransferPassDescriptor::new("unbalanced"));
        encoder.push_debug_group("group");
        encoder.end_pass();
    }
}
