//! Pass-scoped command encoders.
//!
//! Every GPU operation is recorded inside an explicit pass. An encoder is
//! acquired from a [`CommandBuffer`] in the closed state, opened with
//! `begin_pass`, driven through recording calls, and closed again with
//! `end_pass`. One encoder can open any number of passes in sequence, but
//! only one pass may be open on a command buffer at a time, and a buffer
//! with an open pass cannot be submitted or reset.
//!
//! Encoder misuse is a programming error, not a recoverable condition:
//! recording outside an open pass, opening a second pass, or referencing a
//! resource created by another device panics.
//!
//! [`CommandBuffer`]: crate::command::CommandBuffer

mod compute;
mod raster;
mod raytracing;
mod transfer;

pub use compute::ComputeEncoder;
pub use raster::RasterEncoder;
pub use raytracing::RaytracingEncoder;
pub use transfer::TransferEncoder;

use std::sync::{Arc, Weak};

use crate::command::CommandBuffer;
use crate::device::Device;
use crate::resources::Buffer;
use crate::types::{
    BufferUsage, OcclusionBinding, QueryKind, StatisticsBinding, TimestampBinding,
};

pub(crate) fn check_same_device(
    buffer: &CommandBuffer,
    resource_device: &Weak<Device>,
    what: &str,
) {
    assert!(
        Weak::ptr_eq(resource_device, &Arc::downgrade(buffer.device())),
        "{what} was created by another device"
    );
}

pub(crate) fn check_timestamp_binding(buffer: &CommandBuffer, binding: &TimestampBinding) {
    check_same_device(buffer, binding.query.device_weak(), "timestamp query");
    assert!(
        binding.query.kind() == QueryKind::Timestamp,
        "timestamp binding requires a Timestamp query, got {:?}",
        binding.query.kind()
    );
    let count = binding.query.count();
    assert!(
        binding.begin_index < count && binding.end_index < count,
        "timestamp binding indices ({}, {}) out of range for query with {} slots",
        binding.begin_index,
        binding.end_index,
        count
    );
}

pub(crate) fn check_occlusion_binding(buffer: &CommandBuffer, binding: &OcclusionBinding) {
    check_same_device(buffer, binding.query.device_weak(), "occlusion query");
    assert!(
        binding.query.kind() == QueryKind::Occlusion,
        "occlusion binding requires an Occlusion query, got {:?}",
        binding.query.kind()
    );
}

pub(crate) fn check_statistics_binding(buffer: &CommandBuffer, binding: &StatisticsBinding) {
    check_same_device(buffer, binding.query.device_weak(), "statistics query");
    assert!(
        binding.query.kind() == QueryKind::PipelineStatistics,
        "statistics binding requires a PipelineStatistics query, got {:?}",
        binding.query.kind()
    );
    assert!(
        binding.write_index < binding.query.count(),
        "statistics write index {} out of range for query with {} slots",
        binding.write_index,
        binding.query.count()
    );
}

// Indirect argument records are read by the GPU command processor; the
// offset must be 4-byte aligned and the records must fit in the buffer.
pub(crate) fn check_indirect_args(
    buffer: &CommandBuffer,
    args_buffer: &Arc<Buffer>,
    offset: u64,
    bytes: u64,
) {
    check_same_device(buffer, args_buffer.device_weak(), "indirect argument buffer");
    assert!(
        args_buffer.usage().contains(BufferUsage::INDIRECT),
        "indirect argument buffer {:?} missing INDIRECT usage",
        args_buffer.label()
    );
    assert!(
        offset % 4 == 0,
        "indirect argument offset {offset} is not 4-byte aligned"
    );
    assert!(
        offset + bytes <= args_buffer.size(),
        "indirect arguments at offset {offset} ({bytes} bytes) overrun buffer of size {}",
        args_buffer.size()
    );
}
