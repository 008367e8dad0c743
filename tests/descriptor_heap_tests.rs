//! Descriptor heap integration tests.
//!
//! These tests drive the per-device descriptor allocators through the public
//! resource factories: slots must be reserved exactly for the heaps a
//! resource's usage needs, returned when the resource drops, and recycled
//! lowest-index-first. Exhaustion is a hard error, never a heap resize.

mod common;

use std::sync::Arc;

use rstest::rstest;

use common::test_device;
use ember_rhi::descriptor::DescriptorAllocator;
use ember_rhi::types::{SamplerDescriptor, TextureDescriptor};
use ember_rhi::{DescriptorHeapKind, RhiError, TextureFormat, TextureUsage};

// ============================================================================
// Device Heap Wiring
// ============================================================================

/// Every heap starts empty and sized at its default capacity.
#[rstest]
#[case::render_target(DescriptorHeapKind::RenderTarget)]
#[case::depth_stencil(DescriptorHeapKind::DepthStencil)]
#[case::sampler(DescriptorHeapKind::Sampler)]
#[case::shader_resource(DescriptorHeapKind::ShaderResource)]
fn test_heaps_start_empty_at_default_capacity(#[case] kind: DescriptorHeapKind) {
    let device = test_device();
    assert_eq!(device.descriptor_heap_capacity(kind), kind.default_capacity());
    assert_eq!(device.allocated_descriptor_count(kind), 0);
}

// ============================================================================
// Resource Slot Accounting
// ============================================================================

/// A texture reserves one slot per heap its usage flags require, and the
/// slots go back when the texture drops.
#[test]
fn test_texture_usage_reserves_matching_slots() {
    let device = test_device();

    let texture = device
        .create_texture(&TextureDescriptor::new_2d(
            256,
            256,
            TextureFormat::Rgba8Unorm,
            TextureUsage::RENDER_TARGET | TextureUsage::SHADER_RESOURCE,
        ))
        .unwrap();

    assert_eq!(
        device.allocated_descriptor_count(DescriptorHeapKind::RenderTarget),
        1
    );
    assert_eq!(
        device.allocated_descriptor_count(DescriptorHeapKind::ShaderResource),
        1
    );
    assert_eq!(
        device.allocated_descriptor_count(DescriptorHeapKind::DepthStencil),
        0
    );

    drop(texture);
    assert_eq!(
        device.allocated_descriptor_count(DescriptorHeapKind::RenderTarget),
        0
    );
    assert_eq!(
        device.allocated_descriptor_count(DescriptorHeapKind::ShaderResource),
        0
    );
}

/// UNORDERED_ACCESS shares the shader-resource heap with SHADER_RESOURCE;
/// a texture carrying both still takes a single slot there.
#[test]
fn test_unordered_access_shares_shader_resource_slot() {
    let device = test_device();

    let _texture = device
        .create_texture(&TextureDescriptor::new_2d(
            64,
            64,
            TextureFormat::Rgba16Float,
            TextureUsage::SHADER_RESOURCE | TextureUsage::UNORDERED_ACCESS,
        ))
        .unwrap();

    assert_eq!(
        device.allocated_descriptor_count(DescriptorHeapKind::ShaderResource),
        1
    );
}

#[test]
fn test_depth_texture_takes_depth_stencil_slot() {
    let device = test_device();

    let _depth = device
        .create_texture(&TextureDescriptor::new_2d(
            512,
            512,
            TextureFormat::Depth32Float,
            TextureUsage::DEPTH_STENCIL,
        ))
        .unwrap();

    assert_eq!(
        device.allocated_descriptor_count(DescriptorHeapKind::DepthStencil),
        1
    );
    assert_eq!(
        device.allocated_descriptor_count(DescriptorHeapKind::RenderTarget),
        0
    );
}

/// Sampler slots are recycled: dropping one of several samplers frees its
/// slot for the next creation.
#[test]
fn test_sampler_slots_recycled_on_drop() {
    let device = test_device();

    let a = device.create_sampler(&SamplerDescriptor::linear()).unwrap();
    let b = device.create_sampler(&SamplerDescriptor::nearest()).unwrap();
    let c = device.create_sampler(&SamplerDescriptor::new()).unwrap();
    assert_eq!(
        device.allocated_descriptor_count(DescriptorHeapKind::Sampler),
        3
    );

    drop(b);
    assert_eq!(
        device.allocated_descriptor_count(DescriptorHeapKind::Sampler),
        2
    );

    let _d = device.create_sampler(&SamplerDescriptor::new()).unwrap();
    assert_eq!(
        device.allocated_descriptor_count(DescriptorHeapKind::Sampler),
        3
    );

    drop(a);
    drop(c);
}

// ============================================================================
// Exhaustion
// ============================================================================

/// Filling the render-target heap makes the next creation fail with
/// `DescriptorHeapExhausted`; dropping a texture frees exactly one slot.
#[test]
fn test_render_target_heap_exhaustion_is_an_error() {
    let device = test_device();
    let capacity = device.descriptor_heap_capacity(DescriptorHeapKind::RenderTarget);

    let descriptor = TextureDescriptor::new_2d(
        1,
        1,
        TextureFormat::Rgba8Unorm,
        TextureUsage::RENDER_TARGET,
    );
    let mut textures = Vec::with_capacity(capacity as usize);
    for _ in 0..capacity {
        textures.push(device.create_texture(&descriptor).unwrap());
    }
    assert_eq!(
        device.allocated_descriptor_count(DescriptorHeapKind::RenderTarget),
        capacity
    );

    let err = device.create_texture(&descriptor).unwrap_err();
    assert!(matches!(
        err,
        RhiError::DescriptorHeapExhausted {
            kind: DescriptorHeapKind::RenderTarget,
            ..
        }
    ));

    // Freeing slot 500 makes exactly that slot available again.
    let evicted = textures.remove(500);
    assert_eq!(evicted.render_target_slot().unwrap().index, 500);
    drop(evicted);

    let replacement = device.create_texture(&descriptor).unwrap();
    assert_eq!(replacement.render_target_slot().unwrap().index, 500);
}

/// When a texture needs slots from several heaps and one of them is full,
/// the slots it already took must be rolled back.
#[test]
fn test_partial_allocation_rolled_back_on_exhaustion() {
    let device = test_device();
    let capacity = device.descriptor_heap_capacity(DescriptorHeapKind::DepthStencil);

    let depth_only = TextureDescriptor::new_2d(
        1,
        1,
        TextureFormat::Depth32Float,
        TextureUsage::DEPTH_STENCIL,
    );
    let _depths: Vec<_> = (0..capacity)
        .map(|_| device.create_texture(&depth_only).unwrap())
        .collect();

    // Needs a render-target slot and a depth-stencil slot; the latter is
    // exhausted, so the former must not leak.
    let both = TextureDescriptor::new_2d(
        1,
        1,
        TextureFormat::Depth24Stencil8,
        TextureUsage::RENDER_TARGET | TextureUsage::DEPTH_STENCIL,
    );
    assert!(device.create_texture(&both).is_err());
    assert_eq!(
        device.allocated_descriptor_count(DescriptorHeapKind::RenderTarget),
        0
    );
}

// ============================================================================
// Concurrency
// ============================================================================

/// Allocators are hammered from several threads; bookkeeping must stay
/// consistent and the capacity must never be exceeded.
#[test]
fn test_concurrent_allocate_free_stays_consistent() {
    const THREADS: usize = 4;
    const ROUNDS: usize = 200;

    let allocator = Arc::new(DescriptorAllocator::new(
        DescriptorHeapKind::ShaderResource,
        128,
        64,
        0x1000,
        Some(0x2000),
    ));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let allocator = Arc::clone(&allocator);
            std::thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let slot = allocator.allocate().unwrap();
                    assert!(slot.index < allocator.capacity());
                    allocator.free(slot.index).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(allocator.allocated_count(), 0);
}

/// Resources created and dropped on several threads return their slots
/// through the shared device without losing any.
#[test]
fn test_concurrent_resource_churn_through_device() {
    const THREADS: usize = 4;
    const ROUNDS: usize = 50;

    let device = test_device();
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let device = Arc::clone(&device);
            std::thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let sampler = device.create_sampler(&SamplerDescriptor::linear()).unwrap();
                    let slot = sampler.slot().unwrap();
                    assert!(slot.gpu_handle.is_some());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        device.allocated_descriptor_count(DescriptorHeapKind::Sampler),
        0
    );
}
