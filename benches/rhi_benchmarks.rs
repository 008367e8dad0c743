use criterion::{Criterion, black_box, criterion_group, criterion_main};

use ember_rhi::descriptor::DescriptorAllocator;
use ember_rhi::types::{
    ColorAttachmentDescriptor, ComputePipelineDescriptor, IndirectOpKind,
    PipelineLayoutDescriptor, RasterPipelineDescriptor, ShaderFunctionDescriptor, ShaderStage,
};
use ember_rhi::{
    BufferDescriptor, BufferUsage, CommandQueueKind, ComputePassDescriptor, DescriptorHeapKind,
    Device, DeviceDescriptor, RasterPassDescriptor, TextureDescriptor, TextureFormat,
    TextureUsage,
};

// ---------------------------------------------------------------------------
// Descriptor allocation
// ---------------------------------------------------------------------------

fn bench_descriptor_allocate_free(c: &mut Criterion) {
    let allocator = DescriptorAllocator::new(
        DescriptorHeapKind::ShaderResource,
        32768,
        64,
        0x1000,
        Some(0x2000),
    );

    c.bench_function("descriptor_allocate_free_single", |b| {
        b.iter(|| {
            let slot = allocator.allocate().unwrap();
            black_box(slot.cpu_handle);
            allocator.free(slot.index).unwrap();
        });
    });
}

fn bench_descriptor_burst(c: &mut Criterion) {
    let allocator = DescriptorAllocator::new(
        DescriptorHeapKind::RenderTarget,
        4096,
        32,
        0x1000,
        None,
    );

    c.bench_function("descriptor_allocate_free_256_burst", |b| {
        b.iter(|| {
            let slots: Vec<_> = (0..256).map(|_| allocator.allocate().unwrap()).collect();
            for slot in slots.iter().rev() {
                allocator.free(slot.index).unwrap();
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Resource creation
// ---------------------------------------------------------------------------

fn bench_create_buffer(c: &mut Criterion) {
    let device = Device::new(&DeviceDescriptor::new()).unwrap();

    c.bench_function("create_buffer_1kb", |b| {
        b.iter(|| {
            black_box(
                device
                    .create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX))
                    .unwrap(),
            );
        });
    });
}

fn bench_create_texture(c: &mut Criterion) {
    let device = Device::new(&DeviceDescriptor::new()).unwrap();

    c.bench_function("create_texture_256x256_two_slots", |b| {
        b.iter(|| {
            black_box(
                device
                    .create_texture(&TextureDescriptor::new_2d(
                        256,
                        256,
                        TextureFormat::Rgba8Unorm,
                        TextureUsage::RENDER_TARGET | TextureUsage::SHADER_RESOURCE,
                    ))
                    .unwrap(),
            );
        });
    });
}

fn bench_signature_lookup(c: &mut Criterion) {
    let device = Device::new(&DeviceDescriptor::new()).unwrap();

    c.bench_function("indirect_signature_lookup", |b| {
        b.iter(|| {
            black_box(device.indirect_signature(IndirectOpKind::Draw).unwrap());
        });
    });
}

// ---------------------------------------------------------------------------
// Command recording
// ---------------------------------------------------------------------------

fn bench_record_compute_pass(c: &mut Criterion) {
    let device = Device::new(&DeviceDescriptor::new()).unwrap();
    let queue = device.create_command_queue(CommandQueueKind::Compute);
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
    let pipeline = device
        .create_compute_pipeline(&ComputePipelineDescriptor::new(layout, function))
        .unwrap();

    c.bench_function("record_compute_pass_64_dispatches", |b| {
        b.iter_with_setup(
            || queue.create_command_buffer("bench"),
            |mut buffer| {
                let mut encoder = buffer.compute_encoder();
                encoder.begin_pass(ComputePassDescriptor::new("bench"));
                encoder.set_pipeline(&pipeline);
                for i in 0..64u32 {
                    encoder.dispatch(i + 1, 1, 1);
                }
                encoder.end_pass();
                drop(encoder);
                black_box(buffer);
            },
        );
    });
}

fn bench_record_raster_pass(c: &mut Criterion) {
    let device = Device::new(&DeviceDescriptor::new()).unwrap();
    let queue = device.create_command_queue(CommandQueueKind::Graphics);
    let target = device
        .create_texture(&TextureDescriptor::new_2d(
            64,
            64,
            TextureFormat::Rgba8Unorm,
            TextureUsage::RENDER_TARGET,
        ))
        .unwrap();
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
    let pipeline = device
        .create_raster_pipeline(
            &RasterPipelineDescriptor::new(layout, vertex)
                .with_color_formats(vec![TextureFormat::Rgba8Unorm]),
        )
        .unwrap();

    c.bench_function("record_raster_pass_128_draws", |b| {
        b.iter_with_setup(
            || queue.create_command_buffer("bench"),
            |mut buffer| {
                let mut encoder = buffer.raster_encoder();
                encoder.begin_pass(
                    RasterPassDescriptor::new("bench").with_color_attachment(
                        ColorAttachmentDescriptor::from_texture(std::sync::Arc::clone(&target)),
                    ),
                );
                encoder.set_pipeline(&pipeline);
                for i in 0..128u32 {
                    encoder.draw(3, 1, i * 3, 0);
                }
                encoder.end_pass();
                drop(encoder);
                black_box(buffer);
            },
        );
    });
}

criterion_group!(
    benches,
    bench_descriptor_allocate_free,
    bench_descriptor_burst,
    bench_create_buffer,
    bench_create_texture,
    bench_signature_lookup,
    bench_record_compute_pass,
    bench_record_raster_pass,
);
criterion_main!(benches);
