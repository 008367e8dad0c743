//! GPU backend dispatch layer.
//!
//! Resource handles and the device are closed enums with one variant per
//! backend. This crate ships the `Null` backend, a driver-free
//! implementation used headless and in tests; native backends slot in as
//! additional variants and translate the recorded [`Command`] stream into
//! driver calls.
//!
//! Layouts, binding tables, and shader functions carry no backend handle:
//! they are CPU-side objects fully described by their descriptors.

pub mod null;

use crate::capability::{
    AdapterProfile, ClipDepth, DeviceCapabilities, DeviceProperties, FeatureLevel, MatrixOrder,
    MultiviewStrategy, RaytracingTier, RenderPassTier,
};
use crate::command::Command;
use crate::descriptor::DescriptorHeapKind;
use crate::error::{RhiError, RhiResult};
use crate::types::{
    BufferDescriptor, QueryDescriptor, SamplerDescriptor, SwapChainDescriptor, TextureDescriptor,
};

use null::NullBackend;

// ============================================================================
// Resource Handles
// ============================================================================

/// Handle to a GPU buffer resource.
#[derive(Debug)]
pub enum GpuBuffer {
    /// Null backend (no GPU allocation)
    Null,
}

/// Handle to a GPU texture resource.
#[derive(Debug)]
pub enum GpuTexture {
    /// Null backend (no GPU allocation)
    Null,
}

/// Handle to a GPU sampler resource.
#[derive(Debug)]
pub enum GpuSampler {
    /// Null backend (no GPU state)
    Null,
}

/// Handle to a GPU query heap.
#[derive(Debug)]
pub enum GpuQuery {
    /// Null backend (no GPU state)
    Null,
}

/// Handle to a compiled GPU pipeline of any kind.
#[derive(Debug)]
pub enum GpuPipeline {
    /// Null backend (no compiled state)
    Null,
}

/// Handle to a GPU acceleration structure.
#[derive(Debug)]
pub enum GpuAccelStruct {
    /// Null backend (no GPU allocation)
    Null,
}

/// Handle to a GPU fence for CPU-GPU synchronization.
#[derive(Debug)]
pub enum GpuFence {
    /// Null backend fence
    Null {
        signaled: std::sync::atomic::AtomicBool,
    },
}

// ============================================================================
// Heap Info
// ============================================================================

/// Placement of one descriptor heap as reported by the backend.
///
/// `gpu_base` is present exactly for shader-visible heaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapInfo {
    /// CPU base address of slot 0.
    pub cpu_base: u64,
    /// GPU base address of slot 0, shader-visible heaps only.
    pub gpu_base: Option<u64>,
    /// Byte increment between consecutive slots.
    pub descriptor_size: u32,
}

// ============================================================================
// Device Dispatch
// ============================================================================

/// Backend device behind a [`Device`](crate::device::Device).
#[derive(Debug)]
pub enum GpuDevice {
    /// Driver-free backend
    Null(NullBackend),
}

impl GpuDevice {
    /// Create a backend device by probing feature levels in descending
    /// order and keeping the first the adapter accepts.
    ///
    /// Fails with [`RhiError::DeviceCreationFailed`] when every level is
    /// rejected.
    pub fn probe(profile: AdapterProfile) -> RhiResult<GpuDevice> {
        let mut last_error = None;
        for level in FeatureLevel::PROBE_ORDER {
            match NullBackend::new(profile.clone(), level) {
                Ok(backend) => {
                    log::info!(
                        "Created null backend device at {:?} on {:?}",
                        level,
                        profile.name
                    );
                    return Ok(GpuDevice::Null(backend));
                }
                Err(e) => {
                    log::warn!("Feature level {:?} rejected: {}", level, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            RhiError::DeviceCreationFailed("no feature level to probe".to_string())
        }))
    }

    /// Backend name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            GpuDevice::Null(_) => "Null Backend",
        }
    }

    /// Adapter identity.
    pub fn properties(&self) -> DeviceProperties {
        match self {
            GpuDevice::Null(backend) => backend.properties(),
        }
    }

    /// Capabilities and conventions probed at creation.
    pub fn capabilities(&self) -> DeviceCapabilities {
        match self {
            GpuDevice::Null(backend) => backend.capabilities(),
        }
    }

    /// Feature level the device was created at.
    pub fn feature_level(&self) -> FeatureLevel {
        self.capabilities().feature_level
    }

    /// Render pass support tier.
    pub fn render_pass_tier(&self) -> RenderPassTier {
        self.capabilities().render_pass_tier
    }

    /// Raytracing support tier.
    pub fn raytracing_tier(&self) -> RaytracingTier {
        self.capabilities().raytracing_tier
    }

    /// Whether mesh and task shaders are available.
    pub fn mesh_shading(&self) -> bool {
        self.capabilities().mesh_shading
    }

    /// Clip-space depth convention.
    pub fn clip_depth(&self) -> ClipDepth {
        self.capabilities().clip_depth
    }

    /// Matrix memory order convention.
    pub fn matrix_order(&self) -> MatrixOrder {
        self.capabilities().matrix_order
    }

    /// Multiview rendering strategy.
    pub fn multiview(&self) -> MultiviewStrategy {
        self.capabilities().multiview
    }

    /// Whether projection matrices must be flipped for this backend.
    pub fn flip_projection_required(&self) -> bool {
        self.capabilities().flip_projection_required
    }

    /// Placement of the descriptor heap for `kind`.
    pub fn heap_info(&self, kind: DescriptorHeapKind) -> HeapInfo {
        match self {
            GpuDevice::Null(backend) => backend.heap_info(kind),
        }
    }

    /// Create a buffer resource.
    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> RhiResult<GpuBuffer> {
        match self {
            GpuDevice::Null(backend) => backend.create_buffer(descriptor),
        }
    }

    /// Create a texture resource.
    pub fn create_texture(&self, descriptor: &TextureDescriptor) -> RhiResult<GpuTexture> {
        match self {
            GpuDevice::Null(backend) => backend.create_texture(descriptor),
        }
    }

    /// Create a sampler resource.
    pub fn create_sampler(&self, descriptor: &SamplerDescriptor) -> RhiResult<GpuSampler> {
        match self {
            GpuDevice::Null(backend) => backend.create_sampler(descriptor),
        }
    }

    /// Create a query heap.
    pub fn create_query(&self, descriptor: &QueryDescriptor) -> RhiResult<GpuQuery> {
        match self {
            GpuDevice::Null(backend) => backend.create_query(descriptor),
        }
    }

    /// Compile a pipeline of any kind from its already-validated descriptor.
    pub fn create_pipeline(&self, label: Option<&str>) -> RhiResult<GpuPipeline> {
        match self {
            GpuDevice::Null(backend) => backend.create_pipeline(label),
        }
    }

    /// Create an acceleration structure allocation.
    pub fn create_accel_struct(&self, label: Option<&str>) -> RhiResult<GpuAccelStruct> {
        match self {
            GpuDevice::Null(backend) => backend.create_accel_struct(label),
        }
    }

    /// Create a swap chain over a native window surface.
    ///
    /// The null backend is headless and reports [`RhiError::NotSupported`].
    pub fn create_swap_chain(&self, descriptor: &SwapChainDescriptor) -> RhiResult<()> {
        match self {
            GpuDevice::Null(backend) => backend.create_swap_chain(descriptor),
        }
    }

    /// Create a fence, optionally pre-signaled.
    pub fn create_fence(&self, signaled: bool) -> GpuFence {
        match self {
            GpuDevice::Null(backend) => backend.create_fence(signaled),
        }
    }

    /// Block until `fence` is signaled.
    pub fn wait_fence(&self, fence: &GpuFence) {
        match self {
            GpuDevice::Null(backend) => backend.wait_fence(fence),
        }
    }

    /// Check whether `fence` is signaled without blocking.
    pub fn is_fence_signaled(&self, fence: &GpuFence) -> bool {
        match self {
            GpuDevice::Null(backend) => backend.is_fence_signaled(fence),
        }
    }

    /// Signal `fence` from the CPU.
    pub fn signal_fence(&self, fence: &GpuFence) {
        match self {
            GpuDevice::Null(backend) => backend.signal_fence(fence),
        }
    }

    /// Hand a recorded command stream to the backend for execution.
    pub fn submit(
        &self,
        buffer_name: &str,
        commands: &[Command],
        signal_fence: Option<&GpuFence>,
    ) -> RhiResult<()> {
        match self {
            GpuDevice::Null(backend) => backend.submit(buffer_name, commands, signal_fence),
        }
    }
}
