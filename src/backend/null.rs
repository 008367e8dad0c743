//! Driver-free GPU backend.
//!
//! This backend performs no GPU work but implements the full device surface
//! against an [`AdapterProfile`], so the API runs headless and capability
//! gaps are reproducible in tests. Descriptor heaps live at synthetic
//! addresses with deterministic descriptor sizes.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::capability::{
    AdapterProfile, ClipDepth, DeviceCapabilities, DeviceProperties, FeatureLevel, MatrixOrder,
    MultiviewStrategy,
};
use crate::command::Command;
use crate::descriptor::DescriptorHeapKind;
use crate::error::{RhiError, RhiResult};
use crate::types::{
    BufferDescriptor, QueryDescriptor, SamplerDescriptor, SwapChainDescriptor, TextureDescriptor,
};

use super::{GpuAccelStruct, GpuBuffer, GpuFence, GpuPipeline, GpuQuery, GpuSampler, GpuTexture, HeapInfo};

/// Driver-free backend device.
#[derive(Debug)]
pub struct NullBackend {
    profile: AdapterProfile,
    feature_level: FeatureLevel,
}

impl NullBackend {
    /// Create the backend at `level`, rejecting levels above the profile's
    /// cap the way a driver would.
    pub fn new(profile: AdapterProfile, level: FeatureLevel) -> RhiResult<Self> {
        if !profile.supports_feature_level(level) {
            return Err(RhiError::DeviceCreationFailed(format!(
                "adapter {:?} does not support feature level {:?}",
                profile.name, level
            )));
        }
        Ok(Self {
            profile,
            feature_level: level,
        })
    }

    /// Adapter identity from the profile.
    pub fn properties(&self) -> DeviceProperties {
        DeviceProperties {
            vendor_id: self.profile.vendor_id,
            device_id: self.profile.device_id,
            adapter_kind: self.profile.adapter_kind,
        }
    }

    /// Capabilities probed from the profile plus this backend's conventions.
    pub fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities {
            feature_level: self.feature_level,
            render_pass_tier: self.profile.render_pass_tier,
            raytracing_tier: self.profile.raytracing_tier,
            mesh_shading: self.profile.mesh_shading,
            clip_depth: ClipDepth::ZeroToOne,
            matrix_order: MatrixOrder::RowMajor,
            multiview: MultiviewStrategy::Unsupported,
            flip_projection_required: false,
        }
    }

    /// Synthetic heap placement for `kind`.
    ///
    /// Bases are disjoint so handle values identify their heap in logs and
    /// assertions.
    pub fn heap_info(&self, kind: DescriptorHeapKind) -> HeapInfo {
        match kind {
            DescriptorHeapKind::RenderTarget => HeapInfo {
                cpu_base: 0x0100_0000,
                gpu_base: None,
                descriptor_size: 32,
            },
            DescriptorHeapKind::DepthStencil => HeapInfo {
                cpu_base: 0x0200_0000,
                gpu_base: None,
                descriptor_size: 32,
            },
            DescriptorHeapKind::Sampler => HeapInfo {
                cpu_base: 0x0300_0000,
                gpu_base: Some(0x1_0300_0000),
                descriptor_size: 32,
            },
            DescriptorHeapKind::ShaderResource => HeapInfo {
                cpu_base: 0x0400_0000,
                gpu_base: Some(0x1_0400_0000),
                descriptor_size: 64,
            },
        }
    }

    /// Create a buffer resource.
    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> RhiResult<GpuBuffer> {
        log::trace!(
            "NullBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        Ok(GpuBuffer::Null)
    }

    /// Create a texture resource.
    pub fn create_texture(&self, descriptor: &TextureDescriptor) -> RhiResult<GpuTexture> {
        log::trace!(
            "NullBackend: creating texture {:?} ({}x{}x{})",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.size.depth
        );
        Ok(GpuTexture::Null)
    }

    /// Create a sampler resource.
    pub fn create_sampler(&self, descriptor: &SamplerDescriptor) -> RhiResult<GpuSampler> {
        log::trace!("NullBackend: creating sampler {:?}", descriptor.label);
        Ok(GpuSampler::Null)
    }

    /// Create a query heap.
    pub fn create_query(&self, descriptor: &QueryDescriptor) -> RhiResult<GpuQuery> {
        log::trace!(
            "NullBackend: creating {:?} query heap ({} slots)",
            descriptor.kind,
            descriptor.count
        );
        Ok(GpuQuery::Null)
    }

    /// Compile a pipeline.
    pub fn create_pipeline(&self, label: Option<&str>) -> RhiResult<GpuPipeline> {
        log::trace!("NullBackend: creating pipeline {:?}", label);
        Ok(GpuPipeline::Null)
    }

    /// Create an acceleration structure allocation.
    pub fn create_accel_struct(&self, label: Option<&str>) -> RhiResult<GpuAccelStruct> {
        log::trace!("NullBackend: creating acceleration structure {:?}", label);
        Ok(GpuAccelStruct::Null)
    }

    /// Swap chains need a native surface; this backend has none.
    pub fn create_swap_chain(&self, descriptor: &SwapChainDescriptor) -> RhiResult<()> {
        log::warn!(
            "NullBackend: swap chain {:?} requested on a headless backend",
            descriptor.label
        );
        Err(RhiError::NotSupported(
            "swap chains require a native backend".to_string(),
        ))
    }

    /// Create a fence, optionally pre-signaled.
    pub fn create_fence(&self, signaled: bool) -> GpuFence {
        GpuFence::Null {
            signaled: AtomicBool::new(signaled),
        }
    }

    /// Block until the fence is signaled.
    pub fn wait_fence(&self, fence: &GpuFence) {
        match fence {
            GpuFence::Null { signaled } => {
                while !signaled.load(Ordering::Acquire) {
                    std::thread::yield_now();
                }
            }
        }
    }

    /// Check whether the fence is signaled without blocking.
    pub fn is_fence_signaled(&self, fence: &GpuFence) -> bool {
        match fence {
            GpuFence::Null { signaled } => signaled.load(Ordering::Acquire),
        }
    }

    /// Signal the fence from the CPU.
    pub fn signal_fence(&self, fence: &GpuFence) {
        match fence {
            GpuFence::Null { signaled } => {
                signaled.store(true, Ordering::Release);
            }
        }
    }

    /// Execute a recorded command stream.
    ///
    /// No GPU work happens; the stream is drained for logging and the fence
    /// is signaled immediately.
    pub fn submit(
        &self,
        buffer_name: &str,
        commands: &[Command],
        signal_fence: Option<&GpuFence>,
    ) -> RhiResult<()> {
        log::trace!(
            "NullBackend: executing command buffer {:?} ({} commands)",
            buffer_name,
            commands.len()
        );
        for command in commands {
            log::trace!("NullBackend: {:?}", command);
        }
        if let Some(fence) = signal_fence {
            self.signal_fence(fence);
        }
        Ok(())
    }
}
