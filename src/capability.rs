//! Device capability probing and reporting.
//!
//! Capabilities are fixed at device creation: the backend is probed once and
//! the results are served from plain copies afterwards.

// ============================================================================
// Feature Levels and Tiers
// ============================================================================

/// Baseline feature level a device can be created at.
///
/// Creation probes levels in descending order and keeps the first one the
/// adapter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureLevel {
    /// Baseline feature set.
    Level1,
    /// Adds conservative rasterization and tiled-resource features.
    Level2,
    /// Adds mesh-shading era features.
    Level3,
}

impl FeatureLevel {
    /// Probe order used at device creation, highest level first.
    pub const PROBE_ORDER: [FeatureLevel; 3] =
        [FeatureLevel::Level3, FeatureLevel::Level2, FeatureLevel::Level1];
}

/// Render pass support tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderPassTier {
    /// Render passes are emulated by the backend.
    Tier0,
    /// Partial native support, still treated as emulated.
    Tier1,
    /// Full native render pass support.
    Tier2,
}

impl RenderPassTier {
    /// Whether passes run on the native render pass path.
    ///
    /// Only [`Tier2`](Self::Tier2) qualifies; lower tiers fall back to
    /// emulation.
    pub fn native_render_passes(self) -> bool {
        self == RenderPassTier::Tier2
    }
}

/// Raytracing support tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RaytracingTier {
    /// No raytracing support.
    NotSupported,
    /// Standalone raytracing pipelines.
    Tier1_0,
    /// Adds inline raytracing queries.
    Tier1_1,
}

impl RaytracingTier {
    /// Whether raytracing pipelines and acceleration structures work at all.
    pub fn is_supported(self) -> bool {
        self != RaytracingTier::NotSupported
    }

    /// Whether inline raytracing queries are available.
    pub fn query_supported(self) -> bool {
        self == RaytracingTier::Tier1_1
    }
}

// ============================================================================
// Backend Conventions
// ============================================================================

/// Clip-space depth range produced by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipDepth {
    /// Depth in `[0, 1]`.
    ZeroToOne,
    /// Depth in `[-1, 1]`.
    NegativeOneToOne,
}

/// Matrix memory order expected by backend shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixOrder {
    RowMajor,
    ColumnMajor,
}

/// How the backend renders to multiple views in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultiviewStrategy {
    /// One view per pass; the caller replays passes itself.
    Unsupported,
    /// Native view instancing.
    ViewInstancing,
    /// Render-target array slices addressed from the shader.
    RenderTargetArray,
}

// ============================================================================
// Adapter Identity
// ============================================================================

/// Physical kind of the adapter behind a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    /// Dedicated or integrated GPU hardware.
    Hardware,
    /// Software rasterizer.
    Software,
}

/// Identity of the adapter a device was created on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProperties {
    /// PCI vendor id.
    pub vendor_id: u32,
    /// PCI device id.
    pub device_id: u32,
    /// Hardware or software adapter.
    pub adapter_kind: AdapterKind,
}

// ============================================================================
// Adapter Profile
// ============================================================================

/// Capability profile of an adapter as seen by the probing code.
///
/// The driver-free backend is constructed from a profile directly, which
/// makes capability gaps reproducible in tests. Native backends fill one in
/// from their driver queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterProfile {
    /// Adapter name reported in logs.
    pub name: String,
    /// PCI vendor id.
    pub vendor_id: u32,
    /// PCI device id.
    pub device_id: u32,
    /// Hardware or software adapter.
    pub adapter_kind: AdapterKind,
    /// Highest feature level creation can succeed at; `None` rejects every
    /// level and device creation fails.
    pub max_feature_level: Option<FeatureLevel>,
    /// Render pass support tier.
    pub render_pass_tier: RenderPassTier,
    /// Raytracing support tier.
    pub raytracing_tier: RaytracingTier,
    /// Whether mesh and task shaders are available.
    pub mesh_shading: bool,
}

impl Default for AdapterProfile {
    /// Full-featured hardware profile.
    fn default() -> Self {
        Self {
            name: "Null Adapter".to_string(),
            vendor_id: 0,
            device_id: 0,
            adapter_kind: AdapterKind::Software,
            max_feature_level: Some(FeatureLevel::Level3),
            render_pass_tier: RenderPassTier::Tier2,
            raytracing_tier: RaytracingTier::Tier1_1,
            mesh_shading: true,
        }
    }
}

impl AdapterProfile {
    /// Profile that rejects every feature level.
    ///
    /// Device creation against it fails with a creation error.
    pub fn unsupported() -> Self {
        Self {
            max_feature_level: None,
            ..Default::default()
        }
    }

    /// Set the adapter name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Cap the feature level creation can reach.
    pub fn with_max_feature_level(mut self, level: FeatureLevel) -> Self {
        self.max_feature_level = Some(level);
        self
    }

    /// Set the render pass tier.
    pub fn with_render_pass_tier(mut self, tier: RenderPassTier) -> Self {
        self.render_pass_tier = tier;
        self
    }

    /// Set the raytracing tier.
    pub fn with_raytracing_tier(mut self, tier: RaytracingTier) -> Self {
        self.raytracing_tier = tier;
        self
    }

    /// Enable or disable mesh shading.
    pub fn with_mesh_shading(mut self, mesh_shading: bool) -> Self {
        self.mesh_shading = mesh_shading;
        self
    }

    /// Whether the profile accepts `level`.
    pub fn supports_feature_level(&self, level: FeatureLevel) -> bool {
        match self.max_feature_level {
            Some(max) => level <= max,
            None => false,
        }
    }
}

// ============================================================================
// Device Capabilities
// ============================================================================

/// Capabilities and conventions fixed at device creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Feature level the device was created at.
    pub feature_level: FeatureLevel,
    /// Render pass support tier.
    pub render_pass_tier: RenderPassTier,
    /// Raytracing support tier.
    pub raytracing_tier: RaytracingTier,
    /// Whether mesh and task shaders are available.
    pub mesh_shading: bool,
    /// Clip-space depth range convention.
    pub clip_depth: ClipDepth,
    /// Matrix memory order convention.
    pub matrix_order: MatrixOrder,
    /// Multiview rendering strategy.
    pub multiview: MultiviewStrategy,
    /// Whether projection matrices must be flipped for the backend.
    pub flip_projection_required: bool,
}

impl DeviceCapabilities {
    /// Whether raytracing pipelines and acceleration structures work.
    pub fn raytracing_supported(&self) -> bool {
        self.raytracing_tier.is_supported()
    }

    /// Whether inline raytracing queries are available.
    pub fn raytracing_query_supported(&self) -> bool {
        self.raytracing_tier.query_supported()
    }

    /// Whether passes run on the native render pass path.
    pub fn native_render_passes(&self) -> bool {
        self.render_pass_tier.native_render_passes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_order_is_descending() {
        let order = FeatureLevel::PROBE_ORDER;
        assert!(order[0] > order[1]);
        assert!(order[1] > order[2]);
    }

    #[test]
    fn test_raytracing_tier_query_support() {
        assert!(!RaytracingTier::NotSupported.is_supported());
        assert!(RaytracingTier::Tier1_0.is_supported());
        assert!(!RaytracingTier::Tier1_0.query_supported());
        assert!(RaytracingTier::Tier1_1.query_supported());
    }

    #[test]
    fn test_render_pass_tier_native_threshold() {
        assert!(!RenderPassTier::Tier0.native_render_passes());
        assert!(!RenderPassTier::Tier1.native_render_passes());
        assert!(RenderPassTier::Tier2.native_render_passes());
    }

    #[test]
    fn test_profile_feature_level_cap() {
        let profile = AdapterProfile::default().with_max_feature_level(FeatureLevel::Level2);
        assert!(profile.supports_feature_level(FeatureLevel::Level1));
        assert!(profile.supports_feature_level(FeatureLevel::Level2));
        assert!(!profile.supports_feature_level(FeatureLevel::Level3));
        assert!(!AdapterProfile::unsupported().supports_feature_level(FeatureLevel::Level1));
    }
}
