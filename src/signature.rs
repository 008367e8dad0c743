//! Indirect command signature cache.
//!
//! Signatures pair an indirect operation family with the byte stride of its
//! argument records. The cache is built once at device creation and shared
//! read-only afterwards; requesting a signature the device cannot execute is
//! a capability error, surfaced here rather than at first dispatch.

use crate::error::{RhiError, RhiResult};
use crate::types::IndirectOpKind;

/// One cached command signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndirectSignature {
    kind: IndirectOpKind,
    byte_stride: u32,
}

impl IndirectSignature {
    fn new(kind: IndirectOpKind) -> Self {
        Self {
            kind,
            byte_stride: kind.byte_stride(),
        }
    }

    /// Operation family the signature executes.
    pub fn kind(&self) -> IndirectOpKind {
        self.kind
    }

    /// Stride between consecutive argument records in bytes.
    ///
    /// Equal to the size of the matching argument struct.
    pub fn byte_stride(&self) -> u32 {
        self.byte_stride
    }
}

/// The device-wide signature cache.
///
/// Draw, indexed draw, and dispatch signatures always exist. The
/// dispatch-rays signature exists only on devices with raytracing support;
/// on others it is never built and [`get`](Self::get) reports the gap.
/// Mesh draws execute through the dispatch signature, which matches their
/// group-count argument layout, so the cache holds no separate entry for
/// them.
#[derive(Debug)]
pub struct SignatureCache {
    draw: IndirectSignature,
    draw_indexed: IndirectSignature,
    dispatch: IndirectSignature,
    dispatch_rays: Option<IndirectSignature>,
}

impl SignatureCache {
    /// Build the cache, including the dispatch-rays signature only when
    /// `raytracing_supported`.
    pub fn new(raytracing_supported: bool) -> Self {
        let dispatch_rays = raytracing_supported
            .then(|| IndirectSignature::new(IndirectOpKind::DispatchRays));
        log::debug!(
            "Built signature cache ({} entries)",
            3 + dispatch_rays.is_some() as usize
        );
        Self {
            draw: IndirectSignature::new(IndirectOpKind::Draw),
            draw_indexed: IndirectSignature::new(IndirectOpKind::DrawIndexed),
            dispatch: IndirectSignature::new(IndirectOpKind::Dispatch),
            dispatch_rays,
        }
    }

    /// Look up the signature for `kind`.
    ///
    /// Returns [`RhiError::NotSupported`] for
    /// [`IndirectOpKind::DispatchRays`] on a device without raytracing.
    pub fn get(&self, kind: IndirectOpKind) -> RhiResult<&IndirectSignature> {
        match kind {
            IndirectOpKind::Draw => Ok(&self.draw),
            IndirectOpKind::DrawIndexed => Ok(&self.draw_indexed),
            IndirectOpKind::Dispatch => Ok(&self.dispatch),
            IndirectOpKind::DispatchRays => self.dispatch_rays.as_ref().ok_or_else(|| {
                RhiError::NotSupported(
                    "dispatch-rays command signature requires raytracing support".to_string(),
                )
            }),
        }
    }

    /// Whether the dispatch-rays signature was built.
    pub fn has_dispatch_rays(&self) -> bool {
        self.dispatch_rays.is_some()
    }
}
