//! RHI error types.
//!
//! Contract violations (wrong-state encoder calls, out-of-range indices,
//! cross-device resource references) are caller bugs and panic instead of
//! returning one of these errors.

use thiserror::Error;

use crate::descriptor::DescriptorHeapKind;

/// Errors that can occur in the RHI.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RhiError {
    /// Failed to create the device at any requested feature level.
    #[error("Failed to create device: {0}")]
    DeviceCreationFailed(String),
    /// A descriptor heap has no free slots left.
    #[error("Descriptor heap {kind:?} exhausted (capacity {capacity})")]
    DescriptorHeapExhausted {
        kind: DescriptorHeapKind,
        capacity: u32,
    },
    /// A freed descriptor index was not allocated from this heap.
    #[error("Descriptor index {index} is not allocated in heap {kind:?}")]
    InvalidDescriptorFree {
        kind: DescriptorHeapKind,
        index: u32,
    },
    /// The device does not support the requested feature.
    #[error("Not supported: {0}")]
    NotSupported(String),
    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Failed to create a resource.
    #[error("Failed to create resource: {0}")]
    ResourceCreationFailed(String),
}

/// Result alias used throughout the RHI.
pub type RhiResult<T> = Result<T, RhiError>;
