//! GPU query heap resource.

use std::sync::{Arc, Weak};

use crate::backend::GpuQuery;
use crate::device::Device;
use crate::types::{QueryDescriptor, QueryKind};

/// A heap of GPU query slots.
///
/// Query heaps are created by [`Device::create_query`] and are
/// reference-counted. Encoders write into individual slots
/// (timestamps, occlusion begin/end, statistics begin/end) and
/// `resolve_query` copies slot ranges into readable memory.
pub struct Query {
    device: Weak<Device>,
    descriptor: QueryDescriptor,
    gpu: GpuQuery,
}

impl Query {
    pub(crate) fn new(device: Weak<Device>, descriptor: QueryDescriptor, gpu: GpuQuery) -> Self {
        Self {
            device,
            descriptor,
            gpu,
        }
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<Device>> {
        self.device.upgrade()
    }

    pub(crate) fn device_weak(&self) -> &Weak<Device> {
        &self.device
    }

    pub(crate) fn gpu(&self) -> &GpuQuery {
        &self.gpu
    }

    /// Get the query heap descriptor.
    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    /// Kind of queries the heap records.
    pub fn kind(&self) -> QueryKind {
        self.descriptor.kind
    }

    /// Number of query slots in the heap.
    pub fn count(&self) -> u32 {
        self.descriptor.count
    }

    /// Get the query heap label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("kind", &self.descriptor.kind)
            .field("count", &self.descriptor.count)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// Ensure Query is Send + Sync
static_assertions::assert_impl_all!(Query: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_kind_and_count() {
        let desc = QueryDescriptor::new(QueryKind::Timestamp, 64);
        let query = Query::new(Weak::new(), desc, GpuQuery::Null);
        assert_eq!(query.kind(), QueryKind::Timestamp);
        assert_eq!(query.count(), 64);
    }
}
