//! GPU query types and descriptors.

/// Kind of query a query heap records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueryKind {
    /// Nanosecond timestamps written at encoder-chosen points.
    #[default]
    Timestamp,
    /// Passed-sample counts between begin/end pairs.
    Occlusion,
    /// Pipeline statistics between begin/end pairs.
    PipelineStatistics,
}

/// Descriptor for creating a query heap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryDescriptor {
    /// Debug label for the query heap.
    pub label: Option<String>,
    /// Kind of queries recorded.
    pub kind: QueryKind,
    /// Number of query slots.
    pub count: u32,
}

impl QueryDescriptor {
    /// Create a query heap descriptor with `count` slots.
    pub fn new(kind: QueryKind, count: u32) -> Self {
        Self {
            label: None,
            kind,
            count,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
