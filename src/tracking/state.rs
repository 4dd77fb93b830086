//! Per-marker lifecycle state.

/// Lifecycle of one marker identifier in the registry.
///
/// `Absent -> Tracked` on the first refresh, `Tracked -> Tracked` on every
/// later refresh, `Tracked -> Absent` on sweep eviction or when the detection
/// source reports the marker lost. A fresh refresh re-enters `Tracked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerState {
    /// Not in the registry.
    Absent,
    /// In the registry with an attached overlay node.
    Tracked,
}

impl Default for MarkerState {
    fn default() -> Self {
        Self::Absent
    }
}
