//! Session event types.
//!
//! Published by the session's background threads (dataset loading, sweep) so
//! a front end can react without polling.

/// Something the session did on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The detection source was (re)started.
    Configured {
        /// `image-tracking` or `world-tracking`.
        variant: &'static str,
        reference_images: usize,
    },

    /// The dataset could not be built; tracking stays unconfigured.
    ConfigurationFailed { reason: String },

    /// A sweep evicted stale markers.
    MarkersEvicted { count: usize },
}
