//! Marker tracking bookkeeping.
//!
//! This module owns everything that has state and timing semantics:
//! - [`MarkerRegistry`] - identifier → last refresh, node and anchor
//! - [`StalenessTracker`] - refresh/sweep/lost operations over the registry,
//!   wired to the scene graph and the detection source
//! - [`Sweeper`] - the recurring task that drives the sweep
//! - [`TrackingConfiguration`] - capability-selected detection source setup

pub mod anchor;
pub mod configuration;
pub mod registry;
pub mod source;
pub mod staleness;
pub mod state;
pub mod sweeper;
pub mod types;

pub use anchor::{Anchor, ImageAnchorInfo};
pub use configuration::{Capabilities, RunOptions, TrackingConfiguration};
pub use registry::{MarkerRegistry, NodeHandle, TrackedMarkerState};
pub use source::DetectionSource;
pub use staleness::StalenessTracker;
pub use state::MarkerState;
pub use sweeper::Sweeper;
pub use types::{AnchorId, NodeId};
