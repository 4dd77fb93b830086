//! Detection source seam: the platform component that recognizes cards.

use super::anchor::Anchor;
use super::configuration::{Capabilities, RunOptions, TrackingConfiguration};

/// Platform image-tracking session.
///
/// `remove_anchor` is called by the staleness sweep with the marker registry
/// locked: it must not block and must not call back into the registry.
pub trait DetectionSource: Send + Sync {
    /// Feature query used to pick the configuration variant.
    fn capabilities(&self) -> Capabilities;

    /// (Re)start tracking with `configuration`.
    fn run(&self, configuration: TrackingConfiguration, options: RunOptions);

    fn pause(&self);

    /// Stop tracking `anchor`.
    fn remove_anchor(&self, anchor: &Anchor);
}
