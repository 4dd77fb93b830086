//! Anchor staleness tracker.
//!
//! Decides, independently of the detection source's own lifecycle signals,
//! when an overlay has gone without a refresh for too long and tears it down:
//! the registry entry is removed, the node detached from the scene and the
//! detection source told to stop tracking the anchor.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::config::StalenessPolicy;
use crate::overlay::SceneGraph;

use super::anchor::Anchor;
use super::registry::{MarkerRegistry, NodeHandle, TrackedMarkerState};
use super::source::DetectionSource;
use super::state::MarkerState;

pub struct StalenessTracker<D: ?Sized, S: ?Sized> {
    registry: MarkerRegistry,
    policy: StalenessPolicy,
    source: Arc<D>,
    scene: Arc<S>,
}

impl<D, S> StalenessTracker<D, S>
where
    D: DetectionSource + ?Sized,
    S: SceneGraph + ?Sized,
{
    pub fn new(policy: StalenessPolicy, source: Arc<D>, scene: Arc<S>) -> Self {
        Self {
            registry: MarkerRegistry::new(),
            policy,
            source,
            scene,
        }
    }

    pub fn policy(&self) -> StalenessPolicy {
        self.policy
    }

    pub fn registry(&self) -> &MarkerRegistry {
        &self.registry
    }

    /// Record that `identifier`'s overlay was refreshed at `now` with `node`.
    ///
    /// A different node previously held by the entry is detached, so only
    /// the registered node stays in the scene.
    pub fn record_refresh(&self, identifier: &str, node: NodeHandle, anchor: Anchor, now: Instant) {
        if let Some(replaced) = self.registry.record_refresh(identifier, node, anchor, now) {
            debug!("Marker {} replaced node {}", identifier, replaced.id);
            self.scene.detach(&replaced);
        }
    }

    /// Per-frame refresh of an overlay that is already tracked.
    ///
    /// Returns false and changes nothing when `node` is no longer the
    /// registered node for `identifier` (evicted, lost or replaced).
    pub fn refresh(&self, identifier: &str, node: &NodeHandle, anchor: Anchor, now: Instant) -> bool {
        self.registry.refresh(identifier, node.id, anchor, now)
    }

    /// Evict everything older than the threshold. Returns the number evicted.
    ///
    /// Each eviction detaches the node and removes the anchor exactly once;
    /// a second sweep with no refresh in between finds nothing to do.
    pub fn sweep(&self, now: Instant) -> usize {
        let evicted = self
            .registry
            .evict_stale(now, self.policy.threshold(), |entry| {
                self.scene.detach(&entry.node);
                self.source.remove_anchor(&entry.anchor);
            });

        for entry in &evicted {
            debug!(
                "Evicted stale marker {} (node {}, idle {:?})",
                entry.identifier,
                entry.node.id,
                now.saturating_duration_since(entry.last_refresh)
            );
        }
        evicted.len()
    }

    /// The detection source reported the marker lost: drop the entry without
    /// calling the detection source or the scene. The removed entry is
    /// returned so the node's owner can take it down.
    pub fn mark_lost(&self, identifier: &str) -> Option<TrackedMarkerState> {
        self.registry.remove(identifier)
    }

    pub fn state_of(&self, identifier: &str) -> MarkerState {
        self.registry.state_of(identifier)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::thread;
    use std::time::Duration;

    use parking_lot::Mutex;

    use crate::config::AppConfig;
    use crate::overlay::{LabelOverlayBuilder, OverlayNode};
    use crate::tracking::configuration::{Capabilities, RunOptions, TrackingConfiguration};
    use crate::tracking::registry::tests::{anchor_at, node_for};
    use crate::tracking::types::{AnchorId, NodeId};

    #[derive(Default)]
    pub(crate) struct RecordingScene {
        pub attached: Mutex<Vec<NodeId>>,
        pub detached: Mutex<Vec<NodeId>>,
    }

    impl SceneGraph for RecordingScene {
        fn attach(&self, node: &OverlayNode, _anchor: &Anchor) {
            self.attached.lock().push(node.id);
        }

        fn detach(&self, node: &OverlayNode) {
            self.detached.lock().push(node.id);
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingSource {
        pub capabilities: Capabilities,
        pub removed: Mutex<Vec<AnchorId>>,
        pub runs: Mutex<Vec<(TrackingConfiguration, RunOptions)>>,
        pub pauses: Mutex<usize>,
    }

    impl DetectionSource for RecordingSource {
        fn capabilities(&self) -> Capabilities {
            self.capabilities
        }

        fn run(&self, configuration: TrackingConfiguration, options: RunOptions) {
            self.runs.lock().push((configuration, options));
        }

        fn pause(&self) {
            *self.pauses.lock() += 1;
        }

        fn remove_anchor(&self, anchor: &Anchor) {
            self.removed.lock().push(anchor.id.clone());
        }
    }

    type Tracker = StalenessTracker<RecordingSource, RecordingScene>;

    fn tracker() -> (Tracker, Arc<RecordingSource>, Arc<RecordingScene>) {
        let source = Arc::new(RecordingSource::default());
        let scene = Arc::new(RecordingScene::default());
        let tracker = StalenessTracker::new(StalenessPolicy::default(), source.clone(), scene.clone());
        (tracker, source, scene)
    }

    fn builder() -> LabelOverlayBuilder {
        LabelOverlayBuilder::from_config(&AppConfig::default())
    }

    #[test]
    fn test_sweep_detaches_and_removes_exactly_once() {
        let (tracker, source, scene) = tracker();
        let b = builder();
        let t = Instant::now();
        let node = node_for(&b, "A1");
        let node_id = node.id;
        tracker.record_refresh("A1", node, anchor_at("A1", 0.0), t);

        assert_eq!(tracker.sweep(t + Duration::from_millis(2_999)), 0);
        assert!(scene.detached.lock().is_empty());

        assert_eq!(tracker.sweep(t + Duration::from_millis(3_001)), 1);
        assert_eq!(*scene.detached.lock(), vec![node_id]);
        assert_eq!(*source.removed.lock(), vec![AnchorId::new("A1")]);
        assert_eq!(tracker.state_of("A1"), MarkerState::Absent);
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let (tracker, source, scene) = tracker();
        let b = builder();
        let t = Instant::now();
        tracker.record_refresh("A1", node_for(&b, "A1"), anchor_at("A1", 0.0), t);
        tracker.record_refresh(
            "A2",
            node_for(&b, "A2"),
            anchor_at("A2", 0.0),
            t + Duration::from_secs(2),
        );

        let now = t + Duration::from_secs(4);
        assert_eq!(tracker.sweep(now), 1);
        let ids_after_first = tracker.registry().identifiers();
        assert_eq!(tracker.sweep(now), 0);

        assert_eq!(tracker.registry().identifiers(), ids_after_first);
        assert_eq!(scene.detached.lock().len(), 1);
        assert_eq!(source.removed.lock().len(), 1);
    }

    #[test]
    fn test_retracking_after_eviction_looks_like_first_time() {
        let (tracker, _source, _scene) = tracker();
        let b = builder();
        let t = Instant::now();
        let first = node_for(&b, "A1");
        let first_id = first.id;
        tracker.record_refresh("A1", first, anchor_at("A1", 0.0), t);
        let first_entry = tracker.registry().get("A1").unwrap();

        tracker.sweep(t + Duration::from_secs(10));
        assert_eq!(tracker.state_of("A1"), MarkerState::Absent);

        let fresh = node_for(&b, "A1");
        let t2 = t + Duration::from_secs(11);
        tracker.record_refresh("A1", fresh, anchor_at("A1", 0.0), t2);

        let entry = tracker.registry().get("A1").unwrap();
        assert_eq!(tracker.state_of("A1"), MarkerState::Tracked);
        assert_ne!(entry.node.id, first_id);
        assert_eq!(entry.identifier, first_entry.identifier);
        assert_eq!(entry.anchor, first_entry.anchor);
        assert_eq!(entry.last_refresh, t2);
        assert_eq!(tracker.registry().len(), 1);
    }

    #[test]
    fn test_mark_lost_leaves_scene_alone() {
        let (tracker, source, scene) = tracker();
        let b = builder();
        tracker.record_refresh("A1", node_for(&b, "A1"), anchor_at("A1", 0.0), Instant::now());

        assert!(tracker.mark_lost("A1").is_some());
        assert!(tracker.mark_lost("A1").is_none());
        assert!(scene.detached.lock().is_empty());
        assert!(source.removed.lock().is_empty());
    }

    #[test]
    fn test_concurrent_refresh_and_sweep_never_double_evict() {
        let (tracker, _source, scene) = tracker();
        let tracker = Arc::new(tracker);
        let b = Arc::new(builder());
        let base = Instant::now();

        let refresher = {
            let tracker = tracker.clone();
            let b = b.clone();
            thread::spawn(move || {
                let mut nodes: HashMap<String, NodeHandle> = HashMap::new();
                for step in 0..2_000u64 {
                    let id = format!("A{}", step % 4);
                    // Timestamps jump around so the sweeper keeps finding stale entries.
                    let at = base + Duration::from_millis((step % 7) * 1_000);
                    let refreshed = nodes
                        .get(&id)
                        .is_some_and(|node| tracker.refresh(&id, node, anchor_at(&id, 0.0), at));
                    if !refreshed {
                        // Evicted (or never seen): comes back with a fresh node.
                        let node = node_for(&b, &id);
                        nodes.insert(id.clone(), node.clone());
                        tracker.record_refresh(&id, node, anchor_at(&id, 0.0), at);
                    }
                }
            })
        };
        let sweeper = {
            let tracker = tracker.clone();
            thread::spawn(move || {
                let mut evicted = 0;
                for _ in 0..2_000 {
                    evicted += tracker.sweep(base + Duration::from_secs(8));
                }
                evicted
            })
        };

        refresher.join().unwrap();
        let evicted = sweeper.join().unwrap();

        let detached = scene.detached.lock().clone();
        assert_eq!(detached.len(), evicted);
        let mut unique = detached.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), detached.len());

        // Everything still tracked is attached (never detached).
        for id in tracker.registry().identifiers() {
            let entry = tracker.registry().get(&id).unwrap();
            assert!(!detached.contains(&entry.node.id));
        }
    }

    #[test]
    fn test_late_refresh_after_eviction_is_ignored() {
        let (tracker, source, scene) = tracker();
        let b = builder();
        let t = Instant::now();
        let node = node_for(&b, "A1");
        tracker.record_refresh("A1", node.clone(), anchor_at("A1", 0.0), t);

        assert_eq!(tracker.sweep(t + Duration::from_secs(10)), 1);
        assert!(!tracker.refresh("A1", &node, anchor_at("A1", 0.0), t + Duration::from_secs(10)));
        assert_eq!(tracker.state_of("A1"), MarkerState::Absent);

        assert_eq!(tracker.sweep(t + Duration::from_secs(20)), 0);
        assert_eq!(*scene.detached.lock(), vec![node.id]);
        assert_eq!(source.removed.lock().len(), 1);
    }

    #[test]
    fn test_replacing_a_node_detaches_the_old_one() {
        let (tracker, source, scene) = tracker();
        let b = builder();
        let t = Instant::now();
        let first = node_for(&b, "A1");
        let second = node_for(&b, "A1");

        tracker.record_refresh("A1", first.clone(), anchor_at("A1", 0.0), t);
        tracker.record_refresh("A1", first.clone(), anchor_at("A1", 0.0), t);
        assert!(scene.detached.lock().is_empty());

        tracker.record_refresh("A1", second.clone(), anchor_at("A1", 0.0), t);
        assert_eq!(*scene.detached.lock(), vec![first.id]);
        assert!(source.removed.lock().is_empty());
        assert_eq!(tracker.registry().get("A1").unwrap().node.id, second.id);
    }
}
