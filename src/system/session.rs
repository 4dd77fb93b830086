//! Marker session - main entry point and thread orchestration.
//!
//! The `MarkerSession` is what a front end drives. It forwards the detection
//! source's callbacks to the staleness tracker and the label builder, loads
//! the dataset in the background, and owns the sweep thread on the
//! world-tracking path.

use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Instant;

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, StalenessPolicy};
use crate::dataset::{DatasetError, DatasetLoader, Fetch, HttpFetcher, ReferenceImage};
use crate::overlay::{LabelOverlayBuilder, SceneGraph};
use crate::tracking::{
    Anchor, DetectionSource, MarkerState, NodeHandle, StalenessTracker, Sweeper,
    TrackingConfiguration,
};

use super::messages::SessionEvent;
use super::shared_state::SharedState;

/// Capacity of the event channel. Events are dropped when nobody drains it.
const EVENT_CHANNEL_CAPACITY: usize = 64;

pub struct MarkerSession<D, S>
where
    D: DetectionSource + ?Sized + 'static,
    S: SceneGraph + ?Sized + 'static,
{
    shared: Arc<SharedState<D, S>>,
    loader: DatasetLoader,
    labels: LabelOverlayBuilder,
    policy: StalenessPolicy,

    /// Running only on the world-tracking path, between appear and disappear.
    sweeper: Mutex<Option<Sweeper>>,

    event_sender: Sender<SessionEvent>,
    event_receiver: Receiver<SessionEvent>,
}

impl<D, S> MarkerSession<D, S>
where
    D: DetectionSource + ?Sized + 'static,
    S: SceneGraph + ?Sized + 'static,
{
    pub fn new(
        config: &AppConfig,
        source: Arc<D>,
        scene: Arc<S>,
        fetcher: Arc<dyn Fetch>,
    ) -> Result<Self> {
        let loader = DatasetLoader::new(&config.dataset_url, fetcher)?;
        let tracker = Arc::new(StalenessTracker::new(
            config.staleness,
            source.clone(),
            scene.clone(),
        ));
        let (event_sender, event_receiver) = bounded(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            shared: SharedState::new(source, scene, tracker),
            loader,
            labels: LabelOverlayBuilder::from_config(config),
            policy: config.staleness,
            sweeper: Mutex::new(None),
            event_sender,
            event_receiver,
        })
    }

    /// Session fetching the dataset over HTTP.
    pub fn with_http(config: &AppConfig, source: Arc<D>, scene: Arc<S>) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.request_timeout())?;
        Self::new(config, source, scene, Arc::new(fetcher))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Load the dataset in the background and start the detection source
    /// once it is ready.
    ///
    /// On failure the error is logged and published, and tracking stays
    /// unconfigured. There is no retry; call again to reload. The returned
    /// handle lets the caller wait for the attempt to finish.
    pub fn reset_tracking_configuration(&self) -> JoinHandle<()> {
        let shared = Arc::downgrade(&self.shared);
        let events = self.event_sender.clone();
        info!("Loading marker dataset from {}", self.loader.dataset_url());

        self.loader
            .load_async(move |result| apply_dataset_result(shared, events, result))
    }

    /// The view is about to appear.
    pub fn will_appear(&self) -> JoinHandle<()> {
        self.reset_tracking_configuration()
    }

    /// The view appeared. Without per-frame image tracking, overlays are
    /// expired by the staleness sweep, so (re)start it.
    pub fn did_appear(&self) -> Result<()> {
        if !self.shared.source.capabilities().needs_staleness_sweep() {
            return Ok(());
        }

        let mut slot = self.sweeper.lock();
        if let Some(mut previous) = slot.take() {
            previous.stop();
        }

        let tracker = self.shared.tracker.clone();
        let events = self.event_sender.clone();
        let sweeper = Sweeper::spawn(self.policy.sweep_interval(), move |now| {
            let count = tracker.sweep(now);
            if count > 0 {
                let _ = events.try_send(SessionEvent::MarkersEvicted { count });
            }
        })?;
        debug!("Staleness sweep every {:?}", self.policy.sweep_interval());
        *slot = Some(sweeper);
        Ok(())
    }

    /// The view is about to disappear: pause tracking and stop sweeping.
    pub fn will_disappear(&self) {
        self.shared.source.pause();
        self.stop_sweeper();
    }

    /// Stop background work. Also runs on drop.
    pub fn shutdown(&self) {
        self.shared.request_shutdown();
        self.stop_sweeper();
        self.shared.clear_configuration();
    }

    fn stop_sweeper(&self) {
        if let Some(mut sweeper) = self.sweeper.lock().take() {
            sweeper.stop();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Detection source callbacks
    // ─────────────────────────────────────────────────────────────────────────

    /// A new anchor needs a node. Image anchors with a catalog label get a
    /// label node, named after the anchor, attached to the scene and
    /// registered with the tracker in the same step, so every attached node
    /// is covered by the sweep and by a reset.
    pub fn node_for_anchor(&self, anchor: &Anchor) -> Option<NodeHandle> {
        let node = Arc::new(self.labels.node_for_anchor(anchor)?);
        self.shared.scene.attach(&node, anchor);
        self.shared
            .tracker
            .record_refresh(anchor.id.as_str(), node.clone(), anchor.clone(), Instant::now());
        debug!("Attached node {} for anchor {}", node.id, anchor.id);
        Some(node)
    }

    /// An anchor's pose was updated: refresh its registry entry.
    ///
    /// Updates for a node the tracker no longer holds are dropped. The node
    /// was already detached, and the anchor comes back through
    /// `node_for_anchor` with a fresh node.
    pub fn did_update(&self, node: &NodeHandle, anchor: &Anchor, now: Instant) {
        let Some(identifier) = node.name.as_deref() else {
            return;
        };
        if self
            .shared
            .tracker
            .refresh(identifier, node, anchor.clone(), now)
        {
            self.shared.scene.update(node, anchor);
        } else {
            debug!("Dropping update of untracked node {} for {}", node.id, identifier);
        }
    }

    /// The detection source stopped tracking an anchor on its own. The
    /// anchor is already gone there; the overlay attached for it is taken
    /// down here.
    pub fn did_remove(&self, anchor: &Anchor) {
        if let Some(entry) = self.shared.tracker.mark_lost(anchor.id.as_str()) {
            self.shared.scene.detach(&entry.node);
            debug!("Marker {} lost, detached node {}", anchor.id, entry.node.id);
        }
    }

    pub fn session_failed(&self, err: &dyn std::error::Error) {
        error!("Tracking session failed: {}", err);
    }

    pub fn session_interrupted(&self) {
        warn!("Tracking session interrupted");
    }

    /// Tracking resumed after an interruption: reconfigure from scratch.
    pub fn session_interruption_ended(&self) -> JoinHandle<()> {
        info!("Tracking session interruption ended, reconfiguring");
        self.reset_tracking_configuration()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn tracker(&self) -> &Arc<StalenessTracker<D, S>> {
        &self.shared.tracker
    }

    pub fn marker_state(&self, identifier: &str) -> MarkerState {
        self.shared.tracker.state_of(identifier)
    }

    pub fn is_configured(&self) -> bool {
        self.shared.is_configured()
    }

    /// `image-tracking`, `world-tracking`, or `None` before configuration.
    pub fn active_configuration(&self) -> Option<&'static str> {
        self.shared.active_configuration()
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper.lock().as_ref().is_some_and(Sweeper::is_running)
    }

    /// Events published by the background threads.
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.event_receiver.clone()
    }
}

impl<D, S> Drop for MarkerSession<D, S>
where
    D: DetectionSource + ?Sized + 'static,
    S: SceneGraph + ?Sized + 'static,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Completion of a dataset load.
fn apply_dataset_result<D, S>(
    shared: Weak<SharedState<D, S>>,
    events: Sender<SessionEvent>,
    result: Result<Vec<ReferenceImage>, DatasetError>,
) where
    D: DetectionSource + ?Sized,
    S: SceneGraph + ?Sized,
{
    let Some(shared) = shared.upgrade() else {
        debug!("Session gone before the dataset arrived, dropping it");
        return;
    };
    if shared.is_shutdown_requested() {
        debug!("Session shut down before the dataset arrived, dropping it");
        return;
    }

    let images = result.and_then(|images| {
        if images.is_empty() {
            Err(DatasetError::NoReferenceImages)
        } else {
            Ok(images)
        }
    });

    match images {
        Ok(images) => {
            let images = images.into_iter().map(Arc::new).collect();
            let configuration =
                TrackingConfiguration::select(shared.source.capabilities(), images);
            let event = SessionEvent::Configured {
                variant: configuration.name(),
                reference_images: configuration.reference_images().len(),
            };
            shared.run_configuration(configuration);
            let _ = events.try_send(event);
        }
        Err(e) => {
            error!("Failed to build marker dataset, tracking not started: {}", e);
            let _ = events.try_send(SessionEvent::ConfigurationFailed {
                reason: e.to_string(),
            });
        }
    }
}
