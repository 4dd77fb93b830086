//! State shared between the session and its background threads.
//!
//! The dataset completion callback only ever holds a `Weak` to this struct,
//! so a result arriving after the session is gone is dropped instead of
//! touching freed state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::info;

use crate::overlay::SceneGraph;
use crate::tracking::{DetectionSource, RunOptions, StalenessTracker, TrackingConfiguration};

pub struct SharedState<D: ?Sized, S: ?Sized> {
    pub source: Arc<D>,
    pub scene: Arc<S>,

    /// Registry plus sweep; also captured by the sweeper thread.
    pub tracker: Arc<StalenessTracker<D, S>>,

    /// Variant the detection source currently runs, if any.
    active_configuration: RwLock<Option<&'static str>>,

    /// Set when the owning session shuts down; late dataset results are ignored.
    shutdown_requested: AtomicBool,
}

impl<D, S> SharedState<D, S>
where
    D: DetectionSource + ?Sized,
    S: SceneGraph + ?Sized,
{
    pub fn new(source: Arc<D>, scene: Arc<S>, tracker: Arc<StalenessTracker<D, S>>) -> Arc<Self> {
        Arc::new(Self {
            source,
            scene,
            tracker,
            active_configuration: RwLock::new(None),
            shutdown_requested: AtomicBool::new(false),
        })
    }

    /// Start the detection source from scratch with `configuration`.
    ///
    /// Existing anchors go away with the reset, so every tracked overlay is
    /// detached and the registry emptied.
    pub fn run_configuration(&self, configuration: TrackingConfiguration) {
        let variant = configuration.name();
        let n_images = configuration.reference_images().len();

        for entry in self.tracker.registry().clear() {
            self.scene.detach(&entry.node);
        }
        self.source.run(configuration, RunOptions::RESET);
        *self.active_configuration.write() = Some(variant);

        info!("Tracking configured: {} with {} reference images", variant, n_images);
    }

    pub fn clear_configuration(&self) {
        *self.active_configuration.write() = None;
    }

    pub fn active_configuration(&self) -> Option<&'static str> {
        *self.active_configuration.read()
    }

    pub fn is_configured(&self) -> bool {
        self.active_configuration.read().is_some()
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }
}
