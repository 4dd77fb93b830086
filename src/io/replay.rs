//! Recorded detection replay.
//!
//! A replay file is a CSV of marker sightings, one per rendered frame per
//! visible card:
//!
//! ```text
//! # timestamp_ms,anchor_id,marker_name,x,y,z
//! 0,a,card1,0.0,0.0,-0.4
//! 16,a,card1,0.001,0.0,-0.4
//! ```
//!
//! [`ReplayDetectionSource`] plays it back as a detection source would:
//! the first sighting of an anchor requests a node, every sighting reports a
//! pose update, and an anchor removed by the session is re-created on its
//! next sighting.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use nalgebra::{Isometry3, Vector2};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::debug;

use crate::overlay::SceneGraph;
use crate::system::MarkerSession;
use crate::tracking::{
    Anchor, AnchorId, Capabilities, DetectionSource, NodeHandle, RunOptions, TrackingConfiguration,
};

/// One sighting of a card.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectionEvent {
    /// Offset from the start of the replay.
    pub timestamp_ms: u64,
    /// Stable id of the physical sighting track.
    pub anchor_id: String,
    /// Reference image the card matches.
    pub marker_name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl DetectionEvent {
    pub fn transform(&self) -> Isometry3<f64> {
        Isometry3::translation(self.x, self.y, self.z)
    }
}

pub fn load_replay<P: AsRef<Path>>(path: P) -> Result<Vec<DetectionEvent>> {
    let path = path.as_ref();
    let file =
        std::fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    parse_replay(file).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse replay CSV. Events are returned sorted by timestamp.
pub fn parse_replay<R: Read>(reader: R) -> Result<Vec<DetectionEvent>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut events = Vec::new();
    for rec in rdr.deserialize() {
        let event: DetectionEvent = rec?;
        events.push(event);
    }
    events.sort_by_key(|e| e.timestamp_ms);
    Ok(events)
}

struct LiveAnchor {
    anchor: Anchor,
    node: Option<NodeHandle>,
}

/// Detection source driven by recorded sightings.
pub struct ReplayDetectionSource {
    capabilities: Capabilities,
    running: AtomicBool,
    /// Reference image name → physical size, from the running configuration.
    references: Mutex<HashMap<String, Vector2<f64>>>,
    /// Live anchors keyed by the replay's anchor id.
    live: Mutex<HashMap<String, LiveAnchor>>,
    next_generation: AtomicU64,
    removed: AtomicU64,
}

impl ReplayDetectionSource {
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            running: AtomicBool::new(false),
            references: Mutex::new(HashMap::new()),
            live: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
            removed: AtomicU64::new(0),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn live_anchor_count(&self) -> usize {
        self.live.lock().len()
    }

    /// Anchors removed on request of the session so far.
    pub fn removed_anchor_count(&self) -> u64 {
        self.removed.load(Ordering::SeqCst)
    }

    /// Feed one sighting through `session`'s callbacks.
    ///
    /// Sightings are ignored while paused and for cards outside the running
    /// configuration. Returns the anchor the sighting was attributed to.
    pub fn replay_event<S>(
        &self,
        session: &MarkerSession<Self, S>,
        event: &DetectionEvent,
        now: Instant,
    ) -> Option<Anchor>
    where
        S: SceneGraph + ?Sized + 'static,
    {
        if !self.is_running() {
            return None;
        }
        let physical_size = *self.references.lock().get(&event.marker_name)?;

        // The live lock is released before calling into the session: the
        // sweep holds the registry lock while it calls `remove_anchor`. A
        // sweep landing in between makes the session drop the update.
        let (anchor, node, created) = {
            let mut live = self.live.lock();
            let mut created = false;
            let entry = live.entry(event.anchor_id.clone()).or_insert_with(|| {
                created = true;
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                LiveAnchor {
                    anchor: Anchor::for_image(
                        AnchorId::new(format!("{}#{}", event.anchor_id, generation)),
                        event.transform(),
                        event.marker_name.clone(),
                        physical_size,
                    ),
                    node: None,
                }
            });
            entry.anchor.transform = event.transform();
            (entry.anchor.clone(), entry.node.clone(), created)
        };

        let node = if created {
            let node = session.node_for_anchor(&anchor);
            if let Some(live) = self.live.lock().get_mut(&event.anchor_id) {
                if live.anchor.id == anchor.id {
                    live.node = node.clone();
                }
            }
            node
        } else {
            node
        };

        if let Some(node) = node {
            session.did_update(&node, &anchor, now);
        }
        Some(anchor)
    }
}

impl DetectionSource for ReplayDetectionSource {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn run(&self, configuration: TrackingConfiguration, options: RunOptions) {
        {
            let mut references = self.references.lock();
            references.clear();
            for image in configuration.reference_images() {
                references.insert(image.name.clone(), image.physical_size);
            }
        }
        if options.remove_existing_anchors {
            self.live.lock().clear();
        }
        self.running.store(true, Ordering::SeqCst);
        debug!("Replay source running {}", configuration.name());
    }

    fn pause(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn remove_anchor(&self, anchor: &Anchor) {
        let mut live = self.live.lock();
        let before = live.len();
        live.retain(|_, l| l.anchor.id != anchor.id);
        if live.len() < before {
            self.removed.fetch_add(1, Ordering::SeqCst);
        }
    }
}
