//! Marker registry: which overlays are up and when they were last refreshed.
//!
//! Refreshes arrive once per rendered frame per visible marker while the
//! sweep runs on its own thread. All access goes through one mutex, held only
//! for the map operation (and, during eviction, the collaborator calls).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::overlay::OverlayNode;

use super::anchor::Anchor;
use super::state::MarkerState;
use super::types::NodeId;

/// Shared handle to an overlay node.
pub type NodeHandle = Arc<OverlayNode>;

/// Bookkeeping for one displayed marker.
#[derive(Debug, Clone)]
pub struct TrackedMarkerState {
    pub identifier: String,
    pub last_refresh: Instant,
    pub node: NodeHandle,
    pub anchor: Anchor,
}

impl TrackedMarkerState {
    /// Whether more than `threshold` has passed since the last refresh.
    pub fn is_stale(&self, now: Instant, threshold: Duration) -> bool {
        now.saturating_duration_since(self.last_refresh) > threshold
    }
}

/// Identifier → tracked marker map.
///
/// An entry exists exactly while its node is attached to the scene.
#[derive(Default)]
pub struct MarkerRegistry {
    entries: Mutex<HashMap<String, TrackedMarkerState>>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `identifier`. Last writer wins.
    ///
    /// Returns the node the entry held before if it was a different one; it
    /// is no longer tracked and the caller has to detach it.
    pub fn record_refresh(
        &self,
        identifier: &str,
        node: NodeHandle,
        anchor: Anchor,
        now: Instant,
    ) -> Option<NodeHandle> {
        let mut entries = self.entries.lock();
        match entries.get_mut(identifier) {
            Some(entry) => {
                entry.last_refresh = now;
                entry.anchor = anchor;
                if entry.node.id == node.id {
                    None
                } else {
                    Some(std::mem::replace(&mut entry.node, node))
                }
            }
            None => {
                entries.insert(
                    identifier.to_string(),
                    TrackedMarkerState {
                        identifier: identifier.to_string(),
                        last_refresh: now,
                        node,
                        anchor,
                    },
                );
                None
            }
        }
    }

    /// Refresh an existing entry still holding node `node_id`.
    ///
    /// Returns false, leaving the registry untouched, when the identifier is
    /// not tracked or its entry moved on to another node: an evicted or
    /// replaced node must not come back through a late refresh.
    pub fn refresh(&self, identifier: &str, node_id: NodeId, anchor: Anchor, now: Instant) -> bool {
        let mut entries = self.entries.lock();
        match entries.get_mut(identifier) {
            Some(entry) if entry.node.id == node_id => {
                entry.last_refresh = now;
                entry.anchor = anchor;
                true
            }
            _ => false,
        }
    }

    /// Remove every entry not refreshed within `threshold` of `now`.
    ///
    /// `on_evict` runs once per evicted entry before the lock is released, so
    /// no refresh can observe (or resurrect) an entry mid-eviction.
    pub fn evict_stale<F>(
        &self,
        now: Instant,
        threshold: Duration,
        mut on_evict: F,
    ) -> Vec<TrackedMarkerState>
    where
        F: FnMut(&TrackedMarkerState),
    {
        let mut entries = self.entries.lock();

        let stale: Vec<String> = entries
            .values()
            .filter(|e| e.is_stale(now, threshold))
            .map(|e| e.identifier.clone())
            .collect();

        let mut evicted = Vec::with_capacity(stale.len());
        for identifier in stale {
            if let Some(entry) = entries.remove(&identifier) {
                on_evict(&entry);
                evicted.push(entry);
            }
        }
        evicted
    }

    /// Remove an entry, handing it back to the caller.
    pub fn remove(&self, identifier: &str) -> Option<TrackedMarkerState> {
        self.entries.lock().remove(identifier)
    }

    /// Drop every entry, returning them.
    pub fn clear(&self) -> Vec<TrackedMarkerState> {
        self.entries.lock().drain().map(|(_, e)| e).collect()
    }

    pub fn get(&self, identifier: &str) -> Option<TrackedMarkerState> {
        self.entries.lock().get(identifier).cloned()
    }

    pub fn state_of(&self, identifier: &str) -> MarkerState {
        if self.entries.lock().contains_key(identifier) {
            MarkerState::Tracked
        } else {
            MarkerState::Absent
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Tracked identifiers, sorted.
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}
