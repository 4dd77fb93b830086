//! Session orchestration.
//!
//! This module contains the top-level `MarkerSession` that wires the dataset
//! loader, the label builder and the staleness tracker to a detection source
//! and a scene graph, along with the state it shares with its background
//! threads and the events it publishes.

pub mod messages;
pub mod shared_state;
mod session;

pub use messages::SessionEvent;
pub use shared_state::SharedState;
pub use session::MarkerSession;
