//! Input files: recorded detection replays.

pub mod replay;

pub use replay::{DetectionEvent, ReplayDetectionSource, load_replay, parse_replay};
