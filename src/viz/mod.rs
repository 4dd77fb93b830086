//! Visualization.

pub mod rerun;

pub use self::rerun::RerunScene;
