//! Remote marker dataset: descriptor list → reference images.
//!
//! The dataset is a JSON array of card descriptors hosted next to the card
//! photos. Loading it is a two step fetch:
//! 1. Download and parse the descriptor list (bad rows are skipped)
//! 2. Download and decode every card photo concurrently, then join
//!
//! A card whose photo cannot be fetched or decoded is dropped; the rest of
//! the set proceeds.

pub mod descriptor;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod reference_image;

pub use descriptor::{MarkerDescriptor, parse_descriptors};
pub use error::DatasetError;
pub use fetch::{Fetch, HttpFetcher};
pub use loader::DatasetLoader;
pub use reference_image::{ImageOrientation, ReferenceImage};
