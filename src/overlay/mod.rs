//! Label overlays displayed on top of recognized cards.

pub mod label;
pub mod node;
pub mod scene;

pub use label::LabelOverlayBuilder;
pub use node::{LabelTexture, Material, OverlayNode, PlaneGeometry, TextLine};
pub use scene::SceneGraph;
