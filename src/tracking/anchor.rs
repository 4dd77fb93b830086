//! Anchors reported by the detection source.

use nalgebra::{Isometry3, Vector2};

use super::types::AnchorId;

/// A tracked real-world pose.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub id: AnchorId,
    /// Anchor pose in world frame.
    pub transform: Isometry3<f64>,
    /// Set when the anchor was created by recognizing a reference image.
    pub image: Option<ImageAnchorInfo>,
}

/// Reference image an image anchor was recognized from.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAnchorInfo {
    pub reference_name: String,
    /// Physical (width, height) in metres.
    pub physical_size: Vector2<f64>,
}

impl Anchor {
    /// Anchor that is not tied to a reference image.
    pub fn new(id: AnchorId, transform: Isometry3<f64>) -> Self {
        Self {
            id,
            transform,
            image: None,
        }
    }

    /// Anchor created from a recognized reference image.
    pub fn for_image(
        id: AnchorId,
        transform: Isometry3<f64>,
        reference_name: impl Into<String>,
        physical_size: Vector2<f64>,
    ) -> Self {
        Self {
            id,
            transform,
            image: Some(ImageAnchorInfo {
                reference_name: reference_name.into(),
                physical_size,
            }),
        }
    }
}
