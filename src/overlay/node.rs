//! Overlay node description handed to the scene graph.
//!
//! These are plain data: the renderer that owns the scene decides how to
//! draw a plane with a label texture.

use nalgebra::{Point2, UnitQuaternion};

use crate::config::SceneSize;
use crate::tracking::types::NodeId;

/// A flat textured plane displayed at an anchor's pose.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayNode {
    pub id: NodeId,
    /// Identifier of the anchor this node belongs to. Unnamed nodes are never
    /// tracked by the staleness registry.
    pub name: Option<String>,
    pub plane: PlaneGeometry,
    /// Rotation relative to the anchor.
    pub orientation: UnitQuaternion<f64>,
    pub material: Material,
}

/// Plane extent in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneGeometry {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub diffuse: LabelTexture,
    pub double_sided: bool,
}

/// 2D canvas rendered into the plane's diffuse channel.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTexture {
    pub size: SceneSize,
    /// RGBA background; fully transparent for labels.
    pub background: [f32; 4],
    pub lines: Vec<TextLine>,
}

/// One line of label text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    /// Baseline origin on the canvas; text runs left-aligned from here.
    pub position: Point2<f64>,
    pub font_name: String,
    pub font_size: f64,
    pub color: [f32; 4],
    /// -1 flips the glyphs so they read correctly once the canvas is mapped
    /// onto the plane.
    pub y_scale: f64,
    pub max_lines: u32,
}

impl OverlayNode {
    /// Full label text, lines joined with `\n`.
    pub fn label_text(&self) -> String {
        self.material
            .diffuse
            .lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
