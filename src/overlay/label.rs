//! Label overlay builder.
//!
//! Turns a label text and a marker's physical size into an [`OverlayNode`]:
//! a plane covering the card exactly, laid flat on it, textured with
//! left-aligned text lines.

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;
use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::{Point2, UnitQuaternion, Vector2};

use crate::config::{AppConfig, LabelStyle, SceneSize};
use crate::tracking::anchor::Anchor;
use crate::tracking::types::NodeId;

use super::node::{LabelTexture, Material, OverlayNode, PlaneGeometry, TextLine};

/// Builds label nodes. Stateless apart from the node id counter.
pub struct LabelOverlayBuilder {
    style: LabelStyle,
    scene_size: SceneSize,
    /// Label text per reference image name.
    catalog: HashMap<String, String>,
    next_node_id: AtomicU64,
}

impl LabelOverlayBuilder {
    pub fn new(style: LabelStyle, scene_size: SceneSize, catalog: HashMap<String, String>) -> Self {
        Self {
            style,
            scene_size,
            catalog,
            next_node_id: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.label_style.clone(),
            config.scene_size,
            config.labels.clone(),
        )
    }

    /// Catalog text for a reference image, if any.
    pub fn label_for(&self, reference_name: &str) -> Option<&str> {
        self.catalog.get(reference_name).map(String::as_str)
    }

    /// Overlay for an anchor: only image anchors whose reference image has a
    /// catalog entry get one. The node is named after the anchor.
    pub fn node_for_anchor(&self, anchor: &Anchor) -> Option<OverlayNode> {
        let image = anchor.image.as_ref()?;
        let text = self.label_for(&image.reference_name)?;
        let mut node = self.build(text, image.physical_size);
        node.name = Some(anchor.id.to_string());
        Some(node)
    }

    /// Build an unnamed label node sized to `physical_size` (metres).
    pub fn build(&self, text: &str, physical_size: Vector2<f64>) -> OverlayNode {
        let lines = text
            .split('\n')
            .enumerate()
            .map(|(idx, line)| TextLine {
                text: line.to_string(),
                position: Point2::new(
                    self.style.margin,
                    (idx + 1) as f64 * self.style.font_size,
                ),
                font_name: self.style.font_name.clone(),
                font_size: self.style.font_size,
                color: self.style.color,
                y_scale: -1.0,
                max_lines: 1,
            })
            .collect();

        OverlayNode {
            id: NodeId::new(self.next_node_id.fetch_add(1, Ordering::Relaxed)),
            name: None,
            plane: PlaneGeometry {
                width: physical_size.x,
                height: physical_size.y,
            },
            // Lay the plane flat on the card.
            orientation: UnitQuaternion::from_euler_angles(-FRAC_PI_2, 0.0, 0.0),
            material: Material {
                diffuse: LabelTexture {
                    size: self.scene_size,
                    background: [0.0, 0.0, 0.0, 0.0],
                    lines,
                },
                double_sided: false,
            },
        }
    }
}
