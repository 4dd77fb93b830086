//! Rerun-backed scene graph for the replay demo.
//!
//! Entity hierarchy:
//!     status                  - Session status (configuration, tracked markers)
//!     world/
//!         markers/<anchor>    - Anchor transform
//!         markers/<anchor>/label - Label plane with its text

use std::time::Duration;

use anyhow::{Context, Result};
use rerun::{RecordingStream, external::glam};

use crate::overlay::{OverlayNode, SceneGraph};
use crate::tracking::Anchor;

pub struct RerunScene {
    rec: RecordingStream,
}

impl RerunScene {
    /// Spawn a viewer process and connect to it.
    pub fn new(app_name: &str) -> Result<Self> {
        let rec = rerun::RecordingStreamBuilder::new(app_name)
            .spawn()
            .context("Failed to spawn rerun viewer")?;

        // Anchors use a Y-up, right-handed frame with the camera looking down -Z.
        rec.log_static("world", &rerun::ViewCoordinates::RUB()).ok();

        Ok(Self { rec })
    }

    /// Set the replay clock for all subsequent logs.
    pub fn set_time(&self, elapsed: Duration) {
        self.rec.set_duration_secs("time", elapsed.as_secs_f64());
    }

    /// Log the status line.
    pub fn log_status(&self, configuration: Option<&str>, tracked_markers: usize) {
        let text = format!(
            "**{}** | Tracked markers: {}",
            configuration.unwrap_or("NOT CONFIGURED"),
            tracked_markers
        );
        self.rec
            .log(
                "status",
                &rerun::TextDocument::new(text).with_media_type(rerun::MediaType::markdown()),
            )
            .ok();
    }

    fn log_anchor_transform(&self, path: &str, anchor: &Anchor) {
        let t = &anchor.transform.translation.vector;
        let q = &anchor.transform.rotation;
        let translation = glam::Vec3::new(t.x as f32, t.y as f32, t.z as f32);
        let rotation = glam::Quat::from_xyzw(
            q.coords.x as f32,
            q.coords.y as f32,
            q.coords.z as f32,
            q.w as f32,
        );

        self.rec
            .log(
                path,
                &rerun::Transform3D::from_translation_rotation(translation, rotation),
            )
            .ok();
    }
}

fn node_path(node: &OverlayNode) -> String {
    match &node.name {
        Some(name) => format!("world/markers/{}", name),
        None => format!("world/markers/{}", node.id),
    }
}

impl SceneGraph for RerunScene {
    fn attach(&self, node: &OverlayNode, anchor: &Anchor) {
        let path = node_path(node);
        self.log_anchor_transform(&path, anchor);

        // The plane is laid flat on the card, so it spans the anchor's XZ plane.
        let size = [node.plane.width as f32, 0.001, node.plane.height as f32];
        let [r, g, b, a] = node.material.diffuse.lines.first().map_or([1.0; 4], |l| l.color);
        let color = [
            (r * 255.0) as u8,
            (g * 255.0) as u8,
            (b * 255.0) as u8,
            (a * 255.0) as u8,
        ];

        self.rec
            .log(
                format!("{}/label", path).as_str(),
                &rerun::Boxes3D::from_centers_and_sizes([[0.0f32, 0.0, 0.0]], [size])
                    .with_colors([color])
                    .with_labels([node.label_text()]),
            )
            .ok();
    }

    fn update(&self, node: &OverlayNode, anchor: &Anchor) {
        self.log_anchor_transform(&node_path(node), anchor);
    }

    fn detach(&self, node: &OverlayNode) {
        self.rec
            .log(node_path(node).as_str(), &rerun::Clear::recursive())
            .ok();
    }
}
