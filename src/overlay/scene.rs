//! Scene graph seam.

use crate::tracking::anchor::Anchor;

use super::node::OverlayNode;

/// Owner of the rendered overlay nodes.
///
/// Calls arrive from the detection callbacks and from the sweep thread, and
/// `detach` runs while the marker registry is locked: implementations must not
/// block and must not call back into the registry.
pub trait SceneGraph: Send + Sync {
    /// A node was created for `anchor` and should be displayed at its pose.
    fn attach(&self, node: &OverlayNode, anchor: &Anchor);

    /// The anchor carrying `node` moved.
    fn update(&self, _node: &OverlayNode, _anchor: &Anchor) {}

    /// Remove `node` from the scene.
    fn detach(&self, node: &OverlayNode);
}
