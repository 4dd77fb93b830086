//! Core ID types shared by the registry, the scene graph and the detection source.

/// Unique identifier of an overlay node.
///
/// NodeIds are assigned sequentially by the overlay builder. Two nodes built
/// for the same marker at different times never share an id, which is how a
/// re-tracked marker's fresh node is told apart from the evicted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// Identifier of a tracked anchor, as assigned by the detection source.
///
/// Overlay nodes are named after the anchor they belong to, and the registry
/// is keyed by that name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorId(pub String);

impl AnchorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AnchorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
