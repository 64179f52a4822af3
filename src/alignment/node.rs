use crate::alignment::axis::Axis;

/// A node of the alignment tree. Children are either absent or exactly two, where index 0
/// explores `axis.left` and index 1 explores `axis.right`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentNode {
    pub axis: Axis,
    pub payload: Option<String>,
    pub children: Option<Box<[AlignmentNode; 2]>>,
}

impl AlignmentNode {
    pub fn leaf() -> Self {
        Self {
            axis: Axis::sentinel(),
            payload: None,
            children: None,
        }
    }

    pub fn branch(axis: Axis, left: AlignmentNode, right: AlignmentNode) -> Self {
        Self {
            axis,
            payload: None,
            children: Some(Box::new([left, right])),
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Traversal stops here: the axis is not live or the node has no children.
    pub fn is_leaf(&self) -> bool {
        !self.axis.is_live() || self.children.is_none()
    }

    pub fn left(&self) -> Option<&AlignmentNode> {
        self.children.as_deref().map(|[left, _]| left)
    }

    pub fn right(&self) -> Option<&AlignmentNode> {
        self.children.as_deref().map(|[_, right]| right)
    }

    pub fn payload_str(&self) -> &str {
        self.payload.as_deref().unwrap_or_default()
    }

    /// Number of edges on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        match self.children.as_deref() {
            Some([left, right]) => 1 + left.depth().max(right.depth()),
            None => 0,
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self.children.as_deref() {
            Some([left, right]) => left.leaf_count() + right.leaf_count(),
            None => 1,
        }
    }

    pub fn internal_count(&self) -> usize {
        match self.children.as_deref() {
            Some([left, right]) => 1 + left.internal_count() + right.internal_count(),
            None => 0,
        }
    }
}
