use crate::alignment::{axis::Axis, node::AlignmentNode};

/// Builds a perfect binary tree whose depth equals `axes.len()`. Every node at depth `d`
/// carries `axes[d]`; nodes at depth `axes.len()` are sentinel leaves.
pub fn build_tree(axes: &[Axis]) -> AlignmentNode {
    build_at(axes, 0)
}

/// Places two already-built trees under a new root exploring `axis`.
pub fn compose(axis: Axis, left: AlignmentNode, right: AlignmentNode) -> AlignmentNode {
    AlignmentNode::branch(axis, left, right)
}

fn build_at(axes: &[Axis], depth: usize) -> AlignmentNode {
    let Some(axis) = axes.get(depth) else {
        return AlignmentNode::leaf();
    };

    AlignmentNode::branch(
        axis.clone(),
        build_at(axes, depth + 1),
        build_at(axes, depth + 1),
    )
}
