// Tree-structure invariant checking.
//
// Both growth paths produce an append-ordered collection in which every
// node names its parent by index. `validate()` checks that such a
// collection is a single rooted tree: node 0 is the only root, every parent
// index points at an earlier node, and depth strictly increases along every
// edge. Since parents always precede children, there can be no cycles.
//
// The pipeline runs `validate()` on every grown tree before leaf placement;
// a failure is an internal invariant violation, never a result of input.

use crate::error::TreeError;
use crate::types::Segment;

/// A node in an append-ordered tree.
pub trait TreeNode {
    fn parent(&self) -> Option<usize>;
    fn depth(&self) -> u32;
}

impl TreeNode for Segment {
    fn parent(&self) -> Option<usize> {
        self.parent
    }

    fn depth(&self) -> u32 {
        self.depth
    }
}

/// Check that `nodes` forms one connected, acyclic tree rooted at index 0.
/// An empty collection is a valid (empty) tree.
pub fn validate<N: TreeNode>(nodes: &[N]) -> Result<(), TreeError> {
    for (index, node) in nodes.iter().enumerate() {
        match node.parent() {
            None if index == 0 => {}
            None => return Err(TreeError::MultipleRoots { index }),
            Some(parent) if parent >= index => {
                return Err(TreeError::OrphanBranch { index, parent });
            }
            Some(parent) => {
                if nodes[parent].depth() >= node.depth() {
                    return Err(TreeError::DepthNotIncreasing { index, parent });
                }
            }
        }
    }
    // Node 0 having a parent is caught above as `parent >= index`.
    Ok(())
}

/// For each node, whether any other node names it as parent.
pub fn has_children<N: TreeNode>(nodes: &[N]) -> Vec<bool> {
    let mut flags = vec![false; nodes.len()];
    for node in nodes {
        if let Some(flag) = node.parent().and_then(|p| flags.get_mut(p)) {
            *flag = true;
        }
    }
    flags
}
