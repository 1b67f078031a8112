use super::arena::{NodeId, Tree, TreeNode};

/// Compute aggregated weights for all nodes (bottom-up).
/// Leaves take `leaf_weight`; every other node the sum of its children.
/// The result is indexed by `NodeId::index()`.
pub fn aggregate(tree: &Tree, leaf_weight: impl Fn(&TreeNode) -> f64) -> Vec<f64> {
    let mut weights = vec![0.0; tree.len()];
    // Reversed pre-order visits children before their parents; the root,
    // absent from its own descendants, goes last.
    let order = tree.descendants(tree.root);
    for &id in order.iter().rev().chain([&tree.root]) {
        let node = tree.get(id);
        let weight = if id == tree.root && node.is_leaf() {
            0.0
        } else if node.is_leaf() {
            leaf_weight(node)
        } else {
            tree.children(id).map(|c| weights[c.index()]).sum()
        };
        weights[id.index()] = weight;
    }
    weights
}

/// Sort the children of `parent` by weight (descending), keeping the
/// relative order of equal weights. Re-links the sibling list without
/// moving nodes in the arena, and returns the new order.
pub fn sort_children_by_weight(tree: &mut Tree, parent: NodeId, weights: &[f64]) -> Vec<NodeId> {
    let mut children: Vec<NodeId> = tree.children(parent).collect();
    children.sort_by(|a, b| weights[b.index()].total_cmp(&weights[a.index()]));
    tree.relink_children(parent, &children);
    children
}
