use std::collections::HashMap;

use compact_str::CompactString;

use super::TopologyError;
use crate::model::ModelId;

/// Index into the arena `Vec<TreeNode>`. Uses u32 to save memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a node stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// The synthetic root whose children are the actual tree roots.
    Root,
    /// A node backed by a model.
    Model(ModelId),
    /// A category bucket with no backing model.
    Synthetic {
        key: CompactString,
        label: CompactString,
    },
}

/// Space a node and its descendants occupy, in growing/opposite direction
/// coordinates. Filled in by the tree painter during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingRect {
    pub gd: f64,
    pub od: f64,
}

/// A single node in the tree, stored in a flat arena.
/// Uses sibling-list representation: each node has `first_child` and `next_sibling`.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub kind: NodeKind,
    /// Parent node index (None for the root and for unattached nodes)
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    /// Kept so children iterate in attachment order
    pub last_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub child_count: u32,
    pub bounding: Option<BoundingRect>,
}

impl TreeNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            child_count: 0,
            bounding: None,
        }
    }

    /// Node id within its tree: the model id or the synthetic key.
    pub fn key(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Root => None,
            NodeKind::Model(id) => Some(id.as_str()),
            NodeKind::Synthetic { key, .. } => Some(key.as_str()),
        }
    }

    /// Display text: the model id or the category label.
    pub fn label(&self) -> &str {
        match &self.kind {
            NodeKind::Root => "",
            NodeKind::Model(id) => id,
            NodeKind::Synthetic { label, .. } => label,
        }
    }

    pub fn model_id(&self) -> Option<&ModelId> {
        match &self.kind {
            NodeKind::Model(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.kind, NodeKind::Synthetic { .. })
    }

    pub fn is_leaf(&self) -> bool {
        self.first_child.is_none()
    }
}

/// A tree stored as a flat arena of nodes, plus an id -> node index of
/// every node created during the pass.
#[derive(Debug, Clone)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
    pub root: NodeId,
    index: HashMap<CompactString, NodeId>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create an empty tree with a root node.
    pub fn new() -> Self {
        Tree {
            nodes: vec![TreeNode::new(NodeKind::Root)],
            root: NodeId(0),
            index: HashMap::new(),
        }
    }

    /// A one-level tree with every model a direct child of the root.
    pub fn flat(models: &[ModelId]) -> Result<Self, TopologyError> {
        let mut tree = Tree::new();
        for id in models {
            let node = tree.model_node(id)?;
            tree.attach(tree.root, node)?;
        }
        Ok(tree)
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TreeNode::new(kind));
        id
    }

    /// Node for model `id`, creating it on first request.
    pub fn model_node(&mut self, id: &ModelId) -> Result<NodeId, TopologyError> {
        if let Some(&existing) = self.index.get(id.as_str()) {
            return match &self.nodes[existing.index()].kind {
                NodeKind::Model(other) if other == id => Ok(existing),
                _ => Err(TopologyError::Conflict(id.clone())),
            };
        }
        let node = self.push(NodeKind::Model(id.clone()));
        self.index.insert(id.clone(), node);
        Ok(node)
    }

    /// Synthetic node for `key`, creating it on first request.
    pub fn synthetic_node(&mut self, key: &str, label: &str) -> Result<NodeId, TopologyError> {
        if let Some(&existing) = self.index.get(key) {
            return match &self.nodes[existing.index()].kind {
                NodeKind::Synthetic { .. } => Ok(existing),
                _ => Err(TopologyError::Conflict(CompactString::new(key))),
            };
        }
        let key = CompactString::new(key);
        let node = self.push(NodeKind::Synthetic {
            key: key.clone(),
            label: CompactString::new(label),
        });
        self.index.insert(key, node);
        Ok(node)
    }

    /// Append `child` under `parent`. Re-attaching to the same parent is a
    /// no-op; a node never gets two parents.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), TopologyError> {
        let key = || CompactString::new(self.nodes[child.index()].key().unwrap_or_default());
        if parent == child {
            return Err(TopologyError::Cycle(key()));
        }
        match self.nodes[child.index()].parent {
            Some(p) if p == parent => return Ok(()),
            Some(_) => return Err(TopologyError::Conflict(key())),
            None => {}
        }

        let child_node = &mut self.nodes[child.index()];
        child_node.parent = Some(parent);
        child_node.next_sibling = None;

        match self.nodes[parent.index()].last_child {
            Some(last) => self.nodes[last.index()].next_sibling = Some(child),
            None => self.nodes[parent.index()].first_child = Some(child),
        }
        let parent_node = &mut self.nodes[parent.index()];
        parent_node.last_child = Some(child);
        parent_node.child_count += 1;
        Ok(())
    }

    /// Get a node by ID.
    pub fn get(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.index()]
    }

    /// Get a mutable node by ID.
    pub fn get_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.index()]
    }

    /// Look a node up by model id or synthetic key.
    pub fn find(&self, key: &str) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    /// Total number of nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds nothing but the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Iterate over children of a node.
    pub fn children(&self, parent: NodeId) -> ChildIter<'_> {
        ChildIter {
            tree: self,
            current: self.nodes[parent.index()].first_child,
        }
    }

    /// The actual tree roots.
    pub fn roots(&self) -> ChildIter<'_> {
        self.children(self.root)
    }

    /// Every node below `id`, in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).collect();
        stack.reverse();
        while let Some(node) = stack.pop() {
            out.push(node);
            let mark = stack.len();
            stack.extend(self.children(node));
            stack[mark..].reverse();
        }
        out
    }

    /// Ids of all models below the node keyed `key`.
    pub fn model_descendants(&self, key: &str) -> Vec<ModelId> {
        let Some(node) = self.find(key) else {
            return Vec::new();
        };
        self.descendants(node)
            .into_iter()
            .filter_map(|n| self.get(n).model_id().cloned())
            .collect()
    }

    /// Re-link the children of `parent` in the given order.
    pub(crate) fn relink_children(&mut self, parent: NodeId, children: &[NodeId]) {
        let (Some(&first), Some(&last)) = (children.first(), children.last()) else {
            return;
        };
        self.nodes[parent.index()].first_child = Some(first);
        self.nodes[parent.index()].last_child = Some(last);
        for w in children.windows(2) {
            self.nodes[w[0].index()].next_sibling = Some(w[1]);
        }
        self.nodes[last.index()].next_sibling = None;
    }
}

/// Iterator over the children of a node.
pub struct ChildIter<'a> {
    tree: &'a Tree,
    current: Option<NodeId>,
}

impl<'a> Iterator for ChildIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = self.tree.nodes[id.index()].next_sibling;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(tree: &Tree, nodes: impl Iterator<Item = NodeId>) -> Vec<String> {
        nodes
            .map(|n| tree.get(n).key().unwrap_or("<root>").to_string())
            .collect()
    }

    #[test]
    fn children_keep_attachment_order() {
        let mut tree = Tree::new();
        let a = tree.model_node(&"a".into()).unwrap();
        let b = tree.model_node(&"b".into()).unwrap();
        let c = tree.model_node(&"c".into()).unwrap();
        tree.attach(tree.root, a).unwrap();
        tree.attach(a, c).unwrap();
        tree.attach(a, b).unwrap();
        tree.attach(a, b).unwrap();
        assert_eq!(ids(&tree, tree.children(a)), vec!["c", "b"]);
        assert_eq!(tree.get(a).child_count, 2);
        assert_eq!(ids(&tree, tree.descendants(tree.root).into_iter()), vec!["a", "c", "b"]);
    }

    #[test]
    fn second_parent_is_a_conflict() {
        let mut tree = Tree::new();
        let a = tree.model_node(&"a".into()).unwrap();
        let b = tree.model_node(&"b".into()).unwrap();
        let c = tree.model_node(&"c".into()).unwrap();
        tree.attach(a, c).unwrap();
        assert_eq!(tree.attach(b, c), Err(TopologyError::Conflict("c".into())));
        assert_eq!(tree.attach(a, a), Err(TopologyError::Cycle("a".into())));
    }

    #[test]
    fn synthetic_key_cannot_shadow_a_model() {
        let mut tree = Tree::new();
        tree.model_node(&"x".into()).unwrap();
        assert!(tree.synthetic_node("x", "X").is_err());
        let s = tree.synthetic_node("s", "S").unwrap();
        assert_eq!(tree.synthetic_node("s", "S").unwrap(), s);
        assert!(tree.model_node(&"s".into()).is_err());
    }

    #[test]
    fn model_descendants_skip_synthetic_nodes() {
        let mut tree = Tree::new();
        let s = tree.synthetic_node("s", "S").unwrap();
        let a = tree.model_node(&"a".into()).unwrap();
        let b = tree.model_node(&"b".into()).unwrap();
        tree.attach(tree.root, s).unwrap();
        tree.attach(s, a).unwrap();
        tree.attach(a, b).unwrap();
        assert_eq!(tree.model_descendants("s"), vec!["a", "b"]);
        assert_eq!(tree.model_descendants("a"), vec!["b"]);
        assert!(tree.model_descendants("nope").is_empty());
    }
}
