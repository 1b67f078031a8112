pub mod aggregate;
pub mod arena;
pub mod category;
pub mod link;

use compact_str::CompactString;

use self::arena::Tree;
use self::category::CategoryTreeifier;
use self::link::LinkTreeifier;
use crate::meta::{hierarchy_matcher, link_matcher, MetaEntry};
use crate::model::{ModelId, ModelStore};

/// The model set cannot be arranged as a tree. Layouts catch this, log it
/// and leave the previous arrangement untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopologyError {
    #[error("tree is invalid: cycle detected at '{0}'")]
    Cycle(CompactString),
    #[error("tree is invalid: hidden cycle detected at '{0}'")]
    HiddenCycle(CompactString),
    #[error("models '{first}' and '{second}' share the link key value '{value}'")]
    AmbiguousLinkKey {
        value: CompactString,
        first: ModelId,
        second: ModelId,
    },
    #[error("tree is invalid: node id '{0}' is claimed by two different nodes")]
    Conflict(CompactString),
}

/// Strategy turning a flat set of models into a tree.
#[derive(Debug, Clone)]
pub enum Treeifier {
    Link(LinkTreeifier),
    Category(CategoryTreeifier),
}

/// Picks the treeifier able to build a tree out of attribute `key`.
/// `None` means the attribute carries no tree structure.
pub fn new_treeifier(key: &str, entry: &MetaEntry) -> Option<Treeifier> {
    if link_matcher(key, entry) {
        Some(Treeifier::Link(LinkTreeifier::new(key, entry.link_end_key())))
    } else if hierarchy_matcher(key, entry) {
        Some(Treeifier::Category(CategoryTreeifier::new(key)))
    } else {
        None
    }
}

impl Treeifier {
    /// `visible` are the models to lay out; `models` holds every known
    /// model, visible or not. The returned tree indexes every node it created.
    pub fn build_tree(&self, visible: &[ModelId], models: &ModelStore) -> Result<Tree, TopologyError> {
        match self {
            Treeifier::Link(t) => t.build_tree(visible, models),
            Treeifier::Category(t) => t.build_tree(visible, models),
        }
    }
}
