use std::collections::{HashMap, HashSet};

use compact_str::CompactString;

use super::arena::Tree;
use super::TopologyError;
use crate::meta::ID_KEY;
use crate::model::{ModelId, ModelStore};

/// Builds a tree out of child -> parent pointers stored in `link_start_key`.
/// Pointers resolve against `link_end_key` (the model id by default).
#[derive(Debug, Clone)]
pub struct LinkTreeifier {
    link_start_key: CompactString,
    link_end_key: CompactString,
}

/// Per-build lookup state.
struct Resolver<'a> {
    treeifier: &'a LinkTreeifier,
    models: &'a ModelStore,
    /// link-end value -> model id, when links do not resolve on ids
    link_map: Option<HashMap<CompactString, ModelId>>,
    available: HashSet<&'a str>,
}

impl LinkTreeifier {
    pub fn new(link_start_key: &str, link_end_key: &str) -> Self {
        Self {
            link_start_key: CompactString::new(link_start_key),
            link_end_key: CompactString::new(link_end_key),
        }
    }

    pub fn link_start_key(&self) -> &str {
        &self.link_start_key
    }

    pub fn link_end_key(&self) -> &str {
        &self.link_end_key
    }

    fn link_map(&self, models: &ModelStore) -> Result<Option<HashMap<CompactString, ModelId>>, TopologyError> {
        if self.link_end_key == ID_KEY {
            return Ok(None);
        }
        let mut map: HashMap<CompactString, ModelId> = HashMap::with_capacity(models.len());
        for model in models.iter() {
            let Some(value) = model.get(&self.link_end_key).and_then(|v| v.as_key()) else {
                continue;
            };
            if let Some(previous) = map.get(&value) {
                if *previous != model.id {
                    return Err(TopologyError::AmbiguousLinkKey {
                        value,
                        first: previous.clone(),
                        second: model.id.clone(),
                    });
                }
                continue;
            }
            map.insert(value, model.id.clone());
        }
        Ok(Some(map))
    }

    pub fn build_tree(&self, visible: &[ModelId], models: &ModelStore) -> Result<Tree, TopologyError> {
        let mut tree = Tree::new();
        for model in models.iter() {
            tree.model_node(&model.id)?;
        }

        let resolver = Resolver {
            treeifier: self,
            models,
            link_map: self.link_map(models)?,
            available: visible
                .iter()
                .filter(|id| models.get(id).is_some_and(|m| m.is_available_for_layout()))
                .map(ModelId::as_str)
                .collect(),
        };

        let mut visited: HashSet<ModelId> = HashSet::new();
        for id in visible {
            if !resolver.available.contains(id.as_str()) || visited.contains(id) {
                continue;
            }

            // Walk this branch upward, attaching each node to its first
            // available ancestor, until a root or an already built branch.
            let mut branch: HashSet<ModelId> = HashSet::new();
            let mut current = id.clone();
            loop {
                if !branch.insert(current.clone()) {
                    return Err(TopologyError::Cycle(current));
                }
                visited.insert(current.clone());
                let node = tree.model_node(&current)?;

                let parent = match resolver.parent_of(&current) {
                    Some(p) => resolver.first_available(p)?,
                    None => None,
                };
                let Some(parent) = parent else {
                    tree.attach(tree.root, node)?;
                    break;
                };
                let parent_node = tree.model_node(&parent)?;
                tree.attach(parent_node, node)?;
                if visited.contains(&parent) && !branch.contains(&parent) {
                    break;
                }
                current = parent;
            }
        }

        tracing::debug!(
            "Treeified {} models by '{}': {} roots",
            visible.len(),
            self.link_start_key,
            tree.roots().count()
        );
        Ok(tree)
    }
}

impl Resolver<'_> {
    /// Immediate parent of `id`; `None` when the pointer does not resolve
    /// or points back at the model itself.
    fn parent_of(&self, id: &str) -> Option<ModelId> {
        let model = self.models.get(id)?;
        let pointer = model.get(&self.treeifier.link_start_key)?.as_key()?;
        let parent = match &self.link_map {
            Some(map) => map.get(&pointer)?.clone(),
            None if self.models.contains(&pointer) => pointer,
            None => return None,
        };
        (parent != id).then_some(parent)
    }

    /// First ancestor, starting at `start` itself, that is available for layout.
    fn first_available(&self, start: ModelId) -> Result<Option<ModelId>, TopologyError> {
        let mut seen: HashSet<ModelId> = HashSet::new();
        let mut current = start;
        loop {
            if self.available.contains(current.as_str()) {
                return Ok(Some(current));
            }
            if !seen.insert(current.clone()) {
                return Err(TopologyError::HiddenCycle(current));
            }
            match self.parent_of(&current) {
                Some(next) => current = next,
                // a hidden root
                None => return Ok(None),
            }
        }
    }
}
