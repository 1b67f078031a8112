use compact_str::{format_compact, CompactString};

use super::arena::{NodeId, Tree};
use super::TopologyError;
use crate::model::{ModelId, ModelStore};

/// Prefix of synthetic node keys, kept apart from any model id.
pub const SYNTHETIC_PREFIX: &str = "__synthetic__";
/// Bucket for models with no category at all.
pub const UNDEFINED_CATEGORY: &str = "__undefined__";
const PATH_SEPARATOR: char = '\u{1f}';

/// Builds a tree out of a hierarchical categorical attribute: each model
/// hangs below the synthetic node of its last category, each category
/// below the one preceding it.
#[derive(Debug, Clone)]
pub struct CategoryTreeifier {
    key: CompactString,
}

impl CategoryTreeifier {
    pub fn new(key: &str) -> Self {
        Self {
            key: CompactString::new(key),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Synthetic key for a category path. Models sharing a prefix share the
    /// synthetic nodes along it.
    fn synthetic_key(&self, path: &str) -> CompactString {
        format_compact!("{SYNTHETIC_PREFIX}{}{PATH_SEPARATOR}{path}", self.key)
    }

    pub fn build_tree(&self, visible: &[ModelId], models: &ModelStore) -> Result<Tree, TopologyError> {
        let mut tree = Tree::new();
        for id in visible {
            let Some(model) = models.get(id) else {
                continue;
            };
            if !model.is_available_for_layout() {
                continue;
            }

            let categories: Vec<CompactString> = model
                .get(&self.key)
                .map(|v| v.as_sequence().into_iter().filter_map(|c| c.as_key()).collect())
                .unwrap_or_default();

            let mut parent: NodeId = tree.root;
            if categories.is_empty() {
                let node = tree.synthetic_node(&self.synthetic_key(UNDEFINED_CATEGORY), "Nothing")?;
                tree.attach(parent, node)?;
                parent = node;
            } else {
                let mut path = String::new();
                for category in &categories {
                    if !path.is_empty() {
                        path.push(PATH_SEPARATOR);
                    }
                    path.push_str(category);
                    let node = tree.synthetic_node(&self.synthetic_key(&path), category)?;
                    tree.attach(parent, node)?;
                    parent = node;
                }
            }

            let leaf = tree.model_node(&model.id)?;
            tree.attach(parent, leaf)?;
        }

        tracing::debug!(
            "Treeified {} models by category '{}' into {} nodes",
            visible.len(),
            self.key,
            tree.len()
        );
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::Value;
    use crate::test_support::{card, store};

    fn genre(id: &str, value: Value) -> crate::model::SuperModel {
        let mut m = card(id, 40.0, 20.0);
        m.set("genre", value);
        m
    }

    #[test]
    fn shared_prefixes_share_nodes() {
        let models = store(vec![
            genre("a", Value::list(["Rock", "Punk"])),
            genre("b", Value::list(["Rock", "Punk"])),
            genre("c", Value::list(["Rock"])),
            genre("d", Value::text("Jazz")),
        ]);
        let t = CategoryTreeifier::new("genre");
        let tree = t.build_tree(&models.available_ids(), &models).unwrap();

        let roots: Vec<&str> = tree.roots().map(|n| tree.get(n).label()).collect();
        assert_eq!(roots, vec!["Rock", "Jazz"]);
        let rock = tree.find(&t.synthetic_key("Rock")).unwrap();
        assert_eq!(tree.get(rock).child_count, 2);
        let mut below_rock = tree.model_descendants(&t.synthetic_key("Rock"));
        below_rock.sort();
        assert_eq!(below_rock, vec!["a", "b", "c"]);
        assert_eq!(tree.model_descendants(&t.synthetic_key("Jazz")), vec!["d"]);
    }

    #[test]
    fn missing_categories_go_to_undefined() {
        let models = store(vec![genre("a", Value::Null), genre("b", Value::List(vec![]))]);
        let t = CategoryTreeifier::new("genre");
        let tree = t.build_tree(&models.available_ids(), &models).unwrap();
        assert_eq!(tree.roots().count(), 1);
        assert_eq!(
            tree.model_descendants(&t.synthetic_key(UNDEFINED_CATEGORY)),
            vec!["a", "b"]
        );
    }

    #[test]
    fn filtered_models_are_left_out() {
        let mut models = store(vec![genre("a", Value::text("X")), genre("b", Value::text("Y"))]);
        models.get_mut("b").unwrap().filter("search");
        let visible: Vec<ModelId> = vec!["a".into(), "b".into()];
        let tree = CategoryTreeifier::new("genre").build_tree(&visible, &models).unwrap();
        assert!(tree.find("b").is_none());
        assert_eq!(tree.roots().count(), 1);
    }
}
