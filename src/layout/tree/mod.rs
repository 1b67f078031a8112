pub mod painter;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use self::painter::{PaintRect, PaintSink, TreePainter};
use super::state::{LayoutState, Stateful};
use super::{LayoutBox, LayoutConfig, LayoutContext, LayoutEngine, LayoutOutcome};
use crate::meta::matchers::key_matches;
use crate::meta::{first_metamodel_key, link_or_hierarchy_matcher, MetaModel};
use crate::model::{Dimensions, ModelId, ModelStore};
use crate::pipeline::{Artifact, Pipeline};
use crate::tree::arena::{NodeId, NodeKind, Tree};
use crate::tree::new_treeifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TreeDirection {
    #[serde(rename = "hor")]
    Horizontal,
    #[default]
    #[serde(rename = "ver")]
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeState {
    #[serde(default)]
    pub direction: TreeDirection,
    pub parent_key: CompactString,
}

impl LayoutState for TreeState {
    fn default_state(meta: &MetaModel) -> Self {
        Self {
            direction: TreeDirection::Vertical,
            parent_key: first_metamodel_key(meta, Some(&link_or_hierarchy_matcher))
                .map(CompactString::new)
                .unwrap_or_default(),
        }
    }

    fn validate(&self, meta: &MetaModel) -> bool {
        key_matches(meta, &self.parent_key, link_or_hierarchy_matcher)
    }
}

/// Translates painter output into pipeline instructions and artifacts.
struct PipelineSink<'a> {
    pipeline: &'a mut dyn Pipeline,
    tree: &'a Tree,
    dims: &'a [Dimensions],
    /// Physical offset of the layout box
    origin: (f64, f64),
    click_selection: bool,
}

impl PaintSink for PipelineSink<'_> {
    fn node(&mut self, node: NodeId, top: f64, left: f64) {
        let (top, left) = (self.origin.0 + top, self.origin.1 + left);
        match &self.tree.get(node).kind {
            NodeKind::Model(id) => self.pipeline.move_to(id, top, left, None, None),
            NodeKind::Synthetic { key, label } => {
                let dims = self.dims[node.index()];
                let selection = if self.click_selection {
                    self.tree.model_descendants(key)
                } else {
                    Vec::new()
                };
                self.pipeline.artifact(Artifact::SyntheticNode {
                    key: key.clone(),
                    label: label.clone(),
                    top,
                    left,
                    width: dims.width,
                    height: dims.height,
                    z_index: None,
                    selection,
                });
            }
            NodeKind::Root => {}
        }
    }

    fn connector(&mut self, rect: PaintRect) {
        self.pipeline.artifact(Artifact::Connector {
            top: self.origin.0 + rect.top,
            left: self.origin.1 + rect.left,
            width: rect.width,
            height: rect.height,
        });
    }
}

/// Draws models as a node-link tree built from a link or hierarchy attribute.
#[derive(Debug, Clone)]
pub struct TreeLayout {
    state: Stateful<TreeState>,
    config: LayoutConfig,
    /// Tree of the last successful pass, for selection expansion
    last_tree: Option<Tree>,
}

impl TreeLayout {
    pub fn new(meta: &MetaModel, config: LayoutConfig) -> Self {
        Self {
            state: Stateful::new(meta),
            config,
            last_tree: None,
        }
    }

    pub fn tree_state(&self) -> &TreeState {
        self.state.get()
    }

    /// Rendering size of every node; synthetic nodes get placeholders.
    fn node_dimensions(tree: &Tree, models: &ModelStore, pipeline: &mut dyn Pipeline) -> Vec<Dimensions> {
        let mut dims = vec![Dimensions::default(); tree.len()];
        for node in tree.descendants(tree.root) {
            dims[node.index()] = match &tree.get(node).kind {
                NodeKind::Model(id) => models.get(id).map(|m| m.dimensions()).unwrap_or_default(),
                NodeKind::Synthetic { key, label } => pipeline.synthetic_rendering(key, label),
                NodeKind::Root => Dimensions::default(),
            };
        }
        dims
    }

    /// Packs the roots left to right, wrapping like a flow.
    fn paint(&self, tree: &mut Tree, dims: &[Dimensions], ctx: &mut LayoutContext<'_>) {
        let vertical = self.state.get().direction == TreeDirection::Vertical;
        let painter = TreePainter::new(vertical, self.config);
        let roots: Vec<NodeId> = tree.roots().collect();
        let bbox: LayoutBox = ctx.bbox;

        let extents: Vec<Dimensions> = roots
            .iter()
            .map(|&root| painter.to_absolute(painter.bounding_rect(tree, root, dims)))
            .collect();

        let tree: &Tree = tree;
        let mut sink = PipelineSink {
            pipeline: &mut *ctx.pipeline,
            tree,
            dims,
            origin: (bbox.top, bbox.left),
            click_selection: ctx.options.click_selection,
        };
        let (mut top, mut left, mut row_height) = (0.0_f64, 0.0_f64, 0.0_f64);
        for (&root, extent) in roots.iter().zip(extents) {
            // 'return carriage' if needed
            if left > 0.0 && left + extent.width > bbox.width {
                left = 0.0;
                top += row_height + self.config.tree_gutter;
                row_height = 0.0;
            }
            painter.draw(&mut sink, tree, root, painter.to_relative(top, left), dims);
            left += extent.width;
            row_height = row_height.max(extent.height);
        }
    }
}

impl LayoutEngine for TreeLayout {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn verify_metamodel(&self, meta: &MetaModel) -> bool {
        first_metamodel_key(meta, Some(&link_or_hierarchy_matcher)).is_some()
    }

    fn layout(&mut self, ctx: &mut LayoutContext<'_>) -> LayoutOutcome {
        let parent_key = self.state.get().parent_key.clone();
        let Some(treeifier) = ctx.meta.get(&parent_key).and_then(|e| new_treeifier(&parent_key, e)) else {
            tracing::error!("parentKey attribute {parent_key} does not support trees");
            return LayoutOutcome::CLEAN;
        };
        tracing::info!("Creating tree by {parent_key}");

        let mut tree = match treeifier.build_tree(ctx.visible, ctx.models) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::error!("{e}");
                return LayoutOutcome::CLEAN;
            }
        };

        let dims = Self::node_dimensions(&tree, ctx.models, ctx.pipeline);
        self.paint(&mut tree, &dims, ctx);
        tracing::debug!("Tree drew {} roots", tree.roots().count());
        self.last_tree = Some(tree);
        LayoutOutcome::CLEAN
    }

    fn state(&self) -> Option<serde_json::Value> {
        Some(self.state.to_json())
    }

    fn set_state(&mut self, state: Option<&serde_json::Value>, meta: &MetaModel) -> bool {
        self.state.set(state, meta)
    }

    fn dependent_models(&self, id: &str) -> Vec<ModelId> {
        self.last_tree
            .as_ref()
            .map(|tree| tree.model_descendants(id))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutOptions;
    use crate::pipeline::RenderingPipeline;
    use crate::test_support::{linked, sample_meta, store};

    fn run(layout: &mut TreeLayout, models: &mut ModelStore, width: f64) -> RenderingPipeline {
        let meta = sample_meta();
        let mut pipeline = RenderingPipeline::new();
        let visible = models.available_ids();
        let mut ctx = LayoutContext {
            pipeline: &mut pipeline,
            bbox: LayoutBox::full(width, 800.0),
            visible: &visible,
            models,
            meta: &meta,
            options: LayoutOptions::default(),
        };
        layout.layout(&mut ctx);
        pipeline
    }

    fn connectors(p: &RenderingPipeline) -> usize {
        p.artifacts()
            .iter()
            .filter(|a| matches!(a, Artifact::Connector { .. }))
            .count()
    }

    #[test]
    fn defaults_to_first_tree_key() {
        let meta = sample_meta();
        let tree = TreeLayout::new(&meta, LayoutConfig::default());
        assert_eq!(tree.tree_state().parent_key, "genre");
        assert_eq!(tree.tree_state().direction, TreeDirection::Vertical);
        assert!(tree.verify_metamodel(&meta));
    }

    #[test]
    fn chains_nest_deeper_with_two_connectors_each() {
        let meta = sample_meta();
        let mut models = store(vec![linked("a", Some("b")), linked("b", Some("c")), linked("c", None)]);
        let mut tree = TreeLayout::new(&meta, LayoutConfig::default());
        assert!(tree.set_state(Some(&serde_json::json!({"parentKey": "parent"})), &meta));

        let p = run(&mut tree, &mut models, 1000.0);
        let (_, a) = p.position_of("a").unwrap();
        let (_, b) = p.position_of("b").unwrap();
        let (_, c) = p.position_of("c").unwrap();
        assert!(a > b && b > c);
        assert_eq!(connectors(&p), 4);

        let mut below_c = tree.dependent_models("c");
        below_c.sort();
        assert_eq!(below_c, vec!["a", "b"]);
    }

    #[test]
    fn horizontal_trees_grow_downwards_centered_over_children() {
        let meta = sample_meta();
        let mut models = store(vec![linked("a", Some("b")), linked("b", Some("c")), linked("c", None)]);
        let mut tree = TreeLayout::new(&meta, LayoutConfig::default());
        assert!(tree.set_state(Some(&serde_json::json!({"parentKey": "parent", "direction": "hor"})), &meta));
        assert_eq!(tree.tree_state().direction, TreeDirection::Horizontal);

        // each level nests 30 + 20 lower; parents center over wider subtrees
        let p = run(&mut tree, &mut models, 1000.0);
        assert_eq!(p.position_of("c"), Some((5.0, 12.5)));
        assert_eq!(p.position_of("b"), Some((55.0, 7.5)));
        assert_eq!(p.position_of("a"), Some((105.0, 2.5)));
        assert_eq!(connectors(&p), 4);
        assert_eq!(tree.state().unwrap()["direction"], "hor");
    }

    #[test]
    fn cycles_abort_the_pass() {
        let meta = sample_meta();
        let mut models = store(vec![linked("a", Some("b")), linked("b", Some("a"))]);
        let mut tree = TreeLayout::new(&meta, LayoutConfig::default());
        assert!(tree.set_state(Some(&serde_json::json!({"parentKey": "parent"})), &meta));
        let p = run(&mut tree, &mut models, 1000.0);
        assert!(p.instructions().is_empty());
        assert!(p.artifacts().is_empty());
    }

    #[test]
    fn roots_wrap_when_the_box_is_full() {
        let meta = sample_meta();
        let mut models = store(vec![linked("a", None), linked("b", None), linked("c", None)]);
        let mut tree = TreeLayout::new(&meta, LayoutConfig::default());
        assert!(tree.set_state(Some(&serde_json::json!({"parentKey": "parent", "direction": "ver"})), &meta));
        // each root is 50 + 25 wide, two fit in 160
        let p = run(&mut tree, &mut models, 160.0);
        assert_eq!(p.position_of("a"), Some((5.0, 0.0)));
        assert_eq!(p.position_of("b"), Some((5.0, 75.0)));
        assert_eq!(p.position_of("c"), Some((45.0, 0.0)));
    }

    #[test]
    fn rejects_keys_without_tree_structure() {
        let meta = sample_meta();
        let mut tree = TreeLayout::new(&meta, LayoutConfig::default());
        assert!(!tree.set_state(Some(&serde_json::json!({"parentKey": "size"})), &meta));
        assert!(!tree.set_state(Some(&serde_json::json!({"parentKey": "parent", "direction": "diagonal"})), &meta));
        assert_eq!(tree.tree_state().parent_key, "genre");
    }
}
