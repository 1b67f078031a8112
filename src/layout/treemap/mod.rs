//! Squarified treemap layout.
//!
//! Models become rectangles whose area follows a numeric attribute. With a
//! parent key, groups nest their children inside their own rectangle; a
//! group's area is the sum of its children's.

pub mod color;
pub mod node;
pub mod slice;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use self::color::{ColorRange, GROUP_COLOR};
use self::node::{Anchor, TreeMapNode};
use self::slice::{squarify, Placement, Slice};
use super::state::{optional_key, LayoutState, Stateful};
use super::{LayoutConfig, LayoutContext, LayoutEngine, LayoutOutcome};
use crate::meta::matchers::key_matches;
use crate::meta::{first_metamodel_key, link_or_hierarchy_matcher, numeric_matcher, Kind, MetaModel};
use crate::model::{Dimensions, ModelId, ModelStore};
use crate::pipeline::{replay_restorations, Artifact, Pipeline, Style};
use crate::tree::aggregate::{aggregate, sort_children_by_weight};
use crate::tree::arena::{NodeId, NodeKind, Tree, TreeNode};
use crate::tree::new_treeifier;

/// Filter tag of models too small to show in the current treemap.
pub const TREEMAP_TAG: &str = "__treemap__";

/// Z-index of top level renderings; each nesting level stacks one above.
const BASE_Z_INDEX: u32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeMapState {
    pub area: CompactString,
    #[serde(default, deserialize_with = "optional_key")]
    pub color: Option<CompactString>,
    #[serde(default, deserialize_with = "optional_key")]
    pub parent_key: Option<CompactString>,
}

impl LayoutState for TreeMapState {
    fn default_state(meta: &MetaModel) -> Self {
        Self {
            area: first_metamodel_key(meta, Some(&numeric_matcher))
                .map(CompactString::new)
                .unwrap_or_default(),
            color: None,
            parent_key: None,
        }
    }

    fn validate(&self, meta: &MetaModel) -> bool {
        key_matches(meta, &self.area, numeric_matcher)
            && self
                .color
                .as_deref()
                .map_or(true, |key| key_matches(meta, key, numeric_matcher))
            && self
                .parent_key
                .as_deref()
                .map_or(true, |key| key_matches(meta, key, link_or_hierarchy_matcher))
    }
}

/// Numeric `key` of a leaf. Unparseable or negative values count as 0.
fn leaf_area(node: &TreeNode, models: &ModelStore, key: &str) -> f64 {
    node.model_id()
        .and_then(|id| models.get(id))
        .and_then(|m| m.get(key))
        .and_then(|v| v.as_f64())
        .filter(|area| *area >= 0.0)
        .unwrap_or(0.0)
}

/// Working set of one treemap pass.
struct TreeMapPass<'p> {
    pipeline: &'p mut dyn Pipeline,
    models: &'p mut ModelStore,
    tree: Tree,
    weights: Vec<f64>,
    /// Treemap node of every tree node laid out so far
    laid_out: Vec<Option<TreeMapNode>>,
    config: LayoutConfig,
    click_selection: bool,
    hidden: usize,
}

impl TreeMapPass<'_> {
    /// Lays out the children of `parent` within `bounds`, then recurses into
    /// each of them. Every level needs the sizes of the one above.
    fn layout_nested(&mut self, parent: NodeId, bounds: Dimensions, delta: Anchor, deepness: u32) {
        if self.tree.get(parent).is_leaf() {
            return;
        }
        let children = sort_children_by_weight(&mut self.tree, parent, &self.weights);
        let total: f64 = children.iter().map(|c| self.weights[c.index()]).sum();
        let area_ratio = if total > 0.0 {
            bounds.width * bounds.height / total
        } else {
            0.0
        };
        let nodes = children
            .iter()
            .map(|&c| TreeMapNode::new(c, self.weights[c.index()], area_ratio))
            .collect();

        for slice in squarify(nodes, bounds) {
            self.draw_slice(&slice, delta, deepness);
            for node in slice.nodes() {
                let Some(drawn) = self.laid_out[node.node.index()] else {
                    continue;
                };
                self.layout_nested(
                    node.node,
                    drawn.nested_bounds(&self.config),
                    drawn.nested_anchor(&self.config),
                    deepness + 1,
                );
            }
        }
    }

    fn draw_slice(&mut self, slice: &Slice, delta: Anchor, deepness: u32) {
        let z_index = Some(BASE_Z_INDEX + deepness);
        for (node, placement) in slice.nodes().iter().zip(slice.placements(delta)) {
            let mut node = *node;
            match placement {
                Placement::Hidden | Placement::TooSmall => self.hide(&mut node),
                Placement::Rect {
                    top,
                    left,
                    width,
                    height,
                } => {
                    if self.render(node.node, top, left, width, height, z_index) {
                        node.place(top, left, width, height);
                    } else {
                        self.hide(&mut node);
                    }
                }
            }
            self.laid_out[node.node.index()] = Some(node);
        }
    }

    /// Resizes and moves one node's rendering. False when the rendering
    /// refuses the size.
    fn render(&mut self, node: NodeId, top: f64, left: f64, width: f64, height: f64, z_index: Option<u32>) -> bool {
        match &self.tree.get(node).kind {
            NodeKind::Model(id) => {
                let Some(model) = self.models.get(id) else {
                    return false;
                };
                let new_backup = self.pipeline.backup_manager().backup(model);
                if !self.pipeline.resize(model, width, height) {
                    if new_backup {
                        self.pipeline.backup_manager().remove_backup(id);
                    }
                    return false;
                }
                self.pipeline.move_to(id, top, left, None, z_index);
                true
            }
            NodeKind::Synthetic { key, label } => {
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
                    width,
                    height,
                    z_index,
                    selection,
                });
                true
            }
            NodeKind::Root => false,
        }
    }

    fn hide(&mut self, node: &mut TreeMapNode) {
        node.hidden = true;
        self.hidden += 1;
        if let NodeKind::Model(id) = &self.tree.get(node.node).kind {
            if let Some(model) = self.models.get_mut(id) {
                model.filter(TREEMAP_TAG);
            }
        }
    }

    fn is_visible(&self, node: NodeId) -> bool {
        node == self.tree.root || self.laid_out[node.index()].is_some_and(|n| !n.hidden)
    }

    fn color_value(&self, node: NodeId, key: &str, kind: &dyn Kind) -> Option<f64> {
        let id = self.tree.get(node).model_id()?;
        let value = self.models.get(id)?.get(key)?.as_f64()?;
        Some(kind.to_user_scale(value))
    }

    /// Samples visible leaves, and visible groups whose children are all
    /// hidden. Returns whether `node` is visible.
    fn sample_colors(&self, node: NodeId, key: &str, kind: &dyn Kind, range: &mut ColorRange) -> bool {
        if !self.is_visible(node) {
            return false;
        }
        let mut visible_children = false;
        for child in self.tree.children(node) {
            visible_children |= self.sample_colors(child, key, kind, range);
        }
        if node != self.tree.root && !visible_children {
            if let Some(value) = self.color_value(node, key, kind) {
                range.sample(value);
            }
        }
        true
    }

    /// Groups with a visible child turn transparent, everything else
    /// visible gets its gradient color.
    fn color_tree(&mut self, node: NodeId, key: &str, kind: &dyn Kind, range: &ColorRange) -> bool {
        if !self.is_visible(node) {
            return false;
        }
        let children: Vec<NodeId> = self.tree.children(node).collect();
        let mut visible_children = false;
        for child in children {
            visible_children |= self.color_tree(child, key, kind, range);
        }
        if node == self.tree.root {
            return true;
        }

        let css = if visible_children {
            Some(GROUP_COLOR.to_string())
        } else {
            self.color_value(node, key, kind)
                .map(|value| range.color_for(value).to_css())
        };
        if let (Some(css), NodeKind::Model(id)) = (css, &self.tree.get(node).kind) {
            // already backed up when drawn
            self.pipeline.style(id, Style::background_color(Some(&css)));
        }
        true
    }
}

/// Sizes, places and colors models as a (possibly nested) squarified treemap.
#[derive(Debug, Clone)]
pub struct TreeMapLayout {
    state: Stateful<TreeMapState>,
    config: LayoutConfig,
    /// Color key of the previous pass, to detect coloring being dropped
    prev_color: Option<CompactString>,
    /// Models the last pass hid
    hidden: usize,
    last_tree: Option<Tree>,
}

impl TreeMapLayout {
    pub fn new(meta: &MetaModel, config: LayoutConfig) -> Self {
        Self {
            state: Stateful::new(meta),
            config,
            prev_color: None,
            hidden: 0,
            last_tree: None,
        }
    }

    pub fn treemap_state(&self) -> &TreeMapState {
        self.state.get()
    }

    /// Expanded renderings would fight the sizes the treemap imposes.
    fn revert_expanded(visible: &[ModelId], models: &mut ModelStore) {
        for id in visible {
            if let Some(model) = models.get_mut(id) {
                if model.expanded {
                    tracing::debug!("Reverting expanded model {id}");
                    model.expanded = false;
                }
            }
        }
    }

    fn build_tree(parent_key: Option<&str>, visible: &[ModelId], models: &ModelStore, meta: &MetaModel) -> Option<Tree> {
        let built = match parent_key {
            Some(key) => {
                let Some(treeifier) = meta.get(key).and_then(|e| new_treeifier(key, e)) else {
                    tracing::error!("parentKey attribute {key} does not support trees");
                    return None;
                };
                treeifier.build_tree(visible, models)
            }
            None => Tree::flat(visible),
        };
        built.map_err(|e| tracing::error!("{e}")).ok()
    }
}

impl LayoutEngine for TreeMapLayout {
    fn name(&self) -> &'static str {
        "treemap"
    }

    fn verify_metamodel(&self, meta: &MetaModel) -> bool {
        first_metamodel_key(meta, Some(&numeric_matcher)).is_some()
    }

    fn layout(&mut self, ctx: &mut LayoutContext<'_>) -> LayoutOutcome {
        let TreeMapState {
            area,
            color,
            parent_key,
        } = self.state.get().clone();
        if !key_matches(ctx.meta, &area, numeric_matcher) {
            tracing::error!("area attribute {area} is not numeric");
            return LayoutOutcome::CLEAN;
        }
        tracing::info!("Treemapping by {area}");

        // Restore models no longer part of the treemap, and every color if
        // coloring was just turned off.
        let color_reset = self.prev_color.is_some() && color.is_none();
        let restorations = ctx.pipeline.backup_manager().restore(ctx.visible, color_reset);
        let restored = replay_restorations(ctx.pipeline, ctx.models, restorations);
        self.prev_color = color.clone();

        if ctx.options.expandable {
            Self::revert_expanded(ctx.visible, ctx.models);
        }

        let Some(tree) = Self::build_tree(parent_key.as_deref(), ctx.visible, ctx.models, ctx.meta) else {
            return LayoutOutcome::CLEAN;
        };
        let weights = {
            let models: &ModelStore = ctx.models;
            aggregate(&tree, |node| leaf_area(node, models, &area))
        };

        let mut pass = TreeMapPass {
            pipeline: &mut *ctx.pipeline,
            models: &mut *ctx.models,
            laid_out: vec![None; tree.len()],
            tree,
            weights,
            config: self.config,
            click_selection: ctx.options.click_selection,
            hidden: 0,
        };
        let root = pass.tree.root;
        let bounds = Dimensions::new(ctx.bbox.width, ctx.bbox.height);
        let origin = Anchor {
            x: ctx.bbox.left,
            y: ctx.bbox.top,
        };
        pass.layout_nested(root, bounds, origin, 0);

        if let Some((key, entry)) = color.as_deref().and_then(|key| ctx.meta.get(key).map(|e| (key, e))) {
            let mut range = ColorRange::default();
            pass.sample_colors(root, key, entry.kind.as_ref(), &mut range);
            if range.is_empty() {
                tracing::debug!("No visible {key} values to color by");
            } else {
                tracing::debug!("Coloring by {key} over [{}, {}]", range.min, range.max);
            }
            pass.color_tree(root, key, entry.kind.as_ref(), &range);
        }

        let TreeMapPass { tree, hidden, .. } = pass;
        tracing::debug!("TreeMap restored {restored} models and hid {hidden}");
        self.hidden = hidden;
        self.last_tree = Some(tree);
        if hidden > 0 {
            LayoutOutcome::DIRTY
        } else {
            LayoutOutcome::CLEAN
        }
    }

    fn cleanup(&mut self, same_engine: bool, pipeline: &mut dyn Pipeline, models: &mut ModelStore) -> bool {
        if !same_engine {
            let restorations = pipeline.backup_manager().restore_all();
            replay_restorations(pipeline, models, restorations);
            self.prev_color = None;
        }
        if self.hidden > 0 {
            models.reset_all_filter(TREEMAP_TAG);
            self.hidden = 0;
            return true;
        }
        false
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
