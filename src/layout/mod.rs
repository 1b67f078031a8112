pub mod bucket;
pub mod flow;
pub mod layout_box;
pub mod manager;
pub mod scramble;
pub mod state;
pub mod tree;
pub mod treemap;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::meta::MetaModel;
use crate::model::{ModelId, ModelStore};
use crate::pipeline::Pipeline;

pub use self::bucket::BucketLayout;
pub use self::flow::FlowLayout;
pub use self::layout_box::{BoxConstraints, LayoutBox};
pub use self::manager::{
    EngineSelector, LayoutManager, LayoutReport, LayoutRequest, ManualPosition, StateSelector, DEFAULT_ENGINE,
};
pub use self::scramble::{NoLayout, ScrambleLayout};
pub use self::state::{LayoutState, Stateful};
pub use self::tree::TreeLayout;
pub use self::treemap::TreeMapLayout;

/// Fixed pixel constants shared by the layout engines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Gap between models placed next to each other, and between rows
    pub flow_gutter: f64,
    /// Extra vertical space after each bucket
    pub bucket_gutter: f64,
    pub bucket_header_height: f64,
    /// Gap between siblings along the growing direction
    pub tree_gutter: f64,
    /// Gap between a parent and its children along the opposite direction
    pub tree_nesting_gap: f64,
    pub tree_padding: f64,
    pub connector_thickness: f64,
    /// Border kept around nested treemap children
    pub treemap_padding: f64,
    pub treemap_header_height: f64,
    /// Below this interior size a treemap node nests nothing
    pub treemap_min_nested_size: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            flow_gutter: 5.0,
            bucket_gutter: 10.0,
            bucket_header_height: 20.0,
            tree_gutter: 5.0,
            tree_nesting_gap: 20.0,
            tree_padding: 5.0,
            connector_thickness: 2.0,
            treemap_padding: 4.0,
            treemap_header_height: 15.0,
            treemap_min_nested_size: 20.0,
        }
    }
}

/// Per-call flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutOptions {
    /// The pass was triggered by a filter change.
    pub filter: bool,
    /// Realign visibility after the pass regardless of what the engine reports.
    pub force_align: bool,
    /// Models may be expanded in place.
    pub expandable: bool,
    /// Clicking a synthetic node or bucket header toggles its models' selection.
    pub click_selection: bool,
}

/// What a layout pass reports back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutOutcome {
    /// Model visibility changed during the pass and must be realigned.
    pub realign: bool,
}

impl LayoutOutcome {
    pub const CLEAN: LayoutOutcome = LayoutOutcome { realign: false };
    pub const DIRTY: LayoutOutcome = LayoutOutcome { realign: true };
}

/// Everything a layout pass reads and writes.
pub struct LayoutContext<'a> {
    pub pipeline: &'a mut dyn Pipeline,
    pub bbox: LayoutBox,
    /// Models to lay out, in presentation order.
    pub visible: &'a [ModelId],
    /// Every known model, visible or not.
    pub models: &'a mut ModelStore,
    pub meta: &'a MetaModel,
    pub options: LayoutOptions,
}

/// A pluggable layout algorithm.
pub trait LayoutEngine: fmt::Debug {
    /// Registry key.
    fn name(&self) -> &'static str;

    /// Whether the metamodel carries what this engine needs.
    fn verify_metamodel(&self, _meta: &MetaModel) -> bool {
        true
    }

    fn layout(&mut self, ctx: &mut LayoutContext<'_>) -> LayoutOutcome;

    /// Undo the side effects of the previous pass before the next one.
    /// Returns whether visibility must be realigned.
    fn cleanup(&mut self, _same_engine: bool, _pipeline: &mut dyn Pipeline, _models: &mut ModelStore) -> bool {
        false
    }

    /// Persistable state, `None` for stateless engines.
    fn state(&self) -> Option<serde_json::Value> {
        None
    }

    /// `None` resets to the default. Returns false, leaving the current
    /// state untouched, when the candidate is invalid.
    fn set_state(&mut self, _state: Option<&serde_json::Value>, _meta: &MetaModel) -> bool {
        true
    }

    /// Models whose selection follows `id`'s (e.g. its tree descendants).
    fn dependent_models(&self, _id: &str) -> Vec<ModelId> {
        Vec::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("invalid layout engine: {0}")]
    UnknownEngine(String),
    #[error("received invalid layout state for engine: {0}")]
    RejectedState(&'static str),
    #[error("unknown model: {0}")]
    UnknownModel(ModelId),
}

/// A registered engine.
pub struct EngineSpec {
    pub name: &'static str,
    pub display_name: &'static str,
    pub build: fn(&MetaModel, LayoutConfig) -> Box<dyn LayoutEngine>,
}

fn build_no(_meta: &MetaModel, _config: LayoutConfig) -> Box<dyn LayoutEngine> {
    Box::new(NoLayout)
}

fn build_flow(meta: &MetaModel, config: LayoutConfig) -> Box<dyn LayoutEngine> {
    Box::new(FlowLayout::new(meta, config))
}

fn build_scramble(_meta: &MetaModel, _config: LayoutConfig) -> Box<dyn LayoutEngine> {
    Box::new(ScrambleLayout::new())
}

fn build_bucket(meta: &MetaModel, config: LayoutConfig) -> Box<dyn LayoutEngine> {
    Box::new(BucketLayout::new(meta, config))
}

fn build_tree(meta: &MetaModel, config: LayoutConfig) -> Box<dyn LayoutEngine> {
    Box::new(TreeLayout::new(meta, config))
}

fn build_treemap(meta: &MetaModel, config: LayoutConfig) -> Box<dyn LayoutEngine> {
    Box::new(TreeMapLayout::new(meta, config))
}

/// Every engine, in presentation order.
pub const ENGINES: &[EngineSpec] = &[
    EngineSpec { name: "no", display_name: "-", build: build_no },
    EngineSpec { name: "flow", display_name: "List", build: build_flow },
    EngineSpec { name: "scramble", display_name: "Random", build: build_scramble },
    EngineSpec { name: "bucket", display_name: "Buckets", build: build_bucket },
    EngineSpec { name: "tree", display_name: "Tree", build: build_tree },
    EngineSpec { name: "treemap", display_name: "TreeMap", build: build_treemap },
];

pub fn engine_spec(name: &str) -> Option<&'static EngineSpec> {
    ENGINES.iter().find(|spec| spec.name == name)
}

/// Instantiate a registered engine by name.
pub fn new_engine(name: &str, meta: &MetaModel, config: LayoutConfig) -> Result<Box<dyn LayoutEngine>, LayoutError> {
    engine_spec(name)
        .map(|spec| (spec.build)(meta, config))
        .ok_or_else(|| LayoutError::UnknownEngine(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_meta;

    #[test]
    fn registry_builds_engines_by_name() {
        let meta = sample_meta();
        for spec in ENGINES {
            let engine = new_engine(spec.name, &meta, LayoutConfig::default()).unwrap();
            assert_eq!(engine.name(), spec.name);
        }
        assert!(matches!(
            new_engine("spiral", &meta, LayoutConfig::default()),
            Err(LayoutError::UnknownEngine(_))
        ));
        assert_eq!(engine_spec("treemap").map(|s| s.display_name), Some("TreeMap"));
    }

    #[test]
    fn config_fills_missing_fields_with_defaults() {
        let config: LayoutConfig = serde_json::from_str(r#"{"flowGutter": 8}"#).unwrap();
        assert_eq!(config.flow_gutter, 8.0);
        assert_eq!(config.bucket_gutter, 10.0);
        let options: LayoutOptions = serde_json::from_str(r#"{"forceAlign": true}"#).unwrap();
        assert!(options.force_align && !options.filter);
    }
}
