use std::time::Instant;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{LayoutBox, LayoutConfig, LayoutContext, LayoutEngine, LayoutError, LayoutOptions, ENGINES};
use crate::meta::MetaModel;
use crate::model::{ModelId, ModelStore};
use crate::pipeline::{Instruction, Pipeline, RenderingPipeline};

/// Engine used when none ran yet.
pub const DEFAULT_ENGINE: &str = "flow";

/// Which engine a layout request runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineSelector<'a> {
    /// The engine of the previous request, or the default one.
    #[default]
    Current,
    Default,
    Named(&'a str),
}

/// What happens to the selected engine's state before it runs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum StateSelector<'a> {
    #[default]
    Keep,
    Reset,
    Set(&'a serde_json::Value),
}

/// A position the user dragged a model to, applied on top of the engine's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualPosition {
    pub id: ModelId,
    pub top: f64,
    pub left: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutRequest<'a> {
    pub engine: EngineSelector<'a>,
    pub state: StateSelector<'a>,
    pub options: LayoutOptions,
    pub positions: &'a [ManualPosition],
}

#[derive(Debug, Clone)]
pub struct LayoutReport {
    /// Engine that ran
    pub engine: &'static str,
    /// Model visibility must be realigned with the filters.
    pub realign: bool,
    /// Everything applied to the renderings, in order.
    pub instructions: Vec<Instruction>,
}

/// Owns the engines usable with one metamodel and runs one of them per
/// request, in sequence.
#[derive(Debug)]
pub struct LayoutManager {
    engines: IndexMap<&'static str, Box<dyn LayoutEngine>>,
    current: Option<&'static str>,
    pipeline: RenderingPipeline,
}

impl LayoutManager {
    /// Instantiates every registered engine the metamodel supports.
    pub fn new(meta: &MetaModel, config: LayoutConfig) -> Self {
        Self::with_pipeline(meta, config, RenderingPipeline::new())
    }

    pub fn with_pipeline(meta: &MetaModel, config: LayoutConfig, pipeline: RenderingPipeline) -> Self {
        let mut engines = IndexMap::new();
        for spec in ENGINES {
            let engine = (spec.build)(meta, config);
            if !engine.verify_metamodel(meta) {
                tracing::debug!("Metamodel does not support the {} layout", spec.name);
                continue;
            }
            engines.insert(spec.name, engine);
        }
        Self {
            engines,
            current: None,
            pipeline,
        }
    }

    pub fn engine_names(&self) -> Vec<&'static str> {
        self.engines.keys().copied().collect()
    }

    pub fn current_engine_name(&self) -> Option<&'static str> {
        self.current
    }

    pub fn engine_state(&self, name: &str) -> Option<serde_json::Value> {
        self.engines.get(name).and_then(|e| e.state())
    }

    pub fn pipeline(&self) -> &RenderingPipeline {
        &self.pipeline
    }

    /// `id` plus every model whose selection follows it under the current engine.
    pub fn extend_selection(&self, id: &str) -> Vec<ModelId> {
        let mut ids = self
            .current
            .and_then(|name| self.engines.get(name))
            .map(|e| e.dependent_models(id))
            .unwrap_or_default();
        ids.push(ModelId::new(id));
        ids
    }

    fn resolve_engine(&self, selector: EngineSelector<'_>) -> Result<&'static str, LayoutError> {
        let name = match selector {
            EngineSelector::Current => self.current.unwrap_or(DEFAULT_ENGINE),
            EngineSelector::Default => DEFAULT_ENGINE,
            EngineSelector::Named(name) => name,
        };
        self.engines
            .get_key_value(name)
            .map(|(name, _)| *name)
            .ok_or_else(|| LayoutError::UnknownEngine(name.to_string()))
    }

    /// Runs one layout pass and applies its outcome to the renderings.
    ///
    /// Nothing changes when the request names an unknown engine or model,
    /// or carries a state the engine rejects.
    pub fn layout(
        &mut self,
        request: &LayoutRequest<'_>,
        bbox: LayoutBox,
        models: &mut ModelStore,
        meta: &MetaModel,
    ) -> Result<LayoutReport, LayoutError> {
        let started = Instant::now();
        if let Some(unknown) = request.positions.iter().find(|p| !models.contains(&p.id)) {
            return Err(LayoutError::UnknownModel(unknown.id.clone()));
        }

        let name = self.resolve_engine(request.engine)?;
        let engine = self
            .engines
            .get_mut(name)
            .ok_or_else(|| LayoutError::UnknownEngine(name.to_string()))?;
        let accepted = match request.state {
            StateSelector::Keep => true,
            StateSelector::Reset => engine.set_state(None, meta),
            StateSelector::Set(state) => engine.set_state(Some(state), meta),
        };
        if !accepted {
            return Err(LayoutError::RejectedState(name));
        }

        let mut realign = false;
        if let Some(previous) = self.current.replace(name) {
            if let Some(last) = self.engines.get_mut(previous) {
                realign |= last.cleanup(previous == name, &mut self.pipeline, models);
            }
        }
        self.pipeline.clear_artifacts();

        let visible = models.available_ids();
        tracing::debug!("{} models available for layout", visible.len());
        if bbox.is_empty() {
            tracing::warn!("Skipping {name} layout in an empty box {bbox:?}");
        } else if let Some(engine) = self.engines.get_mut(name) {
            let mut ctx = LayoutContext {
                pipeline: &mut self.pipeline,
                bbox,
                visible: &visible,
                models: &mut *models,
                meta,
                options: request.options,
            };
            realign |= engine.layout(&mut ctx).realign;
        }

        for position in request.positions {
            self.pipeline.move_to(&position.id, position.top, position.left, None, None);
        }
        let instructions = self.pipeline.apply(models);

        let realign = realign || request.options.force_align;
        if realign {
            tracing::debug!("Align visibility forceAlign={}", request.options.force_align);
        }
        tracing::debug!(
            "Layout {name} applied {} instructions in {:?}",
            instructions.len(),
            started.elapsed()
        );
        Ok(LayoutReport {
            engine: name,
            realign,
            instructions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::treemap::TREEMAP_TAG;
    use crate::meta::kinds::StringKind;
    use crate::meta::{MetaEntry, Value};
    use crate::model::Dimensions;
    use crate::test_support::{card_with, linked, sample_meta, store};

    fn sized(id: &str, size: f64) -> crate::model::SuperModel {
        card_with(id, 50.0, 30.0, &[("name", Value::text(id)), ("size", Value::Number(size))])
    }

    fn request(engine: EngineSelector<'_>) -> LayoutRequest<'_> {
        LayoutRequest {
            engine,
            ..LayoutRequest::default()
        }
    }

    #[test]
    fn only_supported_engines_are_offered() {
        let strings = MetaModel::new().with("name", MetaEntry::new("Name", StringKind));
        let manager = LayoutManager::new(&strings, LayoutConfig::default());
        assert_eq!(manager.engine_names(), vec!["no", "flow", "scramble", "bucket"]);

        let full = LayoutManager::new(&sample_meta(), LayoutConfig::default());
        assert_eq!(full.engine_names().len(), ENGINES.len());
        assert_eq!(full.current_engine_name(), None);
    }

    #[test]
    fn first_pass_runs_the_default_engine() {
        let meta = sample_meta();
        let mut models = store(vec![sized("a", 1.0), sized("b", 2.0)]);
        let mut manager = LayoutManager::new(&meta, LayoutConfig::default());
        let report = manager
            .layout(&LayoutRequest::default(), LayoutBox::full(500.0, 500.0), &mut models, &meta)
            .unwrap();
        assert_eq!(report.engine, DEFAULT_ENGINE);
        assert_eq!(manager.current_engine_name(), Some(DEFAULT_ENGINE));
        assert_eq!(report.instructions.len(), 2);
        assert!(!report.realign);
        assert!(models.get("a").unwrap().rendering().position().is_some());
    }

    #[test]
    fn manual_positions_win() {
        let meta = sample_meta();
        let mut models = store(vec![sized("a", 1.0), sized("b", 2.0)]);
        let mut manager = LayoutManager::new(&meta, LayoutConfig::default());
        let positions = [ManualPosition {
            id: "b".into(),
            top: 300.0,
            left: 200.0,
        }];
        let req = LayoutRequest {
            positions: &positions,
            ..request(EngineSelector::Named("flow"))
        };
        manager.layout(&req, LayoutBox::full(500.0, 500.0), &mut models, &meta).unwrap();
        let pos = models.get("b").unwrap().rendering().position().unwrap();
        assert_eq!((pos.top, pos.left), (300.0, 200.0));
    }

    #[test]
    fn bad_requests_change_nothing() {
        let meta = sample_meta();
        let mut models = store(vec![sized("a", 1.0)]);
        let mut manager = LayoutManager::new(&meta, LayoutConfig::default());
        let bbox = LayoutBox::full(500.0, 500.0);

        let err = manager.layout(&request(EngineSelector::Named("spiral")), bbox, &mut models, &meta);
        assert!(matches!(err, Err(LayoutError::UnknownEngine(name)) if name == "spiral"));

        let bad = serde_json::json!({"area": "name"});
        let req = LayoutRequest {
            state: StateSelector::Set(&bad),
            ..request(EngineSelector::Named("treemap"))
        };
        let err = manager.layout(&req, bbox, &mut models, &meta);
        assert!(matches!(err, Err(LayoutError::RejectedState("treemap"))));
        assert_eq!(manager.engine_state("treemap").unwrap()["area"], "size");

        let ghost = [ManualPosition {
            id: "ghost".into(),
            top: 0.0,
            left: 0.0,
        }];
        let req = LayoutRequest {
            positions: &ghost,
            ..LayoutRequest::default()
        };
        assert!(matches!(
            manager.layout(&req, bbox, &mut models, &meta),
            Err(LayoutError::UnknownModel(_))
        ));
        assert_eq!(manager.current_engine_name(), None);
        assert!(models.get("a").unwrap().rendering().position().is_none());
    }

    #[test]
    fn leaving_the_treemap_restores_sizes_and_visibility() {
        let meta = sample_meta();
        let mut models = store(vec![sized("a", 10.0), sized("b", 0.0)]);
        let mut manager = LayoutManager::new(&meta, LayoutConfig::default());
        let bbox = LayoutBox::full(200.0, 100.0);

        let report = manager
            .layout(&request(EngineSelector::Named("treemap")), bbox, &mut models, &meta)
            .unwrap();
        assert!(report.realign);
        assert_eq!(models.get("a").unwrap().dimensions(), Dimensions::new(200.0, 100.0));
        assert!(models.get("b").unwrap().is_filtered(Some(TREEMAP_TAG)));

        let report = manager
            .layout(&request(EngineSelector::Default), bbox, &mut models, &meta)
            .unwrap();
        assert_eq!(report.engine, "flow");
        assert!(report.realign);
        assert_eq!(models.get("a").unwrap().dimensions(), Dimensions::new(50.0, 30.0));
        assert!(!models.get("b").unwrap().is_filtered(None));
        assert!(manager.pipeline().backups().is_empty());
    }

    #[test]
    fn empty_box_skips_the_engine() {
        let meta = sample_meta();
        let mut models = store(vec![sized("a", 1.0)]);
        let mut manager = LayoutManager::new(&meta, LayoutConfig::default());
        let options = LayoutOptions {
            force_align: true,
            ..LayoutOptions::default()
        };
        let req = LayoutRequest {
            options,
            ..LayoutRequest::default()
        };
        let report = manager.layout(&req, LayoutBox::full(0.0, 400.0), &mut models, &meta).unwrap();
        assert!(report.instructions.is_empty());
        assert!(report.realign);
    }

    #[test]
    fn selection_extends_to_tree_descendants() {
        let meta = sample_meta();
        let mut models = store(vec![linked("a", Some("b")), linked("b", None), linked("c", None)]);
        let mut manager = LayoutManager::new(&meta, LayoutConfig::default());
        let state = serde_json::json!({"parentKey": "parent"});
        let req = LayoutRequest {
            state: StateSelector::Set(&state),
            ..request(EngineSelector::Named("tree"))
        };
        manager.layout(&req, LayoutBox::full(800.0, 600.0), &mut models, &meta).unwrap();

        assert_eq!(manager.extend_selection("b"), vec![ModelId::new("a"), ModelId::new("b")]);
        assert_eq!(manager.extend_selection("c"), vec![ModelId::new("c")]);
    }
}
