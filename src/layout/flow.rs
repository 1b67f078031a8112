use std::cmp::Ordering;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use super::state::{LayoutState, Stateful};
use super::{LayoutBox, LayoutConfig, LayoutContext, LayoutEngine, LayoutOutcome};
use crate::meta::{first_metamodel_key, MetaModel, Value};
use crate::model::{ModelId, ModelStore};
use crate::pipeline::Pipeline;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    pub order: CompactString,
    #[serde(default)]
    pub reverse: bool,
}

impl LayoutState for FlowState {
    fn default_state(meta: &MetaModel) -> Self {
        Self {
            order: first_metamodel_key(meta, None).map(CompactString::new).unwrap_or_default(),
            reverse: false,
        }
    }

    fn validate(&self, meta: &MetaModel) -> bool {
        meta.contains(&self.order)
    }
}

/// Stable sort of `ids` by attribute `key`, using the attribute kind's
/// ordering. `reverse` flips the comparison.
pub(crate) fn sort_models(ids: &mut [ModelId], models: &ModelStore, meta: &MetaModel, key: &str, reverse: bool) {
    let Some(entry) = meta.get(key) else {
        return;
    };
    let null = Value::Null;
    ids.sort_by(|a, b| {
        let va = models.get(a).and_then(|m| m.get(key)).unwrap_or(&null);
        let vb = models.get(b).and_then(|m| m.get(key)).unwrap_or(&null);
        let ord = entry.kind.compare(va, vb);
        if reverse {
            ord.reverse()
        } else {
            ord
        }
    });
}

/// Places models left to right, wrapping into rows.
#[derive(Debug, Clone)]
pub struct FlowLayout {
    state: Stateful<FlowState>,
    config: LayoutConfig,
    /// Running cursor, relative to the layout box
    top: f64,
    left: f64,
}

impl FlowLayout {
    pub fn new(meta: &MetaModel, config: LayoutConfig) -> Self {
        Self {
            state: Stateful::new(meta),
            config,
            top: 0.0,
            left: 0.0,
        }
    }

    pub fn flow_state(&self) -> &FlowState {
        self.state.get()
    }

    /// Current cursor offset `(top, left)` within the layout box.
    pub fn cursor(&self) -> (f64, f64) {
        (self.top, self.left)
    }

    /// Moves the cursor down by `amount` and back to the left edge.
    pub(crate) fn carriage_return(&mut self, amount: f64) {
        self.top += amount;
        self.left = 0.0;
    }

    pub(crate) fn reset(&mut self) {
        self.top = 0.0;
        self.left = 0.0;
    }

    /// Places `ids` in order from the current cursor on. Leaves the cursor
    /// below the last row.
    pub(crate) fn place(&mut self, pipeline: &mut dyn Pipeline, bbox: &LayoutBox, ids: &[ModelId], models: &ModelStore) {
        let gutter = self.config.flow_gutter;
        let mut line_height: f64 = 0.0;
        for id in ids {
            let Some(model) = models.get(id) else {
                continue;
            };
            let dims = model.dimensions();
            if self.left > 0.0 && self.left + dims.width > bbox.width {
                self.left = 0.0;
                self.top += line_height + gutter;
                line_height = 0.0;
            }
            line_height = line_height.max(dims.height);
            pipeline.move_to(id, bbox.top + self.top, bbox.left + self.left, None, None);
            self.left += dims.width + gutter;
        }
        // adjust top after last line
        self.top += line_height;
    }
}

impl LayoutEngine for FlowLayout {
    fn name(&self) -> &'static str {
        "flow"
    }

    fn layout(&mut self, ctx: &mut LayoutContext<'_>) -> LayoutOutcome {
        let FlowState { order, reverse } = self.state.get().clone();
        let mut ids = ctx.visible.to_vec();
        if !order.is_empty() {
            tracing::info!("Sorting by {order}");
            sort_models(&mut ids, ctx.models, ctx.meta, &order, reverse);
        }
        self.place(ctx.pipeline, &ctx.bbox, &ids, ctx.models);
        tracing::debug!("Flow placed {} models, cursor at {:?}", ids.len(), self.cursor());
        LayoutOutcome::CLEAN
    }

    fn cleanup(&mut self, _same_engine: bool, _pipeline: &mut dyn Pipeline, _models: &mut ModelStore) -> bool {
        self.reset();
        false
    }

    fn state(&self) -> Option<serde_json::Value> {
        Some(self.state.to_json())
    }

    fn set_state(&mut self, state: Option<&serde_json::Value>, meta: &MetaModel) -> bool {
        self.state.set(state, meta)
    }
}

/// Compares two models by one attribute, the way flow and bucket order them.
pub(crate) fn compare_by(meta: &MetaModel, key: &str, a: &Value, b: &Value) -> Ordering {
    meta.get(key)
        .map_or_else(|| a.native_cmp(b), |entry| entry.kind.compare(a, b))
}
