use compact_str::CompactString;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::flow::{compare_by, sort_models, FlowLayout};
use super::state::{LayoutState, Stateful};
use super::{LayoutConfig, LayoutContext, LayoutEngine, LayoutOutcome};
use crate::meta::{first_metamodel_key, Cluster, MetaModel, Value};
use crate::model::{ModelId, ModelStore};
use crate::pipeline::{Artifact, Pipeline};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketState {
    pub bucket_by: CompactString,
    #[serde(default)]
    pub reverse: bool,
}

impl LayoutState for BucketState {
    fn default_state(meta: &MetaModel) -> Self {
        Self {
            bucket_by: first_metamodel_key(meta, None).map(CompactString::new).unwrap_or_default(),
            reverse: false,
        }
    }

    fn validate(&self, meta: &MetaModel) -> bool {
        meta.contains(&self.bucket_by)
    }
}

/// One group of models sharing a cluster key.
#[derive(Debug)]
struct Bucket {
    cluster: Cluster,
    models: Vec<ModelId>,
}

/// Groups models by the clustering of one attribute, each group under a
/// header and laid out as a flow.
#[derive(Debug, Clone)]
pub struct BucketLayout {
    state: Stateful<BucketState>,
    config: LayoutConfig,
    flow: FlowLayout,
}

impl BucketLayout {
    pub fn new(meta: &MetaModel, config: LayoutConfig) -> Self {
        Self {
            state: Stateful::new(meta),
            config,
            flow: FlowLayout::new(meta, config),
        }
    }

    pub fn bucket_state(&self) -> &BucketState {
        self.state.get()
    }

    /// Buckets in presentation order.
    fn buckets(&self, ids: &[ModelId], models: &ModelStore, meta: &MetaModel) -> Vec<Bucket> {
        let BucketState { bucket_by, reverse } = self.state.get();
        let Some(entry) = meta.get(bucket_by) else {
            return Vec::new();
        };

        let null = Value::Null;
        let mut buckets: IndexMap<CompactString, Bucket> = IndexMap::new();
        for id in ids {
            let Some(model) = models.get(id) else {
                continue;
            };
            let cluster = entry.cluster(model.get(bucket_by).unwrap_or(&null));
            let key = cluster.key.as_key().unwrap_or_default();
            buckets
                .entry(key)
                .or_insert_with(|| Bucket {
                    cluster,
                    models: Vec::new(),
                })
                .models
                .push(id.clone());
        }

        let mut buckets: Vec<Bucket> = buckets.into_values().collect();
        buckets.sort_by(|a, b| {
            let ord = compare_by(meta, bucket_by, &a.cluster.key, &b.cluster.key);
            if *reverse {
                ord.reverse()
            } else {
                ord
            }
        });
        buckets
    }
}

impl LayoutEngine for BucketLayout {
    fn name(&self) -> &'static str {
        "bucket"
    }

    fn layout(&mut self, ctx: &mut LayoutContext<'_>) -> LayoutOutcome {
        let BucketState { bucket_by, reverse } = self.state.get().clone();
        if !ctx.meta.contains(&bucket_by) {
            tracing::error!("bucketBy attribute {bucket_by} does not match any property");
            return LayoutOutcome::CLEAN;
        }
        tracing::info!("Bucketing by {bucket_by}");

        let buckets = self.buckets(ctx.visible, ctx.models, ctx.meta);
        self.flow.reset();
        for mut bucket in buckets {
            let (top, _) = self.flow.cursor();
            ctx.pipeline.artifact(Artifact::BucketHeader {
                label: bucket.cluster.label.clone(),
                top: ctx.bbox.top + top,
                left: ctx.bbox.left,
                selection: if ctx.options.click_selection {
                    bucket.models.clone()
                } else {
                    Vec::new()
                },
            });
            self.flow.carriage_return(self.config.bucket_header_height + self.config.flow_gutter);

            sort_models(&mut bucket.models, ctx.models, ctx.meta, &bucket_by, reverse);
            self.flow.place(ctx.pipeline, &ctx.bbox, &bucket.models, ctx.models);

            // re-position for next bucket
            self.flow.carriage_return(self.config.bucket_gutter);
        }
        LayoutOutcome::CLEAN
    }

    fn cleanup(&mut self, same_engine: bool, pipeline: &mut dyn Pipeline, models: &mut ModelStore) -> bool {
        self.flow.cleanup(same_engine, pipeline, models)
    }

    fn state(&self) -> Option<serde_json::Value> {
        Some(self.state.to_json())
    }

    fn set_state(&mut self, state: Option<&serde_json::Value>, meta: &MetaModel) -> bool {
        self.state.set(state, meta)
    }
}
