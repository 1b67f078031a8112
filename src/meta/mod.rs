pub mod kinds;
pub mod matchers;
pub mod value;

use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;
use indexmap::IndexMap;
use serde::Deserialize;

pub use self::kinds::{Cluster, Kind};
pub use self::matchers::{
    first_metamodel_key, hierarchy_matcher, link_matcher, link_or_hierarchy_matcher,
    numeric_matcher, or_matcher,
};
pub use self::value::Value;
use self::kinds::{kind_by_name, DateClustering, DateKind};

/// Attribute every model carries its unique identifier under.
pub const ID_KEY: &str = "id";

/// Custom clustering applied to one attribute instead of its kind's.
pub type ClusterFn = Arc<dyn Fn(&Value) -> Cluster + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    #[error("unknown kind '{kind}' for metamodel key '{key}'")]
    UnknownKind { key: String, kind: String },
    #[error("malformed metamodel: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Describes one model attribute.
#[derive(Clone)]
pub struct MetaEntry {
    pub label: CompactString,
    pub kind: Arc<dyn Kind>,
    /// The attribute value identifies another model (a parent pointer).
    pub is_link: bool,
    /// Attribute on which links resolve. `None` means the model id.
    pub link_key: Option<CompactString>,
    /// The attribute holds a hierarchical categorical breakdown.
    pub is_hierarchy: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub cluster: Option<ClusterFn>,
}

impl MetaEntry {
    pub fn new(label: &str, kind: impl Kind + 'static) -> Self {
        Self {
            label: CompactString::new(label),
            kind: Arc::new(kind),
            is_link: false,
            link_key: None,
            is_hierarchy: false,
            min: None,
            max: None,
            cluster: None,
        }
    }

    pub fn link(mut self, link_key: Option<&str>) -> Self {
        self.is_link = true;
        self.link_key = link_key.map(CompactString::new);
        self
    }

    pub fn hierarchy(mut self) -> Self {
        self.is_hierarchy = true;
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_cluster(mut self, cluster: ClusterFn) -> Self {
        self.cluster = Some(cluster);
        self
    }

    /// Clusters a value, honoring the per-attribute override first.
    pub fn cluster(&self, value: &Value) -> Cluster {
        match &self.cluster {
            Some(f) => f(value),
            None => self.kind.cluster(value),
        }
    }

    /// Attribute links resolve on, defaulting to the model id.
    pub fn link_end_key(&self) -> &str {
        self.link_key.as_deref().unwrap_or(ID_KEY)
    }
}

impl fmt::Debug for MetaEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaEntry")
            .field("label", &self.label)
            .field("kind", &self.kind.name())
            .field("is_link", &self.is_link)
            .field("link_key", &self.link_key)
            .field("is_hierarchy", &self.is_hierarchy)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("cluster", &self.cluster.is_some())
            .finish()
    }
}

/// Serialized shape of a metamodel entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntrySpec {
    #[serde(default)]
    label: Option<CompactString>,
    kind: String,
    #[serde(default)]
    is_link: bool,
    #[serde(default)]
    link_key: Option<CompactString>,
    #[serde(default)]
    is_hierarchy: bool,
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
    #[serde(default)]
    cluster_by: Option<String>,
}

/// Attribute schema, in declaration order. Read-only during a layout pass.
#[derive(Debug, Clone, Default)]
pub struct MetaModel {
    entries: IndexMap<CompactString, MetaEntry>,
}

impl MetaModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, entry: MetaEntry) -> &mut Self {
        self.entries.insert(CompactString::new(key), entry);
        self
    }

    pub fn with(mut self, key: &str, entry: MetaEntry) -> Self {
        self.insert(key, entry);
        self
    }

    pub fn get(&self, key: &str) -> Option<&MetaEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(CompactString::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode a metamodel from its JSON object form, preserving key order.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, MetaError> {
        let specs: IndexMap<CompactString, EntrySpec> = serde_json::from_value(json.clone())?;
        let mut meta = MetaModel::new();
        for (key, spec) in specs {
            let kind: Arc<dyn Kind> = match (spec.kind.as_str(), spec.cluster_by.as_deref()) {
                ("date", Some(by)) => {
                    let clustering = match by {
                        "m" => DateClustering::Month,
                        "d" => DateClustering::Day,
                        _ => DateClustering::Year,
                    };
                    Arc::new(DateKind::new(clustering))
                }
                (name, _) => match kind_by_name(name) {
                    Some(kind) => Arc::from(kind),
                    None => {
                        return Err(MetaError::UnknownKind {
                            key: key.to_string(),
                            kind: spec.kind.clone(),
                        })
                    }
                },
            };
            let entry = MetaEntry {
                label: spec.label.unwrap_or_else(|| key.clone()),
                kind,
                is_link: spec.is_link,
                link_key: spec.link_key,
                is_hierarchy: spec.is_hierarchy,
                min: spec.min,
                max: spec.max,
                cluster: None,
            };
            meta.entries.insert(key, entry);
        }
        Ok(meta)
    }
}
