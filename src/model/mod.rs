pub mod rendering;

use std::collections::HashSet;

use compact_str::CompactString;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::meta::{Value, ID_KEY};
pub use self::rendering::{CardRendering, Dimensions, Position, Rendering};

pub type ModelId = CompactString;
pub type Attributes = IndexMap<CompactString, Value>;

/// Serialized shape of a model: an `id` plus arbitrary attributes.
#[derive(Debug, Clone, Deserialize)]
pub struct RawModel {
    pub id: Value,
    #[serde(flatten)]
    pub attributes: Attributes,
}

/// A visualized record together with its rendering handle and the
/// filter tags other subsystems have applied to it.
#[derive(Debug)]
pub struct SuperModel {
    pub id: ModelId,
    attributes: Attributes,
    filters: HashSet<CompactString>,
    pub pinned: bool,
    pub expanded: bool,
    rendering: Box<dyn Rendering>,
}

impl SuperModel {
    pub fn new(id: &str, attributes: Attributes, rendering: Box<dyn Rendering>) -> Self {
        let mut attributes = attributes;
        attributes
            .entry(CompactString::new(ID_KEY))
            .or_insert_with(|| Value::text(id));
        Self {
            id: CompactString::new(id),
            attributes,
            filters: HashSet::new(),
            pinned: false,
            expanded: false,
            rendering,
        }
    }

    pub fn from_raw(raw: RawModel, rendering: Box<dyn Rendering>) -> Option<Self> {
        let id = raw.id.as_key()?;
        let mut attributes = raw.attributes;
        attributes.insert(CompactString::new(ID_KEY), raw.id);
        Some(Self::new(&id, attributes, rendering))
    }

    /// Raw attribute map.
    pub fn unwrap(&self) -> &Attributes {
        &self.attributes
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Replaces one attribute. The id attribute is left alone.
    pub fn set(&mut self, key: &str, value: Value) {
        if key != ID_KEY {
            self.attributes.insert(CompactString::new(key), value);
        }
    }

    /// With no tag: whether any filter hides the model.
    pub fn is_filtered(&self, tag: Option<&str>) -> bool {
        match tag {
            Some(tag) => self.filters.contains(tag),
            None => !self.filters.is_empty(),
        }
    }

    pub fn filter(&mut self, tag: &str) {
        self.filters.insert(CompactString::new(tag));
    }

    pub fn reset_filter(&mut self, tag: &str) {
        self.filters.remove(tag);
    }

    pub fn is_available_for_layout(&self) -> bool {
        !self.is_filtered(None) && !self.pinned
    }

    pub fn rendering(&self) -> &dyn Rendering {
        self.rendering.as_ref()
    }

    pub fn rendering_mut(&mut self) -> &mut dyn Rendering {
        self.rendering.as_mut()
    }

    pub fn dimensions(&self) -> Dimensions {
        self.rendering.dimensions()
    }
}

/// Every model known to a visualization, in load order.
#[derive(Debug, Default)]
pub struct ModelStore {
    models: IndexMap<ModelId, SuperModel>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, model: SuperModel) {
        self.models.insert(model.id.clone(), model);
    }

    pub fn get(&self, id: &str) -> Option<&SuperModel> {
        self.models.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut SuperModel> {
        self.models.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.models.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SuperModel> {
        self.models.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ModelId> {
        self.models.keys()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Ids of models no filter hides, in load order.
    pub fn available_ids(&self) -> Vec<ModelId> {
        self.models
            .values()
            .filter(|m| m.is_available_for_layout())
            .map(|m| m.id.clone())
            .collect()
    }

    pub fn reset_all_filter(&mut self, tag: &str) {
        for model in self.models.values_mut() {
            model.reset_filter(tag);
        }
    }
}

impl FromIterator<SuperModel> for ModelStore {
    fn from_iter<I: IntoIterator<Item = SuperModel>>(iter: I) -> Self {
        let mut store = ModelStore::new();
        for model in iter {
            store.insert(model);
        }
        store
    }
}
