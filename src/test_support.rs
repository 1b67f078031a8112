// Fixtures shared by the unit tests.

use crate::meta::kinds::{CategoryKind, NumberKind, StringKind};
use crate::meta::{MetaEntry, MetaModel, Value};
use crate::model::{Attributes, CardRendering, ModelStore, SuperModel};

pub(crate) fn card(id: &str, width: f64, height: f64) -> SuperModel {
    SuperModel::new(id, Attributes::new(), Box::new(CardRendering::new(width, height)))
}

pub(crate) fn card_with(id: &str, width: f64, height: f64, attrs: &[(&str, Value)]) -> SuperModel {
    let mut model = card(id, width, height);
    for (key, value) in attrs {
        model.set(key, value.clone());
    }
    model
}

/// A 50x30 card pointing at `parent` through the `parent` attribute.
pub(crate) fn linked(id: &str, parent: Option<&str>) -> SuperModel {
    let parent = parent.map(Value::text).unwrap_or_default();
    card_with(id, 50.0, 30.0, &[("parent", parent)])
}

pub(crate) fn store(models: Vec<SuperModel>) -> ModelStore {
    models.into_iter().collect()
}

/// name (string), size (number), genre (hierarchical category), parent (link).
pub(crate) fn sample_meta() -> MetaModel {
    MetaModel::new()
        .with("name", MetaEntry::new("Name", StringKind))
        .with("size", MetaEntry::new("Size", NumberKind))
        .with("genre", MetaEntry::new("Genre", CategoryKind).hierarchy())
        .with("parent", MetaEntry::new("Parent", StringKind).link(None))
}
