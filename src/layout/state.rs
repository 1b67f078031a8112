use std::fmt;

use compact_str::CompactString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::meta::MetaModel;

/// Engine-specific persisted state.
pub trait LayoutState: Clone + fmt::Debug + Serialize + DeserializeOwned {
    /// State used at construction and on reset.
    fn default_state(meta: &MetaModel) -> Self;

    /// Whether every metamodel key the state references exists and fits.
    fn validate(&self, meta: &MetaModel) -> bool;
}

/// Holds one engine's state and guards every change with validation.
#[derive(Debug, Clone)]
pub struct Stateful<S> {
    state: S,
}

impl<S: LayoutState> Stateful<S> {
    pub fn new(meta: &MetaModel) -> Self {
        Self {
            state: S::default_state(meta),
        }
    }

    pub fn get(&self) -> &S {
        &self.state
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.state).unwrap_or_default()
    }

    /// `None` resets to the default state. An undecodable or invalid
    /// candidate is rejected and the current state kept.
    pub fn set(&mut self, candidate: Option<&serde_json::Value>, meta: &MetaModel) -> bool {
        let Some(candidate) = candidate else {
            self.state = S::default_state(meta);
            return true;
        };
        match serde_json::from_value::<S>(candidate.clone()) {
            Ok(state) => self.replace(state, meta),
            Err(e) => {
                tracing::warn!("Rejecting undecodable layout state {candidate}: {e}");
                false
            }
        }
    }

    pub fn replace(&mut self, state: S, meta: &MetaModel) -> bool {
        if !state.validate(meta) {
            tracing::warn!("Rejecting invalid layout state {state:?}");
            return false;
        }
        self.state = state;
        true
    }
}

/// Decodes an optional metamodel key, reading `""` as unset.
pub(crate) fn optional_key<'de, D>(deserializer: D) -> Result<Option<CompactString>, D::Error>
where
    D: Deserializer<'de>,
{
    let key: Option<CompactString> = Option::deserialize(deserializer)?;
    Ok(key.filter(|k| !k.is_empty()))
}
