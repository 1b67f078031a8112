use std::collections::HashSet;

use indexmap::IndexMap;

use crate::model::{Dimensions, ModelId, SuperModel};

/// Original rendering attributes of a model whose size or color a layout altered.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBackup {
    pub dimensions: Dimensions,
    pub background: Option<String>,
}

/// What to put back on a model when its backup is restored.
#[derive(Debug, Clone, PartialEq)]
pub struct Restoration {
    pub id: ModelId,
    pub dimensions: Option<Dimensions>,
    /// `Some(None)` restores an unset background.
    pub background: Option<Option<String>>,
}

/// Keeps the pre-layout size and color of every model a layout resized or
/// recolored, across consecutive passes of the same engine.
#[derive(Debug, Default)]
pub struct BackupManager {
    backups: IndexMap<ModelId, ModelBackup>,
}

impl BackupManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a new backup was taken. Already backed up models
    /// keep their original attributes.
    pub fn backup(&mut self, model: &SuperModel) -> bool {
        if self.backups.contains_key(&model.id) {
            return false;
        }
        let rendering = model.rendering();
        self.backups.insert(
            model.id.clone(),
            ModelBackup {
                dimensions: rendering.dimensions(),
                background: rendering.background().map(str::to_string),
            },
        );
        true
    }

    /// Forgets a backup without restoring it.
    pub fn remove_backup(&mut self, id: &str) {
        self.backups.shift_remove(id);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.backups.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.backups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backups.is_empty()
    }

    /// Restores every backed up model absent from `surviving`. When
    /// `color_reset` is set, surviving models get their colors back too
    /// (but keep their backups, since their sizes are still altered).
    pub fn restore(&mut self, surviving: &[ModelId], color_reset: bool) -> Vec<Restoration> {
        if self.backups.is_empty() {
            return Vec::new();
        }
        let survivors: HashSet<&str> = surviving.iter().map(ModelId::as_str).collect();
        let mut restorations = Vec::new();
        let mut kept = IndexMap::with_capacity(self.backups.len());
        for (id, backup) in self.backups.drain(..) {
            if survivors.contains(id.as_str()) {
                if color_reset {
                    restorations.push(Restoration {
                        id: id.clone(),
                        dimensions: None,
                        background: Some(backup.background.clone()),
                    });
                }
                kept.insert(id, backup);
            } else {
                restorations.push(Restoration {
                    id,
                    dimensions: Some(backup.dimensions),
                    background: Some(backup.background),
                });
            }
        }
        self.backups = kept;
        restorations
    }

    pub fn restore_all(&mut self) -> Vec<Restoration> {
        self.backups
            .drain(..)
            .map(|(id, backup)| Restoration {
                id,
                dimensions: Some(backup.dimensions),
                background: Some(backup.background),
            })
            .collect()
    }
}
