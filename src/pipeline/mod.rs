pub mod backup;

use compact_str::CompactString;
use indexmap::IndexMap;

use crate::model::{Dimensions, ModelId, ModelStore, SuperModel};
pub use self::backup::{BackupManager, ModelBackup, Restoration};

pub const BACKGROUND_COLOR: &str = "background-color";

/// CSS-like properties applied to a rendering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    props: IndexMap<CompactString, String>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.props.insert(CompactString::new(name), value.into());
        self
    }

    /// An empty value unsets the background.
    pub fn background_color(value: Option<&str>) -> Self {
        Self::new().with(BACKGROUND_COLOR, value.unwrap_or_default())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.props.get(name).map(String::as_str)
    }

    pub fn background(&self) -> Option<&str> {
        self.get(BACKGROUND_COLOR)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A positioning/sizing/styling command aimed at one model.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Move {
        id: ModelId,
        top: f64,
        left: f64,
        group: Option<CompactString>,
        z_index: Option<u32>,
    },
    Resize {
        id: ModelId,
        width: f64,
        height: f64,
    },
    Style {
        id: ModelId,
        style: Style,
    },
}

impl Instruction {
    pub fn id(&self) -> &ModelId {
        match self {
            Instruction::Move { id, .. }
            | Instruction::Resize { id, .. }
            | Instruction::Style { id, .. } => id,
        }
    }
}

/// Decorative or structural elements a layout adds next to the models.
/// `selection` lists the models a click on the element toggles.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    BucketHeader {
        label: CompactString,
        top: f64,
        left: f64,
        selection: Vec<ModelId>,
    },
    Connector {
        top: f64,
        left: f64,
        width: f64,
        height: f64,
    },
    SyntheticNode {
        key: CompactString,
        label: CompactString,
        top: f64,
        left: f64,
        width: f64,
        height: f64,
        z_index: Option<u32>,
        selection: Vec<ModelId>,
    },
}

/// Sink for everything a layout pass produces.
pub trait Pipeline {
    fn move_to(
        &mut self,
        id: &ModelId,
        top: f64,
        left: f64,
        group: Option<&str>,
        z_index: Option<u32>,
    );

    /// Returns false when the rendering refuses the requested size.
    fn resize(&mut self, model: &SuperModel, width: f64, height: f64) -> bool;

    fn style(&mut self, id: &ModelId, style: Style);

    fn artifact(&mut self, artifact: Artifact);

    /// Dimensions of the placeholder rendering standing in for a synthetic
    /// tree node, creating it on first request.
    fn synthetic_rendering(&mut self, key: &str, label: &str) -> Dimensions;

    fn backup_manager(&mut self) -> &mut BackupManager;
}

/// Emits the resize/style instructions putting restored attributes back.
/// Returns how many models were touched.
pub fn replay_restorations(
    pipeline: &mut dyn Pipeline,
    models: &ModelStore,
    restorations: Vec<Restoration>,
) -> usize {
    let mut touched = 0;
    for restoration in restorations {
        let Some(model) = models.get(&restoration.id) else {
            continue;
        };
        if let Some(dims) = restoration.dimensions {
            if !pipeline.resize(model, dims.width, dims.height) {
                tracing::warn!("Model {} refused its original size", model.id);
            }
        }
        if let Some(background) = restoration.background {
            pipeline.style(&model.id, Style::background_color(background.as_deref()));
        }
        touched += 1;
    }
    touched
}

/// Sizing of synthetic placeholders: a single text line wide enough for the label.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticSizing {
    pub char_width: f64,
    pub padding: f64,
    pub height: f64,
    pub max_width: f64,
}

impl Default for SyntheticSizing {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            padding: 10.0,
            height: 20.0,
            max_width: 200.0,
        }
    }
}

/// A pipeline that records instructions and artifacts, and replays the
/// instructions onto model renderings on demand.
#[derive(Debug, Default)]
pub struct RenderingPipeline {
    instructions: Vec<Instruction>,
    artifacts: Vec<Artifact>,
    synthetic: IndexMap<CompactString, Dimensions>,
    sizing: SyntheticSizing,
    backups: BackupManager,
}

impl RenderingPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sizing(sizing: SyntheticSizing) -> Self {
        Self {
            sizing,
            ..Self::default()
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Last recorded move for `id`.
    pub fn position_of(&self, id: &str) -> Option<(f64, f64)> {
        self.instructions.iter().rev().find_map(|i| match i {
            Instruction::Move { id: mid, top, left, .. } if mid == id => Some((*top, *left)),
            _ => None,
        })
    }

    /// Last recorded size for `id`.
    pub fn size_of(&self, id: &str) -> Option<(f64, f64)> {
        self.instructions.iter().rev().find_map(|i| match i {
            Instruction::Resize { id: rid, width, height } if rid == id => Some((*width, *height)),
            _ => None,
        })
    }

    /// Last recorded background for `id`.
    pub fn background_of(&self, id: &str) -> Option<&str> {
        self.instructions.iter().rev().find_map(|i| match i {
            Instruction::Style { id: sid, style } if sid == id => style.background(),
            _ => None,
        })
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Drops the artifacts of the previous pass.
    pub fn clear_artifacts(&mut self) {
        self.artifacts.clear();
    }

    /// Replays and drains the recorded instructions onto the model renderings,
    /// returning the ones applied. Instructions aimed at unknown models are skipped.
    pub fn apply(&mut self, models: &mut ModelStore) -> Vec<Instruction> {
        let mut applied = Vec::with_capacity(self.instructions.len());
        for instruction in self.instructions.drain(..) {
            let Some(model) = models.get_mut(instruction.id()) else {
                tracing::debug!("Skipping instruction for unknown model {}", instruction.id());
                continue;
            };
            let rendering = model.rendering_mut();
            match &instruction {
                Instruction::Move { top, left, z_index, .. } => {
                    rendering.move_to(*top, *left, *z_index)
                }
                Instruction::Resize { width, height, .. } => rendering.rescale(*width, *height),
                Instruction::Style { style, .. } => rendering.set_style(style),
            }
            applied.push(instruction);
        }
        applied
    }
}

impl Pipeline for RenderingPipeline {
    fn move_to(
        &mut self,
        id: &ModelId,
        top: f64,
        left: f64,
        group: Option<&str>,
        z_index: Option<u32>,
    ) {
        self.instructions.push(Instruction::Move {
            id: id.clone(),
            top,
            left,
            group: group.map(CompactString::new),
            z_index,
        });
    }

    fn resize(&mut self, model: &SuperModel, width: f64, height: f64) -> bool {
        if !model.rendering().can_rescale_to(width, height) {
            return false;
        }
        self.instructions.push(Instruction::Resize {
            id: model.id.clone(),
            width,
            height,
        });
        true
    }

    fn style(&mut self, id: &ModelId, style: Style) {
        self.instructions.push(Instruction::Style {
            id: id.clone(),
            style,
        });
    }

    fn artifact(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }

    fn synthetic_rendering(&mut self, key: &str, label: &str) -> Dimensions {
        let sizing = self.sizing;
        *self
            .synthetic
            .entry(CompactString::new(key))
            .or_insert_with(|| {
                let width = (label.chars().count() as f64 * sizing.char_width + sizing.padding)
                    .min(sizing.max_width);
                Dimensions::new(width, sizing.height)
            })
    }

    fn backup_manager(&mut self) -> &mut BackupManager {
        &mut self.backups
    }
}
