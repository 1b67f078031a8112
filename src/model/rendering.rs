use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pipeline::Style;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub top: f64,
    pub left: f64,
    pub z_index: Option<u32>,
}

/// The visual handle of a model. Owned by the rendering subsystem; layout
/// engines only query it and drive it through a pipeline.
pub trait Rendering: fmt::Debug {
    fn dimensions(&self) -> Dimensions;

    /// Whether the rendering accepts being resized to exactly `width` x `height`.
    fn can_rescale_to(&self, width: f64, height: f64) -> bool;

    fn move_to(&mut self, top: f64, left: f64, z_index: Option<u32>);

    fn rescale(&mut self, width: f64, height: f64);

    fn set_style(&mut self, style: &Style);

    fn background(&self) -> Option<&str>;

    fn position(&self) -> Option<Position>;
}

/// A plain rectangular card with minimum dimensions below which it
/// refuses to shrink.
#[derive(Debug, Clone, PartialEq)]
pub struct CardRendering {
    pub dims: Dimensions,
    pub min: Dimensions,
    pub position: Option<Position>,
    pub background: Option<String>,
}

impl CardRendering {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            dims: Dimensions::new(width, height),
            min: Dimensions::new(1.0, 1.0),
            position: None,
            background: None,
        }
    }

    pub fn with_min(mut self, width: f64, height: f64) -> Self {
        self.min = Dimensions::new(width, height);
        self
    }
}

impl Rendering for CardRendering {
    fn dimensions(&self) -> Dimensions {
        self.dims
    }

    fn can_rescale_to(&self, width: f64, height: f64) -> bool {
        width >= self.min.width && height >= self.min.height
    }

    fn move_to(&mut self, top: f64, left: f64, z_index: Option<u32>) {
        self.position = Some(Position { top, left, z_index });
    }

    fn rescale(&mut self, width: f64, height: f64) {
        self.dims = Dimensions::new(width, height);
    }

    fn set_style(&mut self, style: &Style) {
        if let Some(bg) = style.background() {
            self.background = if bg.is_empty() { None } else { Some(bg.to_string()) };
        }
    }

    fn background(&self) -> Option<&str> {
        self.background.as_deref()
    }

    fn position(&self) -> Option<Position> {
        self.position
    }
}
