use serde::{Deserialize, Serialize};

/// Optional placement constraints. Values >= 1 are pixels, values in
/// [0, 1) are fractions of the container dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxConstraints {
    pub top: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
    pub right: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// The rectangle a layout pass places models into, in container pixels.
/// `top + height + bottom` always equals the container height, and
/// likewise horizontally.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutBox {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub width: f64,
    pub height: f64,
}

fn resolve(value: f64, container: f64) -> f64 {
    if value >= 1.0 {
        value
    } else {
        value * container
    }
}

/// Returns (start, length, end) along one axis. `length` wins over `end`.
fn axis(container: f64, start: Option<f64>, end: Option<f64>, length: Option<f64>) -> (f64, f64, f64) {
    let container = container.max(0.0);
    let start = start.map_or(0.0, |v| resolve(v, container)).clamp(0.0, container);
    let room = container - start;
    match length {
        Some(l) => {
            let length = resolve(l, container).clamp(0.0, room);
            (start, length, room - length)
        }
        None => {
            let end = end.map_or(0.0, |v| resolve(v, container)).clamp(0.0, room);
            (start, room - end, end)
        }
    }
}

impl LayoutBox {
    pub fn new(container_width: f64, container_height: f64, constraints: &BoxConstraints) -> Self {
        let (top, height, bottom) = axis(
            container_height,
            constraints.top,
            constraints.bottom,
            constraints.height,
        );
        let (left, width, right) = axis(
            container_width,
            constraints.left,
            constraints.right,
            constraints.width,
        );
        Self {
            top,
            left,
            bottom,
            right,
            width,
            height,
        }
    }

    /// The whole container.
    pub fn full(width: f64, height: f64) -> Self {
        Self::new(width, height, &BoxConstraints::default())
    }

    /// Nothing can be laid out in an empty box.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}
