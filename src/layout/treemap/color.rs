/// Background of group nodes with at least one visible child.
pub const GROUP_COLOR: &str = "transparent";

/// Color of the lowest value in the range.
pub const GRADIENT_LOW: RgbColor = RgbColor::new(237.0, 76.0, 95.0);
/// Color of the highest value in the range.
pub const GRADIENT_HIGH: RgbColor = RgbColor::new(122.0, 255.0, 115.0);

/// An RGB color, channels in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl RgbColor {
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Linear blend towards `other`, `t` in 0..=1.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
        }
    }

    pub fn to_css(self) -> String {
        format!("rgb({},{},{})", self.r.round(), self.g.round(), self.b.round())
    }
}

/// Min and max of the sampled color values, mapped onto a two-stop gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorRange {
    pub min: f64,
    pub max: f64,
    pub low: RgbColor,
    pub high: RgbColor,
}

impl Default for ColorRange {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            low: GRADIENT_LOW,
            high: GRADIENT_HIGH,
        }
    }
}

impl ColorRange {
    pub fn sample(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// A degenerate range maps everything to the middle of the gradient.
    pub fn color_for(&self, value: f64) -> RgbColor {
        let t = if self.max > self.min {
            ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
        } else {
            0.5
        };
        self.low.lerp(self.high, t)
    }
}
