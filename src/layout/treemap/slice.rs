//! Squarified slicing of one treemap level.
//!
//! Nodes are taken largest first and accumulated into a slice spanning one
//! side of the remaining box. A node that would worsen the slice's aspect
//! ratio closes it instead; the next slice runs perpendicular, in what is
//! left of the box.

use super::node::{Anchor, TreeMapNode};
use crate::model::Dimensions;

/// The axis a slice accumulates nodes along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceDirection {
    /// Nodes side by side, left to right
    Horizontal,
    /// Nodes stacked top to bottom
    Vertical,
}

/// Where one node of a slice ends up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Hidden before drawing (no area)
    Hidden,
    /// Rounds to an empty rectangle
    TooSmall,
    Rect {
        top: f64,
        left: f64,
        width: f64,
        height: f64,
    },
}

/// A linear run of nodes along a fixed pixel length. The span (thickness)
/// grows as nodes are added.
#[derive(Debug, Clone)]
pub struct Slice {
    length: f64,
    direction: SliceDirection,
    anchor: Anchor,
    nodes: Vec<TreeMapNode>,
    area: f64,
    min_area: f64,
}

impl Slice {
    pub fn new(length: f64, direction: SliceDirection, anchor: Anchor) -> Self {
        Self {
            length,
            direction,
            anchor,
            nodes: Vec::new(),
            area: 0.0,
            min_area: f64::MAX,
        }
    }

    pub fn direction(&self) -> SliceDirection {
        self.direction
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn nodes(&self) -> &[TreeMapNode] {
        &self.nodes
    }

    pub fn add(&mut self, node: TreeMapNode) {
        self.area += node.area;
        self.min_area = self.min_area.min(node.area);
        self.nodes.push(node);
    }

    pub fn span(&self) -> f64 {
        self.area / self.length
    }

    /// Aspect ratio of the smallest node, optionally as if a node of
    /// `candidate` area had been added. Always >= 1.
    pub fn aspect_ratio(&self, candidate: Option<f64>) -> f64 {
        let (min_area, span) = match candidate {
            Some(area) => (self.min_area.min(area), (self.area + area) / self.length),
            None => (self.min_area, self.span()),
        };
        let ratio = min_area / (span * span);
        if ratio < 1.0 {
            1.0 / ratio
        } else {
            ratio
        }
    }

    /// Positions of every node, offset by `delta`. Each node advances the
    /// cursor by its rounded length.
    pub fn placements(&self, delta: Anchor) -> Vec<Placement> {
        let mut top = self.anchor.y + delta.y;
        let mut left = self.anchor.x + delta.x;
        let exact_span = self.span();
        let span = exact_span.round();

        let mut out = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if node.hidden {
                out.push(Placement::Hidden);
                continue;
            }
            let length = node.area / exact_span;
            let rounded = length.round();
            if !rounded.is_finite() || rounded == 0.0 || span == 0.0 {
                // too small to be displayed on screen
                out.push(Placement::TooSmall);
            } else {
                let (width, height) = match self.direction {
                    SliceDirection::Horizontal => (rounded, span),
                    SliceDirection::Vertical => (span, rounded),
                };
                out.push(Placement::Rect {
                    top: top.round(),
                    left: left.round(),
                    width,
                    height,
                });
            }
            if rounded.is_finite() {
                match self.direction {
                    SliceDirection::Horizontal => left += rounded,
                    SliceDirection::Vertical => top += rounded,
                }
            }
        }
        out
    }
}

/// Splits `bounds` among `nodes`, which must come sorted by area, largest
/// first. Nodes with no area are hidden and never close a slice.
pub fn squarify(nodes: Vec<TreeMapNode>, bounds: Dimensions) -> Vec<Slice> {
    let mut slices = Vec::new();
    let mut nodes = nodes.into_iter();
    let Some(mut first) = nodes.next() else {
        return slices;
    };

    let mut remainder = bounds;
    let mut current = if bounds.width < bounds.height {
        Slice::new(bounds.width, SliceDirection::Horizontal, Anchor::default())
    } else {
        Slice::new(bounds.height, SliceDirection::Vertical, Anchor::default())
    };
    first.hidden = first.area <= 0.0;
    current.add(first);

    for mut node in nodes {
        if node.area <= 0.0 {
            node.hidden = true;
            current.add(node);
            continue;
        }

        if current.aspect_ratio(Some(node.area)) > current.aspect_ratio(None) {
            let span = current.span();
            let anchor = current.anchor();
            let next = match current.direction() {
                SliceDirection::Horizontal => {
                    remainder.height -= span;
                    Slice::new(
                        remainder.height,
                        SliceDirection::Vertical,
                        Anchor {
                            x: anchor.x,
                            y: anchor.y + span,
                        },
                    )
                }
                SliceDirection::Vertical => {
                    remainder.width -= span;
                    Slice::new(
                        remainder.width,
                        SliceDirection::Horizontal,
                        Anchor {
                            x: anchor.x + span,
                            y: anchor.y,
                        },
                    )
                }
            };
            slices.push(std::mem::replace(&mut current, next));
        }
        current.add(node);
    }
    slices.push(current);
    slices
}
