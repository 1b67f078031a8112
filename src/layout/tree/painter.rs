//! Draws trees in an abstract coordinate system.
//!
//! The growing direction (gd) is the axis siblings are stacked along; the
//! opposite direction (od) the axis children nest along. Vertical trees
//! grow top to bottom ('packed': children hang under their parent's edge),
//! horizontal trees grow left to right ('even': each parent is centered
//! over the span of its children).

use crate::layout::LayoutConfig;
use crate::model::Dimensions;
use crate::tree::arena::{BoundingRect, NodeId, Tree};

/// A point in gd-od coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GdOd {
    pub gd: f64,
    pub od: f64,
}

/// A physical rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

/// Receives what the painter draws, in physical coordinates relative to
/// the layout box.
pub trait PaintSink {
    fn node(&mut self, node: NodeId, top: f64, left: f64);
    fn connector(&mut self, rect: PaintRect);
}

#[derive(Debug, Clone, Copy)]
pub struct TreePainter {
    vertical: bool,
    config: LayoutConfig,
}

impl TreePainter {
    pub fn new(vertical: bool, config: LayoutConfig) -> Self {
        Self { vertical, config }
    }

    /// Size of a rendering along gd.
    fn gd(&self, dims: Dimensions) -> f64 {
        if self.vertical {
            dims.height
        } else {
            dims.width
        }
    }

    /// Size of a rendering along od.
    fn od(&self, dims: Dimensions) -> f64 {
        if self.vertical {
            dims.width
        } else {
            dims.height
        }
    }

    /// Converts a gd-od extent into physical width and height.
    pub fn to_absolute(&self, rect: BoundingRect) -> Dimensions {
        if self.vertical {
            Dimensions::new(rect.od, rect.gd)
        } else {
            Dimensions::new(rect.gd, rect.od)
        }
    }

    /// Converts a physical top-left offset into gd-od.
    pub fn to_relative(&self, top: f64, left: f64) -> GdOd {
        if self.vertical {
            GdOd { gd: top, od: left }
        } else {
            GdOd { gd: left, od: top }
        }
    }

    /// Converts a gd-od point into a physical (top, left).
    fn to_physical(&self, p: GdOd) -> (f64, f64) {
        if self.vertical {
            (p.gd, p.od)
        } else {
            (p.od, p.gd)
        }
    }

    /// Where a node drawn at `offset` sits.
    fn node_origin(&self, offset: GdOd, dims: Dimensions, rect: BoundingRect) -> GdOd {
        let pad = self.config.tree_padding;
        if self.vertical {
            GdOd {
                gd: offset.gd + pad,
                od: offset.od,
            }
        } else {
            GdOd {
                gd: offset.gd + (rect.gd - self.gd(dims)) / 2.0,
                od: offset.od + pad,
            }
        }
    }

    /// Center of a node drawn at `offset`, where connectors attach.
    fn center(&self, offset: GdOd, dims: Dimensions, rect: BoundingRect) -> GdOd {
        let pad = self.config.tree_padding;
        if self.vertical {
            GdOd {
                gd: offset.gd + pad + self.gd(dims) / 2.0,
                od: offset.od + self.od(dims) / 2.0,
            }
        } else {
            GdOd {
                gd: offset.gd + rect.gd / 2.0,
                od: offset.od + pad + self.od(dims) / 2.0,
            }
        }
    }

    /// For every node below (and including) `node`, calculate its bounding
    /// rectangle in gd-od coordinates and store it on the node.
    pub fn bounding_rect(&self, tree: &mut Tree, node: NodeId, dims: &[Dimensions]) -> BoundingRect {
        let children: Vec<NodeId> = tree.children(node).collect();
        let mut childs_area = BoundingRect::default();
        for child in children {
            let child_rect = self.bounding_rect(tree, child, dims);
            childs_area.gd += child_rect.gd + self.config.tree_gutter;
            childs_area.od = childs_area.od.max(child_rect.od);
        }

        let own = dims[node.index()];
        let rect = BoundingRect {
            od: self.od(own) + childs_area.od + self.config.tree_nesting_gap + self.config.tree_padding,
            gd: self.gd(own).max(childs_area.gd) + self.config.tree_padding,
        };
        tree.get_mut(node).bounding = Some(rect);
        rect
    }

    /// Draw `node` at `offset`, then its children, connecting each to its
    /// parent. Bounding rects must have been computed.
    pub fn draw(&self, sink: &mut dyn PaintSink, tree: &Tree, node: NodeId, offset: GdOd, dims: &[Dimensions]) {
        self.draw_node(sink, tree, node, offset, None, dims);
    }

    fn draw_node(
        &self,
        sink: &mut dyn PaintSink,
        tree: &Tree,
        node: NodeId,
        offset: GdOd,
        parent: Option<(NodeId, GdOd)>,
        dims: &[Dimensions],
    ) {
        let own = dims[node.index()];
        let rect = tree.get(node).bounding.unwrap_or_default();
        let (top, left) = self.to_physical(self.node_origin(offset, own, rect));
        sink.node(node, top, left);

        if let Some((parent_node, parent_offset)) = parent {
            let parent_rect = tree.get(parent_node).bounding.unwrap_or_default();
            self.connect(
                sink,
                self.center(offset, own, rect),
                self.center(parent_offset, dims[parent_node.index()], parent_rect),
            );
        }

        // Renders all the children along the gd direction
        let mut progressive_gd = offset.gd;
        for child in tree.children(node) {
            let child_offset = GdOd {
                od: offset.od + self.od(own) + self.config.tree_nesting_gap,
                gd: progressive_gd,
            };
            self.draw_node(sink, tree, child, child_offset, Some((node, offset)), dims);
            progressive_gd += tree.get(child).bounding.unwrap_or_default().gd + self.config.tree_gutter;
        }
    }

    /// A connector is always two segments: one along gd from the parent's
    /// center, one along od into the child's center.
    fn connect(&self, sink: &mut dyn PaintSink, current: GdOd, parent: GdOd) {
        let thickness = self.config.connector_thickness;
        let gd_segment = (
            GdOd {
                gd: current.gd.min(parent.gd),
                od: parent.od,
            },
            GdOd {
                gd: (parent.gd - current.gd).abs(),
                od: thickness,
            },
        );
        let od_segment = (
            GdOd {
                gd: current.gd,
                od: parent.od.min(current.od),
            },
            GdOd {
                gd: thickness,
                od: (parent.od - current.od).abs(),
            },
        );
        for (origin, extent) in [gd_segment, od_segment] {
            let (top, left) = self.to_physical(origin);
            let (height, width) = self.to_physical(extent);
            sink.connector(PaintRect {
                top,
                left,
                width,
                height,
            });
        }
    }
}
