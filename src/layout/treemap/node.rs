use crate::layout::LayoutConfig;
use crate::model::Dimensions;
use crate::tree::arena::NodeId;

/// A point in layout box coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
}

/// A tree node bound to its share of pixels for one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeMapNode {
    pub node: NodeId,
    /// Target area in square pixels
    pub area: f64,
    pub hidden: bool,
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl TreeMapNode {
    /// `weight` is the aggregated attribute value, `area_ratio` the square
    /// pixels per unit of weight at this level.
    pub fn new(node: NodeId, weight: f64, area_ratio: f64) -> Self {
        let area = weight * area_ratio;
        Self {
            node,
            area: if area.is_nan() || area < 0.0 { 0.0 } else { area },
            hidden: false,
            top: 0.0,
            left: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn place(&mut self, top: f64, left: f64, width: f64, height: f64) {
        self.top = top;
        self.left = left;
        self.width = width;
        self.height = height;
    }

    /// Room left inside this node for its children. Zero when the node is
    /// hidden or too small, which in turn hides every child.
    pub fn nested_bounds(&self, config: &LayoutConfig) -> Dimensions {
        let width = self.width - config.treemap_padding;
        let height = self.height - config.treemap_padding - config.treemap_header_height;
        if self.hidden || width < config.treemap_min_nested_size || height < config.treemap_min_nested_size {
            Dimensions::default()
        } else {
            Dimensions::new(width, height)
        }
    }

    /// Top-left corner of the nested bounds.
    pub fn nested_anchor(&self, config: &LayoutConfig) -> Anchor {
        let half_padding = config.treemap_padding / 2.0;
        Anchor {
            x: self.left + half_padding,
            y: self.top + half_padding + config.treemap_header_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unusable_weights_become_zero_area() {
        assert_eq!(TreeMapNode::new(NodeId(1), 2.0, 3.0).area, 6.0);
        assert_eq!(TreeMapNode::new(NodeId(1), -2.0, 3.0).area, 0.0);
        assert_eq!(TreeMapNode::new(NodeId(1), f64::NAN, 3.0).area, 0.0);
    }

    #[test]
    fn nesting_keeps_a_border_and_header() {
        let config = LayoutConfig::default();
        let mut node = TreeMapNode::new(NodeId(1), 1.0, 1.0);
        node.place(100.0, 10.0, 60.0, 50.0);
        assert_eq!(node.nested_bounds(&config), Dimensions::new(56.0, 31.0));
        assert_eq!(node.nested_anchor(&config), Anchor { x: 12.0, y: 117.0 });

        node.place(100.0, 10.0, 60.0, 38.0);
        assert_eq!(node.nested_bounds(&config), Dimensions::default());
        node.place(100.0, 10.0, 60.0, 50.0);
        node.hidden = true;
        assert_eq!(node.nested_bounds(&config), Dimensions::default());
    }
}
