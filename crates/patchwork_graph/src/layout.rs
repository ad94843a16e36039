// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node and pad placement in canvas units.
//!
//! A node is a fixed-width box with a header. Input pads stack down the
//! left half, output pads down the right half, one row each in arrival
//! order.

use crate::geometry::{Point, Rect};
use crate::model::{GraphModel, Node, NodeId, Pad, PadDirection, PadId};
use crate::selection::AnchorSource;
use std::collections::HashMap;

/// Node box width
pub const NODE_WIDTH: f64 = 180.0;
/// Height of the title strip
pub const NODE_HEADER_HEIGHT: f64 = 24.0;
/// Height of one pad row
pub const PAD_HEIGHT: f64 = 22.0;
/// Space below the last pad row
pub const NODE_FOOTER_HEIGHT: f64 = 8.0;

/// Box of one node and of each of its pads
#[derive(Debug, Clone, PartialEq)]
pub struct NodeLayout {
    /// Node id
    pub node: NodeId,
    /// The whole node box
    pub rect: Rect,
    /// The title strip
    pub header: Rect,
    /// Pad rectangles in arrival order
    pub pads: Vec<(PadId, PadDirection, Rect)>,
}

impl NodeLayout {
    /// Lay out a node and its pads
    pub fn new<'a>(node: &Node, pads: impl IntoIterator<Item = &'a Pad>) -> Self {
        let origin = node.position;
        let half = NODE_WIDTH / 2.0;

        let mut rows = [0usize; 2];
        let pads: Vec<_> = pads
            .into_iter()
            .map(|pad| {
                let (column, x) = match pad.direction {
                    PadDirection::In => (0, origin.x),
                    PadDirection::Out => (1, origin.x + half),
                };
                let y = origin.y + NODE_HEADER_HEIGHT + rows[column] as f64 * PAD_HEIGHT;
                rows[column] += 1;
                (pad.id, pad.direction, Rect::from_origin_size(Point::new(x, y), half, PAD_HEIGHT))
            })
            .collect();

        let row_count = rows[0].max(rows[1]) as f64;
        let height = NODE_HEADER_HEIGHT + row_count * PAD_HEIGHT + NODE_FOOTER_HEIGHT;

        Self {
            node: node.id,
            rect: Rect::from_origin_size(origin, NODE_WIDTH, height),
            header: Rect::from_origin_size(origin, NODE_WIDTH, NODE_HEADER_HEIGHT),
            pads,
        }
    }

    /// Rectangle of one of this node's pads
    pub fn pad_rect(&self, pad: PadId) -> Option<Rect> {
        self.pads.iter().find(|(id, _, _)| *id == pad).map(|(_, _, rect)| *rect)
    }

    /// Where links attach to a pad: left edge for inputs, right edge for outputs
    pub fn pad_anchor_point(&self, pad: PadId) -> Option<Point> {
        let (_, direction, rect) = self.pads.iter().find(|(id, _, _)| *id == pad)?;
        Some(match direction {
            PadDirection::In => rect.left_center(),
            PadDirection::Out => rect.right_center(),
        })
    }
}

/// Layout of a whole graph, computed in one pass.
///
/// It owns its data so the model can be mutated while the layout is in use.
#[derive(Debug, Clone, Default)]
pub struct GraphLayout {
    nodes: Vec<NodeLayout>,
    anchors: HashMap<PadId, Rect>,
}

impl GraphLayout {
    /// Lay out every node of a graph
    pub fn compute(graph: &GraphModel) -> Self {
        let nodes: Vec<NodeLayout> = graph
            .nodes()
            .map(|node| NodeLayout::new(node, graph.pads_of(node.id)))
            .collect();
        let anchors = nodes
            .iter()
            .flat_map(|layout| layout.pads.iter().map(|(id, _, rect)| (*id, *rect)))
            .collect();
        Self { nodes, anchors }
    }

    /// Node layouts, back to front
    pub fn nodes(&self) -> &[NodeLayout] {
        &self.nodes
    }

    /// Layout of one node
    pub fn node(&self, id: NodeId) -> Option<&NodeLayout> {
        self.nodes.iter().find(|layout| layout.node == id)
    }

    /// Topmost node under a point
    pub fn node_at(&self, point: Point) -> Option<NodeId> {
        self.nodes
            .iter()
            .rev()
            .find(|layout| layout.rect.contains_point(point))
            .map(|layout| layout.node)
    }

    /// Pad under a point, looking at the topmost node first
    pub fn pad_at(&self, point: Point) -> Option<PadId> {
        self.nodes.iter().rev().find_map(|layout| {
            if !layout.rect.contains_point(point) {
                return None;
            }
            layout
                .pads
                .iter()
                .find(|(_, _, rect)| rect.contains_point(point))
                .map(|(id, _, _)| *id)
        })
    }

    /// Pad rectangles keyed by pad id
    pub fn anchors(&self) -> &HashMap<PadId, Rect> {
        &self.anchors
    }
}

impl AnchorSource for GraphLayout {
    fn pad_anchor(&self, pad: PadId) -> Option<Rect> {
        self.anchors.get(&pad).copied()
    }
}
