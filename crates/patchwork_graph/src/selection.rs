// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rubberband selection of links.
//!
//! Links are not straight lines, so a link counts as selected when the
//! rectangle's outline crosses its curve or when the rectangle swallows the
//! curve's bounding box whole.

use crate::geometry::{rect_contains, CubicBezier, Point, Rect};
use crate::model::{GraphModel, Link, LinkId, PadId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where pads are drawn.
///
/// Anchors belong to whoever lays the graph out, not to the model, and must
/// share a coordinate space with the selection rectangle.
pub trait AnchorSource {
    /// Rectangle occupied by a pad, if it is laid out
    fn pad_anchor(&self, pad: PadId) -> Option<Rect>;
}

impl AnchorSource for HashMap<PadId, Rect> {
    fn pad_anchor(&self, pad: PadId) -> Option<Rect> {
        self.get(&pad).copied()
    }
}

impl<A: AnchorSource + ?Sized> AnchorSource for &A {
    fn pad_anchor(&self, pad: PadId) -> Option<Rect> {
        (**self).pad_anchor(pad)
    }
}

/// The curve a link is drawn with.
///
/// It leaves the output pad from the middle of its right edge and enters the
/// input pad at the middle of its left edge, both control points pulled
/// horizontally by half the horizontal distance between the ends.
pub fn link_curve(out_anchor: &Rect, in_anchor: &Rect) -> CubicBezier {
    let start = out_anchor.right_center();
    let end = in_anchor.left_center();
    let pull = (start.x - end.x).abs() / 2.0;
    CubicBezier::new(
        start,
        Point::new(start.x + pull, start.y),
        Point::new(end.x - pull, end.y),
        end,
    )
}

/// Curve of a link from the anchors of its two pads
pub fn curve_for_link(link: &Link, anchors: &impl AnchorSource) -> Option<CubicBezier> {
    let out_anchor = anchors.pad_anchor(link.out_pad_id)?;
    let in_anchor = anchors.pad_anchor(link.in_pad_id)?;
    Some(link_curve(&out_anchor, &in_anchor))
}

/// Whether a rubberband rectangle selects a curve
pub fn curve_selected_by(rect: &Rect, curve: &CubicBezier) -> bool {
    rect.edges()
        .iter()
        .any(|&(l1, l2)| curve.intersects_segment(l1, l2))
        || rect_contains(rect, &curve.bounding_box())
}

/// Selection state every link should have for the given rectangle.
///
/// Links with an unlaid pad come out deselected.
pub fn compute_selection<'a>(
    links: impl IntoIterator<Item = &'a Link>,
    rect: &Rect,
    anchors: &impl AnchorSource,
) -> Vec<(LinkId, bool)> {
    links
        .into_iter()
        .map(|link| {
            let selected = curve_for_link(link, anchors)
                .is_some_and(|curve| curve_selected_by(rect, &curve));
            (link.id, selected)
        })
        .collect()
}

/// Recompute every link's selection flag and return how many are selected
pub fn update_selection(graph: &mut GraphModel, rect: &Rect, anchors: &impl AnchorSource) -> usize {
    let states = compute_selection(graph.links(), rect, anchors);
    let mut selected = 0;
    for (id, state) in states {
        graph.set_link_selected(id, state);
        selected += usize::from(state);
    }
    tracing::trace!(selected, "Selection updated");
    selected
}

/// Deselect every link
pub fn clear_selection(graph: &mut GraphModel) {
    for link in graph.links_mut() {
        link.selected = false;
    }
}

/// A rectangle being dragged out by the pointer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rubberband {
    /// Where the drag started
    pub start: Point,
    /// Where the pointer is now
    pub current: Point,
}

impl Rubberband {
    /// Start a drag at a point
    pub fn new(start: Point) -> Self {
        Self {
            start,
            current: start,
        }
    }

    /// The covered rectangle, whichever way the drag went
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.start, self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::{link, sample_graph};

    /// Pad rectangles for the sample graph with node 1 on the left
    fn anchors() -> HashMap<PadId, Rect> {
        HashMap::from([
            (PadId(2), Rect::from_origin_size(Point::new(90.0, 30.0), 90.0, 20.0)),
            (PadId(3), Rect::from_origin_size(Point::new(0.0, 30.0), 90.0, 20.0)),
            (PadId(5), Rect::from_origin_size(Point::new(390.0, 130.0), 90.0, 20.0)),
            (PadId(6), Rect::from_origin_size(Point::new(300.0, 130.0), 90.0, 20.0)),
        ])
    }

    #[test]
    fn test_link_curve_control_points() {
        let anchors = anchors();
        let curve = link_curve(&anchors[&PadId(2)], &anchors[&PadId(6)]);
        assert_eq!(
            curve.points(),
            [
                Point::new(180.0, 40.0),
                Point::new(240.0, 40.0),
                Point::new(240.0, 140.0),
                Point::new(300.0, 140.0),
            ]
        );
    }

    #[test]
    fn test_enclosing_rect_selects_link() {
        let mut graph = sample_graph();
        graph.add_link(link(7, 2, 6));

        let rect = Rect::from_corners(Point::new(80.0, 20.0), Point::new(400.0, 160.0));
        assert_eq!(update_selection(&mut graph, &rect, &anchors()), 1);
        assert!(graph.link(LinkId(7)).unwrap().selected);
    }

    #[test]
    fn test_disjoint_rect_deselects_link() {
        let mut graph = sample_graph();
        graph.add_link(link(7, 2, 6));
        graph.set_link_selected(LinkId(7), true);

        let rect = Rect::from_corners(Point::new(500.0, 300.0), Point::new(600.0, 400.0));
        assert_eq!(update_selection(&mut graph, &rect, &anchors()), 0);
        assert!(!graph.link(LinkId(7)).unwrap().selected);
    }

    #[test]
    fn test_rect_crossing_the_middle_selects_link() {
        let mut graph = sample_graph();
        graph.add_link(link(7, 2, 6));

        let rect = Rect::from_corners(Point::new(230.0, 0.0), Point::new(250.0, 200.0));
        assert_eq!(update_selection(&mut graph, &rect, &anchors()), 1);
    }

    #[test]
    fn test_rect_inside_the_bend_selects_nothing() {
        let mut graph = sample_graph();
        graph.add_link(link(7, 2, 6));

        // Below the curve's start, left of its bend
        let rect = Rect::from_corners(Point::new(185.0, 100.0), Point::new(200.0, 130.0));
        assert_eq!(update_selection(&mut graph, &rect, &anchors()), 0);
    }

    #[test]
    fn test_links_without_anchors_are_deselected() {
        let mut graph = sample_graph();
        graph.add_link(link(7, 2, 6));
        graph.set_link_selected(LinkId(7), true);

        let rect = Rect::from_corners(Point::new(-1000.0, -1000.0), Point::new(1000.0, 1000.0));
        let empty: HashMap<PadId, Rect> = HashMap::new();
        assert_eq!(update_selection(&mut graph, &rect, &empty), 0);
        assert!(!graph.link(LinkId(7)).unwrap().selected);
    }

    #[test]
    fn test_only_touched_links_selected() {
        let mut graph = sample_graph();
        graph.add_link(link(7, 2, 6));
        graph.add_link(link(8, 5, 3));

        let rect = Rect::from_corners(Point::new(230.0, 0.0), Point::new(250.0, 200.0));
        let states = compute_selection(graph.links(), &rect, &anchors());
        assert_eq!(states, vec![(LinkId(7), true), (LinkId(8), true)]);

        let rect = Rect::from_corners(Point::new(170.0, 30.0), Point::new(200.0, 50.0));
        let states = compute_selection(graph.links(), &rect, &anchors());
        assert_eq!(states, vec![(LinkId(7), true), (LinkId(8), false)]);
    }

    #[test]
    fn test_clear_selection() {
        let mut graph = sample_graph();
        graph.add_link(link(7, 2, 6));
        graph.set_link_selected(LinkId(7), true);
        clear_selection(&mut graph);
        assert!(graph.links().all(|l| !l.selected));
    }

    #[test]
    fn test_rubberband_rect_ignores_drag_direction() {
        let mut band = Rubberband::new(Point::new(100.0, 100.0));
        band.current = Point::new(20.0, 150.0);
        assert_eq!(
            band.rect(),
            Rect::from_corners(Point::new(20.0, 100.0), Point::new(100.0, 150.0))
        );
    }
}
