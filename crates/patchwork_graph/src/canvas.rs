// SPDX-License-Identifier: MIT OR Apache-2.0
//! Interactive egui canvas for the session graph.
//!
//! Features:
//! - Pan/zoom navigation
//! - Node dragging, which raises the node
//! - Pad drag-to-link through the graph controller
//! - Rubberband link selection
//!
//! Interaction state lives in canvas units so the rubberband can be handed
//! to the selection engine as is.

use crate::controller::GraphController;
use crate::geometry::{Point, Rect as CanvasRect};
use crate::layout::{GraphLayout, NodeLayout, NODE_HEADER_HEIGHT};
use crate::model::{GraphModel, MediaType, NodeId, PadDirection, PadId};
use crate::selection::{self, Rubberband};
use egui::{Color32, Pos2, Rect, Stroke, Vec2};

/// Smallest zoom level
pub const MIN_ZOOM: f32 = 0.1;
/// Largest zoom level
pub const MAX_ZOOM: f32 = 5.0;

const PAD_RADIUS: f32 = 5.0;
const PAD_PADDING: f32 = 10.0;
const NODE_ROUNDING: f32 = 6.0;
const NODE_SHADOW_OFFSET: f32 = 3.0;
const LINK_THICKNESS: f32 = 2.5;
const LINK_SEGMENTS: usize = 32;
const GRID_SPACING: f32 = 20.0;

/// Canvas interaction mode
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum InteractionMode {
    /// Waiting for input
    #[default]
    Normal,
    /// Panning the view
    Panning,
    /// Moving a node
    DraggingNode {
        /// The node being moved
        node: NodeId,
        /// Pointer position relative to the node's corner
        grab_offset: Point,
    },
    /// Dragging a link out of a pad
    ConnectingPad {
        /// Pad the drag started on
        from: PadId,
        /// Pointer position (canvas units)
        current: Point,
    },
    /// Dragging out a selection rectangle
    Rubberband(Rubberband),
}

/// Canvas view state
#[derive(Debug, Clone)]
pub struct GraphCanvas {
    /// Current pan offset (canvas units)
    pub pan: Vec2,
    /// Current zoom level
    pub zoom: f32,
    /// Current interaction mode
    pub mode: InteractionMode,
    /// Show grid
    pub show_grid: bool,
    layout: GraphLayout,
    last_pointer: Pos2,
    last_rubberband: Option<CanvasRect>,
}

impl Default for GraphCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphCanvas {
    /// Create a canvas at the origin with no zoom
    pub fn new() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            mode: InteractionMode::Normal,
            show_grid: true,
            layout: GraphLayout::default(),
            last_pointer: Pos2::ZERO,
            last_rubberband: None,
        }
    }

    /// Layout used for the last frame
    pub fn layout(&self) -> &GraphLayout {
        &self.layout
    }

    /// Re-derive the layout after the graph changed
    pub fn refresh_layout(&mut self, graph: &GraphModel) {
        self.layout = GraphLayout::compute(graph);
    }

    /// Convert a screen position to canvas units
    pub fn screen_to_canvas(&self, screen_pos: Pos2, rect: Rect) -> Point {
        let center = rect.center();
        Point::new(
            f64::from((screen_pos.x - center.x) / self.zoom - self.pan.x),
            f64::from((screen_pos.y - center.y) / self.zoom - self.pan.y),
        )
    }

    /// Convert canvas units to a screen position
    pub fn canvas_to_screen(&self, point: Point, rect: Rect) -> Pos2 {
        let center = rect.center();
        Pos2::new(
            (point.x as f32 + self.pan.x) * self.zoom + center.x,
            (point.y as f32 + self.pan.y) * self.zoom + center.y,
        )
    }

    fn canvas_rect_to_screen(&self, canvas: &CanvasRect, rect: Rect) -> Rect {
        Rect::from_min_max(
            self.canvas_to_screen(canvas.min, rect),
            self.canvas_to_screen(canvas.max, rect),
        )
    }

    /// Multiply the zoom, keeping it within [`MIN_ZOOM`, `MAX_ZOOM`]
    pub fn zoom_by(&mut self, factor: f32) {
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Zoom by `factor` while the canvas point under `screen_pos` stays put
    pub fn zoom_at(&mut self, factor: f32, screen_pos: Pos2, rect: Rect) {
        let anchor = self.screen_to_canvas(screen_pos, rect);
        self.zoom_by(factor);
        let center = rect.center();
        self.pan = Vec2::new(
            (screen_pos.x - center.x) / self.zoom - anchor.x as f32,
            (screen_pos.y - center.y) / self.zoom - anchor.y as f32,
        );
    }

    /// Start moving a node; it is raised above every other node
    pub fn begin_node_drag<G: GraphController + ?Sized>(
        &mut self,
        graph: &mut G,
        node: NodeId,
        pointer: Point,
    ) -> bool {
        let Some(position) = graph.node(node).map(|n| n.position) else {
            return false;
        };
        graph.bring_node_to_front(node);
        self.mode = InteractionMode::DraggingNode {
            node,
            grab_offset: Point::new(pointer.x - position.x, pointer.y - position.y),
        };
        self.refresh_layout(graph.model());
        true
    }

    /// Move the dragged node under the pointer
    pub fn drag_node_to<G: GraphController + ?Sized>(&mut self, graph: &mut G, pointer: Point) {
        if let InteractionMode::DraggingNode { node, grab_offset } = self.mode {
            let position = Point::new(pointer.x - grab_offset.x, pointer.y - grab_offset.y);
            graph.set_node_position(node, position);
            self.refresh_layout(graph.model());
        }
    }

    /// Ask the controller for a link between two pads.
    ///
    /// Returns whether the request was accepted.
    pub fn connect_pads<G: GraphController + ?Sized>(
        &mut self,
        graph: &mut G,
        from: PadId,
        to: PadId,
    ) -> bool {
        match graph.request_link(from, to) {
            Ok(_) => {
                self.refresh_layout(graph.model());
                true
            }
            Err(e) => {
                tracing::debug!(from = %from, to = %to, "Link rejected: {}", e);
                false
            }
        }
    }

    /// Start a rubberband drag
    pub fn begin_rubberband(&mut self, at: Point) {
        self.mode = InteractionMode::Rubberband(Rubberband::new(at));
        self.last_rubberband = None;
    }

    /// Move the rubberband's free corner.
    ///
    /// Selection is only recomputed when the rectangle actually changed;
    /// returns the number of selected links in that case.
    pub fn update_rubberband<G: GraphController + ?Sized>(
        &mut self,
        graph: &mut G,
        to: Point,
    ) -> Option<usize> {
        let InteractionMode::Rubberband(mut band) = self.mode else {
            return None;
        };
        band.current = to;
        self.mode = InteractionMode::Rubberband(band);

        let rect = band.rect();
        if self.last_rubberband == Some(rect) {
            return None;
        }
        self.last_rubberband = Some(rect);
        Some(selection::update_selection(graph.model_mut(), &rect, &self.layout))
    }

    /// Finish whatever drag is in progress
    pub fn end_drag(&mut self) {
        self.mode = InteractionMode::Normal;
        self.last_rubberband = None;
    }

    /// Render the canvas and handle input
    pub fn ui<G: GraphController + ?Sized>(&mut self, ui: &mut egui::Ui, graph: &mut G) {
        let rect = ui.available_rect_before_wrap();
        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.refresh_layout(graph.model());
        self.handle_input(ui, &response, rect, graph);

        if self.show_grid {
            self.draw_grid(&painter, rect);
        }
        self.draw_nodes(&painter, rect, graph.model());
        self.draw_links(&painter, rect, graph.model());

        match self.mode {
            InteractionMode::ConnectingPad { from, current } => {
                self.draw_link_drag(&painter, rect, graph.model(), from, current);
            }
            InteractionMode::Rubberband(band) => {
                self.draw_rubberband(&painter, rect, &band);
            }
            _ => {}
        }

        self.draw_status_bar(&painter, rect, graph.model());
    }

    fn handle_input<G: GraphController + ?Sized>(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        rect: Rect,
        graph: &mut G,
    ) {
        let pointer = ui.input(|i| i.pointer.hover_pos().unwrap_or(self.last_pointer));
        let delta = pointer - self.last_pointer;
        self.last_pointer = pointer;
        let canvas_pos = self.screen_to_canvas(pointer, rect);

        // Zoom toward the pointer
        let scroll = ui.input(|i| i.raw_scroll_delta.y);
        if scroll != 0.0 && rect.contains(pointer) {
            self.zoom_at(1.0 + scroll * 0.001, pointer, rect);
        }

        match self.mode {
            InteractionMode::Normal => {
                if response.dragged_by(egui::PointerButton::Middle) {
                    self.mode = InteractionMode::Panning;
                } else if response.drag_started_by(egui::PointerButton::Primary) {
                    if let Some(pad) = self.layout.pad_at(canvas_pos) {
                        self.mode = InteractionMode::ConnectingPad {
                            from: pad,
                            current: canvas_pos,
                        };
                    } else if let Some(node) = self.layout.node_at(canvas_pos) {
                        self.begin_node_drag(graph, node, canvas_pos);
                    } else {
                        self.begin_rubberband(canvas_pos);
                    }
                } else if response.clicked() && self.layout.node_at(canvas_pos).is_none() {
                    selection::clear_selection(graph.model_mut());
                }
            }

            InteractionMode::Panning => {
                if response.dragged() {
                    self.pan += delta / self.zoom;
                }
                if response.drag_stopped() {
                    self.end_drag();
                }
            }

            InteractionMode::DraggingNode { .. } => {
                if response.dragged() {
                    self.drag_node_to(graph, canvas_pos);
                }
                if response.drag_stopped() {
                    self.end_drag();
                }
            }

            InteractionMode::ConnectingPad { from, .. } => {
                self.mode = InteractionMode::ConnectingPad {
                    from,
                    current: canvas_pos,
                };
                if response.drag_stopped() {
                    if let Some(target) = self.layout.pad_at(canvas_pos).filter(|p| *p != from) {
                        self.connect_pads(graph, from, target);
                    }
                    self.end_drag();
                }
            }

            InteractionMode::Rubberband(_) => {
                self.update_rubberband(graph, canvas_pos);
                if response.drag_stopped() {
                    self.end_drag();
                }
            }
        }
    }

    fn draw_grid(&self, painter: &egui::Painter, rect: Rect) {
        let spacing = GRID_SPACING * self.zoom;
        if spacing < 4.0 {
            return;
        }
        let color = Color32::from_rgba_unmultiplied(60, 60, 60, 100);
        let offset_x = (self.pan.x * self.zoom + rect.width() / 2.0).rem_euclid(spacing);
        let offset_y = (self.pan.y * self.zoom + rect.height() / 2.0).rem_euclid(spacing);

        let mut x = rect.left() + offset_x;
        while x < rect.right() {
            painter.line_segment(
                [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
                Stroke::new(1.0, color),
            );
            x += spacing;
        }

        let mut y = rect.top() + offset_y;
        while y < rect.bottom() {
            painter.line_segment(
                [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
                Stroke::new(1.0, color),
            );
            y += spacing;
        }
    }

    fn draw_nodes(&self, painter: &egui::Painter, rect: Rect, graph: &GraphModel) {
        let front = graph.front_node().map(|n| n.id);

        for layout in self.layout.nodes() {
            let Some(node) = graph.node(layout.node) else {
                continue;
            };

            let screen_rect = self.canvas_rect_to_screen(&layout.rect, rect);
            if !screen_rect.intersects(rect) {
                continue;
            }

            let rounding = NODE_ROUNDING * self.zoom;
            painter.rect_filled(
                screen_rect.translate(Vec2::splat(NODE_SHADOW_OFFSET)),
                rounding,
                Color32::from_rgba_unmultiplied(0, 0, 0, 60),
            );
            painter.rect_filled(screen_rect, rounding, Color32::from_rgb(45, 45, 48));

            let header_rect = Rect::from_min_size(
                screen_rect.min,
                Vec2::new(screen_rect.width(), NODE_HEADER_HEIGHT as f32 * self.zoom),
            );
            painter.rect_filled(
                header_rect,
                egui::Rounding {
                    nw: rounding,
                    ne: rounding,
                    sw: 0.0,
                    se: 0.0,
                },
                media_color(node.media_type).gamma_multiply(0.6),
            );
            painter.text(
                header_rect.center(),
                egui::Align2::CENTER_CENTER,
                &node.title,
                egui::FontId::proportional(12.0 * self.zoom),
                Color32::WHITE,
            );

            if front == Some(node.id) {
                painter.rect_stroke(
                    screen_rect,
                    rounding,
                    Stroke::new(1.0, Color32::from_gray(110)),
                );
            }

            self.draw_pads(painter, rect, graph, layout);
        }
    }

    fn draw_pads(&self, painter: &egui::Painter, rect: Rect, graph: &GraphModel, layout: &NodeLayout) {
        let radius = PAD_RADIUS * self.zoom;
        for (id, direction, pad_rect) in &layout.pads {
            let Some(pad) = graph.pad(*id) else {
                continue;
            };
            let (anchor, label_pos, align) = match direction {
                PadDirection::In => {
                    let anchor = self.canvas_to_screen(pad_rect.left_center(), rect);
                    (anchor, anchor + Vec2::new(PAD_PADDING * self.zoom, 0.0), egui::Align2::LEFT_CENTER)
                }
                PadDirection::Out => {
                    let anchor = self.canvas_to_screen(pad_rect.right_center(), rect);
                    (anchor, anchor - Vec2::new(PAD_PADDING * self.zoom, 0.0), egui::Align2::RIGHT_CENTER)
                }
            };

            painter.circle_filled(anchor, radius, media_color(pad.media_type));
            painter.circle_stroke(anchor, radius, Stroke::new(1.0, Color32::from_gray(30)));
            painter.text(
                label_pos,
                align,
                &pad.name,
                egui::FontId::proportional(10.0 * self.zoom),
                Color32::from_gray(200),
            );
        }
    }

    fn draw_links(&self, painter: &egui::Painter, rect: Rect, graph: &GraphModel) {
        for link in graph.links() {
            let Some(curve) = selection::curve_for_link(link, &self.layout) else {
                continue;
            };
            let color = if link.selected {
                Color32::WHITE
            } else {
                graph
                    .pad(link.out_pad_id)
                    .map_or(Color32::GRAY, |pad| media_color(pad.media_type))
            };
            let thickness = if link.selected {
                LINK_THICKNESS * 1.6
            } else {
                LINK_THICKNESS
            };

            let points: Vec<Pos2> = curve
                .sample(LINK_SEGMENTS)
                .into_iter()
                .map(|p| self.canvas_to_screen(p, rect))
                .collect();
            for pair in points.windows(2) {
                painter.line_segment([pair[0], pair[1]], Stroke::new(thickness * self.zoom, color));
            }
        }
    }

    fn draw_link_drag(
        &self,
        painter: &egui::Painter,
        rect: Rect,
        graph: &GraphModel,
        from: PadId,
        current: Point,
    ) {
        let Some(pad) = graph.pad(from) else {
            return;
        };
        let Some(anchor) = self.layout.node(pad.parent_id).and_then(|l| l.pad_anchor_point(from)) else {
            return;
        };
        let color = media_color(pad.media_type);
        let (start, end) = match pad.direction {
            PadDirection::Out => (anchor, current),
            PadDirection::In => (current, anchor),
        };
        let curve = selection::link_curve(
            &CanvasRect::from_corners(start, start),
            &CanvasRect::from_corners(end, end),
        );
        let points: Vec<Pos2> = curve
            .sample(LINK_SEGMENTS)
            .into_iter()
            .map(|p| self.canvas_to_screen(p, rect))
            .collect();
        for pair in points.windows(2) {
            painter.line_segment([pair[0], pair[1]], Stroke::new(LINK_THICKNESS * self.zoom, color));
        }
    }

    fn draw_rubberband(&self, painter: &egui::Painter, rect: Rect, band: &Rubberband) {
        let screen_rect = self.canvas_rect_to_screen(&band.rect(), rect);
        painter.rect_filled(
            screen_rect,
            0.0,
            Color32::from_rgba_unmultiplied(100, 150, 255, 30),
        );
        painter.rect_stroke(
            screen_rect,
            0.0,
            Stroke::new(1.0, Color32::from_rgb(100, 150, 255)),
        );
    }

    fn draw_status_bar(&self, painter: &egui::Painter, rect: Rect, graph: &GraphModel) {
        let selected = graph.links().filter(|l| l.selected).count();
        painter.text(
            Pos2::new(rect.left() + 5.0, rect.bottom() - 11.0),
            egui::Align2::LEFT_CENTER,
            format!(
                "Nodes: {} | Links: {} | Zoom: {:.0}% | Selected: {}",
                graph.node_count(),
                graph.link_count(),
                self.zoom * 100.0,
                selected,
            ),
            egui::FontId::proportional(11.0),
            Color32::from_gray(150),
        );
    }
}

/// Colour used for pads and links carrying a media type
pub fn media_color(media: MediaType) -> Color32 {
    match media {
        MediaType::Audio => Color32::from_rgb(100, 200, 100),
        MediaType::Video => Color32::from_rgb(100, 150, 255),
        MediaType::Midi => Color32::from_rgb(220, 90, 90),
        MediaType::MidiPassthrough => Color32::from_rgb(230, 160, 80),
        MediaType::Other => Color32::GRAY,
    }
}
