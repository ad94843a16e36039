// SPDX-License-Identifier: MIT OR Apache-2.0
//! Session graph mirror for Patchwork.
//!
//! This crate keeps an in-memory copy of a live media routing session
//! (nodes, their pads and the links between pads) and provides:
//! - A thread-safe event bridge from the session's callback thread
//! - Cubic Bézier geometry for drawing links
//! - Rubberband selection of curved links
//! - An egui canvas to view and edit the graph
//!
//! ## Architecture
//!
//! The session reports objects through a [`SessionProducer`]. The thread
//! that owns the [`GraphModel`] drains the [`EventBridge`] on a fixed
//! cadence and redraws once per batch. Everything that mutates the graph
//! goes through a [`GraphController`], which also decides what happens
//! when the user draws a new link.

pub mod bridge;
pub mod canvas;
pub mod controller;
pub mod geometry;
pub mod layout;
pub mod model;
pub mod selection;

pub use bridge::{
    parse_record, BridgeStats, DrainReport, EventBridge, LinkRequest, RecordError,
    RegistryRecord, SessionEvent, SessionProducer,
};
pub use canvas::GraphCanvas;
pub use controller::{GraphController, OfflineGraph, SessionGraph};
pub use geometry::{CubicBezier, Point, Rect};
pub use layout::GraphLayout;
pub use model::{
    GraphModel, LayoutCursor, Link, LinkId, LinkProposalError, MediaType, Node, NodeCategory,
    NodeId, ObjectId, Pad, PadDirection, PadId,
};
pub use selection::{AnchorSource, Rubberband};
