// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory mirror of the session graph: nodes, pads and links.
//!
//! Identifiers are assigned by the session server and are only unique
//! within one entity class, so each class gets its own id newtype.

use crate::geometry::Point;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! session_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for ObjectId {
            fn from(id: $name) -> Self {
                ObjectId(id.0)
            }
        }
    };
}

/// Id of any session object whose class is not known yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

session_id!(
    /// Server-assigned node identifier
    NodeId
);
session_id!(
    /// Server-assigned pad (port) identifier
    PadId
);
session_id!(
    /// Server-assigned link identifier
    LinkId
);

/// Role of a node in the routing graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Produces media (capture device, playback stream)
    Source,
    /// Consumes media (output device, recording stream)
    Sink,
    /// Both produces and consumes media
    Duplex,
    /// Anything else
    #[default]
    Other,
}

/// Media carried by a node or pad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MediaType {
    /// Audio samples
    Audio,
    /// Video frames
    Video,
    /// MIDI events
    Midi,
    /// MIDI routed through without interpretation
    MidiPassthrough,
    /// Unknown or unsupported media
    #[default]
    Other,
}

/// Pad direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PadDirection {
    /// Input pad
    In,
    /// Output pad
    Out,
}

impl PadDirection {
    /// The direction a pad must have to be linked with this one
    pub fn opposite(self) -> Self {
        match self {
            Self::In => Self::Out,
            Self::Out => Self::In,
        }
    }
}

/// Payload describing a node that appeared in the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Node id
    pub id: NodeId,
    /// Display title
    pub title: String,
    /// Node role
    pub category: NodeCategory,
    /// Media handled by the node
    pub media_type: MediaType,
}

/// Payload describing a pad that appeared in the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadData {
    /// Pad id
    pub id: PadId,
    /// Id of the node owning the pad
    pub parent_id: NodeId,
    /// Pad direction
    pub direction: PadDirection,
    /// Media carried by the pad
    pub media_type: MediaType,
    /// Display name
    pub name: String,
}

/// Payload describing a link that appeared in the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkData {
    /// Link id
    pub id: LinkId,
    /// Output side
    pub out_pad_id: PadId,
    /// Input side
    pub in_pad_id: PadId,
}

/// A routing endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node id
    pub id: NodeId,
    /// Display title
    pub title: String,
    /// Node role
    pub category: NodeCategory,
    /// Media handled by the node
    pub media_type: MediaType,
    /// Top-left corner on the canvas
    pub position: Point,
}

/// A directional connection point on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    /// Pad id
    pub id: PadId,
    /// Owning node
    pub parent_id: NodeId,
    /// Pad direction
    pub direction: PadDirection,
    /// Media carried by the pad
    pub media_type: MediaType,
    /// Display name
    pub name: String,
}

/// A connection from an output pad to an input pad
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Link id
    pub id: LinkId,
    /// Output side
    pub out_pad_id: PadId,
    /// Input side
    pub in_pad_id: PadId,
    /// Presentation-only rubberband state
    pub selected: bool,
}

impl Link {
    /// Whether either end of the link is the given pad
    pub fn involves_pad(&self, pad: PadId) -> bool {
        self.out_pad_id == pad || self.in_pad_id == pad
    }
}

/// Placement of newly arriving nodes.
///
/// Each node lands at `next`, then `next` moves diagonally by `step` so
/// consecutive nodes do not cover each other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutCursor {
    /// Position for the next node
    pub next: Point,
    /// Diagonal advance after each placement
    pub step: f64,
}

impl LayoutCursor {
    /// Start placing nodes at `origin`
    pub fn new(origin: Point, step: f64) -> Self {
        Self { next: origin, step }
    }

    /// Take the current position and advance
    pub fn advance(&mut self) -> Point {
        let position = self.next;
        self.next = Point::new(self.next.x + self.step, self.next.y + self.step);
        position
    }
}

impl Default for LayoutCursor {
    fn default() -> Self {
        Self::new(Point::ZERO, 50.0)
    }
}

/// Nodes in z-order, back to front
pub type Nodes<'a> = indexmap::map::Values<'a, NodeId, Node>;

/// Links in arrival order
pub type Links<'a> = indexmap::map::Values<'a, LinkId, Link>;

/// What a call to [`GraphModel::remove`] took out of the graph
#[derive(Debug, Clone, PartialEq)]
pub enum Removed {
    /// A link
    Link(Link),
    /// A pad, with the links that were attached to it
    Pad {
        /// The pad itself
        pad: Pad,
        /// Links dropped along with it
        links: Vec<Link>,
    },
    /// A node, with its pads and their links
    Node {
        /// The node itself
        node: Node,
        /// Pads dropped along with it
        pads: Vec<Pad>,
        /// Links dropped along with them
        links: Vec<Link>,
    },
}

/// A validated, oriented link proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkProposal {
    /// Output side
    pub out_pad_id: PadId,
    /// Input side
    pub in_pad_id: PadId,
}

/// Why a proposed link was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkProposalError {
    /// One of the pads is not in the graph
    #[error("Pad not found: {0}")]
    PadNotFound(PadId),

    /// Both pads point the same way
    #[error("Pads {0} and {1} have the same direction")]
    SameDirection(PadId, PadId),

    /// The pads carry different media
    #[error("Media type mismatch: {out:?} -> {input:?}")]
    MediaMismatch {
        /// Media of the output pad
        out: MediaType,
        /// Media of the input pad
        input: MediaType,
    },

    /// Both pads belong to the same node
    #[error("Pads belong to the same node {0}")]
    SameNode(NodeId),

    /// The pads are already linked
    #[error("Pads already linked by link {0}")]
    AlreadyLinked(LinkId),
}

/// The session graph.
///
/// Node order doubles as z-order: the last node is drawn last and is the
/// front node. The model has a single writer; the event bridge and the UI
/// both mutate it from the owning thread.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    nodes: IndexMap<NodeId, Node>,
    pads: IndexMap<PadId, Pad>,
    links: IndexMap<LinkId, Link>,
    layout: LayoutCursor,
}

impl GraphModel {
    /// Create an empty graph with the default layout cursor
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph placing nodes with the given cursor
    pub fn with_layout(layout: LayoutCursor) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    /// The layout cursor used for the next node
    pub fn layout(&self) -> &LayoutCursor {
        &self.layout
    }

    /// Add a node at the layout cursor.
    ///
    /// Returns `None` if a node with the same id is already live.
    pub fn add_node(&mut self, data: NodeData) -> Option<NodeId> {
        if self.nodes.contains_key(&data.id) {
            tracing::warn!(node = %data.id, "Ignoring duplicate node");
            return None;
        }
        let position = self.layout.advance();
        let node = Node {
            id: data.id,
            title: data.title,
            category: data.category,
            media_type: data.media_type,
            position,
        };
        tracing::debug!(node = %node.id, title = %node.title, "Node added");
        self.nodes.insert(node.id, node);
        Some(data.id)
    }

    /// Add a pad to a live node.
    ///
    /// Returns `None` when the parent node is unknown or the id is taken.
    pub fn add_pad(&mut self, data: PadData) -> Option<PadId> {
        if !self.nodes.contains_key(&data.parent_id) {
            tracing::debug!(pad = %data.id, parent = %data.parent_id, "Dropping pad of unknown node");
            return None;
        }
        if self.pads.contains_key(&data.id) {
            tracing::warn!(pad = %data.id, "Ignoring duplicate pad");
            return None;
        }
        let pad = Pad {
            id: data.id,
            parent_id: data.parent_id,
            direction: data.direction,
            media_type: data.media_type,
            name: data.name,
        };
        tracing::debug!(pad = %pad.id, parent = %pad.parent_id, name = %pad.name, "Pad added");
        self.pads.insert(pad.id, pad);
        Some(data.id)
    }

    /// Add a link between two live pads.
    ///
    /// Links reported by the server are not checked for media compatibility,
    /// only that both pads exist and point the right way.
    pub fn add_link(&mut self, data: LinkData) -> Option<LinkId> {
        if self.links.contains_key(&data.id) {
            tracing::warn!(link = %data.id, "Ignoring duplicate link");
            return None;
        }
        let out_ok = self
            .pads
            .get(&data.out_pad_id)
            .is_some_and(|p| p.direction == PadDirection::Out);
        let in_ok = self
            .pads
            .get(&data.in_pad_id)
            .is_some_and(|p| p.direction == PadDirection::In);
        if !(out_ok && in_ok) {
            tracing::debug!(
                link = %data.id,
                out = %data.out_pad_id,
                input = %data.in_pad_id,
                "Dropping link with unknown or misdirected pads"
            );
            return None;
        }
        self.links.insert(
            data.id,
            Link {
                id: data.id,
                out_pad_id: data.out_pad_id,
                in_pad_id: data.in_pad_id,
                selected: false,
            },
        );
        tracing::debug!(link = %data.id, "Link added");
        Some(data.id)
    }

    /// Remove whatever object has this id.
    ///
    /// Removing a node also removes its pads, and removing a pad also
    /// removes every link attached to it. Unknown ids are a no-op.
    pub fn remove(&mut self, id: impl Into<ObjectId>) -> Option<Removed> {
        let ObjectId(raw) = id.into();

        if let Some(link) = self.links.shift_remove(&LinkId(raw)) {
            tracing::debug!(link = raw, "Link removed");
            return Some(Removed::Link(link));
        }

        if let Some(pad) = self.pads.shift_remove(&PadId(raw)) {
            let links = self.drain_links(|l| l.involves_pad(pad.id));
            tracing::debug!(pad = raw, links = links.len(), "Pad removed");
            return Some(Removed::Pad { pad, links });
        }

        if let Some(node) = self.nodes.shift_remove(&NodeId(raw)) {
            let pad_ids: Vec<PadId> = self
                .pads
                .values()
                .filter(|p| p.parent_id == node.id)
                .map(|p| p.id)
                .collect();
            let pads: Vec<Pad> = pad_ids
                .iter()
                .filter_map(|id| self.pads.shift_remove(id))
                .collect();
            let links = self.drain_links(|l| pad_ids.iter().any(|p| l.involves_pad(*p)));
            tracing::debug!(node = raw, pads = pads.len(), links = links.len(), "Node removed");
            return Some(Removed::Node { node, pads, links });
        }

        tracing::debug!(id = raw, "Remove of unknown object ignored");
        None
    }

    fn drain_links(&mut self, mut pred: impl FnMut(&Link) -> bool) -> Vec<Link> {
        let mut drained = Vec::new();
        self.links.retain(|_, link| {
            if pred(link) {
                drained.push(link.clone());
                false
            } else {
                true
            }
        });
        drained
    }

    /// Get a node by id
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a pad by id
    pub fn pad(&self, id: PadId) -> Option<&Pad> {
        self.pads.get(&id)
    }

    /// Get a link by id
    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    /// Nodes in z-order, back to front
    pub fn nodes(&self) -> Nodes<'_> {
        self.nodes.values()
    }

    /// All pads in arrival order
    pub fn pads(&self) -> impl Iterator<Item = &Pad> {
        self.pads.values()
    }

    /// All links in arrival order
    pub fn links(&self) -> Links<'_> {
        self.links.values()
    }

    /// Mutable access to every link, for presentation state
    pub fn links_mut(&mut self) -> impl Iterator<Item = &mut Link> {
        self.links.values_mut()
    }

    /// Pads of a node in arrival order
    pub fn pads_of(&self, node: NodeId) -> impl Iterator<Item = &Pad> {
        self.pads.values().filter(move |p| p.parent_id == node)
    }

    /// Links attached to a pad
    pub fn links_of_pad(&self, pad: PadId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.involves_pad(pad))
    }

    /// The node drawn on top, if any
    pub fn front_node(&self) -> Option<&Node> {
        self.nodes.values().last()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of pads
    pub fn pad_count(&self) -> usize {
        self.pads.len()
    }

    /// Number of links
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Whether the graph holds no nodes at all
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Move a node to the end of the z-order, keeping everyone else's order.
    ///
    /// Returns `false` if the node is unknown.
    pub fn bring_node_to_front(&mut self, id: NodeId) -> bool {
        let Some(index) = self.nodes.get_index_of(&id) else {
            return false;
        };
        let last = self.nodes.len() - 1;
        self.nodes.move_index(index, last);
        true
    }

    /// Move a node on the canvas
    pub fn set_node_position(&mut self, id: NodeId, position: Point) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    /// Set the rubberband state of one link
    pub fn set_link_selected(&mut self, id: LinkId, selected: bool) -> bool {
        match self.links.get_mut(&id) {
            Some(link) => {
                link.selected = selected;
                true
            }
            None => false,
        }
    }

    /// Validate a link the user wants to draw between two pads.
    ///
    /// The pads may be given in either order; the result is oriented
    /// output → input.
    pub fn propose_link(&self, a: PadId, b: PadId) -> Result<LinkProposal, LinkProposalError> {
        let pad_a = self.pads.get(&a).ok_or(LinkProposalError::PadNotFound(a))?;
        let pad_b = self.pads.get(&b).ok_or(LinkProposalError::PadNotFound(b))?;

        if pad_a.direction == pad_b.direction {
            return Err(LinkProposalError::SameDirection(a, b));
        }

        let (out, input) = match pad_a.direction {
            PadDirection::Out => (pad_a, pad_b),
            PadDirection::In => (pad_b, pad_a),
        };

        if out.media_type != input.media_type {
            return Err(LinkProposalError::MediaMismatch {
                out: out.media_type,
                input: input.media_type,
            });
        }

        if out.parent_id == input.parent_id {
            return Err(LinkProposalError::SameNode(out.parent_id));
        }

        if let Some(existing) = self
            .links
            .values()
            .find(|l| l.out_pad_id == out.id && l.in_pad_id == input.id)
        {
            return Err(LinkProposalError::AlreadyLinked(existing.id));
        }

        Ok(LinkProposal {
            out_pad_id: out.id,
            in_pad_id: input.id,
        })
    }
}
