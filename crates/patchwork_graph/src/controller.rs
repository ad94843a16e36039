// SPDX-License-Identifier: MIT OR Apache-2.0
//! Controller abstraction between the graph and whoever feeds it.
//!
//! The canvas and the event bridge only talk to a [`GraphController`]. A
//! live session forwards link requests to the session server, while the
//! offline controller applies them to the model immediately.

use crate::bridge::{LinkRequest, LinkRequestSender};
use crate::geometry::Point;
use crate::model::{
    GraphModel, Link, LinkData, LinkId, LinkProposal, LinkProposalError, Links, MediaType,
    Node, NodeCategory, NodeData, NodeId, Nodes, ObjectId, Pad, PadData, PadDirection, PadId,
    Removed,
};

/// Operations shared by every graph owner.
///
/// Only the model accessors and [`request_link`](Self::request_link) are
/// required; everything else works on the model directly.
pub trait GraphController {
    /// Read access to the graph
    fn model(&self) -> &GraphModel;

    /// Write access to the graph
    fn model_mut(&mut self) -> &mut GraphModel;

    /// Ask for a link between two pads, given in either order.
    ///
    /// The link does not necessarily exist when this returns: a session
    /// controller only creates it once the server confirms it.
    fn request_link(&mut self, a: PadId, b: PadId) -> Result<LinkProposal, LinkProposalError>;

    /// Add a node
    fn add_node(&mut self, data: NodeData) -> Option<NodeId> {
        self.model_mut().add_node(data)
    }

    /// Add a pad to a live node
    fn add_pad(&mut self, data: PadData) -> Option<PadId> {
        self.model_mut().add_pad(data)
    }

    /// Add a link between live pads
    fn add_link(&mut self, data: LinkData) -> Option<LinkId> {
        self.model_mut().add_link(data)
    }

    /// Remove any object by id
    fn remove(&mut self, id: ObjectId) -> Option<Removed> {
        self.model_mut().remove(id)
    }

    /// Look up a node
    fn node(&self, id: NodeId) -> Option<&Node> {
        self.model().node(id)
    }

    /// Look up a pad
    fn pad(&self, id: PadId) -> Option<&Pad> {
        self.model().pad(id)
    }

    /// Look up a link
    fn link(&self, id: LinkId) -> Option<&Link> {
        self.model().link(id)
    }

    /// All nodes, back to front
    fn all_nodes(&self) -> Nodes<'_> {
        self.model().nodes()
    }

    /// All links
    fn all_links(&self) -> Links<'_> {
        self.model().links()
    }

    /// Raise a node above all others
    fn bring_node_to_front(&mut self, id: NodeId) -> bool {
        self.model_mut().bring_node_to_front(id)
    }

    /// Move a node on the canvas
    fn set_node_position(&mut self, id: NodeId, position: Point) -> bool {
        self.model_mut().set_node_position(id, position)
    }
}

/// Controller mirroring a live session.
///
/// Structural changes arrive through the event bridge; link requests are
/// sent back to the session and only show up once the server announces
/// the new link.
#[derive(Debug)]
pub struct SessionGraph {
    model: GraphModel,
    requests: LinkRequestSender,
}

impl SessionGraph {
    /// Create a controller around an existing model
    pub fn new(model: GraphModel, requests: LinkRequestSender) -> Self {
        Self { model, requests }
    }

    /// Consume the controller, keeping the model
    pub fn into_model(self) -> GraphModel {
        self.model
    }
}

impl GraphController for SessionGraph {
    fn model(&self) -> &GraphModel {
        &self.model
    }

    fn model_mut(&mut self) -> &mut GraphModel {
        &mut self.model
    }

    fn request_link(&mut self, a: PadId, b: PadId) -> Result<LinkProposal, LinkProposalError> {
        let proposal = self.model.propose_link(a, b)?;
        let request = LinkRequest::new(proposal);
        if self.requests.send(request) {
            tracing::info!(
                request = %request.request_id,
                out = %proposal.out_pad_id,
                input = %proposal.in_pad_id,
                "Link requested"
            );
        } else {
            tracing::warn!(
                out = %proposal.out_pad_id,
                input = %proposal.in_pad_id,
                "Session is gone, link request dropped"
            );
        }
        Ok(proposal)
    }
}

/// Controller without a session behind it.
///
/// Links are created locally with ids allocated past every id already in
/// use, so they can never collide with an existing object.
#[derive(Debug, Default)]
pub struct OfflineGraph {
    model: GraphModel,
}

impl OfflineGraph {
    /// Create a controller around an existing model
    pub fn new(model: GraphModel) -> Self {
        Self { model }
    }

    /// Two audio nodes, each with one output and one input pad
    pub fn sample() -> Self {
        let mut graph = Self::default();
        for (node, out_pad, in_pad) in [(1, 2, 3), (4, 5, 6)] {
            graph.add_node(NodeData {
                id: NodeId(node),
                title: format!("Sample {node}"),
                category: NodeCategory::Duplex,
                media_type: MediaType::Audio,
            });
            for (pad, direction, name) in [
                (out_pad, PadDirection::Out, "output"),
                (in_pad, PadDirection::In, "input"),
            ] {
                graph.add_pad(PadData {
                    id: PadId(pad),
                    parent_id: NodeId(node),
                    direction,
                    media_type: MediaType::Audio,
                    name: name.to_string(),
                });
            }
        }
        graph
    }

    fn next_local_id(&self) -> u32 {
        let nodes = self.model.nodes().map(|n| n.id.0);
        let pads = self.model.pads().map(|p| p.id.0);
        let links = self.model.links().map(|l| l.id.0);
        nodes.chain(pads).chain(links).max().map_or(1, |max| max + 1)
    }
}

impl GraphController for OfflineGraph {
    fn model(&self) -> &GraphModel {
        &self.model
    }

    fn model_mut(&mut self) -> &mut GraphModel {
        &mut self.model
    }

    fn request_link(&mut self, a: PadId, b: PadId) -> Result<LinkProposal, LinkProposalError> {
        let proposal = self.model.propose_link(a, b)?;
        let id = LinkId(self.next_local_id());
        self.model.add_link(LinkData {
            id,
            out_pad_id: proposal.out_pad_id,
            in_pad_id: proposal.in_pad_id,
        });
        tracing::debug!(link = %id, "Offline link created");
        Ok(proposal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::EventBridge;
    use crate::model::tests::sample_graph;

    #[test]
    fn test_offline_link_is_applied_immediately() {
        let mut graph = OfflineGraph::sample();
        let proposal = graph.request_link(PadId(6), PadId(2)).unwrap();
        assert_eq!(proposal.out_pad_id, PadId(2));
        assert_eq!(proposal.in_pad_id, PadId(6));

        let links: Vec<&Link> = graph.all_links().collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, LinkId(7));
        assert_eq!(links[0].out_pad_id, PadId(2));
    }

    #[test]
    fn test_offline_ids_do_not_collide() {
        let mut graph = OfflineGraph::sample();
        graph.request_link(PadId(2), PadId(6)).unwrap();
        graph.request_link(PadId(5), PadId(3)).unwrap();
        let ids: Vec<LinkId> = graph.all_links().map(|l| l.id).collect();
        assert_eq!(ids, vec![LinkId(7), LinkId(8)]);
    }

    #[test]
    fn test_rejected_request_changes_nothing() {
        let mut graph = OfflineGraph::sample();
        assert_eq!(
            graph.request_link(PadId(2), PadId(3)),
            Err(LinkProposalError::SameNode(NodeId(1)))
        );
        assert_eq!(graph.model().link_count(), 0);
    }

    #[test]
    fn test_session_request_goes_out_without_touching_the_model() {
        let (bridge, producer) = EventBridge::new();
        let mut graph = SessionGraph::new(sample_graph(), bridge.link_requests());

        graph.request_link(PadId(2), PadId(6)).unwrap();
        assert_eq!(graph.model().link_count(), 0);

        let pending = producer.take_link_requests();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].out_pad_id, PadId(2));
        assert_eq!(pending[0].in_pad_id, PadId(6));
    }

    #[test]
    fn test_session_request_survives_closed_session() {
        let (bridge, producer) = EventBridge::new();
        drop(producer);
        let mut graph = SessionGraph::new(sample_graph(), bridge.link_requests());
        assert!(graph.request_link(PadId(5), PadId(3)).is_ok());
    }

    #[test]
    fn test_controller_is_object_safe() {
        let mut offline = OfflineGraph::sample();
        let controller: &mut dyn GraphController = &mut offline;
        assert!(controller.bring_node_to_front(NodeId(1)));
        assert_eq!(controller.all_nodes().last().map(|n| n.id), Some(NodeId(1)));
    }
}
