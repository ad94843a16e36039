// SPDX-License-Identifier: MIT OR Apache-2.0
//! Event bridge between the session thread and the graph owner.
//!
//! The session side reports objects through a [`SessionProducer`], which
//! parses registry records into [`SessionEvent`]s and queues them without
//! ever waiting on the consumer. The owning thread periodically calls
//! [`EventBridge::drain`], which applies everything queued at that moment
//! in FIFO order and then fires the change listeners once.
//!
//! Link requests travel the other way on a second queue.

use crate::controller::GraphController;
use crate::model::{
    LinkData, LinkId, LinkProposal, MediaType, NodeCategory, NodeData, NodeId, ObjectId,
    PadData, PadDirection, PadId,
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use uuid::Uuid;

/// Registry type name of nodes
pub const NODE_INTERFACE: &str = "PipeWire:Interface:Node";
/// Registry type name of ports
pub const PORT_INTERFACE: &str = "PipeWire:Interface:Port";
/// Registry type name of links
pub const LINK_INTERFACE: &str = "PipeWire:Interface:Link";

/// Property keys read from registry records
pub mod keys {
    /// Human readable node description
    pub const NODE_DESCRIPTION: &str = "node.description";
    /// Short node name
    pub const NODE_NICK: &str = "node.nick";
    /// Internal node name
    pub const NODE_NAME: &str = "node.name";
    /// Media class, e.g. `Audio/Sink`
    pub const MEDIA_CLASS: &str = "media.class";
    /// Owning node of a port
    pub const NODE_ID: &str = "node.id";
    /// `in` or `out`
    pub const PORT_DIRECTION: &str = "port.direction";
    /// Port alias
    pub const PORT_ALIAS: &str = "port.alias";
    /// Port name
    pub const PORT_NAME: &str = "port.name";
    /// DSP format of a port, e.g. `32 bit float mono audio`
    pub const FORMAT_DSP: &str = "format.dsp";
    /// Output port of a link
    pub const LINK_OUTPUT_PORT: &str = "link.output.port";
    /// Input port of a link
    pub const LINK_INPUT_PORT: &str = "link.input.port";
}

const UNNAMED_NODE: &str = "Unnamed node";
const UNNAMED_PORT: &str = "Unnamed port";

/// A raw object announcement from the session registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// Server-assigned id
    pub id: u32,
    /// Registry type name
    pub kind: String,
    /// String properties
    #[serde(default)]
    pub props: IndexMap<String, String>,
}

impl RegistryRecord {
    /// Create a record without properties
    pub fn new(id: u32, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            props: IndexMap::new(),
        }
    }

    /// Add a property
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    fn prop(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    fn first_prop(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.prop(name))
    }

    fn required_id(&self, key: &'static str) -> Result<u32, RecordError> {
        let value = self.prop(key).ok_or(RecordError::MissingProperty { id: self.id, key })?;
        value.trim().parse().map_err(|_| RecordError::InvalidNumber {
            id: self.id,
            key,
            value: value.to_string(),
        })
    }

    /// Classify the record by its registry type name
    pub fn object_kind(&self) -> ObjectKind {
        ObjectKind::from_type_name(&self.kind)
    }
}

/// Object classes the bridge cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A node
    Node,
    /// A port
    Port,
    /// A link
    Link,
    /// Anything else (clients, modules, devices...)
    Other,
}

impl ObjectKind {
    /// Map a registry type name
    pub fn from_type_name(name: &str) -> Self {
        match name {
            NODE_INTERFACE => Self::Node,
            PORT_INTERFACE => Self::Port,
            LINK_INTERFACE => Self::Link,
            _ => Self::Other,
        }
    }
}

/// A typed graph mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A node appeared
    NodeAdded(NodeData),
    /// A port appeared
    PortAdded(PadData),
    /// A link appeared
    LinkAdded(LinkData),
    /// Some object went away
    Removed(ObjectId),
}

/// A registry record that cannot be turned into an event
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// A required property is absent
    #[error("Object {id}: missing property '{key}'")]
    MissingProperty {
        /// Object id
        id: u32,
        /// Property key
        key: &'static str,
    },

    /// A required id property is not a number
    #[error("Object {id}: property '{key}' is not an id: '{value}'")]
    InvalidNumber {
        /// Object id
        id: u32,
        /// Property key
        key: &'static str,
        /// Offending value
        value: String,
    },

    /// `port.direction` is neither `in` nor `out`
    #[error("Port {id}: invalid direction '{value}'")]
    InvalidDirection {
        /// Port id
        id: u32,
        /// Offending value
        value: String,
    },
}

/// Turn a registry record into an event.
///
/// Returns `Ok(None)` for object kinds the graph does not track.
pub fn parse_record(record: &RegistryRecord) -> Result<Option<SessionEvent>, RecordError> {
    let event = match record.object_kind() {
        ObjectKind::Node => SessionEvent::NodeAdded(parse_node(record)),
        ObjectKind::Port => SessionEvent::PortAdded(parse_port(record)?),
        ObjectKind::Link => SessionEvent::LinkAdded(parse_link(record)?),
        ObjectKind::Other => return Ok(None),
    };
    Ok(Some(event))
}

fn parse_node(record: &RegistryRecord) -> NodeData {
    let title = record
        .first_prop(&[keys::NODE_DESCRIPTION, keys::NODE_NICK, keys::NODE_NAME])
        .unwrap_or(UNNAMED_NODE);
    let class = record.prop(keys::MEDIA_CLASS).unwrap_or_default();
    NodeData {
        id: NodeId(record.id),
        title: title.to_string(),
        category: category_from_media_class(class),
        media_type: media_type_from_media_class(class),
    }
}

fn parse_port(record: &RegistryRecord) -> Result<PadData, RecordError> {
    let parent_id = NodeId(record.required_id(keys::NODE_ID)?);
    let direction = match record.prop(keys::PORT_DIRECTION) {
        Some("in") => PadDirection::In,
        Some("out") => PadDirection::Out,
        Some(other) => {
            return Err(RecordError::InvalidDirection {
                id: record.id,
                value: other.to_string(),
            })
        }
        None => {
            return Err(RecordError::MissingProperty {
                id: record.id,
                key: keys::PORT_DIRECTION,
            })
        }
    };
    let name = record
        .first_prop(&[keys::PORT_ALIAS, keys::PORT_NAME])
        .unwrap_or(UNNAMED_PORT);
    Ok(PadData {
        id: PadId(record.id),
        parent_id,
        direction,
        media_type: media_type_from_format(record.prop(keys::FORMAT_DSP).unwrap_or_default()),
        name: name.to_string(),
    })
}

fn parse_link(record: &RegistryRecord) -> Result<LinkData, RecordError> {
    Ok(LinkData {
        id: LinkId(record.id),
        out_pad_id: PadId(record.required_id(keys::LINK_OUTPUT_PORT)?),
        in_pad_id: PadId(record.required_id(keys::LINK_INPUT_PORT)?),
    })
}

/// Node role from a `media.class` value such as `Audio/Sink`
pub fn category_from_media_class(class: &str) -> NodeCategory {
    if class.contains("Source") || class.contains("Stream/Output") {
        NodeCategory::Source
    } else if class.contains("Sink") || class.contains("Stream/Input") {
        NodeCategory::Sink
    } else if class.contains("Duplex") {
        NodeCategory::Duplex
    } else {
        NodeCategory::Other
    }
}

/// Media type from a `media.class` value
pub fn media_type_from_media_class(class: &str) -> MediaType {
    if class.contains("Audio") {
        MediaType::Audio
    } else if class.contains("Video") {
        MediaType::Video
    } else if class.contains("Midi") {
        MediaType::Midi
    } else {
        MediaType::Other
    }
}

/// Media type from a `format.dsp` value, ignoring case
pub fn media_type_from_format(format: &str) -> MediaType {
    let format = format.to_ascii_lowercase();
    if format.contains("midi") && format.contains("passthrough") {
        MediaType::MidiPassthrough
    } else if format.contains("midi") || format.contains("ump") {
        MediaType::Midi
    } else if format.contains("audio") {
        MediaType::Audio
    } else if format.contains("video") {
        MediaType::Video
    } else {
        MediaType::Other
    }
}

/// A request to the session to create a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRequest {
    /// Correlates log lines about the same request
    pub request_id: Uuid,
    /// Output side
    pub out_pad_id: PadId,
    /// Input side
    pub in_pad_id: PadId,
}

impl LinkRequest {
    /// Wrap a validated proposal under a fresh request id
    pub fn new(proposal: LinkProposal) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            out_pad_id: proposal.out_pad_id,
            in_pad_id: proposal.in_pad_id,
        }
    }
}

/// Snapshot of the bridge counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Events pushed by the producer
    pub queued: u64,
    /// Events that changed the graph
    pub applied: u64,
    /// Records rejected by the parser
    pub dropped_malformed: u64,
    /// Events that referenced unknown or duplicate objects
    pub ignored_dangling: u64,
    /// Non-empty drains
    pub batches: u64,
}

/// Counters shared by both sides.
///
/// Plain atomics: reading statistics on one side never holds up the other.
#[derive(Debug, Default)]
struct BridgeCounters {
    queued: AtomicU64,
    applied: AtomicU64,
    dropped_malformed: AtomicU64,
    ignored_dangling: AtomicU64,
    batches: AtomicU64,
}

impl BridgeCounters {
    fn add(counter: &AtomicU64, amount: u64) {
        counter.fetch_add(amount, Ordering::Release);
    }

    // Consumer counters are loaded before `queued`, so a snapshot never
    // shows more handled events than queued ones.
    fn snapshot(&self) -> BridgeStats {
        let applied = self.applied.load(Ordering::Acquire);
        let ignored_dangling = self.ignored_dangling.load(Ordering::Acquire);
        let batches = self.batches.load(Ordering::Acquire);
        BridgeStats {
            queued: self.queued.load(Ordering::Acquire),
            applied,
            dropped_malformed: self.dropped_malformed.load(Ordering::Acquire),
            ignored_dangling,
            batches,
        }
    }
}

/// Sending half of the link request queue
#[derive(Debug, Clone)]
pub struct LinkRequestSender {
    sender: Sender<LinkRequest>,
}

impl LinkRequestSender {
    /// Queue a request; returns `false` if the session side is gone
    pub fn send(&self, request: LinkRequest) -> bool {
        self.sender.send(request).is_ok()
    }
}

/// Session side of the bridge
#[derive(Debug, Clone)]
pub struct SessionProducer {
    events: Sender<SessionEvent>,
    pending: Arc<AtomicUsize>,
    requests: Arc<Mutex<Receiver<LinkRequest>>>,
    counters: Arc<BridgeCounters>,
}

impl SessionProducer {
    /// Registry callback: an object appeared.
    ///
    /// Untracked kinds are skipped and malformed records are logged and
    /// dropped, so the caller never has to handle an error.
    pub fn global(&self, record: &RegistryRecord) {
        match parse_record(record) {
            Ok(Some(event)) => self.push(event),
            Ok(None) => {
                tracing::trace!(id = record.id, kind = %record.kind, "Skipping untracked object");
            }
            Err(e) => {
                tracing::warn!("Dropping malformed record: {}", e);
                BridgeCounters::add(&self.counters.dropped_malformed, 1);
            }
        }
    }

    /// Registry callback: an object went away
    pub fn global_remove(&self, id: u32) {
        self.push(SessionEvent::Removed(ObjectId(id)));
    }

    /// Queue an already typed event.
    ///
    /// Never blocks: the queue is unbounded and the counters are atomics.
    pub fn push(&self, event: SessionEvent) {
        // Counted before sending so the consumer cannot handle an event
        // that is not yet counted as queued.
        BridgeCounters::add(&self.counters.queued, 1);
        if self.events.send(event).is_err() {
            self.counters.queued.fetch_sub(1, Ordering::Release);
            tracing::debug!("Graph owner is gone, event dropped");
            return;
        }
        self.pending.fetch_add(1, Ordering::Release);
    }

    /// Link requests sent by the graph owner since the last call
    pub fn take_link_requests(&self) -> Vec<LinkRequest> {
        self.requests.lock().try_iter().collect()
    }

    /// Snapshot of the bridge counters
    pub fn stats(&self) -> BridgeStats {
        self.counters.snapshot()
    }
}

/// Outcome of one [`EventBridge::drain`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Events taken off the queue
    pub drained: usize,
    /// Events that changed the graph
    pub applied: usize,
    /// Events that were no-ops
    pub ignored: usize,
}

impl DrainReport {
    /// Whether anything was taken off the queue
    pub fn is_empty(&self) -> bool {
        self.drained == 0
    }
}

type ChangeListener = Box<dyn FnMut() + Send>;

/// Consumer side of the bridge, owned by the graph's thread
pub struct EventBridge {
    events: Receiver<SessionEvent>,
    pending: Arc<AtomicUsize>,
    requests: Sender<LinkRequest>,
    counters: Arc<BridgeCounters>,
    listeners: Vec<ChangeListener>,
}

impl std::fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBridge")
            .field("pending", &self.pending.load(Ordering::Acquire))
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl EventBridge {
    /// Create the consumer together with its session side
    pub fn new() -> (Self, SessionProducer) {
        let (event_tx, event_rx) = channel();
        let (request_tx, request_rx) = channel();
        let pending = Arc::new(AtomicUsize::new(0));
        let counters = Arc::new(BridgeCounters::default());

        let producer = SessionProducer {
            events: event_tx,
            pending: Arc::clone(&pending),
            requests: Arc::new(Mutex::new(request_rx)),
            counters: Arc::clone(&counters),
        };
        let bridge = Self {
            events: event_rx,
            pending,
            requests: request_tx,
            counters,
            listeners: Vec::new(),
        };
        (bridge, producer)
    }

    /// A handle for sending link requests to the session
    pub fn link_requests(&self) -> LinkRequestSender {
        LinkRequestSender {
            sender: self.requests.clone(),
        }
    }

    /// Register a callback fired once after every non-empty drain
    pub fn on_changed(&mut self, listener: impl FnMut() + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Number of events waiting to be drained
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Snapshot of the bridge counters
    pub fn stats(&self) -> BridgeStats {
        self.counters.snapshot()
    }

    /// Apply every event queued so far.
    ///
    /// Events pushed while the drain runs wait for the next call, so a
    /// busy producer cannot keep the owner thread here forever.
    pub fn drain<G: GraphController + ?Sized>(&mut self, graph: &mut G) -> DrainReport {
        let budget = self.pending.load(Ordering::Acquire);
        let mut report = DrainReport::default();

        while report.drained < budget {
            let Ok(event) = self.events.try_recv() else {
                break;
            };
            report.drained += 1;
            if apply_event(graph, event) {
                report.applied += 1;
            } else {
                report.ignored += 1;
            }
        }

        if report.is_empty() {
            return report;
        }

        self.pending.fetch_sub(report.drained, Ordering::AcqRel);
        BridgeCounters::add(&self.counters.applied, report.applied as u64);
        BridgeCounters::add(&self.counters.ignored_dangling, report.ignored as u64);
        BridgeCounters::add(&self.counters.batches, 1);

        tracing::debug!(
            drained = report.drained,
            applied = report.applied,
            ignored = report.ignored,
            "Session batch applied"
        );
        for listener in &mut self.listeners {
            listener();
        }
        report
    }
}

fn apply_event<G: GraphController + ?Sized>(graph: &mut G, event: SessionEvent) -> bool {
    match event {
        SessionEvent::NodeAdded(data) => graph.add_node(data).is_some(),
        SessionEvent::PortAdded(data) => graph.add_pad(data).is_some(),
        SessionEvent::LinkAdded(data) => graph.add_link(data).is_some(),
        SessionEvent::Removed(id) => graph.remove(id).is_some(),
    }
}
