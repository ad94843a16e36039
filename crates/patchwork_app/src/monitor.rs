// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless session monitor.
//!
//! Owns the graph, polls the event bridge on a fixed cadence and logs every
//! batch. Once the session script has played out it issues the configured
//! link requests, waits for the session to announce them, and finally
//! applies the configured rubberband selection.

use crate::session::{self, SessionScript};
use crate::settings::{MonitorSettings, SettingsError};
use patchwork_graph::selection::update_selection;
use patchwork_graph::{
    BridgeStats, EventBridge, GraphController, GraphLayout, GraphModel, LinkId, PadId,
    SessionGraph,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How long to wait for the session before giving up on a phase
const PHASE_TIMEOUT: Duration = Duration::from_secs(5);

/// What the monitor saw
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorReport {
    /// Nodes in the final graph
    pub nodes: usize,
    /// Pads in the final graph
    pub pads: usize,
    /// Links in the final graph
    pub links: usize,
    /// Links selected by the configured rubberband
    pub selected: Vec<LinkId>,
    /// Change notifications received
    pub changes: u64,
    /// Links the session created on request
    pub created_on_request: u32,
    /// Bridge counters at shutdown
    pub stats: BridgeStats,
}

/// Run the monitor until the session script is exhausted
pub fn run(settings: &MonitorSettings) -> Result<MonitorReport, SettingsError> {
    let script = match &settings.script {
        Some(path) => {
            tracing::info!("Loading session script {}", path.display());
            SessionScript::load(path)?
        }
        None => {
            tracing::info!("No session script configured, playing the demo session");
            SessionScript::demo()
        }
    };

    let (mut bridge, producer) = EventBridge::new();
    let changes = Arc::new(AtomicU64::new(0));
    {
        let changes = Arc::clone(&changes);
        bridge.on_changed(move || {
            changes.fetch_add(1, Ordering::Relaxed);
        });
    }

    let model = GraphModel::with_layout(settings.layout.cursor());
    let mut graph = SessionGraph::new(model, bridge.link_requests());
    let session = session::spawn(script, producer);
    let interval = settings.poll_interval();

    // Phase 1: mirror the scripted session
    let deadline = Instant::now() + PHASE_TIMEOUT;
    loop {
        let done = session.script_done();
        poll(&mut bridge, &mut graph);
        if (done && bridge.pending() == 0) || Instant::now() > deadline {
            break;
        }
        thread::sleep(interval);
    }

    // Phase 2: ask the session for links
    let mut expected = graph.model().link_count();
    for &(a, b) in &settings.connect {
        match graph.request_link(PadId(a), PadId(b)) {
            Ok(_) => expected += 1,
            Err(e) => tracing::warn!("Cannot link pads {} and {}: {}", a, b, e),
        }
    }
    let deadline = Instant::now() + PHASE_TIMEOUT;
    while graph.model().link_count() < expected && Instant::now() < deadline {
        thread::sleep(interval);
        poll(&mut bridge, &mut graph);
    }

    let created_on_request = session.stop();
    poll(&mut bridge, &mut graph);

    // Phase 3: rubberband
    let selected = match settings.selection {
        Some(rect) => {
            let layout = GraphLayout::compute(graph.model());
            update_selection(graph.model_mut(), &rect, &layout);
            let selected: Vec<LinkId> = graph.all_links().filter(|l| l.selected).map(|l| l.id).collect();
            tracing::info!(?selected, "Rubberband applied");
            selected
        }
        None => Vec::new(),
    };

    let model = graph.model();
    Ok(MonitorReport {
        nodes: model.node_count(),
        pads: model.pad_count(),
        links: model.link_count(),
        selected,
        changes: changes.load(Ordering::Relaxed),
        created_on_request,
        stats: bridge.stats(),
    })
}

fn poll(bridge: &mut EventBridge, graph: &mut SessionGraph) {
    let report = bridge.drain(graph);
    if report.is_empty() {
        return;
    }
    let model = graph.model();
    tracing::info!(
        applied = report.applied,
        ignored = report.ignored,
        nodes = model.node_count(),
        pads = model.pad_count(),
        links = model.link_count(),
        "Graph changed"
    );
    for node in model.nodes() {
        tracing::trace!(node = %node.id, title = %node.title, x = node.position.x, y = node.position.y, "Node");
    }
}
