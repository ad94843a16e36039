// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scripted media session.
//!
//! Stands in for the session server: a thread replays a list of registry
//! announcements through a [`SessionProducer`] and answers link requests
//! by announcing the new link, like a real server would.

use crate::settings::{read_ron, SettingsError};
use indexmap::IndexMap;
use patchwork_graph::bridge::{keys, LINK_INTERFACE, NODE_INTERFACE, PORT_INTERFACE};
use patchwork_graph::{RegistryRecord, SessionProducer};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long the session thread naps between link request checks
const IDLE_INTERVAL: Duration = Duration::from_millis(1);

/// One step of a session script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScriptStep {
    /// Announce an object: id, registry type, properties
    Global(u32, String, IndexMap<String, String>),
    /// Retract an object
    Remove(u32),
    /// Pause, in milliseconds
    Sleep(u64),
}

/// A sequence of registry announcements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionScript {
    /// Steps in order
    pub steps: Vec<ScriptStep>,
}

impl SessionScript {
    /// Load a script from a RON file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        read_ron(path)
    }

    /// Two audio nodes with one output and one input pad each, the output
    /// of the first linked to the input of the second
    pub fn demo() -> Self {
        let props = |pairs: &[(&str, &str)]| -> IndexMap<String, String> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        let audio = "32 bit float mono audio";

        let mut steps = Vec::new();
        for (node, out_pad, in_pad, name) in [(1, 2, 3, "Demo Source"), (4, 5, 6, "Demo Sink")] {
            steps.push(ScriptStep::Global(
                node,
                NODE_INTERFACE.to_string(),
                props(&[(keys::NODE_DESCRIPTION, name), (keys::MEDIA_CLASS, "Audio/Duplex")]),
            ));
            for (pad, direction, port_name) in [(out_pad, "out", "output_MONO"), (in_pad, "in", "input_MONO")] {
                let parent = node.to_string();
                steps.push(ScriptStep::Global(
                    pad,
                    PORT_INTERFACE.to_string(),
                    props(&[
                        (keys::NODE_ID, parent.as_str()),
                        (keys::PORT_DIRECTION, direction),
                        (keys::PORT_NAME, port_name),
                        (keys::FORMAT_DSP, audio),
                    ]),
                ));
            }
        }
        steps.push(ScriptStep::Sleep(5));
        steps.push(ScriptStep::Global(
            7,
            LINK_INTERFACE.to_string(),
            props(&[(keys::LINK_OUTPUT_PORT, "2"), (keys::LINK_INPUT_PORT, "6")]),
        ));
        Self { steps }
    }

    /// Highest object id announced by the script
    pub fn max_id(&self) -> u32 {
        self.steps
            .iter()
            .filter_map(|step| match step {
                ScriptStep::Global(id, _, _) | ScriptStep::Remove(id) => Some(*id),
                ScriptStep::Sleep(_) => None,
            })
            .max()
            .unwrap_or(0)
    }
}

/// Handle to a running scripted session
#[derive(Debug)]
pub struct SessionHandle {
    thread: JoinHandle<u32>,
    stop: Arc<AtomicBool>,
    script_done: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Whether every script step has been sent
    pub fn script_done(&self) -> bool {
        self.script_done.load(Ordering::Acquire)
    }

    /// Stop answering link requests and wait for the thread.
    ///
    /// Returns the number of links the session created on request.
    pub fn stop(self) -> u32 {
        self.stop.store(true, Ordering::Release);
        match self.thread.join() {
            Ok(created) => created,
            Err(_) => {
                tracing::error!("Session thread panicked");
                0
            }
        }
    }
}

/// Replay a script on a new thread
pub fn spawn(script: SessionScript, producer: SessionProducer) -> SessionHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let script_done = Arc::new(AtomicBool::new(false));
    let thread = {
        let stop = Arc::clone(&stop);
        let script_done = Arc::clone(&script_done);
        thread::spawn(move || {
            let mut session = ScriptedSession {
                next_id: script.max_id() + 1,
                created: 0,
                producer,
            };
            session.replay(&script);
            script_done.store(true, Ordering::Release);
            tracing::info!(steps = script.steps.len(), "Session script finished");

            while !stop.load(Ordering::Acquire) {
                session.answer_link_requests();
                thread::sleep(IDLE_INTERVAL);
            }
            session.answer_link_requests();
            session.created
        })
    };
    SessionHandle {
        thread,
        stop,
        script_done,
    }
}

struct ScriptedSession {
    next_id: u32,
    created: u32,
    producer: SessionProducer,
}

impl ScriptedSession {
    fn replay(&mut self, script: &SessionScript) {
        for step in &script.steps {
            self.answer_link_requests();
            match step {
                ScriptStep::Global(id, kind, props) => {
                    let record = RegistryRecord {
                        id: *id,
                        kind: kind.clone(),
                        props: props.clone(),
                    };
                    self.producer.global(&record);
                }
                ScriptStep::Remove(id) => self.producer.global_remove(*id),
                ScriptStep::Sleep(ms) => thread::sleep(Duration::from_millis(*ms)),
            }
        }
    }

    fn answer_link_requests(&mut self) {
        for request in self.producer.take_link_requests() {
            let id = self.next_id;
            self.next_id += 1;
            self.created += 1;
            tracing::info!(
                request = %request.request_id,
                link = id,
                out = %request.out_pad_id,
                input = %request.in_pad_id,
                "Session created link"
            );
            let record = RegistryRecord::new(id, LINK_INTERFACE)
                .with_prop(keys::LINK_OUTPUT_PORT, request.out_pad_id.to_string())
                .with_prop(keys::LINK_INPUT_PORT, request.in_pad_id.to_string());
            self.producer.global(&record);
        }
    }
}
