//! Event types for workflow runs.
//!
//! Events are broadcast while a run progresses so that subscribers can follow
//! node state changes without waiting for the final [`Run`](crate::Run).

mod node;
mod workflow;

pub use node::*;
pub use workflow::*;

use serde::Serialize;

use crate::workflow::node::NodeId;

/// Top-level event type for workflow graph events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scope", content = "event", rename_all = "snake_case")]
pub enum GraphEvent {
    /// Run-level events (started, succeeded, failed, ...).
    Workflow(WorkflowEvent),
    /// Node-level events (running, succeeded, failed, skipped).
    Node(NodeEvent),
}

/// Event message carrying run and node context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    /// Run that generated this event.
    pub run_id: String,
    /// Node that generated this event (empty for run events).
    pub nid: NodeId,
    /// The actual event data.
    pub event: GraphEvent,
}

impl Message {
    pub fn workflow(
        run_id: &str,
        event: WorkflowEvent,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            nid: String::new(),
            event: GraphEvent::Workflow(event),
        }
    }

    pub fn node(
        run_id: &str,
        nid: &str,
        event: NodeEvent,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            nid: nid.to_string(),
            event: GraphEvent::Node(event),
        }
    }
}

impl GraphEvent {
    /// Whether this event closes a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GraphEvent::Workflow(WorkflowEvent::Succeeded | WorkflowEvent::PartiallyFailed(_) | WorkflowEvent::Failed(_)))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, GraphEvent::Workflow(WorkflowEvent::Failed(_)))
    }
}
