use serde::Serialize;

use crate::workflow::node::NodeId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEvent {
    Started(WorkflowStartedEvent),
    Succeeded,
    PartiallyFailed(WorkflowPartiallyFailedEvent),
    Failed(WorkflowFailedEvent),
}

impl WorkflowEvent {
    pub fn str(&self) -> &str {
        match self {
            WorkflowEvent::Started(_) => "Running",
            WorkflowEvent::Succeeded => "Succeeded",
            WorkflowEvent::PartiallyFailed(_) => "PartiallyFailed",
            WorkflowEvent::Failed(_) => "Failed",
        }
    }
}

/// Event emitted when a run starts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowStartedEvent {
    /// Nodes in dispatch order
    pub node_ids: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowFailedEvent {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowPartiallyFailedEvent {
    pub failed_nodes: Vec<NodeId>,
}
