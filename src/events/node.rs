use serde::Serialize;

/// Node state changes. Timestamps are unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeEvent {
    Running(i64),
    Succeeded(i64),
    Failed(String),
    Skipped,
}

impl NodeEvent {
    pub fn str(&self) -> &str {
        match self {
            NodeEvent::Running(_) => "Running",
            NodeEvent::Succeeded(_) => "Succeeded",
            NodeEvent::Failed(_) => "Failed",
            NodeEvent::Skipped => "Skipped",
        }
    }
}
