use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    runtime::ExecutionContext,
    utils,
    workflow::node::{NodeExecutionResult, NodeId, NodeStatus, millis_between},
};

/// Lifecycle of a run.
///
/// `Pending → Ordering → Running → (Succeeded | Failed | PartiallyFailed)`.
/// `Failed` means the run halted on a node failure; `PartiallyFailed` means
/// some nodes failed under `continue_on_error` and the run still went to the end.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunState {
    #[default]
    Pending,
    Ordering,
    Running,
    Succeeded,
    Failed,
    PartiallyFailed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed | RunState::PartiallyFailed)
    }
}

/// One execution of a workflow. Handed back to the caller once it is over.
#[derive(Debug, Clone)]
pub struct Run {
    pub id: String,
    pub workflow_id: String,
    pub state: RunState,
    pub input: Value,
    pub context: ExecutionContext,
    /// one entry per dispatched or skipped node, in dispatch order
    pub results: Vec<NodeExecutionResult>,
    pub final_output: Value,
    /// failure that halted the run
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_duration_ms: u64,
}

/// Caller-facing summary of a finished run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub output: Value,
    pub node_executions: Vec<NodeExecutionResult>,
    /// total wall time in milliseconds
    pub execution_time: u64,
}

impl Run {
    pub fn new(
        workflow_id: impl Into<String>,
        input: Value,
    ) -> Self {
        Self {
            id: utils::longid(),
            workflow_id: workflow_id.into(),
            state: RunState::Pending,
            context: ExecutionContext::new(input.clone()),
            input,
            results: Vec::new(),
            final_output: Value::Null,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
            total_duration_ms: 0,
        }
    }

    /// Result recorded for `nid`, if the node was reached.
    pub fn result(
        &self,
        nid: &str,
    ) -> Option<&NodeExecutionResult> {
        self.results.iter().find(|r| r.node_id == nid)
    }

    pub fn failed_nodes(&self) -> Vec<NodeId> {
        self.results.iter().filter(|r| r.status == NodeStatus::Failed).map(|r| r.node_id.clone()).collect()
    }

    pub fn skipped_nodes(&self) -> Vec<NodeId> {
        self.results.iter().filter(|r| r.status == NodeStatus::Skipped).map(|r| r.node_id.clone()).collect()
    }

    pub(crate) fn finish(
        &mut self,
        state: RunState,
        final_output: Value,
    ) {
        let now = Utc::now();
        self.state = state;
        self.final_output = final_output;
        self.completed_at = Some(now);
        self.total_duration_ms = millis_between(self.started_at, now);
    }

    pub fn output(&self) -> RunOutput {
        RunOutput {
            output: self.final_output.clone(),
            node_executions: self.results.clone(),
            execution_time: self.total_duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::NodeType;

    #[test]
    fn test_new_run_is_pending() {
        let run = Run::new("wf", json!({"q": 1}));
        assert_eq!(run.state, RunState::Pending);
        assert!(!run.state.is_terminal());
        assert_eq!(run.context.input(), &json!({"q": 1}));
        assert!(run.completed_at.is_none());
    }

    #[test]
    fn test_finish_and_output() {
        let mut run = Run::new("wf", json!({}));
        run.results.push(NodeExecutionResult::skipped("b".to_string(), NodeType::Llm));
        run.finish(RunState::Succeeded, json!({"done": true}));

        assert!(run.state.is_terminal());
        assert!(run.completed_at.is_some());
        assert_eq!(run.skipped_nodes(), vec!["b".to_string()]);
        assert!(run.failed_nodes().is_empty());

        let output = serde_json::to_value(run.output()).unwrap();
        assert_eq!(output["output"], json!({"done": true}));
        assert_eq!(output["node_executions"][0]["status"], json!("skipped"));
        assert!(output["execution_time"].is_u64());
    }

    #[test]
    fn test_state_names() {
        assert_eq!(RunState::PartiallyFailed.to_string(), "partially_failed");
        assert_eq!(serde_json::to_value(RunState::Failed).unwrap(), json!("failed"));
    }
}
