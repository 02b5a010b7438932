use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::NodeType;

/// node id
pub type NodeId = String;

/// Outcome of a single node in a run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeStatus {
    Success,
    Failed,
    Skipped,
}

/// Audit record for one dispatched (or skipped) node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NodeExecutionResult {
    pub node_id: NodeId,
    pub node_type: NodeType,
    pub status: NodeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// wall time in milliseconds
    #[serde(rename = "execution_time")]
    pub duration_ms: u64,
}

impl NodeExecutionResult {
    pub fn success(
        node_id: NodeId,
        node_type: NodeType,
        output: Value,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            node_id,
            node_type,
            status: NodeStatus::Success,
            output: Some(output),
            error_message: None,
            started_at,
            completed_at,
            duration_ms: millis_between(started_at, completed_at),
        }
    }

    pub fn failed(
        node_id: NodeId,
        node_type: NodeType,
        error: String,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            node_id,
            node_type,
            status: NodeStatus::Failed,
            output: None,
            error_message: Some(error),
            started_at,
            completed_at,
            duration_ms: millis_between(started_at, completed_at),
        }
    }

    /// Skipped nodes are recorded with zero duration.
    pub fn skipped(
        node_id: NodeId,
        node_type: NodeType,
    ) -> Self {
        let now = Utc::now();
        Self {
            node_id,
            node_type,
            status: NodeStatus::Skipped,
            output: None,
            error_message: None,
            started_at: now,
            completed_at: now,
            duration_ms: 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == NodeStatus::Failed
    }
}

pub(crate) fn millis_between(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> u64 {
    (end - start).num_milliseconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_success_duration() {
        let start = Utc::now();
        let end = start + Duration::milliseconds(42);
        let result = NodeExecutionResult::success("a".to_string(), NodeType::Http, json!({"ok": true}), start, end);
        assert_eq!(result.duration_ms, 42);
        assert_eq!(result.status, NodeStatus::Success);
    }

    #[test]
    fn test_skipped_has_zero_duration() {
        let result = NodeExecutionResult::skipped("b".to_string(), NodeType::Llm);
        assert_eq!(result.duration_ms, 0);
        assert_eq!(result.started_at, result.completed_at);
        assert!(result.output.is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let start = Utc::now();
        let result = NodeExecutionResult::failed("c".to_string(), NodeType::String, "boom".to_string(), start, start);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], json!("failed"));
        assert_eq!(value["node_type"], json!("string"));
        assert_eq!(value["error_message"], json!("boom"));
        assert_eq!(value["execution_time"], json!(0));
        assert!(value.get("output").is_none());
    }
}
