//! Runtime edges and conditional routing.
//!
//! An edge may carry an [`EdgeCondition`]; the condition is evaluated against
//! the output of the edge's source node once that node has produced one.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    model::{ConditionKind, EdgeCondition, EdgeModel},
    workflow::node::NodeId,
};

/// Unique identifier for an edge within a workflow.
pub type EdgeId = String;

/// Field read by `intent_match` when the condition names none.
const DEFAULT_INTENT_FIELD: &str = "intent";

/// Runtime edge representation connecting two nodes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Edge {
    /// Unique edge identifier.
    pub id: EdgeId,
    /// ID of the source node.
    pub source: NodeId,
    /// ID of the target node.
    pub target: NodeId,
    /// Optional routing predicate.
    pub condition: Option<EdgeCondition>,
}

impl From<&EdgeModel> for Edge {
    fn from(model: &EdgeModel) -> Self {
        Self {
            id: model.id.clone(),
            source: model.source.clone(),
            target: model.target.clone(),
            condition: model.condition.clone(),
        }
    }
}

impl Edge {
    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }

    /// Whether this edge lets its target fire, given the source node's output.
    /// Unconditioned edges always pass.
    pub fn is_satisfied_by(
        &self,
        source_output: &Value,
    ) -> bool {
        let Some(condition) = &self.condition else {
            return true;
        };
        let matched = evaluate(condition, source_output);
        debug!(edge_id = %self.id, kind = condition.kind.as_ref(), matched, "edge condition evaluated");
        matched
    }
}

/// Evaluate a condition against a node output.
pub fn evaluate(
    condition: &EdgeCondition,
    output: &Value,
) -> bool {
    match condition.kind {
        ConditionKind::IntentMatch => {
            let field = condition.field.as_deref().unwrap_or(DEFAULT_INTENT_FIELD);
            field_value(output, field) == &condition.value
        }
        ConditionKind::FieldEquals => match condition.field.as_deref() {
            Some(field) => field_value(output, field) == &condition.value,
            None => false,
        },
        ConditionKind::FieldContains => {
            let Some(field) = condition.field.as_deref() else {
                return false;
            };
            let haystack = text_of(field_value(output, field));
            haystack.contains(&text_of(&condition.value))
        }
        ConditionKind::Always => true,
        ConditionKind::Unknown => {
            warn!("unknown edge condition type, treating it as satisfied");
            true
        }
    }
}

fn field_value<'a>(
    output: &'a Value,
    field: &str,
) -> &'a Value {
    output.get(field).unwrap_or(&Value::Null)
}

/// Text used for containment checks. A missing field reads as the empty string.
fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        v => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn edge(condition: Option<EdgeCondition>) -> Edge {
        Edge {
            id: "e".to_string(),
            source: "a".to_string(),
            target: "b".to_string(),
            condition,
        }
    }

    #[test]
    fn test_unconditioned_edge_always_passes() {
        assert!(edge(None).is_satisfied_by(&json!(null)));
    }

    #[test]
    fn test_intent_match_defaults_to_intent_field() {
        let e = edge(Some(EdgeCondition::intent_match("weather")));
        assert!(e.is_satisfied_by(&json!({"intent": "weather"})));
        assert!(!e.is_satisfied_by(&json!({"intent": "music"})));
        assert!(!e.is_satisfied_by(&json!({"category": "weather"})));
    }

    #[test]
    fn test_intent_match_custom_field() {
        let mut cond = EdgeCondition::intent_match("weather");
        cond.field = Some("category".to_string());
        assert!(edge(Some(cond)).is_satisfied_by(&json!({"category": "weather"})));
    }

    #[test]
    fn test_field_equals_compares_json_values() {
        let e = edge(Some(EdgeCondition::field_equals("status_code", 200)));
        assert!(e.is_satisfied_by(&json!({"status_code": 200})));
        assert!(!e.is_satisfied_by(&json!({"status_code": "200"})));

        let e = edge(Some(EdgeCondition::field_equals("success", true)));
        assert!(e.is_satisfied_by(&json!({"success": true})));
    }

    #[test]
    fn test_field_contains() {
        let e = edge(Some(EdgeCondition::field_contains("text", "rain")));
        assert!(e.is_satisfied_by(&json!({"text": "heavy rain today"})));
        assert!(!e.is_satisfied_by(&json!({"text": "sunny"})));
        assert!(!e.is_satisfied_by(&json!({})));

        let e = edge(Some(EdgeCondition::field_contains("code", "20")));
        assert!(e.is_satisfied_by(&json!({"code": 200})));
    }

    #[test]
    fn test_always_and_unknown() {
        assert!(edge(Some(EdgeCondition::always())).is_satisfied_by(&json!({})));

        let unknown = EdgeCondition {
            kind: ConditionKind::Unknown,
            field: None,
            value: Value::Null,
        };
        assert!(edge(Some(unknown)).is_satisfied_by(&json!({})));
    }

    #[test]
    fn test_conditions_on_non_object_output() {
        let e = edge(Some(EdgeCondition::field_equals("x", 1)));
        assert!(!e.is_satisfied_by(&json!("plain string")));
    }
}
