use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EdgeModel {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<EdgeCondition>,
}

impl EdgeModel {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            condition: None,
        }
    }

    pub fn with_condition(
        mut self,
        condition: EdgeCondition,
    ) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Predicate evaluated against the source node's output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EdgeCondition {
    #[serde(rename = "type", alias = "kind")]
    pub kind: ConditionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConditionKind {
    IntentMatch,
    FieldEquals,
    FieldContains,
    Always,
    #[serde(other)]
    Unknown,
}

impl EdgeCondition {
    pub fn intent_match(value: impl Into<Value>) -> Self {
        Self {
            kind: ConditionKind::IntentMatch,
            field: None,
            value: value.into(),
        }
    }

    pub fn field_equals(
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            kind: ConditionKind::FieldEquals,
            field: Some(field.into()),
            value: value.into(),
        }
    }

    pub fn field_contains(
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            kind: ConditionKind::FieldContains,
            field: Some(field.into()),
            value: value.into(),
        }
    }

    pub fn always() -> Self {
        Self {
            kind: ConditionKind::Always,
            field: None,
            value: Value::Null,
        }
    }
}
