use serde::{Deserialize, Serialize};

/// Declared type of a node. Each variant is bound to exactly one executor.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString, strum::EnumIter, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeType {
    Start,
    End,
    Http,
    Llm,
    Knowledge,
    Intent,
    String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeModel {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// opaque, type-specific configuration
    #[serde(default = "empty_data")]
    pub data: serde_json::Value,
}

fn empty_data() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl NodeModel {
    pub fn new(
        id: impl Into<String>,
        node_type: NodeType,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            node_type,
            label: None,
            data,
        }
    }
}
