use serde::{Deserialize, Serialize};

use crate::{
    DagflowError, Result,
    model::{EdgeModel, NodeModel},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkflowModel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub nodes: Vec<NodeModel>,
    #[serde(default)]
    pub edges: Vec<EdgeModel>,
}

impl WorkflowModel {
    pub fn new(
        nodes: Vec<NodeModel>,
        edges: Vec<EdgeModel>,
    ) -> Self {
        Self {
            nodes,
            edges,
            ..Default::default()
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let workflow = serde_json::from_str::<WorkflowModel>(s);
        match workflow {
            Ok(v) => Ok(v),
            Err(e) => Err(DagflowError::Workflow(format!("{}", e))),
        }
    }
}
