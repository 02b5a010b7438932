mod edge;
mod node;
mod workflow;

pub use edge::{ConditionKind, EdgeCondition, EdgeModel};
pub use node::{NodeModel, NodeType};
pub use workflow::WorkflowModel;
