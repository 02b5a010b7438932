pub mod edge;
pub mod node;
pub mod nodes;
pub mod template;
pub mod validator;
mod workflow;

pub use workflow::Workflow;
