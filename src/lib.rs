//! # Dagflow
//!
//! Dagflow is an embeddable DAG workflow engine written in Rust. A workflow is
//! a graph of typed nodes (start, end, http, llm, knowledge, intent, string)
//! connected by edges that may carry routing conditions.
//!
//! ## Core Features
//!
//! - **Validation**: structural checks (one start, one end, no dangling edges, no cycles) before anything runs
//! - **Deterministic scheduling**: nodes run serially in a topological order that breaks ties by declaration order
//! - **Conditional routing**: edges gate their target on the source node's output
//! - **Variable interpolation**: `{input.field}` and `{node_id.path}` tokens in node configuration
//! - **Pluggable executors**: one executor per node type, replaceable through [`EngineBuilder`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dagflow::{EngineBuilder, RunOptions, WorkflowModel};
//!
//! let engine = EngineBuilder::new().build()?;
//! let workflow = WorkflowModel::from_json(json_str)?;
//!
//! let run = engine.execute(&workflow, serde_json::json!({"query": "weather in Paris"}), RunOptions::default()).await?;
//! println!("{}", serde_json::to_string_pretty(&run.output())?);
//! ```

mod builder;
mod common;
mod config;
mod dispatcher;
mod engine;
mod error;
mod events;
mod model;
mod runtime;
mod services;
mod utils;
mod workflow;

pub use builder::EngineBuilder;
pub use config::{Config, HttpConfig, RunConfig, RunOptions, TemplateConfig, UnresolvedPolicy};
pub use dispatcher::{Run, RunOutput, RunState};
pub use engine::Engine;
pub use error::DagflowError;
pub use events::{GraphEvent, Message, NodeEvent, WorkflowEvent, WorkflowFailedEvent, WorkflowPartiallyFailedEvent, WorkflowStartedEvent};
pub use model::*;
pub use runtime::{ExecutionContext, INPUT_KEY};
pub use services::{ChatMessage, ChatRequest, ChatResponse, ChatRole, KnowledgeService, LlmService, RetrievalQuery, RetrievedChunk};
pub use workflow::{
    Workflow,
    edge::Edge,
    node::{NodeExecutionResult, NodeId, NodeStatus},
    nodes::NodeExecutor,
    template::{Resolver, resolve},
    validator::{ValidationResult, validate},
};

/// Result type alias for Dagflow operations.
pub type Result<T> = std::result::Result<T, DagflowError>;
