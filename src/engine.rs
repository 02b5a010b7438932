//! Workflow engine - the main entry point for Dagflow.
//!
//! The engine validates workflow definitions and executes runs. It holds only
//! immutable state (configuration, node registry, resolver) plus the event
//! channel, so concurrent runs never share mutable data.


use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{instrument, warn};

use crate::{
    Config, DagflowError, Result, RunOptions,
    common::BroadcastQueue,
    dispatcher::{Dispatcher, Run},
    events::Message,
    model::WorkflowModel,
    workflow::{
        Workflow,
        nodes::NodeRegistry,
        template::Resolver,
        validator::{self, ValidationResult},
    },
};

/// Capacity of the run event channel.
const EVENT_QUEUE_SIZE: usize = 1024;

/// The main workflow engine.
///
/// # Example
///
/// ```rust,ignore
/// let engine = EngineBuilder::new().build()?;
///
/// let workflow = WorkflowModel::from_json(json_str)?;
/// let report = engine.validate(&workflow);
///
/// let run = engine.execute(&workflow, json!({"query": "hi"}), RunOptions::default()).await?;
/// println!("{}", run.final_output);
/// ```
pub struct Engine {
    config: Config,
    registry: Arc<NodeRegistry>,
    resolver: Resolver,
    /// Broadcast channel for run and node events.
    events: Arc<BroadcastQueue<Message>>,
}

impl Engine {
    pub(crate) fn new(
        config: Config,
        registry: NodeRegistry,
    ) -> Self {
        let resolver = Resolver::new(config.template.unresolved);
        Self {
            config,
            registry: Arc::new(registry),
            resolver,
            events: BroadcastQueue::new(EVENT_QUEUE_SIZE),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check the structure of a workflow without running it.
    pub fn validate(
        &self,
        workflow: &WorkflowModel,
    ) -> ValidationResult {
        validator::validate(&workflow.nodes, &workflow.edges)
    }

    /// Validate and run a workflow once.
    ///
    /// Returns [`DagflowError::Invalid`] when validation reports errors; in
    /// that case nothing is executed. Node failures do not make this return
    /// an error, they are recorded on the [`Run`].
    #[instrument(skip_all, fields(workflow_id = %workflow.id))]
    pub async fn execute(
        &self,
        workflow: &WorkflowModel,
        input: Value,
        options: RunOptions,
    ) -> Result<Run> {
        let validation = self.validate(workflow);
        for warning in &validation.warnings {
            warn!(warning = %warning, "workflow validation warning");
        }
        if !validation.is_valid {
            return Err(DagflowError::Invalid(validation.errors));
        }

        let graph = Workflow::try_from(workflow)?;
        let dispatcher = Dispatcher::new(workflow.id.clone(), graph, self.registry.clone(), self.resolver, options, self.events.clone());
        dispatcher.run(input).await
    }

    /// Run with the options from the engine configuration.
    pub async fn execute_default(
        &self,
        workflow: &WorkflowModel,
        input: Value,
    ) -> Result<Run> {
        self.execute(workflow, input, self.config.run_options()).await
    }

    /// Receive events for every run started after subscribing.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.events.subscribe()
    }
}
