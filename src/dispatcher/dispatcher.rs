//! Workflow dispatcher for scheduling and executing nodes.
//!
//! The dispatcher is responsible for:
//! - Ordering the graph topologically
//! - Deciding, per node, whether its inbound edges let it fire
//! - Running each node through its executor and recording the outcome
//! - Applying the failure policy and the node/run deadlines

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{
    DagflowError, Result, RunOptions,
    common::BroadcastQueue,
    events::{Message, NodeEvent, WorkflowEvent, WorkflowFailedEvent, WorkflowPartiallyFailedEvent, WorkflowStartedEvent},
    model::{NodeModel, NodeType},
    runtime::ExecutionContext,
    utils,
    workflow::{Workflow, node::NodeExecutionResult, nodes::NodeRegistry, template::Resolver},
};

use super::{Run, RunState};

/// Serial executor for one workflow.
///
/// Nodes run one at a time in topological order; each run owns its context,
/// so one dispatcher can serve any number of runs.
pub struct Dispatcher {
    workflow_id: String,
    /// The workflow graph to execute.
    workflow: Workflow,
    registry: Arc<NodeRegistry>,
    resolver: Resolver,
    options: RunOptions,
    /// Queue run events are broadcast on.
    events: Arc<BroadcastQueue<Message>>,
}

impl Dispatcher {
    pub fn new(
        workflow_id: impl Into<String>,
        workflow: Workflow,
        registry: Arc<NodeRegistry>,
        resolver: Resolver,
        options: RunOptions,
        events: Arc<BroadcastQueue<Message>>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            workflow,
            registry,
            resolver,
            options,
            events,
        }
    }

    /// Execute the workflow once with the given trigger input.
    ///
    /// Fails only when the graph cannot be ordered. Node failures are
    /// recorded on the returned [`Run`].
    pub async fn run(
        &self,
        input: Value,
    ) -> Result<Run> {
        let mut run = Run::new(self.workflow_id.clone(), input);

        run.state = RunState::Ordering;
        let order = self.workflow.topological_order()?;
        debug!(run_id = %run.id, order = ?order, "execution order computed");

        run.state = RunState::Running;
        info!(run_id = %run.id, workflow_id = %self.workflow_id, nodes = order.len(), "run started");
        self.emit(Message::workflow(
            &run.id,
            WorkflowEvent::Started(WorkflowStartedEvent {
                node_ids: order.clone(),
            }),
        ));

        let deadline = self.options.run_timeout.map(|t| Instant::now() + t);
        let mut halted: Option<String> = None;

        for nid in order {
            let node = self.workflow.get_node(&nid).ok_or_else(|| DagflowError::Workflow(format!("node '{}' not found", nid)))?;

            if !self.should_execute(&nid, &run.context) {
                info!(run_id = %run.id, node_id = %nid, "node skipped, no inbound edge condition holds");
                run.results.push(NodeExecutionResult::skipped(nid.clone(), node.node_type));
                self.emit(Message::node(&run.id, &nid, NodeEvent::Skipped));
                continue;
            }

            self.emit(Message::node(&run.id, &nid, NodeEvent::Running(utils::time::time_millis())));
            let started_at = Utc::now();
            let outcome = self.execute_node(node, &run.context, deadline).await;
            let completed_at = Utc::now();

            match outcome {
                Ok(output) => {
                    info!(run_id = %run.id, node_id = %nid, node_type = node.node_type.as_ref(), "node succeeded");
                    run.context.commit(nid.clone(), output.clone())?;
                    run.results.push(NodeExecutionResult::success(nid.clone(), node.node_type, output, started_at, completed_at));
                    self.emit(Message::node(&run.id, &nid, NodeEvent::Succeeded(utils::time::time_millis())));
                }
                Err(err) => {
                    let message = err.to_string();
                    error!(run_id = %run.id, node_id = %nid, node_type = node.node_type.as_ref(), error = %message, "node failed");
                    run.results.push(NodeExecutionResult::failed(nid.clone(), node.node_type, message.clone(), started_at, completed_at));
                    self.emit(Message::node(&run.id, &nid, NodeEvent::Failed(message.clone())));

                    let expired = deadline.is_some_and(|d| Instant::now() >= d);
                    if expired || !self.options.continue_on_error {
                        warn!(run_id = %run.id, node_id = %nid, expired, "halting run");
                        halted = Some(format!("node '{}' failed: {}", nid, message));
                        break;
                    }
                }
            }
        }

        let final_output = self.final_output(&run.context);
        let failed = run.failed_nodes();
        let state = match (&halted, failed.is_empty()) {
            (Some(_), _) => RunState::Failed,
            (None, true) => RunState::Succeeded,
            (None, false) => RunState::PartiallyFailed,
        };
        run.error = halted;
        run.finish(state, final_output);

        let event = match state {
            RunState::Failed => WorkflowEvent::Failed(WorkflowFailedEvent {
                error: run.error.clone().unwrap_or_default(),
            }),
            RunState::PartiallyFailed => WorkflowEvent::PartiallyFailed(WorkflowPartiallyFailedEvent {
                failed_nodes: failed,
            }),
            _ => WorkflowEvent::Succeeded,
        };
        self.emit(Message::workflow(&run.id, event));
        info!(run_id = %run.id, state = %run.state, duration_ms = run.total_duration_ms, "run finished");

        Ok(run)
    }

    /// Whether `nid` fires given the outputs committed so far.
    ///
    /// A node whose inbound edges carry no condition always fires. Otherwise
    /// it fires when an inbound edge whose source produced output is either
    /// unconditioned or satisfied; edges from sources without output are
    /// ignored.
    fn should_execute(
        &self,
        nid: &str,
        ctx: &ExecutionContext,
    ) -> bool {
        let incoming = self.workflow.incoming_edges(nid);
        if incoming.iter().all(|e| !e.is_conditional()) {
            return true;
        }

        incoming.iter().filter_map(|e| ctx.get(&e.source).map(|output| (e, output))).any(|(e, output)| e.is_satisfied_by(output))
    }

    /// Run one node under the tighter of the node timeout and the time left
    /// before the run deadline.
    async fn execute_node(
        &self,
        node: &NodeModel,
        ctx: &ExecutionContext,
        deadline: Option<Instant>,
    ) -> Result<Value> {
        let executor = self.registry.get(node.node_type)?;

        let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        if remaining == Some(Duration::ZERO) {
            return Err(DagflowError::Timeout("run deadline exceeded before the node started".to_string()));
        }

        let limit = match (self.options.node_timeout, remaining) {
            (Some(node_limit), Some(run_left)) if run_left < node_limit => Some((run_left, "run deadline exceeded")),
            (Some(node_limit), _) => Some((node_limit, "node timed out")),
            (None, Some(run_left)) => Some((run_left, "run deadline exceeded")),
            (None, None) => None,
        };

        let execution = executor.execute(&node.data, ctx, &self.resolver);
        match limit {
            Some((limit, reason)) => tokio::time::timeout(limit, execution)
                .await
                .map_err(|_| DagflowError::Timeout(format!("{} after {}ms", reason, limit.as_millis())))?,
            None => execution.await,
        }
    }

    /// Output of the end node if it ran, else every node output.
    fn final_output(
        &self,
        ctx: &ExecutionContext,
    ) -> Value {
        self.workflow.find_by_type(NodeType::End).and_then(|end| ctx.get(&end.id)).cloned().unwrap_or_else(|| ctx.node_outputs())
    }

    fn emit(
        &self,
        msg: Message,
    ) {
        // no subscribers is fine
        let _ = self.events.send(msg);
    }
}
