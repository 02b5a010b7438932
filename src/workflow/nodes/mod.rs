pub mod end;
pub mod http;
pub mod intent;
pub mod knowledge;
pub mod llm;
pub mod start;
pub mod string;

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{DagflowError, Result, config::HttpConfig, model::NodeType, runtime::ExecutionContext, services::Services, workflow::template::Resolver};

pub use end::EndExecutor;
pub use http::HttpExecutor;
pub use intent::IntentExecutor;
pub use knowledge::KnowledgeExecutor;
pub use llm::LlmExecutor;
pub use start::StartExecutor;
pub use string::StringExecutor;

#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Returns the [`NodeType`] this executor handles.
    fn node_type(&self) -> NodeType;

    /// Executes one node.
    ///
    /// # Arguments
    ///
    /// * `data` - The node's raw configuration.
    /// * `ctx` - Outputs committed so far in this run, plus the trigger input.
    /// * `resolver` - Interpolates `{path}` tokens in string settings.
    ///
    /// # Returns
    ///
    /// The node output, committed to the context under the node id on success.
    async fn execute(
        &self,
        data: &Value,
        ctx: &ExecutionContext,
        resolver: &Resolver,
    ) -> Result<Value>;
}

/// Typed node configuration checked against a JSON schema before it is
/// deserialized.
pub trait NodeConfig: DeserializeOwned {
    fn schema() -> Value;

    fn parse(data: &Value) -> Result<Self> {
        let schema = Self::schema();
        jsonschema::validate(&schema, data)?;
        serde_json::from_value::<Self>(data.clone()).map_err(|err| DagflowError::Node(format!("invalid node config: {}", err)))
    }
}

/// Maps each [`NodeType`] to the executor that runs it.
#[derive(Clone)]
pub struct NodeRegistry {
    executors: HashMap<NodeType, Arc<dyn NodeExecutor>>,
}

impl NodeRegistry {
    /// A registry holding every built-in executor.
    pub fn new(
        services: &Services,
        http: &HttpConfig,
    ) -> Self {
        let mut registry = Self {
            executors: HashMap::new(),
        };
        registry.register(Arc::new(StartExecutor));
        registry.register(Arc::new(EndExecutor));
        registry.register(Arc::new(HttpExecutor::new(http)));
        registry.register(Arc::new(StringExecutor));
        registry.register(Arc::new(IntentExecutor::new(services.llm.clone())));
        registry.register(Arc::new(LlmExecutor::new(services.llm.clone())));
        registry.register(Arc::new(KnowledgeExecutor::new(services.knowledge.clone())));
        registry
    }

    /// Register an executor, replacing any previous one for the same type.
    pub fn register(
        &mut self,
        executor: Arc<dyn NodeExecutor>,
    ) {
        self.executors.insert(executor.node_type(), executor);
    }

    pub fn get(
        &self,
        node_type: NodeType,
    ) -> Result<Arc<dyn NodeExecutor>> {
        self.executors.get(&node_type).cloned().ok_or_else(|| DagflowError::Engine(format!("no executor registered for node type '{}'", node_type)))
    }
}

/// Resolve an optional string setting.
pub(crate) fn resolve_opt(
    value: Option<&str>,
    ctx: &ExecutionContext,
    resolver: &Resolver,
) -> Result<Option<String>> {
    value.map(|v| resolver.resolve(v, ctx)).transpose()
}

/// Convert a `timeout` setting in seconds, rejecting values no [`Duration`] can hold.
pub(crate) fn seconds(value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|err| DagflowError::Node(format!("invalid timeout {}: {}", value, err)))
}
