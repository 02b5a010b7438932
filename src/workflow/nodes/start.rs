use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::{Result, model::NodeType, runtime::ExecutionContext, workflow::template::Resolver};

use super::NodeExecutor;

/// Entry node. Emits the trigger input with every string leaf resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartExecutor;

#[async_trait]
impl NodeExecutor for StartExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Start
    }

    async fn execute(
        &self,
        _: &Value,
        ctx: &ExecutionContext,
        resolver: &Resolver,
    ) -> Result<Value> {
        let output = resolver.resolve_value(ctx.input(), ctx)?;
        debug!(output = %output, "start node output");
        Ok(output)
    }
}
