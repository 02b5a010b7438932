use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::{Result, model::NodeType, runtime::ExecutionContext, workflow::template::Resolver};

use super::{NodeConfig, NodeExecutor};

#[derive(Debug, Clone, Default, Deserialize)]
struct EndConfig {
    #[serde(default, alias = "outputContent")]
    output_content: Option<String>,
}

impl NodeConfig for EndConfig {
    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "output_content": { "type": ["string", "null"] },
                "outputContent": { "type": ["string", "null"] }
            }
        })
    }
}

/// Exit node. Shapes the run's final output.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndExecutor;

#[async_trait]
impl NodeExecutor for EndExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::End
    }

    async fn execute(
        &self,
        data: &Value,
        ctx: &ExecutionContext,
        resolver: &Resolver,
    ) -> Result<Value> {
        let config = EndConfig::parse(data)?;

        let Some(content) = config.output_content.filter(|c| !c.is_empty()) else {
            return Ok(ctx.node_outputs());
        };

        let text = resolver.resolve(&content, ctx)?;
        debug!(output = %text, "end node custom output");
        Ok(parse_structured(&text).unwrap_or_else(|| json!({ "output": text })))
    }
}

/// Text that looks like a JSON object or array and parses as one.
fn parse_structured(text: &str) -> Option<Value> {
    let looks_structured = (text.starts_with('{') && text.ends_with('}')) || (text.starts_with('[') && text.ends_with(']'));
    if !looks_structured {
        return None;
    }
    serde_json::from_str(text).ok()
}
