use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::{
    DagflowError, Result,
    model::NodeType,
    runtime::ExecutionContext,
    services::{ChatMessage, ChatRequest, LlmService},
    workflow::template::Resolver,
};

use super::{NodeConfig, NodeExecutor, resolve_opt, seconds};

#[derive(Debug, Clone, Deserialize)]
struct LlmConfig {
    #[serde(alias = "userPrompt")]
    user_prompt: String,
    #[serde(default, alias = "systemPrompt")]
    system_prompt: Option<String>,
    #[serde(default, alias = "llmModel")]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default, alias = "maxTokens")]
    max_tokens: Option<u32>,
    #[serde(default, alias = "topP")]
    top_p: Option<f64>,
    /// seconds
    #[serde(default = "default_timeout")]
    timeout: f64,
}

fn default_timeout() -> f64 {
    60.0
}

impl NodeConfig for LlmConfig {
    fn schema() -> Value {
        json!({
            "type": "object",
            "anyOf": [
                { "required": ["user_prompt"] },
                { "required": ["userPrompt"] }
            ],
            "properties": {
                "user_prompt": { "type": "string", "minLength": 1 },
                "userPrompt": { "type": "string", "minLength": 1 },
                "system_prompt": { "type": ["string", "null"] },
                "model": { "type": ["string", "null"] },
                "temperature": { "type": ["number", "null"], "minimum": 0 },
                "max_tokens": { "type": ["integer", "null"], "minimum": 1 },
                "top_p": { "type": ["number", "null"], "minimum": 0, "maximum": 1 },
                "timeout": { "type": "number", "exclusiveMinimum": 0 }
            }
        })
    }
}

/// Sends a prompt to the configured [`LlmService`].
pub struct LlmExecutor {
    llm: Option<Arc<dyn LlmService>>,
}

impl LlmExecutor {
    pub fn new(llm: Option<Arc<dyn LlmService>>) -> Self {
        Self {
            llm,
        }
    }
}

#[async_trait]
impl NodeExecutor for LlmExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Llm
    }

    async fn execute(
        &self,
        data: &Value,
        ctx: &ExecutionContext,
        resolver: &Resolver,
    ) -> Result<Value> {
        let config = LlmConfig::parse(data)?;
        let llm = self.llm.as_ref().ok_or_else(|| DagflowError::Service("llm node needs a language model service".to_string()))?;

        let user_prompt = resolver.resolve(&config.user_prompt, ctx)?;
        let system_prompt = resolve_opt(config.system_prompt.as_deref(), ctx, resolver)?;
        let model = resolve_opt(config.model.as_deref(), ctx, resolver)?;

        let mut messages = Vec::new();
        if let Some(system) = system_prompt.filter(|s| !s.is_empty()) {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(user_prompt.as_str()));

        let request = ChatRequest {
            model: model.clone(),
            messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
        };

        info!(model = model.as_deref().unwrap_or("default"), prompt_len = user_prompt.len(), "calling language model");
        let response = tokio::time::timeout(seconds(config.timeout)?, llm.chat(request))
            .await
            .map_err(|_| DagflowError::Timeout(format!("llm call timed out after {}s", config.timeout)))?
            .inspect_err(|err| error!(error = %err, "llm call failed"))?;

        info!(response_len = response.content.len(), "language model replied");
        Ok(json!({
            "response": response.content,
            "usage": response.usage,
            "model": response.model.or(model),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use super::*;
    use crate::services::{ChatResponse, ChatRole};

    #[derive(Default)]
    struct RecordingLlm {
        seen: Mutex<Option<ChatRequest>>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl LlmService for RecordingLlm {
        async fn chat(
            &self,
            request: ChatRequest,
        ) -> Result<ChatResponse> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let reply = format!("echo: {}", request.messages.last().map(|m| m.content.as_str()).unwrap_or(""));
            *self.seen.lock().unwrap() = Some(request);
            Ok(ChatResponse {
                content: reply,
                usage: Some(json!({"total_tokens": 7})),
                model: None,
            })
        }
    }

    #[tokio::test]
    async fn test_llm_builds_request() {
        let llm = Arc::new(RecordingLlm::default());
        let executor = LlmExecutor::new(Some(llm.clone()));
        let ctx = ExecutionContext::new(json!({"topic": "rust"}));
        let data = json!({
            "userPrompt": "Write about {input.topic}",
            "systemPrompt": "Be brief",
            "llmModel": "small",
            "temperature": 0.2,
            "maxTokens": 64
        });

        let out = executor.execute(&data, &ctx, &Resolver::default()).await.unwrap();
        assert_eq!(out["response"], json!("echo: Write about rust"));
        assert_eq!(out["usage"]["total_tokens"], json!(7));
        assert_eq!(out["model"], json!("small"));

        let seen = llm.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.messages[0].role, ChatRole::System);
        assert_eq!(seen.messages[0].content, "Be brief");
        assert_eq!(seen.max_tokens, Some(64));
        assert_eq!(seen.temperature, Some(0.2));
    }

    #[tokio::test]
    async fn test_llm_without_service_fails() {
        let err = LlmExecutor::new(None).execute(&json!({"user_prompt": "hi"}), &ExecutionContext::default(), &Resolver::default()).await.unwrap_err();
        assert!(matches!(err, DagflowError::Service(_)));
    }

    #[tokio::test]
    async fn test_llm_requires_prompt() {
        let executor = LlmExecutor::new(Some(Arc::new(RecordingLlm::default())));
        assert!(executor.execute(&json!({"model": "x"}), &ExecutionContext::default(), &Resolver::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_llm_timeout() {
        let llm = Arc::new(RecordingLlm {
            delay: Some(Duration::from_millis(500)),
            ..Default::default()
        });
        let executor = LlmExecutor::new(Some(llm));
        let err = executor.execute(&json!({"user_prompt": "hi", "timeout": 0.05}), &ExecutionContext::default(), &Resolver::default()).await.unwrap_err();
        assert!(matches!(err, DagflowError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_llm_resolves_model() {
        let llm = Arc::new(RecordingLlm::default());
        let executor = LlmExecutor::new(Some(llm.clone()));
        let ctx = ExecutionContext::new(json!({"model": "large"}));

        let out = executor.execute(&json!({"user_prompt": "hi", "model": "{input.model}"}), &ctx, &Resolver::default()).await.unwrap();
        assert_eq!(out["model"], json!("large"));
        assert_eq!(llm.seen.lock().unwrap().clone().unwrap().model.as_deref(), Some("large"));
    }

    #[tokio::test]
    async fn test_llm_rejects_oversized_timeout() {
        let executor = LlmExecutor::new(Some(Arc::new(RecordingLlm::default())));
        let err = executor.execute(&json!({"user_prompt": "hi", "timeout": 1e300}), &ExecutionContext::default(), &Resolver::default()).await.unwrap_err();
        assert!(matches!(err, DagflowError::Node(_)));
    }
}
