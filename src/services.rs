//! External collaborators used by the `llm`, `knowledge` and `intent` nodes.
//!
//! The engine does not talk to model providers or vector stores itself. Hosts
//! plug an implementation in through [`EngineBuilder`](crate::EngineBuilder);
//! nodes that need a missing collaborator fail when they are dispatched.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A single chat completion request.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    /// model name; `None` lets the service pick its default
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub content: String,
    /// provider specific token accounting
    pub usage: Option<Value>,
    /// model that actually served the request
    pub model: Option<String>,
}

#[async_trait]
pub trait LlmService: Send + Sync {
    async fn chat(
        &self,
        request: ChatRequest,
    ) -> Result<ChatResponse>;
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RetrievalQuery {
    pub knowledge_base: String,
    pub query: String,
    pub top_k: usize,
    pub similarity_threshold: f64,
}

/// One chunk returned by a knowledge base lookup.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub content: String,
    pub similarity: f64,
    #[serde(default)]
    pub document_title: Option<String>,
    #[serde(default)]
    pub document_id: Option<String>,
}

#[async_trait]
pub trait KnowledgeService: Send + Sync {
    /// Return candidate chunks for `query`. Implementations may ignore the
    /// threshold and limit; the knowledge node applies both again.
    async fn retrieve(
        &self,
        query: RetrievalQuery,
    ) -> Result<Vec<RetrievedChunk>>;
}

/// Collaborators handed to the built-in executors.
#[derive(Clone, Default)]
pub struct Services {
    pub llm: Option<Arc<dyn LlmService>>,
    pub knowledge: Option<Arc<dyn KnowledgeService>>,
}
