use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::{
    DagflowError, Result,
    model::NodeType,
    runtime::ExecutionContext,
    services::{KnowledgeService, RetrievalQuery, RetrievedChunk},
    workflow::template::Resolver,
};

use super::{NodeConfig, NodeExecutor};

const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, Deserialize)]
struct KnowledgeConfig {
    #[serde(alias = "kb_uuid", alias = "kbUuid", alias = "knowledgeBase")]
    knowledge_base: String,
    query: String,
    #[serde(default = "default_top_k", alias = "topK")]
    top_k: usize,
    #[serde(default = "default_threshold", alias = "similarityThreshold")]
    similarity_threshold: f64,
}

fn default_top_k() -> usize {
    5
}

fn default_threshold() -> f64 {
    0.7
}

impl NodeConfig for KnowledgeConfig {
    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["query"],
            "anyOf": [
                { "required": ["knowledge_base"] },
                { "required": ["knowledgeBase"] },
                { "required": ["kb_uuid"] },
                { "required": ["kbUuid"] }
            ],
            "properties": {
                "knowledge_base": { "type": "string", "minLength": 1 },
                "kb_uuid": { "type": "string", "minLength": 1 },
                "query": { "type": "string", "minLength": 1 },
                "top_k": { "type": "integer", "minimum": 1 },
                "similarity_threshold": { "type": "number", "minimum": 0, "maximum": 1 }
            }
        })
    }
}

/// Retrieves relevant chunks from a knowledge base through [`KnowledgeService`].
pub struct KnowledgeExecutor {
    knowledge: Option<Arc<dyn KnowledgeService>>,
}

impl KnowledgeExecutor {
    pub fn new(knowledge: Option<Arc<dyn KnowledgeService>>) -> Self {
        Self {
            knowledge,
        }
    }
}

/// Keep chunks at or above the threshold, best first, at most `top_k`.
fn rank(
    mut chunks: Vec<RetrievedChunk>,
    threshold: f64,
    top_k: usize,
) -> Vec<RetrievedChunk> {
    chunks.retain(|c| c.similarity >= threshold);
    chunks.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    chunks.truncate(top_k);
    chunks
}

fn combine(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| match &c.document_title {
            Some(title) => format!("[source: {}]\n{}", title, c.content),
            None => c.content.clone(),
        })
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}

#[async_trait]
impl NodeExecutor for KnowledgeExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Knowledge
    }

    async fn execute(
        &self,
        data: &Value,
        ctx: &ExecutionContext,
        resolver: &Resolver,
    ) -> Result<Value> {
        let config = KnowledgeConfig::parse(data)?;
        let knowledge = self.knowledge.as_ref().ok_or_else(|| DagflowError::Service("knowledge node needs a retrieval service".to_string()))?;

        let query = resolver.resolve(&config.query, ctx)?;
        let knowledge_base = resolver.resolve(&config.knowledge_base, ctx)?;
        let chunks = knowledge
            .retrieve(RetrievalQuery {
                knowledge_base: knowledge_base.clone(),
                query: query.clone(),
                top_k: config.top_k,
                similarity_threshold: config.similarity_threshold,
            })
            .await?;

        let results = rank(chunks, config.similarity_threshold, config.top_k);
        if results.is_empty() {
            warn!(knowledge_base = %knowledge_base, "no chunk passed the similarity threshold");
        }
        info!(knowledge_base = %knowledge_base, total = results.len(), "knowledge retrieval completed");

        let mut output = Map::new();
        output.insert("results".to_string(), serde_json::to_value(&results)?);
        output.insert("total".to_string(), json!(results.len()));
        output.insert("knowledge_base".to_string(), json!(knowledge_base));
        output.insert("query".to_string(), json!(query));
        if let Some(top) = results.first() {
            output.insert("top_result".to_string(), serde_json::to_value(top)?);
            output.insert("top_content".to_string(), json!(top.content));
            output.insert("top_similarity".to_string(), json!(top.similarity));
            output.insert("combined_content".to_string(), json!(combine(&results)));
        }
        Ok(Value::Object(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedKnowledge;

    fn chunk(
        id: &str,
        similarity: f64,
        title: Option<&str>,
    ) -> RetrievedChunk {
        RetrievedChunk {
            chunk_id: id.to_string(),
            content: format!("content of {}", id),
            similarity,
            document_title: title.map(str::to_string),
            document_id: None,
        }
    }

    #[async_trait]
    impl KnowledgeService for FixedKnowledge {
        async fn retrieve(
            &self,
            query: RetrievalQuery,
        ) -> Result<Vec<RetrievedChunk>> {
            assert_eq!(query.knowledge_base, "kb-1");
            Ok(vec![chunk("low", 0.3, None), chunk("mid", 0.75, None), chunk("best", 0.95, Some("Guide")), chunk("good", 0.8, None)])
        }
    }

    fn executor() -> KnowledgeExecutor {
        KnowledgeExecutor::new(Some(Arc::new(FixedKnowledge)))
    }

    #[tokio::test]
    async fn test_results_filtered_sorted_truncated() {
        let ctx = ExecutionContext::new(json!({"q": "install", "kb": "kb-1"}));
        let data = json!({"kb_uuid": "{input.kb}", "query": "how to {input.q}", "top_k": 2});
        let out = executor().execute(&data, &ctx, &Resolver::default()).await.unwrap();

        assert_eq!(out["total"], json!(2));
        assert_eq!(out["results"][0]["chunk_id"], json!("best"));
        assert_eq!(out["results"][1]["chunk_id"], json!("good"));
        assert_eq!(out["query"], json!("how to install"));
        assert_eq!(out["knowledge_base"], json!("kb-1"));
        assert_eq!(out["top_similarity"], json!(0.95));
        assert_eq!(out["top_content"], json!("content of best"));
        assert_eq!(out["combined_content"], json!("[source: Guide]\ncontent of best\n\n---\n\ncontent of good"));
    }

    #[tokio::test]
    async fn test_nothing_above_threshold() {
        let data = json!({"knowledge_base": "kb-1", "query": "x", "similarity_threshold": 0.99});
        let out = executor().execute(&data, &ExecutionContext::default(), &Resolver::default()).await.unwrap();
        assert_eq!(out["total"], json!(0));
        assert_eq!(out["results"], json!([]));
        assert!(out.get("top_result").is_none());
    }

    #[tokio::test]
    async fn test_without_service_fails() {
        let data = json!({"knowledge_base": "kb-1", "query": "x"});
        let err = KnowledgeExecutor::new(None).execute(&data, &ExecutionContext::default(), &Resolver::default()).await.unwrap_err();
        assert!(matches!(err, DagflowError::Service(_)));
    }

    #[tokio::test]
    async fn test_missing_knowledge_base_is_config_error() {
        let err = executor().execute(&json!({"query": "x"}), &ExecutionContext::default(), &Resolver::default()).await.unwrap_err();
        assert!(matches!(err, DagflowError::Node(_)));
    }
}
