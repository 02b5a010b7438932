//! Intent recognition: classifies an input text into one of a fixed list of
//! categories, either by keyword counting or by asking a language model.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::{
    DagflowError, Result,
    model::NodeType,
    runtime::ExecutionContext,
    services::{ChatMessage, ChatRequest, LlmService},
    workflow::template::Resolver,
};

use super::{NodeConfig, NodeExecutor, resolve_opt};

/// Intent reported when the model names none of the categories.
pub const UNKNOWN_INTENT: &str = "unknown";
/// Fixed confidence for a category recognized by the model.
const LLM_CONFIDENCE: f64 = 0.8;
const LLM_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecognitionMode {
    Keyword,
    #[default]
    Llm,
}

#[derive(Debug, Clone, Deserialize)]
struct IntentConfig {
    input_text: String,
    intent_categories: Vec<String>,
    #[serde(default, alias = "recognitionMode")]
    recognition_mode: RecognitionMode,
    #[serde(default, alias = "keywordMapping")]
    keyword_mapping: HashMap<String, Vec<String>>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default, alias = "systemPrompt")]
    system_prompt: Option<String>,
}

impl NodeConfig for IntentConfig {
    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["input_text", "intent_categories"],
            "properties": {
                "input_text": { "type": "string", "minLength": 1 },
                "intent_categories": {
                    "type": "array",
                    "minItems": 1,
                    "items": { "type": "string" }
                },
                "recognition_mode": { "enum": ["keyword", "llm"] },
                "keyword_mapping": {
                    "type": "object",
                    "additionalProperties": {
                        "type": "array",
                        "items": { "type": "string" }
                    }
                },
                "model": { "type": ["string", "null"] },
                "system_prompt": { "type": ["string", "null"] }
            }
        })
    }
}

pub struct IntentExecutor {
    llm: Option<Arc<dyn LlmService>>,
}

impl IntentExecutor {
    pub fn new(llm: Option<Arc<dyn LlmService>>) -> Self {
        Self {
            llm,
        }
    }

    fn recognize_by_keyword(
        input_text: &str,
        categories: &[String],
        keyword_mapping: &HashMap<String, Vec<String>>,
    ) -> Value {
        let lowered = input_text.to_lowercase();

        let mut scores: Vec<(&str, usize)> = Vec::new();
        for category in categories {
            let score = keyword_mapping.get(category).map(|keywords| keywords.iter().filter(|k| lowered.contains(&k.to_lowercase())).count()).unwrap_or(0);
            if score > 0 {
                scores.push((category.as_str(), score));
            }
        }

        // strict comparison keeps the first declared category on ties
        let best = scores.iter().fold(None::<(&str, usize)>, |best, &(category, score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((category, score)),
        });

        let score_map: Map<String, Value> = scores.iter().map(|(c, s)| (c.to_string(), json!(s))).collect();
        let (intent, confidence) = match best {
            Some((category, top)) => {
                let total: usize = scores.iter().map(|(_, s)| s).sum();
                (Value::String(category.to_string()), (top as f64 / total as f64).min(1.0))
            }
            None => (Value::Null, 0.0),
        };
        let is_match = !intent.is_null();

        json!({
            "intent": intent,
            "category": intent,
            "confidence": confidence,
            "method": RecognitionMode::Keyword.as_ref(),
            "input_text": input_text,
            "all_categories": categories,
            "is_match": is_match,
            "scores": score_map,
        })
    }

    async fn recognize_by_llm(
        &self,
        input_text: &str,
        categories: &[String],
        model: Option<String>,
        system_prompt: Option<String>,
    ) -> Result<Value> {
        let llm = self.llm.as_ref().ok_or_else(|| DagflowError::Service("intent recognition in llm mode needs a language model service".to_string()))?;

        let prompt = format!(
            "Identify the intent category of the user input below.\n\n\
             Available categories: {}\n\n\
             User input: {}\n\n\
             Reply with the category name only. If no category fits, reply \"{}\".",
            categories.join(", "),
            input_text,
            UNKNOWN_INTENT
        );

        let mut messages = Vec::new();
        if let Some(system) = system_prompt.filter(|s| !s.is_empty()) {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(prompt));

        let request = ChatRequest {
            model,
            messages,
            ..Default::default()
        };
        let response = tokio::time::timeout(LLM_TIMEOUT, llm.chat(request))
            .await
            .map_err(|_| DagflowError::Timeout(format!("intent recognition timed out after {}s", LLM_TIMEOUT.as_secs())))??;

        let reply = response.content.trim().to_string();
        debug!(reply = %reply, "intent model reply");

        let recognized = categories.iter().find(|c| reply.contains(c.as_str()));
        let (intent, confidence) = match recognized {
            Some(category) => (category.clone(), LLM_CONFIDENCE),
            None => (UNKNOWN_INTENT.to_string(), 0.0),
        };

        Ok(json!({
            "intent": intent,
            "category": intent,
            "confidence": confidence,
            "method": RecognitionMode::Llm.as_ref(),
            "input_text": input_text,
            "all_categories": categories,
            "is_match": recognized.is_some(),
            "raw_response": reply,
            "llm_model": response.model,
        }))
    }
}

#[async_trait]
impl NodeExecutor for IntentExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Intent
    }

    async fn execute(
        &self,
        data: &Value,
        ctx: &ExecutionContext,
        resolver: &Resolver,
    ) -> Result<Value> {
        let config = IntentConfig::parse(data)?;
        let input_text = resolver.resolve(&config.input_text, ctx)?;
        let categories = config.intent_categories.iter().map(|c| resolver.resolve(c, ctx)).collect::<Result<Vec<_>>>()?;

        let output = match config.recognition_mode {
            RecognitionMode::Keyword => {
                let mut keyword_mapping = HashMap::with_capacity(config.keyword_mapping.len());
                for (category, keywords) in &config.keyword_mapping {
                    let keywords = keywords.iter().map(|k| resolver.resolve(k, ctx)).collect::<Result<Vec<_>>>()?;
                    keyword_mapping.insert(resolver.resolve(category, ctx)?, keywords);
                }
                Self::recognize_by_keyword(&input_text, &categories, &keyword_mapping)
            }
            RecognitionMode::Llm => {
                let system_prompt = resolve_opt(config.system_prompt.as_deref(), ctx, resolver)?;
                let model = resolve_opt(config.model.as_deref(), ctx, resolver)?;
                self.recognize_by_llm(&input_text, &categories, model, system_prompt).await?
            }
        };

        info!(intent = %output["intent"], confidence = %output["confidence"], method = config.recognition_mode.as_ref(), "intent recognized");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::services::ChatResponse;

    struct CannedLlm {
        reply: String,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl CannedLlm {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmService for CannedLlm {
        async fn chat(
            &self,
            request: ChatRequest,
        ) -> Result<ChatResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(ChatResponse {
                content: self.reply.clone(),
                usage: None,
                model: Some("canned".to_string()),
            })
        }
    }

    fn keyword_data(text: &str) -> Value {
        json!({
            "input_text": text,
            "intent_categories": ["weather", "music"],
            "recognition_mode": "keyword",
            "keyword_mapping": {
                "weather": ["weather", "temperature", "rain"],
                "music": ["song", "play", "music"]
            }
        })
    }

    #[tokio::test]
    async fn test_keyword_single_category() {
        let ctx = ExecutionContext::new(json!({"query": "What's the weather in Paris?"}));
        let out = IntentExecutor::new(None).execute(&keyword_data("{input.query}"), &ctx, &Resolver::default()).await.unwrap();

        assert_eq!(out["intent"], json!("weather"));
        assert_eq!(out["category"], json!("weather"));
        assert_eq!(out["confidence"], json!(1.0));
        assert_eq!(out["is_match"], json!(true));
        assert_eq!(out["method"], json!("keyword"));
        assert_eq!(out["input_text"], json!("What's the weather in Paris?"));
        assert_eq!(out["scores"], json!({"weather": 1}));
    }

    #[tokio::test]
    async fn test_keyword_confidence_is_share_of_hits() {
        let ctx = ExecutionContext::default();
        let out = IntentExecutor::new(None).execute(&keyword_data("Play a song about RAIN and weather"), &ctx, &Resolver::default()).await.unwrap();
        // weather: rain, weather; music: song, play
        assert_eq!(out["scores"], json!({"weather": 2, "music": 2}));
        assert_eq!(out["intent"], json!("weather"));
        assert_eq!(out["confidence"], json!(0.5));
    }

    #[tokio::test]
    async fn test_keyword_no_match() {
        let out = IntentExecutor::new(None).execute(&keyword_data("hello there"), &ExecutionContext::default(), &Resolver::default()).await.unwrap();
        assert_eq!(out["intent"], Value::Null);
        assert_eq!(out["confidence"], json!(0.0));
        assert_eq!(out["is_match"], json!(false));
        assert_eq!(out["scores"], json!({}));
    }

    #[tokio::test]
    async fn test_llm_mode_picks_first_contained_category() {
        let llm = CannedLlm::new("  music  ");
        let executor = IntentExecutor::new(Some(llm.clone()));
        let data = json!({
            "input_text": "put on some jazz",
            "intent_categories": ["weather", "music"],
            "system_prompt": "You classify requests."
        });
        let out = executor.execute(&data, &ExecutionContext::default(), &Resolver::default()).await.unwrap();

        assert_eq!(out["intent"], json!("music"));
        assert_eq!(out["confidence"], json!(0.8));
        assert_eq!(out["method"], json!("llm"));
        assert_eq!(out["raw_response"], json!("music"));

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen[0].messages.len(), 2);
        assert!(seen[0].messages[1].content.contains("weather, music"));
        assert!(seen[0].messages[1].content.contains("put on some jazz"));
    }

    #[tokio::test]
    async fn test_categories_keywords_and_model_are_resolved() {
        let ctx = ExecutionContext::new(json!({"topic": "weather", "hint": "forecast", "model": "small"}));

        let data = json!({
            "input_text": "forecast please",
            "intent_categories": ["{input.topic}", "music"],
            "recognition_mode": "keyword",
            "keyword_mapping": {"weather": ["{input.hint}"], "music": ["song"]}
        });
        let out = IntentExecutor::new(None).execute(&data, &ctx, &Resolver::default()).await.unwrap();
        assert_eq!(out["intent"], json!("weather"));
        assert_eq!(out["all_categories"], json!(["weather", "music"]));

        let llm = CannedLlm::new("weather");
        let data = json!({"input_text": "hi", "intent_categories": ["weather"], "model": "{input.model}"});
        IntentExecutor::new(Some(llm.clone())).execute(&data, &ctx, &Resolver::default()).await.unwrap();
        assert_eq!(llm.seen.lock().unwrap()[0].model.as_deref(), Some("small"));
    }

    #[tokio::test]
    async fn test_llm_mode_unknown_reply() {
        let executor = IntentExecutor::new(Some(CannedLlm::new("no idea")));
        let data = json!({"input_text": "hmm", "intent_categories": ["weather"]});
        let out = executor.execute(&data, &ExecutionContext::default(), &Resolver::default()).await.unwrap();
        assert_eq!(out["intent"], json!(UNKNOWN_INTENT));
        assert_eq!(out["confidence"], json!(0.0));
        assert_eq!(out["is_match"], json!(false));
    }

    #[tokio::test]
    async fn test_llm_mode_without_service_fails() {
        let data = json!({"input_text": "hmm", "intent_categories": ["weather"]});
        let err = IntentExecutor::new(None).execute(&data, &ExecutionContext::default(), &Resolver::default()).await.unwrap_err();
        assert!(matches!(err, DagflowError::Service(_)));
    }

    #[tokio::test]
    async fn test_missing_categories_is_config_error() {
        let data = json!({"input_text": "hmm", "intent_categories": []});
        assert!(IntentExecutor::new(None).execute(&data, &ExecutionContext::default(), &Resolver::default()).await.is_err());
    }
}
