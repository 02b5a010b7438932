mod models;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, InvalidHeaderName, InvalidHeaderValue},
    redirect::Policy,
};
use serde_json::{Map, Value, json};
use tracing::{error, info, warn};

use crate::{DagflowError, Result, config::HttpConfig, model::NodeType, runtime::ExecutionContext, workflow::template::Resolver};

use super::{NodeConfig, NodeExecutor, seconds};

pub use models::*;

const STATUS_CODE_KEY: &str = "status_code";
const STATUS_KEY: &str = "status";
const HEADERS_KEY: &str = "headers";
const BODY_KEY: &str = "body";
const DATA_KEY: &str = "data";
const SUCCESS_KEY: &str = "success";
const URL_KEY: &str = "url";
const METHOD_KEY: &str = "method";

impl NodeConfig for HttpNodeConfig {
    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["url"],
            "properties": {
                "url": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Request URL, supports template variables like {nodeId.key}"
                },
                "method": {
                    "type": "string",
                    "enum": ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "get", "post", "put", "patch", "delete", "head", "options"]
                },
                "headers": {
                    "type": "object",
                    "description": "HTTP headers, string values support template variables"
                },
                "body": {
                    "description": "A string (resolved, then parsed as JSON when possible) or a JSON value resolved leaf by leaf"
                },
                "timeout": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "description": "Request timeout in seconds"
                },
                "retry_count": { "type": "integer", "minimum": 0 },
                "retryCount": { "type": "integer", "minimum": 0 },
                "validate_ssl": { "type": "boolean" },
                "validateSSL": { "type": "boolean" },
                "follow_redirect": { "type": "boolean" },
                "followRedirect": { "type": "boolean" }
            }
        })
    }
}

/// Calls an external HTTP endpoint.
///
/// Transport failures are retried `retry_count` times with a fixed delay. Any
/// response, whatever its status, is a successful node output.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    retry_delay: Duration,
}

impl HttpExecutor {
    pub fn new(config: &HttpConfig) -> Self {
        Self {
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    fn build_client(config: &HttpNodeConfig) -> Result<reqwest::Client> {
        let redirect = if config.follow_redirect {
            Policy::default()
        } else {
            Policy::none()
        };
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.validate_ssl)
            .redirect(redirect)
            .timeout(seconds(config.timeout)?)
            .build()?;
        Ok(client)
    }

    fn build_headers(
        config: &HttpNodeConfig,
        ctx: &ExecutionContext,
        resolver: &Resolver,
    ) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let resolved = match value {
                Value::String(s) => resolver.resolve(s, ctx)?,
                v => v.to_string(),
            };
            headers.insert(
                key.parse::<HeaderName>().map_err(|err: InvalidHeaderName| DagflowError::Node(err.to_string()))?,
                resolved.parse::<HeaderValue>().map_err(|err: InvalidHeaderValue| DagflowError::Node(err.to_string()))?,
            );
        }
        Ok(headers)
    }

    fn build_body(
        config: &HttpNodeConfig,
        ctx: &ExecutionContext,
        resolver: &Resolver,
    ) -> Result<Option<HttpBody>> {
        let body = match &config.body {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::Object(o)) if o.is_empty() => None,
            Some(Value::String(s)) => {
                let text = resolver.resolve(s, ctx)?;
                match serde_json::from_str::<Value>(&text) {
                    Ok(v @ (Value::Object(_) | Value::Array(_))) => Some(HttpBody::Json(v)),
                    _ => Some(HttpBody::Text(text)),
                }
            }
            Some(v) => Some(HttpBody::Json(resolver.resolve_value(v, ctx)?)),
        };
        Ok(body)
    }

    async fn send(
        client: &reqwest::Client,
        method: HttpRequestMethod,
        url: &str,
        headers: &HeaderMap,
        body: Option<&HttpBody>,
    ) -> Result<Value> {
        let mut request = client.request(method.into(), url).headers(headers.clone());
        match body {
            Some(HttpBody::Json(v)) => request = request.json(v),
            Some(HttpBody::Text(t)) => request = request.body(t.clone()),
            None => {}
        }

        let res = request.send().await?;
        let status = res.status().as_u16();
        let is_json = res.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).is_some_and(|ct| ct.contains("json"));
        let response_headers: Map<String, Value> = res.headers().iter().map(|(k, v)| (k.to_string(), Value::String(v.to_str().unwrap_or("").to_string()))).collect();

        let text = res.text().await?;
        let body = if is_json {
            serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text))
        } else {
            Value::String(text)
        };

        let mut output = Map::new();
        output.insert(STATUS_CODE_KEY.to_string(), status.into());
        output.insert(STATUS_KEY.to_string(), status.into());
        output.insert(HEADERS_KEY.to_string(), Value::Object(response_headers));
        output.insert(BODY_KEY.to_string(), body.clone());
        output.insert(DATA_KEY.to_string(), body);
        output.insert(SUCCESS_KEY.to_string(), (200..300).contains(&status).into());
        output.insert(URL_KEY.to_string(), url.into());
        output.insert(METHOD_KEY.to_string(), method.as_ref().into());
        Ok(Value::Object(output))
    }
}

#[async_trait]
impl NodeExecutor for HttpExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Http
    }

    async fn execute(
        &self,
        data: &Value,
        ctx: &ExecutionContext,
        resolver: &Resolver,
    ) -> Result<Value> {
        let config = HttpNodeConfig::parse(data)?;

        let url = resolver.resolve(&config.url, ctx)?;
        let headers = Self::build_headers(&config, ctx, resolver)?;
        let body = Self::build_body(&config, ctx, resolver)?;
        let client = Self::build_client(&config)?;

        let attempts = config.retry_count.saturating_add(1);
        let mut attempt = 1;
        loop {
            match Self::send(&client, config.method, &url, &headers, body.as_ref()).await {
                Ok(output) => {
                    info!(url = %url, status = %output[STATUS_CODE_KEY], attempt, attempts, "http request completed");
                    return Ok(output);
                }
                Err(err) if attempt < attempts => {
                    warn!(url = %url, attempt, attempts, error = %err, "http request failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => {
                    error!(url = %url, attempts, error = %err, "http request failed");
                    return Err(err);
                }
            }
        }
    }
}
