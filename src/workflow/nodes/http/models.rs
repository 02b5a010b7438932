use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr)]
pub enum HttpRequestMethod {
    #[default]
    #[serde(alias = "get")]
    GET,
    #[serde(alias = "post")]
    POST,
    #[serde(alias = "put")]
    PUT,
    #[serde(alias = "patch")]
    PATCH,
    #[serde(alias = "delete")]
    DELETE,
    #[serde(alias = "head")]
    HEAD,
    #[serde(alias = "options")]
    OPTIONS,
}

impl From<HttpRequestMethod> for reqwest::Method {
    fn from(method: HttpRequestMethod) -> Self {
        match method {
            HttpRequestMethod::GET => reqwest::Method::GET,
            HttpRequestMethod::POST => reqwest::Method::POST,
            HttpRequestMethod::PUT => reqwest::Method::PUT,
            HttpRequestMethod::PATCH => reqwest::Method::PATCH,
            HttpRequestMethod::DELETE => reqwest::Method::DELETE,
            HttpRequestMethod::HEAD => reqwest::Method::HEAD,
            HttpRequestMethod::OPTIONS => reqwest::Method::OPTIONS,
        }
    }
}

/// Configuration of an `http` node. camelCase spellings are accepted too.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpNodeConfig {
    pub url: String,
    #[serde(default)]
    pub method: HttpRequestMethod,
    #[serde(default)]
    pub headers: HashMap<String, JsonValue>,
    #[serde(default)]
    pub body: Option<JsonValue>,
    /// request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    #[serde(default, alias = "retryCount")]
    pub retry_count: u32,
    #[serde(default = "enabled", alias = "validateSSL", alias = "validateSsl")]
    pub validate_ssl: bool,
    #[serde(default = "enabled", alias = "followRedirect")]
    pub follow_redirect: bool,
}

fn default_timeout() -> f64 {
    10.0
}

fn enabled() -> bool {
    true
}

/// Request body after interpolation.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpBody {
    Text(String),
    Json(JsonValue),
}
