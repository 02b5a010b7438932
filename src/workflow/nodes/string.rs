use async_trait::async_trait;
use regex::{NoExpand, Regex};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::info;

use crate::{DagflowError, Result, model::NodeType, runtime::ExecutionContext, workflow::template::Resolver};

use super::{NodeConfig, NodeExecutor, resolve_opt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StringOperation {
    #[default]
    Template,
    Concat,
    Replace,
    Split,
    Substring,
    Trim,
    Upper,
    Lower,
    Regex,
}

#[derive(Debug, Clone, Deserialize)]
struct StringConfig {
    #[serde(default)]
    operation: StringOperation,
    #[serde(default)]
    template: String,
    #[serde(default)]
    input: String,
    #[serde(default)]
    separator: Option<String>,
    /// concat: one text per line
    #[serde(default)]
    texts: String,
    #[serde(default)]
    find: String,
    #[serde(default)]
    replace_with: String,
    #[serde(default = "enabled")]
    replace_all: bool,
    #[serde(default = "enabled")]
    case_sensitive: bool,
    /// split: at most this many splits; zero or negative means unbounded
    #[serde(default)]
    max_split: i64,
    #[serde(default)]
    start: i64,
    #[serde(default)]
    end: Option<i64>,
    #[serde(default)]
    pattern: String,
    #[serde(default)]
    group: usize,
    #[serde(default)]
    find_all: bool,
}

fn enabled() -> bool {
    true
}

impl StringConfig {
    /// Copy with the operation settings resolved. `template`, `input` and
    /// `texts` are resolved where they are read.
    fn resolved(
        &self,
        ctx: &ExecutionContext,
        resolver: &Resolver,
    ) -> Result<Self> {
        Ok(Self {
            separator: resolve_opt(self.separator.as_deref(), ctx, resolver)?,
            find: resolver.resolve(&self.find, ctx)?,
            replace_with: resolver.resolve(&self.replace_with, ctx)?,
            pattern: resolver.resolve(&self.pattern, ctx)?,
            ..self.clone()
        })
    }
}

impl NodeConfig for StringConfig {
    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "operation": {
                    "enum": ["template", "concat", "replace", "split", "substring", "trim", "upper", "lower", "regex"]
                },
                "template": { "type": "string" },
                "input": { "type": "string" },
                "separator": { "type": ["string", "null"] },
                "texts": { "type": "string" },
                "find": { "type": "string" },
                "replace_with": { "type": "string" },
                "replace_all": { "type": "boolean" },
                "case_sensitive": { "type": "boolean" },
                "max_split": { "type": "integer" },
                "start": { "type": "integer" },
                "end": { "type": ["integer", "null"] },
                "pattern": { "type": "string" },
                "group": { "type": "integer", "minimum": 0 },
                "find_all": { "type": "boolean" }
            }
        })
    }
}

/// Text result of an operation, plus the pieces for list-producing ones.
struct Outcome {
    text: String,
    list: Vec<Value>,
}

impl Outcome {
    fn text(text: String) -> Self {
        Self {
            text,
            list: Vec::new(),
        }
    }
}

/// String manipulation: templating, concatenation, replace, split, substring,
/// case changes and regex extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringExecutor;

impl StringExecutor {
    fn run(
        config: &StringConfig,
        ctx: &ExecutionContext,
        resolver: &Resolver,
    ) -> Result<Outcome> {
        let input = match config.operation {
            StringOperation::Template => resolver.resolve(&config.template, ctx)?,
            _ => resolver.resolve(&config.input, ctx)?,
        };

        let outcome = match config.operation {
            StringOperation::Template => Outcome::text(input),
            StringOperation::Concat => {
                if config.texts.trim().is_empty() {
                    Outcome::text(input)
                } else {
                    let parts = config.texts.lines().map(str::trim).filter(|l| !l.is_empty()).map(|l| resolver.resolve(l, ctx)).collect::<Result<Vec<_>>>()?;
                    Outcome::text(parts.join(config.separator.as_deref().unwrap_or("")))
                }
            }
            StringOperation::Replace => Outcome::text(replace(&input, config)?),
            StringOperation::Split => {
                let separator = config.separator.as_deref().unwrap_or(",");
                if separator.is_empty() {
                    return Err(DagflowError::Node("split separator must not be empty".to_string()));
                }
                let pieces: Vec<String> = if config.max_split > 0 {
                    input.splitn(config.max_split as usize + 1, separator).map(|s| s.trim().to_string()).collect()
                } else {
                    input.split(separator).map(|s| s.trim().to_string()).collect()
                };
                Outcome {
                    text: pieces.join(separator),
                    list: pieces.into_iter().map(Value::String).collect(),
                }
            }
            StringOperation::Substring => Outcome::text(substring(&input, config.start, config.end)),
            StringOperation::Trim => Outcome::text(input.trim().to_string()),
            StringOperation::Upper => Outcome::text(input.to_uppercase()),
            StringOperation::Lower => Outcome::text(input.to_lowercase()),
            StringOperation::Regex => extract(&input, config)?,
        };
        Ok(outcome)
    }
}

fn replace(
    input: &str,
    config: &StringConfig,
) -> Result<String> {
    if config.case_sensitive {
        return Ok(if config.replace_all {
            input.replace(&config.find, &config.replace_with)
        } else {
            input.replacen(&config.find, &config.replace_with, 1)
        });
    }

    let re = Regex::new(&format!("(?i){}", regex::escape(&config.find)))?;
    let replaced = if config.replace_all {
        re.replace_all(input, NoExpand(&config.replace_with))
    } else {
        re.replace(input, NoExpand(&config.replace_with))
    };
    Ok(replaced.into_owned())
}

/// Character slice with slice semantics: negative indices count from the end,
/// out-of-range indices clamp, and a missing or zero `end` means the end.
fn substring(
    input: &str,
    start: i64,
    end: Option<i64>,
) -> String {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len() as i64;
    let clamp = |i: i64| -> usize {
        if i < 0 { (len + i).max(0) as usize } else { i.min(len) as usize }
    };

    let from = clamp(start);
    let to = match end {
        None | Some(0) => len as usize,
        Some(e) => clamp(e),
    };
    if from >= to {
        return String::new();
    }
    chars[from..to].iter().collect()
}

fn extract(
    input: &str,
    config: &StringConfig,
) -> Result<Outcome> {
    if config.pattern.is_empty() {
        return Err(DagflowError::Node("regex operation needs a pattern".to_string()));
    }
    let re = Regex::new(&config.pattern)?;

    if config.find_all {
        let groups = re.captures_len() - 1;
        let list: Vec<Value> = re
            .captures_iter(input)
            .map(|caps| match groups {
                0 => json!(caps.get(0).map_or("", |m| m.as_str())),
                1 => json!(caps.get(1).map_or("", |m| m.as_str())),
                _ => Value::Array((1..=groups).map(|i| json!(caps.get(i).map_or("", |m| m.as_str()))).collect()),
            })
            .collect();
        return Ok(Outcome {
            text: Value::Array(list.clone()).to_string(),
            list,
        });
    }

    let text = re.captures(input).and_then(|caps| caps.get(config.group)).map(|m| m.as_str().to_string()).unwrap_or_default();
    Ok(Outcome::text(text))
}

#[async_trait]
impl NodeExecutor for StringExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::String
    }

    async fn execute(
        &self,
        data: &Value,
        ctx: &ExecutionContext,
        resolver: &Resolver,
    ) -> Result<Value> {
        let config = StringConfig::parse(data)?.resolved(ctx, resolver)?;
        let outcome = Self::run(&config, ctx, resolver)?;

        let length = outcome.text.chars().count();
        let mut output = Map::new();
        output.insert("result".to_string(), json!(outcome.text));
        output.insert("text".to_string(), json!(outcome.text));
        output.insert("length".to_string(), json!(length));
        output.insert("is_empty".to_string(), json!(outcome.text.is_empty()));
        output.insert("operation".to_string(), json!(config.operation.as_ref()));

        if let (Some(first), Some(last)) = (outcome.list.first(), outcome.list.last()) {
            output.insert("first".to_string(), first.clone());
            output.insert("last".to_string(), last.clone());
            output.insert("count".to_string(), json!(outcome.list.len()));
            output.insert("list".to_string(), Value::Array(outcome.list));
        }

        info!(operation = config.operation.as_ref(), length, "string operation completed");
        Ok(Value::Object(output))
    }
}
