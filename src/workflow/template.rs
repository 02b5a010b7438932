//! Variable interpolation for node configuration.
//!
//! Tokens have the form `{path}` where `path` is `input.<field>`, `<node_id>` or
//! `<node_id>.<dotted.field.path>`. Each token is resolved once against the
//! [`ExecutionContext`]; substituted text is never scanned again.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::{DagflowError, Result, UnresolvedPolicy, runtime::ExecutionContext};

/// Regex pattern for template variables
/// Format: `{nodeId}`, `{nodeId.key}` or `{input.key.subkey}`
const TEMPLATE_PATTERN: &str = r"\{([^{}]+)\}";

static TEMPLATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(TEMPLATE_PATTERN).expect("template pattern is a valid regex"));

/// Resolves `{path}` tokens against an execution context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resolver {
    policy: UnresolvedPolicy,
}

impl Resolver {
    pub fn new(policy: UnresolvedPolicy) -> Self {
        Self {
            policy,
        }
    }

    pub fn policy(&self) -> UnresolvedPolicy {
        self.policy
    }

    /// Resolve every token in `template`.
    ///
    /// Under [`UnresolvedPolicy::Leave`] this never fails: tokens that do not
    /// resolve, or resolve to `null`, are copied to the output verbatim.
    pub fn resolve(
        &self,
        template: &str,
        ctx: &ExecutionContext,
    ) -> Result<String> {
        let mut missing: Vec<String> = Vec::new();

        let resolved = TEMPLATE_RE.replace_all(template, |caps: &Captures| {
            let full_match = &caps[0];
            match self.lookup(&caps[1], ctx).and_then(to_text) {
                Some(text) => text,
                None => {
                    missing.push(full_match.to_string());
                    full_match.to_string()
                }
            }
        });

        if self.policy == UnresolvedPolicy::Fail && !missing.is_empty() {
            return Err(DagflowError::Template(format!("unresolved variables: {}", missing.join(", "))));
        }

        Ok(resolved.into_owned())
    }

    /// Resolve template variables in every string leaf of a JSON value.
    pub fn resolve_value(
        &self,
        value: &Value,
        ctx: &ExecutionContext,
    ) -> Result<Value> {
        match value {
            Value::String(s) => Ok(Value::String(self.resolve(s, ctx)?)),
            Value::Array(arr) => {
                let resolved: Result<Vec<Value>> = arr.iter().map(|v| self.resolve_value(v, ctx)).collect();
                Ok(Value::Array(resolved?))
            }
            Value::Object(obj) => {
                let resolved: Result<serde_json::Map<String, Value>> = obj.iter().map(|(k, v)| self.resolve_value(v, ctx).map(|rv| (k.clone(), rv))).collect();
                Ok(Value::Object(resolved?))
            }
            _ => Ok(value.clone()),
        }
    }

    /// Look up a dotted path: the first segment names a context entry, the rest
    /// descend into objects (or arrays, by index).
    pub fn lookup<'a>(
        &self,
        path: &str,
        ctx: &'a ExecutionContext,
    ) -> Option<&'a Value> {
        let mut keys = path.split('.');
        let mut current = ctx.get(keys.next()?)?;

        for key in keys {
            current = match current {
                Value::Object(map) => map.get(key)?,
                Value::Array(arr) => arr.get(key.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(current)
    }
}

/// Resolve `template` with the default leave-unresolved policy.
pub fn resolve(
    template: &str,
    ctx: &ExecutionContext,
) -> String {
    // Leave never reports misses
    Resolver::default().resolve(template, ctx).unwrap_or_else(|_| template.to_string())
}

/// Text form used for substitution. `null` counts as unresolved.
fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        v => Some(v.to_string()),
    }
}
