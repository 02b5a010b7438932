use serde_json::{Map, Value};

use crate::{DagflowError, Result, workflow::node::NodeId};

/// Reserved context key holding the run's trigger input.
pub const INPUT_KEY: &str = "input";

/// Per-run mapping from node id to the output that node produced.
///
/// Starts out holding only [`INPUT_KEY`] and only ever grows: a committed
/// output is never replaced or removed.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    outputs: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new(input: Value) -> Self {
        let mut outputs = Map::new();
        outputs.insert(INPUT_KEY.to_string(), input);
        Self {
            outputs,
        }
    }

    /// The run's trigger input.
    pub fn input(&self) -> &Value {
        self.outputs.get(INPUT_KEY).unwrap_or(&Value::Null)
    }

    pub fn get(
        &self,
        nid: &str,
    ) -> Option<&Value> {
        self.outputs.get(nid)
    }

    pub fn contains(
        &self,
        nid: &str,
    ) -> bool {
        self.outputs.contains_key(nid)
    }

    /// Record a node's output.
    pub fn commit(
        &mut self,
        nid: NodeId,
        output: Value,
    ) -> Result<()> {
        if self.outputs.contains_key(&nid) {
            return Err(DagflowError::Workflow(format!("output for '{}' is already committed", nid)));
        }
        self.outputs.insert(nid, output);
        Ok(())
    }

    /// All node outputs except the trigger input, as a JSON object.
    pub fn node_outputs(&self) -> Value {
        let map: Map<String, Value> = self.outputs.iter().filter(|(k, _)| k.as_str() != INPUT_KEY).map(|(k, v)| (k.clone(), v.clone())).collect();
        Value::Object(map)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_new_holds_only_input() {
        let ctx = ExecutionContext::new(json!({"q": "hi"}));
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.input(), &json!({"q": "hi"}));
        assert_eq!(ctx.node_outputs(), json!({}));
    }

    #[test]
    fn test_commit_is_monotonic() {
        let mut ctx = ExecutionContext::new(json!({}));
        ctx.commit("a".to_string(), json!({"x": 1})).unwrap();
        assert!(ctx.commit("a".to_string(), json!({"x": 2})).is_err());
        assert_eq!(ctx.get("a"), Some(&json!({"x": 1})));
    }

    #[test]
    fn test_input_key_cannot_be_overwritten() {
        let mut ctx = ExecutionContext::new(json!({"x": 1}));
        assert!(ctx.commit(INPUT_KEY.to_string(), json!(null)).is_err());
    }

    #[test]
    fn test_node_outputs_excludes_input() {
        let mut ctx = ExecutionContext::new(json!({"x": 1}));
        ctx.commit("b".to_string(), json!("two")).unwrap();
        ctx.commit("a".to_string(), json!(1)).unwrap();
        assert_eq!(ctx.node_outputs(), json!({"a": 1, "b": "two"}));
    }
}
