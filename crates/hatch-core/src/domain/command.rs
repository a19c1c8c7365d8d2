//! The resolved command context handed to the core by the CLI layer.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys that link a context to its parser session; never forwarded.
const PARENT_KEY: &str = "parent";

/// Structured command context: positional arguments plus recognised options.
///
/// Unknown options are kept in `extra` and forwarded to plugins untouched,
/// except internal keys (leading `_`, or `parent`) which are stripped at the
/// process boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandContext {
    /// Positional arguments in the order given.
    #[serde(skip)]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    #[serde(default)]
    pub force: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<PathBuf>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CommandContext {
    pub fn new(args: Vec<String>) -> Self {
        Self {
            args,
            ..Self::default()
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Options object with internal keys removed.
    pub fn sanitized_options(&self) -> Map<String, Value> {
        let mut options = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        options.retain(|key, _| !is_internal_key(key));
        options
    }

    /// The argument list forwarded to a plugin: every positional argument
    /// followed by the sanitized options object.
    pub fn to_payload(&self) -> Value {
        let mut list: Vec<Value> = self.args.iter().cloned().map(Value::String).collect();
        list.push(Value::Object(self.sanitized_options()));
        Value::Array(list)
    }
}

fn is_internal_key(key: &str) -> bool {
    key.starts_with('_') || key == PARENT_KEY
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_internal_keys() {
        let ctx = CommandContext::new(vec!["demo".into()])
            .with_option("_session", "abc")
            .with_option("parent", json!({"name": "hatch"}))
            .with_option("dryRun", true);
        let opts = ctx.sanitized_options();
        assert!(!opts.contains_key("_session"));
        assert!(!opts.contains_key("parent"));
        assert_eq!(opts["dryRun"], true);
        assert_eq!(opts["force"], false);
    }

    #[test]
    fn payload_is_args_then_options() {
        let ctx = CommandContext {
            project_name: Some("demo".into()),
            force: true,
            ..CommandContext::new(vec!["a".into(), "b".into()])
        };
        assert_eq!(
            ctx.to_payload(),
            json!(["a", "b", {"projectName": "demo", "force": true}])
        );
    }
}
