//! Context shared with tools and hooks for one session.

use serde_json::{Map, Value};

/// Context passed to every tool invocation and lifecycle hook.
///
/// Carries the identity the tool provider executes on behalf of, plus a
/// session id that correlates the logs of one conversation.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolContext {
    /// User identifier known to the tool provider
    pub user_id: String,
    /// Identifier of the current conversation
    pub session_id: String,
    /// Free-form values visible to hooks and tools
    pub extra: Map<String, Value>,
}

impl ToolContext {
    /// Create a new context for a user and session.
    pub fn new(user_id: &str, session_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            extra: Map::new(),
        }
    }

    /// Attach an extra value.
    pub fn with_value(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// The context rendered as a JSON object, as logged by lifecycle hooks.
    pub fn as_json(&self) -> Value {
        let mut map = self.extra.clone();
        map.insert("user_id".into(), Value::String(self.user_id.clone()));
        Value::Object(map)
    }
}
