//! The tool seam between the agent loop and whatever actually does the work.
//!
//! Hosted Zendesk tools, test doubles and anything else the agent may call
//! go through [`Tool`]; the loop only ever sees [`ToolSpec`] and [`ToolResult`].

use crate::context::ToolContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of one tool call as the model will see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    /// Rendered value; JSON values are kept as compact JSON text
    pub output: String,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
        }
    }

    /// Failure that still carries whatever the tool produced.
    pub fn failure_with_output(output: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            error: Some(error.into()),
        }
    }

    /// Text handed back to the model as the tool message content.
    pub fn to_model_text(&self) -> String {
        if self.success {
            return self.output.clone();
        }
        let error = self.error.as_deref().unwrap_or("tool failed");
        if self.output.is_empty() {
            format!("Error: {error}")
        } else {
            format!("Error: {error}\n{}", self.output)
        }
    }
}

/// Function declaration offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Same as [`Tool::name`]; the model calls the tool by this name
    pub name: String,
    pub description: String,
    /// JSON Schema object describing the arguments
    pub parameters: serde_json::Value,
}

/// Something the agent can call.
///
/// Names must be unique within an agent and may not contain dots, since
/// function-calling APIs reject them.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters_schema(&self) -> serde_json::Value;

    /// Run the call on behalf of `ctx.user_id`.
    ///
    /// `Err` means the call could not be carried out at all (network,
    /// malformed response); a tool-level failure is an `Ok` with
    /// `success == false`.
    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> anyhow::Result<ToolResult>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_text_of_success_is_the_output() {
        let result = ToolResult::success(r#"{"ticket_id":7,"status":"solved"}"#);
        assert!(result.error.is_none());
        assert_eq!(result.to_model_text(), r#"{"ticket_id":7,"status":"solved"}"#);
    }

    #[test]
    fn model_text_of_failure_leads_with_the_error() {
        let bare = ToolResult::failure("ticket 7 not found");
        assert_eq!(bare.to_model_text(), "Error: ticket 7 not found");

        let partial = ToolResult::failure_with_output("[]", "search timed out");
        assert!(!partial.success);
        assert_eq!(partial.to_model_text(), "Error: search timed out\n[]");
    }

    #[test]
    fn model_text_without_error_message() {
        let result = ToolResult {
            success: false,
            output: String::new(),
            error: None,
        };
        assert_eq!(result.to_model_text(), "Error: tool failed");
    }

    #[test]
    fn tool_spec_serializes() {
        let spec = ToolSpec {
            name: "Zendesk_WhoAmI".to_string(),
            description: "Who am I".to_string(),
            parameters: serde_json::json!({"type": "object"}),
        };
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"name\":\"Zendesk_WhoAmI\""));
    }
}
