//! Remote tool adapter - runs a provider tool on behalf of the session user.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::arcade::{ArcadeClient, ExecuteToolResponse, ToolDefinition};
use crate::authorization::{complete_authorization, AuthorizationNotifier};
use crate::context::ToolContext;
use crate::traits::{Tool, ToolResult};

/// A tool from the provider catalog exposed through the `Tool` trait.
pub struct ArcadeTool {
    definition: ToolDefinition,
    model_name: String,
    qualified_name: String,
    schema: Value,
    client: Arc<ArcadeClient>,
    notifier: Arc<dyn AuthorizationNotifier>,
}

impl ArcadeTool {
    pub fn new(
        definition: ToolDefinition,
        client: Arc<ArcadeClient>,
        notifier: Arc<dyn AuthorizationNotifier>,
    ) -> Self {
        Self {
            model_name: definition.model_name(),
            qualified_name: definition.qualified_name(),
            schema: definition.parameters_schema(),
            definition,
            client,
            notifier,
        }
    }

    /// Name used with the provider (`Toolkit.Name`).
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }
}

#[async_trait]
impl Tool for ArcadeTool {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn description(&self) -> &str {
        &self.definition.description
    }

    fn parameters_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let mut response = self
            .client
            .execute(&self.qualified_name, &args, &ctx.user_id)
            .await?;

        // Authorization can lapse between startup and use; settle it and retry once.
        if let Some(authorization) = response.pending_authorization().cloned() {
            tracing::info!(tool = %self.qualified_name, "Authorization required at invocation");
            complete_authorization(
                &self.client,
                &self.qualified_name,
                authorization,
                self.notifier.as_ref(),
            )
            .await?;
            response = self
                .client
                .execute(&self.qualified_name, &args, &ctx.user_id)
                .await?;
        }

        Ok(to_tool_result(&self.qualified_name, response))
    }
}

fn render_value(value: Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

fn to_tool_result(tool_name: &str, response: ExecuteToolResponse) -> ToolResult {
    if response.pending_authorization().is_some() {
        return ToolResult::failure(format!("Authorization for {tool_name} is still pending"));
    }

    let success = response.success;
    let output = response.output.unwrap_or_default();
    if success {
        return ToolResult::success(render_value(output.value));
    }

    match output.error {
        Some(error) => ToolResult::failure_with_output(render_value(output.value), error.message),
        None => ToolResult::failure(format!("{tool_name} failed without an error message")),
    }
}
