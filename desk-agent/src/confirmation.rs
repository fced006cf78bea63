//! Human-in-the-loop confirmation gate.
//!
//! A tool call the model requests passes through the gate before the tool
//! runs. For gated tools the gate asks a `ConfirmationHandler` (the terminal
//! in the CLI) and only calls the next handler on approval. A denial is the
//! distinct `AgentError::UserDenied` so the session can answer politely.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use desk_common::ConfirmationPolicy;
use desk_tools::ToolResult;

use crate::error::AgentError;

/// A tool call waiting for a decision.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingToolCall {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
}

/// Asks a human whether a tool call may proceed.
#[async_trait]
pub trait ConfirmationHandler: Send + Sync {
    /// Returns true if approved, false if rejected.
    async fn confirm(&self, call: &PendingToolCall) -> anyhow::Result<bool>;
}

/// Whether a reply approves the call (`y` or `yes`, any case).
pub fn is_affirmative(reply: &str) -> bool {
    matches!(reply.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Which tool calls the gate intercepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationMode {
    /// Every tool call
    All,
    /// Only the named tools
    Listed(HashSet<String>),
    /// Nothing
    Off,
}

impl ConfirmationMode {
    pub fn listed<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Listed(names.into_iter().map(Into::into).collect())
    }

    /// Build the mode from configuration.
    pub fn from_policy(policy: ConfirmationPolicy, tools: &[String]) -> Self {
        match policy {
            ConfirmationPolicy::Listed => Self::listed(tools.iter().cloned()),
            ConfirmationPolicy::All => Self::All,
            ConfirmationPolicy::Off => Self::Off,
        }
    }

    pub fn applies_to(&self, tool_name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Listed(names) => names.contains(tool_name),
            Self::Off => false,
        }
    }
}

/// Approval checkpoint composed around a tool handler.
pub struct ConfirmationGate {
    mode: ConfirmationMode,
    handler: Arc<dyn ConfirmationHandler>,
}

impl ConfirmationGate {
    pub fn new(mode: ConfirmationMode, handler: Arc<dyn ConfirmationHandler>) -> Self {
        Self { mode, handler }
    }

    pub fn mode(&self) -> &ConfirmationMode {
        &self.mode
    }

    pub fn requires_confirmation(&self, tool_name: &str) -> bool {
        self.mode.applies_to(tool_name)
    }

    /// Run `next` with the call's arguments, asking first if the tool is gated.
    ///
    /// On approval `next` runs exactly once and its result is returned as is.
    /// On denial `next` is never called.
    pub async fn guard<F, Fut>(
        &self,
        call: PendingToolCall,
        next: F,
    ) -> Result<ToolResult, AgentError>
    where
        F: FnOnce(Value) -> Fut,
        Fut: Future<Output = anyhow::Result<ToolResult>>,
    {
        if self.requires_confirmation(&call.tool_name) {
            let approved = self
                .handler
                .confirm(&call)
                .await
                .map_err(|e| AgentError::Confirmation(e.to_string()))?;

            if !approved {
                tracing::info!(tool = %call.tool_name, call_id = %call.call_id, "Tool call denied");
                return Err(AgentError::UserDenied {
                    tool_name: call.tool_name,
                });
            }
            tracing::info!(tool = %call.tool_name, call_id = %call.call_id, "Tool call approved");
        }

        let PendingToolCall {
            tool_name,
            arguments,
            ..
        } = call;
        next(arguments)
            .await
            .map_err(|error| AgentError::Tool { tool_name, error })
    }
}
