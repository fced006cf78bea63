//! Errors raised while running an agent.

use thiserror::Error;

use crate::provider::ProviderError;

/// Error type for agent runs.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The user declined a gated tool call; the tool was not executed.
    #[error("User denied the call to {tool_name}")]
    UserDenied { tool_name: String },

    /// The model kept calling tools past the turn limit.
    #[error("Agent exceeded {0} turns without a final answer")]
    MaxTurnsExceeded(usize),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The tool could not be carried out at all.
    #[error("Tool {tool_name} failed: {error}")]
    Tool {
        tool_name: String,
        error: anyhow::Error,
    },

    /// Asking the user for approval failed.
    #[error("Confirmation failed: {0}")]
    Confirmation(String),
}

impl AgentError {
    /// Name of the denied tool, if this is a denial.
    pub fn denied_tool(&self) -> Option<&str> {
        match self {
            Self::UserDenied { tool_name } => Some(tool_name),
            _ => None,
        }
    }
}
