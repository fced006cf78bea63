//! Desk Agent - AI agent execution engine.
//!
//! Provides the core agent loop that:
//! - Receives the conversation history
//! - Calls the LLM with instructions, history and tool definitions
//! - Runs requested tools (through the confirmation gate) and feeds results back
//! - Follows handoffs to other agents
//! - Returns the final text output, or a stream of run events
//!
//! ## Example
//!
//! ```ignore
//! use desk_agent::{Agent, ChatMessage, OpenAIProvider, Runner};
//! use desk_tools::ToolContext;
//!
//! let agent = Arc::new(
//!     Agent::builder("zendesk_agent")
//!         .instructions("Help with tickets")
//!         .model("gpt-4o-mini")
//!         .tools(tools)
//!         .build(),
//! );
//! let runner = Runner::new(Arc::new(OpenAIProvider::new(Some(key))));
//! let ctx = ToolContext::new("agent@example.com", &session_id);
//! let result = runner.run(agent, vec![ChatMessage::user("Hello!")], &ctx).await?;
//! println!("{}", result.final_output);
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod confirmation;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod provider;

pub use agent::{Agent, AgentBuilder};
pub use confirmation::{
    is_affirmative, ConfirmationGate, ConfirmationHandler, ConfirmationMode, PendingToolCall,
};
pub use desk_tools::ToolContext;
pub use error::AgentError;
pub use executor::{RunEvent, RunResult, RunStream, Runner, DEFAULT_MAX_TURNS};
pub use hooks::{AgentHooks, LoggingHooks, NoopHooks};
pub use provider::{
    ChatMessage, ChatRequest, ChatResponse, FunctionCall, OpenAIProvider, Provider, ProviderError,
    Role, TokenUsage, ToolCall,
};
