//! Desk Tools - tool system for the support agent.
//!
//! Provides a trait-based tool system and the client for the hosted tool
//! provider (Arcade):
//! - `Tool` trait, results and function-calling specs
//! - Arcade HTTP client (catalog, authorization, execution)
//! - Remote tool adapter that executes provider tools for a user
//! - Per-user authorization flow

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod arcade;
pub mod authorization;
pub mod catalog;
pub mod context;
pub mod remote;
pub mod traits;

pub use traits::{Tool, ToolResult, ToolSpec};

pub use arcade::{
    ArcadeClient, ArcadeError, AuthorizationResponse, AuthorizationStatus, ToolDefinition,
};
pub use authorization::{
    authorize_tool, complete_authorization, AuthorizationNotifier, SilentNotifier,
};
pub use catalog::{fetch_tools, CatalogRequest};
pub use context::ToolContext;
pub use remote::ArcadeTool;
