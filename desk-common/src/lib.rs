//! Desk Common - Shared types and utilities for the desk support agent.
//!
//! This crate provides:
//! - Configuration types and loading (file + environment)
//! - Error types and handling utilities
//! - Logging setup
//! - Small string helpers used when printing tool traffic

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod util;

pub use config::{
    AgentConfig, ArcadeConfig, Config, ConfirmationConfig, ConfirmationPolicy, LlmConfig,
    ObservabilityConfig, SessionSettings,
};
pub use error::{Error, Result};

