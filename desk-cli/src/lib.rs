//! Desk CLI - terminal front end of the Zendesk support agent.
//!
//! - `terminal`: shared stdin/stdout, approval prompt, authorization links
//! - `session`: the conversation loop and denial handling
//! - `startup`: tools, authorization, agent and runner wiring
//! - `prompts`: built-in agent instructions

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

pub mod cli;
pub mod prompts;
pub mod session;
pub mod startup;
pub mod terminal;

pub use cli::{Cli, Commands};
pub use session::{denial_entries, is_exit_command, OutputMode, Session, TurnOutcome};
pub use startup::{prepare_session, run_chat, run_tools, ChatOptions};
pub use terminal::{StdTerminal, Terminal};
