//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use desk_common::ConfirmationPolicy;

use crate::session::OutputMode;
use crate::startup::ChatOptions;

/// `desk` - Zendesk support agent with human approval for sensitive actions.
#[derive(Parser, Debug)]
#[command(name = "desk")]
#[command(version)]
#[command(about = "Zendesk support agent backed by hosted tools, with human approval for sensitive calls.", long_about = None)]
pub struct Cli {
    /// Config file (defaults to ~/.desk/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Chat with the agent (default)
    Chat {
        /// How each turn is printed
        #[arg(long, value_enum, default_value_t = OutputMode::Final)]
        mode: OutputMode,

        /// Which tool calls need approval: listed, all or off
        #[arg(long, value_parser = parse_policy)]
        confirm: Option<ConfirmationPolicy>,
    },

    /// List the configured tools
    Tools {
        /// Which tool calls need approval: listed, all or off
        #[arg(long, value_parser = parse_policy)]
        confirm: Option<ConfirmationPolicy>,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Self::Chat {
            mode: OutputMode::default(),
            confirm: None,
        }
    }
}

impl Commands {
    pub fn chat_options(&self) -> Option<ChatOptions> {
        match *self {
            Self::Chat { mode, confirm } => Some(ChatOptions { mode, confirm }),
            Self::Tools { .. } => None,
        }
    }
}

fn parse_policy(value: &str) -> Result<ConfirmationPolicy, String> {
    value.parse().map_err(|e: desk_common::Error| e.to_string())
}
