use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use desk_cli::{run_chat, run_tools, Cli, Commands, Terminal};
use desk_common::logging::init_logging;
use desk_common::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load_with_env(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) if e.is_config() => {
            anyhow::bail!("{e}\nCheck ~/.desk/config.json or the file given with --config.")
        }
        Err(e) => return Err(e).context("Failed to load configuration"),
    };
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    match cli.command.unwrap_or_default() {
        command @ Commands::Chat { .. } => {
            let options = command.chat_options().unwrap_or_default();
            run_chat(&config, options).await
        }
        Commands::Tools { confirm } => {
            run_tools(&config, Arc::new(Terminal::stdio()), confirm).await
        }
    }
}
