//! Startup wiring: tools, authorization, agent, runner and session.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncWrite};

use desk_agent::{
    Agent, AgentHooks, ConfirmationGate, ConfirmationHandler, ConfirmationMode, LoggingHooks,
    NoopHooks, OpenAIProvider, Provider, Runner,
};
use desk_common::logging::generate_session_id;
use desk_common::{Config, ConfirmationPolicy, SessionSettings};
use desk_tools::{
    authorize_tool, fetch_tools, ArcadeClient, ArcadeTool, AuthorizationNotifier, CatalogRequest,
    SilentNotifier, Tool, ToolContext,
};

use crate::prompts::{DEFAULT_INSTRUCTIONS, HANDOFF_DESCRIPTION};
use crate::session::{OutputMode, Session};
use crate::terminal::Terminal;

/// Options of the `chat` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatOptions {
    pub mode: OutputMode,
    /// Overrides `confirmation.policy` from the configuration
    pub confirm: Option<ConfirmationPolicy>,
}

pub fn arcade_client(config: &Config) -> Arc<ArcadeClient> {
    Arc::new(ArcadeClient::new(
        &config.arcade.base_url,
        config.arcade.api_key.as_deref(),
    ))
}

pub fn catalog_request(config: &Config) -> CatalogRequest {
    CatalogRequest {
        toolkits: config.agent.toolkits.clone(),
        tools: config.agent.tools.clone(),
        limit: config.agent.tool_limit,
    }
}

/// Gate mode from configuration, with an optional command-line override.
pub fn confirmation_mode(config: &Config, policy: Option<ConfirmationPolicy>) -> ConfirmationMode {
    ConfirmationMode::from_policy(
        policy.unwrap_or(config.confirmation.policy),
        &config.confirmation.tools,
    )
}

/// Fetch the configured tools; when `user_id` is given, authorize each one for that user.
///
/// Any authorization that does not complete aborts startup.
pub async fn load_tools(
    config: &Config,
    client: Arc<ArcadeClient>,
    notifier: Arc<dyn AuthorizationNotifier>,
    user_id: Option<&str>,
) -> Result<Vec<Arc<ArcadeTool>>> {
    let definitions = fetch_tools(&client, &catalog_request(config))
        .await
        .context("Failed to fetch tool definitions")?;

    if definitions.is_empty() {
        tracing::warn!("No tools matched the configured toolkits and tools");
    }

    let mut tools = Vec::with_capacity(definitions.len());
    for definition in definitions {
        let qualified_name = definition.qualified_name();
        if let Some(user_id) = user_id {
            authorize_tool(&client, &qualified_name, user_id, notifier.as_ref())
                .await
                .with_context(|| format!("Authorization failed for {qualified_name}"))?;
            tracing::debug!(tool = %qualified_name, "Tool authorized");
        }
        tools.push(Arc::new(ArcadeTool::new(
            definition,
            client.clone(),
            notifier.clone(),
        )));
    }

    tracing::info!(count = tools.len(), "Tools ready");
    Ok(tools)
}

pub fn build_runner(config: &Config, model: &str) -> Runner {
    let provider = OpenAIProvider::with_base_url(config.llm.api_key.as_deref(), &config.llm.base_url);
    if !provider.supports_model(model) {
        tracing::warn!(model = %model, provider = provider.name(), "Model may not be supported");
    }

    Runner::new(Arc::new(provider))
        .with_max_turns(config.agent.max_turns)
        .with_temperature(config.llm.temperature)
        .with_max_tokens(config.llm.max_tokens)
}

pub fn build_agent(
    config: &Config,
    settings: &SessionSettings,
    tools: Vec<Arc<dyn Tool>>,
    gate: Option<Arc<ConfirmationGate>>,
) -> Agent {
    let hooks: Arc<dyn AgentHooks> = if config.agent.log_lifecycle {
        Arc::new(LoggingHooks::new(config.agent.display_name.clone()))
    } else {
        Arc::new(NoopHooks)
    };

    let instructions = config
        .agent
        .instructions
        .clone()
        .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string());

    let mut builder = Agent::builder(config.agent.name.clone())
        .instructions(instructions)
        .model(settings.model.clone())
        .handoff_description(HANDOFF_DESCRIPTION)
        .tools(tools)
        .hooks(hooks);
    if let Some(gate) = gate {
        builder = builder.confirmation(gate);
    }
    builder.build()
}

/// Everything a chat session needs, ready to run.
pub async fn prepare_session<R, W>(
    config: &Config,
    terminal: Arc<Terminal<R, W>>,
    options: ChatOptions,
) -> Result<Session<R, W>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let settings = config.session_settings()?;

    let client = arcade_client(config);
    let tools = load_tools(
        config,
        client,
        terminal.clone(),
        Some(&settings.user_id),
    )
    .await?;

    let mode = confirmation_mode(config, options.confirm);
    let gate = (mode != ConfirmationMode::Off).then(|| {
        let handler: Arc<dyn ConfirmationHandler> = terminal.clone();
        Arc::new(ConfirmationGate::new(mode, handler))
    });

    let tools: Vec<Arc<dyn Tool>> = tools
        .into_iter()
        .map(|t| t as Arc<dyn Tool>)
        .collect();
    let agent = Arc::new(build_agent(config, &settings, tools, gate));
    let runner = build_runner(config, &settings.model);

    let ctx = ToolContext::new(&settings.user_id, &generate_session_id());
    tracing::info!(agent = ?agent, session_id = %ctx.session_id, "Agent ready");

    Ok(Session::new(runner, agent, terminal, ctx, options.mode))
}

/// `desk chat`: run the interactive session on stdin/stdout.
pub async fn run_chat(config: &Config, options: ChatOptions) -> Result<()> {
    let terminal = Arc::new(Terminal::stdio());
    let mut session = prepare_session(config, terminal, options).await?;
    session.run().await
}

/// `desk tools`: list the configured tools and whether calls to them need approval.
pub async fn run_tools<R, W>(
    config: &Config,
    terminal: Arc<Terminal<R, W>>,
    policy: Option<ConfirmationPolicy>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let client = arcade_client(config);
    let tools = load_tools(config, client, Arc::new(SilentNotifier), None).await?;
    let mode = confirmation_mode(config, policy);

    for tool in &tools {
        let marker = if mode.applies_to(tool.name()) {
            " [approval required]"
        } else {
            ""
        };
        terminal.print(&format!("{}{marker}", tool.name())).await?;
        if !tool.description().is_empty() {
            terminal.print(&format!("    {}", tool.description())).await?;
        }
    }
    terminal
        .print(&format!("{} tools", tools.len()))
        .await?;
    Ok(())
}
