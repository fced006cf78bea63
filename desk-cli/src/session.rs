//! The conversation loop.
//!
//! Owns the history: every turn appends the user's line, runs the agent on
//! the whole history and keeps the run's input list for the next turn. A
//! denied tool call becomes three synthetic entries instead of an error.

use std::sync::Arc;

use anyhow::Result;
use clap::ValueEnum;
use tokio::io::{AsyncBufRead, AsyncWrite};

use desk_agent::{Agent, AgentError, ChatMessage, RunEvent, RunResult, Runner};
use desk_tools::ToolContext;

use crate::terminal::Terminal;

/// What the user says, in the synthetic history, after denying a call.
pub const DENIAL_USER_REPLY: &str = "I changed my mind, please don't do it!";

/// How each turn is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputMode {
    /// Print the final output of each run
    #[default]
    Final,
    /// Print every assistant message as it happens
    Events,
}

impl OutputMode {
    pub fn prompt(self) -> &'static str {
        match self {
            Self::Final => "You: ",
            Self::Events => "User: ",
        }
    }
}

/// Whether a line ends the session.
pub fn is_exit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

/// History entries recorded when the user denies a call to `tool_name`.
pub fn denial_entries(tool_name: &str) -> [ChatMessage; 3] {
    [
        ChatMessage::assistant(format!("Please confirm the call to {tool_name}")),
        ChatMessage::user(DENIAL_USER_REPLY),
        ChatMessage::assistant(format!(
            "Sure, I cancelled the call to {tool_name}. What else can I do for you today?"
        )),
    ]
}

/// Result of handling one line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The agent finished; its final output
    Completed(String),
    /// The user denied a tool call; the acknowledgment shown to them
    Denied(String),
}

pub struct Session<R, W> {
    runner: Runner,
    agent: Arc<Agent>,
    terminal: Arc<Terminal<R, W>>,
    ctx: ToolContext,
    mode: OutputMode,
    history: Vec<ChatMessage>,
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(
        runner: Runner,
        agent: Arc<Agent>,
        terminal: Arc<Terminal<R, W>>,
        ctx: ToolContext,
        mode: OutputMode,
    ) -> Self {
        Self {
            runner,
            agent,
            terminal,
            ctx,
            mode,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Read lines until `exit` or end of input.
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!(session_id = %self.ctx.session_id, mode = ?self.mode, "Session started");

        while let Some(line) = self.terminal.read_line(self.mode.prompt()).await? {
            if is_exit_command(&line) {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            self.handle_input(&line).await?;
        }

        if self.mode == OutputMode::Events {
            self.terminal.print("Goodbye!").await?;
        }
        tracing::info!(session_id = %self.ctx.session_id, entries = self.history.len(), "Session ended");
        Ok(())
    }

    /// Run one turn for `line` and print its output.
    pub async fn handle_input(&mut self, line: &str) -> Result<TurnOutcome> {
        self.history.push(ChatMessage::user(line.trim()));

        let run = match self.mode {
            OutputMode::Final => {
                self.runner
                    .run(self.agent.clone(), self.history.clone(), &self.ctx)
                    .await
            }
            OutputMode::Events => self.run_streamed().await?,
        };

        match run {
            Ok(result) => {
                self.history = result.to_input_list();
                if self.mode == OutputMode::Final {
                    self.terminal.print(&result.final_output).await?;
                }
                Ok(TurnOutcome::Completed(result.final_output))
            }
            Err(AgentError::UserDenied { tool_name }) => {
                let entries = denial_entries(&tool_name);
                let ack = entries[2].content.clone().unwrap_or_default();
                self.history.extend(entries);
                self.terminal.print(&ack).await?;
                Ok(TurnOutcome::Denied(ack))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn run_streamed(&self) -> Result<Result<RunResult, AgentError>> {
        let mut stream =
            self.runner
                .run_streamed(self.agent.clone(), self.history.clone(), self.ctx.clone());

        while let Some(event) = stream.next_event().await {
            if let RunEvent::Message { author, text } = event {
                self.terminal.print(&format!("** {author}: {text}")).await?;
            }
        }
        Ok(stream.finish().await)
    }
}
