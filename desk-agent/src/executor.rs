//! Agent runner: the tool-calling loop.
//!
//! One run takes the conversation so far, calls the model, executes the tool
//! calls it asks for, feeds the results back and repeats until the model
//! answers without tool calls. Handoff calls switch the active agent.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use desk_tools::ToolContext;

use crate::agent::Agent;
use crate::confirmation::PendingToolCall;
use crate::error::AgentError;
use crate::provider::{ChatMessage, ChatRequest, Provider, ToolCall};

/// Model calls allowed per run unless configured otherwise.
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    AgentStart { agent: String },
    ToolStart { agent: String, tool: String },
    ToolEnd { agent: String, tool: String, success: bool },
    Handoff { from: String, to: String },
    /// Assistant text, attributed to the agent that wrote it
    Message { author: String, text: String },
    AgentEnd { agent: String, output: String },
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// History the run started from
    pub input: Vec<ChatMessage>,
    /// Entries produced by the run (assistant messages and tool results)
    pub new_items: Vec<ChatMessage>,
    pub final_output: String,
    pub last_agent: Arc<Agent>,
}

impl RunResult {
    /// History for the next turn: input followed by the new items.
    pub fn to_input_list(&self) -> Vec<ChatMessage> {
        let mut list = self.input.clone();
        list.extend(self.new_items.iter().cloned());
        list
    }
}

type RunFuture = Pin<Box<dyn Future<Output = Result<RunResult, AgentError>> + Send>>;

/// A run in progress whose events are read as they happen.
///
/// The run only advances while `next_event` or `finish` is awaited, so an
/// event is always delivered before the run moves past it.
pub struct RunStream {
    events: mpsc::UnboundedReceiver<RunEvent>,
    run: RunFuture,
    result: Option<Result<RunResult, AgentError>>,
}

impl RunStream {
    /// Next event, or `None` once the run has finished and all events are read.
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        loop {
            if let Ok(event) = self.events.try_recv() {
                return Some(event);
            }
            if self.result.is_some() {
                return None;
            }
            tokio::select! {
                biased;
                Some(event) = self.events.recv() => return Some(event),
                result = &mut self.run => self.result = Some(result),
            }
        }
    }

    /// Run to completion, discarding unread events.
    pub async fn finish(mut self) -> Result<RunResult, AgentError> {
        match self.result.take() {
            Some(result) => result,
            None => self.run.await,
        }
    }
}

struct EventSink(Option<mpsc::UnboundedSender<RunEvent>>);

impl EventSink {
    async fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.0 {
            if tx.send(event).is_ok() {
                // Let the reader see the event before the run continues.
                tokio::task::yield_now().await;
            }
        }
    }
}

/// Runs agents against an LLM provider.
#[derive(Clone)]
pub struct Runner {
    provider: Arc<dyn Provider>,
    max_turns: usize,
    temperature: Option<f64>,
    max_tokens: Option<i64>,
}

impl Runner {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            max_turns: DEFAULT_MAX_TURNS,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<i64>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Run `agent` on `input` until it produces a final output.
    pub async fn run(
        &self,
        agent: Arc<Agent>,
        input: Vec<ChatMessage>,
        ctx: &ToolContext,
    ) -> Result<RunResult, AgentError> {
        self.execute(agent, input, ctx, &EventSink(None)).await
    }

    /// Run `agent` on `input`, reporting progress as [`RunEvent`]s.
    pub fn run_streamed(
        &self,
        agent: Arc<Agent>,
        input: Vec<ChatMessage>,
        ctx: ToolContext,
    ) -> RunStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = self.clone();
        let run = Box::pin(async move {
            runner
                .execute(agent, input, &ctx, &EventSink(Some(tx)))
                .await
        });
        RunStream {
            events: rx,
            run,
            result: None,
        }
    }

    async fn execute(
        &self,
        starting_agent: Arc<Agent>,
        input: Vec<ChatMessage>,
        ctx: &ToolContext,
        events: &EventSink,
    ) -> Result<RunResult, AgentError> {
        let run_id = uuid::Uuid::new_v4();
        let mut agent = starting_agent;
        let mut new_items: Vec<ChatMessage> = Vec::new();

        tracing::debug!(%run_id, agent = %agent.name(), session_id = %ctx.session_id, "Run started");
        agent.hooks().on_start(ctx, &agent).await;
        events
            .emit(RunEvent::AgentStart {
                agent: agent.name().to_string(),
            })
            .await;

        for turn in 1..=self.max_turns {
            let mut messages = input.clone();
            messages.extend(new_items.iter().cloned());

            let instructions = agent.instructions();
            let request = ChatRequest {
                model: agent.model().to_string(),
                messages,
                tools: agent.tool_specs(),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
                system: (!instructions.is_empty()).then(|| instructions.to_string()),
            };

            tracing::debug!(%run_id, turn, agent = %agent.name(), "Calling model");
            let response = self.provider.chat(request).await?;
            let message = response.message;

            if let Some(text) = message.content_text() {
                events
                    .emit(RunEvent::Message {
                        author: agent.name().to_string(),
                        text: text.to_string(),
                    })
                    .await;
            }

            let tool_calls = message.tool_calls.clone();
            new_items.push(message.clone());

            if tool_calls.is_empty() {
                let output = message.content.unwrap_or_default();
                agent.hooks().on_end(ctx, &agent, &output).await;
                events
                    .emit(RunEvent::AgentEnd {
                        agent: agent.name().to_string(),
                        output: output.clone(),
                    })
                    .await;
                tracing::debug!(%run_id, turn, agent = %agent.name(), "Run finished");
                return Ok(RunResult {
                    input,
                    new_items,
                    final_output: output,
                    last_agent: agent,
                });
            }

            let mut next_agent: Option<Arc<Agent>> = None;
            for call in tool_calls {
                if let Some(target) = agent.find_handoff(&call.function.name).cloned() {
                    if next_agent.is_some() {
                        new_items.push(ChatMessage::tool(
                            call.id,
                            "Multiple handoffs detected, ignoring this one.",
                        ));
                        continue;
                    }
                    new_items.push(ChatMessage::tool(
                        call.id,
                        json!({"assistant": target.name()}).to_string(),
                    ));
                    tracing::info!(from = %agent.name(), to = %target.name(), "Handoff");
                    target.hooks().on_handoff(ctx, &target, &agent).await;
                    events
                        .emit(RunEvent::Handoff {
                            from: agent.name().to_string(),
                            to: target.name().to_string(),
                        })
                        .await;
                    next_agent = Some(target);
                    continue;
                }

                let call_id = call.id.clone();
                let output = self.invoke_tool(&agent, call, ctx, events).await?;
                new_items.push(ChatMessage::tool(call_id, output));
            }

            if let Some(next) = next_agent {
                agent = next;
                agent.hooks().on_start(ctx, &agent).await;
                events
                    .emit(RunEvent::AgentStart {
                        agent: agent.name().to_string(),
                    })
                    .await;
            }
        }

        tracing::warn!(%run_id, max_turns = self.max_turns, "Agent reached max turns");
        Err(AgentError::MaxTurnsExceeded(self.max_turns))
    }

    /// Execute one tool call and return the text for the model.
    async fn invoke_tool(
        &self,
        agent: &Agent,
        call: ToolCall,
        ctx: &ToolContext,
        events: &EventSink,
    ) -> Result<String, AgentError> {
        let name = call.function.name.clone();

        let Some(tool) = agent.find_tool(&name).cloned() else {
            tracing::warn!(tool = %name, agent = %agent.name(), "Model called an unknown tool");
            return Ok(format!("Error: tool {name} not found"));
        };

        let arguments = match call.parsed_arguments() {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Invalid tool arguments");
                return Ok(format!("Error: invalid JSON arguments for {name}: {e}"));
            }
        };

        let pending = PendingToolCall {
            call_id: call.id,
            tool_name: name.clone(),
            arguments,
        };

        let tool_name = name.clone();
        let run_tool = |args: Value| async move {
            agent.hooks().on_tool_start(ctx, agent, &name).await;
            events
                .emit(RunEvent::ToolStart {
                    agent: agent.name().to_string(),
                    tool: name.clone(),
                })
                .await;
            tracing::info!(tool = %name, "Executing tool");
            tool.execute(args, ctx).await
        };

        let result = match agent.confirmation() {
            Some(gate) => gate.guard(pending, run_tool).await?,
            None => run_tool(pending.arguments)
                .await
                .map_err(|error| AgentError::Tool {
                    tool_name: pending.tool_name,
                    error,
                })?,
        };

        if result.success {
            tracing::info!(tool = %tool_name, output_len = result.output.len(), "Tool succeeded");
        } else {
            tracing::warn!(tool = %tool_name, error = ?result.error, "Tool returned failure");
        }

        let text = result.to_model_text();
        agent.hooks().on_tool_end(ctx, agent, &tool_name, &text).await;
        events
            .emit(RunEvent::ToolEnd {
                agent: agent.name().to_string(),
                tool: tool_name,
                success: result.success,
            })
            .await;
        Ok(text)
    }
}
