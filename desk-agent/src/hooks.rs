//! Agent lifecycle hooks.
//!
//! Observers of a run: every method has a no-op default, so an
//! implementation only overrides the events it cares about.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use desk_tools::ToolContext;

use crate::agent::Agent;

/// Callbacks fired by the runner as an agent works.
#[async_trait]
pub trait AgentHooks: Send + Sync {
    /// The agent is about to handle the conversation.
    async fn on_start(&self, _ctx: &ToolContext, _agent: &Agent) {}

    /// The agent produced its final output.
    async fn on_end(&self, _ctx: &ToolContext, _agent: &Agent, _output: &str) {}

    /// `source` handed the conversation to `agent`.
    async fn on_handoff(&self, _ctx: &ToolContext, _agent: &Agent, _source: &Agent) {}

    /// A tool is about to run (after any confirmation).
    async fn on_tool_start(&self, _ctx: &ToolContext, _agent: &Agent, _tool: &str) {}

    /// A tool finished; `result` is the text fed back to the model.
    async fn on_tool_end(&self, _ctx: &ToolContext, _agent: &Agent, _tool: &str, _result: &str) {}
}

/// Hooks that do nothing.
pub struct NoopHooks;

impl AgentHooks for NoopHooks {}

/// Hooks that number every event and log it.
pub struct LoggingHooks {
    display_name: String,
    counter: AtomicUsize,
}

impl LoggingHooks {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            counter: AtomicUsize::new(0),
        }
    }

    /// Number of events seen so far.
    pub fn event_count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    fn record(&self, event: String) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let line = format!("({}) {n}: {event}", self.display_name);
        tracing::info!(target: "desk_agent::lifecycle", "{line}");
        line
    }
}

#[async_trait]
impl AgentHooks for LoggingHooks {
    async fn on_start(&self, _ctx: &ToolContext, agent: &Agent) {
        self.record(format!("Agent {} started", agent.name()));
    }

    async fn on_end(&self, _ctx: &ToolContext, agent: &Agent, _output: &str) {
        self.record(format!("Agent {} ended", agent.name()));
    }

    async fn on_handoff(&self, _ctx: &ToolContext, agent: &Agent, source: &Agent) {
        self.record(format!(
            "Agent {} handed off to {}",
            source.name(),
            agent.name()
        ));
    }

    async fn on_tool_start(&self, ctx: &ToolContext, agent: &Agent, tool: &str) {
        self.record(format!(
            "Agent {} started tool {tool} with context: {}",
            agent.name(),
            ctx.as_json()
        ));
    }

    async fn on_tool_end(&self, _ctx: &ToolContext, agent: &Agent, tool: &str, _result: &str) {
        self.record(format!("Agent {} ended tool {tool}", agent.name()));
    }
}
