//! Runner integration tests against a scripted provider.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use desk_agent::{
    Agent, AgentError, AgentHooks, ChatMessage, ChatRequest, ChatResponse, ConfirmationGate,
    ConfirmationHandler, ConfirmationMode, PendingToolCall, Provider, ProviderError, Role,
    RunEvent, Runner, TokenUsage, ToolCall,
};
use desk_tools::{Tool, ToolContext, ToolResult};

/// Replays canned assistant messages and records every request.
struct ScriptedProvider {
    replies: Mutex<VecDeque<ChatMessage>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    fn new(replies: Vec<ChatMessage>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn supports_model(&self, _model: &str) -> bool {
        true
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        let message = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError {
                provider: "scripted".into(),
                model: model.clone(),
                message: "script exhausted".into(),
                status_code: None,
            })?;
        Ok(ChatResponse {
            provider: "scripted".into(),
            model,
            message,
            usage: TokenUsage::default(),
            finish_reason: None,
            latency_ms: 0,
        })
    }
}

/// Tool that counts invocations and remembers arguments.
struct CountingTool {
    name: &'static str,
    output: &'static str,
    calls: AtomicUsize,
    args: Mutex<Vec<Value>>,
}

impl CountingTool {
    fn new(name: &'static str, output: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            output,
            calls: AtomicUsize::new(0),
            args: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "test tool"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.args.lock().unwrap().push(args);
        Ok(ToolResult::success(self.output))
    }
}

struct Deny;

#[async_trait]
impl ConfirmationHandler for Deny {
    async fn confirm(&self, _call: &PendingToolCall) -> anyhow::Result<bool> {
        Ok(false)
    }
}

#[derive(Default)]
struct RecordingHooks {
    events: Mutex<Vec<String>>,
}

#[async_trait]
impl AgentHooks for RecordingHooks {
    async fn on_start(&self, _ctx: &ToolContext, agent: &Agent) {
        self.events.lock().unwrap().push(format!("start {}", agent.name()));
    }

    async fn on_handoff(&self, _ctx: &ToolContext, agent: &Agent, source: &Agent) {
        self.events
            .lock()
            .unwrap()
            .push(format!("handoff {} -> {}", source.name(), agent.name()));
    }

    async fn on_tool_end(&self, _ctx: &ToolContext, _agent: &Agent, tool: &str, result: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("tool {tool}: {result}"));
    }
}

fn call(id: &str, name: &str, args: Value) -> ChatMessage {
    ChatMessage::assistant_with_calls(None, vec![ToolCall::new(id, name, &args)])
}

fn ctx() -> ToolContext {
    ToolContext::new("agent@example.com", "session-1")
}

#[tokio::test]
async fn final_answer_without_tools() {
    let provider = ScriptedProvider::new(vec![ChatMessage::assistant("Hello! How can I help?")]);
    let agent = Arc::new(
        Agent::builder("zendesk_agent")
            .instructions("Be brief")
            .model("gpt-4o-mini")
            .build(),
    );

    let result = Runner::new(provider.clone())
        .run(agent, vec![ChatMessage::user("hi")], &ctx())
        .await
        .unwrap();

    assert_eq!(result.final_output, "Hello! How can I help?");
    assert_eq!(result.to_input_list().len(), 2);

    let requests = provider.requests();
    assert_eq!(requests[0].system.as_deref(), Some("Be brief"));
    assert_eq!(requests[0].model, "gpt-4o-mini");
}

#[tokio::test]
async fn tool_result_is_fed_back_to_the_model() {
    let search = CountingTool::new("Zendesk_SearchArticles", "2 articles found");
    let provider = ScriptedProvider::new(vec![
        call("call_1", "Zendesk_SearchArticles", json!({"query": "refund"})),
        ChatMessage::assistant("I found 2 articles about refunds."),
    ]);
    let agent = Arc::new(
        Agent::builder("zendesk_agent")
            .tool(search.clone())
            .build(),
    );

    let result = Runner::new(provider.clone())
        .run(agent, vec![ChatMessage::user("refund policy?")], &ctx())
        .await
        .unwrap();

    assert_eq!(search.calls(), 1);
    assert_eq!(result.new_items.len(), 3);
    assert_eq!(result.new_items[1], ChatMessage::tool("call_1", "2 articles found"));

    let second = &provider.requests()[1];
    assert_eq!(second.messages.last().unwrap().role, Role::Tool);
    assert_eq!(second.tools[0].name, "Zendesk_SearchArticles");
}

#[tokio::test]
async fn unknown_tool_is_reported_to_the_model() {
    let provider = ScriptedProvider::new(vec![
        call("call_1", "Zendesk_DeleteEverything", json!({})),
        ChatMessage::assistant("I can't do that."),
    ]);
    let agent = Arc::new(Agent::builder("zendesk_agent").build());

    let result = Runner::new(provider)
        .run(agent, vec![ChatMessage::user("delete all")], &ctx())
        .await
        .unwrap();

    assert_eq!(
        result.new_items[1].content.as_deref(),
        Some("Error: tool Zendesk_DeleteEverything not found")
    );
}

#[tokio::test]
async fn max_turns_is_enforced() {
    let who = CountingTool::new("Zendesk_WhoAmI", "me");
    let provider = ScriptedProvider::new(vec![
        call("c1", "Zendesk_WhoAmI", json!({})),
        call("c2", "Zendesk_WhoAmI", json!({})),
        call("c3", "Zendesk_WhoAmI", json!({})),
    ]);
    let agent = Arc::new(Agent::builder("zendesk_agent").tool(who.clone()).build());

    let err = Runner::new(provider)
        .with_max_turns(2)
        .run(agent, vec![ChatMessage::user("loop")], &ctx())
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::MaxTurnsExceeded(2)));
    assert_eq!(who.calls(), 2);
}

#[tokio::test]
async fn denied_call_aborts_the_run() {
    let solve = CountingTool::new("Zendesk_MarkTicketSolved", "solved");
    let gate = Arc::new(ConfirmationGate::new(
        ConfirmationMode::listed(["Zendesk_MarkTicketSolved"]),
        Arc::new(Deny),
    ));
    let provider = ScriptedProvider::new(vec![call(
        "call_1",
        "Zendesk_MarkTicketSolved",
        json!({"ticket_id": 7}),
    )]);
    let agent = Arc::new(
        Agent::builder("zendesk_agent")
            .tool(solve.clone())
            .confirmation(gate)
            .build(),
    );

    let err = Runner::new(provider)
        .run(agent, vec![ChatMessage::user("close 7")], &ctx())
        .await
        .unwrap_err();

    assert_eq!(err.denied_tool(), Some("Zendesk_MarkTicketSolved"));
    assert_eq!(solve.calls(), 0);
}

#[tokio::test]
async fn handoff_switches_agent_and_fires_hook() {
    let hooks = Arc::new(RecordingHooks::default());
    let billing = Arc::new(
        Agent::builder("billing")
            .instructions("You handle invoices")
            .hooks(hooks.clone())
            .build(),
    );
    let triage = Arc::new(
        Agent::builder("triage")
            .hooks(hooks.clone())
            .handoff(billing)
            .build(),
    );
    let provider = ScriptedProvider::new(vec![
        ChatMessage::assistant_with_calls(
            None,
            vec![
                ToolCall::new("h1", "transfer_to_billing", &json!({})),
                ToolCall::new("h2", "transfer_to_billing", &json!({})),
            ],
        ),
        ChatMessage::assistant("Your invoice is attached."),
    ]);

    let result = Runner::new(provider.clone())
        .run(triage, vec![ChatMessage::user("invoice please")], &ctx())
        .await
        .unwrap();

    assert_eq!(result.last_agent.name(), "billing");
    assert_eq!(result.final_output, "Your invoice is attached.");
    assert_eq!(
        result.new_items[2].content.as_deref(),
        Some("Multiple handoffs detected, ignoring this one.")
    );
    assert_eq!(
        provider.requests()[1].system.as_deref(),
        Some("You handle invoices")
    );
    assert_eq!(
        *hooks.events.lock().unwrap(),
        vec![
            "start triage".to_string(),
            "handoff triage -> billing".to_string(),
            "start billing".to_string(),
        ]
    );
}

#[tokio::test]
async fn streamed_run_reports_events_in_order() {
    let hooks = Arc::new(RecordingHooks::default());
    let who = CountingTool::new("Zendesk_WhoAmI", "Ada (admin)");
    let provider = ScriptedProvider::new(vec![
        ChatMessage::assistant_with_calls(
            Some("Let me check.".into()),
            vec![ToolCall::new("c1", "Zendesk_WhoAmI", &json!({}))],
        ),
        ChatMessage::assistant("You are Ada, an admin."),
    ]);
    let agent = Arc::new(
        Agent::builder("zendesk_agent")
            .tool(who.clone())
            .hooks(hooks.clone())
            .build(),
    );

    let mut stream = Runner::new(provider).run_streamed(
        agent,
        vec![ChatMessage::user("who am i")],
        ctx(),
    );
    let mut events = Vec::new();
    while let Some(event) = stream.next_event().await {
        events.push(event);
    }
    let result = stream.finish().await.unwrap();

    let agent = "zendesk_agent".to_string();
    assert_eq!(
        events,
        vec![
            RunEvent::AgentStart { agent: agent.clone() },
            RunEvent::Message { author: agent.clone(), text: "Let me check.".into() },
            RunEvent::ToolStart { agent: agent.clone(), tool: "Zendesk_WhoAmI".into() },
            RunEvent::ToolEnd { agent: agent.clone(), tool: "Zendesk_WhoAmI".into(), success: true },
            RunEvent::Message { author: agent.clone(), text: "You are Ada, an admin.".into() },
            RunEvent::AgentEnd { agent: agent.clone(), output: "You are Ada, an admin.".into() },
        ]
    );
    assert_eq!(result.final_output, "You are Ada, an admin.");
    assert!(hooks
        .events
        .lock()
        .unwrap()
        .contains(&"tool Zendesk_WhoAmI: Ada (admin)".to_string()));
}

#[tokio::test]
async fn provider_error_propagates() {
    let provider = ScriptedProvider::new(vec![]);
    let agent = Arc::new(Agent::builder("zendesk_agent").build());

    let err = Runner::new(provider)
        .run(agent, vec![ChatMessage::user("hi")], &ctx())
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Provider(e) if e.message == "script exhausted"));
}
