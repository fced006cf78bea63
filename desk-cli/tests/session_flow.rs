//! End-to-end session tests: scripted model, in-memory terminal, counting tools.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use test_case::test_case;

use desk_agent::{
    Agent, ChatMessage, ChatRequest, ChatResponse, ConfirmationGate, ConfirmationMode, Provider,
    ProviderError, Role, Runner, TokenUsage, ToolCall,
};
use desk_cli::{OutputMode, Session, Terminal, TurnOutcome};
use desk_tools::{Tool, ToolContext, ToolResult};

type MemTerminal = Terminal<Cursor<Vec<u8>>, Vec<u8>>;

struct ScriptedProvider {
    replies: Mutex<VecDeque<ChatMessage>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(replies: Vec<ChatMessage>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        })
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
        self.calls.fetch_add(1, Ordering::SeqCst);
        let message = self.replies.lock().unwrap().pop_front().ok_or(ProviderError {
            provider: "scripted".into(),
            model: request.model.clone(),
            message: "script exhausted".into(),
            status_code: None,
        })?;
        Ok(ChatResponse {
            provider: "scripted".into(),
            model: request.model,
            message,
            usage: TokenUsage::default(),
            finish_reason: None,
            latency_ms: 0,
        })
    }
}

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
        "counting tool"
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

struct Fixture {
    session: Session<Cursor<Vec<u8>>, Vec<u8>>,
    terminal: Arc<MemTerminal>,
    provider: Arc<ScriptedProvider>,
    solve: Arc<CountingTool>,
    search: Arc<CountingTool>,
}

fn fixture(input: &str, replies: Vec<ChatMessage>, mode: OutputMode) -> Fixture {
    let terminal = Arc::new(Terminal::new(
        Cursor::new(input.as_bytes().to_vec()),
        Vec::new(),
    ));
    let provider = ScriptedProvider::new(replies);
    let solve = CountingTool::new("Zendesk_MarkTicketSolved", "Ticket 7 solved");
    let search = CountingTool::new("Zendesk_SearchArticles", "Found: Refund policy");

    let gate = Arc::new(ConfirmationGate::new(
        ConfirmationMode::listed(["Zendesk_AddTicketComment", "Zendesk_MarkTicketSolved"]),
        terminal.clone(),
    ));
    let agent = Arc::new(
        Agent::builder("zendesk_agent")
            .model("test-model")
            .tool(solve.clone())
            .tool(search.clone())
            .confirmation(gate)
            .build(),
    );

    let session = Session::new(
        Runner::new(provider.clone()),
        agent,
        terminal.clone(),
        ToolContext::new("agent@example.com", "session-1"),
        mode,
    );

    Fixture {
        session,
        terminal,
        provider,
        solve,
        search,
    }
}

fn tool_call(name: &str, args: Value) -> ChatMessage {
    ChatMessage::assistant_with_calls(None, vec![ToolCall::new("call_1", name, &args)])
}

const ACK: &str =
    "Sure, I cancelled the call to Zendesk_MarkTicketSolved. What else can I do for you today?";

#[tokio::test]
async fn denied_sensitive_call_is_not_executed() {
    let mut f = fixture(
        "no\n",
        vec![tool_call("Zendesk_MarkTicketSolved", json!({"ticket_id": 7}))],
        OutputMode::Final,
    );

    let outcome = f.session.handle_input("Please close ticket 7").await.unwrap();

    assert_eq!(outcome, TurnOutcome::Denied(ACK.to_string()));
    assert_eq!(f.solve.calls(), 0);

    let history = f.session.history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0], ChatMessage::user("Please close ticket 7"));
    assert_eq!(
        history[1],
        ChatMessage::assistant("Please confirm the call to Zendesk_MarkTicketSolved")
    );
    assert_eq!(
        history[2],
        ChatMessage::user("I changed my mind, please don't do it!")
    );
    assert_eq!(history[3], ChatMessage::assistant(ACK));

    let out = f.terminal.written().await;
    assert!(out.contains("Human approval required for tool call Zendesk_MarkTicketSolved"));
    assert!(out.ends_with(&format!("[y/N]: {ACK}\n")));
}

#[tokio::test]
async fn approved_call_runs_once_with_original_arguments() {
    let mut f = fixture(
        "yes\n",
        vec![
            tool_call("Zendesk_MarkTicketSolved", json!({"ticket_id": 7})),
            ChatMessage::assistant("Ticket 7 is now solved."),
        ],
        OutputMode::Final,
    );

    let outcome = f.session.handle_input("close 7").await.unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::Completed("Ticket 7 is now solved.".into())
    );
    assert_eq!(f.solve.calls(), 1);
    assert_eq!(*f.solve.args.lock().unwrap(), vec![json!({"ticket_id": 7})]);

    let tool_entry = &f.session.history()[2];
    assert_eq!(tool_entry.role, Role::Tool);
    assert_eq!(tool_entry.content.as_deref(), Some("Ticket 7 solved"));
    assert!(f.terminal.written().await.ends_with("Ticket 7 is now solved.\n"));
}

#[tokio::test]
async fn non_sensitive_tool_runs_without_prompt() {
    let mut f = fixture(
        "",
        vec![
            tool_call("Zendesk_SearchArticles", json!({"query": "refund"})),
            ChatMessage::assistant("Here is the refund policy."),
        ],
        OutputMode::Final,
    );

    f.session.handle_input("refund policy?").await.unwrap();

    assert_eq!(f.search.calls(), 1);
    assert!(!f.terminal.written().await.contains("[y/N]"));
    assert!(f
        .session
        .history()
        .iter()
        .any(|m| m.role == Role::Tool && m.content.as_deref() == Some("Found: Refund policy")));
}

#[test_case("exit\n" ; "lowercase")]
#[test_case("EXIT\n" ; "uppercase")]
#[test_case("Exit\n" ; "capitalized")]
#[tokio::test]
async fn exit_ends_session_without_history(input: &str) {
    let mut f = fixture(input, vec![], OutputMode::Final);

    f.session.run().await.unwrap();

    assert!(f.session.history().is_empty());
    assert_eq!(f.provider.calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.terminal.written().await, "You: ");
}

#[tokio::test]
async fn full_loop_keeps_history_across_turns() {
    let mut f = fixture(
        "hi\n\nwho am i\nexit\n",
        vec![
            ChatMessage::assistant("Hello!"),
            ChatMessage::assistant("You are Ada."),
        ],
        OutputMode::Final,
    );

    f.session.run().await.unwrap();

    let history = f.session.history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[2], ChatMessage::user("who am i"));
    assert_eq!(
        f.terminal.written().await,
        "You: Hello!\nYou: You: You are Ada.\nYou: "
    );
}

#[tokio::test]
async fn events_mode_prints_messages_and_goodbye() {
    let mut f = fixture(
        "search refunds\nexit\n",
        vec![
            ChatMessage::assistant_with_calls(
                Some("Searching the help center.".into()),
                vec![ToolCall::new("c1", "Zendesk_SearchArticles", &json!({"query": "refunds"}))],
            ),
            ChatMessage::assistant("Found the refund policy."),
        ],
        OutputMode::Events,
    );

    f.session.run().await.unwrap();

    assert_eq!(
        f.terminal.written().await,
        "User: ** zendesk_agent: Searching the help center.\n\
         ** zendesk_agent: Found the refund policy.\n\
         User: Goodbye!\n"
    );
    assert_eq!(f.search.calls(), 1);
}

#[tokio::test]
async fn events_mode_denial_shares_the_terminal_with_the_prompt() {
    let mut f = fixture(
        "close 7\nno\nexit\n",
        vec![tool_call("Zendesk_MarkTicketSolved", json!({"ticket_id": 7}))],
        OutputMode::Events,
    );

    f.session.run().await.unwrap();

    assert_eq!(f.solve.calls(), 0);
    assert_eq!(f.session.history().len(), 4);
    assert_eq!(f.session.history()[3], ChatMessage::assistant(ACK));

    let out = f.terminal.written().await;
    assert!(out.starts_with("User: Human approval required for tool call Zendesk_MarkTicketSolved\n"));
    assert!(out.ends_with(&format!("[y/N]: {ACK}\nUser: Goodbye!\n")));
}

#[tokio::test]
async fn provider_failure_ends_the_session_with_an_error() {
    let mut f = fixture("hello\n", vec![], OutputMode::Final);
    let err = f.session.run().await.unwrap_err();
    assert!(err.to_string().contains("script exhausted"));
}
