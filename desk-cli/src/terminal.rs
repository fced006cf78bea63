//! Line-oriented terminal shared by the session loop and the confirmation gate.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;

use desk_agent::{is_affirmative, ConfirmationHandler, PendingToolCall};
use desk_tools::AuthorizationNotifier;

/// Prompt shown when a gated tool call needs approval.
pub const APPROVAL_PROMPT: &str = "Do you approve this tool call? [y/N]: ";

/// Terminal over any line reader and writer.
///
/// Input and output sit behind async mutexes so the session loop and the
/// gate can share one terminal; only one of them reads at a time.
pub struct Terminal<R, W> {
    input: Mutex<R>,
    output: Mutex<W>,
}

/// Terminal over the process's stdin and stdout.
pub type StdTerminal = Terminal<BufReader<Stdin>, Stdout>;

impl StdTerminal {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> Terminal<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    /// Show `prompt` and read one line; `None` at end of input.
    pub async fn read_line(&self, prompt: &str) -> Result<Option<String>> {
        self.write(prompt).await?;

        let mut input = self.input.lock().await;
        let mut line = String::new();
        let bytes = input
            .read_line(&mut line)
            .await
            .context("Failed to read from terminal")?;

        if bytes == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Write `text` followed by a newline.
    pub async fn print(&self, text: &str) -> Result<()> {
        self.write(&format!("{text}\n")).await
    }

    async fn write(&self, text: &str) -> Result<()> {
        let mut output = self.output.lock().await;
        output
            .write_all(text.as_bytes())
            .await
            .context("Failed to write to terminal")?;
        output.flush().await.context("Failed to flush terminal")?;
        Ok(())
    }
}

impl<R> Terminal<R, Vec<u8>> {
    /// Everything written so far (in-memory terminals only).
    pub async fn written(&self) -> String {
        String::from_utf8_lossy(&self.output.lock().await).into_owned()
    }
}

#[async_trait]
impl<R, W> ConfirmationHandler for Terminal<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn confirm(&self, call: &PendingToolCall) -> anyhow::Result<bool> {
        let arguments = serde_json::to_string_pretty(&call.arguments)
            .unwrap_or_else(|_| call.arguments.to_string());

        self.print(&format!(
            "Human approval required for tool call {}",
            call.tool_name
        ))
        .await?;
        self.print(&format!("Arguments: {arguments}")).await?;

        let reply = self.read_line(APPROVAL_PROMPT).await?;
        Ok(reply.as_deref().is_some_and(is_affirmative))
    }
}

#[async_trait]
impl<R, W> AuthorizationNotifier for Terminal<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn authorization_required(&self, tool_name: &str, url: &str) {
        let message = format!(
            "Click this link to authorize {tool_name}:\n{url}\nWaiting for you to complete authorization..."
        );
        if let Err(e) = self.print(&message).await {
            tracing::warn!(tool = tool_name, url = url, error = %e, "Could not show authorization link");
        }
    }

    async fn authorization_completed(&self, tool_name: &str) {
        tracing::info!(tool = tool_name, "Authorization completed");
    }
}
