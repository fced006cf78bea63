//! OpenAI chat-completions provider (also works with compatible APIs).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use desk_common::util::{sanitize_for_log, truncate_with_ellipsis};

use super::{ChatMessage, ChatRequest, ChatResponse, Provider, ProviderError, TokenUsage, ToolCall};

const REQUEST_TIMEOUT_SECS: u64 = 300;
const MAX_ERROR_BODY_CHARS: usize = 500;

/// OpenAI API provider.
pub struct OpenAIProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider.
    pub fn new(api_key: Option<&str>) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com")
    }

    /// Create with custom base URL (for Azure OpenAI or compatible APIs).
    pub fn with_base_url(api_key: Option<&str>, base_url: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {key}")) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn error(&self, model: &str, message: String, status_code: Option<u16>) -> ProviderError {
        ProviderError {
            provider: self.name().into(),
            model: model.into(),
            message,
            status_code,
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn supports_model(&self, model: &str) -> bool {
        !model.trim().is_empty()
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let start = Instant::now();
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = request.system.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ChatMessage::system(system));
        }
        messages.extend(request.messages.iter().cloned());

        let tools = request
            .tools
            .iter()
            .map(|spec| OpenAITool {
                kind: "function",
                function: OpenAIFunction {
                    name: &spec.name,
                    description: &spec.description,
                    parameters: &spec.parameters,
                },
            })
            .collect();

        let openai_request = OpenAIRequest {
            model: &request.model,
            messages,
            tools,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&url)
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| self.error(&request.model, format!("Request failed: {e}"), None))?;

        let status = response.status();
        let latency_ms = start.elapsed().as_millis() as u64;

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = truncate_with_ellipsis(&sanitize_for_log(&body), MAX_ERROR_BODY_CHARS);
            return Err(self.error(
                &request.model,
                format!("API error: {body}"),
                Some(status.as_u16()),
            ));
        }

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            self.error(&request.model, format!("Failed to parse response: {e}"), None)
        })?;

        let Some(choice) = openai_response.choices.into_iter().next() else {
            return Err(self.error(
                &request.model,
                "Response contained no choices".into(),
                None,
            ));
        };

        let usage = openai_response.usage.unwrap_or_default();
        tracing::debug!(
            model = %request.model,
            latency_ms,
            tool_calls = choice.message.tool_calls.len(),
            total_tokens = usage.total_tokens,
            "Chat completion received"
        );

        Ok(ChatResponse {
            provider: self.name().into(),
            model: openai_response.model.unwrap_or(request.model),
            message: ChatMessage::assistant_with_calls(
                choice.message.content,
                choice.message.tool_calls,
            ),
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            },
            finish_reason: choice.finish_reason,
            latency_ms,
        })
    }
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAITool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct OpenAITool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: OpenAIFunction<'a>,
}

#[derive(Debug, Serialize)]
struct OpenAIFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    tool_calls: Vec<ToolCall>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ToolCall>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<ToolCall>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIUsage {
    #[serde(default)]
    prompt_tokens: i64,
    #[serde(default)]
    completion_tokens: i64,
    #[serde(default)]
    total_tokens: i64,
}
