//! HTTP client for the hosted tool provider (Arcade).
//!
//! Covers the three things the agent needs from the provider:
//! listing tool definitions, authorizing a tool for a user, and executing a
//! tool on that user's behalf.
//!
//! # Example
//!
//! ```rust,ignore
//! use desk_tools::ArcadeClient;
//!
//! let client = ArcadeClient::new("https://api.arcade.dev", Some("arc_..."));
//! let page = client.list_tools(Some("Zendesk"), 25, 0).await?;
//! let auth = client.authorize("Zendesk.ListTickets", "agent@example.com").await?;
//! let auth = client.wait_for_completion(auth).await?;
//! ```

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use desk_common::util::sanitize_for_log;

/// HTTP request timeout; must exceed the authorization long-poll window.
const REQUEST_TIMEOUT_SECS: u64 = 90;
/// Seconds the provider may hold an authorization status request open.
pub const AUTH_WAIT_SECS: u64 = 59;
/// Upper bound on error body text kept in `ArcadeError::Server`.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Error type for tool provider operations.
#[derive(Error, Debug)]
pub enum ArcadeError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// Server returned an error response
    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Tool or authorization not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authorization ended in a non-completed state
    #[error("Authorization for {tool_name} ended with status {status:?}")]
    AuthorizationFailed {
        tool_name: String,
        status: AuthorizationStatus,
    },
}

/// Result type for tool provider operations.
pub type Result<T> = std::result::Result<T, ArcadeError>;

// ============================================================================
// Tool definitions
// ============================================================================

/// Toolkit a tool belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolkitInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Type information for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSchema {
    /// string, integer, number, boolean, json or array
    pub val_type: String,
    /// Element type when `val_type` is array
    #[serde(default)]
    pub inner_val_type: Option<String>,
    #[serde(default, rename = "enum")]
    pub enum_values: Option<Vec<String>>,
}

/// One input parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: Option<String>,
    pub value_schema: ValueSchema,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub parameters: Vec<ToolParameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolRequirements {
    #[serde(default)]
    pub authorization: Option<Value>,
}

/// A tool as described by the provider's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    /// `Toolkit.Name`
    #[serde(default)]
    pub qualified_name: String,
    /// `Toolkit.Name@version`
    #[serde(default)]
    pub fully_qualified_name: Option<String>,
    #[serde(default)]
    pub description: String,
    pub toolkit: ToolkitInfo,
    #[serde(default)]
    pub input: ToolInput,
    #[serde(default)]
    pub requirements: Option<ToolRequirements>,
}

impl ToolDefinition {
    /// Name used when executing or authorizing the tool.
    pub fn qualified_name(&self) -> String {
        if self.qualified_name.is_empty() {
            format!("{}.{}", self.toolkit.name, self.name)
        } else {
            self.qualified_name.clone()
        }
    }

    /// Name exposed to the model; function names may not contain dots.
    pub fn model_name(&self) -> String {
        self.qualified_name().replace('.', "_")
    }

    /// Whether the provider declares an authorization requirement.
    pub fn requires_authorization(&self) -> bool {
        self.requirements
            .as_ref()
            .and_then(|r| r.authorization.as_ref())
            .is_some_and(|a| !a.is_null())
    }

    /// JSON Schema for the tool's parameters, as used in function calling.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &self.input.parameters {
            let mut schema = json_type(&param.value_schema);
            if let (Some(desc), Some(obj)) = (&param.description, schema.as_object_mut()) {
                obj.insert("description".into(), Value::String(desc.clone()));
            }
            properties.insert(param.name.clone(), schema);
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

fn scalar_type(val_type: &str) -> Value {
    match val_type {
        "integer" => json!({"type": "integer"}),
        "number" => json!({"type": "number"}),
        "boolean" => json!({"type": "boolean"}),
        "json" => json!({"type": "object"}),
        _ => json!({"type": "string"}),
    }
}

fn json_type(schema: &ValueSchema) -> Value {
    let mut value = if schema.val_type == "array" {
        let inner = schema.inner_val_type.as_deref().unwrap_or("string");
        json!({"type": "array", "items": scalar_type(inner)})
    } else {
        scalar_type(&schema.val_type)
    };

    if let (Some(values), Some(obj)) = (&schema.enum_values, value.as_object_mut()) {
        let target = if schema.val_type == "array" {
            obj.get_mut("items").and_then(Value::as_object_mut)
        } else {
            Some(obj)
        };
        if let Some(target) = target {
            target.insert("enum".into(), json!(values));
        }
    }
    value
}

/// One page of the tool catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolPage {
    #[serde(default)]
    pub items: Vec<ToolDefinition>,
    #[serde(default)]
    pub total_count: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

// ============================================================================
// Authorization
// ============================================================================

/// Status of a per-user authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    #[default]
    NotStarted,
    Pending,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl AuthorizationStatus {
    /// Returns true if no further state change is expected.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Unknown)
    }
}

/// Authorization state returned by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: AuthorizationStatus,
    /// Where the user completes an interactive (OAuth-style) step
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
}

impl AuthorizationResponse {
    pub fn is_completed(&self) -> bool {
        self.status == AuthorizationStatus::Completed
    }
}

// ============================================================================
// Execution
// ============================================================================

#[derive(Debug, Serialize)]
struct ExecuteToolRequest<'a> {
    tool_name: &'a str,
    input: &'a Value,
    user_id: &'a str,
}

#[derive(Debug, Serialize)]
struct AuthorizeToolRequest<'a> {
    tool_name: &'a str,
    user_id: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutputError {
    pub message: String,
    #[serde(default)]
    pub developer_message: Option<String>,
    #[serde(default)]
    pub can_retry: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub error: Option<ToolOutputError>,
    #[serde(default)]
    pub authorization: Option<AuthorizationResponse>,
}

/// Response of a tool execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteToolResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub output: Option<ToolOutput>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl ExecuteToolResponse {
    /// Authorization the provider still needs before this tool can run.
    pub fn pending_authorization(&self) -> Option<&AuthorizationResponse> {
        self.output
            .as_ref()
            .and_then(|o| o.authorization.as_ref())
            .filter(|a| !a.is_completed())
    }
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for the tool provider API.
#[derive(Clone)]
pub struct ArcadeClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ArcadeClient {
    /// Create a new client for the given API base URL.
    pub fn new(base_url: &str, api_key: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self::with_client(base_url, api_key, client)
    }

    /// Create a new client with a custom reqwest client.
    pub fn with_client(base_url: &str, api_key: Option<&str>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(String::from),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn add_auth_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        subject: &str,
    ) -> Result<T> {
        let response = self
            .add_auth_headers(request)
            .send()
            .await
            .map_err(|e| ArcadeError::Request(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 404 {
            return Err(ArcadeError::NotFound(subject.to_string()));
        }

        if !response.status().is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = desk_common::util::truncate_with_ellipsis(
                &sanitize_for_log(&body),
                MAX_ERROR_BODY_CHARS,
            );
            return Err(ArcadeError::Server { status, message });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ArcadeError::Parse(e.to_string()))
    }

    /// List tool definitions, optionally restricted to one toolkit.
    pub async fn list_tools(
        &self,
        toolkit: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<ToolPage> {
        let url = format!("{}/v1/tools", self.base_url);
        let mut query = vec![
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        if let Some(toolkit) = toolkit {
            query.push(("toolkit", toolkit.to_string()));
        }

        let request = self.client.get(&url).query(&query);
        self.send_json(request, toolkit.unwrap_or("tools")).await
    }

    /// Fetch a single tool definition by qualified name.
    pub async fn get_tool(&self, name: &str) -> Result<ToolDefinition> {
        let url = format!("{}/v1/tools/{}", self.base_url, name);
        self.send_json(self.client.get(&url), name).await
    }

    /// Start (or look up) the authorization of a tool for a user.
    pub async fn authorize(&self, tool_name: &str, user_id: &str) -> Result<AuthorizationResponse> {
        let url = format!("{}/v1/tools/authorize", self.base_url);
        let body = AuthorizeToolRequest { tool_name, user_id };
        self.send_json(self.client.post(&url).json(&body), tool_name)
            .await
    }

    /// Check an authorization, letting the provider hold the request up to `wait_secs`.
    pub async fn auth_status(
        &self,
        authorization_id: &str,
        wait_secs: Option<u64>,
    ) -> Result<AuthorizationResponse> {
        let url = format!("{}/v1/auth/status", self.base_url);
        let mut query = vec![("id", authorization_id.to_string())];
        if let Some(wait) = wait_secs {
            query.push(("wait", wait.to_string()));
        }
        self.send_json(self.client.get(&url).query(&query), authorization_id)
            .await
    }

    /// Block until the authorization reaches a terminal status.
    ///
    /// There is no local deadline; the provider's long-poll window paces the loop.
    pub async fn wait_for_completion(
        &self,
        mut authorization: AuthorizationResponse,
    ) -> Result<AuthorizationResponse> {
        while !authorization.status.is_terminal() {
            let id = authorization
                .id
                .clone()
                .ok_or_else(|| ArcadeError::Parse("authorization response has no id".into()))?;
            tracing::debug!(authorization_id = %id, status = ?authorization.status, "Waiting for authorization");
            authorization = self.auth_status(&id, Some(AUTH_WAIT_SECS)).await?;
        }
        Ok(authorization)
    }

    /// Execute a tool for a user.
    pub async fn execute(
        &self,
        tool_name: &str,
        input: &Value,
        user_id: &str,
    ) -> Result<ExecuteToolResponse> {
        let url = format!("{}/v1/tools/execute", self.base_url);
        let body = ExecuteToolRequest {
            tool_name,
            input,
            user_id,
        };
        self.send_json(self.client.post(&url).json(&body), tool_name)
            .await
    }
}
