//! Per-user tool authorization.
//!
//! Before a tool can run for a user the provider may need an interactive
//! step (usually an OAuth consent page). The flow asks the provider, shows
//! the URL through an `AuthorizationNotifier` when one is needed, and blocks
//! until the provider reports a terminal status.

use async_trait::async_trait;

use crate::arcade::{ArcadeClient, ArcadeError, AuthorizationResponse};

/// Receives the user-facing side of an authorization.
#[async_trait]
pub trait AuthorizationNotifier: Send + Sync {
    /// The user must visit `url` to authorize `tool_name`.
    async fn authorization_required(&self, tool_name: &str, url: &str);

    /// The provider reported the authorization as completed.
    async fn authorization_completed(&self, _tool_name: &str) {}
}

/// Notifier that only logs; used where no terminal is attached.
pub struct SilentNotifier;

#[async_trait]
impl AuthorizationNotifier for SilentNotifier {
    async fn authorization_required(&self, tool_name: &str, url: &str) {
        tracing::warn!(tool = tool_name, url = url, "Authorization required");
    }
}

/// Wait for an authorization the provider has already started.
pub async fn complete_authorization(
    client: &ArcadeClient,
    tool_name: &str,
    authorization: AuthorizationResponse,
    notifier: &dyn AuthorizationNotifier,
) -> Result<AuthorizationResponse, ArcadeError> {
    if authorization.is_completed() {
        return Ok(authorization);
    }

    match authorization.url.as_deref() {
        Some(url) => notifier.authorization_required(tool_name, url).await,
        None => tracing::warn!(tool = tool_name, "Authorization pending without a URL"),
    }

    let finished = client.wait_for_completion(authorization).await?;
    if !finished.is_completed() {
        return Err(ArcadeError::AuthorizationFailed {
            tool_name: tool_name.to_string(),
            status: finished.status,
        });
    }

    notifier.authorization_completed(tool_name).await;
    Ok(finished)
}

/// Make sure `tool_name` is authorized for `user_id`, blocking on any interactive step.
pub async fn authorize_tool(
    client: &ArcadeClient,
    tool_name: &str,
    user_id: &str,
    notifier: &dyn AuthorizationNotifier,
) -> Result<AuthorizationResponse, ArcadeError> {
    let authorization = client.authorize(tool_name, user_id).await?;
    tracing::debug!(tool = tool_name, status = ?authorization.status, "Authorization checked");
    complete_authorization(client, tool_name, authorization, notifier).await
}
