//! Push notification dispatcher
//!
//! Delivery is fire-and-forget: a missing credential pair turns every call into
//! a no-op, and delivery failures are logged and reported as an outcome value,
//! never as an error the caller has to handle.

pub mod format;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::types::ProcessId;
use crate::{process_debug, process_error};

pub use format::{
    compose_process_error, compose_worker_died, format_request_details, truncate_message, MAX_BODY_CHARS,
    MAX_MESSAGE_CHARS,
};

/// Default push endpoint
pub const PUSHOVER_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";

/// Environment variable holding the recipient key
pub const USER_KEY_ENV: &str = "PUSHOVER_USER_KEY";

/// Environment variable holding the application token
pub const API_TOKEN_ENV: &str = "PUSHOVER_API_TOKEN";

/// A composed alert ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Result of a best-effort delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Credentials are not configured; nothing was sent
    Skipped,
    /// The endpoint accepted the notification
    Delivered,
    /// Delivery was attempted and failed
    Failed(String),
}

/// Credential pair for the push endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct PushoverCredentials {
    pub user_key: String,
    pub api_token: String,
}

impl PushoverCredentials {
    /// Read both credentials from the environment; `None` unless both are set and non-empty
    pub fn from_env() -> Option<Self> {
        Self::from_values(std::env::var(USER_KEY_ENV).ok(), std::env::var(API_TOKEN_ENV).ok())
    }

    pub fn from_values(user_key: Option<String>, api_token: Option<String>) -> Option<Self> {
        match (user_key, api_token) {
            (Some(user_key), Some(api_token)) if !user_key.is_empty() && !api_token.is_empty() => {
                Some(Self { user_key, api_token })
            }
            _ => None,
        }
    }
}

impl std::fmt::Debug for PushoverCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushoverCredentials").finish_non_exhaustive()
    }
}

/// Delivery abstraction so callers can be tested without network access
#[mockall::automock]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Attempt delivery once; never fails and never retries
    async fn notify(&self, notification: Notification) -> NotifyOutcome;
}

#[derive(Serialize)]
struct PushoverPayload<'a> {
    token: &'a str,
    user: &'a str,
    title: &'a str,
    message: &'a str,
}

/// Real notifier posting to the Pushover HTTP API
#[derive(Clone)]
pub struct PushoverNotifier {
    client: reqwest::Client,
    endpoint: String,
    credentials: Option<PushoverCredentials>,
}

impl PushoverNotifier {
    /// Create notifier with explicit credentials against the default endpoint
    pub fn new(credentials: Option<PushoverCredentials>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: PUSHOVER_ENDPOINT.to_string(),
            credentials,
        }
    }

    /// Create notifier from `PUSHOVER_USER_KEY` / `PUSHOVER_API_TOKEN`
    pub fn from_env() -> Self {
        Self::new(PushoverCredentials::from_env())
    }

    /// Override the endpoint (fluent API)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn deliver(&self, credentials: &PushoverCredentials, notification: &Notification) -> Result<(), String> {
        let body = serde_json::to_vec(&PushoverPayload {
            token: &credentials.api_token,
            user: &credentials.user_key,
            title: &notification.title,
            message: &notification.message,
        })
        .map_err(|e| format!("Failed to encode notification: {e}"))?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await
            .map_err(|e| format!("Failed to send notification: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("Notification rejected: HTTP {}", response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn notify(&self, notification: Notification) -> NotifyOutcome {
        let Some(credentials) = &self.credentials else {
            return NotifyOutcome::Skipped;
        };

        match self.deliver(credentials, &notification).await {
            Ok(()) => {
                process_debug!(ProcessId::current(), "📨 Notification sent: {}", notification.title);
                NotifyOutcome::Delivered
            }
            Err(reason) => {
                process_error!(ProcessId::current(), "Error sending notification: {}", reason);
                NotifyOutcome::Failed(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_require_both_values() {
        assert!(PushoverCredentials::from_values(None, None).is_none());
        assert!(PushoverCredentials::from_values(Some("user".into()), None).is_none());
        assert!(PushoverCredentials::from_values(None, Some("token".into())).is_none());
        assert!(PushoverCredentials::from_values(Some("".into()), Some("token".into())).is_none());
        assert!(PushoverCredentials::from_values(Some("user".into()), Some("token".into())).is_some());
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let credentials = PushoverCredentials::from_values(Some("user-secret".into()), Some("token-secret".into()))
            .unwrap();
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("secret"));
    }

    #[tokio::test]
    async fn test_unconfigured_notifier_is_noop() {
        let notifier = PushoverNotifier::new(None).with_endpoint("http://127.0.0.1:9/never");
        assert!(!notifier.is_configured());

        let outcome = notifier.notify(Notification::new("title", "message")).await;
        assert_eq!(outcome, NotifyOutcome::Skipped);
    }
}
