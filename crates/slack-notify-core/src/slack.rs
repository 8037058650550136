//! Slack delivery endpoints.
//!
//! Two ways to reach a channel:
//!
//! - [`SlackClient`] posts through the Web API (`chat.postMessage`) with a
//!   bot token.
//! - [`WebhookClient`] posts to an incoming-webhook URL.
//!
//! Both implement [`Notifier`], which is what the retry loop drives.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::NotifyError;
use crate::message::FormattedMessage;

/// Slack Web API base URL.
pub const SLACK_API_BASE: &str = "https://slack.com/api";

const USER_AGENT: &str = concat!("slack-notify/", env!("CARGO_PKG_VERSION"));

/// One attachment carrying the formatted build message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub fallback: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub color: String,
    pub text: String,
    pub mrkdwn_in: Vec<String>,
}

impl From<&FormattedMessage> for Attachment {
    fn from(msg: &FormattedMessage) -> Self {
        Attachment {
            fallback: msg.fallback.clone(),
            color: msg.color.clone(),
            text: msg.text.clone(),
            mrkdwn_in: msg.markdown_in.clone(),
        }
    }
}

/// Request body shared by the Web API and incoming webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessagePayload {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub channel: String,
    pub attachments: Vec<Attachment>,
}

impl MessagePayload {
    pub fn new(channel: &str, message: &FormattedMessage) -> Self {
        MessagePayload {
            channel: channel.to_string(),
            attachments: vec![Attachment::from(message)],
        }
    }
}

/// Slack's `chat.postMessage` response.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
}

/// Something that can make one attempt at posting a message.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, payload: &MessagePayload) -> Result<(), NotifyError>;
}

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 200;

/// Collapse an error body onto one line and cap its length.
fn summarize(body: &str) -> String {
    let line = body.split_whitespace().collect::<Vec<_>>().join(" ");
    match line.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &line[..idx]),
        None => line,
    }
}

fn http_client() -> Result<Client, NotifyError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(NotifyError::from)
}

/// Slack Web API client.
pub struct SlackClient {
    client: Client,
    api_base: String,
    token: SecretString,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("api_base", &self.api_base)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SlackClient {
    /// Client against the public Slack API.
    pub fn new(token: SecretString) -> Result<Self, NotifyError> {
        Self::with_base_url(SLACK_API_BASE, token)
    }

    /// Client against an alternative API base (proxies, tests).
    pub fn with_base_url(api_base: &str, token: SecretString) -> Result<Self, NotifyError> {
        Ok(SlackClient {
            client: http_client()?,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl Notifier for SlackClient {
    #[instrument(skip(self, payload), fields(channel = %payload.channel))]
    async fn send(&self, payload: &MessagePayload) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.api_base))
            .bearer_auth(self.token.expose_secret())
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body: summarize(&body),
            });
        }

        let result: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Response(e.to_string()))?;

        if !result.ok {
            return Err(NotifyError::Api(
                result.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        debug!(ts = ?result.ts, channel = ?result.channel, "message posted to Slack");
        Ok(())
    }
}

/// Incoming-webhook client.
pub struct WebhookClient {
    client: Client,
    url: SecretString,
}

impl std::fmt::Debug for WebhookClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookClient")
            .field("url", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl WebhookClient {
    pub fn new(url: SecretString) -> Result<Self, NotifyError> {
        Ok(WebhookClient {
            client: http_client()?,
            url,
        })
    }
}

#[async_trait]
impl Notifier for WebhookClient {
    #[instrument(skip_all)]
    async fn send(&self, payload: &MessagePayload) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.url.expose_secret())
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body: summarize(&body),
            });
        }

        debug!("message posted to webhook");
        Ok(())
    }
}
