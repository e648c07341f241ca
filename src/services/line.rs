use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::models::webhook::ReplyToken;

/// Sends a short text back to whoever triggered an event.
#[async_trait]
pub trait ReplyNotifier: Send + Sync {
    /// Consumes `token`; a reply handle can be used once.
    async fn reply(&self, token: ReplyToken, text: &str) -> Result<(), ReplyError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

/// Client for the LINE Messaging API reply endpoint.
pub struct LineMessagingClient {
    http: Client,
    api_base: String,
    access_token: String,
}

impl LineMessagingClient {
    pub fn new(api_base: &str, access_token: &str) -> Result<Self, ReplyError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }
}

#[async_trait]
impl ReplyNotifier for LineMessagingClient {
    async fn reply(&self, token: ReplyToken, text: &str) -> Result<(), ReplyError> {
        let url = format!("{}/v2/bot/message/reply", self.api_base);
        let request = ReplyRequest {
            reply_token: token.as_str(),
            messages: [TextMessage { kind: "text", text }],
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ReplyError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

/// Notifier for deployments with replies switched off. Logs what would have
/// been sent.
pub struct LogOnlyNotifier;

#[async_trait]
impl ReplyNotifier for LogOnlyNotifier {
    async fn reply(&self, _token: ReplyToken, text: &str) -> Result<(), ReplyError> {
        tracing::info!(reply = text, "Replies disabled, not sending");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("HTTP request to messaging API failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Messaging API returned {status}: {message}")]
    Api { status: u16, message: String },
}
