//! Client for the platform chat proxy.
//!
//! One request/response round trip per user message; the proxy forwards to
//! the completion service and answers `{success, response}`. No streaming.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// One entry in a chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn now(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text: text.into(),
            sent_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    success: bool,
    #[serde(default)]
    response: String,
    #[serde(default)]
    msg: Option<String>,
}

pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends one message, optionally with a base64 data-URL image attached.
    /// Returns the assistant's reply text. An empty message is rejected
    /// locally; a `success: false` body is surfaced as a rejection.
    pub async fn send(
        &self,
        token: &str,
        message: &str,
        image: Option<&str>,
    ) -> Result<String, ApiError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ApiError::Invalid("Message cannot be empty".to_string()));
        }

        let mut body = json!({ "message": message });
        if let Some(image) = image {
            body["image"] = json!(image);
        }

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v.get("msg").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_else(|| "Server error occurred".to_string());
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| ApiError::Malformed(e.to_string()))?;
        debug!(success = reply.success, "chat reply received");

        if !reply.success {
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: reply
                    .msg
                    .unwrap_or_else(|| "Chat service reported a failure".to_string()),
            });
        }
        Ok(reply.response)
    }
}
