// =============================================================================
// Telegram transport
// =============================================================================
//
// A `reqwest::Client` pointed at the Telegram Bot API, with
// `#[instrument]`/`anyhow::Context` for error propagation. The bot token is
// read from the environment and never logged or persisted to the config
// file.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::instrument;

use super::Transport;

pub struct TelegramTransport {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramTransport {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self { client, bot_token, chat_id }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    #[instrument(skip(self, text), fields(chat_id = %self.chat_id))]
    async fn send(&self, text: &str) -> Result<Option<String>> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "chat_id": self.chat_id, "text": text }))
            .send()
            .await
            .context("telegram sendMessage request failed")?;

        let status = resp.status();
        if status.is_server_error() || status.as_u16() == 429 {
            anyhow::bail!("telegram transient failure: {status}");
        }
        if !status.is_success() {
            anyhow::bail!("telegram permanent failure: {status}");
        }

        let body: serde_json::Value = resp.json().await.context("telegram response not JSON")?;
        let message_id = body
            .get("result")
            .and_then(|r| r.get("message_id"))
            .and_then(|id| id.as_i64())
            .map(|id| id.to_string());

        Ok(message_id)
    }
}
