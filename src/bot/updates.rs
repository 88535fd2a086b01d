use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::config::BotConfig;
use super::InboundMessage;

/// One entry of a getUpdates response
#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: i64,
    chat: Chat,
    from: Option<User>,
    text: Option<String>,
    caption: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct User {
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct BotProfile {
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    ok: bool,
    result: Option<BotProfile>,
}

/// Telegram transport: long-polls for updates and sends replies
///
/// The bot only moves messages in and out; what to do with a message is the
/// handler's business, and the consumption loop lives in the binary.
#[derive(Debug, Clone)]
pub struct TelegramBot {
    client: Client,
    config: BotConfig,
}

impl TelegramBot {
    /// Creates the transport from the given configuration
    pub fn new(config: BotConfig) -> Result<Self> {
        // Long polls are held open server-side for poll_timeout, so the
        // client-side cap must sit above it.
        let client = Client::builder()
            .timeout(config.poll_timeout + std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build Telegram HTTP client")?;

        Ok(Self { client, config })
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.token,
            method
        )
    }

    /// Verifies the token and returns the bot's username
    pub async fn identify(&self) -> Result<String> {
        let response = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .context("getMe request failed")?;

        let profile: ProfileResponse = response.json().await.context("getMe returned invalid JSON")?;
        if !profile.ok {
            bail!("Telegram rejected the configured token");
        }
        Ok(profile
            .result
            .and_then(|p| p.username)
            .unwrap_or_else(|| "unknown".to_string()))
    }

    /// Long-polls getUpdates and forwards every chat message to `tx`
    ///
    /// Transient poll failures are logged and retried after a short delay;
    /// the loop only ends when the receiving side of the channel is dropped.
    pub async fn listen(&self, tx: mpsc::Sender<InboundMessage>) -> Result<()> {
        let mut offset: i64 = 0;

        info!("Listening for Telegram updates");
        loop {
            let body = serde_json::json!({
                "offset": offset,
                "timeout": self.config.poll_timeout.as_secs(),
                "allowed_updates": ["message"],
            });

            let response = match self
                .client
                .post(self.api_url("getUpdates"))
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    warn!("Telegram poll error: {}", e);
                    tokio::time::sleep(self.config.poll_retry_delay).await;
                    continue;
                }
            };

            let updates: UpdatesResponse = match response.json().await {
                Ok(u) => u,
                Err(e) => {
                    warn!("Telegram returned an unreadable update batch: {}", e);
                    tokio::time::sleep(self.config.poll_retry_delay).await;
                    continue;
                }
            };

            if !updates.ok {
                warn!("Telegram answered getUpdates with ok=false");
                tokio::time::sleep(self.config.poll_retry_delay).await;
                continue;
            }

            trace!("Received {} update(s)", updates.result.len());
            for update in updates.result {
                // Advance past this update even if it carries no message
                offset = offset.max(update.update_id + 1);

                let Some(message) = update.message else {
                    continue;
                };

                let inbound = InboundMessage {
                    chat_id: message.chat.id,
                    message_id: message.message_id,
                    text: message.text,
                    caption: message.caption,
                    private: message.chat.kind == "private",
                    sender: message.from.and_then(|u| u.username),
                };

                debug!(
                    "Inbound message {} from chat {} ({})",
                    inbound.message_id,
                    inbound.chat_id,
                    inbound.sender.as_deref().unwrap_or("unknown")
                );

                if tx.send(inbound).await.is_err() {
                    info!("Message consumer dropped, stopping update stream");
                    return Ok(());
                }
            }
        }
    }

    /// Sends a reply to the given message
    pub async fn send_reply(&self, chat_id: i64, reply_to: i64, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "reply_to_message_id": reply_to,
        });

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .context("sendMessage request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let err = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read response body: {}>", e));
            bail!("Telegram sendMessage failed ({}): {}", status, err);
        }

        Ok(())
    }
}
