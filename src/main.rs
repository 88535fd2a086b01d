use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use proxy_herder::bot::config::QUEUE_SIZE;
use proxy_herder::bot::{handle_message, BotConfig, TelegramBot};
use proxy_herder::extractor::ServerExtractor;
use proxy_herder::registry::{RegistryClient, RegistryConfig};
use proxy_herder::utils::logger::init_logger;

#[tokio::main]
async fn main() -> Result<()> {
    init_logger(None)?;

    // Everything configurable is read from the environment exactly once and
    // handed down explicitly; a missing variable aborts startup.
    let registry_config = RegistryConfig::from_env().context("loading registry configuration")?;
    let bot_config = BotConfig::from_env().context("loading bot configuration")?;

    // A grammar that fails to compile is a defect, not bad input.
    let extractor = ServerExtractor::new().context("building server grammar")?;
    let registry = RegistryClient::new(registry_config).context("building registry client")?;
    let bot = TelegramBot::new(bot_config).context("building Telegram transport")?;

    let username = bot.identify().await.context("verifying Telegram token")?;
    info!("Authorized on account {}", username);

    let (tx, mut rx) = mpsc::channel(QUEUE_SIZE);
    let stream = bot.clone();
    tokio::spawn(async move {
        if let Err(e) = stream.listen(tx).await {
            error!("Update stream terminated: {}", e);
        }
    });

    while let Some(message) = rx.recv().await {
        if let Some(reply) = handle_message(&message, &extractor, &registry).await {
            if let Err(e) = bot.send_reply(message.chat_id, message.message_id, &reply).await {
                warn!("Failed to reply in chat {}: {}", message.chat_id, e);
            }
        }
    }

    info!("Update stream closed, shutting down");
    Ok(())
}
