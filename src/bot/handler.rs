use tracing::{debug, info, instrument, warn};

use super::InboundMessage;
use crate::extractor::ServerExtractor;
use crate::registry::{RegistryClient, RegistryError};

// Fallback notice for private chats when a message contains no servers
const NOTHING_FOUND_REPLY: &str = "I could not find any servers in this message";

/// Processes one inbound message and builds the reply text
///
/// The message body is scanned first; the caption is tried only when the body
/// yields zero candidates, never merged with it. Every candidate is sent to
/// the registry in extraction order and contributes exactly one reply line,
/// so a failing registration never hides the outcome of the others. When
/// nothing was found the fallback notice goes to private chats only; group
/// chats get no reply at all.
///
/// # Arguments
/// * `message` - The inbound chat message
/// * `extractor` - Compiled server grammar
/// * `registry` - Registration client
///
/// # Returns
/// * `Option<String>` - Reply text, or `None` when the bot should stay silent
#[instrument(skip_all, fields(chat_id = message.chat_id, message_id = message.message_id))]
pub async fn handle_message(
    message: &InboundMessage,
    extractor: &ServerExtractor,
    registry: &RegistryClient,
) -> Option<String> {
    let mut servers = extractor.extract(message.text.as_deref().unwrap_or(""));
    if servers.is_empty() {
        debug!("Body contained no servers, falling back to caption");
        servers = extractor.extract(message.caption.as_deref().unwrap_or(""));
    }

    if servers.is_empty() {
        debug!("No servers found in message");
        if message.private {
            return Some(NOTHING_FOUND_REPLY.to_string());
        }
        return None;
    }

    info!("Found {} server(s), registering", servers.len());
    let mut lines = Vec::with_capacity(servers.len());
    for server in &servers {
        match registry.register(server).await {
            Ok(()) => {
                lines.push(format!("Added server {}", server));
            }
            Err(RegistryError::AlreadyExists) => {
                debug!("Server {} already registered, skipping", server);
                lines.push(format!("Server {} is already registered, skipping", server));
            }
            Err(e) => {
                warn!("Failed to register server {}: {}", server, e);
                lines.push(format!("Error: could not add {}: {}", server, e));
            }
        }
    }

    Some(lines.join("\n"))
}
