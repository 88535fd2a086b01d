pub mod config;
pub mod handler;
pub mod updates;

pub use config::BotConfig;
pub use handler::handle_message;
pub use updates::TelegramBot;

/// A chat message delivered by the update stream
///
/// Carries only the fields the processing loop needs; the raw Telegram update
/// shape stays inside `updates`.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Chat the message arrived in, used to address the reply
    pub chat_id: i64,

    /// Message to reply to
    pub message_id: i64,

    /// Primary text body, scanned first
    pub text: Option<String>,

    /// Media caption, scanned only when the body yields nothing
    pub caption: Option<String>,

    /// Whether the chat is a one-to-one conversation; group chats stay
    /// silent when a message contains no servers
    pub private: bool,

    /// Sender username, for logging only
    pub sender: Option<String>,
}
