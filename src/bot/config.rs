use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Default capacity for the inbound message queue
pub const QUEUE_SIZE: usize = 32;

// Long-poll wait used for getUpdates, in seconds
const POLL_TIMEOUT: u64 = 30;

// Pause before retrying after a failed poll
const POLL_RETRY_DELAY: u64 = 5;

/// Configuration for the Telegram transport
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Bot API token
    pub token: String,

    /// Bot API base URL; overridable so tests can point at a local server
    pub api_base: String,

    /// How long the server may hold a getUpdates call open
    pub poll_timeout: Duration,

    /// How long to wait before retrying a failed poll
    pub poll_retry_delay: Duration,
}

impl BotConfig {
    /// Creates a configuration with default polling parameters
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: "https://api.telegram.org".to_string(),
            poll_timeout: Duration::from_secs(POLL_TIMEOUT),
            poll_retry_delay: Duration::from_secs(POLL_RETRY_DELAY),
        }
    }

    /// Loads the configuration from the environment
    ///
    /// Reads `TELEGRAM_TOKEN`; a missing token is a fatal startup error.
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_TOKEN").context("TELEGRAM_TOKEN is not set")?;
        Ok(Self::new(token))
    }

    /// Sets the Bot API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Sets the long-poll timeout
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Sets the delay before retrying a failed poll
    pub fn with_poll_retry_delay(mut self, delay: Duration) -> Self {
        self.poll_retry_delay = delay;
        self
    }
}
