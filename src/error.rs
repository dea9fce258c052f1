use thiserror::Error;

/// Errors surfaced by the bot.
///
/// Only `Configuration` is fatal: it means the run could never have been
/// correct and should abort startup. The rest are per-cycle conditions the
/// orchestrator recovers from.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("market data unavailable for {pair}: {reason}")]
    DataUnavailable { pair: String, reason: String },

    #[error("order rejected: {reason}")]
    OrderRejected { reason: String },

    #[error("connection error: {0}")]
    Connection(#[from] reqwest::Error),
}

impl BotError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, BotError::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
