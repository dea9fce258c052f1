// Core modules
pub mod api;
pub mod backtest;
pub mod bot;
pub mod config;
pub mod error;
pub mod events;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod strategy;

// Re-export commonly used types
pub use bot::{CycleState, TradingBot};
pub use config::{BotConfig, Mode};
pub use error::{BotError, Result};
pub use events::{BotEvent, EventSink, TracingSink};
pub use models::*;
pub use strategy::Strategy;
