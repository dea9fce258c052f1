// Technical indicators used by the built-in strategies

pub mod moving_average;
pub mod rsi;

pub use moving_average::{calculate_sma, sma_series};
pub use rsi::{calculate_rsi, rsi_series};
