// Trading strategy module
pub mod moving_average;
pub mod rsi;

use chrono::{DateTime, Utc};

use crate::config::StrategyParams;
use crate::error::{BotError, Result};
use crate::models::{Candle, Signal};

pub use moving_average::MaCrossover;
pub use rsi::RsiThreshold;

/// Base trait for all trading strategies.
///
/// Both operations are pure functions of the candle slice. `generate_signal`
/// never fails: with fewer candles than the strategy's minimum window it
/// returns `Signal::Hold`.
pub trait Strategy: Send + Sync {
    /// Strategy name, matching the configuration key that selects it.
    fn name(&self) -> &str;

    /// Minimum candles needed before a non-Hold signal is possible.
    fn min_candles_required(&self) -> usize;

    /// Annotate the whole series with indicator columns and the per-bar
    /// signal. Entry `i` is computed only from `candles[..=i]`.
    fn calculate_indicators(&self, candles: &[Candle]) -> IndicatorSeries;

    /// Signal for the latest bar of the series.
    fn generate_signal(&self, candles: &[Candle]) -> Signal;
}

/// Indicator values aligned index-for-index with the candle slice they were
/// computed from. Values are `None` during indicator warm-up.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub columns: Vec<&'static str>,
    pub points: Vec<IndicatorPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    /// One entry per column, in `columns` order.
    pub values: Vec<Option<f64>>,
    pub signal: Signal,
}

impl IndicatorSeries {
    pub fn latest(&self) -> Option<&IndicatorPoint> {
        self.points.last()
    }

    /// Named column values for one bar, for structured decision events.
    pub fn snapshot(&self, point: &IndicatorPoint) -> Vec<(String, Option<f64>)> {
        self.columns
            .iter()
            .zip(point.values.iter())
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }
}

/// Resolve a strategy from the validated configuration.
///
/// The set is closed: adding a variant means adding a match arm here, nothing
/// in the orchestrator changes. Unknown names are a configuration error and
/// abort startup.
pub fn build_strategy(name: &str, params: &StrategyParams) -> Result<Box<dyn Strategy>> {
    match name {
        "simple_ma" => Ok(Box::new(MaCrossover::new(
            params.short_window,
            params.long_window,
        )?)),
        "rsi" => Ok(Box::new(RsiThreshold::new(
            params.rsi_period,
            params.rsi_oversold,
            params.rsi_overbought,
        )?)),
        other => Err(BotError::Configuration(format!(
            "unknown strategy: {}",
            other
        ))),
    }
}
