use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::{BotError, Result};

/// Operating mode, fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Live,
    Paper,
    Backtest,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Live => write!(f, "live"),
            Mode::Paper => write!(f, "paper"),
            Mode::Backtest => write!(f, "backtest"),
        }
    }
}

/// Parameters for the built-in strategies. Windows are validated by the
/// strategy constructors; this struct just carries the configured values.
#[derive(Debug, Clone)]
pub struct StrategyParams {
    pub short_window: usize,
    pub long_window: usize,
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            short_window: 20,
            long_window: 50,
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
        }
    }
}

/// Validated configuration consumed by the orchestrator. The core never reads
/// configuration sources itself; `from_env` is the single place environment
/// variables are touched.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub pair: String,
    pub trade_volume: f64,
    pub strategy_name: String,
    pub strategy_params: StrategyParams,
    pub interval_minutes: u64,
    pub mode: Mode,
    pub backtest_start: Option<DateTime<Utc>>,
    pub backtest_end: Option<DateTime<Utc>>,
    /// Quote-currency balance the backtest equity curve starts from.
    pub initial_cash: f64,
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e| {
            BotError::Configuration(format!("{}={}: {}", key, raw, e))
        }),
        Err(_) => Ok(default),
    }
}

impl BotConfig {
    /// Build from environment variables (call `dotenvy` first if a file
    /// should be loaded). Variable names follow the exchange bot convention:
    /// TRADING_PAIR, TRADE_VOLUME, STRATEGY, SHORT_WINDOW, LONG_WINDOW,
    /// RSI_PERIOD, RSI_OVERSOLD, RSI_OVERBOUGHT, INITIAL_CASH.
    pub fn from_env(
        mode: Mode,
        interval_minutes: u64,
        backtest_start: Option<DateTime<Utc>>,
        backtest_end: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        let config = Self {
            pair: std::env::var("TRADING_PAIR").unwrap_or_else(|_| "XXBTZUSD".to_string()),
            trade_volume: env_parse("TRADE_VOLUME", 0.001)?,
            strategy_name: std::env::var("STRATEGY").unwrap_or_else(|_| "simple_ma".to_string()),
            strategy_params: StrategyParams {
                short_window: env_parse("SHORT_WINDOW", 20)?,
                long_window: env_parse("LONG_WINDOW", 50)?,
                rsi_period: env_parse("RSI_PERIOD", 14)?,
                rsi_oversold: env_parse("RSI_OVERSOLD", 30.0)?,
                rsi_overbought: env_parse("RSI_OVERBOUGHT", 70.0)?,
            },
            interval_minutes,
            mode,
            backtest_start,
            backtest_end,
            initial_cash: env_parse("INITIAL_CASH", 10_000.0)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Fatal checks, run before the orchestrator is constructed. Strategy
    /// parameter validation happens in the strategy constructors.
    pub fn validate(&self) -> Result<()> {
        if self.pair.is_empty() {
            return Err(BotError::Configuration("trading pair is empty".to_string()));
        }
        if !(self.trade_volume > 0.0) || !self.trade_volume.is_finite() {
            return Err(BotError::Configuration(format!(
                "trade_volume must be a positive number, got {}",
                self.trade_volume
            )));
        }
        if self.interval_minutes == 0 {
            return Err(BotError::Configuration(
                "interval_minutes must be at least 1".to_string(),
            ));
        }
        if !(self.initial_cash > 0.0) || !self.initial_cash.is_finite() {
            return Err(BotError::Configuration(format!(
                "initial_cash must be a positive number, got {}",
                self.initial_cash
            )));
        }
        if let (Some(start), Some(end)) = (self.backtest_start, self.backtest_end) {
            if start >= end {
                return Err(BotError::Configuration(format!(
                    "backtest window is empty: start {} >= end {}",
                    start, end
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_config(mode: Mode) -> BotConfig {
        BotConfig {
            pair: "XXBTZUSD".to_string(),
            trade_volume: 0.001,
            strategy_name: "simple_ma".to_string(),
            strategy_params: StrategyParams::default(),
            interval_minutes: 60,
            mode,
            backtest_start: None,
            backtest_end: None,
            initial_cash: 10_000.0,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(base_config(Mode::Paper).validate().is_ok());
    }

    #[test]
    fn test_zero_volume_rejected() {
        let mut config = base_config(Mode::Paper);
        config.trade_volume = 0.0;
        assert!(matches!(
            config.validate(),
            Err(BotError::Configuration(_))
        ));
    }

    #[test]
    fn test_negative_volume_rejected() {
        let mut config = base_config(Mode::Live);
        config.trade_volume = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = base_config(Mode::Paper);
        config.interval_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_backtest_window_rejected() {
        let mut config = base_config(Mode::Backtest);
        config.backtest_start = Some(Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap());
        config.backtest_end = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(Mode::Paper.to_string(), "paper");
        assert_eq!(Mode::Live.to_string(), "live");
        assert_eq!(Mode::Backtest.to_string(), "backtest");
    }
}
