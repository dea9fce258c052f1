use super::{IndicatorPoint, IndicatorSeries, Strategy};
use crate::error::{BotError, Result};
use crate::indicators::{calculate_sma, sma_series};
use crate::models::{Candle, Signal};

/// Moving-average crossover strategy.
///
/// Buys when the short simple moving average crosses from below to above the
/// long one, sells on the symmetric downward cross. Detecting a cross needs
/// the SMA pair at two consecutive bars; the latest bar alone cannot tell a
/// cross from a market that has simply been above/below for a while.
#[derive(Debug, Clone)]
pub struct MaCrossover {
    short_window: usize,
    long_window: usize,
}

impl MaCrossover {
    /// `short_window < long_window`, both positive. Violations are
    /// configuration errors and are rejected here, before any cycle runs.
    pub fn new(short_window: usize, long_window: usize) -> Result<Self> {
        if short_window == 0 || long_window == 0 {
            return Err(BotError::Configuration(
                "moving average windows must be positive".to_string(),
            ));
        }
        if short_window >= long_window {
            return Err(BotError::Configuration(format!(
                "short_window ({}) must be less than long_window ({})",
                short_window, long_window
            )));
        }
        Ok(Self {
            short_window,
            long_window,
        })
    }

    fn closes(candles: &[Candle]) -> Vec<f64> {
        candles.iter().map(|c| c.close).collect()
    }

    fn crossover(
        prev_short: f64,
        prev_long: f64,
        cur_short: f64,
        cur_long: f64,
    ) -> Signal {
        if prev_short <= prev_long && cur_short > cur_long {
            Signal::Buy
        } else if prev_short >= prev_long && cur_short < cur_long {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> &str {
        "simple_ma"
    }

    fn min_candles_required(&self) -> usize {
        // Crossover detection needs the long SMA at the previous bar too.
        self.long_window + 1
    }

    fn calculate_indicators(&self, candles: &[Candle]) -> IndicatorSeries {
        let closes = Self::closes(candles);
        let short = sma_series(&closes, self.short_window);
        let long = sma_series(&closes, self.long_window);

        let points = candles
            .iter()
            .enumerate()
            .map(|(i, candle)| {
                let signal = if i == 0 {
                    Signal::Hold
                } else {
                    match (short[i - 1], long[i - 1], short[i], long[i]) {
                        (Some(ps), Some(pl), Some(cs), Some(cl)) => {
                            Self::crossover(ps, pl, cs, cl)
                        }
                        _ => Signal::Hold,
                    }
                };
                IndicatorPoint {
                    timestamp: candle.timestamp,
                    close: candle.close,
                    values: vec![short[i], long[i]],
                    signal,
                }
            })
            .collect();

        IndicatorSeries {
            columns: vec!["short_ma", "long_ma"],
            points,
        }
    }

    fn generate_signal(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles_required() {
            return Signal::Hold;
        }

        let closes = Self::closes(candles);
        let previous = &closes[..closes.len() - 1];

        match (
            calculate_sma(previous, self.short_window),
            calculate_sma(previous, self.long_window),
            calculate_sma(&closes, self.short_window),
            calculate_sma(&closes, self.long_window),
        ) {
            (Some(ps), Some(pl), Some(cs), Some(cl)) => Self::crossover(ps, pl, cs, cl),
            _ => Signal::Hold,
        }
    }
}
