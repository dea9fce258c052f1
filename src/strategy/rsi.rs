use super::{IndicatorPoint, IndicatorSeries, Strategy};
use crate::error::{BotError, Result};
use crate::indicators::{calculate_rsi, rsi_series};
use crate::models::{Candle, Signal};

/// RSI threshold strategy: buy oversold, sell overbought.
#[derive(Debug, Clone)]
pub struct RsiThreshold {
    period: usize,
    oversold: f64,
    overbought: f64,
}

impl RsiThreshold {
    pub fn new(period: usize, oversold: f64, overbought: f64) -> Result<Self> {
        if period < 2 {
            return Err(BotError::Configuration(format!(
                "rsi_period must be at least 2, got {}",
                period
            )));
        }
        if !(0.0 < oversold && oversold < overbought && overbought < 100.0) {
            return Err(BotError::Configuration(format!(
                "rsi thresholds must satisfy 0 < oversold < overbought < 100, got {} / {}",
                oversold, overbought
            )));
        }
        Ok(Self {
            period,
            oversold,
            overbought,
        })
    }

    fn classify(&self, rsi: f64) -> Signal {
        if rsi < self.oversold {
            Signal::Buy
        } else if rsi > self.overbought {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

impl Strategy for RsiThreshold {
    fn name(&self) -> &str {
        "rsi"
    }

    fn min_candles_required(&self) -> usize {
        // RSI needs one price change per period sample.
        self.period + 1
    }

    fn calculate_indicators(&self, candles: &[Candle]) -> IndicatorSeries {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let rsi = rsi_series(&closes, self.period);

        let points = candles
            .iter()
            .enumerate()
            .map(|(i, candle)| IndicatorPoint {
                timestamp: candle.timestamp,
                close: candle.close,
                values: vec![rsi[i]],
                signal: rsi[i].map_or(Signal::Hold, |value| self.classify(value)),
            })
            .collect();

        IndicatorSeries {
            columns: vec!["rsi"],
            points,
        }
    }

    fn generate_signal(&self, candles: &[Candle]) -> Signal {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        calculate_rsi(&closes, self.period).map_or(Signal::Hold, |value| self.classify(value))
    }
}
