use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One OHLC interval for a trading pair.
///
/// Immutable once recorded; `is_well_formed` is checked when a series is
/// ingested from the exchange, not on every access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub pair: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Basic OHLC sanity: non-negative values, high/low bracket open and close.
    pub fn is_well_formed(&self) -> bool {
        let non_negative = self.open >= 0.0
            && self.high >= 0.0
            && self.low >= 0.0
            && self.close >= 0.0
            && self.volume >= 0.0;

        non_negative
            && self.high >= self.low
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }
}

/// Check that a candle series is usable as a price series: strictly
/// increasing timestamps (no duplicates) and every candle well formed.
pub fn validate_series(candles: &[Candle]) -> std::result::Result<(), String> {
    for (i, candle) in candles.iter().enumerate() {
        if !candle.is_well_formed() {
            return Err(format!("malformed candle at index {}", i));
        }
        if i > 0 && candle.timestamp <= candles[i - 1].timestamp {
            return Err(format!(
                "non-increasing timestamp at index {}: {} <= {}",
                i,
                candle.timestamp,
                candles[i - 1].timestamp
            ));
        }
    }
    Ok(())
}

/// Trading signal, exactly one per decision point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Exchange-assigned order identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderId(pub String);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PositionState {
    Flat,
    Long,
}

/// Holdings for one trading pair. Owned by the orchestrator (live/paper) or
/// the simulator (backtest); exactly one per pair per run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub pair: String,
    pub state: PositionState,
    pub quantity: f64,
    pub avg_entry_price: f64,
}

impl Position {
    pub fn flat(pair: &str) -> Self {
        Self {
            pair: pair.to_string(),
            state: PositionState::Flat,
            quantity: 0.0,
            avg_entry_price: 0.0,
        }
    }

    pub fn is_long(&self) -> bool {
        self.state == PositionState::Long
    }

    /// Apply a fill, moving Flat -> Long or Long -> Flat.
    ///
    /// A sell always exits the entire held quantity; the position model never
    /// produces partial exits.
    pub fn apply_fill(&mut self, side: OrderSide, price: f64, volume: f64) {
        match side {
            OrderSide::Buy => {
                self.state = PositionState::Long;
                self.quantity = volume;
                self.avg_entry_price = price;
            }
            OrderSide::Sell => {
                self.state = PositionState::Flat;
                self.quantity = 0.0;
                self.avg_entry_price = 0.0;
            }
        }
    }

    /// Current value of the holdings marked to the given price.
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }
}

/// An intended order, derived from a signal and the position it was judged
/// against. Consumed exactly once by the orchestrator's dispatch step.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub side: OrderSide,
    pub volume: f64,
    /// Snapshot of the position the intent was derived from.
    pub position: Position,
}

/// A recorded execution, real or simulated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub id: Uuid,
    pub pair: String,
    pub side: OrderSide,
    pub price: f64,
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
    pub simulated: bool,
}

impl Fill {
    pub fn simulated(pair: &str, side: OrderSide, price: f64, volume: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            pair: pair.to_string(),
            side,
            price,
            volume,
            timestamp: Utc::now(),
            simulated: true,
        }
    }
}
