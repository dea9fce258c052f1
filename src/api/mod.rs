// Exchange collaborator boundaries
pub mod kraken;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Candle, OrderId, OrderSide};

pub use kraken::KrakenClient;

/// Source of OHLC market data.
///
/// Failures map to `DataUnavailable` (exchange-reported) or `Connection`
/// (transport); both are recoverable at the cycle boundary.
#[allow(async_fn_in_trait)]
pub trait MarketDataSource {
    /// Most recent candles for the pair at the given interval.
    async fn fetch_ohlc(&self, pair: &str, interval_minutes: u32) -> Result<Vec<Candle>>;

    /// Candles covering `[start, end]`, for backtests.
    async fn load_historical(
        &self,
        pair: &str,
        interval_minutes: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>>;
}

/// Destination for real orders (live mode only; paper mode never touches it).
#[allow(async_fn_in_trait)]
pub trait OrderSink {
    async fn submit_order(&self, side: OrderSide, pair: &str, volume: f64) -> Result<OrderId>;
}
