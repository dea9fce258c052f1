use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::Candle;

/// Market scenarios for synthetic candle generation.
#[derive(Debug, Clone, Copy)]
pub enum MarketScenario {
    /// Steady uptrend with light noise (+2% daily average)
    Uptrend,
    /// Steady downtrend with light noise (-2% daily average)
    Downtrend,
    /// Mean-reverting chop around the base price
    Sideways,
    /// Large swings (±3% per bar)
    Volatile,
    /// Decline through the first half, recovery through the second.
    /// Produces both a death cross and a golden cross for MA strategies.
    TrendReversal,
}

/// Deterministic price-series generator for strategy and backtest tests.
///
/// Timestamps start from a fixed date so two generators with the same seed
/// produce byte-identical series.
pub struct SyntheticDataGenerator {
    rng: StdRng,
    base_price: f64,
    base_volume: f64,
}

impl SyntheticDataGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: 30_000.0,
            base_volume: 5.0,
        }
    }

    /// Generate `num_candles` candles spaced `interval_minutes` apart.
    pub fn generate(
        &mut self,
        scenario: MarketScenario,
        num_candles: usize,
        interval_minutes: i64,
    ) -> Vec<Candle> {
        let start_time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars_per_day = 24.0 * 60.0 / interval_minutes as f64;

        let mut candles = Vec::with_capacity(num_candles);
        let mut price = self.base_price;

        for i in 0..num_candles {
            let timestamp = start_time + Duration::minutes(i as i64 * interval_minutes);

            let (drift_per_bar, noise_pct) = match scenario {
                MarketScenario::Uptrend => (0.02 / bars_per_day, 0.001),
                MarketScenario::Downtrend => (-0.02 / bars_per_day, 0.001),
                MarketScenario::Sideways => (0.0, 0.01),
                MarketScenario::Volatile => (0.0, 0.03),
                MarketScenario::TrendReversal => {
                    if i < num_candles / 2 {
                        (-0.10 / bars_per_day, 0.001)
                    } else {
                        (0.10 / bars_per_day, 0.001)
                    }
                }
            };

            let drift = price * drift_per_bar;
            let noise = price * self.rng.gen_range(-noise_pct..noise_pct);
            let reversion = match scenario {
                MarketScenario::Sideways => (self.base_price - price) * 0.1,
                _ => 0.0,
            };
            price = (price + drift + noise + reversion).max(self.base_price * 0.1);

            candles.push(self.create_candle(price, timestamp));
        }

        candles
    }

    /// Build a well-formed OHLC bar around a close price.
    fn create_candle(&mut self, close: f64, timestamp: DateTime<Utc>) -> Candle {
        let high = close * (1.0 + self.rng.gen_range(0.0..0.002));
        let low = close * (1.0 - self.rng.gen_range(0.0..0.002));
        let open = self.rng.gen_range(low..=high);
        let volume = self.base_volume * self.rng.gen_range(0.5..1.5);

        Candle {
            pair: "SYNTH".to_string(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}
