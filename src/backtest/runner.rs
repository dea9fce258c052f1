use chrono::{DateTime, Utc};

use crate::backtest::report::{BacktestReport, ClosedTrade, EquityPoint};
use crate::error::Result;
use crate::execution::PositionModel;
use crate::models::{Candle, OrderSide, Position};
use crate::strategy::Strategy;

/// Replays a historical window bar-by-bar through the same strategy and
/// position model the live loop uses.
///
/// Causality: at bar `i` the strategy only ever sees `window[..=i]`.
/// Indicators are recomputed per prefix rather than precomputed over the
/// whole series, so no future bar can leak into a decision.
pub struct BacktestRunner {
    initial_cash: f64,
    trade_volume: f64,
}

impl BacktestRunner {
    pub fn new(initial_cash: f64, trade_volume: f64) -> Self {
        Self {
            initial_cash,
            trade_volume,
        }
    }

    /// Replay `candles` bounded to `[start, end]`.
    ///
    /// A window shorter than the strategy's warm-up still runs: every bar is
    /// Hold and the report shows zero trades. Fills happen at the bar's
    /// close; equity marks the position to each close.
    pub fn run(
        &self,
        strategy: &dyn Strategy,
        candles: &[Candle],
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<BacktestReport> {
        let model = PositionModel::new(self.trade_volume)?;

        let window = bound_window(candles, start, end);
        let pair = window
            .first()
            .map(|c| c.pair.clone())
            .unwrap_or_default();

        tracing::info!(
            "Starting backtest: {} bars for {} with {}",
            window.len(),
            pair,
            strategy.name()
        );

        let mut position = Position::flat(&pair);
        let mut cash = self.initial_cash;
        let mut equity_curve = Vec::with_capacity(window.len());
        let mut trades = Vec::new();
        let mut entry: Option<(DateTime<Utc>, f64)> = None;

        for i in 0..window.len() {
            let bar = &window[i];

            // The strategy sees only the causal prefix ending at this bar.
            let signal = strategy.generate_signal(&window[..=i]);

            if let Some(intent) = model.next_action(signal, &position) {
                match intent.side {
                    OrderSide::Buy => {
                        cash -= intent.volume * bar.close;
                        position.apply_fill(OrderSide::Buy, bar.close, intent.volume);
                        entry = Some((bar.timestamp, bar.close));
                        tracing::debug!(
                            "Bought {} @ ${:.2} at {}",
                            intent.volume,
                            bar.close,
                            bar.timestamp
                        );
                    }
                    OrderSide::Sell => {
                        cash += intent.volume * bar.close;
                        if let Some((entry_time, entry_price)) = entry.take() {
                            trades.push(ClosedTrade::new(
                                entry_time,
                                entry_price,
                                bar.timestamp,
                                bar.close,
                                intent.volume,
                            ));
                        }
                        position.apply_fill(OrderSide::Sell, bar.close, intent.volume);
                        tracing::debug!(
                            "Sold {} @ ${:.2} at {}",
                            intent.volume,
                            bar.close,
                            bar.timestamp
                        );
                    }
                }
            }

            equity_curve.push(EquityPoint {
                timestamp: bar.timestamp,
                equity: cash + position.market_value(bar.close),
            });
        }

        // Close any residual position at the final close so the trade
        // statistics cover it. Equity is unchanged: the position was already
        // marked to that close.
        if position.is_long() {
            if let (Some(bar), Some((entry_time, entry_price))) = (window.last(), entry.take()) {
                trades.push(ClosedTrade::new(
                    entry_time,
                    entry_price,
                    bar.timestamp,
                    bar.close,
                    position.quantity,
                ));
                let quantity = position.quantity;
                cash += quantity * bar.close;
                position.apply_fill(OrderSide::Sell, bar.close, quantity);
            }
        }

        let report = BacktestReport::from_replay(
            pair,
            strategy.name().to_string(),
            self.initial_cash,
            equity_curve,
            trades,
        );

        tracing::info!(
            "Backtest complete: {} trades, return {:+.2}%, max drawdown {:.2}%",
            report.total_trades,
            report.total_return * 100.0,
            report.max_drawdown * 100.0
        );

        Ok(report)
    }
}

fn bound_window<'a>(
    candles: &'a [Candle],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> &'a [Candle] {
    let from = match start {
        Some(start) => candles.partition_point(|c| c.timestamp < start),
        None => 0,
    };
    let to = match end {
        Some(end) => candles.partition_point(|c| c.timestamp <= end),
        None => candles.len(),
    };
    if from >= to {
        &[]
    } else {
        &candles[from..to]
    }
}
