use chrono::Duration as ChronoDuration;
use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{interval_at, Duration, Instant};

use crate::api::{MarketDataSource, OrderSink};
use crate::backtest::{BacktestReport, BacktestRunner};
use crate::config::{BotConfig, Mode};
use crate::error::{BotError, Result};
use crate::events::{BotEvent, EventSink};
use crate::execution::PositionModel;
use crate::models::{Fill, OrderIntent, Position};
use crate::strategy::{build_strategy, Strategy};

/// Where the orchestrator is within one trading cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Fetching,
    Deciding,
    Executing,
    Stopped,
}

/// The trading orchestrator: one position, one strategy, one mode, fixed for
/// the lifetime of the run.
///
/// Each cycle walks Idle -> Fetching -> Deciding -> Executing -> Idle. The
/// deciding logic is identical across live and paper; only the dispatch step
/// differs, and that difference is one closed match on the mode. Per-cycle
/// failures (data fetch, order submission) are emitted as events and skip the
/// cycle; they never crash the loop.
pub struct TradingBot<D, O, E> {
    config: BotConfig,
    strategy: Box<dyn Strategy>,
    position_model: PositionModel,
    data: D,
    orders: O,
    events: E,
    position: Position,
    state: CycleState,
    fills: Vec<Fill>,
}

impl<D, O, E> TradingBot<D, O, E>
where
    D: MarketDataSource,
    O: OrderSink,
    E: EventSink,
{
    /// Validates the configuration and resolves the strategy. All
    /// configuration failures surface here, before the first cycle.
    pub fn new(config: BotConfig, data: D, orders: O, events: E) -> Result<Self> {
        config.validate()?;
        let strategy = build_strategy(&config.strategy_name, &config.strategy_params)?;
        let position_model = PositionModel::new(config.trade_volume)?;
        let position = Position::flat(&config.pair);

        tracing::info!(
            "Trading bot initialized for {} ({} mode, strategy {})",
            config.pair,
            config.mode,
            strategy.name()
        );

        Ok(Self {
            config,
            strategy,
            position_model,
            data,
            orders,
            events,
            position,
            state: CycleState::Idle,
            fills: Vec::new(),
        })
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Simulated fills recorded in paper mode.
    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Run a single trading cycle (live/paper only).
    ///
    /// Recoverable failures return `Ok`: the skip reason travels through the
    /// event sink and the orchestrator is back at `Idle` with the position
    /// untouched.
    pub async fn run_cycle(&mut self) -> Result<()> {
        if self.config.mode == Mode::Backtest {
            return Err(BotError::Configuration(
                "run_cycle is not used in backtest mode; call run_backtest".to_string(),
            ));
        }

        let pair = self.config.pair.clone();
        self.events.emit(BotEvent::CycleStarted { pair: pair.clone() });

        self.state = CycleState::Fetching;
        let candles = match self
            .data
            .fetch_ohlc(&pair, self.config.interval_minutes as u32)
            .await
        {
            Ok(candles) if !candles.is_empty() => candles,
            Ok(_) => {
                self.skip_cycle(&pair, "empty candle series".to_string());
                return Ok(());
            }
            Err(e) => {
                self.skip_cycle(&pair, e.to_string());
                return Ok(());
            }
        };

        self.state = CycleState::Deciding;
        let signal = self.strategy.generate_signal(&candles);
        let indicators = self.strategy.calculate_indicators(&candles);
        let snapshot = indicators
            .latest()
            .map(|point| indicators.snapshot(point))
            .unwrap_or_default();
        self.events.emit(BotEvent::SignalDecision {
            pair: pair.clone(),
            signal,
            indicators: snapshot,
        });

        self.state = CycleState::Executing;
        let Some(last) = candles.last() else {
            self.skip_cycle(&pair, "empty candle series".to_string());
            return Ok(());
        };
        let last_close = last.close;
        if let Some(intent) = self.position_model.next_action(signal, &self.position) {
            self.dispatch(intent, last_close).await;
        }

        self.state = CycleState::Idle;
        self.events.emit(BotEvent::CycleCompleted { pair, signal });
        Ok(())
    }

    /// The one place live and paper diverge. The position update is
    /// synchronous with the dispatch, inside the same cycle, so a crash
    /// between signal and update cannot leave the position inconsistent with
    /// a submitted order.
    async fn dispatch(&mut self, intent: OrderIntent, last_close: f64) {
        let pair = self.config.pair.clone();
        match self.config.mode {
            Mode::Live => {
                match self
                    .orders
                    .submit_order(intent.side, &pair, intent.volume)
                    .await
                {
                    Ok(order_id) => {
                        self.position.apply_fill(intent.side, last_close, intent.volume);
                        self.events.emit(BotEvent::OrderSubmitted {
                            pair,
                            side: intent.side,
                            volume: intent.volume,
                            order_id,
                        });
                    }
                    Err(e) => {
                        // Position unchanged; next cycle re-evaluates.
                        self.events.emit(BotEvent::OrderFailed {
                            pair,
                            side: intent.side,
                            volume: intent.volume,
                            reason: e.to_string(),
                        });
                    }
                }
            }
            Mode::Paper => {
                let fill = Fill::simulated(&pair, intent.side, last_close, intent.volume);
                self.position.apply_fill(intent.side, last_close, intent.volume);
                self.events.emit(BotEvent::SimulatedFill {
                    pair,
                    side: intent.side,
                    volume: intent.volume,
                    price: last_close,
                });
                self.fills.push(fill);
            }
            // Backtest never reaches dispatch; run_cycle rejects the mode.
            Mode::Backtest => {}
        }
    }

    fn skip_cycle(&mut self, pair: &str, reason: String) {
        tracing::warn!("Skipping cycle for {}: {}", pair, reason);
        self.events.emit(BotEvent::CycleSkipped {
            pair: pair.to_string(),
            reason,
        });
        self.state = CycleState::Idle;
    }

    /// Interval loop for live/paper mode. Runs one cycle immediately, then
    /// one per configured interval.
    ///
    /// Cancellation (`shutdown` flipping to true, or its sender dropping)
    /// during the wait stops immediately with no side effects. A cycle
    /// already in flight always runs to completion first, so an order
    /// submission is never abandoned unresolved.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        tracing::info!(
            "Starting trading loop in {} mode, interval: {}m",
            self.config.mode,
            self.config.interval_minutes
        );

        self.run_cycle().await?;

        let period = Duration::from_secs(self.config.interval_minutes * 60);
        let mut timer = interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.run_cycle().await?;
                }
                changed = shutdown.changed() => {
                    match changed {
                        Ok(()) if !*shutdown.borrow() => continue,
                        _ => break,
                    }
                }
            }
        }

        self.state = CycleState::Stopped;
        tracing::info!("Trading loop stopped");
        Ok(())
    }

    /// Backtest mode: load the configured window and replay it through the
    /// simulator. The window defaults to the 30 days before now.
    pub async fn run_backtest(&self) -> Result<BacktestReport> {
        if self.config.mode != Mode::Backtest {
            return Err(BotError::Configuration(format!(
                "run_backtest called in {} mode",
                self.config.mode
            )));
        }

        let end = self.config.backtest_end.unwrap_or_else(Utc::now);
        let start = self
            .config
            .backtest_start
            .unwrap_or_else(|| end - ChronoDuration::days(30));

        let candles = self
            .data
            .load_historical(
                &self.config.pair,
                self.config.interval_minutes as u32,
                start,
                end,
            )
            .await?;

        let runner = BacktestRunner::new(self.config.initial_cash, self.config.trade_volume);
        runner.run(self.strategy.as_ref(), &candles, Some(start), Some(end))
    }
}
