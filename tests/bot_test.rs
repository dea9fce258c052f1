use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::watch;

use krakenbot::api::{MarketDataSource, OrderSink};
use krakenbot::bot::{CycleState, TradingBot};
use krakenbot::config::{BotConfig, Mode, StrategyParams};
use krakenbot::error::{BotError, Result};
use krakenbot::events::{BotEvent, RecordingSink};
use krakenbot::models::{Candle, OrderId, OrderSide, PositionState};

/// Serves a fixed candle series, or fails every fetch.
struct StaticData {
    candles: Vec<Candle>,
    fail: bool,
}

impl StaticData {
    fn new(candles: Vec<Candle>) -> Self {
        Self {
            candles,
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            candles: Vec::new(),
            fail: true,
        }
    }
}

impl MarketDataSource for StaticData {
    async fn fetch_ohlc(&self, pair: &str, _interval_minutes: u32) -> Result<Vec<Candle>> {
        if self.fail {
            return Err(BotError::DataUnavailable {
                pair: pair.to_string(),
                reason: "exchange timeout".to_string(),
            });
        }
        Ok(self.candles.clone())
    }

    async fn load_historical(
        &self,
        pair: &str,
        interval_minutes: u32,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        self.fetch_ohlc(pair, interval_minutes).await
    }
}

/// Counts submissions; optionally rejects them all.
struct CountingOrders {
    calls: Arc<AtomicUsize>,
    reject: bool,
}

impl CountingOrders {
    fn accepting(calls: Arc<AtomicUsize>) -> Self {
        Self {
            calls,
            reject: false,
        }
    }

    fn rejecting(calls: Arc<AtomicUsize>) -> Self {
        Self {
            calls,
            reject: true,
        }
    }
}

impl OrderSink for CountingOrders {
    async fn submit_order(&self, _side: OrderSide, _pair: &str, _volume: f64) -> Result<OrderId> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            Err(BotError::OrderRejected {
                reason: "insufficient funds".to_string(),
            })
        } else {
            Ok(OrderId("OABC12-TEST-ORDER".to_string()))
        }
    }
}

fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            pair: "XXBTZUSD".to_string(),
            timestamp: start + Duration::hours(i as i64),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 1.0,
        })
        .collect()
}

/// Series whose last bar produces a fresh upward crossover for MA(2, 4).
fn buy_on_last_bar() -> Vec<Candle> {
    candles_from_closes(&[10.0, 10.0, 10.0, 10.0, 9.0, 8.0, 11.0, 12.0])
}

fn config(mode: Mode) -> BotConfig {
    BotConfig {
        pair: "XXBTZUSD".to_string(),
        trade_volume: 0.001,
        strategy_name: "simple_ma".to_string(),
        strategy_params: StrategyParams {
            short_window: 2,
            long_window: 4,
            ..StrategyParams::default()
        },
        interval_minutes: 60,
        mode,
        backtest_start: None,
        backtest_end: None,
        initial_cash: 10_000.0,
    }
}

#[tokio::test]
async fn test_paper_buy_opens_position_without_touching_order_sink() {
    let calls = Arc::new(AtomicUsize::new(0));
    let sink = Arc::new(RecordingSink::new());
    let mut bot = TradingBot::new(
        config(Mode::Paper),
        StaticData::new(buy_on_last_bar()),
        CountingOrders::accepting(calls.clone()),
        sink.clone(),
    )
    .unwrap();

    bot.run_cycle().await.unwrap();

    let position = bot.position();
    assert_eq!(position.state, PositionState::Long);
    assert!((position.quantity - 0.001).abs() < 1e-12);
    assert_eq!(position.avg_entry_price, 12.0);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(bot.fills().len(), 1);
    assert!(bot.fills()[0].simulated);

    let events = sink.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, BotEvent::SimulatedFill { side: OrderSide::Buy, .. })));
    assert_eq!(bot.state(), CycleState::Idle);
}

#[tokio::test]
async fn test_fetch_failure_skips_cycle_and_leaves_position_unchanged() {
    let calls = Arc::new(AtomicUsize::new(0));
    let sink = Arc::new(RecordingSink::new());
    let mut bot = TradingBot::new(
        config(Mode::Live),
        StaticData::failing(),
        CountingOrders::accepting(calls.clone()),
        sink.clone(),
    )
    .unwrap();

    bot.run_cycle().await.unwrap();

    assert_eq!(bot.position().state, PositionState::Flat);
    assert_eq!(bot.state(), CycleState::Idle);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let events = sink.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, BotEvent::CycleSkipped { .. })));
}

#[tokio::test]
async fn test_persistent_buy_signal_never_pyramids() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut bot = TradingBot::new(
        config(Mode::Paper),
        StaticData::new(buy_on_last_bar()),
        CountingOrders::accepting(calls.clone()),
        RecordingSink::new(),
    )
    .unwrap();

    bot.run_cycle().await.unwrap();
    bot.run_cycle().await.unwrap();
    bot.run_cycle().await.unwrap();

    assert_eq!(bot.position().state, PositionState::Long);
    assert!((bot.position().quantity - 0.001).abs() < 1e-12);
    assert_eq!(bot.fills().len(), 1);
}

#[tokio::test]
async fn test_live_buy_submits_order_and_updates_position() {
    let calls = Arc::new(AtomicUsize::new(0));
    let sink = Arc::new(RecordingSink::new());
    let mut bot = TradingBot::new(
        config(Mode::Live),
        StaticData::new(buy_on_last_bar()),
        CountingOrders::accepting(calls.clone()),
        sink.clone(),
    )
    .unwrap();

    bot.run_cycle().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(bot.position().state, PositionState::Long);
    assert_eq!(bot.fills().len(), 0);

    let events = sink.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, BotEvent::OrderSubmitted { side: OrderSide::Buy, .. })));
}

#[tokio::test]
async fn test_live_rejected_order_leaves_position_unchanged() {
    let calls = Arc::new(AtomicUsize::new(0));
    let sink = Arc::new(RecordingSink::new());
    let mut bot = TradingBot::new(
        config(Mode::Live),
        StaticData::new(buy_on_last_bar()),
        CountingOrders::rejecting(calls.clone()),
        sink.clone(),
    )
    .unwrap();

    bot.run_cycle().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(bot.position().state, PositionState::Flat);
    assert_eq!(bot.state(), CycleState::Idle);

    let events = sink.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, BotEvent::OrderFailed { .. })));
}

#[tokio::test]
async fn test_run_cycle_rejected_in_backtest_mode() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut bot = TradingBot::new(
        config(Mode::Backtest),
        StaticData::new(buy_on_last_bar()),
        CountingOrders::accepting(calls),
        RecordingSink::new(),
    )
    .unwrap();

    let result = bot.run_cycle().await;
    assert!(matches!(result, Err(BotError::Configuration(_))));
}

#[tokio::test]
async fn test_backtest_mode_replays_configured_window() {
    let candles = candles_from_closes(&[10.0, 10.0, 10.0, 10.0, 9.0, 8.0, 11.0, 12.0, 13.0, 14.0]);
    let mut cfg = config(Mode::Backtest);
    cfg.backtest_start = Some(candles[0].timestamp);
    cfg.backtest_end = Some(candles[candles.len() - 1].timestamp);

    let bot = TradingBot::new(
        cfg,
        StaticData::new(candles),
        CountingOrders::accepting(Arc::new(AtomicUsize::new(0))),
        RecordingSink::new(),
    )
    .unwrap();

    let report = bot.run_backtest().await.unwrap();
    assert_eq!(report.equity_curve.len(), 10);
    assert_eq!(report.total_trades, 1);
    assert_eq!(report.trades[0].entry_price, 12.0);
}

#[tokio::test]
async fn test_shutdown_stops_loop_after_cycle_in_flight() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut bot = TradingBot::new(
        config(Mode::Paper),
        StaticData::new(buy_on_last_bar()),
        CountingOrders::accepting(calls),
        RecordingSink::new(),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    shutdown_tx.send(true).unwrap();

    bot.run(shutdown_rx).await.unwrap();

    // The initial cycle still ran to completion before the stop.
    assert_eq!(bot.fills().len(), 1);
    assert_eq!(bot.state(), CycleState::Stopped);
}
