use std::sync::Mutex;

use crate::models::{OrderId, OrderSide, Signal};

/// Structured events emitted by the orchestrator.
///
/// The core emits these as data; how they are formatted or shipped is the
/// sink's concern. The sink is passed in at construction, so its lifecycle is
/// tied to the run rather than the process.
#[derive(Debug, Clone)]
pub enum BotEvent {
    CycleStarted {
        pair: String,
    },
    CycleSkipped {
        pair: String,
        reason: String,
    },
    CycleCompleted {
        pair: String,
        signal: Signal,
    },
    SignalDecision {
        pair: String,
        signal: Signal,
        indicators: Vec<(String, Option<f64>)>,
    },
    OrderSubmitted {
        pair: String,
        side: OrderSide,
        volume: f64,
        order_id: OrderId,
    },
    OrderFailed {
        pair: String,
        side: OrderSide,
        volume: f64,
        reason: String,
    },
    SimulatedFill {
        pair: String,
        side: OrderSide,
        volume: f64,
        price: f64,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: BotEvent);
}

/// Default sink: renders events through `tracing`.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: BotEvent) {
        match event {
            BotEvent::CycleStarted { pair } => {
                tracing::info!("🔄 Starting trading cycle for {}", pair);
            }
            BotEvent::CycleSkipped { pair, reason } => {
                tracing::warn!("⏭️  Cycle skipped for {}: {}", pair, reason);
            }
            BotEvent::CycleCompleted { pair, signal } => {
                tracing::info!("✅ Cycle complete for {} - signal: {:?}", pair, signal);
            }
            BotEvent::SignalDecision {
                pair,
                signal,
                indicators,
            } => {
                let rendered: Vec<String> = indicators
                    .iter()
                    .map(|(name, value)| match value {
                        Some(v) => format!("{}={:.4}", name, v),
                        None => format!("{}=warming up", name),
                    })
                    .collect();
                tracing::info!(
                    "📊 {} signal: {:?} ({})",
                    pair,
                    signal,
                    rendered.join(", ")
                );
            }
            BotEvent::OrderSubmitted {
                pair,
                side,
                volume,
                order_id,
            } => {
                tracing::info!(
                    "💹 Submitted {:?} order for {} {} (id: {})",
                    side,
                    volume,
                    pair,
                    order_id.0
                );
            }
            BotEvent::OrderFailed {
                pair,
                side,
                volume,
                reason,
            } => {
                tracing::error!(
                    "❌ {:?} order for {} {} failed: {}",
                    side,
                    volume,
                    pair,
                    reason
                );
            }
            BotEvent::SimulatedFill {
                pair,
                side,
                volume,
                price,
            } => {
                tracing::info!(
                    "📝 Paper fill: {:?} {} {} @ ${:.2}",
                    side,
                    volume,
                    pair,
                    price
                );
            }
        }
    }
}

/// Sink that records events in memory, for test assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<BotEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BotEvent> {
        self.events.lock().expect("event sink poisoned").clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: BotEvent) {
        self.events.lock().expect("event sink poisoned").push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for std::sync::Arc<S> {
    fn emit(&self, event: BotEvent) {
        (**self).emit(event);
    }
}
