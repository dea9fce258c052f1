use crate::error::{BotError, Result};
use crate::models::{OrderIntent, OrderSide, Position, PositionState, Signal};

/// Turns a signal plus the current position into an order intent, or nothing.
///
/// Stateless by design: at-most-one-open-position falls out of the
/// signal/state match without consulting order history. A crossover signal
/// that persists for several bars produces exactly one intent, because after
/// the first fill the position is no longer Flat.
#[derive(Debug, Clone)]
pub struct PositionModel {
    trade_volume: f64,
}

impl PositionModel {
    pub fn new(trade_volume: f64) -> Result<Self> {
        if !(trade_volume > 0.0) || !trade_volume.is_finite() {
            return Err(BotError::Configuration(format!(
                "trade_volume must be a positive number, got {}",
                trade_volume
            )));
        }
        Ok(Self { trade_volume })
    }

    /// Buy only when flat, sell only (and entirely) when long; everything
    /// else is a no-op.
    pub fn next_action(&self, signal: Signal, position: &Position) -> Option<OrderIntent> {
        match (signal, position.state) {
            (Signal::Buy, PositionState::Flat) => Some(OrderIntent {
                side: OrderSide::Buy,
                volume: self.trade_volume,
                position: position.clone(),
            }),
            (Signal::Sell, PositionState::Long) => Some(OrderIntent {
                side: OrderSide::Sell,
                volume: position.quantity,
                position: position.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_position(quantity: f64) -> Position {
        let mut position = Position::flat("XXBTZUSD");
        position.apply_fill(OrderSide::Buy, 30000.0, quantity);
        position
    }

    #[test]
    fn test_rejects_non_positive_volume() {
        assert!(PositionModel::new(0.0).is_err());
        assert!(PositionModel::new(-0.5).is_err());
        assert!(PositionModel::new(f64::NAN).is_err());
    }

    #[test]
    fn test_buy_when_flat() {
        let model = PositionModel::new(0.001).unwrap();
        let position = Position::flat("XXBTZUSD");

        let intent = model.next_action(Signal::Buy, &position).unwrap();
        assert_eq!(intent.side, OrderSide::Buy);
        assert_eq!(intent.volume, 0.001);
        assert_eq!(intent.position, position);
    }

    #[test]
    fn test_buy_while_long_is_ignored() {
        // Redundant Buy signals during a crossover's multi-bar persistence
        // must not pyramid.
        let model = PositionModel::new(0.001).unwrap();
        assert!(model.next_action(Signal::Buy, &long_position(0.001)).is_none());
    }

    #[test]
    fn test_sell_when_long_exits_entire_quantity() {
        let model = PositionModel::new(0.001).unwrap();
        let position = long_position(0.004);

        let intent = model.next_action(Signal::Sell, &position).unwrap();
        assert_eq!(intent.side, OrderSide::Sell);
        assert_eq!(intent.volume, 0.004);
    }

    #[test]
    fn test_sell_while_flat_is_ignored() {
        let model = PositionModel::new(0.001).unwrap();
        assert!(model
            .next_action(Signal::Sell, &Position::flat("XXBTZUSD"))
            .is_none());
    }

    #[test]
    fn test_hold_never_produces_intent() {
        let model = PositionModel::new(0.001).unwrap();
        assert!(model
            .next_action(Signal::Hold, &Position::flat("XXBTZUSD"))
            .is_none());
        assert!(model.next_action(Signal::Hold, &long_position(0.001)).is_none());
    }
}
