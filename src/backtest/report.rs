use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Portfolio value at one replay point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// One completed round trip (entry and exit fill).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClosedTrade {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    pub volume: f64,
    pub pnl: f64,
    pub return_pct: f64,
}

impl ClosedTrade {
    pub fn new(
        entry_time: DateTime<Utc>,
        entry_price: f64,
        exit_time: DateTime<Utc>,
        exit_price: f64,
        volume: f64,
    ) -> Self {
        Self {
            entry_time,
            exit_time,
            entry_price,
            exit_price,
            volume,
            pnl: (exit_price - entry_price) * volume,
            return_pct: (exit_price / entry_price - 1.0) * 100.0,
        }
    }
}

/// Outcome of one backtest replay. Immutable once built; replaying the same
/// window with the same strategy yields a bit-identical report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestReport {
    pub pair: String,
    pub strategy: String,

    // Equity
    pub initial_equity: f64,
    pub final_equity: f64,
    /// (final - initial) / initial
    pub total_return: f64,
    /// Largest fractional peak-to-trough decline on the equity curve.
    pub max_drawdown: f64,

    // Trade statistics
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,

    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<ClosedTrade>,
}

impl BacktestReport {
    /// Derive the summary statistics from a finished replay.
    pub fn from_replay(
        pair: String,
        strategy: String,
        initial_equity: f64,
        equity_curve: Vec<EquityPoint>,
        trades: Vec<ClosedTrade>,
    ) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_equity);
        let total_return = (final_equity - initial_equity) / initial_equity;

        let winners: Vec<&ClosedTrade> = trades.iter().filter(|t| t.pnl > 0.0).collect();
        let losers: Vec<&ClosedTrade> = trades.iter().filter(|t| t.pnl <= 0.0).collect();

        let total_wins: f64 = winners.iter().map(|t| t.pnl).sum();
        let total_losses: f64 = losers.iter().map(|t| t.pnl.abs()).sum();

        let win_rate = if trades.is_empty() {
            0.0
        } else {
            winners.len() as f64 / trades.len() as f64
        };
        let avg_win = if winners.is_empty() {
            0.0
        } else {
            total_wins / winners.len() as f64
        };
        let avg_loss = if losers.is_empty() {
            0.0
        } else {
            total_losses / losers.len() as f64
        };
        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        Self {
            pair,
            strategy,
            initial_equity,
            final_equity,
            total_return,
            max_drawdown: max_drawdown(&equity_curve),
            total_trades: trades.len(),
            winning_trades: winners.len(),
            losing_trades: losers.len(),
            win_rate,
            avg_win,
            avg_loss,
            profit_factor,
            equity_curve,
            trades,
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print_report(&self) {
        println!("\n═══════════════ BACKTEST RESULTS ═══════════════");
        println!("  Pair:             {}", self.pair);
        println!("  Strategy:         {}", self.strategy);
        println!("  Bars replayed:    {}", self.equity_curve.len());
        println!("  Initial equity:   ${:.2}", self.initial_equity);
        println!("  Final equity:     ${:.2}", self.final_equity);
        println!("  Total return:     {:+.2}%", self.total_return * 100.0);
        println!("  Max drawdown:     {:.2}%", self.max_drawdown * 100.0);
        println!("  Trades:           {}", self.total_trades);
        if self.total_trades > 0 {
            println!(
                "  Win rate:         {:.1}% ({}/{})",
                self.win_rate * 100.0,
                self.winning_trades,
                self.total_trades
            );
            println!("  Avg win:          ${:.2}", self.avg_win);
            println!("  Avg loss:         ${:.2}", self.avg_loss);
            println!("  Profit factor:    {:.2}", self.profit_factor);
        }
        println!("════════════════════════════════════════════════\n");
    }
}

/// Largest peak-to-trough decline, as a fraction of the peak.
pub fn max_drawdown(curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0f64;

    for point in curve {
        if point.equity > peak {
            peak = point.equity;
        }
        if peak > 0.0 {
            let drawdown = (peak - point.equity) / peak;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }

    worst
}
