pub mod report;
pub mod runner;
pub mod synthetic;

pub use report::{BacktestReport, ClosedTrade, EquityPoint};
pub use runner::BacktestRunner;
pub use synthetic::{MarketScenario, SyntheticDataGenerator};
