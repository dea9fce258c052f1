use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use tokio::sync::watch;

use krakenbot::api::KrakenClient;
use krakenbot::bot::TradingBot;
use krakenbot::config::{BotConfig, Mode};
use krakenbot::error::{BotError, Result};
use krakenbot::events::TracingSink;

#[derive(Parser, Debug)]
#[command(name = "krakenbot", about = "Kraken trading bot")]
struct Cli {
    /// Trade with real orders on the exchange
    #[arg(long, conflicts_with_all = ["paper", "backtest"])]
    live: bool,

    /// Simulate fills locally without touching the exchange (default)
    #[arg(long, conflicts_with_all = ["live", "backtest"])]
    paper: bool,

    /// Replay historical candles instead of trading
    #[arg(long, conflicts_with_all = ["live", "paper"])]
    backtest: bool,

    /// Path to an env file with configuration overrides
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Candle interval in minutes
    #[arg(short, long, default_value_t = 60)]
    interval: u64,

    /// Backtest window start (YYYY-MM-DD)
    #[arg(long)]
    start: Option<String>,

    /// Backtest window end (YYYY-MM-DD)
    #[arg(long)]
    end: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.live {
            Mode::Live
        } else if self.backtest {
            Mode::Backtest
        } else {
            Mode::Paper
        }
    }
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| BotError::Configuration(format!("invalid date {}: {}", raw, e)))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| BotError::Configuration(format!("invalid date {}", raw)))?;
    Ok(midnight.and_utc())
}

fn setup_logging(verbose: bool) {
    let default_filter = if verbose {
        "krakenbot=debug"
    } else {
        "krakenbot=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.config {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| {
                BotError::Configuration(format!("cannot load {}: {}", path.display(), e))
            })?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    setup_logging(cli.verbose);

    let start = cli.start.as_deref().map(parse_date).transpose()?;
    let end = cli.end.as_deref().map(parse_date).transpose()?;

    let mode = cli.mode();
    let config = BotConfig::from_env(mode, cli.interval, start, end)?;

    tracing::info!("🚀 Krakenbot starting in {} mode", mode);

    let client = KrakenClient::new();
    let mut bot = TradingBot::new(config, client.clone(), client, TracingSink)?;

    if mode == Mode::Backtest {
        let report = bot.run_backtest().await?;
        report.print_report();
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("⚠️  Received Ctrl+C, shutting down...");
            let _ = shutdown_tx.send(true);
        }
    });

    bot.run(shutdown_rx).await?;
    tracing::info!("👋 Krakenbot stopped");
    Ok(())
}
