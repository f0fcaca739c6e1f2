//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::config::{Config, ConfigLoader};
use crate::engine::{Collaborators, Engine};
use crate::error::Error;
use crate::journal::JsonlJournal;
use crate::market::{DexScreenerClient, MarketData};
use crate::notify::LogNotifier;
use crate::position::Position;
use crate::store::{JsonFileStore, Store};
use crate::trading::{AssetBurner, ExecutionGateway, PaperGateway, PumpPortalGateway};

/// How the engine will be used by a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Ticks or sells: needs a working gateway
    Trading,
    /// Reads or edits state only; never executes a swap
    Inspect,
}

/// Paper runs keep their own state next to the live one
fn data_dir(config: &Config, dry_run: bool) -> PathBuf {
    let dir = PathBuf::from(&config.storage.data_dir);
    if dry_run {
        dir.join("paper")
    } else {
        dir
    }
}

/// Configuration problems need a fix before any retry makes sense
fn startup_error(e: Error) -> anyhow::Error {
    if e.is_fatal() {
        anyhow::anyhow!("Refusing to start, fix the configuration: {}", e)
    } else {
        anyhow::Error::new(e).context("Engine failed to start")
    }
}

/// Wire collaborators for the chosen mode and start the engine.
///
/// Storage and gateway settings come from the file and environment; the
/// engine layers persisted overrides on top for everything else.
async fn build_engine(config_path: &str, dry_run: bool, mode: Mode) -> Result<Engine> {
    let loader = ConfigLoader::new(config_path);
    let base = loader
        .build()
        .map_err(|e| startup_error(Error::Config(format!("{:#}", e))))?;
    let dir = data_dir(&base, dry_run);

    let store: Arc<dyn Store> = Arc::new(JsonFileStore::new(&dir));
    let market: Arc<dyn MarketData> = Arc::new(DexScreenerClient::new());
    let memory = Arc::new(JsonlJournal::new(dir.join("journal.jsonl")));

    let (gateway, burner): (Arc<dyn ExecutionGateway>, Option<Arc<dyn AssetBurner>>) =
        if dry_run || mode == Mode::Inspect {
            let starting_sol = if mode == Mode::Trading {
                base.gateway.paper_balance_sol
            } else {
                0.0
            };
            let paper = Arc::new(PaperGateway::new(market.clone(), starting_sol));
            if mode == Mode::Trading {
                // Positions left open by an earlier paper run
                match store.load_positions().await {
                    Ok(positions) => {
                        for position in positions.iter().filter(|p| p.is_open()) {
                            paper.credit(&position.asset, position.token_amount).await;
                        }
                    }
                    Err(e) => warn!(error = %e, "Could not restore paper holdings"),
                }
            }
            (paper.clone(), Some(paper))
        } else {
            let live = PumpPortalGateway::new(&base.gateway, market.clone())
                .context("Live trading needs gateway credentials")?;
            (Arc::new(live), None)
        };

    if dry_run {
        warn!("Running in DRY-RUN mode - no real trades will be executed");
    }

    let parts = Collaborators {
        gateway,
        burner,
        market,
        store,
        memory,
        notifier: Arc::new(LogNotifier),
    };
    Engine::start(loader, parts).await.map_err(startup_error)
}

/// Run the driver until Ctrl-C
pub async fn start(config_path: &str, dry_run: bool) -> Result<()> {
    let mut engine = build_engine(config_path, dry_run, Mode::Trading).await?;
    info!(
        "Position: {} - {} SOL, max exposure {} SOL, tick every {}ms",
        engine.config().trading.min_position_sol,
        engine.config().trading.max_position_sol,
        engine.config().trading.max_total_exposure_sol,
        engine.config().trading.tick_interval_ms
    );

    engine
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await;

    info!("Stopped");
    Ok(())
}

/// Show open positions, trade statistics and burn totals
pub async fn status(config_path: &str, dry_run: bool) -> Result<()> {
    let engine = build_engine(config_path, dry_run, Mode::Inspect).await?;
    let status = engine.status().await;

    println!("\n=== TRADER STATUS ===\n");
    println!(
        "Exposure: {:.4} SOL in {} position(s), {:.4} SOL headroom",
        status.portfolio.total_exposure_sol,
        status.portfolio.open_position_count,
        status.portfolio.remaining_capacity_sol
    );
    if let Some(reason) = &status.portfolio.reason_if_blocked {
        println!("Entries blocked: {}", reason);
    }

    let stats = &status.stats;
    println!("\nClosed trades: {}", stats.total);
    println!("  Wins: {}  Losses: {}  Failed: {}", stats.wins, stats.losses, stats.failed);
    println!("  Win rate: {:.1}%", stats.win_rate());
    println!("  Net PnL: {:+.4} SOL", stats.net_pnl_sol);
    println!("  Best / worst: {:+.4} / {:+.4} SOL", stats.best_pnl_sol, stats.worst_pnl_sol);

    println!("\nLearned signals: {}", status.learned_signals);

    let ledger = &status.burn_ledger;
    if ledger.events > 0 {
        println!(
            "\nBurned: {:.2} tokens for {:.4} SOL over {} event(s)",
            ledger.total_burned_tokens, ledger.total_sol_spent, ledger.events
        );
    }

    println!("\n=== OPEN POSITIONS ===\n");
    if status.open_positions.is_empty() {
        println!("No open positions.");
    }
    for position in &status.open_positions {
        print_position(position);
    }

    Ok(())
}

fn print_position(position: &Position) {
    println!(
        "{} {} [{}]\n  {:.4} SOL committed, {:.2} tokens, entry {:.10} SOL\n  tiers sold {}, peak {:.2}x, sell attempts {}, realized {:+.4} SOL",
        position.symbol,
        position.asset,
        position.id,
        position.amount_sol,
        position.token_amount,
        position.entry_price,
        position.tiers_sold,
        position.peak_multiplier,
        position.sell_attempts,
        position.realized_pnl
    );
}

/// Show the effective configuration (secrets masked)
pub async fn show_config(config_path: &str, dry_run: bool) -> Result<()> {
    let engine = build_engine(config_path, dry_run, Mode::Inspect).await?;
    println!("{}", engine.config().masked_display());
    Ok(())
}

/// Persist one setting. `value` is parsed as JSON, falling back to a string.
pub async fn set_config(config_path: &str, dry_run: bool, key: &str, value: &str) -> Result<()> {
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));

    let mut engine = build_engine(config_path, dry_run, Mode::Inspect).await?;
    engine
        .set_config_value(key, value.clone())
        .await
        .with_context(|| format!("Could not set {}", key))?;

    println!("{} = {}", key, value);
    Ok(())
}

/// Manual full close of one position (by id or asset)
pub async fn sell(config_path: &str, dry_run: bool, key: &str) -> Result<()> {
    let mut engine = build_engine(config_path, dry_run, Mode::Trading).await?;
    let result = engine.sell(key).await;
    // Let the memory note and any allocation finish
    engine.shutdown().await;

    let position = result?;
    println!(
        "{} {}: {:?} ({}), PnL {:+.4} SOL",
        position.symbol,
        position.asset,
        position.status,
        position
            .exit_reason
            .map(|r| r.to_string())
            .unwrap_or_else(|| "still open".to_string()),
        position.realized_pnl
    );
    Ok(())
}

/// Per-signal learning table
pub async fn learning_stats(config_path: &str, dry_run: bool) -> Result<()> {
    let engine = build_engine(config_path, dry_run, Mode::Inspect).await?;
    let rows = engine.learning_stats();

    println!("\n=== LEARNED SIGNALS ===\n");
    if rows.is_empty() {
        println!("No signals recorded yet.");
        return Ok(());
    }
    println!(
        "{:<40} {:>6} {:>5} {:>6} {:>8} {:>10} {:>6}",
        "signal", "trades", "wins", "losses", "win %", "avg SOL", "adj"
    );
    for row in rows {
        println!(
            "{:<40} {:>6} {:>5} {:>6} {:>7.1}% {:>+10.4} {:>+6.0}",
            row.signal,
            row.total_trades,
            row.wins,
            row.losses,
            row.win_rate() * 100.0,
            row.avg_pnl_sol(),
            row.adjustment()
        );
    }
    Ok(())
}

pub async fn learning_reset(config_path: &str, dry_run: bool) -> Result<()> {
    let mut engine = build_engine(config_path, dry_run, Mode::Inspect).await?;
    let purged = engine.reset_learning().await;
    println!("Learning data cleared ({} memory note(s) purged)", purged);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_paper_data_dir_is_separate() {
        let config = Config::default();
        assert_eq!(data_dir(&config, false), PathBuf::from("data"));
        assert_eq!(data_dir(&config, true), PathBuf::from("data").join("paper"));
    }

    #[tokio::test]
    async fn test_fatal_config_refuses_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trader.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[exits]\nstop_loss_pct = 80.0").unwrap();

        let err = status(path.to_str().unwrap(), true).await.unwrap_err();
        assert!(err.to_string().starts_with("Refusing to start"));
    }

    #[test]
    fn test_transient_startup_error_keeps_cause() {
        let err = startup_error(Error::Rpc("node down".into()));
        assert_eq!(err.to_string(), "Engine failed to start");
        assert!(format!("{:#}", err).contains("node down"));
    }
}
