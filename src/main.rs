//! Pump.fun position manager
//!
//! # WARNING
//! - Live mode trades with real money. Only use funds you can afford to lose.
//! - Most pump.fun tokens go to zero (rug pulls, abandonment).
//! - Paper results do NOT carry over to live fills.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use pumpfun_trader::cli::commands;

/// Autonomous pump.fun position manager
#[derive(Parser)]
#[command(name = "trader")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Paper trading against live prices; separate state directory
    #[arg(long, global = true)]
    dry_run: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "TRADER_JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the trading loop (Ctrl-C to stop)
    Start,

    /// Show open positions, P&L and burn totals
    Status,

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Close a position now
    Sell {
        /// Position id or token mint address
        position: String,
    },

    /// Self-learning statistics
    Learning {
        #[command(subcommand)]
        action: LearningAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (secrets masked)
    Show,

    /// Persist a setting, e.g. `trading.max_position_sol 0.2`
    Set {
        /// Dotted key
        key: String,

        /// JSON value; anything that isn't JSON is taken as a string
        value: String,
    },
}

#[derive(Subcommand)]
enum LearningAction {
    /// Per-signal win rates and score adjustments
    Stats,

    /// Clear learned signals and loss memories
    Reset,
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("pumpfun_trader=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    if matches!(cli.command, Commands::Start | Commands::Sell { .. }) && !cli.dry_run {
        warn!("LIVE mode: orders are signed and sent with real funds");
    }

    let config = cli.config.as_str();
    let dry_run = cli.dry_run;
    let result = match cli.command {
        Commands::Start => commands::start(config, dry_run).await,
        Commands::Status => commands::status(config, dry_run).await,
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => commands::show_config(config, dry_run).await,
            ConfigAction::Set { key, value } => {
                commands::set_config(config, dry_run, &key, &value).await
            }
        },
        Commands::Sell { position } => commands::sell(config, dry_run, &position).await,
        Commands::Learning { action } => match action {
            LearningAction::Stats => commands::learning_stats(config, dry_run).await,
            LearningAction::Reset => commands::learning_reset(config, dry_run).await,
        },
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
