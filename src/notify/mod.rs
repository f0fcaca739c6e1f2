//! Outbound trade signals
//!
//! The engine emits one signal per entry, partial exit and final exit.
//! Presentation belongs to whoever implements `Notifier`.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TradeSignal {
    Entry {
        asset: String,
        symbol: String,
        amount_sol: f64,
        score: f64,
        reasons: Vec<String>,
        tx: String,
    },
    PartialExit {
        asset: String,
        symbol: String,
        tier: usize,
        sol_received: f64,
        pnl_sol: f64,
        tx: String,
    },
    Exit {
        asset: String,
        symbol: String,
        reason: String,
        detail: String,
        pnl_sol: f64,
        hold_minutes: i64,
        tx: Option<String>,
    },
}

impl TradeSignal {
    pub fn asset(&self) -> &str {
        match self {
            TradeSignal::Entry { asset, .. }
            | TradeSignal::PartialExit { asset, .. }
            | TradeSignal::Exit { asset, .. } => asset,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, signal: &TradeSignal) -> Result<()>;
}

/// Writes every signal to the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, signal: &TradeSignal) -> Result<()> {
        match signal {
            TradeSignal::Entry {
                symbol,
                amount_sol,
                score,
                reasons,
                ..
            } => info!(
                "BUY {} | {:.3} SOL | score {:.0} | {}",
                symbol,
                amount_sol,
                score,
                reasons.join(" | ")
            ),
            TradeSignal::PartialExit {
                symbol,
                tier,
                sol_received,
                pnl_sol,
                ..
            } => info!(
                "PARTIAL SELL {} | tier {} | {:.4} SOL received | PnL {:+.4} SOL",
                symbol,
                tier + 1,
                sol_received,
                pnl_sol
            ),
            TradeSignal::Exit {
                symbol,
                reason,
                detail,
                pnl_sol,
                hold_minutes,
                ..
            } => info!(
                "SELL {} | {} ({}) | PnL {:+.4} SOL | held {}m",
                symbol, reason, detail, pnl_sol, hold_minutes
            ),
        }
        Ok(())
    }
}
