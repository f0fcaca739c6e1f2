//! Exit execution
//!
//! Balance reconciliation before each sell and the escalating slippage
//! ladder. The attempt counter lives on the position, so the retry state
//! survives restarts.

use tracing::{info, warn};

use super::types::Position;
use crate::error::{Error, Result};
use crate::trading::{execute_swap, from_raw, to_raw, ExecutionGateway, SubmitOptions, SOL_DECIMALS, SOL_MINT};

/// Slippage tolerance per consecutive failed attempt
pub const EXIT_SLIPPAGE_LADDER_BPS: [u32; 5] = [500, 1000, 1500, 2500, 5000];

/// Failed exits after which the position is given up
pub const MAX_SELL_ATTEMPTS: u32 = EXIT_SLIPPAGE_LADDER_BPS.len() as u32;

/// Relative mismatch above which the wallet balance replaces the book
const BALANCE_TOLERANCE: f64 = 0.01;

pub fn slippage_for_attempt(attempts: u32) -> u32 {
    let idx = (attempts as usize).min(EXIT_SLIPPAGE_LADDER_BPS.len() - 1);
    EXIT_SLIPPAGE_LADDER_BPS[idx]
}

/// Outcome of comparing the book against the wallet
#[derive(Debug, Clone, PartialEq)]
pub enum BalanceCheck {
    Unchanged,
    Reconciled { recorded: f64, observed: f64 },
    /// Wallet holds none of the asset
    Missing,
}

/// Trust the observed wallet balance over the recorded quantity.
/// A failed lookup leaves the book untouched.
pub async fn reconcile_balance(gateway: &dyn ExecutionGateway, position: &mut Position) -> BalanceCheck {
    let observed = match gateway.get_asset_balance(&position.asset).await {
        Ok(observed) => observed,
        Err(e) => {
            warn!(asset = %position.asset, error = %e, "Balance lookup failed, using recorded quantity");
            return BalanceCheck::Unchanged;
        }
    };

    if observed <= 0.0 {
        return BalanceCheck::Missing;
    }

    let recorded = position.token_amount;
    let mismatch = if recorded > 0.0 {
        (observed - recorded).abs() / recorded
    } else {
        1.0
    };
    if mismatch <= BALANCE_TOLERANCE {
        return BalanceCheck::Unchanged;
    }

    warn!(
        asset = %position.asset,
        recorded,
        observed,
        "Balance mismatch, trusting wallet"
    );
    position.reconcile_quantity(observed);
    BalanceCheck::Reconciled { recorded, observed }
}

/// A confirmed sell
#[derive(Debug, Clone, PartialEq)]
pub struct SellFill {
    pub tokens_sold: f64,
    pub sol_received: f64,
    pub signature: String,
}

/// Sell `token_amount` whole tokens at the slippage for the position's
/// current attempt count
pub async fn sell_tokens(
    gateway: &dyn ExecutionGateway,
    asset: &str,
    token_amount: f64,
    attempts: u32,
    priority_fee_sol: f64,
) -> Result<SellFill> {
    let decimals = gateway.get_asset_decimals(asset).await?;
    let raw = to_raw(token_amount, decimals);
    if raw == 0 {
        return Err(Error::Internal(format!("nothing to sell for {}", asset)));
    }

    let slippage_bps = slippage_for_attempt(attempts);
    info!(asset, token_amount, attempt = attempts + 1, slippage_bps, "Selling");

    let options = SubmitOptions { priority_fee_sol };
    let fill = execute_swap(gateway, asset, SOL_MINT, raw, slippage_bps, &options).await?;

    Ok(SellFill {
        tokens_sold: from_raw(fill.quote.in_amount, decimals),
        sol_received: from_raw(fill.quote.out_amount, SOL_DECIMALS),
        signature: fill.signature,
    })
}
