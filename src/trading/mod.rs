//! Trading module - Execution gateway
//!
//! Supports two execution methods:
//! - Paper trading (dry run, fills at market-data prices)
//! - PumpPortal Lightning API (server-side signing) + Solana JSON-RPC for balances

pub mod paper;
pub mod pumpportal;
pub mod rpc;

pub use paper::PaperGateway;
pub use pumpportal::PumpPortalGateway;
pub use rpc::SolanaRpc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::filter::sizing::estimate_impact_pct;
use crate::filter::TokenMetrics;

/// Wrapped SOL mint; the quote asset for every trade
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
pub const SOL_DECIMALS: u8 = 9;

/// Whole units -> raw base units
pub fn to_raw(amount: f64, decimals: u8) -> u64 {
    (amount * 10f64.powi(decimals as i32)).round().max(0.0) as u64
}

/// Raw base units -> whole units
pub fn from_raw(raw: u64, decimals: u8) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}

/// A priced swap, amounts in raw base units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub input_asset: String,
    pub output_asset: String,
    pub in_amount: u64,
    pub out_amount: u64,
    pub price_impact_pct: f64,
    pub slippage_bps: u32,
}

impl Quote {
    pub fn is_buy(&self) -> bool {
        self.input_asset == SOL_MINT
    }

    /// The non-SOL side of the swap
    pub fn token(&self) -> &str {
        if self.is_buy() {
            &self.output_asset
        } else {
            &self.input_asset
        }
    }
}

/// Gateway-specific payload ready for signing and submission
#[derive(Debug, Clone)]
pub struct SignablePayload {
    pub quote: Quote,
    pub wallet: String,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct SubmitOptions {
    pub priority_fee_sol: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitResult {
    pub signature: Option<String>,
    pub confirmed: bool,
    pub error: Option<String>,
}

/// Swap execution and wallet balances
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    fn wallet_address(&self) -> &str;

    async fn quote(
        &self,
        sell_asset: &str,
        buy_asset: &str,
        amount: u64,
        slippage_bps: u32,
    ) -> Result<Quote>;

    async fn build_transferable(&self, quote: &Quote, wallet: &str) -> Result<SignablePayload>;

    async fn sign_and_submit(
        &self,
        payload: SignablePayload,
        options: &SubmitOptions,
    ) -> Result<SubmitResult>;

    /// SOL balance in whole SOL
    async fn get_balance(&self) -> Result<f64>;

    /// Token balance in whole units
    async fn get_asset_balance(&self, asset: &str) -> Result<f64>;

    async fn get_asset_decimals(&self, asset: &str) -> Result<u8>;
}

/// Irrecoverably destroys a held token balance
#[async_trait]
pub trait AssetBurner: Send + Sync {
    /// Returns the burn transaction reference
    async fn burn(&self, asset: &str, raw_amount: u64) -> Result<String>;
}

/// A confirmed swap
#[derive(Debug, Clone)]
pub struct Fill {
    pub quote: Quote,
    pub signature: String,
}

/// Quote, build and submit one swap. Unconfirmed submissions are errors.
pub async fn execute_swap(
    gateway: &dyn ExecutionGateway,
    sell_asset: &str,
    buy_asset: &str,
    amount: u64,
    slippage_bps: u32,
    options: &SubmitOptions,
) -> Result<Fill> {
    let quote = gateway
        .quote(sell_asset, buy_asset, amount, slippage_bps)
        .await?;
    execute_quoted(gateway, quote, options).await
}

/// Build and submit an already-priced swap
pub async fn execute_quoted(
    gateway: &dyn ExecutionGateway,
    quote: Quote,
    options: &SubmitOptions,
) -> Result<Fill> {
    debug!(
        in_amount = quote.in_amount,
        out_amount = quote.out_amount,
        impact = quote.price_impact_pct,
        "Executing swap"
    );

    let payload = gateway
        .build_transferable(&quote, gateway.wallet_address())
        .await?;
    let result = gateway.sign_and_submit(payload, options).await?;

    match (result.signature, result.confirmed) {
        (Some(signature), true) => Ok(Fill { quote, signature }),
        (Some(signature), false) => Err(Error::TransactionUnconfirmed(format!(
            "{}: {}",
            signature,
            result.error.unwrap_or_else(|| "not confirmed".to_string())
        ))),
        (None, _) => Err(Error::TransactionSend(
            result.error.unwrap_or_else(|| "no signature returned".to_string()),
        )),
    }
}

/// Constant-product estimate of a swap against the pool described by `metrics`.
///
/// Used by gateways that have no native quote endpoint.
pub fn estimate_quote(
    metrics: &TokenMetrics,
    sell_asset: &str,
    buy_asset: &str,
    amount: u64,
    token_decimals: u8,
    slippage_bps: u32,
) -> Result<Quote> {
    if metrics.price_sol <= 0.0 {
        return Err(Error::Quote("no price for asset".to_string()));
    }
    let reserve = pool_reserve_sol(metrics)
        .ok_or_else(|| Error::Quote("no liquidity for asset".to_string()))?;

    let (out_amount, impact) = if sell_asset == SOL_MINT {
        let sol_in = from_raw(amount, SOL_DECIMALS);
        let impact = estimate_impact_pct(sol_in, reserve);
        let tokens = sol_in / metrics.price_sol * (1.0 - impact / 100.0);
        (to_raw(tokens, token_decimals), impact)
    } else {
        let gross_sol = from_raw(amount, token_decimals) * metrics.price_sol;
        let impact = estimate_impact_pct(gross_sol, reserve);
        let sol_out = gross_sol * (1.0 - impact / 100.0);
        (to_raw(sol_out, SOL_DECIMALS), impact)
    };

    Ok(Quote {
        input_asset: sell_asset.to_string(),
        output_asset: buy_asset.to_string(),
        in_amount: amount,
        out_amount,
        price_impact_pct: impact,
        slippage_bps,
    })
}

/// SOL side of the pool: reported directly, or half the USD liquidity at the implied SOL price
pub fn pool_reserve_sol(metrics: &TokenMetrics) -> Option<f64> {
    if let Some(reserve) = metrics.liquidity_sol.filter(|r| *r > 0.0) {
        return Some(reserve);
    }
    if metrics.liquidity_usd > 0.0 && metrics.price_usd > 0.0 && metrics.price_sol > 0.0 {
        let sol_usd = metrics.price_usd / metrics.price_sol;
        return Some(metrics.liquidity_usd / 2.0 / sol_usd);
    }
    None
}
