//! Paper trading gateway
//!
//! Fills every swap at the constant-product estimate derived from live
//! market data and keeps balances in memory. No transaction leaves the process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use super::{
    estimate_quote, from_raw, AssetBurner, ExecutionGateway, Quote, SignablePayload,
    SubmitOptions, SubmitResult, SOL_DECIMALS, SOL_MINT,
};
use crate::error::{Error, Result};
use crate::market::MarketData;

/// pump.fun tokens are minted with 6 decimals
pub const PAPER_TOKEN_DECIMALS: u8 = 6;

const PAPER_WALLET: &str = "paper-wallet";

#[derive(Debug, Default)]
struct PaperState {
    sol_lamports: u64,
    tokens: HashMap<String, u64>,
    burned: HashMap<String, u64>,
    next_signature: u64,
}

impl PaperState {
    fn signature(&mut self, kind: &str) -> String {
        self.next_signature += 1;
        format!("paper-{}-{}", kind, self.next_signature)
    }
}

pub struct PaperGateway {
    market: Arc<dyn MarketData>,
    state: Mutex<PaperState>,
}

impl PaperGateway {
    pub fn new(market: Arc<dyn MarketData>, starting_sol: f64) -> Self {
        let state = PaperState {
            sol_lamports: super::to_raw(starting_sol, SOL_DECIMALS),
            ..Default::default()
        };
        Self {
            market,
            state: Mutex::new(state),
        }
    }

    /// Seed holdings, e.g. positions carried over from an earlier paper run
    pub async fn credit(&self, asset: &str, token_amount: f64) {
        let raw = super::to_raw(token_amount, PAPER_TOKEN_DECIMALS);
        *self.state.lock().await.tokens.entry(asset.to_string()).or_insert(0) += raw;
    }

    /// Raw amount of `asset` destroyed so far
    pub async fn burned(&self, asset: &str) -> u64 {
        self.state.lock().await.burned.get(asset).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ExecutionGateway for PaperGateway {
    fn wallet_address(&self) -> &str {
        PAPER_WALLET
    }

    async fn quote(
        &self,
        sell_asset: &str,
        buy_asset: &str,
        amount: u64,
        slippage_bps: u32,
    ) -> Result<Quote> {
        let token = if sell_asset == SOL_MINT { buy_asset } else { sell_asset };
        let metrics = self
            .market
            .metrics(token)
            .await?
            .ok_or_else(|| Error::Quote(format!("no market data for {}", token)))?;
        estimate_quote(
            &metrics,
            sell_asset,
            buy_asset,
            amount,
            PAPER_TOKEN_DECIMALS,
            slippage_bps,
        )
    }

    async fn build_transferable(&self, quote: &Quote, wallet: &str) -> Result<SignablePayload> {
        Ok(SignablePayload {
            quote: quote.clone(),
            wallet: wallet.to_string(),
            body: serde_json::to_value(quote)?,
        })
    }

    async fn sign_and_submit(
        &self,
        payload: SignablePayload,
        _options: &SubmitOptions,
    ) -> Result<SubmitResult> {
        let quote = payload.quote;
        let mut state = self.state.lock().await;

        if quote.is_buy() {
            if state.sol_lamports < quote.in_amount {
                return Err(Error::InsufficientBalance {
                    available: from_raw(state.sol_lamports, SOL_DECIMALS),
                    required: from_raw(quote.in_amount, SOL_DECIMALS),
                });
            }
            state.sol_lamports -= quote.in_amount;
            *state.tokens.entry(quote.output_asset.clone()).or_insert(0) += quote.out_amount;
        } else {
            let held = state.tokens.get(&quote.input_asset).copied().unwrap_or(0);
            if held < quote.in_amount {
                return Err(Error::TransactionSend(format!(
                    "paper wallet holds {} of {}, sell needs {}",
                    held, quote.input_asset, quote.in_amount
                )));
            }
            state.tokens.insert(quote.input_asset.clone(), held - quote.in_amount);
            state.sol_lamports += quote.out_amount;
        }

        let signature = state.signature(if quote.is_buy() { "buy" } else { "sell" });
        info!(
            signature = %signature,
            token = %quote.token(),
            in_amount = quote.in_amount,
            out_amount = quote.out_amount,
            "[PAPER] Swap filled"
        );

        Ok(SubmitResult {
            signature: Some(signature),
            confirmed: true,
            error: None,
        })
    }

    async fn get_balance(&self) -> Result<f64> {
        Ok(from_raw(self.state.lock().await.sol_lamports, SOL_DECIMALS))
    }

    async fn get_asset_balance(&self, asset: &str) -> Result<f64> {
        let raw = self.state.lock().await.tokens.get(asset).copied().unwrap_or(0);
        Ok(from_raw(raw, PAPER_TOKEN_DECIMALS))
    }

    async fn get_asset_decimals(&self, asset: &str) -> Result<u8> {
        Ok(if asset == SOL_MINT {
            SOL_DECIMALS
        } else {
            PAPER_TOKEN_DECIMALS
        })
    }
}

#[async_trait]
impl AssetBurner for PaperGateway {
    async fn burn(&self, asset: &str, raw_amount: u64) -> Result<String> {
        let mut state = self.state.lock().await;
        let held = state.tokens.get(asset).copied().unwrap_or(0);
        if held < raw_amount {
            return Err(Error::Burn(format!(
                "paper wallet holds {} of {}, burn needs {}",
                held, asset, raw_amount
            )));
        }
        state.tokens.insert(asset.to_string(), held - raw_amount);
        *state.burned.entry(asset.to_string()).or_insert(0) += raw_amount;
        Ok(state.signature("burn"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::TokenMetrics;
    use crate::testing::MockMarket;
    use crate::trading::{execute_swap, to_raw};

    fn gateway() -> PaperGateway {
        let market = MockMarket::new();
        market.set_metrics(
            "Mint",
            TokenMetrics {
                price_sol: 0.000_001,
                liquidity_sol: Some(99.0),
                ..Default::default()
            },
        );
        PaperGateway::new(Arc::new(market), 10.0)
    }

    fn opts() -> SubmitOptions {
        SubmitOptions {
            priority_fee_sol: 0.0,
        }
    }

    #[tokio::test]
    async fn test_paper_buy_then_sell() {
        let gw = gateway();
        let fill = execute_swap(&gw, SOL_MINT, "Mint", to_raw(1.0, 9), 300, &opts())
            .await
            .unwrap();
        assert!(fill.signature.starts_with("paper-buy-"));
        assert!((gw.get_balance().await.unwrap() - 9.0).abs() < 1e-9);
        let held = gw.get_asset_balance("Mint").await.unwrap();
        assert!((held - 990_000.0).abs() < 1.0);

        execute_swap(&gw, "Mint", SOL_MINT, to_raw(held, 6), 500, &opts())
            .await
            .unwrap();
        assert_eq!(gw.get_asset_balance("Mint").await.unwrap(), 0.0);
        assert!(gw.get_balance().await.unwrap() > 9.9);
    }

    #[tokio::test]
    async fn test_paper_buy_insufficient_balance() {
        let gw = gateway();
        let err = execute_swap(&gw, SOL_MINT, "Mint", to_raw(11.0, 9), 300, &opts())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { .. }));
    }

    #[tokio::test]
    async fn test_paper_quote_without_market_data() {
        let gw = gateway();
        let err = gw.quote(SOL_MINT, "Unknown", 1, 300).await.unwrap_err();
        assert!(matches!(err, Error::Quote(_)));
    }

    #[tokio::test]
    async fn test_paper_burn() {
        let gw = gateway();
        execute_swap(&gw, SOL_MINT, "Mint", to_raw(0.1, 9), 300, &opts())
            .await
            .unwrap();
        let raw = to_raw(gw.get_asset_balance("Mint").await.unwrap(), 6);
        let sig = gw.burn("Mint", raw).await.unwrap();
        assert!(sig.starts_with("paper-burn-"));
        assert_eq!(gw.burned("Mint").await, raw);
        assert!(gw.burn("Mint", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_credited_holdings_can_be_sold() {
        let gw = gateway();
        gw.credit("Mint", 5_000.0).await;
        assert_eq!(gw.get_asset_balance("Mint").await.unwrap(), 5_000.0);

        execute_swap(&gw, "Mint", SOL_MINT, to_raw(5_000.0, 6), 500, &opts())
            .await
            .unwrap();
        assert_eq!(gw.get_asset_balance("Mint").await.unwrap(), 0.0);
    }
}
