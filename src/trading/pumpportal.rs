//! PumpPortal Lightning gateway
//!
//! PumpPortal signs and lands the transaction server-side for the wallet tied
//! to the API key. Quotes are estimated from market data (the Lightning API
//! has no quote endpoint); balances and confirmations come from Solana RPC.
//!
//! API Documentation: https://pumpportal.fun/trading-api/

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::rpc::SolanaRpc;
use super::{
    estimate_quote, from_raw, ExecutionGateway, Quote, SignablePayload, SubmitOptions,
    SubmitResult, SOL_DECIMALS, SOL_MINT,
};
use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::market::MarketData;

/// PumpPortal Lightning API endpoint
pub const PUMPPORTAL_API_URL: &str = "https://pumpportal.fun/api/trade";

const CONFIRM_POLL_INTERVAL: Duration = Duration::from_secs(2);
const CONFIRM_POLL_ATTEMPTS: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

/// Trade request for Lightning API
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    pub action: TradeAction,
    pub mint: String,
    /// SOL for buys, whole tokens for sells
    pub amount: String,
    pub denominated_in_sol: String,
    /// Slippage in whole percent
    pub slippage: u32,
    pub priority_fee: f64,
    pub pool: String,
}

impl TradeRequest {
    pub fn from_quote(quote: &Quote, token_decimals: u8, priority_fee: f64) -> Self {
        let (action, amount, in_sol) = if quote.is_buy() {
            (
                TradeAction::Buy,
                from_raw(quote.in_amount, SOL_DECIMALS),
                "true",
            )
        } else {
            (
                TradeAction::Sell,
                from_raw(quote.in_amount, token_decimals),
                "false",
            )
        };

        Self {
            action,
            mint: quote.token().to_string(),
            amount: amount.to_string(),
            denominated_in_sol: in_sol.to_string(),
            slippage: (quote.slippage_bps / 100).max(1),
            priority_fee,
            pool: "auto".to_string(),
        }
    }
}

/// Trade response from Lightning API
#[derive(Debug, Clone, Deserialize)]
pub struct TradeResponse {
    pub signature: Option<String>,
    pub error: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl TradeResponse {
    fn error_message(&self) -> Option<String> {
        if let Some(error) = &self.error {
            return Some(error.clone());
        }
        self.errors
            .as_ref()
            .filter(|errors| !errors.is_empty())
            .map(|errors| errors.join(", "))
    }
}

pub struct PumpPortalGateway {
    client: Client,
    api_key: String,
    wallet: String,
    rpc: SolanaRpc,
    market: Arc<dyn MarketData>,
}

impl PumpPortalGateway {
    pub fn new(config: &GatewayConfig, market: Arc<dyn MarketData>) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::MissingEnvVar("TRADER__GATEWAY__API_KEY".to_string()));
        }
        if config.wallet_address.is_empty() {
            return Err(Error::MissingEnvVar(
                "TRADER__GATEWAY__WALLET_ADDRESS".to_string(),
            ));
        }

        Ok(Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            wallet: config.wallet_address.clone(),
            rpc: SolanaRpc::new(config.rpc_endpoint.clone()),
            market,
        })
    }

    async fn wait_for_confirmation(&self, signature: &str) -> SubmitResult {
        for attempt in 1..=CONFIRM_POLL_ATTEMPTS {
            tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
            match self.rpc.get_signature_status(signature).await {
                Ok(Some(status)) if status.err.is_some() => {
                    return SubmitResult {
                        signature: Some(signature.to_string()),
                        confirmed: false,
                        error: status.err.map(|e| e.to_string()),
                    };
                }
                Ok(Some(status)) if status.is_confirmed() => {
                    debug!(signature, attempt, "Transaction confirmed");
                    return SubmitResult {
                        signature: Some(signature.to_string()),
                        confirmed: true,
                        error: None,
                    };
                }
                Ok(_) => {}
                Err(e) => warn!(signature, error = %e, "Signature status lookup failed"),
            }
        }

        SubmitResult {
            signature: Some(signature.to_string()),
            confirmed: false,
            error: Some("confirmation timed out".to_string()),
        }
    }
}

#[async_trait]
impl ExecutionGateway for PumpPortalGateway {
    fn wallet_address(&self) -> &str {
        &self.wallet
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
        let decimals = self.get_asset_decimals(token).await?;
        estimate_quote(&metrics, sell_asset, buy_asset, amount, decimals, slippage_bps)
    }

    async fn build_transferable(&self, quote: &Quote, wallet: &str) -> Result<SignablePayload> {
        let decimals = self.get_asset_decimals(quote.token()).await?;
        let request = TradeRequest::from_quote(quote, decimals, 0.0);
        Ok(SignablePayload {
            quote: quote.clone(),
            wallet: wallet.to_string(),
            body: serde_json::to_value(&request)?,
        })
    }

    async fn sign_and_submit(
        &self,
        payload: SignablePayload,
        options: &SubmitOptions,
    ) -> Result<SubmitResult> {
        let mut body = payload.body;
        body["priorityFee"] = serde_json::json!(options.priority_fee_sol);

        info!(
            token = %payload.quote.token(),
            buy = payload.quote.is_buy(),
            "Submitting trade via PumpPortal"
        );

        let response = self
            .client
            .post(format!("{}?api-key={}", PUMPPORTAL_API_URL, self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::TransactionSend(format!("HTTP request failed: {}", e)))?;

        let trade_response: TradeResponse = response
            .json()
            .await
            .map_err(|e| Error::Deserialization(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = trade_response.error_message() {
            return Ok(SubmitResult {
                signature: trade_response.signature,
                confirmed: false,
                error: Some(error),
            });
        }

        match trade_response.signature {
            Some(signature) => Ok(self.wait_for_confirmation(&signature).await),
            None => Err(Error::TransactionSend("No signature in response".to_string())),
        }
    }

    async fn get_balance(&self) -> Result<f64> {
        let lamports = self.rpc.get_balance(&self.wallet).await?;
        Ok(from_raw(lamports, SOL_DECIMALS))
    }

    async fn get_asset_balance(&self, asset: &str) -> Result<f64> {
        Ok(self
            .rpc
            .get_token_balance(&self.wallet, asset)
            .await?
            .map(|amount| from_raw(amount.raw(), amount.decimals))
            .unwrap_or(0.0))
    }

    async fn get_asset_decimals(&self, asset: &str) -> Result<u8> {
        if asset == SOL_MINT {
            return Ok(SOL_DECIMALS);
        }
        self.rpc.get_token_decimals(asset).await
    }
}
