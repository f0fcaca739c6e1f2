// DexScreener API client for candidate discovery and pair metrics
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::MarketData;
use crate::error::{Error, Result};
use crate::filter::{Candidate, TokenMetrics};
use crate::trading::SOL_MINT;

const DEXSCREENER_BASE: &str = "https://api.dexscreener.com";

/// Max token addresses per batch pair lookup
const BATCH_LIMIT: usize = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenProfile {
    pub url: Option<String>,
    #[serde(rename = "chainId")]
    pub chain_id: String,
    #[serde(rename = "tokenAddress")]
    pub token_address: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceChange {
    pub m5: Option<f64>,
    pub h1: Option<f64>,
    pub h6: Option<f64>,
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Txns {
    pub m5: Option<TxnCount>,
    pub h1: Option<TxnCount>,
    pub h6: Option<TxnCount>,
    pub h24: Option<TxnCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxnCount {
    pub buys: u64,
    pub sells: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Liquidity {
    pub usd: Option<f64>,
    pub base: Option<f64>,
    pub quote: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub m5: Option<f64>,
    pub h1: Option<f64>,
    pub h6: Option<f64>,
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairToken {
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexPair {
    #[serde(rename = "chainId")]
    pub chain_id: String,
    #[serde(rename = "dexId")]
    pub dex_id: String,
    #[serde(rename = "pairAddress")]
    pub pair_address: String,
    #[serde(rename = "baseToken")]
    pub base_token: PairToken,
    #[serde(rename = "quoteToken")]
    pub quote_token: Option<PairToken>,
    #[serde(rename = "priceNative")]
    pub price_native: Option<String>,
    #[serde(rename = "priceUsd")]
    pub price_usd: Option<String>,
    #[serde(rename = "priceChange")]
    pub price_change: Option<PriceChange>,
    pub txns: Option<Txns>,
    pub volume: Option<Volume>,
    pub liquidity: Option<Liquidity>,
    #[serde(rename = "marketCap")]
    pub market_cap: Option<f64>,
    #[serde(rename = "fdv")]
    pub fdv: Option<f64>,
    /// Milliseconds since epoch
    #[serde(rename = "pairCreatedAt")]
    pub pair_created_at: Option<i64>,
}

impl DexPair {
    fn quoted_in_sol(&self) -> bool {
        self.quote_token
            .as_ref()
            .map(|q| q.address == SOL_MINT)
            .unwrap_or(false)
    }

    fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.pair_created_at
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    fn to_metrics(&self) -> TokenMetrics {
        let txns = self.txns.as_ref();
        let (buys_24h, sells_24h) = counts(txns.and_then(|t| t.h24.as_ref()));
        let (buys_5m, sells_5m) = counts(txns.and_then(|t| t.m5.as_ref()));

        TokenMetrics {
            price_sol: parse_price(&self.price_native),
            price_usd: parse_price(&self.price_usd),
            market_cap_usd: self.market_cap.or(self.fdv).unwrap_or(0.0),
            volume_24h_usd: self.volume.as_ref().and_then(|v| v.h24).unwrap_or(0.0),
            volume_1h_usd: self.volume.as_ref().and_then(|v| v.h1).unwrap_or(0.0),
            liquidity_usd: self.liquidity_usd(),
            liquidity_sol: self.liquidity.as_ref().and_then(|l| l.quote),
            holders: None,
            buys_24h,
            sells_24h,
            buys_5m,
            sells_5m,
            price_change_24h_pct: self
                .price_change
                .as_ref()
                .and_then(|pc| pc.h24)
                .unwrap_or(0.0),
            pair_created_at: self.created_at(),
        }
    }
}

fn counts(window: Option<&TxnCount>) -> (u64, u64) {
    window.map(|t| (t.buys, t.sells)).unwrap_or((0, 0))
}

fn parse_price(raw: &Option<String>) -> f64 {
    raw.as_ref()
        .and_then(|p| p.parse::<f64>().ok())
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPairsResponse {
    pub pairs: Option<Vec<DexPair>>,
}

/// SOL-quoted pair with the deepest liquidity
fn best_pair(pairs: Vec<DexPair>, mint: &str) -> Option<DexPair> {
    pairs
        .into_iter()
        .filter(|p| p.base_token.address == mint && p.quoted_in_sol())
        .max_by(|a, b| {
            a.liquidity_usd()
                .partial_cmp(&b.liquidity_usd())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

pub struct DexScreenerClient {
    client: reqwest::Client,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new() -> Self {
        Self::with_base_url(DEXSCREENER_BASE)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::MarketData(format!("DexScreener request failed: {}", e)))?;
        if !resp.status().is_success() {
            return Err(Error::MarketData(format!(
                "DexScreener returned {} for {}",
                resp.status(),
                url
            )));
        }
        resp.json()
            .await
            .map_err(|e| Error::Deserialization(format!("DexScreener response: {}", e)))
    }

    /// Fetch latest token profiles
    pub async fn get_latest_profiles(&self) -> Result<Vec<TokenProfile>> {
        let url = format!("{}/token-profiles/latest/v1", self.base_url);
        self.get_json(&url).await
    }

    /// Fetch all pairs for a token
    pub async fn get_token_pairs(&self, mint: &str) -> Result<Vec<DexPair>> {
        let url = format!("{}/latest/dex/tokens/{}", self.base_url, mint);
        let data: TokenPairsResponse = self.get_json(&url).await?;
        Ok(data.pairs.unwrap_or_default())
    }

    /// Fetch pairs for up to 30 tokens in one call
    pub async fn get_pairs_batch(&self, mints: &[String]) -> Result<Vec<DexPair>> {
        if mints.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/tokens/v1/solana/{}", self.base_url, mints.join(","));
        self.get_json(&url).await
    }
}

impl Default for DexScreenerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketData for DexScreenerClient {
    async fn discover(&self, limit: usize) -> Result<Vec<Candidate>> {
        let mints: Vec<String> = self
            .get_latest_profiles()
            .await?
            .into_iter()
            // pump.fun mints carry the "pump" suffix
            .filter(|p| p.chain_id == "solana" && p.token_address.ends_with("pump"))
            .map(|p| p.token_address)
            .take(limit.min(BATCH_LIMIT))
            .collect();

        debug!("Checking {} Solana profiles from DexScreener", mints.len());

        let pairs = match self.get_pairs_batch(&mints).await {
            Ok(pairs) => pairs,
            Err(e) => {
                warn!("Batch pair lookup failed, discovering without symbols: {}", e);
                Vec::new()
            }
        };

        Ok(mints
            .into_iter()
            .map(|mint| {
                let pair = pairs.iter().find(|p| p.base_token.address == mint);
                Candidate {
                    symbol: pair
                        .and_then(|p| p.base_token.symbol.clone())
                        .unwrap_or_else(|| mint.chars().take(6).collect()),
                    name: pair
                        .and_then(|p| p.base_token.name.clone())
                        .unwrap_or_default(),
                    created_at: pair.and_then(|p| p.created_at()),
                    asset: mint,
                }
            })
            .collect())
    }

    async fn metrics(&self, asset: &str) -> Result<Option<TokenMetrics>> {
        let pairs = self.get_token_pairs(asset).await?;
        Ok(best_pair(pairs, asset).map(|pair| pair.to_metrics()))
    }
}
