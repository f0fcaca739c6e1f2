//! Market data
//!
//! Discovery of new candidates and per-asset metrics. Auxiliary lookups
//! (concentration, fee activity, smart money) default to "unknown".

pub mod dexscreener;

pub use dexscreener::DexScreenerClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::{Candidate, Concentration, FeeActivity, SmartMoney, TokenMetrics};

#[async_trait]
pub trait MarketData: Send + Sync {
    /// Newly observed assets, newest first
    async fn discover(&self, limit: usize) -> Result<Vec<Candidate>>;

    /// Current metrics; `None` when the venue has no data for the asset yet
    async fn metrics(&self, asset: &str) -> Result<Option<TokenMetrics>>;

    /// Authoritative SOL proceeds for selling `token_amount` whole tokens
    async fn sell_quote(&self, _asset: &str, _token_amount: f64) -> Result<Option<f64>> {
        Ok(None)
    }

    async fn concentration(&self, _asset: &str) -> Result<Option<Concentration>> {
        Ok(None)
    }

    async fn fee_activity(&self, _asset: &str) -> Result<Option<FeeActivity>> {
        Ok(None)
    }

    async fn smart_money(&self, _asset: &str) -> Result<Option<SmartMoney>> {
        Ok(None)
    }
}
