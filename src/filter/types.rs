//! Candidate and market-metric types shared by discovery, scoring and exits

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A newly observed tradable asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Token mint address
    pub asset: String,
    pub symbol: String,
    pub name: String,
    /// Launch time, when the discovery feed knows it
    pub created_at: Option<DateTime<Utc>>,
}

impl Candidate {
    pub fn new(asset: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            symbol: symbol.into(),
            name: String::new(),
            created_at: None,
        }
    }
}

/// Point-in-time market snapshot for one asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenMetrics {
    /// Price in SOL per whole token
    pub price_sol: f64,
    pub price_usd: f64,
    pub market_cap_usd: f64,
    pub volume_24h_usd: f64,
    pub volume_1h_usd: f64,
    pub liquidity_usd: f64,
    /// SOL-side pool reserve, when the venue reports it
    pub liquidity_sol: Option<f64>,
    /// Holder count, when known
    pub holders: Option<u64>,
    pub buys_24h: u64,
    pub sells_24h: u64,
    pub buys_5m: u64,
    pub sells_5m: u64,
    pub price_change_24h_pct: f64,
    pub pair_created_at: Option<DateTime<Utc>>,
}

impl TokenMetrics {
    /// 24h buy count over sell count (sells floored at 1)
    pub fn buy_sell_ratio(&self) -> f64 {
        self.buys_24h as f64 / self.sells_24h.max(1) as f64
    }

    pub fn txns_24h(&self) -> u64 {
        self.buys_24h + self.sells_24h
    }

    /// Sellers outnumber buyers over the short window
    pub fn sell_pressure_dominant(&self) -> bool {
        self.sells_5m > self.buys_5m
    }

    /// No trades at all over the short window
    pub fn is_quiet(&self) -> bool {
        self.buys_5m + self.sells_5m == 0
    }
}

/// Top-holder concentration as percentages of supply
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Concentration {
    pub top_holder_pct: f64,
    pub top5_pct: f64,
}

/// Known high-performing wallets seen holding or buying the asset
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SmartMoney {
    pub wallet_count: u32,
    pub benchmark_participated: bool,
}

/// Creator fee-claim history
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeActivity {
    pub claim_count: u32,
    pub total_claimed_sol: f64,
}

/// Launch age of a candidate: pair creation wins over the feed's timestamp
pub fn asset_age(
    candidate: &Candidate,
    metrics: &TokenMetrics,
    now: DateTime<Utc>,
) -> Option<Duration> {
    metrics
        .pair_created_at
        .or(candidate.created_at)
        .map(|created| now - created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buy_sell_ratio_floors_sells() {
        let metrics = TokenMetrics {
            buys_24h: 30,
            sells_24h: 0,
            ..Default::default()
        };
        assert_eq!(metrics.buy_sell_ratio(), 30.0);
    }

    #[test]
    fn test_age_prefers_pair_creation() {
        let now = Utc::now();
        let mut candidate = Candidate::new("Mint111", "TEST");
        candidate.created_at = Some(now - Duration::hours(5));
        let metrics = TokenMetrics {
            pair_created_at: Some(now - Duration::hours(2)),
            ..Default::default()
        };
        assert_eq!(asset_age(&candidate, &metrics, now), Some(Duration::hours(2)));
        assert_eq!(
            asset_age(&candidate, &TokenMetrics::default(), now),
            Some(Duration::hours(5))
        );
    }
}
