//! Position model and its state transitions

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state. `Closed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Open,
    Closed,
    Failed,
}

/// Why a position left the open state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Price drop confirmed by seller dominance or a quiet market
    StopLoss,
    /// Unconditional stop at twice the stop distance
    HardStopLoss,
    /// Price unavailable for too many consecutive ticks
    NoPriceData,
    /// Never meaningfully above entry and drifting under it
    NearEntryTimeout,
    /// Drained liquidity, or stale/decaying with no volume
    DeadPosition,
    TrailingStop,
    /// Final exit after the take-profit ladder
    TakeProfit,
    Manual,
    /// Exit retries exhausted
    ExecutionFailed,
    /// Wallet no longer holds the asset
    BalanceMissing,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::HardStopLoss => "hard_stop_loss",
            ExitReason::NoPriceData => "no_price_data",
            ExitReason::NearEntryTimeout => "near_entry_timeout",
            ExitReason::DeadPosition => "dead_position",
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::Manual => "manual",
            ExitReason::ExecutionFailed => "execution_failed",
            ExitReason::BalanceMissing => "balance_missing",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single open or historical trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    /// Token mint address
    pub asset: String,
    pub symbol: String,
    /// SOL per whole token at entry
    pub entry_price: f64,
    /// Capital still committed; only partial closes reduce it
    pub amount_sol: f64,
    /// Whole tokens held
    pub token_amount: f64,
    pub entry_tx: String,
    pub exit_tx: Option<String>,
    pub status: PositionStatus,
    /// Entry reasons joined for display
    pub entry_reason: String,
    /// Normalized signal keys of the entry reasons
    pub entry_signals: Vec<String>,
    pub score: f64,
    pub exit_reason: Option<ExitReason>,
    #[serde(default)]
    pub exit_detail: Option<String>,
    /// Signed, accumulated across partial and final closes
    pub realized_pnl: f64,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub sell_attempts: u32,
    pub no_price_ticks: u32,
    pub peak_multiplier: f64,
    pub tiers_sold: usize,
    #[serde(default)]
    pub last_price: Option<f64>,
}

/// Parameters for a freshly filled entry
#[derive(Debug, Clone)]
pub struct NewPosition {
    pub asset: String,
    pub symbol: String,
    pub amount_sol: f64,
    pub token_amount: f64,
    pub entry_tx: String,
    pub reasons: Vec<String>,
    pub signals: Vec<String>,
    pub score: f64,
}

impl Position {
    pub fn open(new: NewPosition, now: DateTime<Utc>) -> Self {
        let entry_price = if new.token_amount > 0.0 {
            new.amount_sol / new.token_amount
        } else {
            0.0
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            asset: new.asset,
            symbol: new.symbol,
            entry_price,
            amount_sol: new.amount_sol,
            token_amount: new.token_amount,
            entry_tx: new.entry_tx,
            exit_tx: None,
            status: PositionStatus::Open,
            entry_reason: new.reasons.join(" | "),
            entry_signals: new.signals,
            score: new.score,
            exit_reason: None,
            exit_detail: None,
            realized_pnl: 0.0,
            created_at: now,
            closed_at: None,
            sell_attempts: 0,
            no_price_ticks: 0,
            peak_multiplier: 1.0,
            tiers_sold: 0,
            last_price: Some(entry_price),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    pub fn held(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    pub fn hold_minutes(&self, now: DateTime<Utc>) -> i64 {
        let end = self.closed_at.unwrap_or(now);
        (end - self.created_at).num_minutes()
    }

    /// Current price over entry price
    pub fn multiplier(&self, price: f64) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        price / self.entry_price
    }

    /// Feed this tick's price (or its absence).
    ///
    /// Peak tracking only starts once the settle window has passed.
    pub fn observe_price(&mut self, price: Option<f64>, now: DateTime<Utc>, settle_window: Duration) {
        match price.filter(|p| *p > 0.0) {
            Some(price) => {
                self.no_price_ticks = 0;
                self.last_price = Some(price);
                if self.held(now) >= settle_window {
                    self.peak_multiplier = self.peak_multiplier.max(self.multiplier(price));
                }
            }
            None => self.no_price_ticks += 1,
        }
    }

    /// Trust the wallet over the book
    pub fn reconcile_quantity(&mut self, observed: f64) {
        self.token_amount = observed;
    }

    /// Sold part of the holding. Returns the PnL realized by this leg.
    pub fn apply_partial_close(
        &mut self,
        tokens_sold: f64,
        sol_received: f64,
        max_tiers: usize,
    ) -> f64 {
        let fraction = if self.token_amount > 0.0 {
            (tokens_sold / self.token_amount).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let cost = self.amount_sol * fraction;
        let pnl = sol_received - cost;

        self.amount_sol -= cost;
        self.token_amount = (self.token_amount - tokens_sold).max(0.0);
        self.realized_pnl += pnl;
        self.tiers_sold = (self.tiers_sold + 1).min(max_tiers);
        self.sell_attempts = 0;
        pnl
    }

    /// Sold everything that was left. Returns the position's total PnL.
    pub fn apply_full_close(
        &mut self,
        sol_received: f64,
        signature: String,
        reason: ExitReason,
        detail: String,
        now: DateTime<Utc>,
    ) -> f64 {
        self.realized_pnl += sol_received - self.amount_sol;
        self.exit_tx = Some(signature);
        self.sell_attempts = 0;
        self.finish(PositionStatus::Closed, reason, detail, now);
        self.realized_pnl
    }

    /// Count a failed exit attempt; returns the new attempt count
    pub fn record_failed_sell(&mut self) -> u32 {
        self.sell_attempts += 1;
        self.sell_attempts
    }

    /// Give up on the remaining holding, booking `remaining_value_sol` as
    /// what it was worth. Returns the position's total PnL.
    pub fn mark_failed(
        &mut self,
        reason: ExitReason,
        detail: String,
        remaining_value_sol: f64,
        now: DateTime<Utc>,
    ) -> f64 {
        self.realized_pnl += remaining_value_sol - self.amount_sol;
        self.finish(PositionStatus::Failed, reason, detail, now);
        self.realized_pnl
    }

    /// Best estimate of the remaining holding's worth from the last seen price
    pub fn estimated_value(&self) -> f64 {
        self.last_price.unwrap_or(0.0) * self.token_amount
    }

    fn finish(&mut self, status: PositionStatus, reason: ExitReason, detail: String, now: DateTime<Utc>) {
        self.status = status;
        self.exit_reason = Some(reason);
        self.exit_detail = Some(detail);
        self.closed_at = Some(now);
    }
}

/// Outcome statistics over terminal positions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TradeStats {
    pub total: u32,
    pub wins: u32,
    pub losses: u32,
    pub failed: u32,
    pub net_pnl_sol: f64,
    pub best_pnl_sol: f64,
    pub worst_pnl_sol: f64,
}

impl TradeStats {
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Self {
        let mut stats = Self::default();
        for p in positions.into_iter().filter(|p| !p.is_open()) {
            stats.total += 1;
            if p.realized_pnl > 0.0 {
                stats.wins += 1;
            } else {
                stats.losses += 1;
            }
            if p.status == PositionStatus::Failed {
                stats.failed += 1;
            }
            stats.net_pnl_sol += p.realized_pnl;
            stats.best_pnl_sol = stats.best_pnl_sol.max(p.realized_pnl);
            stats.worst_pnl_sol = stats.worst_pnl_sol.min(p.realized_pnl);
        }
        stats
    }

    /// Calculate win rate
    pub fn win_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.wins as f64 / self.total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_position(now: DateTime<Utc>) -> Position {
        Position::open(
            NewPosition {
                asset: "Mint111".to_string(),
                symbol: "TEST".to_string(),
                amount_sol: 0.2,
                token_amount: 200_000.0,
                entry_tx: "sig-entry".to_string(),
                reasons: vec!["Buy pressure 3.1x".to_string(), "Deep liquidity $120.0K".to_string()],
                signals: vec!["buy pressure".to_string(), "deep liquidity".to_string()],
                score: 80.0,
            },
            now,
        )
    }

    #[test]
    fn test_open_sets_entry_price() {
        let p = open_position(Utc::now());
        assert!((p.entry_price - 0.000_001).abs() < 1e-15);
        assert!(p.is_open());
        assert_eq!(p.entry_reason, "Buy pressure 3.1x | Deep liquidity $120.0K");
    }

    #[test]
    fn test_peak_ignored_inside_settle_window() {
        let now = Utc::now();
        let mut p = open_position(now);
        let settle = Duration::seconds(180);

        p.observe_price(Some(0.000_003), now + Duration::seconds(30), settle);
        assert_eq!(p.peak_multiplier, 1.0);

        p.observe_price(Some(0.000_002), now + Duration::seconds(200), settle);
        assert!((p.peak_multiplier - 2.0).abs() < 1e-9);

        // Non-decreasing afterwards
        p.observe_price(Some(0.000_001), now + Duration::seconds(260), settle);
        assert!((p.peak_multiplier - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_price_counts_ticks() {
        let now = Utc::now();
        let mut p = open_position(now);
        p.observe_price(None, now, Duration::zero());
        p.observe_price(Some(0.0), now, Duration::zero());
        assert_eq!(p.no_price_ticks, 2);
        p.observe_price(Some(0.000_001), now, Duration::zero());
        assert_eq!(p.no_price_ticks, 0);
    }

    #[test]
    fn test_partial_then_full_close_pnl() {
        let now = Utc::now();
        let mut p = open_position(now);
        p.sell_attempts = 2;

        // Sell a third at 1.5x
        let leg = p.apply_partial_close(66_000.0, 0.099, 3);
        assert!((leg - (0.099 - 0.066)).abs() < 1e-9);
        assert!((p.amount_sol - 0.134).abs() < 1e-9);
        assert!((p.token_amount - 134_000.0).abs() < 1e-6);
        assert_eq!(p.tiers_sold, 1);
        assert_eq!(p.sell_attempts, 0);
        assert!(p.is_open());

        let total = p.apply_full_close(0.2, "sig-exit".into(), ExitReason::TrailingStop, String::new(), now);
        assert!((total - (0.033 + 0.066)).abs() < 1e-9);
        assert_eq!(p.status, PositionStatus::Closed);
        assert_eq!(p.exit_reason, Some(ExitReason::TrailingStop));
    }

    #[test]
    fn test_tiers_sold_bounded() {
        let mut p = open_position(Utc::now());
        for _ in 0..5 {
            p.apply_partial_close(1_000.0, 0.001, 3);
        }
        assert_eq!(p.tiers_sold, 3);
    }

    #[test]
    fn test_mark_failed_total_loss() {
        let now = Utc::now();
        let mut p = open_position(now);
        let pnl = p.mark_failed(ExitReason::NoPriceData, "stale".into(), 0.0, now);
        assert_eq!(pnl, -0.2);
        assert_eq!(p.status, PositionStatus::Failed);
    }

    #[test]
    fn test_exit_reason_serializes_snake_case() {
        let json = serde_json::to_string(&ExitReason::NoPriceData).unwrap();
        assert_eq!(json, "\"no_price_data\"");
        assert_eq!(ExitReason::StopLoss.to_string(), "stop_loss");
    }

    #[test]
    fn test_trade_stats() {
        let now = Utc::now();
        let mut win = open_position(now);
        win.apply_full_close(0.3, "a".into(), ExitReason::TrailingStop, String::new(), now);
        let mut loss = open_position(now);
        loss.mark_failed(ExitReason::ExecutionFailed, String::new(), 0.05, now);
        let open = open_position(now);

        let stats = TradeStats::from_positions([&win, &loss, &open]);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.failed, 1);
        assert!((stats.net_pnl_sol - (0.1 - 0.15)).abs() < 1e-9);
        assert_eq!(stats.win_rate(), 50.0);
    }
}
