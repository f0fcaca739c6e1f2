//! Exit rules
//!
//! Checked in a fixed priority order once per tick; the first match wins.

use chrono::{DateTime, Duration, Utc};

use super::types::{ExitReason, Position};
use crate::config::ExitConfig;
use crate::filter::TokenMetrics;

/// Consecutive ticks without a price before the position is abandoned
pub const NO_PRICE_TICK_LIMIT: u32 = 10;

/// Peak multiplier at which the trailing stop arms
pub const TRAILING_ACTIVATION_MULTIPLIER: f64 = 2.0;

/// Peak at or below this never counted as a real move off entry
const NEAR_ENTRY_PEAK_CEILING: f64 = 1.05;
/// Close a near-entry position once it sits at or below this multiplier
const NEAR_ENTRY_FLOOR: f64 = 0.97;

/// What the market looked like for a position this tick
#[derive(Debug, Clone, Default)]
pub struct Observation {
    pub price: Option<f64>,
    pub metrics: Option<TokenMetrics>,
}

/// Action chosen for a position this tick
#[derive(Debug, Clone, PartialEq)]
pub enum ExitDecision {
    /// Mark failed without attempting a sale
    Abandon { reason: ExitReason, detail: String },
    /// Sell everything
    Full { reason: ExitReason, detail: String },
    /// Sell `fraction` of the remaining quantity at ladder step `tier`
    Partial { tier: usize, fraction: f64, detail: String },
}

/// Evaluate exit conditions for an open position.
///
/// Expects `position` to have already seen this tick's price via
/// `Position::observe_price`.
pub fn check_exit(
    position: &Position,
    observation: &Observation,
    config: &ExitConfig,
    now: DateTime<Utc>,
) -> Option<ExitDecision> {
    // 1. No-price fallback
    let Some(price) = observation.price.filter(|p| *p > 0.0) else {
        if position.no_price_ticks >= NO_PRICE_TICK_LIMIT {
            return Some(ExitDecision::Abandon {
                reason: ExitReason::NoPriceData,
                detail: format!("No price for {} ticks", position.no_price_ticks),
            });
        }
        return None;
    };

    let multiplier = position.multiplier(price);
    let drop_pct = (1.0 - multiplier) * 100.0;
    let held = position.held(now);
    let settled = held >= Duration::seconds(config.settle_window_secs as i64);
    let metrics = observation.metrics.as_ref();

    // 2. Compound stop-loss
    if drop_pct >= config.stop_loss_pct {
        let sellers_dominant = metrics.map(|m| m.sell_pressure_dominant()).unwrap_or(false);
        let quiet = metrics.map(|m| m.is_quiet()).unwrap_or(false) && settled;
        if sellers_dominant || quiet {
            return Some(ExitDecision::Full {
                reason: ExitReason::StopLoss,
                detail: format!(
                    "Down {:.1}% with {}",
                    drop_pct,
                    if sellers_dominant { "sellers dominant" } else { "no trading activity" }
                ),
            });
        }
    }

    // 3. Hard stop-loss
    if drop_pct >= config.hard_stop_pct() {
        return Some(ExitDecision::Full {
            reason: ExitReason::HardStopLoss,
            detail: format!("Down {:.1}% (hard stop {:.0}%)", drop_pct, config.hard_stop_pct()),
        });
    }

    // 4. Near-entry timeout
    if position.peak_multiplier <= NEAR_ENTRY_PEAK_CEILING
        && held >= Duration::minutes(config.near_entry_timeout_minutes as i64)
        && multiplier <= NEAR_ENTRY_FLOOR
    {
        return Some(ExitDecision::Full {
            reason: ExitReason::NearEntryTimeout,
            detail: format!(
                "Never above {:.2}x after {}m, now {:.2}x",
                NEAR_ENTRY_PEAK_CEILING,
                held.num_minutes(),
                multiplier
            ),
        });
    }

    // 5. Dead position
    if let Some(m) = metrics {
        if m.liquidity_usd < config.dead_liquidity_usd {
            return Some(ExitDecision::Full {
                reason: ExitReason::DeadPosition,
                detail: format!("Liquidity drained to ${:.0}", m.liquidity_usd),
            });
        }

        if multiplier <= 1.0 {
            let low_volume = m.volume_1h_usd < config.min_holding_volume_usd;
            let stale = held >= Duration::minutes(config.max_hold_minutes as i64);
            let decaying = drop_pct >= config.dead_decay_pct && drop_pct < config.hard_stop_pct();
            if low_volume && (stale || decaying) {
                return Some(ExitDecision::Full {
                    reason: ExitReason::DeadPosition,
                    detail: format!(
                        "{} at {:.2}x with ${:.0} 1h volume",
                        if stale { "Stale" } else { "Decaying" },
                        multiplier,
                        m.volume_1h_usd
                    ),
                });
            }
        }
    }

    // 6. Trailing stop
    if position.peak_multiplier >= TRAILING_ACTIVATION_MULTIPLIER {
        let floor = position.peak_multiplier * (1.0 - config.trailing_stop_pct / 100.0);
        if multiplier < floor {
            return Some(ExitDecision::Full {
                reason: ExitReason::TrailingStop,
                detail: format!(
                    "{:.2}x below trailing floor {:.2}x (peak {:.2}x)",
                    multiplier, floor, position.peak_multiplier
                ),
            });
        }
    }

    // 7. Take-profit ladder
    if let Some(&target) = config.take_profit_tiers.get(position.tiers_sold) {
        if multiplier >= target {
            return Some(ExitDecision::Partial {
                tier: position.tiers_sold,
                fraction: config.partial_sell_pct / 100.0,
                detail: format!("Tier {} hit at {:.2}x (target {:.2}x)", position.tiers_sold + 1, multiplier, target),
            });
        }
    }

    None
}
