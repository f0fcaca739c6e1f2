//! Position sizing
//!
//! Size by conviction, then clip to exposure headroom and to the price
//! impact the pool can absorb.

use crate::config::TradingConfig;

/// Estimated impact ceiling for an entry, in percent
pub const MAX_ENTRY_IMPACT_PCT: f64 = 3.0;

/// Why a candidate could not be sized
#[derive(Debug, Clone, PartialEq)]
pub enum SizingBlock {
    /// Remaining exposure is smaller than the minimum position
    InsufficientHeadroom { headroom_sol: f64, min_sol: f64 },
    /// Even the minimum position would move the pool past the ceiling
    ImpactTooHigh { impact_pct: f64, min_sol: f64 },
}

impl SizingBlock {
    pub fn description(&self) -> String {
        match self {
            SizingBlock::InsufficientHeadroom { headroom_sol, min_sol } => format!(
                "Exposure headroom {:.3} SOL below minimum position {:.3} SOL",
                headroom_sol, min_sol
            ),
            SizingBlock::ImpactTooHigh { impact_pct, min_sol } => format!(
                "Minimum position {:.3} SOL would move price {:.2}% (cap {}%)",
                min_sol, impact_pct, MAX_ENTRY_IMPACT_PCT
            ),
        }
    }
}

/// Conviction band sizing between the configured bounds
pub fn base_size(score: f64, min_sol: f64, max_sol: f64) -> f64 {
    if score >= 90.0 {
        max_sol
    } else if score >= 75.0 {
        (max_sol * 0.75).max(min_sol)
    } else if score >= 65.0 {
        (min_sol + max_sol) / 2.0
    } else {
        min_sol
    }
}

/// Constant-product impact of spending `amount_sol` against a `reserve_sol` pool
pub fn estimate_impact_pct(amount_sol: f64, reserve_sol: f64) -> f64 {
    if amount_sol <= 0.0 {
        return 0.0;
    }
    if reserve_sol <= 0.0 {
        return 100.0;
    }
    amount_sol / (reserve_sol + amount_sol) * 100.0
}

/// Largest spend that stays at or under `cap_pct` impact
pub fn max_size_for_impact(reserve_sol: f64, cap_pct: f64) -> f64 {
    if reserve_sol <= 0.0 {
        return 0.0;
    }
    let p = cap_pct / 100.0;
    reserve_sol * p / (1.0 - p)
}

/// Final entry size for an accepted score.
///
/// `reserve_sol` is the SOL side of the pool; `None` leaves the impact cap off.
pub fn size_position(
    score: f64,
    trading: &TradingConfig,
    headroom_sol: f64,
    reserve_sol: Option<f64>,
) -> Result<f64, SizingBlock> {
    let min_sol = trading.min_position_sol;
    let mut size = base_size(score, min_sol, trading.max_position_sol).min(trading.max_position_sol);

    if headroom_sol < min_sol {
        return Err(SizingBlock::InsufficientHeadroom {
            headroom_sol,
            min_sol,
        });
    }
    size = size.min(headroom_sol);

    if let Some(reserve) = reserve_sol {
        let impact_cap = max_size_for_impact(reserve, MAX_ENTRY_IMPACT_PCT);
        if impact_cap < min_sol {
            return Err(SizingBlock::ImpactTooHigh {
                impact_pct: estimate_impact_pct(min_sol, reserve),
                min_sol,
            });
        }
        size = size.min(impact_cap);
    }

    Ok(size)
}
