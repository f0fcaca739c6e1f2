//! Candidate evaluator
//!
//! Hard filters first (any failure is a zero-score reject), then additive
//! weighted scoring, learned and memory adjustments, the accept decision
//! and finally sizing.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::sizing::{size_position, SizingBlock};
use super::types::{asset_age, Candidate, Concentration, FeeActivity, SmartMoney, TokenMetrics};
use crate::config::Config;
use crate::journal::MemoryVerdict;
use crate::learning::{normalize_all, SignalTracker};

/// Minimum score for an entry
pub const ACCEPT_THRESHOLD: f64 = 55.0;

/// Candidates younger than this get a fast retry instead of a permanent reject
/// when their market data is still empty
const YOUNG_CANDIDATE_MINUTES: i64 = 15;

/// Wash-trading detection needs a meaningful sample
const WASH_MIN_TXNS: u64 = 100;

/// Result of evaluating one candidate. Lives for a single evaluation pass.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub asset: String,
    pub symbol: String,
    pub score: f64,
    /// Ordered, human-readable reasons (also the source of learning signals)
    pub reasons: Vec<String>,
    pub red_flags: Vec<String>,
    pub should_buy: bool,
    pub suggested_sol: f64,
    /// Data not populated yet; try again after a short cooldown
    pub retry_soon: bool,
    /// Learned adjustment that was applied (after the floor)
    pub learning_adjustment: f64,
    pub metrics: TokenMetrics,
}

impl Evaluation {
    fn rejected(candidate: &Candidate, metrics: &TokenMetrics, flag: String, retry_soon: bool) -> Self {
        Self {
            asset: candidate.asset.clone(),
            symbol: candidate.symbol.clone(),
            score: 0.0,
            reasons: Vec::new(),
            red_flags: vec![flag],
            should_buy: false,
            suggested_sol: 0.0,
            retry_soon,
            learning_adjustment: 0.0,
            metrics: metrics.clone(),
        }
    }

    /// Normalized signal keys for the learning loop
    pub fn signals(&self) -> Vec<String> {
        normalize_all(&self.reasons)
    }

    /// Human-readable summary
    pub fn summary(&self) -> String {
        if self.should_buy {
            format!(
                "BUY {} score {:.0} size {:.3} SOL: {}",
                self.symbol,
                self.score,
                self.suggested_sol,
                self.reasons.join(", ")
            )
        } else if self.red_flags.is_empty() {
            format!("SKIP {} score {:.0} below {}", self.symbol, self.score, ACCEPT_THRESHOLD)
        } else {
            format!("SKIP {} score {:.0}: {}", self.symbol, self.score, self.red_flags.join(", "))
        }
    }
}

/// Auxiliary lookups gathered before scoring. Every field is optional:
/// failed lookups are neutral.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub now: DateTime<Utc>,
    /// Remaining exposure capacity
    pub headroom_sol: f64,
    pub concentration: Option<Concentration>,
    pub smart_money: Option<SmartMoney>,
    pub fee_activity: Option<FeeActivity>,
    pub memory: MemoryVerdict,
}

impl EvaluationContext {
    pub fn new(now: DateTime<Utc>, headroom_sol: f64) -> Self {
        Self {
            now,
            headroom_sol,
            concentration: None,
            smart_money: None,
            fee_activity: None,
            memory: MemoryVerdict::Unknown,
        }
    }
}

struct HardReject {
    reason: String,
    retry_soon: bool,
}

impl HardReject {
    fn permanent(reason: String) -> Self {
        Self {
            reason,
            retry_soon: false,
        }
    }
}

/// Additive score with its reasons and red flags
#[derive(Default)]
struct ScoreCard {
    score: f64,
    reasons: Vec<String>,
    red_flags: Vec<String>,
}

impl ScoreCard {
    fn add(&mut self, points: f64, reason: String) {
        self.score += points;
        self.reasons.push(reason);
    }

    fn flag(&mut self, flag: String) {
        self.red_flags.push(flag);
    }
}

/// Scores candidates against the live config and learned signals
pub struct Evaluator<'a> {
    config: &'a Config,
    tracker: &'a SignalTracker,
}

impl<'a> Evaluator<'a> {
    pub fn new(config: &'a Config, tracker: &'a SignalTracker) -> Self {
        Self { config, tracker }
    }

    pub fn evaluate(
        &self,
        candidate: &Candidate,
        metrics: &TokenMetrics,
        ctx: &EvaluationContext,
    ) -> Evaluation {
        let age = asset_age(candidate, metrics, ctx.now);

        if let Some(reject) = self.hard_filter(metrics, age, ctx) {
            return Evaluation::rejected(candidate, metrics, reject.reason, reject.retry_soon);
        }

        let mut card = ScoreCard::default();
        score_volume_ratio(&mut card, metrics);
        score_buy_pressure(&mut card, metrics);
        score_momentum(&mut card, metrics);
        score_liquidity(&mut card, metrics);
        score_age(&mut card, age);
        score_holders(&mut card, metrics);
        if let Some(fees) = &ctx.fee_activity {
            score_fee_activity(&mut card, fees);
        }
        if let Some(smart) = &ctx.smart_money {
            score_smart_money(&mut card, smart);
        }
        score_wash_trading(&mut card, metrics);
        if let Some(concentration) = &ctx.concentration {
            score_concentration(&mut card, concentration, metrics.holders.unwrap_or(0));
        }

        // Learned adjustment over the tags attached so far
        let learning_adjustment = if self.config.learning.enabled {
            let signals = normalize_all(&card.reasons);
            self.tracker
                .total_adjustment(&signals, self.config.learning.adjustment_floor)
        } else {
            0.0
        };
        card.score += learning_adjustment;

        match ctx.memory {
            MemoryVerdict::Negative => {
                card.add(ctx.memory.score_adjustment(), "Prior loss on record".to_string())
            }
            MemoryVerdict::Positive => {
                card.add(ctx.memory.score_adjustment(), "Prior win on record".to_string())
            }
            MemoryVerdict::Unknown => {}
        }

        let score = card.score.max(0.0);
        let mut evaluation = Evaluation {
            asset: candidate.asset.clone(),
            symbol: candidate.symbol.clone(),
            score,
            reasons: card.reasons,
            red_flags: card.red_flags,
            should_buy: false,
            suggested_sol: 0.0,
            retry_soon: false,
            learning_adjustment,
            metrics: metrics.clone(),
        };

        if score < ACCEPT_THRESHOLD || !evaluation.red_flags.is_empty() {
            return evaluation;
        }

        match size_position(
            score,
            &self.config.trading,
            ctx.headroom_sol,
            metrics.liquidity_sol,
        ) {
            Ok(size) => {
                evaluation.should_buy = true;
                evaluation.suggested_sol = size;
            }
            Err(block) => {
                // Headroom frees up as positions close; impact does not
                evaluation.retry_soon = matches!(block, SizingBlock::InsufficientHeadroom { .. });
                evaluation.red_flags.push(block.description());
            }
        }

        evaluation
    }

    fn hard_filter(
        &self,
        metrics: &TokenMetrics,
        age: Option<Duration>,
        ctx: &EvaluationContext,
    ) -> Option<HardReject> {
        let f = &self.config.filters;
        let young = age
            .map(|a| a < Duration::minutes(YOUNG_CANDIDATE_MINUTES))
            .unwrap_or(false);

        if let Some(age) = age {
            let secs = age.num_seconds().max(0) as u64;
            if secs < f.min_launch_age_secs {
                return Some(HardReject {
                    reason: format!("Too new: {}s < {}s", secs, f.min_launch_age_secs),
                    retry_soon: true,
                });
            }
            if secs > f.max_launch_age_secs {
                return Some(HardReject::permanent(format!(
                    "Too old: {}h",
                    secs / 3600
                )));
            }
        }

        if metrics.liquidity_usd < f.min_liquidity_usd {
            return Some(HardReject {
                reason: format!(
                    "Liquidity ${:.0} < ${:.0}",
                    metrics.liquidity_usd, f.min_liquidity_usd
                ),
                retry_soon: young && metrics.liquidity_usd <= 0.0,
            });
        }

        if metrics.market_cap_usd < f.min_market_cap_usd {
            return Some(HardReject::permanent(format!(
                "Market cap ${:.0} < ${:.0}",
                metrics.market_cap_usd, f.min_market_cap_usd
            )));
        }

        if metrics.volume_24h_usd < f.min_volume_24h_usd {
            return Some(HardReject {
                reason: format!(
                    "Volume ${:.0} < ${:.0}",
                    metrics.volume_24h_usd, f.min_volume_24h_usd
                ),
                retry_soon: young && metrics.volume_24h_usd <= 0.0,
            });
        }

        let ratio = metrics.buy_sell_ratio();
        if ratio < f.min_buy_sell_ratio {
            return Some(HardReject::permanent(format!(
                "Buy/sell ratio {:.2} < {:.2}",
                ratio, f.min_buy_sell_ratio
            )));
        }

        if let Some(holders) = metrics.holders {
            if holders < f.min_holders {
                return Some(HardReject::permanent(format!(
                    "Holders {} < {}",
                    holders, f.min_holders
                )));
            }
        }

        if let Some(c) = &ctx.concentration {
            if c.top_holder_pct > f.max_single_holder_pct {
                return Some(HardReject::permanent(format!(
                    "Single holder owns {:.1}% (max {:.0}%)",
                    c.top_holder_pct, f.max_single_holder_pct
                )));
            }
            if c.top5_pct > f.max_top5_holder_pct {
                return Some(HardReject::permanent(format!(
                    "Top 5 holders own {:.1}% (max {:.0}%)",
                    c.top5_pct, f.max_top5_holder_pct
                )));
            }
        }

        None
    }
}

fn score_volume_ratio(card: &mut ScoreCard, m: &TokenMetrics) {
    let r = if m.market_cap_usd > 0.0 {
        m.volume_24h_usd / m.market_cap_usd
    } else {
        0.0
    };
    let (points, label) = if r >= 1.0 {
        (25.0, "Extreme volume/MCap")
    } else if r >= 0.5 {
        (20.0, "Strong volume/MCap")
    } else if r >= 0.25 {
        (14.0, "Healthy volume/MCap")
    } else if r >= 0.1 {
        (8.0, "Moderate volume/MCap")
    } else {
        (3.0, "Thin volume/MCap")
    };
    card.add(points, format!("{} {:.2}x", label, r));
}

fn score_buy_pressure(card: &mut ScoreCard, m: &TokenMetrics) {
    let b = m.buy_sell_ratio();
    let (points, label) = if b >= 3.0 {
        (25.0, "Heavy buy pressure")
    } else if b >= 2.0 {
        (20.0, "Strong buy pressure")
    } else if b >= 1.5 {
        (15.0, "Buy pressure")
    } else if b >= 1.2 {
        (10.0, "Mild buy pressure")
    } else {
        (5.0, "Balanced flow")
    };
    card.add(points, format!("{} {:.1}x", label, b));
}

fn score_momentum(card: &mut ScoreCard, m: &TokenMetrics) {
    let c = m.price_change_24h_pct;
    if c <= -50.0 {
        card.flag(format!("Steep dump {:+.0}%", c));
        return;
    }
    let (points, label) = if c < -20.0 {
        (2.0, "Deep pullback")
    } else if c < 0.0 {
        (5.0, "Dip")
    } else if c < 50.0 {
        (12.0, "Momentum")
    } else if c < 200.0 {
        (20.0, "Strong momentum")
    } else if c < 500.0 {
        (15.0, "Extended run")
    } else {
        (8.0, "Overextended")
    };
    card.add(points, format!("{} {:+.0}%", label, c));
}

fn score_liquidity(card: &mut ScoreCard, m: &TokenMetrics) {
    let l = m.liquidity_usd;
    let (points, label) = if l >= 100_000.0 {
        (15.0, "Deep liquidity")
    } else if l >= 50_000.0 {
        (12.0, "Solid liquidity")
    } else if l >= 25_000.0 {
        (8.0, "Fair liquidity")
    } else if l >= 10_000.0 {
        (5.0, "Light liquidity")
    } else {
        (2.0, "Thin liquidity")
    };
    card.add(points, format!("{} ${:.1}K", label, l / 1000.0));
}

fn score_age(card: &mut ScoreCard, age: Option<Duration>) {
    let Some(age) = age else {
        card.add(4.0, "Age unknown".to_string());
        return;
    };
    let minutes = age.num_minutes();
    let hours = minutes as f64 / 60.0;
    if minutes < 30 {
        card.add(8.0, format!("Fresh launch {}m", minutes));
    } else if minutes < 120 {
        card.add(12.0, format!("Early age {:.1}h", hours));
    } else if minutes < 360 {
        card.add(15.0, format!("Sweet-spot age {:.1}h", hours));
    } else if minutes < 1440 {
        card.add(10.0, format!("Established age {:.1}h", hours));
    } else {
        card.add(4.0, format!("Mature age {:.1}d", hours / 24.0));
    }
}

fn score_holders(card: &mut ScoreCard, m: &TokenMetrics) {
    let Some(holders) = m.holders else { return };
    let (points, label) = if holders >= 1000 {
        (5.0, "Broad holder base")
    } else if holders >= 500 {
        (4.0, "Growing holder base")
    } else if holders >= 250 {
        (3.0, "Holder base")
    } else if holders >= 100 {
        (2.0, "Small holder base")
    } else {
        return;
    };
    card.add(points, format!("{} {}", label, holders));
}

fn score_fee_activity(card: &mut ScoreCard, fees: &FeeActivity) {
    if fees.claim_count == 0 {
        return;
    }
    card.add(10.0, format!("Creator fees claimed ({} claims)", fees.claim_count));
    if fees.total_claimed_sol >= 1.0 {
        card.add(8.0, format!("Fee volume {:.2} SOL", fees.total_claimed_sol));
    }
}

fn score_smart_money(card: &mut ScoreCard, smart: &SmartMoney) {
    match smart.wallet_count {
        0 => {}
        1 => card.add(5.0, "Smart money wallet".to_string()),
        2 => card.add(10.0, "Smart money pair".to_string()),
        n => card.add(15.0, format!("Smart money cluster ({} wallets)", n)),
    }
    if smart.benchmark_participated {
        card.add(5.0, "Benchmark wallet participated".to_string());
    }
}

fn score_wash_trading(card: &mut ScoreCard, m: &TokenMetrics) {
    let txns = m.txns_24h();
    if txns < WASH_MIN_TXNS {
        return;
    }
    let avg_size = m.volume_24h_usd / txns as f64;
    let index = txns as f64 / avg_size.max(1.0);
    if index > 2000.0 {
        card.flag(format!("Wash trading (index {:.0})", index));
    } else if index > 500.0 {
        card.add(-10.0, format!("Wash trading suspected (index {:.0})", index));
    } else if index > 100.0 {
        card.add(-3.0, format!("Wash trading hint (index {:.0})", index));
    }
}

fn score_concentration(card: &mut ScoreCard, c: &Concentration, holders: u64) {
    let top5 = c.top5_pct;
    if top5 > 40.0 {
        card.add(-10.0, format!("High concentration: top5 {:.0}%", top5));
    } else if top5 > 30.0 {
        card.add(-5.0, format!("Concentration: top5 {:.0}%", top5));
    } else if top5 > 20.0 {
        card.add(-2.0, format!("Mild concentration: top5 {:.0}%", top5));
    }

    if top5 < 15.0 && holders >= 200 {
        card.add(5.0, format!("Well distributed: top5 {:.0}%", top5));
    } else if top5 < 25.0 {
        card.add(3.0, format!("Fair distribution: top5 {:.0}%", top5));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::SignalPerformance;

    /// Candidate that clears every hard filter and scores high
    fn strong_metrics(now: DateTime<Utc>) -> TokenMetrics {
        TokenMetrics {
            price_sol: 0.000_001,
            price_usd: 0.0002,
            market_cap_usd: 200_000.0,
            volume_24h_usd: 250_000.0,
            volume_1h_usd: 20_000.0,
            liquidity_usd: 60_000.0,
            liquidity_sol: Some(400.0),
            holders: Some(800),
            buys_24h: 900,
            sells_24h: 300,
            buys_5m: 10,
            sells_5m: 4,
            price_change_24h_pct: 80.0,
            pair_created_at: Some(now - Duration::hours(3)),
        }
    }

    fn candidate() -> Candidate {
        Candidate::new("Mint111", "TEST")
    }

    fn ctx(now: DateTime<Utc>) -> EvaluationContext {
        EvaluationContext::new(now, 1.0)
    }

    #[test]
    fn test_strong_candidate_accepted() {
        let config = Config::default();
        let tracker = SignalTracker::new();
        let now = Utc::now();
        let eval = Evaluator::new(&config, &tracker).evaluate(&candidate(), &strong_metrics(now), &ctx(now));

        // 25 + 25 + 20 + 12 + 15 + 4
        assert_eq!(eval.score, 101.0);
        assert!(eval.should_buy);
        assert!(eval.red_flags.is_empty());
        assert_eq!(eval.suggested_sol, config.trading.max_position_sol);
    }

    #[test]
    fn test_hard_filter_zero_score() {
        let config = Config::default();
        let tracker = SignalTracker::new();
        let now = Utc::now();
        let evaluator = Evaluator::new(&config, &tracker);

        let mut low_liquidity = strong_metrics(now);
        low_liquidity.liquidity_usd = 1_000.0;
        let mut low_mcap = strong_metrics(now);
        low_mcap.market_cap_usd = 5_000.0;
        let mut sellers = strong_metrics(now);
        sellers.buys_24h = 100;
        sellers.sells_24h = 400;
        let mut few_holders = strong_metrics(now);
        few_holders.holders = Some(10);
        let mut too_old = strong_metrics(now);
        too_old.pair_created_at = Some(now - Duration::days(30));
        let mut thin_volume = strong_metrics(now);
        thin_volume.volume_24h_usd = 5_000.0;

        for metrics in [low_liquidity, low_mcap, sellers, few_holders, too_old, thin_volume] {
            let eval = evaluator.evaluate(&candidate(), &metrics, &ctx(now));
            assert_eq!(eval.score, 0.0);
            assert!(!eval.should_buy);
            assert!(eval.reasons.is_empty());
            assert_eq!(eval.red_flags.len(), 1);
            assert!(!eval.retry_soon);
        }
    }

    #[test]
    fn test_concentration_hard_cap() {
        let config = Config::default();
        let tracker = SignalTracker::new();
        let now = Utc::now();
        let mut context = ctx(now);
        context.concentration = Some(Concentration {
            top_holder_pct: 25.0,
            top5_pct: 40.0,
        });
        let eval = Evaluator::new(&config, &tracker).evaluate(&candidate(), &strong_metrics(now), &context);
        assert_eq!(eval.score, 0.0);
        assert!(eval.red_flags[0].contains("Single holder"));
    }

    #[test]
    fn test_top5_concentration_hard_cap() {
        let config = Config::default();
        let tracker = SignalTracker::new();
        let now = Utc::now();
        let mut context = ctx(now);
        context.concentration = Some(Concentration {
            top_holder_pct: 12.0,
            top5_pct: 55.0,
        });
        let eval = Evaluator::new(&config, &tracker).evaluate(&candidate(), &strong_metrics(now), &context);
        assert_eq!(eval.score, 0.0);
        assert!(!eval.should_buy);
        assert!(!eval.retry_soon);
        assert_eq!(eval.red_flags.len(), 1);
        assert!(eval.red_flags[0].contains("Top 5 holders own"));
    }

    #[test]
    fn test_too_new_rejected_for_retry() {
        let config = Config::default();
        let tracker = SignalTracker::new();
        let now = Utc::now();
        let mut metrics = strong_metrics(now);
        metrics.pair_created_at = Some(now - Duration::seconds(30));

        let eval = Evaluator::new(&config, &tracker).evaluate(&candidate(), &metrics, &ctx(now));
        assert_eq!(eval.score, 0.0);
        assert!(!eval.should_buy);
        assert!(eval.retry_soon);
        assert!(eval.reasons.is_empty());
        assert!(eval.red_flags[0].starts_with("Too new"));
    }

    #[test]
    fn test_unhydrated_young_candidate_retries_soon() {
        let config = Config::default();
        let tracker = SignalTracker::new();
        let now = Utc::now();
        let metrics = TokenMetrics {
            pair_created_at: Some(now - Duration::minutes(5)),
            ..Default::default()
        };
        let eval = Evaluator::new(&config, &tracker).evaluate(&candidate(), &metrics, &ctx(now));
        assert!(eval.retry_soon);
        assert!(!eval.should_buy);
        assert_eq!(eval.score, 0.0);
    }

    #[test]
    fn test_steep_dump_red_flag_blocks() {
        let config = Config::default();
        let tracker = SignalTracker::new();
        let now = Utc::now();
        let mut metrics = strong_metrics(now);
        metrics.price_change_24h_pct = -60.0;
        let eval = Evaluator::new(&config, &tracker).evaluate(&candidate(), &metrics, &ctx(now));
        assert!(eval.score > 0.0);
        assert!(!eval.should_buy);
        assert!(eval.red_flags[0].starts_with("Steep dump"));
    }

    #[test]
    fn test_overextended_is_not_a_red_flag() {
        let config = Config::default();
        let tracker = SignalTracker::new();
        let now = Utc::now();
        let mut metrics = strong_metrics(now);
        metrics.price_change_24h_pct = 800.0;
        let eval = Evaluator::new(&config, &tracker).evaluate(&candidate(), &metrics, &ctx(now));
        assert!(eval.red_flags.is_empty());
        assert!(eval.reasons.iter().any(|r| r.starts_with("Overextended")));
        assert!(eval.should_buy);
    }

    #[test]
    fn test_wash_trading_red_flag() {
        let config = Config::default();
        let tracker = SignalTracker::new();
        let now = Utc::now();
        let mut metrics = strong_metrics(now);
        // 12k txns moving $24k: avg $2, index 6000
        metrics.buys_24h = 9_000;
        metrics.sells_24h = 3_000;
        metrics.volume_24h_usd = 24_000.0;
        let eval = Evaluator::new(&config, &tracker).evaluate(&candidate(), &metrics, &ctx(now));
        assert!(!eval.should_buy);
        assert!(eval.red_flags.iter().any(|f| f.starts_with("Wash trading")));
    }

    #[test]
    fn test_learning_floor_applies() {
        let config = Config::default();
        let now = Utc::now();
        let metrics = strong_metrics(now);

        let baseline = Evaluator::new(&config, &SignalTracker::new())
            .evaluate(&candidate(), &metrics, &ctx(now));

        // Every signal of this candidate has a 0% win rate over 5 trades
        let rows: Vec<SignalPerformance> = baseline
            .signals()
            .into_iter()
            .map(|signal| SignalPerformance {
                signal,
                total_trades: 5,
                wins: 0,
                losses: 5,
                total_pnl_sol: -0.5,
                last_updated: now,
            })
            .collect();
        let (tracker, healed) = SignalTracker::from_records(rows);
        assert!(healed, "all-loss data trips the corruption guard");
        assert!(tracker.is_empty());

        // Below the guard's signal count the penalty applies but is floored
        let rows: Vec<SignalPerformance> = baseline
            .signals()
            .into_iter()
            .take(4)
            .map(|signal| SignalPerformance {
                signal,
                total_trades: 5,
                wins: 0,
                losses: 5,
                total_pnl_sol: -0.5,
                last_updated: now,
            })
            .collect();
        let (tracker, _) = SignalTracker::from_records(rows);
        let eval = Evaluator::new(&config, &tracker).evaluate(&candidate(), &metrics, &ctx(now));
        assert_eq!(eval.learning_adjustment, -15.0);
        assert_eq!(eval.score, baseline.score - 15.0);
    }

    #[test]
    fn test_memory_penalty_and_bonus() {
        let config = Config::default();
        let tracker = SignalTracker::new();
        let now = Utc::now();
        let metrics = strong_metrics(now);
        let evaluator = Evaluator::new(&config, &tracker);

        let mut negative = ctx(now);
        negative.memory = MemoryVerdict::Negative;
        let mut positive = ctx(now);
        positive.memory = MemoryVerdict::Positive;

        assert_eq!(evaluator.evaluate(&candidate(), &metrics, &negative).score, 86.0);
        assert_eq!(evaluator.evaluate(&candidate(), &metrics, &positive).score, 106.0);
    }

    #[test]
    fn test_score_below_threshold_rejected() {
        let config = Config::default();
        let tracker = SignalTracker::new();
        let now = Utc::now();
        let mut metrics = strong_metrics(now);
        // 3 + 10 + 5 + 5 + 10 + 2 = 35
        metrics.volume_24h_usd = 15_000.0;
        metrics.market_cap_usd = 400_000.0;
        metrics.buys_24h = 130;
        metrics.sells_24h = 100;
        metrics.price_change_24h_pct = -10.0;
        metrics.liquidity_usd = 12_000.0;
        metrics.pair_created_at = Some(now - Duration::hours(10));
        metrics.holders = Some(150);
        let eval = Evaluator::new(&config, &tracker).evaluate(&candidate(), &metrics, &ctx(now));
        assert_eq!(eval.score, 35.0);
        assert!(!eval.should_buy);
        assert!(eval.red_flags.is_empty());
    }

    #[test]
    fn test_impact_cap_rejects_instead_of_shrinking() {
        let config = Config::default();
        let tracker = SignalTracker::new();
        let now = Utc::now();
        let mut metrics = strong_metrics(now);
        metrics.liquidity_sol = Some(1.0);
        let eval = Evaluator::new(&config, &tracker).evaluate(&candidate(), &metrics, &ctx(now));
        assert!(eval.score >= ACCEPT_THRESHOLD);
        assert!(!eval.should_buy);
        assert_eq!(eval.suggested_sol, 0.0);
    }

    #[test]
    fn test_accepted_size_within_bounds() {
        let config = Config::default();
        let tracker = SignalTracker::new();
        let now = Utc::now();
        let mut context = ctx(now);
        context.headroom_sol = 0.12;
        let eval = Evaluator::new(&config, &tracker).evaluate(&candidate(), &strong_metrics(now), &context);
        assert!(eval.should_buy);
        assert!(eval.score >= ACCEPT_THRESHOLD);
        assert!(eval.suggested_sol <= 0.12);
        assert!(eval.suggested_sol <= config.trading.max_position_sol);
    }

    #[test]
    fn test_bonuses_add_up() {
        let config = Config::default();
        let tracker = SignalTracker::new();
        let now = Utc::now();
        let mut context = ctx(now);
        context.fee_activity = Some(FeeActivity {
            claim_count: 3,
            total_claimed_sol: 2.5,
        });
        context.smart_money = Some(SmartMoney {
            wallet_count: 2,
            benchmark_participated: true,
        });
        context.concentration = Some(Concentration {
            top_holder_pct: 4.0,
            top5_pct: 12.0,
        });
        let eval = Evaluator::new(&config, &tracker).evaluate(&candidate(), &strong_metrics(now), &context);
        // 101 + 18 fees + 15 smart money + 5 distribution
        assert_eq!(eval.score, 139.0);
    }
}
