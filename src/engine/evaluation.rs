//! Evaluation pass: score new candidates and enter the best one

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{Engine, TickReport};
use crate::error::{Error, Result};
use crate::filter::{Candidate, Evaluation, EvaluationContext, Evaluator};
use crate::journal::{classify_notes, MemoryNote, MemoryVerdict};
use crate::notify::TradeSignal;
use crate::position::{NewPosition, Position};
use crate::trading::{execute_quoted, from_raw, to_raw, SubmitOptions, SOL_DECIMALS, SOL_MINT};

/// Notes consulted per candidate
const MEMORY_RECALL_LIMIT: usize = 10;

/// Failed auxiliary lookups count as "unknown"
fn neutral<T>(result: Result<Option<T>>, lookup: &str, asset: &str) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(asset, lookup, error = %e, "Auxiliary lookup failed, treating as neutral");
            None
        }
    }
}

impl Engine {
    pub(super) async fn evaluation_pass(&mut self, now: DateTime<Utc>, report: &mut TickReport) {
        if let Err(block) = self.governor.can_trade() {
            debug!(reason = %block.description(), "Evaluation gated");
            return;
        }

        let candidates = match self
            .market
            .discover(self.config.trading.max_candidates_per_pass)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "Candidate discovery failed");
                return;
            }
        };

        let delay = Duration::from_millis(self.config.trading.evaluation_delay_ms);
        let mut best: Option<Evaluation> = None;
        let mut first = true;

        for candidate in candidates {
            if !self.governor.should_evaluate(&candidate.asset, now) {
                continue;
            }
            // Rate limit between lookups
            if !first && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            first = false;

            let Some(evaluation) = self.evaluate_candidate(&candidate, now).await else {
                continue;
            };
            report.evaluated += 1;
            self.governor
                .mark_evaluated(&candidate.asset, evaluation.retry_soon, now);

            if !evaluation.should_buy {
                if !evaluation.retry_soon {
                    self.governor.mark_decided(&candidate.asset);
                }
                debug!(asset = %candidate.asset, "{}", evaluation.summary());
                continue;
            }

            report.accepted += 1;
            info!(asset = %candidate.asset, score = evaluation.score, "{}", evaluation.summary());
            if best.as_ref().map_or(true, |b| evaluation.score > b.score) {
                best = Some(evaluation);
            }
        }

        let Some(best) = best else {
            return;
        };
        let asset = best.asset.clone();
        match self.enter(best, now).await {
            Ok(()) => report.opened += 1,
            Err(e) => warn!(asset = %asset, error = %e, "Entry failed"),
        }
    }

    /// `None` when the candidate has no market data yet
    async fn evaluate_candidate(
        &mut self,
        candidate: &Candidate,
        now: DateTime<Utc>,
    ) -> Option<Evaluation> {
        let asset = candidate.asset.as_str();
        let metrics = match self.market.metrics(asset).await {
            Ok(Some(metrics)) => metrics,
            Ok(None) => {
                debug!(asset, "No market data yet, retrying soon");
                self.governor.mark_evaluated(asset, true, now);
                return None;
            }
            Err(e) => {
                warn!(asset, error = %e, "Metrics lookup failed, retrying soon");
                self.governor.mark_evaluated(asset, true, now);
                return None;
            }
        };

        let mut ctx = EvaluationContext::new(now, self.governor.remaining_capacity());
        ctx.concentration = neutral(self.market.concentration(asset).await, "concentration", asset);
        ctx.fee_activity = neutral(self.market.fee_activity(asset).await, "fee_activity", asset);
        ctx.smart_money = neutral(self.market.smart_money(asset).await, "smart_money", asset);
        ctx.memory = match self.memory.recall(asset, MEMORY_RECALL_LIMIT).await {
            Ok(notes) => classify_notes(&notes),
            Err(e) => {
                warn!(asset, error = %e, "Memory recall failed, treating as neutral");
                MemoryVerdict::Unknown
            }
        };

        Some(Evaluator::new(&self.config, &self.tracker).evaluate(candidate, &metrics, &ctx))
    }

    /// Buy the accepted candidate and open a position for the fill
    async fn enter(&mut self, evaluation: Evaluation, now: DateTime<Utc>) -> Result<()> {
        let trading = &self.config.trading;
        let (slippage_bps, max_impact_pct) = (trading.slippage_bps, trading.max_price_impact_pct);
        let asset = evaluation.asset.clone();

        let decimals = self.gateway.get_asset_decimals(&asset).await?;
        let quote = self
            .gateway
            .quote(
                SOL_MINT,
                &asset,
                to_raw(evaluation.suggested_sol, SOL_DECIMALS),
                slippage_bps,
            )
            .await?;
        if quote.price_impact_pct > max_impact_pct {
            return Err(Error::PriceImpactTooHigh {
                impact_pct: quote.price_impact_pct,
                max_pct: max_impact_pct,
            });
        }

        let options = SubmitOptions {
            priority_fee_sol: self.config.gateway.priority_fee_sol,
        };
        let fill = execute_quoted(self.gateway.as_ref(), quote, &options).await?;

        let position = Position::open(
            NewPosition {
                asset: asset.clone(),
                symbol: evaluation.symbol.clone(),
                amount_sol: from_raw(fill.quote.in_amount, SOL_DECIMALS),
                token_amount: from_raw(fill.quote.out_amount, decimals),
                entry_tx: fill.signature.clone(),
                reasons: evaluation.reasons.clone(),
                signals: evaluation.signals(),
                score: evaluation.score,
            },
            now,
        );
        self.governor
            .register_open(&position.id, &position.asset, position.amount_sol);

        info!(
            position = %position.id,
            asset = %asset,
            symbol = %position.symbol,
            amount_sol = position.amount_sol,
            tokens = position.token_amount,
            entry_price = position.entry_price,
            tx = %fill.signature,
            "Position opened"
        );

        let signal = TradeSignal::Entry {
            asset: asset.clone(),
            symbol: position.symbol.clone(),
            amount_sol: position.amount_sol,
            score: evaluation.score,
            reasons: evaluation.reasons.clone(),
            tx: fill.signature,
        };
        let note = MemoryNote::new(
            asset,
            format!(
                "ENTRY {} {:.4} SOL at score {:.0}: {}",
                position.symbol,
                position.amount_sol,
                evaluation.score,
                evaluation.reasons.join(", ")
            ),
            now,
        );

        self.book.insert(position).await;
        self.notify(signal).await;
        self.remember(note);
        Ok(())
    }
}
