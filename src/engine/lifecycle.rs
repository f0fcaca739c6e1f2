//! Position pass: observe, check exits, execute closes

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::{Engine, TickReport};
use crate::error::{Error, Result};
use crate::journal::MemoryNote;
use crate::notify::TradeSignal;
use crate::position::seller::{reconcile_balance, sell_tokens};
use crate::position::{
    check_exit, BalanceCheck, ExitDecision, ExitReason, Observation, PositionStatus,
    MAX_SELL_ATTEMPTS,
};

impl Engine {
    pub(super) async fn position_pass(&mut self, now: DateTime<Utc>, report: &mut TickReport) {
        for id in self.book.open_ids() {
            if let Err(e) = self.check_position(&id, now, report).await {
                warn!(position = %id, error = %e, "Position check failed, retrying next tick");
            }
        }
    }

    async fn check_position(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Result<()> {
        let Some(position) = self.book.get(id) else {
            return Ok(());
        };
        let (asset, tokens) = (position.asset.clone(), position.token_amount);
        let observation = self.observe(&asset, tokens).await;

        let settle = chrono::Duration::seconds(self.config.exits.settle_window_secs as i64);
        let decision = {
            let Some(position) = self.book.get_mut(id) else {
                return Ok(());
            };
            position.observe_price(observation.price, now, settle);
            check_exit(position, &observation, &self.config.exits, now)
        };
        self.book.persist(id).await;

        let status = match decision {
            None => return Ok(()),
            Some(ExitDecision::Abandon { reason, detail }) => {
                self.fail_position(id, reason, detail, 0.0, now).await;
                PositionStatus::Failed
            }
            Some(ExitDecision::Full { reason, detail }) => {
                info!(position = %id, asset = %asset, reason = %reason, "{}", detail);
                self.close_full(id, reason, detail, now).await?
            }
            Some(ExitDecision::Partial {
                tier,
                fraction,
                detail,
            }) => {
                info!(position = %id, asset = %asset, tier = tier + 1, "{}", detail);
                let status = self.close_partial(id, fraction, now).await?;
                if status == PositionStatus::Open {
                    report.partials += 1;
                }
                status
            }
        };

        match status {
            PositionStatus::Closed => report.exits += 1,
            PositionStatus::Failed => report.failures += 1,
            PositionStatus::Open => {}
        }
        Ok(())
    }

    /// Price from the authoritative sell quote when available, else from metrics
    async fn observe(&self, asset: &str, tokens: f64) -> Observation {
        let metrics = match self.market.metrics(asset).await {
            Ok(metrics) => metrics,
            Err(e) => {
                debug!(asset, error = %e, "Metrics lookup failed");
                None
            }
        };
        let quoted = match self.market.sell_quote(asset, tokens).await {
            Ok(Some(sol)) if tokens > 0.0 && sol > 0.0 => Some(sol / tokens),
            Ok(_) => None,
            Err(e) => {
                debug!(asset, error = %e, "Sell quote failed");
                None
            }
        };
        let price = quoted.or_else(|| {
            metrics
                .as_ref()
                .map(|m| m.price_sol)
                .filter(|price| *price > 0.0)
        });
        Observation { price, metrics }
    }

    pub(super) async fn manual_close(&mut self, id: &str, now: DateTime<Utc>) -> Result<PositionStatus> {
        let Some(position) = self.book.get(id) else {
            return Err(Error::PositionNotFound(id.to_string()));
        };
        if !position.is_open() {
            return Ok(position.status);
        }

        // Fresh price so a give-up books a current estimate
        let (asset, tokens) = (position.asset.clone(), position.token_amount);
        let observation = self.observe(&asset, tokens).await;
        if observation.price.is_some() {
            let settle = chrono::Duration::seconds(self.config.exits.settle_window_secs as i64);
            if let Some(position) = self.book.get_mut(id) {
                position.observe_price(observation.price, now, settle);
            }
        }

        self.close_full(id, ExitReason::Manual, "Manual sell".to_string(), now)
            .await
    }

    /// Sell the entire remaining quantity. A position that is no longer
    /// open is left alone.
    async fn close_full(
        &mut self,
        id: &str,
        reason: ExitReason,
        detail: String,
        now: DateTime<Utc>,
    ) -> Result<PositionStatus> {
        let gateway = self.gateway.clone();
        let priority_fee_sol = self.config.gateway.priority_fee_sol;

        let Some(position) = self.book.get_mut(id) else {
            return Err(Error::PositionNotFound(id.to_string()));
        };
        if !position.is_open() {
            debug!(position = %id, status = ?position.status, "Close skipped, not open");
            return Ok(position.status);
        }

        if reconcile_balance(gateway.as_ref(), position).await == BalanceCheck::Missing {
            self.fail_position(
                id,
                ExitReason::BalanceMissing,
                format!("Wallet holds no tokens (exit was {})", reason),
                0.0,
                now,
            )
            .await;
            return Ok(PositionStatus::Failed);
        }

        let (asset, tokens, attempts, before) = (
            position.asset.clone(),
            position.token_amount,
            position.sell_attempts,
            position.realized_pnl,
        );

        match sell_tokens(gateway.as_ref(), &asset, tokens, attempts, priority_fee_sol).await {
            Ok(fill) => {
                let Some(position) = self.book.get_mut(id) else {
                    return Err(Error::PositionNotFound(id.to_string()));
                };
                let total = position.apply_full_close(
                    fill.sol_received,
                    fill.signature.clone(),
                    reason,
                    detail,
                    now,
                );
                info!(
                    position = %id,
                    asset = %asset,
                    reason = %reason,
                    sol_received = fill.sol_received,
                    pnl_sol = total,
                    tx = %fill.signature,
                    "Position closed"
                );
                self.after_close(id, total - before, now).await;
                Ok(PositionStatus::Closed)
            }
            Err(e) => self.sell_failed(id, e, now).await,
        }
    }

    /// Sell `fraction` of the remaining quantity and keep the position open
    async fn close_partial(
        &mut self,
        id: &str,
        fraction: f64,
        now: DateTime<Utc>,
    ) -> Result<PositionStatus> {
        let gateway = self.gateway.clone();
        let priority_fee_sol = self.config.gateway.priority_fee_sol;
        let max_tiers = self.config.exits.take_profit_tiers.len();

        let Some(position) = self.book.get_mut(id) else {
            return Err(Error::PositionNotFound(id.to_string()));
        };
        if !position.is_open() {
            return Ok(position.status);
        }

        if reconcile_balance(gateway.as_ref(), position).await == BalanceCheck::Missing {
            self.fail_position(
                id,
                ExitReason::BalanceMissing,
                "Wallet holds no tokens (exit was take-profit tier)".to_string(),
                0.0,
                now,
            )
            .await;
            return Ok(PositionStatus::Failed);
        }

        let (asset, amount, attempts) = (
            position.asset.clone(),
            position.token_amount * fraction,
            position.sell_attempts,
        );

        let fill = match sell_tokens(gateway.as_ref(), &asset, amount, attempts, priority_fee_sol).await {
            Ok(fill) => fill,
            Err(e) => return self.sell_failed(id, e, now).await,
        };

        let Some(position) = self.book.get_mut(id) else {
            return Err(Error::PositionNotFound(id.to_string()));
        };
        let leg_pnl = position.apply_partial_close(fill.tokens_sold, fill.sol_received, max_tiers);
        let (remaining_sol, tier, symbol) =
            (position.amount_sol, position.tiers_sold, position.symbol.clone());

        self.governor.update_exposure(id, remaining_sol);
        self.book.persist(id).await;
        info!(
            position = %id,
            asset = %asset,
            tier,
            sol_received = fill.sol_received,
            pnl_sol = leg_pnl,
            remaining_sol,
            "Partial take-profit"
        );

        self.notify(TradeSignal::PartialExit {
            asset,
            symbol,
            tier,
            sol_received: fill.sol_received,
            pnl_sol: leg_pnl,
            tx: fill.signature,
        })
        .await;
        if leg_pnl > 0.0 {
            self.allocate(leg_pnl);
        }
        Ok(PositionStatus::Open)
    }

    /// Count the failed attempt. Past the cap, or on an error a wider
    /// slippage cannot fix, the position is given up at its last observed value.
    async fn sell_failed(&mut self, id: &str, cause: Error, now: DateTime<Utc>) -> Result<PositionStatus> {
        let Some(position) = self.book.get_mut(id) else {
            return Err(cause);
        };
        let attempts = position.record_failed_sell();

        if attempts >= MAX_SELL_ATTEMPTS || !cause.is_retryable() {
            let estimated = position.estimated_value();
            error!(
                position = %id,
                asset = %position.asset,
                attempts,
                retryable = cause.is_retryable(),
                estimated_value_sol = estimated,
                error = %cause,
                "Exit abandoned, marking failed"
            );
            self.fail_position(
                id,
                ExitReason::ExecutionFailed,
                format!("Exit failed after {} attempt(s): {}", attempts, cause),
                estimated,
                now,
            )
            .await;
            return Ok(PositionStatus::Failed);
        }

        warn!(
            position = %id,
            attempt = attempts,
            max = MAX_SELL_ATTEMPTS,
            error = %cause,
            "Exit attempt failed"
        );
        self.book.persist(id).await;
        Err(cause)
    }

    /// Terminal failure booking `remaining_value_sol` for what is left
    async fn fail_position(
        &mut self,
        id: &str,
        reason: ExitReason,
        detail: String,
        remaining_value_sol: f64,
        now: DateTime<Utc>,
    ) {
        let Some(position) = self.book.get_mut(id) else {
            return;
        };
        if !position.is_open() {
            return;
        }
        let before = position.realized_pnl;
        let total = position.mark_failed(reason, detail, remaining_value_sol, now);
        warn!(
            position = %id,
            asset = %position.asset,
            reason = %reason,
            pnl_sol = total,
            "Position failed"
        );
        self.after_close(id, total - before, now).await;
    }

    /// Bookkeeping shared by every terminal transition
    async fn after_close(&mut self, id: &str, leg_pnl: f64, now: DateTime<Utc>) {
        self.book.persist(id).await;
        self.governor.release(id);

        let Some(position) = self.book.get(id).cloned() else {
            return;
        };
        let pnl = position.realized_pnl;

        self.tracker
            .record_outcome(&position.entry_signals, pnl, now);
        let rows = self.tracker.records_for(&position.entry_signals);
        if let Err(e) = self.store.upsert_signals(&rows).await {
            warn!(error = %e, "Failed to persist learned signals");
        }

        let reason = position
            .exit_reason
            .map(|r| r.to_string())
            .unwrap_or_default();
        let detail = position.exit_detail.clone().unwrap_or_default();
        let hold_minutes = position.hold_minutes(now);

        self.notify(TradeSignal::Exit {
            asset: position.asset.clone(),
            symbol: position.symbol.clone(),
            reason: reason.clone(),
            detail: detail.clone(),
            pnl_sol: pnl,
            hold_minutes,
            tx: position.exit_tx.clone(),
        })
        .await;

        let outcome = if position.status == PositionStatus::Failed {
            "FAILED"
        } else if pnl > 0.0 {
            "WIN"
        } else {
            "LOSS"
        };
        self.remember(MemoryNote::new(
            position.asset.clone(),
            format!(
                "{} {}: {} ({}), PnL {:+.4} SOL after {}m",
                outcome, position.symbol, reason, detail, pnl, hold_minutes
            ),
            now,
        ));

        if leg_pnl > 0.0 {
            self.allocate(leg_pnl);
        }
    }
}
