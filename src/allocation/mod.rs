//! Profit allocation (buy-and-burn)
//!
//! After a profitable close, a share of the realized profit buys the
//! configured burn asset and the whole held balance is destroyed.
//! Runs detached from the close path; failures are logged only.
//! Allocations take turns: one balance check, buy and burn at a time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::AllocationConfig;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::trading::{
    execute_swap, to_raw, AssetBurner, ExecutionGateway, SubmitOptions, SOL_DECIMALS, SOL_MINT,
};

/// Allocations below this are not worth the transaction overhead
pub const MIN_ALLOCATION_SOL: f64 = 0.005;
/// SOL kept back for fees on top of the allocation
pub const FEE_BUFFER_SOL: f64 = 0.01;

const LEDGER_HISTORY_LIMIT: usize = 100;

/// One completed buy-and-burn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnEvent {
    pub asset: String,
    pub sol_spent: f64,
    pub raw_amount: u64,
    pub tokens: f64,
    pub buy_tx: String,
    pub burn_tx: String,
    pub at: DateTime<Utc>,
}

/// Running totals for reporting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BurnLedger {
    pub total_burned_raw: u64,
    pub total_burned_tokens: f64,
    pub total_sol_spent: f64,
    pub events: u32,
    pub last_event_at: Option<DateTime<Utc>>,
    /// SOL spent on buys whose burn did not go through
    #[serde(default)]
    pub unburned_sol: f64,
    #[serde(default)]
    pub failed_burns: u32,
    #[serde(default)]
    pub history: Vec<BurnEvent>,
}

impl BurnLedger {
    fn record(&mut self, event: BurnEvent) {
        self.total_burned_raw += event.raw_amount;
        self.total_burned_tokens += event.tokens;
        self.total_sol_spent += event.sol_spent;
        self.events += 1;
        self.last_event_at = Some(event.at);
        self.history.push(event);
        if self.history.len() > LEDGER_HISTORY_LIMIT {
            let excess = self.history.len() - LEDGER_HISTORY_LIMIT;
            self.history.drain(..excess);
        }
    }

    /// The buy went through but nothing was burned; the tokens stay held
    /// and the next successful burn sweeps them
    fn record_unburned(&mut self, sol_spent: f64) {
        self.total_sol_spent += sol_spent;
        self.unburned_sol += sol_spent;
        self.failed_burns += 1;
    }
}

/// Why an allocation did not run
#[derive(Debug, Clone, PartialEq)]
pub enum AllocationSkip {
    Disabled,
    NoProfit,
    /// Strategy is not net positive overall
    NotCumulativelyProfitable { net_pnl_sol: f64 },
    BelowMinimum { amount_sol: f64 },
    InsufficientBalance { available: f64, required: f64 },
}

impl AllocationSkip {
    pub fn description(&self) -> String {
        match self {
            AllocationSkip::Disabled => "allocation disabled".to_string(),
            AllocationSkip::NoProfit => "close was not profitable".to_string(),
            AllocationSkip::NotCumulativelyProfitable { net_pnl_sol } => {
                format!("net PnL {:.4} SOL is not positive", net_pnl_sol)
            }
            AllocationSkip::BelowMinimum { amount_sol } => {
                format!("{:.4} SOL below {} SOL minimum", amount_sol, MIN_ALLOCATION_SOL)
            }
            AllocationSkip::InsufficientBalance {
                available,
                required,
            } => format!("balance {:.4} SOL < {:.4} SOL required", available, required),
        }
    }
}

/// Inputs captured at close time
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    pub config: AllocationConfig,
    /// Profit of the triggering close
    pub profit_sol: f64,
    /// Net realized PnL across every position, including this close
    pub net_pnl_sol: f64,
    pub slippage_bps: u32,
    pub priority_fee_sol: f64,
}

/// Amount to allocate, before the balance check
pub fn plan_allocation(request: &AllocationRequest) -> std::result::Result<f64, AllocationSkip> {
    if !request.config.enabled {
        return Err(AllocationSkip::Disabled);
    }
    if request.profit_sol <= 0.0 {
        return Err(AllocationSkip::NoProfit);
    }
    if request.net_pnl_sol <= 0.0 {
        return Err(AllocationSkip::NotCumulativelyProfitable {
            net_pnl_sol: request.net_pnl_sol,
        });
    }
    let amount = request.profit_sol * request.config.profit_pct / 100.0;
    if amount < MIN_ALLOCATION_SOL {
        return Err(AllocationSkip::BelowMinimum { amount_sol: amount });
    }
    Ok(amount)
}

#[derive(Clone)]
pub struct ProfitAllocator {
    gateway: Arc<dyn ExecutionGateway>,
    burner: Option<Arc<dyn AssetBurner>>,
    store: Arc<dyn Store>,
    ledger: Arc<Mutex<BurnLedger>>,
    /// Held from the balance check through the burn
    turn: Arc<Mutex<()>>,
}

impl ProfitAllocator {
    pub fn new(
        gateway: Arc<dyn ExecutionGateway>,
        burner: Option<Arc<dyn AssetBurner>>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            gateway,
            burner,
            store,
            ledger: Arc::new(Mutex::new(BurnLedger::default())),
            turn: Arc::new(Mutex::new(())),
        }
    }

    pub fn has_burner(&self) -> bool {
        self.burner.is_some()
    }

    /// Rehydrate running totals at startup
    pub async fn load(&self) {
        match self.store.load_burn_ledger().await {
            Ok(Some(ledger)) => {
                debug!(events = ledger.events, "Loaded burn ledger");
                *self.ledger.lock().await = ledger;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Burn ledger unavailable, starting empty"),
        }
    }

    pub async fn ledger(&self) -> BurnLedger {
        self.ledger.lock().await.clone()
    }

    /// Run one allocation. `Ok(None)` when it was skipped.
    pub async fn allocate(&self, request: AllocationRequest) -> Result<Option<BurnEvent>> {
        let amount = match plan_allocation(&request) {
            Ok(amount) => amount,
            Err(skip) => {
                debug!(reason = %skip.description(), "Allocation skipped");
                return Ok(None);
            }
        };
        let burner = self
            .burner
            .as_ref()
            .ok_or_else(|| Error::Burn("no burn collaborator configured".to_string()))?;

        let _turn = self.turn.lock().await;
        let available = self.gateway.get_balance().await?;
        let required = amount + FEE_BUFFER_SOL;
        if available < required {
            let skip = AllocationSkip::InsufficientBalance { available, required };
            info!(reason = %skip.description(), "Allocation skipped");
            return Ok(None);
        }

        let asset = request.config.burn_asset.as_str();
        let options = SubmitOptions {
            priority_fee_sol: request.priority_fee_sol,
        };
        let fill = execute_swap(
            self.gateway.as_ref(),
            SOL_MINT,
            asset,
            to_raw(amount, SOL_DECIMALS),
            request.slippage_bps,
            &options,
        )
        .await?;

        let (raw_amount, tokens, burn_tx) = match self.burn_holdings(burner.as_ref(), asset).await {
            Ok(burned) => burned,
            Err(e) => {
                warn!(asset, sol_spent = amount, buy_tx = %fill.signature, error = %e, "Bought but not burned");
                self.commit(|ledger| ledger.record_unburned(amount)).await;
                return Err(e);
            }
        };

        let event = BurnEvent {
            asset: asset.to_string(),
            sol_spent: amount,
            raw_amount,
            tokens,
            buy_tx: fill.signature,
            burn_tx,
            at: Utc::now(),
        };

        self.commit(|ledger| ledger.record(event.clone())).await;

        info!(
            asset = %event.asset,
            sol_spent = event.sol_spent,
            tokens = event.tokens,
            burn_tx = %event.burn_tx,
            "Profit allocated and burned"
        );
        Ok(Some(event))
    }

    /// Burn everything held of `asset`, including leftovers from earlier
    /// failed burns. Returns raw amount, whole tokens and the burn tx.
    async fn burn_holdings(&self, burner: &dyn AssetBurner, asset: &str) -> Result<(u64, f64, String)> {
        let decimals = self.gateway.get_asset_decimals(asset).await?;
        let tokens = self.gateway.get_asset_balance(asset).await?;
        let raw_amount = to_raw(tokens, decimals);
        if raw_amount == 0 {
            return Err(Error::Burn(format!("no {} balance to burn", asset)));
        }
        let burn_tx = burner.burn(asset, raw_amount).await?;
        Ok((raw_amount, tokens, burn_tx))
    }

    /// Update the ledger and persist the result
    async fn commit(&self, update: impl FnOnce(&mut BurnLedger)) {
        let snapshot = {
            let mut ledger = self.ledger.lock().await;
            update(&mut ledger);
            ledger.clone()
        };
        if let Err(e) = self.store.save_burn_ledger(&snapshot).await {
            warn!(error = %e, "Failed to persist burn ledger");
        }
    }

    /// Fire-and-forget allocation on `tasks`; errors are logged only
    pub fn spawn(&self, tasks: &mut JoinSet<()>, request: AllocationRequest) {
        let allocator = self.clone();
        tasks.spawn(async move {
            if let Err(e) = allocator.allocate(request).await {
                error!(error = %e, "Profit allocation failed");
            }
        });
    }
}
