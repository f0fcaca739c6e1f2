//! Trading engine
//!
//! Owns every piece of mutable state (position book, governor, learned
//! signals) and drives the two passes of a tick: evaluation of new
//! candidates, then exit checks over open positions. All mutation happens
//! through `&mut self`, so ticks and position checks never overlap.
//! Memory notes and profit allocations run detached on `background`.

mod evaluation;
mod lifecycle;

#[cfg(test)]
mod harness;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::allocation::{AllocationRequest, BurnLedger, ProfitAllocator};
use crate::config::{Config, ConfigLoader, ConfigOverrides};
use crate::error::{Error, Result};
use crate::journal::{MemoryNote, TradeMemory};
use crate::learning::{SignalPerformance, SignalTracker, POISONED_MEMORY_KEYWORDS};
use crate::market::MarketData;
use crate::notify::{Notifier, TradeSignal};
use crate::position::{Position, PositionBook, TradeStats};
use crate::store::Store;
use crate::strategy::portfolio_risk::{PortfolioRiskConfig, PortfolioRiskGovernor, PortfolioState};
use crate::trading::{AssetBurner, ExecutionGateway};

/// External collaborators wired in by the composition root
pub struct Collaborators {
    pub gateway: Arc<dyn ExecutionGateway>,
    /// Required only when profit allocation is enabled
    pub burner: Option<Arc<dyn AssetBurner>>,
    pub market: Arc<dyn MarketData>,
    pub store: Arc<dyn Store>,
    pub memory: Arc<dyn TradeMemory>,
    pub notifier: Arc<dyn Notifier>,
}

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub evaluated: usize,
    pub accepted: usize,
    pub opened: usize,
    pub exits: usize,
    pub partials: usize,
    pub failures: usize,
}

/// Snapshot for the status command
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub open_positions: Vec<Position>,
    pub stats: TradeStats,
    pub portfolio: PortfolioState,
    pub burn_ledger: BurnLedger,
    pub learned_signals: usize,
}

pub struct Engine {
    loader: ConfigLoader,
    config: Config,
    book: PositionBook,
    governor: PortfolioRiskGovernor,
    tracker: SignalTracker,
    allocator: ProfitAllocator,
    gateway: Arc<dyn ExecutionGateway>,
    market: Arc<dyn MarketData>,
    store: Arc<dyn Store>,
    memory: Arc<dyn TradeMemory>,
    notifier: Arc<dyn Notifier>,
    background: JoinSet<()>,
}

impl Engine {
    /// Build the effective config, rehydrate state from the store and heal
    /// poisoned learning data. Configuration problems are fatal.
    pub async fn start(loader: ConfigLoader, parts: Collaborators) -> Result<Self> {
        let overrides = match parts.store.load_overrides().await {
            Ok(Some(overrides)) => overrides,
            Ok(None) => ConfigOverrides::new(),
            Err(e) => {
                warn!(error = %e, "Persisted config overrides unavailable, using file and environment only");
                ConfigOverrides::new()
            }
        };
        let loader = loader.with_overrides(overrides);
        let config = loader
            .build()
            .map_err(|e| Error::Config(format!("{:#}", e)))?;

        let allocator = ProfitAllocator::new(parts.gateway.clone(), parts.burner, parts.store.clone());
        if config.allocation.enabled && !allocator.has_burner() {
            return Err(Error::Config(
                "allocation is enabled but this gateway cannot burn".to_string(),
            ));
        }

        let now = Utc::now();
        let book = PositionBook::load(parts.store.clone()).await;
        let mut governor = PortfolioRiskGovernor::new(PortfolioRiskConfig::from_config(&config), now);
        for position in book.open_positions() {
            governor.register_open(&position.id, &position.asset, position.amount_sol);
        }

        let records = match parts.store.load_signals().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Learning store unavailable, starting with no learned signals");
                Vec::new()
            }
        };
        let (tracker, poisoned) = SignalTracker::from_records(records);

        allocator.load().await;

        let mut engine = Self {
            loader,
            config,
            book,
            governor,
            tracker,
            allocator,
            gateway: parts.gateway,
            market: parts.market,
            store: parts.store,
            memory: parts.memory,
            notifier: parts.notifier,
            background: JoinSet::new(),
        };

        if poisoned {
            engine.purge_learning().await;
        }

        info!(
            open = engine.governor.open_count(),
            exposure_sol = engine.governor.total_exposure(),
            signals = engine.tracker.len(),
            wallet = %engine.gateway.wallet_address(),
            "Engine started"
        );
        Ok(engine)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn book(&self) -> &PositionBook {
        &self.book
    }

    pub async fn tick(&mut self) -> TickReport {
        self.tick_at(Utc::now()).await
    }

    /// One driver tick: evaluation pass, then position pass
    pub async fn tick_at(&mut self, now: DateTime<Utc>) -> TickReport {
        self.reap_background();
        self.governor.maybe_reset_decided(now);

        let mut report = TickReport::default();
        self.evaluation_pass(now, &mut report).await;
        self.position_pass(now, &mut report).await;

        if report != TickReport::default() {
            debug!(?report, "Tick complete");
        }
        report
    }

    /// Tick until `shutdown` resolves, then drain detached work
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(interval_ms = self.config.trading.tick_interval_ms, "Driver running");

        loop {
            self.tick().await;

            let interval = Duration::from_millis(self.config.trading.tick_interval_ms);
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }

        self.shutdown().await;
    }

    /// Wait for detached memory writes and allocations to finish
    pub async fn shutdown(&mut self) {
        let pending = self.background.len();
        if pending > 0 {
            info!(pending, "Waiting for background tasks");
        }
        while let Some(result) = self.background.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Background task panicked");
            }
        }
    }

    /// Manual override: full close with reason `manual`. Closing a position
    /// that is already terminal is a no-op.
    pub async fn sell(&mut self, key: &str) -> Result<Position> {
        let id = self
            .book
            .find(key)
            .map(|p| p.id.clone())
            .ok_or_else(|| Error::PositionNotFound(key.to_string()))?;

        self.manual_close(&id, Utc::now()).await?;

        self.book
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::PositionNotFound(id))
    }

    /// Apply and persist one runtime setting (dotted key, JSON value).
    /// The live config is untouched unless the rebuilt config validates.
    pub async fn set_config_value(&mut self, key: &str, value: serde_json::Value) -> Result<()> {
        let key = key.to_lowercase();
        if !self.config.has_key(&key) {
            return Err(Error::Config(format!("unknown setting: {}", key)));
        }

        let mut overrides = self.loader.overrides.clone();
        overrides.set(&key, value);
        let loader = self.loader.clone().with_overrides(overrides);
        let config = loader
            .build()
            .map_err(|e| Error::Config(format!("{:#}", e)))?;
        if config.allocation.enabled && !self.allocator.has_burner() {
            return Err(Error::Config(
                "allocation is enabled but this gateway cannot burn".to_string(),
            ));
        }

        if let Err(e) = self.store.save_overrides(&loader.overrides).await {
            warn!(key = %key, error = %e, "Failed to persist config override, change is in-memory only");
        }

        self.governor
            .set_config(PortfolioRiskConfig::from_config(&config));
        self.loader = loader;
        self.config = config;
        info!(key = %key, "Config updated");
        Ok(())
    }

    /// Forget every learned signal and purge poisoned memory notes.
    /// Returns how many notes were deleted.
    pub async fn reset_learning(&mut self) -> usize {
        self.purge_learning().await
    }

    pub fn learning_stats(&self) -> Vec<SignalPerformance> {
        self.tracker.records()
    }

    pub async fn status(&self) -> EngineStatus {
        EngineStatus {
            open_positions: self.book.open_positions().into_iter().cloned().collect(),
            stats: self.book.stats(),
            portfolio: self.governor.get_state(),
            burn_ledger: self.allocator.ledger().await,
            learned_signals: self.tracker.len(),
        }
    }

    async fn purge_learning(&mut self) -> usize {
        self.tracker.reset();
        if let Err(e) = self.store.clear_signals().await {
            warn!(error = %e, "Failed to clear persisted signals");
        }
        let purged = match self.memory.delete_matching(POISONED_MEMORY_KEYWORDS).await {
            Ok(purged) => purged,
            Err(e) => {
                warn!(error = %e, "Failed to purge memory notes");
                0
            }
        };
        info!(purged_notes = purged, "Learning reset");
        purged
    }

    fn reap_background(&mut self) {
        while let Some(result) = self.background.try_join_next() {
            if let Err(e) = result {
                error!(error = %e, "Background task panicked");
            }
        }
    }

    /// Detached, error-logged memory write
    fn remember(&mut self, note: MemoryNote) {
        let memory = self.memory.clone();
        self.background.spawn(async move {
            if let Err(e) = memory.record(note).await {
                warn!(error = %e, "Failed to write memory note");
            }
        });
    }

    /// Detached profit allocation for a profitable close
    fn allocate(&mut self, profit_sol: f64) {
        if !self.config.allocation.enabled {
            return;
        }
        let request = AllocationRequest {
            config: self.config.allocation.clone(),
            profit_sol,
            net_pnl_sol: self.book.net_realized_pnl(),
            slippage_bps: self.config.trading.slippage_bps,
            priority_fee_sol: self.config.gateway.priority_fee_sol,
        };
        self.allocator.spawn(&mut self.background, request);
    }

    async fn notify(&self, signal: TradeSignal) {
        if let Err(e) = self.notifier.notify(&signal).await {
            warn!(asset = %signal.asset(), error = %e, "Notification failed");
        }
    }
}
