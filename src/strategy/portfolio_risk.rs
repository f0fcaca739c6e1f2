//! Exposure & Capacity Governor
//!
//! Global gate on evaluation and trading: open-position count, committed
//! capital, per-candidate evaluation cooldowns and the "already decided" set.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::config::Config;

/// Reasons why evaluation/trading is blocked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortfolioBlock {
    /// Trading switched off in config
    TradingDisabled,
    /// Maximum number of concurrent positions reached
    MaxPositionsReached { current: usize, max: usize },
    /// Maximum total exposure reached
    MaxExposureReached { current_sol: f64, max_sol: f64 },
}

impl PortfolioBlock {
    /// Get human-readable description
    pub fn description(&self) -> String {
        match self {
            PortfolioBlock::TradingDisabled => "Trading disabled".to_string(),
            PortfolioBlock::MaxPositionsReached { current, max } => {
                format!("Max positions reached: {}/{}", current, max)
            }
            PortfolioBlock::MaxExposureReached { current_sol, max_sol } => {
                format!("Max exposure reached: {:.3}/{:.3} SOL", current_sol, max_sol)
            }
        }
    }
}

/// Configuration for the governor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRiskConfig {
    pub enabled: bool,
    /// Maximum concurrent open positions
    pub max_concurrent_positions: usize,
    /// Maximum total capital at risk
    pub max_exposure_sol: f64,
    pub evaluation_cooldown_secs: u64,
    pub unhydrated_cooldown_secs: u64,
    pub decided_reset_secs: u64,
}

impl PortfolioRiskConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enabled: config.trading.enabled,
            max_concurrent_positions: config.trading.max_open_positions,
            max_exposure_sol: config.trading.max_total_exposure_sol,
            evaluation_cooldown_secs: config.governor.evaluation_cooldown_secs,
            unhydrated_cooldown_secs: config.governor.unhydrated_cooldown_secs,
            decided_reset_secs: config.governor.decided_reset_secs,
        }
    }
}

impl Default for PortfolioRiskConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Capital committed to one open position
#[derive(Debug, Clone, PartialEq)]
struct OpenExposure {
    asset: String,
    amount_sol: f64,
}

/// Current portfolio state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioState {
    pub open_position_count: usize,
    pub total_exposure_sol: f64,
    pub remaining_capacity_sol: f64,
    pub cooling_down: usize,
    pub decided: usize,
    pub can_open_new: bool,
    pub reason_if_blocked: Option<String>,
}

/// Portfolio Risk Governor
pub struct PortfolioRiskGovernor {
    config: PortfolioRiskConfig,
    /// Open positions by position id
    open: HashMap<String, OpenExposure>,
    /// Asset -> time before which it is not re-scored
    cooldowns: HashMap<String, DateTime<Utc>>,
    /// Assets already traded or rejected
    decided: HashSet<String>,
    last_decided_reset: DateTime<Utc>,
}

impl PortfolioRiskGovernor {
    /// Create a new portfolio risk governor
    pub fn new(config: PortfolioRiskConfig, now: DateTime<Utc>) -> Self {
        Self {
            config,
            open: HashMap::new(),
            cooldowns: HashMap::new(),
            decided: HashSet::new(),
            last_decided_reset: now,
        }
    }

    /// Swap limits after a runtime config change; tracked state is kept
    pub fn set_config(&mut self, config: PortfolioRiskConfig) {
        self.config = config;
    }

    pub fn total_exposure(&self) -> f64 {
        self.open.values().map(|e| e.amount_sol).sum()
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Gate for the evaluation pass
    pub fn can_trade(&self) -> Result<(), PortfolioBlock> {
        if !self.config.enabled {
            return Err(PortfolioBlock::TradingDisabled);
        }

        // Check position count
        if self.open.len() >= self.config.max_concurrent_positions {
            return Err(PortfolioBlock::MaxPositionsReached {
                current: self.open.len(),
                max: self.config.max_concurrent_positions,
            });
        }

        // Check total exposure
        let current_exposure = self.total_exposure();
        if current_exposure >= self.config.max_exposure_sol {
            return Err(PortfolioBlock::MaxExposureReached {
                current_sol: current_exposure,
                max_sol: self.config.max_exposure_sol,
            });
        }

        Ok(())
    }

    /// Get remaining capacity in SOL
    pub fn remaining_capacity(&self) -> f64 {
        (self.config.max_exposure_sol - self.total_exposure()).max(0.0)
    }

    /// Register a newly opened position
    pub fn register_open(&mut self, position_id: &str, asset: &str, amount_sol: f64) {
        self.open.insert(
            position_id.to_string(),
            OpenExposure {
                asset: asset.to_string(),
                amount_sol,
            },
        );
        self.decided.insert(asset.to_string());
    }

    /// Committed capital shrank after a partial close
    pub fn update_exposure(&mut self, position_id: &str, amount_sol: f64) {
        if let Some(exposure) = self.open.get_mut(position_id) {
            exposure.amount_sol = amount_sol;
        }
    }

    /// Position reached a terminal state
    pub fn release(&mut self, position_id: &str) {
        self.open.remove(position_id);
    }

    pub fn has_open_asset(&self, asset: &str) -> bool {
        self.open.values().any(|e| e.asset == asset)
    }

    /// Whether the asset may be scored right now
    pub fn should_evaluate(&self, asset: &str, now: DateTime<Utc>) -> bool {
        if self.decided.contains(asset) || self.has_open_asset(asset) {
            return false;
        }
        match self.cooldowns.get(asset) {
            Some(until) => now >= *until,
            None => true,
        }
    }

    /// Start the evaluation cooldown; unhydrated candidates get the short window
    pub fn mark_evaluated(&mut self, asset: &str, retry_soon: bool, now: DateTime<Utc>) {
        let secs = if retry_soon {
            self.config.unhydrated_cooldown_secs
        } else {
            self.config.evaluation_cooldown_secs
        };
        self.cooldowns
            .insert(asset.to_string(), now + Duration::seconds(secs as i64));
    }

    pub fn mark_decided(&mut self, asset: &str) {
        self.decided.insert(asset.to_string());
    }

    /// Periodically forget decisions so rejected assets can be reconsidered.
    /// Assets with an open position stay decided. Returns whether a reset ran.
    pub fn maybe_reset_decided(&mut self, now: DateTime<Utc>) -> bool {
        self.cooldowns.retain(|_, until| *until > now);

        if now - self.last_decided_reset < Duration::seconds(self.config.decided_reset_secs as i64) {
            return false;
        }

        let open_assets: HashSet<&str> = self.open.values().map(|e| e.asset.as_str()).collect();
        let before = self.decided.len();
        self.decided.retain(|asset| open_assets.contains(asset.as_str()));
        self.last_decided_reset = now;

        tracing::debug!(
            cleared = before - self.decided.len(),
            kept = self.decided.len(),
            "Reset decided set"
        );
        true
    }

    /// Get current portfolio state
    pub fn get_state(&self) -> PortfolioState {
        let can_open = self.can_trade();
        PortfolioState {
            open_position_count: self.open.len(),
            total_exposure_sol: self.total_exposure(),
            remaining_capacity_sol: self.remaining_capacity(),
            cooling_down: self.cooldowns.len(),
            decided: self.decided.len(),
            can_open_new: can_open.is_ok(),
            reason_if_blocked: can_open.err().map(|b| b.description()),
        }
    }
}
