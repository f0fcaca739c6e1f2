//! Per-signal outcome statistics
//!
//! Every closed position feeds its entry signals here. Signals with a
//! track record then nudge future scores up or down.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// Trades required before a signal influences scoring
pub const MIN_TRADES_FOR_ADJUSTMENT: u32 = 3;

/// Corruption guard: this many mature signals...
const POISON_MIN_SIGNALS: usize = 5;
/// ...with an aggregate win rate below this are treated as poisoned
const POISON_MAX_WIN_RATE: f64 = 0.05;

/// Memory notes written by the broken accounting path; purged on heal/reset
pub const POISONED_MEMORY_KEYWORDS: &[&str] = &["LOSS", "FAILED"];

/// Aggregated statistics for one normalized signal key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalPerformance {
    pub signal: String,
    pub total_trades: u32,
    pub wins: u32,
    pub losses: u32,
    pub total_pnl_sol: f64,
    pub last_updated: DateTime<Utc>,
}

impl SignalPerformance {
    pub fn new(signal: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            signal: signal.into(),
            total_trades: 0,
            wins: 0,
            losses: 0,
            total_pnl_sol: 0.0,
            last_updated: now,
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.total_trades == 0 {
            return 0.0;
        }
        self.wins as f64 / self.total_trades as f64
    }

    pub fn avg_pnl_sol(&self) -> f64 {
        if self.total_trades == 0 {
            return 0.0;
        }
        self.total_pnl_sol / self.total_trades as f64
    }

    /// Score adjustment earned by this signal's track record
    pub fn adjustment(&self) -> f64 {
        if self.total_trades < MIN_TRADES_FOR_ADJUSTMENT {
            return 0.0;
        }

        let win_rate = self.win_rate();
        if win_rate >= 0.7 {
            10.0
        } else if win_rate >= 0.5 {
            5.0
        } else if win_rate <= 0.3 {
            -10.0
        } else if win_rate <= 0.4 {
            -5.0
        } else {
            0.0
        }
    }

    pub fn record(&mut self, pnl_sol: f64, now: DateTime<Utc>) {
        self.total_trades += 1;
        if pnl_sol > 0.0 {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        self.total_pnl_sol += pnl_sol;
        self.last_updated = now;
    }
}

/// In-memory signal table (authoritative; the store is a write-through copy)
#[derive(Debug, Clone, Default)]
pub struct SignalTracker {
    signals: HashMap<String, SignalPerformance>,
}

impl SignalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted rows.
    ///
    /// Returns the tracker and whether the corruption guard wiped the data.
    pub fn from_records(records: Vec<SignalPerformance>) -> (Self, bool) {
        let tracker = Self {
            signals: records
                .into_iter()
                .map(|record| (record.signal.clone(), record))
                .collect(),
        };

        if tracker.is_poisoned() {
            warn!(
                signals = tracker.signals.len(),
                win_rate = format!("{:.1}%", tracker.aggregate_win_rate() * 100.0),
                "Learning data looks poisoned, resetting"
            );
            return (Self::new(), true);
        }

        info!("Loaded {} learned signals", tracker.signals.len());
        (tracker, false)
    }

    /// Record one closed position's outcome against each of its entry signals
    pub fn record_outcome(&mut self, signals: &[String], pnl_sol: f64, now: DateTime<Utc>) {
        let mut seen: Vec<&str> = Vec::with_capacity(signals.len());
        for signal in signals {
            if signal.is_empty() || seen.contains(&signal.as_str()) {
                continue;
            }
            seen.push(signal);
            self.signals
                .entry(signal.clone())
                .or_insert_with(|| SignalPerformance::new(signal.clone(), now))
                .record(pnl_sol, now);
        }
    }

    pub fn adjustment_for(&self, signal: &str) -> f64 {
        self.signals
            .get(signal)
            .map(SignalPerformance::adjustment)
            .unwrap_or(0.0)
    }

    /// Summed adjustment across signals, floored so stacked penalties cannot
    /// push a candidate permanently out of reach
    pub fn total_adjustment(&self, signals: &[String], floor: f64) -> f64 {
        let sum: f64 = signals.iter().map(|s| self.adjustment_for(s)).sum();
        sum.max(floor)
    }

    pub fn get(&self, signal: &str) -> Option<&SignalPerformance> {
        self.signals.get(signal)
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Snapshot of every row, sorted by trade count (most traded first)
    pub fn records(&self) -> Vec<SignalPerformance> {
        let mut rows: Vec<SignalPerformance> = self.signals.values().cloned().collect();
        rows.sort_by(|a, b| {
            b.total_trades
                .cmp(&a.total_trades)
                .then_with(|| a.signal.cmp(&b.signal))
        });
        rows
    }

    /// Rows for the given keys only (used for write-through after a close)
    pub fn records_for(&self, signals: &[String]) -> Vec<SignalPerformance> {
        signals
            .iter()
            .filter_map(|s| self.signals.get(s).cloned())
            .collect()
    }

    fn mature(&self) -> impl Iterator<Item = &SignalPerformance> {
        self.signals
            .values()
            .filter(|s| s.total_trades >= MIN_TRADES_FOR_ADJUSTMENT)
    }

    fn aggregate_win_rate(&self) -> f64 {
        let (wins, trades) = self
            .mature()
            .fold((0u32, 0u32), |(w, t), s| (w + s.wins, t + s.total_trades));
        if trades == 0 {
            return 0.0;
        }
        wins as f64 / trades as f64
    }

    /// Statistical heuristic for the historical accounting bug that recorded
    /// every close as a loss
    pub fn is_poisoned(&self) -> bool {
        self.mature().count() >= POISON_MIN_SIGNALS && self.aggregate_win_rate() < POISON_MAX_WIN_RATE
    }

    pub fn reset(&mut self) {
        self.signals.clear();
    }
}
