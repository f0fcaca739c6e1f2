//! Self-learning feedback loop
//!
//! Reasons attached at entry are normalized into signal keys; each close
//! updates the keys' win/loss record, which in turn adjusts future scores.

pub mod normalize;
pub mod tracker;

pub use normalize::{normalize_all, normalize_signal};
pub use tracker::{
    SignalPerformance, SignalTracker, MIN_TRADES_FOR_ADJUSTMENT, POISONED_MEMORY_KEYWORDS,
};
