//! Candidate filtering and scoring
//!
//! Hard filters, weighted scoring, learned adjustments and position sizing.

pub mod scoring;
pub mod sizing;
pub mod types;

pub use scoring::{Evaluation, EvaluationContext, Evaluator, ACCEPT_THRESHOLD};
pub use sizing::{size_position, SizingBlock, MAX_ENTRY_IMPACT_PCT};
pub use types::{Candidate, Concentration, FeeActivity, SmartMoney, TokenMetrics};
