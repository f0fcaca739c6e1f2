//! Position lifecycle
//!
//! `open -> {closed, failed}`. Exit rules decide, the book owns the state,
//! the seller executes.

pub mod exit;
pub mod manager;
pub mod seller;
pub mod types;

pub use exit::{check_exit, ExitDecision, Observation, NO_PRICE_TICK_LIMIT};
pub use manager::PositionBook;
pub use seller::{BalanceCheck, SellFill, MAX_SELL_ATTEMPTS};
pub use types::{ExitReason, NewPosition, Position, PositionStatus, TradeStats};
