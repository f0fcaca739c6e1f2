//! Pump.fun position manager library
//!
//! Scores discovered tokens, opens sized positions, walks each one through
//! its exit ladder, caps total exposure and learns from closed trades.
//! Part of realized profit can be recycled into a buy-and-burn.

pub mod allocation;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod journal;
pub mod learning;
pub mod market;
pub mod notify;
pub mod position;
pub mod store;
pub mod strategy;
pub mod trading;

#[cfg(test)]
pub mod testing;

// Re-export commonly used types
pub use config::Config;
pub use engine::Engine;
pub use error::{Error, Result};
