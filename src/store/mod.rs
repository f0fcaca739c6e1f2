//! Persistence
//!
//! Write-through copy of engine state. The engine's in-memory tables stay
//! authoritative; a failing store only costs durability.

mod json;
mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::allocation::BurnLedger;
use crate::config::ConfigOverrides;
use crate::error::Result;
use crate::learning::SignalPerformance;
use crate::position::Position;

/// CRUD contract; every write is an upsert
#[async_trait]
pub trait Store: Send + Sync {
    async fn load_positions(&self) -> Result<Vec<Position>>;

    async fn upsert_position(&self, position: &Position) -> Result<()>;

    async fn load_signals(&self) -> Result<Vec<SignalPerformance>>;

    async fn upsert_signals(&self, records: &[SignalPerformance]) -> Result<()>;

    async fn clear_signals(&self) -> Result<()>;

    async fn load_burn_ledger(&self) -> Result<Option<BurnLedger>>;

    async fn save_burn_ledger(&self, ledger: &BurnLedger) -> Result<()>;

    async fn load_overrides(&self) -> Result<Option<ConfigOverrides>>;

    async fn save_overrides(&self, overrides: &ConfigOverrides) -> Result<()>;
}
