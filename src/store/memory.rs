//! Process-local store (dry runs and tests)

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::Store;
use crate::allocation::BurnLedger;
use crate::config::ConfigOverrides;
use crate::error::Result;
use crate::learning::SignalPerformance;
use crate::position::Position;

#[derive(Default)]
struct Tables {
    positions: HashMap<String, Position>,
    signals: HashMap<String, SignalPerformance>,
    ledger: Option<BurnLedger>,
    overrides: Option<ConfigOverrides>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load_positions(&self) -> Result<Vec<Position>> {
        Ok(self.tables.lock().await.positions.values().cloned().collect())
    }

    async fn upsert_position(&self, position: &Position) -> Result<()> {
        self.tables
            .lock()
            .await
            .positions
            .insert(position.id.clone(), position.clone());
        Ok(())
    }

    async fn load_signals(&self) -> Result<Vec<SignalPerformance>> {
        Ok(self.tables.lock().await.signals.values().cloned().collect())
    }

    async fn upsert_signals(&self, records: &[SignalPerformance]) -> Result<()> {
        let mut tables = self.tables.lock().await;
        for record in records {
            tables.signals.insert(record.signal.clone(), record.clone());
        }
        Ok(())
    }

    async fn clear_signals(&self) -> Result<()> {
        self.tables.lock().await.signals.clear();
        Ok(())
    }

    async fn load_burn_ledger(&self) -> Result<Option<BurnLedger>> {
        Ok(self.tables.lock().await.ledger.clone())
    }

    async fn save_burn_ledger(&self, ledger: &BurnLedger) -> Result<()> {
        self.tables.lock().await.ledger = Some(ledger.clone());
        Ok(())
    }

    async fn load_overrides(&self) -> Result<Option<ConfigOverrides>> {
        Ok(self.tables.lock().await.overrides.clone())
    }

    async fn save_overrides(&self, overrides: &ConfigOverrides) -> Result<()> {
        self.tables.lock().await.overrides = Some(overrides.clone());
        Ok(())
    }
}
