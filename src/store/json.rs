//! JSON documents under a data directory

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use super::Store;
use crate::allocation::BurnLedger;
use crate::config::ConfigOverrides;
use crate::error::{Error, Result};
use crate::learning::SignalPerformance;
use crate::position::Position;

const POSITIONS_FILE: &str = "positions.json";
const SIGNALS_FILE: &str = "signals.json";
const BURNS_FILE: &str = "burns.json";
const OVERRIDES_FILE: &str = "config_overrides.json";

/// One pretty-printed JSON file per table
pub struct JsonFileStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    async fn read<T: DeserializeOwned>(&self, file: &str) -> Result<Option<T>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(None);
        }
        let data = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::Persistence(format!("{}: {}", path.display(), e)))?;
        let value = serde_json::from_str(&data)
            .map_err(|e| Error::Persistence(format!("{}: {}", path.display(), e)))?;
        Ok(Some(value))
    }

    /// Write to a temp file then rename, so a crash never leaves a torn document
    async fn write<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::Persistence(e.to_string()))?;
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!("{}.tmp", file));
        let data = serde_json::to_string_pretty(value)?;
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| Error::Persistence(format!("{}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::Persistence(format!("{}: {}", path.display(), e)))?;
        debug!(file, "Saved");
        Ok(())
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn load_positions(&self) -> Result<Vec<Position>> {
        let _guard = self.lock.lock().await;
        let table: BTreeMap<String, Position> = self.read(POSITIONS_FILE).await?.unwrap_or_default();
        Ok(table.into_values().collect())
    }

    async fn upsert_position(&self, position: &Position) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut table: BTreeMap<String, Position> =
            self.read(POSITIONS_FILE).await?.unwrap_or_default();
        table.insert(position.id.clone(), position.clone());
        self.write(POSITIONS_FILE, &table).await
    }

    async fn load_signals(&self) -> Result<Vec<SignalPerformance>> {
        let _guard = self.lock.lock().await;
        let table: BTreeMap<String, SignalPerformance> =
            self.read(SIGNALS_FILE).await?.unwrap_or_default();
        Ok(table.into_values().collect())
    }

    async fn upsert_signals(&self, records: &[SignalPerformance]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let _guard = self.lock.lock().await;
        let mut table: BTreeMap<String, SignalPerformance> =
            self.read(SIGNALS_FILE).await?.unwrap_or_default();
        for record in records {
            table.insert(record.signal.clone(), record.clone());
        }
        self.write(SIGNALS_FILE, &table).await
    }

    async fn clear_signals(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        let empty: BTreeMap<String, SignalPerformance> = BTreeMap::new();
        self.write(SIGNALS_FILE, &empty).await
    }

    async fn load_burn_ledger(&self) -> Result<Option<BurnLedger>> {
        let _guard = self.lock.lock().await;
        self.read(BURNS_FILE).await
    }

    async fn save_burn_ledger(&self, ledger: &BurnLedger) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.write(BURNS_FILE, ledger).await
    }

    async fn load_overrides(&self) -> Result<Option<ConfigOverrides>> {
        let _guard = self.lock.lock().await;
        self.read(OVERRIDES_FILE).await
    }

    async fn save_overrides(&self, overrides: &ConfigOverrides) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.write(OVERRIDES_FILE, overrides).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::NewPosition;
    use chrono::Utc;

    fn position(asset: &str) -> Position {
        Position::open(
            NewPosition {
                asset: asset.to_string(),
                symbol: "TEST".to_string(),
                amount_sol: 0.1,
                token_amount: 1000.0,
                entry_tx: "sig".to_string(),
                reasons: vec!["Strong volume".to_string()],
                signals: vec!["strong volume".to_string()],
                score: 70.0,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_positions_upsert_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load_positions().await.unwrap().is_empty());

        let mut p = position("A");
        store.upsert_position(&p).await.unwrap();
        p.tiers_sold = 1;
        store.upsert_position(&p).await.unwrap();
        store.upsert_position(&position("B")).await.unwrap();

        let loaded = store.load_positions().await.unwrap();
        assert_eq!(loaded.len(), 2);
        let a = loaded.iter().find(|x| x.id == p.id).unwrap();
        assert_eq!(a.tiers_sold, 1);
    }

    #[tokio::test]
    async fn test_signals_upsert_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let now = Utc::now();

        let mut row = SignalPerformance::new("strong volume", now);
        row.record(0.1, now);
        store.upsert_signals(&[row.clone()]).await.unwrap();
        row.record(-0.05, now);
        store.upsert_signals(&[row.clone()]).await.unwrap();

        let loaded = store.load_signals().await.unwrap();
        assert_eq!(loaded, vec![row]);

        store.clear_signals().await.unwrap();
        assert!(store.load_signals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overrides_and_ledger_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"));
        assert!(store.load_overrides().await.unwrap().is_none());

        let mut overrides = ConfigOverrides::new();
        overrides.set("exits.stop_loss_pct", serde_json::json!(20.0));
        store.save_overrides(&overrides).await.unwrap();
        assert_eq!(store.load_overrides().await.unwrap(), Some(overrides));

        let ledger = BurnLedger {
            events: 2,
            total_sol_spent: 0.3,
            ..Default::default()
        };
        store.save_burn_ledger(&ledger).await.unwrap();
        assert_eq!(store.load_burn_ledger().await.unwrap(), Some(ledger));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(POSITIONS_FILE), "{not json").unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(matches!(
            store.load_positions().await,
            Err(Error::Persistence(_))
        ));
    }
}
