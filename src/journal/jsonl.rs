//! Journal backends: append-only JSON lines on disk, and an in-memory list

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::{MemoryNote, TradeMemory};
use crate::error::{Error, Result};

/// One JSON note per line
pub struct JsonlJournal {
    path: PathBuf,
    /// Serializes appends against the rewrite in `delete_matching`
    lock: Mutex<()>,
}

impl JsonlJournal {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<Vec<MemoryNote>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::Journal(e.to_string()))?;

        // A torn last line is skipped rather than failing the whole journal
        Ok(data
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

#[async_trait]
impl TradeMemory for JsonlJournal {
    async fn record(&self, note: MemoryNote) -> Result<()> {
        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Journal(e.to_string()))?;
        }

        let mut line = serde_json::to_string(&note)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::Journal(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| Error::Journal(e.to_string()))?;
        file.flush().await.map_err(|e| Error::Journal(e.to_string()))?;
        Ok(())
    }

    async fn recall(&self, asset: &str, limit: usize) -> Result<Vec<MemoryNote>> {
        let _guard = self.lock.lock().await;
        let mut notes: Vec<MemoryNote> = self
            .read_all()
            .await?
            .into_iter()
            .filter(|n| n.asset == asset)
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notes.truncate(limit);
        Ok(notes)
    }

    async fn delete_matching(&self, keywords: &[&str]) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let notes = self.read_all().await?;
        let before = notes.len();
        let kept: Vec<MemoryNote> = notes
            .into_iter()
            .filter(|n| !n.mentions_any(keywords))
            .collect();
        let removed = before - kept.len();
        if removed == 0 {
            return Ok(0);
        }

        let mut data = String::new();
        for note in &kept {
            data.push_str(&serde_json::to_string(note)?);
            data.push('\n');
        }
        tokio::fs::write(&self.path, data)
            .await
            .map_err(|e| Error::Journal(e.to_string()))?;

        debug!("Purged {} journal notes", removed);
        Ok(removed)
    }
}

/// Process-local journal
#[derive(Default)]
pub struct InMemoryJournal {
    notes: Mutex<Vec<MemoryNote>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.notes.lock().await.len()
    }
}

#[async_trait]
impl TradeMemory for InMemoryJournal {
    async fn record(&self, note: MemoryNote) -> Result<()> {
        self.notes.lock().await.push(note);
        Ok(())
    }

    async fn recall(&self, asset: &str, limit: usize) -> Result<Vec<MemoryNote>> {
        let notes = self.notes.lock().await;
        Ok(notes
            .iter()
            .rev()
            .filter(|n| n.asset == asset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn delete_matching(&self, keywords: &[&str]) -> Result<usize> {
        let mut notes = self.notes.lock().await;
        let before = notes.len();
        notes.retain(|n| !n.mentions_any(keywords));
        Ok(before - notes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_jsonl_record_recall_delete() {
        let dir = tempfile::tempdir().unwrap();
        let journal = JsonlJournal::new(dir.path().join("journal.jsonl"));
        let now = Utc::now();

        journal
            .record(MemoryNote::new("A", "WIN A +0.1 SOL", now - Duration::minutes(5)))
            .await
            .unwrap();
        journal
            .record(MemoryNote::new("A", "LOSS A -0.1 SOL", now))
            .await
            .unwrap();
        journal
            .record(MemoryNote::new("B", "ENTRY B 0.1 SOL", now))
            .await
            .unwrap();

        let recalled = journal.recall("A", 10).await.unwrap();
        assert_eq!(recalled.len(), 2);
        assert!(recalled[0].content.starts_with("LOSS"));

        let removed = journal.delete_matching(&["LOSS", "FAILED"]).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(journal.recall("A", 10).await.unwrap().len(), 1);
        assert_eq!(journal.recall("B", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_recalls_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let journal = JsonlJournal::new(dir.path().join("none.jsonl"));
        assert!(journal.recall("A", 5).await.unwrap().is_empty());
        assert_eq!(journal.delete_matching(&["LOSS"]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_in_memory_recall_newest_first() {
        let journal = InMemoryJournal::new();
        let now = Utc::now();
        journal.record(MemoryNote::new("A", "first", now)).await.unwrap();
        journal.record(MemoryNote::new("A", "second", now)).await.unwrap();
        let notes = journal.recall("A", 1).await.unwrap();
        assert_eq!(notes[0].content, "second");
    }
}
