//! Trade memory
//!
//! Durable free-text notes per trade event. The evaluator recalls notes for
//! an asset before scoring it; the learning reset purges poisoned notes.

mod jsonl;

pub use jsonl::{InMemoryJournal, JsonlJournal};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Words in a note that mark a bad prior experience
pub const NEGATIVE_KEYWORDS: &[&str] = &["LOSS", "RUG", "FAILED"];
/// Words in a note that mark a good prior experience
pub const POSITIVE_KEYWORDS: &[&str] = &["WIN"];

/// A single durable note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryNote {
    pub asset: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl MemoryNote {
    pub fn new(asset: impl Into<String>, content: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            asset: asset.into(),
            content: content.into(),
            created_at: now,
        }
    }

    /// Whole-word, case-sensitive match against any of `keywords`
    pub fn mentions_any(&self, keywords: &[&str]) -> bool {
        self.content
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|word| keywords.contains(&word))
    }
}

/// Store of trade notes
#[async_trait]
pub trait TradeMemory: Send + Sync {
    /// Append a note
    async fn record(&self, note: MemoryNote) -> Result<()>;

    /// Most recent notes about `asset`, newest first
    async fn recall(&self, asset: &str, limit: usize) -> Result<Vec<MemoryNote>>;

    /// Delete every note mentioning one of `keywords`; returns how many were removed
    async fn delete_matching(&self, keywords: &[&str]) -> Result<usize>;
}

/// What prior notes say about an asset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MemoryVerdict {
    #[default]
    Unknown,
    /// At least one note carries a negative outcome
    Negative,
    /// Positive notes only
    Positive,
}

impl MemoryVerdict {
    /// Score points applied by the evaluator
    pub fn score_adjustment(&self) -> f64 {
        match self {
            MemoryVerdict::Unknown => 0.0,
            MemoryVerdict::Negative => -15.0,
            MemoryVerdict::Positive => 5.0,
        }
    }
}

pub fn classify_notes(notes: &[MemoryNote]) -> MemoryVerdict {
    if notes.iter().any(|n| n.mentions_any(NEGATIVE_KEYWORDS)) {
        MemoryVerdict::Negative
    } else if notes.iter().any(|n| n.mentions_any(POSITIVE_KEYWORDS)) {
        MemoryVerdict::Positive
    } else {
        MemoryVerdict::Unknown
    }
}
