//! Position book
//!
//! In-memory table of every position this process knows about, rehydrated
//! from the store at startup and written through on every mutation.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use super::types::{Position, TradeStats};
use crate::store::Store;

pub struct PositionBook {
    positions: HashMap<String, Position>,
    store: Arc<dyn Store>,
}

impl PositionBook {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            positions: HashMap::new(),
            store,
        }
    }

    /// Rehydrate from the store; an unavailable store starts empty
    pub async fn load(store: Arc<dyn Store>) -> Self {
        let mut book = Self::new(store);
        match book.store.load_positions().await {
            Ok(positions) => {
                book.positions = positions.into_iter().map(|p| (p.id.clone(), p)).collect();
                info!(
                    total = book.positions.len(),
                    open = book.open_ids().len(),
                    "Loaded positions"
                );
            }
            Err(e) => warn!(error = %e, "Position store unavailable, running in-memory only"),
        }
        book
    }

    pub async fn insert(&mut self, position: Position) {
        let id = position.id.clone();
        self.positions.insert(id.clone(), position);
        self.persist(&id).await;
    }

    /// Write one position through to the store
    pub async fn persist(&self, id: &str) {
        let Some(position) = self.positions.get(id) else {
            return;
        };
        if let Err(e) = self.store.upsert_position(position).await {
            warn!(position = %id, error = %e, "Failed to persist position");
        }
    }

    pub fn get(&self, id: &str) -> Option<&Position> {
        self.positions.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Position> {
        self.positions.get_mut(id)
    }

    /// Look up by id, or by asset (an open position for the asset wins)
    pub fn find(&self, key: &str) -> Option<&Position> {
        if let Some(position) = self.positions.get(key) {
            return Some(position);
        }
        let mut matches: Vec<&Position> = self.positions.values().filter(|p| p.asset == key).collect();
        matches.sort_by(|a, b| {
            b.is_open()
                .cmp(&a.is_open())
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        matches.into_iter().next()
    }

    /// Open positions, oldest first
    pub fn open_positions(&self) -> Vec<&Position> {
        let mut open: Vec<&Position> = self.positions.values().filter(|p| p.is_open()).collect();
        open.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        open
    }

    pub fn open_ids(&self) -> Vec<String> {
        self.open_positions().into_iter().map(|p| p.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn stats(&self) -> TradeStats {
        TradeStats::from_positions(self.positions.values())
    }

    pub fn total_exposure(&self) -> f64 {
        self.open_positions().iter().map(|p| p.amount_sol).sum()
    }

    /// Realized PnL across every position, including partial legs of open ones
    pub fn net_realized_pnl(&self) -> f64 {
        self.positions.values().map(|p| p.realized_pnl).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{ExitReason, NewPosition};
    use crate::store::MemoryStore;
    use crate::testing::FailingStore;
    use chrono::{Duration, Utc};

    fn position(asset: &str, amount: f64) -> Position {
        Position::open(
            NewPosition {
                asset: asset.into(),
                symbol: asset.into(),
                amount_sol: amount,
                token_amount: 1000.0,
                entry_tx: "sig".into(),
                reasons: vec![],
                signals: vec![],
                score: 60.0,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_write_through_and_reload() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let mut book = PositionBook::new(store.clone());
        let p = position("A", 0.1);
        let id = p.id.clone();
        book.insert(p).await;

        book.get_mut(&id).unwrap().tiers_sold = 1;
        book.persist(&id).await;

        let reloaded = PositionBook::load(store).await;
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get(&id).unwrap().tiers_sold, 1);
    }

    #[tokio::test]
    async fn test_exposure_and_stats() {
        let mut book = PositionBook::new(Arc::new(MemoryStore::new()));
        book.insert(position("A", 0.1)).await;
        let mut closed = position("B", 0.2);
        closed.apply_full_close(0.3, "x".into(), ExitReason::TakeProfit, "done".into(), Utc::now());
        book.insert(closed).await;

        assert!((book.total_exposure() - 0.1).abs() < 1e-12);
        assert!((book.net_realized_pnl() - 0.1).abs() < 1e-12);
        let stats = book.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.wins, 1);
    }

    #[tokio::test]
    async fn test_find_prefers_open_position_for_asset() {
        let mut book = PositionBook::new(Arc::new(MemoryStore::new()));
        let mut old = position("A", 0.1);
        old.created_at = Utc::now() - Duration::hours(2);
        old.mark_failed(ExitReason::NoPriceData, "gone".into(), 0.0, Utc::now());
        let open = position("A", 0.1);
        let open_id = open.id.clone();
        book.insert(old).await;
        book.insert(open).await;

        assert_eq!(book.find("A").unwrap().id, open_id);
        assert_eq!(book.find(&open_id).unwrap().id, open_id);
        assert!(book.find("missing").is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_degrades() {
        let mut book = PositionBook::load(Arc::new(FailingStore)).await;
        assert!(book.is_empty());
        book.insert(position("A", 0.1)).await;
        assert_eq!(book.open_positions().len(), 1);
    }
}
