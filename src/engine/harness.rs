//! Engine wired to in-memory collaborators

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use super::{Collaborators, Engine};
use crate::config::{ConfigLoader, ConfigOverrides};
use crate::error::Result;
use crate::filter::{Candidate, TokenMetrics};
use crate::journal::InMemoryJournal;
use crate::store::{MemoryStore, Store};
use crate::testing::{MockGateway, MockMarket, RecordingNotifier};
use crate::trading::AssetBurner;

pub const BURN_ASSET: &str = "BurnMint";

pub struct Harness {
    pub engine: Engine,
    pub market: Arc<MockMarket>,
    pub gateway: Arc<MockGateway>,
    pub store: Arc<MemoryStore>,
    pub memory: Arc<InMemoryJournal>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    /// Collaborators sharing this harness' state, for a restart
    pub fn parts(&self) -> Collaborators {
        Collaborators {
            gateway: self.gateway.clone(),
            burner: Some(self.gateway.clone() as Arc<dyn AssetBurner>),
            market: self.market.clone(),
            store: self.store.clone(),
            memory: self.memory.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

/// No config file; everything comes from defaults and store overrides
pub fn test_loader() -> ConfigLoader {
    ConfigLoader::new("/nonexistent/trader-test.toml")
}

pub async fn harness(overrides: &[(&str, Value)]) -> Harness {
    harness_with(
        Arc::new(MemoryStore::new()),
        Arc::new(InMemoryJournal::new()),
        overrides,
        true,
    )
    .await
    .unwrap()
}

pub async fn harness_with(
    store: Arc<MemoryStore>,
    memory: Arc<InMemoryJournal>,
    overrides: &[(&str, Value)],
    with_burner: bool,
) -> Result<Harness> {
    let mut persisted = ConfigOverrides::new();
    persisted.set("trading.evaluation_delay_ms", Value::from(0));
    for (key, value) in overrides {
        persisted.set(key, value.clone());
    }
    store.save_overrides(&persisted).await?;

    let market = Arc::new(MockMarket::new());
    let gateway = Arc::new(MockGateway::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let parts = Collaborators {
        gateway: gateway.clone(),
        burner: if with_burner {
            Some(gateway.clone() as Arc<dyn AssetBurner>)
        } else {
            None
        },
        market: market.clone(),
        store: store.clone(),
        memory: memory.clone(),
        notifier: notifier.clone(),
    };

    let engine = Engine::start(test_loader(), parts).await?;
    Ok(Harness {
        engine,
        market,
        gateway,
        store,
        memory,
        notifier,
    })
}

/// Scores 101 with an empty journal, sizes to 0.25 SOL
pub fn strong_metrics(now: DateTime<Utc>) -> TokenMetrics {
    TokenMetrics {
        price_sol: 0.000_001,
        price_usd: 0.0002,
        market_cap_usd: 200_000.0,
        volume_24h_usd: 250_000.0,
        volume_1h_usd: 20_000.0,
        liquidity_usd: 60_000.0,
        liquidity_sol: Some(400.0),
        holders: Some(800),
        buys_24h: 900,
        sells_24h: 300,
        buys_5m: 10,
        sells_5m: 4,
        price_change_24h_pct: 80.0,
        pair_created_at: Some(now - Duration::hours(3)),
    }
}

pub fn candidate(asset: &str) -> Candidate {
    Candidate::new(asset, "TEST")
}

/// Make `asset` discoverable, tradable and strong
pub fn list(h: &Harness, asset: &str, now: DateTime<Utc>) {
    h.market.add_candidate(candidate(asset));
    h.market.set_metrics(asset, strong_metrics(now));
    h.gateway.set_price(asset, 0.000_001);
}

/// Move both the observed and the executable price
pub fn reprice(h: &Harness, asset: &str, price: f64) {
    h.market.update_metrics(asset, |m| m.price_sol = price);
    h.gateway.set_price(asset, price);
}

/// Enter `asset` at 1e-6 SOL per token with 0.25 SOL; returns the position id
pub async fn open(h: &mut Harness, asset: &str, now: DateTime<Utc>) -> String {
    list(h, asset, now);
    h.engine.tick_at(now).await;
    h.engine.shutdown().await;
    h.engine
        .book()
        .find(asset)
        .map(|p| p.id.clone())
        .unwrap()
}
