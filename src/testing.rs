//! Hand-written collaborators for unit tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::allocation::BurnLedger;
use crate::config::ConfigOverrides;
use crate::error::{Error, Result};
use crate::filter::{Candidate, Concentration, TokenMetrics};
use crate::learning::SignalPerformance;
use crate::market::MarketData;
use crate::notify::{Notifier, TradeSignal};
use crate::position::Position;
use crate::store::Store;
use crate::trading::{
    from_raw, to_raw, AssetBurner, ExecutionGateway, Quote, SignablePayload, SubmitOptions,
    SubmitResult, SOL_DECIMALS, SOL_MINT,
};

pub const MOCK_TOKEN_DECIMALS: u8 = 6;

#[derive(Default)]
struct MarketState {
    candidates: Vec<Candidate>,
    metrics: HashMap<String, TokenMetrics>,
    sell_quotes: HashMap<String, f64>,
    concentration: HashMap<String, Concentration>,
    fail_aux: bool,
    metrics_calls: usize,
}

#[derive(Default)]
pub struct MockMarket {
    state: Mutex<MarketState>,
}

impl MockMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_candidates(&self, candidates: Vec<Candidate>) {
        self.state.lock().unwrap().candidates = candidates;
    }

    pub fn add_candidate(&self, candidate: Candidate) {
        self.state.lock().unwrap().candidates.push(candidate);
    }

    pub fn set_metrics(&self, asset: &str, metrics: TokenMetrics) {
        self.state.lock().unwrap().metrics.insert(asset.to_string(), metrics);
    }

    pub fn update_metrics(&self, asset: &str, update: impl FnOnce(&mut TokenMetrics)) {
        if let Some(m) = self.state.lock().unwrap().metrics.get_mut(asset) {
            update(m);
        }
    }

    pub fn remove_metrics(&self, asset: &str) {
        self.state.lock().unwrap().metrics.remove(asset);
    }

    /// SOL per whole token for the authoritative sell quote
    pub fn set_sell_price(&self, asset: &str, price: f64) {
        self.state.lock().unwrap().sell_quotes.insert(asset.to_string(), price);
    }

    pub fn set_concentration(&self, asset: &str, concentration: Concentration) {
        self.state
            .lock()
            .unwrap()
            .concentration
            .insert(asset.to_string(), concentration);
    }

    /// Make every auxiliary lookup error out
    pub fn fail_aux(&self, fail: bool) {
        self.state.lock().unwrap().fail_aux = fail;
    }

    pub fn metrics_calls(&self) -> usize {
        self.state.lock().unwrap().metrics_calls
    }
}

#[async_trait]
impl MarketData for MockMarket {
    async fn discover(&self, limit: usize) -> Result<Vec<Candidate>> {
        let state = self.state.lock().unwrap();
        Ok(state.candidates.iter().take(limit).cloned().collect())
    }

    async fn metrics(&self, asset: &str) -> Result<Option<TokenMetrics>> {
        let mut state = self.state.lock().unwrap();
        state.metrics_calls += 1;
        Ok(state.metrics.get(asset).cloned())
    }

    async fn sell_quote(&self, asset: &str, token_amount: f64) -> Result<Option<f64>> {
        let state = self.state.lock().unwrap();
        Ok(state.sell_quotes.get(asset).map(|price| price * token_amount))
    }

    async fn concentration(&self, asset: &str) -> Result<Option<Concentration>> {
        let state = self.state.lock().unwrap();
        if state.fail_aux {
            return Err(Error::MarketData("holder lookup down".into()));
        }
        Ok(state.concentration.get(asset).cloned())
    }

    async fn fee_activity(&self, _asset: &str) -> Result<Option<crate::filter::FeeActivity>> {
        if self.state.lock().unwrap().fail_aux {
            return Err(Error::MarketData("fee lookup down".into()));
        }
        Ok(None)
    }
}

struct GatewayState {
    prices: HashMap<String, f64>,
    token_balances: HashMap<String, f64>,
    sol_balance: f64,
    impact_pct: f64,
    fail_sells: bool,
    reject_sells: bool,
    fail_balance: bool,
    submits: usize,
    last_slippage: Option<u32>,
    burned: HashMap<String, u64>,
}

/// Fills at a fixed per-asset price and tracks balances
pub struct MockGateway {
    state: Mutex<GatewayState>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GatewayState {
                prices: HashMap::new(),
                token_balances: HashMap::new(),
                sol_balance: 10.0,
                impact_pct: 0.5,
                fail_sells: false,
                reject_sells: false,
                fail_balance: false,
                submits: 0,
                last_slippage: None,
                burned: HashMap::new(),
            }),
        }
    }

    pub fn set_price(&self, asset: &str, price: f64) {
        self.state.lock().unwrap().prices.insert(asset.to_string(), price);
    }

    pub fn set_token_balance(&self, asset: &str, tokens: f64) {
        self.state
            .lock()
            .unwrap()
            .token_balances
            .insert(asset.to_string(), tokens);
    }

    pub fn set_impact(&self, impact_pct: f64) {
        self.state.lock().unwrap().impact_pct = impact_pct;
    }

    /// Sell submissions come back unconfirmed
    pub fn fail_sells(&self, fail: bool) {
        self.state.lock().unwrap().fail_sells = fail;
    }

    /// Sell submissions are refused outright
    pub fn reject_sells(&self, reject: bool) {
        self.state.lock().unwrap().reject_sells = reject;
    }

    pub fn fail_balance_lookups(&self, fail: bool) {
        self.state.lock().unwrap().fail_balance = fail;
    }

    pub fn submit_count(&self) -> usize {
        self.state.lock().unwrap().submits
    }

    pub fn last_slippage(&self) -> Option<u32> {
        self.state.lock().unwrap().last_slippage
    }

    pub fn burned(&self, asset: &str) -> u64 {
        self.state.lock().unwrap().burned.get(asset).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ExecutionGateway for MockGateway {
    fn wallet_address(&self) -> &str {
        "mock-wallet"
    }

    async fn quote(
        &self,
        sell_asset: &str,
        buy_asset: &str,
        amount: u64,
        slippage_bps: u32,
    ) -> Result<Quote> {
        let state = self.state.lock().unwrap();
        let token = if sell_asset == SOL_MINT { buy_asset } else { sell_asset };
        let price = *state
            .prices
            .get(token)
            .ok_or_else(|| Error::Quote(format!("no route for {}", token)))?;

        let out_amount = if sell_asset == SOL_MINT {
            to_raw(from_raw(amount, SOL_DECIMALS) / price, MOCK_TOKEN_DECIMALS)
        } else {
            to_raw(from_raw(amount, MOCK_TOKEN_DECIMALS) * price, SOL_DECIMALS)
        };

        Ok(Quote {
            input_asset: sell_asset.to_string(),
            output_asset: buy_asset.to_string(),
            in_amount: amount,
            out_amount,
            price_impact_pct: state.impact_pct,
            slippage_bps,
        })
    }

    async fn build_transferable(&self, quote: &Quote, wallet: &str) -> Result<SignablePayload> {
        Ok(SignablePayload {
            quote: quote.clone(),
            wallet: wallet.to_string(),
            body: serde_json::Value::Null,
        })
    }

    async fn sign_and_submit(
        &self,
        payload: SignablePayload,
        _options: &SubmitOptions,
    ) -> Result<SubmitResult> {
        let mut state = self.state.lock().unwrap();
        state.submits += 1;
        state.last_slippage = Some(payload.quote.slippage_bps);
        let signature = format!("mock-{}", state.submits);
        let quote = payload.quote;

        if !quote.is_buy() && state.reject_sells {
            return Err(Error::InsufficientBalance {
                available: 0.0,
                required: 0.001,
            });
        }
        if !quote.is_buy() && state.fail_sells {
            return Ok(SubmitResult {
                signature: Some(signature),
                confirmed: false,
                error: Some("slippage exceeded".into()),
            });
        }

        let sol_in = from_raw(quote.in_amount, SOL_DECIMALS);
        let tokens_in = from_raw(quote.in_amount, MOCK_TOKEN_DECIMALS);
        let tokens_out = from_raw(quote.out_amount, MOCK_TOKEN_DECIMALS);
        let sol_out = from_raw(quote.out_amount, SOL_DECIMALS);
        if quote.is_buy() {
            state.sol_balance -= sol_in;
            *state
                .token_balances
                .entry(quote.output_asset.clone())
                .or_insert(0.0) += tokens_out;
        } else {
            let held = state
                .token_balances
                .entry(quote.input_asset.clone())
                .or_insert(0.0);
            *held = (*held - tokens_in).max(0.0);
            state.sol_balance += sol_out;
        }

        Ok(SubmitResult {
            signature: Some(signature),
            confirmed: true,
            error: None,
        })
    }

    async fn get_balance(&self) -> Result<f64> {
        Ok(self.state.lock().unwrap().sol_balance)
    }

    async fn get_asset_balance(&self, asset: &str) -> Result<f64> {
        let state = self.state.lock().unwrap();
        if state.fail_balance {
            return Err(Error::Rpc("balance lookup down".into()));
        }
        Ok(state.token_balances.get(asset).copied().unwrap_or(0.0))
    }

    async fn get_asset_decimals(&self, asset: &str) -> Result<u8> {
        Ok(if asset == SOL_MINT {
            SOL_DECIMALS
        } else {
            MOCK_TOKEN_DECIMALS
        })
    }
}

#[async_trait]
impl AssetBurner for MockGateway {
    async fn burn(&self, asset: &str, raw_amount: u64) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        let held = state.token_balances.get(asset).copied().unwrap_or(0.0);
        let tokens = from_raw(raw_amount, MOCK_TOKEN_DECIMALS);
        if tokens > held + 1e-9 {
            return Err(Error::Burn(format!("holds {} of {}", held, asset)));
        }
        state.token_balances.insert(asset.to_string(), (held - tokens).max(0.0));
        *state.burned.entry(asset.to_string()).or_insert(0) += raw_amount;
        Ok(format!("mock-burn-{}", raw_amount))
    }
}

/// Every call fails
pub struct FailingStore;

fn unavailable<T>() -> Result<T> {
    Err(Error::Persistence("store unavailable".into()))
}

#[async_trait]
impl Store for FailingStore {
    async fn load_positions(&self) -> Result<Vec<Position>> {
        unavailable()
    }

    async fn upsert_position(&self, _position: &Position) -> Result<()> {
        unavailable()
    }

    async fn load_signals(&self) -> Result<Vec<SignalPerformance>> {
        unavailable()
    }

    async fn upsert_signals(&self, _records: &[SignalPerformance]) -> Result<()> {
        unavailable()
    }

    async fn clear_signals(&self) -> Result<()> {
        unavailable()
    }

    async fn load_burn_ledger(&self) -> Result<Option<BurnLedger>> {
        unavailable()
    }

    async fn save_burn_ledger(&self, _ledger: &BurnLedger) -> Result<()> {
        unavailable()
    }

    async fn load_overrides(&self) -> Result<Option<ConfigOverrides>> {
        unavailable()
    }

    async fn save_overrides(&self, _overrides: &ConfigOverrides) -> Result<()> {
        unavailable()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    signals: Mutex<Vec<TradeSignal>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signals(&self) -> Vec<TradeSignal> {
        self.signals.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, signal: &TradeSignal) -> Result<()> {
        self.signals.lock().unwrap().push(signal.clone());
        Ok(())
    }
}
