//! Configuration loading and validation
//!
//! Layers, lowest to highest priority:
//! compiled defaults < config file < persisted overrides < `TRADER__*` environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Bumped whenever a threshold changes meaning; older persisted overrides are dropped.
pub const CONFIG_VERSION: u32 = 2;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub exits: ExitConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub governor: GovernorConfig,
    #[serde(default)]
    pub learning: LearningConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Entry sizing and global exposure limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_min_position_sol")]
    pub min_position_sol: f64,
    #[serde(default = "default_max_position_sol")]
    pub max_position_sol: f64,
    #[serde(default = "default_max_total_exposure_sol")]
    pub max_total_exposure_sol: f64,
    #[serde(default = "default_max_open_positions")]
    pub max_open_positions: usize,
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u32,
    /// Entry quotes above this impact are refused by the gateway path
    #[serde(default = "default_max_price_impact_pct")]
    pub max_price_impact_pct: f64,
    /// Pause between candidate lookups (third-party rate limits)
    #[serde(default = "default_evaluation_delay_ms")]
    pub evaluation_delay_ms: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_max_candidates_per_pass")]
    pub max_candidates_per_pass: usize,
}

/// Exit ladder, stops and dead-position detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitConfig {
    /// Price multipliers (vs entry) at which a partial sell fires, ascending
    #[serde(default = "default_take_profit_tiers")]
    pub take_profit_tiers: Vec<f64>,
    /// Percentage of the remaining quantity sold at each tier
    #[serde(default = "default_partial_sell_pct")]
    pub partial_sell_pct: f64,
    #[serde(default = "default_trailing_stop_pct")]
    pub trailing_stop_pct: f64,
    /// Compound stop distance; the unconditional hard stop sits at twice this
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: f64,
    #[serde(default = "default_max_hold_minutes")]
    pub max_hold_minutes: u64,
    /// 1h volume (USD) below which a held position counts as illiquid
    #[serde(default = "default_min_holding_volume_usd")]
    pub min_holding_volume_usd: f64,
    #[serde(default = "default_dead_decay_pct")]
    pub dead_decay_pct: f64,
    #[serde(default = "default_dead_liquidity_usd")]
    pub dead_liquidity_usd: f64,
    /// Peak tracking is suppressed for this long after entry
    #[serde(default = "default_settle_window_secs")]
    pub settle_window_secs: u64,
    #[serde(default = "default_near_entry_timeout_minutes")]
    pub near_entry_timeout_minutes: u64,
}

impl ExitConfig {
    /// Unconditional stop distance in percent
    pub fn hard_stop_pct(&self) -> f64 {
        self.stop_loss_pct * 2.0
    }
}

/// Candidate hard filters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_min_liquidity_usd")]
    pub min_liquidity_usd: f64,
    #[serde(default = "default_min_market_cap_usd")]
    pub min_market_cap_usd: f64,
    #[serde(default = "default_min_volume_24h_usd")]
    pub min_volume_24h_usd: f64,
    #[serde(default = "default_min_holders")]
    pub min_holders: u64,
    #[serde(default = "default_min_buy_sell_ratio")]
    pub min_buy_sell_ratio: f64,
    #[serde(default = "default_min_launch_age_secs")]
    pub min_launch_age_secs: u64,
    #[serde(default = "default_max_launch_age_secs")]
    pub max_launch_age_secs: u64,
    #[serde(default = "default_max_single_holder_pct")]
    pub max_single_holder_pct: f64,
    #[serde(default = "default_max_top5_holder_pct")]
    pub max_top5_holder_pct: f64,
    /// Wallet whose participation earns an extra smart-money bonus
    #[serde(default)]
    pub benchmark_wallet: Option<String>,
}

/// Evaluation cooldowns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorConfig {
    #[serde(default = "default_evaluation_cooldown_secs")]
    pub evaluation_cooldown_secs: u64,
    /// Shorter cooldown for candidates whose market data is not populated yet
    #[serde(default = "default_unhydrated_cooldown_secs")]
    pub unhydrated_cooldown_secs: u64,
    #[serde(default = "default_decided_reset_secs")]
    pub decided_reset_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Floor for the summed per-signal adjustment of one evaluation
    #[serde(default = "default_adjustment_floor")]
    pub adjustment_floor: f64,
}

/// Profit-allocation (buy-and-burn) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_profit_pct")]
    pub profit_pct: f64,
    #[serde(default)]
    pub burn_asset: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

/// Live execution (PumpPortal Lightning + Solana JSON-RPC)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_rpc_endpoint")]
    pub rpc_endpoint: String,
    #[serde(default)]
    pub wallet_address: String,
    #[serde(default = "default_priority_fee_sol")]
    pub priority_fee_sol: f64,
    /// Starting SOL balance of the dry-run wallet
    #[serde(default = "default_paper_balance_sol")]
    pub paper_balance_sol: f64,
}

// Default value functions
fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_true() -> bool {
    true
}

fn default_min_position_sol() -> f64 {
    0.05
}

fn default_max_position_sol() -> f64 {
    0.25
}

fn default_max_total_exposure_sol() -> f64 {
    1.0
}

fn default_max_open_positions() -> usize {
    5
}

fn default_slippage_bps() -> u32 {
    300
}

fn default_max_price_impact_pct() -> f64 {
    5.0
}

fn default_evaluation_delay_ms() -> u64 {
    1000
}

fn default_tick_interval_ms() -> u64 {
    15_000
}

fn default_max_candidates_per_pass() -> usize {
    20
}

fn default_take_profit_tiers() -> Vec<f64> {
    vec![1.5, 2.0, 3.0]
}

fn default_partial_sell_pct() -> f64 {
    33.0
}

fn default_trailing_stop_pct() -> f64 {
    25.0
}

fn default_stop_loss_pct() -> f64 {
    15.0
}

fn default_max_hold_minutes() -> u64 {
    240
}

fn default_min_holding_volume_usd() -> f64 {
    5_000.0
}

fn default_dead_decay_pct() -> f64 {
    10.0
}

fn default_dead_liquidity_usd() -> f64 {
    500.0
}

fn default_settle_window_secs() -> u64 {
    180
}

fn default_near_entry_timeout_minutes() -> u64 {
    20
}

fn default_min_liquidity_usd() -> f64 {
    5_000.0
}

fn default_min_market_cap_usd() -> f64 {
    10_000.0
}

fn default_min_volume_24h_usd() -> f64 {
    10_000.0
}

fn default_min_holders() -> u64 {
    50
}

fn default_min_buy_sell_ratio() -> f64 {
    0.8
}

fn default_min_launch_age_secs() -> u64 {
    60
}

fn default_max_launch_age_secs() -> u64 {
    7 * 24 * 3600
}

fn default_max_single_holder_pct() -> f64 {
    20.0
}

fn default_max_top5_holder_pct() -> f64 {
    50.0
}

fn default_evaluation_cooldown_secs() -> u64 {
    300
}

fn default_unhydrated_cooldown_secs() -> u64 {
    30
}

fn default_decided_reset_secs() -> u64 {
    1800
}

fn default_adjustment_floor() -> f64 {
    -15.0
}

fn default_profit_pct() -> f64 {
    10.0
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_rpc_endpoint() -> String {
    std::env::var("RPC_ENDPOINT").unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".into())
}

fn default_priority_fee_sol() -> f64 {
    0.0005
}

fn default_paper_balance_sol() -> f64 {
    10.0
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_position_sol: default_min_position_sol(),
            max_position_sol: default_max_position_sol(),
            max_total_exposure_sol: default_max_total_exposure_sol(),
            max_open_positions: default_max_open_positions(),
            slippage_bps: default_slippage_bps(),
            max_price_impact_pct: default_max_price_impact_pct(),
            evaluation_delay_ms: default_evaluation_delay_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            max_candidates_per_pass: default_max_candidates_per_pass(),
        }
    }
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            take_profit_tiers: default_take_profit_tiers(),
            partial_sell_pct: default_partial_sell_pct(),
            trailing_stop_pct: default_trailing_stop_pct(),
            stop_loss_pct: default_stop_loss_pct(),
            max_hold_minutes: default_max_hold_minutes(),
            min_holding_volume_usd: default_min_holding_volume_usd(),
            dead_decay_pct: default_dead_decay_pct(),
            dead_liquidity_usd: default_dead_liquidity_usd(),
            settle_window_secs: default_settle_window_secs(),
            near_entry_timeout_minutes: default_near_entry_timeout_minutes(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_liquidity_usd: default_min_liquidity_usd(),
            min_market_cap_usd: default_min_market_cap_usd(),
            min_volume_24h_usd: default_min_volume_24h_usd(),
            min_holders: default_min_holders(),
            min_buy_sell_ratio: default_min_buy_sell_ratio(),
            min_launch_age_secs: default_min_launch_age_secs(),
            max_launch_age_secs: default_max_launch_age_secs(),
            max_single_holder_pct: default_max_single_holder_pct(),
            max_top5_holder_pct: default_max_top5_holder_pct(),
            benchmark_wallet: None,
        }
    }
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            evaluation_cooldown_secs: default_evaluation_cooldown_secs(),
            unhydrated_cooldown_secs: default_unhydrated_cooldown_secs(),
            decided_reset_secs: default_decided_reset_secs(),
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            adjustment_floor: default_adjustment_floor(),
        }
    }
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            profit_pct: default_profit_pct(),
            burn_asset: String::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            rpc_endpoint: default_rpc_endpoint(),
            wallet_address: String::new(),
            priority_fee_sol: default_priority_fee_sol(),
            paper_balance_sol: default_paper_balance_sol(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            trading: TradingConfig::default(),
            exits: ExitConfig::default(),
            filters: FilterConfig::default(),
            governor: GovernorConfig::default(),
            learning: LearningConfig::default(),
            allocation: AllocationConfig::default(),
            storage: StorageConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Runtime overrides persisted through the store (flat dotted key -> value)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigOverrides {
    pub version: u32,
    pub values: BTreeMap<String, serde_json::Value>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            values: BTreeMap::new(),
        }
    }

    /// Drop overrides written by an older config version
    pub fn current_or_empty(self) -> Self {
        if self.version < CONFIG_VERSION && !self.values.is_empty() {
            tracing::warn!(
                stored = self.version,
                current = CONFIG_VERSION,
                count = self.values.len(),
                "Discarding stale persisted config overrides"
            );
            return Self::new();
        }
        self
    }

    pub fn set(&mut self, key: &str, value: serde_json::Value) {
        self.version = CONFIG_VERSION;
        self.values.insert(key.to_lowercase(), value);
    }
}

impl config::Source for ConfigOverrides {
    fn clone_into_box(&self) -> Box<dyn config::Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> std::result::Result<config::Map<String, config::Value>, config::ConfigError> {
        let origin = "persisted overrides".to_string();
        Ok(self
            .values
            .iter()
            .map(|(key, value)| (key.clone(), json_to_config_value(&origin, value)))
            .collect())
    }
}

fn json_to_config_value(origin: &String, value: &serde_json::Value) -> config::Value {
    use config::ValueKind;

    let kind = match value {
        serde_json::Value::Null => ValueKind::Nil,
        serde_json::Value::Bool(b) => ValueKind::Boolean(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => ValueKind::I64(i),
            None => ValueKind::Float(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => ValueKind::String(s.clone()),
        serde_json::Value::Array(items) => ValueKind::Array(
            items
                .iter()
                .map(|item| json_to_config_value(origin, item))
                .collect(),
        ),
        serde_json::Value::Object(map) => ValueKind::Table(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_config_value(origin, v)))
                .collect(),
        ),
    };

    config::Value::new(Some(origin), kind)
}

/// Everything needed to rebuild the effective configuration
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub file: PathBuf,
    pub overrides: ConfigOverrides,
}

impl ConfigLoader {
    pub fn new<P: AsRef<Path>>(file: P) -> Self {
        Self {
            file: file.as_ref().to_path_buf(),
            overrides: ConfigOverrides::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides.current_or_empty();
        self
    }

    /// Build the layered configuration
    pub fn build(&self) -> Result<Config> {
        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(self.file.as_path()).required(false))
            // Persisted runtime overrides
            .add_source(self.overrides.clone())
            // Override with environment variables (prefix TRADER_)
            .add_source(
                config::Environment::with_prefix("TRADER")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("exits.take_profit_tiers"),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        ConfigLoader::new(path).build()
    }

    /// Whether `key` (dotted path, e.g. `exits.stop_loss_pct`) names a setting
    pub fn has_key(&self, key: &str) -> bool {
        let Ok(root) = serde_json::to_value(self) else {
            return false;
        };
        key.split('.')
            .try_fold(&root, |node, part| node.get(part))
            .is_some()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let t = &self.trading;
        if t.min_position_sol <= 0.0 {
            anyhow::bail!("min_position_sol must be positive");
        }
        if t.max_position_sol < t.min_position_sol {
            anyhow::bail!(
                "max_position_sol ({}) must be >= min_position_sol ({})",
                t.max_position_sol,
                t.min_position_sol
            );
        }
        if t.max_total_exposure_sol < t.max_position_sol {
            anyhow::bail!("max_total_exposure_sol must be >= max_position_sol");
        }
        if t.max_open_positions == 0 {
            anyhow::bail!("max_open_positions must be at least 1");
        }
        if t.slippage_bps > 10_000 {
            anyhow::bail!("slippage_bps cannot exceed 10000 (100%)");
        }

        let e = &self.exits;
        if e.take_profit_tiers.is_empty() {
            anyhow::bail!("take_profit_tiers must contain at least one multiplier");
        }
        if e.take_profit_tiers.windows(2).any(|w| w[0] >= w[1]) {
            anyhow::bail!("take_profit_tiers must be strictly ascending");
        }
        if e.take_profit_tiers[0] <= 1.0 {
            anyhow::bail!("take_profit_tiers must be above 1.0 (entry)");
        }
        if e.partial_sell_pct <= 0.0 || e.partial_sell_pct >= 100.0 {
            anyhow::bail!("partial_sell_pct must be between 0 and 100");
        }
        if e.stop_loss_pct <= 0.0 || e.stop_loss_pct >= 50.0 {
            anyhow::bail!("stop_loss_pct must be between 0 and 50 (hard stop is 2x)");
        }
        if e.trailing_stop_pct <= 0.0 || e.trailing_stop_pct >= 100.0 {
            anyhow::bail!("trailing_stop_pct must be between 0 and 100");
        }
        if e.dead_decay_pct >= e.hard_stop_pct() {
            anyhow::bail!("dead_decay_pct must be below the hard stop ({}%)", e.hard_stop_pct());
        }

        let f = &self.filters;
        if f.min_launch_age_secs > f.max_launch_age_secs {
            anyhow::bail!("min_launch_age_secs must be <= max_launch_age_secs");
        }

        if self.learning.adjustment_floor > 0.0 {
            anyhow::bail!("learning.adjustment_floor must be zero or negative");
        }

        let a = &self.allocation;
        if a.profit_pct < 0.0 || a.profit_pct > 100.0 {
            anyhow::bail!("allocation.profit_pct must be between 0 and 100");
        }
        if a.enabled && a.burn_asset.is_empty() {
            anyhow::bail!("allocation.burn_asset is required when allocation is enabled");
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration (v{}):
  Trading:
    enabled: {}
    position: {} - {} SOL
    max_exposure: {} SOL
    max_open_positions: {}
    slippage: {}bps
    max_price_impact: {}%
  Exits:
    take_profit_tiers: {:?}
    partial_sell: {}%
    trailing_stop: {}%
    stop_loss: {}% (hard {}%)
    max_hold: {}m
  Filters:
    min_liquidity: ${}
    min_market_cap: ${}
    min_volume_24h: ${}
    min_holders: {}
    launch_age: {}s - {}s
  Allocation:
    enabled: {}
    profit_pct: {}%
  Gateway:
    rpc_endpoint: {}
    wallet: {}
    api_key: {}
"#,
            self.version,
            self.trading.enabled,
            self.trading.min_position_sol,
            self.trading.max_position_sol,
            self.trading.max_total_exposure_sol,
            self.trading.max_open_positions,
            self.trading.slippage_bps,
            self.trading.max_price_impact_pct,
            self.exits.take_profit_tiers,
            self.exits.partial_sell_pct,
            self.exits.trailing_stop_pct,
            self.exits.stop_loss_pct,
            self.exits.hard_stop_pct(),
            self.exits.max_hold_minutes,
            self.filters.min_liquidity_usd,
            self.filters.min_market_cap_usd,
            self.filters.min_volume_24h_usd,
            self.filters.min_holders,
            self.filters.min_launch_age_secs,
            self.filters.max_launch_age_secs,
            self.allocation.enabled,
            self.allocation.profit_pct,
            mask_url(&self.gateway.rpc_endpoint),
            if self.gateway.wallet_address.is_empty() {
                "(not set)"
            } else {
                self.gateway.wallet_address.as_str()
            },
            if self.gateway.api_key.is_empty() {
                "(not set)"
            } else {
                "***"
            },
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.trading.enabled);
        assert_eq!(config.exits.take_profit_tiers, vec![1.5, 2.0, 3.0]);
        assert_eq!(config.exits.hard_stop_pct(), 30.0);
        assert_eq!(config.learning.adjustment_floor, -15.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_has_key() {
        let config = Config::default();
        assert!(config.has_key("exits.stop_loss_pct"));
        assert!(config.has_key("filters.benchmark_wallet"));
        assert!(!config.has_key("exits.stop_loss"));
        assert!(!config.has_key("nope"));
    }

    #[test]
    fn test_validate_rejects_unsorted_tiers() {
        let mut config = Config::default();
        config.exits.take_profit_tiers = vec![2.0, 1.5];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_sizes() {
        let mut config = Config::default();
        config.trading.min_position_sol = 0.5;
        config.trading.max_position_sol = 0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_burn_asset() {
        let mut config = Config::default();
        config.allocation.enabled = true;
        assert!(config.validate().is_err());
        config.allocation.burn_asset = "BurnMint1111".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_persisted_overrides_apply_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[exits]\nstop_loss_pct = 12.0\n").unwrap();

        let loaded = ConfigLoader::new(&path).build().unwrap();
        assert_eq!(loaded.exits.stop_loss_pct, 12.0);

        let mut overrides = ConfigOverrides::new();
        overrides.set("exits.stop_loss_pct", serde_json::json!(18.0));
        overrides.set("exits.take_profit_tiers", serde_json::json!([1.4, 2.5]));
        let loaded = ConfigLoader::new(&path)
            .with_overrides(overrides)
            .build()
            .unwrap();
        assert_eq!(loaded.exits.stop_loss_pct, 18.0);
        assert_eq!(loaded.exits.take_profit_tiers, vec![1.4, 2.5]);
    }

    #[test]
    fn test_stale_overrides_discarded() {
        let mut overrides = ConfigOverrides::new();
        overrides.set("trading.enabled", serde_json::json!(false));
        overrides.version = CONFIG_VERSION - 1;

        let current = overrides.current_or_empty();
        assert!(current.values.is_empty());
        assert_eq!(current.version, CONFIG_VERSION);
    }

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("https://rpc.example.com?api-key=secret"),
            "https://rpc.example.com?***"
        );
        assert_eq!(mask_url("https://rpc.example.com"), "https://rpc.example.com");
    }

    #[test]
    fn test_masked_display_hides_api_key() {
        let mut config = Config::default();
        config.gateway.api_key = "super-secret".to_string();
        let shown = config.masked_display();
        assert!(!shown.contains("super-secret"));
        assert!(shown.contains("***"));
    }
}
