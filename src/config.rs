use std::time::Duration;

use config::{Config, File};
pub use config::ConfigError;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;

use crate::bot::RunnerConfig;
use crate::consts::{JITO_BUNDLE_URL, RAYDIUM_API_HOST, RAYDIUM_SWAP_HOST};
use crate::errors::{Error, Result};
use crate::execution::{ExecutionConfig, PriorityLevel, TxVersion};
use crate::helpers::parse_pubkey;
use crate::strategy::ThresholdParams;

/// Main configuration struct
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Endpoints (RPC node, relay, trade API)
    #[serde(default)]
    pub network: NetworkConfig,
    /// Trading identity
    pub wallet: WalletConfig,
    /// Pool, token and thresholds
    pub strategy: StrategyConfig,
    /// Trade size and bundle parameters
    #[serde(default)]
    pub execution: ExecutionSettings,
    /// Loop timing
    #[serde(default)]
    pub runner: RunnerSettings,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// "processed", "confirmed" or "finalized"
    #[serde(default = "default_commitment")]
    pub commitment: String,
    /// Block engine bundle endpoint
    #[serde(default = "default_relay_url")]
    pub relay_url: String,
    #[serde(default = "default_swap_host")]
    pub swap_host: String,
    #[serde(default = "default_fee_host")]
    pub fee_host: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            commitment: default_commitment(),
            relay_url: default_relay_url(),
            swap_host: default_swap_host(),
            fee_host: default_fee_host(),
        }
    }
}

fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_relay_url() -> String {
    JITO_BUNDLE_URL.to_string()
}

fn default_swap_host() -> String {
    RAYDIUM_SWAP_HOST.to_string()
}

fn default_fee_host() -> String {
    RAYDIUM_API_HOST.to_string()
}

#[derive(Deserialize)]
pub struct WalletConfig {
    /// Base58 64-byte secret key
    /// In production, load this from APP_WALLET__PRIVATE_KEY only
    pub private_key: String,
}

impl std::fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConfig").field("private_key", &"<redacted>").finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct StrategyConfig {
    /// Raydium AMM v4 pool address
    pub pool: String,
    /// Mint of the traded token
    pub mint: String,
    #[serde(default = "default_buy_drop")]
    pub buy_drop_percent: f64,
    #[serde(default = "default_sell_rise")]
    pub sell_rise_percent: f64,
    #[serde(default = "default_stop_loss")]
    pub stop_loss_percent: f64,
    #[serde(default = "default_confirmation_threshold")]
    pub confirmation_threshold_percent: f64,
    #[serde(default = "default_confirmation_ticks")]
    pub confirmation_ticks: u32,
}

fn default_buy_drop() -> f64 {
    ThresholdParams::default().buy_drop_percent
}

fn default_sell_rise() -> f64 {
    ThresholdParams::default().sell_rise_percent
}

fn default_stop_loss() -> f64 {
    ThresholdParams::default().stop_loss_percent
}

fn default_confirmation_threshold() -> f64 {
    ThresholdParams::default().confirmation_threshold_percent
}

fn default_confirmation_ticks() -> u32 {
    ThresholdParams::default().confirmation_ticks
}

impl StrategyConfig {
    pub fn thresholds(&self) -> ThresholdParams {
        ThresholdParams {
            buy_drop_percent: self.buy_drop_percent,
            sell_rise_percent: self.sell_rise_percent,
            stop_loss_percent: self.stop_loss_percent,
            confirmation_threshold_percent: self.confirmation_threshold_percent,
            confirmation_ticks: self.confirmation_ticks,
        }
    }

    pub fn pool_address(&self) -> Result<Pubkey> {
        parse_pubkey("pool", &self.pool)
    }

    pub fn mint_address(&self) -> Result<Pubkey> {
        parse_pubkey("mint", &self.mint)
    }
}

#[derive(Debug, Deserialize)]
pub struct ExecutionSettings {
    /// Lamports of SOL spent per buy
    #[serde(default = "default_trade_amount")]
    pub trade_amount: u64,
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u16,
    #[serde(default)]
    pub tx_version: TxVersion,
    /// 0 disables the tip transfer
    #[serde(default = "default_tip_lamports")]
    pub tip_lamports: u64,
    #[serde(default = "default_settlement_delay_ms")]
    pub settlement_delay_ms: u64,
    #[serde(default)]
    pub priority_fee_level: PriorityLevel,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            trade_amount: default_trade_amount(),
            slippage_bps: default_slippage_bps(),
            tx_version: TxVersion::default(),
            tip_lamports: default_tip_lamports(),
            settlement_delay_ms: default_settlement_delay_ms(),
            priority_fee_level: PriorityLevel::default(),
        }
    }
}

fn default_trade_amount() -> u64 {
    1_000_000_000
}

fn default_slippage_bps() -> u16 {
    2000
}

fn default_tip_lamports() -> u64 {
    20_000_000
}

fn default_settlement_delay_ms() -> u64 {
    1500
}

impl ExecutionSettings {
    pub fn pipeline_config(&self) -> ExecutionConfig {
        ExecutionConfig {
            slippage_bps: self.slippage_bps,
            tx_version: self.tx_version,
            tip_lamports: self.tip_lamports,
            priority_level: self.priority_fee_level,
            settlement_delay: Duration::from_millis(self.settlement_delay_ms),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RunnerSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_stop_loss_cooldown_ms")]
    pub stop_loss_cooldown_ms: u64,
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            stop_loss_cooldown_ms: default_stop_loss_cooldown_ms(),
            error_backoff_ms: default_error_backoff_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_stop_loss_cooldown_ms() -> u64 {
    5000
}

fn default_error_backoff_ms() -> u64 {
    100
}

impl RunnerSettings {
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            stop_loss_cooldown: Duration::from_millis(self.stop_loss_cooldown_ms),
            error_backoff: Duration::from_millis(self.error_backoff_ms),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct LogConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Load settings from a configuration file
    pub fn new(config_path: &str) -> std::result::Result<Self, ConfigError> {
        let s = Config::builder()
            // Add configuration file
            .add_source(File::with_name(config_path))
            // Add environment variables (overrides file)
            // e.g. APP_WALLET__PRIVATE_KEY=...
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Reject values that would make the bot misbehave rather than fail
    pub fn validate(&self) -> Result<()> {
        self.strategy.thresholds().validate()?;
        self.strategy.pool_address()?;
        self.strategy.mint_address()?;
        if self.execution.trade_amount == 0 {
            return Err(Error::Config("trade_amount must be positive".into()));
        }
        if self.execution.slippage_bps > 10_000 {
            return Err(Error::Config(format!(
                "slippage_bps must be at most 10000, got {}",
                self.execution.slippage_bps
            )));
        }
        if self.wallet.private_key.trim().is_empty() {
            return Err(Error::Config("wallet.private_key is empty".into()));
        }
        Ok(())
    }
}
