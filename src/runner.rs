use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;

use crate::bot::Bot;
use crate::config::Settings;
use crate::errors::{Error, Result};
use crate::execution::{ExecutionPipeline, JitoRelay, RaydiumSwapApi};
use crate::helpers::lamports_to_sol;
use crate::market::{Ledger, RaydiumPoolFeed, RpcLedger};
use crate::strategy::ThresholdStrategy;

/// Decode a base58 64-byte secret key
pub fn load_keypair(secret: &str) -> Result<Keypair> {
    let bytes = bs58::decode(secret.trim())
        .into_vec()
        .map_err(|e| Error::Config(format!("wallet private key is not base58: {}", e)))?;
    Keypair::try_from(bytes.as_slice())
        .map_err(|e| Error::Config(format!("wallet private key is not a valid keypair: {}", e)))
}

/// Runner for the trading bot
pub struct BotRunner {
    config: Settings,
}

impl BotRunner {
    /// Create a new runner from a configuration file
    pub fn new(config_path: impl AsRef<Path>) -> Result<Self> {
        let path = config_path
            .as_ref()
            .to_str()
            .ok_or_else(|| Error::Config("config path is not valid UTF-8".into()))?;
        let config = Settings::new(path)?;
        config.validate()?;
        Ok(Self { config })
    }

    /// Run the bot
    pub async fn run(self) -> Result<()> {
        // 1. Setup Logging
        if std::env::var("RUST_LOG").is_err() {
            std::env::set_var("RUST_LOG", &self.config.log.level);
        }
        env_logger::try_init().ok();

        info!("Starting BotRunner...");

        // 2. Setup Network & Wallet
        let network = &self.config.network;
        let commitment = RpcLedger::parse_commitment(&network.commitment)?;
        let ledger = Arc::new(RpcLedger::new(network.rpc_url.clone(), commitment));
        let keypair = load_keypair(&self.config.wallet.private_key)?;
        let wallet = keypair.pubkey();
        info!("Wallet {} on {}", wallet, network.rpc_url);

        match ledger.sol_balance(&wallet).await {
            Ok(lamports) => info!("SOL balance: {:.9}", lamports_to_sol(lamports)),
            Err(e) => warn!("Could not read SOL balance: {}", e),
        }

        // 3. Resolve pool and token
        let strategy_config = &self.config.strategy;
        let pool = strategy_config.pool_address()?;
        let mint = strategy_config.mint_address()?;
        let feed = RaydiumPoolFeed::new(ledger.clone(), pool);
        info!("Watching pool {} for token {}", pool, mint);

        // 4. Instantiate Strategy
        let params = strategy_config.thresholds();
        info!(
            "Thresholds: buy -{}%, sell +{}%, stop-loss -{}%, confirm within {}% for {} ticks",
            params.buy_drop_percent,
            params.sell_rise_percent,
            params.stop_loss_percent,
            params.confirmation_threshold_percent,
            params.confirmation_ticks
        );
        let strategy = ThresholdStrategy::new(params);

        // 5. Execution pipeline
        let http = reqwest::Client::new();
        let swap_api = RaydiumSwapApi::new(http.clone(), network.swap_host.clone(), network.fee_host.clone());
        let relay = JitoRelay::new(http, network.relay_url.clone());
        let execution = &self.config.execution;
        let pipeline = ExecutionPipeline::new(ledger, swap_api, relay, keypair, execution.pipeline_config());
        info!(
            "Execution: {} SOL per buy, slippage {} bps, tip {} lamports, {:?} transactions",
            lamports_to_sol(execution.trade_amount),
            execution.slippage_bps,
            execution.tip_lamports,
            execution.tx_version
        );

        // 6. Drive
        let mut bot = Bot::new(
            feed,
            pipeline,
            strategy,
            mint,
            execution.trade_amount,
            self.config.runner.runner_config(),
        );
        bot.run().await;

        Ok(())
    }
}
