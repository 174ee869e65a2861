//! Trade execution pipeline
//!
//! One trade = one bundle. The pipeline resolves accounts and amounts, asks
//! the build service for a quote and the matching unsigned transactions,
//! signs them under a single blockhash with the relay tip on the last one,
//! and submits the result. Any failure before submission aborts the trade
//! without sending anything.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::try_join;
use log::{debug, info, warn};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;

use crate::consts::MAX_BUNDLE_TRANSACTIONS;
use crate::errors::{Error, Result};
use crate::helpers::lamports_to_sol;
use crate::market::Ledger;
use crate::strategy::TradeSide;

use super::relay::BundleRelay;
use super::signing::sign_bundle;
use super::swap_api::{BuildRequest, PriorityLevel, QuoteParams, SwapApi};
use super::types::{BundleReceipt, SwapLeg, Tip, TradeAmount, TradeRequest, TxVersion};

/// Executes trades on behalf of the driver
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    async fn execute(&self, request: &TradeRequest) -> Result<BundleReceipt>;
}

/// Knobs of the execution pipeline
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub slippage_bps: u16,
    pub tx_version: TxVersion,
    /// Relay tip; zero disables the tip transfer
    pub tip_lamports: u64,
    pub priority_level: PriorityLevel,
    /// Pause after a buy so the token account is visible to the next sell
    pub settlement_delay: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            slippage_bps: 2000,
            tx_version: TxVersion::Legacy,
            tip_lamports: 20_000_000,
            priority_level: PriorityLevel::Vh,
            settlement_delay: Duration::from_millis(1500),
        }
    }
}

/// Quote, build, sign and submit a trade as one atomic bundle
pub struct ExecutionPipeline<L: Ledger, S: SwapApi, R: BundleRelay> {
    ledger: Arc<L>,
    swap_api: S,
    relay: R,
    keypair: Keypair,
    config: ExecutionConfig,
}

impl<L: Ledger, S: SwapApi, R: BundleRelay> ExecutionPipeline<L, S, R> {
    pub fn new(ledger: Arc<L>, swap_api: S, relay: R, keypair: Keypair, config: ExecutionConfig) -> Self {
        Self {
            ledger,
            swap_api,
            relay,
            keypair,
            config,
        }
    }

    pub fn wallet(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Token accounts for both sides; native SOL sides are left to the builder
    async fn token_accounts(&self, leg: &SwapLeg) -> Result<(Option<Pubkey>, Option<Pubkey>)> {
        let owner = self.wallet();
        let input = if leg.input_is_native() {
            None
        } else {
            let account = self
                .ledger
                .find_token_account(&owner, &leg.input_mint)
                .await?
                .ok_or_else(|| Error::MissingAccount(leg.input_mint.to_string()))?;
            Some(account)
        };
        let output = if leg.output_is_native() {
            None
        } else {
            self.ledger.find_token_account(&owner, &leg.output_mint).await?
        };
        Ok((input, output))
    }

    async fn input_amount(&self, amount: TradeAmount, leg: &SwapLeg, input_account: Option<Pubkey>) -> Result<u64> {
        match amount {
            TradeAmount::Exact(raw) => Ok(raw),
            TradeAmount::FullBalance => {
                let account = input_account.ok_or_else(|| {
                    Error::QuoteBuild("full-balance trades need a token input".into())
                })?;
                let balance = self.ledger.token_account_balance(&account).await?;
                if balance.amount == 0 {
                    return Err(Error::EmptyBalance(leg.input_mint.to_string()));
                }
                Ok(balance.amount)
            }
        }
    }

    async fn tip(&self) -> Result<Option<Tip>> {
        if self.config.tip_lamports == 0 {
            return Ok(None);
        }
        let account = self.relay.tip_account().await?;
        Ok(Some(Tip {
            account,
            lamports: self.config.tip_lamports,
        }))
    }
}

#[async_trait]
impl<L: Ledger, S: SwapApi, R: BundleRelay> TradeExecutor for ExecutionPipeline<L, S, R> {
    async fn execute(&self, request: &TradeRequest) -> Result<BundleReceipt> {
        let leg = request.leg();
        let (input_account, output_account) = self.token_accounts(&leg).await?;
        let amount = self.input_amount(request.amount, &leg, input_account).await?;

        let params = QuoteParams {
            input_mint: leg.input_mint.to_string(),
            output_mint: leg.output_mint.to_string(),
            amount,
            slippage_bps: self.config.slippage_bps,
            tx_version: self.config.tx_version,
        };
        let (fee, quote) = try_join(self.swap_api.priority_fee(), self.swap_api.quote(&params)).await?;
        debug!(
            "[{}] Quote {} -> {} (min {}), impact {}%",
            request.id, quote.input_amount, quote.output_amount, quote.other_amount_threshold, quote.price_impact_pct
        );

        let build = BuildRequest {
            compute_unit_price_micro_lamports: fee.at(self.config.priority_level).to_string(),
            swap_response: quote.raw.clone(),
            tx_version: self.config.tx_version,
            wallet: self.wallet().to_string(),
            wrap_sol: leg.wrap_sol(),
            unwrap_sol: leg.unwrap_sol(),
            input_account: input_account.map(|a| a.to_string()),
            output_account: output_account.map(|a| a.to_string()),
        };
        let blobs = self.swap_api.build_transactions(&build).await?;
        if blobs.is_empty() || blobs.len() > MAX_BUNDLE_TRANSACTIONS {
            return Err(Error::QuoteBuild(format!(
                "build service returned {} transactions (allowed 1..={})",
                blobs.len(),
                MAX_BUNDLE_TRANSACTIONS
            )));
        }

        let blockhash = self.ledger.latest_blockhash().await?;
        let tip = self.tip().await?;
        let bundle = sign_bundle(&blobs, &self.keypair, blockhash, tip)?;

        let bundle_id = self.relay.send_bundle(&bundle.transactions).await?;
        info!(
            "[{}] {} bundle {} accepted ({} txs, first sig {})",
            request.id,
            request.side,
            bundle_id,
            bundle.len(),
            bundle.signatures.first().map(|s| s.to_string()).unwrap_or_default()
        );

        let sol_balance_after = match self.ledger.sol_balance(&self.wallet()).await {
            Ok(lamports) => {
                info!("[{}] SOL balance: {:.9}", request.id, lamports_to_sol(lamports));
                Some(lamports)
            }
            Err(e) => {
                warn!("[{}] Could not read SOL balance: {}", request.id, e);
                None
            }
        };

        if request.side == TradeSide::Buy && !self.config.settlement_delay.is_zero() {
            tokio::time::sleep(self.config.settlement_delay).await;
        }

        Ok(BundleReceipt {
            request_id: request.id,
            side: request.side,
            bundle_id,
            input_amount: quote.input_amount,
            expected_output: quote.output_amount,
            price_impact_pct: quote.price_impact_pct,
            transaction_count: bundle.len(),
            sol_balance_after,
            submitted_at: Utc::now(),
        })
    }
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

/// Executor that records requests instead of trading
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingExecutor {
        pub requests: Mutex<Vec<TradeRequest>>,
        /// Returned instead of a receipt while set
        pub failure: Mutex<Option<Error>>,
    }

    impl RecordingExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_with(&self, error: Option<Error>) {
            *self.failure.lock().unwrap() = error;
        }

        pub fn sides(&self) -> Vec<TradeSide> {
            self.requests.lock().unwrap().iter().map(|r| r.side).collect()
        }
    }

    #[async_trait]
    impl TradeExecutor for RecordingExecutor {
        async fn execute(&self, request: &TradeRequest) -> Result<BundleReceipt> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(err) = self.failure.lock().unwrap().clone() {
                return Err(err);
            }
            Ok(BundleReceipt {
                request_id: request.id,
                side: request.side,
                bundle_id: format!("bundle-{}", request.id),
                input_amount: 0,
                expected_output: 0,
                price_impact_pct: 0.0,
                transaction_count: 1,
                sol_balance_after: None,
                submitted_at: Utc::now(),
            })
        }
    }
}
