//! Bot - polling driver that wraps the decision engine

use std::time::Duration;

use log::{debug, error, info, warn};
use solana_sdk::pubkey::Pubkey;

use crate::errors::ErrorKind;
use crate::execution::{BundleReceipt, TradeExecutor, TradeRequest};
use crate::helpers::lamports_to_sol;
use crate::market::PriceFeed;
use crate::strategy::{StrategyState, ThresholdStrategy, TradeAction, TradeSide};

/// Loop timing
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Pause after every iteration
    pub poll_interval: Duration,
    /// Extra pause after a stop-loss sell
    pub stop_loss_cooldown: Duration,
    /// Pause after an iteration whose feed read or trade failed
    pub error_backoff: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            stop_loss_cooldown: Duration::from_millis(5000),
            error_backoff: Duration::from_millis(100),
        }
    }
}

/// What one iteration did
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// No usable price this tick
    Skipped,
    /// Price evaluated, nothing to do
    Idle,
    /// Trade accepted by the relay and applied to the state
    Traded(BundleReceipt),
    /// Trade attempted and failed; state left untouched
    TradeFailed(ErrorKind),
}

impl TickOutcome {
    fn is_failure(&self) -> bool {
        matches!(self, TickOutcome::Skipped | TickOutcome::TradeFailed(_))
    }
}

/// Running counters for the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BotStats {
    pub ticks: u64,
    pub skipped_ticks: u64,
    pub trades: u64,
    pub failed_trades: u64,
    pub consecutive_errors: u32,
}

/// Bot owns the only [`StrategyState`] and serializes every mutation of it:
/// read the feed, evaluate, execute, apply, sleep, repeat.
pub struct Bot<F: PriceFeed, X: TradeExecutor> {
    feed: F,
    executor: X,
    strategy: ThresholdStrategy,
    state: StrategyState,
    mint: Pubkey,
    /// Lamports of SOL spent per buy
    trade_amount: u64,
    config: RunnerConfig,
    stats: BotStats,
}

impl<F: PriceFeed, X: TradeExecutor> Bot<F, X> {
    pub fn new(
        feed: F,
        executor: X,
        strategy: ThresholdStrategy,
        mint: Pubkey,
        trade_amount: u64,
        config: RunnerConfig,
    ) -> Self {
        Self {
            feed,
            executor,
            strategy,
            state: StrategyState::new(),
            mint,
            trade_amount,
            config,
            stats: BotStats::default(),
        }
    }

    pub fn state(&self) -> &StrategyState {
        &self.state
    }

    pub fn stats(&self) -> BotStats {
        self.stats
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// Poll forever. Errors never leave this loop.
    pub async fn run(&mut self) {
        info!(
            "Starting bot for mint {} (trade amount {} SOL, poll every {:?})",
            self.mint,
            lamports_to_sol(self.trade_amount),
            self.config.poll_interval
        );
        loop {
            let outcome = self.tick().await;
            let pause = if outcome.is_failure() {
                self.config.error_backoff
            } else {
                self.config.poll_interval
            };
            tokio::time::sleep(pause).await;
        }
    }

    /// One iteration of the control loop
    pub async fn tick(&mut self) -> TickOutcome {
        self.stats.ticks += 1;

        let price = match self.feed.get_pool_info().await {
            Ok(Some(info)) => info.token_price,
            Ok(None) => {
                debug!("Pool state unavailable, retrying next tick");
                return self.skip();
            }
            Err(e) => {
                warn!("Price feed error: {}", e);
                return self.skip();
            }
        };
        debug!("Price: {}", price);

        let (next, action) = match self.strategy.evaluate(price, &self.state) {
            Ok(result) => result,
            Err(e) => {
                warn!("Discarding observation: {}", e);
                return self.skip();
            }
        };
        self.state = next;

        let Some(side) = action.side() else {
            self.stats.consecutive_errors = 0;
            return TickOutcome::Idle;
        };

        let outcome = self.trade(side, action, price).await;

        if self.state.take_cooldown() {
            info!("Stop-loss cooldown for {:?}", self.config.stop_loss_cooldown);
            tokio::time::sleep(self.config.stop_loss_cooldown).await;
        }
        outcome
    }

    fn skip(&mut self) -> TickOutcome {
        self.stats.skipped_ticks += 1;
        self.stats.consecutive_errors += 1;
        TickOutcome::Skipped
    }

    async fn trade(&mut self, side: TradeSide, action: TradeAction, price: f64) -> TickOutcome {
        let request = match side {
            TradeSide::Buy => TradeRequest::buy(self.mint, self.trade_amount),
            TradeSide::Sell => TradeRequest::sell(self.mint),
        };
        info!("[{}] Executing {:?} at {}", request.id, action, price);

        match self.executor.execute(&request).await {
            Ok(receipt) => {
                self.state.apply_executed(side, price);
                self.stats.trades += 1;
                self.stats.consecutive_errors = 0;
                info!(
                    "[{}] {} at {} done: bundle {}, SOL balance {}",
                    request.id,
                    side,
                    price,
                    receipt.bundle_id,
                    receipt
                        .sol_balance_after
                        .map(|l| format!("{:.9}", lamports_to_sol(l)))
                        .unwrap_or_else(|| "unknown".to_string())
                );
                TickOutcome::Traded(receipt)
            }
            Err(e) => {
                self.stats.failed_trades += 1;
                self.stats.consecutive_errors += 1;
                let kind = e.kind();
                match kind {
                    ErrorKind::Rejected => warn!("[{}] {} bundle rejected: {}", request.id, side, e),
                    _ => error!(
                        "[{}] {} aborted ({} consecutive errors): {}",
                        request.id, side, self.stats.consecutive_errors, e
                    ),
                }
                TickOutcome::TradeFailed(kind)
            }
        }
    }
}
