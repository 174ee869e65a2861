//! Pool price feed

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use solana_sdk::pubkey::Pubkey;

use crate::errors::Result;

use super::amm::{effective_reserves, token_price, AmmPoolState, OpenOrdersTotals};
use super::ledger::Ledger;
use super::types::PoolInfo;

/// Source of the current pool price
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Read the pool once. `Ok(None)` means the on-chain state could not be
    /// read this tick; the driver retries on the next cycle.
    async fn get_pool_info(&self) -> Result<Option<PoolInfo>>;
}

/// Price feed for a Raydium AMM v4 pool backed by an OpenBook market
pub struct RaydiumPoolFeed<L: Ledger> {
    ledger: Arc<L>,
    pool: Pubkey,
}

impl<L: Ledger> RaydiumPoolFeed<L> {
    pub fn new(ledger: Arc<L>, pool: Pubkey) -> Self {
        Self { ledger, pool }
    }

    pub fn pool(&self) -> &Pubkey {
        &self.pool
    }
}

#[async_trait]
impl<L: Ledger> PriceFeed for RaydiumPoolFeed<L> {
    async fn get_pool_info(&self) -> Result<Option<PoolInfo>> {
        let Some(data) = self.ledger.account_data(&self.pool).await? else {
            debug!("Pool account {} not found", self.pool);
            return Ok(None);
        };
        let state = AmmPoolState::decode(&data)?;

        let (open_orders, base_vault, quote_vault) = tokio::try_join!(
            self.ledger.account_data(&state.open_orders),
            self.ledger.token_account_balance(&state.base_vault),
            self.ledger.token_account_balance(&state.quote_vault),
        )?;
        let Some(open_orders) = open_orders else {
            debug!("Open orders account {} not found", state.open_orders);
            return Ok(None);
        };
        let open_orders = OpenOrdersTotals::decode(&open_orders)?;

        let (base_reserve, quote_reserve) =
            effective_reserves(&state, &open_orders, base_vault.ui_amount, quote_vault.ui_amount);
        let price = token_price(base_reserve, quote_reserve)?;

        Ok(Some(PoolInfo {
            token_price: price,
            base_reserve,
            quote_reserve,
            base_mint: state.base_mint,
            quote_mint: state.quote_mint,
        }))
    }
}

/// Scripted price feed for tests
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::errors::Error;

    /// One scripted observation
    #[derive(Debug, Clone)]
    pub enum FeedTick {
        Price(f64),
        Missing,
        Fail,
    }

    /// Replays scripted ticks in order, then reports the pool as unreadable
    #[derive(Default)]
    pub struct MockPriceFeed {
        ticks: Mutex<VecDeque<FeedTick>>,
    }

    impl MockPriceFeed {
        pub fn new(ticks: impl IntoIterator<Item = FeedTick>) -> Self {
            Self {
                ticks: Mutex::new(ticks.into_iter().collect()),
            }
        }

        pub fn from_prices(prices: &[f64]) -> Self {
            Self::new(prices.iter().map(|p| FeedTick::Price(*p)))
        }

        pub fn remaining(&self) -> usize {
            self.ticks.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PriceFeed for MockPriceFeed {
        async fn get_pool_info(&self) -> Result<Option<PoolInfo>> {
            let tick = self.ticks.lock().unwrap().pop_front();
            match tick {
                Some(FeedTick::Price(price)) => Ok(Some(PoolInfo {
                    token_price: price,
                    base_reserve: price,
                    quote_reserve: 1.0,
                    base_mint: Pubkey::default(),
                    quote_mint: Pubkey::default(),
                })),
                Some(FeedTick::Fail) => Err(Error::Rpc("Mock feed failure".into())),
                Some(FeedTick::Missing) | None => Ok(None),
            }
        }
    }
}
