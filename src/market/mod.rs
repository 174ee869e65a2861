//! Market Module
//!
//! Everything needed to observe the traded pool:
//!
//! - [`Ledger`] - read-only chain access (accounts, balances, blockhash)
//! - [`PriceFeed`] - yields one [`PoolInfo`] per tick
//! - [`RaydiumPoolFeed`] - derives the spot price from a Raydium AMM v4 pool,
//!   its vaults and its OpenBook open-orders account

pub mod amm;
pub mod feed;
pub mod ledger;
mod types;

pub use amm::{AmmPoolState, OpenOrdersTotals};
pub use feed::{PriceFeed, RaydiumPoolFeed};
pub use ledger::{Ledger, RpcLedger};
pub use types::{PoolInfo, TokenAmount};
