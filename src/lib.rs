pub mod bot;
pub mod config;
pub mod consts;
pub mod errors;
pub mod execution;
pub mod helpers;
pub mod market;
pub mod runner;
pub mod strategy;

pub use bot::{Bot, RunnerConfig};
pub use consts::{EPSILON, MAX_BUNDLE_TRANSACTIONS, NATIVE_MINT};
pub use errors::{Error, ErrorKind, Result};
pub use execution::{BundleReceipt, ExecutionPipeline, TradeExecutor, TradeRequest};
pub use market::{PoolInfo, PriceFeed};
pub use runner::BotRunner;
pub use strategy::{StrategyState, ThresholdParams, ThresholdStrategy, TradeAction};
