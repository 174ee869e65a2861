//! Execution Module
//!
//! Turns a [`TradeRequest`] into one atomic bundle:
//!
//! - [`SwapApi`] - quote, priority fee and unsigned transaction build
//! - [`signing`] - shared blockhash, relay tip, wallet signature
//! - [`BundleRelay`] - all-or-nothing submission
//! - [`ExecutionPipeline`] - ties the above together behind [`TradeExecutor`]

pub mod pipeline;
pub mod relay;
pub mod signing;
pub mod swap_api;
mod types;

pub use pipeline::{ExecutionConfig, ExecutionPipeline, TradeExecutor};
pub use relay::{BundleRelay, JitoRelay};
pub use swap_api::{PriorityFee, PriorityLevel, RaydiumSwapApi, SwapApi, SwapQuote};
pub use types::{BundleReceipt, SignedBundle, SwapLeg, Tip, TradeAmount, TradeRequest, TxVersion};
