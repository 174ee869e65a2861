//! Bot Module
//!
//! The Bot is the driver loop. It polls a [`PriceFeed`](crate::market::PriceFeed),
//! hands each price to the decision engine, and runs any resulting trade to
//! completion through a [`TradeExecutor`](crate::execution::TradeExecutor)
//! before the next poll.
//!
//! # Usage Pattern
//!
//! ```ignore
//! use raydium_bundle_bot::bot::{Bot, RunnerConfig};
//! use raydium_bundle_bot::strategy::{ThresholdParams, ThresholdStrategy};
//!
//! let strategy = ThresholdStrategy::new(ThresholdParams::default());
//! let mut bot = Bot::new(feed, pipeline, strategy, mint, 1_000_000_000, RunnerConfig::default());
//!
//! // Never returns; every error is logged and the next tick proceeds
//! bot.run().await;
//! ```

mod bot;

pub use bot::{Bot, BotStats, RunnerConfig, TickOutcome};
