//! Strategy Module
//!
//! The decision engine is a pure function of `(price, previous state)`:
//! it performs no I/O and never mutates the caller's state in place. The
//! driver owns the single [`StrategyState`] and threads it through
//! [`ThresholdStrategy::evaluate`] once per tick.
//!
//! # Example
//!
//! ```rust
//! use raydium_bundle_bot::strategy::{StrategyState, ThresholdParams, ThresholdStrategy, TradeAction};
//!
//! let engine = ThresholdStrategy::new(ThresholdParams::default());
//! let state = StrategyState {
//!     last_high: Some(100.0),
//!     last_low: Some(100.0),
//!     ..StrategyState::default()
//! };
//!
//! let (_next, action) = engine.evaluate(85.0, &state).unwrap();
//! assert_eq!(action, TradeAction::Buy);
//! ```

mod action;
mod state;
mod threshold;

pub use action::{SellReason, TradeAction, TradeSide};
pub use state::{PendingSell, Phase, StrategyState};
pub use threshold::{ThresholdParams, ThresholdStrategy};
