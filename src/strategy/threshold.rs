//! Threshold strategy with debounced sell confirmation
//!
//! A pure decision function: given the latest pool price and the previous
//! [`StrategyState`], produce the next state and at most one [`TradeAction`].
//!
//! ```text
//!   Idle ──buy trigger──▶ Holding ──rise trigger──▶ ConfirmingSell
//!    ▲                      │  ▲                        │      │
//!    │                      │  └──── false breakout ────┘      │
//!    └──── stop-loss ───────┘                                  │
//!    └──────────────────────── confirmed ──────────────────────┘
//! ```

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::consts::EPSILON;
use crate::errors::{Error, Result};
use crate::helpers::percent_deviation;

use super::action::{SellReason, TradeAction};
use super::state::{PendingSell, StrategyState};

/// Tunable thresholds, all percentages expressed as e.g. `14.0` for 14%
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdParams {
    /// Buy when price falls this far below the reference high
    pub buy_drop_percent: f64,
    /// Arm a pending sell when price rises this far above entry
    pub sell_rise_percent: f64,
    /// Sell immediately when price falls this far below entry
    pub stop_loss_percent: f64,
    /// Maximum deviation from the spike price that still counts as confirmation
    pub confirmation_threshold_percent: f64,
    /// Ticks inside the band required before selling
    pub confirmation_ticks: u32,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            buy_drop_percent: 14.0,
            sell_rise_percent: 6.0,
            stop_loss_percent: 8.0,
            confirmation_threshold_percent: 10.0,
            confirmation_ticks: 2,
        }
    }
}

impl ThresholdParams {
    pub fn validate(&self) -> Result<()> {
        let percents = [
            ("buy_drop_percent", self.buy_drop_percent),
            ("sell_rise_percent", self.sell_rise_percent),
            ("stop_loss_percent", self.stop_loss_percent),
            ("confirmation_threshold_percent", self.confirmation_threshold_percent),
        ];
        for (name, value) in percents {
            if !(value > 0.0 && value < 100.0) {
                return Err(Error::Config(format!(
                    "{} must be in (0, 100), got {}",
                    name, value
                )));
            }
        }
        if self.confirmation_ticks == 0 {
            return Err(Error::Config("confirmation_ticks must be at least 1".into()));
        }
        Ok(())
    }

    fn buy_line(&self, last_high: f64) -> f64 {
        last_high * (1.0 - self.buy_drop_percent / 100.0)
    }

    fn stop_loss_line(&self, entry: f64) -> f64 {
        entry * (1.0 - self.stop_loss_percent / 100.0)
    }

    fn rise_line(&self, entry: f64) -> f64 {
        entry * (1.0 + self.sell_rise_percent / 100.0)
    }
}

fn at_or_below(value: f64, line: f64) -> bool {
    value <= line + line.abs() * EPSILON
}

fn at_or_above(value: f64, line: f64) -> bool {
    value >= line - line.abs() * EPSILON
}

/// Deterministic decision engine; holds only its parameters
#[derive(Debug, Clone, Default)]
pub struct ThresholdStrategy {
    params: ThresholdParams,
}

impl ThresholdStrategy {
    pub fn new(params: ThresholdParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ThresholdParams {
        &self.params
    }

    /// Evaluate one price observation.
    ///
    /// Returns `Error::InvalidPrice` for a zero, negative or non-finite price;
    /// the caller treats that like a failed feed read and skips the tick.
    pub fn evaluate(&self, price: f64, state: &StrategyState) -> Result<(StrategyState, TradeAction)> {
        if !price.is_finite() || price <= 0.0 {
            return Err(Error::InvalidPrice(price));
        }

        let mut next = *state;
        // Watermarks are seeded once and only move again when a trade executes
        if next.last_high.is_none() {
            next.last_high = Some(price);
        }
        if next.last_low.is_none() {
            next.last_low = Some(price);
        }

        let mut false_breakout = false;
        if next.pending_sell.active {
            if next.entry_price.is_none() {
                // A pending sell without a position cannot be confirmed into anything
                next.pending_sell = PendingSell::default();
            } else {
                let target = next.pending_sell.target_price;
                let deviation = percent_deviation(price, target);
                if at_or_below(deviation, self.params.confirmation_threshold_percent) {
                    next.pending_sell.ticks_count += 1;
                    debug!(
                        "Sell confirmation tick {}/{} at {} (target {}, deviation {:.2}%)",
                        next.pending_sell.ticks_count,
                        self.params.confirmation_ticks,
                        price,
                        target,
                        deviation
                    );
                    if next.pending_sell.ticks_count >= self.params.confirmation_ticks {
                        info!("Price spike confirmed at {}, selling", price);
                        next.pending_sell = PendingSell::default();
                        return Ok((next, TradeAction::Sell(SellReason::Confirmed)));
                    }
                    return Ok((next, TradeAction::None));
                }
                info!(
                    "False price spike: {} deviates {:.2}% from {}, cancelling sell",
                    price, deviation, target
                );
                next.pending_sell = PendingSell::default();
                false_breakout = true;
            }
        }

        match next.entry_price {
            None => {
                let high = next.last_high.unwrap_or(price);
                if at_or_below(price, self.params.buy_line(high)) {
                    info!("Price {} dropped {}% below high {}, buying", price, self.params.buy_drop_percent, high);
                    return Ok((next, TradeAction::Buy));
                }
            }
            Some(entry) => {
                if at_or_below(price, self.params.stop_loss_line(entry)) {
                    info!("Stop-loss hit: price {} vs entry {}", price, entry);
                    next.cooldown_requested = true;
                    return Ok((next, TradeAction::Sell(SellReason::StopLoss)));
                }
                if !false_breakout && at_or_above(price, self.params.rise_line(entry)) {
                    info!("Price spike detected at {} (entry {}), starting confirmation", price, entry);
                    next.pending_sell = PendingSell::armed(price);
                }
            }
        }

        Ok((next, TradeAction::None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::action::TradeSide;
    use crate::strategy::state::Phase;

    fn holding(entry: f64) -> StrategyState {
        StrategyState {
            last_high: Some(entry),
            last_low: Some(entry),
            entry_price: Some(entry),
            ..StrategyState::default()
        }
    }

    fn engine() -> ThresholdStrategy {
        ThresholdStrategy::new(ThresholdParams::default())
    }

    #[test]
    fn test_first_observation_seeds_watermarks() {
        let (state, action) = engine().evaluate(50.0, &StrategyState::new()).unwrap();
        assert_eq!(action, TradeAction::None);
        assert_eq!(state.last_high, Some(50.0));
        assert_eq!(state.last_low, Some(50.0));
        assert!(state.entry_price.is_none());
    }

    #[test]
    fn test_rejects_degenerate_prices() {
        let state = StrategyState::new();
        for price in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                engine().evaluate(price, &state),
                Err(Error::InvalidPrice(_))
            ));
        }
    }

    #[test]
    fn test_same_price_twice_is_stable() {
        let state = StrategyState {
            last_high: Some(100.0),
            last_low: Some(100.0),
            ..StrategyState::default()
        };
        for price in [100.0, 110.0, 95.0] {
            let (first, a1) = engine().evaluate(price, &state).unwrap();
            let (second, a2) = engine().evaluate(price, &first).unwrap();
            assert_eq!(a1, TradeAction::None);
            assert_eq!(a2, TradeAction::None);
            assert_eq!(first, state, "state moved at {}", price);
            assert_eq!(second, state, "state moved at {}", price);
        }
    }

    #[test]
    fn test_buy_scenario() {
        let state = StrategyState {
            last_high: Some(100.0),
            last_low: Some(100.0),
            ..StrategyState::default()
        };
        let (mut state, action) = engine().evaluate(85.0, &state).unwrap();
        assert_eq!(action, TradeAction::Buy);
        // Entry is recorded only once the trade has executed
        assert!(state.entry_price.is_none());
        state.apply_executed(TradeSide::Buy, 85.0);
        assert_eq!(state.entry_price, Some(85.0));
        assert_eq!(state.phase(), Phase::Holding);
    }

    #[test]
    fn test_no_buy_above_drop_line() {
        let state = StrategyState {
            last_high: Some(100.0),
            last_low: Some(100.0),
            ..StrategyState::default()
        };
        let (_, action) = engine().evaluate(86.5, &state).unwrap();
        assert_eq!(action, TradeAction::None);
    }

    #[test]
    fn test_buy_line_anchored_to_seeded_high() {
        let e = engine();
        let state = StrategyState::new();
        let (state, _) = e.evaluate(100.0, &state).unwrap();
        let (state, _) = e.evaluate(130.0, &state).unwrap();
        assert_eq!(state.last_high, Some(100.0));
        assert_eq!(state.last_low, Some(100.0));
        // Buy line stays at 100 * 0.86 = 86 after the spike
        let (state, action) = e.evaluate(111.0, &state).unwrap();
        assert_eq!(action, TradeAction::None);
        let (state, action) = e.evaluate(87.0, &state).unwrap();
        assert_eq!(action, TradeAction::None);
        let (_, action) = e.evaluate(86.0, &state).unwrap();
        assert_eq!(action, TradeAction::Buy);
    }

    #[test]
    fn test_executed_trade_reseeds_watermarks() {
        let e = engine();
        let mut state = holding(85.0);
        state.apply_executed(TradeSide::Sell, 120.0);
        let (state, _) = e.evaluate(150.0, &state).unwrap();
        assert_eq!(state.last_high, Some(120.0));
        // 120 * 0.86 = 103.2
        let (_, action) = e.evaluate(103.0, &state).unwrap();
        assert_eq!(action, TradeAction::Buy);
    }

    #[test]
    fn test_confirmed_sell_scenario() {
        let e = engine();
        let (state, action) = e.evaluate(90.1, &holding(85.0)).unwrap();
        assert_eq!(action, TradeAction::None);
        assert_eq!(state.pending_sell, PendingSell { active: true, target_price: 90.1, ticks_count: 0 });
        assert_eq!(state.phase(), Phase::ConfirmingSell);

        let (state, action) = e.evaluate(91.0, &state).unwrap();
        assert_eq!(action, TradeAction::None);
        assert_eq!(state.pending_sell.ticks_count, 1);

        let (mut state, action) = e.evaluate(90.5, &state).unwrap();
        assert_eq!(action, TradeAction::Sell(SellReason::Confirmed));
        assert!(!state.pending_sell.active);
        assert!(!state.cooldown_requested);

        state.apply_executed(TradeSide::Sell, 90.5);
        assert!(state.entry_price.is_none());
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn test_false_breakout_scenario() {
        let e = engine();
        let mut state = holding(85.0);
        state.pending_sell = PendingSell::armed(90.1);

        let (state, action) = e.evaluate(105.0, &state).unwrap();
        assert_eq!(action, TradeAction::None);
        assert!(!state.pending_sell.active);
        assert_eq!(state.entry_price, Some(85.0));
        assert_eq!(state.phase(), Phase::Holding);
    }

    #[test]
    fn test_false_breakout_does_not_hide_stop_loss() {
        let e = engine();
        let mut state = holding(85.0);
        state.pending_sell = PendingSell::armed(90.1);

        let (state, action) = e.evaluate(70.0, &state).unwrap();
        assert_eq!(action, TradeAction::Sell(SellReason::StopLoss));
        assert!(!state.pending_sell.active);
        assert!(state.cooldown_requested);
    }

    #[test]
    fn test_rise_rearms_on_tick_after_false_breakout() {
        let e = engine();
        let mut state = holding(85.0);
        state.pending_sell = PendingSell::armed(90.1);

        let (state, _) = e.evaluate(105.0, &state).unwrap();
        let (state, action) = e.evaluate(105.0, &state).unwrap();
        assert_eq!(action, TradeAction::None);
        assert_eq!(state.pending_sell, PendingSell::armed(105.0));
    }

    #[test]
    fn test_out_of_band_tick_resets_confirmation() {
        let e = engine();
        let mut state = holding(85.0);
        state.pending_sell = PendingSell { active: true, target_price: 90.1, ticks_count: 1 };

        let (state, action) = e.evaluate(80.0, &state).unwrap();
        assert_eq!(action, TradeAction::None);
        assert!(!state.pending_sell.active);
        assert_eq!(state.entry_price, Some(85.0));
    }

    #[test]
    fn test_stop_loss_scenario() {
        let (mut state, action) = engine().evaluate(78.2, &holding(85.0)).unwrap();
        assert_eq!(action, TradeAction::Sell(SellReason::StopLoss));
        assert!(state.cooldown_requested);
        assert!(!state.pending_sell.active);

        state.apply_executed(TradeSide::Sell, 78.2);
        assert!(state.entry_price.is_none());
        assert!(state.take_cooldown());
    }

    #[test]
    fn test_stop_loss_and_arming_are_exclusive() {
        let e = engine();
        let prices = [60.0, 70.0, 78.2, 80.0, 85.0, 90.1, 95.0, 120.0];
        for price in prices {
            let (state, action) = e.evaluate(price, &holding(85.0)).unwrap();
            let armed = state.pending_sell.active;
            assert!(!(action.is_stop_loss() && armed), "both fired at {}", price);
        }
    }

    #[test]
    fn test_pending_sell_blocks_stop_loss_checks() {
        let params = ThresholdParams {
            confirmation_threshold_percent: 50.0,
            ..ThresholdParams::default()
        };
        let e = ThresholdStrategy::new(params);
        let mut state = holding(85.0);
        state.pending_sell = PendingSell::armed(90.1);

        // Inside the (wide) band, so the tick counts towards confirmation
        let (state, action) = e.evaluate(60.0, &state).unwrap();
        assert_eq!(action, TradeAction::None);
        assert_eq!(state.pending_sell.ticks_count, 1);
        assert!(!state.cooldown_requested);
    }

    #[test]
    fn test_entry_stays_unset_without_executed_buy() {
        let e = engine();
        let mut state = StrategyState::new();
        for price in [100.0, 90.0, 80.0, 70.0, 120.0, 60.0] {
            let (next, _) = e.evaluate(price, &state).unwrap();
            assert!(next.entry_price.is_none());
            assert!(next.is_consistent());
            state = next;
        }
    }

    #[test]
    fn test_single_tick_confirmation() {
        let params = ThresholdParams {
            confirmation_ticks: 1,
            ..ThresholdParams::default()
        };
        let e = ThresholdStrategy::new(params);
        let (state, _) = e.evaluate(90.1, &holding(85.0)).unwrap();
        let (_, action) = e.evaluate(90.2, &state).unwrap();
        assert_eq!(action, TradeAction::Sell(SellReason::Confirmed));
    }

    #[test]
    fn test_params_validation() {
        assert!(ThresholdParams::default().validate().is_ok());
        let bad = ThresholdParams { stop_loss_percent: 0.0, ..ThresholdParams::default() };
        assert!(bad.validate().is_err());
        let bad = ThresholdParams { buy_drop_percent: 120.0, ..ThresholdParams::default() };
        assert!(bad.validate().is_err());
        let bad = ThresholdParams { confirmation_ticks: 0, ..ThresholdParams::default() };
        assert!(bad.validate().is_err());
    }
}
