//! Strategy state threaded through every evaluation

use serde::{Deserialize, Serialize};

use super::action::TradeSide;

/// Debounce state for a price spike awaiting confirmation before selling
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PendingSell {
    pub active: bool,
    /// Price of the tick that armed the pending sell
    pub target_price: f64,
    /// Consecutive ticks observed inside the confirmation band
    pub ticks_count: u32,
}

impl PendingSell {
    /// Arm a pending sell at `target_price`
    pub fn armed(target_price: f64) -> Self {
        Self {
            active: true,
            target_price,
            ticks_count: 0,
        }
    }
}

/// High-level phase of the strategy, derived from the raw state fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No open position
    Idle,
    /// Position open, no pending sell
    Holding,
    /// Position open, waiting for the spike to be confirmed
    ConfirmingSell,
}

/// In-memory strategy state. Starts empty on every process start.
///
/// `entry_price` is set exactly while a position is open; a pending sell can
/// only be active while a position is open.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StrategyState {
    /// Reference high, seeded by the first price and reset on each executed trade
    pub last_high: Option<f64>,
    /// Reference low, seeded by the first price and reset on each executed trade
    pub last_low: Option<f64>,
    /// Price at which the current position was opened
    pub entry_price: Option<f64>,
    pub pending_sell: PendingSell,
    /// Set by a stop-loss exit; the driver pauses and then clears it
    pub cooldown_requested: bool,
}

impl StrategyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_position(&self) -> bool {
        self.entry_price.is_some()
    }

    pub fn phase(&self) -> Phase {
        match (self.entry_price, self.pending_sell.active) {
            (None, _) => Phase::Idle,
            (Some(_), false) => Phase::Holding,
            (Some(_), true) => Phase::ConfirmingSell,
        }
    }

    /// Record a trade that the execution pipeline reported as successful.
    ///
    /// Both sides reset the high/low watermarks to the execution price.
    pub fn apply_executed(&mut self, side: TradeSide, price: f64) {
        match side {
            TradeSide::Buy => self.entry_price = Some(price),
            TradeSide::Sell => {
                self.entry_price = None;
                self.pending_sell = PendingSell::default();
            }
        }
        self.last_high = Some(price);
        self.last_low = Some(price);
    }

    /// Clear the stop-loss cooldown marker, returning whether it was set
    pub fn take_cooldown(&mut self) -> bool {
        std::mem::take(&mut self.cooldown_requested)
    }

    /// Check the structural invariants of the state
    pub fn is_consistent(&self) -> bool {
        !self.pending_sell.active || self.entry_price.is_some()
    }
}
