//! Strategy action types

use serde::{Deserialize, Serialize};

/// Direction of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a sell was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SellReason {
    /// Spike held inside the confirmation band for enough ticks
    Confirmed,
    /// Price fell through the stop-loss line
    StopLoss,
}

/// Action returned by one strategy evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TradeAction {
    #[default]
    None,
    Buy,
    Sell(SellReason),
}

impl TradeAction {
    pub fn is_none(&self) -> bool {
        matches!(self, TradeAction::None)
    }

    /// Trade direction, if this action trades at all
    pub fn side(&self) -> Option<TradeSide> {
        match self {
            TradeAction::None => None,
            TradeAction::Buy => Some(TradeSide::Buy),
            TradeAction::Sell(_) => Some(TradeSide::Sell),
        }
    }

    pub fn is_stop_loss(&self) -> bool {
        matches!(self, TradeAction::Sell(SellReason::StopLoss))
    }
}
