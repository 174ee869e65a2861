//! Core data types for pool observation

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Token account balance as reported by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenAmount {
    /// Raw integer amount
    pub amount: u64,
    pub decimals: u8,
    /// Amount scaled by `decimals`
    pub ui_amount: f64,
}

impl TokenAmount {
    pub fn new(amount: u64, decimals: u8) -> Self {
        Self {
            amount,
            decimals,
            ui_amount: crate::helpers::ui_amount(amount, decimals as u64),
        }
    }
}

/// Snapshot of the observed pool for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolInfo {
    /// Derived spot price (base reserve over quote reserve, 8 decimals)
    pub token_price: f64,
    /// Effective base-side reserve in UI units
    pub base_reserve: f64,
    /// Effective quote-side reserve in UI units
    pub quote_reserve: f64,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
}
