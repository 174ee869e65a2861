//! Core data types for trade execution

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use uuid::Uuid;

use crate::helpers::native_mint;
use crate::strategy::TradeSide;

/// Wire format requested from the transaction builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TxVersion {
    #[default]
    #[serde(rename = "LEGACY")]
    Legacy,
    #[serde(rename = "V0")]
    V0,
}

impl TxVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxVersion::Legacy => "LEGACY",
            TxVersion::V0 => "V0",
        }
    }
}

/// How much of the input asset to spend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAmount {
    /// Fixed raw amount of the input asset
    Exact(u64),
    /// Whatever the wallet holds of the input asset at execution time
    FullBalance,
}

/// A single trade to execute as one atomic bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    /// Correlation id carried through logs
    pub id: Uuid,
    pub side: TradeSide,
    /// Mint of the traded token
    pub mint: Pubkey,
    pub amount: TradeAmount,
}

impl TradeRequest {
    /// Spend `lamports` of SOL on `mint`
    pub fn buy(mint: Pubkey, lamports: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            side: TradeSide::Buy,
            mint,
            amount: TradeAmount::Exact(lamports),
        }
    }

    /// Sell the entire holding of `mint`
    pub fn sell(mint: Pubkey) -> Self {
        Self {
            id: Uuid::new_v4(),
            side: TradeSide::Sell,
            mint,
            amount: TradeAmount::FullBalance,
        }
    }

    /// Input/output mints for this trade
    pub fn leg(&self) -> SwapLeg {
        SwapLeg::for_trade(self.side, self.mint)
    }
}

/// Input and output asset of a swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapLeg {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
}

impl SwapLeg {
    /// Buy: SOL -> token, Sell: token -> SOL
    pub fn for_trade(side: TradeSide, mint: Pubkey) -> Self {
        let sol = native_mint();
        match side {
            TradeSide::Buy => Self { input_mint: sol, output_mint: mint },
            TradeSide::Sell => Self { input_mint: mint, output_mint: sol },
        }
    }

    pub fn input_is_native(&self) -> bool {
        self.input_mint == native_mint()
    }

    pub fn output_is_native(&self) -> bool {
        self.output_mint == native_mint()
    }

    /// SOL must be wrapped when it is spent
    pub fn wrap_sol(&self) -> bool {
        self.input_is_native() && !self.output_is_native()
    }

    /// Wrapped SOL must be closed back to native when it is received
    pub fn unwrap_sol(&self) -> bool {
        self.output_is_native() && !self.input_is_native()
    }
}

/// Relay incentive appended to the bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tip {
    pub account: Pubkey,
    pub lamports: u64,
}

/// Signed transactions sharing one recent blockhash, submitted as one unit
#[derive(Debug, Clone)]
pub struct SignedBundle {
    pub blockhash: Hash,
    /// Base58-encoded wire transactions, in submission order
    pub transactions: Vec<String>,
    /// First signature of each transaction, same order
    pub signatures: Vec<Signature>,
}

impl SignedBundle {
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Outcome of a bundle the relay accepted
#[derive(Debug, Clone, Serialize)]
pub struct BundleReceipt {
    pub request_id: Uuid,
    pub side: TradeSide,
    pub bundle_id: String,
    /// Raw input amount that was quoted
    pub input_amount: u64,
    /// Raw output amount the quote expected
    pub expected_output: u64,
    pub price_impact_pct: f64,
    pub transaction_count: usize,
    /// SOL balance read after submission, if the read succeeded
    pub sol_balance_after: Option<u64>,
    pub submitted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_leg_direction() {
        let mint = Pubkey::new_unique();

        let buy = TradeRequest::buy(mint, 1_000_000_000);
        let leg = buy.leg();
        assert_eq!(leg.input_mint, native_mint());
        assert_eq!(leg.output_mint, mint);
        assert!(leg.wrap_sol());
        assert!(!leg.unwrap_sol());
        assert_eq!(buy.amount, TradeAmount::Exact(1_000_000_000));

        let sell = TradeRequest::sell(mint);
        let leg = sell.leg();
        assert_eq!(leg.input_mint, mint);
        assert_eq!(leg.output_mint, native_mint());
        assert!(!leg.wrap_sol());
        assert!(leg.unwrap_sol());
        assert_eq!(sell.amount, TradeAmount::FullBalance);
    }

    #[test]
    fn test_requests_get_distinct_ids() {
        let mint = Pubkey::new_unique();
        assert_ne!(TradeRequest::sell(mint).id, TradeRequest::sell(mint).id);
    }

    #[test]
    fn test_tx_version_serde() {
        assert_eq!(serde_json::to_string(&TxVersion::Legacy).unwrap(), "\"LEGACY\"");
        assert_eq!(serde_json::from_str::<TxVersion>("\"V0\"").unwrap(), TxVersion::V0);
        assert_eq!(TxVersion::V0.as_str(), "V0");
    }
}
