use std::str::FromStr;

use solana_sdk::pubkey::Pubkey;

use crate::errors::{Error, Result};

/// Round `value` half-away-from-zero to `decimals` places
pub fn round_to_decimals(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Relative distance of `price` from `reference`, in percent
pub fn percent_deviation(price: f64, reference: f64) -> f64 {
    ((price - reference) / reference * 100.0).abs()
}

/// Convert a raw integer token amount into UI units
pub fn ui_amount(raw: u64, decimals: u64) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / crate::consts::LAMPORTS_PER_SOL as f64
}

/// Parse a base58 address, mapping failures to a configuration error
pub fn parse_pubkey(label: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).map_err(|e| Error::Config(format!("invalid {} '{}': {}", label, value, e)))
}

pub fn native_mint() -> Pubkey {
    Pubkey::from_str(crate::consts::NATIVE_MINT).unwrap_or_default()
}

pub fn system_program_id() -> Pubkey {
    Pubkey::from_str(crate::consts::SYSTEM_PROGRAM_ID).unwrap_or_default()
}
