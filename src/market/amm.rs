//! Raydium AMM v4 pool and OpenBook open-orders account decoding
//!
//! Only the fields needed to derive the spot price are read. All integers are
//! little-endian `u64`.

use solana_sdk::pubkey::Pubkey;

use crate::consts::PRICE_DECIMALS;
use crate::errors::{Error, Result};
use crate::helpers::{round_to_decimals, ui_amount};

/// Size of a Raydium AMM v4 liquidity state account
pub const AMM_V4_ACCOUNT_LEN: usize = 752;

const BASE_DECIMAL_OFFSET: usize = 32;
const QUOTE_DECIMAL_OFFSET: usize = 40;
const BASE_NEED_TAKE_PNL_OFFSET: usize = 192;
const QUOTE_NEED_TAKE_PNL_OFFSET: usize = 200;
const BASE_VAULT_OFFSET: usize = 336;
const QUOTE_VAULT_OFFSET: usize = 368;
const BASE_MINT_OFFSET: usize = 400;
const QUOTE_MINT_OFFSET: usize = 432;
const OPEN_ORDERS_OFFSET: usize = 496;
const MARKET_PROGRAM_ID_OFFSET: usize = 560;

/// Size of an OpenBook/Serum open-orders account
pub const OPEN_ORDERS_ACCOUNT_LEN: usize = 3228;

const OPEN_ORDERS_HEAD: &[u8; 5] = b"serum";
const OO_BASE_TOKEN_TOTAL_OFFSET: usize = 85;
const OO_QUOTE_TOKEN_TOTAL_OFFSET: usize = 101;

fn read_u64(data: &[u8], offset: usize) -> Result<u64> {
    data.get(offset..offset + 8)
        .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
        .map(u64::from_le_bytes)
        .ok_or_else(|| Error::Decode(format!("u64 at offset {} out of bounds", offset)))
}

fn read_pubkey(data: &[u8], offset: usize) -> Result<Pubkey> {
    data.get(offset..offset + 32)
        .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
        .map(Pubkey::new_from_array)
        .ok_or_else(|| Error::Decode(format!("pubkey at offset {} out of bounds", offset)))
}

/// Subset of the AMM v4 liquidity state
#[derive(Debug, Clone, PartialEq)]
pub struct AmmPoolState {
    pub base_decimal: u64,
    pub quote_decimal: u64,
    pub base_need_take_pnl: u64,
    pub quote_need_take_pnl: u64,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub open_orders: Pubkey,
    pub market_program_id: Pubkey,
}

impl AmmPoolState {
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != AMM_V4_ACCOUNT_LEN {
            return Err(Error::Decode(format!(
                "AMM v4 account must be {} bytes, got {}",
                AMM_V4_ACCOUNT_LEN,
                data.len()
            )));
        }
        Ok(Self {
            base_decimal: read_u64(data, BASE_DECIMAL_OFFSET)?,
            quote_decimal: read_u64(data, QUOTE_DECIMAL_OFFSET)?,
            base_need_take_pnl: read_u64(data, BASE_NEED_TAKE_PNL_OFFSET)?,
            quote_need_take_pnl: read_u64(data, QUOTE_NEED_TAKE_PNL_OFFSET)?,
            base_vault: read_pubkey(data, BASE_VAULT_OFFSET)?,
            quote_vault: read_pubkey(data, QUOTE_VAULT_OFFSET)?,
            base_mint: read_pubkey(data, BASE_MINT_OFFSET)?,
            quote_mint: read_pubkey(data, QUOTE_MINT_OFFSET)?,
            open_orders: read_pubkey(data, OPEN_ORDERS_OFFSET)?,
            market_program_id: read_pubkey(data, MARKET_PROGRAM_ID_OFFSET)?,
        })
    }
}

/// Token totals held by the pool's open orders on the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOrdersTotals {
    pub base_token_total: u64,
    pub quote_token_total: u64,
}

impl OpenOrdersTotals {
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < OPEN_ORDERS_ACCOUNT_LEN || !data.starts_with(OPEN_ORDERS_HEAD) {
            return Err(Error::Decode("not an open-orders account".into()));
        }
        Ok(Self {
            base_token_total: read_u64(data, OO_BASE_TOKEN_TOTAL_OFFSET)?,
            quote_token_total: read_u64(data, OO_QUOTE_TOKEN_TOTAL_OFFSET)?,
        })
    }
}

/// Effective reserves: vault balance plus tokens parked in open orders, minus
/// PnL the pool still owes to the protocol.
pub fn effective_reserves(
    pool: &AmmPoolState,
    open_orders: &OpenOrdersTotals,
    base_vault_ui: f64,
    quote_vault_ui: f64,
) -> (f64, f64) {
    let base = base_vault_ui + ui_amount(open_orders.base_token_total, pool.base_decimal)
        - ui_amount(pool.base_need_take_pnl, pool.base_decimal);
    let quote = quote_vault_ui + ui_amount(open_orders.quote_token_total, pool.quote_decimal)
        - ui_amount(pool.quote_need_take_pnl, pool.quote_decimal);
    (base, quote)
}

/// Spot price as base reserve over quote reserve, rounded to 8 decimals
pub fn token_price(base_reserve: f64, quote_reserve: f64) -> Result<f64> {
    let price = round_to_decimals(base_reserve / quote_reserve, PRICE_DECIMALS);
    if !price.is_finite() || price <= 0.0 {
        return Err(Error::InvalidPrice(price));
    }
    Ok(price)
}
