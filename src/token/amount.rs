//! Exact conversion between human-entered decimal amounts and ledger base units.
//!
//! Everything here is base-10 integer arithmetic on [`Decimal`]; floating point
//! never touches an amount that ends up on chain.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{LaunchError, Result};

/// Largest decimals value accepted for a new mint.
pub const MAX_DECIMALS: u8 = 9;

/// SOL is tracked in lamports, 10^9 per SOL.
pub const SOL_DECIMALS: u8 = 9;

/// Parses a user-entered decimal string such as `"1000000"` or `"0.5"`.
///
/// Digit strings too long for the decimal representation are reported as
/// overflow rather than malformed input.
pub fn parse_decimal(field: &str, raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LaunchError::validation(format!("{} is required", field)));
    }
    Decimal::from_str(trimmed).map_err(|e| {
        let numeric = trimmed.chars().all(|c| c.is_ascii_digit() || c == '.');
        if numeric {
            LaunchError::Overflow(format!("{} '{}' is out of range: {}", field, trimmed, e))
        } else {
            LaunchError::validation(format!("{} '{}' is not a decimal number", field, trimmed))
        }
    })
}

/// Scales `amount` by `10^decimals` into the ledger's u64 amount type.
pub fn to_base_units(field: &str, amount: Decimal, decimals: u8) -> Result<u64> {
    if decimals > MAX_DECIMALS {
        return Err(LaunchError::validation(format!(
            "decimals must be between 0 and {}, got {}",
            MAX_DECIMALS, decimals
        )));
    }
    if amount.is_sign_negative() {
        return Err(LaunchError::validation(format!("{} must not be negative", field)));
    }
    let factor = Decimal::from(10u64.pow(decimals as u32));
    let scaled = amount.checked_mul(factor).ok_or_else(|| {
        LaunchError::Overflow(format!(
            "{} {} × 10^{} exceeds the ledger amount range",
            field, amount, decimals
        ))
    })?;
    if !scaled.fract().is_zero() {
        return Err(LaunchError::validation(format!(
            "{} {} has more fractional digits than {} decimals allow",
            field, amount, decimals
        )));
    }
    scaled.to_u64().ok_or_else(|| {
        LaunchError::Overflow(format!(
            "{} {} × 10^{} = {} exceeds the ledger maximum of {}",
            field,
            amount,
            decimals,
            scaled.normalize(),
            u64::MAX
        ))
    })
}

/// `supply × 10^decimals`, the amount minted into the requester's account.
pub fn adjusted_supply(supply: Decimal, decimals: u8) -> Result<u64> {
    to_base_units("supply", supply, decimals)
}

pub fn sol_to_lamports(sol: Decimal) -> Result<u64> {
    to_base_units("solAmount", sol, SOL_DECIMALS)
}

/// Inverse of [`to_base_units`], used for display.
pub fn from_base_units(amount: u64, decimals: u8) -> Decimal {
    Decimal::from_i128_with_scale(amount as i128, decimals as u32).normalize()
}
