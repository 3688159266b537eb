//! Provisional liquidity pricing.
//!
//! The token side of a new pool is `solAmount × (supply / 100)`, floored to
//! the mint's decimals so it is always expressible in base units. This is a
//! placeholder, not a market model; it lives here alone so it can be swapped
//! for a curve or oracle without touching the orchestrator or the wizard.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{LaunchError, Result};

const SUPPLY_DIVISOR: u32 = 100;

/// Token amount paired with `sol` SOL for a token of total `supply` with
/// `decimals` decimals. Digits below the smallest base unit are dropped.
pub fn derive_token_amount(sol: Decimal, supply: Decimal, decimals: u8) -> Result<Decimal> {
    let per_sol = supply / Decimal::from(SUPPLY_DIVISOR);
    let amount = sol.checked_mul(per_sol).ok_or_else(|| {
        LaunchError::Overflow(format!(
            "token amount for {} SOL against supply {} is out of range",
            sol, supply
        ))
    })?;
    Ok(amount
        .round_dp_with_strategy(decimals as u32, RoundingStrategy::ToZero)
        .normalize())
}

/// SOL per token at pool creation.
pub fn initial_price(sol: Decimal, token: Decimal) -> Result<Decimal> {
    if token.is_zero() {
        return Err(LaunchError::DivideByZero(
            "initial price is undefined for a zero token amount".to_string(),
        ));
    }
    sol.checked_div(token)
        .map(|d| d.normalize())
        .ok_or_else(|| LaunchError::Overflow(format!("price {} / {} is out of range", sol, token)))
}
