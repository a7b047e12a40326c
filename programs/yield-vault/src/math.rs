use anchor_lang::prelude::*;

use crate::{constants::BPS_DENOMINATOR, errors::VaultError};

/// Direction of integer rounding in a conversion.
///
/// Down when the vault pays out (minted shares, redeemed assets),
/// Up when the vault charges (burned shares for a withdrawal).
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

/// `a * b / c` with a u128 intermediate and explicit rounding
pub fn mul_div(a: u64, b: u64, c: u64, rounding: Rounding) -> Result<u64> {
    require!(c > 0, VaultError::MathOverflow);

    let product = (a as u128)
        .checked_mul(b as u128)
        .ok_or(error!(VaultError::MathOverflow))?;
    let denominator = c as u128;

    let mut quotient = product / denominator;
    if rounding == Rounding::Up && product % denominator != 0 {
        quotient += 1;
    }

    u64::try_from(quotient).map_err(|_| error!(VaultError::MathOverflow))
}

/// Portion of `amount` expressed by `bps`, rounded down
pub fn bps_of(amount: u64, bps: u16) -> Result<u64> {
    mul_div(amount, bps as u64, BPS_DENOMINATOR, Rounding::Down)
}

pub fn checked_add(a: u64, b: u64) -> Result<u64> {
    a.checked_add(b).ok_or(error!(VaultError::MathOverflow))
}

pub fn checked_sub(a: u64, b: u64) -> Result<u64> {
    a.checked_sub(b).ok_or(error!(VaultError::MathOverflow))
}
