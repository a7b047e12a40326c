use anchor_lang::prelude::*;

use crate::{
    constants::{BPS_DENOMINATOR, MAX_FEE_BPS, SECONDS_PER_YEAR},
    errors::VaultError,
    math::{bps_of, checked_add, checked_sub},
    state::VaultState,
};

impl VaultState {
    /// Mints the management fee owed since the last collection into
    /// `accrued_fee_shares`, returns the shares minted.
    ///
    /// fee_shares = total_shares * bps * elapsed / (10000 * seconds_per_year)
    ///
    /// The collection clock advances even when nothing is owed (zero rate or
    /// empty vault) so that time is never charged retroactively.
    pub fn settle_management_fee(&mut self, now: i64) -> Result<u64> {
        let elapsed = now.saturating_sub(self.last_fee_collection_ts);
        if elapsed <= 0 {
            return Ok(0);
        }

        if self.management_fee_bps == 0 || self.total_shares == 0 {
            self.last_fee_collection_ts = now;
            return Ok(0);
        }

        let fee_shares = (self.total_shares as u128)
            .checked_mul(self.management_fee_bps as u128)
            .and_then(|v| v.checked_mul(elapsed as u128))
            .ok_or(error!(VaultError::MathOverflow))?
            / (BPS_DENOMINATOR as u128 * SECONDS_PER_YEAR as u128);
        let fee_shares =
            u64::try_from(fee_shares).map_err(|_| error!(VaultError::MathOverflow))?;

        self.total_shares = checked_add(self.total_shares, fee_shares)?;
        self.accrued_fee_shares = checked_add(self.accrued_fee_shares, fee_shares)?;
        self.last_fee_collection_ts = now;

        if fee_shares > 0 {
            msg!(
                "Management fee settled: {} shares over {}s, {} accrued",
                fee_shares,
                elapsed,
                self.accrued_fee_shares
            );
        }

        Ok(fee_shares)
    }

    /// Splits a withdrawal into `(net, fee)`; the fee never leaves the vault
    pub fn apply_withdrawal_fee(&self, assets: u64) -> Result<(u64, u64)> {
        let fee = bps_of(assets, self.withdrawal_fee_bps)?;
        Ok((checked_sub(assets, fee)?, fee))
    }

    /// Burns the fee recipient's accrued shares, returns how many
    pub fn take_accrued_fee_shares(&mut self) -> Result<u64> {
        let shares = self.accrued_fee_shares;
        self.total_shares = checked_sub(self.total_shares, shares)?;
        self.accrued_fee_shares = 0;
        Ok(shares)
    }

    /// Settles at the old rate before switching so elapsed time is never
    /// billed at the new one
    pub fn set_management_fee(&mut self, fee_bps: u16, now: i64) -> Result<()> {
        require!(fee_bps <= MAX_FEE_BPS, VaultError::InvalidFee);
        self.settle_management_fee(now)?;
        self.management_fee_bps = fee_bps;
        Ok(())
    }

    pub fn set_withdrawal_fee(&mut self, fee_bps: u16) -> Result<()> {
        require!(fee_bps <= MAX_FEE_BPS, VaultError::InvalidFee);
        self.withdrawal_fee_bps = fee_bps;
        Ok(())
    }
}
