use anchor_lang::prelude::*;

use crate::{
    constants::{VIRTUAL_ASSETS, VIRTUAL_SHARES},
    errors::VaultError,
    math::{checked_add, checked_sub, mul_div, Rounding},
    state::{HolderPosition, VaultState},
};

impl VaultState {
    /// Shares worth `assets` at the current rate
    ///
    /// ERC-4626 formula with a virtual offset:
    /// shares = assets * (totalShares + 10^6) / (totalAssets + 10^3)
    ///
    /// The offset applies at every supply, so a first depositor who donates
    /// to the source cannot push the rate far enough to round a victim's
    /// deposit away.
    pub fn convert_to_shares(
        &self,
        assets: u64,
        total_assets: u64,
        rounding: Rounding,
    ) -> Result<u64> {
        mul_div(
            assets,
            checked_add(self.total_shares, VIRTUAL_SHARES)?,
            checked_add(total_assets, VIRTUAL_ASSETS)?,
            rounding,
        )
    }

    /// Assets backing `shares` at the current rate
    ///
    /// assets = shares * (totalAssets + 10^3) / (totalShares + 10^6)
    pub fn convert_to_assets(
        &self,
        shares: u64,
        total_assets: u64,
        rounding: Rounding,
    ) -> Result<u64> {
        mul_div(
            shares,
            checked_add(total_assets, VIRTUAL_ASSETS)?,
            checked_add(self.total_shares, VIRTUAL_SHARES)?,
            rounding,
        )
    }

    pub fn mint(&mut self, position: &mut HolderPosition, shares: u64) -> Result<()> {
        position.shares = checked_add(position.shares, shares)?;
        self.total_shares = checked_add(self.total_shares, shares)?;
        Ok(())
    }

    pub fn burn(&mut self, position: &mut HolderPosition, shares: u64) -> Result<()> {
        require!(
            shares <= position.shares,
            VaultError::InsufficientBalance
        );
        position.shares -= shares;
        self.total_shares = checked_sub(self.total_shares, shares)?;
        Ok(())
    }
}
