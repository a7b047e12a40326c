use anchor_lang::prelude::*;

use crate::{
    constants::{BPS_DENOMINATOR, MAX_FEE_BPS},
    errors::VaultError,
    math::{checked_add, checked_sub, mul_div, Rounding},
    state::{HolderPosition, VaultState},
    yield_source::YieldSource,
};

use super::router::StrategyRouter;

/// Where the assets of a payout come from. The caller moves `from_idle`
/// out of the vault's idle account; `from_source` was already sent by the
/// yield source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Payout {
    pub from_idle: u64,
    pub from_source: u64,
}

/// Result of a withdraw or redeem
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Exit {
    pub shares_burned: u64,
    /// Assets the recipient receives, fee already deducted
    pub assets_paid: u64,
    /// Withdrawal fee left in the vault
    pub fee: u64,
    pub payout: Payout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeClaim {
    pub shares_burned: u64,
    pub assets_paid: u64,
    pub payout: Payout,
}

/// Summary returned by the health query
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct VaultHealth {
    pub total_deposited: u64,
    pub current_apy_bps: u16,
    /// Share of total assets deployed to the source
    pub utilization_bps: u16,
    pub paused: bool,
}

/// The accounting engine: one vault aggregate plus its routed source.
///
/// Every mutating operation runs under the re-entrancy guard and either
/// completes or leaves the vault exactly as it found it.
pub struct VaultEngine<'a, 's> {
    vault: &'a mut VaultState,
    router: StrategyRouter<'s>,
}

impl<'a, 's> VaultEngine<'a, 's> {
    pub fn new(vault: &'a mut VaultState, source: Option<&'s mut dyn YieldSource>) -> Result<Self> {
        let router = StrategyRouter::bind(vault, source)?;
        Ok(Self { vault, router })
    }

    pub fn state(&self) -> &VaultState {
        &*self.vault
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Idle assets plus everything the active source manages
    pub fn total_assets(&self) -> Result<u64> {
        checked_add(self.vault.idle_assets, self.router.managed_assets()?)
    }

    pub fn total_shares(&self) -> u64 {
        self.vault.total_shares
    }

    pub fn balance_of(position: &HolderPosition) -> u64 {
        position.shares
    }

    pub fn current_apy_bps(&self) -> Result<u16> {
        self.router.current_rate_bps()
    }

    /// Asset value of the fee recipient's unclaimed shares
    pub fn accrued_fee_assets(&self) -> Result<u64> {
        let total_assets = self.total_assets()?;
        self.vault
            .convert_to_assets(self.vault.accrued_fee_shares, total_assets, Rounding::Down)
    }

    pub fn health(&self) -> Result<VaultHealth> {
        let managed = self.router.managed_assets()?;
        let total = checked_add(self.vault.idle_assets, managed)?;
        let utilization_bps = if total == 0 {
            0
        } else {
            mul_div(managed, BPS_DENOMINATOR, total, Rounding::Down)? as u16
        };

        Ok(VaultHealth {
            total_deposited: total,
            current_apy_bps: self.router.current_rate_bps()?,
            utilization_bps,
            paused: self.vault.paused,
        })
    }

    // ---------------------------------------------------------------------
    // Previews: same math as the real operations, fees settled on a copy
    // ---------------------------------------------------------------------

    fn settled_copy(&self, now: i64) -> Result<VaultState> {
        let mut draft = self.vault.clone();
        draft.settle_management_fee(now)?;
        Ok(draft)
    }

    pub fn preview_deposit(&self, assets: u64, now: i64) -> Result<u64> {
        let draft = self.settled_copy(now)?;
        draft.convert_to_shares(assets, self.total_assets()?, Rounding::Down)
    }

    /// Shares burned to take `assets` (gross) out of a position
    pub fn preview_withdraw(&self, assets: u64, now: i64) -> Result<u64> {
        let draft = self.settled_copy(now)?;
        draft.convert_to_shares(assets, self.total_assets()?, Rounding::Up)
    }

    /// Assets paid to the recipient for `shares`, fee deducted
    pub fn preview_redeem(&self, shares: u64, now: i64) -> Result<u64> {
        let draft = self.settled_copy(now)?;
        let gross = draft.convert_to_assets(shares, self.total_assets()?, Rounding::Down)?;
        let (net, _) = draft.apply_withdrawal_fee(gross)?;
        Ok(net)
    }

    // ---------------------------------------------------------------------
    // Guard
    // ---------------------------------------------------------------------

    /// Runs `op` with the re-entrancy flag set. On error the vault is put
    /// back exactly as it was, which also clears the flag.
    fn atomically<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        require!(!self.vault.locked, VaultError::ReentrantCall);

        let snapshot = self.vault.clone();
        self.vault.locked = true;

        match op(self) {
            Ok(value) => {
                self.vault.locked = false;
                Ok(value)
            }
            Err(e) => {
                *self.vault = snapshot;
                Err(e)
            }
        }
    }

    fn pay_out(&mut self, assets: u64, recipient: &Pubkey) -> Result<Payout> {
        let from_idle = assets.min(self.vault.idle_assets);
        self.vault.idle_assets -= from_idle;

        let from_source = assets - from_idle;
        if from_source > 0 {
            self.router.route_withdraw(from_source, recipient)?;
        }

        Ok(Payout {
            from_idle,
            from_source,
        })
    }

    // ---------------------------------------------------------------------
    // Holder operations
    // ---------------------------------------------------------------------

    /// Deposits `assets` already received into the idle account on behalf of
    /// `position.holder`, forwards them to the source, returns shares minted
    pub fn deposit(
        &mut self,
        assets: u64,
        position: &mut HolderPosition,
        now: i64,
    ) -> Result<u64> {
        let saved = position.clone();
        let result = self.atomically(|engine| engine.deposit_inner(assets, position, now));
        if result.is_err() {
            *position = saved;
        }
        result
    }

    fn deposit_inner(
        &mut self,
        assets: u64,
        position: &mut HolderPosition,
        now: i64,
    ) -> Result<u64> {
        // CHECKS
        require!(!self.vault.paused, VaultError::Paused);
        require!(assets > 0, VaultError::ZeroAmount);
        require!(position.holder != Pubkey::default(), VaultError::ZeroAddress);

        self.vault.settle_management_fee(now)?;

        let total_assets = self.total_assets()?;
        require!(
            checked_add(total_assets, assets)? <= self.vault.deposit_limit,
            VaultError::DepositLimitExceeded
        );

        let shares = self
            .vault
            .convert_to_shares(assets, total_assets, Rounding::Down)?;
        require!(shares > 0, VaultError::ZeroShares);

        // EFFECTS
        self.vault.idle_assets = checked_add(self.vault.idle_assets, assets)?;
        self.vault.mint(position, shares)?;

        // INTERACTIONS
        let deployed = self.router.route_deposit(assets)?;
        self.vault.idle_assets = checked_sub(self.vault.idle_assets, deployed)?;

        Ok(shares)
    }

    /// Takes `assets` (gross) out of the position, paying `assets - fee`
    /// to `recipient`. Shares burned round up.
    pub fn withdraw(
        &mut self,
        assets: u64,
        recipient: &Pubkey,
        owner: &Pubkey,
        position: &mut HolderPosition,
        now: i64,
    ) -> Result<Exit> {
        let saved = position.clone();
        let result = self.atomically(|engine| {
            engine.exit_checks(recipient, owner, position)?;
            require!(assets > 0, VaultError::ZeroAmount);

            engine.vault.settle_management_fee(now)?;
            let total_assets = engine.total_assets()?;
            let shares = engine
                .vault
                .convert_to_shares(assets, total_assets, Rounding::Up)?;

            engine.exit(shares, assets, recipient, position)
        });
        if result.is_err() {
            *position = saved;
        }
        result
    }

    /// Burns `shares` and pays their value, fee deducted, to `recipient`.
    /// Assets round down.
    pub fn redeem(
        &mut self,
        shares: u64,
        recipient: &Pubkey,
        owner: &Pubkey,
        position: &mut HolderPosition,
        now: i64,
    ) -> Result<Exit> {
        let saved = position.clone();
        let result = self.atomically(|engine| {
            engine.exit_checks(recipient, owner, position)?;
            require!(shares > 0, VaultError::ZeroAmount);

            engine.vault.settle_management_fee(now)?;
            let total_assets = engine.total_assets()?;
            let assets = engine
                .vault
                .convert_to_assets(shares, total_assets, Rounding::Down)?;
            require!(assets > 0, VaultError::ZeroAmount);

            engine.exit(shares, assets, recipient, position)
        });
        if result.is_err() {
            *position = saved;
        }
        result
    }

    fn exit_checks(
        &self,
        recipient: &Pubkey,
        owner: &Pubkey,
        position: &HolderPosition,
    ) -> Result<()> {
        require!(!self.vault.paused, VaultError::Paused);
        require!(*recipient != Pubkey::default(), VaultError::InvalidRecipient);
        require_keys_eq!(position.holder, *owner, VaultError::Unauthorized);
        Ok(())
    }

    fn exit(
        &mut self,
        shares: u64,
        gross_assets: u64,
        recipient: &Pubkey,
        position: &mut HolderPosition,
    ) -> Result<Exit> {
        let (net, fee) = self.vault.apply_withdrawal_fee(gross_assets)?;

        // EFFECTS
        self.vault.burn(position, shares)?;

        // INTERACTIONS
        let payout = self.pay_out(net, recipient)?;

        Ok(Exit {
            shares_burned: shares,
            assets_paid: net,
            fee,
            payout,
        })
    }

    // ---------------------------------------------------------------------
    // Fees
    // ---------------------------------------------------------------------

    /// Permissionless crank
    pub fn settle_fees(&mut self, now: i64) -> Result<u64> {
        self.atomically(|engine| engine.vault.settle_management_fee(now))
    }

    /// Redeems every accrued fee share to `recipient`
    pub fn claim_fees(&mut self, caller: &Pubkey, recipient: &Pubkey, now: i64) -> Result<FeeClaim> {
        self.atomically(|engine| {
            require!(
                *caller == engine.vault.fee_recipient || engine.vault.is_authority(caller),
                VaultError::Unauthorized
            );
            require!(*recipient != Pubkey::default(), VaultError::InvalidRecipient);

            engine.vault.settle_management_fee(now)?;
            require!(engine.vault.accrued_fee_shares > 0, VaultError::ZeroAmount);

            let total_assets = engine.total_assets()?;
            let assets = engine.vault.convert_to_assets(
                engine.vault.accrued_fee_shares,
                total_assets,
                Rounding::Down,
            )?;
            let shares = engine.vault.take_accrued_fee_shares()?;
            let payout = engine.pay_out(assets, recipient)?;

            msg!("Fees claimed: {} shares for {} assets", shares, assets);
            Ok(FeeClaim {
                shares_burned: shares,
                assets_paid: assets,
                payout,
            })
        })
    }

    // ---------------------------------------------------------------------
    // Administration
    // ---------------------------------------------------------------------

    /// Pulls everything out of the active source into the idle account.
    /// Available while paused.
    pub fn emergency_withdraw(&mut self, caller: &Pubkey) -> Result<u64> {
        self.atomically(|engine| {
            engine.vault.require_authority(caller)?;

            let idle_account = engine.vault.idle_account;
            let recovered = engine.router.route_withdraw_all(&idle_account)?;
            engine.vault.idle_assets = checked_add(engine.vault.idle_assets, recovered)?;

            msg!(
                "Emergency withdrawal: {} assets recovered, {} idle",
                recovered,
                engine.vault.idle_assets
            );
            Ok(recovered)
        })
    }

    pub fn set_deposit_limit(&mut self, caller: &Pubkey, limit: u64) -> Result<()> {
        self.atomically(|engine| {
            engine.vault.require_authority(caller)?;
            engine.vault.deposit_limit = limit;
            Ok(())
        })
    }

    pub fn set_withdrawal_fee(&mut self, caller: &Pubkey, fee_bps: u16) -> Result<()> {
        self.atomically(|engine| {
            engine.vault.require_authority(caller)?;
            engine.vault.set_withdrawal_fee(fee_bps)
        })
    }

    pub fn set_management_fee(&mut self, caller: &Pubkey, fee_bps: u16, now: i64) -> Result<()> {
        self.atomically(|engine| {
            engine.vault.require_authority(caller)?;
            engine.vault.set_management_fee(fee_bps, now)
        })
    }

    /// Unclaimed fee shares follow the recipient role
    pub fn set_fee_recipient(&mut self, caller: &Pubkey, recipient: Pubkey, now: i64) -> Result<()> {
        self.atomically(|engine| {
            engine.vault.require_authority(caller)?;
            require!(recipient != Pubkey::default(), VaultError::ZeroAddress);
            engine.vault.settle_management_fee(now)?;
            engine.vault.fee_recipient = recipient;
            Ok(())
        })
    }

    pub fn set_paused(&mut self, caller: &Pubkey, paused: bool) -> Result<()> {
        self.atomically(|engine| {
            engine.vault.require_authority(caller)?;
            engine.vault.paused = paused;
            Ok(())
        })
    }
}

/// Fee parameters accepted at vault creation
pub fn validate_fees(withdrawal_fee_bps: u16, management_fee_bps: u16) -> Result<()> {
    require!(
        withdrawal_fee_bps <= MAX_FEE_BPS && management_fee_bps <= MAX_FEE_BPS,
        VaultError::InvalidFee
    );
    Ok(())
}
