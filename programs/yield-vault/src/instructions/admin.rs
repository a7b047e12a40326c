use anchor_lang::prelude::*;

use crate::{constants::*, engine::VaultEngine, errors::*, events::*, state::*};

/// Authority-only vault parameter changes
#[derive(Accounts)]
pub struct AdminVault<'info> {
    /// Security: Must be signer and match vault_state.authority
    pub authority: Signer<'info>,

    #[account(
        mut,
        seeds = [VAULT_SEED, vault_state.asset_mint.as_ref()],
        bump = vault_state.bump,
        has_one = authority @ VaultError::Unauthorized,
    )]
    pub vault_state: Account<'info, VaultState>,
}

/// One administrative change, applied through the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigChange {
    /// None lifts the limit
    DepositLimit(Option<u64>),
    WithdrawalFee(u16),
    ManagementFee(u16),
    FeeRecipient(Pubkey),
    Paused(bool),
}

pub fn handler(ctx: Context<AdminVault>, change: ConfigChange) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let vault_key = ctx.accounts.vault_state.key();
    let authority = ctx.accounts.authority.key();

    // Parameter changes never touch the source
    let mut engine = VaultEngine::new(&mut ctx.accounts.vault_state, None)?;
    match change {
        ConfigChange::DepositLimit(limit) => {
            engine.set_deposit_limit(&authority, limit.unwrap_or(UNLIMITED_DEPOSITS))?
        }
        ConfigChange::WithdrawalFee(bps) => engine.set_withdrawal_fee(&authority, bps)?,
        ConfigChange::ManagementFee(bps) => engine.set_management_fee(&authority, bps, now)?,
        ConfigChange::FeeRecipient(recipient) => {
            engine.set_fee_recipient(&authority, recipient, now)?
        }
        ConfigChange::Paused(paused) => engine.set_paused(&authority, paused)?,
    }

    let vault = engine.state();
    emit!(VaultConfigUpdated {
        vault: vault_key,
        authority,
        deposit_limit: vault.deposit_limit,
        withdrawal_fee_bps: vault.withdrawal_fee_bps,
        management_fee_bps: vault.management_fee_bps,
        fee_recipient: vault.fee_recipient,
        paused: vault.paused,
        timestamp: now,
    });

    msg!("Vault config updated: {:?}", change);
    Ok(())
}
