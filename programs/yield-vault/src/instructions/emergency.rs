use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

use crate::{
    constants::*, engine::VaultEngine, errors::*, events::*, reserve::ReserveSource, state::*,
    yield_source::YieldSource,
};

/// Pull every asset out of the active source back into the idle account.
/// Works while the vault is paused.
#[derive(Accounts)]
pub struct EmergencyWithdraw<'info> {
    pub authority: Signer<'info>,

    #[account(
        mut,
        seeds = [VAULT_SEED, vault_state.asset_mint.as_ref()],
        bump = vault_state.bump,
        has_one = authority @ VaultError::Unauthorized,
    )]
    pub vault_state: Account<'info, VaultState>,

    /// CHECK: PDA used as authority, validated by seeds
    #[account(
        seeds = [VAULT_AUTHORITY_SEED, vault_state.asset_mint.as_ref()],
        bump = vault_state.authority_bump,
    )]
    pub vault_authority: UncheckedAccount<'info>,

    #[account(
        mut,
        address = vault_state.idle_account @ VaultError::InvalidRecipient,
    )]
    pub vault_token_account: Account<'info, TokenAccount>,

    pub strategy: Account<'info, StrategyState>,

    #[account(mut)]
    pub strategy_token_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

pub fn handler(ctx: Context<EmergencyWithdraw>) -> Result<u64> {
    let now = Clock::get()?.unix_timestamp;
    let accounts = &mut *ctx.accounts;
    let vault_key = accounts.vault_state.key();
    let authority = accounts.authority.key();

    let mut source = ReserveSource::new(
        vault_key,
        &accounts.vault_state,
        &accounts.strategy,
        &accounts.strategy_token_account,
        &accounts.vault_token_account,
        &accounts.vault_authority.to_account_info(),
        &accounts.token_program,
    )?;
    let source_id = source.source_id();

    let mut engine = VaultEngine::new(
        &mut accounts.vault_state,
        Some(&mut source as &mut dyn YieldSource),
    )?;
    let recovered = engine.emergency_withdraw(&authority)?;

    emit!(EmergencyWithdrawal {
        vault: vault_key,
        source: source_id,
        assets_recovered: recovered,
        idle_assets: engine.state().idle_assets,
        timestamp: now,
    });

    Ok(recovered)
}
