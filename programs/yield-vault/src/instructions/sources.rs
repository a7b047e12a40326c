use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

use crate::{
    constants::*,
    engine::{approve_source, set_active_source, set_source_approval},
    errors::*,
    events::*,
    reserve::ReserveSource,
    state::*,
    yield_source::YieldSource,
};

/// Accounts that identify one reserve strategy of the vault
///
/// Shared by approval and binding; both only read the source.
#[derive(Accounts)]
pub struct SourceAdmin<'info> {
    /// Vault authority - only they can manage sources
    /// Security: Must be signer and match vault_state.authority
    pub authority: Signer<'info>,

    #[account(
        mut,
        seeds = [VAULT_SEED, vault_state.asset_mint.as_ref()],
        bump = vault_state.bump,
        has_one = authority @ VaultError::Unauthorized,
    )]
    pub vault_state: Account<'info, VaultState>,

    #[account(
        mut,
        seeds = [SOURCE_REGISTRY_SEED, vault_state.key().as_ref()],
        bump = source_registry.bump,
    )]
    pub source_registry: Account<'info, SourceRegistry>,

    /// CHECK: PDA used as authority, validated by seeds
    #[account(
        seeds = [VAULT_AUTHORITY_SEED, vault_state.asset_mint.as_ref()],
        bump = vault_state.authority_bump,
    )]
    pub vault_authority: UncheckedAccount<'info>,

    #[account(address = vault_state.idle_account @ VaultError::InvalidRecipient)]
    pub vault_token_account: Account<'info, TokenAccount>,

    pub strategy: Account<'info, StrategyState>,

    pub strategy_token_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

impl<'info> SourceAdmin<'info> {
    fn reserve(&self) -> Result<ReserveSource<'info>> {
        ReserveSource::new(
            self.vault_state.key(),
            &self.vault_state,
            &self.strategy,
            &self.strategy_token_account,
            &self.vault_token_account,
            &self.vault_authority.to_account_info(),
            &self.token_program,
        )
    }
}

/// Add a reserve strategy to the allow-list
pub fn approve_handler(ctx: Context<SourceAdmin>, name: String) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let source = ctx.accounts.reserve()?;
    let authority = ctx.accounts.authority.key();

    approve_source(
        &ctx.accounts.vault_state,
        &mut ctx.accounts.source_registry,
        &source as &dyn YieldSource,
        name.clone(),
        &authority,
        now,
    )?;

    emit!(SourceApproved {
        vault: ctx.accounts.vault_state.key(),
        source: source.source_id(),
        name,
        timestamp: now,
    });

    Ok(())
}

/// Bind the first active source. Later changes go through the upgrade path.
pub fn bind_handler(ctx: Context<SourceAdmin>) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let source = ctx.accounts.reserve()?;
    let authority = ctx.accounts.authority.key();
    let vault_key = ctx.accounts.vault_state.key();

    set_active_source(
        &mut ctx.accounts.vault_state,
        &ctx.accounts.source_registry,
        &source as &dyn YieldSource,
        &authority,
    )?;

    emit!(SourceBound {
        vault: vault_key,
        source: source.source_id(),
        timestamp: now,
    });

    Ok(())
}

/// Enable or disable an allow-listed source
#[derive(Accounts)]
pub struct SetSourceApproval<'info> {
    pub authority: Signer<'info>,

    #[account(
        seeds = [VAULT_SEED, vault_state.asset_mint.as_ref()],
        bump = vault_state.bump,
        has_one = authority @ VaultError::Unauthorized,
    )]
    pub vault_state: Account<'info, VaultState>,

    #[account(
        mut,
        seeds = [SOURCE_REGISTRY_SEED, vault_state.key().as_ref()],
        bump = source_registry.bump,
    )]
    pub source_registry: Account<'info, SourceRegistry>,
}

pub fn set_approval_handler(
    ctx: Context<SetSourceApproval>,
    source: Pubkey,
    enabled: bool,
) -> Result<()> {
    let authority = ctx.accounts.authority.key();

    set_source_approval(
        &ctx.accounts.vault_state,
        &mut ctx.accounts.source_registry,
        &source,
        enabled,
        &authority,
    )?;

    emit!(SourceApprovalChanged {
        vault: ctx.accounts.vault_state.key(),
        source,
        enabled,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}
