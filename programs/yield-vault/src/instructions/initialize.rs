use anchor_lang::prelude::*;
use anchor_spl::{
    associated_token::AssociatedToken,
    token::{Mint, Token, TokenAccount},
};

use crate::{constants::*, engine::validate_fees, errors::*, events::*, state::*};

/// Initial configuration of a vault
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug)]
pub struct InitializeParams {
    pub fee_recipient: Pubkey,
    pub withdrawal_fee_bps: u16,
    pub management_fee_bps: u16,
    /// None for unbounded
    pub deposit_limit: Option<u64>,
}

/// Initialize a new vault for a given asset token
#[derive(Accounts)]
pub struct Initialize<'info> {
    /// Vault authority - owner role for every admin operation
    /// Security: Must be signer, stored in state
    #[account(mut)]
    pub authority: Signer<'info>,

    /// Vault state PDA
    /// Security: Initialized with proper space and padding for upgrades
    #[account(
        init,
        payer = authority,
        space = VAULT_STATE_SIZE,
        seeds = [VAULT_SEED, asset_mint.key().as_ref()],
        bump
    )]
    pub vault_state: Account<'info, VaultState>,

    /// Asset token mint (the underlying token users deposit)
    pub asset_mint: Account<'info, Mint>,

    /// Vault authority PDA - owns the idle and strategy token accounts
    /// CHECK: PDA used as token authority, validated by seeds
    #[account(
        seeds = [VAULT_AUTHORITY_SEED, asset_mint.key().as_ref()],
        bump
    )]
    pub vault_authority: UncheckedAccount<'info>,

    /// Vault's token account for idle assets
    #[account(
        init,
        payer = authority,
        associated_token::mint = asset_mint,
        associated_token::authority = vault_authority,
    )]
    pub vault_token_account: Account<'info, TokenAccount>,

    /// Allow-list of yield sources
    #[account(
        init,
        payer = authority,
        space = SourceRegistry::SPACE,
        seeds = [SOURCE_REGISTRY_SEED, vault_state.key().as_ref()],
        bump
    )]
    pub source_registry: Account<'info, SourceRegistry>,

    /// Append-only replacement log
    #[account(
        init,
        payer = authority,
        space = UpgradeLog::SPACE,
        seeds = [UPGRADE_LOG_SEED, vault_state.key().as_ref()],
        bump
    )]
    pub upgrade_log: Account<'info, UpgradeLog>,

    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<Initialize>, params: InitializeParams) -> Result<()> {
    // CHECKS
    validate_fees(params.withdrawal_fee_bps, params.management_fee_bps)?;
    require!(
        params.fee_recipient != Pubkey::default(),
        VaultError::ZeroAddress
    );

    let now = Clock::get()?.unix_timestamp;
    let vault_key = ctx.accounts.vault_state.key();
    let vault_state = &mut ctx.accounts.vault_state;

    // EFFECTS: Initialize vault state, no source bound yet
    vault_state.authority = ctx.accounts.authority.key();
    vault_state.asset_mint = ctx.accounts.asset_mint.key();
    vault_state.idle_account = ctx.accounts.vault_token_account.key();
    vault_state.fee_recipient = params.fee_recipient;
    vault_state.total_shares = 0;
    vault_state.idle_assets = 0;
    vault_state.deposit_limit = params.deposit_limit.unwrap_or(UNLIMITED_DEPOSITS);
    vault_state.withdrawal_fee_bps = params.withdrawal_fee_bps;
    vault_state.management_fee_bps = params.management_fee_bps;
    vault_state.last_fee_collection_ts = now;
    vault_state.accrued_fee_shares = 0;
    vault_state.paused = false;
    vault_state.locked = false;
    vault_state.active_source = None;
    vault_state.upgrade_count = 0;
    vault_state.bump = ctx.bumps.vault_state;
    vault_state.authority_bump = ctx.bumps.vault_authority;
    vault_state._reserved = [0; 64];

    let registry = &mut ctx.accounts.source_registry;
    registry.vault = vault_key;
    registry.approved_sources = Vec::new();
    registry.bump = ctx.bumps.source_registry;

    let log = &mut ctx.accounts.upgrade_log;
    log.vault = vault_key;
    log.records = Vec::new();
    log.bump = ctx.bumps.upgrade_log;

    emit!(VaultInitialized {
        vault: vault_key,
        authority: vault_state.authority,
        asset_mint: vault_state.asset_mint,
        fee_recipient: vault_state.fee_recipient,
        withdrawal_fee_bps: vault_state.withdrawal_fee_bps,
        management_fee_bps: vault_state.management_fee_bps,
        timestamp: now,
    });

    msg!(
        "Vault initialized for mint {} by {}",
        vault_state.asset_mint,
        vault_state.authority
    );

    Ok(())
}
