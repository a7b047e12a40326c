use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::{
    constants::*, engine::VaultEngine, errors::*, events::*, reserve::reserve_source, state::*,
    yield_source::YieldSource,
};

/// Deposit assets into the vault and mint shares to `on_behalf_of`
///
/// Security checklist:
/// ✅ 1. SIGNER VALIDATION: Depositor must be signer
/// ✅ 2. ACCOUNT OWNERSHIP: Vault state and position PDAs validated with seeds
/// ✅ 6. MATH SAFETY: Engine uses checked u128 conversions
/// ✅ 7. TOKEN ACCOUNT VALIDATION: Validates mint and owner
/// ✅ 10. EVENTS: Emits Deposited event
#[derive(Accounts)]
#[instruction(assets: u64, on_behalf_of: Pubkey)]
pub struct Deposit<'info> {
    /// User depositing assets
    #[account(mut)]
    pub depositor: Signer<'info>,

    /// Vault state PDA
    #[account(
        mut,
        seeds = [VAULT_SEED, vault_state.asset_mint.as_ref()],
        bump = vault_state.bump,
    )]
    pub vault_state: Account<'info, VaultState>,

    /// Share position of the beneficiary
    #[account(
        init_if_needed,
        payer = depositor,
        space = HOLDER_POSITION_SIZE,
        seeds = [POSITION_SEED, vault_state.key().as_ref(), on_behalf_of.as_ref()],
        bump
    )]
    pub holder_position: Account<'info, HolderPosition>,

    /// CHECK: PDA used as authority, validated by seeds
    #[account(
        seeds = [VAULT_AUTHORITY_SEED, vault_state.asset_mint.as_ref()],
        bump = vault_state.authority_bump,
    )]
    pub vault_authority: UncheckedAccount<'info>,

    /// Vault's idle token account
    #[account(
        mut,
        address = vault_state.idle_account @ VaultError::InvalidRecipient,
    )]
    pub vault_token_account: Account<'info, TokenAccount>,

    /// Depositor's asset token account (source)
    #[account(
        mut,
        constraint = depositor_asset_account.mint == vault_state.asset_mint @ VaultError::InvalidMint,
        constraint = depositor_asset_account.owner == depositor.key() @ VaultError::InvalidOwner,
    )]
    pub depositor_asset_account: Account<'info, TokenAccount>,

    /// Active strategy, omitted when the vault has none
    pub strategy: Option<Account<'info, StrategyState>>,

    #[account(mut)]
    pub strategy_token_account: Option<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<Deposit>, assets: u64, on_behalf_of: Pubkey) -> Result<u64> {
    let now = Clock::get()?.unix_timestamp;
    let vault_key = ctx.accounts.vault_state.key();

    // Funds land in the idle account first; the engine forwards them
    let transfer_ctx = CpiContext::new(
        ctx.accounts.token_program.to_account_info(),
        Transfer {
            from: ctx.accounts.depositor_asset_account.to_account_info(),
            to: ctx.accounts.vault_token_account.to_account_info(),
            authority: ctx.accounts.depositor.to_account_info(),
        },
    );
    token::transfer(transfer_ctx, assets)?;

    let accounts = &mut *ctx.accounts;

    let position = &mut accounts.holder_position;
    if position.holder == Pubkey::default() {
        position.vault = vault_key;
        position.holder = on_behalf_of;
        position.bump = ctx.bumps.holder_position;
    }

    let mut source = reserve_source(
        vault_key,
        &accounts.vault_state,
        &accounts.strategy,
        &accounts.strategy_token_account,
        &accounts.vault_token_account,
        &accounts.vault_authority.to_account_info(),
        &accounts.token_program,
    )?;

    let mut engine = VaultEngine::new(
        &mut accounts.vault_state,
        source.as_mut().map(|s| s as &mut dyn YieldSource),
    )?;
    let shares = engine.deposit(assets, position, now)?;

    emit!(Deposited {
        vault: vault_key,
        depositor: accounts.depositor.key(),
        holder: on_behalf_of,
        asset_amount: assets,
        shares_minted: shares,
        total_shares: engine.total_shares(),
        timestamp: now,
    });

    Ok(shares)
}
