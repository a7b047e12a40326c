use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

use crate::{constants::*, errors::*, events::*, state::*};

/// Create a reserve strategy for the vault's asset
///
/// The strategy token account is owned by the vault authority PDA, so only
/// the vault can ever move funds in or out of it.
#[derive(Accounts)]
#[instruction(version: u8)]
pub struct CreateStrategy<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(
        seeds = [VAULT_SEED, vault_state.asset_mint.as_ref()],
        bump = vault_state.bump,
        has_one = authority @ VaultError::Unauthorized,
        has_one = asset_mint @ VaultError::InvalidMint,
    )]
    pub vault_state: Account<'info, VaultState>,

    pub asset_mint: Account<'info, Mint>,

    /// CHECK: PDA used as token authority, validated by seeds
    #[account(
        seeds = [VAULT_AUTHORITY_SEED, vault_state.asset_mint.as_ref()],
        bump = vault_state.authority_bump,
    )]
    pub vault_authority: UncheckedAccount<'info>,

    #[account(
        init,
        payer = authority,
        space = STRATEGY_STATE_SIZE,
        seeds = [STRATEGY_SEED, vault_state.key().as_ref(), &[version]],
        bump
    )]
    pub strategy: Account<'info, StrategyState>,

    #[account(
        init,
        payer = authority,
        seeds = [STRATEGY_TOKEN_SEED, strategy.key().as_ref()],
        bump,
        token::mint = asset_mint,
        token::authority = vault_authority,
    )]
    pub strategy_token_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn create_handler(
    ctx: Context<CreateStrategy>,
    version: u8,
    name: String,
    annual_rate_bps: u16,
) -> Result<()> {
    // CHECKS
    require!(name.len() <= MAX_NAME_LEN, VaultError::NameTooLong);
    require!(annual_rate_bps <= MAX_RATE_BPS, VaultError::InvalidRate);

    let now = Clock::get()?.unix_timestamp;
    let vault_key = ctx.accounts.vault_state.key();
    let strategy_key = ctx.accounts.strategy.key();

    // EFFECTS
    let strategy = &mut ctx.accounts.strategy;
    strategy.vault = vault_key;
    strategy.asset_mint = ctx.accounts.asset_mint.key();
    strategy.token_account = ctx.accounts.strategy_token_account.key();
    strategy.annual_rate_bps = annual_rate_bps;
    strategy.version = version;
    strategy.name = name.clone();
    strategy.bump = ctx.bumps.strategy;
    strategy.token_bump = ctx.bumps.strategy_token_account;

    emit!(StrategyCreated {
        vault: vault_key,
        strategy: strategy_key,
        version,
        name,
        timestamp: now,
    });

    Ok(())
}

/// Record the rate the backing market currently pays
#[derive(Accounts)]
pub struct ReportStrategyRate<'info> {
    pub authority: Signer<'info>,

    #[account(
        seeds = [VAULT_SEED, vault_state.asset_mint.as_ref()],
        bump = vault_state.bump,
        has_one = authority @ VaultError::Unauthorized,
    )]
    pub vault_state: Account<'info, VaultState>,

    #[account(
        mut,
        seeds = [STRATEGY_SEED, vault_state.key().as_ref(), &[strategy.version]],
        bump = strategy.bump,
        constraint = strategy.vault == vault_state.key() @ VaultError::InvalidStrategyAccount,
    )]
    pub strategy: Account<'info, StrategyState>,
}

pub fn report_rate_handler(ctx: Context<ReportStrategyRate>, annual_rate_bps: u16) -> Result<()> {
    require!(annual_rate_bps <= MAX_RATE_BPS, VaultError::InvalidRate);

    let strategy = &mut ctx.accounts.strategy;
    strategy.annual_rate_bps = annual_rate_bps;

    emit!(StrategyRateReported {
        strategy: strategy.key(),
        annual_rate_bps,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}
