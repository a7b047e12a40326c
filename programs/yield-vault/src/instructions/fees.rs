use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

use crate::{
    constants::*, engine::VaultEngine, errors::*, events::*, reserve::reserve_source, state::*,
    yield_source::YieldSource,
};

use super::withdraw::pay_from_idle;

/// Mint the management fee owed so far. Permissionless.
#[derive(Accounts)]
pub struct SettleFees<'info> {
    #[account(
        mut,
        seeds = [VAULT_SEED, vault_state.asset_mint.as_ref()],
        bump = vault_state.bump,
    )]
    pub vault_state: Account<'info, VaultState>,
}

pub fn settle_handler(ctx: Context<SettleFees>) -> Result<u64> {
    let now = Clock::get()?.unix_timestamp;
    let vault_key = ctx.accounts.vault_state.key();

    let mut engine = VaultEngine::new(&mut ctx.accounts.vault_state, None)?;
    let minted = engine.settle_fees(now)?;

    emit!(FeesSettled {
        vault: vault_key,
        fee_shares_minted: minted,
        accrued_fee_shares: engine.state().accrued_fee_shares,
        timestamp: now,
    });

    Ok(minted)
}

/// Redeem all accrued fee shares to the fee recipient
#[derive(Accounts)]
pub struct ClaimFees<'info> {
    /// Fee recipient or vault authority
    pub caller: Signer<'info>,

    #[account(
        mut,
        seeds = [VAULT_SEED, vault_state.asset_mint.as_ref()],
        bump = vault_state.bump,
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

    /// Security: fees only ever go to an account of the fee recipient
    #[account(
        mut,
        constraint = fee_recipient_asset_account.mint == vault_state.asset_mint @ VaultError::InvalidMint,
        constraint = fee_recipient_asset_account.owner == vault_state.fee_recipient @ VaultError::InvalidOwner,
    )]
    pub fee_recipient_asset_account: Account<'info, TokenAccount>,

    pub strategy: Option<Account<'info, StrategyState>>,

    #[account(mut)]
    pub strategy_token_account: Option<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
}

pub fn claim_handler(ctx: Context<ClaimFees>) -> Result<u64> {
    let now = Clock::get()?.unix_timestamp;
    let accounts = &mut *ctx.accounts;
    let vault_key = accounts.vault_state.key();
    let caller = accounts.caller.key();
    let recipient = accounts.fee_recipient_asset_account.key();

    let mut source = reserve_source(
        vault_key,
        &accounts.vault_state,
        &accounts.strategy,
        &accounts.strategy_token_account,
        &accounts.vault_token_account,
        &accounts.vault_authority.to_account_info(),
        &accounts.token_program,
    )?
    .map(|s| s.with_destination(accounts.fee_recipient_asset_account.to_account_info()));

    let mut engine = VaultEngine::new(
        &mut accounts.vault_state,
        source.as_mut().map(|s| s as &mut dyn YieldSource),
    )?;
    let claim = engine.claim_fees(&caller, &recipient, now)?;
    let fee_recipient = engine.state().fee_recipient;
    let asset_mint = engine.state().asset_mint;
    let authority_bump = engine.state().authority_bump;
    drop(engine);

    pay_from_idle(
        &claim.payout,
        asset_mint,
        authority_bump,
        &accounts.vault_token_account,
        &accounts.fee_recipient_asset_account,
        &accounts.vault_authority.to_account_info(),
        &accounts.token_program,
    )?;

    emit!(FeesClaimed {
        vault: vault_key,
        fee_recipient,
        shares_burned: claim.shares_burned,
        assets_paid: claim.assets_paid,
        timestamp: now,
    });

    Ok(claim.assets_paid)
}
