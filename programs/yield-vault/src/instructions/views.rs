use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

use crate::{
    constants::*,
    engine::{VaultEngine, VaultHealth},
    errors::*,
    reserve::reserve_source,
    state::*,
    yield_source::YieldSource,
};

/// Read-only accounts for previews and the health query. Results come back
/// through return data; nothing is written.
#[derive(Accounts)]
pub struct ViewVault<'info> {
    #[account(
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

    #[account(address = vault_state.idle_account @ VaultError::InvalidRecipient)]
    pub vault_token_account: Account<'info, TokenAccount>,

    pub strategy: Option<Account<'info, StrategyState>>,

    pub strategy_token_account: Option<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
}

/// What a view instruction computes
#[derive(Clone, Copy, Debug)]
pub enum View {
    Deposit(u64),
    Withdraw(u64),
    Redeem(u64),
}

fn with_engine<T>(
    ctx: Context<ViewVault>,
    query: impl FnOnce(&VaultEngine, i64) -> Result<T>,
) -> Result<T> {
    let now = Clock::get()?.unix_timestamp;
    let accounts = &*ctx.accounts;
    let vault_key = accounts.vault_state.key();

    let mut source = reserve_source(
        vault_key,
        &accounts.vault_state,
        &accounts.strategy,
        &accounts.strategy_token_account,
        &accounts.vault_token_account,
        &accounts.vault_authority.to_account_info(),
        &accounts.token_program,
    )?;

    // A scratch copy keeps the account untouched even if the query settles
    let mut scratch = (*accounts.vault_state).clone();
    let engine = VaultEngine::new(
        &mut scratch,
        source.as_mut().map(|s| s as &mut dyn YieldSource),
    )?;
    query(&engine, now)
}

pub fn preview_handler(ctx: Context<ViewVault>, view: View) -> Result<u64> {
    with_engine(ctx, |engine, now| match view {
        View::Deposit(assets) => engine.preview_deposit(assets, now),
        View::Withdraw(assets) => engine.preview_withdraw(assets, now),
        View::Redeem(shares) => engine.preview_redeem(shares, now),
    })
}

pub fn health_handler(ctx: Context<ViewVault>) -> Result<VaultHealth> {
    with_engine(ctx, |engine, _| engine.health())
}
