use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::{
    constants::*,
    engine::{Exit, Payout, VaultEngine},
    errors::*,
    events::*,
    reserve::reserve_source,
    state::*,
    yield_source::YieldSource,
};

/// Withdraw or redeem from the signer's own position
#[derive(Accounts)]
pub struct Withdraw<'info> {
    /// Position owner
    pub owner: Signer<'info>,

    #[account(
        mut,
        seeds = [VAULT_SEED, vault_state.asset_mint.as_ref()],
        bump = vault_state.bump,
    )]
    pub vault_state: Account<'info, VaultState>,

    /// Security: seeds tie the position to the signer
    #[account(
        mut,
        seeds = [POSITION_SEED, vault_state.key().as_ref(), owner.key().as_ref()],
        bump = holder_position.bump,
    )]
    pub holder_position: Account<'info, HolderPosition>,

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

    /// Receives the assets
    #[account(
        mut,
        constraint = recipient_asset_account.mint == vault_state.asset_mint @ VaultError::InvalidMint,
        constraint = recipient_asset_account.key() != vault_state.idle_account @ VaultError::InvalidRecipient,
    )]
    pub recipient_asset_account: Account<'info, TokenAccount>,

    pub strategy: Option<Account<'info, StrategyState>>,

    #[account(mut)]
    pub strategy_token_account: Option<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
}

#[derive(Clone, Copy)]
enum ExitRequest {
    Assets(u64),
    Shares(u64),
}

pub fn withdraw_handler(ctx: Context<Withdraw>, assets: u64) -> Result<u64> {
    let exit = process_exit(ctx, ExitRequest::Assets(assets))?;
    Ok(exit.shares_burned)
}

pub fn redeem_handler(ctx: Context<Withdraw>, shares: u64) -> Result<u64> {
    let exit = process_exit(ctx, ExitRequest::Shares(shares))?;
    Ok(exit.assets_paid)
}

fn process_exit(ctx: Context<Withdraw>, request: ExitRequest) -> Result<Exit> {
    let now = Clock::get()?.unix_timestamp;
    let accounts = &mut *ctx.accounts;
    let vault_key = accounts.vault_state.key();
    let owner = accounts.owner.key();
    let recipient = accounts.recipient_asset_account.key();

    let mut source = reserve_source(
        vault_key,
        &accounts.vault_state,
        &accounts.strategy,
        &accounts.strategy_token_account,
        &accounts.vault_token_account,
        &accounts.vault_authority.to_account_info(),
        &accounts.token_program,
    )?
    .map(|s| s.with_destination(accounts.recipient_asset_account.to_account_info()));

    let mut engine = VaultEngine::new(
        &mut accounts.vault_state,
        source.as_mut().map(|s| s as &mut dyn YieldSource),
    )?;

    let position = &mut accounts.holder_position;
    let exit = match request {
        ExitRequest::Assets(assets) => engine.withdraw(assets, &recipient, &owner, position, now)?,
        ExitRequest::Shares(shares) => engine.redeem(shares, &recipient, &owner, position, now)?,
    };
    let total_shares = engine.total_shares();
    let authority_bump = engine.state().authority_bump;
    let asset_mint = engine.state().asset_mint;
    drop(engine);

    pay_from_idle(
        &exit.payout,
        asset_mint,
        authority_bump,
        &accounts.vault_token_account,
        &accounts.recipient_asset_account,
        &accounts.vault_authority.to_account_info(),
        &accounts.token_program,
    )?;

    emit!(Withdrawn {
        vault: vault_key,
        owner,
        recipient,
        shares_burned: exit.shares_burned,
        assets_paid: exit.assets_paid,
        fee: exit.fee,
        total_shares,
        timestamp: now,
    });

    Ok(exit)
}

/// Moves the idle portion of a payout out of the vault's token account
pub fn pay_from_idle<'info>(
    payout: &Payout,
    asset_mint: Pubkey,
    authority_bump: u8,
    vault_token_account: &Account<'info, TokenAccount>,
    recipient: &Account<'info, TokenAccount>,
    vault_authority: &AccountInfo<'info>,
    token_program: &Program<'info, Token>,
) -> Result<()> {
    if payout.from_idle == 0 {
        return Ok(());
    }

    let bump = [authority_bump];
    let authority_seeds: &[&[u8]] = &[VAULT_AUTHORITY_SEED, asset_mint.as_ref(), &bump];
    let signer_seeds = &[authority_seeds];

    let transfer_ctx = CpiContext::new_with_signer(
        token_program.to_account_info(),
        Transfer {
            from: vault_token_account.to_account_info(),
            to: recipient.to_account_info(),
            authority: vault_authority.clone(),
        },
        signer_seeds,
    );
    token::transfer(transfer_ctx, payout.from_idle)
}
