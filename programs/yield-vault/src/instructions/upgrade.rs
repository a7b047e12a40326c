use anchor_lang::error::ErrorCode as AnchorErrorCode;
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

use crate::{
    constants::*,
    engine::{detach_source, execute_batch, execute_upgrade, UpgradeJob},
    errors::*,
    events::*,
    reserve::ReserveSource,
    state::*,
};

/// Move the vault from its active strategy to another approved one
///
/// Security checklist:
/// ✅ 1. SIGNER VALIDATION: Authority must be signer and match vault state
/// ✅ 2. ACCOUNT OWNERSHIP: Vault, registry and log PDAs validated with seeds
/// ✅ 3. STRATEGY LINKS: ReserveSource checks vault, mint and token owner
/// ✅ 4. ATOMICITY: Post-swap verification failure reverts everything
/// ✅ 10. EVENTS: Emits SourceReplaced
#[derive(Accounts)]
pub struct ReplaceSource<'info> {
    pub authority: Signer<'info>,

    #[account(
        mut,
        seeds = [VAULT_SEED, vault_state.asset_mint.as_ref()],
        bump = vault_state.bump,
        has_one = authority @ VaultError::Unauthorized,
    )]
    pub vault_state: Account<'info, VaultState>,

    #[account(
        seeds = [SOURCE_REGISTRY_SEED, vault_state.key().as_ref()],
        bump = source_registry.bump,
    )]
    pub source_registry: Account<'info, SourceRegistry>,

    #[account(
        mut,
        seeds = [UPGRADE_LOG_SEED, vault_state.key().as_ref()],
        bump = upgrade_log.bump,
    )]
    pub upgrade_log: Account<'info, UpgradeLog>,

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

    pub current_strategy: Account<'info, StrategyState>,

    #[account(mut)]
    pub current_strategy_token_account: Account<'info, TokenAccount>,

    pub target_strategy: Account<'info, StrategyState>,

    #[account(mut)]
    pub target_strategy_token_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

impl<'info> ReplaceSource<'info> {
    fn reserve(
        &self,
        strategy: &Account<'info, StrategyState>,
        strategy_tokens: &Account<'info, TokenAccount>,
    ) -> Result<ReserveSource<'info>> {
        ReserveSource::new(
            self.vault_state.key(),
            &self.vault_state,
            strategy,
            strategy_tokens,
            &self.vault_token_account,
            &self.vault_authority.to_account_info(),
            &self.token_program,
        )
    }
}

pub fn replace_handler(ctx: Context<ReplaceSource>, reason: String) -> Result<()> {
    process_upgrade(ctx, UpgradeKind::Replace, reason)
}

/// Return to a strategy that was active before
pub fn rollback_handler(ctx: Context<ReplaceSource>, reason: String) -> Result<()> {
    process_upgrade(ctx, UpgradeKind::Rollback, reason)
}

fn process_upgrade(ctx: Context<ReplaceSource>, kind: UpgradeKind, reason: String) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let accounts = &mut *ctx.accounts;
    let vault_key = accounts.vault_state.key();
    let authority = accounts.authority.key();

    let mut current =
        accounts.reserve(&accounts.current_strategy, &accounts.current_strategy_token_account)?;
    let mut target =
        accounts.reserve(&accounts.target_strategy, &accounts.target_strategy_token_account)?;

    let vault_state = &mut accounts.vault_state;
    let registry = &accounts.source_registry;
    let log = &mut accounts.upgrade_log;
    let mut job = if kind == UpgradeKind::Rollback {
        UpgradeJob::rollback(vault_state, registry, log, &mut current, &mut target, reason)
    } else {
        UpgradeJob::replace(vault_state, registry, log, &mut current, &mut target, reason)
    };
    let record = execute_upgrade(&mut job, &authority, now)?;

    emit_record(vault_key, record);
    Ok(())
}

/// Withdraw everything from the active strategy and leave the vault unbound
#[derive(Accounts)]
pub struct DetachSource<'info> {
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
        seeds = [UPGRADE_LOG_SEED, vault_state.key().as_ref()],
        bump = upgrade_log.bump,
    )]
    pub upgrade_log: Account<'info, UpgradeLog>,

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

    pub current_strategy: Account<'info, StrategyState>,

    #[account(mut)]
    pub current_strategy_token_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

pub fn detach_handler(ctx: Context<DetachSource>, reason: String) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let accounts = &mut *ctx.accounts;
    let vault_key = accounts.vault_state.key();
    let authority = accounts.authority.key();

    let mut current = ReserveSource::new(
        vault_key,
        &accounts.vault_state,
        &accounts.current_strategy,
        &accounts.current_strategy_token_account,
        &accounts.vault_token_account,
        &accounts.vault_authority.to_account_info(),
        &accounts.token_program,
    )?;

    let record = detach_source(
        &mut accounts.vault_state,
        &mut accounts.upgrade_log,
        &mut current,
        &authority,
        reason,
        now,
    )?;

    emit_record(vault_key, record);
    Ok(())
}

/// Replace the active strategy of several vaults at once, all or nothing
///
/// Each vault contributes `BATCH_ACCOUNTS_PER_VAULT` remaining accounts, in
/// order: vault state, source registry, upgrade log, vault token account,
/// vault authority, current strategy, current strategy token account, target
/// strategy, target strategy token account.
#[derive(Accounts)]
pub struct BatchReplaceSources<'info> {
    /// Must be the authority of every vault in the batch
    pub authority: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

pub const BATCH_ACCOUNTS_PER_VAULT: usize = 9;

/// One vault of a batch, deserialized from remaining accounts
struct BatchEntry<'info> {
    vault_state: Account<'info, VaultState>,
    source_registry: Account<'info, SourceRegistry>,
    upgrade_log: Account<'info, UpgradeLog>,
    current: ReserveSource<'info>,
    target: ReserveSource<'info>,
}

impl<'info> BatchEntry<'info> {
    fn load(accounts: &'info [AccountInfo<'info>], token_program: &Program<'info, Token>) -> Result<Self> {
        let [vault_info, registry_info, log_info, idle_info, authority_info, current_info, current_tokens_info, target_info, target_tokens_info] =
            accounts
        else {
            return err!(AnchorErrorCode::AccountNotEnoughKeys);
        };

        for info in [vault_info, log_info, idle_info, current_tokens_info, target_tokens_info] {
            require!(info.is_writable, AnchorErrorCode::ConstraintMut);
        }

        let vault_state: Account<'info, VaultState> = Account::try_from(vault_info)?;
        let vault_key = vault_state.key();
        require_pda(
            vault_info,
            &[VAULT_SEED, vault_state.asset_mint.as_ref(), &[vault_state.bump]],
        )?;
        require_pda(
            authority_info,
            &[
                VAULT_AUTHORITY_SEED,
                vault_state.asset_mint.as_ref(),
                &[vault_state.authority_bump],
            ],
        )?;

        let source_registry: Account<'info, SourceRegistry> = Account::try_from(registry_info)?;
        require_pda(
            registry_info,
            &[SOURCE_REGISTRY_SEED, vault_key.as_ref(), &[source_registry.bump]],
        )?;

        let upgrade_log: Account<'info, UpgradeLog> = Account::try_from(log_info)?;
        require_pda(
            log_info,
            &[UPGRADE_LOG_SEED, vault_key.as_ref(), &[upgrade_log.bump]],
        )?;

        let vault_tokens: Account<'info, TokenAccount> = Account::try_from(idle_info)?;
        let reserve = |strategy_info: &'info AccountInfo<'info>,
                       tokens_info: &'info AccountInfo<'info>|
         -> Result<ReserveSource<'info>> {
            let strategy: Account<'info, StrategyState> = Account::try_from(strategy_info)?;
            let strategy_tokens: Account<'info, TokenAccount> = Account::try_from(tokens_info)?;
            ReserveSource::new(
                vault_key,
                &vault_state,
                &strategy,
                &strategy_tokens,
                &vault_tokens,
                authority_info,
                token_program,
            )
        };
        let current = reserve(current_info, current_tokens_info)?;
        let target = reserve(target_info, target_tokens_info)?;

        Ok(Self {
            vault_state,
            source_registry,
            upgrade_log,
            current,
            target,
        })
    }
}

fn require_pda(account: &AccountInfo, seeds: &[&[u8]]) -> Result<()> {
    let expected = Pubkey::create_program_address(seeds, &crate::ID)
        .map_err(|_| error!(AnchorErrorCode::ConstraintSeeds))?;
    require_keys_eq!(*account.key, expected, AnchorErrorCode::ConstraintSeeds);
    Ok(())
}

pub fn batch_replace_handler<'info>(
    ctx: Context<'_, '_, 'info, 'info, BatchReplaceSources<'info>>,
    reason: String,
) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let authority = ctx.accounts.authority.key();
    let remaining = ctx.remaining_accounts;

    require!(
        !remaining.is_empty() && remaining.len() % BATCH_ACCOUNTS_PER_VAULT == 0,
        AnchorErrorCode::AccountNotEnoughKeys
    );

    let mut entries: Vec<BatchEntry> =
        Vec::with_capacity(remaining.len() / BATCH_ACCOUNTS_PER_VAULT);
    for chunk in remaining.chunks_exact(BATCH_ACCOUNTS_PER_VAULT) {
        let entry = BatchEntry::load(chunk, &ctx.accounts.token_program)?;
        require!(
            !entries
                .iter()
                .any(|e| e.vault_state.key() == entry.vault_state.key()),
            VaultError::DuplicateBatchEntry
        );
        entries.push(entry);
    }

    let mut jobs: Vec<UpgradeJob> = entries
        .iter_mut()
        .map(|e| {
            UpgradeJob::replace(
                &mut e.vault_state,
                &e.source_registry,
                &mut e.upgrade_log,
                &mut e.current,
                &mut e.target,
                reason.clone(),
            )
        })
        .collect();
    let records = execute_batch(&mut jobs, &authority, now)?;
    drop(jobs);

    // Accounts loaded by hand are written back by hand
    for (entry, record) in entries.iter().zip(records) {
        entry.vault_state.exit(&crate::ID)?;
        entry.upgrade_log.exit(&crate::ID)?;
        emit_record(entry.vault_state.key(), record);
    }

    msg!("Batch replacement completed for {} vaults", entries.len());
    Ok(())
}

fn emit_record(vault: Pubkey, record: UpgradeRecord) {
    emit!(SourceReplaced {
        vault,
        kind: record.kind,
        previous_source: record.previous_source,
        new_source: record.new_source,
        initiator: record.initiator,
        assets_migrated: record.assets_migrated,
        assets_absorbed: record.assets_absorbed,
        reason: record.reason,
        timestamp: record.timestamp,
    });
}
