// Yield Vault - single-asset share vault routing deposits to one yield source
// Security: Follows Solana security best practices with comprehensive validation
// Architecture: plain-Rust accounting engine behind thin Anchor instruction handlers

use anchor_lang::prelude::*;

pub mod constants;
pub mod engine;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod math;
pub mod reserve;
pub mod state;
pub mod yield_source;

use engine::VaultHealth;
use instructions::*;

declare_id!("32kv7kvNo3aoXXKUEMMqEtZzwA1NGm3QNU6J5NmRkghV");

#[program]
pub mod yield_vault {
    use super::*;

    /// Initialize a new vault for a given asset token
    ///
    /// Security considerations:
    /// - Validates authority is signer
    /// - Fee rates bounded at 10%
    /// - Creates the registry and upgrade log PDAs; no source bound yet
    pub fn initialize(ctx: Context<Initialize>, params: InitializeParams) -> Result<()> {
        instructions::initialize::handler(ctx, params)
    }

    /// Deposit assets and mint shares to `on_behalf_of`, returns shares minted
    ///
    /// Security considerations:
    /// - Validates user token accounts (mint, owner)
    /// - Settles the management fee before pricing shares
    /// - Virtual share offset on every conversion
    /// - Emits event for tracking
    pub fn deposit(ctx: Context<Deposit>, assets: u64, on_behalf_of: Pubkey) -> Result<u64> {
        instructions::deposit::handler(ctx, assets, on_behalf_of)
    }

    /// Take `assets` (before the withdrawal fee) out of the signer's
    /// position, returns shares burned
    pub fn withdraw(ctx: Context<Withdraw>, assets: u64) -> Result<u64> {
        instructions::withdraw::withdraw_handler(ctx, assets)
    }

    /// Burn `shares` of the signer's position, returns assets paid
    pub fn redeem(ctx: Context<Withdraw>, shares: u64) -> Result<u64> {
        instructions::withdraw::redeem_handler(ctx, shares)
    }

    /// Mint the management fee accrued so far. Anyone may call it.
    pub fn settle_fees(ctx: Context<SettleFees>) -> Result<u64> {
        instructions::fees::settle_handler(ctx)
    }

    /// Pay all accrued fee shares out to the fee recipient
    ///
    /// Security considerations:
    /// - Caller must be the fee recipient or the authority
    /// - Destination must belong to the fee recipient
    pub fn claim_fees(ctx: Context<ClaimFees>) -> Result<u64> {
        instructions::fees::claim_handler(ctx)
    }

    pub fn set_deposit_limit(ctx: Context<AdminVault>, limit: Option<u64>) -> Result<()> {
        instructions::admin::handler(ctx, ConfigChange::DepositLimit(limit))
    }

    pub fn set_withdrawal_fee(ctx: Context<AdminVault>, fee_bps: u16) -> Result<()> {
        instructions::admin::handler(ctx, ConfigChange::WithdrawalFee(fee_bps))
    }

    /// Settles at the old rate before the new one applies
    pub fn set_management_fee(ctx: Context<AdminVault>, fee_bps: u16) -> Result<()> {
        instructions::admin::handler(ctx, ConfigChange::ManagementFee(fee_bps))
    }

    /// Unclaimed fee shares move with the role
    pub fn set_fee_recipient(ctx: Context<AdminVault>, fee_recipient: Pubkey) -> Result<()> {
        instructions::admin::handler(ctx, ConfigChange::FeeRecipient(fee_recipient))
    }

    /// Pause blocks deposits and exits; admin and emergency paths stay open
    pub fn set_paused(ctx: Context<AdminVault>, paused: bool) -> Result<()> {
        instructions::admin::handler(ctx, ConfigChange::Paused(paused))
    }

    /// Pull everything out of the active source into the idle account
    ///
    /// Security considerations:
    /// - Authority-only function
    /// - Works while paused
    /// - Emits event for transparency
    pub fn emergency_withdraw(ctx: Context<EmergencyWithdraw>) -> Result<u64> {
        instructions::emergency::handler(ctx)
    }

    /// Create a reserve strategy owned by the vault authority PDA
    pub fn create_strategy(
        ctx: Context<CreateStrategy>,
        version: u8,
        name: String,
        annual_rate_bps: u16,
    ) -> Result<()> {
        instructions::strategy::create_handler(ctx, version, name, annual_rate_bps)
    }

    pub fn report_strategy_rate(ctx: Context<ReportStrategyRate>, annual_rate_bps: u16) -> Result<()> {
        instructions::strategy::report_rate_handler(ctx, annual_rate_bps)
    }

    /// Add a strategy to the approved allow-list
    ///
    /// Security considerations:
    /// - Authority-only function
    /// - Validates the strategy manages the vault's asset
    /// - Enforces registry size limits
    /// - Emits event for tracking
    pub fn approve_source(ctx: Context<SourceAdmin>, name: String) -> Result<()> {
        instructions::sources::approve_handler(ctx, name)
    }

    /// Enable or disable an allow-listed strategy
    ///
    /// Security considerations:
    /// - Authority-only function
    /// - The active strategy cannot be disabled
    pub fn set_source_approval(
        ctx: Context<SetSourceApproval>,
        source: Pubkey,
        enabled: bool,
    ) -> Result<()> {
        instructions::sources::set_approval_handler(ctx, source, enabled)
    }

    /// Bind the first active strategy
    pub fn set_active_source(ctx: Context<SourceAdmin>) -> Result<()> {
        instructions::sources::bind_handler(ctx)
    }

    /// Migrate all deployed assets to another approved strategy
    ///
    /// Security considerations:
    /// - Authority-only function
    /// - Shares, fee shares, asset and total assets verified unchanged
    /// - Appends to the upgrade log
    pub fn replace_source(ctx: Context<ReplaceSource>, reason: String) -> Result<()> {
        instructions::upgrade::replace_handler(ctx, reason)
    }

    /// Replace back to a strategy that was active before
    pub fn rollback_source(ctx: Context<ReplaceSource>, reason: String) -> Result<()> {
        instructions::upgrade::rollback_handler(ctx, reason)
    }

    pub fn detach_source(ctx: Context<DetachSource>, reason: String) -> Result<()> {
        instructions::upgrade::detach_handler(ctx, reason)
    }

    /// Replace the strategy of several vaults, all or nothing
    pub fn batch_replace_sources<'info>(
        ctx: Context<'_, '_, 'info, 'info, BatchReplaceSources<'info>>,
        reason: String,
    ) -> Result<()> {
        instructions::upgrade::batch_replace_handler(ctx, reason)
    }

    pub fn preview_deposit(ctx: Context<ViewVault>, assets: u64) -> Result<u64> {
        instructions::views::preview_handler(ctx, View::Deposit(assets))
    }

    pub fn preview_withdraw(ctx: Context<ViewVault>, assets: u64) -> Result<u64> {
        instructions::views::preview_handler(ctx, View::Withdraw(assets))
    }

    pub fn preview_redeem(ctx: Context<ViewVault>, shares: u64) -> Result<u64> {
        instructions::views::preview_handler(ctx, View::Redeem(shares))
    }

    pub fn vault_health(ctx: Context<ViewVault>) -> Result<VaultHealth> {
        instructions::views::health_handler(ctx)
    }
}
