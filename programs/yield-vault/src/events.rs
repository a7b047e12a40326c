use anchor_lang::prelude::*;

use crate::state::UpgradeKind;

/// Event emitted when a new vault is initialized
#[event]
pub struct VaultInitialized {
    pub vault: Pubkey,
    pub authority: Pubkey,
    pub asset_mint: Pubkey,
    pub fee_recipient: Pubkey,
    pub withdrawal_fee_bps: u16,
    pub management_fee_bps: u16,
    pub timestamp: i64,
}

/// Event emitted when assets are deposited
#[event]
pub struct Deposited {
    pub vault: Pubkey,
    pub depositor: Pubkey,
    pub holder: Pubkey,
    pub asset_amount: u64,
    pub shares_minted: u64,
    pub total_shares: u64,
    pub timestamp: i64,
}

/// Event emitted on withdraw and redeem
#[event]
pub struct Withdrawn {
    pub vault: Pubkey,
    pub owner: Pubkey,
    pub recipient: Pubkey,
    pub shares_burned: u64,
    pub assets_paid: u64,
    pub fee: u64,
    pub total_shares: u64,
    pub timestamp: i64,
}

#[event]
pub struct FeesSettled {
    pub vault: Pubkey,
    pub fee_shares_minted: u64,
    pub accrued_fee_shares: u64,
    pub timestamp: i64,
}

#[event]
pub struct FeesClaimed {
    pub vault: Pubkey,
    pub fee_recipient: Pubkey,
    pub shares_burned: u64,
    pub assets_paid: u64,
    pub timestamp: i64,
}

/// Event emitted when an administrative parameter changes
#[event]
pub struct VaultConfigUpdated {
    pub vault: Pubkey,
    pub authority: Pubkey,
    pub deposit_limit: u64,
    pub withdrawal_fee_bps: u16,
    pub management_fee_bps: u16,
    pub fee_recipient: Pubkey,
    pub paused: bool,
    pub timestamp: i64,
}

#[event]
pub struct EmergencyWithdrawal {
    pub vault: Pubkey,
    pub source: Pubkey,
    pub assets_recovered: u64,
    pub idle_assets: u64,
    pub timestamp: i64,
}

#[event]
pub struct StrategyCreated {
    pub vault: Pubkey,
    pub strategy: Pubkey,
    pub version: u8,
    pub name: String,
    pub timestamp: i64,
}

#[event]
pub struct StrategyRateReported {
    pub strategy: Pubkey,
    pub annual_rate_bps: u16,
    pub timestamp: i64,
}

/// Event emitted when a source is added to the allow-list
#[event]
pub struct SourceApproved {
    pub vault: Pubkey,
    pub source: Pubkey,
    pub name: String,
    pub timestamp: i64,
}

/// Event emitted when an allow-listed source is enabled or disabled
#[event]
pub struct SourceApprovalChanged {
    pub vault: Pubkey,
    pub source: Pubkey,
    pub enabled: bool,
    pub timestamp: i64,
}

#[event]
pub struct SourceBound {
    pub vault: Pubkey,
    pub source: Pubkey,
    pub timestamp: i64,
}

/// Event emitted once per appended upgrade record
#[event]
pub struct SourceReplaced {
    pub vault: Pubkey,
    pub kind: UpgradeKind,
    pub previous_source: Pubkey,
    pub new_source: Pubkey,
    pub initiator: Pubkey,
    pub assets_migrated: u64,
    pub assets_absorbed: u64,
    pub reason: String,
    pub timestamp: i64,
}
