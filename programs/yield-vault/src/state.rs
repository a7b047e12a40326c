use anchor_lang::prelude::*;

use crate::{
    constants::{MAX_APPROVED_SOURCES, MAX_NAME_LEN, MAX_REASON_LEN, MAX_UPGRADE_RECORDS},
    errors::VaultError,
};

/// Vault aggregate: share supply, fee parameters and the yield source binding
///
/// Security considerations:
/// - Authority stored in state (not instruction args)
/// - `locked` is the re-entrancy guard, set for the duration of every
///   mutating engine operation
/// - 64 bytes padding for future upgrades
#[account]
pub struct VaultState {
    /// Owner role for every administrative operation
    pub authority: Pubkey,          // 32 bytes

    /// Mint of the underlying asset token
    pub asset_mint: Pubkey,         // 32 bytes

    /// Vault's own token account holding idle assets
    pub idle_account: Pubkey,       // 32 bytes

    /// Receives management fee shares
    pub fee_recipient: Pubkey,      // 32 bytes

    /// Holder shares plus accrued fee shares
    pub total_shares: u64,          // 8 bytes

    /// Assets held in `idle_account` and not deployed to the source
    pub idle_assets: u64,           // 8 bytes

    /// Ceiling on total managed assets, `u64::MAX` when unbounded
    pub deposit_limit: u64,         // 8 bytes

    pub withdrawal_fee_bps: u16,    // 2 bytes

    pub management_fee_bps: u16,    // 2 bytes

    pub last_fee_collection_ts: i64, // 8 bytes

    /// Fee shares minted to the fee recipient and not yet claimed
    pub accrued_fee_shares: u64,    // 8 bytes

    pub paused: bool,               // 1 byte

    /// Operation in progress
    pub locked: bool,               // 1 byte

    /// The single bound yield source
    pub active_source: Option<Pubkey>, // 33 bytes

    pub upgrade_count: u64,         // 8 bytes

    /// Bump seed for vault state PDA
    pub bump: u8,                   // 1 byte

    /// Bump seed for vault authority PDA
    pub authority_bump: u8,         // 1 byte

    // Padding for future upgrades
    pub _reserved: [u8; 64],        // 64 bytes
}

impl VaultState {
    pub fn is_authority(&self, key: &Pubkey) -> bool {
        self.authority == *key
    }

    pub fn require_authority(&self, caller: &Pubkey) -> Result<()> {
        require!(self.is_authority(caller), VaultError::Unauthorized);
        Ok(())
    }
}

/// One entry of the holder balance mapping
#[account]
pub struct HolderPosition {
    pub vault: Pubkey,              // 32 bytes
    pub holder: Pubkey,             // 32 bytes
    pub shares: u64,                // 8 bytes
    pub bump: u8,                   // 1 byte
}

impl HolderPosition {
    pub fn new(vault: Pubkey, holder: Pubkey) -> Self {
        Self {
            vault,
            holder,
            shares: 0,
            bump: 0,
        }
    }
}

/// Allow-list of yield sources eligible to become active
///
/// Security: Authority-controlled whitelist prevents routing funds to
/// arbitrary programs or accounts
#[account]
pub struct SourceRegistry {
    /// Vault this registry belongs to
    pub vault: Pubkey,              // 32 bytes

    pub approved_sources: Vec<ApprovedSource>, // 4 + (n * ~111) bytes

    /// Bump seed for PDA
    pub bump: u8,                   // 1 byte
}

/// Individual approved source entry
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq)]
pub struct ApprovedSource {
    /// Identity of the yield source
    pub source: Pubkey,             // 32 bytes

    /// Asset the source manages
    pub asset_mint: Pubkey,         // 32 bytes

    /// Whether this source can currently be bound
    pub enabled: bool,              // 1 byte

    pub approved_at: i64,           // 8 bytes

    /// Human-readable name (e.g., "reserve-v1")
    pub name: String,               // 4 + up to 32 bytes
}

impl SourceRegistry {
    /// 8 (discriminator) + 32 (vault) + 4 (vec len) + (10 * 109) + 1 (bump) + 64 (padding)
    pub const SPACE: usize = 8 + 32 + 4 + (MAX_APPROVED_SOURCES * (32 + 32 + 1 + 8 + 4 + MAX_NAME_LEN)) + 1 + 64;

    pub fn new(vault: Pubkey) -> Self {
        Self {
            vault,
            approved_sources: Vec::new(),
            bump: 0,
        }
    }

    /// Check if a source is approved and enabled
    pub fn is_approved(&self, source: &Pubkey) -> bool {
        self.approved_sources
            .iter()
            .any(|s| s.source == *source && s.enabled)
    }

    pub fn get_mut(&mut self, source: &Pubkey) -> Option<&mut ApprovedSource> {
        self.approved_sources
            .iter_mut()
            .find(|s| s.source == *source)
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpgradeKind {
    Replace,
    Rollback,
    Detach,
}

/// Audit entry appended once per source replacement
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq)]
pub struct UpgradeRecord {
    pub kind: UpgradeKind,          // 1 byte
    pub previous_source: Pubkey,    // 32 bytes
    /// Default key when the source was detached
    pub new_source: Pubkey,         // 32 bytes
    pub initiator: Pubkey,          // 32 bytes
    pub timestamp: i64,             // 8 bytes
    pub assets_migrated: u64,       // 8 bytes
    /// Balance the new source already held, now counted as vault assets
    pub assets_absorbed: u64,       // 8 bytes
    pub reason: String,             // 4 + up to 64 bytes
}

impl UpgradeRecord {
    pub const SPACE: usize = 1 + 32 + 32 + 32 + 8 + 8 + 8 + 4 + MAX_REASON_LEN;
}

/// Append-only log of source replacements
#[account]
pub struct UpgradeLog {
    pub vault: Pubkey,              // 32 bytes
    pub records: Vec<UpgradeRecord>, // 4 + (n * 189) bytes
    pub bump: u8,                   // 1 byte
}

impl UpgradeLog {
    pub const SPACE: usize = 8 + 32 + 4 + (MAX_UPGRADE_RECORDS * UpgradeRecord::SPACE) + 1;

    pub fn new(vault: Pubkey) -> Self {
        Self {
            vault,
            records: Vec::new(),
            bump: 0,
        }
    }

    pub fn append(&mut self, record: UpgradeRecord) -> Result<()> {
        require!(
            self.records.len() < MAX_UPGRADE_RECORDS,
            VaultError::UpgradeLogFull
        );
        self.records.push(record);
        Ok(())
    }

    /// Whether `source` was the active source before some past swap
    pub fn was_previously_active(&self, source: &Pubkey) -> bool {
        self.records.iter().any(|r| r.previous_source == *source)
    }
}

/// Reserve strategy: the on-chain yield source adapter shipped with the vault
///
/// Funds sit in `token_account`, owned by the vault authority PDA. The rate
/// is what the backing lending market last reported.
#[account]
pub struct StrategyState {
    pub vault: Pubkey,              // 32 bytes
    pub asset_mint: Pubkey,         // 32 bytes
    pub token_account: Pubkey,      // 32 bytes
    pub annual_rate_bps: u16,       // 2 bytes
    pub version: u8,                // 1 byte
    pub name: String,               // 4 + up to 32 bytes
    pub bump: u8,                   // 1 byte
    pub token_bump: u8,             // 1 byte
}
