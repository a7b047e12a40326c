// Constants for the Yield Vault program

/// Seed for vault state PDA
pub const VAULT_SEED: &[u8] = b"vault";

/// Seed for vault authority PDA (owns the idle and strategy token accounts)
pub const VAULT_AUTHORITY_SEED: &[u8] = b"vault_authority";

/// Seed for per-holder share position PDA
pub const POSITION_SEED: &[u8] = b"position";

/// Seed for the approved-source registry PDA
pub const SOURCE_REGISTRY_SEED: &[u8] = b"source_registry";

/// Seed for the append-only upgrade log PDA
pub const UPGRADE_LOG_SEED: &[u8] = b"upgrade_log";

/// Seed for reserve strategy state PDA
pub const STRATEGY_SEED: &[u8] = b"strategy";

/// Seed for reserve strategy token account PDA
pub const STRATEGY_TOKEN_SEED: &[u8] = b"strategy_tokens";

/// 100% in basis points
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Upper bound for both the withdrawal and the management fee (10%)
pub const MAX_FEE_BPS: u16 = 1_000;

/// Upper bound for a rate reported by a strategy (100% APY)
pub const MAX_RATE_BPS: u16 = 10_000;

pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Virtual shares added to the supply in every conversion.
///
/// A depositor loses at most one share's worth plus one unit to rounding:
/// `(total_assets + VIRTUAL_ASSETS) / (total_shares + VIRTUAL_SHARES) + 1`.
/// Against a one-unit first deposit that stays under 1% of the victim's
/// deposit until the donation reaches ~10^4 times that deposit.
pub const VIRTUAL_SHARES: u64 = 1_000_000;

/// Virtual assets paired with `VIRTUAL_SHARES`; the pair fixes the initial
/// rate at 10^3 shares per asset unit
pub const VIRTUAL_ASSETS: u64 = 1_000;

/// Deposit limit meaning "unbounded"
pub const UNLIMITED_DEPOSITS: u64 = u64::MAX;

/// Capacity of the approved-source registry
pub const MAX_APPROVED_SOURCES: usize = 10;

/// Capacity of the upgrade log
pub const MAX_UPGRADE_RECORDS: usize = 16;

pub const MAX_NAME_LEN: usize = 32;

pub const MAX_REASON_LEN: usize = 64;

/// Space for VaultState account (8 discriminator + 32 authority + 32 asset_mint +
/// 32 idle_account + 32 fee_recipient + 8 total_shares + 8 idle_assets +
/// 8 deposit_limit + 2 withdrawal_fee_bps + 2 management_fee_bps +
/// 8 last_fee_collection_ts + 8 accrued_fee_shares + 1 paused + 1 locked +
/// 33 active_source + 8 upgrade_count + 1 bump + 1 authority_bump + 64 padding)
pub const VAULT_STATE_SIZE: usize =
    8 + 32 + 32 + 32 + 32 + 8 + 8 + 8 + 2 + 2 + 8 + 8 + 1 + 1 + 33 + 8 + 1 + 1 + 64;

/// Space for HolderPosition account (8 discriminator + 32 vault + 32 holder +
/// 8 shares + 1 bump)
pub const HOLDER_POSITION_SIZE: usize = 8 + 32 + 32 + 8 + 1;

/// Space for StrategyState account (8 discriminator + 32 vault + 32 asset_mint +
/// 32 token_account + 2 annual_rate_bps + 1 version + 4 + 32 name + 1 bump +
/// 1 token_bump)
pub const STRATEGY_STATE_SIZE: usize = 8 + 32 + 32 + 32 + 2 + 1 + 4 + MAX_NAME_LEN + 1 + 1;
