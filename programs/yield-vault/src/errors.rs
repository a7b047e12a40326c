use anchor_lang::prelude::*;

/// Custom error codes for the Yield Vault program
///
/// Every rejected operation leaves vault state untouched.
#[error_code]
pub enum VaultError {
    #[msg("Amount must be greater than zero")]
    ZeroAmount,

    #[msg("Address must not be the default public key")]
    ZeroAddress,

    #[msg("Recipient token account is not valid for this vault")]
    InvalidRecipient,

    #[msg("Vault is paused")]
    Paused,

    #[msg("Deposit would exceed the vault deposit limit")]
    DepositLimitExceeded,

    #[msg("Fee exceeds the 1000 bps maximum")]
    InvalidFee,

    #[msg("No yield source is bound to the vault")]
    NoActiveSource,

    #[msg("Yield source is not on the approved list")]
    SourceNotApproved,

    #[msg("A yield source is already bound to the vault")]
    AlreadyBound,

    #[msg("Target yield source is already the active one")]
    SameImplementation,

    #[msg("Yield source manages a different asset than the vault")]
    AssetMismatch,

    #[msg("Rollback target must be a previously active, non-default source")]
    InvalidRollbackTarget,

    #[msg("Unauthorized - only the vault authority can perform this action")]
    Unauthorized,

    #[msg("Insufficient share balance")]
    InsufficientBalance,

    #[msg("Yield source call failed or returned an inconsistent result")]
    IntegrationFailure,

    #[msg("Presented yield source is not the vault's active source")]
    InactiveSource,

    #[msg("Vault operation already in progress")]
    ReentrantCall,

    #[msg("Deposit is too small to mint a single share")]
    ZeroShares,

    #[msg("Math overflow occurred during calculation")]
    MathOverflow,

    #[msg("Yield source is already on the approved list")]
    SourceAlreadyApproved,

    #[msg("Yield source not found in registry")]
    SourceNotFound,

    #[msg("Cannot disable the active yield source")]
    SourceActive,

    #[msg("Source registry is full - maximum sources reached")]
    RegistryFull,

    #[msg("Upgrade log is full")]
    UpgradeLogFull,

    #[msg("Name too long - maximum 32 characters")]
    NameTooLong,

    #[msg("Upgrade reason too long - maximum 64 characters")]
    ReasonTooLong,

    #[msg("Invalid token mint - does not match vault asset")]
    InvalidMint,

    #[msg("Invalid token account owner")]
    InvalidOwner,

    #[msg("Strategy accounts do not belong together")]
    InvalidStrategyAccount,

    #[msg("Reported rate exceeds 10000 bps")]
    InvalidRate,

    #[msg("A vault appears more than once in the batch")]
    DuplicateBatchEntry,
}
