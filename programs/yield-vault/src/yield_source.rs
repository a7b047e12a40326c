use anchor_lang::prelude::*;

/// Amount sentinel for `YieldSource::withdraw` meaning "everything"
pub const WITHDRAW_ALL: u64 = u64::MAX;

/// Capability of an external venue that holds the vault's deployed assets
/// and grows them over time.
///
/// Every call may fail; the engine surfaces the error untouched.
pub trait YieldSource {
    /// Identity used by the allow-list and the active binding
    fn source_id(&self) -> Pubkey;

    /// Mint of the asset the source manages
    fn asset_identity(&self) -> Pubkey;

    /// Assets currently held on behalf of the vault, yield included
    fn total_managed_assets(&self) -> Result<u64>;

    /// Moves `amount` from the vault's idle account into the source,
    /// returns what the source actually took
    fn deposit(&mut self, amount: u64) -> Result<u64>;

    /// Sends `amount` (or everything for `WITHDRAW_ALL`) to `recipient`
    fn withdraw(&mut self, amount: u64, recipient: &Pubkey) -> Result<u64>;

    fn withdraw_all(&mut self, recipient: &Pubkey) -> Result<u64> {
        self.withdraw(WITHDRAW_ALL, recipient)
    }

    fn current_annual_rate_bps(&self) -> Result<u16>;
}
