//! Shared fixtures for the engine tests: an in-memory yield source and a
//! vault bound to it.

#![allow(dead_code)]

use anchor_lang::prelude::*;
use yield_vault::{
    constants::UNLIMITED_DEPOSITS,
    engine::{approve_source, VaultEngine},
    errors::VaultError,
    state::{HolderPosition, SourceRegistry, UpgradeLog, VaultState},
    yield_source::{YieldSource, WITHDRAW_ALL},
};

pub const T0: i64 = 1_700_000_000;
pub const DAY: i64 = 86_400;

/// In-memory yield source
///
/// `donate` and `accrue` change managed assets without the vault knowing,
/// the way a transfer into a strategy account or real yield would.
pub struct MockSource {
    pub id: Pubkey,
    pub asset: Pubkey,
    pub managed: u64,
    pub rate_bps: u16,
    /// Every call errors
    pub failing: bool,
    /// Share of each deposit that disappears inside the source
    pub deposit_haircut_bps: u16,
    /// Targeted withdrawals pay one unit less than asked
    pub short_pays: bool,
    /// (recipient, amount) of every payout
    pub payouts: Vec<(Pubkey, u64)>,
}

impl MockSource {
    pub fn new(asset: Pubkey) -> Self {
        Self {
            id: Pubkey::new_unique(),
            asset,
            managed: 0,
            rate_bps: 500,
            failing: false,
            deposit_haircut_bps: 0,
            short_pays: false,
            payouts: Vec::new(),
        }
    }

    pub fn donate(&mut self, amount: u64) {
        self.managed += amount;
    }

    /// Simple interest on what is managed
    pub fn accrue(&mut self, seconds: i64) {
        let interest = self.managed as u128 * self.rate_bps as u128 * seconds as u128
            / (10_000u128 * 31_536_000u128);
        self.managed += interest as u64;
    }

    pub fn paid_to(&self, recipient: &Pubkey) -> u64 {
        self.payouts
            .iter()
            .filter(|(to, _)| to == recipient)
            .map(|(_, amount)| amount)
            .sum()
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            return err!(VaultError::IntegrationFailure);
        }
        Ok(())
    }
}

impl YieldSource for MockSource {
    fn source_id(&self) -> Pubkey {
        self.id
    }

    fn asset_identity(&self) -> Pubkey {
        self.asset
    }

    fn total_managed_assets(&self) -> Result<u64> {
        self.check()?;
        Ok(self.managed)
    }

    fn deposit(&mut self, amount: u64) -> Result<u64> {
        self.check()?;
        let lost = amount as u128 * self.deposit_haircut_bps as u128 / 10_000;
        self.managed += amount - lost as u64;
        Ok(amount)
    }

    fn withdraw(&mut self, amount: u64, recipient: &Pubkey) -> Result<u64> {
        self.check()?;
        let amount = if amount == WITHDRAW_ALL { self.managed } else { amount };
        if amount > self.managed {
            return err!(VaultError::IntegrationFailure);
        }
        self.managed -= amount;

        let paid = if self.short_pays && amount > 0 { amount - 1 } else { amount };
        self.payouts.push((*recipient, paid));
        Ok(paid)
    }

    fn current_annual_rate_bps(&self) -> Result<u16> {
        self.check()?;
        Ok(self.rate_bps)
    }
}

pub fn new_vault(asset: Pubkey, authority: Pubkey, fee_recipient: Pubkey) -> VaultState {
    VaultState {
        authority,
        asset_mint: asset,
        idle_account: Pubkey::new_unique(),
        fee_recipient,
        total_shares: 0,
        idle_assets: 0,
        deposit_limit: UNLIMITED_DEPOSITS,
        withdrawal_fee_bps: 0,
        management_fee_bps: 0,
        last_fee_collection_ts: T0,
        accrued_fee_shares: 0,
        paused: false,
        locked: false,
        active_source: None,
        upgrade_count: 0,
        bump: 255,
        authority_bump: 254,
        _reserved: [0; 64],
    }
}

/// Everything observable about a vault, for before/after comparisons
pub type Fingerprint = (u64, u64, u64, u64, i64, bool, bool, Option<Pubkey>, u64);

pub fn fingerprint(vault: &VaultState) -> Fingerprint {
    (
        vault.total_shares,
        vault.idle_assets,
        vault.accrued_fee_shares,
        vault.deposit_limit,
        vault.last_fee_collection_ts,
        vault.paused,
        vault.locked,
        vault.active_source,
        vault.upgrade_count,
    )
}

/// A vault bound to a mock source, with its registry and upgrade log
pub struct Fixture {
    pub vault_key: Pubkey,
    pub authority: Pubkey,
    pub fee_recipient: Pubkey,
    pub vault: VaultState,
    pub registry: SourceRegistry,
    pub log: UpgradeLog,
    pub source: MockSource,
}

impl Fixture {
    pub fn new() -> Self {
        let vault_key = Pubkey::new_unique();
        let asset = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let fee_recipient = Pubkey::new_unique();

        let mut vault = new_vault(asset, authority, fee_recipient);
        let mut registry = SourceRegistry::new(vault_key);
        let source = MockSource::new(asset);

        approve_source(&vault, &mut registry, &source, "mock-v1".to_string(), &authority, T0)
            .unwrap();
        vault.active_source = Some(source.id);

        Self {
            vault_key,
            authority,
            fee_recipient,
            vault,
            registry,
            log: UpgradeLog::new(vault_key),
            source,
        }
    }

    pub fn with_fees(withdrawal_fee_bps: u16, management_fee_bps: u16) -> Self {
        let mut fixture = Self::new();
        fixture.vault.withdrawal_fee_bps = withdrawal_fee_bps;
        fixture.vault.management_fee_bps = management_fee_bps;
        fixture
    }

    pub fn engine(&mut self) -> VaultEngine<'_, '_> {
        VaultEngine::new(&mut self.vault, Some(&mut self.source as &mut dyn YieldSource)).unwrap()
    }

    pub fn position(&self) -> HolderPosition {
        HolderPosition::new(self.vault_key, Pubkey::new_unique())
    }

    pub fn deposit(&mut self, position: &mut HolderPosition, assets: u64, now: i64) -> Result<u64> {
        self.engine().deposit(assets, position, now)
    }

    /// Redeem everything the position holds to the holder
    pub fn redeem_all(&mut self, position: &mut HolderPosition, now: i64) -> Result<u64> {
        let holder = position.holder;
        let shares = position.shares;
        let exit = self.engine().redeem(shares, &holder, &holder, position, now)?;
        Ok(exit.assets_paid)
    }

    pub fn total_assets(&mut self) -> u64 {
        self.engine().total_assets().unwrap()
    }

    pub fn value_of(&mut self, shares: u64) -> u64 {
        let total_assets = self.total_assets();
        self.vault
            .convert_to_assets(shares, total_assets, yield_vault::math::Rounding::Down)
            .unwrap()
    }
}
