use anchor_lang::prelude::*;

use crate::{
    constants::{MAX_REASON_LEN, MAX_UPGRADE_RECORDS},
    errors::VaultError,
    math::{checked_add, checked_sub},
    state::{SourceRegistry, UpgradeKind, UpgradeLog, UpgradeRecord, VaultState},
    yield_source::YieldSource,
};

/// Progress of a single replacement
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpgradePhase {
    Idle,
    Verifying,
    Swapped,
    Verified,
}

/// Everything a replacement must leave untouched. Holder positions are not
/// part of it: the coordinator never receives them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvariantSnapshot {
    pub asset_mint: Pubkey,
    pub total_shares: u64,
    pub accrued_fee_shares: u64,
    pub total_assets: u64,
}

impl InvariantSnapshot {
    pub fn capture(vault: &VaultState, source: Option<&dyn YieldSource>) -> Result<Self> {
        let managed = match source {
            Some(source) => source.total_managed_assets()?,
            None => 0,
        };
        Ok(Self {
            asset_mint: vault.asset_mint,
            total_shares: vault.total_shares,
            accrued_fee_shares: vault.accrued_fee_shares,
            total_assets: checked_add(vault.idle_assets, managed)?,
        })
    }
}

/// One vault whose active source moves from `current` to `target`
pub struct UpgradeJob<'j> {
    pub vault: &'j mut VaultState,
    pub registry: &'j SourceRegistry,
    pub log: &'j mut UpgradeLog,
    pub current: &'j mut dyn YieldSource,
    pub target: &'j mut dyn YieldSource,
    pub kind: UpgradeKind,
    pub reason: String,
    pub phase: UpgradePhase,
    /// What the target already managed before the swap
    pub absorbed_assets: u64,
}

impl<'j> UpgradeJob<'j> {
    pub fn replace(
        vault: &'j mut VaultState,
        registry: &'j SourceRegistry,
        log: &'j mut UpgradeLog,
        current: &'j mut dyn YieldSource,
        target: &'j mut dyn YieldSource,
        reason: String,
    ) -> Self {
        Self {
            vault,
            registry,
            log,
            current,
            target,
            kind: UpgradeKind::Replace,
            reason,
            phase: UpgradePhase::Idle,
            absorbed_assets: 0,
        }
    }

    pub fn rollback(
        vault: &'j mut VaultState,
        registry: &'j SourceRegistry,
        log: &'j mut UpgradeLog,
        current: &'j mut dyn YieldSource,
        target: &'j mut dyn YieldSource,
        reason: String,
    ) -> Self {
        Self {
            kind: UpgradeKind::Rollback,
            ..Self::replace(vault, registry, log, current, target, reason)
        }
    }

    /// Idle -> Verifying: every precondition, then the snapshot the vault
    /// must match once the target is bound.
    ///
    /// Anyone can transfer into a target before it is bound, so whatever it
    /// already manages is expected on top of the vault's own assets.
    fn verify(&mut self, caller: &Pubkey) -> Result<InvariantSnapshot> {
        self.phase = UpgradePhase::Verifying;

        self.vault.require_authority(caller)?;
        require!(!self.vault.locked, VaultError::ReentrantCall);
        require!(self.reason.len() <= MAX_REASON_LEN, VaultError::ReasonTooLong);

        let active = self
            .vault
            .active_source
            .ok_or(error!(VaultError::NoActiveSource))?;
        let current_id = self.current.source_id();
        require_keys_eq!(current_id, active, VaultError::InactiveSource);

        let target_id = self.target.source_id();
        if self.kind == UpgradeKind::Rollback {
            require!(
                target_id != Pubkey::default()
                    && target_id != current_id
                    && self.log.was_previously_active(&target_id),
                VaultError::InvalidRollbackTarget
            );
        }
        require!(target_id != Pubkey::default(), VaultError::ZeroAddress);
        require!(target_id != current_id, VaultError::SameImplementation);
        require!(
            self.registry.is_approved(&target_id),
            VaultError::SourceNotApproved
        );
        require_keys_eq!(
            self.target.asset_identity(),
            self.vault.asset_mint,
            VaultError::AssetMismatch
        );
        require!(
            self.log.records.len() < MAX_UPGRADE_RECORDS,
            VaultError::UpgradeLogFull
        );

        let absorbed = self.target.total_managed_assets()?;
        let mut expected = InvariantSnapshot::capture(self.vault, Some(&*self.current))?;
        expected.total_assets = checked_add(expected.total_assets, absorbed)?;
        self.absorbed_assets = absorbed;
        Ok(expected)
    }

    /// Verifying -> Swapped: migrate funds, rebind, append the record
    fn swap(&mut self, caller: &Pubkey, now: i64) -> Result<UpgradeRecord> {
        let previous_source = self.current.source_id();
        let new_source = self.target.source_id();
        let idle_account = self.vault.idle_account;

        let migrated = self.current.withdraw_all(&idle_account)?;
        self.vault.idle_assets = checked_add(self.vault.idle_assets, migrated)?;
        self.vault.active_source = Some(new_source);

        if migrated > 0 {
            let deployed = self.target.deposit(migrated)?;
            require!(deployed <= migrated, VaultError::IntegrationFailure);
            self.vault.idle_assets = checked_sub(self.vault.idle_assets, deployed)?;
        }

        let record = UpgradeRecord {
            kind: self.kind,
            previous_source,
            new_source,
            initiator: *caller,
            timestamp: now,
            assets_migrated: migrated,
            assets_absorbed: self.absorbed_assets,
            reason: self.reason.clone(),
        };
        self.log.append(record.clone())?;
        self.vault.upgrade_count = checked_add(self.vault.upgrade_count, 1)?;

        self.phase = UpgradePhase::Swapped;
        Ok(record)
    }

    /// Swapped -> Verified: re-read everything with the target bound
    fn confirm(&mut self, expected: &InvariantSnapshot) -> Result<()> {
        let after = InvariantSnapshot::capture(self.vault, Some(&*self.target))?;
        if after != *expected {
            msg!(
                "Upgrade integrity failure: shares {} -> {}, assets {} -> {}",
                expected.total_shares,
                after.total_shares,
                expected.total_assets,
                after.total_assets
            );
            return err!(VaultError::IntegrationFailure);
        }

        self.phase = UpgradePhase::Verified;
        msg!(
            "Yield source {:?} verified: {} -> {}",
            self.kind,
            self.current.source_id(),
            self.target.source_id()
        );
        Ok(())
    }
}

/// Replaces (or rolls back) the active source of one vault
pub fn execute_upgrade(job: &mut UpgradeJob<'_>, caller: &Pubkey, now: i64) -> Result<UpgradeRecord> {
    let mut records = execute_batch(std::slice::from_mut(job), caller, now)?;
    records.pop().ok_or(error!(VaultError::IntegrationFailure))
}

/// All-or-nothing batch: every job is verified before any is swapped, and a
/// failure after swapping restores every vault and log in the batch.
pub fn execute_batch(
    jobs: &mut [UpgradeJob<'_>],
    caller: &Pubkey,
    now: i64,
) -> Result<Vec<UpgradeRecord>> {
    let mut snapshots = Vec::with_capacity(jobs.len());
    for i in 0..jobs.len() {
        match jobs[i].verify(caller) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => {
                for job in jobs.iter_mut() {
                    job.phase = UpgradePhase::Idle;
                    job.absorbed_assets = 0;
                }
                return Err(e);
            }
        }
    }

    let saved: Vec<(VaultState, UpgradeLog)> = jobs
        .iter()
        .map(|job| (job.vault.clone(), job.log.clone()))
        .collect();

    let result = swap_all(jobs, &snapshots, caller, now);
    if result.is_err() {
        for (job, (vault, log)) in jobs.iter_mut().zip(saved) {
            *job.vault = vault;
            *job.log = log;
            job.phase = UpgradePhase::Idle;
            job.absorbed_assets = 0;
        }
    }
    result
}

fn swap_all(
    jobs: &mut [UpgradeJob<'_>],
    snapshots: &[InvariantSnapshot],
    caller: &Pubkey,
    now: i64,
) -> Result<Vec<UpgradeRecord>> {
    let mut records = Vec::with_capacity(jobs.len());
    for (job, expected) in jobs.iter_mut().zip(snapshots) {
        job.vault.locked = true;
        let record = job.swap(caller, now)?;
        job.confirm(expected)?;
        job.vault.locked = false;
        records.push(record);
    }
    Ok(records)
}

/// Withdraws everything from the active source into the idle account and
/// clears the binding, so a fresh source can be bound with
/// `set_active_source`.
pub fn detach_source(
    vault: &mut VaultState,
    log: &mut UpgradeLog,
    current: &mut dyn YieldSource,
    caller: &Pubkey,
    reason: String,
    now: i64,
) -> Result<UpgradeRecord> {
    vault.require_authority(caller)?;
    require!(!vault.locked, VaultError::ReentrantCall);
    require!(reason.len() <= MAX_REASON_LEN, VaultError::ReasonTooLong);

    let active = vault
        .active_source
        .ok_or(error!(VaultError::NoActiveSource))?;
    let previous_source = current.source_id();
    require_keys_eq!(previous_source, active, VaultError::InactiveSource);
    require!(
        log.records.len() < MAX_UPGRADE_RECORDS,
        VaultError::UpgradeLogFull
    );

    let before = InvariantSnapshot::capture(vault, Some(&*current))?;
    let saved = (vault.clone(), log.clone());
    vault.locked = true;

    let result = (|| -> Result<UpgradeRecord> {
        let idle_account = vault.idle_account;
        let migrated = current.withdraw_all(&idle_account)?;
        vault.idle_assets = checked_add(vault.idle_assets, migrated)?;
        vault.active_source = None;

        let after = InvariantSnapshot::capture(vault, None)?;
        require!(after == before, VaultError::IntegrationFailure);

        let record = UpgradeRecord {
            kind: UpgradeKind::Detach,
            previous_source,
            new_source: Pubkey::default(),
            initiator: *caller,
            timestamp: now,
            assets_migrated: migrated,
            assets_absorbed: 0,
            reason,
        };
        log.append(record.clone())?;
        vault.upgrade_count = checked_add(vault.upgrade_count, 1)?;
        Ok(record)
    })();

    match result {
        Ok(record) => {
            vault.locked = false;
            msg!(
                "Yield source detached: {}, {} assets now idle",
                previous_source,
                vault.idle_assets
            );
            Ok(record)
        }
        Err(e) => {
            *vault = saved.0;
            *log = saved.1;
            Err(e)
        }
    }
}
