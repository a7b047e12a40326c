use anchor_lang::prelude::*;

use crate::{
    constants::{MAX_APPROVED_SOURCES, MAX_NAME_LEN},
    errors::VaultError,
    state::{ApprovedSource, SourceRegistry, VaultState},
    yield_source::{YieldSource, WITHDRAW_ALL},
};

/// Forwards vault calls to the single active yield source
///
/// A router only ever holds the source the vault is bound to; anything else
/// is refused at `bind`.
pub struct StrategyRouter<'s> {
    source: Option<&'s mut dyn YieldSource>,
}

impl<'s> StrategyRouter<'s> {
    pub fn bind(vault: &VaultState, source: Option<&'s mut dyn YieldSource>) -> Result<Self> {
        if let Some(source) = source.as_deref() {
            require!(
                vault.active_source == Some(source.source_id()),
                VaultError::InactiveSource
            );
        }
        Ok(Self { source })
    }

    fn active(&self) -> Result<&(dyn YieldSource + 's)> {
        self.source
            .as_deref()
            .ok_or(error!(VaultError::NoActiveSource))
    }

    fn active_mut(&mut self) -> Result<&mut (dyn YieldSource + 's)> {
        match self.source.as_deref_mut() {
            Some(source) => Ok(source),
            None => err!(VaultError::NoActiveSource),
        }
    }

    pub fn managed_assets(&self) -> Result<u64> {
        self.active()?.total_managed_assets()
    }

    pub fn current_rate_bps(&self) -> Result<u16> {
        self.active()?.current_annual_rate_bps()
    }

    pub fn route_deposit(&mut self, assets: u64) -> Result<u64> {
        require!(assets > 0, VaultError::ZeroAmount);
        let actual = self.active_mut()?.deposit(assets)?;
        require!(actual <= assets, VaultError::IntegrationFailure);
        Ok(actual)
    }

    pub fn route_withdraw(&mut self, assets: u64, recipient: &Pubkey) -> Result<u64> {
        require!(assets > 0, VaultError::ZeroAmount);
        require!(*recipient != Pubkey::default(), VaultError::InvalidRecipient);
        let actual = self.active_mut()?.withdraw(assets, recipient)?;
        if assets != WITHDRAW_ALL {
            // a short or long payout breaks the share math
            require!(actual == assets, VaultError::IntegrationFailure);
        }
        Ok(actual)
    }

    pub fn route_withdraw_all(&mut self, recipient: &Pubkey) -> Result<u64> {
        require!(*recipient != Pubkey::default(), VaultError::InvalidRecipient);
        self.active_mut()?.withdraw_all(recipient)
    }
}

/// Binds the first source; afterwards only the upgrade coordinator moves it
pub fn set_active_source(
    vault: &mut VaultState,
    registry: &SourceRegistry,
    source: &dyn YieldSource,
    caller: &Pubkey,
) -> Result<()> {
    vault.require_authority(caller)?;

    let source_id = source.source_id();
    require!(source_id != Pubkey::default(), VaultError::ZeroAddress);
    require!(vault.active_source.is_none(), VaultError::AlreadyBound);
    require!(
        registry.is_approved(&source_id),
        VaultError::SourceNotApproved
    );
    require_keys_eq!(
        source.asset_identity(),
        vault.asset_mint,
        VaultError::AssetMismatch
    );

    vault.active_source = Some(source_id);
    msg!("Yield source bound: {}", source_id);
    Ok(())
}

/// Adds a source to the allow-list
pub fn approve_source(
    vault: &VaultState,
    registry: &mut SourceRegistry,
    source: &dyn YieldSource,
    name: String,
    caller: &Pubkey,
    now: i64,
) -> Result<()> {
    vault.require_authority(caller)?;
    require!(name.len() <= MAX_NAME_LEN, VaultError::NameTooLong);

    let source_id = source.source_id();
    require!(source_id != Pubkey::default(), VaultError::ZeroAddress);
    require_keys_eq!(
        source.asset_identity(),
        vault.asset_mint,
        VaultError::AssetMismatch
    );
    require!(
        !registry
            .approved_sources
            .iter()
            .any(|s| s.source == source_id),
        VaultError::SourceAlreadyApproved
    );
    require!(
        registry.approved_sources.len() < MAX_APPROVED_SOURCES,
        VaultError::RegistryFull
    );

    registry.approved_sources.push(ApprovedSource {
        source: source_id,
        asset_mint: source.asset_identity(),
        enabled: true,
        approved_at: now,
        name,
    });
    Ok(())
}

/// Enables or disables an allow-listed source; the bound one stays enabled
pub fn set_source_approval(
    vault: &VaultState,
    registry: &mut SourceRegistry,
    source: &Pubkey,
    enabled: bool,
    caller: &Pubkey,
) -> Result<()> {
    vault.require_authority(caller)?;
    if !enabled {
        require!(
            vault.active_source != Some(*source),
            VaultError::SourceActive
        );
    }

    let entry = registry
        .get_mut(source)
        .ok_or(VaultError::SourceNotFound)?;
    entry.enabled = enabled;
    Ok(())
}
