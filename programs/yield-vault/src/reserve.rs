use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::{
    constants::VAULT_AUTHORITY_SEED,
    errors::VaultError,
    state::{StrategyState, VaultState},
    yield_source::{YieldSource, WITHDRAW_ALL},
};

/// `YieldSource` backed by a reserve strategy account.
///
/// Deployed assets sit in the strategy token account, owned by the vault
/// authority PDA, so every movement is a token transfer signed by that PDA.
/// Anything sent straight to the strategy token account counts as managed
/// assets, exactly like yield would.
pub struct ReserveSource<'info> {
    id: Pubkey,
    asset_mint: Pubkey,
    annual_rate_bps: u16,
    authority_bump: u8,
    strategy_tokens: Account<'info, TokenAccount>,
    vault_tokens: AccountInfo<'info>,
    vault_authority: AccountInfo<'info>,
    token_program: AccountInfo<'info>,
    /// Token accounts, besides the vault's own, that may receive withdrawals
    destinations: Vec<AccountInfo<'info>>,
}

impl<'info> ReserveSource<'info> {
    pub fn new(
        vault_key: Pubkey,
        vault: &VaultState,
        strategy: &Account<'info, StrategyState>,
        strategy_tokens: &Account<'info, TokenAccount>,
        vault_tokens: &Account<'info, TokenAccount>,
        vault_authority: &AccountInfo<'info>,
        token_program: &Program<'info, Token>,
    ) -> Result<Self> {
        // CHECKS: the strategy belongs to this vault and these are its tokens
        require_keys_eq!(strategy.vault, vault_key, VaultError::InvalidStrategyAccount);
        require_keys_eq!(
            strategy.token_account,
            strategy_tokens.key(),
            VaultError::InvalidStrategyAccount
        );
        require_keys_eq!(strategy_tokens.mint, strategy.asset_mint, VaultError::InvalidMint);
        require_keys_eq!(
            strategy_tokens.owner,
            *vault_authority.key,
            VaultError::InvalidOwner
        );
        require_keys_eq!(vault_tokens.key(), vault.idle_account, VaultError::InvalidRecipient);

        Ok(Self {
            id: strategy.key(),
            asset_mint: strategy.asset_mint,
            annual_rate_bps: strategy.annual_rate_bps,
            authority_bump: vault.authority_bump,
            strategy_tokens: strategy_tokens.clone(),
            vault_tokens: vault_tokens.to_account_info(),
            vault_authority: vault_authority.clone(),
            token_program: token_program.to_account_info(),
            destinations: Vec::new(),
        })
    }

    pub fn with_destination(mut self, account: AccountInfo<'info>) -> Self {
        self.destinations.push(account);
        self
    }

    fn destination(&self, recipient: &Pubkey) -> Result<AccountInfo<'info>> {
        if self.vault_tokens.key == recipient {
            return Ok(self.vault_tokens.clone());
        }
        self.destinations
            .iter()
            .find(|a| a.key == recipient)
            .cloned()
            .ok_or(error!(VaultError::InvalidRecipient))
    }

    fn transfer(&self, from: AccountInfo<'info>, to: AccountInfo<'info>, amount: u64) -> Result<()> {
        let bump = [self.authority_bump];
        let authority_seeds: &[&[u8]] = &[VAULT_AUTHORITY_SEED, self.asset_mint.as_ref(), &bump];
        let signer_seeds = &[authority_seeds];

        let transfer_ctx = CpiContext::new_with_signer(
            self.token_program.clone(),
            Transfer {
                from,
                to,
                authority: self.vault_authority.clone(),
            },
            signer_seeds,
        );
        token::transfer(transfer_ctx, amount)
    }
}

impl<'info> YieldSource for ReserveSource<'info> {
    fn source_id(&self) -> Pubkey {
        self.id
    }

    fn asset_identity(&self) -> Pubkey {
        self.asset_mint
    }

    fn total_managed_assets(&self) -> Result<u64> {
        Ok(self.strategy_tokens.amount)
    }

    fn deposit(&mut self, amount: u64) -> Result<u64> {
        let before = self.strategy_tokens.amount;
        self.transfer(
            self.vault_tokens.clone(),
            self.strategy_tokens.to_account_info(),
            amount,
        )?;
        self.strategy_tokens.reload()?;

        self.strategy_tokens
            .amount
            .checked_sub(before)
            .ok_or(error!(VaultError::IntegrationFailure))
    }

    fn withdraw(&mut self, amount: u64, recipient: &Pubkey) -> Result<u64> {
        let before = self.strategy_tokens.amount;
        let amount = if amount == WITHDRAW_ALL { before } else { amount };
        require!(amount <= before, VaultError::IntegrationFailure);
        if amount == 0 {
            return Ok(0);
        }

        let to = self.destination(recipient)?;
        self.transfer(self.strategy_tokens.to_account_info(), to, amount)?;
        self.strategy_tokens.reload()?;

        before
            .checked_sub(self.strategy_tokens.amount)
            .ok_or(error!(VaultError::IntegrationFailure))
    }

    fn current_annual_rate_bps(&self) -> Result<u16> {
        Ok(self.annual_rate_bps)
    }
}

/// Builds the adapter from the optional strategy accounts of an instruction.
/// Both present binds the reserve, both absent means "no source".
pub fn reserve_source<'info>(
    vault_key: Pubkey,
    vault: &VaultState,
    strategy: &Option<Account<'info, StrategyState>>,
    strategy_tokens: &Option<Account<'info, TokenAccount>>,
    vault_tokens: &Account<'info, TokenAccount>,
    vault_authority: &AccountInfo<'info>,
    token_program: &Program<'info, Token>,
) -> Result<Option<ReserveSource<'info>>> {
    match (strategy, strategy_tokens) {
        (Some(strategy), Some(strategy_tokens)) => Ok(Some(ReserveSource::new(
            vault_key,
            vault,
            strategy,
            strategy_tokens,
            vault_tokens,
            vault_authority,
            token_program,
        )?)),
        (None, None) => Ok(None),
        _ => err!(VaultError::InvalidStrategyAccount),
    }
}
