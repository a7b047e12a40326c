/// Mollusk Integration Tests for Yield Vault
///
/// These tests run real instructions against the compiled program, with
/// the SPL token program loaded, and read the resulting accounts back.
///
/// Security coverage:
///  Deposits route through the bound reserve strategy and redeem back out
///  replace_source moves every token to the new strategy
///  batch_replace_sources swaps several vaults in one instruction
///  A failing batch leaves every vault and token account untouched
///
/// Note: Anchor 0.32.1 and mollusk-svm 0.7.2 use different Solana SDK major
/// versions, so keys and instructions are converted byte for byte at the
/// boundary. The program binary comes from `anchor build`
/// (`target/deploy/yield_vault.so`); without it these tests return early.

use std::path::Path;

use anchor_lang::{
    prelude::*,
    solana_program::{program_option::COption, program_pack::Pack},
    AccountSerialize, InstructionData, ToAccountMetas,
};
use anchor_spl::token::spl_token;
use mollusk_svm::{program::keyed_account_for_system_program, result::Check, Mollusk};
use mollusk_svm_programs_token::token;
use solana_account::Account as SvmAccount;
use solana_instruction::{AccountMeta as SvmAccountMeta, Instruction as SvmInstruction};
use solana_pubkey::Pubkey as SvmPubkey;
use yield_vault::{
    constants::*,
    state::{
        ApprovedSource, HolderPosition, SourceRegistry, StrategyState, UpgradeKind, UpgradeLog,
        VaultState,
    },
};

const LAMPORTS: u64 = 10_000_000_000;

fn svm_key(key: &Pubkey) -> SvmPubkey {
    SvmPubkey::new_from_array(key.to_bytes())
}

fn svm_instruction(data: Vec<u8>, metas: Vec<AccountMeta>) -> SvmInstruction {
    SvmInstruction {
        program_id: svm_key(&yield_vault::ID),
        accounts: metas
            .into_iter()
            .map(|m| SvmAccountMeta {
                pubkey: svm_key(&m.pubkey),
                is_signer: m.is_signer,
                is_writable: m.is_writable,
            })
            .collect(),
        data,
    }
}

/// Account store threaded through a sequence of instructions
struct Bank {
    mollusk: Mollusk,
    accounts: Vec<(SvmPubkey, SvmAccount)>,
}

impl Bank {
    fn new() -> Option<Self> {
        let deploy_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../target/deploy");
        if !Path::new(deploy_dir).join("yield_vault.so").exists() {
            eprintln!("yield_vault.so not found in {deploy_dir}, run `anchor build` first");
            return None;
        }
        std::env::set_var("SBF_OUT_DIR", deploy_dir);

        let mut mollusk = Mollusk::new(&svm_key(&yield_vault::ID), "yield_vault");
        token::add_program(&mut mollusk);

        let mut bank = Self {
            mollusk,
            accounts: Vec::new(),
        };
        bank.accounts.push(keyed_account_for_system_program());
        bank.accounts.push(token::keyed_account());
        Some(bank)
    }

    fn set(&mut self, key: Pubkey, account: SvmAccount) {
        let key = svm_key(&key);
        match self.accounts.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = account,
            None => self.accounts.push((key, account)),
        }
    }

    fn get(&self, key: &Pubkey) -> &SvmAccount {
        let key = svm_key(key);
        self.accounts
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, a)| a)
            .expect("account not in bank")
    }

    fn rent(&self, len: usize) -> u64 {
        self.mollusk.sysvars.rent.minimum_balance(len)
    }

    fn fund(&mut self, key: Pubkey) {
        self.set(
            key,
            SvmAccount {
                lamports: LAMPORTS,
                data: Vec::new(),
                owner: svm_key(&System::id()),
                executable: false,
                rent_epoch: 0,
            },
        );
    }

    fn set_state<T: AccountSerialize>(&mut self, key: Pubkey, state: &T, space: usize) {
        let mut data = Vec::with_capacity(space);
        state.try_serialize(&mut data).unwrap();
        data.resize(space, 0);
        let account = SvmAccount {
            lamports: self.rent(space),
            data,
            owner: svm_key(&yield_vault::ID),
            executable: false,
            rent_epoch: 0,
        };
        self.set(key, account);
    }

    fn set_tokens(&mut self, key: Pubkey, mint: Pubkey, owner: Pubkey, amount: u64) {
        let mut data = vec![0u8; spl_token::state::Account::LEN];
        spl_token::state::Account {
            mint,
            owner,
            amount,
            delegate: COption::None,
            state: spl_token::state::AccountState::Initialized,
            is_native: COption::None,
            delegated_amount: 0,
            close_authority: COption::None,
        }
        .pack_into_slice(&mut data);
        let account = SvmAccount {
            lamports: self.rent(data.len()),
            data,
            owner: svm_key(&spl_token::ID),
            executable: false,
            rent_epoch: 0,
        };
        self.set(key, account);
    }

    fn state<T: AccountDeserialize>(&self, key: &Pubkey) -> T {
        T::try_deserialize(&mut self.get(key).data.as_slice()).unwrap()
    }

    fn tokens(&self, key: &Pubkey) -> u64 {
        spl_token::state::Account::unpack(&self.get(key).data)
            .unwrap()
            .amount
    }

    /// Only the accounts the instruction names, each once
    fn inputs(&self, ix: &SvmInstruction) -> Vec<(SvmPubkey, SvmAccount)> {
        let mut inputs: Vec<(SvmPubkey, SvmAccount)> = Vec::new();
        for meta in &ix.accounts {
            if inputs.iter().any(|(k, _)| *k == meta.pubkey) {
                continue;
            }
            let account = self
                .accounts
                .iter()
                .find(|(k, _)| *k == meta.pubkey)
                .map(|(_, a)| a.clone())
                .unwrap_or_default();
            inputs.push((meta.pubkey, account));
        }
        inputs
    }

    fn run(&mut self, ix: SvmInstruction) {
        let inputs = self.inputs(&ix);
        let result = self
            .mollusk
            .process_and_validate_instruction(&ix, &inputs, &[Check::success()]);
        for (key, account) in result.resulting_accounts {
            match self.accounts.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = account,
                None => self.accounts.push((key, account)),
            }
        }
    }

    fn run_failing(&mut self, ix: SvmInstruction) {
        let inputs = self.inputs(&ix);
        let result = self.mollusk.process_instruction(&ix, &inputs);
        assert!(result.program_result.is_err());
    }
}

/// Keys of one vault bound to its first reserve strategy
struct VaultKeys {
    asset_mint: Pubkey,
    vault: Pubkey,
    vault_authority: Pubkey,
    idle: Pubkey,
    registry: Pubkey,
    log: Pubkey,
    strategy: Pubkey,
    strategy_tokens: Pubkey,
}

impl VaultKeys {
    fn derive(asset_mint: Pubkey) -> (Self, u8, u8, u8, u8) {
        let program_id = yield_vault::ID;
        let (vault, bump) =
            Pubkey::find_program_address(&[VAULT_SEED, asset_mint.as_ref()], &program_id);
        let (vault_authority, authority_bump) =
            Pubkey::find_program_address(&[VAULT_AUTHORITY_SEED, asset_mint.as_ref()], &program_id);
        let (registry, registry_bump) =
            Pubkey::find_program_address(&[SOURCE_REGISTRY_SEED, vault.as_ref()], &program_id);
        let (log, log_bump) =
            Pubkey::find_program_address(&[UPGRADE_LOG_SEED, vault.as_ref()], &program_id);
        let (strategy, strategy_tokens) = strategy_keys(&vault, 1);

        let keys = Self {
            asset_mint,
            vault,
            vault_authority,
            idle: Pubkey::new_unique(),
            registry,
            log,
            strategy,
            strategy_tokens,
        };
        (keys, bump, authority_bump, registry_bump, log_bump)
    }
}

fn strategy_keys(vault: &Pubkey, version: u8) -> (Pubkey, Pubkey) {
    let (strategy, _) = Pubkey::find_program_address(
        &[STRATEGY_SEED, vault.as_ref(), &[version]],
        &yield_vault::ID,
    );
    let (tokens, _) =
        Pubkey::find_program_address(&[STRATEGY_TOKEN_SEED, strategy.as_ref()], &yield_vault::ID);
    (strategy, tokens)
}

fn approved(source: Pubkey, asset_mint: Pubkey, name: &str) -> ApprovedSource {
    ApprovedSource {
        source,
        asset_mint,
        enabled: true,
        approved_at: 0,
        name: name.to_string(),
    }
}

/// Adds a reserve strategy of `vault` holding `amount` tokens
fn add_strategy(bank: &mut Bank, keys: &VaultKeys, version: u8, amount: u64) -> (Pubkey, Pubkey) {
    let (strategy, tokens) = strategy_keys(&keys.vault, version);
    bank.set_state(
        strategy,
        &StrategyState {
            vault: keys.vault,
            asset_mint: keys.asset_mint,
            token_account: tokens,
            annual_rate_bps: 500,
            version,
            name: format!("reserve-v{version}"),
            bump: 0,
            token_bump: 0,
        },
        STRATEGY_STATE_SIZE,
    );
    bank.set_tokens(tokens, keys.asset_mint, keys.vault_authority, amount);
    (strategy, tokens)
}

/// A vault with `deployed` assets in its bound strategy, owned 1:1000 by
/// an existing holder
fn seed_vault(bank: &mut Bank, authority: Pubkey, deployed: u64) -> VaultKeys {
    let asset_mint = Pubkey::new_unique();
    let (keys, bump, authority_bump, registry_bump, log_bump) = VaultKeys::derive(asset_mint);

    bank.set_state(
        keys.vault,
        &VaultState {
            authority,
            asset_mint,
            idle_account: keys.idle,
            fee_recipient: authority,
            total_shares: deployed * 1_000,
            idle_assets: 0,
            deposit_limit: UNLIMITED_DEPOSITS,
            withdrawal_fee_bps: 0,
            management_fee_bps: 0,
            last_fee_collection_ts: 0,
            accrued_fee_shares: 0,
            paused: false,
            locked: false,
            active_source: Some(keys.strategy),
            upgrade_count: 0,
            bump,
            authority_bump,
            _reserved: [0; 64],
        },
        VAULT_STATE_SIZE,
    );
    bank.set_tokens(keys.idle, asset_mint, keys.vault_authority, 0);
    add_strategy(bank, &keys, 1, deployed);

    bank.set_state(
        keys.registry,
        &SourceRegistry {
            vault: keys.vault,
            approved_sources: vec![approved(keys.strategy, asset_mint, "reserve-v1")],
            bump: registry_bump,
        },
        SourceRegistry::SPACE,
    );
    bank.set_state(
        keys.log,
        &UpgradeLog {
            vault: keys.vault,
            records: Vec::new(),
            bump: log_bump,
        },
        UpgradeLog::SPACE,
    );
    keys
}

/// Second strategy of the vault, empty and on the allow-list
fn add_approved_target(bank: &mut Bank, keys: &VaultKeys) -> (Pubkey, Pubkey) {
    let (target, target_tokens) = add_strategy(bank, keys, 2, 0);
    let mut registry: SourceRegistry = bank.state(&keys.registry);
    registry
        .approved_sources
        .push(approved(target, keys.asset_mint, "reserve-v2"));
    bank.set_state(keys.registry, &registry, SourceRegistry::SPACE);
    (target, target_tokens)
}

fn batch_metas(keys: &VaultKeys, target: Pubkey, target_tokens: Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(keys.vault, false),
        AccountMeta::new_readonly(keys.registry, false),
        AccountMeta::new(keys.log, false),
        AccountMeta::new(keys.idle, false),
        AccountMeta::new_readonly(keys.vault_authority, false),
        AccountMeta::new_readonly(keys.strategy, false),
        AccountMeta::new(keys.strategy_tokens, false),
        AccountMeta::new_readonly(target, false),
        AccountMeta::new(target_tokens, false),
    ]
}

// =============================================================================
// DEPOSIT AND REDEEM THROUGH THE RESERVE STRATEGY
// =============================================================================

#[test]
fn test_deposit_then_redeem_through_reserve() {
    let Some(mut bank) = Bank::new() else { return };
    let authority = Pubkey::new_unique();
    let depositor = Pubkey::new_unique();
    let keys = seed_vault(&mut bank, authority, 0);

    let depositor_tokens = Pubkey::new_unique();
    bank.fund(depositor);
    bank.set_tokens(depositor_tokens, keys.asset_mint, depositor, 10_000);
    let (position, _) = Pubkey::find_program_address(
        &[POSITION_SEED, keys.vault.as_ref(), depositor.as_ref()],
        &yield_vault::ID,
    );

    bank.run(svm_instruction(
        yield_vault::instruction::Deposit {
            assets: 10_000,
            on_behalf_of: depositor,
        }
        .data(),
        yield_vault::accounts::Deposit {
            depositor,
            vault_state: keys.vault,
            holder_position: position,
            vault_authority: keys.vault_authority,
            vault_token_account: keys.idle,
            depositor_asset_account: depositor_tokens,
            strategy: Some(keys.strategy),
            strategy_token_account: Some(keys.strategy_tokens),
            token_program: spl_token::ID,
            system_program: System::id(),
        }
        .to_account_metas(None),
    ));

    // everything lands in the strategy, nothing stays idle
    assert_eq!(bank.tokens(&depositor_tokens), 0);
    assert_eq!(bank.tokens(&keys.idle), 0);
    assert_eq!(bank.tokens(&keys.strategy_tokens), 10_000);
    let holder: HolderPosition = bank.state(&position);
    assert_eq!(holder.holder, depositor);
    assert_eq!(holder.shares, 10_000_000);
    let vault: VaultState = bank.state(&keys.vault);
    assert_eq!(vault.total_shares, 10_000_000);
    assert!(!vault.locked);

    bank.run(svm_instruction(
        yield_vault::instruction::Redeem { shares: 10_000_000 }.data(),
        yield_vault::accounts::Withdraw {
            owner: depositor,
            vault_state: keys.vault,
            holder_position: position,
            vault_authority: keys.vault_authority,
            vault_token_account: keys.idle,
            recipient_asset_account: depositor_tokens,
            strategy: Some(keys.strategy),
            strategy_token_account: Some(keys.strategy_tokens),
            token_program: spl_token::ID,
        }
        .to_account_metas(None),
    ));

    assert_eq!(bank.tokens(&depositor_tokens), 10_000);
    assert_eq!(bank.tokens(&keys.strategy_tokens), 0);
    let holder: HolderPosition = bank.state(&position);
    assert_eq!(holder.shares, 0);
    let vault: VaultState = bank.state(&keys.vault);
    assert_eq!(vault.total_shares, 0);
    assert_eq!(vault.idle_assets, 0);
}

// =============================================================================
// SOURCE REPLACEMENT
// =============================================================================

#[test]
fn test_replace_source_moves_tokens() {
    let Some(mut bank) = Bank::new() else { return };
    let authority = Pubkey::new_unique();
    bank.fund(authority);

    let keys = seed_vault(&mut bank, authority, 50_000);
    let (target, target_tokens) = add_approved_target(&mut bank, &keys);
    // a stray transfer into the target before it is bound
    bank.set_tokens(target_tokens, keys.asset_mint, keys.vault_authority, 1);

    bank.run(svm_instruction(
        yield_vault::instruction::ReplaceSource {
            reason: "move to v2".to_string(),
        }
        .data(),
        yield_vault::accounts::ReplaceSource {
            authority,
            vault_state: keys.vault,
            source_registry: keys.registry,
            upgrade_log: keys.log,
            vault_authority: keys.vault_authority,
            vault_token_account: keys.idle,
            current_strategy: keys.strategy,
            current_strategy_token_account: keys.strategy_tokens,
            target_strategy: target,
            target_strategy_token_account: target_tokens,
            token_program: spl_token::ID,
        }
        .to_account_metas(None),
    ));

    assert_eq!(bank.tokens(&keys.strategy_tokens), 0);
    assert_eq!(bank.tokens(&keys.idle), 0);
    assert_eq!(bank.tokens(&target_tokens), 50_001);

    let vault: VaultState = bank.state(&keys.vault);
    assert_eq!(vault.active_source, Some(target));
    assert_eq!(vault.total_shares, 50_000_000);
    assert_eq!(vault.upgrade_count, 1);
    assert!(!vault.locked);

    let log: UpgradeLog = bank.state(&keys.log);
    assert_eq!(log.records.len(), 1);
    assert_eq!(log.records[0].kind, UpgradeKind::Replace);
    assert_eq!(log.records[0].previous_source, keys.strategy);
    assert_eq!(log.records[0].new_source, target);
    assert_eq!(log.records[0].assets_migrated, 50_000);
    assert_eq!(log.records[0].assets_absorbed, 1);
}

// =============================================================================
// BATCH REPLACEMENT
// =============================================================================

/// Two vaults under one authority, each with a second strategy approved
fn batch_setup(bank: &mut Bank, authority: Pubkey) -> [(VaultKeys, Pubkey, Pubkey); 2] {
    [30_000, 70_000].map(|deployed| {
        let keys = seed_vault(bank, authority, deployed);
        let (target, target_tokens) = add_approved_target(bank, &keys);
        (keys, target, target_tokens)
    })
}

fn batch_instruction(authority: Pubkey, vaults: &[(VaultKeys, Pubkey, Pubkey)]) -> SvmInstruction {
    let mut metas = yield_vault::accounts::BatchReplaceSources {
        authority,
        token_program: spl_token::ID,
    }
    .to_account_metas(None);
    for (keys, target, target_tokens) in vaults {
        metas.extend(batch_metas(keys, *target, *target_tokens));
    }
    svm_instruction(
        yield_vault::instruction::BatchReplaceSources {
            reason: "fleet upgrade".to_string(),
        }
        .data(),
        metas,
    )
}

#[test]
fn test_batch_replace_two_vaults() {
    let Some(mut bank) = Bank::new() else { return };
    let authority = Pubkey::new_unique();
    bank.fund(authority);
    let vaults = batch_setup(&mut bank, authority);

    bank.run(batch_instruction(authority, &vaults));

    for ((keys, target, target_tokens), deployed) in vaults.iter().zip([30_000, 70_000]) {
        assert_eq!(bank.tokens(&keys.strategy_tokens), 0);
        assert_eq!(bank.tokens(target_tokens), deployed);

        let vault: VaultState = bank.state(&keys.vault);
        assert_eq!(vault.active_source, Some(*target));
        assert_eq!(vault.total_shares, deployed * 1_000);
        assert!(!vault.locked);

        let log: UpgradeLog = bank.state(&keys.log);
        assert_eq!(log.records.len(), 1);
        assert_eq!(log.records[0].new_source, *target);
        assert_eq!(log.records[0].assets_migrated, deployed);
    }
}

#[test]
fn test_batch_with_unapproved_target_changes_nothing() {
    let Some(mut bank) = Bank::new() else { return };
    let authority = Pubkey::new_unique();
    bank.fund(authority);
    let [first, second] = batch_setup(&mut bank, authority);

    // a strategy of the second vault that never made the allow-list
    let (rogue, rogue_tokens) = add_strategy(&mut bank, &second.0, 3, 0);
    let vaults = [first, (second.0, rogue, rogue_tokens)];

    bank.run_failing(batch_instruction(authority, &vaults));

    for (keys, target, target_tokens) in &vaults {
        assert!(bank.tokens(&keys.strategy_tokens) > 0);
        assert_eq!(bank.tokens(target_tokens), 0);
        let vault: VaultState = bank.state(&keys.vault);
        assert_eq!(vault.active_source, Some(keys.strategy));
        assert_ne!(vault.active_source, Some(*target));
    }
}
