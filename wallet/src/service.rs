//! Wallet service
//!
//! Owns every loaded wallet behind one reader/writer lock. Each operation
//! holds the lock for its full duration, works on a clone of the stored
//! wallet, saves the clone to disk and only then publishes it, so memory
//! never runs ahead of disk. Callers always receive clones.

use crate::address::Address;
use crate::config::ServiceConfig;
use crate::error::{Feature, IntegrityError, Result, WalletError, WalletState};
use crate::scanner::{self, BalanceGetter};
use crate::transaction::{AddressUxOuts, CreateTransactionParams, Transaction, UxBalance};
use crate::wallet::{new_wallet_filename, Options, Secret, Wallet, WalletType, WALLET_EXT};
use parking_lot::RwLock;
use seedvault_storage::{Storage, StorageError};
use std::collections::HashMap;
use std::path::Path;
use zeroize::Zeroizing;

/// Loaded wallets and the index used to detect seed reuse
#[derive(Default)]
struct Store {
    wallets: HashMap<String, Wallet>,
    first_addr_ids: HashMap<Address, String>,
}

impl Store {
    fn get(&self, id: &str) -> Result<&Wallet> {
        self.wallets
            .get(id)
            .ok_or_else(|| WalletError::NotFound(id.to_string()))
    }

    /// Id of the wallet whose first address is `address`
    fn owner_of(&self, address: &Address) -> Option<&String> {
        self.first_addr_ids.get(address)
    }

    /// Insert or replace a wallet; callers check first-address conflicts
    fn insert(&mut self, wallet: Wallet) {
        if let Some(first) = wallet.first_address() {
            self.first_addr_ids
                .insert(first.clone(), wallet.filename().to_string());
        }
        self.wallets.insert(wallet.filename().to_string(), wallet);
    }

    fn remove(&mut self, id: &str) -> Option<Wallet> {
        let wallet = self.wallets.remove(id)?;
        if let Some(first) = wallet.first_address() {
            self.first_addr_ids.remove(first);
        }
        Some(wallet)
    }
}

/// Read every wallet file, failing if any of them breaks an invariant
fn load_store(storage: &Storage) -> Result<Store> {
    storage.remove_stray_files()?;

    let mut store = Store::default();
    for name in storage.list(WALLET_EXT)? {
        let mut wallet: Wallet = storage.load(&name).map_err(|e| match e {
            StorageError::Serialization { reason, .. } => {
                WalletError::from(IntegrityError::Invalid {
                    wallet_id: name.clone(),
                    reason,
                })
            }
            other => WalletError::from(other),
        })?;

        if wallet.entries().is_empty() {
            return Err(IntegrityError::Empty(name).into());
        }
        wallet.validate().map_err(|e| IntegrityError::Invalid {
            wallet_id: name.clone(),
            reason: e.to_string(),
        })?;

        // The file name is authoritative
        wallet.set_filename(&name);

        if let Some(first) = wallet.first_address() {
            if let Some(existing) = store.owner_of(first) {
                return Err(IntegrityError::Duplicate {
                    address: first.to_string(),
                    wallet_id: name,
                    existing_id: existing.clone(),
                }
                .into());
            }
        }

        log::debug!("Loaded wallet {}", name);
        store.insert(wallet);
    }

    Ok(store)
}

pub struct Service {
    store: RwLock<Store>,
    storage: Option<Storage>,
    config: ServiceConfig,
}

impl Service {
    /// Open the wallet directory and load every wallet in it.
    ///
    /// Fails without creating a service if any wallet file is invalid, has
    /// no entries, or shares its first address with another wallet. With the
    /// wallet API disabled nothing is read from disk.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        if !config.enable_wallet_api {
            log::info!("Wallet API disabled, not loading wallets");
            return Ok(Self {
                store: RwLock::new(Store::default()),
                storage: None,
                config,
            });
        }

        let storage = Storage::open(&config.wallet_dir)?;
        let store = load_store(&storage)?;
        log::info!(
            "Loaded {} wallets from {}",
            store.wallets.len(),
            storage.data_dir().display()
        );

        Ok(Self {
            store: RwLock::new(store),
            storage: Some(storage),
            config,
        })
    }

    pub fn is_wallet_api_enabled(&self) -> bool {
        self.config.enable_wallet_api
    }

    pub fn wallet_dir(&self) -> Result<&Path> {
        Ok(self.storage()?.data_dir())
    }

    fn check_api(&self) -> Result<()> {
        if !self.config.enable_wallet_api {
            return Err(WalletError::FeatureDisabled(Feature::WalletApi));
        }
        Ok(())
    }

    fn storage(&self) -> Result<&Storage> {
        self.check_api()?;
        self.storage
            .as_ref()
            .ok_or(WalletError::FeatureDisabled(Feature::WalletApi))
    }

    fn save(&self, wallet: &Wallet) -> Result<()> {
        self.storage()?.save(wallet.filename(), wallet)?;
        Ok(())
    }

    /// Save a modified copy of the wallet stored as `id`, then publish it
    fn commit(&self, store: &mut Store, id: &str, wallet: Wallet) -> Result<()> {
        let stored = store.get(id)?;
        if wallet.filename() != id {
            return Err(WalletError::validation("wallet file name cannot change"));
        }
        if wallet.first_address() != stored.first_address() {
            return Err(WalletError::validation("wallet first address cannot change"));
        }
        wallet.validate()?;

        self.save(&wallet)?;
        store.insert(wallet);
        Ok(())
    }

    /// Create a wallet, saving it under `filename` or a generated name.
    ///
    /// Fails with `SeedConflict` if a loaded wallet already uses the seed.
    pub fn create_wallet(
        &self,
        filename: Option<&str>,
        mut options: Options,
        oracle: Option<&dyn BalanceGetter>,
    ) -> Result<Wallet> {
        self.check_api()?;
        if options.encrypt && options.crypto_type.is_none() {
            options.crypto_type = Some(self.config.crypto_type);
        }

        let mut store = self.store.write();
        let storage = self.storage()?;

        let filename = match filename {
            Some(name) => {
                if store.wallets.contains_key(name) || storage.exists(name) {
                    return Err(WalletError::validation(format!(
                        "wallet {} already exists",
                        name
                    )));
                }
                name.to_string()
            }
            None => loop {
                let name = new_wallet_filename();
                if !store.wallets.contains_key(&name) && !storage.exists(&name) {
                    break name;
                }
            },
        };

        let wallet = Wallet::new_scan_ahead(&filename, options, oracle)?;

        if let Some(first) = wallet.first_address() {
            if let Some(existing) = store.owner_of(first) {
                return Err(WalletError::SeedConflict(existing.clone()));
            }
        }

        self.save(&wallet)?;
        store.insert(wallet.clone());

        log::info!(
            "Created wallet {} with {} addresses (encrypted: {})",
            filename,
            wallet.entries().len(),
            wallet.is_encrypted()
        );
        Ok(wallet)
    }

    /// Encrypt a wallet with the service's configured scheme
    pub fn encrypt_wallet(&self, id: &str, password: &[u8]) -> Result<Wallet> {
        self.check_api()?;
        let mut store = self.store.write();

        let mut wallet = store.get(id)?.clone();
        if wallet.is_encrypted() {
            return Err(WalletError::AlreadyInState(WalletState::Encrypted));
        }
        wallet.lock(password, self.config.crypto_type)?;

        self.commit(&mut store, id, wallet.clone())?;
        log::info!("Encrypted wallet {} ({})", id, self.config.crypto_type);
        Ok(wallet)
    }

    pub fn decrypt_wallet(&self, id: &str, password: &[u8]) -> Result<Wallet> {
        self.check_api()?;
        let mut store = self.store.write();

        let stored = store.get(id)?;
        if !stored.is_encrypted() {
            return Err(WalletError::AlreadyInState(WalletState::NotEncrypted));
        }
        let wallet = stored.unlock(password)?;

        self.commit(&mut store, id, wallet.clone())?;
        log::info!("Decrypted wallet {}", id);
        Ok(wallet)
    }

    /// Append `n` addresses; encrypted wallets need their password
    pub fn new_addresses(&self, id: &str, password: &[u8], n: u64) -> Result<Vec<Address>> {
        self.check_api()?;
        if n == 0 {
            return Err(WalletError::validation("number of addresses must be positive"));
        }
        let mut store = self.store.write();

        let mut wallet = store.get(id)?.clone();
        let addresses = if wallet.is_encrypted() {
            if password.is_empty() {
                return Err(WalletError::MissingPassword);
            }
            wallet.guard_update(password, |w| w.generate_addresses(n))?
        } else {
            if !password.is_empty() {
                return Err(WalletError::PasswordNotExpected);
            }
            wallet.generate_addresses(n)?
        };

        self.commit(&mut store, id, wallet)?;
        log::debug!("Added {} addresses to {}", addresses.len(), id);
        Ok(addresses)
    }

    /// All addresses of a wallet in derivation order
    pub fn get_skycoin_addresses(&self, id: &str) -> Result<Vec<Address>> {
        self.check_api()?;
        let store = self.store.read();
        Ok(store.get(id)?.addresses())
    }

    pub fn get_wallet(&self, id: &str) -> Result<Wallet> {
        self.check_api()?;
        let store = self.store.read();
        Ok(store.get(id)?.clone())
    }

    /// All wallets, sorted by id
    pub fn get_wallets(&self) -> Result<Vec<Wallet>> {
        self.check_api()?;
        let store = self.store.read();
        let mut wallets: Vec<Wallet> = store.wallets.values().cloned().collect();
        wallets.sort_by(|a, b| a.filename().cmp(b.filename()));
        Ok(wallets)
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        self.check_api()?;
        Ok(self.store.read().wallets.contains_key(id))
    }

    /// Build and sign a transaction. Encrypted wallets are only decrypted
    /// for the duration of the call.
    pub fn create_transaction(
        &self,
        params: &CreateTransactionParams,
        auxs: &AddressUxOuts,
        head_time: u64,
    ) -> Result<(Transaction, Vec<UxBalance>)> {
        self.check_api()?;
        params.validate()?;
        let store = self.store.read();

        let wallet = store.get(&params.wallet.id)?;
        let password = &params.wallet.password;
        if wallet.is_encrypted() {
            if password.is_empty() {
                return Err(WalletError::MissingPassword);
            }
            wallet.guard_view(password, |w| w.create_transaction(params, auxs, head_time))
        } else {
            if !password.is_empty() {
                return Err(WalletError::PasswordNotExpected);
            }
            wallet.create_transaction(params, auxs, head_time)
        }
    }

    pub fn update_wallet_label(&self, id: &str, label: &str) -> Result<()> {
        self.check_api()?;
        let mut store = self.store.write();

        let mut wallet = store.get(id)?.clone();
        wallet.set_label(label);
        self.commit(&mut store, id, wallet)
    }

    /// Unload a wallet. Its file is left on disk.
    pub fn remove(&self, id: &str) -> Result<()> {
        self.check_api()?;
        let mut store = self.store.write();

        store
            .remove(id)
            .ok_or_else(|| WalletError::NotFound(id.to_string()))?;
        log::info!("Removed wallet {}", id);
        Ok(())
    }

    /// Reveal the seed of an encrypted wallet
    pub fn get_wallet_seed(&self, id: &str, password: &[u8]) -> Result<Secret> {
        self.check_api()?;
        if !self.config.enable_seed_api {
            return Err(WalletError::FeatureDisabled(Feature::SeedApi));
        }
        let store = self.store.read();

        let wallet = store.get(id)?;
        if !wallet.is_encrypted() {
            return Err(WalletError::AlreadyInState(WalletState::NotEncrypted));
        }
        wallet.guard_view(password, |w| {
            w.seed()
                .cloned()
                .ok_or_else(|| WalletError::NotDeterministic(id.to_string()))
        })
    }

    /// Apply `f` to a copy of the wallet and save the result
    pub fn update<F>(&self, id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Wallet) -> Result<()>,
    {
        self.check_api()?;
        let mut store = self.store.write();

        let mut wallet = store.get(id)?.clone();
        f(&mut wallet)?;
        self.commit(&mut store, id, wallet)
    }

    /// Apply `f` to a copy of the wallet with its secrets available and
    /// save the result. Encrypted wallets are decrypted with `password` and
    /// re-encrypted afterwards; plaintext wallets take no password.
    pub fn update_secrets<F>(&self, id: &str, password: &[u8], f: F) -> Result<()>
    where
        F: FnOnce(&mut Wallet) -> Result<()>,
    {
        self.check_api()?;
        let mut store = self.store.write();

        let mut wallet = store.get(id)?.clone();
        if wallet.is_encrypted() {
            wallet.guard_update(password, f)?;
        } else if !password.is_empty() {
            return Err(WalletError::PasswordNotExpected);
        } else {
            f(&mut wallet)?;
        }
        self.commit(&mut store, id, wallet)
    }

    pub fn view<T, F>(&self, id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&Wallet) -> Result<T>,
    {
        self.check_api()?;
        let store = self.store.read();
        let wallet = store.get(id)?.clone();
        f(&wallet)
    }

    /// Run `f` against the wallet with its secrets available, decrypting a
    /// transient copy if the wallet is encrypted
    pub fn view_secrets<T, F>(&self, id: &str, password: &[u8], f: F) -> Result<T>
    where
        F: FnOnce(&Wallet) -> Result<T>,
    {
        self.check_api()?;
        let store = self.store.read();

        let wallet = store.get(id)?;
        if wallet.is_encrypted() {
            wallet.guard_view(password, f)
        } else if !password.is_empty() {
            Err(WalletError::PasswordNotExpected)
        } else {
            f(&wallet.clone())
        }
    }

    /// Rebuild an encrypted wallet from its seed, for when the password is
    /// lost. The seed must derive the wallet's first address. The rebuilt
    /// wallet has as many addresses as before and keeps its creation time;
    /// it is encrypted with `new_password` unless that is empty.
    pub fn recover_wallet(&self, id: &str, seed: &str, new_password: &[u8]) -> Result<Wallet> {
        self.check_api()?;
        let mut store = self.store.write();

        let stored = store.get(id)?;
        if !stored.is_encrypted() {
            return Err(WalletError::AlreadyInState(WalletState::NotEncrypted));
        }
        if stored.wallet_type() != WalletType::Deterministic {
            return Err(WalletError::NotDeterministic(id.to_string()));
        }

        let seed = Secret::new(seed);
        let first = scanner::derive_first_address(&seed, stored.coin())?;
        if stored.first_address() != Some(&first) {
            return Err(WalletError::RecoveryMismatch);
        }

        let options = Options {
            coin: stored.coin(),
            label: stored.label().to_string(),
            seed: Some(seed),
            encrypt: !new_password.is_empty(),
            password: Zeroizing::new(new_password.to_vec()),
            crypto_type: Some(stored.crypto_type()),
            generate_n: stored.entries().len() as u64,
            ..Default::default()
        };
        let timestamp = stored.timestamp();

        let mut wallet = Wallet::new(id, options)?;
        wallet.set_timestamp(timestamp);

        self.commit(&mut store, id, wallet.clone())?;
        log::info!(
            "Recovered wallet {} with {} addresses",
            id,
            wallet.entries().len()
        );
        Ok(wallet)
    }

    /// Re-read the wallet directory, replacing the loaded wallets only if
    /// every file passes the startup checks
    pub fn reload(&self) -> Result<()> {
        let storage = self.storage()?;
        let mut store = self.store.write();

        let fresh = load_store(storage)?;
        log::info!("Reloaded {} wallets", fresh.wallets.len());
        *store = fresh;
        Ok(())
    }
}
