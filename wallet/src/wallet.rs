use crate::address::{Address, CoinType};
use crate::error::{Result, WalletError, WalletState};
use crate::scanner::{self, BalanceGetter};
use seedvault_crypto::{CryptoType, KeyPair};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

/// Extension of wallet files
pub const WALLET_EXT: &str = "wlt";

/// Wallet file format version
pub const WALLET_VERSION: &str = "0.3";

/// Secret string (seed or hex private key), wiped from memory on drop
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    /// Borrow the plaintext value
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletType {
    /// Every key is derived from the wallet seed
    #[default]
    Deterministic,
    /// Independently imported keys, no seed
    Collection,
}

/// Non-secret wallet metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub filename: String,
    pub label: String,
    pub coin: CoinType,
    #[serde(rename = "type")]
    pub wallet_type: WalletType,
    pub version: String,
    pub crypto_type: CryptoType,
    pub encrypted: bool,
    /// Creation time, unix seconds
    pub timestamp: i64,
}

/// One address of a wallet, ordered by derivation index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub address: Address,
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<Secret>,
}

impl Entry {
    pub(crate) fn from_keypair(keypair: &KeyPair, coin: CoinType) -> Self {
        Self {
            address: Address::from_public_key(&keypair.public_key_bytes(), coin),
            public_key: keypair.public_key_hex(),
            secret_key: Some(Secret::new(keypair.secret_key_hex())),
        }
    }
}

/// Wallet creation options
#[derive(Clone, Default)]
pub struct Options {
    pub coin: CoinType,
    pub label: String,
    pub seed: Option<Secret>,
    pub encrypt: bool,
    pub password: Zeroizing<Vec<u8>>,
    /// Defaults to the service's configured scheme when encrypting
    pub crypto_type: Option<CryptoType>,
    /// Number of addresses to generate up front (at least one)
    pub generate_n: u64,
    /// Upper bound on addresses added by scan-ahead
    pub scan_n: u64,
    pub wallet_type: WalletType,
    /// Hex private keys for collection wallets
    pub import_keys: Vec<Secret>,
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("coin", &self.coin)
            .field("label", &self.label)
            .field("encrypt", &self.encrypt)
            .field("crypto_type", &self.crypto_type)
            .field("generate_n", &self.generate_n)
            .field("scan_n", &self.scan_n)
            .field("wallet_type", &self.wallet_type)
            .field("import_keys", &self.import_keys.len())
            .finish_non_exhaustive()
    }
}

/// A wallet: metadata, ordered address entries and secrets.
///
/// While encrypted, the seed and every private key live only inside the
/// `secrets` blob; while plaintext, `secrets` is absent.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub(crate) meta: Meta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) seed: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) secrets: Option<String>,
    pub(crate) entries: Vec<Entry>,
}

impl Wallet {
    /// Create a wallet from options, generating its initial addresses
    pub fn new(filename: &str, options: Options) -> Result<Self> {
        let mut wallet = Self::new_plain(filename, &options)?;
        wallet.finish(&options)?;
        Ok(wallet)
    }

    /// Create a wallet and extend it over previously used addresses.
    ///
    /// After the initial addresses are generated, the balance oracle is asked
    /// about the newest address; while it reports activity another address is
    /// derived, up to `options.scan_n` extra addresses.
    pub fn new_scan_ahead(
        filename: &str,
        options: Options,
        oracle: Option<&dyn BalanceGetter>,
    ) -> Result<Self> {
        let mut wallet = Self::new_plain(filename, &options)?;

        if let Some(oracle) = oracle {
            if options.scan_n > 0 && wallet.meta.wallet_type == WalletType::Deterministic {
                let added = scanner::scan_ahead(&mut wallet, oracle, options.scan_n)?;
                log::debug!("Scan-ahead added {} addresses to {}", added, filename);
            }
        }

        wallet.finish(&options)?;
        Ok(wallet)
    }

    fn new_plain(filename: &str, options: &Options) -> Result<Self> {
        validate_filename(filename)?;

        let meta = Meta {
            filename: filename.to_string(),
            label: options.label.clone(),
            coin: options.coin,
            wallet_type: options.wallet_type,
            version: WALLET_VERSION.to_string(),
            crypto_type: options.crypto_type.unwrap_or_default(),
            encrypted: false,
            timestamp: chrono::Utc::now().timestamp(),
        };

        match options.wallet_type {
            WalletType::Deterministic => {
                if !options.import_keys.is_empty() {
                    return Err(WalletError::validation(
                        "deterministic wallets cannot import keys",
                    ));
                }
                let seed = match &options.seed {
                    Some(seed) if !seed.expose().trim().is_empty() => seed.clone(),
                    _ => return Err(WalletError::validation("seed required")),
                };

                let mut wallet = Wallet {
                    meta,
                    seed: Some(seed),
                    secrets: None,
                    entries: Vec::new(),
                };
                wallet.generate_addresses(options.generate_n.max(1))?;
                Ok(wallet)
            }
            WalletType::Collection => {
                if options.seed.is_some() {
                    return Err(WalletError::validation("collection wallets have no seed"));
                }
                if options.import_keys.is_empty() {
                    return Err(WalletError::validation(
                        "collection wallets need at least one key",
                    ));
                }

                let mut seen = HashSet::new();
                let mut entries = Vec::with_capacity(options.import_keys.len());
                for key in &options.import_keys {
                    let keypair = KeyPair::from_secret_hex(key.expose())?;
                    let entry = Entry::from_keypair(&keypair, options.coin);
                    if !seen.insert(entry.address.clone()) {
                        return Err(WalletError::validation(format!(
                            "duplicate key for address {}",
                            entry.address
                        )));
                    }
                    entries.push(entry);
                }

                Ok(Wallet {
                    meta,
                    seed: None,
                    secrets: None,
                    entries,
                })
            }
        }
    }

    /// Apply the encryption part of the options
    fn finish(&mut self, options: &Options) -> Result<()> {
        if options.encrypt {
            if options.password.is_empty() {
                return Err(WalletError::MissingPassword);
            }
            self.lock(&options.password, self.meta.crypto_type)?;
        } else if !options.password.is_empty() {
            return Err(WalletError::PasswordNotExpected);
        }
        Ok(())
    }

    /// Append `n` addresses derived at the next indices
    pub fn generate_addresses(&mut self, n: u64) -> Result<Vec<Address>> {
        if self.meta.encrypted {
            return Err(WalletError::AlreadyInState(WalletState::Encrypted));
        }
        if self.meta.wallet_type != WalletType::Deterministic {
            return Err(WalletError::NotDeterministic(self.meta.filename.clone()));
        }

        let seed = self
            .seed
            .as_ref()
            .ok_or_else(|| WalletError::validation("wallet has no seed"))?;

        let start = self.entries.len() as u64;
        let end = start
            .checked_add(n)
            .filter(|end| *end <= u64::from(u32::MAX) + 1)
            .ok_or_else(|| WalletError::validation("too many addresses"))?;

        let mut fresh = Vec::new();
        for index in start..end {
            fresh.push(scanner::derive_entry(seed, index as u32, self.meta.coin)?);
        }

        let addresses = fresh.iter().map(|e| e.address.clone()).collect();
        self.entries.extend(fresh);
        Ok(addresses)
    }

    pub fn filename(&self) -> &str {
        &self.meta.filename
    }

    pub(crate) fn set_filename(&mut self, filename: &str) {
        self.meta.filename = filename.to_string();
    }

    pub fn label(&self) -> &str {
        &self.meta.label
    }

    pub fn set_label(&mut self, label: &str) {
        self.meta.label = label.to_string();
    }

    pub fn coin(&self) -> CoinType {
        self.meta.coin
    }

    pub fn wallet_type(&self) -> WalletType {
        self.meta.wallet_type
    }

    pub fn crypto_type(&self) -> CryptoType {
        self.meta.crypto_type
    }

    pub fn is_encrypted(&self) -> bool {
        self.meta.encrypted
    }

    pub fn timestamp(&self) -> i64 {
        self.meta.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: i64) {
        self.meta.timestamp = timestamp;
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.entries.iter().map(|e| e.address.clone()).collect()
    }

    /// Address at index 0; every loaded or created wallet has one
    pub fn first_address(&self) -> Option<&Address> {
        self.entries.first().map(|e| &e.address)
    }

    /// Seed, only available while the wallet is decrypted
    pub fn seed(&self) -> Option<&Secret> {
        self.seed.as_ref()
    }

    /// Signing key for an address, only available while decrypted
    pub fn keypair_for(&self, address: &Address) -> Result<KeyPair> {
        let entry = self
            .entries
            .iter()
            .find(|e| &e.address == address)
            .ok_or_else(|| WalletError::validation(format!("address {} not in wallet", address)))?;
        let secret = entry
            .secret_key
            .as_ref()
            .ok_or(WalletError::AlreadyInState(WalletState::Encrypted))?;
        Ok(KeyPair::from_secret_hex(secret.expose())?)
    }

    /// Secret-free view for callers
    pub fn readable(&self) -> ReadableWallet {
        ReadableWallet {
            meta: self.meta.clone(),
            entries: self
                .entries
                .iter()
                .map(|e| ReadableEntry {
                    address: e.address.clone(),
                    public_key: e.public_key.clone(),
                })
                .collect(),
        }
    }

    /// Structural integrity check applied to wallets loaded from disk
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(WalletError::validation("wallet has no entries"));
        }

        if self.meta.encrypted {
            if self.secrets.as_deref().map_or(true, str::is_empty) {
                return Err(WalletError::validation("encrypted wallet has no secrets"));
            }
            if self.seed.is_some() || self.entries.iter().any(|e| e.secret_key.is_some()) {
                return Err(WalletError::validation(
                    "encrypted wallet holds plaintext secrets",
                ));
            }
        } else {
            if self.secrets.is_some() {
                return Err(WalletError::validation("plaintext wallet holds encrypted secrets"));
            }
            match self.meta.wallet_type {
                WalletType::Deterministic if self.seed.is_none() => {
                    return Err(WalletError::validation("deterministic wallet has no seed"));
                }
                WalletType::Collection if self.seed.is_some() => {
                    return Err(WalletError::validation("collection wallet has a seed"));
                }
                _ => {}
            }
        }

        let mut seen = HashSet::new();
        for (i, entry) in self.entries.iter().enumerate() {
            let expected = Address::from_public_key_hex(&entry.public_key, self.meta.coin)?;
            if expected != entry.address {
                return Err(WalletError::validation(format!(
                    "entry {} address does not match its public key",
                    i
                )));
            }
            if !seen.insert(&entry.address) {
                return Err(WalletError::validation(format!(
                    "duplicate address {}",
                    entry.address
                )));
            }

            if let Some(secret) = &entry.secret_key {
                let keypair = KeyPair::from_secret_hex(secret.expose())?;
                if keypair.public_key_hex() != entry.public_key {
                    return Err(WalletError::validation(format!(
                        "entry {} secret key does not match its public key",
                        i
                    )));
                }
            }

            if let Some(seed) = &self.seed {
                let derived = scanner::derive_entry(seed, i as u32, self.meta.coin)?;
                if derived.address != entry.address {
                    return Err(WalletError::validation(format!(
                        "entry {} is not derived from the wallet seed",
                        i
                    )));
                }
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("filename", &self.meta.filename)
            .field("coin", &self.meta.coin)
            .field("type", &self.meta.wallet_type)
            .field("encrypted", &self.meta.encrypted)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadableEntry {
    pub address: Address,
    pub public_key: String,
}

/// Wallet as shown to clients: metadata and public data only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadableWallet {
    pub meta: Meta,
    pub entries: Vec<ReadableEntry>,
}

/// Generate a wallet file name like `2026_10_19_1432_1a2b3c4d.wlt`
pub fn new_wallet_filename() -> String {
    let suffix: [u8; 4] = rand::random();
    format!(
        "{}_{}.{}",
        chrono::Utc::now().format("%Y_%m_%d_%H%M"),
        hex::encode(suffix),
        WALLET_EXT
    )
}

fn validate_filename(filename: &str) -> Result<()> {
    let suffix = format!(".{}", WALLET_EXT);
    let stem = filename.strip_suffix(&suffix).unwrap_or("");
    if stem.is_empty() || filename.contains(['/', '\\']) || filename.starts_with('.') {
        return Err(WalletError::validation(format!(
            "invalid wallet file name {:?}",
            filename
        )));
    }
    Ok(())
}
