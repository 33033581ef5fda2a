//! Encrypting and decrypting wallet secrets
//!
//! A locked wallet keeps its seed and every private key in one base64 blob
//! produced by the wallet's [`CryptoType`]. Secret access on a locked wallet
//! goes through [`Wallet::guard_view`] or [`Wallet::guard_update`], which
//! decrypt a transient copy for the duration of a closure. The copy is
//! dropped, and its secrets wiped, on every exit path.

use crate::address::Address;
use crate::error::{Result, WalletError, WalletState};
use crate::wallet::{Secret, Wallet, WalletType};
use base64::{engine::general_purpose, Engine as _};
use seedvault_crypto::CryptoType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use zeroize::Zeroizing;

/// Plaintext content of the encrypted blob
#[derive(Serialize, Deserialize)]
struct SecretsPayload {
    #[serde(default)]
    seed: Option<Secret>,
    keys: BTreeMap<Address, Secret>,
}

impl Wallet {
    /// Encrypt the seed and private keys with `password`
    pub fn lock(&mut self, password: &[u8], crypto_type: CryptoType) -> Result<()> {
        if self.meta.encrypted {
            return Err(WalletError::AlreadyInState(WalletState::Encrypted));
        }
        if password.is_empty() {
            return Err(WalletError::MissingPassword);
        }

        let payload = SecretsPayload {
            seed: self.seed.clone(),
            keys: self
                .entries
                .iter()
                .filter_map(|e| e.secret_key.clone().map(|k| (e.address.clone(), k)))
                .collect(),
        };
        let plain = Zeroizing::new(
            serde_json::to_vec(&payload).map_err(|e| WalletError::validation(e.to_string()))?,
        );
        let blob = crypto_type.encrypt(&plain, password)?;

        self.secrets = Some(general_purpose::STANDARD.encode(blob));
        self.seed = None;
        for entry in &mut self.entries {
            entry.secret_key = None;
        }
        self.meta.crypto_type = crypto_type;
        self.meta.encrypted = true;

        Ok(())
    }

    /// Return a decrypted copy of this wallet
    pub fn unlock(&self, password: &[u8]) -> Result<Wallet> {
        if !self.meta.encrypted {
            return Err(WalletError::AlreadyInState(WalletState::NotEncrypted));
        }
        if password.is_empty() {
            return Err(WalletError::MissingPassword);
        }

        let encoded = self
            .secrets
            .as_deref()
            .ok_or_else(|| WalletError::validation("wallet has no encrypted secrets"))?;
        let blob = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| WalletError::validation(format!("secrets are not base64: {}", e)))?;

        let plain = self.meta.crypto_type.decrypt(&blob, password)?;
        let SecretsPayload { seed, mut keys } = serde_json::from_slice(&plain)
            .map_err(|_| WalletError::validation("decrypted secrets are malformed"))?;

        let mut wallet = self.clone();
        wallet.secrets = None;
        wallet.meta.encrypted = false;
        wallet.seed = seed;

        for entry in &mut wallet.entries {
            let key = keys.remove(&entry.address).ok_or_else(|| {
                WalletError::validation(format!("no secret key for address {}", entry.address))
            })?;
            entry.secret_key = Some(key);
        }
        if !keys.is_empty() {
            return Err(WalletError::validation(
                "decrypted secrets do not match wallet entries",
            ));
        }
        if wallet.meta.wallet_type == WalletType::Deterministic && wallet.seed.is_none() {
            return Err(WalletError::validation("decrypted secrets have no seed"));
        }

        wallet.validate()?;
        Ok(wallet)
    }

    /// Run `f` against a decrypted copy; `self` is never modified
    pub fn guard_view<T, F>(&self, password: &[u8], f: F) -> Result<T>
    where
        F: FnOnce(&Wallet) -> Result<T>,
    {
        let plain = self.unlock(password)?;
        f(&plain)
    }

    /// Run `f` against a decrypted copy and re-encrypt it with the same
    /// password and scheme. `self` is replaced only if every step succeeds.
    pub fn guard_update<T, F>(&mut self, password: &[u8], f: F) -> Result<T>
    where
        F: FnOnce(&mut Wallet) -> Result<T>,
    {
        let mut plain = self.unlock(password)?;
        let out = f(&mut plain)?;
        plain.lock(password, self.meta.crypto_type)?;
        *self = plain;
        Ok(out)
    }
}
