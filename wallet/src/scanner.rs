//! Deterministic address derivation and scan-ahead
//!
//! Key `i` of a wallet is `KeyPair::derive(seed, i)`, so any entry can be
//! re-derived from the seed alone. When a wallet is restored from a seed, the
//! scanner asks a balance oracle about each newly derived address and keeps
//! extending the wallet while addresses show activity.

use crate::address::{Address, CoinType};
use crate::error::{Result, WalletError};
use crate::wallet::{Entry, Secret, Wallet};
use seedvault_crypto::KeyPair;
use serde::{Deserialize, Serialize};

/// Error type reported by balance oracles
pub type OracleError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub coins: u64,
    pub hours: u64,
}

impl Balance {
    pub fn is_zero(&self) -> bool {
        self.coins == 0 && self.hours == 0
    }
}

/// Confirmed and predicted (including unconfirmed) balance of one address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancePair {
    pub confirmed: Balance,
    pub predicted: Balance,
}

impl BalancePair {
    /// True when the address has never been used
    pub fn is_empty(&self) -> bool {
        self.confirmed.is_zero() && self.predicted.is_zero()
    }
}

/// Source of address balances, owned by the caller
pub trait BalanceGetter {
    /// Return one balance pair per address, in the same order
    fn get_balances(&self, addresses: &[Address]) -> std::result::Result<Vec<BalancePair>, OracleError>;
}

impl<F> BalanceGetter for F
where
    F: Fn(&[Address]) -> std::result::Result<Vec<BalancePair>, OracleError>,
{
    fn get_balances(&self, addresses: &[Address]) -> std::result::Result<Vec<BalancePair>, OracleError> {
        self(addresses)
    }
}

/// Derive the entry at `index` of a seed
pub fn derive_entry(seed: &Secret, index: u32, coin: CoinType) -> Result<Entry> {
    let keypair = KeyPair::derive(seed.expose().as_bytes(), index)?;
    Ok(Entry::from_keypair(&keypair, coin))
}

/// First address of a seed, used to detect seed reuse
pub fn derive_first_address(seed: &Secret, coin: CoinType) -> Result<Address> {
    Ok(derive_entry(seed, 0, coin)?.address)
}

/// Extend `wallet` while its newest address shows a balance, adding at most
/// `max` addresses. Returns the number of addresses added.
pub(crate) fn scan_ahead(
    wallet: &mut Wallet,
    oracle: &dyn BalanceGetter,
    max: u64,
) -> Result<u64> {
    let mut added = 0;

    while added < max {
        let last = match wallet.entries().last() {
            Some(entry) => entry.address.clone(),
            None => break,
        };

        let balances = oracle
            .get_balances(std::slice::from_ref(&last))
            .map_err(|e| WalletError::BalanceOracle(e.to_string()))?;
        let pair = match balances.as_slice() {
            [pair] => *pair,
            other => {
                return Err(WalletError::BalanceOracle(format!(
                    "expected 1 balance, got {}",
                    other.len()
                )))
            }
        };

        if pair.is_empty() {
            break;
        }

        log::trace!("Address {} has activity, deriving next", last);
        wallet.generate_addresses(1)?;
        added += 1;
    }

    Ok(added)
}
