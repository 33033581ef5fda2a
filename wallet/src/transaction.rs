//! Transaction construction and signing
//!
//! Input selection is a pure function of the wallet's addresses, the
//! supplied unspent outputs, the head time and the spend policy, so the same
//! inputs always give the same signed transaction.

use crate::address::{Address, CoinType};
use crate::error::{Result, WalletError, WalletState};
use crate::wallet::Wallet;
use seedvault_crypto::{hash_sha256, hash_sha256_hex, KeyPair};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use zeroize::Zeroizing;

/// An unspent output that may be used as a transaction input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UxOut {
    /// 64 hex character output id
    pub hash: String,
    pub address: Address,
    pub coins: u64,
    pub hours: u64,
    /// Unix seconds of the block that created the output
    pub time: u64,
}

/// Unspent outputs grouped by owning address
pub type AddressUxOuts = BTreeMap<Address, Vec<UxOut>>;

/// Summary of an output consumed by a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UxBalance {
    pub hash: String,
    pub address: Address,
    pub coins: u64,
    pub hours: u64,
    pub time: u64,
}

impl From<&UxOut> for UxBalance {
    fn from(ux: &UxOut) -> Self {
        Self {
            hash: ux.hash.clone(),
            address: ux.address.clone(),
            coins: ux.coins,
            hours: ux.hours,
            time: ux.time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendPolicy {
    /// Spend the largest outputs first
    #[default]
    MinimizeInputs,
    /// Spend the smallest outputs first, consolidating dust
    MaximizeInputs,
}

/// Wallet to spend from and its password, if encrypted
#[derive(Clone, Default)]
pub struct WalletParams {
    pub id: String,
    pub password: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for WalletParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletParams")
            .field("id", &self.id)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    pub address: Address,
    pub coins: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CreateTransactionParams {
    pub wallet: WalletParams,
    pub to: Vec<Receiver>,
    pub fee: u64,
    /// Defaults to the wallet's first address
    pub change_address: Option<Address>,
    pub policy: SpendPolicy,
}

impl CreateTransactionParams {
    /// Check the parameters before any wallet state is touched
    pub fn validate(&self) -> Result<()> {
        if self.wallet.id.is_empty() {
            return Err(WalletError::validation("missing wallet id"));
        }
        if self.to.is_empty() {
            return Err(WalletError::validation("no receivers"));
        }
        if self.to.iter().any(|r| r.coins == 0) {
            return Err(WalletError::validation("receiver amount must be positive"));
        }
        self.spend_total()?;

        let coin = self.to[0].address.coin_type();
        let mixed = self
            .to
            .iter()
            .map(|r| &r.address)
            .chain(self.change_address.iter())
            .any(|a| a.coin_type() != coin);
        if mixed {
            return Err(WalletError::validation("addresses belong to different coins"));
        }

        Ok(())
    }

    /// Sum of all receiver amounts plus the fee
    fn spend_total(&self) -> Result<u64> {
        self.to
            .iter()
            .try_fold(self.fee, |acc, r| acc.checked_add(r.coins))
            .ok_or_else(|| WalletError::validation("amount overflow"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub uxid: String,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: Address,
    pub coins: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSig {
    pub public_key: String,
    pub signature: String,
}

/// Signed transaction; input `i` is signed by `sigs[i]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub sigs: Vec<TxSig>,
    pub inner_hash: String,
}

impl Transaction {
    /// Hash of the inputs and outputs, which every signature commits to
    pub fn compute_inner_hash(inputs: &[TxInput], outputs: &[TxOutput]) -> [u8; 32] {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(inputs.len() as u32).to_le_bytes());
        for input in inputs {
            put_str(&mut buf, &input.uxid);
            put_str(&mut buf, input.address.as_str());
        }
        buf.extend_from_slice(&(outputs.len() as u32).to_le_bytes());
        for output in outputs {
            put_str(&mut buf, output.address.as_str());
            buf.extend_from_slice(&output.coins.to_le_bytes());
        }
        hash_sha256(&buf)
    }

    /// Transaction id, covering the signatures too
    pub fn hash(&self) -> String {
        let mut buf = Vec::new();
        put_str(&mut buf, &self.inner_hash);
        for sig in &self.sigs {
            put_str(&mut buf, &sig.public_key);
            put_str(&mut buf, &sig.signature);
        }
        hash_sha256_hex(&buf)
    }

    /// Check the inner hash and that every input is signed by its owner
    pub fn verify(&self, coin: CoinType) -> Result<()> {
        let inner = Self::compute_inner_hash(&self.inputs, &self.outputs);
        if hex::encode(inner) != self.inner_hash {
            return Err(WalletError::validation("inner hash mismatch"));
        }
        if self.sigs.len() != self.inputs.len() {
            return Err(WalletError::validation("signature count mismatch"));
        }

        for (i, (input, sig)) in self.inputs.iter().zip(&self.sigs).enumerate() {
            if Address::from_public_key_hex(&sig.public_key, coin)? != input.address {
                return Err(WalletError::validation(format!(
                    "input {} signed by the wrong key",
                    i
                )));
            }
            let signature = hex::decode(&sig.signature)
                .map_err(|_| WalletError::validation(format!("input {} signature is not hex", i)))?;
            KeyPair::verify(&sig.public_key, &signing_message(&inner, &input.uxid)?, &signature)?;
        }

        Ok(())
    }
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn signing_message(inner_hash: &[u8; 32], uxid: &str) -> Result<Vec<u8>> {
    let id = hex::decode(uxid)
        .ok()
        .filter(|id| id.len() == 32)
        .ok_or_else(|| WalletError::validation(format!("invalid output hash {:?}", uxid)))?;
    let mut msg = Vec::with_capacity(64);
    msg.extend_from_slice(inner_hash);
    msg.extend_from_slice(&id);
    Ok(msg)
}

/// Pick outputs in policy order until `need` is covered; returns the
/// selected outputs and their total
fn select_outputs<'a>(
    mut candidates: Vec<&'a UxOut>,
    need: u64,
    policy: SpendPolicy,
) -> Result<(Vec<&'a UxOut>, u64)> {
    candidates.sort_by(|a, b| {
        let by_coins = match policy {
            SpendPolicy::MinimizeInputs => b.coins.cmp(&a.coins),
            SpendPolicy::MaximizeInputs => a.coins.cmp(&b.coins),
        };
        by_coins
            .then(a.time.cmp(&b.time))
            .then_with(|| a.hash.cmp(&b.hash))
    });

    let mut have: u64 = 0;
    let mut selected = Vec::new();
    for ux in &candidates {
        if have >= need {
            break;
        }
        have = have
            .checked_add(ux.coins)
            .ok_or_else(|| WalletError::validation("amount overflow"))?;
        selected.push(*ux);
    }

    if have < need {
        return Err(WalletError::InsufficientFunds { have, need });
    }
    Ok((selected, have))
}

impl Wallet {
    /// Build and sign a transaction from this wallet's outputs.
    ///
    /// Needs plaintext keys: on an encrypted wallet call it inside
    /// [`Wallet::guard_view`].
    pub fn create_transaction(
        &self,
        params: &CreateTransactionParams,
        auxs: &AddressUxOuts,
        head_time: u64,
    ) -> Result<(Transaction, Vec<UxBalance>)> {
        if self.is_encrypted() {
            return Err(WalletError::AlreadyInState(WalletState::Encrypted));
        }
        params.validate()?;

        if params.to[0].address.coin_type() != self.coin() {
            return Err(WalletError::validation(format!(
                "receivers are not {} addresses",
                self.coin()
            )));
        }

        let owned: HashSet<&Address> = self.entries().iter().map(|e| &e.address).collect();
        let mut seen = HashSet::new();
        let candidates: Vec<&UxOut> = auxs
            .values()
            .flatten()
            .filter(|ux| owned.contains(&ux.address) && ux.time <= head_time)
            .filter(|ux| seen.insert(ux.hash.as_str()))
            .collect();

        let need = params.spend_total()?;
        let (selected, have) = select_outputs(candidates, need, params.policy)?;

        let mut outputs: Vec<TxOutput> = params
            .to
            .iter()
            .map(|r| TxOutput {
                address: r.address.clone(),
                coins: r.coins,
            })
            .collect();

        let change = have
            .checked_sub(need)
            .ok_or_else(|| WalletError::validation("amount overflow"))?;
        if change > 0 {
            let address = match &params.change_address {
                Some(address) => address.clone(),
                None => self
                    .first_address()
                    .cloned()
                    .ok_or_else(|| WalletError::validation("wallet has no addresses"))?,
            };
            outputs.push(TxOutput {
                address,
                coins: change,
            });
        }

        let inputs: Vec<TxInput> = selected
            .iter()
            .map(|ux| TxInput {
                uxid: ux.hash.clone(),
                address: ux.address.clone(),
            })
            .collect();

        let inner = Transaction::compute_inner_hash(&inputs, &outputs);
        let mut sigs = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let keypair = self.keypair_for(&input.address)?;
            let signature = keypair.sign(&signing_message(&inner, &input.uxid)?);
            sigs.push(TxSig {
                public_key: keypair.public_key_hex(),
                signature: hex::encode(signature),
            });
        }

        let spent = selected.into_iter().map(UxBalance::from).collect();
        let tx = Transaction {
            inputs,
            outputs,
            sigs,
            inner_hash: hex::encode(inner),
        };

        log::debug!(
            "Built transaction {} spending {} inputs from {}",
            tx.hash(),
            tx.inputs.len(),
            self.filename()
        );
        Ok((tx, spent))
    }
}
