//! Wallet addresses
//!
//! An address is `prefix || hex(body) || hex(checksum)` where the body is the
//! first 20 bytes of a coin-specific hash of the ed25519 public key and the
//! checksum is the first 4 bytes of `SHA256(prefix || body)`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sha3::Sha3_256;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const BODY_LEN: usize = 20;
const CHECKSUM_LEN: usize = 4;
const PREFIX_LEN: usize = 3;
const ADDRESS_LEN: usize = PREFIX_LEN + 2 * (BODY_LEN + CHECKSUM_LEN);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid length {0}")]
    InvalidLength(usize),

    #[error("unknown address prefix {0:?}")]
    UnknownPrefix(String),

    #[error("address is not valid hex")]
    InvalidHex,

    #[error("address checksum mismatch")]
    BadChecksum,

    #[error("invalid public key")]
    InvalidPublicKey,
}

/// Coin a wallet generates addresses for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinType {
    #[default]
    Skycoin,
    Bitcoin,
}

impl CoinType {
    fn prefix(&self) -> &'static str {
        match self {
            CoinType::Skycoin => "SKY",
            CoinType::Bitcoin => "BTC",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "SKY" => Some(CoinType::Skycoin),
            "BTC" => Some(CoinType::Bitcoin),
            _ => None,
        }
    }

    fn body(&self, public_key: &[u8]) -> [u8; BODY_LEN] {
        let digest: [u8; 32] = match self {
            CoinType::Skycoin => Sha256::digest(public_key).into(),
            CoinType::Bitcoin => Sha3_256::digest(public_key).into(),
        };
        let mut body = [0u8; BODY_LEN];
        body.copy_from_slice(&digest[..BODY_LEN]);
        body
    }
}

impl fmt::Display for CoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinType::Skycoin => f.write_str("skycoin"),
            CoinType::Bitcoin => f.write_str("bitcoin"),
        }
    }
}

fn checksum(prefix: &str, body: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(body);
    let digest = hasher.finalize();
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

/// A validated address string
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Build the address of a public key for the given coin
    pub fn from_public_key(public_key: &[u8; 32], coin: CoinType) -> Self {
        let prefix = coin.prefix();
        let body = coin.body(public_key);
        let sum = checksum(prefix, &body);
        Address(format!("{}{}{}", prefix, hex::encode(body), hex::encode(sum)))
    }

    /// Build the address of a hex encoded public key
    pub fn from_public_key_hex(public_key: &str, coin: CoinType) -> Result<Self, AddressError> {
        let bytes = hex::decode(public_key).map_err(|_| AddressError::InvalidPublicKey)?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidPublicKey)?;
        Ok(Self::from_public_key(&key, coin))
    }

    pub fn coin_type(&self) -> CoinType {
        // Only constructed through validated paths, so the prefix is known
        CoinType::from_prefix(&self.0[..PREFIX_LEN]).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ADDRESS_LEN || !s.is_ascii() {
            return Err(AddressError::InvalidLength(s.len()));
        }

        let (prefix, rest) = s.split_at(PREFIX_LEN);
        if CoinType::from_prefix(prefix).is_none() {
            return Err(AddressError::UnknownPrefix(prefix.to_string()));
        }

        let raw = hex::decode(rest).map_err(|_| AddressError::InvalidHex)?;
        let (body, sum) = raw.split_at(BODY_LEN);
        if checksum(prefix, body)[..] != sum[..] {
            return Err(AddressError::BadChecksum);
        }

        // Normalise hex case so equal addresses compare equal
        Ok(Address(format!("{}{}", prefix, hex::encode(raw))))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
