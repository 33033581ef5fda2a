//! Wallet encryption schemes
//!
//! Two schemes are supported, selected per wallet:
//!
//! - `argon2-aes256gcm`: the password is stretched with Argon2id and the data is
//!   sealed with AES-256-GCM. Used for all new wallets.
//! - `sha256-xor`: a SHA-256 keystream XORed over the data with a plaintext
//!   checksum. Kept so older wallet files can still be opened.

use crate::{hash_sha256, CryptoError, Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

const AEAD_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const AEAD_HEADER_LEN: usize = 1 + 12 + SALT_LEN + NONCE_LEN;
/// Header KDF parameters may be at most this multiple of the defaults
const KDF_MAX_FACTOR: u32 = 4;

const XOR_BLOCK: usize = 32;
const XOR_CHECKSUM_LEN: usize = 32;
const XOR_NONCE_LEN: usize = 32;
const XOR_LENGTH_PREFIX: usize = 4;

/// Encryption scheme recorded on each wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CryptoType {
    #[serde(rename = "argon2-aes256gcm")]
    Argon2Aes256Gcm,
    #[serde(rename = "sha256-xor")]
    Sha256Xor,
}

impl CryptoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CryptoType::Argon2Aes256Gcm => "argon2-aes256gcm",
            CryptoType::Sha256Xor => "sha256-xor",
        }
    }

    /// Encrypt `data` with a key derived from `password`
    pub fn encrypt(&self, data: &[u8], password: &[u8]) -> Result<Vec<u8>> {
        if password.is_empty() {
            return Err(CryptoError::MissingPassword);
        }

        match self {
            CryptoType::Argon2Aes256Gcm => aead_encrypt(data, password, &KdfParams::default()),
            CryptoType::Sha256Xor => Ok(xor_encrypt(data, password)),
        }
    }

    /// Decrypt a blob produced by [`CryptoType::encrypt`] with the same scheme.
    ///
    /// A wrong password is reported as [`CryptoError::InvalidPassword`].
    pub fn decrypt(&self, blob: &[u8], password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if password.is_empty() {
            return Err(CryptoError::MissingPassword);
        }

        match self {
            CryptoType::Argon2Aes256Gcm => aead_decrypt(blob, password),
            CryptoType::Sha256Xor => xor_decrypt(blob, password),
        }
    }
}

impl Default for CryptoType {
    fn default() -> Self {
        CryptoType::Argon2Aes256Gcm
    }
}

impl fmt::Display for CryptoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CryptoType {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2-aes256gcm" => Ok(CryptoType::Argon2Aes256Gcm),
            "sha256-xor" => Ok(CryptoType::Sha256Xor),
            other => Err(CryptoError::UnknownCryptoType(other.to_string())),
        }
    }
}

/// Argon2id cost parameters, stored in the blob header so that decryption
/// keeps working if the defaults change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KdfParams {
    m_cost: u32,
    t_cost: u32,
    p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: Params::DEFAULT_M_COST,
            t_cost: Params::DEFAULT_T_COST,
            p_cost: Params::DEFAULT_P_COST,
        }
    }
}

impl KdfParams {
    fn within_bounds(&self) -> bool {
        let max = Self::default();
        self.m_cost <= max.m_cost.saturating_mul(KDF_MAX_FACTOR)
            && self.t_cost <= max.t_cost.saturating_mul(KDF_MAX_FACTOR)
            && self.p_cost <= max.p_cost.saturating_mul(KDF_MAX_FACTOR)
    }
}

fn derive_key(password: &[u8], salt: &[u8], kdf: &KdfParams) -> Result<Zeroizing<[u8; 32]>> {
    let params = Params::new(kdf.m_cost, kdf.t_cost, kdf.p_cost, Some(32))
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(password, salt, &mut key[..])
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

fn aead_encrypt(data: &[u8], password: &[u8], kdf: &KdfParams) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(password, &salt, kdf)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| CryptoError::EncryptionFailed)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), data)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut blob = Vec::with_capacity(AEAD_HEADER_LEN + ciphertext.len());
    blob.push(AEAD_VERSION);
    blob.extend_from_slice(&kdf.m_cost.to_le_bytes());
    blob.extend_from_slice(&kdf.t_cost.to_le_bytes());
    blob.extend_from_slice(&kdf.p_cost.to_le_bytes());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

fn aead_decrypt(blob: &[u8], password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if blob.len() < AEAD_HEADER_LEN {
        return Err(CryptoError::InvalidBlob(format!(
            "expected at least {} bytes, got {}",
            AEAD_HEADER_LEN,
            blob.len()
        )));
    }
    if blob[0] != AEAD_VERSION {
        return Err(CryptoError::InvalidBlob(format!(
            "unsupported version {}",
            blob[0]
        )));
    }

    let read_u32 = |at: usize| {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&blob[at..at + 4]);
        u32::from_le_bytes(buf)
    };
    let kdf = KdfParams {
        m_cost: read_u32(1),
        t_cost: read_u32(5),
        p_cost: read_u32(9),
    };
    if !kdf.within_bounds() {
        return Err(CryptoError::InvalidBlob(format!(
            "KDF parameters out of range: {:?}",
            kdf
        )));
    }
    let salt = &blob[13..13 + SALT_LEN];
    let nonce = &blob[13 + SALT_LEN..AEAD_HEADER_LEN];
    let ciphertext = &blob[AEAD_HEADER_LEN..];

    let key = derive_key(password, salt, &kdf)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| CryptoError::EncryptionFailed)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::InvalidPassword)?;

    Ok(Zeroizing::new(plaintext))
}

/// Keystream block `index` for the legacy scheme
fn xor_block_key(password_hash: &[u8; 32], nonce: &[u8], index: u64) -> Zeroizing<[u8; 32]> {
    let mut nonce_hasher = Sha256::new();
    nonce_hasher.update(nonce);
    nonce_hasher.update(index.to_le_bytes());
    let nonce_hash: [u8; 32] = nonce_hasher.finalize().into();

    let mut hasher = Sha256::new();
    hasher.update(password_hash);
    hasher.update(nonce_hash);
    Zeroizing::new(hasher.finalize().into())
}

fn xor_checksum(nonce: &[u8], plain: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(nonce);
    hasher.update(plain);
    hasher.finalize().into()
}

fn xor_apply(buf: &mut [u8], password: &[u8], nonce: &[u8]) {
    let password_hash = Zeroizing::new(hash_sha256(password));
    for (i, block) in buf.chunks_mut(XOR_BLOCK).enumerate() {
        let key = xor_block_key(&password_hash, nonce, i as u64);
        for (b, k) in block.iter_mut().zip(key.iter()) {
            *b ^= k;
        }
    }
}

fn xor_encrypt(data: &[u8], password: &[u8]) -> Vec<u8> {
    // length prefix + data, zero-padded to whole blocks
    let mut plain = Zeroizing::new(Vec::with_capacity(XOR_LENGTH_PREFIX + data.len() + XOR_BLOCK));
    plain.extend_from_slice(&(data.len() as u32).to_le_bytes());
    plain.extend_from_slice(data);
    let padded_len = plain.len().div_ceil(XOR_BLOCK) * XOR_BLOCK;
    plain.resize(padded_len, 0);

    let mut nonce = [0u8; XOR_NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    let checksum = xor_checksum(&nonce, &plain);

    let mut blocks = plain.to_vec();
    xor_apply(&mut blocks, password, &nonce);

    let mut blob = Vec::with_capacity(XOR_CHECKSUM_LEN + XOR_NONCE_LEN + blocks.len());
    blob.extend_from_slice(&checksum);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&blocks);
    blob
}

fn xor_decrypt(blob: &[u8], password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let header = XOR_CHECKSUM_LEN + XOR_NONCE_LEN;
    if blob.len() < header + XOR_BLOCK || (blob.len() - header) % XOR_BLOCK != 0 {
        return Err(CryptoError::InvalidBlob(format!(
            "invalid legacy blob length {}",
            blob.len()
        )));
    }

    let checksum = &blob[..XOR_CHECKSUM_LEN];
    let nonce = &blob[XOR_CHECKSUM_LEN..header];

    let mut plain = Zeroizing::new(blob[header..].to_vec());
    xor_apply(&mut plain, password, nonce);

    if xor_checksum(nonce, &plain)[..] != checksum[..] {
        return Err(CryptoError::InvalidPassword);
    }

    let mut len_bytes = [0u8; XOR_LENGTH_PREFIX];
    len_bytes.copy_from_slice(&plain[..XOR_LENGTH_PREFIX]);
    let len = u32::from_le_bytes(len_bytes) as usize;
    let body = &plain[XOR_LENGTH_PREFIX..];
    if len > body.len() || body[len..].iter().any(|b| *b != 0) {
        return Err(CryptoError::InvalidBlob("bad length prefix or padding".to_string()));
    }

    Ok(Zeroizing::new(body[..len].to_vec()))
}
