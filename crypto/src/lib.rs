//! Seedvault Cryptography
//!
//! Deterministic key derivation, signatures and the wallet encryption schemes.
//! Everything here is a pure function of its inputs; no state is shared.

pub mod encryption;

pub use encryption::CryptoType;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Domain separator mixed into every derived key
const DERIVE_TAG: &[u8] = b"seedvault/derive";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid private key")]
    InvalidPrivateKey,

    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    #[error("Password is required")]
    MissingPassword,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Malformed encrypted data: {0}")]
    InvalidBlob(String),

    #[error("Unknown crypto type: {0}")]
    UnknownCryptoType(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed")]
    EncryptionFailed,
}

pub type Result<T> = std::result::Result<T, CryptoError>;

/// Key pair for signing transactions
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Derive the key pair at `index` from a wallet seed.
    ///
    /// The secret key is `HMAC-SHA256(seed, DERIVE_TAG || index_be)`, so the
    /// same `(seed, index)` always yields the same key pair.
    pub fn derive(seed: &[u8], index: u32) -> Result<Self> {
        if seed.is_empty() {
            return Err(CryptoError::InvalidSeed("seed is empty".to_string()));
        }

        let mut mac = <HmacSha256 as Mac>::new_from_slice(seed)
            .map_err(|e| CryptoError::InvalidSeed(e.to_string()))?;
        mac.update(DERIVE_TAG);
        mac.update(&index.to_be_bytes());
        let mut key_bytes: [u8; 32] = mac.finalize().into_bytes().into();

        let signing_key = SigningKey::from_bytes(&key_bytes);
        zeroize::Zeroize::zeroize(&mut key_bytes);
        let verifying_key = signing_key.verifying_key();

        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    /// Get public key bytes
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Get public key as hex string
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key.as_bytes())
    }

    /// Get private key as hex string
    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Create keypair from private key hex
    pub fn from_secret_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str).map_err(|_| CryptoError::InvalidPrivateKey)?;

        let mut key_bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidPrivateKey)?;

        let signing_key = SigningKey::from_bytes(&key_bytes);
        zeroize::Zeroize::zeroize(&mut key_bytes);
        let verifying_key = signing_key.verifying_key();

        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    /// Sign message
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Verify signature
    pub fn verify(public_key_hex: &str, message: &[u8], signature_bytes: &[u8]) -> Result<()> {
        let pub_key_bytes = hex::decode(public_key_hex).map_err(|_| CryptoError::InvalidPublicKey)?;

        let pub_key_array: [u8; 32] = pub_key_bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey)?;

        let verifying_key =
            VerifyingKey::from_bytes(&pub_key_array).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig_array: [u8; 64] = signature_bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignature)?;

        let signature = Signature::from_bytes(&sig_array);

        verifying_key
            .verify(message, &signature)
            .map_err(|_| CryptoError::InvalidSignature)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// Hash data with SHA256
pub fn hash_sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash data and return as hex string
pub fn hash_sha256_hex(data: &[u8]) -> String {
    hex::encode(hash_sha256(data))
}
