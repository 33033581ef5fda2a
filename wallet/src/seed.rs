//! BIP-39 seed generation and checking
//!
//! Wallet seeds are arbitrary strings; new seeds are generated as English
//! BIP-39 mnemonics, and `verify_seed` reports seeds that are not standard
//! mnemonics so front ends can warn about them.

use crate::error::{Result, WalletError};
use bip39::{Language, Mnemonic};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeedError {
    #[error("seed is empty")]
    Empty,

    #[error("seed is not a standard BIP-39 mnemonic: {0}")]
    NonStandard(String),
}

/// Generate a new random mnemonic seed with the given entropy.
///
/// 128 bits of entropy gives 12 words and 256 bits gives 24 words; 160, 192
/// and 224 bits are accepted for 15, 18 and 21 words.
///
/// # Example
/// ```
/// use seedvault_wallet::seed::new_seed;
///
/// let seed = new_seed(128).unwrap();
/// assert_eq!(seed.split_whitespace().count(), 12);
/// ```
pub fn new_seed(entropy_bits: usize) -> Result<String> {
    let word_count = match entropy_bits {
        128 => 12,
        160 => 15,
        192 => 18,
        224 => 21,
        256 => 24,
        other => {
            return Err(WalletError::validation(format!(
                "entropy must be 128, 160, 192, 224 or 256 bits, got {}",
                other
            )))
        }
    };

    let mnemonic =
        Mnemonic::generate(word_count).map_err(|e| WalletError::validation(e.to_string()))?;
    Ok(mnemonic.to_string())
}

/// Check that a seed is a standard English BIP-39 mnemonic
pub fn verify_seed(seed: &str) -> std::result::Result<(), SeedError> {
    if seed.trim().is_empty() {
        return Err(SeedError::Empty);
    }

    Mnemonic::parse_in(Language::English, seed)
        .map_err(|e| SeedError::NonStandard(e.to_string()))?;
    Ok(())
}
