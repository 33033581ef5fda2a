//! Wallet error types

use crate::address::AddressError;
use seedvault_crypto::CryptoError;
use seedvault_storage::StorageError;
use std::fmt;
use thiserror::Error;

/// Coarse classification of every [`WalletError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FeatureDisabled,
    NotFound,
    AlreadyInState,
    AuthenticationFailure,
    Validation,
    SeedConflict,
    RecoveryMismatch,
    NotDeterministic,
    Persistence,
    StartupIntegrity,
}

/// Service features that can be switched off in the config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    WalletApi,
    SeedApi,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::WalletApi => f.write_str("wallet API"),
            Feature::SeedApi => f.write_str("wallet seed API"),
        }
    }
}

/// Encryption state a wallet was unexpectedly found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletState {
    Encrypted,
    NotEncrypted,
}

impl fmt::Display for WalletState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletState::Encrypted => f.write_str("wallet is encrypted"),
            WalletState::NotEncrypted => f.write_str("wallet is not encrypted"),
        }
    }
}

/// Problems found while loading the wallet directory at startup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("duplicate wallet found with initial address {address} in file {wallet_id:?} (already used by {existing_id:?})")]
    Duplicate {
        address: String,
        wallet_id: String,
        existing_id: String,
    },

    #[error("empty wallet file found: {0:?}")]
    Empty(String),

    #[error("invalid wallet file {wallet_id:?}: {reason}")]
    Invalid { wallet_id: String, reason: String },
}

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("{0} is disabled")]
    FeatureDisabled(Feature),

    #[error("Wallet does not exist: {0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyInState(WalletState),

    #[error("Invalid password")]
    AuthenticationFailure,

    #[error("Missing password")]
    MissingPassword,

    #[error("Wallet is not encrypted, a password must not be provided")]
    PasswordNotExpected,

    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Balance oracle error: {0}")]
    BalanceOracle(String),

    #[error("Seed already used by wallet {0:?}")]
    SeedConflict(String),

    #[error("Seed does not match the wallet's first address")]
    RecoveryMismatch,

    #[error("Wallet {0:?} is not deterministic")]
    NotDeterministic(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),

    #[error("Startup integrity check failed: {0}")]
    StartupIntegrity(#[from] IntegrityError),
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::FeatureDisabled(_) => ErrorKind::FeatureDisabled,
            WalletError::NotFound(_) => ErrorKind::NotFound,
            WalletError::AlreadyInState(_) => ErrorKind::AlreadyInState,
            WalletError::AuthenticationFailure => ErrorKind::AuthenticationFailure,
            WalletError::MissingPassword
            | WalletError::PasswordNotExpected
            | WalletError::InsufficientFunds { .. }
            | WalletError::InvalidAddress(_)
            | WalletError::Validation(_)
            | WalletError::BalanceOracle(_) => ErrorKind::Validation,
            WalletError::SeedConflict(_) => ErrorKind::SeedConflict,
            WalletError::RecoveryMismatch => ErrorKind::RecoveryMismatch,
            WalletError::NotDeterministic(_) => ErrorKind::NotDeterministic,
            WalletError::Persistence(_) => ErrorKind::Persistence,
            WalletError::StartupIntegrity(_) => ErrorKind::StartupIntegrity,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        WalletError::Validation(msg.into())
    }
}

impl From<CryptoError> for WalletError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidPassword => WalletError::AuthenticationFailure,
            CryptoError::MissingPassword => WalletError::MissingPassword,
            other => WalletError::Validation(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;
