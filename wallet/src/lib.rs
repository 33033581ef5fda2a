//! Seedvault Wallet Module
//!
//! Deterministic wallets with:
//! - Seed-derived address sets, extended by scan-ahead against a balance oracle
//! - Encryption at rest with closure-scoped decryption (`guard_view` / `guard_update`)
//! - Deterministic transaction building and signing
//! - A lock-guarded service that saves every change before publishing it
//! - BIP-39 seed generation

pub mod address;
pub mod config;
pub mod error;
pub mod guard;
pub mod scanner;
pub mod seed;
pub mod service;
pub mod transaction;
pub mod wallet;

pub use address::{Address, AddressError, CoinType};
pub use config::{ConfigError, ServiceConfig};
pub use error::{ErrorKind, Feature, IntegrityError, Result, WalletError, WalletState};
pub use scanner::{Balance, BalanceGetter, BalancePair, OracleError};
pub use seed::{new_seed, verify_seed, SeedError};
pub use seedvault_crypto::CryptoType;
pub use service::Service;
pub use transaction::{
    AddressUxOuts, CreateTransactionParams, Receiver, SpendPolicy, Transaction, TxInput, TxOutput,
    TxSig, UxBalance, UxOut, WalletParams,
};
pub use wallet::{Entry, Meta, Options, ReadableWallet, Secret, Wallet, WalletType};
