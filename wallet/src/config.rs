use seedvault_crypto::CryptoType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Wallet service settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    #[serde(default = "default_wallet_dir")]
    pub wallet_dir: PathBuf,

    /// Scheme used when a wallet is encrypted through the service
    #[serde(default)]
    pub crypto_type: CryptoType,

    #[serde(default = "default_true")]
    pub enable_wallet_api: bool,

    #[serde(default)]
    pub enable_seed_api: bool,
}

fn default_wallet_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("seedvault"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wallets")
}

fn default_true() -> bool {
    true
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            wallet_dir: default_wallet_dir(),
            crypto_type: CryptoType::default(),
            enable_wallet_api: default_true(),
            enable_seed_api: false,
        }
    }
}

impl ServiceConfig {
    /// Config for a wallet directory, other settings at their defaults
    pub fn with_wallet_dir<P: AsRef<Path>>(wallet_dir: P) -> Self {
        ServiceConfig {
            wallet_dir: wallet_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
