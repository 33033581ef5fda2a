//! Seedvault Storage Layer - One File Per Record
//!
//! Designed for wallet files:
//! - Each record lives in its own JSON file inside one directory
//! - Saves go to a temporary file which is then renamed over the target,
//!   so the previous durable version survives a crash mid-write
//! - Leftover `.tmp` / `.bak` files from interrupted saves are swept on startup

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions of files left behind by an interrupted save
const STRAY_EXTENSIONS: [&str; 2] = ["tmp", "bak"];

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error in {name}: {reason}")]
    Serialization { name: String, reason: String },

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid file name: {0:?}")]
    InvalidName(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Directory of individually saved records
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    /// Open storage directory, creating it with owner-only permissions
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data_dir = path.as_ref().to_path_buf();

        if !data_dir.exists() {
            let mut builder = fs::DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                builder.mode(0o700); // rwx------
            }
            builder.create(&data_dir)?;
            log::debug!("Created storage directory {}", data_dir.display());
        }

        Ok(Self { data_dir })
    }

    /// Atomically write `data` as JSON to `name`
    pub fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let target = self.path_for(name)?;
        let tmp = self.data_dir.join(format!("{}.tmp", name));

        let json = serde_json::to_vec_pretty(data).map_err(|e| StorageError::Serialization {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        if let Err(e) = write_synced(&tmp, &json).and_then(|_| fs::rename(&tmp, &target)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        // Persist the rename itself
        #[cfg(unix)]
        {
            if let Ok(dir) = fs::File::open(&self.data_dir) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }

    /// Load and deserialize a single file
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(StorageError::NotFound(name.to_string()));
        }

        let data = fs::read(&path)?;
        serde_json::from_slice(&data).map_err(|e| StorageError::Serialization {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// List file names with the given extension, sorted
    pub fn list(&self, extension: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(extension) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Delete files left by interrupted saves; returns the removed names
    pub fn remove_stray_files(&self) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for ext in STRAY_EXTENSIONS {
            for name in self.list(ext)? {
                fs::remove_file(self.data_dir.join(&name))?;
                log::warn!("Removed stray file {} from {}", name, self.data_dir.display());
                removed.push(name);
            }
        }
        Ok(removed)
    }

    /// Check if file exists
    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).map(|p| p.exists()).unwrap_or(false)
    }

    /// Get storage directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let plain = Path::new(name)
            .file_name()
            .map(|n| n == name)
            .unwrap_or(false);
        if name.is_empty() || !plain {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.data_dir.join(name))
    }
}

fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(data)?;
    file.sync_all()?;

    // On Unix, set restrictive permissions (owner read/write only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
