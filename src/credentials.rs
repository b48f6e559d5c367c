//! Credential storage.
//!
//! The session reads the API key through [`CredentialProvider`] on every
//! request. Two providers ship with the crate: an in-memory map and a YAML file
//! that persists values between runs.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::{Error, Result};

/// Storage key of the API key.
pub const API_KEY_STORAGE_KEY: &str = "customAPIKey";

/// Value used when no API key has been stored.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_DEFAULT_API_KEY";

/// A string-valued key-value store for secrets.
pub trait CredentialProvider: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Returns the stored API key, or the placeholder when unset or empty.
    fn api_key(&self) -> String {
        self.get(API_KEY_STORAGE_KEY)
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| PLACEHOLDER_API_KEY.to_string())
    }
}

/// Credentials held in memory for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryCredentials {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider holding just an API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        let mut values = BTreeMap::new();
        values.insert(API_KEY_STORAGE_KEY.to_string(), api_key.into());
        Self {
            values: RwLock::new(values),
        }
    }
}

impl CredentialProvider for MemoryCredentials {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Credentials persisted as a YAML mapping in a file.
///
/// The file is read on every `get`, so edits made by other processes are seen
/// by the next request.
#[derive(Debug)]
pub struct FileCredentials {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileCredentials {
    /// Create a provider backed by `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    /// The platform default location, `<config dir>/quickgroq/credentials.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("quickgroq").join("credentials.yaml"))
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(Error::io(
                    format!("failed to read {}", self.path.display()),
                    err,
                ));
            }
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    fn store(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| {
                Error::io(format!("failed to create {}", parent.display()), err)
            })?;
        }
        let content = serde_yaml::to_string(values)?;
        fs::write(&self.path, content)
            .map_err(|err| Error::io(format!("failed to write {}", self.path.display()), err))
    }
}

impl CredentialProvider for FileCredentials {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        match self.load() {
            Ok(values) => values.get(key).cloned(),
            Err(err) => {
                tracing::warn!("could not read credentials: {err}");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());
        self.store(&values)
    }
}
