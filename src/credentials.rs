// src/credentials.rs
//! Local storage for the user's API key.
//!
//! The chat session only ever calls [`CredentialStore::get`]; writes happen
//! through [`register_api_key`] after the backend has accepted the key.

use crate::summarizer_client::SummarizationService;
use crate::utils::lock;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Slot the API key lives under
pub const API_KEY_SLOT: &str = "openai_api_key";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Credential file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Credential file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), CredentialError>;
}

/// Process-local store, nothing survives a restart
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(api_key: &str) -> Self {
        let store = Self::new();
        lock(&store.values).insert(API_KEY_SLOT.to_string(), api_key.to_string());
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk, `{ "openai_api_key": "..." }`
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    cache: Mutex<HashMap<String, String>>,
}

impl FileCredentialStore {
    /// Open (or lazily create) the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let path = path.into();
        let cache = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => HashMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!("Opened credential store at {} ({} entries)", path.display(), cache.len());
        Ok(Self { path, cache: Mutex::new(cache) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Write to a sibling file first so a crash never leaves half a JSON document
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(values)?;

        // Mode only applies on creation, so clear any leftover from an earlier crash
        match std::fs::remove_file(&tmp) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }

        let mut file = Self::owner_only_options().open(&tmp)?;
        file.write_all(&body)?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    #[cfg(unix)]
    fn owner_only_options() -> OpenOptions {
        use std::os::unix::fs::OpenOptionsExt;

        let mut options = OpenOptions::new();
        options.write(true).create_new(true).mode(0o600);
        options
    }

    #[cfg(not(unix))]
    fn owner_only_options() -> OpenOptions {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        options
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.cache).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        let mut values = lock(&self.cache);
        let previous = values.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&values) {
            match previous {
                Some(old) => values.insert(key.to_string(), old),
                None => values.remove(key),
            };
            return Err(e);
        }
        tracing::info!("Stored credential '{}' in {}", key, self.path.display());
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Please enter an API key")]
    EmptyKey,
    #[error("Invalid API key")]
    Rejected,
    #[error("Failed to validate API key")]
    ValidationFailed(#[source] crate::summarizer_client::ClientError),
    #[error("Failed to save API key: {0}")]
    Storage(#[from] CredentialError),
}

/// Validate `api_key` with the backend and store it on success.
///
/// The key is stored exactly as typed; only the emptiness check trims.
pub async fn register_api_key(
    service: &dyn SummarizationService,
    store: &dyn CredentialStore,
    api_key: &str,
) -> Result<(), RegistrationError> {
    if api_key.trim().is_empty() {
        return Err(RegistrationError::EmptyKey);
    }

    let valid = service
        .validate_api_key(api_key)
        .await
        .map_err(RegistrationError::ValidationFailed)?;

    if !valid {
        tracing::warn!("Backend rejected the supplied API key");
        return Err(RegistrationError::Rejected);
    }

    store.set(API_KEY_SLOT, api_key)?;
    tracing::info!("API key saved successfully");
    Ok(())
}
