//! API key storage
//!
//! The store is a plain get/set slot for one opaque credential. It does no
//! validation of its own; user input goes through [`Credential::parse`]
//! before it is stored.

use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

// Distinguishes temporary files of writes that overlap in time
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Key under which [`FileCredentialStore`] keeps the API key
pub const API_KEY_FIELD: &str = "torboxApiKey";

/// Opaque Torbox API key
///
/// `Debug` output never contains the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a key as-is
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Parse user input: surrounding whitespace is removed and an empty key
    /// is rejected
    pub fn parse(input: &str) -> Result<Self> {
        let key = input.trim();
        if key.is_empty() {
            return Err(Error::Config {
                message: "API key must not be empty".to_string(),
                key: Some(API_KEY_FIELD.to_string()),
            });
        }
        Ok(Self(key.to_string()))
    }

    /// The raw key, for placing in request headers or query parameters
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Storage slot for the API credential
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Current credential, if one has been stored
    async fn get(&self) -> Result<Option<Credential>>;

    /// Replace the stored credential
    async fn set(&self, credential: Credential) -> Result<()>;
}

/// Credential store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a credential
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: RwLock::new(Some(credential)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self) -> Result<Option<Credential>> {
        Ok(self.slot.read().await.clone())
    }

    async fn set(&self, credential: Credential) -> Result<()> {
        *self.slot.write().await = Some(credential);
        Ok(())
    }
}

/// Credential store backed by a JSON object on disk
///
/// The key is kept under [`API_KEY_FIELD`]; other fields in the file are
/// preserved on write. Writes through one store (and its clones) are
/// serialised.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileCredentialStore {
    /// Use (and, on first `set`, create) the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "credentials".to_string());
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        self.path
            .with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), seq))
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_object(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(serde_json::Map::new());
            }
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::Map::new());
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self) -> Result<Option<Credential>> {
        let object = self.read_object().await?;
        Ok(object
            .get(API_KEY_FIELD)
            .and_then(|value| value.as_str())
            .filter(|key| !key.is_empty())
            .map(Credential::new))
    }

    async fn set(&self, credential: Credential) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut object = self.read_object().await?;
        object.insert(
            API_KEY_FIELD.to_string(),
            serde_json::Value::String(credential.0),
        );

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write to a sibling file first so a crash never leaves a truncated store
        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, serde_json::to_vec_pretty(&object)?).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            tokio::fs::remove_file(&tmp_path).await.ok();
            return Err(e.into());
        }

        tracing::debug!(path = %self.path.display(), "stored API key");
        Ok(())
    }
}

/// Build the credential store selected by `config.credentials_path`
pub fn store_from_config(config: &Config) -> Arc<dyn CredentialStore> {
    match &config.credentials_path {
        Some(path) => Arc::new(FileCredentialStore::new(path.clone())),
        None => Arc::new(MemoryCredentialStore::new()),
    }
}
