//! Session context: client-durable identity storage with an explicit
//! lifecycle.
//!
//! Replaces ambient "local storage" access: components that need the signed-in
//! identity receive a `SessionContext`. It starts empty, is written once by a
//! successful onboarding submit, and is cleared on logout.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::onboarding::model::SessionIdentity;

/// Storage key holding the JSON-serialized identity.
pub const IDENTITY_KEY: &str = "user";

/// Name shown when no identity is stored.
pub const GUEST_NAME: &str = "Guest";

/// String key/value storage scoped to one client context.
#[async_trait]
pub trait IdentityStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Returns whether it existed.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;
}

/// In-memory storage. Lost when the process exits.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }
}

/// Storage persisted as a single JSON object file. Survives restarts.
pub struct FileStorage {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry. A missing, empty or unparseable file reads as empty,
    /// so the next write replaces it.
    async fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(HashMap::new()),
            Ok(text) => match serde_json::from_str(&text) {
                Ok(entries) => Ok(entries),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Session file unreadable, starting empty");
                    Ok(HashMap::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let text = serde_json::to_string_pretty(entries)?;
        // Readers never see a half-written file.
        let tmp = self.temp_path();
        fs::write(&tmp, text).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.read().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.write().await;
        let mut entries = self.read_all().await?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let _guard = self.lock.write().await;
        let mut entries = self.read_all().await?;
        let existed = entries.remove(key).is_some();
        if existed {
            self.write_all(&entries).await?;
        }
        Ok(existed)
    }
}

/// Handle to the signed-in identity, passed to whatever needs it.
#[derive(Clone)]
pub struct SessionContext {
    storage: Arc<dyn IdentityStorage>,
}

impl SessionContext {
    pub fn new(storage: Arc<dyn IdentityStorage>) -> Self {
        Self { storage }
    }

    /// An empty, process-local session.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Persist the identity returned by onboarding.
    pub async fn store_identity(&self, identity: &SessionIdentity) -> Result<(), StorageError> {
        let json = serde_json::to_string(identity)?;
        self.storage.set(IDENTITY_KEY, &json).await?;
        info!(user_id = %identity.id, "Session identity stored");
        Ok(())
    }

    /// The stored identity. Absent or unparseable values read as `None`.
    pub async fn identity(&self) -> Option<SessionIdentity> {
        let raw = match self.storage.get(IDENTITY_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read session identity");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!(error = %e, "Stored session identity is not valid JSON");
                None
            }
        }
    }

    /// Raw stored JSON, as downstream pages see it.
    pub async fn raw_identity(&self) -> Result<Option<String>, StorageError> {
        self.storage.get(IDENTITY_KEY).await
    }

    /// First name for greetings, or the generic placeholder.
    pub async fn greeting_name(&self) -> String {
        self.identity()
            .await
            .and_then(|i| i.first_name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| GUEST_NAME.to_string())
    }

    pub async fn is_signed_in(&self) -> bool {
        self.identity().await.is_some()
    }

    /// Clear the stored identity.
    pub async fn logout(&self) -> Result<(), StorageError> {
        if self.storage.remove(IDENTITY_KEY).await? {
            info!("Session identity cleared");
        } else {
            debug!("Logout with no stored identity");
        }
        Ok(())
    }
}
