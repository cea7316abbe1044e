// ── Credential management ──
//
// Owns the single bearer token of a session: where it is persisted, how
// it is (re)acquired, and how concurrent acquisitions collapse into one
// login call.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use voltwatch_api::{Credential, EnergyClient};

use crate::error::CoreError;

// ── Token stores ─────────────────────────────────────────────────

/// Persistence for the session token. Implementations hold at most one
/// credential.
pub trait TokenStore: Send + Sync + fmt::Debug {
    fn load(&self) -> Result<Option<Credential>, CoreError>;
    fn save(&self, credential: &Credential) -> Result<(), CoreError>;
    fn clear(&self) -> Result<(), CoreError>;
}

/// Process-local store; the token dies with the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<Credential>, CoreError> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, credential: &Credential) -> Result<(), CoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}

/// On-disk document: one token key plus its acquisition time.
#[derive(Serialize, Deserialize)]
struct StoredToken {
    jwt_token: String,
    acquired_at: DateTime<Utc>,
}

/// JSON file store so the token survives restarts.
///
/// A missing file means "no token". An unreadable or corrupt file is
/// logged and also treated as "no token"; the next save overwrites it.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_error(&self, action: &str, e: &std::io::Error) -> CoreError {
        CoreError::Storage {
            message: format!("failed to {action} {}: {e}", self.path.display()),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<Credential>, CoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.storage_error("read", &e)),
        };

        match serde_json::from_str::<StoredToken>(&contents) {
            Ok(stored) if !stored.jwt_token.is_empty() => Ok(Some(Credential {
                token: SecretString::from(stored.jwt_token),
                acquired_at: stored.acquired_at,
            })),
            Ok(_) => Ok(None),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring corrupt token file");
                Ok(None)
            }
        }
    }

    fn save(&self, credential: &Credential) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.storage_error("create directory for", &e))?;
        }
        let doc = StoredToken {
            jwt_token: credential.token.expose_secret().to_owned(),
            acquired_at: credential.acquired_at,
        };
        let json = serde_json::to_string_pretty(&doc).map_err(|e| CoreError::Storage {
            message: format!("failed to encode token: {e}"),
        })?;
        std::fs::write(&self.path, json).map_err(|e| self.storage_error("write", &e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| self.storage_error("restrict permissions on", &e))?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.storage_error("remove", &e)),
        }
    }
}

// ── CredentialManager ────────────────────────────────────────────

/// Loads, acquires and invalidates the session token.
///
/// `acquire` is single-flight: callers queue on an async mutex, and a
/// caller that waited while another one logged in reuses that result
/// instead of logging in again.
pub struct CredentialManager {
    client: EnergyClient,
    username: String,
    password: SecretString,
    store: Arc<dyn TokenStore>,
    login_lock: tokio::sync::Mutex<()>,
    /// Bumped after every successful login.
    generation: AtomicU64,
}

impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("username", &self.username)
            .field("store", &self.store)
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl CredentialManager {
    pub fn new(
        client: EnergyClient,
        username: String,
        password: SecretString,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            client,
            username,
            password,
            store,
            login_lock: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Persisted token, if any. No network.
    pub fn load(&self) -> Result<Option<Credential>, CoreError> {
        self.store.load()
    }

    /// Log in and persist the new token.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Credential, CoreError> {
        let seen = self.generation.load(Ordering::Acquire);
        let _guard = self.login_lock.lock().await;

        if self.generation.load(Ordering::Acquire) != seen {
            if let Some(credential) = self.store.load()? {
                debug!("reusing credential acquired while waiting");
                return Ok(credential);
            }
        }

        debug!(username = %self.username, "acquiring credential");
        let credential = self.client.login(&self.username, &self.password, cancel).await?;
        self.store.save(&credential)?;
        self.generation.fetch_add(1, Ordering::AcqRel);
        info!("authenticated as {}", self.username);
        Ok(credential)
    }

    /// Persisted token, or a fresh one.
    pub async fn ensure(&self, cancel: &CancellationToken) -> Result<Credential, CoreError> {
        match self.load()? {
            Some(credential) => Ok(credential),
            None => self.acquire(cancel).await,
        }
    }

    /// Forget the persisted token.
    pub fn invalidate(&self) -> Result<(), CoreError> {
        debug!("invalidating credential");
        self.store.clear()
    }

    /// Forget the persisted token only if it is still `rejected`; a token
    /// already replaced by a concurrent re-login is kept.
    pub fn invalidate_rejected(&self, rejected: &Credential) -> Result<(), CoreError> {
        match self.store.load()? {
            Some(current) if current.token.expose_secret() != rejected.token.expose_secret() => {
                debug!("rejected token already replaced");
                Ok(())
            }
            _ => self.invalidate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryTokenStore::new();
        assert!(store.load().expect("load").is_none());
        store.save(&Credential::new("abc")).expect("save");
        let loaded = store.load().expect("load").expect("present");
        assert_eq!(loaded.token.expose_secret(), "abc");
        store.clear().expect("clear");
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("token.json");

        FileTokenStore::new(&path).save(&Credential::new("jwt-1")).expect("save");
        let loaded = FileTokenStore::new(&path).load().expect("load").expect("present");
        assert_eq!(loaded.token.expose_secret(), "jwt-1");

        let raw = std::fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\"jwt_token\""));
    }

    #[test]
    fn corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{not json").expect("write");
        assert!(FileTokenStore::new(&path).load().expect("load").is_none());
    }

    #[test]
    fn clearing_missing_file_is_fine() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path().join("absent.json"));
        store.clear().expect("clear");
        assert!(store.load().expect("load").is_none());
    }
}
