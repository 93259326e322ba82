//! Persistent single-slot credential store
//!
//! Holds the one current access credential for the process. The slot is
//! backed by a JSON file whose lifecycle spans restarts; writes use atomic
//! temp-file + rename to prevent corruption on crash, and the file is 0600
//! since it contains a bearer token. A tokio Mutex serializes access from
//! the request path and the refresh coordinator.
//!
//! An unreadable or corrupt backing file degrades to the absent state rather
//! than failing `open` — callers treat unavailable storage as "no credential".

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::credential::AccessCredential;
use crate::error::{Error, Result};

/// On-disk shape of the slot.
#[derive(Serialize, Deserialize)]
struct PersistedSlot {
    access: String,
}

/// Process-wide holder of the current access credential.
///
/// Written only by the refresh coordinator (on refresh success/failure) and
/// by login/logout collaborators; the request pipeline only reads it.
pub struct CredentialStore {
    path: Option<PathBuf>,
    slot: Mutex<Option<AccessCredential>>,
}

impl CredentialStore {
    /// Open a store backed by the given file path.
    ///
    /// A missing file means no credential yet (cold start). A file that
    /// cannot be read or parsed is treated the same way, with a warning —
    /// the next `set` will overwrite it.
    pub async fn open(path: PathBuf) -> Self {
        let slot = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<PersistedSlot>(&contents) {
                Ok(persisted) => {
                    debug!(path = %path.display(), "loaded persisted credential");
                    Some(AccessCredential::new(persisted.access))
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "credential file unreadable, starting absent");
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "credential storage unavailable, starting absent");
                None
            }
        };

        Self {
            path: Some(path),
            slot: Mutex::new(slot),
        }
    }

    /// Create a store with no backing file.
    ///
    /// Used in tests and in environments where persistent storage is
    /// disabled; behaves identically apart from not surviving restarts.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            slot: Mutex::new(None),
        }
    }

    /// Current credential, if any. Never fails.
    pub async fn get(&self) -> Option<AccessCredential> {
        self.slot.lock().await.clone()
    }

    /// Overwrite the slot and persist it.
    pub async fn set(&self, credential: AccessCredential) -> Result<()> {
        let mut slot = self.slot.lock().await;
        if let Some(path) = &self.path {
            write_atomic(path, credential.as_str()).await?;
        }
        *slot = Some(credential);
        debug!("credential stored");
        Ok(())
    }

    /// Remove the credential; subsequent `get` returns `None`.
    pub async fn clear(&self) -> Result<()> {
        let mut slot = self.slot.lock().await;
        *slot = None;
        if let Some(path) = &self.path {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(Error::Storage(format!("removing credential file: {e}")));
                }
            }
        }
        debug!("credential cleared");
        Ok(())
    }
}

/// Write the slot to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets 0600 permissions since the file contains a bearer token.
async fn write_atomic(path: &Path, access: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(&PersistedSlot {
        access: access.to_owned(),
    })
    .map_err(|e| Error::Storage(format!("serializing credential: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Storage("credential path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".credential.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Storage(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Storage(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Storage(format!("renaming temp credential file: {e}")))?;

    Ok(())
}
