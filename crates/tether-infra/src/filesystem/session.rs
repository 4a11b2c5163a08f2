//! JSON-file credential storage at `{data_dir}/session.json`.
//!
//! Writes go to a temporary sibling first and are renamed into place, so a
//! crash never leaves a half-written record. On unix the file is created
//! with mode 0600.

use std::path::{Path, PathBuf};

use tether_core::repository::CredentialStorage;
use tether_types::error::StorageError;
use tether_types::session::PersistedSession;

const SESSION_FILE: &str = "session.json";

/// Files written by earlier client versions; removed on clear.
const LEGACY_FILES: &[&str] = &["token", "auth.json", "user.json"];

#[derive(Debug, Clone)]
pub struct FileCredentialStorage {
    dir: PathBuf,
}

impl FileCredentialStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    async fn remove_if_present(path: &Path) -> Result<(), StorageError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(format!("failed to remove {}: {e}", path.display()))),
        }
    }
}

impl CredentialStorage for FileCredentialStorage {
    async fn load(&self) -> Result<Option<PersistedSession>, StorageError> {
        let path = self.path();
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::Io(format!("failed to read {}: {e}", path.display())));
            }
        };

        match serde_json::from_str::<PersistedSession>(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file {}: {e}", path.display());
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::Io(format!("failed to create {}: {e}", self.dir.display())))?;

        let json = serde_json::to_vec_pretty(session)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let path = self.path();
        let tmp = self.dir.join(format!("{SESSION_FILE}.tmp"));
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| StorageError::Io(format!("failed to write {}: {e}", tmp.display())))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| StorageError::Io(format!("failed to restrict {}: {e}", tmp.display())))?;
        }

        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::Io(format!("failed to replace {}: {e}", path.display())))?;
        Ok(())
    }

    /// Every file is attempted even when an earlier removal fails; the first
    /// failure is reported afterwards.
    async fn clear(&self) -> Result<(), StorageError> {
        let paths = std::iter::once(self.path())
            .chain(LEGACY_FILES.iter().map(|legacy| self.dir.join(legacy)));

        let mut first_error = None;
        for path in paths {
            if let Err(e) = Self::remove_if_present(&path).await {
                tracing::warn!(error = %e, "failed to remove stored credential file");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
