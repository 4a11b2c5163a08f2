//! OS keychain adapter for credential storage.
//!
//! Uses the `keyring` crate to store the session record via:
//! - macOS Keychain
//! - Linux Secret Service (GNOME Keyring, KDE Wallet)
//! - Windows Credential Manager
//!
//! The whole `PersistedSession` is stored as one JSON secret under the
//! `session` account. Clearing also deletes the accounts older clients used.

use tether_core::repository::CredentialStorage;
use tether_types::error::StorageError;
use tether_types::session::PersistedSession;

const SESSION_ACCOUNT: &str = "session";

/// Accounts written by earlier client versions; deleted on clear.
const LEGACY_ACCOUNTS: &[&str] = &["access_token", "auth_token", "user"];

/// OS keychain credential storage using the `keyring` crate.
pub struct KeychainCredentialStorage {
    service_name: String,
}

impl KeychainCredentialStorage {
    /// Create a storage with the default service name "tether".
    pub fn new() -> Self {
        Self {
            service_name: "tether".to_string(),
        }
    }

    /// Create a storage with a custom service name (useful for testing).
    pub fn with_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn entry(&self, account: &str) -> Result<keyring::Entry, StorageError> {
        keyring::Entry::new(&self.service_name, account)
            .map_err(|e| StorageError::Keychain(format!("keychain entry error: {e}")))
    }

    fn delete(&self, account: &str) -> Result<(), StorageError> {
        match self.entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StorageError::Keychain(format!("keychain delete error: {e}"))),
        }
    }
}

/// Run `delete` for every account, even after a failure, and report the
/// first failure at the end.
fn delete_each<'a>(
    accounts: impl IntoIterator<Item = &'a str>,
    mut delete: impl FnMut(&str) -> Result<(), StorageError>,
) -> Result<(), StorageError> {
    let mut first_error = None;
    for account in accounts {
        if let Err(e) = delete(account) {
            tracing::warn!(account, error = %e, "failed to delete keychain entry");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

impl Default for KeychainCredentialStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStorage for KeychainCredentialStorage {
    async fn load(&self) -> Result<Option<PersistedSession>, StorageError> {
        let secret = match self.entry(SESSION_ACCOUNT)?.get_password() {
            Ok(value) => value,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(StorageError::Keychain(format!("keychain get error: {e}"))),
        };

        match serde_json::from_str(&secret) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable keychain session: {e}");
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        let secret =
            serde_json::to_string(session).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.entry(SESSION_ACCOUNT)?
            .set_password(&secret)
            .map_err(|e| StorageError::Keychain(format!("keychain set error: {e}")))
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let accounts = std::iter::once(SESSION_ACCOUNT).chain(LEGACY_ACCOUNTS.iter().copied());
        delete_each(accounts, |account| self.delete(account))
    }
}
