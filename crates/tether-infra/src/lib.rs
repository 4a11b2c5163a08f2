//! Infrastructure layer for Tether.
//!
//! Contains implementations of the ports defined in `tether-core`:
//! reqwest-based identity and agent backends (the latter streaming
//! Server-Sent Events), file and OS-keychain credential storage, the
//! config loader and data-directory resolution.

pub mod agent;
pub mod config;
pub mod filesystem;
pub mod http;
pub mod identity;
pub mod keychain;

use std::path::Path;
use std::sync::Arc;

use tether_core::repository::DynCredentialStorage;
use tether_types::config::StorageKind;

use crate::filesystem::FileCredentialStorage;
use crate::keychain::KeychainCredentialStorage;

/// Build the configured durable credential storage.
pub fn build_credential_storage(kind: StorageKind, data_dir: &Path) -> DynCredentialStorage {
    match kind {
        StorageKind::File => {
            tracing::debug!(dir = %data_dir.display(), "using file credential storage");
            Arc::new(FileCredentialStorage::new(data_dir))
        }
        StorageKind::Keychain => {
            tracing::debug!("using keychain credential storage");
            Arc::new(KeychainCredentialStorage::new())
        }
    }
}
