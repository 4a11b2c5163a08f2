//! Filesystem adapters for Tether.
//!
//! Data-directory resolution plus the JSON-file credential storage.

pub mod session;

use std::path::PathBuf;

pub use session::FileCredentialStorage;

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `TETHER_DATA_DIR` environment variable
/// 2. `~/.tether`
/// 3. `./.tether`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TETHER_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".tether");
    }

    PathBuf::from(".tether")
}
