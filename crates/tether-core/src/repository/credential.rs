//! Durable credential storage trait definition.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tether_types::error::StorageError;
use tether_types::session::PersistedSession;

/// Trait for durable credential storage backends (file, OS keychain).
///
/// Holds at most one session record. `clear` must remove every key the
/// backend has ever written, including legacy aliases.
pub trait CredentialStorage: Send + Sync {
    /// Load the stored session, or `None` if nothing is stored.
    fn load(&self) -> impl Future<Output = Result<Option<PersistedSession>, StorageError>> + Send;

    /// Replace the stored session.
    fn save(
        &self,
        session: &PersistedSession,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Remove the stored session and any legacy copies.
    fn clear(&self) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Object-safe version of [`CredentialStorage`] with boxed futures.
pub trait CredentialStorageDyn: Send + Sync {
    fn load_boxed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PersistedSession>, StorageError>> + Send + '_>>;

    fn save_boxed<'a>(
        &'a self,
        session: &'a PersistedSession,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>>;

    fn clear_boxed(&self) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + '_>>;
}

impl<T: CredentialStorage> CredentialStorageDyn for T {
    fn load_boxed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PersistedSession>, StorageError>> + Send + '_>>
    {
        Box::pin(self.load())
    }

    fn save_boxed<'a>(
        &'a self,
        session: &'a PersistedSession,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(self.save(session))
    }

    fn clear_boxed(&self) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + '_>> {
        Box::pin(self.clear())
    }
}

/// Shared handle to a type-erased storage backend.
pub type DynCredentialStorage = Arc<dyn CredentialStorageDyn>;
