//! IdentityBackend trait and its object-safe wrapper.
//!
//! Same blanket-impl pattern as `BoxAgentBackend`:
//! 1. `IdentityBackend` uses RPITIT for concrete implementations
//! 2. `IdentityBackendDyn` is the object-safe mirror with boxed futures
//! 3. `BoxIdentityBackend` wraps `Arc<dyn IdentityBackendDyn>` and delegates

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tether_types::credential::AccessToken;
use tether_types::error::BackendError;
use tether_types::identity::RenewedToken;

/// The remote service that renews and revokes bearer credentials.
///
/// Implementations live in tether-infra (e.g., `HttpIdentityBackend`).
pub trait IdentityBackend: Send + Sync {
    /// Exchange the current token for a fresh one.
    fn renew(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<RenewedToken, BackendError>> + Send;

    /// Invalidate server-side state for the token.
    fn revoke(&self, token: &AccessToken) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// Object-safe version of [`IdentityBackend`] with boxed futures.
pub trait IdentityBackendDyn: Send + Sync {
    fn renew_boxed<'a>(
        &'a self,
        token: &'a AccessToken,
    ) -> Pin<Box<dyn Future<Output = Result<RenewedToken, BackendError>> + Send + 'a>>;

    fn revoke_boxed<'a>(
        &'a self,
        token: &'a AccessToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), BackendError>> + Send + 'a>>;
}

impl<T: IdentityBackend> IdentityBackendDyn for T {
    fn renew_boxed<'a>(
        &'a self,
        token: &'a AccessToken,
    ) -> Pin<Box<dyn Future<Output = Result<RenewedToken, BackendError>> + Send + 'a>> {
        Box::pin(self.renew(token))
    }

    fn revoke_boxed<'a>(
        &'a self,
        token: &'a AccessToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), BackendError>> + Send + 'a>> {
        Box::pin(self.revoke(token))
    }
}

/// Type-erased, cheaply cloneable identity backend.
///
/// Cloning shares the same underlying backend, so spawned renewal tasks can
/// hold their own handle.
#[derive(Clone)]
pub struct BoxIdentityBackend {
    inner: Arc<dyn IdentityBackendDyn>,
}

impl BoxIdentityBackend {
    pub fn new<T: IdentityBackend + 'static>(backend: T) -> Self {
        Self {
            inner: Arc::new(backend),
        }
    }

    pub async fn renew(&self, token: &AccessToken) -> Result<RenewedToken, BackendError> {
        self.inner.renew_boxed(token).await
    }

    pub async fn revoke(&self, token: &AccessToken) -> Result<(), BackendError> {
        self.inner.revoke_boxed(token).await
    }
}

impl std::fmt::Debug for BoxIdentityBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxIdentityBackend").finish_non_exhaustive()
    }
}
