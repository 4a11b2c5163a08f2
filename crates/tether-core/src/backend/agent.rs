//! AgentBackend trait definition.
//!
//! Opening a turn is a normal request/response exchange (so an expired
//! credential surfaces as `BackendError::Unauthorized` before any event
//! arrives); the returned stream then carries the incremental events.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;

use tether_types::agent::AgentEvent;
use tether_types::chat::TurnRequest;
use tether_types::credential::AccessToken;
use tether_types::error::BackendError;

/// Incremental events of one streamed turn.
pub type AgentEventStream =
    Pin<Box<dyn Stream<Item = Result<AgentEvent, BackendError>> + Send + 'static>>;

/// The remote service that runs chat turns.
pub trait AgentBackend: Send + Sync {
    /// Send a turn and return its event stream once the backend accepted it.
    fn open_turn(
        &self,
        token: &AccessToken,
        request: &TurnRequest,
    ) -> impl Future<Output = Result<AgentEventStream, BackendError>> + Send;
}

/// Object-safe version of [`AgentBackend`].
pub trait AgentBackendDyn: Send + Sync {
    fn open_turn_boxed<'a>(
        &'a self,
        token: &'a AccessToken,
        request: &'a TurnRequest,
    ) -> Pin<Box<dyn Future<Output = Result<AgentEventStream, BackendError>> + Send + 'a>>;
}

impl<T: AgentBackend> AgentBackendDyn for T {
    fn open_turn_boxed<'a>(
        &'a self,
        token: &'a AccessToken,
        request: &'a TurnRequest,
    ) -> Pin<Box<dyn Future<Output = Result<AgentEventStream, BackendError>> + Send + 'a>> {
        Box::pin(self.open_turn(token, request))
    }
}

/// Type-erased agent backend for runtime selection.
#[derive(Clone)]
pub struct BoxAgentBackend {
    inner: Arc<dyn AgentBackendDyn>,
}

impl BoxAgentBackend {
    pub fn new<T: AgentBackend + 'static>(backend: T) -> Self {
        Self {
            inner: Arc::new(backend),
        }
    }

    pub async fn open_turn(
        &self,
        token: &AccessToken,
        request: &TurnRequest,
    ) -> Result<AgentEventStream, BackendError> {
        self.inner.open_turn_boxed(token, request).await
    }
}

impl std::fmt::Debug for BoxAgentBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxAgentBackend").finish_non_exhaustive()
    }
}
