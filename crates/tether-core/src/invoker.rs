//! Authenticated calls with proactive renewal and one bounded retry.
//!
//! Every outgoing request goes through `ResilientInvoker::call`:
//! 1. resolve the credential through the session's single read path
//! 2. renew first when it is inside the renewal buffer
//! 3. send the request
//! 4. on a 401, renew and retry exactly once; a second 401 ends the session
//!
//! Non-auth failures are handed back unchanged and never retried.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;

use tether_types::credential::AccessToken;
use tether_types::error::{BackendError, ClientError};
use tether_types::event::LogoutReason;

use crate::session::SessionManager;

/// Wraps backend requests with the session's credential handling.
#[derive(Debug, Clone)]
pub struct ResilientInvoker {
    session: Arc<SessionManager>,
}

impl ResilientInvoker {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Run `op` with a valid bearer token.
    ///
    /// `op` is invoked at most twice: once with the current token and, only
    /// after a 401 followed by a successful renewal, once more with the
    /// renewed token.
    pub async fn call<T, F, Fut>(&self, mut op: F) -> Result<T, ClientError>
    where
        F: FnMut(AccessToken) -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let Some(credential) = self.session.resolve_credential().await else {
            return Err(ClientError::Unauthenticated);
        };

        let token = if credential.within_buffer(Utc::now(), self.session.settings().renewal_buffer())
        {
            tracing::debug!("credential inside renewal buffer; renewing before request");
            if !self.session.refresh_token().await {
                return Err(ClientError::Unauthenticated);
            }
            self.current_token().ok_or(ClientError::Unauthenticated)?
        } else {
            credential.access_token
        };

        let sent = token.clone();
        match op(token).await {
            Ok(value) => return Ok(value),
            Err(BackendError::Unauthorized) => {
                tracing::info!("request unauthorized; renewing and retrying once");
            }
            Err(e) => return Err(ClientError::RequestFailed(e)),
        }

        let retry_token = match self.current_token() {
            // Someone else already rotated the credential since we sent.
            Some(current) if current != sent => current,
            _ => {
                if !self.session.refresh_token().await {
                    return Err(ClientError::RenewalFailed);
                }
                self.current_token().ok_or(ClientError::RenewalFailed)?
            }
        };

        let retried = retry_token.clone();
        match op(retry_token).await {
            Ok(value) => Ok(value),
            Err(BackendError::Unauthorized) => {
                tracing::warn!("retry unauthorized; ending session");
                self.session
                    .end_session(LogoutReason::Unauthorized, Some(&retried))
                    .await;
                Err(ClientError::AuthenticationFailed)
            }
            Err(e) => Err(ClientError::RequestFailed(e)),
        }
    }

    fn current_token(&self) -> Option<AccessToken> {
        self.session.credential().map(|c| c.access_token)
    }
}
