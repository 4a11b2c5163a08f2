//! HttpIdentityBackend -- concrete [`IdentityBackend`] over HTTP.
//!
//! - renew: `POST {base}/auth/refresh` with the current bearer token,
//!   answered by `{"token": "..."}` (`access_token` also accepted)
//! - revoke: `POST {base}/auth/logout`, best effort

use serde::Deserialize;

use tether_core::backend::IdentityBackend;
use tether_types::credential::AccessToken;
use tether_types::error::BackendError;
use tether_types::identity::RenewedToken;

use crate::http::{ensure_success, endpoint, transport};

#[derive(Debug, Deserialize)]
struct RenewResponse {
    #[serde(alias = "access_token")]
    token: String,
}

/// Identity backend reached over HTTP.
///
/// Does not derive Debug; tokens only ever pass through request headers.
pub struct HttpIdentityBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityBackend {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl IdentityBackend for HttpIdentityBackend {
    async fn renew(&self, token: &AccessToken) -> Result<RenewedToken, BackendError> {
        let url = endpoint(&self.base_url, "/auth/refresh");
        tracing::debug!(%url, "requesting credential renewal");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(transport)?;
        let response = ensure_success(response).await?;

        let body: RenewResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(format!("failed to parse renewal response: {e}")))?;
        if body.token.is_empty() {
            return Err(BackendError::Decode("renewal response carried an empty token".into()));
        }

        Ok(RenewedToken {
            access_token: AccessToken::new(body.token),
        })
    }

    async fn revoke(&self, token: &AccessToken) -> Result<(), BackendError> {
        let url = endpoint(&self.base_url, "/auth/logout");
        let response = self
            .client
            .post(&url)
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(transport)?;
        ensure_success(response).await?;
        Ok(())
    }
}
