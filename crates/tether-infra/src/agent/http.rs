//! HttpAgentBackend -- concrete [`AgentBackend`] streaming over SSE.
//!
//! `POST {base}/chat/stream` with the turn request as JSON. The response
//! status is checked before any event is read, so an expired credential
//! comes back as `BackendError::Unauthorized` and the invoker can retry.

use reqwest::header::ACCEPT;

use tether_core::backend::{AgentBackend, AgentEventStream};
use tether_types::chat::TurnRequest;
use tether_types::credential::AccessToken;
use tether_types::error::BackendError;

use super::sse::agent_event_stream;
use crate::http::{ensure_success, endpoint, transport};

pub struct HttpAgentBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAgentBackend {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl AgentBackend for HttpAgentBackend {
    async fn open_turn(
        &self,
        token: &AccessToken,
        request: &TurnRequest,
    ) -> Result<AgentEventStream, BackendError> {
        let url = endpoint(&self.base_url, "/chat/stream");
        tracing::debug!(
            %url,
            conversation_id = ?request.conversation_id,
            "opening chat turn"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token.expose())
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        let response = ensure_success(response).await?;

        Ok(agent_event_stream(response))
    }
}
