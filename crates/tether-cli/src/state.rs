//! Application state wiring for the CLI.
//!
//! `AppState::init` resolves the data directory, loads configuration and
//! connects the session manager, resilient invoker and chat controller to
//! the HTTP backends and the configured credential storage.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use tether_core::backend::{BoxAgentBackend, BoxIdentityBackend};
use tether_core::chat::ChatController;
use tether_core::event::EventBus;
use tether_core::session::SessionManager;
use tether_core::view::MessageListCache;
use tether_core::ResilientInvoker;
use tether_infra::agent::HttpAgentBackend;
use tether_infra::config::load_client_config;
use tether_infra::filesystem::resolve_data_dir;
use tether_infra::http::{build_client, build_streaming_client};
use tether_infra::identity::HttpIdentityBackend;
use tether_types::config::ClientConfig;

use crate::view::TerminalNavigator;

/// Shared state for every command.
pub struct AppState {
    pub config: ClientConfig,
    pub data_dir: PathBuf,
    pub events: EventBus,
    pub session: Arc<SessionManager>,
    pub chat: Arc<ChatController>,
}

impl AppState {
    /// Wire all services and load any stored session.
    pub async fn init(announce: bool) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let config = load_client_config(&data_dir).await;
        tracing::debug!(
            identity_url = %config.identity_url,
            agent_url = %config.agent_url,
            storage = %config.storage,
            "configuration loaded"
        );

        let client = build_client(config.request_timeout())?;
        let streaming_client = build_streaming_client(config.request_timeout())?;

        let identity =
            BoxIdentityBackend::new(HttpIdentityBackend::new(client, config.identity_url.clone()));
        let agent =
            BoxAgentBackend::new(HttpAgentBackend::new(streaming_client, config.agent_url.clone()));
        let storage = tether_infra::build_credential_storage(config.storage, &data_dir);

        let events = EventBus::default();
        let navigator = Arc::new(TerminalNavigator::new(announce));

        let session = Arc::new(SessionManager::new(
            storage,
            identity,
            navigator.clone(),
            events.clone(),
            config.session.clone(),
        ));
        if session.restore().await {
            tracing::debug!("stored session restored");
        }

        let invoker = ResilientInvoker::new(session.clone());
        let chat = Arc::new(ChatController::new(
            invoker,
            agent,
            navigator,
            Arc::new(MessageListCache::new()),
            events.clone(),
        ));

        Ok(Self {
            config,
            data_dir,
            events,
            session,
            chat,
        })
    }
}
