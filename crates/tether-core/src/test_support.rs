//! In-memory fakes shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use futures_util::stream;
use tokio::sync::{mpsc, watch};

use tether_types::agent::AgentEvent;
use tether_types::chat::{ConversationId, TurnRequest};
use tether_types::config::SessionSettings;
use tether_types::credential::{AccessToken, Credential};
use tether_types::error::{BackendError, StorageError};
use tether_types::identity::{RenewedToken, UserProfile};
use tether_types::session::{PersistedSession, Session};
use tether_types::view::{NavTarget, Surface};

use crate::backend::{AgentBackend, AgentEventStream, BoxAgentBackend, BoxIdentityBackend, IdentityBackend};
use crate::event::EventBus;
use crate::repository::CredentialStorage;
use crate::session::SessionManager;
use crate::view::{ConversationCache, Navigator};

pub fn session_with_expiry(token: &str, validity: Duration) -> Session {
    Session::authenticated(
        UserProfile::new("u-1", "a@example.com"),
        Credential::issue(token.into(), Utc::now(), validity),
    )
}

// -- storage -----------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStorage {
    record: Mutex<Option<PersistedSession>>,
    saves: AtomicUsize,
    clears: AtomicUsize,
}

impl MemoryStorage {
    pub fn seed(&self, record: PersistedSession) {
        *self.record.lock().unwrap() = Some(record);
    }

    pub fn stored(&self) -> Option<PersistedSession> {
        self.record.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl CredentialStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<PersistedSession>, StorageError> {
        Ok(self.stored())
    }

    async fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.record.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        *self.record.lock().unwrap() = None;
        Ok(())
    }
}

// -- identity backend --------------------------------------------------------

struct IdentityState {
    renews: AtomicUsize,
    revokes: AtomicUsize,
    gate: watch::Sender<bool>,
}

/// Identity backend that issues `renewed-{n}` tokens, optionally held back
/// until `release()` is called.
#[derive(Clone)]
pub struct FakeIdentity {
    state: Arc<IdentityState>,
    failure: Option<BackendError>,
    fail_revoke: bool,
}

impl FakeIdentity {
    fn with_gate(open: bool) -> Self {
        let (gate, _) = watch::channel(open);
        Self {
            state: Arc::new(IdentityState {
                renews: AtomicUsize::new(0),
                revokes: AtomicUsize::new(0),
                gate,
            }),
            failure: None,
            fail_revoke: false,
        }
    }

    pub fn immediate() -> Self {
        Self::with_gate(true)
    }

    pub fn gated() -> Self {
        Self::with_gate(false)
    }

    pub fn failing_with_status(mut self, status: u16) -> Self {
        self.failure = Some(BackendError::Status {
            status,
            body: "renewal failed".into(),
        });
        self
    }

    pub fn failing_revoke(mut self) -> Self {
        self.fail_revoke = true;
        self
    }

    pub fn boxed(&self) -> BoxIdentityBackend {
        BoxIdentityBackend::new(self.clone())
    }

    pub fn release(&self) {
        self.state.gate.send_replace(true);
    }

    pub fn renew_calls(&self) -> usize {
        self.state.renews.load(Ordering::SeqCst)
    }

    pub fn revoke_calls(&self) -> usize {
        self.state.revokes.load(Ordering::SeqCst)
    }

    pub async fn wait_for_renew_calls(&self, n: usize) {
        while self.renew_calls() < n {
            tokio::task::yield_now().await;
        }
    }
}

impl IdentityBackend for FakeIdentity {
    async fn renew(&self, _token: &AccessToken) -> Result<RenewedToken, BackendError> {
        let n = self.state.renews.fetch_add(1, Ordering::SeqCst) + 1;
        let mut gate = self.state.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(RenewedToken {
                access_token: AccessToken::new(format!("renewed-{n}")),
            }),
        }
    }

    async fn revoke(&self, _token: &AccessToken) -> Result<(), BackendError> {
        self.state.revokes.fetch_add(1, Ordering::SeqCst);
        if self.fail_revoke {
            return Err(BackendError::Transport("revoke unreachable".into()));
        }
        Ok(())
    }
}

// -- view --------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNavigator {
    surface: Mutex<Surface>,
    targets: Mutex<Vec<NavTarget>>,
}

impl RecordingNavigator {
    pub fn set_surface(&self, surface: Surface) {
        *self.surface.lock().unwrap() = surface;
    }

    pub fn targets(&self) -> Vec<NavTarget> {
        self.targets.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_surface(&self) -> Surface {
        *self.surface.lock().unwrap()
    }

    fn navigate(&self, target: NavTarget) {
        self.targets.lock().unwrap().push(target);
    }
}

#[derive(Default)]
pub struct RecordingCache {
    invalidated: Mutex<Vec<ConversationId>>,
}

impl RecordingCache {
    pub fn invalidated(&self) -> Vec<ConversationId> {
        self.invalidated.lock().unwrap().clone()
    }
}

impl ConversationCache for RecordingCache {
    fn invalidate(&self, conversation_id: &ConversationId) {
        self.invalidated.lock().unwrap().push(conversation_id.clone());
    }
}

// -- agent backend -----------------------------------------------------------

type Item = Result<AgentEvent, BackendError>;

#[derive(Default)]
struct AgentState {
    tokens: Mutex<Vec<String>>,
    requests: Mutex<Vec<TurnRequest>>,
    reject_first: Mutex<Option<BackendError>>,
    script: Mutex<Option<Vec<Item>>>,
    feed: Mutex<Option<mpsc::UnboundedReceiver<Item>>>,
}

/// Agent backend that replays a fixed script or a live channel. The events
/// are handed out once; later opens get an empty stream.
#[derive(Clone, Default)]
pub struct FakeAgent {
    state: Arc<AgentState>,
}

impl FakeAgent {
    pub fn scripted(events: Vec<Item>) -> Self {
        let agent = Self::default();
        *agent.state.script.lock().unwrap() = Some(events);
        agent
    }

    pub fn channel() -> (Self, mpsc::UnboundedSender<Item>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let agent = Self::default();
        *agent.state.feed.lock().unwrap() = Some(rx);
        (agent, tx)
    }

    pub fn rejecting_first(self, error: BackendError) -> Self {
        *self.state.reject_first.lock().unwrap() = Some(error);
        self
    }

    pub fn boxed(&self) -> BoxAgentBackend {
        BoxAgentBackend::new(self.clone())
    }

    pub fn tokens(&self) -> Vec<String> {
        self.state.tokens.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<TurnRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl AgentBackend for FakeAgent {
    async fn open_turn(
        &self,
        token: &AccessToken,
        request: &TurnRequest,
    ) -> Result<AgentEventStream, BackendError> {
        self.state
            .tokens
            .lock()
            .unwrap()
            .push(token.expose().to_string());
        self.state.requests.lock().unwrap().push(request.clone());

        if let Some(e) = self.state.reject_first.lock().unwrap().take() {
            return Err(e);
        }
        if let Some(events) = self.state.script.lock().unwrap().take() {
            return Ok(Box::pin(stream::iter(events)));
        }
        if let Some(rx) = self.state.feed.lock().unwrap().take() {
            return Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })));
        }
        Ok(Box::pin(stream::empty::<Item>()))
    }
}

// -- wiring ------------------------------------------------------------------

pub struct Harness {
    pub manager: Arc<SessionManager>,
    pub storage: Arc<MemoryStorage>,
    pub identity: FakeIdentity,
    pub navigator: Arc<RecordingNavigator>,
    pub events: EventBus,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_identity(FakeIdentity::immediate())
    }

    pub fn with_identity(identity: FakeIdentity) -> Self {
        Self::with_settings(identity, SessionSettings::default())
    }

    pub fn with_settings(identity: FakeIdentity, settings: SessionSettings) -> Self {
        let storage = Arc::new(MemoryStorage::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let events = EventBus::new(64);
        let manager = Arc::new(SessionManager::new(
            storage.clone(),
            identity.boxed(),
            navigator.clone(),
            events.clone(),
            settings,
        ));
        Self {
            manager,
            storage,
            identity,
            navigator,
            events,
        }
    }
}
