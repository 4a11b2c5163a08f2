//! Drives streamed chat turns against the agent backend.
//!
//! `ChatController::submit` runs one `Turn` to a terminal state: it opens the
//! stream through the resilient invoker, feeds every event into the turn,
//! and after the terminal marker performs the turn's single reconciliation
//! (navigate to a newly created conversation, or refresh the known one).
//!
//! Only one turn is live per controller. Submitting another, or calling
//! `discard_active`, cancels the outstanding turn; a cancelled turn never
//! reconciles.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use tether_types::agent::AgentEvent;
use tether_types::chat::{ConversationId, Reconciliation, TurnState};
use tether_types::error::ClientError;
use tether_types::event::SessionEvent;
use tether_types::view::NavTarget;

use crate::backend::BoxAgentBackend;
use crate::chat::turn::{Transcript, Turn};
use crate::event::EventBus;
use crate::invoker::ResilientInvoker;
use crate::view::{ConversationCache, Navigator};

/// Receives progress of a turn as it happens, for progressive rendering.
pub trait TurnObserver: Send {
    fn on_state(&mut self, _turn_id: Uuid, _state: TurnState) {}

    /// The "waiting for the first event" indicator changed.
    fn on_waiting(&mut self, _waiting: bool) {}

    fn on_event(&mut self, _event: &AgentEvent) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TurnObserver for NoopObserver {}

/// Final account of a turn.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub turn_id: Uuid,
    pub state: TurnState,
    pub transcript: Transcript,
    pub conversation_id: Option<ConversationId>,
    pub reconciliation: Option<Reconciliation>,
    pub error: Option<ClientError>,
}

impl TurnReport {
    fn new(turn: &Turn, reconciliation: Option<Reconciliation>) -> Self {
        Self {
            turn_id: turn.id(),
            state: turn.state(),
            transcript: turn.transcript().clone(),
            conversation_id: turn.resolved().or(turn.target()).cloned(),
            reconciliation,
            error: turn.error().cloned(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == TurnState::Completed
    }
}

pub struct ChatController {
    invoker: ResilientInvoker,
    backend: BoxAgentBackend,
    navigator: Arc<dyn Navigator>,
    cache: Arc<dyn ConversationCache>,
    events: EventBus,
    active: Mutex<Option<(Uuid, CancellationToken)>>,
}

impl ChatController {
    pub fn new(
        invoker: ResilientInvoker,
        backend: BoxAgentBackend,
        navigator: Arc<dyn Navigator>,
        cache: Arc<dyn ConversationCache>,
        events: EventBus,
    ) -> Self {
        Self {
            invoker,
            backend,
            navigator,
            cache,
            events,
            active: Mutex::new(None),
        }
    }

    /// Run one turn to completion, failure or cancellation.
    pub async fn submit(
        &self,
        input: impl Into<String>,
        conversation_id: Option<ConversationId>,
        observer: &mut dyn TurnObserver,
    ) -> TurnReport {
        let mut turn = Turn::new(input, conversation_id);
        let cancel = self.activate(turn.id()).await;

        let reconciliation = self.drive(&mut turn, &cancel, observer).await;
        let report = TurnReport::new(&turn, reconciliation);

        self.deactivate(turn.id()).await;
        report
    }

    /// Cancel the outstanding turn, if any (e.g. its view went away).
    pub async fn discard_active(&self) -> bool {
        match self.active.lock().await.take() {
            Some((turn_id, cancel)) => {
                tracing::debug!(%turn_id, "discarding active turn");
                cancel.cancel();
                true
            }
            None => false,
        }
    }

    async fn activate(&self, turn_id: Uuid) -> CancellationToken {
        let cancel = CancellationToken::new();
        let mut active = self.active.lock().await;
        if let Some((previous, token)) = active.replace((turn_id, cancel.clone())) {
            tracing::debug!(%previous, superseded_by = %turn_id, "superseding active turn");
            token.cancel();
        }
        cancel
    }

    async fn deactivate(&self, turn_id: Uuid) {
        let mut active = self.active.lock().await;
        if active.as_ref().is_some_and(|(id, _)| *id == turn_id) {
            *active = None;
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(turn_id = %turn.id()))]
    async fn drive(
        &self,
        turn: &mut Turn,
        cancel: &CancellationToken,
        observer: &mut dyn TurnObserver,
    ) -> Option<Reconciliation> {
        turn.begin();
        observer.on_state(turn.id(), turn.state());
        observer.on_waiting(true);

        let request = turn.request();
        let backend = &self.backend;
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                Self::abandon(turn, observer);
                return None;
            }
            opened = self.invoker.call(|token| {
                let backend = backend.clone();
                let request = request.clone();
                async move { backend.open_turn(&token, &request).await }
            }) => opened,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, "failed to open turn");
                Self::fail(turn, observer, e);
                return None;
            }
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    Self::abandon(turn, observer);
                    return None;
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(event)) => {
                    let absorbed = turn.absorb(event.clone());
                    if absorbed.first_event {
                        observer.on_waiting(false);
                        observer.on_state(turn.id(), turn.state());
                    }
                    observer.on_event(&event);
                    if absorbed.finished {
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "turn stream failed");
                    Self::fail(turn, observer, ClientError::StreamFailed(e.to_string()));
                    return None;
                }
                None => {
                    tracing::warn!("turn stream ended before the terminal marker");
                    Self::fail(
                        turn,
                        observer,
                        ClientError::StreamFailed("stream ended before completion".into()),
                    );
                    return None;
                }
            }
        }
        drop(stream);

        let reconciliation = turn.complete();
        observer.on_state(turn.id(), turn.state());
        self.events.publish(SessionEvent::TurnFinished {
            conversation_id: turn.resolved().cloned(),
        });
        if let Some(reconciliation) = &reconciliation {
            self.reconcile(reconciliation);
        }
        reconciliation
    }

    fn reconcile(&self, reconciliation: &Reconciliation) {
        match reconciliation {
            Reconciliation::NavigateToNew(conversation_id) => {
                tracing::info!(%conversation_id, "navigating to new conversation");
                self.navigator.navigate(NavTarget::Conversation {
                    conversation_id: conversation_id.clone(),
                });
                self.cache.invalidate(conversation_id);
            }
            Reconciliation::RefreshExisting(conversation_id) => {
                tracing::debug!(%conversation_id, "refreshing conversation");
                self.cache.invalidate(conversation_id);
            }
        }
    }

    fn fail(turn: &mut Turn, observer: &mut dyn TurnObserver, error: ClientError) {
        let was_waiting = turn.is_waiting();
        turn.fail(error);
        if was_waiting {
            observer.on_waiting(false);
        }
        observer.on_state(turn.id(), turn.state());
    }

    fn abandon(turn: &mut Turn, observer: &mut dyn TurnObserver) {
        let was_waiting = turn.is_waiting();
        turn.discard();
        if was_waiting {
            observer.on_waiting(false);
        }
        observer.on_state(turn.id(), turn.state());
    }
}

impl std::fmt::Debug for ChatController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatController")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}
