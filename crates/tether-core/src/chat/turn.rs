//! The state machine for one streamed chat turn.
//!
//! ```text
//! idle -> sending -> streaming -> completed
//!            |           |
//!            +-----------+------> errored | discarded
//! ```
//!
//! A turn that starts without a conversation may learn its conversation id
//! mid-stream. The id is parked in `pending` and only turned into a
//! reconciliation once the terminal marker arrives, exactly once.

use uuid::Uuid;

use tether_types::agent::AgentEvent;
use tether_types::chat::{ConversationId, Reconciliation, TurnRequest, TurnState};
use tether_types::error::ClientError;

/// Everything the backend streamed for a turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    pub events: Vec<AgentEvent>,
    /// Concatenated visible text.
    pub text: String,
}

/// What absorbing one event changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Absorbed {
    /// This was the first event of the turn (the waiting indicator cleared).
    pub first_event: bool,
    /// This was the terminal marker.
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct Turn {
    id: Uuid,
    input: String,
    target: Option<ConversationId>,
    pending: Option<ConversationId>,
    resolved: Option<ConversationId>,
    transcript: Transcript,
    state: TurnState,
    waiting: bool,
    error: Option<ClientError>,
}

impl Turn {
    pub fn new(input: impl Into<String>, target: Option<ConversationId>) -> Self {
        Self {
            id: Uuid::now_v7(),
            input: input.into(),
            target,
            pending: None,
            resolved: None,
            transcript: Transcript::default(),
            state: TurnState::Idle,
            waiting: false,
            error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn target(&self) -> Option<&ConversationId> {
        self.target.as_ref()
    }

    /// Conversation announced by the backend and not yet reconciled.
    pub fn pending(&self) -> Option<&ConversationId> {
        self.pending.as_ref()
    }

    /// The conversation this turn ended up in, once completed.
    pub fn resolved(&self) -> Option<&ConversationId> {
        self.resolved.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn error(&self) -> Option<&ClientError> {
        self.error.as_ref()
    }

    pub fn request(&self) -> TurnRequest {
        TurnRequest {
            message: self.input.clone(),
            conversation_id: self.target.clone(),
        }
    }

    fn transition(&mut self, next: TurnState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::debug!(turn_id = %self.id, from = %self.state, to = %next, "ignored turn transition");
            return false;
        }
        tracing::debug!(turn_id = %self.id, from = %self.state, to = %next, "turn transition");
        self.state = next;
        true
    }

    /// `idle -> sending`; the waiting indicator goes up.
    pub fn begin(&mut self) -> bool {
        if !self.transition(TurnState::Sending) {
            return false;
        }
        self.waiting = true;
        true
    }

    /// Fold one streamed event into the turn.
    ///
    /// Events arriving after the turn reached a terminal state are dropped.
    pub fn absorb(&mut self, event: AgentEvent) -> Absorbed {
        let mut absorbed = Absorbed::default();
        match self.state {
            TurnState::Sending => {
                self.transition(TurnState::Streaming);
                self.waiting = false;
                absorbed.first_event = true;
            }
            TurnState::Streaming => {}
            _ => return absorbed,
        }

        if let AgentEvent::ConversationCreated { conversation_id } = &event {
            if self.target.is_none() && self.pending.is_none() {
                tracing::debug!(turn_id = %self.id, %conversation_id, "captured new conversation");
                self.pending = Some(conversation_id.clone());
            }
        }
        if let Some(text) = event.visible_text() {
            self.transcript.text.push_str(text);
        }
        absorbed.finished = event.is_terminal();
        self.transcript.events.push(event);
        absorbed
    }

    /// `streaming -> completed`, yielding the single post-stream action.
    ///
    /// Returns `None` when the turn has no conversation to reconcile or was
    /// not streaming (so a second call never reconciles twice).
    pub fn complete(&mut self) -> Option<Reconciliation> {
        if !self.transition(TurnState::Completed) {
            return None;
        }
        let reconciliation = match (self.pending.take(), &self.target) {
            (Some(created), _) => Some(Reconciliation::NavigateToNew(created)),
            (None, Some(target)) => Some(Reconciliation::RefreshExisting(target.clone())),
            (None, None) => None,
        };
        self.resolved = reconciliation.as_ref().map(|r| r.conversation_id().clone());
        reconciliation
    }

    /// `sending | streaming -> errored`. The transcript is kept, the pending
    /// conversation is dropped.
    pub fn fail(&mut self, error: ClientError) {
        if self.transition(TurnState::Errored) {
            self.waiting = false;
            self.pending = None;
            self.error = Some(error);
        }
    }

    /// Abandon the turn; it will never reconcile.
    pub fn discard(&mut self) {
        if self.transition(TurnState::Discarded) {
            self.waiting = false;
            self.pending = None;
        }
    }
}
