//! Chat turn types: conversation identity, turn request and turn lifecycle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Server-assigned conversation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Outgoing message for one chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
}

/// Lifecycle of a single streamed turn.
///
/// `Completed`, `Errored` and `Discarded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    Sending,
    Streaming,
    Completed,
    Errored,
    Discarded,
}

impl TurnState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TurnState::Completed | TurnState::Errored | TurnState::Discarded
        )
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: TurnState) -> bool {
        use TurnState::*;
        matches!(
            (self, next),
            (Idle, Sending)
                | (Sending, Streaming)
                | (Sending, Errored)
                | (Sending, Discarded)
                | (Streaming, Completed)
                | (Streaming, Errored)
                | (Streaming, Discarded)
        )
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnState::Idle => write!(f, "idle"),
            TurnState::Sending => write!(f, "sending"),
            TurnState::Streaming => write!(f, "streaming"),
            TurnState::Completed => write!(f, "completed"),
            TurnState::Errored => write!(f, "errored"),
            TurnState::Discarded => write!(f, "discarded"),
        }
    }
}

impl FromStr for TurnState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(TurnState::Idle),
            "sending" => Ok(TurnState::Sending),
            "streaming" => Ok(TurnState::Streaming),
            "completed" => Ok(TurnState::Completed),
            "errored" => Ok(TurnState::Errored),
            "discarded" => Ok(TurnState::Discarded),
            other => Err(format!("invalid turn state: '{other}'")),
        }
    }
}

/// The single post-stream action taken for a completed turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "conversation_id", rename_all = "snake_case")]
pub enum Reconciliation {
    /// The turn created this conversation: navigate to it, then drop its cached messages.
    NavigateToNew(ConversationId),
    /// The turn ran in a known conversation: drop its cached messages.
    RefreshExisting(ConversationId),
}

impl Reconciliation {
    pub fn conversation_id(&self) -> &ConversationId {
        match self {
            Reconciliation::NavigateToNew(id) | Reconciliation::RefreshExisting(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_request_omits_missing_conversation() {
        let request = TurnRequest {
            message: "hello".to_string(),
            conversation_id: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"message": "hello"}));

        let request = TurnRequest {
            message: "again".to_string(),
            conversation_id: Some("c-1".into()),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["conversation_id"], "c-1");
    }

    #[test]
    fn terminal_states() {
        assert!(TurnState::Completed.is_terminal());
        assert!(TurnState::Errored.is_terminal());
        assert!(TurnState::Discarded.is_terminal());
        assert!(!TurnState::Streaming.is_terminal());
    }

    #[test]
    fn transitions_follow_the_state_machine() {
        assert!(TurnState::Idle.can_transition_to(TurnState::Sending));
        assert!(TurnState::Sending.can_transition_to(TurnState::Streaming));
        assert!(TurnState::Streaming.can_transition_to(TurnState::Completed));
        assert!(TurnState::Sending.can_transition_to(TurnState::Errored));

        // No skipping straight to completion, no leaving terminal states
        assert!(!TurnState::Sending.can_transition_to(TurnState::Completed));
        assert!(!TurnState::Completed.can_transition_to(TurnState::Streaming));
        assert!(!TurnState::Errored.can_transition_to(TurnState::Sending));
    }

    #[test]
    fn turn_state_display_matches_from_str() {
        for state in [
            TurnState::Idle,
            TurnState::Sending,
            TurnState::Streaming,
            TurnState::Completed,
            TurnState::Errored,
            TurnState::Discarded,
        ] {
            assert_eq!(state.to_string().parse::<TurnState>().unwrap(), state);
        }
    }

    #[test]
    fn reconciliation_exposes_conversation() {
        let r = Reconciliation::NavigateToNew("c-42".into());
        assert_eq!(r.conversation_id().as_str(), "c-42");
    }
}
