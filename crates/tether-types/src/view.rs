//! Navigation vocabulary shared between the session layer and the UI.

use serde::{Deserialize, Serialize};

use crate::chat::ConversationId;

/// Kind of view currently presented to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    #[default]
    Standard,
    /// Admin views run their own access guard and pick their own redirect.
    Privileged,
}

/// Where the UI should go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum NavTarget {
    /// The anonymous landing surface.
    Landing,
    Conversation { conversation_id: ConversationId },
}
