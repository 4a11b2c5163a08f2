//! Events emitted by the agent backend while streaming a chat turn.

use serde::{Deserialize, Serialize};

use crate::chat::ConversationId;

/// One incremental event of a streamed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A chunk of assistant text.
    TextDelta { text: String },

    /// A chunk of reasoning/thinking text.
    ReasoningDelta { text: String },

    /// The agent is running a tool.
    ToolActivity {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },

    /// The backend created a conversation for a turn that had none.
    ConversationCreated { conversation_id: ConversationId },

    /// Token usage for the turn so far.
    Usage { input_tokens: u32, output_tokens: u32 },

    /// Terminal marker: the stream is complete.
    Done,
}

impl AgentEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Done)
    }

    /// Text to append to the visible transcript, if any.
    pub fn visible_text(&self) -> Option<&str> {
        match self {
            AgentEvent::TextDelta { text } => Some(text),
            _ => None,
        }
    }
}
