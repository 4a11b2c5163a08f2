//! Server-Sent Events to [`AgentEvent`] adapter.
//!
//! Each SSE `data` payload is a JSON object tagged by `"type"`. Servers that
//! put the type in the SSE `event:` field instead are accepted too, as is
//! the `data: [DONE]` sentinel. Unknown event types are skipped so the
//! backend can add new ones without breaking older clients.
//!
//! The stream ends right after the terminal marker.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use serde::Deserialize;

use tether_core::backend::AgentEventStream;
use tether_types::agent::AgentEvent;
use tether_types::chat::ConversationId;
use tether_types::error::BackendError;

const DONE_SENTINEL: &str = "[DONE]";

/// Wire shape of one streamed event, tolerant of a few spelling variants.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    #[serde(alias = "text", alias = "content")]
    TextDelta {
        #[serde(alias = "content", alias = "delta")]
        text: String,
    },
    #[serde(alias = "reasoning", alias = "thinking")]
    ReasoningDelta {
        #[serde(alias = "content", alias = "delta")]
        text: String,
    },
    #[serde(alias = "tool", alias = "tool_call")]
    ToolActivity {
        #[serde(alias = "tool")]
        name: String,
        #[serde(default)]
        detail: Option<String>,
    },
    #[serde(alias = "conversation")]
    ConversationCreated {
        #[serde(alias = "conversationId", alias = "id")]
        conversation_id: String,
    },
    Usage {
        #[serde(default)]
        input_tokens: u32,
        #[serde(default)]
        output_tokens: u32,
    },
    #[serde(alias = "end", alias = "complete")]
    Done,
    #[serde(other)]
    Unknown,
}

impl WireEvent {
    fn into_agent_event(self) -> Option<AgentEvent> {
        Some(match self {
            WireEvent::TextDelta { text } => AgentEvent::TextDelta { text },
            WireEvent::ReasoningDelta { text } => AgentEvent::ReasoningDelta { text },
            WireEvent::ToolActivity { name, detail } => AgentEvent::ToolActivity { name, detail },
            WireEvent::ConversationCreated { conversation_id } => AgentEvent::ConversationCreated {
                conversation_id: ConversationId::new(conversation_id),
            },
            WireEvent::Usage {
                input_tokens,
                output_tokens,
            } => AgentEvent::Usage {
                input_tokens,
                output_tokens,
            },
            WireEvent::Done => AgentEvent::Done,
            WireEvent::Unknown => return None,
        })
    }
}

/// Decode one SSE message. `Ok(None)` means "skip this one".
pub fn parse_event(event_name: &str, data: &str) -> Result<Option<AgentEvent>, BackendError> {
    let data = data.trim();
    if data == DONE_SENTINEL {
        return Ok(Some(AgentEvent::Done));
    }
    if data.is_empty() {
        return Ok(None);
    }

    let mut value: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| BackendError::Decode(format!("invalid event payload: {e}")))?;
    if let Some(object) = value.as_object_mut() {
        if !object.contains_key("type") && !event_name.is_empty() && event_name != "message" {
            object.insert("type".into(), serde_json::Value::String(event_name.to_string()));
        }
    }

    let wire: WireEvent = serde_json::from_value(value)
        .map_err(|e| BackendError::Decode(format!("unrecognized event: {e}")))?;
    let event = wire.into_agent_event();
    if event.is_none() {
        tracing::trace!(event_name, "skipping unknown agent event");
    }
    Ok(event)
}

/// Turn a successful streaming response into agent events.
pub fn agent_event_stream(response: reqwest::Response) -> AgentEventStream {
    let mut events = Box::pin(response.bytes_stream().eventsource());

    Box::pin(async_stream::try_stream! {
        while let Some(message) = events.next().await {
            let message = message.map_err(|e| BackendError::Transport(format!("event stream error: {e}")))?;
            if let Some(event) = parse_event(&message.event, &message.data)? {
                let finished = event.is_terminal();
                yield event;
                if finished {
                    break;
                }
            }
        }
    })
}
