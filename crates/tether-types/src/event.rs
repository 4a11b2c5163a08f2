//! Session lifecycle events broadcast to interested observers.
//!
//! UI pieces outside the session layer (quota display, account menu)
//! subscribe to these instead of polling session state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::ConversationId;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    /// The user asked to sign out.
    UserInitiated,
    /// The expiry sweep found the credential past its expiry.
    Expired,
    /// The identity backend rejected or could not be reached for renewal.
    RenewalFailed,
    /// A call was still unauthorized after renewing and retrying.
    Unauthorized,
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogoutReason::UserInitiated => write!(f, "user_initiated"),
            LogoutReason::Expired => write!(f, "expired"),
            LogoutReason::RenewalFailed => write!(f, "renewal_failed"),
            LogoutReason::Unauthorized => write!(f, "unauthorized"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    LoggedIn {
        user_id: String,
    },

    /// A fresh credential replaced the old one.
    CredentialRenewed {
        expires_at: DateTime<Utc>,
    },

    /// The credential entered the renewal buffer.
    ExpiringSoon {
        expires_at: DateTime<Utc>,
    },

    LoggedOut {
        reason: LogoutReason,
    },

    /// A chat turn completed; emitted once per completed turn.
    TurnFinished {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conversation_id: Option<ConversationId>,
    },
}
