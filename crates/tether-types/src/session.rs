//! Authenticated session state and its durable form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credential::{AccessToken, Credential};
use crate::identity::UserProfile;

/// The client's view of who is signed in.
///
/// Authenticated only when both a profile and a credential are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub profile: Option<UserProfile>,
    pub credential: Option<Credential>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(profile: UserProfile, credential: Credential) -> Self {
        Self {
            profile: Some(profile),
            credential: Some(credential),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.profile.is_some() && self.credential.is_some()
    }

    /// Whether anything at all is held (even a half-populated session).
    pub fn is_empty(&self) -> bool {
        self.profile.is_none() && self.credential.is_none()
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.credential.as_ref().map(|c| &c.access_token)
    }

    /// Durable record for this session, if it is authenticated.
    pub fn to_persisted(&self) -> Option<PersistedSession> {
        match (&self.profile, &self.credential) {
            (Some(profile), Some(credential)) => Some(PersistedSession {
                token: credential.access_token.clone(),
                issued_at: Some(credential.issued_at),
                expires_at: credential.expires_at,
                profile: profile.clone(),
            }),
            _ => None,
        }
    }
}

/// Session record as written to durable storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub token: AccessToken,
    /// Older records only carried the expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub profile: UserProfile,
}

impl From<PersistedSession> for Session {
    fn from(record: PersistedSession) -> Self {
        let credential = Credential {
            access_token: record.token,
            issued_at: record.issued_at.unwrap_or(record.expires_at),
            expires_at: record.expires_at,
            expiring_soon: false,
        };
        Session::authenticated(record.profile, credential)
    }
}
