//! Bearer credential types.
//!
//! A [`Credential`] is the access token plus its expiry metadata. The token
//! itself is wrapped in [`AccessToken`] so it never shows up in `Debug`
//! output or tracing fields.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Opaque bearer token issued by the identity backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building an `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for AccessToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// The current bearer credential.
///
/// Always replaced as a whole value; fields are never updated one by one
/// once the credential has been published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: AccessToken,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set by the expiry sweep when the credential entered the renewal buffer.
    #[serde(skip)]
    pub expiring_soon: bool,
}

impl Credential {
    /// Issue a credential with a fixed validity horizon starting at `issued_at`.
    pub fn issue(access_token: AccessToken, issued_at: DateTime<Utc>, validity: Duration) -> Self {
        Self {
            access_token,
            issued_at,
            expires_at: issued_at + validity,
            expiring_soon: false,
        }
    }

    /// Whether the expiry has already passed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether `now` falls inside the renewal buffer before expiry.
    ///
    /// An already-expired credential is also inside the buffer.
    pub fn within_buffer(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        self.expires_at - now <= buffer
    }

    /// Time left until expiry (negative once expired).
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issued_at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn issue_applies_validity_horizon() {
        let credential = Credential::issue("tok".into(), issued_at(), Duration::hours(24));
        assert_eq!(credential.expires_at - credential.issued_at, Duration::hours(24));
        assert!(!credential.expiring_soon);
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let credential = Credential::issue("tok".into(), issued_at(), Duration::minutes(10));
        assert!(!credential.is_expired(issued_at() + Duration::minutes(9)));
        assert!(credential.is_expired(issued_at() + Duration::minutes(10)));
    }

    #[test]
    fn renewal_buffer_window() {
        let credential = Credential::issue("tok".into(), issued_at(), Duration::minutes(30));
        let buffer = Duration::minutes(5);

        assert!(!credential.within_buffer(issued_at(), buffer));
        assert!(!credential.within_buffer(issued_at() + Duration::minutes(24), buffer));
        assert!(credential.within_buffer(issued_at() + Duration::minutes(25), buffer));
        assert!(credential.within_buffer(issued_at() + Duration::minutes(28), buffer));
        // Expired credentials count as inside the buffer too
        assert!(credential.within_buffer(issued_at() + Duration::hours(1), buffer));
    }

    #[test]
    fn remaining_goes_negative_after_expiry() {
        let credential = Credential::issue("tok".into(), issued_at(), Duration::minutes(2));
        assert_eq!(credential.remaining(issued_at()), Duration::minutes(2));
        assert!(credential.remaining(issued_at() + Duration::minutes(3)) < Duration::zero());
    }

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::new("super-secret-value");
        let debug = format!("{token:?}");
        assert!(!debug.contains("super-secret-value"));

        let credential = Credential::issue(token, issued_at(), Duration::hours(1));
        assert!(!format!("{credential:?}").contains("super-secret-value"));
    }

    #[test]
    fn expiring_soon_flag_is_not_persisted() {
        let mut credential = Credential::issue("tok".into(), issued_at(), Duration::hours(1));
        credential.expiring_soon = true;

        let json = serde_json::to_string(&credential).unwrap();
        assert!(!json.contains("expiring_soon"));

        let parsed: Credential = serde_json::from_str(&json).unwrap();
        assert!(!parsed.expiring_soon);
        assert_eq!(parsed.access_token.expose(), "tok");
    }
}
