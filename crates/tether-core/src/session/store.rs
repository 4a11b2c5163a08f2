//! Canonical in-memory session plus its durable copy.
//!
//! The current `Session` lives in a `tokio::sync::watch` channel: every
//! mutation replaces the whole value, so readers always see a consistent
//! token/expiry pair and can read synchronously via `snapshot()`.
//!
//! Durable writes go through `persist_lock` and re-read the in-memory value
//! under the lock. A renewal that finishes while a logout is clearing storage
//! therefore never writes a credential back.

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};

use tether_types::credential::{AccessToken, Credential};
use tether_types::identity::UserProfile;
use tether_types::session::{PersistedSession, Session};

use crate::repository::DynCredentialStorage;

/// Holds the single current credential and profile.
pub struct CredentialStore {
    state: watch::Sender<Session>,
    storage: DynCredentialStorage,
    persist_lock: Mutex<()>,
}

impl CredentialStore {
    /// Create an anonymous store backed by `storage`.
    pub fn new(storage: DynCredentialStorage) -> Self {
        let (state, _) = watch::channel(Session::anonymous());
        Self {
            state,
            storage,
            persist_lock: Mutex::new(()),
        }
    }

    /// Clone of the current session.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn credential(&self) -> Option<Credential> {
        self.state.borrow().credential.clone()
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.state.borrow().access_token().cloned()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.state.borrow().profile.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Receiver that observes every session replacement.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Replace the whole session (login, restore).
    pub fn install(&self, session: Session) {
        self.state.send_replace(session);
    }

    /// Swap in a renewed credential, keeping the profile.
    ///
    /// Only takes effect while the session still holds `expected`; returns
    /// `false` when the session was ended or replaced in the meantime.
    pub fn replace_credential(&self, expected: &AccessToken, credential: Credential) -> bool {
        self.state.send_if_modified(|session| {
            let current = session.access_token();
            if session.profile.is_none() || current != Some(expected) {
                return false;
            }
            session.credential = Some(credential);
            true
        })
    }

    /// Set the `expiring_soon` flag on the current credential.
    ///
    /// Returns the expiry when the flag was newly set, `None` if it was
    /// already set or there is no credential.
    pub fn mark_expiring_soon(&self) -> Option<DateTime<Utc>> {
        let mut flagged = None;
        self.state.send_if_modified(|session| match session.credential.as_mut() {
            Some(credential) if !credential.expiring_soon => {
                credential.expiring_soon = true;
                flagged = Some(credential.expires_at);
                true
            }
            _ => false,
        });
        flagged
    }

    /// Reset to anonymous and return what was there.
    ///
    /// With `expected` set, only a session still holding that token is
    /// taken; otherwise any non-empty session is.
    pub fn take(&self, expected: Option<&AccessToken>) -> Option<Session> {
        let mut taken = None;
        self.state.send_if_modified(|session| {
            let matches = match expected {
                Some(token) => session.access_token() == Some(token),
                None => !session.is_empty(),
            };
            if matches {
                taken = Some(std::mem::take(session));
            }
            matches
        });
        taken
    }

    /// Write the current session to durable storage.
    ///
    /// Nothing is written when the session is no longer authenticated.
    pub async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let Some(record) = self.snapshot().to_persisted() else {
            tracing::debug!("session not authenticated; skipping durable write");
            return;
        };
        if let Err(e) = self.storage.save_boxed(&record).await {
            tracing::warn!(error = %e, "failed to persist session");
        }
    }

    /// Remove every durable copy of the session.
    pub async fn clear_durable(&self) {
        let _guard = self.persist_lock.lock().await;
        if let Err(e) = self.storage.clear_boxed().await {
            tracing::warn!(error = %e, "failed to clear durable session");
        }
    }

    /// Read the durable record; storage errors are logged and read as empty.
    pub async fn load_durable(&self) -> Option<PersistedSession> {
        match self.storage.load_boxed().await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load durable session");
                None
            }
        }
    }

    /// Adopt a durable record written elsewhere, if it supersedes the
    /// in-memory credential `expected` for the same user.
    pub fn adopt(&self, expected: &AccessToken, record: PersistedSession) -> bool {
        self.state.send_if_modified(|session| {
            let (Some(profile), Some(credential)) = (&session.profile, &session.credential) else {
                return false;
            };
            if &credential.access_token != expected
                || record.token == credential.access_token
                || record.profile.id != profile.id
                || record.expires_at <= credential.expires_at
            {
                return false;
            }
            *session = Session::from(record);
            true
        })
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
