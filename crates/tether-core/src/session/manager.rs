//! Session lifecycle: login, logout, renewal and the periodic timers.
//!
//! `SessionManager` is the single source of truth for whether the user is
//! authenticated. Every failure-driven logout (expiry, failed renewal, a
//! second 401) funnels through `end_session`, which only acts on the session
//! that actually failed, so concurrent failures produce one revoke, one
//! `LoggedOut` event and one navigation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use tether_types::config::SessionSettings;
use tether_types::credential::{AccessToken, Credential};
use tether_types::event::{LogoutReason, SessionEvent};
use tether_types::identity::UserProfile;
use tether_types::session::Session;
use tether_types::view::{NavTarget, Surface};

use crate::backend::BoxIdentityBackend;
use crate::event::EventBus;
use crate::repository::DynCredentialStorage;
use crate::session::refresh::RefreshCoordinator;
use crate::session::store::CredentialStore;
use crate::view::Navigator;

/// What one timer tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// No credential is held.
    Anonymous,
    /// Credential is outside the renewal buffer.
    Healthy,
    /// Credential is inside the buffer; a background renewal was started.
    RefreshStarted,
    /// Renewal completed in-line.
    Renewed,
    /// The session was ended.
    LoggedOut,
}

/// Owns the session and drives its transitions.
pub struct SessionManager {
    store: Arc<CredentialStore>,
    refresher: Arc<RefreshCoordinator>,
    identity: BoxIdentityBackend,
    navigator: Arc<dyn Navigator>,
    events: EventBus,
    settings: SessionSettings,
}

impl SessionManager {
    pub fn new(
        storage: DynCredentialStorage,
        identity: BoxIdentityBackend,
        navigator: Arc<dyn Navigator>,
        events: EventBus,
        settings: SessionSettings,
    ) -> Self {
        let store = Arc::new(CredentialStore::new(storage));
        let refresher = Arc::new(RefreshCoordinator::new(
            store.clone(),
            identity.clone(),
            events.clone(),
            settings.token_validity(),
        ));
        Self {
            store,
            refresher,
            identity,
            navigator,
            events,
            settings,
        }
    }

    // -- synchronous reads ---------------------------------------------------

    pub fn snapshot(&self) -> Session {
        self.store.snapshot()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.store.profile()
    }

    pub fn credential(&self) -> Option<Credential> {
        self.store.credential()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.store.subscribe()
    }

    /// The canonical credential store.
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Whether a renewal is currently pending.
    pub async fn refresh_in_flight(&self) -> bool {
        self.refresher.in_flight().await
    }

    // -- lifecycle -----------------------------------------------------------

    /// Hydrate from durable storage. An already expired record is logged out
    /// straight away.
    pub async fn restore(&self) -> bool {
        let Some(record) = self.store.load_durable().await else {
            tracing::debug!("no stored session");
            return false;
        };
        let session = Session::from(record);
        let expired = session
            .credential
            .as_ref()
            .is_some_and(|c| c.is_expired(Utc::now()));
        let token = session.access_token().cloned();
        self.store.install(session);

        if expired {
            tracing::info!("stored credential already expired");
            self.end_session(LogoutReason::Expired, token.as_ref()).await;
            return false;
        }
        tracing::debug!("restored stored session");
        true
    }

    /// Start a session with a freshly issued token.
    pub async fn login(&self, token: AccessToken, profile: UserProfile) {
        let credential = Credential::issue(token, Utc::now(), self.settings.token_validity());
        let user_id = profile.id.clone();
        self.store.install(Session::authenticated(profile, credential));
        self.store.persist().await;
        tracing::info!(%user_id, "logged in");
        self.events.publish(SessionEvent::LoggedIn { user_id });
    }

    /// User-initiated logout. Always clears everything, even when no session
    /// is held.
    pub async fn logout(&self) {
        self.end_session(LogoutReason::UserInitiated, None).await;
    }

    /// Renew through the single-flight coordinator. A failed renewal ends
    /// the session only while it still holds the token that failed to renew.
    pub async fn refresh_token(&self) -> bool {
        let Some(token) = self.store.access_token() else {
            return false;
        };
        if self.refresher.renew(token.clone()).await {
            return true;
        }
        if self.store.access_token().as_ref() != Some(&token) {
            tracing::debug!("session moved on during a failed renewal; keeping it");
            return false;
        }
        self.end_session(LogoutReason::RenewalFailed, Some(&token)).await;
        false
    }

    /// The single credential read path for outgoing calls.
    ///
    /// Starts from the in-memory session and adopts a durable copy when
    /// another process renewed the same user's credential more recently.
    pub async fn resolve_credential(&self) -> Option<Credential> {
        let current = self.store.credential()?;
        if let Some(record) = self.store.load_durable().await {
            if self.store.adopt(&current.access_token, record) {
                tracing::debug!("adopted newer stored credential");
            }
        }
        self.store.credential()
    }

    /// End the session for `reason`.
    ///
    /// With `expected` set, only a session still holding that token is
    /// ended; a session that is already gone makes this a no-op. With
    /// `None` everything is cleared unconditionally.
    pub async fn end_session(&self, reason: LogoutReason, expected: Option<&AccessToken>) -> bool {
        let taken = self.store.take(expected);
        if expected.is_some() && taken.is_none() {
            tracing::debug!(%reason, "session already ended");
            return false;
        }

        self.store.clear_durable().await;

        if let Some(token) = taken.as_ref().and_then(|s| s.access_token()) {
            if let Err(e) = self.identity.revoke(token).await {
                tracing::warn!(error = %e, "failed to revoke credential");
            }
        }

        tracing::info!(%reason, "logged out");
        self.events.publish(SessionEvent::LoggedOut { reason });

        match self.navigator.current_surface() {
            Surface::Privileged => {
                tracing::debug!("privileged view keeps its own redirect");
            }
            Surface::Standard => self.navigator.navigate(NavTarget::Landing),
        }
        true
    }

    // -- timers --------------------------------------------------------------

    /// One tick of the expiry sweep.
    pub async fn sweep(self: &Arc<Self>, now: DateTime<Utc>) -> SweepOutcome {
        let Some(credential) = self.store.credential() else {
            return SweepOutcome::Anonymous;
        };

        if credential.is_expired(now) {
            self.end_session(LogoutReason::Expired, Some(&credential.access_token))
                .await;
            return SweepOutcome::LoggedOut;
        }

        if credential.within_buffer(now, self.settings.renewal_buffer()) {
            if let Some(expires_at) = self.store.mark_expiring_soon() {
                tracing::info!(%expires_at, "credential expiring soon");
                self.events.publish(SessionEvent::ExpiringSoon { expires_at });
            }
            let this = Arc::clone(self);
            tokio::spawn(async move {
                this.refresh_token().await;
            });
            return SweepOutcome::RefreshStarted;
        }

        SweepOutcome::Healthy
    }

    /// One tick of the auto-refresh timer. Joins a pending renewal rather
    /// than starting another; does nothing outside the renewal buffer.
    pub async fn auto_refresh(&self, now: DateTime<Utc>) -> SweepOutcome {
        let Some(credential) = self.store.credential() else {
            return SweepOutcome::Anonymous;
        };
        if !credential.within_buffer(now, self.settings.renewal_buffer()) {
            return SweepOutcome::Healthy;
        }
        if self.refresh_token().await {
            SweepOutcome::Renewed
        } else {
            SweepOutcome::LoggedOut
        }
    }

    /// Run the sweep and auto-refresh timers until `cancel` fires.
    pub fn spawn_background(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut sweep = tokio::time::interval(this.settings.sweep_interval());
            sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut auto = tokio::time::interval(this.settings.auto_refresh_interval());
            auto.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval completes immediately; the
            // sweep covers startup.
            auto.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sweep.tick() => {
                        this.sweep(Utc::now()).await;
                    }
                    _ = auto.tick() => {
                        this.auto_refresh(Utc::now()).await;
                    }
                }
            }
            tracing::debug!("session timers stopped");
        })
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("store", &self.store)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
