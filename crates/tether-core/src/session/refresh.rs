//! Single-flight credential renewal.
//!
//! At most one renewal per token runs at a time. The first caller spawns it
//! and parks a `Shared` handle to its outcome in `slot`, tagged with the
//! token being renewed; callers arriving for that same token await the same
//! handle. A caller holding a different token (the user signed in again
//! while an old renewal was pending) starts its own renewal instead of
//! inheriting the old one's outcome. The spawned task clears the slot when
//! it settles, so the next trigger starts a fresh renewal.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::Mutex;

use tether_types::credential::{AccessToken, Credential};
use tether_types::event::SessionEvent;

use crate::backend::BoxIdentityBackend;
use crate::event::EventBus;
use crate::session::store::CredentialStore;

struct InFlight {
    generation: u64,
    token: AccessToken,
    outcome: Shared<BoxFuture<'static, bool>>,
}

/// Deduplicates concurrent renewal attempts.
pub struct RefreshCoordinator {
    store: Arc<CredentialStore>,
    identity: BoxIdentityBackend,
    events: EventBus,
    validity: chrono::Duration,
    slot: Mutex<Option<InFlight>>,
    generation: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<CredentialStore>,
        identity: BoxIdentityBackend,
        events: EventBus,
        validity: chrono::Duration,
    ) -> Self {
        Self {
            store,
            identity,
            events,
            validity,
            slot: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Renew whatever credential is current, or join its pending renewal.
    pub async fn refresh(self: &Arc<Self>) -> bool {
        match self.store.access_token() {
            Some(token) => self.renew(token).await,
            None => {
                tracing::debug!("no credential to renew");
                false
            }
        }
    }

    /// Renew `token`, or join the renewal of `token` already running.
    ///
    /// Every caller that overlaps one renewal of the same token gets the
    /// same result. `true` means `token` was replaced by a fresh credential;
    /// `false` means this token could not be renewed, including when the
    /// session no longer holds it. The renewal runs on its own task and
    /// finishes even if all callers are dropped.
    pub async fn renew(self: &Arc<Self>, token: AccessToken) -> bool {
        let outcome = {
            let mut slot = self.slot.lock().await;
            match slot.as_ref() {
                Some(in_flight) if in_flight.token == token => {
                    tracing::debug!(generation = in_flight.generation, "joining in-flight renewal");
                    in_flight.outcome.clone()
                }
                pending => {
                    if let Some(stale) = pending {
                        tracing::debug!(
                            generation = stale.generation,
                            "pending renewal is for a replaced credential; starting another"
                        );
                    }
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                    let this = Arc::clone(self);
                    let renewing = token.clone();
                    let task = tokio::spawn(async move {
                        let renewed = this.renew_once(renewing).await;
                        this.settle(generation).await;
                        renewed
                    });
                    let outcome = task.map(|joined| joined.unwrap_or(false)).boxed().shared();
                    *slot = Some(InFlight {
                        generation,
                        token,
                        outcome: outcome.clone(),
                    });
                    tracing::debug!(generation, "started renewal");
                    outcome
                }
            }
        };
        outcome.await
    }

    /// Whether a renewal is currently pending.
    pub async fn in_flight(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    async fn settle(&self, generation: u64) {
        let mut slot = self.slot.lock().await;
        if slot.as_ref().is_some_and(|f| f.generation == generation) {
            *slot = None;
        }
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn renew_once(&self, token: AccessToken) -> bool {
        if self.store.access_token().as_ref() != Some(&token) {
            tracing::debug!("credential replaced before renewal started");
            return false;
        }

        let renewed = match self.identity.renew(&token).await {
            Ok(renewed) => renewed,
            Err(e) => {
                tracing::warn!(error = %e, "credential renewal rejected");
                return false;
            }
        };
        if renewed.access_token.is_empty() {
            tracing::warn!("identity backend returned an empty token");
            return false;
        }

        let credential = Credential::issue(renewed.access_token, Utc::now(), self.validity);
        let expires_at = credential.expires_at;
        if !self.store.replace_credential(&token, credential) {
            tracing::info!("session changed while renewing; discarding renewed credential");
            return false;
        }
        self.store.persist().await;
        self.events
            .publish(SessionEvent::CredentialRenewed { expires_at });
        tracing::info!(%expires_at, "credential renewed");
        true
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tether_types::identity::UserProfile;
    use tether_types::session::Session;

    use super::*;
    use crate::test_support::{FakeIdentity, MemoryStorage};

    fn coordinator(identity: &FakeIdentity) -> (Arc<RefreshCoordinator>, Arc<CredentialStore>) {
        let store = Arc::new(CredentialStore::new(Arc::new(MemoryStorage::default())));
        store.install(Session::authenticated(
            UserProfile::new("u-1", "a@example.com"),
            Credential::issue("old".into(), Utc::now(), Duration::minutes(2)),
        ));
        let coordinator = Arc::new(RefreshCoordinator::new(
            store.clone(),
            identity.boxed(),
            EventBus::new(16),
            Duration::hours(24),
        ));
        (coordinator, store)
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_renewal() {
        let identity = FakeIdentity::gated();
        let (coordinator, store) = coordinator(&identity);

        let mut callers = Vec::new();
        for _ in 0..5 {
            let c = coordinator.clone();
            callers.push(tokio::spawn(async move { c.refresh().await }));
        }
        identity.wait_for_renew_calls(1).await;
        assert!(coordinator.in_flight().await);
        identity.release();

        for caller in callers {
            assert!(caller.await.unwrap());
        }
        assert_eq!(identity.renew_calls(), 1);
        assert_eq!(store.access_token().unwrap().expose(), "renewed-1");
        assert!(!coordinator.in_flight().await);
    }

    #[tokio::test]
    async fn failure_is_shared_by_all_joiners() {
        let identity = FakeIdentity::gated().failing_with_status(500);
        let (coordinator, store) = coordinator(&identity);

        let a = tokio::spawn({
            let c = coordinator.clone();
            async move { c.refresh().await }
        });
        let b = tokio::spawn({
            let c = coordinator.clone();
            async move { c.refresh().await }
        });
        identity.wait_for_renew_calls(1).await;
        identity.release();

        assert!(!a.await.unwrap());
        assert!(!b.await.unwrap());
        assert_eq!(identity.renew_calls(), 1);
        assert_eq!(store.access_token().unwrap().expose(), "old");
    }

    #[tokio::test]
    async fn slot_clears_so_next_trigger_starts_fresh() {
        let identity = FakeIdentity::immediate();
        let (coordinator, store) = coordinator(&identity);

        assert!(coordinator.refresh().await);
        assert!(coordinator.refresh().await);
        assert_eq!(identity.renew_calls(), 2);
        assert_eq!(store.access_token().unwrap().expose(), "renewed-2");
    }

    #[tokio::test]
    async fn renewed_credential_gets_full_validity() {
        let identity = FakeIdentity::immediate();
        let (coordinator, store) = coordinator(&identity);
        let before = Utc::now();

        assert!(coordinator.refresh().await);

        let credential = store.credential().unwrap();
        assert!(credential.expires_at >= before + Duration::hours(24));
        assert_eq!(credential.expires_at - credential.issued_at, Duration::hours(24));
    }

    #[tokio::test]
    async fn publishes_renewed_event_once() {
        let identity = FakeIdentity::immediate();
        let store = Arc::new(CredentialStore::new(Arc::new(MemoryStorage::default())));
        store.install(Session::authenticated(
            UserProfile::new("u-1", "a@example.com"),
            Credential::issue("old".into(), Utc::now(), Duration::minutes(2)),
        ));
        let events = EventBus::new(16);
        let mut rx = events.subscribe();
        let coordinator = Arc::new(RefreshCoordinator::new(
            store,
            identity.boxed(),
            events,
            Duration::hours(24),
        ));

        assert!(coordinator.refresh().await);
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::CredentialRenewed { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn without_credential_returns_false_without_calling_backend() {
        let identity = FakeIdentity::immediate();
        let (coordinator, store) = coordinator(&identity);
        store.take(None);

        assert!(!coordinator.refresh().await);
        assert_eq!(identity.renew_calls(), 0);
    }

    #[tokio::test]
    async fn renewal_that_outlives_logout_is_discarded() {
        let identity = FakeIdentity::gated();
        let storage = Arc::new(MemoryStorage::default());
        let store = Arc::new(CredentialStore::new(storage.clone()));
        store.install(Session::authenticated(
            UserProfile::new("u-1", "a@example.com"),
            Credential::issue("old".into(), Utc::now(), Duration::minutes(2)),
        ));
        let coordinator = Arc::new(RefreshCoordinator::new(
            store.clone(),
            identity.boxed(),
            EventBus::new(16),
            Duration::hours(24),
        ));

        let pending = tokio::spawn({
            let c = coordinator.clone();
            async move { c.refresh().await }
        });
        identity.wait_for_renew_calls(1).await;
        store.take(None);
        store.clear_durable().await;
        identity.release();

        assert!(!pending.await.unwrap());
        assert!(store.snapshot().is_empty());
        assert!(storage.stored().is_none());
    }

    #[tokio::test]
    async fn replaced_credential_does_not_join_stale_renewal() {
        let identity = FakeIdentity::gated();
        let (coordinator, store) = coordinator(&identity);

        let stale = tokio::spawn({
            let c = coordinator.clone();
            async move { c.refresh().await }
        });
        identity.wait_for_renew_calls(1).await;

        store.install(Session::authenticated(
            UserProfile::new("u-1", "a@example.com"),
            Credential::issue("fresh".into(), Utc::now(), Duration::minutes(2)),
        ));
        let fresh = tokio::spawn({
            let c = coordinator.clone();
            async move { c.refresh().await }
        });
        identity.wait_for_renew_calls(2).await;
        identity.release();

        assert!(!stale.await.unwrap());
        assert!(fresh.await.unwrap());
        assert_eq!(store.access_token().unwrap().expose(), "renewed-2");
    }

    #[tokio::test]
    async fn renewing_a_token_no_longer_held_skips_backend() {
        let identity = FakeIdentity::immediate();
        let (coordinator, _store) = coordinator(&identity);

        assert!(!coordinator.renew(AccessToken::new("someone-else")).await);
        assert_eq!(identity.renew_calls(), 0);
    }

    #[tokio::test]
    async fn dropped_callers_do_not_cancel_renewal() {
        let identity = FakeIdentity::gated();
        let (coordinator, store) = coordinator(&identity);

        let caller = tokio::spawn({
            let c = coordinator.clone();
            async move { c.refresh().await }
        });
        identity.wait_for_renew_calls(1).await;
        caller.abort();
        identity.release();

        // The spawned renewal still lands.
        while coordinator.in_flight().await {
            tokio::task::yield_now().await;
        }
        assert_eq!(store.access_token().unwrap().expose(), "renewed-1");
    }
}
