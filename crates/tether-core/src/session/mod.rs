//! Session state and its maintenance.
//!
//! - `CredentialStore`: the one canonical in-memory session and its durable copy
//! - `RefreshCoordinator`: single-flight credential renewal
//! - `SessionManager`: login/logout, expiry sweep, auto-refresh

pub mod manager;
pub mod refresh;
pub mod store;

pub use manager::{SessionManager, SweepOutcome};
pub use refresh::RefreshCoordinator;
pub use store::CredentialStore;
