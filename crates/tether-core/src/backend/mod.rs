//! Remote backend abstractions.
//!
//! - `IdentityBackend`: renews and revokes bearer credentials
//! - `AgentBackend`: accepts chat turns and streams agent events
//!
//! Each comes with a `Box*` wrapper for dynamic dispatch, since RPITIT
//! traits cannot be used as trait objects directly.

pub mod agent;
pub mod identity;

pub use agent::{AgentBackend, AgentEventStream, BoxAgentBackend};
pub use identity::{BoxIdentityBackend, IdentityBackend};
