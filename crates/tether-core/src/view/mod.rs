//! View-side collaborators the session layer drives.
//!
//! The core never renders anything. It only asks a `Navigator` to move the
//! UI and tells a `ConversationCache` which message lists went stale.

pub mod cache;
pub mod navigator;

pub use cache::{CachedMessage, ConversationCache, MessageListCache};
pub use navigator::Navigator;
