//! Cached per-conversation message lists.
//!
//! `MessageListCache` is a concurrent map backed by `DashMap`. Values are
//! cloned on read so no guard is ever held across an `.await`.

use std::sync::Arc;

use dashmap::DashMap;
use tether_types::chat::ConversationId;

/// Drops cached message lists so the next view of a conversation refetches.
pub trait ConversationCache: Send + Sync {
    fn invalidate(&self, conversation_id: &ConversationId);
}

/// One message as shown in a conversation view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMessage {
    pub role: String,
    pub text: String,
}

impl CachedMessage {
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            text: text.into(),
        }
    }
}

/// In-memory message lists keyed by conversation.
///
/// Whoever renders conversation views fills it with `put` after fetching a
/// list; the chat controller only ever invalidates. A client without such
/// views (the CLI) leaves it empty, so invalidation is a no-op there.
///
/// Cloning produces a shared view of the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MessageListCache {
    inner: Arc<DashMap<ConversationId, Vec<CachedMessage>>>,
}

impl MessageListCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cloned copy of the cached list, or `None` if it must be fetched.
    pub fn get(&self, conversation_id: &ConversationId) -> Option<Vec<CachedMessage>> {
        self.inner.get(conversation_id).map(|r| r.value().clone())
    }

    pub fn put(&self, conversation_id: ConversationId, messages: Vec<CachedMessage>) {
        self.inner.insert(conversation_id, messages);
    }

    pub fn contains(&self, conversation_id: &ConversationId) -> bool {
        self.inner.contains_key(conversation_id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ConversationCache for MessageListCache {
    fn invalidate(&self, conversation_id: &ConversationId) {
        if self.inner.remove(conversation_id).is_some() {
            tracing::debug!(%conversation_id, "invalidated cached message list");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_returns_clone() {
        let cache = MessageListCache::new();
        let id = ConversationId::new("c-1");
        cache.put(id.clone(), vec![CachedMessage::new("user", "hi")]);

        let messages = cache.get(&id).unwrap();
        assert_eq!(messages, vec![CachedMessage::new("user", "hi")]);
        assert!(cache.contains(&id));
    }

    #[test]
    fn invalidate_removes_only_that_conversation() {
        let cache = MessageListCache::new();
        cache.put("c-1".into(), vec![CachedMessage::new("user", "a")]);
        cache.put("c-2".into(), vec![CachedMessage::new("user", "b")]);

        cache.invalidate(&"c-1".into());

        assert!(cache.get(&"c-1".into()).is_none());
        assert!(cache.get(&"c-2".into()).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_missing_entry_is_noop() {
        let cache = MessageListCache::new();
        cache.invalidate(&"nope".into());
        assert!(cache.is_empty());
    }

    #[test]
    fn clone_shares_entries() {
        let cache = MessageListCache::new();
        let other = cache.clone();
        other.put("c-1".into(), Vec::new());
        assert!(cache.contains(&"c-1".into()));
    }
}
