//! Session store: token pair, user snapshot and in-memory conversation cache.
//!
//! Every mutation replaces the whole session value and then writes the
//! persisted subset (tokens + user). The conversation cache lives only in
//! memory and is dropped on logout.

mod persist;

pub use persist::{
    DEFAULT_STATE_DIR, FileSessionPersistence, MemoryPersistence, SESSION_FILE, SessionPersistence,
};

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::api::{Conversation, Message, User};

// ============================================================================
// Session
// ============================================================================

/// Authentication state. Tokens are both present or both absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

impl Session {
    /// A session holding a token pair and no user yet.
    #[must_use]
    pub fn with_tokens(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access_token: Some(access.into()),
            refresh_token: Some(refresh.into()),
            user: None,
        }
    }

    /// True when both tokens are present.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.refresh_token.is_some()
    }

    /// Drop a half-present token pair.
    fn normalized(mut self) -> Self {
        if self.access_token.is_some() != self.refresh_token.is_some() {
            warn!("Discarding partial token pair");
            self.access_token = None;
            self.refresh_token = None;
        }
        self
    }
}

/// Cached domain collections. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct ConversationCache {
    pub conversations: Vec<Conversation>,
    pub active_conversation_id: Option<String>,
    pub messages_by_conversation: HashMap<String, Vec<Message>>,
}

struct StoreState {
    session: Session,
    cache: ConversationCache,
}

// ============================================================================
// SessionStore
// ============================================================================

/// Shared handle to the session state.
///
/// Cloning shares the same state; pass it to every component that needs the
/// bearer token instead of looking it up globally.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<RwLock<StoreState>>,
    persistence: Arc<dyn SessionPersistence>,
}

impl SessionStore {
    /// Open the store, restoring the persisted record if there is one.
    ///
    /// An unreadable record starts an empty session.
    pub fn open(persistence: Arc<dyn SessionPersistence>) -> Self {
        let session = match persistence.load() {
            Ok(Some(session)) => session.normalized(),
            Ok(None) => Session::default(),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable session record");
                Session::default()
            }
        };

        Self {
            state: Arc::new(RwLock::new(StoreState {
                session,
                cache: ConversationCache::default(),
            })),
            persistence,
        }
    }

    /// A store that persists nothing beyond the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::open(Arc::new(MemoryPersistence::new()))
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub async fn snapshot(&self) -> Session {
        self.state.read().await.session.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.session.access_token.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.state.read().await.session.refresh_token.clone()
    }

    pub async fn user(&self) -> Option<User> {
        self.state.read().await.session.user.clone()
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Replace the whole session.
    pub async fn replace(&self, session: Session) {
        let session = session.normalized();
        let mut state = self.state.write().await;
        state.session = session;
        self.persist(&state.session);
    }

    /// Replace the token pair, keeping the current user.
    pub async fn set_tokens(&self, access: impl Into<String>, refresh: impl Into<String>) {
        let mut state = self.state.write().await;
        state.session = Session {
            access_token: Some(access.into()),
            refresh_token: Some(refresh.into()),
            user: state.session.user.clone(),
        };
        self.persist(&state.session);
    }

    /// Replace the token pair only while the stored refresh token is still
    /// `expected`. Returns `false`, leaving the session untouched, when it
    /// was cleared or rotated in the meantime.
    pub async fn set_tokens_if(
        &self,
        expected: &str,
        access: impl Into<String>,
        refresh: impl Into<String>,
    ) -> bool {
        let mut state = self.state.write().await;
        if state.session.refresh_token.as_deref() != Some(expected) {
            return false;
        }
        state.session = Session {
            access_token: Some(access.into()),
            refresh_token: Some(refresh.into()),
            user: state.session.user.clone(),
        };
        self.persist(&state.session);
        true
    }

    /// Replace the user snapshot, keeping the current tokens.
    pub async fn set_user(&self, user: Option<User>) {
        let mut state = self.state.write().await;
        state.session = Session {
            user,
            ..state.session.clone()
        };
        self.persist(&state.session);
    }

    /// Log out: null every field and drop the conversation cache.
    ///
    /// Always succeeds in memory, even if the durable record cannot be written.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.session = Session::default();
        state.cache = ConversationCache::default();
        self.persist(&state.session);
        debug!("Session cleared");
    }

    fn persist(&self, session: &Session) {
        if let Err(e) = self.persistence.save(session) {
            warn!(error = %e, "Failed to persist session record");
        }
    }

    // ------------------------------------------------------------------------
    // Conversation cache
    // ------------------------------------------------------------------------

    pub async fn cache(&self) -> ConversationCache {
        self.state.read().await.cache.clone()
    }

    pub async fn set_conversations(&self, conversations: Vec<Conversation>) {
        self.state.write().await.cache.conversations = conversations;
    }

    pub async fn set_active_conversation(&self, conversation_id: Option<String>) {
        self.state.write().await.cache.active_conversation_id = conversation_id;
    }

    pub async fn set_messages(&self, conversation_id: &str, messages: Vec<Message>) {
        self.state
            .write()
            .await
            .cache
            .messages_by_conversation
            .insert(conversation_id.to_string(), messages);
    }

    pub async fn append_messages(&self, conversation_id: &str, messages: Vec<Message>) {
        self.state
            .write()
            .await
            .cache
            .messages_by_conversation
            .entry(conversation_id.to_string())
            .or_default()
            .extend(messages);
    }

    /// Drop a conversation and its messages from the cache.
    pub async fn forget_conversation(&self, conversation_id: &str) {
        let mut state = self.state.write().await;
        let cache = &mut state.cache;
        cache.conversations.retain(|c| c.id != conversation_id);
        cache.messages_by_conversation.remove(conversation_id);
        if cache.active_conversation_id.as_deref() == Some(conversation_id) {
            cache.active_conversation_id = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MessageRole;

    fn user() -> User {
        User {
            id: "u1".to_string(),
            full_name: "Ana Souza".to_string(),
            email: "ana@example.com".to_string(),
            preferred_ai_provider: "gemini".to_string(),
            tier: "free".to_string(),
            is_admin: false,
            created_at: "2025-01-01T00:00:00".to_string(),
        }
    }

    fn message(id: &str) -> Message {
        Message {
            id: id.to_string(),
            role: MessageRole::User,
            content_raw: Some("hi".to_string()),
            content_corrected: None,
            content_final: "hi".to_string(),
            meta_json: None,
            provider: None,
            model: None,
            created_at: "2025-01-01T00:00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn set_tokens_keeps_user_and_persists() {
        let persistence = Arc::new(MemoryPersistence::new());
        let store = SessionStore::open(persistence.clone());

        store.set_user(Some(user())).await;
        store.set_tokens("access-1", "refresh-1").await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.access_token.as_deref(), Some("access-1"));
        assert_eq!(snapshot.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(snapshot.user, Some(user()));
        assert_eq!(persistence.record(), Some(snapshot));
    }

    #[tokio::test]
    async fn restores_persisted_record() {
        let mut saved = Session::with_tokens("a", "r");
        saved.user = Some(user());
        let store = SessionStore::open(Arc::new(MemoryPersistence::with_record(saved.clone())));

        assert_eq!(store.snapshot().await, saved);
        assert!(store.snapshot().await.is_authenticated());
    }

    #[tokio::test]
    async fn partial_token_pair_is_discarded() {
        let partial = Session {
            access_token: Some("a".to_string()),
            refresh_token: None,
            user: Some(user()),
        };
        let store = SessionStore::open(Arc::new(MemoryPersistence::with_record(partial)));

        let snapshot = store.snapshot().await;
        assert!(snapshot.access_token.is_none());
        assert!(snapshot.refresh_token.is_none());
        assert_eq!(snapshot.user, Some(user()));
    }

    #[tokio::test]
    async fn clear_always_nulls_everything() {
        let persistence = Arc::new(MemoryPersistence::new());
        let store = SessionStore::open(persistence.clone());
        store.set_tokens("a", "r").await;
        store.set_user(Some(user())).await;
        store.set_active_conversation(Some("c1".to_string())).await;
        store.set_messages("c1", vec![message("m1")]).await;

        store.clear().await;

        assert_eq!(store.snapshot().await, Session::default());
        let cache = store.cache().await;
        assert!(cache.conversations.is_empty());
        assert!(cache.active_conversation_id.is_none());
        assert!(cache.messages_by_conversation.is_empty());
        assert_eq!(persistence.record(), Some(Session::default()));

        // Clearing an empty session is still a full reset.
        store.clear().await;
        assert_eq!(store.snapshot().await, Session::default());
    }

    #[tokio::test]
    async fn clear_succeeds_when_persistence_fails() {
        struct Broken;
        impl SessionPersistence for Broken {
            fn load(&self) -> crate::error::Result<Option<Session>> {
                Ok(Some(Session::with_tokens("a", "r")))
            }
            fn save(&self, _: &Session) -> crate::error::Result<()> {
                Err(crate::error::ClientError::Persistence("disk full".to_string()))
            }
        }

        let store = SessionStore::open(Arc::new(Broken));
        assert!(store.snapshot().await.is_authenticated());
        store.clear().await;
        assert_eq!(store.snapshot().await, Session::default());
    }

    #[tokio::test]
    async fn set_tokens_if_requires_expected_refresh_token() {
        let persistence = Arc::new(MemoryPersistence::new());
        let store = SessionStore::open(persistence.clone());
        store.set_tokens("a1", "r1").await;

        assert!(!store.set_tokens_if("r0", "a2", "r2").await);
        assert_eq!(store.access_token().await.as_deref(), Some("a1"));

        assert!(store.set_tokens_if("r1", "a2", "r2").await);
        assert_eq!(store.refresh_token().await.as_deref(), Some("r2"));

        store.clear().await;
        assert!(!store.set_tokens_if("r2", "a3", "r3").await);
        assert_eq!(store.snapshot().await, Session::default());
        assert_eq!(persistence.record(), Some(Session::default()));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = SessionStore::in_memory();
        let other = store.clone();
        other.set_tokens("a", "r").await;
        assert_eq!(store.access_token().await.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn append_and_forget_messages() {
        let store = SessionStore::in_memory();
        store.set_messages("c1", vec![message("m1")]).await;
        store.append_messages("c1", vec![message("m2")]).await;
        store.set_active_conversation(Some("c1".to_string())).await;

        let cache = store.cache().await;
        let ids: Vec<_> = cache.messages_by_conversation["c1"]
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["m1", "m2"]);

        store.forget_conversation("c1").await;
        let cache = store.cache().await;
        assert!(cache.messages_by_conversation.is_empty());
        assert!(cache.active_conversation_id.is_none());
    }
}
