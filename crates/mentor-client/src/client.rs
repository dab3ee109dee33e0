//! High-level client for the mentor backend.
//!
//! `MentorClient` wires the endpoint registry, session store, executor and
//! streaming client together. Authenticated calls read the bearer token from
//! the session store at call time.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::api::{
    AdminUser, AdminUserUpdate, AnalysisResponse, ChatResponse, ChatSendRequest, Conversation,
    CreateConversationRequest, DailyReviewStat, Flashcard, LoginRequest, Message, NewFlashcard,
    ProfileUpdate, ProgressOverview, ProviderPreferenceUpdate, ProviderStatus, Rating,
    RegisterRequest, ReviewRequest, ReviewResult, ReviewStats, TierLimits, TierLimitsUpdate,
    TokenInfo, TokenPair, UpdateConversationRequest, User, paths,
};
use crate::config::{ClientConfig, ConfigError};
use crate::endpoint::EndpointRegistry;
use crate::error::{ClientError, Result};
use crate::executor::RequestExecutor;
use crate::retry::RetryPolicy;
use crate::session::{FileSessionPersistence, SessionStore};
use crate::stream::{ChatEventStream, StreamingClient};
use crate::transport::{HttpTransport, Method, ReqwestTransport};

/// Default window for [`MentorClient::review_history`].
pub const DEFAULT_HISTORY_DAYS: u32 = 14;

/// Client for the mentor API.
#[derive(Clone)]
pub struct MentorClient {
    endpoints: EndpointRegistry,
    session: SessionStore,
    executor: RequestExecutor,
    streaming: StreamingClient,
}

impl MentorClient {
    pub fn new(
        endpoints: EndpointRegistry,
        transport: Arc<dyn HttpTransport>,
        session: SessionStore,
        policy: RetryPolicy,
    ) -> Self {
        let executor =
            RequestExecutor::new(endpoints.clone(), transport.clone(), session.clone(), policy);
        let streaming = StreamingClient::new(endpoints.clone(), transport);
        Self {
            endpoints,
            session,
            executor,
            streaming,
        }
    }

    /// Build a client with a reqwest transport and file-backed session.
    pub fn from_config(config: &ClientConfig) -> std::result::Result<Self, ConfigError> {
        let endpoints = config.endpoint_registry()?;
        let transport = ReqwestTransport::new(config.request_timeout())?;
        let session = SessionStore::open(Arc::new(FileSessionPersistence::new(
            config.session_path(),
        )));
        Ok(Self::new(
            endpoints,
            Arc::new(transport),
            session,
            config.retry_policy(),
        ))
    }

    pub fn endpoints(&self) -> &EndpointRegistry {
        &self.endpoints
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    // ----------------------------------------------------------------------------
    // Request helpers
    // ----------------------------------------------------------------------------

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let bearer = self.session.access_token().await;
        self.executor.execute(path, method, body, bearer).await
    }

    async fn call_no_content(&self, method: Method, path: &str) -> Result<()> {
        let bearer = self.session.access_token().await;
        self.executor
            .execute_no_content(path, method, None, bearer)
            .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.call(Method::GET, path, None).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.call(method, path, Some(serde_json::to_value(body)?))
            .await
    }

    // ----------------------------------------------------------------------------
    // Auth
    // ----------------------------------------------------------------------------

    pub async fn register(&self, full_name: &str, email: &str, password: &str) -> Result<User> {
        let body = serde_json::to_value(RegisterRequest {
            full_name: full_name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        })?;
        self.executor
            .execute(paths::REGISTER, Method::POST, Some(body), None)
            .await
    }

    /// Log in, store the token pair, then fetch and store the user.
    ///
    /// If the user cannot be fetched the session is cleared again.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let body = serde_json::to_value(LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let pair: TokenPair = self
            .executor
            .execute(paths::LOGIN, Method::POST, Some(body), None)
            .await?;
        if !pair.is_complete() {
            return Err(ClientError::Decode(
                "login response missing tokens".to_string(),
            ));
        }

        self.session
            .set_tokens(pair.access_token, pair.refresh_token)
            .await;
        let user = match self.me().await {
            Ok(user) => user,
            Err(e) => {
                self.session.clear().await;
                return Err(e);
            }
        };
        self.session.set_user(Some(user.clone())).await;
        info!(email = %user.email, "Logged in");
        Ok(user)
    }

    pub async fn me(&self) -> Result<User> {
        self.get(paths::ME).await
    }

    pub async fn logout(&self) {
        self.session.clear().await;
        info!("Logged out");
    }

    // ----------------------------------------------------------------------------
    // Profile & Providers
    // ----------------------------------------------------------------------------

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
        let user: User = self.send_json(Method::PATCH, paths::PROFILE, update).await?;
        self.session.set_user(Some(user.clone())).await;
        Ok(user)
    }

    pub async fn update_provider_preference(&self, provider: &str) -> Result<User> {
        let body = ProviderPreferenceUpdate {
            preferred_ai_provider: provider.to_string(),
        };
        let user: User = self
            .send_json(Method::PATCH, paths::PROVIDER_PREFERENCE, &body)
            .await?;
        self.session.set_user(Some(user.clone())).await;
        Ok(user)
    }

    pub async fn provider_status(&self) -> Result<ProviderStatus> {
        self.get(paths::PROVIDER_STATUS).await
    }

    // ----------------------------------------------------------------------------
    // Sessions
    // ----------------------------------------------------------------------------

    /// List conversations and refresh the cached list.
    pub async fn list_sessions(&self) -> Result<Vec<Conversation>> {
        let sessions: Vec<Conversation> = self.get(paths::SESSIONS).await?;
        self.session.set_conversations(sessions.clone()).await;
        Ok(sessions)
    }

    pub async fn create_session(
        &self,
        topic: &str,
        persona_prompt: Option<&str>,
        cefr_level: Option<&str>,
    ) -> Result<Conversation> {
        let body = CreateConversationRequest {
            topic: topic.to_string(),
            persona_prompt: persona_prompt.map(str::to_string),
            cefr_level: cefr_level.map(str::to_string),
        };
        self.send_json(Method::POST, paths::SESSIONS, &body).await
    }

    /// Fetch a conversation and make it the active one.
    pub async fn get_session(&self, session_id: &str) -> Result<Conversation> {
        let conversation: Conversation = self
            .get(&format!("{}/{}", paths::SESSIONS, session_id))
            .await?;
        self.session
            .set_active_conversation(Some(conversation.id.clone()))
            .await;
        Ok(conversation)
    }

    pub async fn update_session(
        &self,
        session_id: &str,
        update: &UpdateConversationRequest,
    ) -> Result<Conversation> {
        self.send_json(
            Method::PATCH,
            &format!("{}/{}", paths::SESSIONS, session_id),
            update,
        )
        .await
    }

    /// Delete a conversation and drop it from the cache.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.call_no_content(
            Method::DELETE,
            &format!("{}/{}", paths::SESSIONS, session_id),
        )
        .await?;
        self.session.forget_conversation(session_id).await;
        Ok(())
    }

    /// List a conversation's messages and refresh its cached history.
    pub async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let messages: Vec<Message> = self
            .get(&format!("{}/{}/messages", paths::SESSIONS, session_id))
            .await?;
        self.session
            .set_messages(session_id, messages.clone())
            .await;
        Ok(messages)
    }

    // ----------------------------------------------------------------------------
    // Chat
    // ----------------------------------------------------------------------------

    /// Send a message and append the exchange to the cached history.
    pub async fn send_chat(&self, session_id: &str, text_raw: &str) -> Result<ChatResponse> {
        let body = ChatSendRequest {
            session_id: session_id.to_string(),
            text_raw: text_raw.to_string(),
        };
        let response: ChatResponse = self.send_json(Method::POST, paths::CHAT_SEND, &body).await?;
        self.session
            .append_messages(session_id, response.messages(text_raw))
            .await;
        Ok(response)
    }

    /// Open the chat stream on the primary endpoint.
    pub async fn stream_chat(&self, session_id: &str, text_raw: &str) -> Result<ChatEventStream> {
        let body = serde_json::to_value(ChatSendRequest {
            session_id: session_id.to_string(),
            text_raw: text_raw.to_string(),
        })?;
        let bearer = self.session.access_token().await;
        self.streaming.open(paths::CHAT_STREAM, body, bearer).await
    }

    // ----------------------------------------------------------------------------
    // Analysis & Dictionary
    // ----------------------------------------------------------------------------

    pub async fn analyze_message(&self, message_id: &str) -> Result<AnalysisResponse> {
        self.call(
            Method::POST,
            &format!("/messages/{message_id}/analysis"),
            None,
        )
        .await
    }

    pub async fn lookup_word(&self, word: &str) -> Result<TokenInfo> {
        let query: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("word", word)
            .finish();
        self.get(&format!("{}?{}", paths::DICTIONARY_LOOKUP, query))
            .await
    }

    // ----------------------------------------------------------------------------
    // Flashcards & Reviews
    // ----------------------------------------------------------------------------

    pub async fn add_flashcard(&self, card: &NewFlashcard) -> Result<Flashcard> {
        self.send_json(Method::POST, paths::FLASHCARDS, card).await
    }

    pub async fn due_flashcards(&self) -> Result<Vec<Flashcard>> {
        self.get(paths::FLASHCARDS_DUE).await
    }

    pub async fn review_flashcard(&self, flashcard_id: &str, rating: Rating) -> Result<ReviewResult> {
        let body = ReviewRequest {
            flashcard_id: flashcard_id.to_string(),
            rating,
        };
        self.send_json(Method::POST, paths::REVIEWS, &body).await
    }

    pub async fn review_stats(&self) -> Result<ReviewStats> {
        self.get(paths::REVIEW_STATS).await
    }

    /// Daily review counts for the last `days` days.
    pub async fn review_history(&self, days: Option<u32>) -> Result<Vec<DailyReviewStat>> {
        let days = days.unwrap_or(DEFAULT_HISTORY_DAYS);
        self.get(&format!("{}?days={}", paths::REVIEW_HISTORY, days))
            .await
    }

    pub async fn progress_overview(&self) -> Result<ProgressOverview> {
        self.get(paths::STATS_OVERVIEW).await
    }

    // ----------------------------------------------------------------------------
    // Admin
    // ----------------------------------------------------------------------------

    pub async fn admin_list_users(&self) -> Result<Vec<AdminUser>> {
        self.get(paths::ADMIN_USERS).await
    }

    pub async fn admin_update_user(
        &self,
        user_id: &str,
        update: &AdminUserUpdate,
    ) -> Result<AdminUser> {
        self.send_json(
            Method::PATCH,
            &format!("{}/{}", paths::ADMIN_USERS, user_id),
            update,
        )
        .await
    }

    pub async fn admin_delete_user(&self, user_id: &str) -> Result<()> {
        self.call_no_content(
            Method::DELETE,
            &format!("{}/{}", paths::ADMIN_USERS, user_id),
        )
        .await
    }

    pub async fn admin_tier_limits(&self) -> Result<Vec<TierLimits>> {
        self.get(paths::ADMIN_TIER_LIMITS).await
    }

    pub async fn admin_update_tier_limits(
        &self,
        tier: &str,
        daily_chat_limit: i64,
        daily_analysis_limit: i64,
    ) -> Result<TierLimits> {
        let body = TierLimitsUpdate {
            daily_chat_limit,
            daily_analysis_limit,
        };
        self.send_json(
            Method::PUT,
            &format!("{}/{}", paths::ADMIN_TIER_LIMITS, tier),
            &body,
        )
        .await
    }
}
