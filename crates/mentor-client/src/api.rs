//! Wire types for the mentor backend API.
//!
//! Timestamps are kept as the strings the server sends; scheduling values
//! (intervals, ease, stability) are computed server-side and passed through.

use serde::{Deserialize, Serialize};

// ============================================================================
// Paths
// ============================================================================

/// Endpoint paths, relative to a candidate base address.
pub mod paths {
    pub const REGISTER: &str = "/auth/register";
    pub const LOGIN: &str = "/auth/login";
    pub const REFRESH: &str = "/auth/refresh";
    pub const ME: &str = "/auth/me";
    pub const PROFILE: &str = "/users/me";
    pub const PROVIDER_PREFERENCE: &str = "/users/preferences/provider";
    pub const PROVIDER_STATUS: &str = "/providers/status";
    pub const SESSIONS: &str = "/sessions";
    pub const CHAT_SEND: &str = "/chat/send";
    pub const CHAT_STREAM: &str = "/chat/stream";
    pub const DICTIONARY_LOOKUP: &str = "/dictionary/lookup";
    pub const FLASHCARDS: &str = "/flashcards";
    pub const FLASHCARDS_DUE: &str = "/flashcards/due";
    pub const REVIEWS: &str = "/reviews";
    pub const REVIEW_STATS: &str = "/reviews/stats";
    pub const REVIEW_HISTORY: &str = "/reviews/history";
    pub const STATS_OVERVIEW: &str = "/stats/overview";
    pub const ADMIN_USERS: &str = "/admin/users";
    pub const ADMIN_TIER_LIMITS: &str = "/admin/tier-limits";
}

/// `type` discriminators of chat stream payloads.
pub mod stream_kind {
    pub const CORRECTION: &str = "correction";
    pub const CHUNK: &str = "chunk";
    pub const DONE: &str = "done";
}

// ============================================================================
// Auth
// ============================================================================

/// Authenticated user snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub preferred_ai_provider: String,
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    pub is_admin: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Access/refresh token pair returned by login and refresh.
///
/// Fields default to empty so a response missing a token still decodes and
/// can be rejected by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenPair {
    /// Both tokens are present and non-blank.
    pub fn is_complete(&self) -> bool {
        !self.access_token.trim().is_empty() && !self.refresh_token.trim().is_empty()
    }
}

// ============================================================================
// Profile & Providers
// ============================================================================

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderPreferenceUpdate {
    pub preferred_ai_provider: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderStatus {
    pub default_provider: String,
    #[serde(default)]
    pub available_providers: Vec<String>,
}

// ============================================================================
// Conversations & Messages
// ============================================================================

/// A practice conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub topic: String,
    #[serde(default)]
    pub persona_prompt: Option<String>,
    #[serde(default)]
    pub cefr_level: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateConversationRequest {
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona_prompt: Option<String>,
    pub cefr_level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateConversationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cefr_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content_raw: Option<String>,
    #[serde(default)]
    pub content_corrected: Option<String>,
    pub content_final: String,
    #[serde(default)]
    pub meta_json: Option<serde_json::Value>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub created_at: String,
}

// ============================================================================
// Chat
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ChatSendRequest {
    pub session_id: String,
    pub text_raw: String,
}

/// Grammar correction applied to the user's message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectionMeta {
    #[serde(default)]
    pub changed: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
}

/// Non-streaming chat reply.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub user_message_id: String,
    pub corrected_text: String,
    #[serde(default)]
    pub correction_meta: CorrectionMeta,
    pub assistant_message_id: String,
    pub assistant_reply: String,
    pub provider_used: String,
    pub model_used: String,
    pub latency_ms: u64,
}

impl ChatResponse {
    /// The user and assistant messages this exchange added to the conversation.
    ///
    /// `created_at` is left empty; the server timestamps arrive with the next
    /// message listing.
    pub fn messages(&self, text_raw: &str) -> Vec<Message> {
        vec![
            Message {
                id: self.user_message_id.clone(),
                role: MessageRole::User,
                content_raw: Some(text_raw.to_string()),
                content_corrected: Some(self.corrected_text.clone()),
                content_final: self.corrected_text.clone(),
                meta_json: None,
                provider: Some(self.correction_meta.provider.clone()),
                model: Some(self.correction_meta.model.clone()),
                created_at: String::new(),
            },
            Message {
                id: self.assistant_message_id.clone(),
                role: MessageRole::Assistant,
                content_raw: None,
                content_corrected: None,
                content_final: self.assistant_reply.clone(),
                meta_json: None,
                provider: Some(self.provider_used.clone()),
                model: Some(self.model_used.clone()),
                created_at: String::new(),
            },
        ]
    }
}

// ============================================================================
// Analysis & Dictionary
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenInfo {
    pub token: String,
    #[serde(default)]
    pub lemma: Option<String>,
    #[serde(default)]
    pub pos: Option<String>,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisResponse {
    pub original_en: String,
    pub translation_pt: String,
    #[serde(default)]
    pub tokens: Vec<TokenInfo>,
}

// ============================================================================
// Flashcards & Reviews
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Flashcard {
    pub id: String,
    pub word: String,
    #[serde(default)]
    pub lemma: Option<String>,
    #[serde(default)]
    pub pos: Option<String>,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub context_sentence: Option<String>,
    pub next_review: String,
    pub interval_days: i64,
    pub repetitions: i64,
    pub ease_factor: f64,
    pub lapses: i64,
    #[serde(default)]
    pub stability: Option<f64>,
    #[serde(default)]
    pub difficulty: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewFlashcard {
    pub word: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lemma: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_sentence: Option<String>,
}

/// Recall rating for a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewRequest {
    pub flashcard_id: String,
    pub rating: Rating,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewResult {
    pub flashcard_id: String,
    pub rating: String,
    pub next_review: String,
    pub interval_days: i64,
    pub repetitions: i64,
    pub ease_factor: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewStats {
    pub total_cards: u64,
    pub due_now: u64,
    pub reviews_today: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyReviewStat {
    pub date: String,
    pub count: u64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressOverview {
    pub streak_days: u64,
    pub total_learned: u64,
    pub accuracy_rate: f64,
    pub reviews_today: u64,
    #[serde(default)]
    pub daily_history: Vec<DailyReviewStat>,
}

// ============================================================================
// Admin
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AdminUser {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub tier: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AdminUserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TierLimits {
    pub tier: String,
    pub daily_chat_limit: i64,
    pub daily_analysis_limit: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TierLimitsUpdate {
    pub daily_chat_limit: i64,
    pub daily_analysis_limit: i64,
}
