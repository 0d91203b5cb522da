//! Shared handler state and the top-level router.

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::agent::agent_routes;
use crate::auth::{self, AuthProvider, AuthUser};
use crate::error::ApiError;
use crate::feed::feed_routes;
use crate::llm::LlmProvider;
use crate::music::music_routes;
use crate::onboarding::{ProfileAnalyzer, TemplateAnalyzer, onboarding_routes};
use crate::profiles::profile_routes;
use crate::provisioning::Ledger;
use crate::store::Database;
use crate::voice::{VoicePlatform, voice_routes};

/// State shared by every route group.
///
/// Vendor and LLM clients are optional: requests that need an absent client
/// fail with 500 instead of refusing to start.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub auth: Arc<dyn AuthProvider>,
    pub voice: Option<Arc<dyn VoicePlatform>>,
    pub llm: Option<Arc<dyn LlmProvider>>,
    pub analyzer: Arc<dyn ProfileAnalyzer>,
    pub ledger: Ledger,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            ledger: Ledger::new(Arc::clone(&db)),
            db,
            auth,
            voice: None,
            llm: None,
            analyzer: Arc::new(TemplateAnalyzer),
        }
    }

    pub fn with_voice(mut self, voice: Arc<dyn VoicePlatform>) -> Self {
        self.voice = Some(voice);
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn ProfileAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Resolve the bearer token or fail with 401.
    pub async fn require_user(&self, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
        Ok(auth::require_user(self.auth.as_ref(), headers).await?)
    }

    /// The voice platform, or 500 when no API key is configured.
    pub fn voice_platform(&self) -> Result<Arc<dyn VoicePlatform>, ApiError> {
        self.voice
            .clone()
            .ok_or_else(|| ApiError::internal("Missing ElevenLabs API key"))
    }
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": "voicedate" }))
}

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(voice_routes(state.clone()))
        .merge(agent_routes(state.clone()))
        .merge(onboarding_routes(state.clone()))
        .merge(music_routes(state.clone()))
        .merge(profile_routes(state.clone()))
        .merge(feed_routes(state))
        .layer(CorsLayer::permissive())
}
