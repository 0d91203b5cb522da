//! POST /api/music/stream

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use tracing::{error, info};

use super::{MUSIC_DURATION_MS, MUSIC_SYSTEM_PROMPT, clean_music_prompt, music_request};
use crate::app::AppState;
use crate::error::ApiError;
use crate::profiles::model::non_blank;

/// POST /api/music/stream
///
/// Streams a 30 second MPEG track generated from the caller's profile prompt.
async fn stream_music(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let user = state.require_user(&headers).await?;

    let profile = state
        .db
        .get_profile(&user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User profile not found"))?;
    let profile_prompt = non_blank(profile.user_profile_prompt.as_deref()).ok_or_else(|| {
        ApiError::bad_request("Missing profile data. Complete onboarding to unlock music generation.")
    })?;

    let llm = state
        .llm
        .clone()
        .ok_or_else(|| ApiError::internal("Missing LLM credentials"))?;
    let reply = llm
        .complete(MUSIC_SYSTEM_PROMPT, &music_request(profile_prompt))
        .await
        .map_err(|e| {
            error!(user_id = %user.id, error = %e, "Music prompt generation failed");
            ApiError::from(e)
        })?;
    let brief = clean_music_prompt(&reply)
        .ok_or_else(|| ApiError::internal("Failed to generate music prompt"))?;

    let platform = state.voice_platform()?;
    let stream = platform
        .stream_music(&brief, MUSIC_DURATION_MS)
        .await
        .map_err(|e| {
            error!(user_id = %user.id, error = %e, "Music stream error");
            ApiError::from(e)
        })?;

    info!(user_id = %user.id, model = llm.model_name(), "Streaming profile music");
    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("audio/mpeg")),
            (CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// Build the music routes.
pub fn music_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/music/stream", post(stream_music))
        .with_state(state)
}
