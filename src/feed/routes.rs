//! GET /api/feed

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::app::AppState;
use crate::error::ApiError;
use crate::profiles::FeedCard;

/// GET /api/feed
///
/// Agent-ready profiles with a stored agent id, newest first, as feed cards.
async fn list_feed(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let user = state.require_user(&headers).await?;
    let cards: Vec<FeedCard> = state
        .db
        .list_ready_profiles()
        .await?
        .iter()
        .filter(|p| p.is_callable())
        .map(FeedCard::from)
        .collect();
    tracing::debug!(user_id = %user.id, count = cards.len(), "Feed listed");
    Ok(Json(json!({ "profiles": cards })))
}

/// Build the feed routes.
pub fn feed_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/feed", get(list_feed))
        .with_state(state)
}
