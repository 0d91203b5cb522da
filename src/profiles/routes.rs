//! REST endpoints for reading and editing the caller's profile.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use super::model::{MAX_PHOTO_URL_LEN, ProfileDetails, UserProfile};
use crate::app::AppState;
use crate::error::ApiError;

const PROFILE_NOT_FOUND: &str = "User profile not found";

/// GET /api/profile
async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state.require_user(&headers).await?;
    let profile = state
        .db
        .get_profile(&user.id)
        .await?
        .ok_or_else(|| ApiError::not_found(PROFILE_NOT_FOUND))?;
    Ok(Json(profile))
}

/// PUT /api/profile
///
/// Body: `{location_city?, location_region?, profile_photo_url?}`. All three
/// fields are written on every save; omitted or blank ones are cleared.
async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ProfileDetails>, JsonRejection>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state.require_user(&headers).await?;
    let Json(details) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let details = details.normalized();

    if details
        .profile_photo_url
        .as_ref()
        .is_some_and(|url| url.len() > MAX_PHOTO_URL_LEN)
    {
        return Err(ApiError::bad_request("Profile photo URL is too long"));
    }

    if !state.db.update_profile_details(&user.id, &details).await? {
        return Err(ApiError::not_found(PROFILE_NOT_FOUND));
    }
    info!(user_id = %user.id, "Profile details updated");

    let profile = state
        .db
        .get_profile(&user.id)
        .await?
        .ok_or_else(|| ApiError::not_found(PROFILE_NOT_FOUND))?;
    Ok(Json(profile))
}

/// Build the profile routes.
pub fn profile_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/profile", get(get_profile).put(update_profile))
        .with_state(state)
}
