//! POST /api/voice/clone

use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use super::platform::{AudioSample, VoiceCloneRequest};
use crate::app::AppState;
use crate::error::ApiError;
use crate::provisioning::ProvisionKind;

/// Upload cap for voice samples.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Default)]
struct CloneForm {
    name: Option<String>,
    description: Option<String>,
    samples: Vec<AudioSample>,
}

async fn read_form(mut multipart: Multipart) -> Result<CloneForm, ApiError> {
    let mut form = CloneForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "audio" => {
                let file_name = field.file_name().unwrap_or("sample.webm").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                // Browsers send an empty part for an unselected file input.
                if !data.is_empty() {
                    form.samples.push(AudioSample {
                        file_name,
                        content_type,
                        data,
                    });
                }
            }
            "name" | "description" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                if name == "name" {
                    form.name = Some(text);
                } else if !text.is_empty() {
                    form.description = Some(text);
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

/// POST /api/voice/clone
///
/// Multipart body: `audio` (one or more files), `name`, optional
/// `description`. Registers the voice with the platform and stores its id on
/// the caller's profile with a consent timestamp.
async fn clone_voice(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let user = state.require_user(&headers).await?;
    let multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let form = read_form(multipart).await?;

    if form.samples.is_empty() {
        return Err(ApiError::bad_request("Missing audio files"));
    }
    let name = form.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(ApiError::bad_request("Missing voice name"));
    }

    let platform = state.voice_platform()?;
    let key = state.ledger.begin(&user.id, ProvisionKind::VoiceClone).await?;

    let request = VoiceCloneRequest {
        name: name.to_string(),
        description: form.description,
        samples: form.samples,
    };
    let clone = match platform.create_voice_clone(request).await {
        Ok(clone) => clone,
        Err(e) => {
            error!(user_id = %user.id, error = %e, "Voice clone failed");
            state.ledger.failed(key, &e.to_string()).await;
            return Err(e.into());
        }
    };
    state.ledger.created(key, &clone.voice_id).await;

    match state
        .db
        .set_cloned_voice(&user.id, &clone.voice_id, Utc::now())
        .await
    {
        Ok(true) => state.ledger.persisted(key).await,
        Ok(false) => warn!(
            user_id = %user.id,
            voice_id = %clone.voice_id,
            "No profile row for voice clone; left for reconciliation"
        ),
        Err(e) => error!(
            user_id = %user.id,
            voice_id = %clone.voice_id,
            error = %e,
            "Error updating profile with voice_id"
        ),
    }

    info!(user_id = %user.id, voice_id = %clone.voice_id, "Voice clone stored");
    Ok(Json(json!({
        "success": true,
        "voice_id": clone.voice_id,
        "voice": clone.raw,
    })))
}

/// Build the voice routes.
pub fn voice_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/voice/clone",
            post(clone_voice).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .with_state(state)
}
