//! POST /api/onboarding/analyze

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use super::analyzer::OnboardingAnswers;
use crate::app::AppState;
use crate::auth::optional_user;
use crate::error::ApiError;
use crate::profiles::OnboardingUpsert;

#[derive(Debug, Default, Deserialize)]
struct AnalyzeBody {
    #[serde(rename = "conversationId", default)]
    conversation_id: Option<Value>,
    #[serde(rename = "userInfo", default)]
    user_info: Option<OnboardingAnswers>,
}

impl AnalyzeBody {
    /// A non-empty string or a number; anything else counts as missing.
    fn conversation_id(&self) -> Option<String> {
        match self.conversation_id.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A trimmed, non-empty answer.
fn answered(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Best-effort transcript fetch. Failures are logged and yield `None`.
async fn fetch_transcript(state: &AppState, conversation_id: &str) -> Option<String> {
    let Some(platform) = state.voice.as_ref() else {
        debug!(conversation_id, "No voice platform configured; skipping transcript");
        return None;
    };
    match platform.get_conversation(conversation_id).await {
        Ok(conversation) => Some(conversation.to_text()).filter(|t| !t.is_empty()),
        Err(e) => {
            warn!(conversation_id, error = %e, "Could not fetch transcript");
            None
        }
    }
}

/// POST /api/onboarding/analyze
///
/// Body: `{"conversationId": string, "userInfo": {name, age, gender, lookingFor}}`.
/// Returns the generated profile text; when a valid bearer token is present
/// the caller's profile is upserted and marked onboarded.
async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let body: AnalyzeBody = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?;
    let conversation_id = body
        .conversation_id()
        .ok_or_else(|| ApiError::bad_request("Missing conversation ID"))?;
    let answers = body.user_info.unwrap_or_default();

    let transcript = fetch_transcript(&state, &conversation_id).await;
    let prompts = state
        .analyzer
        .analyze(&answers, transcript.as_deref())
        .await
        .map_err(|e| {
            error!(conversation_id = %conversation_id, error = %e, "Analysis error");
            ApiError::internal("Internal server error")
        })?;

    if let Some(user) = optional_user(state.auth.as_ref(), &headers).await {
        let upsert = OnboardingUpsert {
            user_id: user.id.clone(),
            display_name: answered(answers.name.as_deref()),
            age: answers.age_years(),
            gender: answered(answers.gender.as_deref()),
            prompts: prompts.clone(),
        };
        match state.db.upsert_onboarding(&upsert).await {
            Ok(()) => info!(user_id = %user.id, "Onboarding profile saved"),
            Err(e) => error!(user_id = %user.id, error = %e, "Failed to save onboarding profile"),
        }
    }

    Ok(Json(json!({
        "success": true,
        "user_profile_prompt": prompts.user_profile_prompt,
        "user_preferences_prompt": prompts.user_preferences_prompt,
        "user_important_notes": prompts.user_important_notes,
    })))
}

/// Build the onboarding routes.
pub fn onboarding_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/onboarding/analyze", post(analyze))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: Value) -> AnalyzeBody {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn conversation_id_variants() {
        assert_eq!(
            parse(json!({"conversationId": "conv_1"})).conversation_id().as_deref(),
            Some("conv_1")
        );
        assert_eq!(parse(json!({"conversationId": 42})).conversation_id().as_deref(), Some("42"));
        assert!(parse(json!({"conversationId": ""})).conversation_id().is_none());
        assert!(parse(json!({"conversationId": null})).conversation_id().is_none());
        assert!(parse(json!({})).conversation_id().is_none());
    }

    #[test]
    fn blank_answers_are_absent() {
        assert_eq!(answered(Some("  Sam ")).as_deref(), Some("Sam"));
        assert!(answered(Some("   ")).is_none());
        assert!(answered(None).is_none());
    }

    #[test]
    fn user_info_is_optional() {
        let body = parse(json!({"conversationId": "c"}));
        assert!(body.user_info.is_none());
    }
}
