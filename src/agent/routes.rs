//! POST /api/agent/create

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use super::prompt::{AgentPromptVariables, generate_agent_prompt, generate_default_first_message};
use crate::app::AppState;
use crate::error::ApiError;
use crate::profiles::UserProfile;
use crate::provisioning::ProvisionKind;
use crate::voice::AgentSpec;

const DEFAULT_LANGUAGE: &str = "en";
const ANONYMOUS: &str = "Anonymous";

/// Optional JSON body.
#[derive(Debug, Default, Deserialize)]
struct CreateAgentBody {
    /// Only a string counts; any other JSON type falls back to the default.
    #[serde(rename = "firstMessage", default)]
    first_message: Option<Value>,
    #[serde(default)]
    language: Option<String>,
}

impl CreateAgentBody {
    fn parse(raw: &[u8]) -> Result<Self, ApiError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(raw).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))
    }

    fn language(&self) -> String {
        self.language
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_string()
    }

    /// The caller's greeting, trimmed, or the templated default.
    fn first_message(&self, display_name: &str) -> Result<String, ApiError> {
        match self.first_message.as_ref().and_then(Value::as_str) {
            Some(supplied) if !supplied.is_empty() => {
                let trimmed = supplied.trim();
                if trimmed.is_empty() {
                    return Err(ApiError::bad_request("First message cannot be empty"));
                }
                Ok(trimmed.to_string())
            }
            _ => Ok(generate_default_first_message(display_name)),
        }
    }
}

fn display_name(profile: &UserProfile) -> &str {
    match profile.display_name.trim() {
        "" => ANONYMOUS,
        name => name,
    }
}

/// Check the profile is ready for an agent and build its system prompt.
fn agent_prompt(profile: &UserProfile) -> Result<String, ApiError> {
    let profile_prompt = profile.user_profile_prompt.as_deref().unwrap_or_default();
    if profile_prompt.trim().is_empty() {
        return Err(ApiError::bad_request(
            "User profile prompt is required. Please complete your profile setup.",
        ));
    }
    let preferences_prompt = profile
        .user_preferences_prompt
        .as_deref()
        .unwrap_or_default();
    if preferences_prompt.trim().is_empty() {
        return Err(ApiError::bad_request(
            "User preferences prompt is required. Please complete your profile setup.",
        ));
    }

    Ok(generate_agent_prompt(AgentPromptVariables {
        user_profile_prompt: profile_prompt,
        user_preferences_prompt: preferences_prompt,
        user_important_notes: profile.user_important_notes.as_deref(),
    })?)
}

/// POST /api/agent/create
///
/// Body (optional): `{"firstMessage"?: string, "language"?: string}`.
/// Builds the system prompt from the caller's profile, creates the agent
/// with the caller's cloned voice and marks the profile agent-ready.
async fn create_agent(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let user = state.require_user(&headers).await?;

    let profile = state.db.get_profile(&user.id).await?.ok_or_else(|| {
        ApiError::not_found("User profile not found. Please complete profile setup first.")
    })?;
    let voice_id = profile
        .voice_id()
        .ok_or_else(|| {
            ApiError::bad_request("Voice clone not found. Please create a voice clone first.")
        })?
        .to_string();
    let prompt = agent_prompt(&profile)?;

    let body = CreateAgentBody::parse(&body)?;
    let name = display_name(&profile);
    let spec = AgentSpec {
        name: format!("{name}'s Agent"),
        voice_id,
        prompt,
        first_message: body.first_message(name)?,
        language: body.language(),
    };

    let platform = state.voice_platform()?;
    let key = state.ledger.begin(&user.id, ProvisionKind::Agent).await?;

    let created = match platform.create_agent(&spec).await {
        Ok(created) => created,
        Err(e) => {
            error!(user_id = %user.id, error = %e, "Agent creation failed");
            state.ledger.failed(key, &e.to_string()).await;
            return Err(e.into());
        }
    };
    let Some(agent_id) = created.agent_id.clone() else {
        error!(user_id = %user.id, response = %created.raw, "Agent created but no agent_id in response");
        state.ledger.failed(key, "agent id missing from response").await;
        return Err(ApiError::internal("Agent created but failed to retrieve agent ID"));
    };
    state.ledger.created(key, &agent_id).await;

    match state.db.set_cloned_agent(&user.id, &agent_id).await {
        Ok(true) => state.ledger.persisted(key).await,
        Ok(false) => warn!(
            user_id = %user.id,
            agent_id = %agent_id,
            "Profile vanished before agent id was stored; left for reconciliation"
        ),
        Err(e) => error!(
            user_id = %user.id,
            agent_id = %agent_id,
            error = %e,
            "Error updating profile with agent_id"
        ),
    }

    info!(user_id = %user.id, agent_id = %agent_id, "Agent ready");
    Ok(Json(json!({
        "success": true,
        "agent_id": agent_id,
        "agent": created.raw,
    })))
}

/// Build the agent routes.
pub fn agent_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/agent/create", post(create_agent))
        .with_state(state)
}
