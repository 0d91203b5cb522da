//! ElevenLabs client: voices, conversational agents, transcripts and music.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use super::platform::{
    AgentSpec, AudioStream, ConversationTranscript, CreatedAgent, VoiceClone, VoiceCloneRequest,
    VoicePlatform,
};
use crate::config::VoiceConfig;
use crate::error::VendorError;

const VENDOR: &str = "elevenlabs";

/// ElevenLabs REST client.
pub struct ElevenLabs {
    api_key: SecretString,
    base_url: String,
    client: reqwest::Client,
}

impl ElevenLabs {
    pub fn new(config: &VoiceConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, VendorError> {
        let resp = request
            .header("xi-api-key", self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| VendorError::RequestFailed {
                vendor: VENDOR.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(api_error(status.as_u16(), &body))
    }

    async fn json(&self, request: reqwest::RequestBuilder) -> Result<Value, VendorError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| invalid_response(e.to_string()))
    }
}

/// Transcript path for `conversation_id`. Ids are opaque tokens of ASCII
/// letters, digits, `_` and `-`; anything else would escape the path segment.
fn conversation_path(conversation_id: &str) -> Result<String, VendorError> {
    let valid = !conversation_id.is_empty()
        && conversation_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if !valid {
        return Err(VendorError::RequestFailed {
            vendor: VENDOR.to_string(),
            reason: format!("invalid conversation id: {conversation_id:?}"),
        });
    }
    Ok(format!("/v1/convai/conversations/{conversation_id}"))
}

fn invalid_response(reason: impl Into<String>) -> VendorError {
    VendorError::InvalidResponse {
        vendor: VENDOR.to_string(),
        reason: reason.into(),
    }
}

/// Build an API error from a non-2xx body.
///
/// Surfaces `detail.message` or a string `detail` when the body carries one.
fn api_error(status: u16, body: &str) -> VendorError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned());
    let message = match detail {
        Some(Value::String(s)) => s,
        Some(Value::Object(obj)) => match obj.get("message").and_then(|m| m.as_str()) {
            Some(m) => m.to_string(),
            None => Value::Object(obj).to_string(),
        },
        Some(other) => other.to_string(),
        None if body.trim().is_empty() => format!("ElevenLabs API error: {status}"),
        None => format!("ElevenLabs API error: {status} {}", body.trim()),
    };
    VendorError::Api { status, message }
}

/// Body for `POST /v1/convai/agents/create`.
fn agent_body(spec: &AgentSpec) -> Value {
    json!({
        "name": spec.name,
        "conversation_config": {
            "agent": {
                "prompt": { "prompt": spec.prompt },
                "first_message": spec.first_message,
                "language": spec.language,
            },
            "tts": { "voice_id": spec.voice_id },
        }
    })
}

#[async_trait]
impl VoicePlatform for ElevenLabs {
    async fn create_voice_clone(&self, request: VoiceCloneRequest) -> Result<VoiceClone, VendorError> {
        let mut form = Form::new().text("name", request.name.clone());
        if let Some(description) = request.description {
            form = form.text("description", description);
        }
        for sample in request.samples {
            let mut part = Part::bytes(sample.data.to_vec()).file_name(sample.file_name);
            if let Some(content_type) = sample.content_type.as_deref() {
                part = part
                    .mime_str(content_type)
                    .map_err(|e| VendorError::RequestFailed {
                        vendor: VENDOR.to_string(),
                        reason: format!("Invalid audio content type: {e}"),
                    })?;
            }
            form = form.part("files", part);
        }

        let raw = self
            .json(self.client.post(self.api_url("/v1/voices/add")).multipart(form))
            .await?;
        let voice_id = raw
            .get("voice_id")
            .and_then(|v| v.as_str())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| invalid_response("voice_id missing from response"))?
            .to_string();
        let requires_verification = raw
            .get("requires_verification")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        tracing::info!(voice_id = %voice_id, name = %request.name, "Voice clone created");
        Ok(VoiceClone {
            voice_id,
            requires_verification,
            raw,
        })
    }

    async fn create_agent(&self, spec: &AgentSpec) -> Result<CreatedAgent, VendorError> {
        let raw = self
            .json(
                self.client
                    .post(self.api_url("/v1/convai/agents/create"))
                    .json(&agent_body(spec)),
            )
            .await?;
        let created = CreatedAgent::from_response(raw);
        tracing::info!(agent_id = ?created.agent_id, name = %spec.name, "Agent created");
        Ok(created)
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<ConversationTranscript, VendorError> {
        let path = conversation_path(conversation_id)?;
        let raw = self.json(self.client.get(self.api_url(&path))).await?;
        serde_json::from_value(raw).map_err(|e| invalid_response(e.to_string()))
    }

    async fn stream_music(&self, prompt: &str, length_ms: u32) -> Result<AudioStream, VendorError> {
        let resp = self
            .send(
                self.client
                    .post(self.api_url("/v1/music/stream"))
                    .json(&json!({ "prompt": prompt, "music_length_ms": length_ms })),
            )
            .await?;

        Ok(resp
            .bytes_stream()
            .map(|chunk| {
                chunk.map_err(|e| VendorError::RequestFailed {
                    vendor: VENDOR.to_string(),
                    reason: e.to_string(),
                })
            })
            .boxed())
    }
}
