//! `VoicePlatform` trait and the request/response types it exchanges.

use async_trait::async_trait;
use axum::body::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::VendorError;

/// Audio bytes streamed back from the platform.
pub type AudioStream = BoxStream<'static, Result<Bytes, VendorError>>;

/// One uploaded audio sample.
#[derive(Debug, Clone)]
pub struct AudioSample {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Request to register a cloned voice.
#[derive(Debug, Clone)]
pub struct VoiceCloneRequest {
    pub name: String,
    pub description: Option<String>,
    pub samples: Vec<AudioSample>,
}

/// A voice registered on the platform.
#[derive(Debug, Clone, Serialize)]
pub struct VoiceClone {
    pub voice_id: String,
    pub requires_verification: bool,
    /// The platform's full response body.
    pub raw: serde_json::Value,
}

/// Parameters for a new conversational agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSpec {
    pub name: String,
    pub voice_id: String,
    pub prompt: String,
    pub first_message: String,
    pub language: String,
}

/// Result of agent creation.
///
/// `agent_id` is `None` when the platform answered 2xx without an id.
#[derive(Debug, Clone)]
pub struct CreatedAgent {
    pub agent_id: Option<String>,
    pub raw: serde_json::Value,
}

impl CreatedAgent {
    /// Read the id from `agent_id`, falling back to `id`.
    pub fn from_response(raw: serde_json::Value) -> Self {
        let agent_id = ["agent_id", "id"]
            .iter()
            .filter_map(|key| raw.get(*key).and_then(|v| v.as_str()))
            .find(|id| !id.is_empty())
            .map(str::to_string);
        Self { agent_id, raw }
    }
}

/// One turn of a recorded conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub role: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// A recorded conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConversationTranscript {
    #[serde(default)]
    pub transcript: Vec<TranscriptTurn>,
}

impl ConversationTranscript {
    /// Render as `role: message` lines.
    pub fn to_text(&self) -> String {
        self.transcript
            .iter()
            .map(|t| format!("{}: {}", t.role, t.message.as_deref().unwrap_or_default()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Voice cloning, conversational agents, transcripts and music generation.
#[async_trait]
pub trait VoicePlatform: Send + Sync {
    /// Register a voice from one or more samples.
    async fn create_voice_clone(&self, request: VoiceCloneRequest) -> Result<VoiceClone, VendorError>;

    /// Create an agent that speaks with `spec.voice_id`.
    async fn create_agent(&self, spec: &AgentSpec) -> Result<CreatedAgent, VendorError>;

    /// Fetch the transcript of a finished conversation.
    async fn get_conversation(&self, conversation_id: &str) -> Result<ConversationTranscript, VendorError>;

    /// Generate `length_ms` of music for `prompt`, streamed as MPEG audio.
    async fn stream_music(&self, prompt: &str, length_ms: u32) -> Result<AudioStream, VendorError>;
}
