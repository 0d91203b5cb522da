//! LLM integration for VoiceDate.
//!
//! Supports:
//! - **Anthropic**: Direct API access via rig-core
//! - **OpenAI**: Direct API access via rig-core
//!
//! The service only needs single-shot text completion (system preamble plus
//! one user prompt), exposed through the [`LlmProvider`] trait so handlers
//! and tests never touch rig types.

use std::sync::Arc;

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::{anthropic, openai};
use secrecy::ExposeSecret;

use crate::error::LlmError;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

impl LlmBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// Single-shot text completion.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn model_name(&self) -> &str;

    /// Complete `prompt` under the `system` preamble and return the text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let client = match config.backend {
        LlmBackend::Anthropic => {
            let client: rig::client::Client<anthropic::client::AnthropicExt> =
                anthropic::Client::new(config.api_key.expose_secret())
                    .map_err(|e| client_error(config.backend, e))?;
            RigClient::Anthropic(client)
        }
        LlmBackend::OpenAi => {
            let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
                openai::Client::new(config.api_key.expose_secret())
                    .map_err(|e| client_error(config.backend, e))?;
            RigClient::OpenAi(client)
        }
    };

    tracing::info!(backend = config.backend.as_str(), model = %config.model, "LLM provider ready");
    Ok(Arc::new(RigProvider {
        client,
        model: config.model.clone(),
    }))
}

fn client_error(backend: LlmBackend, e: impl std::fmt::Display) -> LlmError {
    LlmError::RequestFailed {
        provider: backend.as_str().to_string(),
        reason: format!("Failed to create client: {e}"),
    }
}

enum RigClient {
    Anthropic(rig::client::Client<anthropic::client::AnthropicExt>),
    OpenAi(rig::client::Client<openai::client::OpenAIResponsesExt>),
}

/// rig-core backed provider.
pub struct RigProvider {
    client: RigClient,
    model: String,
}

#[async_trait]
impl LlmProvider for RigProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let (provider, result) = match &self.client {
            RigClient::Anthropic(client) => {
                let agent = client.agent(&self.model).preamble(system).build();
                ("anthropic", agent.prompt(prompt.to_string()).await)
            }
            RigClient::OpenAi(client) => {
                let agent = client.agent(&self.model).preamble(system).build();
                ("openai", agent.prompt(prompt.to_string()).await)
            }
        };

        result.map_err(|e| LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: e.to_string(),
        })
    }
}
