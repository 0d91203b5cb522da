//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

/// Default ElevenLabs API origin.
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";

/// Default model used for music prompt generation.
pub const DEFAULT_LLM_MODEL: &str = "claude-sonnet-4-20250514";

/// Default model when the OpenAI backend is selected.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Auth provider (Supabase) connection settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Service role key sent as the `apikey` header.
    pub service_key: SecretString,
}

/// Voice platform (ElevenLabs) settings.
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub api_key: SecretString,
    pub base_url: String,
}

/// Service configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub db_path: PathBuf,
    /// Directory for daily-rolling log files. Logs go to stderr only when unset.
    pub log_dir: Option<PathBuf>,
    pub auth: AuthConfig,
    /// `None` when `ELEVENLABS_API_KEY` is absent; dependent endpoints return 500.
    pub voice: Option<VoiceConfig>,
    /// `None` when `LLM_API_KEY` is absent; music generation returns 500.
    pub llm: Option<LlmConfig>,
    /// How often the provisioning reconciler runs.
    pub reconcile_interval: Duration,
}

impl AppConfig {
    /// Build the configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("VOICEDATE_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "VOICEDATE_PORT".into(),
                message: format!("'{raw}' is not a valid port"),
            })?,
            None => 8080,
        };

        let db_path = get("VOICEDATE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/voicedate.db"));

        let auth = AuthConfig {
            url: get("SUPABASE_URL")
                .ok_or_else(|| ConfigError::MissingEnvVar("SUPABASE_URL".into()))?
                .trim_end_matches('/')
                .to_string(),
            service_key: SecretString::from(
                get("SUPABASE_SERVICE_ROLE_KEY")
                    .ok_or_else(|| ConfigError::MissingEnvVar("SUPABASE_SERVICE_ROLE_KEY".into()))?,
            ),
        };

        let voice = get("ELEVENLABS_API_KEY").map(|key| VoiceConfig {
            api_key: SecretString::from(key),
            base_url: get("ELEVENLABS_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ELEVENLABS_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        });

        let backend = match get("VOICEDATE_LLM_BACKEND").as_deref() {
            None | Some("anthropic") => LlmBackend::Anthropic,
            Some("openai") => LlmBackend::OpenAi,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "VOICEDATE_LLM_BACKEND".into(),
                    message: format!("unknown backend '{other}' (expected anthropic or openai)"),
                });
            }
        };
        let llm = get("LLM_API_KEY").map(|key| LlmConfig {
            backend,
            api_key: SecretString::from(key),
            model: get("VOICEDATE_LLM_MODEL").unwrap_or_else(|| match backend {
                LlmBackend::Anthropic => DEFAULT_LLM_MODEL.to_string(),
                LlmBackend::OpenAi => DEFAULT_OPENAI_MODEL.to_string(),
            }),
        });

        let reconcile_secs: u64 = get("VOICEDATE_RECONCILE_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Ok(Self {
            port,
            db_path,
            log_dir: get("VOICEDATE_LOG_DIR").map(PathBuf::from),
            auth,
            voice,
            llm,
            reconcile_interval: Duration::from_secs(reconcile_secs.max(1)),
        })
    }
}
