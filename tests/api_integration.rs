//! Integration tests for the HTTP API.
//!
//! Each test spins up the full Axum app on a random port with an in-memory
//! database and stub auth / voice platform / LLM collaborators, then drives
//! it over real HTTP with reqwest.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use futures::StreamExt;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use voicedate::agent::generate_default_first_message;
use voicedate::app::{AppState, app};
use voicedate::auth::{AuthProvider, AuthUser};
use voicedate::error::{AuthError, LlmError, VendorError};
use voicedate::llm::LlmProvider;
use voicedate::profiles::UserProfile;
use voicedate::provisioning::{ProvisionState, reconcile_once};
use voicedate::store::{Database, LibSqlBackend};
use voicedate::voice::{
    AgentSpec, AudioStream, ConversationTranscript, CreatedAgent, TranscriptTurn, VoiceClone,
    VoiceCloneRequest, VoicePlatform,
};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const SAM: &str = "token-sam";

/// Accepts `token-<name>` and resolves it to `user-<name>`.
struct StubAuth;

#[async_trait]
impl AuthProvider for StubAuth {
    async fn get_user(&self, token: &str) -> Result<AuthUser, AuthError> {
        match token.strip_prefix("token-") {
            Some(name) if !name.is_empty() => Ok(AuthUser {
                id: format!("user-{name}"),
                email: Some(format!("{name}@example.com")),
            }),
            _ => Err(AuthError::InvalidToken),
        }
    }
}

/// Stub voice platform that records what it was asked to create.
#[derive(Default)]
struct StubVoice {
    fail: AtomicBool,
    omit_agent_id: AtomicBool,
    agents: Mutex<Vec<AgentSpec>>,
    clones: Mutex<Vec<(String, usize)>>,
}

impl StubVoice {
    fn vendor_failure() -> VendorError {
        VendorError::Api {
            status: 422,
            message: "Quota exceeded".into(),
        }
    }
}

#[async_trait]
impl VoicePlatform for StubVoice {
    async fn create_voice_clone(&self, request: VoiceCloneRequest) -> Result<VoiceClone, VendorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Self::vendor_failure());
        }
        self.clones
            .lock()
            .unwrap()
            .push((request.name.clone(), request.samples.len()));
        Ok(VoiceClone {
            voice_id: "voice-123".into(),
            requires_verification: false,
            raw: json!({"voice_id": "voice-123", "requires_verification": false}),
        })
    }

    async fn create_agent(&self, spec: &AgentSpec) -> Result<CreatedAgent, VendorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Self::vendor_failure());
        }
        self.agents.lock().unwrap().push(spec.clone());
        if self.omit_agent_id.load(Ordering::SeqCst) {
            return Ok(CreatedAgent::from_response(json!({"status": "created"})));
        }
        Ok(CreatedAgent::from_response(json!({"agent_id": "agent-456"})))
    }

    async fn get_conversation(&self, _id: &str) -> Result<ConversationTranscript, VendorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Self::vendor_failure());
        }
        Ok(ConversationTranscript {
            transcript: vec![TranscriptTurn {
                role: "user".into(),
                message: Some("I love hiking".into()),
            }],
        })
    }

    async fn stream_music(&self, _prompt: &str, _length_ms: u32) -> Result<AudioStream, VendorError> {
        let chunks: Vec<Result<Bytes, VendorError>> = vec![
            Ok(Bytes::from_static(b"ID3")),
            Ok(Bytes::from_static(b"mpeg-frames")),
        ];
        Ok(futures::stream::iter(chunks).boxed())
    }
}

/// Stub LLM returning a fixed reply.
struct StubLlm(&'static str);

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
        Ok(self.0.to_string())
    }
}

struct TestApp {
    base: String,
    client: reqwest::Client,
    db: Arc<dyn Database>,
    voice: Arc<StubVoice>,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn insert(&self, profile: UserProfile) {
        self.db.insert_profile(&profile).await.unwrap();
    }

    async fn profile(&self, user_id: &str) -> Option<UserProfile> {
        self.db.get_profile(user_id).await.unwrap()
    }
}

async fn serve(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;
    format!("http://127.0.0.1:{port}")
}

/// Full app: stub voice platform and an LLM replying with `llm_reply`.
async fn start_app_with(llm_reply: Option<&'static str>) -> TestApp {
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let voice = Arc::new(StubVoice::default());
    let mut state = AppState::new(Arc::clone(&db), Arc::new(StubAuth)).with_voice(voice.clone());
    if let Some(reply) = llm_reply {
        state = state.with_llm(Arc::new(StubLlm(reply)));
    }
    TestApp {
        base: serve(state).await,
        client: reqwest::Client::new(),
        db,
        voice,
    }
}

async fn start_app() -> TestApp {
    start_app_with(Some("Warm acoustic folk at 90 BPM with fingerpicked guitar.")).await
}

fn ready_for_agent(user_id: &str, name: &str) -> UserProfile {
    let mut p = UserProfile::new(user_id, name);
    p.user_profile_prompt = Some("Loves hiking".into());
    p.user_preferences_prompt = Some("Outdoorsy partner".into());
    p.cloned_voice_id = Some("v1".into());
    p
}

async fn error_of(resp: reqwest::Response) -> (StatusCode, String) {
    let status = resp.status();
    let body: Value = resp.json().await.unwrap();
    (status, body["error"].as_str().unwrap_or_default().to_string())
}

fn audio_part() -> Part {
    Part::bytes(vec![0u8, 1, 2, 3, 4, 5])
        .file_name("sample.webm")
        .mime_str("audio/webm")
        .unwrap()
}

// ── Health ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        let body: Value = app
            .client
            .get(app.url("/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, json!({"status": "ok", "service": "voicedate"}));
    })
    .await
    .expect("test timed out");
}

// ── Agent creation ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_agent_create_requires_bearer() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;

        let resp = app.client.post(app.url("/api/agent/create")).send().await.unwrap();
        assert_eq!(
            error_of(resp).await,
            (
                StatusCode::UNAUTHORIZED,
                "Unauthorized - Missing or invalid authorization header".to_string()
            )
        );

        let resp = app
            .client
            .post(app.url("/api/agent/create"))
            .bearer_auth("garbage")
            .send()
            .await
            .unwrap();
        assert_eq!(
            error_of(resp).await,
            (StatusCode::UNAUTHORIZED, "Unauthorized - Invalid token".to_string())
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_agent_create_without_profile_is_404() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        let resp = app
            .client
            .post(app.url("/api/agent/create"))
            .bearer_auth(SAM)
            .send()
            .await
            .unwrap();
        assert_eq!(
            error_of(resp).await,
            (
                StatusCode::NOT_FOUND,
                "User profile not found. Please complete profile setup first.".to_string()
            )
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_agent_create_without_voice_is_400() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        let mut profile = ready_for_agent("user-sam", "Sam");
        profile.cloned_voice_id = None;
        app.insert(profile).await;

        let resp = app
            .client
            .post(app.url("/api/agent/create"))
            .bearer_auth(SAM)
            .send()
            .await
            .unwrap();
        assert_eq!(
            error_of(resp).await,
            (
                StatusCode::BAD_REQUEST,
                "Voice clone not found. Please create a voice clone first.".to_string()
            )
        );
        assert!(app.voice.agents.lock().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_agent_create_without_preferences_is_400() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        let mut profile = ready_for_agent("user-sam", "Sam");
        profile.user_preferences_prompt = None;
        app.insert(profile).await;

        let resp = app
            .client
            .post(app.url("/api/agent/create"))
            .bearer_auth(SAM)
            .send()
            .await
            .unwrap();
        assert_eq!(
            error_of(resp).await,
            (
                StatusCode::BAD_REQUEST,
                "User preferences prompt is required. Please complete your profile setup."
                    .to_string()
            )
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_agent_create_with_no_body_uses_defaults() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        app.insert(ready_for_agent("user-sam", "Sam")).await;

        let resp = app
            .client
            .post(app.url("/api/agent/create"))
            .bearer_auth(SAM)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["agent_id"], "agent-456");
        assert_eq!(body["agent"]["agent_id"], "agent-456");

        let spec = app.voice.agents.lock().unwrap()[0].clone();
        assert_eq!(spec.name, "Sam's Agent");
        assert_eq!(spec.voice_id, "v1");
        assert_eq!(spec.language, "en");
        assert_eq!(spec.first_message, generate_default_first_message("Sam"));
        assert!(spec.prompt.contains("Loves hiking"));
        assert!(spec.prompt.contains("Outdoorsy partner"));
        assert!(spec.prompt.contains("No additional notes."));

        let profile = app.profile("user-sam").await.unwrap();
        assert_eq!(profile.cloned_agent_id.as_deref(), Some("agent-456"));
        assert!(profile.agent_ready);

        let persisted = app.db.list_provisions(ProvisionState::Persisted).await.unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].resource_id.as_deref(), Some("agent-456"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_agent_create_with_custom_greeting() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        app.insert(ready_for_agent("user-sam", "Sam")).await;

        let resp = app
            .client
            .post(app.url("/api/agent/create"))
            .bearer_auth(SAM)
            .json(&json!({"firstMessage": "  Hola!  ", "language": "es"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let spec = app.voice.agents.lock().unwrap()[0].clone();
        assert_eq!(spec.first_message, "Hola!");
        assert_eq!(spec.language, "es");

        let resp = app
            .client
            .post(app.url("/api/agent/create"))
            .bearer_auth(SAM)
            .json(&json!({"firstMessage": "   "}))
            .send()
            .await
            .unwrap();
        assert_eq!(
            error_of(resp).await,
            (StatusCode::BAD_REQUEST, "First message cannot be empty".to_string())
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_agent_create_vendor_failure_is_500() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        app.insert(ready_for_agent("user-sam", "Sam")).await;
        app.voice.fail.store(true, Ordering::SeqCst);

        let resp = app
            .client
            .post(app.url("/api/agent/create"))
            .bearer_auth(SAM)
            .send()
            .await
            .unwrap();
        assert_eq!(
            error_of(resp).await,
            (StatusCode::INTERNAL_SERVER_ERROR, "Quota exceeded".to_string())
        );

        let failed = app.db.list_provisions(ProvisionState::Failed).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert!(!app.profile("user-sam").await.unwrap().agent_ready);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_agent_create_without_agent_id_is_500() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        app.insert(ready_for_agent("user-sam", "Sam")).await;
        app.voice.omit_agent_id.store(true, Ordering::SeqCst);

        let resp = app
            .client
            .post(app.url("/api/agent/create"))
            .bearer_auth(SAM)
            .send()
            .await
            .unwrap();
        assert_eq!(
            error_of(resp).await,
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Agent created but failed to retrieve agent ID".to_string()
            )
        );
    })
    .await
    .expect("test timed out");
}

// ── Voice clone ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_voice_clone_without_audio_is_400_even_with_name() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        let form = Form::new().text("name", "Sam's voice");

        let resp = app
            .client
            .post(app.url("/api/voice/clone"))
            .bearer_auth(SAM)
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(
            error_of(resp).await,
            (StatusCode::BAD_REQUEST, "Missing audio files".to_string())
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_voice_clone_without_name_is_400() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        let form = Form::new().text("name", "   ").part("audio", audio_part());

        let resp = app
            .client
            .post(app.url("/api/voice/clone"))
            .bearer_auth(SAM)
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(
            error_of(resp).await,
            (StatusCode::BAD_REQUEST, "Missing voice name".to_string())
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_voice_clone_requires_bearer() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        let form = Form::new().text("name", "Sam").part("audio", audio_part());

        let resp = app
            .client
            .post(app.url("/api/voice/clone"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_voice_clone_stores_voice_id() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        app.insert(UserProfile::new("user-sam", "Sam")).await;
        let form = Form::new()
            .text("name", "  Sam's voice ")
            .text("description", "Warm baritone")
            .part("audio", audio_part())
            .part("audio", audio_part());

        let resp = app
            .client
            .post(app.url("/api/voice/clone"))
            .bearer_auth(SAM)
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["voice_id"], "voice-123");
        assert_eq!(body["voice"]["voice_id"], "voice-123");

        assert_eq!(
            *app.voice.clones.lock().unwrap(),
            vec![("Sam's voice".to_string(), 2usize)]
        );

        let profile = app.profile("user-sam").await.unwrap();
        assert_eq!(profile.cloned_voice_id.as_deref(), Some("voice-123"));
        assert!(profile.voice_cloning_consent);
        assert!(profile.voice_cloning_consent_at.is_some());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_voice_clone_without_profile_is_repaired_later() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        let form = Form::new().text("name", "Sam").part("audio", audio_part());

        // No profile row yet: the vendor voice exists, the handler still
        // reports success.
        let resp = app
            .client
            .post(app.url("/api/voice/clone"))
            .bearer_auth(SAM)
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let created = app.db.list_provisions(ProvisionState::Created).await.unwrap();
        assert_eq!(created.len(), 1);

        app.insert(UserProfile::new("user-sam", "Sam")).await;
        let report = reconcile_once(app.db.as_ref()).await.unwrap();
        assert_eq!(report.repaired, 1);
        assert_eq!(
            app.profile("user-sam").await.unwrap().cloned_voice_id.as_deref(),
            Some("voice-123")
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_voice_clone_without_platform_is_500() {
    timeout(TEST_TIMEOUT, async {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let base = serve(AppState::new(db, Arc::new(StubAuth))).await;
        let form = Form::new().text("name", "Sam").part("audio", audio_part());

        let resp = reqwest::Client::new()
            .post(format!("{base}/api/voice/clone"))
            .bearer_auth(SAM)
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(
            error_of(resp).await,
            (StatusCode::INTERNAL_SERVER_ERROR, "Missing ElevenLabs API key".to_string())
        );
    })
    .await
    .expect("test timed out");
}

// ── Onboarding ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_onboarding_requires_conversation_id() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        let resp = app
            .client
            .post(app.url("/api/onboarding/analyze"))
            .json(&json!({"userInfo": {"name": "Sam"}}))
            .send()
            .await
            .unwrap();
        assert_eq!(
            error_of(resp).await,
            (StatusCode::BAD_REQUEST, "Missing conversation ID".to_string())
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_onboarding_anonymous_returns_text_only() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        // Transcript fetch failing is tolerated.
        app.voice.fail.store(true, Ordering::SeqCst);

        let resp = app
            .client
            .post(app.url("/api/onboarding/analyze"))
            .json(&json!({
                "conversationId": "conv_1",
                "userInfo": {"name": "Sam", "age": 29, "gender": "male", "lookingFor": "women"}
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert!(body["user_profile_prompt"].as_str().unwrap().contains("Name: Sam"));
        assert!(body["user_preferences_prompt"].as_str().unwrap().contains("Looking for: women"));
        assert!(body["user_important_notes"].as_str().unwrap().starts_with("Notes:"));

        assert!(app.profile("user-sam").await.is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_onboarding_authenticated_upserts_profile() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;

        let resp = app
            .client
            .post(app.url("/api/onboarding/analyze"))
            .bearer_auth(SAM)
            .json(&json!({
                "conversationId": "conv_1",
                "userInfo": {"name": "Sam", "age": "29", "gender": "male", "lookingFor": "women"}
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();

        let profile = app.profile("user-sam").await.unwrap();
        assert!(profile.onboarding_completed);
        assert_eq!(profile.display_name, "Sam");
        assert_eq!(profile.age, Some(29));
        assert_eq!(profile.gender.as_deref(), Some("male"));
        assert_eq!(
            profile.user_profile_prompt.as_deref(),
            body["user_profile_prompt"].as_str()
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_onboarding_without_user_info_keeps_name() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;

        for body in [
            json!({"conversationId": "conv_1", "userInfo": {"name": "Sam", "gender": "male"}}),
            json!({"conversationId": "conv_2"}),
        ] {
            let resp = app
                .client
                .post(app.url("/api/onboarding/analyze"))
                .bearer_auth(SAM)
                .json(&body)
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let profile = app.profile("user-sam").await.unwrap();
        assert_eq!(profile.display_name, "Sam");
        assert_eq!(profile.gender.as_deref(), Some("male"));
    })
    .await
    .expect("test timed out");
}

// ── Feed ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_feed_lists_ready_profiles_newest_first() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        let now = chrono::Utc::now();

        let mut older = UserProfile::new("user-ana", "Ana");
        older.created_at = now - chrono::Duration::hours(2);
        older.agent_ready = true;
        older.cloned_agent_id = Some("agent-ana".into());
        older.onboarding_tags = vec!["Adventurer".into()];

        let mut newer = UserProfile::new("user-bo", "Bo");
        newer.created_at = now - chrono::Duration::hours(1);
        newer.agent_ready = true;
        newer.cloned_agent_id = Some("agent-bo".into());
        newer.bio = Some("x".repeat(120));

        let not_ready = UserProfile::new("user-cy", "Cy");

        let mut no_agent = UserProfile::new("user-di", "Di");
        no_agent.agent_ready = true;
        no_agent.cloned_agent_id = Some("  ".into());

        app.insert(older).await;
        app.insert(newer).await;
        app.insert(not_ready).await;
        app.insert(no_agent).await;

        let body: Value = app
            .client
            .get(app.url("/api/feed"))
            .bearer_auth(SAM)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let profiles = body["profiles"].as_array().unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0]["display_name"], "Bo");
        assert_eq!(profiles[0]["tag"], "New here");
        assert_eq!(
            profiles[0]["bio_excerpt"],
            format!("\"{}...\"", "x".repeat(100))
        );
        assert_eq!(profiles[1]["display_name"], "Ana");
        assert_eq!(profiles[1]["tag"], "Adventurer");
        assert_eq!(profiles[1]["agent_id"], "agent-ana");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_feed_requires_bearer() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        let resp = app.client.get(app.url("/api/feed")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    })
    .await
    .expect("test timed out");
}

// ── Profile ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_profile_read_and_edit() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;

        let resp = app
            .client
            .get(app.url("/api/profile"))
            .bearer_auth(SAM)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let mut profile = UserProfile::new("user-sam", "Sam");
        profile.location_region = Some("CA".into());
        app.insert(profile).await;

        let resp = app
            .client
            .put(app.url("/api/profile"))
            .bearer_auth(SAM)
            .json(&json!({
                "location_city": "  Oakland ",
                "profile_photo_url": "https://cdn.example.com/sam.jpg"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["location_city"], "Oakland");
        assert_eq!(body["location_region"], Value::Null);
        assert_eq!(body["profile_photo_url"], "https://cdn.example.com/sam.jpg");

        let resp = app
            .client
            .put(app.url("/api/profile"))
            .bearer_auth(SAM)
            .json(&json!({ "profile_photo_url": format!("https://x.io/{}", "a".repeat(2100)) }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    })
    .await
    .expect("test timed out");
}

// ── Music ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_music_streams_audio() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;
        app.insert(ready_for_agent("user-sam", "Sam")).await;

        let resp = app
            .client
            .post(app.url("/api/music/stream"))
            .bearer_auth(SAM)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "audio/mpeg");
        assert_eq!(resp.headers()["cache-control"], "no-store");
        assert_eq!(resp.bytes().await.unwrap().as_ref(), b"ID3mpeg-frames");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_music_failures() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app().await;

        let resp = app
            .client
            .post(app.url("/api/music/stream"))
            .bearer_auth(SAM)
            .send()
            .await
            .unwrap();
        assert_eq!(
            error_of(resp).await,
            (StatusCode::NOT_FOUND, "User profile not found".to_string())
        );

        app.insert(UserProfile::new("user-sam", "Sam")).await;
        let resp = app
            .client
            .post(app.url("/api/music/stream"))
            .bearer_auth(SAM)
            .send()
            .await
            .unwrap();
        assert_eq!(
            error_of(resp).await,
            (
                StatusCode::BAD_REQUEST,
                "Missing profile data. Complete onboarding to unlock music generation."
                    .to_string()
            )
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_music_without_llm_or_brief_is_500() {
    timeout(TEST_TIMEOUT, async {
        let app = start_app_with(None).await;
        app.insert(ready_for_agent("user-sam", "Sam")).await;
        let resp = app
            .client
            .post(app.url("/api/music/stream"))
            .bearer_auth(SAM)
            .send()
            .await
            .unwrap();
        assert_eq!(
            error_of(resp).await,
            (StatusCode::INTERNAL_SERVER_ERROR, "Missing LLM credentials".to_string())
        );

        let app = start_app_with(Some("   ")).await;
        app.insert(ready_for_agent("user-sam", "Sam")).await;
        let resp = app
            .client
            .post(app.url("/api/music/stream"))
            .bearer_auth(SAM)
            .send()
            .await
            .unwrap();
        assert_eq!(
            error_of(resp).await,
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate music prompt".to_string())
        );
    })
    .await
    .expect("test timed out");
}
