use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use voicedate::app::{AppState, app};
use voicedate::auth::SupabaseAuth;
use voicedate::config::AppConfig;
use voicedate::llm::create_provider;
use voicedate::provisioning::spawn_reconciler;
use voicedate::store::{Database, LibSqlBackend};
use voicedate::voice::ElevenLabs;

/// Console logging, plus a daily-rolling file when `log_dir` is set.
fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "voicedate.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let _log_guard = init_tracing(config.log_dir.as_deref())?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "VoiceDate starting");

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?,
    );
    tracing::info!(path = %config.db_path.display(), "Database ready");

    // ── External collaborators ──────────────────────────────────────────
    let mut state = AppState::new(db.clone(), Arc::new(SupabaseAuth::new(&config.auth)));

    match &config.voice {
        Some(voice) => {
            state = state.with_voice(Arc::new(ElevenLabs::new(voice)));
            tracing::info!(base_url = %voice.base_url, "Voice platform configured");
        }
        None => tracing::warn!("ELEVENLABS_API_KEY not set; voice, agent and music routes will fail"),
    }

    match &config.llm {
        Some(llm) => state = state.with_llm(create_provider(llm)?),
        None => tracing::warn!("LLM_API_KEY not set; music generation will fail"),
    }

    // ── Background reconciliation ────────────────────────────────────────
    let _reconciler = spawn_reconciler(db, config.reconcile_interval);

    // ── HTTP server ──────────────────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, app(state))
        .await
        .context("HTTP server error")?;

    Ok(())
}
