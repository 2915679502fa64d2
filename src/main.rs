use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use fitness_coach::coach::{CoachManager, spawn_prune_task};
use fitness_coach::config::ServerConfig;
use fitness_coach::llm::create_provider;
use fitness_coach::server::{AppDeps, build_app};
use fitness_coach::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::from_env().context("Invalid configuration")?;

    eprintln!("🏋️ Fitness Coach v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   API: http://0.0.0.0:{}/api", config.port);

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?,
    );
    eprintln!("   Database: {}", config.db_path.display());

    // ── LLM ──────────────────────────────────────────────────────────────
    let llm = create_provider(&config.llm)?;

    // ── Coaching sessions ────────────────────────────────────────────────
    let coach = Arc::new(CoachManager::new(
        Arc::clone(&db),
        Arc::clone(&llm),
        config.session_idle_timeout,
    ));
    // Idle-session sweep (runs every 60s)
    let _prune_handle = spawn_prune_task(Arc::clone(&coach), Duration::from_secs(60));

    let app = build_app(AppDeps { db, llm, coach });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "HTTP server started");
    axum::serve(listener, app).await?;

    Ok(())
}
