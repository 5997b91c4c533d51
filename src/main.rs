use std::sync::Arc;

use anyhow::Context;
use seller_onboarding::api::{HttpOnboardingApi, OnboardingApi};
use seller_onboarding::config::OnboardingConfig;
use seller_onboarding::error::StepError;
use seller_onboarding::onboarding::{
    OnboardingRouteState, OnboardingWorkflow, SessionStore, SettingsSessionStore, onboarding_routes,
};
use seller_onboarding::store::{Database, LibSqlBackend};
use tower_http::cors::CorsLayer;

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

    let config = OnboardingConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export ONBOARDING_API_BASE_URL=https://api.example.com");
        std::process::exit(1);
    });

    eprintln!("🏪 Seller Onboarding v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Service: {}", config.api_base_url);
    eprintln!(
        "   Progress auth: {}",
        if config.auth_token.is_some() { "token set" } else { "none" }
    );
    eprintln!("   Control API: http://0.0.0.0:{}/api/onboarding/status", config.port);

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("opening database at {}", config.db_path.display()))?,
    );
    eprintln!("   Database: {}", config.db_path.display());

    // ── Workflow ────────────────────────────────────────────────────────
    let api: Arc<dyn OnboardingApi> = Arc::new(HttpOnboardingApi::new(
        config.api_base_url.clone(),
        config.auth_token.clone(),
        config.http_timeout,
    )?);
    let sessions: Arc<dyn SessionStore> = Arc::new(SettingsSessionStore::new(Arc::clone(&db)));
    let workflow = Arc::new(OnboardingWorkflow::new(api, sessions, config.workflow));

    match workflow.start().await {
        Ok(position) => eprintln!("   Resuming at step {position}"),
        Err(StepError::StateInconsistency(found)) => {
            eprintln!("   Warning: {found}");
            eprintln!("   POST /api/onboarding/discard-session to start over");
        }
        Err(e) => {
            // Submissions stay blocked until a refresh reaches the service.
            tracing::warn!("Could not load onboarding progress: {}", e);
            eprintln!("   Progress unavailable");
            eprintln!("   POST /api/onboarding/refresh before continuing");
        }
    }
    eprintln!();

    // ── Control surface ─────────────────────────────────────────────────
    let app = onboarding_routes(OnboardingRouteState {
        workflow: Arc::clone(&workflow),
    })
    .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("binding port {}", config.port))?;
    tracing::info!(port = config.port, "Onboarding control server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    tracing::info!(attempt_id = %workflow.attempt_id(), "Onboarding control server stopped");
    Ok(())
}
