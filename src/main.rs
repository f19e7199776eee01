use authsession::{
    build_router, session::cleanup_task::start_cleanup_task, AppConfig, AppState,
    InMemorySessionRepository, PostgresSessionRepository, SessionRepository, SessionService,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authsession=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting session token service");

    if let Err(e) = run().await {
        error!(error = %e, "Server exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Secrets are read exactly once here and shared immutably afterwards
    let config = AppConfig::from_env()?;
    let token_keys = Arc::new(config.token_keys());

    let session_repository: Arc<dyn SessionRepository + Send + Sync> = match &config.database_url {
        Some(database_url) => {
            let pool = sqlx::PgPool::connect(database_url).await?;
            let repository = PostgresSessionRepository::new(pool);
            repository.ensure_schema().await?;
            info!("Using PostgreSQL session store");
            Arc::new(repository)
        }
        None => {
            warn!("DATABASE_URL not set, sessions are kept in memory only");
            Arc::new(InMemorySessionRepository::new())
        }
    };

    let session_service = Arc::new(SessionService::new(
        token_keys,
        session_repository,
        config.store_timeout,
    ));

    tokio::spawn(start_cleanup_task(
        Arc::clone(&session_service),
        config.cleanup_interval,
    ));

    let app = build_router(AppState::new(session_service, config.refresh_cookie_ttl));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(bind_addr = %config.bind_addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
