//! Blogicum - a multi-user blog

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blogicum::{
    config::Config,
    db,
    theme::ThemeEngine,
    web::{self, AppState},
};

/// How often expired sessions are purged
const SESSION_CLEANUP_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blogicum=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Blogicum...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    pool.ping().await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    // Initialize template engine
    let theme = ThemeEngine::new(config.theme.path.as_deref())?;
    match theme.override_path() {
        Some(path) => tracing::info!("Templates loaded with overrides from {}", path.display()),
        None => tracing::info!("Templates loaded"),
    }

    let state = AppState::new(pool.clone(), &config, theme);

    #[cfg(feature = "demo")]
    seed_demo_content(&state).await?;

    // Purge expired sessions in the background
    {
        let users = state.user_service.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(SESSION_CLEANUP_INTERVAL_SECS));
            loop {
                interval.tick().await;
                match users.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(count) => tracing::info!("Removed {} expired session(s)", count),
                    Err(e) => tracing::warn!("Session cleanup failed: {}", e),
                }
            }
        });
    }

    let app = web::build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Demo mode: a user, a category and a location to start writing with
#[cfg(feature = "demo")]
async fn seed_demo_content(state: &AppState) -> Result<()> {
    use blogicum::models::{CreateCategoryInput, CreateLocationInput};
    use blogicum::services::{CategoryServiceError, RegisterInput};

    if state.user_service.get_by_username("demo").await?.is_none() {
        tracing::info!("Demo mode: creating user demo/demo-password");
        state
            .user_service
            .register(RegisterInput::new("demo", "demo-password"))
            .await?;
    }

    let category = CreateCategoryInput::new("Travel", "travel")
        .with_description("Stories from the road");
    match state.category_service.create(category).await {
        Ok(_) => {
            state
                .location_service
                .create(CreateLocationInput::new("Moscow"))
                .await?;
            tracing::info!("Demo mode: category and location created");
        }
        Err(CategoryServiceError::DuplicateSlug(_)) => {}
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
