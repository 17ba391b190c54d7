use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::api::auth::ensure_admin_user;
use storefront::api::metrics::init_metrics;
use storefront::cli::{run_command, Cli};
use storefront::config::Config;
use storefront::maintenance::spawn_session_cleanup;
use storefront::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Subcommands load the config themselves
    if cli.command.is_some() {
        init_logging(cli.log_level.as_deref().unwrap_or("warn"));
        return run_command(&cli).await;
    }

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    init_logging(cli.log_level.as_deref().unwrap_or(&config.logging.level));
    tracing::info!("{}", Config::source(&cli.config));

    tracing::info!("Starting Storefront v{}", env!("CARGO_PKG_VERSION"));

    // Ensure data directory exists
    std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
        format!(
            "Failed to create data directory: {}",
            config.server.data_dir.display()
        )
    })?;

    // Initialize database
    let db = storefront::db::init(&config.server.data_dir).await?;

    // Create the bootstrap admin if configured
    ensure_admin_user(&db, &config.auth).await?;

    if config.catalog.seed_categories {
        let seeded = storefront::db::seed_default_categories(&db).await?;
        if seeded > 0 {
            tracing::info!(categories = seeded, "Seeded default categories");
        }
    }

    // Metrics are optional; the server still runs without a recorder
    let mut state = AppState::new(config.clone(), db.clone());
    match init_metrics() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => tracing::warn!(error = %e, "Failed to install metrics recorder"),
    }
    let state = Arc::new(state);

    spawn_session_cleanup(db.clone(), config.auth.session_cleanup_interval_secs);

    // Create API router
    let api_router = storefront::api::create_router(state.clone());

    // Serve the storefront client with SPA fallback
    let static_dir = &config.server.static_dir;
    let index_file = static_dir.join("index.html");
    let serve_static = ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

    // Combine routers - API first, then static files as fallback
    let app = axum::Router::new()
        .merge(api_router)
        .fallback_service(serve_static);

    // Start API server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// `RUST_LOG` wins over the given level
fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
