use std::sync::Arc;

use agentverse::{AppState, Database, app, config, store::Stores};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("agentverse=debug,tower_http=debug,axum=info")
        }))
        .init();

    // Read configuration file. Let it in memory.
    let config = match config::Configuration::default().read() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid `url` entry on `config.yaml` file");
            std::process::exit(0);
        },
    };

    let stores = match config.postgres {
        Some(ref postgres) => {
            let db = match Database::new(
                &postgres.address,
                postgres
                    .username
                    .as_deref()
                    .unwrap_or(agentverse::DEFAULT_CREDENTIALS),
                postgres
                    .password
                    .as_deref()
                    .unwrap_or(agentverse::DEFAULT_CREDENTIALS),
                postgres
                    .database
                    .as_deref()
                    .unwrap_or(agentverse::DEFAULT_DATABASE_NAME),
                postgres.pool_size.unwrap_or(agentverse::DEFAULT_POOL_SIZE),
            )
            .await
            {
                Ok(db) => db,
                Err(err) => {
                    tracing::error!(error = %err, "cannot initialize PostgreSQL connection");
                    std::process::exit(0);
                },
            };

            // Execute migrations scripts on start.
            if let Err(err) = sqlx::migrate!().run(&db.postgres).await {
                tracing::error!(error = %err, "database migration failed");
                std::process::exit(0);
            }

            Stores::postgres(db.postgres)
        },
        None => {
            tracing::warn!(
                "missing `postgres` entry on `config.yaml` file, running on in-memory stores"
            );
            Stores::memory()
        },
    };

    let port = config.port;
    let state = match AppState::new(Arc::clone(&config), stores) {
        Ok(state) => state,
        Err(err) => {
            tracing::error!(error = %err, "invalid `argon2` entry on `config.yaml` file");
            std::process::exit(0);
        },
    };

    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %port, "cannot bind listening socket");
            std::process::exit(0);
        },
    };

    tracing::info!(%port, name = %config.name, "AgentVerse is listening");

    if let Err(err) = axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "server stopped unexpectedly");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
