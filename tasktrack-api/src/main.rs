//! # TaskTrack API Server
//!
//! REST API for projects, tasks, subtasks, comments and notifications, with
//! role-based access control and free-text search.
//!
//! ## Storage
//!
//! With `DATABASE_URL` set, the server creates the database if needed, runs
//! migrations and stores everything in PostgreSQL. Without it, data lives
//! in memory for the lifetime of the process.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=$(openssl rand -hex 32) cargo run -p tasktrack-api
//! ```

use anyhow::Context;
use std::sync::Arc;
use tasktrack_api::{
    app::{build_router, AppState},
    config::Config,
};
use tasktrack_shared::{
    db::{
        migrations::{ensure_database_exists, get_migration_status, run_migrations},
        pool::{create_pool, DatabaseConfig},
    },
    lifecycle::Lifecycle,
    store::{MemoryStore, PgStore, SharedStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tasktrack_api=debug,tasktrack_shared=debug,tower_http=debug".into()
            }),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

async fn open_store(config: &Config) -> anyhow::Result<SharedStore> {
    let deletion = config.domain.deletion;

    let Some(url) = config.database.url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on exit");
        return Ok(Arc::new(MemoryStore::with_deletion_policy(deletion)));
    };

    ensure_database_exists(url)
        .await
        .context("Failed to ensure database exists")?;

    let pool = create_pool(DatabaseConfig {
        url: url.to_string(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("Failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let status = get_migration_status(&pool)
        .await
        .context("Failed to read migration status")?;
    tracing::info!(
        applied = status.applied_migrations,
        latest = ?status.latest_version,
        "Database ready"
    );

    Ok(Arc::new(PgStore::new(pool, deletion)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!(
        "TaskTrack API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        deletion = %config.domain.deletion,
        transitions = %config.domain.transitions,
        "Configuration loaded"
    );

    let store = open_store(&config).await?;

    if let Some(admin) = &config.bootstrap {
        let lifecycle = Lifecycle::new(store.clone());
        match lifecycle
            .bootstrap_admin(&admin.name, &admin.email, &admin.password)
            .await
            .context("Failed to seed admin account")?
        {
            Some(user) => tracing::info!(user_id = %user.id, "Seeded admin account"),
            None => tracing::info!("Admin account already present"),
        }
    }

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Keep serving; the process can still be killed
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, exiting...");
}
