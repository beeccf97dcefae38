//! Meridian Storefront - Public e-commerce site.
//!
//! This binary serves the public storefront JSON API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework, JSON endpoints for cart and checkout
//! - `PostgreSQL` (sqlx) for carts, orders, and sessions; an in-memory
//!   backend with a seeded demo catalog for development
//! - Payment dispatch through a strategy table (offline methods built in,
//!   online providers enabled per configured gateway)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sentry::integrations::tracing as sentry_tracing;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use meridian_storefront::config::{StoreBackend, StorefrontConfig};
use meridian_storefront::state::AppState;
use meridian_storefront::{app, store};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Initialize tracing with EnvFilter and Sentry integration
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "meridian_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let app = build_app(&config).await;

    // Sentry layers (outermost for full request coverage)
    let app = app
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    // Start server
    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

/// Build the router over the configured storage backend.
async fn build_app(config: &StorefrontConfig) -> Router {
    match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .clone()
                .expect("config validation guarantees a database URL for the postgres backend");
            let pool = store::create_pool(&database_url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");

            let pg = store::PgStore::new(pool.clone());
            pg.migrate().await.expect("Failed to run migrations");

            let session_store = PostgresStore::new(pool);
            session_store
                .migrate()
                .await
                .expect("Failed to run session migrations");

            let state = AppState::new(config.clone(), Arc::new(pg));
            app(state, session_store)
        }
        StoreBackend::Memory => {
            let memory = Arc::new(store::MemoryStore::new());
            store::seed::demo_catalog(memory.as_ref())
                .await
                .expect("Failed to seed demo catalog");
            tracing::info!("In-memory store seeded with demo catalog");

            let state = AppState::new(config.clone(), memory);
            app(state, tower_sessions::MemoryStore::default())
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
