//! Web Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request-level errors go through
//! `site::SiteError`.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use platform::cookie::CookieConfig;
use platform::session::{MemorySessionStore, SessionManager};
use site::{PgSiteRepository, SiteConfig, site_router};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired sessions are reaped from the in-memory store
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "web=info,site=info,platform=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../database/migrations").run(&pool).await?;

    tracing::info!("Migrations completed");

    // Session store with periodic reaping of expired entries
    let store = MemorySessionStore::new();
    let reaper = store.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            tick.tick().await;
            let reaped = reaper.cleanup_expired();
            if reaped > 0 {
                tracing::info!(sessions_deleted = reaped, "Session cleanup completed");
            }
        }
    });

    // COOKIE_SECURE=false allows plain-HTTP local development
    let cookie_secure = env::var("COOKIE_SECURE")
        .map(|v| v != "false")
        .unwrap_or(true);
    let sessions = SessionManager::new(
        store,
        CookieConfig {
            secure: cookie_secure,
            ..CookieConfig::default()
        },
    );

    let config = SiteConfig {
        static_dir: env::var("STATIC_DIR")
            .unwrap_or_else(|_| "ui/static".to_string())
            .into(),
    };

    // Build router
    let app = site_router(PgSiteRepository::new(pool), sessions, config);

    // Start server
    let addr: SocketAddr = env::var("WEB_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:4000".to_string())
        .parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    // with_connect_info exposes the peer address to the access log
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
