//! Wanderlust API - tourism agency backend
//!
//! Serves the public site (packages, blog, ads, centers, checkout) and the
//! role-scoped back office: admin settings and managers, tour operations,
//! finance and client self-service.
//!
//! Records live behind a data gateway. With `DATABASE_URL` set the gateway
//! is PostgreSQL; without it the server runs on an in-memory store.

mod audit;
mod auth;
mod config;
mod dashboard;
mod db;
mod error;
mod managers;
mod models;
mod routes;
mod settings;
mod sitemap;
mod state;
mod storage;
mod table;
mod values;

use crate::config::{AppConfig, DatabaseConfig};
use crate::db::{MemoryGateway, PgGateway, SharedGateway};
use crate::routes::create_router;
use crate::state::{AppState, SharedState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("🚀 Starting Wanderlust API...");

    let config = AppConfig::load()?;
    info!("📋 Configuration loaded successfully");

    let gateway: SharedGateway = match &config.database {
        Some(db) => {
            let gateway = PgGateway::new(init_database_pool(db).await?);
            gateway.bootstrap().await?;
            info!("✅ PostgreSQL gateway ready");
            Arc::new(gateway)
        }
        None => {
            warn!("⚠️  DATABASE_URL not set, records are kept in memory only");
            Arc::new(MemoryGateway::new())
        }
    };

    let state: SharedState = Arc::new(AppState::new(gateway, &config));
    info!(
        "🗂️  Storage at {} (buckets: {})",
        state.storage.root().display(),
        state.storage.buckets().join(", ")
    );

    let loaded = state.settings.refresh().await?;
    info!("⚙️  Loaded {} settings", loaded);

    if let Some(seed) = &config.admin_seed {
        state.profiles.seed_admin(seed).await?;
    }

    watch_settings(&state);

    let app = create_router(state, &config);
    let addr = SocketAddr::from((config.server.host, config.server.port));

    info!("🌐 Server listening on http://{}", addr);
    log_endpoints();

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wanderlust_api=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Build and verify the connection pool
async fn init_database_pool(db: &DatabaseConfig) -> anyhow::Result<deadpool_postgres::Pool> {
    use deadpool_postgres::{Config, ManagerConfig, PoolConfig, RecyclingMethod, Runtime};

    let mut cfg = Config::new();
    cfg.host = Some(db.host.clone());
    cfg.port = Some(db.port);
    cfg.user = Some(db.user.clone());
    cfg.password = Some(db.password.clone());
    cfg.dbname = Some(db.database.clone());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(db.max_pool_size));

    let pool = if db.require_tls {
        let certs = rustls_native_certs::load_native_certs();
        let mut root_store = rustls::RootCertStore::empty();
        for cert in certs.certs {
            root_store.add(cert).ok();
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
        cfg.create_pool(Some(Runtime::Tokio1), tls)
            .map_err(|e| anyhow::anyhow!("Failed to create TLS pool: {}", e))?
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), tokio_postgres::NoTls)
            .map_err(|e| anyhow::anyhow!("Failed to create pool: {}", e))?
    };

    let client = pool
        .get()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to get pool connection: {}", e))?;
    client
        .query_one("SELECT 1 as ok", &[])
        .await
        .map_err(|e| anyhow::anyhow!("Failed to verify database connection: {}", e))?;

    info!("✅ Database connection successful (TLS: {})", db.require_tls);
    Ok(pool)
}

/// Log every settings reload until the store is dropped
fn watch_settings(state: &SharedState) {
    let mut revisions = state.settings.subscribe();
    tokio::spawn(async move {
        while revisions.changed().await.is_ok() {
            let revision = *revisions.borrow_and_update();
            debug!("Settings revision {}", revision);
        }
    });
}

fn log_endpoints() {
    info!("📚 API Endpoints:");
    info!("   ─── Public ───");
    info!("   GET  /api/packages              - Bookable packages (search/sort/page)");
    info!("   GET  /api/packages/{{slug}}       - One package");
    info!("   GET  /api/blog                  - Published posts");
    info!("   GET  /api/ads                   - Running advertisements");
    info!("   GET  /api/centers               - Information centers with media");
    info!("   POST /api/checkout              - Book a package");
    info!("   GET  /sitemap.xml               - Sitemap");
    info!("");
    info!("   ─── Authentication ───");
    info!("   POST /api/auth/login            - Login with email/password");
    info!("   POST /api/auth/register         - Register a client account");
    info!("   POST /api/auth/refresh          - Refresh access token");
    info!("   GET  /api/auth/me               - Current profile");
    info!("");
    info!("   ─── Back office ───");
    info!("   /api/admin/{{settings,profiles,packages,advertisements,blog-posts,audit-logs}}");
    info!("   /api/manage/{{bookings,centers,volunteer-activities}}");
    info!("   /api/finance/payments");
    info!("   /api/client/{{bookings,payments}}");
    info!("   /api/dashboard/{{admin,tour-manager,accountant,client}}");
    info!("");
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
