use {
    audit_feed::{
        AppState,
        config::{ServerConfig, StoreBackend},
        domain::store::AuditStore,
        infra::{memory::MemoryAuditStore, postgres::audit_repo::PgAuditStore},
    },
    sqlx::postgres::PgPoolOptions,
    std::{sync::Arc, time::Duration},
    tokio::signal,
    tracing_subscriber::EnvFilter,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env().expect("invalid server configuration");

    let store: Arc<dyn AuditStore> = match config.store {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL must be set");
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Duration::from_secs(3))
                .connect(database_url)
                .await
                .expect("failed to connect to database");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("failed to run migrations");
            Arc::new(PgAuditStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory audit store, history is lost on restart");
            Arc::new(MemoryAuditStore::new())
        }
    };

    let app = audit_feed::adapters::router(AppState::new(store));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("failed to bind listener");
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
