//! Process startup shared by the service binaries.

use axum::Router;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::state::AppState;
use crate::config::ServiceConfig;
use crate::db::{self, RepositoryBuilder};

/// Install the fmt subscriber. `RUST_LOG` overrides the `info` default;
/// `log` records from the service layer are forwarded.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

/// Load configuration, initialize the repository and serve `build_router`
/// until Ctrl-C.
pub async fn run(
    service_name: &'static str,
    default_port: u16,
    build_router: fn(AppState) -> Router,
) -> anyhow::Result<()> {
    init_tracing();
    info!("Starting {}", service_name);

    let config = ServiceConfig::from_env(default_port)?;
    info!(
        environment = ?config.environment,
        require_auth = config.require_auth,
        "Configuration loaded"
    );

    let builder = RepositoryBuilder::new()
        .from_env()?
        .demo_tenant(config.default_tenant.clone());
    let repository = db::init_repository(builder).await?;
    info!("Repository initialized successfully");

    let addr = config.bind_addr()?;
    let app = build_router(AppState::new(service_name, repository, config));

    info!("{} listening on http://{}", service_name, addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("{} stopped", service_name);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
