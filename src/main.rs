use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gridstore::{
    auth::{TokenIssuer, UserDirectory},
    build_router,
    config::{AppConfig, Cli},
    service::TableService,
    storage::{InMemoryTableStore, SnapshotTableStore, TableStore},
    web::AppState,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env()
        .context("failed to load application configuration")?
        .with_overrides(cli);

    if config.uses_dev_secret() {
        warn!("JWT_SECRET is not set; using the development secret");
    }

    let (store, users): (Arc<dyn TableStore>, UserDirectory) = match &config.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create data directory {}", dir.display()))?;
            info!(data_dir = %dir.display(), "storage: snapshot");
            let store = SnapshotTableStore::open(dir).context("failed to open table snapshot")?;
            let users = UserDirectory::open(dir, config.bcrypt_cost)
                .context("failed to open user snapshot")?;
            (Arc::new(store), users)
        }
        None => {
            info!("storage: in-memory");
            (
                Arc::new(InMemoryTableStore::new()),
                UserDirectory::new(config.bcrypt_cost),
            )
        }
    };

    let tokens = TokenIssuer::new(&config.jwt_secret, config.token_ttl());
    let app = build_router(AppState::new(TableService::new(store), users, tokens));

    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(address = %addr, "gridstore started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gridstore=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install Ctrl+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
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
}
