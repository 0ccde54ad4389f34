use std::process::ExitCode;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use arena::actor::NullSink;
use arena::api::{resolve_api_addr, router};
use arena::config::ConfigStore;
use arena::manager::ArenaManager;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn seed_from_env() -> u64 {
    std::env::var("ARENA_SEED")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default()
        })
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = ConfigStore::from_env();
    let config = match store.load() {
        Ok(config) => config,
        Err(err) => {
            error!(path = %store.path().display(), %err, "failed to load arena config");
            return ExitCode::FAILURE;
        }
    };

    let manager = match ArenaManager::new(config, Arc::new(NullSink), seed_from_env()) {
        Ok(manager) => manager,
        Err(err) => {
            error!(%err, "invalid arena config");
            return ExitCode::FAILURE;
        }
    };

    let app = router(manager.clone());
    let addr = resolve_api_addr(|k| std::env::var(k).ok());
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%addr, %err, "bind arena api");
            return ExitCode::FAILURE;
        }
    };
    info!(%addr, "arena api listening");

    let shutdown_manager = manager.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down rooms");
            shutdown_manager.shutdown_all();
        })
        .await;

    if let Err(err) = served {
        error!(%err, "arena api stopped");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
