use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use cadence_core::{clock::system_clock, CadenceConfig, MemorySnapshotStore, SnapshotStore};
use cadence_gateway::{app, handlers, runtime::Runtime};
use cadence_store::SqliteSnapshotStore;
use clap::Parser;
use tracing::{info, warn};

/// Adaptive job orchestration daemon.
#[derive(Parser)]
#[command(name = "cadence-gateway")]
#[command(version)]
struct Args {
    /// Path to cadence.toml (default: ~/.cadence/cadence.toml)
    #[arg(long, env = "CADENCE_CONFIG")]
    config: Option<String>,

    /// Override gateway.bind
    #[arg(long)]
    bind: Option<String>,

    /// Override gateway.port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cadence_gateway=info,cadence_scheduler=info,cadence_learner=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let config = CadenceConfig::load(args.config.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        CadenceConfig::default()
    });

    let bind = args.bind.unwrap_or_else(|| config.gateway.bind.clone());
    let port = args.port.unwrap_or(config.gateway.port);

    let store = open_store(&config.store.path);
    let (runtime, channels) =
        Runtime::build(config, handlers::builtin_registry(), store, system_clock())?;
    runtime.restore_snapshots().await;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let tasks = runtime.spawn(channels, shutdown_rx);

    let state = Arc::new(app::AppState::new(Arc::clone(&runtime)));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("invalid listen address {bind}:{port}"))?;
    info!("Cadence gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    // stop loops, then persist learned state
    let _ = shutdown_tx.send(true);
    for task in tasks {
        let _ = task.await;
    }
    runtime.save_snapshots().await;
    info!("Cadence gateway stopped");
    Ok(())
}

/// SQLite when a path is configured; in-memory otherwise or if it won't open.
fn open_store(path: &str) -> Arc<dyn SnapshotStore> {
    if path.is_empty() {
        info!("no store path configured; snapshots kept in memory");
        return Arc::new(MemorySnapshotStore::new());
    }
    match SqliteSnapshotStore::open(path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(path, "snapshot store unavailable ({e}); snapshots kept in memory");
            Arc::new(MemorySnapshotStore::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn config_path_falls_back_to_env() {
        std::env::set_var("CADENCE_CONFIG", "/etc/cadence/cadence.toml");
        let args = Args::try_parse_from(["cadence-gateway", "--port", "9000"]).unwrap();
        assert_eq!(args.config.as_deref(), Some("/etc/cadence/cadence.toml"));
        assert_eq!(args.port, Some(9000));

        let args = Args::try_parse_from(["cadence-gateway", "--config", "local.toml"]).unwrap();
        assert_eq!(args.config.as_deref(), Some("local.toml"));
        std::env::remove_var("CADENCE_CONFIG");
    }
}
