use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use randex_core::{AssetIndex, PathStore, WatchConfig, WatchService};
use randex_server::{AppState, config::Config, create_app};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "randex-server")]
#[command(about = "Random local asset API backed by a watched directory index")]
struct Cli {
    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,

    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "info,randex_server=info,randex_core=info,tower_http=info",
                )
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env()?;
    if let Some(host) = cli.host {
        config.server_host = host;
    }
    if let Some(port) = cli.port {
        config.server_port = port;
    }
    config.ensure_directories()?;
    config.normalize_paths()?;
    let config = Arc::new(config);

    info!(path = %config.database_path.display(), "opening path store");
    let store = PathStore::open(&config.database_path).await?;
    // The filesystem is authoritative; whatever a previous run left behind
    // is rebuilt from scratch.
    store.reset().await?;
    let index = AssetIndex::new();

    let watch = WatchService::start(
        WatchConfig {
            debounce_window: config.rebuild_debounce,
            ..WatchConfig::default()
        },
        store.clone(),
        index.clone(),
        config.asset_root.clone(),
        config.extension_filter(),
    )?;

    info!(asset_root = %config.asset_root.display(), "running initial asset scan");
    let indexer = watch.indexer();
    indexer.scan_all().await?;
    info!(
        categories = index.categories().await.len(),
        debounce = ?config.rebuild_debounce,
        "initial scan complete, watching for changes"
    );

    let state = AppState::new(Arc::clone(&config), store, index);
    let app = create_app(state);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "randex server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
