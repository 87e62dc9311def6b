use anyhow::{Context, Result};
use clap::Parser;
use parley_server::handler::ServerState;
use parley_server::server;
use parley_store::{LocalMediaStore, Store};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(author, version, about = "parley messaging server")]
struct Args {
    #[arg(long, default_value = parley::DEFAULT_LISTEN_ADDR)]
    listen: String,
    /// Directory for persistent data (accounts, messages, requests).
    #[arg(long, default_value = "/var/lib/parley")]
    data_dir: PathBuf,
    /// Directory for uploaded media. Defaults to <data-dir>/media.
    #[arg(long)]
    media_dir: Option<PathBuf>,
    #[arg(long, default_value = "1000")]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley_server=info".into()),
        )
        .init();

    let args = Args::parse();

    let store = Store::open(&args.data_dir)?;
    let media_dir = args
        .media_dir
        .unwrap_or_else(|| args.data_dir.join("media"));
    let media = Arc::new(LocalMediaStore::new(media_dir).context("failed to set up media dir")?);
    let state = ServerState::new(store, media, args.max_connections);

    let listener = TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;

    tokio::select! {
        result = server::serve(state, listener) => result.context("server failed"),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    }
}
