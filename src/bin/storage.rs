//! Storage daemon binary
//!
//! Runs one storage node: an embedded blob store plus its RPC server. Exits
//! zero on graceful shutdown (Ctrl+C or the `Shutdown` RPC) and non-zero
//! when the store or the listener cannot be opened.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use vidcluster::storage::service::{StorageNode, run_storage_node};
use vidcluster::storage::store::BlobStore;

#[derive(Parser, Debug)]
#[command(name = "storage")]
#[command(about = "Video content storage node", long_about = None)]
struct Args {
    /// Host address for the server
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port number for the server
    #[arg(long, default_value_t = 8090)]
    port: u16,

    /// Directory for the embedded store (created if missing)
    base_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    anyhow::ensure!(args.port > 0, "port number must be positive");

    let store = BlobStore::open(&args.base_dir)
        .with_context(|| format!("failed to open store under {}", args.base_dir.display()))?;

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to listen on {addr}"))?;
    tracing::info!("storage node listening on {}", addr);
    tracing::info!("base directory: {}", args.base_dir.display());

    let node = Arc::new(StorageNode::new(store));
    let stop = node.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            stop.notify_one();
        }
    });

    run_storage_node(listener, node).await?;
    tracing::info!("storage node stopped");
    Ok(())
}
