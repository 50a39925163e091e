//! Web front-end binary
//!
//! Wires a metadata index and a content service together and serves the
//! upload/playback API. With the clustered content plane (`nw`) it also
//! hosts the admin RPC service that rebalances the storage ring.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use vidcluster::admin;
use vidcluster::admin::controller::AdminController;
use vidcluster::content::ContentService;
use vidcluster::content::fs::FsContentService;
use vidcluster::content::router::ContentRouter;
use vidcluster::web::metadata::MetadataStore;
use vidcluster::web::server;

/// Directory hosting the stores of storage nodes the controller starts
/// in-process via AddNode.
const MANAGED_NODE_BASE_DIR: &str = "./storage";

#[derive(Parser, Debug)]
#[command(name = "web")]
#[command(about = "Video service front-end", long_about = None)]
struct Args {
    /// Host address for the web server
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port number for the web server
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Metadata service type (sqlite, etcd)
    metadata_type: String,

    /// Options for the metadata service (db path, or comma-separated etcd endpoints)
    metadata_options: String,

    /// Content service type (fs, nw)
    content_type: String,

    /// Options for the content service: a base directory for `fs`, or a
    /// comma-separated list of the admin bind address followed by the
    /// initial storage-node addresses for `nw`
    content_options: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    anyhow::ensure!(args.port > 0, "port number must be positive");

    tracing::info!(
        "creating metadata service of type {} with options {}",
        args.metadata_type,
        args.metadata_options
    );
    let metadata = Arc::new(MetadataStore::open(&args.metadata_type, &args.metadata_options)?);

    tracing::info!(
        "creating content service of type {} with options {}",
        args.content_type,
        args.content_options
    );
    let content = match args.content_type.as_str() {
        "fs" => ContentService::Fs(FsContentService::new(&args.content_options)?),
        "nw" => {
            let nodes: Vec<&str> = args
                .content_options
                .split(',')
                .filter(|s| !s.is_empty())
                .collect();
            anyhow::ensure!(
                nodes.len() >= 2,
                "invalid content options: expected an admin address and at least one storage node"
            );
            let admin_addr = nodes[0].to_string();
            let controller = Arc::new(AdminController::with_initial_nodes(
                MANAGED_NODE_BASE_DIR,
                &nodes[1..],
            )?);

            let router = ContentRouter::new(controller.ring());

            let admin_listener = TcpListener::bind(&admin_addr)
                .await
                .with_context(|| format!("failed to listen on admin address {admin_addr}"))?;
            tracing::info!("admin service listening on {}", admin_addr);
            let admin_app = admin::handlers::router(controller);
            tokio::spawn(async move {
                if let Err(e) = axum::serve(admin_listener, admin_app).await {
                    tracing::error!("admin server stopped: {}", e);
                }
            });

            ContentService::Network(router)
        }
        other => anyhow::bail!("unknown content service type [fs/nw]: {other}"),
    };

    let app = server::router(metadata, Arc::new(content));
    let listen_addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to listen on {listen_addr}"))?;
    tracing::info!("web server listening on {}", listen_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
