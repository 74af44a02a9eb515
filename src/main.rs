use clap::Parser;
use partitioned_log::config::{CliArgs, Command, KvArgs, NodeConfig};
use partitioned_log::kv::handlers as kv_handlers;
use partitioned_log::kv::http::HttpKv;
use partitioned_log::kv::memory::MemoryKv;
use partitioned_log::log::handlers;
use partitioned_log::log::node::LogNode;
use partitioned_log::transport::http::HttpTransport;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match args.command {
        Command::Node(node_args) => run_node(NodeConfig::from_args(node_args)?).await,
        Command::Kv(kv_args) => run_kv(kv_args).await,
    }
}

async fn run_node(config: NodeConfig) -> anyhow::Result<()> {
    let cluster = config.cluster.clone();
    tracing::info!(
        "Starting node {} ({} members, {:?} strategy)",
        cluster.self_id(),
        cluster.len(),
        config.options.strategy
    );
    for member in cluster.members() {
        tracing::info!("  - {} http={}", member.id, member.http_addr);
    }

    // 1. Peer transport and shared store:
    let transport = HttpTransport::new(cluster.clone(), config.peer_timeout, config.peer_retries);
    let store = Arc::new(HttpKv::new(config.kv_addr));
    tracing::info!("Key-value service at {}", config.kv_addr);

    // 2. Log node (serializer + persister):
    let node = LogNode::start(&cluster, transport, store, config.options.clone());

    // 3. HTTP server:
    let app = handlers::router(node.clone());
    let listener = tokio::net::TcpListener::bind(config.bind).await?;

    tracing::info!("HTTP server listening on {}", config.bind);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 4. Flush partitions not yet persisted:
    node.shutdown().await;

    tracing::info!("Node {} stopped", cluster.self_id());
    Ok(())
}

async fn run_kv(args: KvArgs) -> anyhow::Result<()> {
    let store = Arc::new(MemoryKv::new());
    let app = kv_handlers::router(store);
    let listener = tokio::net::TcpListener::bind(args.bind).await?;

    tracing::info!("Key-value service listening on {}", args.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
