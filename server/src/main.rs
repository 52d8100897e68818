use anyhow::{Context, Result};
use clap::Parser;
use pubsearch_core::persist::load_meta;
use server::{router, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

/// JSON search service over a built publication index.
#[derive(Parser)]
#[command(name = "server")]
struct Args {
    /// Directory holding snapshot.bin and meta.json
    #[arg(long, default_value = "./index")]
    index: String,
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let state = AppState::open(&args.index, std::env::var("ADMIN_TOKEN").ok())
        .with_context(|| format!("loading snapshot from {}", args.index))?;
    let stats = state.snapshots.current().stats();
    let created_at = match load_meta(&state.index_paths) {
        Ok(meta) => meta.map(|m| m.created_at),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable meta.json");
            None
        }
    };
    tracing::info!(
        index = %args.index,
        num_docs = stats.num_docs,
        num_terms = stats.num_terms,
        num_postings = stats.num_postings,
        created_at = created_at.as_deref().unwrap_or("unknown"),
        "snapshot ready"
    );
    if state.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set, /admin/reload will reject every request");
    }

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "accepting search requests");
    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
