//! Palimpsest worker process.
//!
//! Registers with the coordinator, serves the peer RPC surface and the
//! client-facing WebSocket gateway, and runs the heartbeat, replication
//! push, and membership refresh loops until shutdown.

mod console;
mod gateway;
mod rpc;
mod worker;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use worker::Worker;

/// Worker node for peer-replicated collaborative text editing.
#[derive(Parser, Debug)]
#[command(name = "palimpsest", version, about)]
struct Args {
    /// Coordinator address (host:port)
    coordinator: String,

    /// IP to bind the peer RPC and client gateway listeners on
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Run the interactive console for manual exercising
    #[arg(long)]
    interactive: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let worker = Worker::bootstrap(&args.coordinator, &args.bind).await?;
    worker.spawn_loops();
    info!(rpc = %worker.rpc_addr, gateway = %worker.gateway_addr, "worker ready");

    if args.interactive {
        console::run(&worker).await?;
    } else {
        tokio::signal::ctrl_c().await?;
    }
    info!("shutting down");
    Ok(())
}
