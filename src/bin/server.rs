//! RelayKV Server Binary
//!
//! Serves the in-memory store on one TCP port.

use clap::Parser;
use relaykv::network::Server;
use relaykv::transport::Context;
use relaykv::Config;
use tracing_subscriber::{fmt, EnvFilter};

/// RelayKV Server
#[derive(Parser, Debug)]
#[command(name = "relaykv-server")]
#[command(about = "In-memory key-value server")]
#[command(version)]
struct Args {
    /// Port to listen on
    port: u16,

    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Sleep between empty polls, in milliseconds
    #[arg(short, long, default_value = "33")]
    poll_interval_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,relaykv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("RelayKV Server v{}", relaykv::VERSION);

    let config = Config::builder()
        .listen_addr(format!("{}:{}", args.host, args.port))
        .poll_interval_ms(args.poll_interval_ms)
        .build();

    let ctx = Context::with_config(&config);

    let mut server = match Server::bind(&ctx, config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.store(true, std::sync::atomic::Ordering::Release);
    }) {
        tracing::warn!("Cannot install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    drop(server);
    ctx.terminate();
    tracing::info!("Server stopped");
}
