//! Chat relay server.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────┐
//!                        │                      CHAT RELAY                      │
//!   POST /chat           │  ┌────────┐   ┌──────────┐   ┌───────┐   ┌────────┐  │
//!   ─────────────────────┼─▶│  http  │──▶│ pipeline │──▶│ auth  │──▶│identity│──┼──▶ Identity provider
//!                        │  │ server │   │          │   └───────┘   └────────┘  │
//!                        │  └────────┘   │          │   ┌──────────┐            │
//!                        │       ▲       │          │──▶│ratelimit │────────────┼──▶ Redis (REST)
//!                        │       │       │          │   └──────────┘            │
//!                        │       │       │          │   ┌──────────┐            │
//!                        │       │       │          │──▶│  relay   │────────────┼──▶ Generation service
//!                        │       │       │          │   └──────────┘            │
//!                        │       │       │          │   ┌──────────┐            │
//!                        │       │       │          │──▶│ recorder │────────────┼──▶ Firestore / JSONL
//!   JSON response        │       │       └────┬─────┘   └──────────┘            │
//!   ◀────────────────────┼───────┴────────────┘                                 │
//!                        │                                                      │
//!                        │   config · observability · resilience · lifecycle    │
//!                        └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use chat_relay::config::loader::load_config;
use chat_relay::lifecycle::{build_pipeline, signals, Shutdown};
use chat_relay::observability::{logging, metrics};
use chat_relay::HttpServer;

#[derive(Parser)]
#[command(name = "chat-relay")]
#[command(about = "Sign-in gated chat relay", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults plus environment when omitted.
    #[arg(short, long, env = "CHAT_RELAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init_logging("info");
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "chat-relay starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        rate_limit = config.rate_limit.limit,
        window_secs = config.rate_limit.window_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Arc::new(Shutdown::new());
    let pipeline = Arc::new(build_pipeline(&config, &shutdown).await?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let server = HttpServer::new(config, pipeline.clone());
    server.run(listener, shutdown.subscribe()).await?;

    pipeline.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
