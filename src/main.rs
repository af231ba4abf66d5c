//! Mirroring reverse proxy.
//!
//! Forwards every request to one upstream and writes a transcript of the
//! traffic to standard output (or `--output`).
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                MIRROR PROXY                  │
//!   Client Request    │  ┌────────────┐   ┌─────────┐   ┌─────────┐  │
//!   ──────────────────┼─▶│ transcript │──▶│ forward │──▶│ engine  │──┼──▶ Upstream
//!                     │  │  (request) │   │ rewrite │   │  hyper  │  │
//!   Client Response   │  ├────────────┤   └─────────┘   └─────────┘  │
//!   ◀─────────────────┼──│  capture   │◀─────────────────────────────┼─── Upstream
//!                     │  │ (response) │                              │
//!                     │  └─────┬──────┘                              │
//!                     │        ▼                                     │
//!                     │  observation sink (stdout / file)            │
//!                     └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::Path;
use std::sync::Arc;

use mirror_proxy::config::{Cli, ObservabilityConfig};
use mirror_proxy::http::MirrorServer;
use mirror_proxy::lifecycle::signals::shutdown_signal;
use mirror_proxy::mirror::{FileSink, SharedSink, StdoutSink};
use mirror_proxy::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            logging::init(&ObservabilityConfig::default());
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    logging::init(&config.observability);
    tracing::info!("mirror-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        listen = %config.listener.bind_address,
        forward = %config.upstream.address,
        tls = config.listener.tls.is_some(),
        mirror_request_body = config.mirror.request_body,
        response_body = ?config.mirror.response_body,
        "Configuration loaded"
    );

    if let Some(addr) = &config.observability.metrics_address {
        match addr.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(metrics_address = %addr, "Failed to parse metrics address"),
        }
    }

    let sink: SharedSink = match &config.mirror.output {
        Some(path) => Arc::new(FileSink::open(Path::new(path))?),
        None => Arc::new(StdoutSink),
    };

    let server = MirrorServer::new(config, sink)?;
    server.serve(shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
