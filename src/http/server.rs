//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the handler chain: transcript → forward → engine
//! - Mount it as the fallback of an Axum router with request tracing
//! - Serve plaintext or TLS, depending on configuration
//! - Report a fatal listener error to the observation sink

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::engine::HyperEngine;
use crate::http::forward::{ForwardLayer, Target};
use crate::http::request::TranscriptLayer;
use crate::mirror::sink::{mirror, SharedSink};
use crate::net::tls::load_tls_config;

/// How long in-flight TLS connections get to finish on shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for server setup and serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid upstream target: {0}")]
    Target(#[from] axum::http::uri::InvalidUri),
    #[error("failed to bind: {0}")]
    Bind(std::io::Error),
    #[error("TLS setup failed: {0}")]
    Tls(std::io::Error),
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// The mirroring reverse proxy.
pub struct MirrorServer {
    router: Router,
    config: ProxyConfig,
    sink: SharedSink,
}

impl MirrorServer {
    /// Build the server with the default engine.
    pub fn new(config: ProxyConfig, sink: SharedSink) -> Result<Self, ServerError> {
        Self::with_engine(config, sink, HyperEngine::new())
    }

    /// Build the server around a specific engine.
    pub fn with_engine(config: ProxyConfig, sink: SharedSink, engine: HyperEngine) -> Result<Self, ServerError> {
        let mut forward = ForwardLayer::new(Target::from_config(&config.upstream)?);
        if config.mirror.request_body {
            forward = forward.mirror_request_body(sink.clone());
        }

        let proxy = ServiceBuilder::new()
            .layer(TranscriptLayer::new(sink.clone(), config.mirror.response_body))
            .layer(forward)
            .service(engine);

        let router = Router::new()
            .fallback_service(proxy)
            .layer(TraceLayer::new_for_http());

        Ok(Self { router, config, sink })
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Bind the configured listener and serve until `shutdown` completes.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let result = self.bind_and_serve(shutdown).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "Listener failed");
        }
        result
    }

    async fn bind_and_serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let rustls = match &self.config.listener.tls {
            Some(tls) => Some(
                load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path))
                    .await
                    .map_err(|e| self.report(ServerError::Tls(e)))?,
            ),
            None => None,
        };

        // Resolves hostnames; `:PORT` has already become `0.0.0.0:PORT`.
        let listener = TcpListener::bind(self.config.listener.bind_target())
            .await
            .map_err(|e| self.report(ServerError::Bind(e)))?;

        match rustls {
            Some(rustls) => {
                let listener = listener.into_std().map_err(|e| self.report(ServerError::Bind(e)))?;
                self.run_tls(listener, rustls, shutdown).await
            }
            None => self.run(listener, shutdown).await,
        }
    }

    /// Serve plaintext HTTP on `listener`.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr().map_err(ServerError::Bind)?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            "HTTP server starting"
        );

        axum::serve(listener, self.router.clone().into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| self.report(ServerError::Serve(e)))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `listener`, which must be in non-blocking mode.
    pub async fn run_tls<F>(
        self,
        listener: std::net::TcpListener,
        tls: RustlsConfig,
        shutdown: F,
    ) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr().map_err(ServerError::Bind)?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            "HTTPS server starting"
        );

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            shutdown.await;
            drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        axum_server::from_tcp_rustls(listener, tls)
            .handle(handle)
            .serve(self.router.clone().into_make_service())
            .await
            .map_err(|e| self.report(ServerError::Serve(e)))?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Write a fatal error to the sink, the way the transcript reader sees it.
    fn report(&self, error: ServerError) -> ServerError {
        mirror(self.sink.as_ref(), format!("{}\n", error).as_bytes());
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::sink::MemorySink;
    use std::sync::Arc;

    #[test]
    fn rejects_bad_upstream() {
        let mut config = ProxyConfig::default();
        config.upstream.address = "bad host".into();
        let result = MirrorServer::new(config, Arc::new(MemorySink::new()));
        assert!(matches!(result, Err(ServerError::Target(_))));
    }

    #[tokio::test]
    async fn bind_failure_is_reported_to_sink() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = ProxyConfig::default();
        config.listener.bind_address = taken.local_addr().unwrap().to_string();

        let sink = MemorySink::new();
        let server = MirrorServer::new(config, Arc::new(sink.clone())).unwrap();
        let err = server.serve(std::future::pending()).await.unwrap_err();

        assert!(matches!(err, ServerError::Bind(_)));
        assert!(sink.text().starts_with("failed to bind: "));
    }

    #[tokio::test]
    async fn port_only_address_binds_all_interfaces() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = ":0".into();

        let sink = MemorySink::new();
        let server = MirrorServer::new(config, Arc::new(sink.clone())).unwrap();
        let shutdown = crate::lifecycle::Shutdown::new();
        let serving = tokio::spawn(server.serve(shutdown.signal()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.trigger();

        let result = tokio::time::timeout(Duration::from_secs(5), serving)
            .await
            .expect("server should stop")
            .unwrap();
        assert!(result.is_ok(), "{:?}", result);
        assert!(sink.contents().is_empty());
    }
}
