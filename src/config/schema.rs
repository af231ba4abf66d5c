//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Root configuration for the mirroring proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// The single upstream every request is forwarded to.
    pub upstream: UpstreamConfig,

    /// What gets copied to the observation sink.
    pub mirror: MirrorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Optional TLS configuration. Plaintext when absent.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            tls: None,
        }
    }
}

impl ListenerConfig {
    /// `host:port` to bind. An empty host (`:8000`) means all interfaces.
    pub fn bind_target(&self) -> String {
        match self.bind_address.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{}", port),
            None => self.bind_address.clone(),
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream `host:port`.
    pub address: String,

    /// Scheme used to reach the upstream.
    pub scheme: String,

    /// Send the client's original `Host` header upstream.
    pub pass_host_header: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "localhost:9000".to_string(),
            scheme: "http".to_string(),
            pass_host_header: true,
        }
    }
}

/// Mirroring policy, resolved once at startup.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct MirrorConfig {
    /// Copy request bodies to the sink as they stream upstream.
    pub request_body: bool,

    /// Which response bodies are copied to the sink.
    pub response_body: ResponseBodyPolicy,

    /// Append to this file instead of standard output.
    pub output: Option<String>,
}

/// Which response bodies get mirrored.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseBodyPolicy {
    /// Every response body.
    Always,
    /// Only responses whose status is not exactly 200.
    #[default]
    NonSuccessOnly,
}

impl ResponseBodyPolicy {
    pub fn mirrors(&self, status: StatusCode) -> bool {
        match self {
            ResponseBodyPolicy::Always => true,
            ResponseBodyPolicy::NonSuccessOnly => status != StatusCode::OK,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Prometheus exporter bind address. Disabled when absent.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "mirror_proxy=info,tower_http=info".to_string(),
            metrics_address: None,
        }
    }
}
