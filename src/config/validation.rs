//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses (listen socket, upstream authority)
//! - Check TLS settings are complete and point at real files
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::uri::Authority;
use std::net::SocketAddr;
use std::path::Path;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid listen address '{0}', expected [host]:port")]
    ListenAddress(String),
    #[error("invalid forward address '{0}', expected host:port")]
    ForwardAddress(String),
    #[error("unsupported upstream scheme '{0}', only 'http' is supported")]
    Scheme(String),
    #[error("certificate and key must be given together")]
    IncompleteTls,
    #[error("{kind} file not found: {path}")]
    MissingFile { kind: &'static str, path: String },
    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Hostnames are resolved at bind time; only the shape is checked here.
    match config.listener.bind_target().parse::<Authority>() {
        Ok(authority) if authority.port().is_some() => {}
        _ => errors.push(ValidationError::ListenAddress(config.listener.bind_address.clone())),
    }

    let upstream = &config.upstream;
    match upstream.address.parse::<Authority>() {
        Ok(authority) if authority.port().is_some() => {}
        _ => errors.push(ValidationError::ForwardAddress(upstream.address.clone())),
    }

    if upstream.scheme != "http" {
        errors.push(ValidationError::Scheme(upstream.scheme.clone()));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            errors.push(ValidationError::IncompleteTls);
        } else {
            for (kind, path) in [("certificate", &tls.cert_path), ("private key", &tls.key_path)] {
                if !Path::new(path).exists() {
                    errors.push(ValidationError::MissingFile {
                        kind,
                        path: path.clone(),
                    });
                }
            }
        }
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::MetricsAddress(addr.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
