//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → plaintext: tokio listener, served by axum
//!     → encrypted: tls.rs config, served by axum-server (rustls)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - TLS is enabled only when both certificate and key are configured
//! - Connection handling and timeouts belong to the serving runtime

pub mod tls;
