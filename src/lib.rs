//! Diagnostic reverse proxy that mirrors traffic to an observation stream.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod mirror;
pub mod net;
pub mod observability;

pub use config::ProxyConfig;
pub use http::MirrorServer;
pub use lifecycle::Shutdown;
