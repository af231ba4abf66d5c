//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line flags (+ optional TOML file)
//!     → loader.rs (parse, apply flag overrides)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → read once at startup to build the handler chain
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no hot reload
//! - All fields have defaults to allow minimal configs
//! - Mirroring policy is configuration, not code

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, Cli, ConfigError};
pub use schema::{
    ListenerConfig, MirrorConfig, ObservabilityConfig, ProxyConfig, ResponseBodyPolicy, TlsConfig,
    UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
