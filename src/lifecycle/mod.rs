//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Parse flags → Validate → Build handler chain → Start listener
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     Ctrl+C or trigger → Stop accepting → Drain in-flight → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - A listener failure ends the process after being reported

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
