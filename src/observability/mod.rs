//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured diagnostics, stderr)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → Operator terminal / log aggregation
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! The mirrored traffic itself is not observability output; it goes to the
//! observation sink in `mirror`.

pub mod logging;
pub mod metrics;
