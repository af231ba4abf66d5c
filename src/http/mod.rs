//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, tracing, serving)
//!     → request.rs (request banner, footer guard)
//!     → forward.rs (rewrite target, optional request body tap)
//!     → engine.rs (upstream round trip, 502 on failure)
//!     ← response.rs (response banner, body tap by policy)
//!     → Send to client
//! ```

pub mod engine;
pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use engine::{HyperEngine, RequestRewrite};
pub use forward::{ForwardLayer, ForwardService, Target};
pub use request::{TranscriptLayer, TranscriptService};
pub use response::{CaptureError, ResponseCapture};
pub use server::{MirrorServer, ServerError};
