//! Traffic mirroring subsystem.
//!
//! # Data Flow
//! ```text
//! request banner ──────────────┐
//! request body frames (opt.) ──┤
//! response banner ─────────────┼──▶ sink.rs (stdout / file / memory)
//! response body frames (opt.) ─┤
//! footer ──────────────────────┘
//! ```
//!
//! # Design Decisions
//! - format.rs renders banners into one buffer each (one sink write)
//! - body.rs copies frames as they pass, never buffering a whole body
//! - Sink failures never reach the real request or response

pub mod body;
pub mod format;
pub mod sink;

pub use body::{Direction, Footer, MirrorBody, Tap};
pub use sink::{FileSink, MemorySink, ObservationSink, SharedSink, StdoutSink};
