//! Response capture.
//!
//! # Responsibilities
//! - Mirror the status line and headers of each response, once
//! - Decide from the recorded status whether the body is mirrored
//! - Stream the body to the client untouched (see [`MirrorBody`])
//!
//! # Design Decisions
//! - Capture state lives in one [`ResponseCapture`] per request, never shared
//! - First status wins; a second one is a protocol anomaly, reported as
//!   [`CaptureError::StatusAlreadyWritten`]
//! - No status yet means an implicit 200

use axum::http::{HeaderMap, Response, StatusCode};

use crate::config::ResponseBodyPolicy;
use crate::mirror::body::{Direction, Footer, MirrorBody, Tap};
use crate::mirror::format::response_banner;
use crate::mirror::sink::{mirror, SharedSink};

/// Anomalies in how a response was emitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("response status already written as {first}, ignoring {second}")]
    StatusAlreadyWritten { first: StatusCode, second: StatusCode },
}

/// Observes one response on its way back to the client.
pub struct ResponseCapture {
    sink: SharedSink,
    policy: ResponseBodyPolicy,
    status: Option<StatusCode>,
}

impl ResponseCapture {
    pub fn new(sink: SharedSink, policy: ResponseBodyPolicy) -> Self {
        Self {
            sink,
            policy,
            status: None,
        }
    }

    /// Status recorded by the first [`write_status`](Self::write_status).
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Status the body policy is evaluated against.
    pub fn effective_status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Mirror the response banner and record `status`.
    ///
    /// `headers` are the response's own headers, read in place.
    pub fn write_status(&mut self, status: StatusCode, headers: &HeaderMap) -> Result<(), CaptureError> {
        if let Some(first) = self.status {
            return Err(CaptureError::StatusAlreadyWritten { first, second: status });
        }
        mirror(self.sink.as_ref(), &response_banner(status, headers));
        self.status = Some(status);
        Ok(())
    }

    /// Tap for the response body, if the policy mirrors it.
    pub fn body_tap(&self) -> Option<Tap> {
        self.policy
            .mirrors(self.effective_status())
            .then(|| Tap::new(self.sink.clone(), Direction::Response))
    }

    /// Mirror `response`'s head and wrap its body for streaming capture.
    pub fn capture<B>(mut self, response: Response<B>, footer: Option<Footer>) -> Response<MirrorBody<B>> {
        if let Err(e) = self.write_status(response.status(), response.headers()) {
            tracing::warn!(error = %e, "Response capture anomaly");
        }
        let tap = self.body_tap();
        response.map(|body| {
            let body = MirrorBody::new(body, tap);
            match footer {
                Some(footer) => body.with_footer(footer),
                None => body,
            }
        })
    }
}
