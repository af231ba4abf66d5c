//! Duplicating body wrapper.
//!
//! [`MirrorBody`] sits on the real data path of a request or response body.
//! Each data frame is copied to the observation sink and then handed on
//! unchanged, so the consumer sees exactly the frames it would have seen
//! without mirroring: same count, same boundaries, same order.

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use crate::mirror::format::FOOTER;
use crate::mirror::sink::{mirror, SharedSink};
use crate::observability::metrics;

/// Which side of the exchange a body belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Response => "response",
        }
    }
}

/// Copies data frames to a sink.
#[derive(Clone)]
pub struct Tap {
    sink: SharedSink,
    direction: Direction,
}

impl Tap {
    pub fn new(sink: SharedSink, direction: Direction) -> Self {
        Self { sink, direction }
    }

    fn copy(&self, data: &Bytes) {
        metrics::record_mirrored_bytes(self.direction.as_str(), data.len());
        mirror(self.sink.as_ref(), data);
    }
}

/// Closes a request transcript exactly once.
///
/// Written when the response body finishes, or when whatever owns the guard
/// is dropped first (client gone, handler cancelled).
pub struct Footer {
    sink: SharedSink,
}

impl Footer {
    pub fn new(sink: SharedSink) -> Self {
        Self { sink }
    }
}

impl Drop for Footer {
    fn drop(&mut self) {
        mirror(self.sink.as_ref(), FOOTER.as_bytes());
    }
}

/// Body that mirrors its data frames while streaming them through.
pub struct MirrorBody<B> {
    inner: B,
    tap: Option<Tap>,
    footer: Option<Footer>,
}

impl<B> MirrorBody<B> {
    /// Wrap `inner`. Without a tap the body is a plain pass-through.
    pub fn new(inner: B, tap: Option<Tap>) -> Self {
        Self {
            inner,
            tap,
            footer: None,
        }
    }

    /// Close the transcript once this body is done.
    pub fn with_footer(mut self, footer: Footer) -> Self {
        self.footer = Some(footer);
        self
    }

    pub fn is_mirroring(&self) -> bool {
        self.tap.is_some()
    }
}

impl<B> Body for MirrorBody<B>
where
    B: Body<Data = Bytes> + Unpin,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match ready!(Pin::new(&mut this.inner).poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let (Some(tap), Some(data)) = (&this.tap, frame.data_ref()) {
                    tap.copy(data);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            // Propagated as-is; the footer waits for drop.
            Some(Err(e)) => Poll::Ready(Some(Err(e))),
            None => {
                this.footer.take();
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
