//! Request transcript layer.
//!
//! # Responsibilities
//! - Mirror the request line, host and headers before anything is forwarded
//! - Hand the response to a fresh [`ResponseCapture`]
//! - Close the transcript once the response body is done
//!
//! # Design Decisions
//! - Pure observer: requests are never rejected or modified here
//! - Banner is one sink write, finished before the inner service runs
//! - Footer is a drop guard, so it is written even on errors and disconnects

use axum::{
    body::Body,
    http::{Request, Response},
};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::config::ResponseBodyPolicy;
use crate::http::response::ResponseCapture;
use crate::mirror::body::Footer;
use crate::mirror::format::request_banner;
use crate::mirror::sink::{mirror, SharedSink};
use crate::observability::metrics;

/// Applies [`TranscriptService`] to a service.
#[derive(Clone)]
pub struct TranscriptLayer {
    sink: SharedSink,
    policy: ResponseBodyPolicy,
}

impl TranscriptLayer {
    pub fn new(sink: SharedSink, policy: ResponseBodyPolicy) -> Self {
        Self { sink, policy }
    }
}

impl<S> Layer<S> for TranscriptLayer {
    type Service = TranscriptService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TranscriptService {
            inner,
            sink: self.sink.clone(),
            policy: self.policy,
        }
    }
}

/// Writes a full request/response transcript to the sink.
#[derive(Clone)]
pub struct TranscriptService<S> {
    inner: S,
    sink: SharedSink,
    policy: ResponseBodyPolicy,
}

impl<S> Service<Request<Body>> for TranscriptService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + 'static,
    S::Future: Send + 'static,
    S::Error: 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        mirror(self.sink.as_ref(), &request_banner(&request));

        let footer = Footer::new(self.sink.clone());
        let capture = ResponseCapture::new(self.sink.clone(), self.policy);
        let method = request.method().to_string();
        let response = self.inner.call(request);

        Box::pin(async move {
            let response = response.await?;
            metrics::record_request(&method, response.status().as_u16());
            Ok(capture.capture(response, Some(footer)).map(Body::new))
        })
    }
}
