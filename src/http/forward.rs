//! Forwarding layer.
//!
//! Points every request at the configured upstream by rewriting the URI's
//! scheme and authority, which is what the engine connects to. Path, query,
//! method and headers are left alone. The request body can be tapped on its
//! way upstream.

use axum::{
    body::Body,
    http::{
        header,
        uri::{Authority, InvalidUri, PathAndQuery, Scheme},
        HeaderValue, Request, Uri,
    },
};
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::config::UpstreamConfig;
use crate::mirror::body::{Direction, MirrorBody, Tap};
use crate::mirror::sink::SharedSink;

/// Where requests go.
#[derive(Debug, Clone)]
pub struct Target {
    scheme: Scheme,
    authority: Authority,
    pass_host_header: bool,
}

impl Target {
    pub fn from_config(upstream: &UpstreamConfig) -> Result<Self, InvalidUri> {
        Ok(Self {
            scheme: upstream.scheme.parse()?,
            authority: upstream.address.parse()?,
            pass_host_header: upstream.pass_host_header,
        })
    }

    /// Rewrite `request` in place to address the upstream.
    pub fn apply<B>(&self, request: &mut Request<B>) {
        if self.pass_host_header {
            // HTTP/2 clients carry the host in the authority only.
            if !request.headers().contains_key(header::HOST) {
                let host = request
                    .uri()
                    .authority()
                    .and_then(|a| HeaderValue::from_str(a.as_str()).ok());
                if let Some(host) = host {
                    request.headers_mut().insert(header::HOST, host);
                }
            }
        } else {
            request.headers_mut().remove(header::HOST);
        }

        let mut parts = request.uri().clone().into_parts();
        parts.scheme = Some(self.scheme.clone());
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        match Uri::from_parts(parts) {
            Ok(uri) => *request.uri_mut() = uri,
            Err(e) => tracing::warn!(error = %e, uri = %request.uri(), "Could not rewrite request target"),
        }
    }
}

/// Applies [`ForwardService`] to an engine.
#[derive(Clone)]
pub struct ForwardLayer {
    target: Target,
    request_tap: Option<SharedSink>,
}

impl ForwardLayer {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            request_tap: None,
        }
    }

    /// Mirror request bodies to `sink` as the engine reads them.
    pub fn mirror_request_body(mut self, sink: SharedSink) -> Self {
        self.request_tap = Some(sink);
        self
    }
}

impl<S> Layer<S> for ForwardLayer {
    type Service = ForwardService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ForwardService {
            inner,
            target: self.target.clone(),
            request_tap: self.request_tap.clone(),
        }
    }
}

/// Rewrites the target, optionally taps the body, then delegates.
///
/// Errors and error responses from the engine pass through untouched.
#[derive(Clone)]
pub struct ForwardService<S> {
    inner: S,
    target: Target,
    request_tap: Option<SharedSink>,
}

impl<S> Service<Request<Body>> for ForwardService<S>
where
    S: Service<Request<Body>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        self.target.apply(&mut request);

        let request = match &self.request_tap {
            Some(sink) => {
                let tap = Tap::new(sink.clone(), Direction::Request);
                request.map(|body| Body::new(MirrorBody::new(body, Some(tap))))
            }
            None => request,
        };
        self.inner.call(request)
    }
}
