//! Upstream forwarding engine.
//!
//! # Responsibilities
//! - Perform the network round trip for an already-rewritten request
//! - Strip hop-by-hop headers before sending
//! - Turn transport failures into `502 Bad Gateway`
//!
//! # Design Decisions
//! - Exposed as a tower `Service` so wrappers compose around it
//! - `Error = Infallible`: every failure is answered with a response
//! - Optional rewrite hook, no-op by default

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, Request, Response, StatusCode, Version},
    response::IntoResponse,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

use crate::observability::metrics;

/// Hook applied to every request just before it is sent upstream.
pub type RequestRewrite = Arc<dyn Fn(&mut Request<Body>) + Send + Sync>;

/// Headers that describe one connection and must not be forwarded.
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
];

/// Forwarding engine backed by the hyper client.
#[derive(Clone)]
pub struct HyperEngine {
    client: Client<HttpConnector, Body>,
    rewrite: Option<RequestRewrite>,
}

impl HyperEngine {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            rewrite: None,
        }
    }

    /// Install a rewrite hook.
    pub fn with_rewrite(mut self, rewrite: RequestRewrite) -> Self {
        self.rewrite = Some(rewrite);
        self
    }
}

impl Default for HyperEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for HyperEngine {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        if let Some(rewrite) = &self.rewrite {
            rewrite(&mut request);
        }
        let client = self.client.clone();
        Box::pin(async move { Ok(round_trip(client, request).await) })
    }
}

async fn round_trip(client: Client<HttpConnector, Body>, mut request: Request<Body>) -> Response<Body> {
    strip_hop_by_hop(request.headers_mut());
    // The upstream leg is always HTTP/1.1, whatever the client spoke.
    *request.version_mut() = Version::HTTP_11;

    let upstream = request.uri().clone();
    tracing::debug!(method = %request.method(), upstream = %upstream, "Forwarding request");

    match client.request(request).await {
        Ok(response) => {
            let mut response = response.map(Body::new);
            strip_hop_by_hop(response.headers_mut());
            response
        }
        Err(e) => {
            metrics::record_upstream_error();
            tracing::error!(upstream = %upstream, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in `Connection` are hop-by-hop too.
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}
