//! Transcript formatting.
//!
//! Every banner is rendered into one buffer so it reaches the sink in a
//! single write, which keeps concurrent transcripts from tearing a banner.

use axum::http::{header, HeaderMap, HeaderName, Request, StatusCode};
use std::fmt::Write;

/// Opens a request transcript.
pub const REQUEST_DELIMITER: &str = "\n---------------------------\n";

/// Separates the request transcript from the response.
pub const RESPONSE_DELIMITER: &str = "\n-----\n";

/// Closes a request transcript.
pub const FOOTER: &str = "\n--------------------------\n";

/// Render the request banner: delimiter, request line, host, headers and a
/// blank line.
pub fn request_banner<B>(request: &Request<B>) -> Vec<u8> {
    let uri = request.uri();
    let mut out = String::with_capacity(256);
    out.push_str(REQUEST_DELIMITER);

    let _ = write!(out, "REQUEST : {} path:{}", request.method(), uri.path());
    if let Some(query) = uri.query() {
        let _ = write!(out, "?{}", query);
    }
    out.push('\n');

    let _ = writeln!(out, "Host: {}", request_host(request).unwrap_or_default());
    write_headers(&mut out, request.headers(), Some(&header::HOST));
    out.push('\n');
    out.into_bytes()
}

/// Render the response banner: delimiter, status line, headers and a blank
/// line.
pub fn response_banner(status: StatusCode, headers: &HeaderMap) -> Vec<u8> {
    let mut out = String::with_capacity(256);
    out.push_str(RESPONSE_DELIMITER);
    let _ = writeln!(
        out,
        "RESPONSE STATUS: {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    );
    write_headers(&mut out, headers, None);
    out.push('\n');
    out.into_bytes()
}

/// Host the client addressed: the `Host` header, or the URI authority when
/// the request came in over HTTP/2.
pub fn request_host<B>(request: &Request<B>) -> Option<String> {
    request
        .headers()
        .get(header::HOST)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
}

/// One line per header name, first value only.
fn write_headers(out: &mut String, headers: &HeaderMap, skip: Option<&HeaderName>) {
    for name in headers.keys() {
        if skip == Some(name) {
            continue;
        }
        if let Some(value) = headers.get(name) {
            let _ = writeln!(
                out,
                "{}: {}",
                canonical_header_name(name.as_str()),
                String::from_utf8_lossy(value.as_bytes())
            );
        }
    }
}

/// `x-request-id` → `X-Request-Id`.
pub fn canonical_header_name(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}
