//! Correlation IDs for requests.
//!
//! Every request gets an `X-Request-Id`. Clients and proxies may supply one;
//! it is echoed back only if it is short, printable and free of separators,
//! since it ends up verbatim in logs.

use axum::extract::Request;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

pub(crate) static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 128;

/// Returns the caller's request ID when acceptable, else a fresh UUID v4.
fn resolve_request_id(headers: &HeaderMap) -> String {
    let incoming = headers.get(&X_REQUEST_ID).and_then(|v| v.to_str().ok());
    match incoming {
        Some(id) if is_acceptable(id) => id.to_owned(),
        Some(id) => {
            tracing::debug!(len = id.len(), "replacing unacceptable x-request-id");
            Uuid::new_v4().to_string()
        }
        None => Uuid::new_v4().to_string(),
    }
}

fn is_acceptable(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'))
}

/// Tags the request, its response and its `request` span with an ID.
///
/// The span also records the response status once the handler returns.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = resolve_request_id(req.headers());
    // Acceptable IDs and UUIDs are both plain ASCII.
    let header = HeaderValue::from_str(&request_id).ok();
    if let Some(val) = &header {
        req.headers_mut().insert(X_REQUEST_ID.clone(), val.clone());
    }

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
        status = tracing::field::Empty,
    );
    let mut response = next.run(req).instrument(span.clone()).await;
    span.record("status", response.status().as_u16());

    if let Some(val) = header {
        response.headers_mut().insert(X_REQUEST_ID.clone(), val);
    }
    response
}
