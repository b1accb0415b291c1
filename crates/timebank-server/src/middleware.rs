// SPDX-License-Identifier: Apache-2.0

use crate::AppState;
use axum::body::Body;
use axum::extract::{MatchedPath, State};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::Instrument;

pub(crate) fn extract_request_id(headers: &HeaderMap, state: &AppState) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| {
            let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
            format!("req-{id:016x}")
        })
}

/// Wraps every request in an `http.request` span, records per-route metrics,
/// and echoes the request id back to the caller.
pub(crate) async fn request_tracing_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    // Matched route template, not the raw path, to keep label cardinality flat.
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path().to_string(), |m| m.as_str().to_string());
    let request_id = extract_request_id(request.headers(), &state);

    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %method,
        route = %route,
    );

    let started = Instant::now();
    let mut response = next.run(request).instrument(span).await;
    state
        .metrics
        .record(&route, response.status().as_u16(), started.elapsed());
    if let Ok(value) = axum::http::HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn caller_supplied_request_id_wins() {
        let state = crate::AppState::for_tests();
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("req-abc"));
        assert_eq!(extract_request_id(&headers, &state), "req-abc");
    }

    #[test]
    fn generated_request_ids_are_distinct() {
        let state = crate::AppState::for_tests();
        let headers = HeaderMap::new();
        let a = extract_request_id(&headers, &state);
        let b = extract_request_id(&headers, &state);
        assert_ne!(a, b);
        assert!(a.starts_with("req-"));
    }
}
