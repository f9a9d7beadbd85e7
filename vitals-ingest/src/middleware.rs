//! Request correlation and timing middleware (spec §6: every response
//! carries `X-Request-ID` and `X-Process-Time-Ms`). Grounded on the
//! `axum::middleware::from_fn` layering the teacher uses in
//! `ferrex-server::create_app` for its own cross-cutting concerns.

use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

pub async fn request_context(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let start = Instant::now();

    let mut response = next.run(request).await;

    let elapsed_ms = start.elapsed().as_millis();
    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&request_id.to_string()) {
        headers.insert("x-request-id", v);
    }
    if let Ok(v) = HeaderValue::from_str(&elapsed_ms.to_string()) {
        headers.insert("x-process-time-ms", v);
    }

    response
}
