use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

use voxgate_core::ids::RequestId;

/// Assigns the per-request correlation id and emits the
/// `request.start` / `request.finish` pair that brackets every other
/// log event for the request.
pub async fn request_log(mut req: Request, next: Next) -> Response {
    let request_id = RequestId::new();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(request_id.clone());

    let start = Instant::now();
    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "request.start"
    );

    let resp = next.run(req).await;

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = resp.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request.finish"
    );
    resp
}

/// Browsers must never interpret relayed backend content as HTML.
pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();
    let _ = headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    let _ = headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    resp
}
