use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use std::time::Instant;

/// Access log for every request. The portal always sits behind a proxy,
/// so the forwarded client address is logged alongside the route.
pub async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let client_ip = forwarded_client_ip(req.headers());
    let start = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        %method,
        path,
        status = %response.status(),
        latency_ms = start.elapsed().as_millis() as u64,
        client_ip = client_ip.as_deref().unwrap_or("-"),
        "Request completed"
    );

    response
}

/// The original client address when the service sits behind a proxy.
/// X-Forwarded-For carries a comma-separated chain; the first entry is
/// the client.
pub fn forwarded_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
