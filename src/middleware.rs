use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};

/// The demo server only answers traffic addressed to the local machine.
/// Requests without a host header (some HTTP/1.0 clients) pass through.
pub async fn allowed_hosts_middleware(req: Request, next: Next) -> Result<Response, StatusCode> {
    let host = req
        .headers()
        .get("host")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if is_local_host(host) {
        Ok(next.run(req).await)
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}

fn is_local_host(host: &str) -> bool {
    if host.is_empty() {
        return true;
    }
    let name = host.rsplit_once(':').map_or(host, |(name, _port)| name);
    matches!(name, "localhost" | "127.0.0.1" | "0.0.0.0")
}
