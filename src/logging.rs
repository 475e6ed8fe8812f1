use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, Level};

/// Install the global fmt subscriber at the configured level
pub fn init_tracing(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(parse_level(level))
        .with_target(true)
        .try_init();
}

/// Map a config level name to a tracing level; unknown names fall back to info
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// One access log line per request under the `access_log` target
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let remote_addr = request
        .headers()
        .get("x-forwarded-for")
        .or_else(|| request.headers().get("x-real-ip"))
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let response = next.run(request).await;

    let content_length = response
        .headers()
        .get("content-length")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-");

    info!(
        target: "access_log",
        remote_addr = %remote_addr,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "\"{} {}\" {} \"{}\"",
        method,
        uri,
        content_length,
        user_agent
    );

    response
}
