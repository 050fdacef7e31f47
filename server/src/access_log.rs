//! One colored line per request: client, method, path, status and latency.

use axum::{
    extract::{ConnectInfo, Request},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

pub const GREEN: &str = "\x1b[32m";
pub const CYAN: &str = "\x1b[36m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const MAGENTA: &str = "\x1b[35m";
pub const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";

/// Reads are the only API traffic; preflights come from the CORS layer
fn method_color(method: &Method) -> &'static str {
    match *method {
        Method::GET | Method::HEAD => GREEN,
        Method::OPTIONS => DIM,
        _ => MAGENTA,
    }
}

fn status_color(status: StatusCode) -> &'static str {
    if status.is_server_error() {
        RED
    } else if status.is_client_error() {
        YELLOW
    } else if status.is_redirection() {
        CYAN
    } else {
        GREEN
    }
}

/// Dataset point documents are large; everything else is API or static traffic
fn route_tag(path: &str) -> &'static str {
    match path.strip_prefix("/api/") {
        Some(rest) if rest.ends_with("/points") => "points",
        Some(_) => "api",
        None => "static",
    }
}

pub fn format_line(
    client: SocketAddr,
    method: &Method,
    path: &str,
    status: StatusCode,
    elapsed: Duration,
) -> String {
    format!(
        "{DIM}{:<15}{RESET} {}{:>7}{RESET} {:<6} {:<48} {}{:>3}{RESET} {DIM}{:.1}ms{RESET}",
        client.ip(),
        method_color(method),
        method.as_str(),
        route_tag(path),
        path,
        status_color(status),
        status.as_u16(),
        elapsed.as_secs_f64() * 1000.0,
    )
}

pub async fn log_request(
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let start = Instant::now();

    let response = next.run(request).await;

    let line = format_line(client, &method, &path, response.status(), start.elapsed());
    if response.status().is_server_error() {
        log::error!("{}", line);
    } else {
        log::info!("{}", line);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SocketAddr {
        "127.0.0.1:52000".parse().unwrap()
    }

    #[test]
    fn routes_are_tagged_by_kind() {
        assert_eq!(route_tag("/api/datasets/points2d/points"), "points");
        assert_eq!(route_tag("/api/datasets"), "api");
        assert_eq!(route_tag("/index.html"), "static");
    }

    #[test]
    fn status_classes_get_their_own_color() {
        assert_eq!(status_color(StatusCode::OK), GREEN);
        assert_eq!(status_color(StatusCode::NOT_MODIFIED), CYAN);
        assert_eq!(status_color(StatusCode::NOT_FOUND), YELLOW);
        assert_eq!(status_color(StatusCode::INTERNAL_SERVER_ERROR), RED);
    }

    #[test]
    fn line_carries_request_and_timing() {
        let line = format_line(
            client(),
            &Method::GET,
            "/api/datasets/points4d/info",
            StatusCode::NOT_FOUND,
            Duration::from_micros(2500),
        );
        assert!(line.contains("127.0.0.1"));
        assert!(line.contains("/api/datasets/points4d/info"));
        assert!(line.contains("404"));
        assert!(line.contains("2.5ms"));
    }
}
