//! Client IP extraction
//!
//! `X-Forwarded-For` is only honoured when proxies are trusted; otherwise a client
//! could pick its own rate-limit bucket.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Extract the client IP used as the rate-limit key
///
/// Each trusted proxy appends the address it received the request from, so with
/// `trusted_proxy_count = N > 0` the N-th entry from the end of `X-Forwarded-For` is the
/// client. Entries before it are client-supplied. With no trusted proxies the socket
/// address is used.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    if trusted_proxy_count > 0 {
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| from_forwarded_for(v, trusted_proxy_count))
        {
            return ip.to_string();
        }
    }

    if let Some(addr) = socket_addr {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

fn from_forwarded_for(header_value: &str, trusted_proxy_count: usize) -> Option<IpAddr> {
    let ips: Vec<&str> = header_value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let pos = ips.len().checked_sub(trusted_proxy_count)?;
    ips.get(pos)?.parse().ok()
}
