//! Per-IP request throttling.
//!
//! Fixed one-minute windows: each client IP gets a hit counter that resets
//! when its window ages out.  Coarser than a token bucket but cheap to
//! reason about, and a stale window never survives past the next request or
//! the periodic purge.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::ConnectInfo,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tracing::warn;

/// Length of one counting window.
const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Window {
    opened: Instant,
    hits: u32,
}

#[derive(Clone)]
pub struct Throttle {
    windows: Arc<Mutex<HashMap<IpAddr, Window>>>,
    limit: u32,
}

impl Throttle {
    /// `limit` requests per IP per minute.
    pub fn new(limit: u32) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            limit,
        }
    }

    /// Record one request from `ip`; returns whether it is within budget.
    pub async fn allow(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        let window = windows.entry(ip).or_insert(Window {
            opened: now,
            hits: 0,
        });

        if now.duration_since(window.opened) >= WINDOW {
            window.opened = now;
            window.hits = 0;
        }

        window.hits += 1;
        window.hits <= self.limit
    }

    /// Drop windows that have not seen a request for at least one full
    /// window length.
    pub async fn purge_idle(&self) {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        windows.retain(|_, w| now.duration_since(w.opened) < WINDOW * 2);
    }
}

pub async fn throttle_middleware(
    axum::extract::State(throttle): axum::extract::State<Throttle>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(ip) = client_ip(&req) {
        if !throttle.allow(ip).await {
            warn!(ip = %ip, "Request throttled");
            return Err(StatusCode::TOO_MANY_REQUESTS);
        }
    }

    Ok(next.run(req).await)
}

/// Prefer the socket address; fall back to `X-Forwarded-For` when behind a
/// proxy.
fn client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<std::net::SocketAddr>>() {
        return Some(connect_info.0.ip());
    }

    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limit_enforced_within_window() {
        let throttle = Throttle::new(3);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        for _ in 0..3 {
            assert!(throttle.allow(ip).await);
        }
        assert!(!throttle.allow(ip).await);
    }

    #[tokio::test]
    async fn test_ips_are_independent() {
        let throttle = Throttle::new(1);
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(throttle.allow(a).await);
        assert!(!throttle.allow(a).await);
        assert!(throttle.allow(b).await);
    }

    #[tokio::test]
    async fn test_purge_idle_drops_nothing_fresh() {
        let throttle = Throttle::new(5);
        let ip: IpAddr = "192.168.1.1".parse().unwrap();
        assert!(throttle.allow(ip).await);

        throttle.purge_idle().await;

        let windows = throttle.windows.lock().await;
        assert_eq!(windows.len(), 1);
    }
}
