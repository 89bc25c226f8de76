use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use dashmap::DashMap;

struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Naive fixed-window counter keyed by caller identity (client IP). Suitable
/// for a single-process deployment; the one-method surface keeps it swappable
/// for a shared-store counter.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    entries: DashMap<String, WindowEntry>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            entries: DashMap::new(),
        }
    }

    /// Record one hit for `key` and report whether it is still within the
    /// window's budget.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| WindowEntry {
                count: 0,
                window_start: now,
            });

        if now.duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }
}

/// Derive the client IP from proxy-injected headers, most trustworthy first.
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(ip) = header_str(headers, "cf-connecting-ip") {
        return ip.to_string();
    }
    if let Some(ip) = header_str(headers, "x-real-ip") {
        return ip.to_string();
    }
    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    "unknown".to_string()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));
        // A different caller has its own window.
        assert!(limiter.check("5.6.7.8"));
    }

    #[test]
    fn window_resets_after_elapsing() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));
        assert!(limiter.check("ip"));
        assert!(!limiter.check("ip"));
        std::thread::sleep(Duration::from_millis(15));
        assert!(limiter.check("ip"));
    }

    #[test]
    fn client_ip_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("9.9.9.9, 8.8.8.8"));
        assert_eq!(client_ip(&headers), "9.9.9.9");

        headers.insert("x-real-ip", HeaderValue::from_static("7.7.7.7"));
        assert_eq!(client_ip(&headers), "7.7.7.7");

        headers.insert("cf-connecting-ip", HeaderValue::from_static("6.6.6.6"));
        assert_eq!(client_ip(&headers), "6.6.6.6");

        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }
}
