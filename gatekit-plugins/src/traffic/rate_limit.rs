use gatekit_middleware::{Middleware, MiddlewareContext, MiddlewareOutcome};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

/// `rate_limit` middleware (spec.md §4.4): fixed 60-second buckets per client,
/// reset lazily on the first request past the window's reset time.
#[derive(Debug, Deserialize)]
pub struct RateLimitConfig {
    requests_per_minute: u64,
}

pub struct RateLimit {
    requests_per_minute: u64,
    counters: Mutex<HashMap<String, (u64, Instant)>>,
}

impl RateLimit {
    pub fn new(cfg: RateLimitConfig) -> RateLimit {
        RateLimit { requests_per_minute: cfg.requests_per_minute, counters: Mutex::new(HashMap::new()) }
    }
}

impl Middleware for RateLimit {
    fn process(&self, ctx: &mut MiddlewareContext<'_>) -> MiddlewareOutcome {
        let key = ctx.client_identifier();
        let now = Instant::now();

        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let entry = counters.entry(key).or_insert((0, now));

        if now.duration_since(entry.1) >= WINDOW {
            entry.0 = 0;
            entry.1 = now;
        }
        entry.0 += 1;

        if entry.0 > self.requests_per_minute {
            MiddlewareOutcome::deny(429, "Rate limit exceeded")
        } else {
            MiddlewareOutcome::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekit_middleware::RouteView;
    use std::net::SocketAddr;

    fn ctx<'a>(headers: &'a HashMap<String, String>, route: &'a mut RouteView) -> MiddlewareContext<'a> {
        MiddlewareContext::new("GET", "/x", headers, "127.0.0.1:1".parse::<SocketAddr>().unwrap(), None, route, HashMap::new())
    }

    #[test]
    fn third_request_in_window_is_denied() {
        let mw = RateLimit::new(RateLimitConfig { requests_per_minute: 2 });
        let headers = HashMap::new();
        let mut route = RouteView { upstream: "http://u".into() };

        assert!(matches!(mw.process(&mut ctx(&headers, &mut route)), MiddlewareOutcome::Continue));
        assert!(matches!(mw.process(&mut ctx(&headers, &mut route)), MiddlewareOutcome::Continue));
        match mw.process(&mut ctx(&headers, &mut route)) {
            MiddlewareOutcome::ShortCircuit(resp) => {
                assert_eq!(resp.status_code, 429);
                assert_eq!(resp.body, b"Rate limit exceeded");
            }
            MiddlewareOutcome::Continue => panic!("expected 429 on third request"),
        }
    }

    #[test]
    fn distinct_clients_get_independent_counters() {
        let mw = RateLimit::new(RateLimitConfig { requests_per_minute: 1 });
        let mut route = RouteView { upstream: "http://u".into() };

        let mut h1 = HashMap::new();
        h1.insert("X-Forwarded-For".to_string(), "1.1.1.1".to_string());
        let mut h2 = HashMap::new();
        h2.insert("X-Forwarded-For".to_string(), "2.2.2.2".to_string());

        assert!(matches!(mw.process(&mut ctx(&h1, &mut route)), MiddlewareOutcome::Continue));
        assert!(matches!(mw.process(&mut ctx(&h2, &mut route)), MiddlewareOutcome::Continue));
    }
}
