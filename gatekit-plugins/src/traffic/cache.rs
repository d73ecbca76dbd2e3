use gatekit_middleware::{Middleware, MiddlewareContext, MiddlewareOutcome, MiddlewareResponse};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// `cache` middleware (spec.md §4.4): "Non-GET always pass; GET miss passes; GET hit
/// returns cached response". Cleanup happens on each access (spec.md §4.4, §5).
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_seconds")]
    ttl_seconds: u64,
}

fn default_ttl_seconds() -> u64 {
    60
}

struct Entry {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    expires_at: Instant,
}

/// Owns the response cache. `process` only ever reads it; a successful upstream
/// response is recorded afterward by calling `store` directly — the proxy holds the
/// concrete `Cache` (not the `dyn Middleware` handle) for routes that use this tag.
pub struct Cache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl Cache {
    pub fn new(cfg: CacheConfig) -> Cache {
        Cache { ttl: Duration::from_secs(cfg.ttl_seconds), entries: Mutex::new(HashMap::new()) }
    }

    pub fn store(&self, key: String, status: u16, headers: HashMap<String, String>, body: Vec<u8>) {
        let expires_at = Instant::now() + self.ttl;
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).insert(key, Entry { status, headers, body, expires_at });
    }
}

impl Middleware for Cache {
    fn process(&self, ctx: &mut MiddlewareContext<'_>) -> MiddlewareOutcome {
        if ctx.method != "GET" {
            return MiddlewareOutcome::Continue;
        }

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        match entries.get(ctx.path) {
            Some(entry) if entry.expires_at > now => {
                MiddlewareOutcome::ShortCircuit(MiddlewareResponse {
                    status_code: entry.status,
                    headers: entry.headers.clone(),
                    body: entry.body.clone(),
                })
            }
            Some(_) => {
                entries.remove(ctx.path);
                MiddlewareOutcome::Continue
            }
            None => MiddlewareOutcome::Continue,
        }
    }
}
