use gatekit_middleware::{Middleware, MiddlewareContext, MiddlewareOutcome};
use serde::Deserialize;
use std::collections::HashSet;

/// `auth` middleware, API-key variant (spec.md §4.4: "Request's key header matches
/// a configured key").
#[derive(Debug, Deserialize)]
pub struct ApiKeyAuthConfig {
    keys: Vec<String>,
    #[serde(default = "default_header")]
    header: String,
}

fn default_header() -> String {
    "apikey".to_string()
}

pub struct ApiKeyAuth {
    keys: HashSet<String>,
    header: String,
}

impl ApiKeyAuth {
    pub fn new(cfg: ApiKeyAuthConfig) -> ApiKeyAuth {
        ApiKeyAuth { keys: cfg.keys.into_iter().collect(), header: cfg.header }
    }
}

impl Middleware for ApiKeyAuth {
    fn process(&self, ctx: &mut MiddlewareContext<'_>) -> MiddlewareOutcome {
        let key = match ctx.header(&self.header) {
            Some(k) if !k.is_empty() => k,
            _ => return MiddlewareOutcome::deny(401, "API key missing"),
        };

        if self.keys.contains(key) {
            MiddlewareOutcome::Continue
        } else {
            MiddlewareOutcome::deny(401, "Invalid API key")
        }
    }
}
