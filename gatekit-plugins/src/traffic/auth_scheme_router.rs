use gatekit_middleware::{Middleware, MiddlewareContext, MiddlewareOutcome};
use serde::Deserialize;
use std::collections::HashMap;

/// `auth-scheme-router` middleware (spec.md §4.4): "Always passes; rewrites the
/// route's upstream URL based on the token scheme".
#[derive(Debug, Deserialize)]
pub struct AuthSchemeRouterConfig {
    /// Maps a lowercased `Authorization` scheme word (e.g. `"bearer"`, `"apikey"`)
    /// to the upstream origin a matching request should be routed to.
    routes: HashMap<String, String>,
    #[serde(default = "default_header")]
    header: String,
}

fn default_header() -> String {
    "authorization".to_string()
}

pub struct AuthSchemeRouter {
    routes: HashMap<String, String>,
    header: String,
}

impl AuthSchemeRouter {
    pub fn new(cfg: AuthSchemeRouterConfig) -> AuthSchemeRouter {
        AuthSchemeRouter { routes: cfg.routes, header: cfg.header }
    }
}

impl Middleware for AuthSchemeRouter {
    fn process(&self, ctx: &mut MiddlewareContext<'_>) -> MiddlewareOutcome {
        if let Some(value) = ctx.header(&self.header) {
            if let Some(scheme) = value.split_whitespace().next() {
                if let Some(upstream) = self.routes.get(&scheme.to_ascii_lowercase()) {
                    ctx.route.upstream = upstream.clone();
                }
            }
        }
        MiddlewareOutcome::Continue
    }
}
