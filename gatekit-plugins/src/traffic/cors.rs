use gatekit_middleware::{Middleware, MiddlewareContext, MiddlewareOutcome};
use serde::Deserialize;

/// `cors` middleware (spec.md §4.4): "Origin header empty, `*` allowed, or
/// explicitly listed" else deny.
#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    #[serde(default = "default_allow_origins")]
    allow_origins: Vec<String>,
    #[serde(default = "default_allow_methods")]
    allow_methods: Vec<String>,
    #[serde(default = "default_allow_headers")]
    allow_headers: Vec<String>,
    #[serde(default)]
    allow_credentials: bool,
    #[serde(default = "default_max_age")]
    max_age: u32,
}

fn default_allow_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_allow_methods() -> Vec<String> {
    vec!["GET".into(), "POST".into(), "PUT".into(), "DELETE".into(), "OPTIONS".into()]
}
fn default_allow_headers() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_max_age() -> u32 {
    5
}

pub struct Cors {
    cfg: CorsConfig,
}

impl Cors {
    pub fn new(cfg: CorsConfig) -> Cors {
        Cors { cfg }
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        self.cfg.allow_origins.iter().any(|o| o == "*" || o == origin)
    }

    fn cors_headers(&self, origin: &str) -> Vec<(String, String)> {
        let origin_value = if self.cfg.allow_origins.iter().any(|o| o == "*") { "*" } else { origin };
        let mut headers = vec![
            ("access-control-allow-origin".to_string(), origin_value.to_string()),
            ("access-control-allow-methods".to_string(), self.cfg.allow_methods.join(", ")),
            ("access-control-allow-headers".to_string(), self.cfg.allow_headers.join(", ")),
            ("access-control-max-age".to_string(), self.cfg.max_age.to_string()),
        ];
        if self.cfg.allow_credentials {
            headers.push(("access-control-allow-credentials".to_string(), "true".to_string()));
        }
        headers
    }
}

impl Middleware for Cors {
    fn process(&self, ctx: &mut MiddlewareContext<'_>) -> MiddlewareOutcome {
        let origin = match ctx.header("Origin") {
            Some(o) if !o.is_empty() => o.to_string(),
            _ => return MiddlewareOutcome::Continue,
        };

        if !self.origin_allowed(&origin) {
            return MiddlewareOutcome::deny(403, "Origin not allowed");
        }

        for (k, v) in self.cors_headers(&origin) {
            ctx.response_headers.insert(k, v);
        }

        if ctx.method == "OPTIONS" {
            let mut resp = gatekit_middleware::MiddlewareResponse::denial(204, "");
            resp.body.clear();
            resp.headers = ctx.response_headers.clone();
            return MiddlewareOutcome::ShortCircuit(resp);
        }

        MiddlewareOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekit_middleware::RouteView;
    use std::collections::HashMap;
    use std::net::SocketAddr;

    fn ctx<'a>(method: &'a str, headers: &'a HashMap<String, String>, route: &'a mut RouteView) -> MiddlewareContext<'a> {
        MiddlewareContext::new(method, "/x", headers, "127.0.0.1:1".parse::<SocketAddr>().unwrap(), None, route, HashMap::new())
    }

    #[test]
    fn no_origin_header_passes_through() {
        let mw = Cors::new(serde_json::from_value(serde_json::json!({})).unwrap());
        let headers = HashMap::new();
        let mut route = RouteView { upstream: "http://u".into() };
        assert!(matches!(mw.process(&mut ctx("GET", &headers, &mut route)), MiddlewareOutcome::Continue));
    }

    #[test]
    fn disallowed_origin_denied() {
        let mw = Cors::new(serde_json::from_value(serde_json::json!({ "allow_origins": ["https://good.com"] })).unwrap());
        let mut headers = HashMap::new();
        headers.insert("Origin".to_string(), "https://evil.com".to_string());
        let mut route = RouteView { upstream: "http://u".into() };
        match mw.process(&mut ctx("GET", &headers, &mut route)) {
            MiddlewareOutcome::ShortCircuit(resp) => assert_eq!(resp.status_code, 403),
            _ => panic!("expected denial"),
        }
    }

    #[test]
    fn wildcard_allows_any_origin() {
        let mw = Cors::new(serde_json::from_value(serde_json::json!({})).unwrap());
        let mut headers = HashMap::new();
        headers.insert("Origin".to_string(), "https://anything.example".to_string());
        let mut route = RouteView { upstream: "http://u".into() };
        assert!(matches!(mw.process(&mut ctx("GET", &headers, &mut route)), MiddlewareOutcome::Continue));
    }

    #[test]
    fn options_preflight_short_circuits_204() {
        let mw = Cors::new(serde_json::from_value(serde_json::json!({})).unwrap());
        let mut headers = HashMap::new();
        headers.insert("Origin".to_string(), "https://example.com".to_string());
        let mut route = RouteView { upstream: "http://u".into() };
        match mw.process(&mut ctx("OPTIONS", &headers, &mut route)) {
            MiddlewareOutcome::ShortCircuit(resp) => assert_eq!(resp.status_code, 204),
            _ => panic!("expected preflight short-circuit"),
        }
    }
}
