use std::collections::HashMap;
use std::net::SocketAddr;

/// The mutable part of a route that middleware is allowed to rewrite (spec.md §3:
/// "mutable route view (upstream URL may be rewritten by routing middleware)").
#[derive(Debug, Clone)]
pub struct RouteView {
    pub upstream: String,
}

/// Borrowed-view request/response context passed through a middleware chain.
///
/// Lifetime is strictly inside one request (spec.md §3). `params` starts out holding
/// the router's path-parameter bindings and doubles as scratch space middleware can
/// add to (e.g. JWT claims); `response_headers` lets a middleware like CORS annotate
/// the eventual response without owning it.
pub struct MiddlewareContext<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub headers: &'a HashMap<String, String>,
    pub client_addr: SocketAddr,
    pub body: Option<&'a [u8]>,

    pub route: &'a mut RouteView,
    pub params: HashMap<String, String>,
    pub response_headers: HashMap<String, String>,
}

impl<'a> MiddlewareContext<'a> {
    pub fn new(
        method: &'a str,
        path: &'a str,
        headers: &'a HashMap<String, String>,
        client_addr: SocketAddr,
        body: Option<&'a [u8]>,
        route: &'a mut RouteView,
        params: HashMap<String, String>,
    ) -> MiddlewareContext<'a> {
        MiddlewareContext {
            method,
            path,
            headers,
            client_addr,
            body,
            route,
            params,
            response_headers: HashMap::new(),
        }
    }

    /// Case-insensitive header lookup, matching how HTTP header names are compared
    /// on the wire.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    /// The client identifier rate-limiting and ACL keys on: the first hop of
    /// `X-Forwarded-For` if present, else the connection peer (spec.md §3).
    pub fn client_identifier(&self) -> String {
        if let Some(xff) = self.header("X-Forwarded-For") {
            if let Some(first) = xff.split(',').next() {
                let trimmed = first.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
        self.client_addr.ip().to_string()
    }
}
