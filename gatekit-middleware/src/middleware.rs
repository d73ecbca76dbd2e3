use crate::context::MiddlewareContext;
use std::collections::HashMap;

/// A fully-formed HTTP response a middleware can short-circuit the chain with —
/// either a denial (401/403/429/...) or a cache hit (200 + cached body).
#[derive(Debug, Clone)]
pub struct MiddlewareResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl MiddlewareResponse {
    pub fn denial(status_code: u16, message: impl Into<String>) -> MiddlewareResponse {
        MiddlewareResponse { status_code, headers: HashMap::new(), body: message.into().into_bytes() }
    }
}

/// The result of running one middleware (spec.md §4.4): either continue to the next
/// one, or stop the chain and return this response to the client.
#[derive(Debug, Clone)]
pub enum MiddlewareOutcome {
    Continue,
    ShortCircuit(MiddlewareResponse),
}

impl MiddlewareOutcome {
    pub fn deny(status_code: u16, message: impl Into<String>) -> MiddlewareOutcome {
        MiddlewareOutcome::ShortCircuit(MiddlewareResponse::denial(status_code, message))
    }
}

/// Trait-object-safe middleware contract (spec.md §4.4 "process(ctx) -> Result").
///
/// `destroy` gives a middleware a chance to release resources (e.g. flush a cache)
/// when the chain that owns it is torn down; the default is a no-op since most
/// built-ins (rate limiting, ACL, CORS) hold nothing that needs explicit cleanup.
pub trait Middleware: Send + Sync {
    fn process(&self, ctx: &mut MiddlewareContext<'_>) -> MiddlewareOutcome;

    fn destroy(&self) {}
}
