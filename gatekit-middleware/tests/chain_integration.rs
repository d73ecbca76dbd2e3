use gatekit_middleware::{Chain, MiddlewareContext, MiddlewareOutcome, MiddlewareRegistry, RouteView};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

struct RewriteUpstream;
impl gatekit_middleware::Middleware for RewriteUpstream {
    fn process(&self, ctx: &mut MiddlewareContext<'_>) -> MiddlewareOutcome {
        ctx.route.upstream = "http://rewritten:9000".to_string();
        MiddlewareOutcome::Continue
    }
}

#[test]
fn registry_built_chain_runs_in_declared_order_and_can_rewrite_the_route() {
    let mut registry = MiddlewareRegistry::new();
    registry.register(
        "rewrite",
        Arc::new(|_cfg: &serde_json::Value| Ok(Arc::new(RewriteUpstream) as Arc<dyn gatekit_middleware::Middleware>)),
    );
    registry.freeze();

    let instance = registry.build("rewrite", &serde_json::json!({})).unwrap();
    let chain = Chain::new(vec![instance]);

    let mut route = RouteView { upstream: "http://original:9000".to_string() };
    let headers = HashMap::new();
    let mut ctx = MiddlewareContext::new(
        "GET",
        "/x",
        &headers,
        "127.0.0.1:1".parse::<SocketAddr>().unwrap(),
        None,
        &mut route,
        HashMap::new(),
    );
    assert!(matches!(chain.process(&mut ctx), MiddlewareOutcome::Continue));
    assert_eq!(route.upstream, "http://rewritten:9000");
}

#[test]
fn unregistered_tag_fails_chain_construction_not_request_handling() {
    let registry = MiddlewareRegistry::new();
    assert!(registry.build("rate_limit", &serde_json::json!({})).is_err());
}
