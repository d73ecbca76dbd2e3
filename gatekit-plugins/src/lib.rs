pub mod auth;
pub mod traffic;

use gatekit_middleware::MiddlewareRegistry;
use std::sync::Arc;

/// Registers the spec-mandated built-ins plus the supplemental `ip_restriction` tag
/// (SPEC_FULL.md §5). Called once by the server orchestrator before `freeze`.
pub fn register_builtins(registry: &mut MiddlewareRegistry) {
    registry.register("auth", Arc::new(|config: &serde_json::Value| auth::build(config)));

    registry.register(
        "rate_limit",
        Arc::new(|config: &serde_json::Value| {
            let cfg = serde_json::from_value(config.clone())
                .map_err(|e| anyhow::anyhow!("rate_limit config error: {e}"))?;
            Ok(Arc::new(traffic::rate_limit::RateLimit::new(cfg)) as Arc<dyn gatekit_middleware::Middleware>)
        }),
    );

    registry.register(
        "acl",
        Arc::new(|config: &serde_json::Value| {
            let cfg = serde_json::from_value(config.clone()).map_err(|e| anyhow::anyhow!("acl config error: {e}"))?;
            Ok(Arc::new(traffic::acl::Acl::new(cfg)) as Arc<dyn gatekit_middleware::Middleware>)
        }),
    );

    registry.register(
        "cors",
        Arc::new(|config: &serde_json::Value| {
            let cfg = serde_json::from_value(config.clone()).map_err(|e| anyhow::anyhow!("cors config error: {e}"))?;
            Ok(Arc::new(traffic::cors::Cors::new(cfg)) as Arc<dyn gatekit_middleware::Middleware>)
        }),
    );

    registry.register(
        "cache",
        Arc::new(|config: &serde_json::Value| {
            let cfg = serde_json::from_value(config.clone()).map_err(|e| anyhow::anyhow!("cache config error: {e}"))?;
            Ok(Arc::new(traffic::cache::Cache::new(cfg)) as Arc<dyn gatekit_middleware::Middleware>)
        }),
    );

    registry.register(
        "auth-scheme-router",
        Arc::new(|config: &serde_json::Value| {
            let cfg = serde_json::from_value(config.clone())
                .map_err(|e| anyhow::anyhow!("auth-scheme-router config error: {e}"))?;
            Ok(Arc::new(traffic::auth_scheme_router::AuthSchemeRouter::new(cfg)) as Arc<dyn gatekit_middleware::Middleware>)
        }),
    );

    registry.register(
        "ip_restriction",
        Arc::new(|config: &serde_json::Value| {
            let cfg = serde_json::from_value(config.clone())
                .map_err(|e| anyhow::anyhow!("ip_restriction config error: {e}"))?;
            Ok(Arc::new(traffic::ip_restriction::IpRestriction::new(cfg)) as Arc<dyn gatekit_middleware::Middleware>)
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_builtins_covers_every_spec_mandated_tag() {
        let mut registry = MiddlewareRegistry::new();
        register_builtins(&mut registry);
        for tag in ["auth", "rate_limit", "acl", "cors", "cache", "auth-scheme-router", "ip_restriction"] {
            assert!(registry.contains(tag), "missing builtin tag: {tag}");
        }
    }
}
