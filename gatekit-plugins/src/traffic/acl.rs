use gatekit_middleware::{Middleware, MiddlewareContext, MiddlewareOutcome};
use serde::Deserialize;

/// `acl` middleware (spec.md §4.4): "Any rule matching path+method lists a role the
/// caller holds". A rule with an empty `methods` list matches any method.
#[derive(Debug, Deserialize)]
pub struct AclRule {
    #[serde(default)]
    methods: Vec<String>,
    path: String,
    roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AclConfig {
    rules: Vec<AclRule>,
    #[serde(default = "default_roles_header")]
    roles_header: String,
}

fn default_roles_header() -> String {
    "x-roles".to_string()
}

pub struct Acl {
    rules: Vec<AclRule>,
    roles_header: String,
}

impl Acl {
    pub fn new(cfg: AclConfig) -> Acl {
        Acl { rules: cfg.rules, roles_header: cfg.roles_header }
    }

    fn caller_roles(&self, ctx: &MiddlewareContext<'_>) -> Vec<String> {
        ctx.header(&self.roles_header)
            .map(|h| h.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }
}

impl Middleware for Acl {
    fn process(&self, ctx: &mut MiddlewareContext<'_>) -> MiddlewareOutcome {
        let caller_roles = self.caller_roles(ctx);

        let allowed = self.rules.iter().any(|rule| {
            let path_matches = rule.path == ctx.path;
            let method_matches = rule.methods.is_empty() || rule.methods.iter().any(|m| m.eq_ignore_ascii_case(ctx.method));
            path_matches && method_matches && rule.roles.iter().any(|r| caller_roles.contains(r))
        });

        if allowed {
            MiddlewareOutcome::Continue
        } else {
            MiddlewareOutcome::deny(403, "Access denied")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekit_middleware::RouteView;
    use std::collections::HashMap;
    use std::net::SocketAddr;

    fn mw() -> Acl {
        Acl::new(AclConfig {
            rules: vec![AclRule { methods: vec!["GET".into()], path: "/admin".into(), roles: vec!["admin".into()] }],
            roles_header: "x-roles".into(),
        })
    }

    fn ctx<'a>(path: &'a str, headers: &'a HashMap<String, String>, route: &'a mut RouteView) -> MiddlewareContext<'a> {
        MiddlewareContext::new("GET", path, headers, "127.0.0.1:1".parse::<SocketAddr>().unwrap(), None, route, HashMap::new())
    }

    #[test]
    fn caller_with_required_role_is_allowed() {
        let mut headers = HashMap::new();
        headers.insert("x-roles".to_string(), "admin, editor".to_string());
        let mut route = RouteView { upstream: "http://u".into() };
        assert!(matches!(mw().process(&mut ctx("/admin", &headers, &mut route)), MiddlewareOutcome::Continue));
    }

    #[test]
    fn caller_without_required_role_is_denied() {
        let mut headers = HashMap::new();
        headers.insert("x-roles".to_string(), "editor".to_string());
        let mut route = RouteView { upstream: "http://u".into() };
        match mw().process(&mut ctx("/admin", &headers, &mut route)) {
            MiddlewareOutcome::ShortCircuit(resp) => assert_eq!(resp.status_code, 403),
            _ => panic!("expected denial"),
        }
    }

    #[test]
    fn path_not_covered_by_any_rule_is_denied() {
        let headers = HashMap::new();
        let mut route = RouteView { upstream: "http://u".into() };
        assert!(matches!(mw().process(&mut ctx("/public", &headers, &mut route)), MiddlewareOutcome::ShortCircuit(_)));
    }
}
