use gatekit_middleware::{Middleware, MiddlewareContext, MiddlewareOutcome};
use ipnet::IpNet;
use serde::Deserialize;
use std::net::IpAddr;
use std::str::FromStr;

/// Supplemental `ip_restriction` middleware (SPEC_FULL.md §5): CIDR allowlist/
/// denylist over the connection's peer address. Denylist takes priority.
#[derive(Debug, Deserialize, Default)]
pub struct IpRestrictionConfig {
    #[serde(default)]
    allowlist: Vec<String>,
    #[serde(default)]
    denylist: Vec<String>,
}

pub struct IpRestriction {
    allowlist: Vec<IpNet>,
    denylist: Vec<IpNet>,
}

fn parse_list(list: &[String]) -> Vec<IpNet> {
    list.iter()
        .filter_map(|s| {
            IpNet::from_str(s).ok().or_else(|| {
                IpAddr::from_str(s).ok().map(|ip| match ip {
                    IpAddr::V4(a) => IpNet::from(ipnet::Ipv4Net::from(a)),
                    IpAddr::V6(a) => IpNet::from(ipnet::Ipv6Net::from(a)),
                })
            })
        })
        .collect()
}

impl IpRestriction {
    pub fn new(cfg: IpRestrictionConfig) -> IpRestriction {
        IpRestriction { allowlist: parse_list(&cfg.allowlist), denylist: parse_list(&cfg.denylist) }
    }

    fn matches_any(ip: &IpAddr, list: &[IpNet]) -> bool {
        list.iter().any(|net| net.contains(ip))
    }
}

impl Middleware for IpRestriction {
    fn process(&self, ctx: &mut MiddlewareContext<'_>) -> MiddlewareOutcome {
        let ip = ctx.client_addr.ip();

        if !self.denylist.is_empty() && Self::matches_any(&ip, &self.denylist) {
            return MiddlewareOutcome::deny(403, "IP not allowed");
        }
        if !self.allowlist.is_empty() && !Self::matches_any(&ip, &self.allowlist) {
            return MiddlewareOutcome::deny(403, "IP not allowed");
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

    fn ctx<'a>(addr: &str, headers: &'a HashMap<String, String>, route: &'a mut RouteView) -> MiddlewareContext<'a> {
        MiddlewareContext::new("GET", "/x", headers, addr.parse::<SocketAddr>().unwrap(), None, route, HashMap::new())
    }

    #[test]
    fn no_restrictions_allows_any_ip() {
        let mw = IpRestriction::new(IpRestrictionConfig::default());
        let headers = HashMap::new();
        let mut route = RouteView { upstream: "http://u".into() };
        assert!(matches!(mw.process(&mut ctx("1.2.3.4:9", &headers, &mut route)), MiddlewareOutcome::Continue));
    }

    #[test]
    fn denylist_blocks_cidr_match() {
        let mw = IpRestriction::new(IpRestrictionConfig { allowlist: vec![], denylist: vec!["10.0.0.0/8".into()] });
        let headers = HashMap::new();
        let mut route = RouteView { upstream: "http://u".into() };
        assert!(matches!(mw.process(&mut ctx("10.0.0.5:9", &headers, &mut route)), MiddlewareOutcome::ShortCircuit(_)));
    }

    #[test]
    fn allowlist_blocks_non_matching_ip() {
        let mw = IpRestriction::new(IpRestrictionConfig { allowlist: vec!["192.168.0.0/24".into()], denylist: vec![] });
        let headers = HashMap::new();
        let mut route = RouteView { upstream: "http://u".into() };
        assert!(matches!(mw.process(&mut ctx("10.0.0.1:9", &headers, &mut route)), MiddlewareOutcome::ShortCircuit(_)));
    }

    #[test]
    fn denylist_takes_priority_over_allowlist() {
        let mw = IpRestriction::new(IpRestrictionConfig {
            allowlist: vec!["192.168.1.0/24".into()],
            denylist: vec!["192.168.1.5".into()],
        });
        let headers = HashMap::new();
        let mut route = RouteView { upstream: "http://u".into() };
        assert!(matches!(mw.process(&mut ctx("192.168.1.5:9", &headers, &mut route)), MiddlewareOutcome::ShortCircuit(_)));
    }
}
