use crate::matcher::split_path;
use crate::trie::Trie;
use gatekit_core::route::{HttpMethod, Route};
use std::collections::HashMap;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RouterError {
    #[error("route {0:?} has an unrecognized method {1:?}")]
    UnknownMethod(String, String),
}

/// Router (spec.md §3, §4.2, component C1+C8).
///
/// Owns every route exclusively; built once from config and never mutated after
/// publication. `find_route` consults the method-specific trie first, falling back
/// to the "ANY" trie built from routes with no method restriction.
pub struct Router {
    routes: Vec<Route>,
    method_tries: HashMap<HttpMethod, Trie>,
    any_trie: Trie,
}

/// A successful route lookup: the matched route and its extracted parameters.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub bindings: HashMap<String, String>,
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Result<Router, RouterError> {
        let mut method_tries: HashMap<HttpMethod, Trie> = HashMap::new();
        let mut any_trie = Trie::new();

        for (idx, route) in routes.iter().enumerate() {
            if route.methods.is_empty() {
                any_trie.insert(&route.pattern.segments, idx);
            } else {
                for method in &route.methods {
                    method_tries.entry(*method).or_default().insert(&route.pattern.segments, idx);
                }
            }
        }

        Ok(Router { routes, method_tries, any_trie })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// `find_route(method, path)` (spec.md §4.2): method-specific trie first, then ANY.
    pub fn find_route(&self, method: &str, path: &str) -> Option<RouteMatch<'_>> {
        let segments = split_path(path);
        let parsed_method = HttpMethod::parse(method);

        if let Some(m) = parsed_method {
            if let Some(trie) = self.method_tries.get(&m) {
                if let Some((idx, bindings)) = trie.lookup(&segments) {
                    return Some(RouteMatch {
                        route: &self.routes[idx],
                        bindings: bindings.into_iter().collect(),
                    });
                }
            }
        }

        self.any_trie.lookup(&segments).map(|(idx, bindings)| RouteMatch {
            route: &self.routes[idx],
            bindings: bindings.into_iter().collect(),
        })
    }
}
