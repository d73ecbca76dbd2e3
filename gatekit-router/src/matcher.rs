use gatekit_core::route::{RoutePattern, Segment};
use std::collections::HashMap;

/// Result of matching a single pattern against a single path (spec.md §4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub matched: bool,
    pub bindings: HashMap<String, String>,
}

/// Splits a request path into non-empty segments, skipping the segments produced by
/// leading or consecutive slashes (spec.md §4.1).
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Matches a single pre-parsed pattern against a path. This is the direct,
/// non-trie contract from spec.md §4.1; the trie (`gatekit-router::trie`) gives the
/// same answer across many patterns in one walk and is what the router actually
/// uses, but this free function is the one the testable properties in spec.md §8
/// reason about directly.
pub fn match_pattern(pattern: &RoutePattern, path: &str) -> MatchResult {
    let path_segments = split_path(path);
    let mut bindings = HashMap::new();

    for (i, seg) in pattern.segments.iter().enumerate() {
        match seg {
            Segment::Wildcard => {
                return MatchResult { matched: true, bindings };
            }
            Segment::Literal(lit) => match path_segments.get(i) {
                Some(p) if *p == lit => {}
                _ => return MatchResult { matched: false, bindings: HashMap::new() },
            },
            Segment::Param(name) => match path_segments.get(i) {
                Some(p) => {
                    bindings.insert(name.clone(), (*p).to_string());
                }
                None => return MatchResult { matched: false, bindings: HashMap::new() },
            },
        }
    }

    // No trailing wildcard consumed above: segment counts must match exactly.
    if path_segments.len() != pattern.segments.len() {
        return MatchResult { matched: false, bindings: HashMap::new() };
    }
    MatchResult { matched: true, bindings }
}
