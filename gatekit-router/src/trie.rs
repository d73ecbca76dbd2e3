use gatekit_core::route::Segment;
use std::collections::HashMap;

/// A single trie node: a literal-children map, at most one parameter child, and at
/// most one wildcard child (spec.md §4.2).
#[derive(Debug, Default)]
struct Node {
    literal: HashMap<String, Node>,
    param: Option<(String, Box<Node>)>,
    wildcard: Option<Box<Node>>,
    route_idx: Option<usize>,
}

/// One trie, used either per-method or as the "ANY" fallback (spec.md §3, §4.2).
#[derive(Debug, Default)]
pub struct Trie {
    root: Node,
}

impl Trie {
    pub fn new() -> Trie {
        Trie::default()
    }

    /// Walks the pattern's segments, creating or reusing nodes, and stores `route_idx`
    /// at the terminal node. A wildcard segment is always last (enforced by
    /// `RoutePattern::parse`), so the loop's final node is always where `route_idx`
    /// belongs, wildcard or not.
    pub fn insert(&mut self, segments: &[Segment], route_idx: usize) {
        let mut node = &mut self.root;
        for seg in segments {
            node = match seg {
                Segment::Literal(s) => node.literal.entry(s.clone()).or_default(),
                Segment::Param(name) => {
                    if node.param.is_none() {
                        node.param = Some((name.clone(), Box::new(Node::default())));
                    }
                    &mut node.param.as_mut().unwrap().1
                }
                Segment::Wildcard => node.wildcard.get_or_insert_with(Box::default),
            };
        }
        node.route_idx = Some(route_idx);
    }

    /// Looks up a path, preferring a literal edge, then a parameter edge, then a
    /// wildcard edge at each node (spec.md §4.2). A wildcard edge is terminal:
    /// reaching one ends the walk with that node's route regardless of what path
    /// remains. Lookup never fails outright; it simply returns `None`.
    pub fn lookup(&self, path_segments: &[&str]) -> Option<(usize, Vec<(String, String)>)> {
        let mut bindings = Vec::new();
        let idx = Self::lookup_rec(&self.root, path_segments, &mut bindings)?;
        Some((idx, bindings))
    }

    fn lookup_rec(node: &Node, segments: &[&str], bindings: &mut Vec<(String, String)>) -> Option<usize> {
        let Some((head, rest)) = segments.split_first() else {
            return node.route_idx;
        };

        if let Some(child) = node.literal.get(*head) {
            if let Some(idx) = Self::lookup_rec(child, rest, bindings) {
                return Some(idx);
            }
        }

        if let Some((name, child)) = &node.param {
            bindings.push((name.clone(), (*head).to_string()));
            if let Some(idx) = Self::lookup_rec(child, rest, bindings) {
                return Some(idx);
            }
            bindings.pop();
        }

        if let Some(child) = &node.wildcard {
            return child.route_idx;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekit_core::route::RoutePattern;

    fn segs(p: &str) -> Vec<Segment> {
        RoutePattern::parse(p).unwrap().segments
    }

    fn path_of(p: &str) -> Vec<&str> {
        p.split('/').filter(|s| !s.is_empty()).collect()
    }

    #[test]
    fn literal_beats_param_at_same_depth() {
        let mut trie = Trie::new();
        trie.insert(&segs("/api/users/:id"), 0);
        trie.insert(&segs("/api/users/me"), 1);
        let (idx, bindings) = trie.lookup(&path_of("/api/users/me")).unwrap();
        assert_eq!(idx, 1);
        assert!(bindings.is_empty());

        let (idx, bindings) = trie.lookup(&path_of("/api/users/42")).unwrap();
        assert_eq!(idx, 0);
        assert_eq!(bindings, vec![("id".to_string(), "42".to_string())]);
    }

    #[test]
    fn param_beats_wildcard() {
        let mut trie = Trie::new();
        trie.insert(&segs("/files/*rest"), 0);
        trie.insert(&segs("/files/:name"), 1);
        let (idx, _) = trie.lookup(&path_of("/files/report.pdf")).unwrap();
        assert_eq!(idx, 1);
    }

    #[test]
    fn wildcard_matches_multi_segment_remainder() {
        let mut trie = Trie::new();
        trie.insert(&segs("/static/*rest"), 0);
        let (idx, _) = trie.lookup(&path_of("/static/css/app/deep.css")).unwrap();
        assert_eq!(idx, 0);
    }

    #[test]
    fn no_match_returns_none() {
        let mut trie = Trie::new();
        trie.insert(&segs("/api/users"), 0);
        assert!(trie.lookup(&path_of("/other")).is_none());
    }
}
