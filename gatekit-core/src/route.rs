use serde::{Deserialize, Serialize};

/// HTTP method, as carried on a route's allowed-method set and a request line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Connect,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Connect => "CONNECT",
            HttpMethod::Trace => "TRACE",
        }
    }

    pub fn parse(s: &str) -> Option<HttpMethod> {
        match s {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            "PATCH" => Some(HttpMethod::Patch),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            "CONNECT" => Some(HttpMethod::Connect),
            "TRACE" => Some(HttpMethod::Trace),
            _ => None,
        }
    }
}

/// One segment of a parsed route pattern (spec.md §3, §4.1).
///
/// A wildcard may only ever be the last segment of a pattern; `RoutePattern::parse`
/// enforces this at construction and is the only legal way to build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
}

/// A path pattern, parsed once at router construction and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    pub raw: String,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternError {
    #[error("wildcard segment in pattern {0:?} is not last")]
    WildcardNotTerminal(String),
}

impl RoutePattern {
    /// Parses a path pattern such as `/api/users/:id/*rest` into segments.
    ///
    /// Empty segments produced by leading or consecutive slashes are skipped, matching
    /// the matcher's own skip-empty-segment rule (spec.md §4.1) so that construction and
    /// lookup agree on what counts as "a segment".
    pub fn parse(raw: &str) -> Result<RoutePattern, PatternError> {
        let mut segments = Vec::new();
        let parts: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        for (i, part) in parts.iter().enumerate() {
            let seg = if let Some(name) = part.strip_prefix(':') {
                Segment::Param(name.to_string())
            } else if part.starts_with('*') {
                Segment::Wildcard
            } else {
                Segment::Literal((*part).to_string())
            };
            if matches!(seg, Segment::Wildcard) && i != parts.len() - 1 {
                return Err(PatternError::WildcardNotTerminal(raw.to_string()));
            }
            segments.push(seg);
        }
        Ok(RoutePattern { raw: raw.to_string(), segments })
    }
}

/// One route: pattern, upstream target, allowed methods, and the middleware it runs.
///
/// Owned exclusively by the router; created at router init from config and immutable
/// thereafter (spec.md §3).
#[derive(Debug, Clone)]
pub struct Route {
    pub id: String,
    pub pattern: RoutePattern,
    pub upstream: String,
    pub methods: Vec<HttpMethod>,
    pub middleware: Vec<MiddlewareDescriptor>,
}

impl Route {
    pub fn method_allowed(&self, method: &str) -> bool {
        if self.methods.is_empty() {
            return true;
        }
        self.methods.iter().any(|m| m.as_str() == method)
    }
}

/// Recognized middleware type tag plus opaque per-instance configuration (spec.md §3).
///
/// The tag is free-form text rather than a closed enum: `rate_limit`, `auth`, `acl`,
/// `cache`, `cors`, `auth-scheme-router` are the spec-mandated built-ins, but the
/// registry (gatekit-middleware) accepts any tag a host has registered a factory for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareDescriptor {
    pub tag: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literal_param_wildcard() {
        let p = RoutePattern::parse("/api/users/:id/*rest").unwrap();
        assert_eq!(
            p.segments,
            vec![
                Segment::Literal("api".into()),
                Segment::Literal("users".into()),
                Segment::Param("id".into()),
                Segment::Wildcard,
            ]
        );
    }

    #[test]
    fn rejects_non_terminal_wildcard() {
        let err = RoutePattern::parse("/api/*rest/more").unwrap_err();
        assert!(matches!(err, PatternError::WildcardNotTerminal(_)));
    }

    #[test]
    fn skips_leading_and_consecutive_slashes() {
        let p = RoutePattern::parse("//api//users/").unwrap();
        assert_eq!(
            p.segments,
            vec![Segment::Literal("api".into()), Segment::Literal("users".into())]
        );
    }

    #[test]
    fn method_allowed_empty_means_any() {
        let route = Route {
            id: "r1".into(),
            pattern: RoutePattern::parse("/x").unwrap(),
            upstream: "http://u".into(),
            methods: vec![],
            middleware: vec![],
        };
        assert!(route.method_allowed("DELETE"));
    }
}
