use std::fmt;

/// A parsed upstream origin: the host:port:scheme triple a route forwards to
/// (spec.md §3 "Upstream origin").
///
/// Parsed once when a route or pool is built from config; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Ws,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OriginError {
    #[error("invalid upstream URL {0:?}: {1}")]
    Malformed(String, &'static str),
}

impl Origin {
    /// Parses `http://host:port`, `https://host:port` (https is accepted and treated
    /// identically to http at this layer — TLS termination to upstreams is a
    /// collaborator concern, not this crate's), or `ws://host:port`.
    pub fn parse(url: &str) -> Result<Origin, OriginError> {
        let (scheme_str, rest) = url
            .split_once("://")
            .ok_or_else(|| OriginError::Malformed(url.to_string(), "missing scheme"))?;
        let scheme = match scheme_str {
            "http" | "https" => Scheme::Http,
            "ws" | "wss" => Scheme::Ws,
            _ => return Err(OriginError::Malformed(url.to_string(), "unrecognized scheme")),
        };
        let authority = rest.split('/').next().unwrap_or(rest);
        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) => {
                let port: u16 = p
                    .parse()
                    .map_err(|_| OriginError::Malformed(url.to_string(), "invalid port"))?;
                (h.to_string(), port)
            }
            None => {
                let port = if matches!(scheme, Scheme::Http) { 80 } else { 80 };
                (authority.to_string(), port)
            }
        };
        if host.is_empty() {
            return Err(OriginError::Malformed(url.to_string(), "empty host"));
        }
        Ok(Origin { scheme, host, port })
    }

    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.scheme {
            Scheme::Http => "http",
            Scheme::Ws => "ws",
        };
        write!(f, "{scheme}://{}:{}", self.host, self.port)
    }
}
