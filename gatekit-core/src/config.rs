use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Materialized gateway configuration (spec.md §6).
///
/// This struct is the entire contract the core has with configuration loading: the
/// core consumes it, never parses files itself (spec.md §1, "JSON configuration
/// loading" is an out-of-scope external collaborator). `gatekit-server` is the one
/// piece that turns a JSON file on disk into this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_thread_count")]
    pub thread_count: usize,

    #[serde(default = "default_backlog")]
    pub backlog: u32,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    #[serde(default = "default_protocols")]
    pub protocols: HashSet<Protocol>,

    #[serde(default)]
    pub tls: TlsConfig,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    #[serde(default)]
    pub middlewares: Vec<MiddlewareConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http1,
    Http2,
    Websocket,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub enabled: bool,
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    #[serde(default)]
    pub sni_certs: Vec<SniCert>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SniCert {
    pub hostname: String,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// One entry of `routes[]`: a path pattern, its upstream, allowed methods, and the
/// names of `middlewares[]` entries to run, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub path: String,
    pub upstream: String,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub middleware: Vec<String>,
}

/// One entry of `middlewares[]`: a named, typed, opaquely-configured middleware
/// instance that routes reference by `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_thread_count() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

fn default_backlog() -> u32 {
    1024
}

fn default_max_connections() -> usize {
    64
}

fn default_connection_timeout_ms() -> u64 {
    30_000
}

fn default_protocols() -> HashSet<Protocol> {
    [Protocol::Http1, Protocol::Http2, Protocol::Websocket].into_iter().collect()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            host: default_host(),
            port: default_port(),
            thread_count: default_thread_count(),
            backlog: default_backlog(),
            max_connections: default_max_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            protocols: default_protocols(),
            tls: TlsConfig::default(),
            routes: Vec::new(),
            middlewares: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_all_protocols() {
        let cfg = GatewayConfig::default();
        assert!(cfg.protocols.contains(&Protocol::Http1));
        assert!(cfg.protocols.contains(&Protocol::Http2));
        assert!(cfg.protocols.contains(&Protocol::Websocket));
        assert!(!cfg.tls.enabled);
    }

    #[test]
    fn deserializes_minimal_json() {
        let json = r#"{"host":"127.0.0.1","port":9000,"routes":[
            {"path":"/api","upstream":"http://u:80","methods":["GET"],"middleware":["rl"]}
        ],"middlewares":[{"name":"rl","type":"rate_limit","config":{"requests_per_minute":60}}]}"#;
        let cfg: GatewayConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.routes.len(), 1);
        assert_eq!(cfg.middlewares[0].tag, "rate_limit");
        // unset fields still take their defaults
        assert_eq!(cfg.backlog, default_backlog());
    }

    #[test]
    fn protocol_subset_restricts_enabled_set() {
        let json = r#"{"protocols":["http1"]}"#;
        let cfg: GatewayConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.protocols.len(), 1);
        assert!(cfg.protocols.contains(&Protocol::Http1));
        assert!(!cfg.protocols.contains(&Protocol::Http2));
    }
}
