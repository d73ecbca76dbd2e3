pub mod api_key;
pub mod jwt;

use api_key::{ApiKeyAuth, ApiKeyAuthConfig};
use gatekit_middleware::Middleware;
use jwt::{JwtAuth, JwtAuthConfig};
use serde::Deserialize;
use std::sync::Arc;

/// The `auth` tag covers two middleware descriptor shapes (spec.md §3, §4.4): JWT
/// bearer-token verification and static API-key matching, picked by `scheme`.
#[derive(Debug, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
enum AuthConfig {
    Jwt(JwtAuthConfig),
    ApiKey(ApiKeyAuthConfig),
}

pub fn build(config: &serde_json::Value) -> anyhow::Result<Arc<dyn Middleware>> {
    let cfg: AuthConfig = serde_json::from_value(config.clone())
        .map_err(|e| anyhow::anyhow!("auth config error: {e}"))?;
    match cfg {
        AuthConfig::Jwt(cfg) => Ok(Arc::new(JwtAuth::new(cfg)?)),
        AuthConfig::ApiKey(cfg) => Ok(Arc::new(ApiKeyAuth::new(cfg))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_scheme_builds_jwt_instance() {
        let config = serde_json::json!({ "scheme": "jwt", "secret": "s" });
        assert!(build(&config).is_ok());
    }

    #[test]
    fn api_key_scheme_builds_api_key_instance() {
        let config = serde_json::json!({ "scheme": "api_key", "keys": ["k1"] });
        assert!(build(&config).is_ok());
    }

    #[test]
    fn unknown_scheme_is_a_config_error() {
        let config = serde_json::json!({ "scheme": "oauth2" });
        assert!(build(&config).is_err());
    }
}
