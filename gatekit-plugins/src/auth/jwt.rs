use gatekit_middleware::{Middleware, MiddlewareContext, MiddlewareOutcome};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// `auth` middleware, JWT variant (spec.md §4.4: "`Authorization: Bearer …` parses
/// and verifies against secret").
#[derive(Debug, Deserialize)]
pub struct JwtAuthConfig {
    secret: String,
    #[serde(default = "default_algorithm")]
    algorithm: String,
    #[serde(default = "default_header")]
    header: String,
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_header() -> String {
    "authorization".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Claims {
    sub: Option<String>,
    exp: Option<u64>,
    #[serde(flatten)]
    extra: std::collections::HashMap<String, serde_json::Value>,
}

pub struct JwtAuth {
    decoding_key: DecodingKey,
    validation: Validation,
    header: String,
}

const DENIAL_MESSAGE: &str = "Unauthorized: Missing or invalid JWT token";

impl JwtAuth {
    pub fn new(cfg: JwtAuthConfig) -> anyhow::Result<JwtAuth> {
        let algorithm: Algorithm =
            cfg.algorithm.parse().map_err(|_| anyhow::anyhow!("unknown JWT algorithm: {}", cfg.algorithm))?;
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        Ok(JwtAuth {
            decoding_key: DecodingKey::from_secret(cfg.secret.as_bytes()),
            validation,
            header: cfg.header,
        })
    }
}

impl Middleware for JwtAuth {
    fn process(&self, ctx: &mut MiddlewareContext<'_>) -> MiddlewareOutcome {
        let raw = match ctx.header(&self.header) {
            Some(h) => h,
            None => return MiddlewareOutcome::deny(401, DENIAL_MESSAGE),
        };

        let token = raw.strip_prefix("Bearer ").or_else(|| raw.strip_prefix("bearer ")).unwrap_or(raw).trim();

        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => {
                if let Some(sub) = data.claims.sub {
                    ctx.params.insert("jwt_sub".to_string(), sub);
                }
                MiddlewareOutcome::Continue
            }
            Err(_) => MiddlewareOutcome::deny(401, DENIAL_MESSAGE),
        }
    }
}
