use thiserror::Error;

/// Error taxonomy for the proxy core (spec.md §7).
///
/// Configuration and bind errors are fatal at startup; everything else is a value
/// produced on the request path and turned into a client response by the handler
/// that encounters it. Workers never propagate these upward except by logging and
/// closing the offending connection.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("bind error: {0}")]
    Bind(String),

    #[error("route not found: {0}")]
    RouteNotFound(String),

    #[error("middleware denied: {0}")]
    MiddlewareDenied {
        status: u16,
        message: String,
    },

    #[error("upstream connect failed: {0}")]
    UpstreamConnect(String),

    #[error("upstream I/O error: {0}")]
    UpstreamIo(String),

    #[error("malformed request: {0}")]
    ParseError(String),

    #[error("request timed out")]
    Timeout,

    #[error("internal invariant violation: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Map to the HTTP status code a client-facing handler should emit.
    ///
    /// `MiddlewareDenied` carries its own status from the denying middleware;
    /// everything else maps to the fixed code the error class implies per §7.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::RouteNotFound(_) => 404,
            GatewayError::MiddlewareDenied { status, .. } => *status,
            GatewayError::UpstreamConnect(_) => 502,
            GatewayError::ParseError(_) => 400,
            GatewayError::Timeout => 504,
            _ => 500,
        }
    }

    pub fn message(&self) -> String {
        match self {
            GatewayError::MiddlewareDenied { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Minimal JSON error body, written verbatim to the client.
    pub fn to_json_body(&self) -> Vec<u8> {
        let status = self.status_code();
        let msg = self.message();
        format!(r#"{{"error":{},"status":{}}}"#, serde_json::to_string(&msg).unwrap(), status)
            .into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(GatewayError::RouteNotFound("x".into()).status_code(), 404);
        assert_eq!(GatewayError::UpstreamConnect("x".into()).status_code(), 502);
        assert_eq!(GatewayError::ParseError("x".into()).status_code(), 400);
        assert_eq!(GatewayError::Timeout.status_code(), 504);
        assert_eq!(GatewayError::Internal("x".into()).status_code(), 500);
        assert_eq!(
            GatewayError::MiddlewareDenied { status: 429, message: "m".into() }.status_code(),
            429
        );
    }

    #[test]
    fn json_body_is_valid_json_with_status_and_message() {
        let err = GatewayError::MiddlewareDenied { status: 401, message: "nope".into() };
        let body = err.to_json_body();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], 401);
        assert_eq!(parsed["error"], "nope");
    }

    #[test]
    fn route_not_found_display() {
        assert_eq!(
            GatewayError::RouteNotFound("/api".into()).to_string(),
            "route not found: /api"
        );
    }
}
