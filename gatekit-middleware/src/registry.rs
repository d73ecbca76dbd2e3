use crate::middleware::Middleware;
use std::collections::HashMap;
use std::sync::Arc;

pub type MiddlewareFactory = Arc<dyn Fn(&serde_json::Value) -> anyhow::Result<Arc<dyn Middleware>> + Send + Sync>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown middleware type tag {0:?}")]
    UnknownTag(String),
}

/// Maps middleware type tags to factory functions (spec.md §4.4, §9 "Global
/// registry: replace process-wide mutable state with a builder owned by the server
/// orchestrator; registration happens during startup, is frozen before any
/// connection is accepted").
///
/// `gatekit-server` registers the six spec-mandated built-ins plus the supplemental
/// `ip_restriction` tag (see `gatekit-plugins::register_builtins`) before calling
/// `freeze`; any descriptor naming a tag registered after that point — or never
/// registered at all — is a configuration error, never a runtime one.
pub struct MiddlewareRegistry {
    factories: HashMap<String, MiddlewareFactory>,
    frozen: bool,
}

impl MiddlewareRegistry {
    pub fn new() -> MiddlewareRegistry {
        MiddlewareRegistry { factories: HashMap::new(), frozen: false }
    }

    pub fn register(&mut self, tag: impl Into<String>, factory: MiddlewareFactory) {
        assert!(!self.frozen, "cannot register a middleware factory after the registry is frozen");
        let tag = tag.into();
        tracing::info!(tag = %tag, "registered middleware factory");
        self.factories.insert(tag, factory);
    }

    /// Freezes the registry; subsequent `register` calls panic. Called once by the
    /// server orchestrator right before the acceptor starts.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn build(&self, tag: &str, config: &serde_json::Value) -> anyhow::Result<Arc<dyn Middleware>> {
        let factory =
            self.factories.get(tag).ok_or_else(|| RegistryError::UnknownTag(tag.to_string()))?;
        factory(config)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }
}

impl Default for MiddlewareRegistry {
    fn default() -> MiddlewareRegistry {
        MiddlewareRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MiddlewareContext;
    use crate::middleware::MiddlewareOutcome;

    struct AlwaysPass;
    impl Middleware for AlwaysPass {
        fn process(&self, _ctx: &mut MiddlewareContext<'_>) -> MiddlewareOutcome {
            MiddlewareOutcome::Continue
        }
    }

    #[test]
    fn unknown_tag_is_an_error() {
        let registry = MiddlewareRegistry::new();
        assert!(registry.build("nonexistent", &serde_json::json!({})).is_err());
    }

    #[test]
    fn registered_factory_builds_an_instance() {
        let mut registry = MiddlewareRegistry::new();
        registry.register("always_pass", Arc::new(|_cfg: &serde_json::Value| {
            Ok(Arc::new(AlwaysPass) as Arc<dyn Middleware>)
        }));
        registry.freeze();
        assert!(registry.contains("always_pass"));
        assert!(registry.build("always_pass", &serde_json::json!({})).is_ok());
    }

    #[test]
    #[should_panic]
    fn registering_after_freeze_panics() {
        let mut registry = MiddlewareRegistry::new();
        registry.freeze();
        registry.register("late", Arc::new(|_cfg: &serde_json::Value| {
            Ok(Arc::new(AlwaysPass) as Arc<dyn Middleware>)
        }));
    }
}
