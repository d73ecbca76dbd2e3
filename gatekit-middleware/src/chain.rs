use crate::context::MiddlewareContext;
use crate::middleware::{Middleware, MiddlewareOutcome};
use std::sync::Arc;

/// Dynamic middleware chain: a vector of trait-object handles built from route
/// descriptors at startup (spec.md §3, §4.4 realization (a)).
pub struct Chain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Chain {
        Chain { middlewares }
    }

    /// Runs instances in declared order; the first `ShortCircuit` stops evaluation
    /// and its response is returned (spec.md §4.4).
    pub fn process(&self, ctx: &mut MiddlewareContext<'_>) -> MiddlewareOutcome {
        for mw in &self.middlewares {
            match mw.process(ctx) {
                MiddlewareOutcome::Continue => continue,
                short_circuit @ MiddlewareOutcome::ShortCircuit(_) => return short_circuit,
            }
        }
        MiddlewareOutcome::Continue
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl Drop for Chain {
    fn drop(&mut self) {
        for mw in &self.middlewares {
            mw.destroy();
        }
    }
}
