pub mod chain;
pub mod context;
pub mod middleware;
pub mod registry;
pub mod static_chain;

pub use chain::Chain;
pub use context::{MiddlewareContext, RouteView};
pub use middleware::{Middleware, MiddlewareOutcome, MiddlewareResponse};
pub use registry::{MiddlewareFactory, MiddlewareRegistry, RegistryError};
pub use static_chain::StaticMiddleware;
