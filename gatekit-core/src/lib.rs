pub mod config;
pub mod error;
pub mod route;
pub mod upstream;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use route::{HttpMethod, MiddlewareDescriptor, Route, RoutePattern, Segment};
pub use upstream::Origin;
