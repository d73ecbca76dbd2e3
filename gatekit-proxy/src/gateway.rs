//! Assembles the router, per-route middleware chains, and upstream pools from a
//! [`GatewayConfig`] (spec.md §4.11, component C11's "pool-less components" step).
//!
//! A `Gateway` is built once at startup and handed to every acceptor/worker thread
//! behind an `Arc`; nothing here is mutated after `Gateway::build` returns.

use gatekit_core::config::GatewayConfig;
use gatekit_core::route::{HttpMethod, MiddlewareDescriptor, Route, RoutePattern};
use gatekit_core::upstream::Origin;
use gatekit_middleware::{Chain, Middleware, MiddlewareRegistry, RouteView};
use gatekit_plugins::traffic::cache::{Cache, CacheConfig};
use gatekit_pool::UpstreamPool;
use gatekit_router::Router;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Pool tuning that has no external config knob (spec.md §6 lists no such keys);
/// fixed the way a reasonable operator would set them.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
const POOL_MIN_IDLE: usize = 2;
const POOL_PREWARM: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum GatewayBuildError {
    #[error("route {0:?}: {1}")]
    InvalidRoute(String, String),
    #[error("route {0:?} references unknown middleware {1:?}")]
    UnknownMiddlewareName(String, String),
    #[error("route {0:?}: {1}")]
    Router(#[from] gatekit_router::RouterError),
    #[error("route {0:?} upstream {1:?}: {2}")]
    InvalidUpstream(String, String, gatekit_core::upstream::OriginError),
    #[error("route {0:?} middleware {1:?}: {2}")]
    MiddlewareBuild(String, String, anyhow::Error),
    #[error("upstream {0}: {1}")]
    PoolInit(String, std::io::Error),
}

/// Everything a worker needs to serve a request, shared read-only across threads.
pub struct Gateway {
    pub router: Router,
    pub config: GatewayConfig,
    chains: HashMap<String, Chain>,
    caches: HashMap<String, Arc<Cache>>,
    pools: Mutex<HashMap<String, Arc<UpstreamPool>>>,
}

impl Gateway {
    pub fn build(config: GatewayConfig, registry: &MiddlewareRegistry) -> Result<Gateway, GatewayBuildError> {
        let mut routes = Vec::with_capacity(config.routes.len());
        for rc in &config.routes {
            let pattern = RoutePattern::parse(&rc.path)
                .map_err(|e| GatewayBuildError::InvalidRoute(rc.path.clone(), e.to_string()))?;

            let mut methods = Vec::with_capacity(rc.methods.len());
            for m in &rc.methods {
                let parsed = HttpMethod::parse(m)
                    .ok_or_else(|| GatewayBuildError::InvalidRoute(rc.path.clone(), format!("unknown method {m:?}")))?;
                methods.push(parsed);
            }

            let mut middleware = Vec::with_capacity(rc.middleware.len());
            for name in &rc.middleware {
                let mc = config
                    .middlewares
                    .iter()
                    .find(|mc| &mc.name == name)
                    .ok_or_else(|| GatewayBuildError::UnknownMiddlewareName(rc.path.clone(), name.clone()))?;
                middleware.push(MiddlewareDescriptor { tag: mc.tag.clone(), config: mc.config.clone() });
            }

            routes.push(Route {
                id: format!("{}#{}", rc.path, routes.len()),
                pattern,
                upstream: rc.upstream.clone(),
                methods,
                middleware,
            });
        }

        let mut chains = HashMap::with_capacity(routes.len());
        let mut caches: HashMap<String, Arc<Cache>> = HashMap::new();
        let mut pools: HashMap<String, Arc<UpstreamPool>> = HashMap::new();

        for route in &routes {
            let mut instances = Vec::with_capacity(route.middleware.len());
            for descriptor in &route.middleware {
                // `cache` is special-cased rather than routed through the generic
                // registry factory: the proxy needs to keep the same concrete
                // instance the chain runs so it can call `store` after a forward,
                // and `Middleware` has no downcasting to recover one from the other.
                if descriptor.tag == "cache" {
                    let cfg: CacheConfig = serde_json::from_value(descriptor.config.clone()).map_err(|e| {
                        GatewayBuildError::MiddlewareBuild(route.id.clone(), descriptor.tag.clone(), anyhow::anyhow!("cache config error: {e}"))
                    })?;
                    let cache = Arc::new(Cache::new(cfg));
                    caches.insert(route.id.clone(), Arc::clone(&cache));
                    instances.push(cache as Arc<dyn Middleware>);
                    continue;
                }
                let mw = registry.build(&descriptor.tag, &descriptor.config).map_err(|e| {
                    GatewayBuildError::MiddlewareBuild(route.id.clone(), descriptor.tag.clone(), e)
                })?;
                instances.push(mw);
            }
            chains.insert(route.id.clone(), Chain::new(instances));

            let origin = Origin::parse(&route.upstream)
                .map_err(|e| GatewayBuildError::InvalidUpstream(route.id.clone(), route.upstream.clone(), e))?;
            pools.entry(origin.authority()).or_insert_with(|| {
                Arc::new(UpstreamPool::new(
                    origin,
                    config.max_connections,
                    POOL_IDLE_TIMEOUT,
                    POOL_MIN_IDLE,
                    Duration::from_millis(config.connection_timeout_ms),
                ))
            });
        }

        for pool in pools.values() {
            if let Err(e) = pool.prewarm(POOL_PREWARM.min(config.max_connections)) {
                tracing::warn!(origin = %pool.origin(), error = %e, "pool prewarm failed, will dial lazily");
            }
        }

        let router = Router::new(routes)?;
        Ok(Gateway { router, config, chains, caches, pools: Mutex::new(pools) })
    }

    pub fn chain_for(&self, route_id: &str) -> Option<&Chain> {
        self.chains.get(route_id)
    }

    /// The concrete cache instance backing a route's `cache` middleware, if any
    /// (spec.md §4.4: the proxy stores a successful GET forward here after a miss).
    pub fn cache_for(&self, route_id: &str) -> Option<&Arc<Cache>> {
        self.caches.get(route_id)
    }

    /// Looks up, or lazily dials and inserts, the pool for an upstream origin.
    ///
    /// `Gateway::build` only pre-populates pools for each route's static config
    /// upstream, but middleware such as `auth-scheme-router` can rewrite the
    /// effective upstream per request to an origin no route names directly — so a
    /// miss here is a legitimate cold path, not a bug, and just dials lazily
    /// instead of panicking.
    pub fn pool_for(&self, upstream_url: &str) -> Result<Arc<UpstreamPool>, gatekit_core::upstream::OriginError> {
        let origin = Origin::parse(upstream_url)?;
        let authority = origin.authority();
        let mut pools = self.pools.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pool) = pools.get(&authority) {
            return Ok(Arc::clone(pool));
        }
        let pool = Arc::new(UpstreamPool::new(
            origin,
            self.config.max_connections,
            POOL_IDLE_TIMEOUT,
            POOL_MIN_IDLE,
            Duration::from_millis(self.config.connection_timeout_ms),
        ));
        pools.insert(authority, Arc::clone(&pool));
        Ok(pool)
    }

    pub fn route_view(&self, upstream: String) -> RouteView {
        RouteView { upstream }
    }
}
