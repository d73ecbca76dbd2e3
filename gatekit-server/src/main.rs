//! gatekit — multi-protocol reverse proxy binary (spec.md §4.11, component C11).
//!
//! Boots the router, middleware registry, worker pool, and acceptor in order,
//! then blocks until SIGTERM/SIGINT, at which point it tears them down in
//! reverse order with a bounded grace period.

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use clap::Parser;
use gatekit_core::config::GatewayConfig;
use gatekit_middleware::MiddlewareRegistry;
use gatekit_proxy::{Acceptor, Gateway, WorkerPool};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "gatekit", version, about = "gatekit — multi-protocol reverse proxy")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(default_value = "config.json")]
    config: PathBuf,

    /// Log level, overridden by RUST_LOG when set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    gatekit_observability::logger::init(&cli.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "gatekit starting");

    let config = load_config(&cli.config)?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let mut registry = MiddlewareRegistry::new();
    gatekit_plugins::register_builtins(&mut registry);
    registry.freeze();
    info!("middleware registry frozen");

    let gateway = Arc::new(Gateway::build(config.clone(), &registry)?);
    info!(routes = gateway.router.routes().len(), "router built");

    let worker_pool = WorkerPool::start(Arc::clone(&gateway), config.thread_count);
    let acceptor = Acceptor::start(addr, config.backlog, Arc::clone(&worker_pool))?;
    info!(%addr, threads = config.thread_count, "gatekit is ready");

    setup_signal_handler();
    while !SHUTDOWN.load(Ordering::Relaxed) {
        std::thread::sleep(SHUTDOWN_POLL);
    }
    info!("shutdown signal received, draining");

    std::thread::spawn(|| {
        std::thread::sleep(SHUTDOWN_GRACE);
        tracing::warn!("graceful shutdown exceeded deadline, forcing exit");
        std::process::exit(1);
    });

    acceptor.shutdown();
    worker_pool.shutdown();
    info!("gatekit stopped");
    Ok(())
}

fn load_config(path: &PathBuf) -> anyhow::Result<GatewayConfig> {
    if !path.exists() {
        info!(path = %path.display(), "no config file found, using defaults");
        return Ok(GatewayConfig::default());
    }
    info!(path = %path.display(), "loading config file");
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn setup_signal_handler() {
    for sig in [libc::SIGTERM, libc::SIGINT] {
        unsafe {
            libc::signal(sig, signal_handler as libc::sighandler_t);
        }
    }
}

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN.store(true, Ordering::Relaxed);
}
