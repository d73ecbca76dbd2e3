//! Parallel `SO_REUSEPORT` listeners feeding one shared worker pool (spec.md
//! §4.9, component C9).

use crate::numa;
use crate::worker::WorkerPool;
use socket2::{Domain, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const MAX_ACCEPTOR_THREADS: usize = 8;
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct Acceptor {
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl Acceptor {
    /// Binds up to `min(8, N)` listeners on `addr` with `SO_REUSEPORT`, one
    /// acceptor thread per listener, each pinned to a CPU on a distinct NUMA
    /// node when the host exposes one.
    pub fn start(addr: SocketAddr, backlog: u32, workers: Arc<WorkerPool>) -> io::Result<Acceptor> {
        let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        let n_listeners = MAX_ACCEPTOR_THREADS.min(cpus).max(1);
        let nodes = numa::topology();
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(n_listeners);

        for acceptor_id in 0..n_listeners {
            let listener = bind_reuseport(addr, backlog)?;
            let node_cpus = nodes[acceptor_id % nodes.len()].clone();
            let shutdown = Arc::clone(&shutdown);
            let workers = Arc::clone(&workers);
            let handle = std::thread::Builder::new()
                .name(format!("gatekit-acceptor-{acceptor_id}"))
                .spawn(move || {
                    numa::pin_current_thread(&node_cpus);
                    accept_loop(acceptor_id, listener, &shutdown, &workers);
                })
                .expect("failed to spawn acceptor thread");
            handles.push(handle);
        }

        tracing::info!(listeners = n_listeners, numa_nodes = nodes.len(), %addr, "acceptor started");
        Ok(Acceptor { shutdown, handles })
    }

    /// Sets the shutdown flag and joins every acceptor thread (spec.md §4.9,
    /// §4.11). Listeners are closed as each thread's `TcpListener` drops on
    /// return from its loop.
    pub fn shutdown(mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn bind_reuseport(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog as i32)?;
    Ok(socket.into())
}

/// Polls `accept` in non-blocking mode so the shutdown flag can be observed
/// between connections; `WouldBlock` is the expected idle case, not an error
/// (spec.md §4.9's explicit list of benign accept errors).
fn accept_loop(acceptor_id: usize, listener: TcpListener, shutdown: &AtomicBool, workers: &WorkerPool) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        match listener.accept() {
            Ok((stream, peer)) => workers.submit(stream, peer),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionReset) => {
                tracing::debug!(acceptor = acceptor_id, error = %e, "benign accept error, continuing");
            }
            Err(e) => tracing::warn!(acceptor = acceptor_id, error = %e, "accept error"),
        }
    }
}
