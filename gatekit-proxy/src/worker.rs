//! Fixed-size worker pool processing accepted connections (spec.md §4.10,
//! component C10).

use crate::gateway::Gateway;
use crossbeam_channel::{Receiver, Sender, bounded};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::Mutex;
use std::thread::JoinHandle;

const QUEUE_CAPACITY: usize = 1024;

struct Job {
    stream: TcpStream,
    peer: SocketAddr,
}

/// A bounded MPMC queue plus `thread_count` workers draining it (spec.md §4.10:
/// "bounded FIFO under a mutex; workers wait on a counting semaphore"). A
/// `crossbeam_channel::bounded` channel realizes exactly that contract with a
/// built-in blocking `recv`, so no separate semaphore is needed; dropping the
/// last `Sender` — what `shutdown` does — closes the channel and unblocks
/// every worker's `recv` at once, the equivalent of posting one permit per
/// worker.
pub struct WorkerPool {
    tx: Mutex<Option<Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn start(gateway: Arc<Gateway>, thread_count: usize) -> Arc<WorkerPool> {
        let (tx, rx) = bounded::<Job>(QUEUE_CAPACITY);
        let mut handles = Vec::with_capacity(thread_count);
        for worker_id in 0..thread_count {
            let rx = rx.clone();
            let gateway = Arc::clone(&gateway);
            let handle = std::thread::Builder::new()
                .name(format!("gatekit-worker-{worker_id}"))
                .spawn(move || worker_loop(worker_id, rx, gateway))
                .expect("failed to spawn worker thread");
            handles.push(handle);
        }
        tracing::info!(workers = thread_count, "worker pool started");
        Arc::new(WorkerPool { tx: Mutex::new(Some(tx)), handles: Mutex::new(handles) })
    }

    /// Enqueues an accepted connection; blocks the calling acceptor thread
    /// only while the queue is momentarily full (backpressure, not an error).
    pub fn submit(&self, stream: TcpStream, peer: SocketAddr) {
        let tx = self.tx.lock().unwrap().clone();
        match tx {
            Some(tx) if tx.send(Job { stream, peer }).is_ok() => {}
            _ => tracing::warn!("worker pool is shut down, dropping accepted connection"),
        }
    }

    /// Closes the queue and joins every worker (spec.md §4.11: "drain queue,
    /// stop workers ... join").
    pub fn shutdown(&self) {
        self.tx.lock().unwrap().take();
        let handles = std::mem::take(&mut *self.handles.lock().unwrap());
        for handle in handles {
            let _ = handle.join();
        }
    }
}

fn worker_loop(worker_id: usize, rx: Receiver<Job>, gateway: Arc<Gateway>) {
    while let Ok(job) = rx.recv() {
        if let Err(e) = crate::connection::handle_connection(&gateway, job.stream, job.peer) {
            tracing::debug!(worker = worker_id, error = %e, "connection closed");
        }
    }
}
