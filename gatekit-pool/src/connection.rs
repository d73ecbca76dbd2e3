use gatekit_core::upstream::Origin;
use socket2::{Domain, Socket, TcpKeepalive, Type};
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

/// A pooled transport connection to one upstream origin (spec.md §3).
///
/// Owned exclusively by its pool; `in_use` and `last_used` are mutated only while
/// the pool mutex is held.
pub struct PooledConnection {
    pub stream: TcpStream,
    pub origin: Origin,
    pub id: u64,
    pub(crate) in_use: bool,
    pub(crate) last_used: Instant,
}

impl PooledConnection {
    /// Dials a fresh TCP connection to `origin`, enabling `TCP_NODELAY` and TCP
    /// keep-alive as spec.md §4.3 requires of freshly-created pooled connections.
    pub fn connect(origin: &Origin, id: u64, connect_timeout: Duration) -> io::Result<PooledConnection> {
        let addr = resolve_one(&origin.authority())?;
        let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
        let socket = Socket::new(domain, Type::STREAM, None)?;
        socket.set_nodelay(true)?;
        socket.set_keepalive(true)?;
        let keepalive = TcpKeepalive::new().with_time(Duration::from_secs(60));
        let _ = socket.set_tcp_keepalive(&keepalive);
        socket.connect_timeout(&addr.into(), connect_timeout)?;
        let stream: TcpStream = socket.into();
        Ok(PooledConnection { stream, origin: origin.clone(), id, in_use: true, last_used: Instant::now() })
    }

    pub fn idle_for(&self) -> Duration {
        self.last_used.elapsed()
    }
}

fn resolve_one(authority: &str) -> io::Result<SocketAddr> {
    authority
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no address resolved"))
}
