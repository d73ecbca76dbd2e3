pub mod connection;
pub mod pool;
pub mod semaphore;

pub use connection::PooledConnection;
pub use pool::{Conn, UpstreamPool};
pub use semaphore::Semaphore;
