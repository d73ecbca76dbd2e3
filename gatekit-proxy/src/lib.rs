//! Acceptor, worker pool, and per-connection protocol dispatch (spec.md §4,
//! components C4-C11 less the server orchestrator itself, which lives in
//! `gatekit-server`).

pub mod acceptor;
pub mod connection;
pub mod gateway;
pub mod numa;
pub mod worker;

pub use acceptor::Acceptor;
pub use connection::handle_connection;
pub use gateway::{Gateway, GatewayBuildError};
pub use worker::WorkerPool;
