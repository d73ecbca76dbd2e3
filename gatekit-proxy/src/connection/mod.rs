//! Per-connection protocol dispatch: detect, then hand off to the matching
//! handler (spec.md §4.5-§4.8, components C4-C7).

pub mod http1;
pub mod http2;
pub mod websocket;

use crate::gateway::Gateway;
use gatekit_protocol::{Protocol, classify};
use std::io;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

const DETECTION_PREFIX: usize = 24;

pub fn handle_connection(gateway: &Gateway, mut stream: TcpStream, peer: SocketAddr) -> io::Result<()> {
    stream.set_nodelay(true)?;
    let timeout = Duration::from_millis(gateway.config.connection_timeout_ms);
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let mut prefix = [0u8; DETECTION_PREFIX];
    let n = stream.peek(&mut prefix)?;
    if n == 0 {
        return Ok(()); // client closed before sending anything
    }

    match classify(&prefix[..n]) {
        Some(protocol) if protocol_enabled(gateway, protocol) => match protocol {
            Protocol::Http1 => http1::serve(gateway, stream, peer),
            Protocol::Http2 => http2::serve(gateway, stream, peer),
            Protocol::WebSocket => websocket::serve(gateway, stream, peer),
        },
        // Unrecognized prefix, or a protocol this gateway was configured not to
        // serve: close without a response (spec.md §4.5, §7 "protocol-detection
        // failure -> connection closed, no response").
        _ => Ok(()),
    }
}

fn protocol_enabled(gateway: &Gateway, protocol: Protocol) -> bool {
    use gatekit_core::config::Protocol as Configured;
    let configured = match protocol {
        Protocol::Http1 => Configured::Http1,
        Protocol::Http2 => Configured::Http2,
        Protocol::WebSocket => Configured::Websocket,
    };
    gateway.config.protocols.contains(&configured)
}
