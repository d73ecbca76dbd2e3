//! WebSocket upgrade and bidirectional frame bridging (spec.md §4.8, component C7).
//!
//! The upstream connection here bypasses `gatekit_pool`: a WebSocket session
//! is long-lived and exclusive to one client, so there is nothing to return
//! to a pool once the upgrade completes.

use crate::gateway::Gateway;
use gatekit_core::upstream::Origin;
use gatekit_middleware::{MiddlewareContext, MiddlewareOutcome};
use gatekit_protocol::http1;
use gatekit_protocol::websocket::{self, Opcode, build_switching_protocols_response, validate_upgrade};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

const RESP_400: &[u8] = b"HTTP/1.1 400 Bad Request\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
const RESP_404: &[u8] = b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
const RESP_502: &[u8] = b"HTTP/1.1 502 Bad Gateway\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";

pub fn serve(gateway: &Gateway, mut client: TcpStream, peer: SocketAddr) -> io::Result<()> {
    let mut buf = vec![0u8; 8192];
    let n = client.read(&mut buf)?;
    if n == 0 {
        return Ok(());
    }

    let req = match http1::parse_request(&buf[..n]) {
        Ok(req) => req,
        Err(_) => return client.write_all(RESP_400),
    };

    let key = req.header("sec-websocket-key").unwrap_or("").to_string();
    let version = req.header("sec-websocket-version").unwrap_or("").to_string();
    if validate_upgrade(&key, &version).is_err() {
        return client.write_all(RESP_400);
    }

    let Some(route_match) = gateway.router.find_route(req.method, req.path) else {
        return client.write_all(RESP_404);
    };
    let route = route_match.route;

    let mut header_map: HashMap<String, String> = HashMap::with_capacity(req.headers.len());
    for (k, v) in &req.headers {
        header_map.insert((*k).to_string(), (*v).to_string());
    }

    let mut route_view = gateway.route_view(route.upstream.clone());
    let outcome = {
        let mut ctx = MiddlewareContext::new(req.method, req.path, &header_map, peer, None, &mut route_view, route_match.bindings.clone());
        match gateway.chain_for(&route.id) {
            Some(chain) => chain.process(&mut ctx),
            None => MiddlewareOutcome::Continue,
        }
    };

    if let MiddlewareOutcome::ShortCircuit(resp) = outcome {
        let mut out = Vec::with_capacity(256 + resp.body.len());
        let headers: Vec<(String, String)> = resp.headers.into_iter().collect();
        http1::build_response(&mut out, resp.status_code, &headers, &resp.body);
        return client.write_all(&out);
    }

    let upstream = match connect_upstream(&route_view.upstream, req.path, &key) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(upstream = %route_view.upstream, error = %e, "websocket upstream handshake failed");
            return client.write_all(RESP_502);
        }
    };

    let response = build_switching_protocols_response(&key);
    client.write_all(response.as_bytes())?;

    bridge(client, upstream)
}

fn connect_upstream(upstream_url: &str, path: &str, client_key: &str) -> io::Result<TcpStream> {
    let origin = Origin::parse(upstream_url).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    let mut stream = TcpStream::connect((origin.host.as_str(), origin.port))?;

    let request = format!(
        "GET {path} HTTP/1.1\r\nHost: {authority}\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Key: {client_key}\r\nSec-WebSocket-Version: 13\r\n\r\n",
        authority = origin.authority(),
    );
    stream.write_all(request.as_bytes())?;

    let mut buf = [0u8; 1024];
    let n = stream.read(&mut buf)?;
    if n < 12 || &buf[9..12] != b"101" {
        return Err(io::Error::new(io::ErrorKind::Other, "upstream did not switch protocols"));
    }
    Ok(stream)
}

/// Pumps frames in both directions until either side closes or sends a Close
/// frame, re-masking in the direction the wire requires (masked toward the
/// upstream, the proxy acting as its client; unmasked toward the browser).
fn bridge(client: TcpStream, upstream: TcpStream) -> io::Result<()> {
    let client_for_upstream_pump = client.try_clone()?;
    let upstream_for_upstream_pump = upstream.try_clone()?;

    let handle = thread::Builder::new()
        .name("gatekit-ws-c2u".into())
        .spawn(move || pump(client_for_upstream_pump, upstream_for_upstream_pump, true))
        .expect("failed to spawn websocket pump thread");

    let result = pump(upstream, client, false);
    let _ = handle.join();
    result
}

fn pump(mut src: TcpStream, mut dst: TcpStream, to_upstream: bool) -> io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        loop {
            match websocket::decode(&buf, to_upstream) {
                Ok(Some((frame, consumed))) => {
                    buf.drain(..consumed);

                    if matches!(frame.opcode, Opcode::Ping) {
                        // Answered directly, not relayed: the peer that sent the Ping
                        // gets its Pong from us, the other side never sees it.
                        let pong = websocket::pong_frame(frame.payload);
                        let encoded =
                            if to_upstream { websocket::encode(&pong, false, [0; 4]) } else { websocket::encode(&pong, true, generate_mask_key()) };
                        if src.write_all(&encoded).is_err() {
                            let _ = src.shutdown(Shutdown::Both);
                            let _ = dst.shutdown(Shutdown::Both);
                            return Ok(());
                        }
                        continue;
                    }

                    let is_close = matches!(frame.opcode, Opcode::Close);
                    let encoded =
                        if to_upstream { websocket::encode(&frame, true, generate_mask_key()) } else { websocket::encode(&frame, false, [0; 4]) };
                    if dst.write_all(&encoded).is_err() || is_close {
                        let _ = src.shutdown(Shutdown::Both);
                        let _ = dst.shutdown(Shutdown::Both);
                        return Ok(());
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    let _ = src.shutdown(Shutdown::Both);
                    let _ = dst.shutdown(Shutdown::Both);
                    return Ok(());
                }
            }
        }
        match src.read(&mut chunk) {
            Ok(0) | Err(_) => {
                let _ = dst.shutdown(Shutdown::Both);
                return Ok(());
            }
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

/// A masking key only has to be unpredictable to casual inspection here, not
/// cryptographically strong: the proxy is re-framing already-decoded payload
/// bytes, not protecting them from a peer that can read them either way.
fn generate_mask_key() -> [u8; 4] {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.subsec_nanos()).unwrap_or(0);
    (nanos ^ counter).to_le_bytes()
}
