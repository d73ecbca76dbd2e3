//! End-to-end test: a real listener, a real worker pool, and a fake upstream,
//! exercised with plain `std::net` sockets (no mocks for the proxy itself).

use gatekit_core::config::{GatewayConfig, RouteConfig};
use gatekit_middleware::MiddlewareRegistry;
use gatekit_proxy::{Acceptor, Gateway, WorkerPool};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

/// Accepts connections in a loop (the pool prewarms a couple of idle
/// connections before any real request arrives) and answers each with a fixed
/// HTTP/1.1 response.
fn spawn_fake_upstream(body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            std::thread::spawn(move || {
                let mut buf = [0u8; 4096];
                let Ok(n) = stream.read(&mut buf) else { return };
                if n == 0 {
                    return;
                }
                let resp = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: {}\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes());
            });
        }
    });
    addr
}

fn build_gateway(upstream: SocketAddr) -> Arc<Gateway> {
    let mut config = GatewayConfig::default();
    config.routes.push(RouteConfig {
        path: "/echo".to_string(),
        upstream: format!("http://{upstream}"),
        methods: vec!["GET".to_string()],
        middleware: vec![],
    });

    let registry = MiddlewareRegistry::new();
    Arc::new(Gateway::build(config, &registry).expect("gateway builds with a trivial single-route config"))
}

#[test]
fn forwards_a_get_request_to_upstream_and_relays_the_response() {
    let upstream_addr = spawn_fake_upstream("hello from upstream");
    let gateway = build_gateway(upstream_addr);

    let listen_addr: SocketAddr = "127.0.0.1:18391".parse().unwrap();
    let worker_pool = WorkerPool::start(Arc::clone(&gateway), 2);
    let acceptor = Acceptor::start(listen_addr, 128, Arc::clone(&worker_pool)).expect("bind succeeds");

    // give the acceptor threads a moment to enter their accept loop
    std::thread::sleep(Duration::from_millis(50));

    let mut client = TcpStream::connect(listen_addr).unwrap();
    client.write_all(b"GET /echo HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").unwrap();
    client.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    let mut response = Vec::new();
    client.read_to_end(&mut response).unwrap();
    let response = String::from_utf8_lossy(&response);

    assert!(response.starts_with("HTTP/1.1 200"), "unexpected response: {response}");
    assert!(response.contains("hello from upstream"));

    acceptor.shutdown();
    worker_pool.shutdown();
}

#[test]
fn unmatched_route_returns_404() {
    let upstream_addr = spawn_fake_upstream("unused");
    let gateway = build_gateway(upstream_addr);

    let listen_addr: SocketAddr = "127.0.0.1:18392".parse().unwrap();
    let worker_pool = WorkerPool::start(Arc::clone(&gateway), 1);
    let acceptor = Acceptor::start(listen_addr, 128, Arc::clone(&worker_pool)).expect("bind succeeds");
    std::thread::sleep(Duration::from_millis(50));

    let mut client = TcpStream::connect(listen_addr).unwrap();
    client.write_all(b"GET /no-such-route HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").unwrap();
    client.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    let mut response = Vec::new();
    client.read_to_end(&mut response).unwrap();
    let response = String::from_utf8_lossy(&response);
    assert!(response.starts_with("HTTP/1.1 404"), "unexpected response: {response}");

    acceptor.shutdown();
    worker_pool.shutdown();
}
