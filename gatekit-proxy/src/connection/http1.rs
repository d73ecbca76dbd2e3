//! HTTP/1.1 request/response dispatch (spec.md §4.6, component C5).

use crate::gateway::Gateway;
use gatekit_middleware::{MiddlewareContext, MiddlewareOutcome};
use gatekit_plugins::traffic::cache::Cache;
use gatekit_protocol::http1::{self, Http1Error, Request};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

const READ_BUF: usize = 8192;
const UPSTREAM_BUF: usize = 65536;

const RESP_400: &[u8] = b"HTTP/1.1 400 Bad Request\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
const RESP_404: &[u8] =
    b"HTTP/1.1 404 Not Found\r\ncontent-type: application/json\r\ncontent-length: 27\r\n\r\n{\"error\":\"no route matched\"}";
const RESP_502: &[u8] =
    b"HTTP/1.1 502 Bad Gateway\r\ncontent-type: application/json\r\ncontent-length: 24\r\n\r\n{\"error\":\"upstream error\"}";

/// Serves HTTP/1.1 request/response pairs on one keep-alive connection. Each
/// iteration reads one request in a single `read` call, matching this crate's
/// no-partial-reassembly-across-reads simplification: a request split across
/// two TCP segments is reported as `Http1Error::Partial` and answered 400
/// rather than buffered and retried.
pub fn serve(gateway: &Gateway, mut client: TcpStream, peer: SocketAddr) -> io::Result<()> {
    let mut read_buf = vec![0u8; READ_BUF];

    loop {
        let n = match client.read(&mut read_buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => return Ok(()),
            Err(e) => return Err(e),
        };

        let req = match http1::parse_request(&read_buf[..n]) {
            Ok(req) => req,
            Err(Http1Error::Partial) => return Ok(()),
            Err(_) => {
                let _ = client.write_all(RESP_400);
                return Ok(());
            }
        };

        let keep_alive = req.keep_alive();
        handle_request(gateway, &mut client, peer, &req)?;
        if !keep_alive {
            return Ok(());
        }
    }
}

fn handle_request(gateway: &Gateway, client: &mut TcpStream, peer: SocketAddr, req: &Request<'_>) -> io::Result<()> {
    let Some(route_match) = gateway.router.find_route(req.method, req.path) else {
        return client.write_all(RESP_404);
    };
    let route = route_match.route;

    let mut headers: HashMap<String, String> = HashMap::with_capacity(req.headers.len());
    for (k, v) in &req.headers {
        headers.insert((*k).to_string(), (*v).to_string());
    }

    let mut route_view = gateway.route_view(route.upstream.clone());
    let mut response_headers = HashMap::new();
    let outcome = {
        let mut ctx = MiddlewareContext::new(
            req.method,
            req.path,
            &headers,
            peer,
            (!req.body.is_empty()).then_some(req.body),
            &mut route_view,
            route_match.bindings.clone(),
        );
        let outcome = match gateway.chain_for(&route.id) {
            Some(chain) => chain.process(&mut ctx),
            None => MiddlewareOutcome::Continue,
        };
        response_headers = std::mem::take(&mut ctx.response_headers);
        outcome
    };

    match outcome {
        MiddlewareOutcome::ShortCircuit(resp) => {
            let mut buf = Vec::with_capacity(256 + resp.body.len());
            let headers: Vec<(String, String)> = resp.headers.into_iter().collect();
            http1::build_response(&mut buf, resp.status_code, &headers, &resp.body);
            client.write_all(&buf)
        }
        MiddlewareOutcome::Continue => {
            let cache = gateway.cache_for(&route.id).cloned();
            forward_to_upstream(gateway, client, &route_view.upstream, req, response_headers, cache)
        }
    }
}

fn forward_to_upstream(
    gateway: &Gateway,
    client: &mut TcpStream,
    upstream_url: &str,
    req: &Request<'_>,
    extra_headers: HashMap<String, String>,
    cache: Option<Arc<Cache>>,
) -> io::Result<()> {
    let pool = match gateway.pool_for(upstream_url) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(upstream = %upstream_url, error = %e, "invalid upstream URL");
            return client.write_all(RESP_502);
        }
    };

    let mut conn = match pool.acquire() {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(upstream = %upstream_url, error = %e, "upstream connect failed");
            return client.write_all(RESP_502);
        }
    };

    let mut upstream_req = Vec::with_capacity(512 + req.body.len());
    http1::build_upstream_request(&mut upstream_req, req, &conn.origin.authority());

    if conn.stream.write_all(&upstream_req).is_err() {
        return client.write_all(RESP_502);
    }

    let mut upstream_buf = vec![0u8; UPSTREAM_BUF];
    let n = match conn.stream.read(&mut upstream_buf) {
        Ok(0) | Err(_) => {
            tracing::warn!(upstream = %upstream_url, "upstream closed without responding");
            return client.write_all(RESP_502);
        }
        Ok(n) => n,
    };

    let (status, mut headers, content_length, header_len) = {
        let mut resp_headers = [httparse::EMPTY_HEADER; 64];
        let mut resp = httparse::Response::new(&mut resp_headers);
        match resp.parse(&upstream_buf[..n]) {
            Ok(httparse::Status::Complete(header_len)) => {
                let mut content_length = None;
                let mut headers = Vec::with_capacity(resp.headers.len());
                for h in resp.headers.iter() {
                    if h.name.is_empty() {
                        break;
                    }
                    if h.name.eq_ignore_ascii_case("content-length") {
                        content_length = std::str::from_utf8(h.value).ok().and_then(|s| s.trim().parse().ok());
                        continue;
                    }
                    if is_hop_by_hop(h.name) {
                        continue;
                    }
                    if let Ok(value) = std::str::from_utf8(h.value) {
                        headers.push((h.name.to_string(), value.to_string()));
                    }
                }
                (resp.code.unwrap_or(502), headers, content_length, header_len)
            }
            _ => {
                tracing::warn!(upstream = %upstream_url, "malformed upstream response");
                return client.write_all(RESP_502);
            }
        }
    };

    let mut body = upstream_buf[header_len..n].to_vec();
    if let Some(total) = content_length {
        let mut remaining = total.saturating_sub(body.len());
        while remaining > 0 {
            let want = remaining.min(upstream_buf.len());
            let got = match conn.stream.read(&mut upstream_buf[..want]) {
                Ok(0) | Err(_) => break,
                Ok(got) => got,
            };
            body.extend_from_slice(&upstream_buf[..got]);
            remaining -= got;
        }
    }

    for (k, v) in extra_headers {
        headers.push((k, v));
    }

    if req.method == "GET" && status == 200 {
        if let Some(cache) = cache {
            cache.store(req.path.to_string(), status, headers.iter().cloned().collect(), body.clone());
        }
    }

    let mut buf = Vec::with_capacity(256 + body.len());
    http1::build_response(&mut buf, status, &headers, &body);
    client.write_all(&buf)?;

    // `conn` drops here, returning it to the pool (spec.md §4.3's RAII release).
    Ok(())
}

fn is_hop_by_hop(name: &str) -> bool {
    matches!(name.to_ascii_lowercase().as_str(), "connection" | "keep-alive" | "transfer-encoding" | "upgrade" | "proxy-connection")
}
