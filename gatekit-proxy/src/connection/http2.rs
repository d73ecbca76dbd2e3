//! HTTP/2 per-stream dispatch into the same router/middleware/upstream path
//! used by HTTP/1.1 (spec.md §4.7, component C6). One TCP connection carries
//! many concurrent streams; this handler processes frames as they arrive and
//! completes a stream's request/response exchange synchronously before
//! reading further frames, which is adequate for the conservative subset
//! this crate implements (no server push, no flow-control enforcement).

use crate::gateway::Gateway;
use gatekit_middleware::{MiddlewareContext, MiddlewareOutcome};
use gatekit_plugins::traffic::cache::Cache;
use gatekit_protocol::http1::{self, Request};
use gatekit_protocol::http2::frame::{FLAG_ACK, FLAG_END_HEADERS, FLAG_END_STREAM, Frame, FrameType};
use gatekit_protocol::http2::{CONNECTION_PREFACE, Settings, Stream, hpack};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

const READ_CHUNK: usize = 16384;

struct HeaderAssembly {
    buf: Vec<u8>,
    end_stream: bool,
}

pub fn serve(gateway: &Gateway, mut client: TcpStream, peer: SocketAddr) -> io::Result<()> {
    let mut preface = [0u8; 24];
    client.read_exact(&mut preface)?;
    if preface != *CONNECTION_PREFACE {
        return Ok(());
    }

    let settings = Settings::default();
    client.write_all(&Frame::encode(FrameType::Settings, 0, 0, &settings.encode()))?;

    let mut buf = Vec::new();
    let mut read_buf = [0u8; READ_CHUNK];
    let mut streams: HashMap<u32, Stream> = HashMap::new();
    let mut header_fragments: HashMap<u32, HeaderAssembly> = HashMap::new();

    loop {
        loop {
            match Frame::parse(&buf) {
                Ok(Some((frame, consumed))) => {
                    buf.drain(..consumed);
                    if !handle_frame(gateway, &mut client, peer, &mut streams, &mut header_fragments, frame)? {
                        return Ok(());
                    }
                }
                Ok(None) => break,
                Err(_) => return Ok(()),
            }
        }
        let n = client.read(&mut read_buf)?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&read_buf[..n]);
    }
}

/// Returns `Ok(false)` when the connection should be closed (a GOAWAY from
/// the peer, or framing this handler can't recover from).
fn handle_frame(
    gateway: &Gateway,
    client: &mut TcpStream,
    peer: SocketAddr,
    streams: &mut HashMap<u32, Stream>,
    header_fragments: &mut HashMap<u32, HeaderAssembly>,
    frame: Frame,
) -> io::Result<bool> {
    match frame.header.frame_type {
        FrameType::Settings => {
            if frame.header.flags & FLAG_ACK == 0 {
                client.write_all(&Frame::encode(FrameType::Settings, FLAG_ACK, 0, &[]))?;
            }
            Ok(true)
        }
        FrameType::Ping => {
            if frame.header.flags & FLAG_ACK == 0 {
                client.write_all(&Frame::encode(FrameType::Ping, FLAG_ACK, 0, &frame.payload))?;
            }
            Ok(true)
        }
        FrameType::GoAway => Ok(false),
        FrameType::RstStream => {
            streams.remove(&frame.header.stream_id);
            header_fragments.remove(&frame.header.stream_id);
            Ok(true)
        }
        FrameType::Headers => {
            let end_stream = frame.header.flags & FLAG_END_STREAM != 0;
            let end_headers = frame.header.flags & FLAG_END_HEADERS != 0;
            let assembly =
                header_fragments.entry(frame.header.stream_id).or_insert_with(|| HeaderAssembly { buf: Vec::new(), end_stream: false });
            assembly.buf.extend_from_slice(&frame.payload);
            assembly.end_stream = end_stream;
            if end_headers {
                finish_headers(gateway, client, peer, streams, header_fragments, frame.header.stream_id)?;
            }
            Ok(true)
        }
        FrameType::Continuation => {
            let end_headers = frame.header.flags & FLAG_END_HEADERS != 0;
            if let Some(assembly) = header_fragments.get_mut(&frame.header.stream_id) {
                assembly.buf.extend_from_slice(&frame.payload);
            }
            if end_headers {
                finish_headers(gateway, client, peer, streams, header_fragments, frame.header.stream_id)?;
            }
            Ok(true)
        }
        FrameType::Data => {
            let end_stream = frame.header.flags & FLAG_END_STREAM != 0;
            let dispatch = match streams.get_mut(&frame.header.stream_id) {
                Some(stream) => stream.recv_data(&frame.payload, end_stream).is_ok() && end_stream,
                None => false,
            };
            if dispatch {
                dispatch_stream(gateway, client, peer, streams, frame.header.stream_id)?;
            }
            Ok(true)
        }
        // Priority, WindowUpdate, PushPromise, Unknown: no flow control or
        // push support in this conservative subset, so these are no-ops.
        _ => Ok(true),
    }
}

fn finish_headers(
    gateway: &Gateway,
    client: &mut TcpStream,
    peer: SocketAddr,
    streams: &mut HashMap<u32, Stream>,
    header_fragments: &mut HashMap<u32, HeaderAssembly>,
    stream_id: u32,
) -> io::Result<()> {
    let Some(assembly) = header_fragments.remove(&stream_id) else { return Ok(()) };
    let Ok(headers) = hpack::decode(&assembly.buf) else { return Ok(()) };

    let mut stream = Stream::new(stream_id);
    if stream.recv_headers(headers, assembly.end_stream).is_err() {
        return Ok(());
    }
    let dispatch_now = assembly.end_stream;
    streams.insert(stream_id, stream);
    if dispatch_now {
        dispatch_stream(gateway, client, peer, streams, stream_id)?;
    }
    Ok(())
}

fn dispatch_stream(gateway: &Gateway, client: &mut TcpStream, peer: SocketAddr, streams: &mut HashMap<u32, Stream>, stream_id: u32) -> io::Result<()> {
    let Some(stream) = streams.remove(&stream_id) else { return Ok(()) };

    let headers: Vec<(&str, &str)> =
        stream.headers.iter().filter(|(k, _)| !k.starts_with(':')).map(|(k, v)| (k.as_str(), v.as_str())).collect();
    let req = Request { method: &stream.method, path: &stream.path, version: 1, headers, body: &stream.body };

    let mut header_map: HashMap<String, String> = HashMap::with_capacity(req.headers.len());
    for (k, v) in &req.headers {
        header_map.insert((*k).to_string(), (*v).to_string());
    }

    let (status, resp_headers, body) = match gateway.router.find_route(req.method, req.path) {
        None => (404u16, Vec::new(), br#"{"error":"no route matched"}"#.to_vec()),
        Some(route_match) => {
            let route = route_match.route;
            let mut route_view = gateway.route_view(route.upstream.clone());
            let mut response_headers = HashMap::new();
            let outcome = {
                let mut ctx = MiddlewareContext::new(
                    req.method,
                    req.path,
                    &header_map,
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
                    (resp.status_code, resp.headers.into_iter().collect(), resp.body)
                }
                MiddlewareOutcome::Continue => {
                    let cache = gateway.cache_for(&route.id).cloned();
                    forward_to_upstream(gateway, &route_view.upstream, &req, response_headers, cache)
                }
            }
        }
    };

    write_response(client, stream_id, status, &resp_headers, &body)
}

fn forward_to_upstream(
    gateway: &Gateway,
    upstream_url: &str,
    req: &Request<'_>,
    extra_headers: HashMap<String, String>,
    cache: Option<Arc<Cache>>,
) -> (u16, Vec<(String, String)>, Vec<u8>) {
    let pool = match gateway.pool_for(upstream_url) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(upstream = %upstream_url, error = %e, "invalid upstream URL");
            return (502, Vec::new(), br#"{"error":"upstream error"}"#.to_vec());
        }
    };
    let mut conn = match pool.acquire() {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(upstream = %upstream_url, error = %e, "upstream connect failed");
            return (502, Vec::new(), br#"{"error":"upstream error"}"#.to_vec());
        }
    };

    let mut upstream_req = Vec::with_capacity(512 + req.body.len());
    http1::build_upstream_request(&mut upstream_req, req, &conn.origin.authority());
    if conn.stream.write_all(&upstream_req).is_err() {
        return (502, Vec::new(), br#"{"error":"upstream error"}"#.to_vec());
    }

    let mut raw = Vec::new();
    let mut chunk = [0u8; 16384];
    let (status, headers, body_start) = loop {
        let n = match conn.stream.read(&mut chunk) {
            Ok(0) | Err(_) => return (502, Vec::new(), br#"{"error":"upstream error"}"#.to_vec()),
            Ok(n) => n,
        };
        raw.extend_from_slice(&chunk[..n]);

        let mut resp_headers = [httparse::EMPTY_HEADER; 64];
        let mut resp = httparse::Response::new(&mut resp_headers);
        match resp.parse(&raw) {
            Ok(httparse::Status::Complete(header_len)) => {
                let status = resp.code.unwrap_or(502);
                let mut headers = Vec::with_capacity(resp.headers.len());
                let mut content_length = None;
                for h in resp.headers.iter() {
                    if h.name.is_empty() {
                        break;
                    }
                    let value = String::from_utf8_lossy(h.value).to_string();
                    if h.name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse::<usize>().ok();
                    }
                    if !h.name.eq_ignore_ascii_case("connection") && !h.name.eq_ignore_ascii_case("transfer-encoding") {
                        headers.push((h.name.to_string(), value));
                    }
                }
                break (status, (headers, content_length), header_len);
            }
            Ok(httparse::Status::Partial) => continue,
            Err(_) => return (502, Vec::new(), br#"{"error":"upstream error"}"#.to_vec()),
        }
    };

    let (mut headers, content_length) = headers;
    let total = content_length.unwrap_or(0);
    while raw.len() - body_start < total {
        match conn.stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => raw.extend_from_slice(&chunk[..n]),
        }
    }
    let body = raw[body_start..raw.len().min(body_start + total)].to_vec();

    for (k, v) in extra_headers {
        headers.push((k, v));
    }

    if req.method == "GET" && status == 200 {
        if let Some(cache) = cache {
            cache.store(req.path.to_string(), status, headers.iter().cloned().collect(), body.clone());
        }
    }

    (status, headers, body)
}

fn write_response(client: &mut TcpStream, stream_id: u32, status: u16, headers: &[(String, String)], body: &[u8]) -> io::Result<()> {
    let mut header_block = Vec::new();
    hpack::encode_header(":status", &status.to_string(), &mut header_block);
    for (name, value) in headers {
        hpack::encode_header(&name.to_lowercase(), value, &mut header_block);
    }

    let has_body = !body.is_empty();
    let headers_flags = if has_body { FLAG_END_HEADERS } else { FLAG_END_HEADERS | FLAG_END_STREAM };
    client.write_all(&Frame::encode(FrameType::Headers, headers_flags, stream_id, &header_block))?;
    if has_body {
        client.write_all(&Frame::encode(FrameType::Data, FLAG_END_STREAM, stream_id, body))?;
    }
    Ok(())
}
