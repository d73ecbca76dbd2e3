use std::io::Write;
use thiserror::Error;

/// HTTP/1.1 request/response parsing and framing (spec.md §4.6, component C5).
///
/// A request line is `METHOD SP TARGET SP VERSION CRLF`; only `HTTP/1.1` and
/// `HTTP/1.0` are accepted. Headers are `name COLON value`, trimmed; a
/// duplicate header name overwrites the prior value rather than being
/// appended (spec.md §4.6, the explicit design choice noted in §9).
#[derive(Debug, Error)]
pub enum Http1Error {
    #[error("incomplete request")]
    Partial,
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error("unsupported HTTP version {0:?}")]
    UnsupportedVersion(String),
}

/// A parsed request borrowing directly out of the connection's read buffer —
/// no header copies on the hot path (mirrors the zero-copy `httparse` usage
/// this crate's proxy layer was built around).
#[derive(Debug)]
pub struct Request<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub version: u8,
    pub headers: Vec<(&'a str, &'a str)>,
    pub body: &'a [u8],
}

impl<'a> Request<'a> {
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| *v)
    }

    pub fn keep_alive(&self) -> bool {
        match self.header("connection") {
            Some(v) => !v.eq_ignore_ascii_case("close"),
            None => self.version == 1,
        }
    }
}

/// Parses `buf` as a complete HTTP/1.1 request, including a `Content-Length`
/// bounded body.
///
/// `Http1Error::Partial` means the caller should read more bytes and retry;
/// any other error is a terminal 400.
pub fn parse_request(buf: &[u8]) -> Result<Request<'_>, Http1Error> {
    let mut raw_headers = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut raw_headers);

    let body_offset = match req.parse(buf) {
        Ok(httparse::Status::Complete(n)) => n,
        Ok(httparse::Status::Partial) => return Err(Http1Error::Partial),
        Err(e) => return Err(Http1Error::Malformed(e.to_string())),
    };

    let version = req.version.ok_or_else(|| Http1Error::Malformed("missing version".into()))?;
    if version != 0 && version != 1 {
        return Err(Http1Error::UnsupportedVersion(format!("HTTP/1.{version}")));
    }

    let method = req.method.ok_or_else(|| Http1Error::Malformed("missing method".into()))?;
    let path = req.path.ok_or_else(|| Http1Error::Malformed("missing target".into()))?;

    let mut headers: Vec<(&str, &str)> = Vec::with_capacity(req.headers.len());
    let mut content_length: Option<usize> = None;
    for h in req.headers.iter() {
        if h.name.is_empty() {
            break;
        }
        let value = std::str::from_utf8(h.value).map_err(|_| Http1Error::Malformed("non-UTF-8 header value".into()))?;
        if h.name.eq_ignore_ascii_case("content-length") {
            content_length = value.trim().parse().ok();
        }
        // Duplicate header names overwrite the prior value (spec.md §4.6, §9).
        if let Some(slot) = headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(h.name)) {
            slot.1 = value;
        } else {
            headers.push((h.name, value));
        }
    }

    let body_len = content_length.unwrap_or(0);
    let available = buf.len().saturating_sub(body_offset);
    if available < body_len {
        return Err(Http1Error::Partial);
    }
    let body = &buf[body_offset..body_offset + body_len];

    Ok(Request { method, path, version, headers, body })
}

/// Builds the request gatekit forwards upstream: the client's request line
/// and headers pass through verbatim except hop-by-hop headers, which are
/// dropped; `Host` is synthesized from `origin_authority` if the client sent
/// none, and `Content-Length` is injected if the body is non-empty and the
/// client didn't set one (spec.md §4.6).
pub fn build_upstream_request(
    buf: &mut Vec<u8>,
    req: &Request<'_>,
    origin_authority: &str,
) {
    buf.clear();
    buf.extend_from_slice(req.method.as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(req.path.as_bytes());
    buf.extend_from_slice(b" HTTP/1.1\r\n");

    let mut saw_host = false;
    let mut saw_content_length = false;
    for (name, value) in &req.headers {
        if is_hop_by_hop(name) {
            continue;
        }
        if name.eq_ignore_ascii_case("host") {
            saw_host = true;
        }
        if name.eq_ignore_ascii_case("content-length") {
            saw_content_length = true;
        }
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    if !saw_host {
        buf.extend_from_slice(b"host: ");
        buf.extend_from_slice(origin_authority.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    if !saw_content_length && !req.body.is_empty() {
        write!(buf, "content-length: {}\r\n", req.body.len()).expect("write to Vec never fails");
    }
    buf.extend_from_slice(b"connection: keep-alive\r\n\r\n");
    buf.extend_from_slice(req.body);
}

fn is_hop_by_hop(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "connection" | "keep-alive" | "transfer-encoding" | "upgrade" | "proxy-connection"
    )
}

/// Builds a response gatekit sends to the client for a locally-generated
/// result (a middleware denial, a 404, a 502): status line, `Content-Length`,
/// and any caller-supplied headers, followed by the body.
pub fn build_response(buf: &mut Vec<u8>, status: u16, headers: &[(String, String)], body: &[u8]) {
    buf.clear();
    buf.extend_from_slice(b"HTTP/1.1 ");
    let mut itoa_buf = itoa::Buffer::new();
    buf.extend_from_slice(itoa_buf.format(status).as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(status_text(status).as_bytes());
    buf.extend_from_slice(b"\r\ncontent-length: ");
    buf.extend_from_slice(itoa_buf.format(body.len()).as_bytes());
    buf.extend_from_slice(b"\r\n");
    for (k, v) in headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf.extend_from_slice(b"\r\n");
    buf.extend_from_slice(body);
}

pub fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}
