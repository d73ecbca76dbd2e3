/// The three protocols the proxy speaks on an accepted connection (spec.md §4.5,
/// component C4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http1,
    Http2,
    WebSocket,
}

const H2_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

const HTTP1_METHOD_PREFIXES: &[&[u8]] = &[
    b"GET ", b"POST ", b"PUT ", b"DELETE ", b"HEAD ", b"OPTIONS ", b"PATCH ", b"CONNECT ", b"TRACE ",
];

/// Classifies a newly-accepted connection from its first up-to-24 bytes
/// (spec.md §4.5).
///
/// Returns `None` when the prefix matches none of the recognized shapes; the
/// caller closes the connection in that case. Never consumes more of `prefix`
/// than it classifies on — the full `prefix` must be handed to whichever
/// handler is chosen next, since a detector that peeks cannot un-read bytes it
/// already consumed from a detector that can't.
pub fn classify(prefix: &[u8]) -> Option<Protocol> {
    if prefix.len() >= H2_PREFACE.len() && &prefix[..H2_PREFACE.len()] == H2_PREFACE {
        return Some(Protocol::Http2);
    }

    if HTTP1_METHOD_PREFIXES.iter().any(|p| prefix.starts_with(p)) {
        if is_websocket_upgrade(prefix) {
            return Some(Protocol::WebSocket);
        }
        return Some(Protocol::Http1);
    }

    None
}

/// True iff `buf` contains both `Upgrade: websocket` and `Connection: Upgrade`,
/// case-insensitively, as required by spec.md §4.5 step 2.
fn is_websocket_upgrade(buf: &[u8]) -> bool {
    contains_ci(buf, b"upgrade: websocket") && contains_ci(buf, b"connection: upgrade")
}

fn contains_ci(haystack: &[u8], needle_lower: &[u8]) -> bool {
    if needle_lower.len() > haystack.len() {
        return false;
    }
    haystack
        .windows(needle_lower.len())
        .any(|w| w.eq_ignore_ascii_case(needle_lower))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn h2_preface_classifies_as_http2() {
        assert_eq!(classify(H2_PREFACE), Some(Protocol::Http2));
    }

    #[test]
    fn plain_get_classifies_as_http1() {
        let req = b"GET /api HTTP/1.1\r\nHost: x\r\n\r\n";
        assert_eq!(classify(req), Some(Protocol::Http1));
    }

    #[test]
    fn websocket_upgrade_headers_classify_as_websocket() {
        let req = b"GET /ws HTTP/1.1\r\nHost: x\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n";
        assert_eq!(classify(req), Some(Protocol::WebSocket));
    }

    #[test]
    fn websocket_detection_is_case_insensitive() {
        let req = b"GET /ws HTTP/1.1\r\nUPGRADE: WebSocket\r\nCONNECTION: upgrade\r\n\r\n";
        assert_eq!(classify(req), Some(Protocol::WebSocket));
    }

    #[test]
    fn upgrade_header_alone_is_not_enough() {
        let req = b"GET /x HTTP/1.1\r\nUpgrade: websocket\r\n\r\n";
        assert_eq!(classify(req), Some(Protocol::Http1));
    }

    #[test]
    fn unrecognized_prefix_is_unknown() {
        assert_eq!(classify(b"\x16\x03\x01\x00\x42"), None);
    }

    #[test]
    fn every_recognized_method_classifies_as_http1() {
        for method in ["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH", "CONNECT", "TRACE"] {
            let req = format!("{method} / HTTP/1.1\r\n\r\n");
            assert_eq!(classify(req.as_bytes()), Some(Protocol::Http1), "method {method}");
        }
    }
}
