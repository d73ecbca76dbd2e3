use super::Http2Error;

/// A conservative HPACK subset (RFC 7541) covering what SPEC_FULL.md's
/// HTTP/2 resolution asks for: the static table plus literal header fields.
/// No dynamic table is maintained — "literal with incremental indexing"
/// decodes correctly but its entry is never added to a table, and a
/// same-connection reference to that entry (which only a dynamic-table-aware
/// peer would emit) is rejected as `Hpack` rather than silently
/// misinterpreted. Huffman-coded string literals are rejected outright;
/// full dynamic-table eviction and Huffman coding are the explicitly
/// unsupported pieces of SPEC_FULL.md §4's HTTP/2 resolution.
const STATIC_TABLE: &[(&str, &str)] = &[
    (":authority", ""),
    (":method", "GET"),
    (":method", "POST"),
    (":path", "/"),
    (":path", "/index.html"),
    (":scheme", "http"),
    (":scheme", "https"),
    (":status", "200"),
    (":status", "204"),
    (":status", "206"),
    (":status", "304"),
    (":status", "400"),
    (":status", "404"),
    (":status", "500"),
    ("accept-charset", ""),
    ("accept-encoding", "gzip, deflate"),
    ("accept-language", ""),
    ("accept-ranges", ""),
    ("accept", ""),
    ("access-control-allow-origin", ""),
    ("age", ""),
    ("allow", ""),
    ("authorization", ""),
    ("cache-control", ""),
    ("content-disposition", ""),
    ("content-encoding", ""),
    ("content-language", ""),
    ("content-length", ""),
    ("content-location", ""),
    ("content-range", ""),
    ("content-type", ""),
    ("cookie", ""),
    ("date", ""),
    ("etag", ""),
    ("expect", ""),
    ("expires", ""),
    ("from", ""),
    ("host", ""),
    ("if-match", ""),
    ("if-modified-since", ""),
    ("if-none-match", ""),
    ("if-range", ""),
    ("if-unmodified-since", ""),
    ("last-modified", ""),
    ("link", ""),
    ("location", ""),
    ("max-forwards", ""),
    ("proxy-authenticate", ""),
    ("proxy-authorization", ""),
    ("range", ""),
    ("referer", ""),
    ("refresh", ""),
    ("retry-after", ""),
    ("server", ""),
    ("set-cookie", ""),
    ("strict-transport-security", ""),
    ("transfer-encoding", ""),
    ("user-agent", ""),
    ("vary", ""),
    ("via", ""),
    ("www-authenticate", ""),
];

fn static_lookup(index: usize) -> Result<(&'static str, &'static str), Http2Error> {
    STATIC_TABLE
        .get(index.checked_sub(1).ok_or_else(|| Http2Error::Hpack("index 0 is not valid".into()))?)
        .copied()
        .ok_or_else(|| Http2Error::Hpack(format!("header table index {index} out of range (no dynamic table)")))
}

/// Decodes an N-bit-prefix integer (RFC 7541 §5.1) starting at `buf[pos]`,
/// where the low `prefix_bits` bits of `buf[pos]` are the prefix. Returns the
/// decoded value and the index just past the integer.
fn decode_integer(buf: &[u8], pos: usize, prefix_bits: u32) -> Result<(u64, usize), Http2Error> {
    let max_prefix = (1u16 << prefix_bits) - 1;
    let first = *buf.get(pos).ok_or_else(|| Http2Error::Hpack("truncated integer".into()))? as u64;
    let prefix_value = first & max_prefix as u64;
    if prefix_value < max_prefix as u64 {
        return Ok((prefix_value, pos + 1));
    }
    let mut value = prefix_value;
    let mut m = 0u32;
    let mut i = pos + 1;
    loop {
        let b = *buf.get(i).ok_or_else(|| Http2Error::Hpack("truncated integer continuation".into()))?;
        value += ((b & 0x7f) as u64) << m;
        i += 1;
        if b & 0x80 == 0 {
            break;
        }
        m += 7;
    }
    Ok((value, i))
}

/// Decodes a string literal (RFC 7541 §5.2): a length-prefixed byte run,
/// where the high bit of the length byte signals Huffman coding.
fn decode_string(buf: &[u8], pos: usize) -> Result<(String, usize), Http2Error> {
    let huffman = buf.get(pos).map(|b| b & 0x80 != 0).unwrap_or(false);
    let (len, after_len) = decode_integer(buf, pos, 7)?;
    if huffman {
        return Err(Http2Error::Hpack("Huffman-coded string literals are not supported".into()));
    }
    let len = len as usize;
    let end = after_len.checked_add(len).ok_or_else(|| Http2Error::Hpack("string length overflow".into()))?;
    let bytes = buf.get(after_len..end).ok_or_else(|| Http2Error::Hpack("truncated string literal".into()))?;
    let s = std::str::from_utf8(bytes).map_err(|_| Http2Error::Hpack("non-UTF-8 string literal".into()))?.to_string();
    Ok((s, end))
}

/// Decodes a complete header block (the concatenation of a HEADERS frame's
/// payload with any CONTINUATION frames) into an ordered list of headers,
/// including pseudo-headers like `:method` and `:path`.
pub fn decode(buf: &[u8]) -> Result<Vec<(String, String)>, Http2Error> {
    let mut headers = Vec::new();
    let mut pos = 0;
    while pos < buf.len() {
        let first = buf[pos];
        if first & 0x80 != 0 {
            // Indexed Header Field (§6.1): 1-bit pattern, 7-bit index.
            let (index, next) = decode_integer(buf, pos, 7)?;
            let (name, value) = static_lookup(index as usize)?;
            headers.push((name.to_string(), value.to_string()));
            pos = next;
        } else if first & 0x40 != 0 {
            // Literal Header Field with Incremental Indexing (§6.2.1): 01, 6-bit name index.
            let (index, after_prefix) = decode_integer(buf, pos, 6)?;
            let (name, after_name) = decode_header_name(buf, pos, after_prefix, index)?;
            let (value, next) = decode_string(buf, after_name)?;
            headers.push((name, value));
            pos = next;
        } else if first & 0x20 != 0 {
            // Dynamic Table Size Update (§6.3): no dynamic table to resize, just consume it.
            let (_, next) = decode_integer(buf, pos, 5)?;
            pos = next;
        } else {
            // Literal Header Field without/never Indexing (§6.2.2, §6.2.3): 4-bit name index.
            let (index, after_prefix) = decode_integer(buf, pos, 4)?;
            let (name, after_name) = decode_header_name(buf, pos, after_prefix, index)?;
            let (value, next) = decode_string(buf, after_name)?;
            headers.push((name, value));
            pos = next;
        }
    }
    Ok(headers)
}

fn decode_header_name(buf: &[u8], pos: usize, after_prefix: usize, index: u64) -> Result<(String, usize), Http2Error> {
    if index == 0 {
        let first = buf[pos];
        let _ = first;
        decode_string(buf, after_prefix)
    } else {
        let (name, _) = static_lookup(index as usize)?;
        Ok((name.to_string(), after_prefix))
    }
}

/// Encodes one header as a Literal Header Field without Indexing with a
/// literal name (RFC 7541 §6.2.2) — valid wire format any HPACK decoder
/// accepts, trading a few bytes of static-table reuse for not having to
/// track which peer knows which table entries.
pub fn encode_header(name: &str, value: &str, out: &mut Vec<u8>) {
    out.push(0x00); // literal without indexing, name index 0 (literal name follows)
    encode_string(name, out);
    encode_string(value, out);
}

pub fn encode(headers: &[(String, String)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, value) in headers {
        encode_header(name, value, &mut out);
    }
    out
}

fn encode_string(s: &str, out: &mut Vec<u8>) {
    encode_integer(s.len() as u64, 7, 0, out);
    out.extend_from_slice(s.as_bytes());
}

fn encode_integer(value: u64, prefix_bits: u32, prefix_pattern: u8, out: &mut Vec<u8>) {
    let max_prefix = (1u64 << prefix_bits) - 1;
    if value < max_prefix {
        out.push(prefix_pattern | value as u8);
        return;
    }
    out.push(prefix_pattern | max_prefix as u8);
    let mut remaining = value - max_prefix;
    while remaining >= 128 {
        out.push(((remaining % 128) | 0x80) as u8);
        remaining /= 128;
    }
    out.push(remaining as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_indexed_header_field() {
        // index 2 = (":method", "GET")
        let buf = [0x82u8];
        let headers = decode(&buf).unwrap();
        assert_eq!(headers, vec![(":method".to_string(), "GET".to_string())]);
    }

    #[test]
    fn decodes_literal_with_indexed_name_and_literal_value() {
        // literal w/ incremental indexing, name index 4 (":path"), value "/widgets"
        let mut buf = vec![0x44u8];
        encode_string("/widgets", &mut buf);
        let headers = decode(&buf).unwrap();
        assert_eq!(headers, vec![(":path".to_string(), "/widgets".to_string())]);
    }

    #[test]
    fn decodes_literal_with_literal_name_and_value() {
        let mut buf = vec![0x00u8]; // literal without indexing, literal name
        encode_string("x-request-id", &mut buf);
        encode_string("abc-123", &mut buf);
        let headers = decode(&buf).unwrap();
        assert_eq!(headers, vec![("x-request-id".to_string(), "abc-123".to_string())]);
    }

    #[test]
    fn huffman_literal_is_rejected() {
        let mut buf = vec![0x00u8];
        buf.push(0x80); // huffman bit set, length 0
        assert!(decode(&buf).is_err());
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let buf = [0xffu8, 0x00]; // index encodes to something way past the static table
        assert!(decode(&buf).is_err());
    }

    #[test]
    fn encode_then_decode_round_trips_a_header_set() {
        let headers = vec![
            (":method".to_string(), "POST".to_string()),
            (":path".to_string(), "/api/widgets".to_string()),
            ("content-type".to_string(), "application/json".to_string()),
        ];
        let encoded = encode(&headers);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, headers);
    }

    #[test]
    fn dynamic_table_size_update_is_consumed_without_producing_a_header() {
        let buf = [0x20u8]; // size update to 0
        assert_eq!(decode(&buf).unwrap(), Vec::<(String, String)>::new());
    }
}
