use super::Http2Error;

/// A frame's 9-byte header (RFC 7540 §4.1): 24-bit length, 8-bit type, 8-bit
/// flags, and a 31-bit stream identifier (the reserved high bit is masked
/// off on read and always written as zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: u32,
    pub frame_type: FrameType,
    pub flags: u8,
    pub stream_id: u32,
}

pub const HEADER_LEN: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Data,
    Headers,
    Priority,
    RstStream,
    Settings,
    PushPromise,
    Ping,
    GoAway,
    WindowUpdate,
    Continuation,
    Unknown(u8),
}

impl FrameType {
    fn from_byte(b: u8) -> FrameType {
        match b {
            0x0 => FrameType::Data,
            0x1 => FrameType::Headers,
            0x2 => FrameType::Priority,
            0x3 => FrameType::RstStream,
            0x4 => FrameType::Settings,
            0x5 => FrameType::PushPromise,
            0x6 => FrameType::Ping,
            0x7 => FrameType::GoAway,
            0x8 => FrameType::WindowUpdate,
            0x9 => FrameType::Continuation,
            other => FrameType::Unknown(other),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            FrameType::Data => 0x0,
            FrameType::Headers => 0x1,
            FrameType::Priority => 0x2,
            FrameType::RstStream => 0x3,
            FrameType::Settings => 0x4,
            FrameType::PushPromise => 0x5,
            FrameType::Ping => 0x6,
            FrameType::GoAway => 0x7,
            FrameType::WindowUpdate => 0x8,
            FrameType::Continuation => 0x9,
            FrameType::Unknown(b) => b,
        }
    }
}

// HEADERS / DATA flags (RFC 7540 §6.1, §6.2).
pub const FLAG_END_STREAM: u8 = 0x1;
pub const FLAG_END_HEADERS: u8 = 0x4;
pub const FLAG_PADDED: u8 = 0x8;
pub const FLAG_PRIORITY: u8 = 0x20;
// SETTINGS flags (RFC 7540 §6.5).
pub const FLAG_ACK: u8 = 0x1;

impl FrameHeader {
    pub fn parse(buf: &[u8]) -> Result<FrameHeader, Http2Error> {
        if buf.len() < HEADER_LEN {
            return Err(Http2Error::Frame("short frame header".into()));
        }
        let length = u32::from_be_bytes([0, buf[0], buf[1], buf[2]]);
        let frame_type = FrameType::from_byte(buf[3]);
        let flags = buf[4];
        let stream_id = u32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]) & 0x7fff_ffff;
        Ok(FrameHeader { length, frame_type, flags, stream_id })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        let len = self.length.to_be_bytes();
        out.extend_from_slice(&len[1..]);
        out.push(self.frame_type.to_byte());
        out.push(self.flags);
        out.extend_from_slice(&(self.stream_id & 0x7fff_ffff).to_be_bytes());
    }
}

/// A frame header paired with its (already-depadded) payload.
#[derive(Debug, Clone)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Parses one frame from `buf`, returning it plus the number of bytes
    /// consumed. `Ok(None)` means `buf` doesn't yet hold a complete frame.
    pub fn parse(buf: &[u8]) -> Result<Option<(Frame, usize)>, Http2Error> {
        if buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let header = FrameHeader::parse(buf)?;
        let total = HEADER_LEN + header.length as usize;
        if buf.len() < total {
            return Ok(None);
        }
        let mut payload = buf[HEADER_LEN..total].to_vec();
        strip_padding(&header, &mut payload)?;
        Ok(Some((Frame { header, payload }, total)))
    }

    pub fn encode(frame_type: FrameType, flags: u8, stream_id: u32, payload: &[u8]) -> Vec<u8> {
        let header = FrameHeader { length: payload.len() as u32, frame_type, flags, stream_id };
        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        header.write(&mut out);
        out.extend_from_slice(payload);
        out
    }
}

/// HEADERS and DATA frames may carry a one-byte pad length prefix plus that
/// many trailing padding bytes when `FLAG_PADDED` is set (RFC 7540 §6.1,
/// §6.2); this strips both, leaving just the frame's real content.
fn strip_padding(header: &FrameHeader, payload: &mut Vec<u8>) -> Result<(), Http2Error> {
    if header.flags & FLAG_PADDED == 0 {
        return Ok(());
    }
    if payload.is_empty() {
        return Err(Http2Error::Frame("PADDED flag set with empty payload".into()));
    }
    let pad_len = payload[0] as usize;
    if pad_len + 1 > payload.len() {
        return Err(Http2Error::Frame("pad length exceeds frame payload".into()));
    }
    let content_end = payload.len() - pad_len;
    payload.drain(content_end..);
    payload.remove(0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrips_through_write_and_parse() {
        let header = FrameHeader { length: 42, frame_type: FrameType::Headers, flags: FLAG_END_HEADERS, stream_id: 3 };
        let mut buf = Vec::new();
        header.write(&mut buf);
        assert_eq!(buf.len(), HEADER_LEN);
        let parsed = FrameHeader::parse(&buf).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn stream_id_reserved_bit_is_masked_on_parse() {
        let mut buf = vec![0u8; HEADER_LEN];
        buf[5] = 0x80; // reserved bit set
        buf[8] = 0x01;
        let parsed = FrameHeader::parse(&buf).unwrap();
        assert_eq!(parsed.stream_id, 1);
    }

    #[test]
    fn frame_parse_reports_incomplete_as_none() {
        let encoded = Frame::encode(FrameType::Data, 0, 1, b"hello world");
        assert!(Frame::parse(&encoded[..HEADER_LEN + 3]).unwrap().is_none());
    }

    #[test]
    fn frame_parse_consumes_exactly_the_frame() {
        let encoded = Frame::encode(FrameType::Data, FLAG_END_STREAM, 1, b"abc");
        let trailing = b"next-frame-bytes";
        let mut buf = encoded.clone();
        buf.extend_from_slice(trailing);
        let (frame, consumed) = Frame::parse(&buf).unwrap().unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(frame.payload, b"abc");
        assert_eq!(frame.header.flags, FLAG_END_STREAM);
    }

    #[test]
    fn padding_is_stripped_from_payload() {
        // pad_len=2, content="hi", 2 padding bytes
        let mut payload = vec![2u8];
        payload.extend_from_slice(b"hi");
        payload.extend_from_slice(&[0, 0]);
        let encoded = Frame::encode(FrameType::Data, FLAG_PADDED, 1, &payload);
        let (frame, _) = Frame::parse(&encoded).unwrap().unwrap();
        assert_eq!(frame.payload, b"hi");
    }
}
