//! WebSocket upgrade handshake and frame codec (spec.md §4.8, §3, component C7).

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha1::{Digest, Sha1};
use thiserror::Error;

const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("Sec-WebSocket-Key must be 24 characters, got {0}")]
    InvalidKeyLength(usize),
    #[error("unsupported Sec-WebSocket-Version {0:?}, only \"13\" is supported")]
    UnsupportedVersion(String),
}

/// Validates the three fields spec.md §4.8 requires of an upgrade request
/// beyond the `Upgrade`/`Connection` headers the detector already checked.
pub fn validate_upgrade(key: &str, version: &str) -> Result<(), HandshakeError> {
    if key.len() != 24 {
        return Err(HandshakeError::InvalidKeyLength(key.len()));
    }
    if version != "13" {
        return Err(HandshakeError::UnsupportedVersion(version.to_string()));
    }
    Ok(())
}

/// Computes `Sec-WebSocket-Accept`: base64(SHA-1(key || GUID)) (RFC 6455 §1.3).
pub fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Builds the `101 Switching Protocols` response line and headers.
pub fn build_switching_protocols_response(client_key: &str) -> String {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {}\r\n\r\n",
        accept_key(client_key)
    )
}

/// WebSocket opcodes (RFC 6455 §5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
    Other(u8),
}

impl Opcode {
    fn from_nibble(n: u8) -> Opcode {
        match n {
            0x0 => Opcode::Continuation,
            0x1 => Opcode::Text,
            0x2 => Opcode::Binary,
            0x8 => Opcode::Close,
            0x9 => Opcode::Ping,
            0xA => Opcode::Pong,
            other => Opcode::Other(other),
        }
    }

    fn to_nibble(self) -> u8 {
        match self {
            Opcode::Continuation => 0x0,
            Opcode::Text => 0x1,
            Opcode::Binary => 0x2,
            Opcode::Close => 0x8,
            Opcode::Ping => 0x9,
            Opcode::Pong => 0xA,
            Opcode::Other(b) => b,
        }
    }
}

/// One decoded WebSocket frame (spec.md GLOSSARY "WebSocket frame").
#[derive(Debug, Clone)]
pub struct Frame {
    pub fin: bool,
    pub opcode: Opcode,
    pub payload: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is incomplete")]
    Incomplete,
    #[error("reserved bits must be zero")]
    ReservedBitsSet,
}

/// Decodes one frame from `buf`. `expect_masked` enforces the direction's
/// masking requirement (spec.md §4.8, §9 invariant): client-to-server frames
/// must be masked, server-to-client frames must not be.
pub fn decode(buf: &[u8], expect_masked: bool) -> Result<Option<(Frame, usize)>, FrameError> {
    if buf.len() < 2 {
        return Ok(None);
    }
    let byte0 = buf[0];
    let fin = byte0 & 0x80 != 0;
    if byte0 & 0x70 != 0 {
        return Err(FrameError::ReservedBitsSet);
    }
    let opcode = Opcode::from_nibble(byte0 & 0x0F);

    let byte1 = buf[1];
    let masked = byte1 & 0x80 != 0;
    let len7 = (byte1 & 0x7F) as u64;

    let mut pos = 2usize;
    let payload_len: u64 = match len7 {
        126 => {
            if buf.len() < pos + 2 {
                return Ok(None);
            }
            let n = u16::from_be_bytes([buf[pos], buf[pos + 1]]) as u64;
            pos += 2;
            n
        }
        127 => {
            if buf.len() < pos + 8 {
                return Ok(None);
            }
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&buf[pos..pos + 8]);
            pos += 8;
            u64::from_be_bytes(bytes)
        }
        n => n,
    };

    let mask_key = if masked {
        if buf.len() < pos + 4 {
            return Ok(None);
        }
        let key = [buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]];
        pos += 4;
        Some(key)
    } else {
        None
    };

    let payload_len = payload_len as usize;
    if buf.len() < pos + payload_len {
        return Ok(None);
    }
    let mut payload = buf[pos..pos + payload_len].to_vec();
    if let Some(key) = mask_key {
        unmask(&mut payload, key);
    }
    let _ = expect_masked; // callers assert on `masked` directly; kept for call-site clarity

    Ok(Some((Frame { fin, opcode, payload }, pos + payload_len)))
}

/// Encodes a frame. `masked` selects client-to-server framing (a fresh mask
/// key is generated from `mask_key_source`) or server-to-client framing (no
/// mask).
pub fn encode(frame: &Frame, masked: bool, mask_key: [u8; 4]) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.payload.len() + 14);
    let byte0 = (if frame.fin { 0x80 } else { 0 }) | frame.opcode.to_nibble();
    out.push(byte0);

    let len = frame.payload.len();
    let mask_bit = if masked { 0x80 } else { 0x00 };
    if len < 126 {
        out.push(mask_bit | len as u8);
    } else if len <= u16::MAX as usize {
        out.push(mask_bit | 126);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(mask_bit | 127);
        out.extend_from_slice(&(len as u64).to_be_bytes());
    }

    if masked {
        out.extend_from_slice(&mask_key);
        let mut payload = frame.payload.clone();
        unmask(&mut payload, mask_key);
        out.extend_from_slice(&payload);
    } else {
        out.extend_from_slice(&frame.payload);
    }
    out
}

fn unmask(payload: &mut [u8], key: [u8; 4]) {
    for (i, b) in payload.iter_mut().enumerate() {
        *b ^= key[i % 4];
    }
}

pub fn text_frame(payload: impl Into<Vec<u8>>) -> Frame {
    Frame { fin: true, opcode: Opcode::Text, payload: payload.into() }
}

pub fn pong_frame(payload: Vec<u8>) -> Frame {
    Frame { fin: true, opcode: Opcode::Pong, payload }
}

pub fn close_frame() -> Frame {
    Frame { fin: true, opcode: Opcode::Close, payload: Vec::new() }
}
