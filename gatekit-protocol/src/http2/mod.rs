//! HTTP/2 framing (spec.md §4.7, component C6): SETTINGS exchange, HEADERS +
//! CONTINUATION decoded into method/path/headers via a conservative
//! literal-only HPACK subset, DATA assembly, and the RFC 7540 §5.1 stream
//! state machine. Server push and full HPACK dynamic-table eviction are out
//! of scope (SPEC_FULL.md §4, resolving spec.md §9's Open Question in favor
//! of this conservative subset).

pub mod frame;
pub mod hpack;
pub mod settings;
pub mod stream;

pub use frame::{Frame, FrameHeader, FrameType};
pub use settings::Settings;
pub use stream::{Stream, StreamState};

use thiserror::Error;

/// The 24-byte client connection preface (spec.md §4.5, §4.7); the detector
/// has already consumed it by the time this crate's HTTP/2 handler runs, but
/// it's exposed here so a caller that reads ahead can still verify it.
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

#[derive(Debug, Error)]
pub enum Http2Error {
    #[error("frame error: {0}")]
    Frame(String),
    #[error("hpack error: {0}")]
    Hpack(String),
    #[error("stream error on stream {stream_id}: {message}")]
    Stream { stream_id: u32, message: String },
}
