use super::Http2Error;

/// The subset of RFC 7540 §6.5.2 SETTINGS parameters the handler acts on.
/// Unknown parameter identifiers are ignored on decode, per the RFC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub initial_window_size: u32,
    pub max_frame_size: u32,
}

const INITIAL_WINDOW_SIZE: u16 = 0x4;
const MAX_FRAME_SIZE: u16 = 0x5;

impl Default for Settings {
    /// RFC 7540 §6.5.2 defaults: a 64KiB-1 stream window, 16KiB max frame size.
    fn default() -> Settings {
        Settings { initial_window_size: 65_535, max_frame_size: 16_384 }
    }
}

impl Settings {
    /// Decodes a SETTINGS frame payload (a sequence of 6-byte id+value pairs),
    /// applying recognized parameters on top of `self`.
    pub fn apply(&mut self, payload: &[u8]) -> Result<(), Http2Error> {
        if payload.len() % 6 != 0 {
            return Err(Http2Error::Frame("SETTINGS payload not a multiple of 6".into()));
        }
        for chunk in payload.chunks_exact(6) {
            let id = u16::from_be_bytes([chunk[0], chunk[1]]);
            let value = u32::from_be_bytes([chunk[2], chunk[3], chunk[4], chunk[5]]);
            match id {
                INITIAL_WINDOW_SIZE => self.initial_window_size = value,
                MAX_FRAME_SIZE => self.max_frame_size = value,
                _ => {} // unrecognized settings are ignored (RFC 7540 §6.5.2)
            }
        }
        Ok(())
    }

    /// Encodes the subset of parameters this handler negotiates, for the
    /// server's own initial SETTINGS frame.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(12);
        out.extend_from_slice(&INITIAL_WINDOW_SIZE.to_be_bytes());
        out.extend_from_slice(&self.initial_window_size.to_be_bytes());
        out.extend_from_slice(&MAX_FRAME_SIZE.to_be_bytes());
        out.extend_from_slice(&self.max_frame_size.to_be_bytes());
        out
    }
}
