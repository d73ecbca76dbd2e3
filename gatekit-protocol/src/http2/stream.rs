use super::Http2Error;

/// RFC 7540 §5.1 stream states, restricted to the transitions a server
/// handling one request/response exchange per stream actually exercises:
/// `idle -> open -> half-closed(remote) -> closed`, with the open state
/// skipped entirely when the client's HEADERS frame itself carries
/// `END_STREAM` (the common case for a body-less request).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Open,
    HalfClosedRemote,
    HalfClosedLocal,
    Closed,
}

#[derive(Debug)]
pub struct Stream {
    pub id: u32,
    pub state: StreamState,
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Stream {
    pub fn new(id: u32) -> Stream {
        Stream { id, state: StreamState::Idle, method: String::new(), path: String::new(), headers: Vec::new(), body: Vec::new() }
    }

    /// Applies a decoded HEADERS frame (spec.md §4.7): idle -> open, or
    /// idle -> half-closed(remote) directly when `end_stream` is set.
    pub fn recv_headers(&mut self, headers: Vec<(String, String)>, end_stream: bool) -> Result<(), Http2Error> {
        if self.state != StreamState::Idle {
            return Err(self.invalid_transition("HEADERS"));
        }
        for (name, value) in &headers {
            match name.as_str() {
                ":method" => self.method = value.clone(),
                ":path" => self.path = value.clone(),
                _ => {}
            }
        }
        self.headers = headers;
        self.state = if end_stream { StreamState::HalfClosedRemote } else { StreamState::Open };
        Ok(())
    }

    /// Applies a DATA frame: only legal while the remote end is still open.
    pub fn recv_data(&mut self, data: &[u8], end_stream: bool) -> Result<(), Http2Error> {
        if self.state != StreamState::Open {
            return Err(self.invalid_transition("DATA"));
        }
        self.body.extend_from_slice(data);
        if end_stream {
            self.state = StreamState::HalfClosedRemote;
        }
        Ok(())
    }

    /// Marks the response as fully sent: half-closed(remote) -> closed.
    pub fn send_response_complete(&mut self) -> Result<(), Http2Error> {
        if self.state != StreamState::HalfClosedRemote {
            return Err(self.invalid_transition("response completion"));
        }
        self.state = StreamState::Closed;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.state == StreamState::Closed
    }

    fn invalid_transition(&self, frame: &str) -> Http2Error {
        Http2Error::Stream { stream_id: self.id, message: format!("{frame} invalid in state {:?}", self.state) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_without_end_stream_opens_the_stream() {
        let mut s = Stream::new(1);
        s.recv_headers(vec![(":method".into(), "POST".into()), (":path".into(), "/x".into())], false).unwrap();
        assert_eq!(s.state, StreamState::Open);
        assert_eq!(s.method, "POST");
        assert_eq!(s.path, "/x");
    }

    #[test]
    fn headers_with_end_stream_skips_straight_to_half_closed_remote() {
        let mut s = Stream::new(1);
        s.recv_headers(vec![(":method".into(), "GET".into())], true).unwrap();
        assert_eq!(s.state, StreamState::HalfClosedRemote);
    }

    #[test]
    fn data_accumulates_body_and_can_end_the_stream() {
        let mut s = Stream::new(1);
        s.recv_headers(vec![], false).unwrap();
        s.recv_data(b"hello ", false).unwrap();
        s.recv_data(b"world", true).unwrap();
        assert_eq!(s.body, b"hello world");
        assert_eq!(s.state, StreamState::HalfClosedRemote);
    }

    #[test]
    fn data_before_headers_is_rejected() {
        let mut s = Stream::new(1);
        assert!(s.recv_data(b"x", false).is_err());
    }

    #[test]
    fn duplicate_headers_frame_is_rejected() {
        let mut s = Stream::new(1);
        s.recv_headers(vec![], true).unwrap();
        assert!(s.recv_headers(vec![], true).is_err());
    }

    #[test]
    fn response_completion_closes_the_stream() {
        let mut s = Stream::new(1);
        s.recv_headers(vec![], true).unwrap();
        s.send_response_complete().unwrap();
        assert!(s.is_closed());
    }

    #[test]
    fn response_completion_before_remote_end_is_rejected() {
        let mut s = Stream::new(1);
        s.recv_headers(vec![], false).unwrap();
        assert!(s.send_response_complete().is_err());
    }
}
