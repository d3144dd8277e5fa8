//! NETCONF 1.0 end-of-message framing (RFC 6242 section 4.3)

use bytes::{Buf, BytesMut};

use crate::transport::NetconfTransportError;

/// Marker terminating every base:1.0 message
pub const END_OF_MESSAGE: &[u8] = b"]]>]]>";

/// Accumulates channel data and yields complete messages
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: BytesMut,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Next complete message, without its marker
    pub fn next_message(&mut self) -> Option<Result<String, std::string::FromUtf8Error>> {
        let end = find_marker(&self.buf)?;

        let message = self.buf.split_to(end);
        self.buf.advance(END_OF_MESSAGE.len());
        Some(String::from_utf8(message.to_vec()))
    }

    /// Bytes received but not yet part of a complete message
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Append the end-of-message marker.
///
/// A message that already contains the marker would reach the peer as two
/// messages, so it is refused.
pub fn frame(message: &str) -> Result<Vec<u8>, NetconfTransportError> {
    if let Some(at) = find_marker(message.as_bytes()) {
        return Err(NetconfTransportError::Framing(format!(
            "message contains the end-of-message marker at byte {}",
            at
        )));
    }
    let mut out = Vec::with_capacity(message.len() + END_OF_MESSAGE.len());
    out.extend_from_slice(message.as_bytes());
    out.extend_from_slice(END_OF_MESSAGE);
    Ok(out)
}

fn find_marker(data: &[u8]) -> Option<usize> {
    data.windows(END_OF_MESSAGE.len())
        .position(|w| w == END_OF_MESSAGE)
}
