use bytes::{Buf, Bytes, BytesMut};

/// End-of-headers marker.
pub const BOUNDARY: &[u8] = b"\r\n\r\n";

/// Upper bound of a single socket read.
pub const READ_CHUNK_SIZE: usize = 1024;

/// A message head split off the front of a [`StreamBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHead {
    /// Head bytes, boundary excluded
    pub bytes: Bytes,
    /// Bytes removed from the buffer, boundary included
    pub consumed: usize,
}

/// Per-connection accumulation of bytes that have not been framed yet.
///
/// Bytes are only ever appended at the back and removed from the front, so
/// whatever is left after an extraction is the start of the next message.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    buf: BytesMut,
    // Offset where the next boundary search starts.
    scanned: usize,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
            scanned: 0,
        }
    }

    /// Appends freshly read bytes.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Splits off everything up to the first `\r\n\r\n`.
    ///
    /// Returns `None` while no boundary has been received. The search picks up
    /// three bytes before where the previous one stopped, so a boundary that
    /// straddles two reads is still found.
    pub fn try_extract_head(&mut self) -> Option<RawHead> {
        let start = self.scanned.saturating_sub(BOUNDARY.len() - 1);

        match find_boundary(&self.buf[start..]) {
            Some(pos) => {
                let head_len = start + pos;
                let head = self.buf.split_to(head_len).freeze();
                self.buf.advance(BOUNDARY.len());
                self.scanned = 0;

                Some(RawHead {
                    bytes: head,
                    consumed: head_len + BOUNDARY.len(),
                })
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// Removes exactly `n` bytes from the front, or nothing if fewer are buffered.
    pub fn take(&mut self, n: usize) -> Option<Bytes> {
        if self.buf.len() < n {
            return None;
        }

        self.scanned = 0;
        Some(self.buf.split_to(n).freeze())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

fn find_boundary(buf: &[u8]) -> Option<usize> {
    buf.windows(BOUNDARY.len())
        .position(|w| w == BOUNDARY)
}
