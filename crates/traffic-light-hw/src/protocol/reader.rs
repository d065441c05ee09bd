//! Line framing for the inbound byte stream.

use super::LINE_TERMINATOR;
use tracing::warn;

/// Accumulates raw serial bytes and yields complete, trimmed lines.
///
/// After every [`push`](LineReader::push) the buffer holds at most one
/// incomplete trailing fragment. Lines come out in arrival order no matter how
/// the stream was chunked.
#[derive(Debug, Default)]
pub struct LineReader {
    buffer: Vec<u8>,
    max_fragment: Option<usize>,
    discarding: bool,
}

impl LineReader {
    /// Creates a reader with an unbounded fragment buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reader that drops any line longer than `max_fragment` bytes.
    ///
    /// The limit applies to completed lines and to the pending fragment alike,
    /// so an oversized line is dropped however the stream was chunked. Input
    /// after an overflow is discarded up to the next newline.
    pub fn with_limit(max_fragment: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_fragment: Some(max_fragment),
            discarding: false,
        }
    }

    /// Appends `data` and returns every line it completed.
    pub fn push(&mut self, data: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = data;

        while let Some(pos) = rest.iter().position(|&b| b == LINE_TERMINATOR) {
            let (head, tail) = rest.split_at(pos);
            rest = &tail[1..];

            if self.discarding {
                self.discarding = false;
                self.buffer.clear();
                continue;
            }

            if self.exceeds_limit(self.buffer.len() + head.len()) {
                self.buffer.clear();
                continue;
            }

            self.buffer.extend_from_slice(head);
            lines.push(String::from_utf8_lossy(&self.buffer).trim().to_string());
            self.buffer.clear();
        }

        if !self.discarding {
            self.buffer.extend_from_slice(rest);
            self.enforce_limit();
        }

        lines
    }

    /// Number of bytes held in the incomplete trailing fragment.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drops the pending fragment.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }

    fn enforce_limit(&mut self) {
        if self.exceeds_limit(self.buffer.len()) {
            self.buffer.clear();
            self.discarding = true;
        }
    }

    /// Returns true (and warns) if a line of `len` bytes is over the limit.
    fn exceeds_limit(&self, len: usize) -> bool {
        match self.max_fragment {
            Some(limit) if len > limit => {
                warn!("Dropping {} byte line (limit {})", len, limit);
                true
            }
            _ => false,
        }
    }
}
