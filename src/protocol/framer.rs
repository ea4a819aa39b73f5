//! Line framing for the CR-terminated device stream
//!
//! The transport hands over whatever the serial driver had ready, so a chunk
//! may hold half a line, several lines, or a line split across two reads.
//! [`LineFramer`] accumulates chunks and yields complete lines only.

use tracing::{trace, warn};

/// Record terminator used by ALGE/FDS devices.
pub const LINE_TERMINATOR: char = '\r';

/// Longest unterminated fragment kept before it is treated as garbage.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4 * 1024;

/// Accumulates incoming text and splits it into trimmed, non-empty lines.
#[derive(Debug, Clone)]
pub struct LineFramer {
    /// Bytes received after the last terminator.
    buffer: String,
    max_line_length: usize,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self { buffer: String::new(), max_line_length: max_line_length.max(1) }
    }

    /// Append a chunk and return every line it completed, in order.
    ///
    /// Lines are trimmed; blank lines are dropped. Whatever follows the last
    /// terminator stays buffered for the next call.
    ///
    /// ```
    /// use fds_timing::protocol::LineFramer;
    ///
    /// let mut framer = LineFramer::new();
    /// assert!(framer.feed("5 C0M 12:00").is_empty());
    /// let lines = framer.feed(":00.0000 0\r6 c1 3.0 0\r");
    /// assert_eq!(lines, vec!["5 C0M 12:00:00.0000 0", "6 c1 3.0 0"]);
    /// assert_eq!(framer.pending(), "");
    /// ```
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        trace!(len = chunk.len(), "Framer received chunk");
        self.buffer.push_str(chunk);

        let mut lines = Vec::new();
        let mut consumed = 0;
        for (idx, _) in self.buffer.match_indices(LINE_TERMINATOR) {
            let line = self.buffer[consumed..idx].trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
            consumed = idx + LINE_TERMINATOR.len_utf8();
        }
        self.buffer.drain(..consumed);

        if self.buffer.len() > self.max_line_length {
            warn!(
                len = self.buffer.len(),
                limit = self.max_line_length,
                "Discarding unterminated fragment"
            );
            self.buffer.clear();
        }

        lines
    }

    /// Byte-oriented variant of [`feed`](Self::feed). The protocol is ASCII;
    /// anything else is replaced rather than rejected.
    pub fn feed_bytes(&mut self, chunk: &[u8]) -> Vec<String> {
        self.feed(&String::from_utf8_lossy(chunk))
    }

    /// Incomplete fragment awaiting its terminator.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Drop any buffered fragment.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}
