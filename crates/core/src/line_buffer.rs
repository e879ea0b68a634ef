//! Line splitting for process output streams.
//!
//! [`LineBuffer`] is a small state machine: bytes are appended to a pending
//! buffer and every `\n` or `\r` terminator emits the buffered line. It does
//! not care where the bytes come from, so chunks can split a line (or a
//! multi-byte character) anywhere.

/// Pending partial line plus the terminator split logic.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completed, in order.
    ///
    /// Lines are trimmed; blank lines (including the empty line between
    /// `\r` and `\n`) are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            match byte {
                b'\n' | b'\r' => {
                    if let Some(line) = self.take_line() {
                        lines.push(line);
                    }
                }
                other => self.pending.push(other),
            }
        }
        lines
    }

    /// Flush the trailing partial line at end of stream.
    pub fn finish(mut self) -> Option<String> {
        self.take_line()
    }

    fn take_line(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        if line.is_empty() {
            None
        } else {
            Some(line)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
