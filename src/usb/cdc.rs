//! USB CDC ACM (Serial) Framing
//!
//! Byte-stream to line reassembly for the remote-control port, and
//! newline framing for responses. Transport-independent: the embassy USB
//! task feeds packets in and drains framed bytes out.

use heapless::Vec;

use crate::config::COMMAND_LINE_LEN;

/// Receive buffer size; holds a couple of command lines
pub const CDC_BUFFER_SIZE: usize = COMMAND_LINE_LEN * 2;

/// One received command line, terminator stripped
pub type LineBytes = Vec<u8, COMMAND_LINE_LEN>;

/// CDC read buffer
pub struct CdcReadBuffer {
    buffer: [u8; CDC_BUFFER_SIZE],
    read_pos: usize,
    write_pos: usize,
    /// Partial lines discarded because they never fit
    overflows: u32,
}

impl CdcReadBuffer {
    /// Create a new read buffer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [0; CDC_BUFFER_SIZE],
            read_pos: 0,
            write_pos: 0,
            overflows: 0,
        }
    }

    /// Push data into buffer, returning how many bytes were taken
    ///
    /// Stops early when the buffer is full of unread lines; the caller
    /// drains them with [`Self::read_line`] and pushes the rest. A partial
    /// line that outgrows the whole buffer is dropped.
    pub fn push(&mut self, data: &[u8]) -> usize {
        let mut written = 0;
        for &byte in data {
            if self.write_pos == CDC_BUFFER_SIZE {
                self.compact();
            }
            if self.write_pos == CDC_BUFFER_SIZE {
                if self.has_line() {
                    break;
                }
                self.clear();
                self.overflows = self.overflows.wrapping_add(1);
            }
            self.buffer[self.write_pos] = byte;
            self.write_pos += 1;
            written += 1;
        }
        written
    }

    /// Read a line (up to newline or CR)
    ///
    /// Lines longer than a command line are truncated.
    pub fn read_line(&mut self) -> Option<LineBytes> {
        // Find newline
        let newline_pos = self.buffer[self.read_pos..self.write_pos]
            .iter()
            .position(|&b| b == b'\n' || b == b'\r');

        let pos = newline_pos?;
        let end = self.read_pos + pos;
        let mut line = Vec::new();
        for &byte in &self.buffer[self.read_pos..end] {
            if line.push(byte).is_err() {
                break;
            }
        }

        // Skip the newline character(s)
        self.read_pos = end + 1;
        while self.read_pos < self.write_pos
            && (self.buffer[self.read_pos] == b'\n' || self.buffer[self.read_pos] == b'\r')
        {
            self.read_pos += 1;
        }

        // Compact buffer if needed
        if self.read_pos >= CDC_BUFFER_SIZE / 2 {
            self.compact();
        }

        Some(line)
    }

    /// Check whether a complete line is waiting
    #[must_use]
    pub fn has_line(&self) -> bool {
        self.buffer[self.read_pos..self.write_pos]
            .iter()
            .any(|&b| b == b'\n' || b == b'\r')
    }

    /// Compact the buffer
    fn compact(&mut self) {
        if self.read_pos > 0 {
            let remaining = self.write_pos - self.read_pos;
            self.buffer.copy_within(self.read_pos..self.write_pos, 0);
            self.read_pos = 0;
            self.write_pos = remaining;
        }
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
    }

    /// Get available bytes
    #[must_use]
    pub const fn available(&self) -> usize {
        self.write_pos - self.read_pos
    }

    /// Number of overlong partial lines dropped so far
    #[must_use]
    pub const fn overflows(&self) -> u32 {
        self.overflows
    }
}

impl Default for CdcReadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// CDC write buffer
pub struct CdcWriteBuffer {
    buffer: [u8; CDC_BUFFER_SIZE],
    len: usize,
}

impl CdcWriteBuffer {
    /// Create a new write buffer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [0; CDC_BUFFER_SIZE],
            len: 0,
        }
    }

    /// Write data to buffer
    pub fn write(&mut self, data: &[u8]) -> usize {
        let space = CDC_BUFFER_SIZE - self.len;
        let to_write = data.len().min(space);
        self.buffer[self.len..self.len + to_write].copy_from_slice(&data[..to_write]);
        self.len += to_write;
        to_write
    }

    /// Write a line followed by `\n`
    pub fn write_line(&mut self, line: &str) -> usize {
        let written = self.write(line.as_bytes());
        written + self.write(b"\n")
    }

    /// Get buffer contents
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Get used length
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check if empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for CdcWriteBuffer {
    fn default() -> Self {
        Self::new()
    }
}
