//! Response assembly for the fixed-header wire protocol
//!
//! Every reply starts with a 128-byte space-padded header whose first field
//! is a decimal size (`-1` for a miss), optionally followed by that many raw
//! payload bytes. Refused commands get a literal `ERROR,` header.

use crate::protocol::command::HEADER_SIZE;
use bytes::BytesMut;
use itoa::Buffer;

/// Response writer assembling padded headers and payloads
pub struct ResponseWriter {
    buf: BytesMut,
}

impl ResponseWriter {
    /// Create a new response writer with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Get the internal buffer
    pub fn buffer(&self) -> &[u8] {
        &self.buf
    }

    /// Take the buffer, leaving an empty buffer in its place
    pub fn take(&mut self) -> BytesMut {
        std::mem::take(&mut self.buf)
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Returns true if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Write a `<size>,` header padded to 128 bytes.
    ///
    /// `-1` encodes a miss; any non-negative value announces that many raw
    /// payload bytes follow.
    pub fn size_header(&mut self, size: i64) {
        let mut itoa_buf = Buffer::new();
        let start = self.buf.len();
        self.buf.extend_from_slice(itoa_buf.format(size).as_bytes());
        self.buf.extend_from_slice(b",");
        self.pad_header(start);
    }

    /// Write the `ERROR,` refusal header
    pub fn error_header(&mut self) {
        let start = self.buf.len();
        self.buf.extend_from_slice(b"ERROR,");
        self.pad_header(start);
    }

    /// Append raw payload bytes after a header
    pub fn payload(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    fn pad_header(&mut self, start: usize) {
        let written = self.buf.len() - start;
        debug_assert!(written <= HEADER_SIZE);
        self.buf.resize(start + HEADER_SIZE, b' ');
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new(4096)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected_header(text: &str) -> Vec<u8> {
        let mut buf = text.as_bytes().to_vec();
        buf.resize(HEADER_SIZE, b' ');
        buf
    }

    #[test]
    fn test_size_header() {
        let mut writer = ResponseWriter::new(256);
        writer.size_header(4096);
        assert_eq!(writer.buffer(), &expected_header("4096,")[..]);
        assert_eq!(writer.buffer().len(), HEADER_SIZE);
    }

    #[test]
    fn test_miss_header() {
        let mut writer = ResponseWriter::new(256);
        writer.size_header(-1);
        assert_eq!(writer.buffer(), &expected_header("-1,")[..]);
    }

    #[test]
    fn test_error_header() {
        let mut writer = ResponseWriter::new(256);
        writer.error_header();
        assert_eq!(writer.buffer(), &expected_header("ERROR,")[..]);
    }

    #[test]
    fn test_header_with_payload() {
        let mut writer = ResponseWriter::new(256);
        writer.size_header(5);
        writer.payload(b"hello");

        let mut expected = expected_header("5,");
        expected.extend_from_slice(b"hello");
        assert_eq!(writer.buffer(), &expected[..]);
    }

    #[test]
    fn test_take_and_clear() {
        let mut writer = ResponseWriter::new(256);
        writer.size_header(0);
        assert!(!writer.is_empty());

        let buf = writer.take();
        assert_eq!(buf.len(), HEADER_SIZE);
        assert!(writer.is_empty());

        // clear discards a partially assembled response in place
        writer.size_header(-1);
        writer.clear();
        assert!(writer.is_empty());
    }
}
