//! Pattern buffer with efficient tail-search optimization.
//!
//! Only the last N bytes of the buffer are searched for prompt patterns,
//! rather than the entire output. For large outputs (e.g., full BGP tables)
//! this is critical for performance.

use regex::bytes::{Match, Regex};
use vte::{Parser, Perform};

/// Buffer for accumulating output and efficiently searching for patterns.
///
/// Incoming bytes go through a `vte` parser that keeps only printable text,
/// newlines, carriage returns and tabs. The parser lives as long as the
/// buffer, so an escape sequence split across two chunks is still removed.
pub struct PatternBuffer {
    /// The accumulated output buffer.
    buffer: Vec<u8>,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,

    /// Terminal escape parser, stateful across chunks.
    parser: Parser,
}

/// Collects the text a terminal would display.
struct TextSink<'a>(&'a mut Vec<u8>);

impl Perform for TextSink<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.0.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.0.push(byte);
        }
    }
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    ///
    /// # Arguments
    ///
    /// * `search_depth` - Number of bytes from the end to search for patterns.
    ///   Default recommendation is 1000 bytes.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
            parser: Parser::new(),
        }
    }

    /// Extend the buffer with new data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        self.parser.advance(&mut TextSink(&mut self.buffer), data);
    }

    /// Search only the tail of the buffer for the pattern.
    ///
    /// Returns the match if found, with byte offsets relative to the
    /// start of the search region (not the full buffer).
    pub fn search_tail(&self, pattern: &Regex) -> Option<Match<'_>> {
        pattern.find(self.tail())
    }

    /// Search the entire buffer for a pattern.
    ///
    /// Use sparingly - prefer `search_tail` for prompt detection.
    pub fn search_full(&self, pattern: &Regex) -> Option<Match<'_>> {
        pattern.find(&self.buffer)
    }

    /// The region `search_tail` looks at.
    pub fn tail(&self) -> &[u8] {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        &self.buffer[start..]
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Get the buffer contents as a string (lossy UTF-8 conversion).
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl std::fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("len", &self.buffer.len())
            .field("search_depth", &self.search_depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_extend() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"Hello, world!");
        assert_eq!(buffer.as_str_lossy(), "Hello, world!");
    }

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = PatternBuffer::new(100);
        // Typical ANSI color code: \x1b[32m (green)
        buffer.extend(b"\x1b[32mGreen text\x1b[0m");
        assert_eq!(buffer.as_str_lossy(), "Green text");
    }

    #[test]
    fn test_keeps_line_endings() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"show version\r\nCisco IOS\r\n\tRouter#");
        assert_eq!(buffer.as_str_lossy(), "show version\r\nCisco IOS\r\n\tRouter#");
    }

    #[test]
    fn test_drops_other_control_bytes() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"abc\x07\x08def");
        assert_eq!(buffer.as_str_lossy(), "abcdef");
    }

    #[test]
    fn test_sequence_split_across_chunks() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"Router\x1b[");
        buffer.extend(b"?25h#");
        assert_eq!(buffer.as_str_lossy(), "Router#");
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let mut buffer = PatternBuffer::new(100);
        let text = "caf\u{e9}>".as_bytes();
        buffer.extend(&text[..4]);
        buffer.extend(&text[4..]);
        assert_eq!(buffer.as_str_lossy(), "caf\u{e9}>");
    }

    #[test]
    fn test_tail_search() {
        let mut buffer = PatternBuffer::new(20);

        buffer.extend(&[b'x'; 100]);
        buffer.extend(b"\nrouter#");

        let pattern = Regex::new(r"router#").unwrap();
        assert!(buffer.search_tail(&pattern).is_some());
    }

    #[test]
    fn test_tail_search_not_in_tail() {
        let mut buffer = PatternBuffer::new(10);

        buffer.extend(b"router#");
        buffer.extend(&[b'x'; 100]);

        // Prompt should NOT be found (outside search depth)
        let pattern = Regex::new(r"router#").unwrap();
        assert!(buffer.search_tail(&pattern).is_none());

        // But full search should find it
        assert!(buffer.search_full(&pattern).is_some());
    }

    #[test]
    fn test_take_clears_buffer() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"test data");
        assert_eq!(buffer.take(), b"test data");
        assert!(buffer.is_empty());
    }
}
