//! Line framing over arbitrarily split byte chunks

/// Accumulates raw bytes and yields complete lines.
///
/// Chunk boundaries may fall anywhere, including inside a multi-byte UTF-8
/// sequence or between `\r` and `\n`. Bytes are only decoded once a full line
/// is available.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
    eof: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes read from the source
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Mark the end of input; a trailing unterminated line becomes available
    pub fn finish(&mut self) {
        self.eof = true;
    }

    /// True once input ended and every line was handed out
    pub fn is_exhausted(&self) -> bool {
        self.eof && self.buffer.is_empty()
    }

    /// Next complete line without its terminator
    pub fn next_line(&mut self) -> Option<String> {
        if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            return Some(String::from_utf8_lossy(&line).into_owned());
        }

        if self.eof && !self.buffer.is_empty() {
            let mut line = std::mem::take(&mut self.buffer);
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            return Some(String::from_utf8_lossy(&line).into_owned());
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_split_across_chunks() {
        let mut lines = LineBuffer::new();
        lines.push(b"data: {\"a\"");
        assert_eq!(lines.next_line(), None);
        lines.push(b":1}\r");
        assert_eq!(lines.next_line(), None);
        lines.push(b"\nnext\n");
        assert_eq!(lines.next_line().as_deref(), Some("data: {\"a\":1}"));
        assert_eq!(lines.next_line().as_deref(), Some("next"));
        assert_eq!(lines.next_line(), None);
    }

    #[test]
    fn test_multibyte_character_split() {
        let text = "héllo\n".as_bytes();
        let mut lines = LineBuffer::new();
        lines.push(&text[..2]);
        lines.push(&text[2..]);
        assert_eq!(lines.next_line().as_deref(), Some("héllo"));
    }

    #[test]
    fn test_trailing_line_at_eof() {
        let mut lines = LineBuffer::new();
        lines.push(b"first\nlast");
        assert_eq!(lines.next_line().as_deref(), Some("first"));
        assert_eq!(lines.next_line(), None);
        assert!(!lines.is_exhausted());

        lines.finish();
        assert_eq!(lines.next_line().as_deref(), Some("last"));
        assert!(lines.is_exhausted());
    }

    #[test]
    fn test_blank_lines_are_preserved() {
        let mut lines = LineBuffer::new();
        lines.push(b"\n\nx\n");
        assert_eq!(lines.next_line().as_deref(), Some(""));
        assert_eq!(lines.next_line().as_deref(), Some(""));
        assert_eq!(lines.next_line().as_deref(), Some("x"));
    }
}
