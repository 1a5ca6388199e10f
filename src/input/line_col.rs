//! Line and column position utilities
//!
//! Converts byte offsets into 1-based line/column positions for failure
//! reports. Line starts are indexed once so repeated conversions are a
//! binary search.

/// A 1-based line and column position in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineCol {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in UTF-8 bytes).
    pub column: u32,
}

impl LineCol {
    /// Create a new line/column position.
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Index of line start offsets for a source text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offsets of line starts, the first line starting at 0.
    line_starts: Vec<u32>,
    text_len: u32,
}

impl LineIndex {
    /// Build the index by scanning the text once.
    ///
    /// `\n`, `\r\n`, and bare `\r` all count as line separators.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    line_starts.push(offset_u32(i + 1));
                    i += 1;
                }
                b'\r' => {
                    if bytes.get(i + 1) == Some(&b'\n') {
                        line_starts.push(offset_u32(i + 2));
                        i += 2;
                    } else {
                        line_starts.push(offset_u32(i + 1));
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        }
        Self {
            line_starts,
            text_len: offset_u32(text.len()),
        }
    }

    /// Convert a byte offset to a 1-based line/column position.
    ///
    /// Offsets past the end of the text are clamped to the end.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> LineCol {
        let offset = offset_u32(offset).min(self.text_len);
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let column = offset - self.line_starts[line];
        LineCol::new(offset_u32(line) + 1, column + 1)
    }
}

fn offset_u32(offset: usize) -> u32 {
    u32::try_from(offset).unwrap_or(u32::MAX)
}
