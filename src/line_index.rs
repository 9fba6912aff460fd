use ropey::Rope;
use tower_lsp_server::lsp_types::{Position, Range};

use crate::syntax::TextRange;

/// Translates byte offsets to editor positions.
///
/// Columns are counted in UTF-16 code units, so characters outside the
/// basic plane count twice.
#[derive(Debug, Clone)]
pub struct LineIndex {
    rope: Rope,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Zero-based line of a byte offset.
    pub fn line(&self, offset: u32) -> usize {
        let offset = (offset as usize).min(self.rope.len_bytes());
        self.rope.byte_to_line(offset)
    }

    /// Zero-based `(line, utf16 column)` of a byte offset.
    pub fn line_col(&self, offset: u32) -> (usize, usize) {
        let offset = (offset as usize).min(self.rope.len_bytes());
        let char_index = self.rope.byte_to_char(offset);
        let line = self.rope.char_to_line(char_index);
        let line_start = self.rope.line_to_char(line);
        let column = self.rope.char_to_utf16_cu(char_index) - self.rope.char_to_utf16_cu(line_start);
        (line, column)
    }

    pub fn position(&self, offset: u32) -> Position {
        let (line, column) = self.line_col(offset);
        Position::new(line as u32, column as u32)
    }

    pub fn range(&self, range: TextRange) -> Range {
        Range::new(self.position(range.start), self.position(range.end))
    }

    /// Byte offset of an editor position. The line is clamped to the
    /// document and the column to the end of that line.
    pub fn offset(&self, position: Position) -> u32 {
        let line = (position.line as usize).min(self.rope.len_lines().saturating_sub(1));
        let line_start = self.rope.line_to_char(line);
        let line_end = self.line_end_char(line);
        let line_start_utf16 = self.rope.char_to_utf16_cu(line_start);
        let line_end_utf16 = self.rope.char_to_utf16_cu(line_end);
        let target = (line_start_utf16 + position.character as usize).min(line_end_utf16);
        let char_index = self.rope.utf16_cu_to_char(target);
        self.rope.char_to_byte(char_index) as u32
    }

    /// Char index just before the line break ending `line`.
    fn line_end_char(&self, line: usize) -> usize {
        let next_start = match line + 1 < self.rope.len_lines() {
            true => self.rope.line_to_char(line + 1),
            false => self.rope.len_chars(),
        };
        let line_start = self.rope.line_to_char(line);
        let mut end = next_start;
        while end > line_start && matches!(self.rope.char(end - 1), '\n' | '\r') {
            end -= 1;
        }
        end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_positions() {
        let index = LineIndex::new("local a\nlocal b\n");
        assert_eq!(index.line_col(0), (0, 0));
        assert_eq!(index.line_col(8), (1, 0));
        assert_eq!(index.line_col(14), (1, 6));
        assert_eq!(index.line(14), 1);
    }

    #[test]
    fn test_surrogate_pairs_count_twice() {
        let text = "s = '😀' .. x";
        let index = LineIndex::new(text);
        let x = text.find('x').unwrap() as u32;
        // the emoji is 4 bytes but 2 utf-16 code units
        assert_eq!(index.line_col(x), (0, 12));
        assert_eq!(index.offset(Position::new(0, 12)), x);
    }

    #[test]
    fn test_column_past_line_end_stays_on_line() {
        let index = LineIndex::new("local a\r\nlocal bb\nx");
        assert_eq!(index.offset(Position::new(0, 40)), 7);
        assert_eq!(index.offset(Position::new(1, 40)), 17);
        assert_eq!(index.offset(Position::new(2, 40)), 19);
        assert_eq!(index.offset(Position::new(9, 0)), 18);
    }
}
