use crate::syntax::TextRange;

pub const EOF: char = '\0';

/// Character cursor over a slice of the document text.
///
/// Offsets are absolute byte offsets into the full document even when the
/// reader only covers a sub-range (the doc lexer reads single comments).
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    text: &'a str,
    start: usize,
    pos: usize,
    end: usize,
}

/// Plain copy of the cursor, restored in O(1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderCheckpoint {
    start: usize,
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            start: 0,
            pos: 0,
            end: text.len(),
        }
    }

    pub fn new_with_range(text: &'a str, range: TextRange) -> Self {
        Self {
            text,
            start: range.start as usize,
            pos: range.start as usize,
            end: range.end as usize,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.end
    }

    pub fn current_char(&self) -> char {
        self.char_at(self.pos)
    }

    pub fn next_char(&self) -> char {
        if self.is_eof() {
            return EOF;
        }
        let len = self.current_char().len_utf8();
        self.char_at(self.pos + len)
    }

    /// Looks `n` bytes ahead. Only meaningful for ASCII lookahead.
    pub fn byte_at(&self, n: usize) -> u8 {
        let index = self.pos + n;
        if index >= self.end {
            return 0;
        }
        self.text.as_bytes()[index]
    }

    fn char_at(&self, index: usize) -> char {
        if index >= self.end {
            return EOF;
        }
        self.text[index..self.end].chars().next().unwrap_or(EOF)
    }

    pub fn bump(&mut self) {
        if !self.is_eof() {
            self.pos += self.current_char().len_utf8();
        }
    }

    pub fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    pub fn eat_when(&mut self, predicate: impl Fn(char) -> bool) -> usize {
        let mut count = 0;
        while !self.is_eof() && predicate(self.current_char()) {
            self.bump();
            count += 1;
        }
        count
    }

    pub fn eat_to_line_end(&mut self) {
        self.eat_when(|c| c != '\n' && c != '\r');
    }

    pub fn reset_buff(&mut self) {
        self.start = self.pos;
    }

    pub fn saved_range(&self) -> TextRange {
        TextRange::from_usize(self.start, self.pos)
    }

    pub fn current_saved_text(&self) -> &'a str {
        &self.text[self.start..self.pos]
    }

    pub fn remaining(&self) -> &'a str {
        &self.text[self.pos..self.end]
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn reset_to(&mut self, pos: usize) {
        self.pos = pos.min(self.end);
        self.start = self.pos;
    }

    pub fn checkpoint(&self) -> ReaderCheckpoint {
        ReaderCheckpoint {
            start: self.start,
            pos: self.pos,
        }
    }

    pub fn restore(&mut self, checkpoint: ReaderCheckpoint) {
        self.start = checkpoint.start;
        self.pos = checkpoint.pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_sub_range_offsets() {
        let text = "abc--xyz";
        let mut reader = Reader::new_with_range(text, TextRange::new(3, 8));
        assert_eq!(reader.current_char(), '-');
        reader.bump_n(2);
        reader.reset_buff();
        reader.eat_when(|c| c.is_ascii_alphabetic());
        assert_eq!(reader.saved_range(), TextRange::new(5, 8));
        assert_eq!(reader.current_saved_text(), "xyz");
        assert!(reader.is_eof());
        assert_eq!(reader.current_char(), EOF);
    }

    #[test]
    fn test_reader_checkpoint_restore() {
        let mut reader = Reader::new("hello");
        let cp = reader.checkpoint();
        reader.bump_n(3);
        assert_eq!(reader.current_char(), 'l');
        reader.restore(cp);
        assert_eq!(reader.current_char(), 'h');
    }
}
