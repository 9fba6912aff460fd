use phf::phf_map;

use super::reader::{Reader, ReaderCheckpoint};
use super::LuaTokenData;
use crate::syntax::{LuaTokenKind, TextRange};

static DOC_TAGS: phf::Map<&'static str, LuaTokenKind> = phf_map! {
    "class" => LuaTokenKind::TagClass,
    "enum" => LuaTokenKind::TagEnum,
    "interface" => LuaTokenKind::TagInterface,
    "alias" => LuaTokenKind::TagAlias,
    "field" => LuaTokenKind::TagField,
    "param" => LuaTokenKind::TagParam,
    "return" => LuaTokenKind::TagReturn,
    "type" => LuaTokenKind::TagType,
    "generic" => LuaTokenKind::TagGeneric,
    "overload" => LuaTokenKind::TagOverload,
    "deprecated" => LuaTokenKind::TagDeprecated,
    "async" => LuaTokenKind::TagAsync,
    "nodiscard" => LuaTokenKind::TagNodiscard,
    "diagnostic" => LuaTokenKind::TagDiagnostic,
    "source" => LuaTokenKind::TagSource,
    "mapping" => LuaTokenKind::TagMapping,
    "version" => LuaTokenKind::TagVersion,
    "public" => LuaTokenKind::TagVisibility,
    "protected" => LuaTokenKind::TagVisibility,
    "private" => LuaTokenKind::TagVisibility,
    "package" => LuaTokenKind::TagVisibility,
    "meta" => LuaTokenKind::TagMeta,
    "operator" => LuaTokenKind::TagOperator,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocLexerState {
    /// At the comment opener (`--`, `---`, `---|`, `--[[@`).
    Init,
    /// Expecting `@tag`.
    Tag,
    /// Inside the type grammar of a tag.
    Normal,
    /// The rest of the line is free text.
    Description,
    /// The rest of a plain comment, not doc syntax at all.
    Trivia,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocLexerCheckpoint {
    reader: ReaderCheckpoint,
    state: DocLexerState,
}

/// Tokenizer for the annotation language inside one comment token.
pub struct DocLexer<'a> {
    reader: Reader<'a>,
    state: DocLexerState,
}

impl<'a> DocLexer<'a> {
    /// `range` is the range of a `ShortComment` or `LongComment` token.
    pub fn new(text: &'a str, range: TextRange) -> Self {
        let content = &text[range.as_range()];
        let mut end = range.end;
        if let Some(level) = long_comment_level(content) {
            let closing = format!("]{}]", "=".repeat(level));
            if content.len() > closing.len() + 4 && content.ends_with(&closing) {
                end -= closing.len() as u32;
            }
        }

        Self {
            reader: Reader::new_with_range(text, TextRange::new(range.start, end)),
            state: DocLexerState::Init,
        }
    }

    pub fn state(&self) -> DocLexerState {
        self.state
    }

    pub fn set_state(&mut self, state: DocLexerState) {
        self.state = state;
    }

    /// Moves the cursor back to `offset` and continues lexing in `state`.
    pub fn reset_to(&mut self, offset: u32, state: DocLexerState) {
        self.reader.reset_to(offset as usize);
        self.state = state;
    }

    pub fn checkpoint(&self) -> DocLexerCheckpoint {
        DocLexerCheckpoint {
            reader: self.reader.checkpoint(),
            state: self.state,
        }
    }

    pub fn restore(&mut self, checkpoint: DocLexerCheckpoint) {
        self.reader.restore(checkpoint.reader);
        self.state = checkpoint.state;
    }

    /// Produces the next token; `DocLineEnd` once the comment is exhausted.
    pub fn lex(&mut self) -> LuaTokenData {
        let kind = match self.state {
            DocLexerState::Init => self.lex_init(),
            DocLexerState::Tag => self.lex_tag(),
            DocLexerState::Normal => self.lex_normal(),
            DocLexerState::Description => self.lex_rest(LuaTokenKind::DocDescription),
            DocLexerState::Trivia => self.lex_rest(LuaTokenKind::DocTrivia),
        };
        LuaTokenData::new(kind, self.reader.saved_range())
    }

    fn line_end(&mut self) -> LuaTokenKind {
        self.reader.reset_buff();
        LuaTokenKind::DocLineEnd
    }

    fn skip_whitespace(&mut self) {
        self.reader.eat_when(|c| c.is_whitespace());
    }

    fn lex_init(&mut self) -> LuaTokenKind {
        let reader = &mut self.reader;
        reader.reset_buff();
        let remaining = reader.remaining();

        if remaining.starts_with("---|") {
            reader.bump_n(4);
            self.state = DocLexerState::Normal;
            return LuaTokenKind::DocContinueOr;
        }

        if long_comment_level(remaining).is_some() {
            reader.bump_n(3);
            reader.eat_when(|c| c == '=');
            reader.bump();
            if reader.current_char() == '@' {
                self.state = DocLexerState::Tag;
                return LuaTokenKind::DocLongStart;
            }
            self.state = DocLexerState::Trivia;
            return LuaTokenKind::NormalStart;
        }

        if remaining.starts_with("---") && !remaining.starts_with("----") {
            reader.bump_n(3);
            let after = reader.remaining().trim_start_matches([' ', '\t']);
            self.state = if after.starts_with('@') {
                DocLexerState::Tag
            } else {
                DocLexerState::Description
            };
            return LuaTokenKind::DocStart;
        }

        reader.eat_when(|c| c == '-');
        let after = reader.remaining().trim_start_matches([' ', '\t']);
        self.state = if after.starts_with('@') {
            DocLexerState::Tag
        } else {
            DocLexerState::Trivia
        };
        LuaTokenKind::NormalStart
    }

    fn lex_tag(&mut self) -> LuaTokenKind {
        self.skip_whitespace();
        let reader = &mut self.reader;
        reader.reset_buff();
        if reader.current_char() != '@' {
            self.state = DocLexerState::Description;
            return self.lex_rest(LuaTokenKind::DocDescription);
        }
        reader.bump();
        reader.eat_when(|c| c == '_' || c == '-' || c.is_ascii_alphanumeric());
        let name = &reader.current_saved_text()[1..];
        self.state = DocLexerState::Normal;
        DOC_TAGS.get(name).copied().unwrap_or(LuaTokenKind::TagOther)
    }

    fn lex_normal(&mut self) -> LuaTokenKind {
        self.skip_whitespace();
        if self.reader.is_eof() {
            return self.line_end();
        }

        let reader = &mut self.reader;
        reader.reset_buff();
        match reader.current_char() {
            c if c == '_' || c.is_ascii_alphabetic() => {
                eat_name(reader);
                loop {
                    let next = reader.next_char();
                    match reader.current_char() {
                        // dotted paths such as `std.io.File`
                        '.' if next == '_' || next.is_ascii_alphabetic() => {
                            reader.bump();
                            eat_name(reader);
                        }
                        // diagnostic codes such as `type-not-match`
                        '-' if next.is_ascii_alphabetic() => {
                            reader.bump();
                            eat_name(reader);
                        }
                        _ => break,
                    }
                }
                LuaTokenKind::Name
            }
            c if c.is_ascii_digit() => lex_number(reader),
            '-' if reader.next_char().is_ascii_digit() => {
                reader.bump();
                lex_number(reader)
            }
            quote @ ('"' | '\'') => {
                reader.bump();
                while !reader.is_eof() && reader.current_char() != quote {
                    if reader.current_char() == '\\' {
                        reader.bump();
                    }
                    reader.bump();
                }
                reader.bump();
                LuaTokenKind::String
            }
            '.' => {
                if reader.remaining().starts_with("...") {
                    reader.bump_n(3);
                    LuaTokenKind::Dots
                } else {
                    reader.bump();
                    LuaTokenKind::Dot
                }
            }
            c => {
                reader.bump();
                match c {
                    '?' => LuaTokenKind::DocQuestion,
                    '|' => LuaTokenKind::DocOr,
                    '#' => LuaTokenKind::DocHash,
                    ',' => LuaTokenKind::Comma,
                    ':' => LuaTokenKind::Colon,
                    ';' => LuaTokenKind::Semicolon,
                    '<' => LuaTokenKind::Lt,
                    '>' => LuaTokenKind::Gt,
                    '(' => LuaTokenKind::LeftParen,
                    ')' => LuaTokenKind::RightParen,
                    '[' => LuaTokenKind::LeftBracket,
                    ']' => LuaTokenKind::RightBracket,
                    '{' => LuaTokenKind::LeftBrace,
                    '}' => LuaTokenKind::RightBrace,
                    '=' => LuaTokenKind::Assign,
                    _ => LuaTokenKind::Unknown,
                }
            }
        }
    }

    fn lex_rest(&mut self, kind: LuaTokenKind) -> LuaTokenKind {
        self.skip_whitespace();
        if self.reader.is_eof() {
            return self.line_end();
        }
        self.reader.reset_buff();
        self.reader.eat_when(|_| true);
        kind
    }
}

fn lex_number(reader: &mut Reader<'_>) -> LuaTokenKind {
    reader.eat_when(|c| c.is_ascii_digit());
    if reader.current_char() == '.' && reader.next_char().is_ascii_digit() {
        reader.bump();
        reader.eat_when(|c| c.is_ascii_digit());
        return LuaTokenKind::Float;
    }
    LuaTokenKind::Int
}

fn eat_name(reader: &mut Reader<'_>) {
    reader.eat_when(|c| c == '_' || c.is_ascii_alphanumeric());
}

/// Level of a `--[=*[` opener, if `text` starts with one.
fn long_comment_level(text: &str) -> Option<usize> {
    let rest = text.strip_prefix("--[")?;
    let level = rest.bytes().take_while(|&b| b == b'=').count();
    (rest.as_bytes().get(level) == Some(&b'[')).then_some(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(text: &str) -> Vec<(LuaTokenKind, &str)> {
        let mut lexer = DocLexer::new(text, TextRange::from_usize(0, text.len()));
        let mut out = Vec::new();
        loop {
            let token = lexer.lex();
            if token.kind == LuaTokenKind::DocLineEnd {
                break;
            }
            out.push((token.kind, &text[token.range.as_range()]));
        }
        out
    }

    #[test]
    fn test_param_tag() {
        assert_eq!(
            lex_all("---@param a? integer|nil description"),
            vec![
                (LuaTokenKind::DocStart, "---"),
                (LuaTokenKind::TagParam, "@param"),
                (LuaTokenKind::Name, "a"),
                (LuaTokenKind::DocQuestion, "?"),
                (LuaTokenKind::Name, "integer"),
                (LuaTokenKind::DocOr, "|"),
                (LuaTokenKind::Name, "nil"),
                (LuaTokenKind::Name, "description"),
            ]
        );
    }

    #[test]
    fn test_plain_doc_line_is_description() {
        assert_eq!(
            lex_all("--- some text here"),
            vec![
                (LuaTokenKind::DocStart, "---"),
                (LuaTokenKind::DocDescription, "some text here"),
            ]
        );
    }

    #[test]
    fn test_normal_comment_is_trivia() {
        assert_eq!(
            lex_all("-- just a note"),
            vec![
                (LuaTokenKind::NormalStart, "--"),
                (LuaTokenKind::DocTrivia, "just a note"),
            ]
        );
    }

    #[test]
    fn test_dotted_and_dashed_names_and_varargs() {
        assert_eq!(
            lex_all("---@diagnostic disable-next-line: type-not-match"),
            vec![
                (LuaTokenKind::DocStart, "---"),
                (LuaTokenKind::TagDiagnostic, "@diagnostic"),
                (LuaTokenKind::Name, "disable-next-line"),
                (LuaTokenKind::Colon, ":"),
                (LuaTokenKind::Name, "type-not-match"),
            ]
        );
        assert_eq!(
            lex_all("---@param ... std.io.File"),
            vec![
                (LuaTokenKind::DocStart, "---"),
                (LuaTokenKind::TagParam, "@param"),
                (LuaTokenKind::Dots, "..."),
                (LuaTokenKind::Name, "std.io.File"),
            ]
        );
    }

    #[test]
    fn test_long_doc_comment() {
        assert_eq!(
            lex_all("--[[@type string]]"),
            vec![
                (LuaTokenKind::DocLongStart, "--[["),
                (LuaTokenKind::TagType, "@type"),
                (LuaTokenKind::Name, "string"),
            ]
        );
    }

    #[test]
    fn test_checkpoint_restore() {
        let text = "---@type a|b";
        let mut lexer = DocLexer::new(text, TextRange::from_usize(0, text.len()));
        lexer.lex();
        lexer.lex();
        let cp = lexer.checkpoint();
        assert_eq!(lexer.lex().kind, LuaTokenKind::Name);
        assert_eq!(lexer.lex().kind, LuaTokenKind::DocOr);
        lexer.restore(cp);
        let token = lexer.lex();
        assert_eq!(&text[token.range.as_range()], "a");
    }
}
