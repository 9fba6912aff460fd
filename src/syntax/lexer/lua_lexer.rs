use phf::phf_map;

use super::reader::{Reader, EOF};
use super::{LexError, LuaTokenData};
use crate::syntax::{LuaTokenKind, TextRange};

static KEYWORDS: phf::Map<&'static str, LuaTokenKind> = phf_map! {
    "and" => LuaTokenKind::And,
    "break" => LuaTokenKind::Break,
    "do" => LuaTokenKind::Do,
    "else" => LuaTokenKind::Else,
    "elseif" => LuaTokenKind::ElseIf,
    "end" => LuaTokenKind::End,
    "false" => LuaTokenKind::False,
    "for" => LuaTokenKind::For,
    "function" => LuaTokenKind::Function,
    "goto" => LuaTokenKind::Goto,
    "if" => LuaTokenKind::If,
    "in" => LuaTokenKind::In,
    "local" => LuaTokenKind::Local,
    "nil" => LuaTokenKind::Nil,
    "not" => LuaTokenKind::Not,
    "or" => LuaTokenKind::Or,
    "repeat" => LuaTokenKind::Repeat,
    "return" => LuaTokenKind::Return,
    "then" => LuaTokenKind::Then,
    "true" => LuaTokenKind::True,
    "until" => LuaTokenKind::Until,
    "while" => LuaTokenKind::While,
};

/// Tokenizer for Lua source code.
///
/// Trivia (whitespace, line ends, comments) is kept in the output so the
/// parser can decide which statement a doc comment belongs to. Malformed
/// input never stops the lexer: it records a [`LexError`] and keeps going.
pub struct LuaLexer<'a> {
    reader: Reader<'a>,
    errors: Vec<LexError>,
}

impl<'a> LuaLexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            reader: Reader::new(text),
            errors: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> (Vec<LuaTokenData>, Vec<LexError>) {
        let mut tokens = Vec::new();

        if self.reader.current_char() == '#' && self.reader.next_char() == '!' {
            self.reader.reset_buff();
            self.reader.eat_to_line_end();
            tokens.push(LuaTokenData::new(
                LuaTokenKind::Shebang,
                self.reader.saved_range(),
            ));
        }

        while !self.reader.is_eof() {
            self.reader.reset_buff();
            let kind = self.lex();
            tokens.push(LuaTokenData::new(kind, self.reader.saved_range()));
        }

        let end = self.reader.end() as u32;
        tokens.push(LuaTokenData::new(LuaTokenKind::Eof, TextRange::empty(end)));
        (tokens, self.errors)
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(LexError {
            message: message.into(),
            range: self.reader.saved_range(),
        });
    }

    fn lex(&mut self) -> LuaTokenKind {
        let reader = &mut self.reader;
        match reader.current_char() {
            '\n' | '\r' => self.lex_new_line(),
            ' ' | '\t' | '\x0b' | '\x0c' => {
                reader.eat_when(|c| matches!(c, ' ' | '\t' | '\x0b' | '\x0c'));
                LuaTokenKind::Whitespace
            }
            '-' => {
                reader.bump();
                if reader.current_char() != '-' {
                    return LuaTokenKind::Minus;
                }
                reader.bump();
                self.lex_comment()
            }
            '[' => {
                reader.bump();
                if reader.current_char() != '=' && reader.current_char() != '[' {
                    return LuaTokenKind::LeftBracket;
                }
                let level = reader.eat_when(|c| c == '=');
                if reader.current_char() != '[' {
                    self.error("invalid long string delimiter");
                    return LuaTokenKind::IncompleteLongBracket;
                }
                reader.bump();
                self.lex_long_string_body(level, false)
            }
            '=' => {
                reader.bump();
                if reader.current_char() == '=' {
                    reader.bump();
                    return LuaTokenKind::Eq;
                }
                LuaTokenKind::Assign
            }
            '<' => {
                reader.bump();
                match reader.current_char() {
                    '=' => {
                        reader.bump();
                        LuaTokenKind::Le
                    }
                    '<' => {
                        reader.bump();
                        LuaTokenKind::Shl
                    }
                    _ => LuaTokenKind::Lt,
                }
            }
            '>' => {
                reader.bump();
                match reader.current_char() {
                    '=' => {
                        reader.bump();
                        LuaTokenKind::Ge
                    }
                    '>' => {
                        reader.bump();
                        LuaTokenKind::Shr
                    }
                    _ => LuaTokenKind::Gt,
                }
            }
            '~' => {
                reader.bump();
                if reader.current_char() == '=' {
                    reader.bump();
                    return LuaTokenKind::Ne;
                }
                LuaTokenKind::BitXor
            }
            ':' => {
                reader.bump();
                if reader.current_char() == ':' {
                    reader.bump();
                    return LuaTokenKind::DbColon;
                }
                LuaTokenKind::Colon
            }
            '"' | '\'' => self.lex_string(),
            '.' => {
                if reader.next_char().is_ascii_digit() {
                    return self.lex_number();
                }
                reader.bump();
                if reader.current_char() != '.' {
                    return LuaTokenKind::Dot;
                }
                reader.bump();
                if reader.current_char() != '.' {
                    return LuaTokenKind::Concat;
                }
                reader.bump();
                LuaTokenKind::Dots
            }
            '/' => {
                reader.bump();
                if reader.current_char() == '/' {
                    reader.bump();
                    return LuaTokenKind::IDiv;
                }
                LuaTokenKind::Div
            }
            '0'..='9' => self.lex_number(),
            c if c == '_' || c.is_ascii_alphabetic() => {
                reader.eat_when(|c| c == '_' || c.is_ascii_alphanumeric());
                let name = reader.current_saved_text();
                KEYWORDS.get(name).copied().unwrap_or(LuaTokenKind::Name)
            }
            c => {
                reader.bump();
                match c {
                    '+' => LuaTokenKind::Plus,
                    '*' => LuaTokenKind::Mul,
                    '%' => LuaTokenKind::Mod,
                    '^' => LuaTokenKind::Pow,
                    '#' => LuaTokenKind::Len,
                    '&' => LuaTokenKind::BitAnd,
                    '|' => LuaTokenKind::BitOr,
                    '(' => LuaTokenKind::LeftParen,
                    ')' => LuaTokenKind::RightParen,
                    '{' => LuaTokenKind::LeftBrace,
                    '}' => LuaTokenKind::RightBrace,
                    ']' => LuaTokenKind::RightBracket,
                    ';' => LuaTokenKind::Semicolon,
                    ',' => LuaTokenKind::Comma,
                    _ => {
                        self.error(format!("unexpected character '{c}'"));
                        LuaTokenKind::Unknown
                    }
                }
            }
        }
    }

    fn lex_new_line(&mut self) -> LuaTokenKind {
        let reader = &mut self.reader;
        let first = reader.current_char();
        reader.bump();
        let second = reader.current_char();
        if (first == '\r' && second == '\n') || (first == '\n' && second == '\r') {
            reader.bump();
        }
        LuaTokenKind::EndOfLine
    }

    /// Called after `--`.
    fn lex_comment(&mut self) -> LuaTokenKind {
        let reader = &mut self.reader;
        if reader.current_char() == '[' {
            let checkpoint = reader.checkpoint();
            reader.bump();
            let level = reader.eat_when(|c| c == '=');
            if reader.current_char() == '[' {
                reader.bump();
                return self.lex_long_string_body(level, true);
            }
            reader.restore(checkpoint);
        }
        reader.eat_to_line_end();
        LuaTokenKind::ShortComment
    }

    /// Called after the opening `[=*[`; scans to the `]=*]` with the same
    /// number of equals signs.
    fn lex_long_string_body(&mut self, level: usize, is_comment: bool) -> LuaTokenKind {
        let kind = if is_comment {
            LuaTokenKind::LongComment
        } else {
            LuaTokenKind::LongString
        };
        let reader = &mut self.reader;
        while !reader.is_eof() {
            if reader.current_char() != ']' {
                reader.bump();
                continue;
            }
            reader.bump();
            let checkpoint = reader.checkpoint();
            let count = reader.eat_when(|c| c == '=');
            if count == level && reader.current_char() == ']' {
                reader.bump();
                return kind;
            }
            // `]=]` with the wrong level is content; rescan from just after the `]`
            reader.restore(checkpoint);
        }

        if is_comment {
            self.error("unfinished long comment");
        } else {
            self.error("unfinished long string");
        }
        kind
    }

    fn lex_string(&mut self) -> LuaTokenKind {
        let reader = &mut self.reader;
        let quote = reader.current_char();
        reader.bump();
        loop {
            match reader.current_char() {
                EOF if reader.is_eof() => {
                    self.error("unfinished string");
                    return LuaTokenKind::String;
                }
                '\n' | '\r' => {
                    self.error("unfinished string");
                    return LuaTokenKind::String;
                }
                '\\' => {
                    reader.bump();
                    match reader.current_char() {
                        // `\z` skips the following run of whitespace, line breaks included
                        'z' => {
                            reader.bump();
                            reader.eat_when(|c| c.is_ascii_whitespace());
                        }
                        // line continuation
                        '\r' => {
                            reader.bump();
                            if reader.current_char() == '\n' {
                                reader.bump();
                            }
                        }
                        '\n' => {
                            reader.bump();
                            if reader.current_char() == '\r' {
                                reader.bump();
                            }
                        }
                        EOF if reader.is_eof() => {}
                        _ => reader.bump(),
                    }
                }
                c if c == quote => {
                    reader.bump();
                    return LuaTokenKind::String;
                }
                _ => reader.bump(),
            }
        }
    }

    fn lex_number(&mut self) -> LuaTokenKind {
        let reader = &mut self.reader;
        let mut is_float = false;
        if reader.current_char() == '0' && matches!(reader.next_char(), 'x' | 'X') {
            reader.bump_n(2);
            reader.eat_when(|c| c.is_ascii_hexdigit());
            if reader.current_char() == '.' {
                is_float = true;
                reader.bump();
                reader.eat_when(|c| c.is_ascii_hexdigit());
            }
            if matches!(reader.current_char(), 'p' | 'P') {
                is_float = true;
                reader.bump();
                if matches!(reader.current_char(), '+' | '-') {
                    reader.bump();
                }
                reader.eat_when(|c| c.is_ascii_digit());
            }
        } else {
            reader.eat_when(|c| c.is_ascii_digit());
            if reader.current_char() == '.' && reader.next_char() != '.' {
                is_float = true;
                reader.bump();
                reader.eat_when(|c| c.is_ascii_digit());
            }
            if matches!(reader.current_char(), 'e' | 'E') {
                is_float = true;
                reader.bump();
                if matches!(reader.current_char(), '+' | '-') {
                    reader.bump();
                }
                reader.eat_when(|c| c.is_ascii_digit());
            }
        }

        // LuaJIT suffixes: 1LL, 1ULL, 1i
        let suffix = reader.eat_when(|c| matches!(c, 'u' | 'U' | 'l' | 'L' | 'i' | 'I'));
        if reader.current_char().is_ascii_alphanumeric() || reader.current_char() == '_' {
            reader.eat_when(|c| c == '_' || c.is_ascii_alphanumeric());
            self.error("malformed number");
        } else if suffix > 0 && !is_float {
            let text = reader.current_saved_text();
            let lowered = text.to_ascii_lowercase();
            if !(lowered.ends_with("ll") || lowered.ends_with('i')) {
                self.error("malformed number");
            }
        }

        if is_float {
            LuaTokenKind::Float
        } else {
            LuaTokenKind::Int
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<LuaTokenKind> {
        let (tokens, _) = LuaLexer::new(text).tokenize();
        tokens
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| !matches!(k, LuaTokenKind::Whitespace | LuaTokenKind::Eof))
            .collect()
    }

    #[test]
    fn test_keywords_and_operators() {
        assert_eq!(
            kinds("local x = a // b ~= c .. d ..."),
            vec![
                LuaTokenKind::Local,
                LuaTokenKind::Name,
                LuaTokenKind::Assign,
                LuaTokenKind::Name,
                LuaTokenKind::IDiv,
                LuaTokenKind::Name,
                LuaTokenKind::Ne,
                LuaTokenKind::Name,
                LuaTokenKind::Concat,
                LuaTokenKind::Name,
                LuaTokenKind::Dots,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 0xFF 1.5 .5 1e10 0x1p4 3"),
            vec![
                LuaTokenKind::Int,
                LuaTokenKind::Int,
                LuaTokenKind::Float,
                LuaTokenKind::Float,
                LuaTokenKind::Float,
                LuaTokenKind::Float,
                LuaTokenKind::Int,
            ]
        );
    }

    #[test]
    fn test_long_bracket_levels() {
        let text = "[==[ a ]] ]=] b ]==] x";
        let (tokens, errors) = LuaLexer::new(text).tokenize();
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, LuaTokenKind::LongString);
        assert_eq!(tokens[0].range, TextRange::new(0, 20));
    }

    #[test]
    fn test_incomplete_long_bracket() {
        let (tokens, errors) = LuaLexer::new("[== x").tokenize();
        assert_eq!(tokens[0].kind, LuaTokenKind::IncompleteLongBracket);
        assert_eq!(tokens[0].range, TextRange::new(0, 3));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_string_escapes() {
        let text = "\"a\\z   \n  b\" 'c\\\nd'";
        let (tokens, errors) = LuaLexer::new(text).tokenize();
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(tokens[0].kind, LuaTokenKind::String);
        assert_eq!(tokens[0].range, TextRange::new(0, 12));
        assert_eq!(tokens[2].kind, LuaTokenKind::String);
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("-- short\n--[[ long\n]] x --[==[ ]==]"),
            vec![
                LuaTokenKind::ShortComment,
                LuaTokenKind::EndOfLine,
                LuaTokenKind::LongComment,
                LuaTokenKind::Name,
                LuaTokenKind::LongComment,
            ]
        );
    }

    #[test]
    fn test_unfinished_string_reports_error() {
        let (tokens, errors) = LuaLexer::new("x = 'abc\ny").tokenize();
        assert_eq!(errors.len(), 1);
        assert!(tokens.iter().any(|t| t.kind == LuaTokenKind::String));
    }
}
