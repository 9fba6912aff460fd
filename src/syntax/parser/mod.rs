mod doc_parser;
mod lua_grammar;
mod marker;

pub use marker::{CompleteMarker, MarkEvent, Marker, MarkerEventContainer};

use crate::syntax::lexer::{LexError, LuaLexer, LuaTokenData};
use crate::syntax::{LuaSyntaxKind, LuaSyntaxTree, LuaTokenKind, TextRange};

use doc_parser::DocParser;

/// A comment block separated from the following statement by more blank
/// lines than this is standalone, otherwise it documents the statement.
pub const MAX_ATTACHED_BLANK_LINES: usize = 1;

/// Parses a whole document into a syntax tree. Never fails: syntax errors are
/// recorded in the tree and parsing continues.
#[tracing::instrument(skip_all, fields(len = text.len()))]
pub fn parse(text: &str) -> LuaSyntaxTree {
    let (tokens, lex_errors) = LuaLexer::new(text).tokenize();
    let mut parser = LuaParser::new(text, tokens);
    lua_grammar::parse_chunk(&mut parser);
    let LuaParser { events, .. } = parser;
    LuaSyntaxTree::build(text, events, lex_errors)
}

/// Code-level parser state over the pre-lexed token stream.
///
/// Whitespace never reaches the event log. Comments are turned into
/// `Comment` nodes containing the parsed doc layer, either attached to the
/// statement they document or standalone inside the enclosing block.
pub(crate) struct LuaParser<'a> {
    text: &'a str,
    tokens: Vec<LuaTokenData>,
    /// Index of the current significant token.
    index: usize,
    /// First trivia token not yet turned into events.
    trivia_start: usize,
    events: Vec<MarkEvent>,
}

impl MarkerEventContainer for LuaParser<'_> {
    fn events(&mut self) -> &mut Vec<MarkEvent> {
        &mut self.events
    }

    fn current_range(&self) -> TextRange {
        self.tokens[self.index].range
    }
}

/// A run of adjacent comment tokens, by token index.
#[derive(Debug)]
struct CommentGroup {
    tokens: Vec<usize>,
    /// Blank lines between the group's last comment and what follows.
    blank_lines_after: usize,
}

impl<'a> LuaParser<'a> {
    fn new(text: &'a str, tokens: Vec<LuaTokenData>) -> Self {
        let mut parser = Self {
            text,
            tokens,
            index: 0,
            trivia_start: 0,
            events: Vec::new(),
        };
        parser.skip_trivia();
        parser
    }

    pub fn current(&self) -> LuaTokenKind {
        self.tokens[self.index].kind
    }

    /// Kind of the significant token after the current one.
    pub fn peek_next(&self) -> LuaTokenKind {
        self.tokens[self.index + 1..]
            .iter()
            .find(|token| !token.kind.is_trivia())
            .map(|token| token.kind)
            .unwrap_or(LuaTokenKind::Eof)
    }

    pub fn at(&self, kind: LuaTokenKind) -> bool {
        self.current() == kind
    }

    /// Consumes the current token. Comments that sit before it and were not
    /// claimed as documentation become standalone comment nodes here.
    pub fn bump(&mut self) {
        if self.at(LuaTokenKind::Eof) {
            return;
        }
        self.flush_comments();
        let token = self.tokens[self.index];
        self.events.push(MarkEvent::EatToken {
            kind: token.kind,
            range: token.range,
        });
        self.index += 1;
        self.trivia_start = self.index;
        self.skip_trivia();
    }

    pub fn eat(&mut self, kind: LuaTokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, kind: LuaTokenKind) -> bool {
        if self.eat(kind) {
            return true;
        }
        let message = format!("expected '{}', found '{}'", kind, self.current());
        self.push_error(message);
        false
    }

    fn skip_trivia(&mut self) {
        while self.index < self.tokens.len() - 1 && self.tokens[self.index].kind.is_trivia() {
            self.index += 1;
        }
    }

    fn pending_trivia(&self) -> &[LuaTokenData] {
        &self.tokens[self.trivia_start..self.index]
    }

    /// Splits the comments before the current token into groups.
    fn comment_groups(&self) -> Vec<CommentGroup> {
        let mut groups: Vec<CommentGroup> = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        let mut line_breaks: usize = 0;
        for (offset, token) in self.pending_trivia().iter().enumerate() {
            match token.kind {
                LuaTokenKind::EndOfLine => line_breaks += 1,
                kind if kind.is_comment() => {
                    let blank_lines = line_breaks.saturating_sub(1);
                    if !current.is_empty() && blank_lines > MAX_ATTACHED_BLANK_LINES {
                        groups.push(CommentGroup {
                            tokens: std::mem::take(&mut current),
                            blank_lines_after: blank_lines,
                        });
                    }
                    current.push(self.trivia_start + offset);
                    line_breaks = 0;
                }
                _ => {}
            }
        }
        if !current.is_empty() {
            groups.push(CommentGroup {
                tokens: current,
                blank_lines_after: line_breaks.saturating_sub(1),
            });
        }
        groups
    }

    /// Emits standalone comment groups before a statement or table field and
    /// returns the group that documents it, if any.
    fn leading_comments(&mut self) -> Option<Vec<usize>> {
        let mut groups = self.comment_groups();
        self.trivia_start = self.index;
        let attached = match groups.last() {
            Some(last)
                if last.blank_lines_after <= MAX_ATTACHED_BLANK_LINES
                    && !self.at(LuaTokenKind::Eof) =>
            {
                groups.pop().map(|group| group.tokens)
            }
            _ => None,
        };
        for group in groups {
            self.emit_comment(&group.tokens);
        }
        attached
    }

    /// Emits every pending comment as a standalone node.
    fn flush_comments(&mut self) {
        let groups = self.comment_groups();
        self.trivia_start = self.index;
        for group in groups {
            self.emit_comment(&group.tokens);
        }
    }

    /// A comment starting on the same line as the end of the node being
    /// parsed belongs to that node.
    fn trailing_comment(&mut self) {
        let mut found = None;
        for (offset, token) in self.pending_trivia().iter().enumerate() {
            match token.kind {
                LuaTokenKind::Whitespace => continue,
                kind if kind.is_comment() => found = Some(self.trivia_start + offset),
                _ => {}
            }
            break;
        }
        if let Some(index) = found {
            self.emit_comment(&[index]);
            self.trivia_start = index + 1;
        }
    }

    fn emit_comment(&mut self, token_indices: &[usize]) {
        let ranges: Vec<TextRange> = token_indices
            .iter()
            .map(|&index| self.tokens[index].range)
            .collect();
        let m = self.mark();
        DocParser::new(self.text, &mut self.events, &ranges).parse();
        m.complete(self, LuaSyntaxKind::Comment);
    }
}

/// Errors produced while lexing are reported with parse errors.
impl From<LexError> for crate::syntax::ParseError {
    fn from(value: LexError) -> Self {
        crate::syntax::ParseError {
            message: value.message,
            range: value.range,
        }
    }
}
