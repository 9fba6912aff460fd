mod doc_lexer;
mod lua_lexer;
mod reader;

pub use doc_lexer::{DocLexer, DocLexerCheckpoint, DocLexerState};
pub use lua_lexer::LuaLexer;
pub use reader::{Reader, ReaderCheckpoint};

use super::{LuaTokenKind, TextRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LuaTokenData {
    pub kind: LuaTokenKind,
    pub range: TextRange,
}

impl LuaTokenData {
    pub fn new(kind: LuaTokenKind, range: TextRange) -> Self {
        Self { kind, range }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub range: TextRange,
}
