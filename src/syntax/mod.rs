//! Lexing and parsing of Lua source and of the annotation language inside
//! comments.

mod kind;
pub mod lexer;
mod literal;
pub mod parser;
mod text_range;
mod tree;

pub use kind::{BinaryOperator, LuaSyntaxKind, LuaTokenKind, UnaryOperator, UNARY_PRIORITY};
pub use literal::{integer_value, string_value};
pub use parser::parse;
pub use text_range::TextRange;
pub use tree::{
    LuaElementId, LuaElementKind, LuaSyntaxElement, LuaSyntaxNode, LuaSyntaxToken, LuaSyntaxTree,
    ParseError,
};
