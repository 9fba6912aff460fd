use std::fmt;

/// Every token the code lexer and the doc lexer can produce.
///
/// Code and doc tokens share one enum so a single syntax tree can hold both
/// layers of the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LuaTokenKind {
    None,
    // keywords
    And,
    Break,
    Do,
    Else,
    ElseIf,
    End,
    False,
    For,
    Function,
    Goto,
    If,
    In,
    Local,
    Nil,
    Not,
    Or,
    Repeat,
    Return,
    Then,
    True,
    Until,
    While,

    // operators and punctuation
    Plus,
    Minus,
    Mul,
    Div,
    IDiv,
    Mod,
    Pow,
    Len,
    BitAnd,
    BitXor,
    BitOr,
    Shl,
    Shr,
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    Assign,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    DbColon,
    Semicolon,
    Colon,
    Comma,
    Dot,
    Concat,
    Dots,

    // literals
    Name,
    Int,
    Float,
    String,
    LongString,
    /// A `[=*` opener that is not followed by a matching `[`.
    IncompleteLongBracket,

    // trivia
    Whitespace,
    EndOfLine,
    ShortComment,
    LongComment,
    Shebang,

    Unknown,
    Eof,

    // doc comment layer
    /// `---`
    DocStart,
    /// `--[[@`
    DocLongStart,
    /// `--` without a doc marker
    NormalStart,
    /// `---|` continuation line of an `@alias`
    DocContinueOr,
    TagClass,
    TagEnum,
    TagInterface,
    TagAlias,
    TagField,
    TagParam,
    TagReturn,
    TagType,
    TagGeneric,
    TagOverload,
    TagDeprecated,
    TagAsync,
    TagNodiscard,
    TagDiagnostic,
    TagSource,
    TagMapping,
    TagVersion,
    TagVisibility,
    TagMeta,
    TagOperator,
    TagOther,
    /// `?`
    DocQuestion,
    /// `|`
    DocOr,
    /// `#` introducing a trailing description
    DocHash,
    /// Free text until the end of the comment line.
    DocDescription,
    /// End of one comment line inside a multi-line comment block.
    DocLineEnd,
    DocTrivia,
}

impl LuaTokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            LuaTokenKind::Whitespace
                | LuaTokenKind::EndOfLine
                | LuaTokenKind::ShortComment
                | LuaTokenKind::LongComment
                | LuaTokenKind::Shebang
        )
    }

    pub fn is_comment(self) -> bool {
        matches!(self, LuaTokenKind::ShortComment | LuaTokenKind::LongComment)
    }

    pub fn is_doc_tag(self) -> bool {
        matches!(
            self,
            LuaTokenKind::TagClass
                | LuaTokenKind::TagEnum
                | LuaTokenKind::TagInterface
                | LuaTokenKind::TagAlias
                | LuaTokenKind::TagField
                | LuaTokenKind::TagParam
                | LuaTokenKind::TagReturn
                | LuaTokenKind::TagType
                | LuaTokenKind::TagGeneric
                | LuaTokenKind::TagOverload
                | LuaTokenKind::TagDeprecated
                | LuaTokenKind::TagAsync
                | LuaTokenKind::TagNodiscard
                | LuaTokenKind::TagDiagnostic
                | LuaTokenKind::TagSource
                | LuaTokenKind::TagMapping
                | LuaTokenKind::TagVersion
                | LuaTokenKind::TagVisibility
                | LuaTokenKind::TagMeta
                | LuaTokenKind::TagOperator
                | LuaTokenKind::TagOther
        )
    }
}

impl fmt::Display for LuaTokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LuaTokenKind::And => "and",
            LuaTokenKind::Break => "break",
            LuaTokenKind::Do => "do",
            LuaTokenKind::Else => "else",
            LuaTokenKind::ElseIf => "elseif",
            LuaTokenKind::End => "end",
            LuaTokenKind::False => "false",
            LuaTokenKind::For => "for",
            LuaTokenKind::Function => "function",
            LuaTokenKind::Goto => "goto",
            LuaTokenKind::If => "if",
            LuaTokenKind::In => "in",
            LuaTokenKind::Local => "local",
            LuaTokenKind::Nil => "nil",
            LuaTokenKind::Not => "not",
            LuaTokenKind::Or => "or",
            LuaTokenKind::Repeat => "repeat",
            LuaTokenKind::Return => "return",
            LuaTokenKind::Then => "then",
            LuaTokenKind::True => "true",
            LuaTokenKind::Until => "until",
            LuaTokenKind::While => "while",
            LuaTokenKind::Plus => "+",
            LuaTokenKind::Minus => "-",
            LuaTokenKind::Mul => "*",
            LuaTokenKind::Div => "/",
            LuaTokenKind::IDiv => "//",
            LuaTokenKind::Mod => "%",
            LuaTokenKind::Pow => "^",
            LuaTokenKind::Len => "#",
            LuaTokenKind::BitAnd => "&",
            LuaTokenKind::BitXor => "~",
            LuaTokenKind::BitOr => "|",
            LuaTokenKind::Shl => "<<",
            LuaTokenKind::Shr => ">>",
            LuaTokenKind::Eq => "==",
            LuaTokenKind::Ne => "~=",
            LuaTokenKind::Le => "<=",
            LuaTokenKind::Ge => ">=",
            LuaTokenKind::Lt => "<",
            LuaTokenKind::Gt => ">",
            LuaTokenKind::Assign => "=",
            LuaTokenKind::LeftParen => "(",
            LuaTokenKind::RightParen => ")",
            LuaTokenKind::LeftBrace => "{",
            LuaTokenKind::RightBrace => "}",
            LuaTokenKind::LeftBracket => "[",
            LuaTokenKind::RightBracket => "]",
            LuaTokenKind::DbColon => "::",
            LuaTokenKind::Semicolon => ";",
            LuaTokenKind::Colon => ":",
            LuaTokenKind::Comma => ",",
            LuaTokenKind::Dot => ".",
            LuaTokenKind::Concat => "..",
            LuaTokenKind::Dots => "...",
            LuaTokenKind::Name => "name",
            LuaTokenKind::Int | LuaTokenKind::Float => "number",
            LuaTokenKind::String | LuaTokenKind::LongString => "string",
            LuaTokenKind::Eof => "end of file",
            LuaTokenKind::DocQuestion => "?",
            LuaTokenKind::DocOr => "|",
            other => return write!(f, "{other:?}"),
        };
        f.write_str(text)
    }
}

/// Node kinds of the syntax tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LuaSyntaxKind {
    None,
    Chunk,
    Block,

    // statements
    EmptyStat,
    LocalStat,
    AssignStat,
    CallExprStat,
    FuncStat,
    LocalFuncStat,
    IfStat,
    ElseIfClause,
    ElseClause,
    WhileStat,
    DoStat,
    ForStat,
    ForRangeStat,
    RepeatStat,
    ReturnStat,
    BreakStat,
    GotoStat,
    LabelStat,

    // expressions
    NameExpr,
    IndexExpr,
    CallExpr,
    ParenExpr,
    LiteralExpr,
    TableExpr,
    ClosureExpr,
    UnaryExpr,
    BinaryExpr,

    // other code nodes
    LocalName,
    Attribute,
    ParamList,
    ParamName,
    CallArgList,
    TableField,

    // doc comments
    Comment,
    DocDescription,
    DocTagClass,
    DocTagEnum,
    DocTagInterface,
    DocTagAlias,
    DocTagField,
    DocTagParam,
    DocTagReturn,
    DocTagType,
    DocTagGeneric,
    DocTagOverload,
    DocTagDeprecated,
    DocTagAsync,
    DocTagNodiscard,
    DocTagDiagnostic,
    DocTagSource,
    DocTagMapping,
    DocTagVersion,
    DocTagVisibility,
    DocTagMeta,
    DocTagOperator,
    DocTagOther,
    DocGenericDeclList,
    DocGenericParam,
    DocSuperList,
    DocAttribute,
    /// `public`/`private`/... word inside `@field`.
    DocVisibility,
    DocTypeList,
    DocNamedReturn,
    DocAliasMember,
    DocDiagnosticCodeList,
    DocVersion,
    DocObjectField,
    DocFuncParam,

    // doc types
    TypeName,
    TypeArray,
    TypeUnion,
    TypeNullable,
    TypeTuple,
    TypeGeneric,
    TypeFun,
    TypeObject,
    TypeLiteral,
    TypeVariadic,
    TypeParen,
}

impl LuaSyntaxKind {
    pub fn is_stat(self) -> bool {
        matches!(
            self,
            LuaSyntaxKind::EmptyStat
                | LuaSyntaxKind::LocalStat
                | LuaSyntaxKind::AssignStat
                | LuaSyntaxKind::CallExprStat
                | LuaSyntaxKind::FuncStat
                | LuaSyntaxKind::LocalFuncStat
                | LuaSyntaxKind::IfStat
                | LuaSyntaxKind::WhileStat
                | LuaSyntaxKind::DoStat
                | LuaSyntaxKind::ForStat
                | LuaSyntaxKind::ForRangeStat
                | LuaSyntaxKind::RepeatStat
                | LuaSyntaxKind::ReturnStat
                | LuaSyntaxKind::BreakStat
                | LuaSyntaxKind::GotoStat
                | LuaSyntaxKind::LabelStat
        )
    }

    pub fn is_expr(self) -> bool {
        matches!(
            self,
            LuaSyntaxKind::NameExpr
                | LuaSyntaxKind::IndexExpr
                | LuaSyntaxKind::CallExpr
                | LuaSyntaxKind::ParenExpr
                | LuaSyntaxKind::LiteralExpr
                | LuaSyntaxKind::TableExpr
                | LuaSyntaxKind::ClosureExpr
                | LuaSyntaxKind::UnaryExpr
                | LuaSyntaxKind::BinaryExpr
        )
    }

    pub fn is_doc_tag(self) -> bool {
        matches!(
            self,
            LuaSyntaxKind::DocTagClass
                | LuaSyntaxKind::DocTagEnum
                | LuaSyntaxKind::DocTagInterface
                | LuaSyntaxKind::DocTagAlias
                | LuaSyntaxKind::DocTagField
                | LuaSyntaxKind::DocTagParam
                | LuaSyntaxKind::DocTagReturn
                | LuaSyntaxKind::DocTagType
                | LuaSyntaxKind::DocTagGeneric
                | LuaSyntaxKind::DocTagOverload
                | LuaSyntaxKind::DocTagDeprecated
                | LuaSyntaxKind::DocTagAsync
                | LuaSyntaxKind::DocTagNodiscard
                | LuaSyntaxKind::DocTagDiagnostic
                | LuaSyntaxKind::DocTagSource
                | LuaSyntaxKind::DocTagMapping
                | LuaSyntaxKind::DocTagVersion
                | LuaSyntaxKind::DocTagVisibility
                | LuaSyntaxKind::DocTagMeta
                | LuaSyntaxKind::DocTagOperator
                | LuaSyntaxKind::DocTagOther
        )
    }

    pub fn is_doc_type(self) -> bool {
        matches!(
            self,
            LuaSyntaxKind::TypeName
                | LuaSyntaxKind::TypeArray
                | LuaSyntaxKind::TypeUnion
                | LuaSyntaxKind::TypeNullable
                | LuaSyntaxKind::TypeTuple
                | LuaSyntaxKind::TypeGeneric
                | LuaSyntaxKind::TypeFun
                | LuaSyntaxKind::TypeObject
                | LuaSyntaxKind::TypeLiteral
                | LuaSyntaxKind::TypeVariadic
                | LuaSyntaxKind::TypeParen
        )
    }
}

/// Binary operators in precedence order, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Or,
    And,
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
    Eq,
    BitOr,
    BitXor,
    BitAnd,
    Shl,
    Shr,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    IDiv,
    Mod,
    Pow,
}

impl BinaryOperator {
    pub fn from_token(kind: LuaTokenKind) -> Option<Self> {
        Some(match kind {
            LuaTokenKind::Or => BinaryOperator::Or,
            LuaTokenKind::And => BinaryOperator::And,
            LuaTokenKind::Lt => BinaryOperator::Lt,
            LuaTokenKind::Gt => BinaryOperator::Gt,
            LuaTokenKind::Le => BinaryOperator::Le,
            LuaTokenKind::Ge => BinaryOperator::Ge,
            LuaTokenKind::Ne => BinaryOperator::Ne,
            LuaTokenKind::Eq => BinaryOperator::Eq,
            LuaTokenKind::BitOr => BinaryOperator::BitOr,
            LuaTokenKind::BitXor => BinaryOperator::BitXor,
            LuaTokenKind::BitAnd => BinaryOperator::BitAnd,
            LuaTokenKind::Shl => BinaryOperator::Shl,
            LuaTokenKind::Shr => BinaryOperator::Shr,
            LuaTokenKind::Concat => BinaryOperator::Concat,
            LuaTokenKind::Plus => BinaryOperator::Add,
            LuaTokenKind::Minus => BinaryOperator::Sub,
            LuaTokenKind::Mul => BinaryOperator::Mul,
            LuaTokenKind::Div => BinaryOperator::Div,
            LuaTokenKind::IDiv => BinaryOperator::IDiv,
            LuaTokenKind::Mod => BinaryOperator::Mod,
            LuaTokenKind::Pow => BinaryOperator::Pow,
            _ => return None,
        })
    }

    /// Left and right binding power. `..` and `^` are right associative.
    pub fn priority(self) -> (u8, u8) {
        match self {
            BinaryOperator::Or => (1, 1),
            BinaryOperator::And => (2, 2),
            BinaryOperator::Lt
            | BinaryOperator::Gt
            | BinaryOperator::Le
            | BinaryOperator::Ge
            | BinaryOperator::Ne
            | BinaryOperator::Eq => (3, 3),
            BinaryOperator::BitOr => (4, 4),
            BinaryOperator::BitXor => (5, 5),
            BinaryOperator::BitAnd => (6, 6),
            BinaryOperator::Shl | BinaryOperator::Shr => (7, 7),
            BinaryOperator::Concat => (9, 8),
            BinaryOperator::Add | BinaryOperator::Sub => (10, 10),
            BinaryOperator::Mul
            | BinaryOperator::Div
            | BinaryOperator::IDiv
            | BinaryOperator::Mod => (11, 11),
            BinaryOperator::Pow => (14, 13),
        }
    }

    /// Metamethod-style name used by `---@operator`.
    pub fn operator_name(self) -> Option<&'static str> {
        Some(match self {
            BinaryOperator::Add => "add",
            BinaryOperator::Sub => "sub",
            BinaryOperator::Mul => "mul",
            BinaryOperator::Div => "div",
            BinaryOperator::IDiv => "idiv",
            BinaryOperator::Mod => "mod",
            BinaryOperator::Pow => "pow",
            BinaryOperator::Concat => "concat",
            BinaryOperator::BitAnd => "band",
            BinaryOperator::BitOr => "bor",
            BinaryOperator::BitXor => "bxor",
            BinaryOperator::Shl => "shl",
            BinaryOperator::Shr => "shr",
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Neg,
    Len,
    BitNot,
}

/// Unary operators bind tighter than everything except `^`.
pub const UNARY_PRIORITY: u8 = 12;

impl UnaryOperator {
    pub fn from_token(kind: LuaTokenKind) -> Option<Self> {
        Some(match kind {
            LuaTokenKind::Not => UnaryOperator::Not,
            LuaTokenKind::Minus => UnaryOperator::Neg,
            LuaTokenKind::Len => UnaryOperator::Len,
            LuaTokenKind::BitXor => UnaryOperator::BitNot,
            _ => return None,
        })
    }

    pub fn operator_name(self) -> Option<&'static str> {
        match self {
            UnaryOperator::Neg => Some("unm"),
            UnaryOperator::Len => Some("len"),
            UnaryOperator::BitNot => Some("bnot"),
            UnaryOperator::Not => None,
        }
    }
}
