use std::fmt;
use std::sync::Arc;

use crate::decl::{DeclFeatures, LuaDeclId, Visibility};
use crate::syntax::{integer_value, string_value, LuaSyntaxKind, LuaSyntaxNode, LuaTokenKind, TextRange};
use crate::types::{ArcStr, LuaType};
use crate::vfs::{DocumentId, LuaSyntaxId};

/// Whatever a member hangs off.
///
/// Owners are paths rather than resolved values so a document can register
/// members on `M.sub` without looking at the document that defined `M`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemberOwner {
    /// A class, interface or enum.
    Type(ArcStr),
    /// A global table, as a dotted path (`M`, `M.sub`).
    Global(ArcStr),
    /// A table held by a local, plus a dotted path below it (empty for the
    /// local itself).
    Local(LuaDeclId, ArcStr),
    /// Any other table constructor.
    Element(LuaSyntaxId),
}

impl MemberOwner {
    /// The owner of a table stored under `key` of this owner.
    pub fn child(&self, key: &LuaMemberKey) -> Option<MemberOwner> {
        let LuaMemberKey::Name(name) = key else {
            return None;
        };
        Some(match self {
            MemberOwner::Global(path) => MemberOwner::Global(Arc::from(format!("{path}.{name}"))),
            MemberOwner::Local(decl, path) if path.is_empty() => {
                MemberOwner::Local(*decl, name.clone())
            }
            MemberOwner::Local(decl, path) => {
                MemberOwner::Local(*decl, Arc::from(format!("{path}.{name}")))
            }
            MemberOwner::Type(_) | MemberOwner::Element(_) => return None,
        })
    }

    pub fn doc_id(&self) -> Option<DocumentId> {
        match self {
            MemberOwner::Local(decl, _) => Some(decl.doc_id),
            MemberOwner::Element(syntax_id) => Some(syntax_id.doc_id),
            MemberOwner::Type(_) | MemberOwner::Global(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LuaMemberKey {
    Name(ArcStr),
    Integer(i64),
}

impl LuaMemberKey {
    pub fn name(name: &str) -> Self {
        LuaMemberKey::Name(Arc::from(name))
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            LuaMemberKey::Name(name) => Some(name),
            LuaMemberKey::Integer(_) => None,
        }
    }

    /// Key of `a.b`, `a:b` or `a["b"]` with the range of the key itself.
    pub fn from_index_expr(expr: &LuaSyntaxNode) -> Option<(LuaMemberKey, TextRange)> {
        if let Some(name) = expr.token(LuaTokenKind::Name) {
            return Some((LuaMemberKey::name(name.text()), name.range()));
        }
        let key = expr.exprs().nth(1)?;
        Some((LuaMemberKey::from_literal(&key)?, key.range()))
    }

    /// Key of `name = v` or `[literal] = v`; positional fields have none.
    pub fn from_table_field(field: &LuaSyntaxNode) -> Option<(LuaMemberKey, TextRange)> {
        if field.has_token(LuaTokenKind::Assign) {
            if let Some(name) = field.token(LuaTokenKind::Name) {
                return Some((LuaMemberKey::name(name.text()), name.range()));
            }
        }
        if field.has_token(LuaTokenKind::LeftBracket) {
            let key = field.exprs().next()?;
            return Some((LuaMemberKey::from_literal(&key)?, key.range()));
        }
        None
    }

    pub fn from_literal(expr: &LuaSyntaxNode) -> Option<LuaMemberKey> {
        if expr.kind() != LuaSyntaxKind::LiteralExpr {
            return None;
        }
        let token = expr.child_tokens().next()?;
        match token.kind() {
            LuaTokenKind::String | LuaTokenKind::LongString => {
                Some(LuaMemberKey::Name(Arc::from(string_value(token.text()))))
            }
            LuaTokenKind::Int => integer_value(token.text()).map(LuaMemberKey::Integer),
            _ => None,
        }
    }
}

impl fmt::Display for LuaMemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaMemberKey::Name(name) => f.write_str(name),
            LuaMemberKey::Integer(index) => write!(f, "[{index}]"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LuaMemberSource {
    /// `---@field`
    DocField,
    /// A field of a table constructor.
    TableField,
    /// `a.b = value` or `function a.b()`.
    Assign,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LuaMember {
    pub owner: MemberOwner,
    pub key: LuaMemberKey,
    pub doc_id: DocumentId,
    /// Range of the key, for navigation and diagnostics.
    pub range: TextRange,
    pub syntax_id: LuaSyntaxId,
    pub source: LuaMemberSource,
    pub declared_type: Option<LuaType>,
    /// Expression the member is assigned from, inferred on demand.
    pub value: Option<LuaSyntaxId>,
    pub features: DeclFeatures,
    pub visibility: Visibility,
    pub description: Option<String>,
    /// Location named by `@source`, for members generated from other code.
    pub source_link: Option<String>,
}

/// Names that are type syntax rather than members anyone could define.
pub fn is_reserved_name(name: &str) -> bool {
    RESERVED_NAMES.contains(name)
}

static RESERVED_NAMES: phf::Set<&'static str> = phf::phf_set! {
    "nil", "any", "unknown", "never", "void", "self", "T",
    "boolean", "integer", "number", "string", "table", "function",
    "thread", "userdata", "lightuserdata",
};

/// `---@operator name(Operand): Result` on a class.
#[derive(Debug, Clone, PartialEq)]
pub struct LuaOperator {
    pub owner: ArcStr,
    pub kind: LuaOperatorKind,
    pub operands: Vec<LuaType>,
    pub result: LuaType,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LuaOperatorKind {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Unm,
    IDiv,
    BAnd,
    BOr,
    BXor,
    Shl,
    Shr,
    BNot,
    Concat,
    Len,
    Eq,
    Lt,
    Le,
    Call,
    Index,
}

impl LuaOperatorKind {
    pub fn from_name(name: &str) -> Option<Self> {
        OPERATOR_NAMES.get(name).copied()
    }
}

static OPERATOR_NAMES: phf::Map<&'static str, LuaOperatorKind> = phf::phf_map! {
    "add" => LuaOperatorKind::Add,
    "sub" => LuaOperatorKind::Sub,
    "mul" => LuaOperatorKind::Mul,
    "div" => LuaOperatorKind::Div,
    "mod" => LuaOperatorKind::Mod,
    "pow" => LuaOperatorKind::Pow,
    "unm" => LuaOperatorKind::Unm,
    "idiv" => LuaOperatorKind::IDiv,
    "band" => LuaOperatorKind::BAnd,
    "bor" => LuaOperatorKind::BOr,
    "bxor" => LuaOperatorKind::BXor,
    "shl" => LuaOperatorKind::Shl,
    "shr" => LuaOperatorKind::Shr,
    "bnot" => LuaOperatorKind::BNot,
    "concat" => LuaOperatorKind::Concat,
    "len" => LuaOperatorKind::Len,
    "eq" => LuaOperatorKind::Eq,
    "lt" => LuaOperatorKind::Lt,
    "le" => LuaOperatorKind::Le,
    "call" => LuaOperatorKind::Call,
    "index" => LuaOperatorKind::Index,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_paths_extend() {
        let owner = MemberOwner::Global(Arc::from("M"));
        assert_eq!(
            owner.child(&LuaMemberKey::name("sub")),
            Some(MemberOwner::Global(Arc::from("M.sub")))
        );
        assert_eq!(owner.child(&LuaMemberKey::Integer(1)), None);
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved_name("self"));
        assert!(is_reserved_name("integer"));
        assert!(!is_reserved_name("Point"));
    }
}
