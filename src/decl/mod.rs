//! Per-document declarations and the scope tree used to resolve names.

mod binder;

use indexmap::IndexMap;
use rangemap::RangeInclusiveMap;
use rustc_hash::FxHashMap;

pub use binder::bind_document;

use crate::index::LuaSignatureId;
use crate::syntax::TextRange;
use crate::types::LuaType;
use crate::vfs::{DocumentId, LuaSyntaxId};

/// A declaration is identified by where its name starts, which keeps ids
/// identical when an unchanged document is bound again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LuaDeclId {
    pub doc_id: DocumentId,
    pub position: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalAttribute {
    Const,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LuaDeclKind {
    Local { attrib: Option<LocalAttribute> },
    /// Loop variables of `for` statements.
    ForVar,
    Param { index: usize, signature: LuaSignatureId },
    /// The `self` of a function defined with `:`.
    ImplicitSelf { signature: LuaSignatureId },
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
    Package,
}

impl Visibility {
    pub fn from_word(word: &str) -> Option<Self> {
        Some(match word {
            "public" => Visibility::Public,
            "protected" => Visibility::Protected,
            "private" => Visibility::Private,
            "package" => Visibility::Package,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeclFeatures {
    pub deprecated: bool,
    pub is_async: bool,
    pub nodiscard: bool,
    pub readonly: bool,
}

/// The expression a declaration is initialized from; `index` selects one
/// value of a multi-value expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LuaDeclValue {
    pub expr: LuaSyntaxId,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LuaDecl {
    pub id: LuaDeclId,
    pub name: String,
    pub kind: LuaDeclKind,
    /// Range of the name token.
    pub range: TextRange,
    /// The `LocalName`, `ParamName` or `NameExpr` node.
    pub syntax_id: LuaSyntaxId,
    pub value: Option<LuaDeclValue>,
    pub declared_type: Option<LuaType>,
    pub features: DeclFeatures,
    pub visibility: Visibility,
    /// First offset at which the name resolves to this declaration.
    pub visible_from: u32,
}

impl LuaDecl {
    pub fn is_local(&self) -> bool {
        !matches!(self.kind, LuaDeclKind::Global)
    }

    pub fn is_global(&self) -> bool {
        matches!(self.kind, LuaDeclKind::Global)
    }

    pub fn is_param(&self) -> bool {
        matches!(
            self.kind,
            LuaDeclKind::Param { .. } | LuaDeclKind::ImplicitSelf { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Chunk,
    Block,
    Closure,
    Loop,
    Repeat,
}

#[derive(Debug, Clone)]
pub struct LuaScope {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    pub range: TextRange,
    /// Local declarations in source order.
    pub decls: Vec<LuaDeclId>,
}

/// Declarations of one document, nested by scope.
#[derive(Debug, Clone)]
pub struct LuaDeclTree {
    doc_id: DocumentId,
    decls: IndexMap<LuaDeclId, LuaDecl>,
    scopes: Vec<LuaScope>,
    /// Offset to innermost scope. Inner scopes are inserted after their
    /// parents so they overwrite them.
    scope_map: RangeInclusiveMap<u32, ScopeId>,
    references: FxHashMap<LuaDeclId, Vec<TextRange>>,
}

impl LuaDeclTree {
    pub fn new(doc_id: DocumentId) -> Self {
        Self {
            doc_id,
            decls: IndexMap::new(),
            scopes: Vec::new(),
            scope_map: RangeInclusiveMap::new(),
            references: FxHashMap::default(),
        }
    }

    pub fn doc_id(&self) -> DocumentId {
        self.doc_id
    }

    pub(crate) fn push_scope(
        &mut self,
        parent: Option<ScopeId>,
        kind: ScopeKind,
        range: TextRange,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(LuaScope {
            id,
            parent,
            kind,
            range,
            decls: Vec::new(),
        });
        self.scope_map.insert(range.start..=range.end, id);
        id
    }

    pub(crate) fn add_decl(&mut self, scope: Option<ScopeId>, decl: LuaDecl) -> LuaDeclId {
        let id = decl.id;
        if let Some(scope) = scope {
            self.scopes[scope.0 as usize].decls.push(id);
        }
        self.decls.insert(id, decl);
        id
    }

    pub(crate) fn add_reference(&mut self, decl_id: LuaDeclId, range: TextRange) {
        self.references.entry(decl_id).or_default().push(range);
    }

    pub fn get_decl(&self, id: &LuaDeclId) -> Option<&LuaDecl> {
        self.decls.get(id)
    }

    pub(crate) fn get_decl_mut(&mut self, id: &LuaDeclId) -> Option<&mut LuaDecl> {
        self.decls.get_mut(id)
    }

    /// The declaration whose name starts at `position`.
    pub fn decl_at(&self, position: u32) -> Option<&LuaDecl> {
        self.decls.get(&LuaDeclId {
            doc_id: self.doc_id,
            position,
        })
    }

    pub fn decls(&self) -> impl Iterator<Item = &LuaDecl> {
        self.decls.values()
    }

    pub fn scopes(&self) -> &[LuaScope] {
        &self.scopes
    }

    pub fn scope_at(&self, offset: u32) -> Option<&LuaScope> {
        let id = self.scope_map.get(&offset)?;
        self.scopes.get(id.0 as usize)
    }

    pub fn references(&self, id: &LuaDeclId) -> &[TextRange] {
        self.references.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Resolves `name` used at `offset` to the nearest visible local,
    /// walking scopes outward. `None` means the name is global.
    pub fn find_local_decl(&self, name: &str, offset: u32) -> Option<&LuaDecl> {
        let mut scope = self.scope_at(offset);
        while let Some(current) = scope {
            let found = current
                .decls
                .iter()
                .rev()
                .filter_map(|id| self.decls.get(id))
                .find(|decl| decl.name == name && decl.visible_from <= offset);
            if found.is_some() {
                return found;
            }
            scope = current
                .parent
                .and_then(|parent| self.scopes.get(parent.0 as usize));
        }
        None
    }

    /// Locals visible at `offset`, innermost first, shadowed names skipped.
    pub fn visible_locals(&self, offset: u32) -> Vec<&LuaDecl> {
        let mut seen = Vec::new();
        let mut result = Vec::new();
        let mut scope = self.scope_at(offset);
        while let Some(current) = scope {
            for decl in current.decls.iter().rev().filter_map(|id| self.decls.get(id)) {
                if decl.visible_from <= offset && !seen.contains(&decl.name.as_str()) {
                    seen.push(decl.name.as_str());
                    result.push(decl);
                }
            }
            scope = current
                .parent
                .and_then(|parent| self.scopes.get(parent.0 as usize));
        }
        result
    }
}
