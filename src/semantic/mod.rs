//! On-demand type inference over the workspace index.
//!
//! A [`SearchContext`] is created per query or per diagnostic pass and owns
//! its memo cache; nothing in it is shared between threads.

mod call;
mod infer;
mod member;
mod narrow;
mod subtype;

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

pub use call::CallableMatch;
pub use member::LuaMemberInfo;

use crate::cancel::CancellationToken;
use crate::config::AnalysisConfig;
use crate::decl::{LuaDecl, LuaDeclKind};
use crate::index::{LuaMember, LuaMemberKey, LuaTypeDecl, WorkspaceIndex};
use crate::syntax::{LuaSyntaxKind, LuaSyntaxNode, LuaSyntaxTree, LuaTokenKind};
use crate::types::{format_type, instantiate_type, ArcStr, LuaMultiReturn, LuaType, TypeSubstitutor};
use crate::vfs::{DocumentId, LuaSyntaxId, Vfs};

/// Inference gives up below this many nested lookups and answers `unknown`.
pub const MAX_INFER_DEPTH: usize = 64;

/// What a name or field reference resolves to.
#[derive(Debug, Clone, Copy)]
pub enum LuaSemanticDecl<'a> {
    Decl(&'a LuaDecl),
    Member(&'a LuaMember),
    TypeDecl(&'a LuaTypeDecl),
}

#[derive(Debug, Clone)]
enum CacheEntry {
    /// Inference of this element is on the stack; a re-entry is a cycle.
    Pending,
    Done(LuaType),
}

pub struct SearchContext<'a> {
    vfs: &'a Vfs,
    index: &'a WorkspaceIndex,
    config: &'a AnalysisConfig,
    cache: FxHashMap<LuaSyntaxId, CacheEntry>,
    decl_cache: FxHashMap<crate::decl::LuaDeclId, CacheEntry>,
    depth: usize,
    /// Aliases currently being expanded.
    substitution_guard: FxHashSet<ArcStr>,
    cancel: Option<CancellationToken>,
}

impl<'a> SearchContext<'a> {
    pub fn new(vfs: &'a Vfs, index: &'a WorkspaceIndex, config: &'a AnalysisConfig) -> Self {
        Self {
            vfs,
            index,
            config,
            cache: FxHashMap::default(),
            decl_cache: FxHashMap::default(),
            depth: 0,
            substitution_guard: FxHashSet::default(),
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn index(&self) -> &'a WorkspaceIndex {
        self.index
    }

    pub fn config(&self) -> &'a AnalysisConfig {
        self.config
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    pub(crate) fn tree(&self, doc_id: DocumentId) -> Option<Arc<LuaSyntaxTree>> {
        Some(self.vfs.get(doc_id)?.tree())
    }

    /// Runs `f` one level deeper, or answers `fallback` past the depth limit
    /// or after cancellation.
    fn guarded<T>(&mut self, fallback: T, f: impl FnOnce(&mut Self) -> T) -> T {
        if self.depth >= MAX_INFER_DEPTH {
            tracing::debug!(depth = self.depth, "inference depth limit reached");
            return fallback;
        }
        if self.is_cancelled() {
            return fallback;
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // ─── expressions ───────────────────────────────────────────────────

    /// Type of an expression. Calls keep all their values; use
    /// [`LuaType::first_value`] where one value is expected.
    pub fn infer_expr(&mut self, doc_id: DocumentId, expr: &LuaSyntaxNode) -> LuaType {
        let id = LuaSyntaxId::from_node(doc_id, expr);
        match self.cache.get(&id) {
            Some(CacheEntry::Done(ty)) => return ty.clone(),
            Some(CacheEntry::Pending) => return LuaType::Unknown,
            None => {}
        }
        self.cache.insert(id, CacheEntry::Pending);
        let ty = self.guarded(LuaType::Unknown, |ctx| ctx.infer_expr_uncached(doc_id, expr));
        self.cache.insert(id, CacheEntry::Done(ty.clone()));
        ty
    }

    /// Type of any element a syntax id points at: an expression, a
    /// declaration name, a table field or a statement's first target.
    pub fn infer_element(&mut self, id: LuaSyntaxId) -> LuaType {
        let Some(tree) = self.tree(id.doc_id) else {
            return LuaType::Unknown;
        };
        let Some(node) = id.to_node(&tree) else {
            return LuaType::Unknown;
        };
        match node.kind() {
            kind if kind.is_expr() => self.infer_expr(id.doc_id, &node),
            LuaSyntaxKind::LocalName | LuaSyntaxKind::ParamName => {
                let decl = node
                    .token(LuaTokenKind::Name)
                    .or_else(|| node.token(LuaTokenKind::Dots))
                    .and_then(|token| {
                        self.index
                            .get_decl_tree(id.doc_id)?
                            .decl_at(token.range().start)
                    });
                match decl {
                    Some(decl) => self.get_decl_type(decl),
                    None => LuaType::Unknown,
                }
            }
            LuaSyntaxKind::TableField => match node.exprs().last() {
                Some(value) => self.infer_expr(id.doc_id, &value).first_value(),
                None => LuaType::Unknown,
            },
            _ => LuaType::Unknown,
        }
    }

    /// The declaration a name, field access or doc type name refers to.
    pub fn find_declaration(
        &mut self,
        doc_id: DocumentId,
        node: &LuaSyntaxNode,
    ) -> Option<LuaSemanticDecl<'a>> {
        match node.kind() {
            LuaSyntaxKind::NameExpr => {
                let token = node.token(LuaTokenKind::Name)?;
                self.resolve_name(doc_id, token.text(), token.range().start)
                    .map(LuaSemanticDecl::Decl)
            }
            LuaSyntaxKind::IndexExpr => {
                let prefix = node.exprs().next()?;
                let (key, _) = LuaMemberKey::from_index_expr(node)?;
                let prefix_type = self.infer_expr(doc_id, &prefix).first_value();
                self.find_member(&prefix_type, &key)?
                    .member
                    .map(LuaSemanticDecl::Member)
            }
            LuaSyntaxKind::TypeName => {
                let name = node.name_text()?;
                self.index.query_type_decl(name).map(LuaSemanticDecl::TypeDecl)
            }
            LuaSyntaxKind::LocalName | LuaSyntaxKind::ParamName => {
                let token = node.token(LuaTokenKind::Name)?;
                self.index
                    .get_decl_tree(doc_id)?
                    .decl_at(token.range().start)
                    .map(LuaSemanticDecl::Decl)
            }
            _ => None,
        }
    }

    /// A local visible at `offset`, else the first declaration of a global
    /// of that name.
    pub(crate) fn resolve_name(
        &self,
        doc_id: DocumentId,
        name: &str,
        offset: u32,
    ) -> Option<&'a LuaDecl> {
        if let Some(decl) = self
            .index
            .get_decl_tree(doc_id)
            .and_then(|decls| decls.find_local_decl(name, offset))
        {
            return Some(decl);
        }
        let globals = self.index.query_globals(name);
        globals
            .iter()
            .find(|decl| decl.id.doc_id == doc_id)
            .or_else(|| globals.first())
            .copied()
    }

    // ─── declarations ──────────────────────────────────────────────────

    /// Declared type of a declaration, or the type of the value it is
    /// initialized from.
    pub fn get_decl_type(&mut self, decl: &LuaDecl) -> LuaType {
        match self.decl_cache.get(&decl.id) {
            Some(CacheEntry::Done(ty)) => return ty.clone(),
            Some(CacheEntry::Pending) => return LuaType::Unknown,
            None => {}
        }
        self.decl_cache.insert(decl.id, CacheEntry::Pending);
        let ty = self.guarded(LuaType::Unknown, |ctx| ctx.decl_type_uncached(decl));
        self.decl_cache.insert(decl.id, CacheEntry::Done(ty.clone()));
        ty
    }

    fn decl_type_uncached(&mut self, decl: &LuaDecl) -> LuaType {
        if let Some(declared) = &decl.declared_type {
            return self.expand_alias(declared);
        }
        match &decl.kind {
            LuaDeclKind::Param { signature, .. } => {
                let ty = self
                    .index
                    .get_signature(signature)
                    .and_then(|signature| signature.param_type(&decl.name));
                match (ty, decl.name == "...") {
                    (Some(ty), true) => LuaType::MultiReturn(Arc::new(LuaMultiReturn::Base(ty))),
                    (Some(ty), false) => self.expand_alias(&ty),
                    (None, true) => LuaType::MultiReturn(Arc::new(LuaMultiReturn::Base(LuaType::Any))),
                    (None, false) => self.infer_callback_param(decl).unwrap_or_default(),
                }
            }
            LuaDeclKind::ImplicitSelf { signature } => self.infer_self_type(signature.syntax_id()),
            LuaDeclKind::ForVar => self.infer_for_var(decl),
            LuaDeclKind::Local { .. } | LuaDeclKind::Global => {
                let Some(value) = decl.value else {
                    return LuaType::Unknown;
                };
                let Some(tree) = self.tree(value.expr.doc_id) else {
                    return LuaType::Unknown;
                };
                let Some(expr) = value.expr.to_node(&tree) else {
                    return LuaType::Unknown;
                };
                let ty = self.infer_expr(value.expr.doc_id, &expr);
                match ty {
                    LuaType::MultiReturn(multi) => multi.get(value.index).unwrap_or(LuaType::Nil),
                    ty if value.index == 0 => ty,
                    // a single value cannot fill later slots
                    _ => LuaType::Nil,
                }
            }
        }
    }

    /// Type of the global `name` across the workspace: the first declared
    /// type, else the first initializer.
    pub fn get_global_type(&mut self, name: &str) -> LuaType {
        let globals = self.index.query_globals(name);
        if let Some(decl) = globals.iter().find(|decl| decl.declared_type.is_some()) {
            return self.get_decl_type(decl);
        }
        for decl in globals {
            let ty = self.get_decl_type(decl);
            if !ty.is_unknown() && !ty.is_nil() {
                return ty;
            }
        }
        if self.config.diagnostics.globals.iter().any(|global| global == name) {
            return LuaType::Any;
        }
        LuaType::Unknown
    }

    /// `self` inside `function a.b:m()` has the type of `a.b`.
    fn infer_self_type(&mut self, closure: LuaSyntaxId) -> LuaType {
        let Some(tree) = self.tree(closure.doc_id) else {
            return LuaType::Unknown;
        };
        let prefix = closure
            .to_node(&tree)
            .and_then(|closure| closure.parent())
            .and_then(|stat| stat.child(LuaSyntaxKind::IndexExpr))
            .and_then(|name| name.exprs().next());
        match prefix {
            Some(prefix) => self.infer_expr(closure.doc_id, &prefix).first_value(),
            None => LuaType::Unknown,
        }
    }

    // ─── named types ───────────────────────────────────────────────────

    /// Follows `Ref(alias)` to the aliased type. Cycles come back as
    /// `unknown`.
    pub fn resolve_alias(&mut self, ty: &LuaType) -> LuaType {
        match ty {
            LuaType::Ref(name) => {
                let Some(origin) = self
                    .index
                    .query_type_decl(name)
                    .and_then(LuaTypeDecl::alias_origin)
                else {
                    return ty.clone();
                };
                if !self.substitution_guard.insert(name.clone()) {
                    tracing::debug!(alias = %name, "recursive alias");
                    return LuaType::Unknown;
                }
                let origin = origin.clone();
                let resolved = self.guarded(LuaType::Unknown, |ctx| ctx.resolve_alias(&origin));
                self.substitution_guard.remove(name);
                resolved
            }
            LuaType::Generic(generic) => {
                let Some(decl) = self.index.query_type_decl(&generic.base) else {
                    return ty.clone();
                };
                let Some(origin) = decl.alias_origin() else {
                    return ty.clone();
                };
                if !self.substitution_guard.insert(generic.base.clone()) {
                    return LuaType::Unknown;
                }
                let names: Vec<ArcStr> = decl
                    .generic_params()
                    .iter()
                    .map(|(name, _)| name.clone())
                    .collect();
                let substitutor = TypeSubstitutor::from_params(&names, &generic.params);
                let instantiated = instantiate_type(origin, &substitutor);
                let resolved = self.guarded(LuaType::Unknown, |ctx| ctx.resolve_alias(&instantiated));
                self.substitution_guard.remove(&generic.base);
                resolved
            }
            _ => ty.clone(),
        }
    }

    /// Expands a declared alias so users of the declaration see its shape.
    fn expand_alias(&mut self, ty: &LuaType) -> LuaType {
        match ty {
            LuaType::Ref(_) | LuaType::Generic(_) => self.resolve_alias(ty),
            _ => ty.clone(),
        }
    }

    pub fn is_enum(&self, name: &str) -> bool {
        self.index
            .query_type_decl(name)
            .is_some_and(LuaTypeDecl::is_enum)
    }

    /// Renders a type for display; functions defined in code are shown with
    /// their signature.
    pub fn humanize_type(&mut self, ty: &LuaType) -> String {
        match ty {
            LuaType::Signature(id) => {
                let func = self.signature_function(*id);
                format_type(&LuaType::DocFunction(Arc::new(func)))
            }
            LuaType::MultiReturn(multi) => match multi.as_ref() {
                LuaMultiReturn::Multi(types) => types
                    .iter()
                    .map(|ty| self.humanize_type(ty))
                    .collect::<Vec<_>>()
                    .join(", "),
                LuaMultiReturn::Base(base) => format!("...{}", self.humanize_type(base)),
            },
            LuaType::Union(union) => {
                let parts: Vec<String> = union.types().iter().map(|ty| self.humanize_type(ty)).collect();
                if parts.len() == 2 && union.types().contains(&LuaType::Nil) {
                    if let Some(other) = union
                        .types()
                        .iter()
                        .position(|ty| !ty.is_nil())
                        .map(|i| parts[i].clone())
                    {
                        return format!("{other}?");
                    }
                }
                parts.join("|")
            }
            _ => format_type(ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilation::Compilation;
    use crate::vfs::parse_uri;

    #[test]
    fn test_mutual_globals_answer_unknown() {
        let mut compilation = Compilation::new(AnalysisConfig::default());
        let uri = parse_uri("file:///loop.lua").unwrap();
        let doc_id = compilation.add_document(&uri, "a = b\nb = a\nlocal x = a\n");
        let mut ctx = compilation.search_context();
        let decl = ctx
            .index()
            .get_decl_tree(doc_id)
            .and_then(|decls| decls.decls().find(|decl| decl.name == "x"))
            .unwrap();
        assert_eq!(ctx.get_decl_type(decl), LuaType::Unknown);
    }
}
