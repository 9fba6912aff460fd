//! Cross-document index: every entry is tagged with the document that
//! produced it so a document's whole contribution can be dropped at once.

mod member;
mod multimap;
mod signature;
mod type_decl;

use std::path::PathBuf;

use rustc_hash::{FxHashMap, FxHashSet};

pub use member::{
    is_reserved_name, LuaMember, LuaMemberKey, LuaMemberSource, LuaOperator, LuaOperatorKind,
    MemberOwner,
};
pub use multimap::DocMultimap;
pub use signature::{LuaDocParamInfo, LuaDocReturnInfo, LuaSignature, LuaSignatureId};
pub use type_decl::{LuaTypeDecl, LuaTypeDeclKind, LuaTypeDeclPart, LuaTypeIndex};

use crate::decl::{LuaDecl, LuaDeclId, LuaDeclTree};
use crate::diagnostics::DiagnosticSuppression;
use crate::syntax::TextRange;
use crate::types::{ArcStr, LuaType};
use crate::vfs::{DocumentId, LuaSyntaxId, ModuleIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LuaReferenceKind {
    Read,
    Write,
    Field,
    TypeName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuaReference {
    pub range: TextRange,
    pub kind: LuaReferenceKind,
}

#[derive(Debug, Default)]
pub struct WorkspaceIndex {
    decl_trees: FxHashMap<DocumentId, LuaDeclTree>,
    members: DocMultimap<MemberOwner, LuaMember>,
    globals: DocMultimap<ArcStr, LuaDeclId>,
    types: LuaTypeIndex,
    supers: DocMultimap<ArcStr, LuaType>,
    sub_types: DocMultimap<ArcStr, ArcStr>,
    operators: DocMultimap<ArcStr, LuaOperator>,
    signatures: FxHashMap<DocumentId, FxHashMap<LuaSignatureId, LuaSignature>>,
    references: DocMultimap<ArcStr, LuaReference>,
    table_owners: FxHashMap<DocumentId, FxHashMap<LuaSyntaxId, MemberOwner>>,
    /// Global tables declared as instances of a class, e.g. `---@class M`
    /// above `M = {}`.
    class_globals: DocMultimap<ArcStr, MemberOwner>,
    modules: ModuleIndex,
    module_returns: FxHashMap<DocumentId, LuaSyntaxId>,
    suppressions: FxHashMap<DocumentId, Vec<DiagnosticSuppression>>,
    meta_docs: FxHashSet<DocumentId>,
}

impl WorkspaceIndex {
    pub fn new(roots: Vec<PathBuf>, require_patterns: Vec<String>) -> Self {
        Self {
            modules: ModuleIndex::new(roots, require_patterns),
            ..Default::default()
        }
    }

    /// Purges everything `doc_id` contributed.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn remove(&mut self, doc_id: DocumentId) {
        self.decl_trees.remove(&doc_id);
        self.members.remove_doc(doc_id);
        self.globals.remove_doc(doc_id);
        self.types.remove_doc(doc_id);
        self.supers.remove_doc(doc_id);
        self.sub_types.remove_doc(doc_id);
        self.operators.remove_doc(doc_id);
        self.signatures.remove(&doc_id);
        self.references.remove_doc(doc_id);
        self.table_owners.remove(&doc_id);
        self.class_globals.remove_doc(doc_id);
        self.modules.remove(doc_id);
        self.module_returns.remove(&doc_id);
        self.suppressions.remove(&doc_id);
        self.meta_docs.remove(&doc_id);
    }

    // ─── writers, used by the analyzer passes ─────────────────────────

    pub(crate) fn set_decl_tree(&mut self, tree: LuaDeclTree) {
        self.decl_trees.insert(tree.doc_id(), tree);
    }

    pub(crate) fn decl_tree_mut(&mut self, doc_id: DocumentId) -> Option<&mut LuaDeclTree> {
        self.decl_trees.get_mut(&doc_id)
    }

    pub(crate) fn add_member(&mut self, member: LuaMember) {
        if let MemberOwner::Type(name) = &member.owner {
            if is_reserved_name(name) {
                return;
            }
        }
        self.members.insert(member.doc_id, member.owner.clone(), member);
    }

    pub(crate) fn add_global(&mut self, name: &str, decl_id: LuaDeclId) {
        self.globals.insert(decl_id.doc_id, ArcStr::from(name), decl_id);
    }

    pub(crate) fn add_type_decl(&mut self, doc_id: DocumentId, name: ArcStr, part: LuaTypeDeclPart) {
        self.types.add(doc_id, name, part);
    }

    pub(crate) fn add_super(&mut self, doc_id: DocumentId, name: ArcStr, super_type: LuaType) {
        if let LuaType::Ref(super_name) = &super_type {
            self.sub_types.insert(doc_id, super_name.clone(), name.clone());
        }
        self.supers.insert(doc_id, name, super_type);
    }

    pub(crate) fn add_operator(&mut self, doc_id: DocumentId, operator: LuaOperator) {
        self.operators.insert(doc_id, operator.owner.clone(), operator);
    }

    pub(crate) fn add_signature(&mut self, id: LuaSignatureId, signature: LuaSignature) {
        self.signatures
            .entry(id.syntax_id().doc_id)
            .or_default()
            .insert(id, signature);
    }

    pub(crate) fn signature_mut(&mut self, id: &LuaSignatureId) -> Option<&mut LuaSignature> {
        self.signatures.get_mut(&id.syntax_id().doc_id)?.get_mut(id)
    }

    pub(crate) fn add_reference(&mut self, doc_id: DocumentId, name: &str, reference: LuaReference) {
        self.references.insert(doc_id, ArcStr::from(name), reference);
    }

    pub(crate) fn set_table_owner(&mut self, table: LuaSyntaxId, owner: MemberOwner) {
        self.table_owners
            .entry(table.doc_id)
            .or_default()
            .insert(table, owner);
    }

    pub(crate) fn add_class_global(&mut self, doc_id: DocumentId, class: ArcStr, owner: MemberOwner) {
        self.class_globals.insert(doc_id, class, owner);
    }

    pub(crate) fn modules_mut(&mut self) -> &mut ModuleIndex {
        &mut self.modules
    }

    pub(crate) fn set_module_return(&mut self, doc_id: DocumentId, expr: LuaSyntaxId) {
        self.module_returns.insert(doc_id, expr);
    }

    pub(crate) fn add_suppression(&mut self, doc_id: DocumentId, suppression: DiagnosticSuppression) {
        self.suppressions.entry(doc_id).or_default().push(suppression);
    }

    pub(crate) fn set_meta(&mut self, doc_id: DocumentId) {
        self.meta_docs.insert(doc_id);
    }

    // ─── queries ───────────────────────────────────────────────────────

    pub fn get_decl_tree(&self, doc_id: DocumentId) -> Option<&LuaDeclTree> {
        self.decl_trees.get(&doc_id)
    }

    pub fn get_decl(&self, id: &LuaDeclId) -> Option<&LuaDecl> {
        self.decl_trees.get(&id.doc_id)?.get_decl(id)
    }

    pub fn query_members(&self, owner: &MemberOwner) -> Vec<&LuaMember> {
        self.members.get(owner).collect()
    }

    pub fn query_member(&self, owner: &MemberOwner, key: &LuaMemberKey) -> Option<&LuaMember> {
        // a declared type beats an inferred one
        let mut found = None;
        for member in self.members.get(owner).filter(|member| &member.key == key) {
            if member.declared_type.is_some() {
                return Some(member);
            }
            found.get_or_insert(member);
        }
        found
    }

    pub fn members_of_doc(&self, doc_id: DocumentId) -> impl Iterator<Item = &LuaMember> {
        self.members.values_of(doc_id).map(|(_, member)| member)
    }

    /// Every declaration of a global, lowest document first.
    pub fn query_globals(&self, name: &str) -> Vec<&LuaDecl> {
        self.globals
            .get(name)
            .filter_map(|id| self.get_decl(id))
            .collect()
    }

    pub fn has_global(&self, name: &str) -> bool {
        self.globals.contains_key(name)
    }

    /// One declaration per global name, sorted by name.
    pub fn query_all_globals(&self) -> Vec<&LuaDecl> {
        let mut names: Vec<&ArcStr> = self.globals.keys().collect();
        names.sort();
        names
            .into_iter()
            .filter_map(|name| self.query_globals(name).into_iter().next())
            .collect()
    }

    pub fn query_type_decl(&self, name: &str) -> Option<&LuaTypeDecl> {
        self.types.get(name)
    }

    pub fn all_type_decls(&self) -> impl Iterator<Item = &LuaTypeDecl> {
        self.types.all()
    }

    pub fn type_names_of(&self, doc_id: DocumentId) -> impl Iterator<Item = &ArcStr> {
        self.types.names_of(doc_id)
    }

    pub fn query_supers(&self, name: &str) -> Vec<&LuaType> {
        self.supers.get(name).collect()
    }

    pub fn query_sub_types(&self, name: &str) -> Vec<&ArcStr> {
        self.sub_types.get(name).collect()
    }

    pub fn query_operators(&self, owner: &str) -> Vec<&LuaOperator> {
        self.operators.get(owner).collect()
    }

    pub fn query_references(&self, name: &str) -> Vec<(DocumentId, &LuaReference)> {
        self.references.get_with_doc(name).collect()
    }

    pub fn get_signature(&self, id: &LuaSignatureId) -> Option<&LuaSignature> {
        self.signatures.get(&id.syntax_id().doc_id)?.get(id)
    }

    pub fn table_owner(&self, table: &LuaSyntaxId) -> Option<&MemberOwner> {
        self.table_owners.get(&table.doc_id)?.get(table)
    }

    pub fn class_globals(&self, class: &str) -> Vec<&MemberOwner> {
        self.class_globals.get(class).collect()
    }

    pub fn modules(&self) -> &ModuleIndex {
        &self.modules
    }

    pub fn module_return(&self, doc_id: DocumentId) -> Option<LuaSyntaxId> {
        self.module_returns.get(&doc_id).copied()
    }

    pub fn suppressions(&self, doc_id: DocumentId) -> &[DiagnosticSuppression] {
        self.suppressions
            .get(&doc_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_meta(&self, doc_id: DocumentId) -> bool {
        self.meta_docs.contains(&doc_id)
    }
}
