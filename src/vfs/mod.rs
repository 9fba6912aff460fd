mod document;
mod module;

use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;
use rustc_hash::FxHashMap;
use tower_lsp_server::lsp_types::Uri;
use tower_lsp_server::UriExt;

pub use document::LuaDocument;
pub use module::{ModuleIndex, ModuleInfo};

use crate::error::{AnalysisError, Result};
use crate::syntax::{LuaElementId, LuaSyntaxElement, LuaSyntaxNode, LuaSyntaxTree};

/// Stable identity of a document. The same uri keeps its id across
/// remove/re-add so cross-document references stay comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub u32);

/// Pointer to a syntax element: valid only against the current tree of its
/// document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LuaSyntaxId {
    pub doc_id: DocumentId,
    pub element: LuaElementId,
}

impl LuaSyntaxId {
    pub fn new(doc_id: DocumentId, element: LuaElementId) -> Self {
        Self { doc_id, element }
    }

    pub fn from_node(doc_id: DocumentId, node: &LuaSyntaxNode) -> Self {
        Self::new(doc_id, node.id())
    }

    pub fn to_node<'a>(&self, tree: &'a LuaSyntaxTree) -> Option<LuaSyntaxNode<'a>> {
        tree.node(self.element)
    }

    pub fn to_element<'a>(&self, tree: &'a LuaSyntaxTree) -> Option<LuaSyntaxElement<'a>> {
        tree.element(self.element)
    }
}

/// All open documents plus uri interning.
#[derive(Debug, Default)]
pub struct Vfs {
    uri_to_id: DashMap<String, DocumentId>,
    id_to_uri: DashMap<DocumentId, Uri>,
    next_id: AtomicU32,
    documents: FxHashMap<DocumentId, LuaDocument>,
}

impl Vfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `uri`, allocating one on first sight.
    pub fn intern(&self, uri: &Uri) -> DocumentId {
        if let Some(id) = self.uri_to_id.get(uri.as_str()) {
            return *id;
        }
        let id = *self
            .uri_to_id
            .entry(uri.as_str().to_string())
            .or_insert_with(|| DocumentId(self.next_id.fetch_add(1, Ordering::SeqCst)));
        self.id_to_uri.entry(id).or_insert_with(|| uri.clone());
        id
    }

    pub fn lookup(&self, uri: &Uri) -> Option<DocumentId> {
        self.uri_to_id.get(uri.as_str()).map(|id| *id)
    }

    pub fn uri(&self, id: DocumentId) -> Option<Uri> {
        self.id_to_uri.get(&id).map(|uri| uri.clone())
    }

    pub fn set_text(&mut self, uri: &Uri, text: &str) -> DocumentId {
        let id = self.intern(uri);
        self.documents
            .insert(id, LuaDocument::new(id, uri.clone(), text));
        id
    }

    pub fn remove(&mut self, id: DocumentId) -> Option<LuaDocument> {
        self.documents.remove(&id)
    }

    pub fn get(&self, id: DocumentId) -> Option<&LuaDocument> {
        self.documents.get(&id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &LuaDocument> {
        self.documents.values()
    }

    /// Ids of every open document in ascending order.
    pub fn document_ids(&self) -> Vec<DocumentId> {
        let mut ids: Vec<_> = self.documents.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

pub fn parse_uri(text: &str) -> Result<Uri> {
    Uri::from_str(text).map_err(|_| AnalysisError::InvalidUri(text.to_string()))
}

pub fn file_uri(path: &std::path::Path) -> Result<Uri> {
    Uri::from_file_path(path).ok_or_else(|| AnalysisError::InvalidUri(path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_is_stable_across_removal() {
        let mut vfs = Vfs::new();
        let a = parse_uri("file:///a.lua").unwrap();
        let b = parse_uri("file:///b.lua").unwrap();

        let id_a = vfs.set_text(&a, "local x = 1");
        let id_b = vfs.set_text(&b, "");
        assert_ne!(id_a, id_b);

        vfs.remove(id_a);
        assert!(vfs.get(id_a).is_none());
        assert_eq!(vfs.set_text(&a, "local y = 2"), id_a);
        assert_eq!(vfs.get(id_a).unwrap().text(), "local y = 2");
        assert_eq!(vfs.document_ids(), vec![id_a, id_b]);
    }
}
