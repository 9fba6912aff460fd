//! Document lifecycle on top of the virtual file system and the workspace
//! index.
//!
//! Every edit replaces one document's contribution: its old index entries
//! are purged before the analyzer passes run again, so the other documents
//! keep their state untouched.

pub(crate) mod analyzer;

use tower_lsp_server::lsp_types::Uri;

use crate::cancel::CancellationToken;
use crate::config::AnalysisConfig;
use crate::diagnostics::{check_document, Diagnostic};
use crate::error::{AnalysisError, Result};
use crate::index::WorkspaceIndex;
use crate::semantic::SearchContext;
use crate::stdlib;
use crate::vfs::{DocumentId, LuaDocument, Vfs};

#[derive(Debug)]
pub struct Compilation {
    vfs: Vfs,
    index: WorkspaceIndex,
    config: AnalysisConfig,
}

impl Compilation {
    pub fn new(config: AnalysisConfig) -> Self {
        let index = WorkspaceIndex::new(
            config.workspace.roots.clone(),
            config.runtime.require_pattern.clone(),
        );
        Self {
            vfs: Vfs::new(),
            index,
            config,
        }
    }

    /// A compilation that already holds the bundled standard library
    /// definitions.
    pub fn with_std(config: AnalysisConfig) -> Result<Self> {
        let mut compilation = Self::new(config);
        compilation.add_documents(stdlib::std_documents()?);
        Ok(compilation)
    }

    pub fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    pub fn index(&self) -> &WorkspaceIndex {
        &self.index
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Adds a document, or replaces the text of one already known under
    /// `uri`.
    #[tracing::instrument(skip(self, text), fields(uri = uri.as_str()))]
    pub fn add_document(&mut self, uri: &Uri, text: &str) -> DocumentId {
        let doc_id = self.vfs.set_text(uri, text);
        self.index.remove(doc_id);
        if let Some(document) = self.vfs.get(doc_id) {
            analyzer::analyze_document(document, &self.config, &mut self.index);
        }
        doc_id
    }

    pub fn add_documents<I, S>(&mut self, documents: I) -> Vec<DocumentId>
    where
        I: IntoIterator<Item = (Uri, S)>,
        S: AsRef<str>,
    {
        let ids: Vec<DocumentId> = documents
            .into_iter()
            .map(|(uri, text)| self.add_document(&uri, text.as_ref()))
            .collect();
        tracing::info!(count = ids.len(), "documents added");
        ids
    }

    /// Replaces the text of a known document.
    pub fn update_document_by_uri(&mut self, uri: &Uri, text: &str) -> Result<DocumentId> {
        if self.vfs.lookup(uri).is_none() {
            return Err(AnalysisError::UnknownUri(uri.as_str().to_string()));
        }
        Ok(self.add_document(uri, text))
    }

    /// Withdraws a document and everything it contributed. The uri keeps its
    /// id for a later re-add.
    #[tracing::instrument(skip(self), fields(uri = uri.as_str()))]
    pub fn remove_document_by_uri(&mut self, uri: &Uri) -> Result<DocumentId> {
        let doc_id = self
            .vfs
            .lookup(uri)
            .filter(|doc_id| self.vfs.get(*doc_id).is_some())
            .ok_or_else(|| AnalysisError::UnknownUri(uri.as_str().to_string()))?;
        self.index.remove(doc_id);
        self.vfs.remove(doc_id);
        Ok(doc_id)
    }

    pub fn get_document(&self, doc_id: DocumentId) -> Option<&LuaDocument> {
        self.vfs.get(doc_id)
    }

    pub fn document_id(&self, uri: &Uri) -> Option<DocumentId> {
        self.vfs.lookup(uri).filter(|doc_id| self.vfs.get(*doc_id).is_some())
    }

    /// A fresh inference context with an empty cache.
    pub fn search_context(&self) -> SearchContext<'_> {
        SearchContext::new(&self.vfs, &self.index, &self.config)
    }

    /// Diagnostics of one document. A cancelled pass is reported as
    /// [`AnalysisError::Cancelled`] rather than as a partial list.
    pub fn diagnose(&self, doc_id: DocumentId, cancel: &CancellationToken) -> Result<Vec<Diagnostic>> {
        let document = self
            .vfs
            .get(doc_id)
            .ok_or(AnalysisError::UnknownDocument(doc_id))?;
        let tree = document.tree();
        let mut ctx = self.search_context().with_cancellation(cancel.clone());
        let diagnostics = check_document(&mut ctx, doc_id, &tree, document.line_index());
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        Ok(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::parse_uri;

    #[test]
    fn test_update_requires_known_document() {
        let mut compilation = Compilation::new(AnalysisConfig::default());
        let uri = parse_uri("file:///missing.lua").unwrap();
        assert!(compilation.update_document_by_uri(&uri, "return 1").is_err());
        assert!(compilation.remove_document_by_uri(&uri).is_err());
    }

    #[test]
    fn test_edit_replaces_only_own_contribution() {
        let mut compilation = Compilation::new(AnalysisConfig::default());
        let a = parse_uri("file:///a.lua").unwrap();
        let b = parse_uri("file:///b.lua").unwrap();
        compilation.add_document(&a, "alpha = 1\n");
        compilation.add_document(&b, "beta = 2\n");

        compilation.update_document_by_uri(&a, "gamma = 3\n").unwrap();
        let index = compilation.index();
        assert!(!index.has_global("alpha"));
        assert!(index.has_global("beta"));
        assert!(index.has_global("gamma"));
    }

    #[test]
    fn test_cancelled_diagnose() {
        let mut compilation = Compilation::new(AnalysisConfig::default());
        let uri = parse_uri("file:///c.lua").unwrap();
        let doc_id = compilation.add_document(&uri, "local x = 1\n");
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(
            compilation.diagnose(doc_id, &cancel),
            Err(AnalysisError::Cancelled)
        ));
    }
}
