//! Concurrent access to one [`Compilation`].
//!
//! Edits take the write lock, queries share the read lock. Each query or
//! diagnostic task builds its own [`SearchContext`](crate::semantic::SearchContext),
//! so inference caches never cross threads.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use tower_lsp_server::lsp_types::{self, Position, Uri};

use crate::cancel::CancellationToken;
use crate::compilation::Compilation;
use crate::diagnostics::Diagnostic;
use crate::error::{AnalysisError, Result};
use crate::vfs::{DocumentId, LuaSyntaxId};

/// Diagnostics of one document from a workspace pass.
#[derive(Debug, Clone)]
pub struct DocumentDiagnostics {
    pub doc_id: DocumentId,
    pub uri: Uri,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct Analysis {
    compilation: Arc<RwLock<Compilation>>,
    /// Token of the newest diagnostic pass; an edit cancels it.
    current_pass: Arc<Mutex<CancellationToken>>,
}

impl Analysis {
    pub fn new(compilation: Compilation) -> Self {
        Self {
            compilation: Arc::new(RwLock::new(compilation)),
            current_pass: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    pub fn compilation(&self) -> Arc<RwLock<Compilation>> {
        self.compilation.clone()
    }

    async fn cancel_pass(&self) {
        self.current_pass.lock().await.cancel();
    }

    async fn begin_pass(&self) -> CancellationToken {
        let mut current = self.current_pass.lock().await;
        current.cancel();
        *current = CancellationToken::new();
        current.clone()
    }

    // ─── edits ─────────────────────────────────────────────────────────

    pub async fn add_document(&self, uri: Uri, text: String) -> DocumentId {
        self.cancel_pass().await;
        self.compilation.write().await.add_document(&uri, &text)
    }

    pub async fn update_document(&self, uri: Uri, text: String) -> Result<DocumentId> {
        self.cancel_pass().await;
        self.compilation
            .write()
            .await
            .update_document_by_uri(&uri, &text)
    }

    pub async fn remove_document(&self, uri: Uri) -> Result<DocumentId> {
        self.cancel_pass().await;
        self.compilation.write().await.remove_document_by_uri(&uri)
    }

    // ─── queries ───────────────────────────────────────────────────────

    /// Type of the expression or declaration name under the cursor.
    pub async fn infer_at(&self, uri: &Uri, position: Position) -> Result<Option<String>> {
        let compilation = self.compilation.read().await;
        let doc_id = compilation
            .document_id(uri)
            .ok_or_else(|| AnalysisError::UnknownUri(uri.as_str().to_string()))?;
        let Some(document) = compilation.get_document(doc_id) else {
            return Ok(None);
        };
        let tree = document.tree();
        let offset = document.line_index().offset(position);
        let Some(node) = tree
            .token_at_offset(offset)
            .filter(|token| !token.kind().is_trivia())
            .and_then(|token| token.parent())
        else {
            return Ok(None);
        };

        let mut ctx = compilation.search_context();
        let ty = ctx.infer_element(LuaSyntaxId::from_node(doc_id, &node));
        Ok(Some(ctx.humanize_type(&ty)))
    }

    /// Diagnostics of one document in protocol form.
    pub async fn diagnostics(&self, uri: &Uri) -> Result<Vec<lsp_types::Diagnostic>> {
        let compilation = self.compilation.read().await;
        let doc_id = compilation
            .document_id(uri)
            .ok_or_else(|| AnalysisError::UnknownUri(uri.as_str().to_string()))?;
        let diagnostics = compilation.diagnose(doc_id, &CancellationToken::new())?;
        let Some(document) = compilation.get_document(doc_id) else {
            return Ok(Vec::new());
        };
        Ok(diagnostics
            .iter()
            .map(|diagnostic| diagnostic.to_lsp(document.line_index()))
            .collect())
    }

    /// Diagnoses every document, one blocking task per document, all
    /// sharing one read guard. Starting a pass cancels the previous one.
    #[tracing::instrument(skip_all)]
    pub async fn diagnose_workspace(&self) -> Result<Vec<DocumentDiagnostics>> {
        let cancel = self.begin_pass().await;
        self.run_pass(cancel).await
    }

    /// Waits for the configured debounce delay first; an edit arriving in
    /// the meantime cancels the pass before it starts.
    pub async fn diagnose_workspace_debounced(&self) -> Result<Vec<DocumentDiagnostics>> {
        let cancel = self.begin_pass().await;
        let delay = self.compilation.read().await.config().diagnostics.debounce_ms;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        if cancel.is_cancelled() {
            tracing::debug!("debounced pass superseded");
            return Err(AnalysisError::Cancelled);
        }
        self.run_pass(cancel).await
    }

    async fn run_pass(&self, cancel: CancellationToken) -> Result<Vec<DocumentDiagnostics>> {
        let compilation = Arc::new(self.compilation.clone().read_owned().await);
        let mut tasks = JoinSet::new();
        for doc_id in compilation.vfs().document_ids() {
            let compilation = compilation.clone();
            let cancel = cancel.clone();
            tasks.spawn_blocking(move || {
                let uri = compilation.vfs().uri(doc_id);
                compilation
                    .diagnose(doc_id, &cancel)
                    .map(|diagnostics| (doc_id, uri, diagnostics))
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (doc_id, uri, diagnostics) = joined??;
            if let Some(uri) = uri {
                results.push(DocumentDiagnostics {
                    doc_id,
                    uri,
                    diagnostics,
                });
            }
        }
        results.sort_by_key(|result| result.doc_id);
        tracing::info!(documents = results.len(), "workspace diagnostics finished");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::vfs::parse_uri;

    #[tokio::test]
    async fn test_infer_at_declaration_name() {
        let analysis = Analysis::new(Compilation::new(AnalysisConfig::default()));
        let uri = parse_uri("file:///hover.lua").unwrap();
        analysis
            .add_document(uri.clone(), "local count = 1 + 2\n".to_string())
            .await;

        let ty = analysis.infer_at(&uri, Position::new(0, 7)).await.unwrap();
        assert_eq!(ty.as_deref(), Some("integer"));
    }

    #[tokio::test]
    async fn test_unknown_uri_is_an_error() {
        let analysis = Analysis::new(Compilation::new(AnalysisConfig::default()));
        let uri = parse_uri("file:///nowhere.lua").unwrap();
        assert!(analysis.diagnostics(&uri).await.is_err());
    }
}
