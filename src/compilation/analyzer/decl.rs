use super::DocAnalysis;
use crate::decl::bind_document;

/// Binds declarations and registers the document's module names.
pub(super) fn analyze(analysis: &mut DocAnalysis) {
    let tree = bind_document(analysis.doc_id, analysis.tree);
    tracing::debug!(decls = tree.decls().count(), "bound declarations");
    analysis.index.set_decl_tree(tree);
    if let Some(path) = analysis.path {
        analysis.index.modules_mut().add(analysis.doc_id, path);
    }
}
