use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use tower_lsp_server::lsp_types::Uri;
use tower_lsp_server::UriExt;

use super::DocumentId;
use crate::line_index::LineIndex;
use crate::syntax::{self, LuaSyntaxTree};

/// Source text of one file plus its lazily built syntax tree.
///
/// A document is immutable: an edit replaces the whole value, dropping the
/// old tree.
#[derive(Debug)]
pub struct LuaDocument {
    id: DocumentId,
    uri: Uri,
    path: Option<PathBuf>,
    text: Arc<str>,
    line_index: LineIndex,
    tree: OnceLock<Arc<LuaSyntaxTree>>,
}

impl LuaDocument {
    pub fn new(id: DocumentId, uri: Uri, text: &str) -> Self {
        let path = uri.to_file_path().map(|path| path.into_owned());
        Self {
            id,
            uri,
            path,
            text: Arc::from(text),
            line_index: LineIndex::new(text),
            tree: OnceLock::new(),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    pub fn tree(&self) -> Arc<LuaSyntaxTree> {
        self.tree
            .get_or_init(|| Arc::new(syntax::parse(&self.text)))
            .clone()
    }

    /// File name without directories, for display.
    pub fn file_name(&self) -> String {
        self.path
            .as_ref()
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.uri.as_str().to_string())
    }
}
