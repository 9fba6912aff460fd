use include_dir::{include_dir, Dir};
use tower_lsp_server::lsp_types::Uri;

use crate::error::{AnalysisError, Result};
use crate::vfs::parse_uri;

/// Annotated definitions of the Lua standard library, loaded as meta
/// documents.
pub const STDLIB: Dir = include_dir!("$CARGO_MANIFEST_DIR/resources/std");

/// Uri scheme of the bundled definitions; they never map to a file on disk.
pub const STD_SCHEME: &str = "lua-std";

/// Every bundled definition file with its uri, sorted by name so the
/// documents get the same ids on every start.
pub fn std_documents() -> Result<Vec<(Uri, &'static str)>> {
    let mut files: Vec<_> = STDLIB
        .files()
        .filter(|file| file.path().extension().is_some_and(|ext| ext == "lua"))
        .collect();
    files.sort_by_key(|file| file.path());

    files
        .into_iter()
        .map(|file| {
            let name = file.path().display().to_string();
            let text = file
                .contents_utf8()
                .ok_or_else(|| AnalysisError::InvalidStdFile(name.clone()))?;
            Ok((parse_uri(&format!("{STD_SCHEME}:///{name}"))?, text))
        })
        .collect()
}

pub fn is_std_uri(uri: &Uri) -> bool {
    uri.as_str().starts_with(STD_SCHEME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_files_are_meta() {
        let documents = std_documents().unwrap();
        assert!(!documents.is_empty());
        for (uri, text) in documents {
            assert!(is_std_uri(&uri));
            assert!(text.starts_with("---@meta"), "{} lacks @meta", uri.as_str());
        }
    }
}
