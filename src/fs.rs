use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use tower_lsp_server::lsp_types::Uri;
use walkdir::{DirEntry, WalkDir};

use crate::error::Result;
use crate::vfs::file_uri;

/// Where workspace sources come from.
pub trait FS: Sync + Send + Debug {
    fn read(&self, path: &Path) -> Result<String>;
    /// Every `*.lua` file at or below `root`, sorted.
    fn lua_files(&self, root: &Path) -> Result<Vec<PathBuf>>;
}

fn is_lua_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "lua")
}

/// Hidden directories hold tooling state, not sources. The walk root itself
/// is never skipped.
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

#[derive(Debug, Default)]
pub struct MemoryFS {
    files: DashMap<PathBuf, String>,
}

impl MemoryFS {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&self, path: impl Into<PathBuf>, content: &str) {
        self.files.insert(path.into(), content.to_string());
    }
}

impl FS for MemoryFS {
    fn read(&self, path: &Path) -> Result<String> {
        self.files
            .get(path)
            .map(|file| file.clone())
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, path.display().to_string()).into())
    }

    fn lua_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = self
            .files
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|path| path.starts_with(root) && is_lua_file(path))
            .collect();
        paths.sort();
        Ok(paths)
    }
}

#[derive(Debug, Default)]
pub struct LocalFs {}

impl LocalFs {
    pub fn new() -> Self {
        LocalFs {}
    }
}

impl FS for LocalFs {
    fn read(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }

    fn lua_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if root.is_file() {
            return Ok(vec![root.to_path_buf()]);
        }
        let mut found = Vec::new();
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry))
        {
            let entry = entry?;
            if entry.file_type().is_file() && is_lua_file(entry.path()) {
                found.push(entry.into_path());
            }
        }
        found.sort();
        Ok(found)
    }
}

/// Reads every Lua file under `roots`, ready for
/// [`Compilation::add_documents`](crate::compilation::Compilation::add_documents).
#[tracing::instrument(skip(fs))]
pub fn load_workspace(fs: &dyn FS, roots: &[PathBuf]) -> Result<Vec<(Uri, String)>> {
    let mut documents = Vec::new();
    for root in roots {
        for path in fs.lua_files(root)? {
            let text = fs.read(&path)?;
            let absolute = match path.is_absolute() {
                true => path,
                false => std::env::current_dir()?.join(path),
            };
            documents.push((file_uri(&absolute)?, text));
        }
    }
    tracing::debug!(count = documents.len(), "workspace files loaded");
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_fs_lists_lua_files_under_root() {
        let fs = MemoryFS::new();
        fs.write("/ws/b.lua", "return 2");
        fs.write("/ws/sub/a.lua", "return 1");
        fs.write("/ws/readme.md", "");
        fs.write("/other/c.lua", "");

        let files = fs.lua_files(Path::new("/ws")).unwrap();
        assert_eq!(files, vec![PathBuf::from("/ws/b.lua"), PathBuf::from("/ws/sub/a.lua")]);
        assert!(fs.read(Path::new("/ws/missing.lua")).is_err());
    }

    #[test]
    fn test_local_fs_skips_hidden_directories() {
        let root = std::env::temp_dir().join(format!("lua-lsp-walk-{}", std::process::id()));
        std::fs::create_dir_all(root.join("src/nested")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join("src/main.lua"), "return 1").unwrap();
        std::fs::write(root.join("src/nested/util.lua"), "return 2").unwrap();
        std::fs::write(root.join("src/notes.txt"), "").unwrap();
        std::fs::write(root.join(".git/hook.lua"), "return 3").unwrap();

        let files = LocalFs::new().lua_files(&root).unwrap();
        std::fs::remove_dir_all(&root).unwrap();
        assert_eq!(
            files,
            vec![root.join("src/main.lua"), root.join("src/nested/util.lua")]
        );
    }
}
