use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use rustc_hash::FxHashMap;

use super::DocumentId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    pub doc_id: DocumentId,
}

/// Maps `require` names to documents using the configured patterns.
#[derive(Debug, Default)]
pub struct ModuleIndex {
    roots: Vec<PathBuf>,
    patterns: Vec<String>,
    by_name: FxHashMap<String, BTreeSet<DocumentId>>,
    by_doc: FxHashMap<DocumentId, Vec<String>>,
}

impl ModuleIndex {
    pub fn new(roots: Vec<PathBuf>, patterns: Vec<String>) -> Self {
        Self {
            roots,
            patterns,
            ..Default::default()
        }
    }

    pub fn add(&mut self, doc_id: DocumentId, path: &Path) {
        self.remove(doc_id);
        let names = self.module_names(path);
        for name in &names {
            self.by_name.entry(name.clone()).or_default().insert(doc_id);
        }
        self.by_doc.insert(doc_id, names);
    }

    pub fn remove(&mut self, doc_id: DocumentId) {
        let Some(names) = self.by_doc.remove(&doc_id) else {
            return;
        };
        for name in names {
            if let Some(docs) = self.by_name.get_mut(&name) {
                docs.remove(&doc_id);
                if docs.is_empty() {
                    self.by_name.remove(&name);
                }
            }
        }
    }

    /// The document a `require(name)` resolves to. When several files claim
    /// the name the lowest id wins.
    pub fn find(&self, name: &str) -> Option<DocumentId> {
        self.by_name.get(name)?.iter().next().copied()
    }

    pub fn modules_of(&self, doc_id: DocumentId) -> Vec<ModuleInfo> {
        self.by_doc
            .get(&doc_id)
            .into_iter()
            .flatten()
            .map(|name| ModuleInfo {
                name: name.clone(),
                doc_id,
            })
            .collect()
    }

    fn module_names(&self, path: &Path) -> Vec<String> {
        let relative = self
            .roots
            .iter()
            .filter_map(|root| path.strip_prefix(root).ok())
            .min_by_key(|relative| relative.components().count())
            .map(slash_path)
            .unwrap_or_else(|| slash_path(path));

        let mut names = Vec::new();
        for pattern in &self.patterns {
            let Some((prefix, suffix)) = pattern.split_once('?') else {
                continue;
            };
            let Some(middle) = relative
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(suffix))
            else {
                continue;
            };
            if middle.is_empty() {
                continue;
            }
            let name = middle.replace('/', ".");
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Normal components joined by `/`, without any root or drive prefix.
fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> ModuleIndex {
        ModuleIndex::new(
            vec![PathBuf::from("/work")],
            vec!["?.lua".to_string(), "?/init.lua".to_string()],
        )
    }

    #[test]
    fn test_patterns_resolve_dotted_names() {
        let mut modules = index();
        modules.add(DocumentId(1), Path::new("/work/net/http.lua"));
        modules.add(DocumentId(2), Path::new("/work/net/init.lua"));

        assert_eq!(modules.find("net.http"), Some(DocumentId(1)));
        assert_eq!(modules.find("net"), Some(DocumentId(2)));
        assert_eq!(modules.find("http"), None);
    }

    #[test]
    fn test_remove_forgets_names() {
        let mut modules = index();
        modules.add(DocumentId(1), Path::new("/work/util.lua"));
        modules.remove(DocumentId(1));
        assert_eq!(modules.find("util"), None);
    }

    #[test]
    fn test_path_outside_roots_uses_absolute_path() {
        let mut modules = ModuleIndex::new(Vec::new(), vec!["?.lua".to_string()]);
        modules.add(DocumentId(3), Path::new("/util.lua"));
        assert_eq!(modules.find("util"), Some(DocumentId(3)));
    }
}
