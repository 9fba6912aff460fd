use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::syntax::TextRange;
use crate::types::{ArcStr, LuaType};
use crate::vfs::DocumentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LuaTypeDeclKind {
    Class,
    Enum,
    Alias,
    Interface,
}

/// One `@class`/`@enum`/`@alias`/`@interface` tag.
#[derive(Debug, Clone, PartialEq)]
pub struct LuaTypeDeclPart {
    pub kind: LuaTypeDeclKind,
    pub range: TextRange,
    pub generic_params: Vec<(ArcStr, Option<LuaType>)>,
    /// Target of an alias.
    pub alias_origin: Option<LuaType>,
    /// `---@enum E: Base`
    pub enum_base: Option<LuaType>,
    pub attributes: Vec<String>,
    pub description: Option<String>,
}

/// A named type, possibly defined piecewise across documents.
///
/// The document with the lowest id is the main definition: its generic
/// parameters and alias target are the ones used. Removing it promotes the
/// next lowest, so the result never depends on analysis order.
#[derive(Debug, Clone, PartialEq)]
pub struct LuaTypeDecl {
    name: ArcStr,
    parts: BTreeMap<DocumentId, Vec<LuaTypeDeclPart>>,
}

impl LuaTypeDecl {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn main_doc(&self) -> Option<DocumentId> {
        self.parts.keys().next().copied()
    }

    pub fn main_part(&self) -> Option<&LuaTypeDeclPart> {
        self.parts.values().next()?.first()
    }

    pub fn kind(&self) -> LuaTypeDeclKind {
        self.main_part()
            .map(|part| part.kind)
            .unwrap_or(LuaTypeDeclKind::Class)
    }

    pub fn is_alias(&self) -> bool {
        self.kind() == LuaTypeDeclKind::Alias
    }

    pub fn is_enum(&self) -> bool {
        self.kind() == LuaTypeDeclKind::Enum
    }

    pub fn generic_params(&self) -> &[(ArcStr, Option<LuaType>)] {
        self.main_part()
            .map(|part| part.generic_params.as_slice())
            .unwrap_or_default()
    }

    pub fn alias_origin(&self) -> Option<&LuaType> {
        self.main_part()?.alias_origin.as_ref()
    }

    pub fn enum_base(&self) -> Option<&LuaType> {
        self.main_part()?.enum_base.as_ref()
    }

    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.parts()
            .any(|(_, part)| part.attributes.iter().any(|attr| attr == attribute))
    }

    pub fn parts(&self) -> impl Iterator<Item = (DocumentId, &LuaTypeDeclPart)> {
        self.parts
            .iter()
            .flat_map(|(doc, parts)| parts.iter().map(move |part| (*doc, part)))
    }

    pub fn documents(&self) -> impl Iterator<Item = DocumentId> + '_ {
        self.parts.keys().copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LuaTypeIndex {
    types: FxHashMap<ArcStr, LuaTypeDecl>,
    names_by_doc: FxHashMap<DocumentId, FxHashSet<ArcStr>>,
}

impl LuaTypeIndex {
    pub fn add(&mut self, doc_id: DocumentId, name: ArcStr, part: LuaTypeDeclPart) {
        let decl = self
            .types
            .entry(name.clone())
            .or_insert_with(|| LuaTypeDecl {
                name: name.clone(),
                parts: BTreeMap::new(),
            });
        decl.parts.entry(doc_id).or_default().push(part);
        self.names_by_doc.entry(doc_id).or_default().insert(name);
    }

    pub fn remove_doc(&mut self, doc_id: DocumentId) {
        let Some(names) = self.names_by_doc.remove(&doc_id) else {
            return;
        };
        for name in names {
            if let Some(decl) = self.types.get_mut(&name) {
                decl.parts.remove(&doc_id);
                if decl.parts.is_empty() {
                    self.types.remove(&name);
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&LuaTypeDecl> {
        self.types.get(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &LuaTypeDecl> {
        self.types.values()
    }

    pub fn names_of(&self, doc_id: DocumentId) -> impl Iterator<Item = &ArcStr> {
        self.names_by_doc.get(&doc_id).into_iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn part(kind: LuaTypeDeclKind, origin: Option<LuaType>) -> LuaTypeDeclPart {
        LuaTypeDeclPart {
            kind,
            range: TextRange::default(),
            generic_params: Vec::new(),
            alias_origin: origin,
            enum_base: None,
            attributes: Vec::new(),
            description: None,
        }
    }

    #[test]
    fn test_main_document_is_lowest_id() {
        let mut index = LuaTypeIndex::default();
        let name: ArcStr = Arc::from("A");
        index.add(DocumentId(3), name.clone(), part(LuaTypeDeclKind::Alias, Some(LuaType::String)));
        index.add(DocumentId(1), name.clone(), part(LuaTypeDeclKind::Alias, Some(LuaType::Integer)));

        let decl = index.get("A").unwrap();
        assert_eq!(decl.main_doc(), Some(DocumentId(1)));
        assert_eq!(decl.alias_origin(), Some(&LuaType::Integer));

        index.remove_doc(DocumentId(1));
        let decl = index.get("A").unwrap();
        assert_eq!(decl.main_doc(), Some(DocumentId(3)));
        assert_eq!(decl.alias_origin(), Some(&LuaType::String));

        index.remove_doc(DocumentId(3));
        assert!(index.get("A").is_none());
    }
}
