use rustc_hash::FxHashSet;

use super::{DiagnosticCode, DiagnosticSink};
use crate::index::{LuaTypeDecl, LuaTypeDeclKind, WorkspaceIndex};
use crate::semantic::SearchContext;
use crate::syntax::LuaSyntaxTree;
use crate::types::{ArcStr, LuaType};
use crate::vfs::DocumentId;

/// Checks the type declarations this document contributes.
pub(super) fn check_type_decls(
    ctx: &mut SearchContext,
    doc_id: DocumentId,
    _tree: &LuaSyntaxTree,
    sink: &mut DiagnosticSink,
) {
    let index = ctx.index();
    let mut names: Vec<&ArcStr> = index.type_names_of(doc_id).collect();
    names.sort();
    for name in names {
        let Some(decl) = index.query_type_decl(name) else {
            continue;
        };
        if decl.kind() == LuaTypeDeclKind::Class && reaches_itself(index, name) {
            for (_, part) in decl.parts().filter(|(doc, _)| *doc == doc_id) {
                sink.push(
                    DiagnosticCode::CircleDocClass,
                    part.range,
                    format!("class `{name}` inherits from itself"),
                );
            }
        }
        check_duplicate(decl, doc_id, sink);
    }
}

/// Classes may be split over several `@class` tags; aliases and enums are
/// defined once and a name never changes kind.
fn check_duplicate(decl: &LuaTypeDecl, doc_id: DocumentId, sink: &mut DiagnosticSink) {
    let main_kind = decl.kind();
    for (i, (doc, part)) in decl.parts().enumerate() {
        if i == 0 || doc != doc_id {
            continue;
        }
        let mergeable = matches!(main_kind, LuaTypeDeclKind::Class | LuaTypeDeclKind::Interface)
            && matches!(part.kind, LuaTypeDeclKind::Class | LuaTypeDeclKind::Interface);
        if !mergeable {
            sink.push(
                DiagnosticCode::DuplicateType,
                part.range,
                format!("type `{}` is already defined", decl.name()),
            );
        }
    }
}

fn reaches_itself(index: &WorkspaceIndex, name: &str) -> bool {
    let mut visited: FxHashSet<ArcStr> = FxHashSet::default();
    let mut pending: Vec<ArcStr> = super_names(index, name);
    while let Some(current) = pending.pop() {
        if current.as_ref() == name {
            return true;
        }
        if visited.insert(current.clone()) {
            pending.extend(super_names(index, &current));
        }
    }
    false
}

fn super_names(index: &WorkspaceIndex, name: &str) -> Vec<ArcStr> {
    index
        .query_supers(name)
        .into_iter()
        .filter_map(|super_type| match super_type {
            LuaType::Ref(name) => Some(name.clone()),
            LuaType::Generic(generic) => Some(generic.base.clone()),
            _ => None,
        })
        .collect()
}
