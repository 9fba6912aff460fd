//! Per-document analyzer passes.
//!
//! The passes run in a fixed order and only write into the
//! [`WorkspaceIndex`]; none of them infers types, so a document can be
//! analyzed without looking at any other document.

mod decl;
mod doc;
pub(crate) mod doc_type;
mod resolve;

use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::config::AnalysisConfig;
use crate::decl::{DeclFeatures, Visibility};
use crate::index::{LuaDocParamInfo, LuaDocReturnInfo, WorkspaceIndex};
use crate::line_index::LineIndex;
use crate::syntax::{LuaElementId, LuaSyntaxKind, LuaSyntaxNode, LuaSyntaxTree, LuaTokenKind};
use crate::types::{ArcStr, LuaFunctionType, LuaType};
use crate::vfs::{DocumentId, LuaDocument};

/// What the doc comment attached to one statement or table field says.
#[derive(Debug, Default, Clone)]
pub(crate) struct DocAttachment {
    /// `@class`, `@interface` or `@enum` declared right above a table.
    pub class: Option<ArcStr>,
    pub types: Vec<LuaType>,
    pub generics: Vec<(ArcStr, Option<LuaType>)>,
    pub params: Vec<LuaDocParamInfo>,
    pub returns: Vec<LuaDocReturnInfo>,
    pub overloads: Vec<Arc<LuaFunctionType>>,
    pub features: DeclFeatures,
    pub visibility: Option<Visibility>,
    pub source: Option<String>,
    pub mapping: Option<String>,
    /// An `@version` the configured runtime does not satisfy.
    pub excluded: bool,
    pub description: Option<String>,
}

impl DocAttachment {
    fn describes_function(&self) -> bool {
        !self.params.is_empty()
            || !self.returns.is_empty()
            || !self.generics.is_empty()
            || !self.overloads.is_empty()
            || self.features.is_async
            || self.features.nodiscard
            || self.description.is_some()
    }
}

pub(crate) struct DocAnalysis<'a> {
    pub doc_id: DocumentId,
    pub tree: &'a LuaSyntaxTree,
    pub path: Option<&'a Path>,
    pub line_index: &'a LineIndex,
    pub config: &'a AnalysisConfig,
    pub index: &'a mut WorkspaceIndex,
    /// Keyed by the statement or table field the comment belongs to.
    pub attachments: FxHashMap<LuaElementId, DocAttachment>,
}

#[tracing::instrument(skip_all, fields(doc = document.id().0))]
pub(crate) fn analyze_document(
    document: &LuaDocument,
    config: &AnalysisConfig,
    index: &mut WorkspaceIndex,
) {
    let tree = document.tree();
    let mut analysis = DocAnalysis {
        doc_id: document.id(),
        tree: &tree,
        path: document.path().map(|path| path.as_path()),
        line_index: document.line_index(),
        config,
        index,
        attachments: FxHashMap::default(),
    };
    decl::analyze(&mut analysis);
    doc::analyze(&mut analysis);
    resolve::analyze(&mut analysis);
}

/// The function a statement or table field defines, if any.
pub(crate) fn defined_closure<'a>(node: &LuaSyntaxNode<'a>) -> Option<LuaSyntaxNode<'a>> {
    match node.kind() {
        LuaSyntaxKind::LocalFuncStat | LuaSyntaxKind::FuncStat => {
            node.child(LuaSyntaxKind::ClosureExpr)
        }
        LuaSyntaxKind::LocalStat | LuaSyntaxKind::AssignStat | LuaSyntaxKind::TableField => {
            assigned_values(node)
                .into_iter()
                .next()
                .filter(|value| value.kind() == LuaSyntaxKind::ClosureExpr)
        }
        _ => None,
    }
}

/// Expressions on the right of `=` in a local, assignment or table field.
pub(crate) fn assigned_values<'a>(node: &LuaSyntaxNode<'a>) -> Vec<LuaSyntaxNode<'a>> {
    match node.kind() {
        LuaSyntaxKind::LocalStat => node.exprs().collect(),
        LuaSyntaxKind::AssignStat => {
            let Some(assign) = node.token(LuaTokenKind::Assign) else {
                return Vec::new();
            };
            let split = assign.range().end;
            node.exprs().filter(|expr| expr.range().start >= split).collect()
        }
        LuaSyntaxKind::TableField => node.exprs().last().into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Targets on the left of `=` in an assignment.
pub(crate) fn assign_targets<'a>(node: &LuaSyntaxNode<'a>) -> Vec<LuaSyntaxNode<'a>> {
    let Some(assign) = node.token(LuaTokenKind::Assign) else {
        return Vec::new();
    };
    let split = assign.range().start;
    node.exprs().filter(|expr| expr.range().end <= split).collect()
}
