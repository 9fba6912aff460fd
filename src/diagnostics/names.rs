use super::{DiagnosticCode, DiagnosticSink};
use crate::decl::{LuaDeclKind, Visibility};
use crate::index::{LuaMember, LuaMemberKey, MemberOwner};
use crate::semantic::SearchContext;
use crate::syntax::{LuaSyntaxKind, LuaSyntaxNode, LuaSyntaxTree, LuaTokenKind};
use crate::types::{ArcStr, LuaType};
use crate::vfs::DocumentId;

/// Globals every Lua runtime provides even without definition files.
static BUILTIN_GLOBALS: phf::Set<&'static str> = phf::phf_set! {
    "_G", "_ENV", "_VERSION", "arg", "self",
};

pub(super) fn check_syntax(
    _ctx: &mut SearchContext,
    _doc_id: DocumentId,
    tree: &LuaSyntaxTree,
    sink: &mut DiagnosticSink,
) {
    for error in tree.errors() {
        sink.push(DiagnosticCode::SyntaxError, error.range, error.message.clone());
    }
}

pub(super) fn check_names(
    ctx: &mut SearchContext,
    doc_id: DocumentId,
    tree: &LuaSyntaxTree,
    sink: &mut DiagnosticSink,
) {
    check_unused_locals(ctx, doc_id, sink);
    for node in tree.root().descendants() {
        match node.kind() {
            LuaSyntaxKind::NameExpr => check_name_expr(ctx, doc_id, &node, sink),
            LuaSyntaxKind::IndexExpr => check_index_expr(ctx, doc_id, &node, sink),
            _ => {}
        }
    }
}

fn check_unused_locals(ctx: &mut SearchContext, doc_id: DocumentId, sink: &mut DiagnosticSink) {
    let Some(decls) = ctx.index().get_decl_tree(doc_id) else {
        return;
    };
    for decl in decls.decls() {
        if !matches!(decl.kind, LuaDeclKind::Local { .. }) || decl.name.starts_with('_') {
            continue;
        }
        if decls.references(&decl.id).is_empty() {
            sink.push(
                DiagnosticCode::UnusedLocal,
                decl.range,
                format!("unused local `{}`", decl.name),
            );
        }
    }
}

fn check_name_expr(
    ctx: &mut SearchContext,
    doc_id: DocumentId,
    node: &LuaSyntaxNode,
    sink: &mut DiagnosticSink,
) {
    let Some(token) = node.token(LuaTokenKind::Name) else {
        return;
    };
    let name = token.text();
    let Some(decl) = ctx.resolve_name(doc_id, name, token.range().start) else {
        let is_configured = ctx.config().diagnostics.globals.iter().any(|global| global == name);
        if !is_configured && !BUILTIN_GLOBALS.contains(name) {
            sink.push(
                DiagnosticCode::UndefinedGlobal,
                token.range(),
                format!("undefined global `{name}`"),
            );
        }
        return;
    };
    // the declaring occurrence itself is not a use
    let is_definition = decl.id.doc_id == doc_id && decl.range == token.range();
    if decl.features.deprecated && !is_definition {
        sink.push(
            DiagnosticCode::Deprecated,
            token.range(),
            format!("`{name}` is deprecated"),
        );
    }
}

fn check_index_expr(
    ctx: &mut SearchContext,
    doc_id: DocumentId,
    node: &LuaSyntaxNode,
    sink: &mut DiagnosticSink,
) {
    let Some((key, range)) = LuaMemberKey::from_index_expr(node) else {
        return;
    };
    let Some(prefix) = node.exprs().next() else {
        return;
    };
    let prefix_type = ctx.infer_expr(doc_id, &prefix).first_value();
    let Some(member) = ctx.find_member(&prefix_type, &key).and_then(|info| info.member) else {
        return;
    };
    let is_definition = member.doc_id == doc_id && member.range == range;
    if is_definition {
        return;
    }
    if member.features.deprecated {
        sink.push(DiagnosticCode::Deprecated, range, format!("`{key}` is deprecated"));
    }
    if !is_accessible(ctx, doc_id, node, member) {
        sink.push(
            DiagnosticCode::AccessInvisible,
            range,
            format!("`{key}` is not accessible here"),
        );
    }
}

/// Private members are visible inside methods of their class, protected
/// ones also in subclasses, package ones in their own document.
fn is_accessible(
    ctx: &mut SearchContext,
    doc_id: DocumentId,
    access: &LuaSyntaxNode,
    member: &LuaMember,
) -> bool {
    match member.visibility {
        Visibility::Public => true,
        Visibility::Package => member.doc_id == doc_id,
        Visibility::Private | Visibility::Protected => {
            let MemberOwner::Type(owner) = &member.owner else {
                return member.doc_id == doc_id;
            };
            let Some(class) = enclosing_class(ctx, doc_id, access) else {
                return false;
            };
            match member.visibility {
                Visibility::Private => &class == owner,
                _ => ctx.inherits(&class, owner),
            }
        }
    }
}

/// The class of the method an expression is written in, from the prefix of
/// `function Class:method()`.
fn enclosing_class(ctx: &mut SearchContext, doc_id: DocumentId, node: &LuaSyntaxNode) -> Option<ArcStr> {
    for ancestor in node.ancestors() {
        if ancestor.kind() != LuaSyntaxKind::FuncStat {
            continue;
        }
        let prefix = ancestor.child(LuaSyntaxKind::IndexExpr)?.exprs().next()?;
        match ctx.infer_expr(doc_id, &prefix).first_value() {
            LuaType::Ref(name) => return Some(name),
            LuaType::Generic(generic) => return Some(generic.base.clone()),
            _ => {}
        }
    }
    None
}
