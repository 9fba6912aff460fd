use std::sync::Arc;

use super::{assign_targets, assigned_values, DocAnalysis, DocAttachment};
use crate::decl::{LuaDecl, LuaDeclKind};
use crate::index::{
    LuaMember, LuaMemberKey, LuaMemberSource, LuaReference, LuaReferenceKind, MemberOwner,
};
use crate::syntax::{LuaSyntaxKind, LuaSyntaxNode, LuaTokenKind, TextRange};
use crate::types::LuaType;
use crate::vfs::LuaSyntaxId;

/// Registers globals, table owners, members, references and the module
/// return value of one document.
pub(super) fn analyze(analysis: &mut DocAnalysis) {
    register_globals(analysis);

    let root = analysis.tree.root();
    for node in root.descendants() {
        match node.kind() {
            LuaSyntaxKind::LocalStat => resolve_local_stat(analysis, &node),
            LuaSyntaxKind::AssignStat => resolve_assign_stat(analysis, &node),
            LuaSyntaxKind::FuncStat => resolve_func_stat(analysis, &node),
            LuaSyntaxKind::TableExpr => resolve_table(analysis, &node),
            LuaSyntaxKind::NameExpr => record_name_reference(analysis, &node),
            LuaSyntaxKind::IndexExpr => {
                if let Some((LuaMemberKey::Name(name), range)) = LuaMemberKey::from_index_expr(&node) {
                    analysis.index.add_reference(
                        analysis.doc_id,
                        &name,
                        LuaReference {
                            range,
                            kind: LuaReferenceKind::Field,
                        },
                    );
                }
            }
            LuaSyntaxKind::TypeName => {
                if let Some(name) = node.token(LuaTokenKind::Name) {
                    analysis.index.add_reference(
                        analysis.doc_id,
                        name.text(),
                        LuaReference {
                            range: name.range(),
                            kind: LuaReferenceKind::TypeName,
                        },
                    );
                }
            }
            _ => {}
        }
    }

    let module_return = root
        .child(LuaSyntaxKind::Block)
        .and_then(|block| block.children_of(LuaSyntaxKind::ReturnStat).last())
        .and_then(|stat| stat.exprs().next());
    if let Some(expr) = module_return {
        let id = LuaSyntaxId::from_node(analysis.doc_id, &expr);
        analysis.index.set_module_return(analysis.doc_id, id);
    }
}

/// The statement a global declaration's name belongs to decides whether an
/// `@version` excluded it.
fn register_globals(analysis: &mut DocAnalysis) {
    let Some(decls) = analysis.index.get_decl_tree(analysis.doc_id) else {
        return;
    };
    let globals: Vec<_> = decls
        .decls()
        .filter(|decl| decl.is_global())
        .filter(|decl| {
            let stat = decl
                .syntax_id
                .to_node(analysis.tree)
                .and_then(|node| node.parent());
            !stat
                .and_then(|stat| analysis.attachments.get(&stat.id()))
                .is_some_and(|attachment| attachment.excluded)
        })
        .map(|decl| (decl.name.clone(), decl.id))
        .collect();
    for (name, id) in globals {
        analysis.index.add_global(&name, id);
    }
}

fn record_name_reference(analysis: &mut DocAnalysis, node: &LuaSyntaxNode) {
    let Some(token) = node.token(LuaTokenKind::Name) else {
        return;
    };
    let is_local = analysis
        .index
        .get_decl_tree(analysis.doc_id)
        .and_then(|decls| decls.find_local_decl(token.text(), token.range().start))
        .is_some();
    if is_local {
        return;
    }
    let is_write = node.parent().is_some_and(|parent| match parent.kind() {
        LuaSyntaxKind::AssignStat => assign_targets(&parent)
            .iter()
            .any(|target| target.id() == node.id()),
        LuaSyntaxKind::FuncStat => true,
        _ => false,
    });
    let kind = match is_write {
        true => LuaReferenceKind::Write,
        false => LuaReferenceKind::Read,
    };
    analysis.index.add_reference(
        analysis.doc_id,
        token.text(),
        LuaReference {
            range: token.range(),
            kind,
        },
    );
}

// ─── owners ────────────────────────────────────────────────────────────

/// A local declared as a class stores its members on the class.
fn local_owner(analysis: &DocAnalysis, decl: &LuaDecl) -> Option<MemberOwner> {
    if let Some(LuaType::Ref(class)) = &decl.declared_type {
        return Some(MemberOwner::Type(class.clone()));
    }
    if let LuaDeclKind::ImplicitSelf { signature } = &decl.kind {
        // `self` of `function a.b:c()` is whatever `a.b` is
        let closure = signature.syntax_id().to_node(analysis.tree)?;
        let stat = closure.parent()?;
        let prefix = stat.child(LuaSyntaxKind::IndexExpr)?.exprs().next()?;
        return owner_of_expr(analysis, &prefix);
    }
    Some(MemberOwner::Local(decl.id, Arc::from("")))
}

/// The owner a member written through `expr.key` lands on.
fn owner_of_expr(analysis: &DocAnalysis, expr: &LuaSyntaxNode) -> Option<MemberOwner> {
    match expr.kind() {
        LuaSyntaxKind::NameExpr => {
            let token = expr.token(LuaTokenKind::Name)?;
            let local = analysis
                .index
                .get_decl_tree(analysis.doc_id)?
                .find_local_decl(token.text(), token.range().start);
            match local {
                Some(decl) => local_owner(analysis, decl),
                None => Some(MemberOwner::Global(Arc::from(token.text()))),
            }
        }
        LuaSyntaxKind::IndexExpr => {
            let prefix = expr.exprs().next()?;
            let (key, _) = LuaMemberKey::from_index_expr(expr)?;
            owner_of_expr(analysis, &prefix)?.child(&key)
        }
        LuaSyntaxKind::ParenExpr => owner_of_expr(analysis, &expr.exprs().next()?),
        _ => None,
    }
}

fn set_owner_if_table(analysis: &mut DocAnalysis, value: Option<&LuaSyntaxNode>, owner: Option<MemberOwner>) {
    let (Some(value), Some(owner)) = (value, owner) else {
        return;
    };
    if value.kind() == LuaSyntaxKind::TableExpr {
        let id = LuaSyntaxId::from_node(analysis.doc_id, value);
        analysis.index.set_table_owner(id, owner);
    }
}

// ─── statements ────────────────────────────────────────────────────────

fn resolve_local_stat(analysis: &mut DocAnalysis, stat: &LuaSyntaxNode) {
    let values = assigned_values(stat);
    for (i, name) in stat.children_of(LuaSyntaxKind::LocalName).enumerate() {
        let Some(value) = values.get(i).filter(|value| value.kind() == LuaSyntaxKind::TableExpr)
        else {
            continue;
        };
        let Some(token) = name.token(LuaTokenKind::Name) else {
            continue;
        };
        let owner = analysis
            .index
            .get_decl_tree(analysis.doc_id)
            .and_then(|decls| decls.decl_at(token.range().start))
            .and_then(|decl| local_owner(analysis, decl));
        set_owner_if_table(analysis, Some(value), owner);
    }
}

fn resolve_assign_stat(analysis: &mut DocAnalysis, stat: &LuaSyntaxNode) {
    let attachment = analysis.attachments.get(&stat.id()).cloned();
    if attachment.as_ref().is_some_and(|attachment| attachment.excluded) {
        return;
    }
    let values = assigned_values(stat);
    for (i, target) in assign_targets(stat).into_iter().enumerate() {
        let value = values.get(i).copied();
        match target.kind() {
            LuaSyntaxKind::NameExpr => {
                let Some(token) = target.token(LuaTokenKind::Name) else {
                    continue;
                };
                let Some(decls) = analysis.index.get_decl_tree(analysis.doc_id) else {
                    continue;
                };
                let owner = match decls.decl_at(token.range().start) {
                    Some(decl) if decl.is_global() => {
                        Some(MemberOwner::Global(Arc::from(token.text())))
                    }
                    _ => decls
                        .find_local_decl(token.text(), token.range().start)
                        .and_then(|decl| local_owner(analysis, decl)),
                };
                set_owner_if_table(analysis, value.as_ref(), owner);
            }
            LuaSyntaxKind::IndexExpr => {
                let Some(prefix) = target.exprs().next() else {
                    continue;
                };
                let Some((key, range)) = LuaMemberKey::from_index_expr(&target) else {
                    continue;
                };
                let Some(owner) = owner_of_expr(analysis, &prefix) else {
                    continue;
                };
                set_owner_if_table(analysis, value.as_ref(), owner.child(&key));
                let member = new_member(
                    analysis,
                    owner,
                    key,
                    range,
                    &target,
                    LuaMemberSource::Assign,
                    value.as_ref(),
                    attachment.as_ref(),
                );
                analysis.index.add_member(member);
            }
            _ => {}
        }
    }
}

/// `function a.b.c()` and `function a:m()` define a member of `a.b` / `a`.
fn resolve_func_stat(analysis: &mut DocAnalysis, stat: &LuaSyntaxNode) {
    let attachment = analysis.attachments.get(&stat.id()).cloned();
    if attachment.as_ref().is_some_and(|attachment| attachment.excluded) {
        return;
    }
    let Some(name) = stat.child(LuaSyntaxKind::IndexExpr) else {
        return;
    };
    let Some(prefix) = name.exprs().next() else {
        return;
    };
    let Some((key, range)) = LuaMemberKey::from_index_expr(&name) else {
        return;
    };
    let Some(owner) = owner_of_expr(analysis, &prefix) else {
        return;
    };
    let closure = stat.child(LuaSyntaxKind::ClosureExpr);
    let member = new_member(
        analysis,
        owner,
        key,
        range,
        &name,
        LuaMemberSource::Assign,
        closure.as_ref(),
        attachment.as_ref(),
    );
    analysis.index.add_member(member);
}

/// Fields of a table constructor. Tables nested under a named key get an
/// owner derived from their parent so `a.b.c` resolves through them.
fn resolve_table(analysis: &mut DocAnalysis, table: &LuaSyntaxNode) {
    let table_id = LuaSyntaxId::from_node(analysis.doc_id, table);
    let owner = match analysis.index.table_owner(&table_id) {
        Some(owner) => owner.clone(),
        None => {
            let owner = MemberOwner::Element(table_id);
            analysis.index.set_table_owner(table_id, owner.clone());
            owner
        }
    };

    let mut position = 0;
    for field in table.children_of(LuaSyntaxKind::TableField) {
        let value = field.exprs().last();
        let (key, range) = match LuaMemberKey::from_table_field(&field) {
            Some(key) => key,
            None if field.has_token(LuaTokenKind::Assign) => continue,
            None => {
                position += 1;
                let range = value.map(|value| value.range()).unwrap_or(field.range());
                (LuaMemberKey::Integer(position), range)
            }
        };
        set_owner_if_table(analysis, value.as_ref(), owner.child(&key));
        let attachment = analysis.attachments.get(&field.id()).cloned();
        let member = new_member(
            analysis,
            owner.clone(),
            key,
            range,
            &field,
            LuaMemberSource::TableField,
            value.as_ref(),
            attachment.as_ref(),
        );
        analysis.index.add_member(member);
    }
}

#[allow(clippy::too_many_arguments)]
fn new_member(
    analysis: &DocAnalysis,
    owner: MemberOwner,
    key: LuaMemberKey,
    range: TextRange,
    syntax: &LuaSyntaxNode,
    source: LuaMemberSource,
    value: Option<&LuaSyntaxNode>,
    attachment: Option<&DocAttachment>,
) -> LuaMember {
    let declared_type = attachment.and_then(|attachment| {
        attachment
            .types
            .first()
            .cloned()
            .or_else(|| attachment.class.as_ref().map(|class| LuaType::Ref(class.clone())))
    });
    // `@mapping` publishes the member under another name
    let key = attachment
        .and_then(|attachment| attachment.mapping.as_deref())
        .map(LuaMemberKey::name)
        .unwrap_or(key);
    LuaMember {
        owner,
        key,
        doc_id: analysis.doc_id,
        range,
        syntax_id: LuaSyntaxId::from_node(analysis.doc_id, syntax),
        source,
        declared_type,
        value: value.map(|value| LuaSyntaxId::from_node(analysis.doc_id, value)),
        features: attachment.map(|attachment| attachment.features).unwrap_or_default(),
        visibility: attachment
            .and_then(|attachment| attachment.visibility)
            .unwrap_or_default(),
        description: attachment.and_then(|attachment| attachment.description.clone()),
        source_link: attachment.and_then(|attachment| attachment.source.clone()),
    }
}
