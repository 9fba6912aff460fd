use super::{DiagnosticCode, DiagnosticSink};
use crate::compilation::analyzer::{assign_targets, assigned_values};
use crate::index::{LuaMemberKey, LuaSignature, LuaSignatureId};
use crate::semantic::{CallableMatch, SearchContext};
use crate::syntax::{LuaSyntaxKind, LuaSyntaxNode, LuaSyntaxTree, LuaTokenKind, TextRange};
use crate::types::LuaType;
use crate::vfs::{DocumentId, LuaSyntaxId};

/// Call arguments, returns and assignments checked against declared types.
pub(super) fn check_flow(
    ctx: &mut SearchContext,
    doc_id: DocumentId,
    tree: &LuaSyntaxTree,
    sink: &mut DiagnosticSink,
) {
    for node in tree.root().descendants() {
        if ctx.is_cancelled() {
            return;
        }
        match node.kind() {
            LuaSyntaxKind::CallExpr => check_call(ctx, doc_id, &node, sink),
            LuaSyntaxKind::ClosureExpr => check_returns(ctx, doc_id, &node, sink),
            LuaSyntaxKind::LocalStat => check_local_stat(ctx, doc_id, &node, sink),
            LuaSyntaxKind::AssignStat => check_assign_stat(ctx, doc_id, &node, sink),
            _ => {}
        }
    }
}

fn signature_of<'a>(ctx: &SearchContext<'a>, doc_id: DocumentId, closure: &LuaSyntaxNode) -> Option<&'a LuaSignature> {
    let id = LuaSignatureId::new(LuaSyntaxId::from_node(doc_id, closure));
    ctx.index().get_signature(&id)
}

// ─── calls ─────────────────────────────────────────────────────────────

fn check_call(ctx: &mut SearchContext, doc_id: DocumentId, call: &LuaSyntaxNode, sink: &mut DiagnosticSink) {
    let Some(matched) = ctx.resolve_call(doc_id, call) else {
        return;
    };
    let args: Vec<LuaSyntaxNode> = call
        .child(LuaSyntaxKind::CallArgList)
        .map(|list| list.exprs().collect())
        .unwrap_or_default();

    check_arguments(ctx, doc_id, &matched, &args, sink);
    check_arity(&matched, &args, call, sink);

    let signature = matched
        .signature
        .and_then(|id| ctx.index().get_signature(&id));
    let nodiscard = signature.is_some_and(|signature| signature.nodiscard);
    let is_statement = call
        .parent()
        .is_some_and(|parent| parent.kind() == LuaSyntaxKind::CallExprStat);
    if nodiscard && is_statement {
        sink.push(
            DiagnosticCode::DiscardReturns,
            call.range(),
            "the return values of this call should be used",
        );
    }

    let is_async = matched.func.is_async || signature.is_some_and(|signature| signature.is_async);
    if is_async && !in_async_function(ctx, doc_id, call) {
        sink.push(
            DiagnosticCode::AwaitInSync,
            call.range(),
            "async function called from a synchronous function",
        );
    }
}

fn check_arguments(
    ctx: &mut SearchContext,
    doc_id: DocumentId,
    matched: &CallableMatch,
    args: &[LuaSyntaxNode],
    sink: &mut DiagnosticSink,
) {
    for (arg, (name, expected)) in args.iter().zip(matched.params.iter()) {
        let Some(expected) = expected else {
            continue;
        };
        let actual = ctx.infer_expr(doc_id, arg).first_value();
        if !ctx.is_subtype(&actual, expected) {
            let message = format!(
                "argument `{name}` expects `{}`, found `{}`",
                ctx.humanize_type(expected),
                ctx.humanize_type(&actual),
            );
            sink.push(DiagnosticCode::ParamTypeNotMatch, arg.range(), message);
        }
    }
}

fn check_arity(matched: &CallableMatch, args: &[LuaSyntaxNode], call: &LuaSyntaxNode, sink: &mut DiagnosticSink) {
    let params = &matched.func.params;
    if !matched.func.is_vararg() {
        for arg in args.iter().skip(params.len()) {
            sink.push(DiagnosticCode::RedundantParameter, arg.range(), "redundant argument");
        }
    }

    // a trailing call or `...` may supply any number of values
    let spreads = args
        .last()
        .is_some_and(|arg| arg.kind() == LuaSyntaxKind::CallExpr || arg.has_token(LuaTokenKind::Dots));
    if spreads {
        return;
    }
    for (name, expected) in params.iter().skip(args.len()) {
        if name == "..." {
            break;
        }
        let Some(expected) = expected else {
            continue;
        };
        if !expected.is_optional() {
            sink.push(
                DiagnosticCode::MissingParameter,
                call.range(),
                format!("missing argument `{name}`"),
            );
        }
    }
}

/// The innermost function around `node` is marked `@async`. Top-level code
/// counts as synchronous.
fn in_async_function(ctx: &SearchContext, doc_id: DocumentId, node: &LuaSyntaxNode) -> bool {
    node.ancestors()
        .find(|ancestor| ancestor.kind() == LuaSyntaxKind::ClosureExpr)
        .and_then(|closure| signature_of(ctx, doc_id, &closure))
        .is_some_and(|signature| signature.is_async)
}

// ─── returns ───────────────────────────────────────────────────────────

fn check_returns(ctx: &mut SearchContext, doc_id: DocumentId, closure: &LuaSyntaxNode, sink: &mut DiagnosticSink) {
    let Some(signature) = signature_of(ctx, doc_id, closure) else {
        return;
    };
    if !signature.has_doc_returns() {
        return;
    }
    let expected: Vec<LuaType> = signature.return_docs.iter().map(|ret| ret.ty.clone()).collect();

    let Some(body) = closure.child(LuaSyntaxKind::Block) else {
        return;
    };
    for stat in return_stats(&body) {
        check_return_stat(ctx, doc_id, &stat, &expected, sink);
    }

    let needs_value = expected.iter().any(|ty| !ty.is_optional());
    if needs_value && !block_always_returns(&body) {
        let range = closure
            .token(LuaTokenKind::End)
            .map(|end| end.range())
            .unwrap_or_else(|| closure.range());
        sink.push(DiagnosticCode::MissingReturn, range, "missing return value");
    }
}

fn check_return_stat(
    ctx: &mut SearchContext,
    doc_id: DocumentId,
    stat: &LuaSyntaxNode,
    expected: &[LuaType],
    sink: &mut DiagnosticSink,
) {
    let exprs: Vec<LuaSyntaxNode> = stat.exprs().collect();
    let actual = ctx.expr_list_types(doc_id, exprs.iter().copied());
    for (i, expected) in expected.iter().enumerate() {
        let found = match actual.get(i) {
            Some(found) => found.first_value(),
            None => match actual.last() {
                // an unbounded tail supplies every remaining position
                Some(LuaType::MultiReturn(tail)) => tail.get(0).unwrap_or(LuaType::Nil),
                _ => LuaType::Nil,
            },
        };
        if ctx.is_subtype(&found, expected) {
            continue;
        }
        let range = exprs.get(i).map(|expr| expr.range()).unwrap_or_else(|| stat.range());
        let message = format!(
            "return value {} expects `{}`, found `{}`",
            i + 1,
            ctx.humanize_type(expected),
            ctx.humanize_type(&found),
        );
        sink.push(DiagnosticCode::ReturnTypeMismatch, range, message);
    }
}

/// `return` statements of a function body, not those of nested functions.
fn return_stats<'a>(body: &LuaSyntaxNode<'a>) -> Vec<LuaSyntaxNode<'a>> {
    let mut found = Vec::new();
    let mut stack = vec![*body];
    while let Some(node) = stack.pop() {
        for child in node.child_nodes() {
            match child.kind() {
                LuaSyntaxKind::ClosureExpr => {}
                LuaSyntaxKind::ReturnStat => found.push(child),
                _ => stack.push(child),
            }
        }
    }
    found.sort_by_key(|stat| stat.range().start);
    found
}

/// Every path through the block ends in `return` or a call to `error`.
fn block_always_returns(block: &LuaSyntaxNode) -> bool {
    let Some(last) = block
        .child_nodes()
        .filter(|stat| stat.kind().is_stat() && stat.kind() != LuaSyntaxKind::EmptyStat)
        .last()
    else {
        return false;
    };
    match last.kind() {
        LuaSyntaxKind::ReturnStat => true,
        LuaSyntaxKind::DoStat | LuaSyntaxKind::RepeatStat => last
            .child(LuaSyntaxKind::Block)
            .is_some_and(|inner| block_always_returns(&inner)),
        LuaSyntaxKind::IfStat => {
            let Some(else_clause) = last.child(LuaSyntaxKind::ElseClause) else {
                return false;
            };
            let branches = std::iter::once(last)
                .chain(last.children_of(LuaSyntaxKind::ElseIfClause))
                .chain(std::iter::once(else_clause));
            branches
                .map(|branch| branch.child(LuaSyntaxKind::Block))
                .all(|inner| inner.is_some_and(|inner| block_always_returns(&inner)))
        }
        LuaSyntaxKind::CallExprStat => last
            .child(LuaSyntaxKind::CallExpr)
            .and_then(|call| call.exprs().next())
            .is_some_and(|callee| {
                callee.kind() == LuaSyntaxKind::NameExpr && callee.name_text() == Some("error")
            }),
        _ => false,
    }
}

// ─── assignments ───────────────────────────────────────────────────────

fn check_local_stat(ctx: &mut SearchContext, doc_id: DocumentId, stat: &LuaSyntaxNode, sink: &mut DiagnosticSink) {
    let Some(decls) = ctx.index().get_decl_tree(doc_id) else {
        return;
    };
    let values = assigned_values(stat);
    let types = ctx.expr_list_types(doc_id, values.iter().copied());
    for (i, name) in stat.children_of(LuaSyntaxKind::LocalName).enumerate() {
        let Some(token) = name.token(LuaTokenKind::Name) else {
            continue;
        };
        let Some(declared) = decls
            .decl_at(token.range().start)
            .and_then(|decl| decl.declared_type.clone())
        else {
            continue;
        };
        check_assigned(ctx, &declared, types.get(i), value_range(&values, i), sink);
    }
}

fn check_assign_stat(ctx: &mut SearchContext, doc_id: DocumentId, stat: &LuaSyntaxNode, sink: &mut DiagnosticSink) {
    let values = assigned_values(stat);
    let types = ctx.expr_list_types(doc_id, values.iter().copied());
    for (i, target) in assign_targets(stat).iter().enumerate() {
        let declared = match target.kind() {
            LuaSyntaxKind::NameExpr => target
                .token(LuaTokenKind::Name)
                .and_then(|token| ctx.resolve_name(doc_id, token.text(), token.range().start))
                .and_then(|decl| decl.declared_type.clone()),
            LuaSyntaxKind::IndexExpr => {
                let Some((key, _)) = LuaMemberKey::from_index_expr(target) else {
                    continue;
                };
                let Some(prefix) = target.exprs().next() else {
                    continue;
                };
                let prefix_type = ctx.infer_expr(doc_id, &prefix).first_value();
                ctx.find_member(&prefix_type, &key)
                    .filter(|info| info.member.is_some_and(|member| member.declared_type.is_some()))
                    .map(|info| info.ty)
            }
            _ => None,
        };
        if let Some(declared) = declared {
            check_assigned(ctx, &declared, types.get(i), value_range(&values, i), sink);
        }
    }
}

fn value_range(values: &[LuaSyntaxNode], i: usize) -> Option<TextRange> {
    values.get(i).or(values.last()).map(|value| value.range())
}

fn check_assigned(
    ctx: &mut SearchContext,
    declared: &LuaType,
    actual: Option<&LuaType>,
    range: Option<TextRange>,
    sink: &mut DiagnosticSink,
) {
    let (Some(actual), Some(range)) = (actual, range) else {
        return;
    };
    let actual = actual.first_value();
    if ctx.is_subtype(&actual, declared) {
        return;
    }
    let message = format!(
        "cannot assign `{}` to `{}`",
        ctx.humanize_type(&actual),
        ctx.humanize_type(declared),
    );
    sink.push(DiagnosticCode::TypeNotMatch, range, message);
}
