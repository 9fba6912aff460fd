use super::SearchContext;
use crate::decl::LuaDecl;
use crate::syntax::{LuaSyntaxKind, LuaSyntaxNode, LuaTokenKind};
use crate::types::{narrow_truthy, remove_type, LuaType};
use crate::vfs::DocumentId;

/// What a condition proves about a name inside the code it guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition {
    Truthy,
    NotNil,
}

impl<'a> SearchContext<'a> {
    /// Narrows the type of a name reference by the `if` conditions and
    /// `and` operands guarding it.
    pub(super) fn narrow_reference(
        &mut self,
        doc_id: DocumentId,
        reference: &LuaSyntaxNode,
        decl: Option<&LuaDecl>,
        ty: LuaType,
    ) -> LuaType {
        if !matches!(ty, LuaType::Union(_) | LuaType::Boolean) {
            return ty;
        }
        let Some(name) = reference.name_text() else {
            return ty;
        };
        let mut ty = ty;
        let mut child = *reference;
        for ancestor in reference.ancestors() {
            let guard = match ancestor.kind() {
                // `x and x.field`: the right operand only runs when `x` is truthy
                LuaSyntaxKind::BinaryExpr if ancestor.has_token(LuaTokenKind::And) => {
                    let mut operands = ancestor.exprs();
                    match (operands.next(), operands.next()) {
                        (Some(left), Some(right)) if right.id() == child.id() => Some(left),
                        _ => None,
                    }
                }
                LuaSyntaxKind::IfStat | LuaSyntaxKind::ElseIfClause
                    if child.kind() == LuaSyntaxKind::Block =>
                {
                    ancestor.exprs().next()
                }
                // a function body may run long after the check
                LuaSyntaxKind::ClosureExpr => break,
                _ => None,
            };
            if let Some(guard) = guard {
                if let Some(condition) = condition_on(&guard, name) {
                    if self.same_binding(doc_id, &guard, name, decl) {
                        ty = match condition {
                            Condition::Truthy => narrow_truthy(&ty),
                            Condition::NotNil => remove_type(&ty, &LuaType::Nil),
                        };
                    }
                }
            }
            child = ancestor;
        }
        match ty {
            LuaType::Never => LuaType::Unknown,
            ty => ty,
        }
    }

    /// The name inside a guard resolves to the same declaration as the
    /// narrowed reference.
    fn same_binding(
        &self,
        doc_id: DocumentId,
        guard: &LuaSyntaxNode,
        name: &str,
        decl: Option<&LuaDecl>,
    ) -> bool {
        let Some(token) = guard
            .descendants()
            .filter(|node| node.kind() == LuaSyntaxKind::NameExpr)
            .find_map(|node| node.token(LuaTokenKind::Name).filter(|token| token.text() == name))
        else {
            return false;
        };
        let guard_decl = self
            .index
            .get_decl_tree(doc_id)
            .and_then(|decls| decls.find_local_decl(name, token.range().start));
        guard_decl.map(|decl| decl.id) == decl.map(|decl| decl.id)
    }
}

/// `x`, `x ~= nil` and `nil ~= x` guard `x`.
fn condition_on(guard: &LuaSyntaxNode, name: &str) -> Option<Condition> {
    match guard.kind() {
        LuaSyntaxKind::NameExpr if guard.name_text() == Some(name) => Some(Condition::Truthy),
        LuaSyntaxKind::ParenExpr => condition_on(&guard.exprs().next()?, name),
        LuaSyntaxKind::BinaryExpr if guard.has_token(LuaTokenKind::Ne) => {
            let mut operands = guard.exprs();
            let (left, right) = (operands.next()?, operands.next()?);
            let is_name = |node: &LuaSyntaxNode| {
                node.kind() == LuaSyntaxKind::NameExpr && node.name_text() == Some(name)
            };
            let is_nil = |node: &LuaSyntaxNode| {
                node.kind() == LuaSyntaxKind::LiteralExpr && node.has_token(LuaTokenKind::Nil)
            };
            ((is_name(&left) && is_nil(&right)) || (is_nil(&left) && is_name(&right)))
                .then_some(Condition::NotNil)
        }
        // both sides of `a and b` hold when the whole holds
        LuaSyntaxKind::BinaryExpr if guard.has_token(LuaTokenKind::And) => {
            let mut operands = guard.exprs();
            let (left, right) = (operands.next()?, operands.next()?);
            condition_on(&left, name).or_else(|| condition_on(&right, name))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn condition(source: &str) -> Option<Condition> {
        let tree = parse(source);
        let guard = tree
            .root()
            .descendants()
            .find(|node| node.kind() == LuaSyntaxKind::IfStat)
            .and_then(|stat| stat.exprs().next())
            .unwrap();
        condition_on(&guard, "value")
    }

    #[test]
    fn test_guard_shapes() {
        assert_eq!(condition("if value then end"), Some(Condition::Truthy));
        assert_eq!(condition("if value ~= nil then end"), Some(Condition::NotNil));
        assert_eq!(condition("if nil ~= value then end"), Some(Condition::NotNil));
        assert_eq!(condition("if ok and value then end"), Some(Condition::Truthy));
        assert_eq!(condition("if value == nil then end"), None);
        assert_eq!(condition("if other then end"), None);
    }
}
