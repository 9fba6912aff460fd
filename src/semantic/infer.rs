use std::sync::Arc;

use super::SearchContext;
use crate::decl::{LuaDecl, LuaDeclKind};
use crate::index::{LuaMemberKey, LuaOperatorKind, LuaSignatureId, MemberOwner};
use crate::syntax::{
    integer_value, string_value, BinaryOperator, LuaSyntaxKind, LuaSyntaxNode, LuaTokenKind,
    UnaryOperator,
};
use crate::types::{
    narrow_falsy, narrow_truthy, remove_type, union_many, union_type, LuaMultiReturn, LuaType,
};
use crate::vfs::{DocumentId, LuaSyntaxId};

impl<'a> SearchContext<'a> {
    pub(super) fn infer_expr_uncached(&mut self, doc_id: DocumentId, expr: &LuaSyntaxNode) -> LuaType {
        match expr.kind() {
            LuaSyntaxKind::LiteralExpr => self.infer_literal(doc_id, expr),
            LuaSyntaxKind::NameExpr => self.infer_name(doc_id, expr),
            LuaSyntaxKind::IndexExpr => self.infer_index(doc_id, expr),
            LuaSyntaxKind::CallExpr => self.infer_call(doc_id, expr),
            LuaSyntaxKind::ParenExpr => match expr.exprs().next() {
                Some(inner) => self.infer_expr(doc_id, &inner).first_value(),
                None => LuaType::Unknown,
            },
            LuaSyntaxKind::TableExpr => self.infer_table(doc_id, expr),
            LuaSyntaxKind::ClosureExpr => {
                LuaType::Signature(LuaSignatureId::new(LuaSyntaxId::from_node(doc_id, expr)))
            }
            LuaSyntaxKind::UnaryExpr => self.infer_unary(doc_id, expr),
            LuaSyntaxKind::BinaryExpr => self.infer_binary(doc_id, expr),
            _ => LuaType::Unknown,
        }
    }

    fn infer_literal(&mut self, doc_id: DocumentId, expr: &LuaSyntaxNode) -> LuaType {
        let Some(token) = expr.child_tokens().next() else {
            return LuaType::Unknown;
        };
        match token.kind() {
            LuaTokenKind::Nil => LuaType::Nil,
            LuaTokenKind::True => LuaType::BooleanConst(true),
            LuaTokenKind::False => LuaType::BooleanConst(false),
            LuaTokenKind::Int => integer_value(token.text())
                .map(LuaType::IntegerConst)
                .unwrap_or(LuaType::Integer),
            LuaTokenKind::Float => LuaType::Number,
            LuaTokenKind::String | LuaTokenKind::LongString => {
                LuaType::string_const(&string_value(token.text()))
            }
            LuaTokenKind::Dots => {
                let decl = self
                    .index
                    .get_decl_tree(doc_id)
                    .and_then(|decls| decls.find_local_decl("...", token.range().start));
                match decl {
                    Some(decl) => self.get_decl_type(decl),
                    None => LuaType::MultiReturn(Arc::new(LuaMultiReturn::Base(LuaType::Any))),
                }
            }
            _ => LuaType::Unknown,
        }
    }

    fn infer_name(&mut self, doc_id: DocumentId, expr: &LuaSyntaxNode) -> LuaType {
        let Some(token) = expr.token(LuaTokenKind::Name) else {
            return LuaType::Unknown;
        };
        let name = token.text();
        let local = self
            .index
            .get_decl_tree(doc_id)
            .and_then(|decls| decls.find_local_decl(name, token.range().start));
        let ty = match local {
            Some(decl) => self.get_decl_type(decl),
            None => self.get_global_type(name),
        };
        self.narrow_reference(doc_id, expr, local, ty)
    }

    fn infer_index(&mut self, doc_id: DocumentId, expr: &LuaSyntaxNode) -> LuaType {
        let Some(prefix) = expr.exprs().next() else {
            return LuaType::Unknown;
        };
        let prefix_type = self.infer_expr(doc_id, &prefix).first_value();
        if let Some((key, _)) = LuaMemberKey::from_index_expr(expr) {
            if let Some(info) = self.find_member(&prefix_type, &key) {
                return info.ty;
            }
            // `t[1]` on an array or `t.x` on a map
            return self.index_access(&prefix_type, &key_type(&key));
        }
        let Some(key) = expr.exprs().nth(1) else {
            return LuaType::Unknown;
        };
        let key_type = self.infer_expr(doc_id, &key).first_value();
        self.index_access(&prefix_type, &key_type)
    }

    /// Value type of `prefix[key]` for array, map and object shapes.
    pub(crate) fn index_access(&mut self, prefix: &LuaType, key: &LuaType) -> LuaType {
        match prefix {
            LuaType::Array(base) if key.is_integer() || key.is_unknown() => base.as_ref().clone(),
            LuaType::Tuple(types) => match key {
                LuaType::IntegerConst(i) if *i >= 1 => types
                    .get(*i as usize - 1)
                    .cloned()
                    .unwrap_or(LuaType::Nil),
                _ => union_many(types.as_ref().clone()),
            },
            LuaType::Generic(generic) if generic.base.as_ref() == "table" => {
                generic.params.get(1).cloned().unwrap_or_default()
            }
            LuaType::Object(object) => object
                .index_access
                .iter()
                .find(|(access_key, _)| self.is_subtype(key, access_key))
                .map(|(_, value)| value.clone())
                .unwrap_or_default(),
            LuaType::Union(union) => {
                let types: Vec<_> = union
                    .types()
                    .iter()
                    .filter(|ty| !ty.is_nil())
                    .map(|ty| self.index_access(ty, key))
                    .collect();
                union_many(types)
            }
            LuaType::Ref(name) => {
                let operators: Vec<_> = self
                    .index
                    .query_operators(name)
                    .into_iter()
                    .filter(|op| op.kind == LuaOperatorKind::Index)
                    .cloned()
                    .collect();
                for operator in operators {
                    let accepts = operator
                        .operands
                        .first()
                        .map_or(true, |operand| self.is_subtype(key, operand));
                    if accepts {
                        return operator.result;
                    }
                }
                let resolved = self.resolve_alias(prefix);
                match resolved {
                    LuaType::Ref(_) | LuaType::Unknown => LuaType::Unknown,
                    other => self.index_access(&other, key),
                }
            }
            _ => LuaType::Unknown,
        }
    }

    fn infer_table(&mut self, doc_id: DocumentId, expr: &LuaSyntaxNode) -> LuaType {
        let id = LuaSyntaxId::from_node(doc_id, expr);
        match self.index.table_owner(&id) {
            Some(MemberOwner::Type(name)) => LuaType::Ref(name.clone()),
            Some(owner) => LuaType::TableConst(Arc::new(owner.clone())),
            None => LuaType::Table,
        }
    }

    fn infer_unary(&mut self, doc_id: DocumentId, expr: &LuaSyntaxNode) -> LuaType {
        let Some(op) = expr
            .child_tokens()
            .find_map(|token| UnaryOperator::from_token(token.kind()))
        else {
            return LuaType::Unknown;
        };
        let operand = match expr.exprs().next() {
            Some(operand) => self.infer_expr(doc_id, &operand).first_value(),
            None => LuaType::Unknown,
        };
        if let Some(result) = self.operator_result(&operand, op.operator_name(), None) {
            return result;
        }
        match op {
            UnaryOperator::Not => LuaType::Boolean,
            UnaryOperator::Len | UnaryOperator::BitNot => LuaType::Integer,
            UnaryOperator::Neg => match operand {
                LuaType::IntegerConst(value) => value
                    .checked_neg()
                    .map(LuaType::IntegerConst)
                    .unwrap_or(LuaType::Integer),
                ty if ty.is_integer() => LuaType::Integer,
                _ => LuaType::Number,
            },
        }
    }

    fn infer_binary(&mut self, doc_id: DocumentId, expr: &LuaSyntaxNode) -> LuaType {
        let Some(op) = expr
            .child_tokens()
            .find_map(|token| BinaryOperator::from_token(token.kind()))
        else {
            return LuaType::Unknown;
        };
        let mut operands = expr.exprs();
        let (Some(left), Some(right)) = (operands.next(), operands.next()) else {
            return LuaType::Unknown;
        };
        let left_type = self.infer_expr(doc_id, &left).first_value();
        let right_type = self.infer_expr(doc_id, &right).first_value();
        match op {
            BinaryOperator::And => union_type(narrow_falsy(&left_type), right_type),
            BinaryOperator::Or => match narrow_truthy(&left_type) {
                LuaType::Never => right_type,
                truthy => union_type(truthy, right_type),
            },
            BinaryOperator::Eq
            | BinaryOperator::Ne
            | BinaryOperator::Lt
            | BinaryOperator::Le
            | BinaryOperator::Gt
            | BinaryOperator::Ge => LuaType::Boolean,
            _ => {
                let name = op.operator_name();
                if let Some(result) = self
                    .operator_result(&left_type, name, Some(&right_type))
                    .or_else(|| self.operator_result(&right_type, name, Some(&left_type)))
                {
                    return result;
                }
                arithmetic_result(op, &left_type, &right_type)
            }
        }
    }

    /// Result of a `---@operator` declared on the class of `operand`.
    fn operator_result(
        &mut self,
        operand: &LuaType,
        name: Option<&str>,
        other: Option<&LuaType>,
    ) -> Option<LuaType> {
        let kind = LuaOperatorKind::from_name(name?)?;
        let LuaType::Ref(class) = operand else {
            return None;
        };
        let operators: Vec<_> = self
            .index
            .query_operators(class)
            .into_iter()
            .filter(|op| op.kind == kind)
            .cloned()
            .collect();
        let mut fallback = None;
        for operator in operators {
            match (operator.operands.first(), other) {
                (Some(expected), Some(other)) if self.is_subtype(other, expected) => {
                    return Some(operator.result);
                }
                (None, _) => return Some(operator.result),
                _ => {
                    fallback.get_or_insert(operator.result);
                }
            }
        }
        fallback
    }

    fn infer_call(&mut self, doc_id: DocumentId, call: &LuaSyntaxNode) -> LuaType {
        if let Some(ty) = self.infer_special_call(doc_id, call) {
            return ty;
        }
        match self.resolve_call(doc_id, call) {
            Some(matched) => matched.func.ret.clone(),
            None => LuaType::Unknown,
        }
    }

    /// `require("mod")` and `setmetatable(t, mt)` are understood directly.
    fn infer_special_call(&mut self, doc_id: DocumentId, call: &LuaSyntaxNode) -> Option<LuaType> {
        let callee = call.exprs().next()?;
        if callee.kind() != LuaSyntaxKind::NameExpr {
            return None;
        }
        let name_token = callee.token(LuaTokenKind::Name)?;
        let name = name_token.text();
        if !matches!(name, "require" | "setmetatable") {
            return None;
        }
        // a local shadowing the builtin is an ordinary call
        let shadowed = self
            .index
            .get_decl_tree(doc_id)
            .and_then(|decls| decls.find_local_decl(name, name_token.range().start))
            .is_some();
        if shadowed {
            return None;
        }
        let args: Vec<_> = call
            .child(LuaSyntaxKind::CallArgList)
            .map(|list| list.exprs().collect())
            .unwrap_or_default();
        match name {
            "require" => {
                let module = args.first()?;
                let LuaType::StringConst(module) = self.infer_expr(doc_id, module).first_value()
                else {
                    return None;
                };
                Some(self.infer_module(&module))
            }
            _ => {
                let table = args.first()?;
                Some(self.infer_expr(doc_id, table).first_value())
            }
        }
    }

    /// Type a document exports through its top-level `return`.
    pub fn infer_module(&mut self, module: &str) -> LuaType {
        let Some(doc_id) = self.index.modules().find(module) else {
            tracing::debug!(module, "unresolved require");
            return LuaType::Unknown;
        };
        let Some(expr) = self.index.module_return(doc_id) else {
            return LuaType::Nil;
        };
        self.infer_element(expr).first_value()
    }

    /// Loop variables: numeric loops count with the start value's type,
    /// generic loops take the values the iterator function returns.
    pub(super) fn infer_for_var(&mut self, decl: &LuaDecl) -> LuaType {
        let Some(tree) = self.tree(decl.id.doc_id) else {
            return LuaType::Unknown;
        };
        let Some(stat) = decl.syntax_id.to_node(&tree).and_then(|name| name.parent()) else {
            return LuaType::Unknown;
        };
        let doc_id = decl.id.doc_id;
        let position = stat
            .children_of(LuaSyntaxKind::ParamName)
            .position(|name| name.range().start == decl.range.start)
            .unwrap_or(0);
        match stat.kind() {
            LuaSyntaxKind::ForStat => {
                let types: Vec<_> = stat
                    .exprs()
                    .map(|expr| self.infer_expr(doc_id, &expr).first_value())
                    .collect();
                match types.iter().all(LuaType::is_integer) {
                    true => LuaType::Integer,
                    false => LuaType::Number,
                }
            }
            LuaSyntaxKind::ForRangeStat => {
                let Some(first) = stat.exprs().next() else {
                    return LuaType::Unknown;
                };
                let iterator = self.infer_expr(doc_id, &first);
                let function = iterator.first_value();
                let returns = self
                    .find_callable_type(&function)
                    .into_iter()
                    .next()
                    .map(|func| func.ret.clone())
                    .unwrap_or_default();
                let value = match returns {
                    LuaType::MultiReturn(multi) => multi.get(position).unwrap_or(LuaType::Nil),
                    ty if position == 0 => ty,
                    _ => LuaType::Unknown,
                };
                // the loop ends when the first value is nil
                match position {
                    0 => remove_type(&value, &LuaType::Nil),
                    _ => value,
                }
            }
            _ => LuaType::Unknown,
        }
    }

    /// An unannotated parameter of a function passed directly as a call
    /// argument takes the type the callee expects there.
    pub(super) fn infer_callback_param(&mut self, decl: &LuaDecl) -> Option<LuaType> {
        let LuaDeclKind::Param { index, signature } = &decl.kind else {
            return None;
        };
        let closure_id = signature.syntax_id();
        let tree = self.tree(closure_id.doc_id)?;
        let closure = closure_id.to_node(&tree)?;
        let arg_list = closure.parent()?;
        if arg_list.kind() != LuaSyntaxKind::CallArgList {
            return None;
        }
        let call = arg_list.parent()?;
        let arg_index = arg_list.exprs().position(|arg| arg.id() == closure.id())?;
        let matched = self.resolve_call(closure_id.doc_id, &call)?;
        let (_, expected) = matched.params.get(arg_index)?;
        let expected = expected.clone()?;
        let callback = self
            .find_callable_type(&expected)
            .into_iter()
            .next()?;
        callback.params.get(*index).and_then(|(_, ty)| ty.clone())
    }
}

fn key_type(key: &LuaMemberKey) -> LuaType {
    match key {
        LuaMemberKey::Name(name) => LuaType::StringConst(name.clone()),
        LuaMemberKey::Integer(value) => LuaType::IntegerConst(*value),
    }
}

fn arithmetic_result(op: BinaryOperator, left: &LuaType, right: &LuaType) -> LuaType {
    match op {
        BinaryOperator::Concat => LuaType::String,
        BinaryOperator::BitAnd
        | BinaryOperator::BitOr
        | BinaryOperator::BitXor
        | BinaryOperator::Shl
        | BinaryOperator::Shr => LuaType::Integer,
        BinaryOperator::Div | BinaryOperator::Pow => LuaType::Number,
        BinaryOperator::Add
        | BinaryOperator::Sub
        | BinaryOperator::Mul
        | BinaryOperator::IDiv
        | BinaryOperator::Mod => {
            if left.is_integer() && right.is_integer() {
                LuaType::Integer
            } else {
                LuaType::Number
            }
        }
        _ => LuaType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_keeps_integers() {
        assert_eq!(
            arithmetic_result(BinaryOperator::Add, &LuaType::IntegerConst(1), &LuaType::Integer),
            LuaType::Integer
        );
        assert_eq!(
            arithmetic_result(BinaryOperator::Div, &LuaType::Integer, &LuaType::Integer),
            LuaType::Number
        );
        assert_eq!(
            arithmetic_result(BinaryOperator::Mul, &LuaType::Number, &LuaType::Integer),
            LuaType::Number
        );
        assert_eq!(
            arithmetic_result(BinaryOperator::Concat, &LuaType::Integer, &LuaType::String),
            LuaType::String
        );
    }
}
