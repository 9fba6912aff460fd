use std::sync::Arc;

use super::SearchContext;
use crate::index::{LuaMemberKey, LuaOperatorKind, LuaSignatureId};
use crate::syntax::{LuaSyntaxKind, LuaSyntaxNode, LuaTokenKind};
use crate::types::{
    flatten_multi, instantiate_function, remove_type, union_many, union_type, ArcStr,
    LuaFunctionType, LuaMultiReturn, LuaType, TypeSubstitutor,
};
use crate::vfs::{DocumentId, LuaSyntaxId};

/// The signature chosen for one call site, instantiated for its arguments
/// and shifted to the call's `.`/`:` convention.
#[derive(Debug, Clone, PartialEq)]
pub struct CallableMatch {
    pub func: LuaFunctionType,
    /// Expected parameter for each explicit argument, vararg expanded.
    pub params: Vec<(String, Option<LuaType>)>,
    /// Position among the candidates: 0 is the main signature.
    pub candidate: usize,
    pub signature: Option<LuaSignatureId>,
}

impl<'a> SearchContext<'a> {
    /// The callable shapes of a type: a code function's main signature
    /// followed by its overloads, a doc function type, the `call` operator
    /// of a class, or all of those for each alternative of a union.
    pub fn find_callable_type(&mut self, ty: &LuaType) -> Vec<Arc<LuaFunctionType>> {
        match ty {
            LuaType::Signature(id) => {
                let main = self.signature_function(*id);
                let is_colon_define = main.is_colon_define;
                let mut shapes = vec![Arc::new(main)];
                if let Some(signature) = self.index.get_signature(id) {
                    shapes.extend(signature.overloads.iter().map(|overload| {
                        let mut overload = overload.as_ref().clone();
                        overload.is_colon_define = is_colon_define;
                        Arc::new(overload)
                    }));
                }
                shapes
            }
            LuaType::DocFunction(func) => vec![func.clone()],
            LuaType::Function => vec![Arc::new(LuaFunctionType::new(
                vec![("...".to_string(), Some(LuaType::Any))],
                LuaType::Unknown,
            ))],
            LuaType::Ref(name) => {
                let calls: Vec<_> = self
                    .index
                    .query_operators(name)
                    .into_iter()
                    .filter(|op| op.kind == LuaOperatorKind::Call)
                    .map(|op| {
                        let params = op
                            .operands
                            .iter()
                            .enumerate()
                            .map(|(i, operand)| (format!("p{}", i + 1), Some(operand.clone())))
                            .collect();
                        Arc::new(LuaFunctionType::new(params, op.result.clone()))
                    })
                    .collect();
                if !calls.is_empty() {
                    return calls;
                }
                match self.resolve_alias(ty) {
                    LuaType::Ref(_) | LuaType::Unknown => Vec::new(),
                    resolved => self.find_callable_type(&resolved),
                }
            }
            LuaType::Generic(_) => match self.resolve_alias(ty) {
                LuaType::Generic(_) | LuaType::Unknown => Vec::new(),
                resolved => self.find_callable_type(&resolved),
            },
            LuaType::Union(union) => union
                .types()
                .iter()
                .filter(|ty| !ty.is_nil())
                .flat_map(|ty| self.find_callable_type(ty))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Main signature of a function defined in code. Without `@return` the
    /// result is inferred from the `return` statements of its body.
    pub fn signature_function(&mut self, id: LuaSignatureId) -> LuaFunctionType {
        let Some(signature) = self.index.get_signature(&id) else {
            return LuaFunctionType::default();
        };
        let ret = match signature.has_doc_returns() {
            true => signature.doc_return_type(),
            false => self.infer_body_returns(id.syntax_id()),
        };
        signature.to_function_type(ret)
    }

    fn infer_body_returns(&mut self, closure: LuaSyntaxId) -> LuaType {
        let Some(tree) = self.tree(closure.doc_id) else {
            return LuaType::Unknown;
        };
        let Some(body) = closure
            .to_node(&tree)
            .and_then(|closure| closure.child(LuaSyntaxKind::Block))
        else {
            return LuaType::Nil;
        };
        let mut positions: Vec<Vec<LuaType>> = Vec::new();
        let mut returns = 0;
        let mut stack = vec![body];
        while let Some(node) = stack.pop() {
            for child in node.child_nodes() {
                match child.kind() {
                    // nested functions return for themselves
                    LuaSyntaxKind::ClosureExpr => {}
                    LuaSyntaxKind::ReturnStat => {
                        let values = self.expr_list_types(closure.doc_id, child.exprs());
                        if values.len() > positions.len() {
                            positions.resize_with(values.len(), || vec![LuaType::Nil; returns]);
                        }
                        for (i, slot) in positions.iter_mut().enumerate() {
                            slot.push(values.get(i).cloned().unwrap_or(LuaType::Nil));
                        }
                        returns += 1;
                    }
                    _ => stack.push(child),
                }
            }
        }
        LuaType::from_returns(positions.into_iter().map(union_many).collect())
    }

    /// Types of an expression list; a trailing call contributes all of its
    /// values.
    pub(crate) fn expr_list_types<'t>(
        &mut self,
        doc_id: DocumentId,
        exprs: impl Iterator<Item = LuaSyntaxNode<'t>>,
    ) -> Vec<LuaType> {
        let exprs: Vec<_> = exprs.collect();
        let last = exprs.len().saturating_sub(1);
        let types = exprs
            .iter()
            .enumerate()
            .map(|(i, expr)| {
                let ty = self.infer_expr(doc_id, expr);
                match i == last {
                    true => ty,
                    false => ty.first_value(),
                }
            })
            .collect();
        flatten_multi(types)
    }

    /// Picks and instantiates the signature a call expression invokes.
    pub fn resolve_call(&mut self, doc_id: DocumentId, call: &LuaSyntaxNode) -> Option<CallableMatch> {
        let callee = call.exprs().next()?;
        let is_colon_call =
            callee.kind() == LuaSyntaxKind::IndexExpr && callee.has_token(LuaTokenKind::Colon);
        let callee_type = self.infer_expr(doc_id, &callee).first_value();
        let self_type = match is_colon_call {
            true => callee
                .exprs()
                .next()
                .map(|prefix| self.infer_expr(doc_id, &prefix).first_value()),
            false => None,
        };
        let args: Vec<LuaType> = call
            .child(LuaSyntaxKind::CallArgList)
            .map(|list| list.exprs().map(|arg| self.infer_expr(doc_id, &arg).first_value()).collect())
            .unwrap_or_default();
        self.find_perfect_match_signature(&callee_type, &args, is_colon_call, self_type)
    }

    /// Ranks the candidates of `callee` by how many leading arguments they
    /// accept; the earliest candidate wins a tie.
    pub fn find_perfect_match_signature(
        &mut self,
        callee: &LuaType,
        args: &[LuaType],
        is_colon_call: bool,
        self_type: Option<LuaType>,
    ) -> Option<CallableMatch> {
        let candidates = self.find_callable_type(callee);
        let mut best: Option<(usize, usize, LuaFunctionType)> = None;
        for (candidate, func) in candidates.iter().enumerate() {
            let func = adjust_for_call(func, is_colon_call);
            let score = self.match_score(&func, args);
            if best.as_ref().map_or(true, |(best_score, _, _)| score > *best_score) {
                best = Some((score, candidate, func));
            }
        }
        let (_, candidate, func) = best?;
        let func = self.instantiate_signature(&func, args, self_type);
        let params = (0..args.len())
            .filter_map(|i| param_at(&func, i).cloned())
            .collect();
        Some(CallableMatch {
            func,
            params,
            candidate,
            signature: match callee {
                LuaType::Signature(id) => Some(*id),
                _ => None,
            },
        })
    }

    fn match_score(&mut self, func: &LuaFunctionType, args: &[LuaType]) -> usize {
        let mut score = 0;
        for (i, arg) in args.iter().enumerate() {
            match param_at(func, i) {
                Some((_, Some(expected))) => {
                    if !self.is_subtype(arg, expected) {
                        break;
                    }
                }
                Some((_, None)) => {}
                None => break,
            }
            score += 1;
        }
        score
    }

    // ─── generics ──────────────────────────────────────────────────────

    /// Binds the template parameters of `func` from the argument types and
    /// substitutes them. Templates no argument determines become `unknown`.
    pub fn instantiate_signature(
        &mut self,
        func: &LuaFunctionType,
        args: &[LuaType],
        self_type: Option<LuaType>,
    ) -> LuaFunctionType {
        let whole = LuaType::DocFunction(Arc::new(func.clone()));
        if !whole.contains_tpl() {
            return func.clone();
        }
        let mut substitutor = TypeSubstitutor::new();
        if let Some(self_type) = self_type {
            substitutor.set_self_type(self_type);
        }

        for (i, arg) in args.iter().enumerate() {
            let Some((name, Some(expected))) = param_at(func, i) else {
                continue;
            };
            if name == "..." {
                if let LuaType::TplRef(tpl) = expected {
                    if !substitutor.contains(tpl) {
                        let rest: Vec<LuaType> = args[i..].iter().map(LuaType::widen).collect();
                        let bound = match rest.len() {
                            1 => rest[0].clone(),
                            _ => LuaType::multi(rest),
                        };
                        substitutor.insert(tpl.clone(), bound);
                    }
                    break;
                }
            }
            let expected = expected.clone();
            self.unify(&expected, arg, &mut substitutor);
        }

        let mut names = Vec::new();
        collect_tpl_names(&whole, &mut names);
        for name in names {
            if !substitutor.contains(&name) {
                substitutor.insert(name, LuaType::Unknown);
            }
        }
        instantiate_function(func, &substitutor)
    }

    fn unify(&mut self, expected: &LuaType, actual: &LuaType, substitutor: &mut TypeSubstitutor) {
        if actual.is_unknown() || !expected.contains_tpl() {
            return;
        }
        match expected {
            LuaType::TplRef(name) => {
                let actual = actual.widen();
                let bound = match substitutor.get(name) {
                    Some(existing) if existing != &actual => union_type(existing.clone(), actual),
                    _ => actual,
                };
                substitutor.insert(name.clone(), bound);
            }
            LuaType::Array(base) => match actual {
                LuaType::Array(actual_base) => self.unify(base, actual_base, substitutor),
                LuaType::Tuple(types) => self.unify(base, &union_many(types.as_ref().clone()), substitutor),
                LuaType::Generic(generic) if generic.base.as_ref() == "table" => {
                    if let Some(value) = generic.params.get(1) {
                        self.unify(base, value, substitutor);
                    }
                }
                LuaType::TableConst(_) => {
                    let element = self.table_element_type(actual, true);
                    self.unify(base, &element, substitutor);
                }
                _ => {}
            },
            LuaType::Generic(generic) => {
                if generic.base.as_ref() == "table" && generic.params.len() == 2 {
                    let (key, value) = match actual {
                        LuaType::Array(base) => (LuaType::Integer, base.as_ref().clone()),
                        LuaType::TableConst(_) => (
                            self.table_key_type(actual),
                            self.table_element_type(actual, false),
                        ),
                        _ => (LuaType::Unknown, LuaType::Unknown),
                    };
                    if !value.is_unknown() {
                        self.unify(&generic.params[0], &key, substitutor);
                        self.unify(&generic.params[1], &value, substitutor);
                        return;
                    }
                }
                let Some(actual_params) = self.generic_params_as(actual, &generic.base) else {
                    return;
                };
                for (expected, actual) in generic.params.iter().zip(actual_params.iter()) {
                    self.unify(expected, actual, substitutor);
                }
            }
            LuaType::Union(union) => {
                // `T|nil` against `string|nil` binds `T` to `string`
                let mut rest = actual.clone();
                for alternative in union.types().iter().filter(|ty| !ty.contains_tpl()) {
                    rest = remove_type(&rest, alternative);
                }
                if matches!(rest, LuaType::Never) {
                    return;
                }
                for alternative in union.types().iter().filter(|ty| ty.contains_tpl()) {
                    self.unify(alternative, &rest, substitutor);
                }
            }
            LuaType::DocFunction(expected_func) => {
                let Some(actual_func) = self.find_callable_type(actual).into_iter().next() else {
                    return;
                };
                for ((_, expected), (_, actual)) in expected_func.params.iter().zip(actual_func.params.iter()) {
                    if let (Some(expected), Some(actual)) = (expected, actual) {
                        self.unify(expected, actual, substitutor);
                    }
                }
                self.unify(&expected_func.ret, &actual_func.ret.first_value(), substitutor);
            }
            LuaType::MultiReturn(multi) => {
                if let LuaMultiReturn::Base(base) = multi.as_ref() {
                    self.unify(base, &actual.first_value(), substitutor);
                }
            }
            _ => {}
        }
    }

    /// Parameters of `actual` viewed as an instance of the generic `base`,
    /// walking up its supers when it is a subclass.
    fn generic_params_as(&mut self, actual: &LuaType, base: &ArcStr) -> Option<Vec<LuaType>> {
        let name = match actual {
            LuaType::Generic(generic) if &generic.base == base => return Some(generic.params.clone()),
            LuaType::Generic(generic) => generic.base.clone(),
            LuaType::Ref(name) => name.clone(),
            _ => return None,
        };
        let supers: Vec<LuaType> = self.index.query_supers(&name).into_iter().cloned().collect();
        self.guarded(None, |ctx| {
            supers
                .iter()
                .find_map(|super_type| ctx.generic_params_as(super_type, base))
        })
    }

    /// Union of the values of a table constructor; `positional` keeps only
    /// integer keys.
    fn table_element_type(&mut self, table: &LuaType, positional: bool) -> LuaType {
        let types = self
            .find_members(table)
            .into_iter()
            .filter(|info| !positional || matches!(info.key, LuaMemberKey::Integer(_)))
            .map(|info| info.ty)
            .collect();
        union_many(types)
    }

    fn table_key_type(&mut self, table: &LuaType) -> LuaType {
        let types = self
            .find_members(table)
            .into_iter()
            .map(|info| match info.key {
                LuaMemberKey::Name(_) => LuaType::String,
                LuaMemberKey::Integer(_) => LuaType::Integer,
            })
            .collect();
        union_many(types)
    }
}

/// The parameter list as seen from a call written with `:` or `.`.
fn adjust_for_call(func: &LuaFunctionType, is_colon_call: bool) -> LuaFunctionType {
    let mut func = func.clone();
    match (is_colon_call, func.is_colon_define) {
        // `obj:f(x)` on `function f(self, x)`: the receiver fills `self`
        (true, false) => {
            if func.params.first().is_some_and(|(name, _)| name != "...") {
                func.params.remove(0);
            }
        }
        // `obj.f(obj, x)` on `function obj:f(x)`
        (false, true) => func.params.insert(0, ("self".to_string(), None)),
        _ => {}
    }
    func.is_colon_define = is_colon_call;
    func
}

/// The parameter receiving argument `index`; a trailing vararg takes all
/// remaining arguments.
fn param_at(func: &LuaFunctionType, index: usize) -> Option<&(String, Option<LuaType>)> {
    match func.params.get(index) {
        Some(param) => Some(param),
        None if func.is_vararg() => func.params.last(),
        None => None,
    }
}

fn collect_tpl_names(ty: &LuaType, names: &mut Vec<ArcStr>) {
    if let LuaType::TplRef(name) = ty {
        if !names.contains(name) {
            names.push(name.clone());
        }
        return;
    }
    for child in ty.children() {
        collect_tpl_names(child, names);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn func(params: &[(&str, LuaType)], is_colon_define: bool) -> LuaFunctionType {
        LuaFunctionType {
            is_colon_define,
            params: params
                .iter()
                .map(|(name, ty)| (name.to_string(), Some(ty.clone())))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_colon_call_skips_declared_self() {
        let f = func(&[("self", LuaType::Table), ("x", LuaType::Integer)], false);
        let adjusted = adjust_for_call(&f, true);
        assert_eq!(adjusted.params.len(), 1);
        assert_eq!(adjusted.params[0].0, "x");
    }

    #[test]
    fn test_dot_call_adds_implicit_self() {
        let f = func(&[("x", LuaType::Integer)], true);
        let adjusted = adjust_for_call(&f, false);
        assert_eq!(adjusted.params[0], ("self".to_string(), None));
        assert_eq!(adjusted.params.len(), 2);
    }

    #[test]
    fn test_vararg_absorbs_extra_arguments() {
        let f = func(&[("a", LuaType::String), ("...", LuaType::Integer)], false);
        assert_eq!(param_at(&f, 0).map(|(name, _)| name.as_str()), Some("a"));
        assert_eq!(param_at(&f, 5).map(|(name, _)| name.as_str()), Some("..."));
        let fixed = func(&[("a", LuaType::String)], false);
        assert_eq!(param_at(&fixed, 1), None);
    }
}
