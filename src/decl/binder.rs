use super::{
    LocalAttribute, LuaDecl, LuaDeclId, LuaDeclKind, LuaDeclTree, LuaDeclValue, ScopeId, ScopeKind,
};
use crate::index::LuaSignatureId;
use crate::syntax::{LuaSyntaxKind, LuaSyntaxNode, LuaSyntaxToken, LuaSyntaxTree, LuaTokenKind, TextRange};
use crate::vfs::{DocumentId, LuaSyntaxId};

/// Builds the declaration tree of one document. Only code is looked at here;
/// doc comments are applied by the later analyzer passes.
#[tracing::instrument(skip_all, fields(doc = doc_id.0))]
pub fn bind_document(doc_id: DocumentId, tree: &LuaSyntaxTree) -> LuaDeclTree {
    let mut binder = DeclBinder {
        doc_id,
        decls: LuaDeclTree::new(doc_id),
        scopes: Vec::new(),
    };
    let root = tree.root();
    binder.enter(ScopeKind::Chunk, TextRange::new(0, tree.text().len() as u32));
    binder.walk_children(root);
    binder.leave();
    binder.decls
}

struct DeclBinder {
    doc_id: DocumentId,
    decls: LuaDeclTree,
    scopes: Vec<ScopeId>,
}

impl DeclBinder {
    fn current_scope(&self) -> Option<ScopeId> {
        self.scopes.last().copied()
    }

    fn enter(&mut self, kind: ScopeKind, range: TextRange) {
        let id = self.decls.push_scope(self.current_scope(), kind, range);
        self.scopes.push(id);
    }

    fn leave(&mut self) {
        self.scopes.pop();
    }

    fn syntax_id(&self, node: &LuaSyntaxNode) -> LuaSyntaxId {
        LuaSyntaxId::from_node(self.doc_id, node)
    }

    fn walk_children(&mut self, node: LuaSyntaxNode) {
        for child in node.child_nodes() {
            self.walk(child);
        }
    }

    fn walk(&mut self, node: LuaSyntaxNode) {
        match node.kind() {
            LuaSyntaxKind::Block => {
                self.enter(ScopeKind::Block, node.range());
                self.walk_children(node);
                self.leave();
            }
            LuaSyntaxKind::LocalStat => self.bind_local_stat(node),
            LuaSyntaxKind::LocalFuncStat => self.bind_local_func_stat(node),
            LuaSyntaxKind::FuncStat => self.bind_func_stat(node),
            LuaSyntaxKind::AssignStat => self.bind_assign_stat(node),
            LuaSyntaxKind::ForStat | LuaSyntaxKind::ForRangeStat => self.bind_for_stat(node),
            LuaSyntaxKind::RepeatStat => self.bind_repeat_stat(node),
            LuaSyntaxKind::ClosureExpr => self.bind_closure(node, false),
            LuaSyntaxKind::NameExpr => self.bind_name_ref(node),
            // the doc layer carries no code names
            LuaSyntaxKind::Comment => {}
            _ => self.walk_children(node),
        }
    }

    fn add_decl(
        &mut self,
        name: LuaSyntaxToken,
        syntax: &LuaSyntaxNode,
        kind: LuaDeclKind,
        value: Option<LuaDeclValue>,
        visible_from: u32,
    ) -> LuaDeclId {
        let range = name.range();
        let scope = match kind {
            LuaDeclKind::Global => None,
            _ => self.current_scope(),
        };
        let decl = LuaDecl {
            id: LuaDeclId {
                doc_id: self.doc_id,
                position: range.start,
            },
            name: name.text().to_string(),
            kind,
            range,
            syntax_id: self.syntax_id(syntax),
            value,
            declared_type: None,
            features: Default::default(),
            visibility: Default::default(),
            visible_from,
        };
        self.decls.add_decl(scope, decl)
    }

    /// `local a, b <const> = x, f()`. The values are bound first: a local is
    /// not visible inside its own initializer.
    fn bind_local_stat(&mut self, stat: LuaSyntaxNode) {
        let values: Vec<_> = stat.exprs().collect();
        for value in &values {
            self.walk(*value);
        }
        let visible_from = stat.range().end;
        for (i, name) in stat.children_of(LuaSyntaxKind::LocalName).enumerate() {
            let Some(token) = name.token(LuaTokenKind::Name) else {
                continue;
            };
            let attrib = name
                .child(LuaSyntaxKind::Attribute)
                .and_then(|attr| attr.name_text())
                .and_then(|text| match text {
                    "const" => Some(LocalAttribute::Const),
                    "close" => Some(LocalAttribute::Close),
                    _ => None,
                });
            let value = decl_value(self.doc_id, &values, i);
            let id = self.add_decl(token, &name, LuaDeclKind::Local { attrib }, value, visible_from);
            if attrib.is_some() {
                if let Some(decl) = self.decls.get_decl_mut(&id) {
                    decl.features.readonly = true;
                }
            }
        }
    }

    /// `local function f` is visible from its own name so the body can recurse.
    fn bind_local_func_stat(&mut self, stat: LuaSyntaxNode) {
        let closure = stat.child(LuaSyntaxKind::ClosureExpr);
        if let Some(name) = stat.child(LuaSyntaxKind::LocalName) {
            if let Some(token) = name.token(LuaTokenKind::Name) {
                let value = closure.map(|closure| LuaDeclValue {
                    expr: self.syntax_id(&closure),
                    index: 0,
                });
                let visible_from = token.range().start;
                self.add_decl(
                    token,
                    &name,
                    LuaDeclKind::Local { attrib: None },
                    value,
                    visible_from,
                );
            }
        }
        if let Some(closure) = closure {
            self.bind_closure(closure, false);
        }
    }

    /// `function name()` declares a global unless `name` is a visible local;
    /// `function a.b:c()` only walks the prefix here.
    fn bind_func_stat(&mut self, stat: LuaSyntaxNode) {
        let closure = stat.child(LuaSyntaxKind::ClosureExpr);
        let mut is_method = false;
        if let Some(name) = stat.exprs().find(|node| node.kind() != LuaSyntaxKind::ClosureExpr) {
            match name.kind() {
                LuaSyntaxKind::NameExpr => {
                    let value = closure.map(|closure| LuaDeclValue {
                        expr: self.syntax_id(&closure),
                        index: 0,
                    });
                    self.bind_assign_target(name, value);
                }
                _ => {
                    is_method = name.has_token(LuaTokenKind::Colon);
                    self.walk(name);
                }
            }
        }
        if let Some(closure) = closure {
            self.bind_closure(closure, is_method);
        }
    }

    fn bind_assign_stat(&mut self, stat: LuaSyntaxNode) {
        let Some(assign) = stat.token(LuaTokenKind::Assign) else {
            self.walk_children(stat);
            return;
        };
        let split = assign.range().start;
        let (targets, values): (Vec<_>, Vec<_>) = stat
            .exprs()
            .partition(|expr| expr.range().end <= split);
        for value in &values {
            self.walk(*value);
        }
        for (i, target) in targets.into_iter().enumerate() {
            match target.kind() {
                LuaSyntaxKind::NameExpr => {
                    let value = decl_value(self.doc_id, &values, i);
                    self.bind_assign_target(target, value);
                }
                _ => self.walk(target),
            }
        }
    }

    /// A name on the left of `=`: a reference to a visible local, otherwise
    /// a global declaration.
    fn bind_assign_target(&mut self, target: LuaSyntaxNode, value: Option<LuaDeclValue>) {
        let Some(token) = target.token(LuaTokenKind::Name) else {
            return;
        };
        let position = token.range().start;
        match self.decls.find_local_decl(token.text(), position) {
            Some(decl) => {
                let id = decl.id;
                self.decls.add_reference(id, token.range());
            }
            None => {
                self.add_decl(token, &target, LuaDeclKind::Global, value, position);
            }
        }
    }

    /// Loop expressions are evaluated outside the loop; the loop variables
    /// are visible from the body on.
    fn bind_for_stat(&mut self, stat: LuaSyntaxNode) {
        for expr in stat.exprs() {
            self.walk(expr);
        }
        let block = stat.child(LuaSyntaxKind::Block);
        let visible_from = block.map(|block| block.range().start).unwrap_or(stat.range().end);
        self.enter(ScopeKind::Loop, stat.range());
        for name in stat.children_of(LuaSyntaxKind::ParamName) {
            if let Some(token) = name.token(LuaTokenKind::Name) {
                self.add_decl(token, &name, LuaDeclKind::ForVar, None, visible_from);
            }
        }
        if let Some(block) = block {
            self.walk(block);
        }
        self.leave();
    }

    /// The `until` condition sees the locals of the loop body, so the body is
    /// bound directly in a scope that covers the whole statement.
    fn bind_repeat_stat(&mut self, stat: LuaSyntaxNode) {
        self.enter(ScopeKind::Repeat, stat.range());
        for child in stat.child_nodes() {
            match child.kind() {
                LuaSyntaxKind::Block => self.walk_children(child),
                _ => self.walk(child),
            }
        }
        self.leave();
    }

    fn bind_closure(&mut self, closure: LuaSyntaxNode, is_method: bool) {
        let signature = LuaSignatureId::new(self.syntax_id(&closure));
        let visible_from = closure.range().start;
        self.enter(ScopeKind::Closure, closure.range());
        if let Some(params) = closure.child(LuaSyntaxKind::ParamList) {
            if is_method {
                self.add_implicit_self(&params, signature, visible_from);
            }
            for (index, param) in params.children_of(LuaSyntaxKind::ParamName).enumerate() {
                let token = param
                    .token(LuaTokenKind::Name)
                    .or_else(|| param.token(LuaTokenKind::Dots));
                if let Some(token) = token {
                    self.add_decl(
                        token,
                        &param,
                        LuaDeclKind::Param { index, signature },
                        None,
                        visible_from,
                    );
                }
            }
        }
        if let Some(block) = closure.child(LuaSyntaxKind::Block) {
            self.walk(block);
        }
        self.leave();
    }

    /// `self` has no token of its own; it is keyed on the opening paren of
    /// the parameter list.
    fn add_implicit_self(
        &mut self,
        params: &LuaSyntaxNode,
        signature: LuaSignatureId,
        visible_from: u32,
    ) {
        let Some(paren) = params.token(LuaTokenKind::LeftParen) else {
            return;
        };
        let range = paren.range();
        let decl = LuaDecl {
            id: LuaDeclId {
                doc_id: self.doc_id,
                position: range.start,
            },
            name: "self".to_string(),
            kind: LuaDeclKind::ImplicitSelf { signature },
            range,
            syntax_id: self.syntax_id(params),
            value: None,
            declared_type: None,
            features: Default::default(),
            visibility: Default::default(),
            visible_from,
        };
        let scope = self.current_scope();
        self.decls.add_decl(scope, decl);
    }

    fn bind_name_ref(&mut self, node: LuaSyntaxNode) {
        let Some(token) = node.token(LuaTokenKind::Name) else {
            return;
        };
        let id = self
            .decls
            .find_local_decl(token.text(), token.range().start)
            .map(|decl| decl.id);
        if let Some(id) = id {
            self.decls.add_reference(id, token.range());
        }
    }
}

/// Value `i` of an expression list: either its own expression, or a slot of
/// a trailing call or `...` that expands to several values.
fn decl_value(doc_id: DocumentId, values: &[LuaSyntaxNode], i: usize) -> Option<LuaDeclValue> {
    if let Some(expr) = values.get(i) {
        return Some(LuaDeclValue {
            expr: LuaSyntaxId::from_node(doc_id, expr),
            index: 0,
        });
    }
    let last = values.last()?;
    if !is_multi_value(last) {
        return None;
    }
    Some(LuaDeclValue {
        expr: LuaSyntaxId::from_node(doc_id, last),
        index: i + 1 - values.len(),
    })
}

pub(crate) fn is_multi_value(expr: &LuaSyntaxNode) -> bool {
    match expr.kind() {
        LuaSyntaxKind::CallExpr => true,
        LuaSyntaxKind::LiteralExpr => expr.has_token(LuaTokenKind::Dots),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn bind(text: &str) -> LuaDeclTree {
        bind_document(DocumentId(0), &parse(text))
    }

    fn offset_of(text: &str, needle: &str, nth: usize) -> u32 {
        text.match_indices(needle).nth(nth).map(|(i, _)| i as u32).unwrap()
    }

    #[test]
    fn test_local_invisible_in_own_initializer() {
        let text = "local x = 1\nlocal x = x + 1\nprint(x)";
        let tree = bind(text);
        let inner_use = offset_of(text, "x", 2);
        let found = tree.find_local_decl("x", inner_use).unwrap();
        assert_eq!(found.range.start, offset_of(text, "x", 0));

        let last_use = offset_of(text, "x", 3);
        let found = tree.find_local_decl("x", last_use).unwrap();
        assert_eq!(found.range.start, offset_of(text, "x", 1));
    }

    #[test]
    fn test_local_function_sees_itself() {
        let text = "local function fact(n) return fact(n - 1) end";
        let tree = bind(text);
        let call = offset_of(text, "fact", 1);
        assert!(tree.find_local_decl("fact", call).is_some());
        let decl = tree.decl_at(offset_of(text, "fact", 0)).unwrap();
        assert_eq!(tree.references(&decl.id).len(), 1);
    }

    #[test]
    fn test_assignment_to_unknown_name_is_global() {
        let text = "local a = 1\na = 2\nb = 3";
        let tree = bind(text);
        let globals: Vec<_> = tree.decls().filter(|decl| decl.is_global()).collect();
        assert_eq!(globals.len(), 1);
        assert_eq!(globals[0].name, "b");
    }

    #[test]
    fn test_params_and_method_self() {
        let text = "local t = {}\nfunction t:m(a, ...) return self, a end";
        let tree = bind(text);
        let use_self = offset_of(text, "self", 0);
        let decl = tree.find_local_decl("self", use_self).unwrap();
        assert!(matches!(decl.kind, LuaDeclKind::ImplicitSelf { .. }));
        let decl = tree.find_local_decl("a", use_self).unwrap();
        assert!(matches!(decl.kind, LuaDeclKind::Param { index: 0, .. }));
        assert!(tree.find_local_decl("...", use_self).is_some());
    }

    #[test]
    fn test_for_vars_scoped_to_body() {
        let text = "for k = 1, 10 do print(k) end\nprint(k)";
        let tree = bind(text);
        assert!(tree.find_local_decl("k", offset_of(text, "k", 1)).is_some());
        assert!(tree.find_local_decl("k", offset_of(text, "k", 2)).is_none());
    }

    #[test]
    fn test_repeat_condition_sees_body_locals() {
        let text = "repeat local done = true until done";
        let tree = bind(text);
        assert!(tree.find_local_decl("done", offset_of(text, "done", 1)).is_some());
    }

    #[test]
    fn test_multi_value_slots() {
        let text = "local x, y, z = 1, f()";
        let tree = bind(text);
        let z = tree.decl_at(offset_of(text, "z", 0)).unwrap();
        assert_eq!(z.value.unwrap().index, 1);
        let y = tree.decl_at(offset_of(text, "y", 0)).unwrap();
        assert_eq!(y.value.unwrap().index, 0);
    }

    #[test]
    fn test_binding_is_deterministic() {
        let text = "local a = 1\nfunction g(x) local y = x return y end\nz = a";
        let first: Vec<_> = bind(text).decls().cloned().collect();
        let second: Vec<_> = bind(text).decls().cloned().collect();
        assert_eq!(first, second);
    }
}
