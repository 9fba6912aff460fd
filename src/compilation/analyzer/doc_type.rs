use std::sync::Arc;

use crate::index::LuaMemberKey;
use crate::syntax::{integer_value, string_value, LuaSyntaxKind, LuaSyntaxNode, LuaTokenKind};
use crate::types::{
    union_many, ArcStr, LuaFunctionType, LuaGenericType, LuaMultiReturn, LuaObjectType, LuaType,
};

/// Converts a doc type node to a [`LuaType`]. Names listed in `generics`
/// become template references; other unknown names are named types.
pub(crate) fn doc_type(node: &LuaSyntaxNode, generics: &[ArcStr]) -> LuaType {
    let child = |index: usize| {
        node.doc_types()
            .nth(index)
            .map(|child| doc_type(&child, generics))
            .unwrap_or_default()
    };
    match node.kind() {
        LuaSyntaxKind::TypeName => {
            let Some(name) = node.name_text() else {
                return LuaType::Unknown;
            };
            if name == "fun" {
                return LuaType::Function;
            }
            if generics.iter().any(|generic| generic.as_ref() == name) {
                return LuaType::TplRef(Arc::from(name));
            }
            LuaType::from_builtin_name(name).unwrap_or_else(|| LuaType::reference(name))
        }
        LuaSyntaxKind::TypeLiteral => literal_type(node),
        LuaSyntaxKind::TypeArray => LuaType::Array(Arc::new(child(0))),
        LuaSyntaxKind::TypeNullable => child(0).nullable(),
        LuaSyntaxKind::TypeParen => child(0),
        LuaSyntaxKind::TypeUnion => {
            union_many(node.doc_types().map(|ty| doc_type(&ty, generics)).collect())
        }
        LuaSyntaxKind::TypeTuple => LuaType::Tuple(Arc::new(
            node.doc_types().map(|ty| doc_type(&ty, generics)).collect(),
        )),
        LuaSyntaxKind::TypeGeneric => {
            let base = node.name_text().unwrap_or("table");
            let params: Vec<_> = node.doc_types().map(|ty| doc_type(&ty, generics)).collect();
            LuaType::Generic(Arc::new(LuaGenericType::new(base, params)))
        }
        LuaSyntaxKind::TypeFun => function_type(node, generics),
        LuaSyntaxKind::TypeObject => object_type(node, generics),
        LuaSyntaxKind::TypeVariadic => {
            let base = node
                .doc_types()
                .next()
                .map(|ty| doc_type(&ty, generics))
                .unwrap_or(LuaType::Any);
            LuaType::MultiReturn(Arc::new(LuaMultiReturn::Base(base)))
        }
        _ => LuaType::Unknown,
    }
}

fn literal_type(node: &LuaSyntaxNode) -> LuaType {
    let Some(token) = node.child_tokens().next() else {
        return LuaType::Unknown;
    };
    match token.kind() {
        LuaTokenKind::String => LuaType::string_const(&string_value(token.text())),
        LuaTokenKind::Int => integer_value(token.text())
            .map(LuaType::IntegerConst)
            .unwrap_or(LuaType::Integer),
        LuaTokenKind::Float => LuaType::Number,
        LuaTokenKind::Name => LuaType::BooleanConst(token.text() == "true"),
        _ => LuaType::Unknown,
    }
}

/// `fun(a: T, b?: U, ...: V): R1, R2`
fn function_type(node: &LuaSyntaxNode, generics: &[ArcStr]) -> LuaType {
    let params = node
        .children_of(LuaSyntaxKind::DocFuncParam)
        .map(|param| {
            let name = param
                .token(LuaTokenKind::Name)
                .or_else(|| param.token(LuaTokenKind::Dots))
                .map(|token| token.text().to_string())
                .unwrap_or_default();
            let ty = param.doc_types().next().map(|ty| {
                let ty = doc_type(&ty, generics);
                match param.has_token(LuaTokenKind::DocQuestion) {
                    true => ty.nullable(),
                    false => ty,
                }
            });
            (name, ty)
        })
        .collect();
    let returns = node.doc_types().map(|ty| doc_type(&ty, generics)).collect();
    LuaType::DocFunction(Arc::new(LuaFunctionType::new(
        params,
        LuaType::from_returns(returns),
    )))
}

/// `{ name: T, [K]: V, count?: integer }`
fn object_type(node: &LuaSyntaxNode, generics: &[ArcStr]) -> LuaType {
    let mut fields = Vec::new();
    let mut index_access = Vec::new();
    for field in node.children_of(LuaSyntaxKind::DocObjectField) {
        let optional = field.has_token(LuaTokenKind::DocQuestion);
        let types: Vec<_> = field.doc_types().map(|ty| doc_type(&ty, generics)).collect();
        if field.has_token(LuaTokenKind::LeftBracket) {
            let mut types = types.into_iter();
            let key = types.next().unwrap_or_default();
            let value = types.next().unwrap_or_default();
            index_access.push((key, value));
            continue;
        }
        let Some(token) = field.child_tokens().next() else {
            continue;
        };
        let key = match token.kind() {
            LuaTokenKind::Name => LuaMemberKey::name(token.text()),
            LuaTokenKind::String => LuaMemberKey::name(&string_value(token.text())),
            LuaTokenKind::Int => match integer_value(token.text()) {
                Some(value) => LuaMemberKey::Integer(value),
                None => continue,
            },
            _ => continue,
        };
        let ty = types.into_iter().next().unwrap_or_default();
        fields.push((key, if optional { ty.nullable() } else { ty }));
    }
    LuaType::Object(Arc::new(LuaObjectType {
        fields,
        index_access,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;
    use crate::types::format_type;

    /// Converts the first type of a `---@type` comment.
    fn convert(annotation: &str, generics: &[&str]) -> String {
        let text = format!("---@type {annotation}\nlocal x");
        let tree = parse(&text);
        let node = tree
            .root()
            .descendants()
            .find(|node| node.kind() == LuaSyntaxKind::DocTagType)
            .and_then(|tag| tag.doc_types().next())
            .unwrap();
        let generics: Vec<ArcStr> = generics.iter().map(|name| Arc::from(*name)).collect();
        format_type(&doc_type(&node, &generics))
    }

    #[test]
    fn test_doc_type_shapes() {
        assert_eq!(convert("string[]", &[]), "string[]");
        assert_eq!(convert("integer?", &[]), "integer?");
        assert_eq!(convert("integer|string", &[]), "integer|string");
        assert_eq!(convert("fun(a: T): T", &["T"]), "fun(a: T): T");
        assert_eq!(convert("table<string, integer>", &[]), "table<string, integer>");
        assert_eq!(convert("\"a\"|\"b\"", &[]), "\"a\"|\"b\"");
        assert_eq!(convert("{ x: number, y?: number }", &[]), "{ x: number, y: number? }");
        assert_eq!(convert("Point", &[]), "Point");
    }
}
