use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::{LuaType, LuaUnionType};

pub fn union_type(a: LuaType, b: LuaType) -> LuaType {
    union_many(vec![a, b])
}

/// Normalized union: nested unions are flattened, duplicates and `unknown`
/// members dropped, and a single survivor is returned as itself.
pub fn union_many(types: Vec<LuaType>) -> LuaType {
    let mut seen = FxHashSet::default();
    let mut members: Vec<LuaType> = flatten(types)
        .into_iter()
        .filter(|ty| !matches!(ty, LuaType::Unknown | LuaType::Never))
        .filter(|ty| seen.insert(ty.clone()))
        .collect();

    // `true|false` is just `boolean`
    if members.contains(&LuaType::Boolean) {
        members.retain(|ty| !matches!(ty, LuaType::BooleanConst(_)));
    } else if members.contains(&LuaType::BooleanConst(true))
        && members.contains(&LuaType::BooleanConst(false))
    {
        members.retain(|ty| !matches!(ty, LuaType::BooleanConst(_)));
        members.push(LuaType::Boolean);
    }

    match members.len() {
        0 => LuaType::Unknown,
        1 => members.remove(0),
        _ => LuaType::Union(Arc::new(LuaUnionType::new(members))),
    }
}

fn flatten(types: Vec<LuaType>) -> Vec<LuaType> {
    let mut out = Vec::with_capacity(types.len());
    for ty in types {
        match ty {
            LuaType::Union(union) => out.extend(flatten(union.types().to_vec())),
            ty => out.push(ty),
        }
    }
    out
}

/// Removes `removed` from `source`; the dual of [`union_type`].
pub fn remove_type(source: &LuaType, removed: &LuaType) -> LuaType {
    match source {
        LuaType::Union(union) => union_many(
            union
                .types()
                .iter()
                .filter(|ty| *ty != removed)
                .cloned()
                .collect(),
        )
        .or_never(),
        ty if ty == removed => LuaType::Never,
        ty => ty.clone(),
    }
}

/// Type of a value known to be truthy.
pub fn narrow_truthy(source: &LuaType) -> LuaType {
    match source {
        LuaType::Nil | LuaType::BooleanConst(false) => LuaType::Never,
        LuaType::Boolean => LuaType::BooleanConst(true),
        LuaType::Union(union) => union_many(union.types().iter().map(narrow_truthy).collect()).or_never(),
        ty => ty.clone(),
    }
}

/// Type of a value known to be `nil` or `false`.
pub fn narrow_falsy(source: &LuaType) -> LuaType {
    match source {
        LuaType::Nil | LuaType::BooleanConst(false) => source.clone(),
        LuaType::Boolean => LuaType::BooleanConst(false),
        LuaType::Unknown | LuaType::Any => LuaType::Nil,
        LuaType::Union(union) => union_many(
            union
                .types()
                .iter()
                .map(narrow_falsy)
                .filter(|ty| !matches!(ty, LuaType::Never))
                .collect(),
        )
        .or_never(),
        _ => LuaType::Never,
    }
}

impl LuaType {
    /// An emptied union comes back from `union_many` as `unknown`; after a
    /// removal that means nothing is left.
    fn or_never(self) -> LuaType {
        match self {
            LuaType::Unknown => LuaType::Never,
            ty => ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_laws() {
        let a = LuaType::Integer;
        let b = LuaType::String;
        assert_eq!(union_type(a.clone(), b.clone()), union_type(b.clone(), a.clone()));
        assert_eq!(union_type(a.clone(), a.clone()), a);
        assert_eq!(union_type(a.clone(), LuaType::Unknown), a);
        assert_eq!(union_type(LuaType::Unknown, LuaType::Unknown), LuaType::Unknown);
    }

    #[test]
    fn test_nested_unions_flatten() {
        let inner = union_type(LuaType::Integer, LuaType::String);
        let outer = union_type(inner, union_type(LuaType::Nil, LuaType::Integer));
        match &outer {
            LuaType::Union(union) => assert_eq!(union.types().len(), 3),
            other => panic!("expected a union, got {other:?}"),
        }
    }

    #[test]
    fn test_remove_nil() {
        let optional = union_type(LuaType::String, LuaType::Nil);
        assert_eq!(remove_type(&optional, &LuaType::Nil), LuaType::String);
        assert_eq!(remove_type(&LuaType::Nil, &LuaType::Nil), LuaType::Never);
        assert_eq!(remove_type(&LuaType::Integer, &LuaType::Nil), LuaType::Integer);
    }

    #[test]
    fn test_truthy_narrowing() {
        let ty = union_many(vec![LuaType::Integer, LuaType::Nil, LuaType::Boolean]);
        assert_eq!(
            narrow_truthy(&ty),
            union_type(LuaType::Integer, LuaType::BooleanConst(true))
        );
        assert_eq!(narrow_falsy(&ty), union_type(LuaType::Nil, LuaType::BooleanConst(false)));
    }

    #[test]
    fn test_true_and_false_merge_to_boolean() {
        assert_eq!(
            union_type(LuaType::BooleanConst(true), LuaType::BooleanConst(false)),
            LuaType::Boolean
        );
    }
}
