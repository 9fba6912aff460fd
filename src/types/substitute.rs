use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{
    flatten_multi, union_many, ArcStr, LuaFunctionType, LuaGenericType, LuaMultiReturn,
    LuaObjectType, LuaType,
};

/// Generic parameter bindings for one instantiation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeSubstitutor {
    map: FxHashMap<ArcStr, LuaType>,
    self_type: Option<LuaType>,
}

impl TypeSubstitutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds declared parameter names to arguments positionally; missing
    /// arguments stay unbound.
    pub fn from_params(names: &[ArcStr], args: &[LuaType]) -> Self {
        let mut substitutor = Self::new();
        for (name, arg) in names.iter().zip(args) {
            substitutor.insert(name.clone(), arg.clone());
        }
        substitutor
    }

    pub fn insert(&mut self, name: ArcStr, ty: LuaType) {
        self.map.insert(name, ty);
    }

    pub fn get(&self, name: &str) -> Option<&LuaType> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn set_self_type(&mut self, ty: LuaType) {
        self.self_type = Some(ty);
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty() && self.self_type.is_none()
    }
}

/// Replaces template references in `ty`. Unbound templates are kept.
pub fn instantiate_type(ty: &LuaType, substitutor: &TypeSubstitutor) -> LuaType {
    if substitutor.is_empty() {
        return ty.clone();
    }
    match ty {
        LuaType::TplRef(name) => substitutor.get(name).cloned().unwrap_or_else(|| ty.clone()),
        LuaType::SelfInfer => substitutor.self_type.clone().unwrap_or(LuaType::SelfInfer),
        LuaType::Array(base) => LuaType::Array(Arc::new(instantiate_type(base, substitutor))),
        LuaType::Tuple(types) => LuaType::Tuple(Arc::new(
            types.iter().map(|ty| instantiate_type(ty, substitutor)).collect(),
        )),
        LuaType::Object(object) => LuaType::Object(Arc::new(LuaObjectType {
            fields: object
                .fields
                .iter()
                .map(|(key, ty)| (key.clone(), instantiate_type(ty, substitutor)))
                .collect(),
            index_access: object
                .index_access
                .iter()
                .map(|(key, value)| {
                    (
                        instantiate_type(key, substitutor),
                        instantiate_type(value, substitutor),
                    )
                })
                .collect(),
        })),
        LuaType::Union(union) => union_many(
            union
                .types()
                .iter()
                .map(|ty| instantiate_type(ty, substitutor))
                .collect(),
        ),
        LuaType::Generic(generic) => LuaType::Generic(Arc::new(LuaGenericType {
            base: generic.base.clone(),
            params: generic
                .params
                .iter()
                .map(|ty| instantiate_type(ty, substitutor))
                .collect(),
        })),
        LuaType::DocFunction(func) => LuaType::DocFunction(Arc::new(instantiate_function(func, substitutor))),
        LuaType::MultiReturn(multi) => match multi.as_ref() {
            LuaMultiReturn::Base(base) => match instantiate_type(base, substitutor) {
                // a variadic template bound to several values
                multi @ LuaType::MultiReturn(_) => multi,
                base => LuaType::MultiReturn(Arc::new(LuaMultiReturn::Base(base))),
            },
            LuaMultiReturn::Multi(types) => LuaType::multi(flatten_multi(
                types
                    .iter()
                    .map(|ty| instantiate_type(ty, substitutor))
                    .collect(),
            )),
        },
        _ => ty.clone(),
    }
}

pub(crate) fn instantiate_function(
    func: &LuaFunctionType,
    substitutor: &TypeSubstitutor,
) -> LuaFunctionType {
    LuaFunctionType {
        is_async: func.is_async,
        is_colon_define: func.is_colon_define,
        params: func
            .params
            .iter()
            .map(|(name, ty)| {
                (
                    name.clone(),
                    ty.as_ref().map(|ty| instantiate_type(ty, substitutor)),
                )
            })
            .collect(),
        ret: instantiate_type(&func.ret, substitutor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::union_type;

    fn tpl(name: &str) -> LuaType {
        LuaType::TplRef(Arc::from(name))
    }

    fn sample_types() -> Vec<LuaType> {
        vec![
            LuaType::Integer,
            tpl("T"),
            LuaType::Array(Arc::new(tpl("T"))),
            union_type(tpl("T"), LuaType::Nil),
            LuaType::Generic(Arc::new(LuaGenericType::new("List", vec![tpl("T")]))),
            LuaType::DocFunction(Arc::new(LuaFunctionType::new(
                vec![("a".to_string(), Some(tpl("T")))],
                tpl("T"),
            ))),
            LuaType::multi(vec![tpl("T"), LuaType::String]),
            LuaType::SelfInfer,
        ]
    }

    #[test]
    fn test_empty_substitution_is_identity() {
        let empty = TypeSubstitutor::new();
        for ty in sample_types() {
            assert_eq!(instantiate_type(&ty, &empty), ty);
        }
    }

    #[test]
    fn test_instantiate_function() {
        let mut substitutor = TypeSubstitutor::new();
        substitutor.insert(Arc::from("T"), LuaType::String);
        let func = LuaType::DocFunction(Arc::new(LuaFunctionType::new(
            vec![("a".to_string(), Some(tpl("T")))],
            union_type(tpl("T"), LuaType::Nil),
        )));
        let expected = LuaType::DocFunction(Arc::new(LuaFunctionType::new(
            vec![("a".to_string(), Some(LuaType::String))],
            union_type(LuaType::String, LuaType::Nil),
        )));
        assert_eq!(instantiate_type(&func, &substitutor), expected);
    }

    #[test]
    fn test_variadic_template_splices() {
        let mut substitutor = TypeSubstitutor::new();
        substitutor.insert(
            Arc::from("R"),
            LuaType::multi(vec![LuaType::Integer, LuaType::String]),
        );
        let ret = LuaType::multi(vec![
            LuaType::Boolean,
            LuaType::MultiReturn(Arc::new(LuaMultiReturn::Base(tpl("R")))),
        ]);
        assert_eq!(
            instantiate_type(&ret, &substitutor),
            LuaType::multi(vec![LuaType::Boolean, LuaType::Integer, LuaType::String])
        );
    }
}
