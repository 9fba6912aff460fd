//! The type model shared by the index and the inference engine.
//!
//! Types never point at each other directly through names: a class, enum or
//! alias is referenced by `Ref(name)` and looked up through the workspace
//! index, so type values themselves are always finite trees.

mod humanize;
mod substitute;
mod union;

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;

pub use humanize::format_type;
pub use substitute::{instantiate_type, TypeSubstitutor};
pub(crate) use substitute::instantiate_function;
pub use union::{narrow_falsy, narrow_truthy, remove_type, union_many, union_type};

use crate::index::{LuaMemberKey, LuaSignatureId, MemberOwner};

pub type ArcStr = Arc<str>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum LuaType {
    /// No information. Compatible with everything in both directions.
    #[default]
    Unknown,
    Any,
    /// The empty type, e.g. `nil` with `nil` removed.
    Never,
    Nil,
    Boolean,
    Integer,
    Number,
    String,
    Table,
    Function,
    Thread,
    Userdata,
    /// `self` inside doc types; replaced by the receiver at use sites.
    SelfInfer,
    BooleanConst(bool),
    IntegerConst(i64),
    StringConst(ArcStr),
    /// A class, enum, interface or alias, by name.
    Ref(ArcStr),
    /// A generic parameter placeholder.
    TplRef(ArcStr),
    Array(Arc<LuaType>),
    Tuple(Arc<Vec<LuaType>>),
    Object(Arc<LuaObjectType>),
    Union(Arc<LuaUnionType>),
    Generic(Arc<LuaGenericType>),
    /// A function shape written in doc syntax or produced by instantiation.
    DocFunction(Arc<LuaFunctionType>),
    /// A function defined in code; its signature and overloads live in the
    /// index.
    Signature(LuaSignatureId),
    MultiReturn(Arc<LuaMultiReturn>),
    /// A table constructor without a class; members are found by owner.
    TableConst(Arc<MemberOwner>),
}

impl LuaType {
    pub fn is_unknown(&self) -> bool {
        matches!(self, LuaType::Unknown)
    }

    pub fn is_any(&self) -> bool {
        matches!(self, LuaType::Any)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, LuaType::Nil)
    }

    /// `T|nil`, `T?` and plain `nil` accept a missing value.
    pub fn is_optional(&self) -> bool {
        match self {
            LuaType::Nil | LuaType::Any | LuaType::Unknown => true,
            LuaType::Union(union) => union.types().iter().any(LuaType::is_optional),
            _ => false,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, LuaType::String | LuaType::StringConst(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, LuaType::Integer | LuaType::IntegerConst(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(
            self,
            LuaType::Number | LuaType::Integer | LuaType::IntegerConst(_)
        )
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, LuaType::Boolean | LuaType::BooleanConst(_))
    }

    pub fn is_function_like(&self) -> bool {
        matches!(
            self,
            LuaType::Function | LuaType::DocFunction(_) | LuaType::Signature(_)
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            LuaType::BooleanConst(_) | LuaType::IntegerConst(_) | LuaType::StringConst(_)
        )
    }

    pub fn contains_tpl(&self) -> bool {
        match self {
            LuaType::TplRef(_) | LuaType::SelfInfer => true,
            _ => self.children().into_iter().any(LuaType::contains_tpl),
        }
    }

    /// Literal types lose their value: `"a"` becomes `string`.
    pub fn widen(&self) -> LuaType {
        match self {
            LuaType::BooleanConst(_) => LuaType::Boolean,
            LuaType::IntegerConst(_) => LuaType::Integer,
            LuaType::StringConst(_) => LuaType::String,
            LuaType::Union(union) => union_many(union.types().iter().map(LuaType::widen).collect()),
            other => other.clone(),
        }
    }

    /// Direct child types, for uniform traversal.
    pub fn children(&self) -> Vec<&LuaType> {
        match self {
            LuaType::Array(base) => vec![base.as_ref()],
            LuaType::Tuple(types) => types.iter().collect(),
            LuaType::Object(object) => object
                .fields
                .iter()
                .map(|(_, ty)| ty)
                .chain(object.index_access.iter().flat_map(|(key, value)| [key, value]))
                .collect(),
            LuaType::Union(union) => union.types().iter().collect(),
            LuaType::Generic(generic) => generic.params.iter().collect(),
            LuaType::DocFunction(func) => func
                .params
                .iter()
                .filter_map(|(_, ty)| ty.as_ref())
                .chain(std::iter::once(&func.ret))
                .collect(),
            LuaType::MultiReturn(multi) => match multi.as_ref() {
                LuaMultiReturn::Multi(types) => types.iter().collect(),
                LuaMultiReturn::Base(base) => vec![base],
            },
            _ => Vec::new(),
        }
    }

    /// The first value of a multi-value type, the value itself otherwise.
    pub fn first_value(&self) -> LuaType {
        match self {
            LuaType::MultiReturn(multi) => multi.get(0).unwrap_or(LuaType::Nil),
            other => other.clone(),
        }
    }

    pub fn multi(types: Vec<LuaType>) -> LuaType {
        LuaType::MultiReturn(Arc::new(LuaMultiReturn::Multi(types)))
    }

    /// Builds a return type from a list of values: nothing, one value or
    /// a multi-return.
    pub fn from_returns(mut types: Vec<LuaType>) -> LuaType {
        match types.len() {
            0 => LuaType::Nil,
            1 => types.remove(0),
            _ => LuaType::multi(types),
        }
    }

    pub fn nullable(self) -> LuaType {
        union_type(self, LuaType::Nil)
    }

    pub fn string_const(value: &str) -> LuaType {
        LuaType::StringConst(Arc::from(value))
    }

    pub fn reference(name: &str) -> LuaType {
        LuaType::Ref(Arc::from(name))
    }

    /// Builtin names usable in doc types.
    pub fn from_builtin_name(name: &str) -> Option<LuaType> {
        BUILTIN_TYPES.get(name).cloned()
    }
}

static BUILTIN_TYPES: phf::Map<&'static str, LuaType> = phf::phf_map! {
    "unknown" => LuaType::Unknown,
    "any" => LuaType::Any,
    "nil" => LuaType::Nil,
    "void" => LuaType::Nil,
    "never" => LuaType::Never,
    "boolean" => LuaType::Boolean,
    "bool" => LuaType::Boolean,
    "integer" => LuaType::Integer,
    "int" => LuaType::Integer,
    "number" => LuaType::Number,
    "string" => LuaType::String,
    "table" => LuaType::Table,
    "function" => LuaType::Function,
    "thread" => LuaType::Thread,
    "userdata" => LuaType::Userdata,
    "lightuserdata" => LuaType::Userdata,
    "self" => LuaType::SelfInfer,
};

/// Alternatives of a union. Equality and hashing ignore member order.
#[derive(Debug, Clone, Eq)]
pub struct LuaUnionType {
    types: Vec<LuaType>,
}

impl LuaUnionType {
    /// Callers go through [`union_many`], which keeps the members flat and
    /// unique.
    pub(crate) fn new(types: Vec<LuaType>) -> Self {
        Self { types }
    }

    pub fn types(&self) -> &[LuaType] {
        &self.types
    }
}

impl PartialEq for LuaUnionType {
    fn eq(&self, other: &Self) -> bool {
        self.types.len() == other.types.len() && self.types.iter().all(|ty| other.types.contains(ty))
    }
}

impl Hash for LuaUnionType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut combined: u64 = 0;
        for ty in &self.types {
            let mut hasher = FxHasher::default();
            ty.hash(&mut hasher);
            combined = combined.wrapping_add(hasher.finish());
        }
        self.types.len().hash(state);
        combined.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LuaGenericType {
    pub base: ArcStr,
    pub params: Vec<LuaType>,
}

impl LuaGenericType {
    pub fn new(base: &str, params: Vec<LuaType>) -> Self {
        Self {
            base: Arc::from(base),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LuaObjectType {
    pub fields: Vec<(LuaMemberKey, LuaType)>,
    /// `[K]: V` entries.
    pub index_access: Vec<(LuaType, LuaType)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LuaFunctionType {
    pub is_async: bool,
    /// Declared with `:` so the first argument is the receiver.
    pub is_colon_define: bool,
    /// Parameter names and optional types; a vararg is named `...`.
    pub params: Vec<(String, Option<LuaType>)>,
    pub ret: LuaType,
}

impl LuaFunctionType {
    pub fn new(params: Vec<(String, Option<LuaType>)>, ret: LuaType) -> Self {
        Self {
            params,
            ret,
            ..Default::default()
        }
    }

    pub fn is_vararg(&self) -> bool {
        self.params.last().is_some_and(|(name, _)| name == "...")
    }
}

/// Several values produced at once by a call or a `...` expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LuaMultiReturn {
    /// A fixed list; a trailing `Base` element stands for an unbounded tail.
    Multi(Vec<LuaType>),
    /// Any number of values of one type.
    Base(LuaType),
}

impl LuaMultiReturn {
    pub fn get(&self, index: usize) -> Option<LuaType> {
        match self {
            LuaMultiReturn::Base(base) => Some(base.clone()),
            LuaMultiReturn::Multi(types) => {
                let last = types.len().checked_sub(1)?;
                if index < last {
                    return Some(types[index].clone());
                }
                match &types[last] {
                    LuaType::MultiReturn(tail) => tail.get(index - last),
                    ty if index == last => Some(ty.clone()),
                    _ => None,
                }
            }
        }
    }

    /// Number of values, `None` when unbounded.
    pub fn len(&self) -> Option<usize> {
        match self {
            LuaMultiReturn::Base(_) => None,
            LuaMultiReturn::Multi(types) => match types.last() {
                Some(LuaType::MultiReturn(tail)) => tail.len().map(|n| n + types.len() - 1),
                _ => Some(types.len()),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }
}

/// Expands a value list whose last element is itself a multi-value (a call
/// in last position) into one flat list.
pub fn flatten_multi(mut types: Vec<LuaType>) -> Vec<LuaType> {
    if let Some(LuaType::MultiReturn(tail)) = types.last().cloned() {
        types.pop();
        match tail.as_ref() {
            LuaMultiReturn::Multi(rest) => types.extend(flatten_multi(rest.clone())),
            LuaMultiReturn::Base(_) => types.push(LuaType::MultiReturn(tail)),
        }
    }
    types
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_return_tail_lookup() {
        let multi = LuaMultiReturn::Multi(vec![
            LuaType::Integer,
            LuaType::MultiReturn(Arc::new(LuaMultiReturn::Base(LuaType::String))),
        ]);
        assert_eq!(multi.get(0), Some(LuaType::Integer));
        assert_eq!(multi.get(5), Some(LuaType::String));
        assert_eq!(multi.len(), None);
    }

    #[test]
    fn test_flatten_nested_multi() {
        let inner = LuaType::multi(vec![LuaType::String, LuaType::Boolean]);
        let flat = flatten_multi(vec![LuaType::Integer, inner]);
        assert_eq!(flat, vec![LuaType::Integer, LuaType::String, LuaType::Boolean]);
    }

    #[test]
    fn test_widen_literals() {
        let ty = union_type(LuaType::string_const("a"), LuaType::IntegerConst(1));
        assert_eq!(ty.widen(), union_type(LuaType::String, LuaType::Integer));
    }
}
