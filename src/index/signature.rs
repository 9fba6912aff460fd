use std::sync::Arc;

use crate::types::{ArcStr, LuaFunctionType, LuaType};
use crate::vfs::LuaSyntaxId;

/// A function defined in code, identified by its closure expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LuaSignatureId(LuaSyntaxId);

impl LuaSignatureId {
    pub fn new(closure: LuaSyntaxId) -> Self {
        Self(closure)
    }

    pub fn syntax_id(&self) -> LuaSyntaxId {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LuaDocParamInfo {
    pub name: String,
    pub ty: LuaType,
    pub nullable: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LuaDocReturnInfo {
    pub name: Option<String>,
    pub ty: LuaType,
    pub description: Option<String>,
}

/// Everything known about one function definition: the parameter names from
/// code plus whatever its doc comment declares.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LuaSignature {
    pub generics: Vec<(ArcStr, Option<LuaType>)>,
    /// Parameter names in code order; a vararg is `...`.
    pub params: Vec<String>,
    pub param_docs: Vec<LuaDocParamInfo>,
    pub return_docs: Vec<LuaDocReturnInfo>,
    pub overloads: Vec<Arc<LuaFunctionType>>,
    /// Defined with `:`, so `self` is an implicit first parameter.
    pub is_colon_define: bool,
    pub is_async: bool,
    pub nodiscard: bool,
    pub description: Option<String>,
}

impl LuaSignature {
    pub fn new(params: Vec<String>, is_colon_define: bool) -> Self {
        Self {
            params,
            is_colon_define,
            ..Default::default()
        }
    }

    pub fn param_doc(&self, name: &str) -> Option<&LuaDocParamInfo> {
        self.param_docs.iter().find(|info| info.name == name)
    }

    /// Declared type of a parameter, made optional by `name?`.
    pub fn param_type(&self, name: &str) -> Option<LuaType> {
        let info = self.param_doc(name)?;
        Some(match info.nullable {
            true => info.ty.clone().nullable(),
            false => info.ty.clone(),
        })
    }

    pub fn has_doc_returns(&self) -> bool {
        !self.return_docs.is_empty()
    }

    pub fn doc_return_type(&self) -> LuaType {
        LuaType::from_returns(self.return_docs.iter().map(|ret| ret.ty.clone()).collect())
    }

    pub fn generic_names(&self) -> Vec<ArcStr> {
        self.generics.iter().map(|(name, _)| name.clone()).collect()
    }

    /// The main signature as a function type with `ret` as its result.
    pub fn to_function_type(&self, ret: LuaType) -> LuaFunctionType {
        LuaFunctionType {
            is_async: self.is_async,
            is_colon_define: self.is_colon_define,
            params: self
                .params
                .iter()
                .map(|name| (name.clone(), self.param_type(name)))
                .collect(),
            ret,
        }
    }
}
