use std::fmt;

use super::{LuaFunctionType, LuaMultiReturn, LuaType};
use crate::index::{LuaMemberKey, MemberOwner};

/// Renders a type the way it would be written in a doc comment.
pub fn format_type(ty: &LuaType) -> String {
    ty.to_string()
}

impl fmt::Display for LuaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaType::Unknown => f.write_str("unknown"),
            LuaType::Any => f.write_str("any"),
            LuaType::Never => f.write_str("never"),
            LuaType::Nil => f.write_str("nil"),
            LuaType::Boolean => f.write_str("boolean"),
            LuaType::Integer => f.write_str("integer"),
            LuaType::Number => f.write_str("number"),
            LuaType::String => f.write_str("string"),
            LuaType::Table => f.write_str("table"),
            LuaType::Function => f.write_str("function"),
            LuaType::Thread => f.write_str("thread"),
            LuaType::Userdata => f.write_str("userdata"),
            LuaType::SelfInfer => f.write_str("self"),
            LuaType::BooleanConst(value) => write!(f, "{value}"),
            LuaType::IntegerConst(value) => write!(f, "{value}"),
            LuaType::StringConst(value) => write!(f, "{value:?}"),
            LuaType::Ref(name) | LuaType::TplRef(name) => f.write_str(name),
            LuaType::Array(base) => match base.as_ref() {
                LuaType::Union(_) | LuaType::DocFunction(_) => write!(f, "({base})[]"),
                _ => write!(f, "{base}[]"),
            },
            LuaType::Tuple(types) => {
                f.write_str("[")?;
                write_list(f, types.iter(), ", ")?;
                f.write_str("]")
            }
            LuaType::Object(object) => {
                f.write_str("{ ")?;
                let mut first = true;
                for (key, ty) in &object.fields {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    match key {
                        LuaMemberKey::Name(name) => write!(f, "{name}: {ty}")?,
                        LuaMemberKey::Integer(index) => write!(f, "[{index}]: {ty}")?,
                    }
                }
                for (key, value) in &object.index_access {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "[{key}]: {value}")?;
                }
                f.write_str(" }")
            }
            LuaType::Union(union) => {
                let types = union.types();
                // `T?` for a two-member union with nil
                if types.len() == 2 && types.contains(&LuaType::Nil) {
                    let other = types.iter().find(|ty| !ty.is_nil()).unwrap_or(&LuaType::Nil);
                    return match other {
                        LuaType::DocFunction(_) => write!(f, "({other})?"),
                        _ => write!(f, "{other}?"),
                    };
                }
                write_list(f, types.iter(), "|")
            }
            LuaType::Generic(generic) => {
                write!(f, "{}<", generic.base)?;
                write_list(f, generic.params.iter(), ", ")?;
                f.write_str(">")
            }
            LuaType::DocFunction(func) => write_function(f, func),
            LuaType::Signature(_) => f.write_str("function"),
            LuaType::MultiReturn(multi) => match multi.as_ref() {
                LuaMultiReturn::Base(base) => write!(f, "...{base}"),
                LuaMultiReturn::Multi(types) => write_list(f, types.iter(), ", "),
            },
            LuaType::TableConst(owner) => match owner.as_ref() {
                MemberOwner::Global(path) => write!(f, "table<{path}>"),
                _ => f.write_str("table"),
            },
        }
    }
}

fn write_list<'a>(
    f: &mut fmt::Formatter<'_>,
    types: impl Iterator<Item = &'a LuaType>,
    separator: &str,
) -> fmt::Result {
    for (i, ty) in types.enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{ty}")?;
    }
    Ok(())
}

pub(crate) fn write_function(f: &mut fmt::Formatter<'_>, func: &LuaFunctionType) -> fmt::Result {
    if func.is_async {
        f.write_str("async ")?;
    }
    f.write_str("fun(")?;
    for (i, (name, ty)) in func.params.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        match ty {
            Some(ty) => write!(f, "{name}: {ty}")?,
            None => f.write_str(name)?,
        }
    }
    f.write_str(")")?;
    match &func.ret {
        LuaType::Nil => Ok(()),
        ret => write!(f, ": {ret}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::{union_type, LuaGenericType};

    #[test]
    fn test_format_common_shapes() {
        let tpl = LuaType::TplRef(Arc::from("T"));
        let func = LuaType::DocFunction(Arc::new(LuaFunctionType::new(
            vec![("a".to_string(), Some(tpl.clone()))],
            tpl,
        )));
        assert_eq!(format_type(&func), "fun(a: T): T");
        assert_eq!(format_type(&LuaType::Array(Arc::new(LuaType::String))), "string[]");
        assert_eq!(format_type(&union_type(LuaType::Integer, LuaType::String)), "integer|string");
        assert_eq!(format_type(&union_type(LuaType::Integer, LuaType::Nil)), "integer?");
        assert_eq!(
            format_type(&LuaType::Generic(Arc::new(LuaGenericType::new(
                "table",
                vec![LuaType::String, LuaType::Integer]
            )))),
            "table<string, integer>"
        );
    }

    #[test]
    fn test_builtin_function_differs_from_doc_function() {
        let shape = LuaType::DocFunction(Arc::new(LuaFunctionType::new(Vec::new(), LuaType::Nil)));
        assert_eq!(format_type(&LuaType::Function), "function");
        assert_eq!(format_type(&shape), "fun()");
        assert_ne!(LuaType::Function, shape);
    }
}
