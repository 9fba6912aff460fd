use super::SearchContext;
use crate::index::LuaMemberKey;
use crate::types::LuaType;

impl<'a> SearchContext<'a> {
    /// Whether a value of type `sub` may be used where `sup` is expected.
    ///
    /// `unknown`, `any` and unbound templates accept and are accepted by
    /// everything, so missing information never produces a mismatch.
    pub fn is_subtype(&mut self, sub: &LuaType, sup: &LuaType) -> bool {
        self.guarded(true, |ctx| ctx.is_subtype_inner(sub, sup))
    }

    fn is_subtype_inner(&mut self, sub: &LuaType, sup: &LuaType) -> bool {
        if sub == sup {
            return true;
        }
        match (sub, sup) {
            (LuaType::Unknown | LuaType::Any | LuaType::TplRef(_) | LuaType::SelfInfer, _) => {
                return true
            }
            (_, LuaType::Unknown | LuaType::Any | LuaType::TplRef(_) | LuaType::SelfInfer) => {
                return true
            }
            (LuaType::Never, _) => return true,
            (LuaType::MultiReturn(_), _) => return self.is_subtype(&sub.first_value(), sup),
            (_, LuaType::MultiReturn(_)) => return self.is_subtype(sub, &sup.first_value()),
            // every alternative must fit
            (LuaType::Union(union), _) => {
                let alternatives = union.types().to_vec();
                return alternatives.iter().all(|ty| self.is_subtype(ty, sup));
            }
            _ => {}
        }

        let sup = match sup {
            LuaType::Ref(_) | LuaType::Generic(_) if self.is_alias(sup) => self.resolve_alias(sup),
            _ => sup.clone(),
        };
        let sub = match sub {
            LuaType::Ref(_) | LuaType::Generic(_) if self.is_alias(sub) => self.resolve_alias(sub),
            _ => sub.clone(),
        };
        if sub == sup || sup.is_unknown() || sub.is_unknown() {
            return true;
        }

        match (&sub, &sup) {
            (_, LuaType::Union(union)) => {
                let alternatives = union.types().to_vec();
                if matches!(sub, LuaType::Union(_)) {
                    return self.is_subtype(&sub, &sup);
                }
                alternatives.iter().any(|ty| self.is_subtype(&sub, ty))
            }
            (LuaType::Union(_), _) => self.is_subtype(&sub, &sup),

            (LuaType::BooleanConst(_), LuaType::Boolean) => true,
            (LuaType::IntegerConst(_), LuaType::Integer | LuaType::Number) => true,
            (LuaType::Integer, LuaType::Number) => true,
            (LuaType::StringConst(_), LuaType::String) => true,

            (_, LuaType::Ref(name)) if self.is_enum(name) => self.enum_accepts(name, &sub),
            (LuaType::Ref(name), _) if self.is_enum(name) => {
                let values = self.enum_values(name);
                !values.is_empty() && values.iter().all(|value| self.is_subtype(value, &sup))
            }
            (LuaType::Ref(sub_name), LuaType::Ref(sup_name)) => self.inherits(sub_name, sup_name),
            (LuaType::Generic(sub_generic), LuaType::Ref(sup_name)) => {
                self.inherits(&sub_generic.base, sup_name)
            }
            (LuaType::Generic(sub_generic), LuaType::Generic(sup_generic)) => {
                if sub_generic.base == sup_generic.base {
                    let pairs: Vec<_> = sub_generic
                        .params
                        .iter()
                        .cloned()
                        .zip(sup_generic.params.iter().cloned())
                        .collect();
                    return pairs.iter().all(|(sub, sup)| self.is_subtype(sub, sup));
                }
                self.inherits(&sub_generic.base, &sup_generic.base)
            }

            // table-like values
            (
                LuaType::Table
                | LuaType::TableConst(_)
                | LuaType::Array(_)
                | LuaType::Tuple(_)
                | LuaType::Object(_)
                | LuaType::Ref(_)
                | LuaType::Generic(_),
                LuaType::Table,
            ) => true,
            (LuaType::Table, LuaType::Ref(_) | LuaType::Generic(_) | LuaType::Object(_) | LuaType::Array(_)) => {
                true
            }
            (LuaType::TableConst(_), LuaType::Ref(_) | LuaType::Generic(_)) => true,
            (LuaType::TableConst(_), LuaType::Object(object)) => {
                let object = object.clone();
                object.fields.iter().all(|(key, expected)| {
                    match self.find_member(&sub, key) {
                        Some(info) => self.is_subtype(&info.ty, expected),
                        None => expected.is_optional(),
                    }
                })
            }
            (LuaType::TableConst(_), LuaType::Array(base)) => {
                let base = base.as_ref().clone();
                let members = self.find_members(&sub);
                members.iter().all(|info| {
                    matches!(info.key, LuaMemberKey::Integer(_)) && self.is_subtype(&info.ty, &base)
                })
            }
            (LuaType::Array(sub_base), LuaType::Array(sup_base)) => {
                let (sub_base, sup_base) = (sub_base.clone(), sup_base.clone());
                self.is_subtype(&sub_base, &sup_base)
            }
            (LuaType::Tuple(types), LuaType::Array(base)) => {
                let (types, base) = (types.clone(), base.clone());
                types.iter().all(|ty| self.is_subtype(ty, &base))
            }
            (LuaType::Tuple(sub_types), LuaType::Tuple(sup_types)) => {
                let (sub_types, sup_types) = (sub_types.clone(), sup_types.clone());
                sub_types.len() >= sup_types.len()
                    && sub_types
                        .iter()
                        .zip(sup_types.iter())
                        .all(|(sub, sup)| self.is_subtype(sub, sup))
            }
            (LuaType::Array(base), LuaType::Generic(generic)) if generic.base.as_ref() == "table" => {
                let (base, generic) = (base.clone(), generic.clone());
                generic
                    .params
                    .first()
                    .map_or(true, |key| self.is_subtype(&LuaType::Integer, key))
                    && generic
                        .params
                        .get(1)
                        .map_or(true, |value| self.is_subtype(&base, value))
            }
            (LuaType::Object(_) | LuaType::Ref(_), LuaType::Object(_)) => true,

            // function-like values
            (
                LuaType::Function | LuaType::DocFunction(_) | LuaType::Signature(_),
                LuaType::Function | LuaType::DocFunction(_),
            ) => true,
            (LuaType::Ref(_), LuaType::Function | LuaType::DocFunction(_)) => {
                !self.find_callable_type(&sub).is_empty()
            }

            _ => false,
        }
    }

    fn is_alias(&self, ty: &LuaType) -> bool {
        let name = match ty {
            LuaType::Ref(name) => name,
            LuaType::Generic(generic) => &generic.base,
            _ => return false,
        };
        self.index
            .query_type_decl(name)
            .is_some_and(|decl| decl.is_alias())
    }

    /// `sub` names `sup` or one of its supers does.
    pub(crate) fn inherits(&mut self, sub: &str, sup: &str) -> bool {
        if sub == sup {
            return true;
        }
        let supers: Vec<LuaType> = self.index.query_supers(sub).into_iter().cloned().collect();
        supers.iter().any(|super_type| {
            let name = match super_type {
                LuaType::Ref(name) => name.clone(),
                LuaType::Generic(generic) => generic.base.clone(),
                _ => return false,
            };
            self.guarded(false, |ctx| ctx.inherits(&name, sup))
        })
    }

    /// Values assigned to the fields of an enum.
    pub(crate) fn enum_values(&mut self, name: &str) -> Vec<LuaType> {
        let ty = LuaType::reference(name);
        self.find_members(&ty).into_iter().map(|info| info.ty).collect()
    }

    fn enum_accepts(&mut self, name: &str, value: &LuaType) -> bool {
        if let LuaType::Ref(other) = value {
            if other.as_ref() == name {
                return true;
            }
        }
        let base = self
            .index
            .query_type_decl(name)
            .and_then(|decl| decl.enum_base())
            .cloned();
        let values = self.enum_values(name);
        if values.iter().any(|member| member == value) {
            return true;
        }
        match base {
            Some(base) => self.is_subtype(value, &base),
            // a non-literal of the members' base type may hold any of them
            None => !value.is_literal() && values.iter().any(|member| self.is_subtype(member, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::index::WorkspaceIndex;
    use crate::types::union_type;
    use crate::vfs::Vfs;

    #[test]
    fn test_builtin_subtyping() {
        let vfs = Vfs::new();
        let index = WorkspaceIndex::default();
        let config = AnalysisConfig::default();
        let mut ctx = SearchContext::new(&vfs, &index, &config);

        assert!(ctx.is_subtype(&LuaType::IntegerConst(1), &LuaType::Number));
        assert!(ctx.is_subtype(&LuaType::Integer, &LuaType::Number));
        assert!(!ctx.is_subtype(&LuaType::Number, &LuaType::Integer));
        assert!(ctx.is_subtype(&LuaType::string_const("a"), &union_type(LuaType::String, LuaType::Nil)));
        assert!(!ctx.is_subtype(&union_type(LuaType::String, LuaType::Nil), &LuaType::String));
        assert!(ctx.is_subtype(&LuaType::Unknown, &LuaType::String));
        assert!(ctx.is_subtype(&LuaType::Boolean, &LuaType::Any));
        assert!(!ctx.is_subtype(&LuaType::String, &LuaType::Integer));
    }
}
