use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use super::SearchContext;
use crate::index::{LuaMember, LuaMemberKey, MemberOwner};
use crate::types::{instantiate_type, union_many, ArcStr, LuaType, TypeSubstitutor};

/// A member visible on a type, with its type as seen through that type.
#[derive(Debug, Clone)]
pub struct LuaMemberInfo<'a> {
    pub key: LuaMemberKey,
    pub ty: LuaType,
    /// `None` for fields of a doc object type, which have no definition
    /// site.
    pub member: Option<&'a LuaMember>,
}

/// Where the members of a type live, in lookup order.
#[derive(Debug, Default)]
struct MemberSources {
    owners: Vec<(MemberOwner, TypeSubstitutor)>,
    fields: Vec<(LuaMemberKey, LuaType)>,
}

impl<'a> SearchContext<'a> {
    /// Every member of `ty`. A key defined at several levels of a class
    /// hierarchy appears once, from the most derived class.
    pub fn find_members(&mut self, ty: &LuaType) -> Vec<LuaMemberInfo<'a>> {
        let index = self.index;
        let sources = self.member_sources(ty);
        let mut found: IndexMap<LuaMemberKey, LuaMemberInfo<'a>> = IndexMap::new();
        for (owner, substitutor) in &sources.owners {
            for member in index.query_members(owner) {
                if found.contains_key(&member.key) {
                    continue;
                }
                let Some(member) = index.query_member(owner, &member.key) else {
                    continue;
                };
                let member_ty = self.member_type(member, substitutor, ty);
                found.insert(
                    member.key.clone(),
                    LuaMemberInfo {
                        key: member.key.clone(),
                        ty: member_ty,
                        member: Some(member),
                    },
                );
            }
        }
        for (key, field_ty) in sources.fields {
            found.entry(key.clone()).or_insert(LuaMemberInfo {
                key,
                ty: field_ty,
                member: None,
            });
        }
        found.into_values().collect()
    }

    /// The member `key` of `ty`. On a union the alternatives that have it
    /// contribute to its type; `nil` alternatives are skipped.
    pub fn find_member(&mut self, ty: &LuaType, key: &LuaMemberKey) -> Option<LuaMemberInfo<'a>> {
        if let LuaType::Union(union) = ty {
            let mut member = None;
            let mut types = Vec::new();
            for alternative in union.types().iter().filter(|ty| !ty.is_nil()) {
                if let Some(info) = self.find_member(alternative, key) {
                    member = member.or(info.member);
                    types.push(info.ty);
                }
            }
            if types.is_empty() {
                return None;
            }
            return Some(LuaMemberInfo {
                key: key.clone(),
                ty: union_many(types),
                member,
            });
        }

        let index = self.index;
        let sources = self.member_sources(ty);
        for (owner, substitutor) in &sources.owners {
            if let Some(member) = index.query_member(owner, key) {
                let member_ty = self.member_type(member, substitutor, ty);
                return Some(LuaMemberInfo {
                    key: key.clone(),
                    ty: member_ty,
                    member: Some(member),
                });
            }
        }
        sources
            .fields
            .into_iter()
            .find(|(field, _)| field == key)
            .map(|(key, ty)| LuaMemberInfo {
                key,
                ty,
                member: None,
            })
    }

    fn member_type(&mut self, member: &LuaMember, substitutor: &TypeSubstitutor, receiver: &LuaType) -> LuaType {
        if let Some(declared) = &member.declared_type {
            let mut substitutor = substitutor.clone();
            substitutor.set_self_type(receiver.clone());
            return instantiate_type(declared, &substitutor);
        }
        match member.value {
            Some(value) => self.infer_element(value).first_value(),
            None => LuaType::Unknown,
        }
    }

    fn member_sources(&mut self, ty: &LuaType) -> MemberSources {
        let mut sources = MemberSources::default();
        let mut visited = FxHashSet::default();
        self.collect_sources(ty, &TypeSubstitutor::new(), &mut visited, &mut sources);
        sources
    }

    fn collect_sources(
        &mut self,
        ty: &LuaType,
        substitutor: &TypeSubstitutor,
        visited: &mut FxHashSet<ArcStr>,
        sources: &mut MemberSources,
    ) {
        let index = self.index;
        match ty {
            LuaType::Ref(name) => {
                if index.query_type_decl(name).is_some_and(|decl| decl.is_alias()) {
                    let resolved = self.resolve_alias(ty);
                    if !matches!(resolved, LuaType::Ref(_) | LuaType::Unknown) {
                        self.collect_sources(&resolved, substitutor, visited, sources);
                    }
                    return;
                }
                self.collect_class(name, substitutor, visited, sources);
            }
            LuaType::Generic(generic) => {
                let Some(decl) = index.query_type_decl(&generic.base) else {
                    return;
                };
                if decl.is_alias() {
                    let resolved = self.resolve_alias(ty);
                    if !matches!(resolved, LuaType::Generic(_) | LuaType::Unknown) {
                        self.collect_sources(&resolved, substitutor, visited, sources);
                    }
                    return;
                }
                let names: Vec<ArcStr> = decl.generic_params().iter().map(|(name, _)| name.clone()).collect();
                let params: Vec<LuaType> = generic
                    .params
                    .iter()
                    .map(|param| instantiate_type(param, substitutor))
                    .collect();
                let substitutor = TypeSubstitutor::from_params(&names, &params);
                let base = generic.base.clone();
                self.collect_class(&base, &substitutor, visited, sources);
            }
            LuaType::TableConst(owner) => {
                sources.owners.push((owner.as_ref().clone(), substitutor.clone()));
            }
            LuaType::String | LuaType::StringConst(_) => {
                let owner = MemberOwner::Global(Arc::from("string"));
                if !sources.owners.iter().any(|(known, _)| known == &owner) {
                    sources.owners.push((owner, TypeSubstitutor::new()));
                }
            }
            LuaType::Object(object) => {
                for (key, field_ty) in &object.fields {
                    sources.fields.push((key.clone(), instantiate_type(field_ty, substitutor)));
                }
            }
            LuaType::Union(union) => {
                for alternative in union.types().iter().filter(|ty| !ty.is_nil()) {
                    self.collect_sources(alternative, substitutor, visited, sources);
                }
            }
            _ => {}
        }
    }

    /// A class contributes its own members, those of global tables declared
    /// as its instances, then those of its supers.
    fn collect_class(
        &mut self,
        name: &ArcStr,
        substitutor: &TypeSubstitutor,
        visited: &mut FxHashSet<ArcStr>,
        sources: &mut MemberSources,
    ) {
        if !visited.insert(name.clone()) {
            return;
        }
        sources
            .owners
            .push((MemberOwner::Type(name.clone()), substitutor.clone()));
        let index = self.index;
        for owner in index.class_globals(name) {
            sources.owners.push((owner.clone(), substitutor.clone()));
        }
        let supers: Vec<LuaType> = self
            .index
            .query_supers(name)
            .into_iter()
            .map(|super_type| instantiate_type(super_type, substitutor))
            .collect();
        for super_type in supers {
            self.collect_sources(&super_type, substitutor, visited, sources);
        }
    }
}
