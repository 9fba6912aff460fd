use std::sync::Arc;

use super::doc_type::doc_type;
use super::{assign_targets, defined_closure, DocAnalysis, DocAttachment};
use crate::config::LuaVersion;
use crate::decl::{LuaDeclId, Visibility};
use crate::diagnostics::{DiagnosticCode, DiagnosticSuppression, SuppressionAction};
use crate::index::{
    LuaDocParamInfo, LuaDocReturnInfo, LuaMember, LuaMemberKey, LuaMemberSource, LuaOperator,
    LuaOperatorKind, LuaSignature, LuaSignatureId, LuaTypeDeclKind, LuaTypeDeclPart, MemberOwner,
};
use crate::syntax::{LuaSyntaxKind, LuaSyntaxNode, LuaTokenKind};
use crate::types::{union_many, ArcStr, LuaType};
use crate::vfs::LuaSyntaxId;

/// Applies doc comments: named types, signatures, declared types and
/// features of declarations, diagnostic comments.
pub(super) fn analyze(analysis: &mut DocAnalysis) {
    let tree = analysis.tree;
    let root = tree.root();
    for closure in root
        .descendants()
        .filter(|node| node.kind() == LuaSyntaxKind::ClosureExpr)
    {
        add_signature(analysis, &closure);
    }
    for comment in root
        .descendants()
        .filter(|node| node.kind() == LuaSyntaxKind::Comment)
    {
        analyze_comment(analysis, &comment);
    }
}

fn add_signature(analysis: &mut DocAnalysis, closure: &LuaSyntaxNode) {
    let params = closure
        .child(LuaSyntaxKind::ParamList)
        .map(|list| {
            list.children_of(LuaSyntaxKind::ParamName)
                .filter_map(|param| {
                    param
                        .token(LuaTokenKind::Name)
                        .or_else(|| param.token(LuaTokenKind::Dots))
                })
                .map(|token| token.text().to_string())
                .collect()
        })
        .unwrap_or_default();
    let is_colon_define = closure.parent().is_some_and(|parent| {
        parent.kind() == LuaSyntaxKind::FuncStat
            && parent
                .child(LuaSyntaxKind::IndexExpr)
                .is_some_and(|name| name.has_token(LuaTokenKind::Colon))
    });
    let id = LuaSignatureId::new(LuaSyntaxId::from_node(analysis.doc_id, closure));
    analysis
        .index
        .add_signature(id, LuaSignature::new(params, is_colon_define));
}

/// Text of the `DocDescription` node under `node`, if any.
fn description(node: &LuaSyntaxNode) -> Option<String> {
    let text = node
        .child(LuaSyntaxKind::DocDescription)?
        .token(LuaTokenKind::DocDescription)?
        .text()
        .trim()
        .to_string();
    (!text.is_empty()).then_some(text)
}

fn generic_params(node: &LuaSyntaxNode, generics: &[ArcStr]) -> Vec<(ArcStr, Option<LuaType>)> {
    node.children_of(LuaSyntaxKind::DocGenericParam)
        .filter_map(|param| {
            let name = param.name_text()?;
            let constraint = param.doc_types().next().map(|ty| doc_type(&ty, generics));
            Some((Arc::from(name), constraint))
        })
        .collect()
}

fn analyze_comment(analysis: &mut DocAnalysis, comment: &LuaSyntaxNode) {
    let attached_to = comment.parent().filter(|parent| {
        parent.kind().is_stat() || parent.kind() == LuaSyntaxKind::TableField
    });

    let mut attachment = DocAttachment::default();
    for tag in comment.children_of(LuaSyntaxKind::DocTagGeneric) {
        attachment.generics.extend(generic_params(&tag, &[]));
    }
    let comment_generics: Vec<ArcStr> = attachment
        .generics
        .iter()
        .map(|(name, _)| name.clone())
        .collect();

    // class the following `@field`/`@operator` tags belong to, with its
    // generic parameters
    let mut current_class: Option<(ArcStr, Vec<ArcStr>)> = None;

    for tag in comment.child_nodes() {
        match tag.kind() {
            LuaSyntaxKind::DocTagClass | LuaSyntaxKind::DocTagInterface => {
                let kind = match tag.kind() {
                    LuaSyntaxKind::DocTagClass => LuaTypeDeclKind::Class,
                    _ => LuaTypeDeclKind::Interface,
                };
                if let Some(name) = add_type_decl(analysis, &tag, kind) {
                    attachment.class = Some(name.0.clone());
                    current_class = Some(name);
                }
            }
            LuaSyntaxKind::DocTagEnum => {
                if let Some(name) = add_type_decl(analysis, &tag, LuaTypeDeclKind::Enum) {
                    attachment.class = Some(name.0.clone());
                    current_class = Some(name);
                }
            }
            LuaSyntaxKind::DocTagAlias => {
                add_type_decl(analysis, &tag, LuaTypeDeclKind::Alias);
            }
            LuaSyntaxKind::DocTagField => {
                if let Some((class, class_generics)) = &current_class {
                    let mut generics = class_generics.clone();
                    generics.extend(comment_generics.iter().cloned());
                    add_doc_field(analysis, &tag, class, &generics);
                }
            }
            LuaSyntaxKind::DocTagOperator => {
                if let Some((class, class_generics)) = &current_class {
                    add_operator(analysis, &tag, class, class_generics);
                }
            }
            LuaSyntaxKind::DocTagParam => {
                let Some(name) = tag
                    .token(LuaTokenKind::Name)
                    .or_else(|| tag.token(LuaTokenKind::Dots))
                else {
                    continue;
                };
                let ty = tag
                    .doc_types()
                    .next()
                    .map(|ty| doc_type(&ty, &comment_generics))
                    .unwrap_or_default();
                attachment.params.push(LuaDocParamInfo {
                    name: name.text().to_string(),
                    ty,
                    nullable: tag.has_token(LuaTokenKind::DocQuestion),
                    description: description(&tag),
                });
            }
            LuaSyntaxKind::DocTagReturn => {
                for ret in tag.children_of(LuaSyntaxKind::DocNamedReturn) {
                    let ty = ret
                        .doc_types()
                        .next()
                        .map(|ty| doc_type(&ty, &comment_generics))
                        .unwrap_or_default();
                    attachment.returns.push(LuaDocReturnInfo {
                        name: ret.name_text().map(str::to_string),
                        ty,
                        description: description(&tag),
                    });
                }
            }
            LuaSyntaxKind::DocTagType => {
                attachment
                    .types
                    .extend(tag.doc_types().map(|ty| doc_type(&ty, &comment_generics)));
            }
            LuaSyntaxKind::DocTagOverload => {
                if let Some(LuaType::DocFunction(func)) = tag
                    .doc_types()
                    .next()
                    .map(|ty| doc_type(&ty, &comment_generics))
                {
                    attachment.overloads.push(func);
                }
            }
            LuaSyntaxKind::DocTagDeprecated => attachment.features.deprecated = true,
            LuaSyntaxKind::DocTagAsync => attachment.features.is_async = true,
            LuaSyntaxKind::DocTagNodiscard => attachment.features.nodiscard = true,
            LuaSyntaxKind::DocTagVisibility => {
                attachment.visibility = tag
                    .token(LuaTokenKind::TagVisibility)
                    .and_then(|token| Visibility::from_word(token.text().trim_start_matches('@')));
            }
            LuaSyntaxKind::DocTagSource => attachment.source = description(&tag),
            LuaSyntaxKind::DocTagMapping => {
                attachment.mapping = tag.name_text().map(str::to_string);
            }
            LuaSyntaxKind::DocTagVersion => {
                attachment.excluded = !version_matches(&tag, analysis.config.runtime.version);
            }
            LuaSyntaxKind::DocTagMeta => analysis.index.set_meta(analysis.doc_id),
            LuaSyntaxKind::DocTagDiagnostic => add_suppression(analysis, &tag),
            LuaSyntaxKind::DocDescription => {
                if let Some(text) = tag.token(LuaTokenKind::DocDescription) {
                    let text = text.text().trim();
                    if !text.is_empty() {
                        let description = attachment.description.get_or_insert_with(String::new);
                        if !description.is_empty() {
                            description.push('\n');
                        }
                        description.push_str(text);
                    }
                }
            }
            _ => {}
        }
    }

    let Some(owner) = attached_to else {
        return;
    };
    apply_attachment(analysis, &owner, &attachment);
    analysis.attachments.insert(owner.id(), attachment);
}

/// Registers a class, interface, enum or alias; returns its name and
/// generic parameter names.
fn add_type_decl(
    analysis: &mut DocAnalysis,
    tag: &LuaSyntaxNode,
    kind: LuaTypeDeclKind,
) -> Option<(ArcStr, Vec<ArcStr>)> {
    let name_token = tag.token(LuaTokenKind::Name)?;
    let name: ArcStr = Arc::from(name_token.text());
    let generic_params = tag
        .child(LuaSyntaxKind::DocGenericDeclList)
        .map(|list| generic_params(&list, &[]))
        .unwrap_or_default();
    let generic_names: Vec<ArcStr> = generic_params.iter().map(|(name, _)| name.clone()).collect();
    let attributes = tag
        .child(LuaSyntaxKind::DocAttribute)
        .map(|attr| {
            attr.child_tokens()
                .filter(|token| token.kind() == LuaTokenKind::Name)
                .map(|token| token.text().to_string())
                .collect()
        })
        .unwrap_or_default();

    let mut part = LuaTypeDeclPart {
        kind,
        range: name_token.range(),
        generic_params,
        alias_origin: None,
        enum_base: None,
        attributes,
        description: description(tag),
    };
    match kind {
        LuaTypeDeclKind::Alias => {
            let mut members: Vec<LuaType> = tag
                .doc_types()
                .map(|ty| doc_type(&ty, &generic_names))
                .collect();
            members.extend(
                tag.children_of(LuaSyntaxKind::DocAliasMember)
                    .filter_map(|member| member.doc_types().next())
                    .map(|ty| doc_type(&ty, &generic_names)),
            );
            part.alias_origin = Some(union_many(members));
        }
        LuaTypeDeclKind::Enum => {
            part.enum_base = tag.doc_types().next().map(|ty| doc_type(&ty, &[]));
        }
        LuaTypeDeclKind::Class | LuaTypeDeclKind::Interface => {
            if let Some(supers) = tag.child(LuaSyntaxKind::DocSuperList) {
                for super_type in supers.doc_types() {
                    let super_type = doc_type(&super_type, &generic_names);
                    analysis
                        .index
                        .add_super(analysis.doc_id, name.clone(), super_type);
                }
            }
        }
    }
    analysis
        .index
        .add_type_decl(analysis.doc_id, name.clone(), part);
    Some((name, generic_names))
}

/// `---@field [visibility] name[?] Type` or `---@field [Key] Type`
fn add_doc_field(analysis: &mut DocAnalysis, tag: &LuaSyntaxNode, class: &ArcStr, generics: &[ArcStr]) {
    let types: Vec<_> = tag.doc_types().collect();
    let (key, range, value) = if tag.has_token(LuaTokenKind::LeftBracket) {
        let (Some(key), Some(value)) = (types.first(), types.get(1)) else {
            return;
        };
        let key = match doc_type(key, generics) {
            LuaType::StringConst(name) => LuaMemberKey::Name(name),
            LuaType::IntegerConst(value) => LuaMemberKey::Integer(value),
            // `[string]: T` is an index signature, not a member
            _ => return,
        };
        (key, types[0].range(), value)
    } else {
        let (Some(name), Some(value)) = (tag.token(LuaTokenKind::Name), types.first()) else {
            return;
        };
        (LuaMemberKey::name(name.text()), name.range(), value)
    };
    let mut ty = doc_type(value, generics);
    if tag.has_token(LuaTokenKind::DocQuestion) {
        ty = ty.nullable();
    }
    let visibility = tag
        .child(LuaSyntaxKind::DocVisibility)
        .and_then(|node| Visibility::from_word(node.text()))
        .unwrap_or_default();
    analysis.index.add_member(LuaMember {
        owner: MemberOwner::Type(class.clone()),
        key,
        doc_id: analysis.doc_id,
        range,
        syntax_id: LuaSyntaxId::from_node(analysis.doc_id, tag),
        source: LuaMemberSource::DocField,
        declared_type: Some(ty),
        value: None,
        features: Default::default(),
        visibility,
        description: description(tag),
        source_link: None,
    });
}

/// `---@operator add(Other): Result`
fn add_operator(analysis: &mut DocAnalysis, tag: &LuaSyntaxNode, class: &ArcStr, generics: &[ArcStr]) {
    let Some(kind) = tag.name_text().and_then(LuaOperatorKind::from_name) else {
        return;
    };
    let operands = tag
        .child(LuaSyntaxKind::DocTypeList)
        .map(|list| list.doc_types().map(|ty| doc_type(&ty, generics)).collect())
        .unwrap_or_default();
    let result = tag
        .doc_types()
        .next()
        .map(|ty| doc_type(&ty, generics))
        .unwrap_or_default();
    analysis.index.add_operator(
        analysis.doc_id,
        LuaOperator {
            owner: class.clone(),
            kind,
            operands,
            result,
            range: tag.range(),
        },
    );
}

/// `---@version >5.1, JIT`: any listed version may match.
fn version_matches(tag: &LuaSyntaxNode, current: LuaVersion) -> bool {
    let mut any = false;
    for version in tag.children_of(LuaSyntaxKind::DocVersion) {
        let Some(token) = version
            .child_tokens()
            .find(|token| !matches!(token.kind(), LuaTokenKind::Gt | LuaTokenKind::Lt))
        else {
            continue;
        };
        let Some(wanted) = LuaVersion::from_doc_text(token.text()) else {
            continue;
        };
        any = true;
        let matched = if version.has_token(LuaTokenKind::Gt) {
            current == wanted || current.is_newer_than(wanted)
        } else if version.has_token(LuaTokenKind::Lt) {
            current == wanted || current.is_older_than(wanted)
        } else {
            current == wanted
        };
        if matched {
            return true;
        }
    }
    !any
}

/// `---@diagnostic disable-next-line: code, code`
fn add_suppression(analysis: &mut DocAnalysis, tag: &LuaSyntaxNode) {
    let Some(action) = tag.name_text().and_then(SuppressionAction::from_word) else {
        return;
    };
    let codes = tag
        .child(LuaSyntaxKind::DocDiagnosticCodeList)
        .map(|list| {
            list.child_tokens()
                .filter(|token| token.kind() == LuaTokenKind::Name)
                .filter_map(|token| token.text().parse::<DiagnosticCode>().ok())
                .collect()
        })
        .unwrap_or_default();
    let line = analysis.line_index.line(tag.range().start) as u32;
    analysis.index.add_suppression(
        analysis.doc_id,
        DiagnosticSuppression {
            action,
            codes,
            line,
        },
    );
}

/// Writes the attachment onto the declarations and the function of the
/// statement it documents.
fn apply_attachment(analysis: &mut DocAnalysis, owner: &LuaSyntaxNode, attachment: &DocAttachment) {
    let closure = defined_closure(owner);
    if let Some(closure) = closure.filter(|_| attachment.describes_function()) {
        let id = LuaSignatureId::new(LuaSyntaxId::from_node(analysis.doc_id, &closure));
        if let Some(signature) = analysis.index.signature_mut(&id) {
            signature.generics = attachment.generics.clone();
            signature.param_docs = attachment.params.clone();
            signature.return_docs = attachment.returns.clone();
            signature.overloads = attachment.overloads.clone();
            signature.is_async |= attachment.features.is_async;
            signature.nodiscard |= attachment.features.nodiscard;
            signature.description = attachment.description.clone();
        }
        let param_types: Vec<_> = closure
            .child(LuaSyntaxKind::ParamList)
            .into_iter()
            .flat_map(|list| list.children_of(LuaSyntaxKind::ParamName))
            .filter_map(|param| {
                param
                    .token(LuaTokenKind::Name)
                    .or_else(|| param.token(LuaTokenKind::Dots))
            })
            .filter_map(|token| {
                let info = attachment.params.iter().find(|info| info.name == token.text())?;
                let ty = match info.nullable {
                    true => info.ty.clone().nullable(),
                    false => info.ty.clone(),
                };
                Some((token.range().start, ty))
            })
            .collect();
        if let Some(decls) = analysis.index.decl_tree_mut(analysis.doc_id) {
            for (position, ty) in param_types {
                let id = LuaDeclId {
                    doc_id: analysis.doc_id,
                    position,
                };
                if let Some(decl) = decls.get_decl_mut(&id) {
                    decl.declared_type = Some(ty);
                }
            }
        }
    }

    let names: Vec<(u32, String)> = match owner.kind() {
        LuaSyntaxKind::LocalStat => owner
            .children_of(LuaSyntaxKind::LocalName)
            .filter_map(|name| name.token(LuaTokenKind::Name))
            .map(|token| (token.range().start, token.text().to_string()))
            .collect(),
        LuaSyntaxKind::LocalFuncStat => owner
            .child(LuaSyntaxKind::LocalName)
            .and_then(|name| name.token(LuaTokenKind::Name))
            .map(|token| (token.range().start, token.text().to_string()))
            .into_iter()
            .collect(),
        LuaSyntaxKind::AssignStat => assign_targets(owner)
            .into_iter()
            .filter(|target| target.kind() == LuaSyntaxKind::NameExpr)
            .filter_map(|target| target.token(LuaTokenKind::Name))
            .map(|token| (token.range().start, token.text().to_string()))
            .collect(),
        LuaSyntaxKind::FuncStat => owner
            .child(LuaSyntaxKind::NameExpr)
            .and_then(|name| name.token(LuaTokenKind::Name))
            .map(|token| (token.range().start, token.text().to_string()))
            .into_iter()
            .collect(),
        _ => Vec::new(),
    };

    let mut class_globals = Vec::new();
    if let Some(decls) = analysis.index.decl_tree_mut(analysis.doc_id) {
        for (i, (position, _)) in names.iter().enumerate() {
            let id = LuaDeclId {
                doc_id: analysis.doc_id,
                position: *position,
            };
            let Some(decl) = decls.get_decl_mut(&id) else {
                continue;
            };
            if let Some(ty) = attachment.types.get(i) {
                decl.declared_type = Some(ty.clone());
            } else if let (0, Some(class)) = (i, &attachment.class) {
                decl.declared_type = Some(LuaType::Ref(class.clone()));
                if decl.is_global() {
                    class_globals.push((class.clone(), decl.name.clone()));
                }
            }
            decl.features.deprecated |= attachment.features.deprecated;
            decl.features.is_async |= attachment.features.is_async;
            decl.features.nodiscard |= attachment.features.nodiscard;
            if let Some(visibility) = attachment.visibility {
                decl.visibility = visibility;
            }
        }
    }
    for (class, global) in class_globals {
        analysis.index.add_class_global(
            analysis.doc_id,
            class,
            MemberOwner::Global(Arc::from(global)),
        );
    }
}
