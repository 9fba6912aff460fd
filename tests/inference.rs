use std::sync::Arc;

use lua_lsp::types::LuaType;
use lua_lsp::vfs::{parse_uri, DocumentId};
use lua_lsp::{AnalysisConfig, Compilation};

fn compile(text: &str) -> (Compilation, DocumentId) {
    let mut compilation = Compilation::with_std(AnalysisConfig::default()).unwrap();
    let doc_id = compilation.add_document(&parse_uri("file:///test.lua").unwrap(), text);
    (compilation, doc_id)
}

/// Humanized type of the last declaration called `name`.
fn decl_type(compilation: &Compilation, doc_id: DocumentId, name: &str) -> String {
    let mut ctx = compilation.search_context();
    let decl = ctx
        .index()
        .get_decl_tree(doc_id)
        .unwrap()
        .decls()
        .filter(|decl| decl.name == name)
        .last()
        .unwrap();
    let ty = ctx.get_decl_type(decl);
    ctx.humanize_type(&ty)
}

#[test]
fn test_generic_identity() {
    let (compilation, doc_id) = compile(
        r#"
---@generic T
---@param a T
---@return T
local function id(a) return a end
local s = id("hello")
"#,
    );
    assert_eq!(decl_type(&compilation, doc_id, "s"), "string");
}

#[test]
fn test_return_inferred_from_body() {
    let (compilation, doc_id) = compile(
        r#"
---@param a integer
local function f(a) return a end
local x = f(5)
"#,
    );
    assert_eq!(decl_type(&compilation, doc_id, "x"), "integer");
}

#[test]
fn test_overload_chosen_by_argument() {
    let (compilation, doc_id) = compile(
        r#"
---@param x integer
---@return string
---@overload fun(x: string): integer
local function conv(x) end
local from_int = conv(1)
local from_str = conv("s")
"#,
    );
    assert_eq!(decl_type(&compilation, doc_id, "from_int"), "string");
    assert_eq!(decl_type(&compilation, doc_id, "from_str"), "integer");
}

#[test]
fn test_recursive_alias_is_unknown() {
    let (compilation, _) = compile("---@alias Loop Loop\n");
    let mut ctx = compilation.search_context();
    let resolved = ctx.resolve_alias(&LuaType::Ref(Arc::from("Loop")));
    assert_eq!(resolved, LuaType::Unknown);
}

#[test]
fn test_mutual_alias_cycle_is_unknown() {
    let (compilation, _) = compile("---@alias Ping Pong\n---@alias Pong Ping\n");
    let mut ctx = compilation.search_context();
    assert_eq!(ctx.resolve_alias(&LuaType::Ref(Arc::from("Ping"))), LuaType::Unknown);
    assert_eq!(ctx.resolve_alias(&LuaType::Ref(Arc::from("Pong"))), LuaType::Unknown);
}

#[test]
fn test_doc_comment_attaches_across_one_blank_line() {
    let (adjacent, doc_id) = compile("---@type integer\nlocal v\n");
    assert_eq!(decl_type(&adjacent, doc_id, "v"), "integer");

    let (one_blank, doc_id) = compile("---@type integer\n\nlocal v\n");
    assert_eq!(decl_type(&one_blank, doc_id, "v"), "integer");

    let (two_blank, doc_id) = compile("---@type integer\n\n\nlocal v\n");
    assert_eq!(decl_type(&two_blank, doc_id, "v"), "unknown");
}

#[test]
fn test_literal_arithmetic() {
    let (compilation, doc_id) = compile("local n = 1 + 2\n");
    assert_eq!(decl_type(&compilation, doc_id, "n"), "integer");
}

#[test]
fn test_if_guard_removes_nil() {
    let (compilation, doc_id) = compile(
        r#"
---@type string?
local name
if name then
    local inner = name
end
"#,
    );
    assert_eq!(decl_type(&compilation, doc_id, "name"), "string?");
    assert_eq!(decl_type(&compilation, doc_id, "inner"), "string");
}

#[test]
fn test_class_field_through_method_self() {
    let (compilation, doc_id) = compile(
        r#"
---@class Point
---@field x number
local Point = {}

function Point:getX()
    return self.x
end

local value = Point:getX()
"#,
    );
    assert_eq!(decl_type(&compilation, doc_id, "value"), "number");
}

#[test]
fn test_std_string_method() {
    let (compilation, doc_id) = compile("local upper = string.upper(\"abc\")\n");
    assert_eq!(decl_type(&compilation, doc_id, "upper"), "string");
}
