use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use lua_lsp::config::LuaVersion;
use lua_lsp::index::MemberOwner;
use lua_lsp::vfs::parse_uri;
use lua_lsp::{Analysis, AnalysisConfig, AnalysisError, Compilation};
use tower_lsp_server::lsp_types::{Position, Uri};

const MODULE: &str = r#"
Shapes = {}

---@class Circle
---@field radius number
local Circle = {}

function Shapes.area(circle)
    return circle.radius * circle.radius
end

function Shapes.describe() return "shapes" end
"#;

fn global_names(compilation: &Compilation) -> Vec<String> {
    let mut names: Vec<_> = compilation
        .index()
        .query_all_globals()
        .into_iter()
        .map(|decl| decl.name.clone())
        .collect();
    names.sort();
    names.dedup();
    names
}

fn member_names(compilation: &Compilation, owner: &MemberOwner) -> Vec<String> {
    let mut names: Vec<_> = compilation
        .index()
        .query_members(owner)
        .into_iter()
        .map(|member| member.key.to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn test_remove_then_add_restores_index() {
    let uri = parse_uri("file:///ws/shapes.lua").unwrap();
    let shapes = MemberOwner::Global(Arc::from("Shapes"));
    let circle = MemberOwner::Type(Arc::from("Circle"));

    let mut compilation = Compilation::new(AnalysisConfig::default());
    compilation.add_document(&uri, MODULE);
    let globals = global_names(&compilation);
    let members = member_names(&compilation, &shapes);
    assert_eq!(members, vec!["area", "describe"]);
    assert_eq!(member_names(&compilation, &circle), vec!["radius"]);

    compilation.remove_document_by_uri(&uri).unwrap();
    assert!(global_names(&compilation).is_empty());
    assert!(member_names(&compilation, &shapes).is_empty());
    assert!(compilation.index().query_type_decl("Circle").is_none());

    compilation.add_document(&uri, MODULE);
    assert_eq!(global_names(&compilation), globals);
    assert_eq!(member_names(&compilation, &shapes), members);
    assert!(compilation.index().query_type_decl("Circle").is_some());
}

#[test]
fn test_require_resolves_workspace_module() {
    let mut config = AnalysisConfig::default();
    config.workspace.roots = vec![PathBuf::from("/ws")];
    let mut compilation = Compilation::new(config);
    compilation.add_document(
        &parse_uri("file:///ws/util/strings.lua").unwrap(),
        "local M = {}\n---@return string\nfunction M.greet() return 'hi' end\nreturn M\n",
    );
    let main = compilation.add_document(
        &parse_uri("file:///ws/main.lua").unwrap(),
        "local strings = require(\"util.strings\")\nlocal greeting = strings.greet()\n",
    );

    let mut ctx = compilation.search_context();
    let decl = ctx
        .index()
        .get_decl_tree(main)
        .unwrap()
        .decls()
        .find(|decl| decl.name == "greeting")
        .unwrap();
    let ty = ctx.get_decl_type(decl);
    assert_eq!(ctx.humanize_type(&ty), "string");
}

#[test]
fn test_version_tag_filters_globals() {
    let mut config = AnalysisConfig::default();
    config.runtime.version = LuaVersion::Lua51;
    let mut compilation = Compilation::new(config);
    compilation.add_document(
        &parse_uri("file:///ws/compat.lua").unwrap(),
        r#"
---@version 5.1, JIT
function legacy() end

---@version >5.3
function modern() end

---@version 5.4
function only54() end

function always() end
"#,
    );

    assert_eq!(global_names(&compilation), vec!["always", "legacy"]);
}

#[tokio::test]
async fn test_workspace_pass_covers_every_document() {
    let analysis = Analysis::new(Compilation::with_std(AnalysisConfig::default()).unwrap());
    let first = parse_uri("file:///ws/a.lua").unwrap();
    let second = parse_uri("file:///ws/b.lua").unwrap();
    analysis.add_document(first.clone(), "print(missing)\n".to_string()).await;
    analysis.add_document(second.clone(), "print('fine')\n".to_string()).await;

    let results = analysis.diagnose_workspace().await.unwrap();
    let with_uri = |uri: &Uri| results.iter().find(|result| &result.uri == uri).unwrap();
    assert_eq!(with_uri(&first).diagnostics.len(), 1);
    assert!(with_uri(&second).diagnostics.is_empty());
}

#[tokio::test]
async fn test_edit_cancels_debounced_pass() {
    let mut config = AnalysisConfig::default();
    config.diagnostics.debounce_ms = 200;
    let analysis = Analysis::new(Compilation::new(config));
    let uri = parse_uri("file:///ws/edit.lua").unwrap();
    analysis.add_document(uri.clone(), "local a = 1\n".to_string()).await;

    let pending = tokio::spawn({
        let analysis = analysis.clone();
        async move { analysis.diagnose_workspace_debounced().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    analysis
        .update_document(uri, "local a = 2\n".to_string())
        .await
        .unwrap();

    let outcome = pending.await.unwrap();
    assert!(matches!(outcome, Err(AnalysisError::Cancelled)));
}

#[tokio::test]
async fn test_hover_type_after_update() {
    let analysis = Analysis::new(Compilation::new(AnalysisConfig::default()));
    let uri = parse_uri("file:///ws/hover.lua").unwrap();
    analysis.add_document(uri.clone(), "local v = 1\n".to_string()).await;
    analysis
        .update_document(uri.clone(), "local v = 1.5\n".to_string())
        .await
        .unwrap();

    let ty = analysis.infer_at(&uri, Position::new(0, 6)).await.unwrap();
    assert_eq!(ty.as_deref(), Some("number"));
}
