use lua_lsp::cancel::CancellationToken;
use lua_lsp::diagnostics::{Diagnostic, DiagnosticCode};
use lua_lsp::vfs::parse_uri;
use lua_lsp::{AnalysisConfig, Compilation};

fn diagnose_with(config: AnalysisConfig, text: &str) -> Vec<Diagnostic> {
    let mut compilation = Compilation::with_std(config).unwrap();
    let doc_id = compilation.add_document(&parse_uri("file:///check.lua").unwrap(), text);
    compilation
        .diagnose(doc_id, &CancellationToken::new())
        .unwrap()
}

fn codes(text: &str) -> Vec<DiagnosticCode> {
    codes_with(AnalysisConfig::default(), text)
}

fn codes_with(config: AnalysisConfig, text: &str) -> Vec<DiagnosticCode> {
    diagnose_with(config, text)
        .into_iter()
        .map(|diagnostic| diagnostic.code)
        .collect()
}

#[test]
fn test_assignment_mismatch() {
    let found = codes("---@type integer\nlocal count = \"many\"\nprint(count)\n");
    assert_eq!(found, vec![DiagnosticCode::TypeNotMatch]);
}

#[test]
fn test_file_level_suppression_is_per_code() {
    let found = codes(
        r#"---@diagnostic disable: type-not-match
---@type integer
local count = "many"
print(count, undefined_name)
"#,
    );
    assert_eq!(found, vec![DiagnosticCode::UndefinedGlobal]);
}

#[test]
fn test_next_line_suppression() {
    let found = codes(
        r#"---@diagnostic disable-next-line: undefined-global
print(first_missing)
print(second_missing)
"#,
    );
    assert_eq!(found, vec![DiagnosticCode::UndefinedGlobal]);
}

#[test]
fn test_call_argument_checks() {
    let found = codes(
        r#"---@param a integer
---@param b string
local function pair(a, b) end
pair("x", "y")
pair(1)
pair(1, "y", 3)
"#,
    );
    assert_eq!(
        found,
        vec![
            DiagnosticCode::ParamTypeNotMatch,
            DiagnosticCode::MissingParameter,
            DiagnosticCode::RedundantParameter,
        ]
    );
}

#[test]
fn test_configured_globals() {
    let mut config = AnalysisConfig::default();
    config.diagnostics.globals = vec!["vim".to_string()];
    let found = codes_with(config, "vim.cmd('w')\nneovim.cmd('w')\n");
    assert_eq!(found, vec![DiagnosticCode::UndefinedGlobal]);
}

#[test]
fn test_disabled_by_config() {
    let mut config = AnalysisConfig::default();
    config.diagnostics.disable = vec![DiagnosticCode::UndefinedGlobal];
    assert!(codes_with(config, "print(nothing_here)\n").is_empty());
}

#[test]
fn test_return_checks() {
    let found = codes(
        r#"---@return integer
local function pick(flag)
    if flag then
        return "no"
    end
end
print(pick(true))
"#,
    );
    assert_eq!(
        found,
        vec![DiagnosticCode::ReturnTypeMismatch, DiagnosticCode::MissingReturn]
    );
}

#[test]
fn test_error_call_ends_function() {
    let found = codes(
        r#"---@return integer
local function must(flag)
    if flag then
        return 1
    end
    error("no value")
end
print(must(true))
"#,
    );
    assert!(found.is_empty(), "{found:?}");
}

#[test]
fn test_private_field_outside_class() {
    let found = codes(
        r#"---@class Account
---@field private secret string
local Account = {}

function Account:reveal()
    return self.secret
end

print(Account.secret, Account:reveal())
"#,
    );
    assert_eq!(found, vec![DiagnosticCode::AccessInvisible]);
}

#[test]
fn test_deprecated_function_use() {
    let found = codes(
        r#"---@deprecated
local function old() end
old()
"#,
    );
    assert_eq!(found, vec![DiagnosticCode::Deprecated]);
}

#[test]
fn test_unused_local() {
    let found = codes("local unused = 1\nlocal _ignored = 2\n");
    assert_eq!(found, vec![DiagnosticCode::UnusedLocal]);
}

#[test]
fn test_class_cycle_and_duplicate_alias() {
    let found = codes(
        r#"---@class Left: Right
---@class Right: Left

---@alias Id integer
---@alias Id string
"#,
    );
    assert_eq!(
        found.iter().filter(|code| **code == DiagnosticCode::CircleDocClass).count(),
        2
    );
    assert_eq!(
        found.iter().filter(|code| **code == DiagnosticCode::DuplicateType).count(),
        1
    );
}

#[test]
fn test_syntax_error_reported() {
    let found = codes("local = 1\n");
    assert!(found.contains(&DiagnosticCode::SyntaxError));
}

#[test]
fn test_meta_file_is_silent() {
    let found = codes("---@meta\nfunction undocumented(a, b) end\nlocal unused = 1\n");
    assert!(found.is_empty(), "{found:?}");
}
