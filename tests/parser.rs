use insta::assert_debug_snapshot;
use lua_lsp::syntax::{parse, LuaSyntaxKind, LuaSyntaxNode};

fn outline(node: LuaSyntaxNode<'_>, depth: usize, lines: &mut Vec<String>) {
    lines.push(format!("{}{:?}", "  ".repeat(depth), node.kind()));
    for child in node.child_nodes() {
        outline(child, depth + 1, lines);
    }
}

fn node_outline(text: &str) -> Vec<String> {
    let tree = parse(text);
    let mut lines = Vec::new();
    outline(tree.root(), 0, &mut lines);
    lines
}

#[test]
fn test_local_and_return() {
    let tree = parse("local x = 1\nreturn x");
    assert!(tree.errors().is_empty());
    assert_debug_snapshot!(node_outline("local x = 1\nreturn x"), @r#"
    [
        "Chunk",
        "  Block",
        "    LocalStat",
        "      LocalName",
        "      LiteralExpr",
        "    ReturnStat",
        "      NameExpr",
    ]
    "#);
}

#[test]
fn test_binary_precedence() {
    let tree = parse("x = 1 + 2 * 3");
    let add = tree
        .root()
        .descendants()
        .find(|node| node.kind() == LuaSyntaxKind::BinaryExpr)
        .unwrap();
    let operands: Vec<_> = add.exprs().collect();
    assert_eq!(operands.len(), 2);
    assert_eq!(operands[0].kind(), LuaSyntaxKind::LiteralExpr);
    assert_eq!(operands[1].kind(), LuaSyntaxKind::BinaryExpr);
    assert_eq!(operands[1].text(), "2 * 3");
}

#[test]
fn test_recovers_after_broken_statement() {
    let tree = parse("local = 1\nprint(\"ok\")\n");
    assert!(!tree.errors().is_empty());
    assert!(tree
        .root()
        .descendants()
        .any(|node| node.kind() == LuaSyntaxKind::CallExprStat));
}

#[test]
fn test_text_is_preserved() {
    let text = "local t = { a = 1, [2] = 'two' }\n";
    let tree = parse(text);
    assert_eq!(tree.text(), text);
    assert_eq!(tree.root().text(), text.trim_end());
}

#[test]
fn test_doc_comment_is_parsed() {
    let tree = parse("---@param a integer\nlocal function f(a) end\n");
    let descendants: Vec<_> = tree.root().descendants().map(|node| node.kind()).collect();
    assert!(descendants.contains(&LuaSyntaxKind::Comment));
    assert!(descendants.contains(&LuaSyntaxKind::DocTagParam));
    assert!(descendants.contains(&LuaSyntaxKind::TypeName));
}
