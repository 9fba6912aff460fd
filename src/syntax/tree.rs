use std::fmt::{self, Write};
use std::sync::Arc;

use super::lexer::LexError;
use super::parser::MarkEvent;
use super::{LuaSyntaxKind, LuaTokenKind, TextRange};

/// Index of a node or token inside one [`LuaSyntaxTree`].
///
/// Ids are only meaningful for the tree they came from; a document edit
/// rebuilds the tree and invalidates every id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LuaElementId(u32);

impl LuaElementId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LuaElementKind {
    Node(LuaSyntaxKind),
    Token(LuaTokenKind),
}

#[derive(Debug, Clone)]
struct ElementData {
    kind: LuaElementKind,
    range: TextRange,
    parent: Option<LuaElementId>,
    children: Vec<LuaElementId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub range: TextRange,
}

/// Immutable syntax tree stored as a flat arena.
#[derive(Debug, Clone)]
pub struct LuaSyntaxTree {
    text: Arc<str>,
    elements: Vec<ElementData>,
    errors: Vec<ParseError>,
}

impl LuaSyntaxTree {
    /// Replays the parse log. Forward parents are resolved here: a node
    /// that was preceded is opened after the parents that wrap it.
    pub(crate) fn build(text: &str, mut events: Vec<MarkEvent>, lex_errors: Vec<LexError>) -> Self {
        let mut builder = TreeBuilder::default();
        let mut errors: Vec<ParseError> = lex_errors.into_iter().map(ParseError::from).collect();

        for i in 0..events.len() {
            match std::mem::replace(&mut events[i], MarkEvent::tombstone()) {
                MarkEvent::NodeStart {
                    kind,
                    forward_parent,
                } => {
                    let mut kinds = vec![kind];
                    let mut index = i;
                    let mut next = forward_parent;
                    while let Some(offset) = next {
                        index += offset;
                        match std::mem::replace(&mut events[index], MarkEvent::tombstone()) {
                            MarkEvent::NodeStart {
                                kind,
                                forward_parent,
                            } => {
                                kinds.push(kind);
                                next = forward_parent;
                            }
                            _ => break,
                        }
                    }
                    for kind in kinds.into_iter().rev() {
                        if kind != LuaSyntaxKind::None {
                            builder.start_node(kind);
                        }
                    }
                }
                MarkEvent::EatToken { kind, range } => builder.token(kind, range),
                MarkEvent::Error { message, range } => errors.push(ParseError { message, range }),
                MarkEvent::NodeEnd => builder.finish_node(),
            }
        }

        errors.sort_by_key(|error| error.range.start);
        Self {
            text: Arc::from(text),
            elements: builder.elements,
            errors,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn root(&self) -> LuaSyntaxNode<'_> {
        LuaSyntaxNode {
            tree: self,
            id: LuaElementId(0),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, id: LuaElementId) -> Option<LuaSyntaxElement<'_>> {
        let data = self.elements.get(id.index())?;
        Some(match data.kind {
            LuaElementKind::Node(_) => LuaSyntaxElement::Node(LuaSyntaxNode { tree: self, id }),
            LuaElementKind::Token(_) => LuaSyntaxElement::Token(LuaSyntaxToken { tree: self, id }),
        })
    }

    pub fn node(&self, id: LuaElementId) -> Option<LuaSyntaxNode<'_>> {
        match self.element(id)? {
            LuaSyntaxElement::Node(node) => Some(node),
            LuaSyntaxElement::Token(_) => None,
        }
    }

    pub fn token(&self, id: LuaElementId) -> Option<LuaSyntaxToken<'_>> {
        match self.element(id)? {
            LuaSyntaxElement::Token(token) => Some(token),
            LuaSyntaxElement::Node(_) => None,
        }
    }

    /// The innermost token covering `offset`, preferring the token that
    /// starts at `offset` over one that ends there.
    pub fn token_at_offset(&self, offset: u32) -> Option<LuaSyntaxToken<'_>> {
        let mut node = self.root();
        loop {
            let mut found = None;
            for child in node.children() {
                if !child.range().contains(offset) {
                    continue;
                }
                if found.is_none() || child.range().start == offset {
                    found = Some(child);
                }
            }
            match found? {
                LuaSyntaxElement::Token(token) => return Some(token),
                LuaSyntaxElement::Node(child) => node = child,
            }
        }
    }

    /// Indented `Kind@start..end` listing, used by snapshot tests.
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(self.root_element(), 0usize)];
        while let Some((element, depth)) = stack.pop() {
            let indent = "  ".repeat(depth);
            match element {
                LuaSyntaxElement::Node(node) => {
                    let _ = writeln!(out, "{indent}{:?}@{:?}", node.kind(), node.range());
                    let children: Vec<_> = node.children().collect();
                    for child in children.into_iter().rev() {
                        stack.push((child, depth + 1));
                    }
                }
                LuaSyntaxElement::Token(token) => {
                    let _ = writeln!(
                        out,
                        "{indent}{:?}@{:?} {:?}",
                        token.kind(),
                        token.range(),
                        token.text()
                    );
                }
            }
        }
        for error in &self.errors {
            let _ = writeln!(out, "error@{:?}: {}", error.range, error.message);
        }
        out
    }

    fn root_element(&self) -> LuaSyntaxElement<'_> {
        LuaSyntaxElement::Node(self.root())
    }
}

#[derive(Default)]
struct TreeBuilder {
    elements: Vec<ElementData>,
    stack: Vec<LuaElementId>,
    last_end: u32,
}

impl TreeBuilder {
    fn push(&mut self, kind: LuaElementKind, range: TextRange) -> LuaElementId {
        let id = LuaElementId(self.elements.len() as u32);
        let parent = self.stack.last().copied();
        self.elements.push(ElementData {
            kind,
            range,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.elements[parent.index()].children.push(id);
        }
        id
    }

    fn start_node(&mut self, kind: LuaSyntaxKind) {
        let id = self.push(LuaElementKind::Node(kind), TextRange::empty(self.last_end));
        self.stack.push(id);
    }

    fn token(&mut self, kind: LuaTokenKind, range: TextRange) {
        self.push(LuaElementKind::Token(kind), range);
        self.last_end = range.end;
    }

    fn finish_node(&mut self) {
        let Some(id) = self.stack.pop() else {
            return;
        };
        let data = &self.elements[id.index()];
        let (Some(first), Some(last)) = (data.children.first(), data.children.last()) else {
            return;
        };
        let range = self.elements[first.index()]
            .range
            .cover(self.elements[last.index()].range);
        self.elements[id.index()].range = range;
    }
}

#[derive(Clone, Copy)]
pub struct LuaSyntaxNode<'a> {
    tree: &'a LuaSyntaxTree,
    id: LuaElementId,
}

#[derive(Clone, Copy)]
pub struct LuaSyntaxToken<'a> {
    tree: &'a LuaSyntaxTree,
    id: LuaElementId,
}

#[derive(Debug, Clone, Copy)]
pub enum LuaSyntaxElement<'a> {
    Node(LuaSyntaxNode<'a>),
    Token(LuaSyntaxToken<'a>),
}

impl<'a> LuaSyntaxElement<'a> {
    pub fn id(&self) -> LuaElementId {
        match self {
            LuaSyntaxElement::Node(node) => node.id,
            LuaSyntaxElement::Token(token) => token.id,
        }
    }

    pub fn range(&self) -> TextRange {
        match self {
            LuaSyntaxElement::Node(node) => node.range(),
            LuaSyntaxElement::Token(token) => token.range(),
        }
    }

    pub fn as_node(&self) -> Option<LuaSyntaxNode<'a>> {
        match self {
            LuaSyntaxElement::Node(node) => Some(*node),
            LuaSyntaxElement::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<LuaSyntaxToken<'a>> {
        match self {
            LuaSyntaxElement::Token(token) => Some(*token),
            LuaSyntaxElement::Node(_) => None,
        }
    }

    pub fn parent(&self) -> Option<LuaSyntaxNode<'a>> {
        match self {
            LuaSyntaxElement::Node(node) => node.parent(),
            LuaSyntaxElement::Token(token) => token.parent(),
        }
    }
}

impl<'a> LuaSyntaxNode<'a> {
    fn data(&self) -> &'a ElementData {
        &self.tree.elements[self.id.index()]
    }

    pub fn tree(&self) -> &'a LuaSyntaxTree {
        self.tree
    }

    pub fn id(&self) -> LuaElementId {
        self.id
    }

    pub fn kind(&self) -> LuaSyntaxKind {
        match self.data().kind {
            LuaElementKind::Node(kind) => kind,
            LuaElementKind::Token(_) => LuaSyntaxKind::None,
        }
    }

    pub fn range(&self) -> TextRange {
        self.data().range
    }

    pub fn text(&self) -> &'a str {
        &self.tree.text[self.range().as_range()]
    }

    pub fn parent(&self) -> Option<LuaSyntaxNode<'a>> {
        let parent = self.data().parent?;
        Some(LuaSyntaxNode {
            tree: self.tree,
            id: parent,
        })
    }

    pub fn ancestors(&self) -> impl Iterator<Item = LuaSyntaxNode<'a>> {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    pub fn children(&self) -> impl Iterator<Item = LuaSyntaxElement<'a>> + 'a {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .filter_map(move |&id| tree.element(id))
    }

    pub fn child_nodes(&self) -> impl Iterator<Item = LuaSyntaxNode<'a>> + 'a {
        self.children().filter_map(|element| element.as_node())
    }

    pub fn child_tokens(&self) -> impl Iterator<Item = LuaSyntaxToken<'a>> + 'a {
        self.children().filter_map(|element| element.as_token())
    }

    pub fn child(&self, kind: LuaSyntaxKind) -> Option<LuaSyntaxNode<'a>> {
        self.child_nodes().find(|node| node.kind() == kind)
    }

    pub fn children_of(&self, kind: LuaSyntaxKind) -> impl Iterator<Item = LuaSyntaxNode<'a>> + 'a {
        self.child_nodes().filter(move |node| node.kind() == kind)
    }

    pub fn token(&self, kind: LuaTokenKind) -> Option<LuaSyntaxToken<'a>> {
        self.child_tokens().find(|token| token.kind() == kind)
    }

    pub fn has_token(&self, kind: LuaTokenKind) -> bool {
        self.token(kind).is_some()
    }

    pub fn exprs(&self) -> impl Iterator<Item = LuaSyntaxNode<'a>> + 'a {
        self.child_nodes().filter(|node| node.kind().is_expr())
    }

    pub fn doc_types(&self) -> impl Iterator<Item = LuaSyntaxNode<'a>> + 'a {
        self.child_nodes().filter(|node| node.kind().is_doc_type())
    }

    /// Pre-order walk over this node and every node below it.
    pub fn descendants(&self) -> impl Iterator<Item = LuaSyntaxNode<'a>> + 'a {
        let mut stack = vec![*self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            let children: Vec<_> = node.child_nodes().collect();
            stack.extend(children.into_iter().rev());
            Some(node)
        })
    }

    /// Text of the first `Name` token, the usual way a node names something.
    pub fn name_text(&self) -> Option<&'a str> {
        self.token(LuaTokenKind::Name).map(|token| token.text())
    }
}

impl fmt::Debug for LuaSyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{:?}", self.kind(), self.range())
    }
}

impl<'a> LuaSyntaxToken<'a> {
    fn data(&self) -> &'a ElementData {
        &self.tree.elements[self.id.index()]
    }

    pub fn id(&self) -> LuaElementId {
        self.id
    }

    pub fn kind(&self) -> LuaTokenKind {
        match self.data().kind {
            LuaElementKind::Token(kind) => kind,
            LuaElementKind::Node(_) => LuaTokenKind::None,
        }
    }

    pub fn range(&self) -> TextRange {
        self.data().range
    }

    pub fn text(&self) -> &'a str {
        &self.tree.text[self.range().as_range()]
    }

    pub fn parent(&self) -> Option<LuaSyntaxNode<'a>> {
        let parent = self.data().parent?;
        Some(LuaSyntaxNode {
            tree: self.tree,
            id: parent,
        })
    }
}

impl fmt::Debug for LuaSyntaxToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{:?} {:?}", self.kind(), self.range(), self.text())
    }
}
