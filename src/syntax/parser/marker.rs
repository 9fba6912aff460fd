use crate::syntax::{LuaSyntaxKind, LuaTokenKind, TextRange};

/// One entry of the append-only parse log.
///
/// The tree builder replays the log; nothing in the parser ever touches a
/// real tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkEvent {
    NodeStart {
        kind: LuaSyntaxKind,
        /// Relative offset to the `NodeStart` of a parent opened later by
        /// [`CompleteMarker::precede`].
        forward_parent: Option<usize>,
    },
    EatToken {
        kind: LuaTokenKind,
        range: TextRange,
    },
    Error {
        message: String,
        range: TextRange,
    },
    NodeEnd,
}

impl MarkEvent {
    pub fn tombstone() -> Self {
        MarkEvent::NodeStart {
            kind: LuaSyntaxKind::None,
            forward_parent: None,
        }
    }
}

/// Anything that owns an event log: the code parser and the nested doc
/// parser share this so markers work for both.
pub trait MarkerEventContainer {
    fn events(&mut self) -> &mut Vec<MarkEvent>;

    /// Range used for errors reported at the current position.
    fn current_range(&self) -> TextRange;

    fn mark(&mut self) -> Marker {
        let position = self.events().len();
        self.events().push(MarkEvent::tombstone());
        Marker::new(position)
    }

    fn push_error(&mut self, message: impl Into<String>) {
        let range = self.current_range();
        self.events().push(MarkEvent::Error {
            message: message.into(),
            range,
        });
    }
}

/// An open node. Must be consumed by `complete`, `fail` or `undo`.
#[derive(Debug)]
#[must_use = "a marker must be completed, failed or undone"]
pub struct Marker {
    position: usize,
}

impl Marker {
    fn new(position: usize) -> Self {
        Self { position }
    }

    pub fn complete<P: MarkerEventContainer + ?Sized>(
        self,
        p: &mut P,
        kind: LuaSyntaxKind,
    ) -> CompleteMarker {
        self.set_kind(p, kind);
        p.events().push(MarkEvent::NodeEnd);
        CompleteMarker {
            position: self.position,
        }
    }

    /// Closes the node and records an error inside it.
    pub fn fail<P: MarkerEventContainer + ?Sized>(
        self,
        p: &mut P,
        kind: LuaSyntaxKind,
        message: impl Into<String>,
    ) -> CompleteMarker {
        p.push_error(message);
        self.complete(p, kind)
    }

    /// Abandons the node; its children are kept and attach to the parent.
    pub fn undo<P: MarkerEventContainer + ?Sized>(self, p: &mut P) {
        let events = p.events();
        if self.position + 1 == events.len() {
            events.pop();
        }
        // otherwise the placeholder stays a tombstone
    }

    fn set_kind<P: MarkerEventContainer + ?Sized>(&self, p: &mut P, kind: LuaSyntaxKind) {
        match &mut p.events()[self.position] {
            MarkEvent::NodeStart { kind: slot, .. } => *slot = kind,
            other => unreachable!("marker does not point at a node start: {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompleteMarker {
    position: usize,
}

impl CompleteMarker {
    /// Opens a new node that will become the parent of this completed one.
    pub fn precede<P: MarkerEventContainer + ?Sized>(self, p: &mut P) -> Marker {
        let parent = p.mark();
        match &mut p.events()[self.position] {
            MarkEvent::NodeStart { forward_parent, .. } => {
                debug_assert!(forward_parent.is_none());
                *forward_parent = Some(parent.position - self.position);
            }
            other => unreachable!("completed marker does not point at a node start: {other:?}"),
        }
        parent
    }

    pub fn kind<P: MarkerEventContainer + ?Sized>(&self, p: &mut P) -> LuaSyntaxKind {
        match &p.events()[self.position] {
            MarkEvent::NodeStart { kind, .. } => *kind,
            _ => LuaSyntaxKind::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Log(Vec<MarkEvent>);

    impl MarkerEventContainer for Log {
        fn events(&mut self) -> &mut Vec<MarkEvent> {
            &mut self.0
        }

        fn current_range(&self) -> TextRange {
            TextRange::empty(0)
        }
    }

    #[test]
    fn test_precede_records_relative_parent() {
        let mut log = Log(Vec::new());
        let m = log.mark();
        let inner = m.complete(&mut log, LuaSyntaxKind::NameExpr);
        let outer = inner.precede(&mut log);
        outer.complete(&mut log, LuaSyntaxKind::IndexExpr);

        assert_eq!(
            log.0[0],
            MarkEvent::NodeStart {
                kind: LuaSyntaxKind::NameExpr,
                forward_parent: Some(2)
            }
        );
        assert_eq!(log.0.len(), 4);
    }

    #[test]
    fn test_undo_last_marker_pops() {
        let mut log = Log(Vec::new());
        let m = log.mark();
        m.undo(&mut log);
        assert!(log.0.is_empty());
    }
}
