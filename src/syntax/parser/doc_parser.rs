use super::{CompleteMarker, MarkEvent, MarkerEventContainer};
use crate::syntax::lexer::{DocLexer, DocLexerCheckpoint, DocLexerState, LuaTokenData};
use crate::syntax::{LuaSyntaxKind, LuaTokenKind, TextRange};

const VISIBILITY_WORDS: [&str; 4] = ["public", "protected", "private", "package"];

#[derive(Debug)]
struct DocError {
    message: String,
    range: TextRange,
}

type DocResult<T> = Result<T, DocError>;

/// Rollback point: event log length plus the full lexer position.
#[derive(Debug, Clone, Copy)]
struct DocCheckpoint {
    events_len: usize,
    line: usize,
    lexer: DocLexerCheckpoint,
    current: LuaTokenData,
}

/// Parses the annotation language of one comment group into the shared
/// event log. Each comment token of the group is one line.
pub(super) struct DocParser<'a, 'e> {
    text: &'a str,
    events: &'e mut Vec<MarkEvent>,
    lines: &'e [TextRange],
    line: usize,
    lexer: DocLexer<'a>,
    current: LuaTokenData,
    /// Nesting inside brackets; fun return lists only take commas at depth 0.
    type_depth: usize,
}

impl MarkerEventContainer for DocParser<'_, '_> {
    fn events(&mut self) -> &mut Vec<MarkEvent> {
        &mut *self.events
    }

    fn current_range(&self) -> TextRange {
        self.current.range
    }
}

impl<'a, 'e> DocParser<'a, 'e> {
    pub fn new(text: &'a str, events: &'e mut Vec<MarkEvent>, lines: &'e [TextRange]) -> Self {
        let first = lines.first().copied().unwrap_or_default();
        let mut lexer = DocLexer::new(text, first);
        let current = lexer.lex();
        Self {
            text,
            events,
            lines,
            line: 0,
            lexer,
            current,
            type_depth: 0,
        }
    }

    pub fn parse(mut self) {
        if self.lines.is_empty() {
            return;
        }
        loop {
            self.parse_line();
            if !self.next_line() {
                break;
            }
        }
    }

    // ─── token plumbing ────────────────────────────────────────────────

    fn current(&self) -> LuaTokenKind {
        self.current.kind
    }

    fn current_text(&self) -> &'a str {
        &self.text[self.current.range.as_range()]
    }

    fn at(&self, kind: LuaTokenKind) -> bool {
        self.current.kind == kind
    }

    fn bump(&mut self) {
        if self.current.kind != LuaTokenKind::DocLineEnd {
            self.events.push(MarkEvent::EatToken {
                kind: self.current.kind,
                range: self.current.range,
            });
        }
        self.current = self.lexer.lex();
    }

    fn eat(&mut self, kind: LuaTokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error<T>(&self, message: impl Into<String>) -> DocResult<T> {
        Err(DocError {
            message: message.into(),
            range: self.current.range,
        })
    }

    fn expect(&mut self, kind: LuaTokenKind) -> DocResult<()> {
        if self.eat(kind) {
            return Ok(());
        }
        self.error(format!("expected '{}', found '{}'", kind, self.current()))
    }

    fn next_line(&mut self) -> bool {
        if self.line + 1 >= self.lines.len() {
            return false;
        }
        self.line += 1;
        self.lexer = DocLexer::new(self.text, self.lines[self.line]);
        self.current = self.lexer.lex();
        true
    }

    fn next_line_continues_alias(&self) -> bool {
        self.lines
            .get(self.line + 1)
            .is_some_and(|range| self.text[range.as_range()].starts_with("---|"))
    }

    fn checkpoint(&self) -> DocCheckpoint {
        DocCheckpoint {
            events_len: self.events.len(),
            line: self.line,
            lexer: self.lexer.checkpoint(),
            current: self.current,
        }
    }

    fn rollback(&mut self, checkpoint: DocCheckpoint) {
        self.events.truncate(checkpoint.events_len);
        if checkpoint.line != self.line {
            self.line = checkpoint.line;
            self.lexer = DocLexer::new(self.text, self.lines[self.line]);
        }
        self.lexer.restore(checkpoint.lexer);
        self.current = checkpoint.current;
    }

    /// Re-lexes from the current token as free text.
    fn switch_to_description(&mut self) {
        if !self.at(LuaTokenKind::DocLineEnd) {
            self.lexer
                .reset_to(self.current.range.start, DocLexerState::Description);
            self.current = self.lexer.lex();
        }
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> DocResult<T>) -> DocResult<T> {
        self.type_depth += 1;
        let result = f(self);
        self.type_depth -= 1;
        result
    }

    // ─── lines and tags ────────────────────────────────────────────────

    fn parse_line(&mut self) {
        if self.at(LuaTokenKind::DocContinueOr) {
            // a `---|` line without an `@alias` above it
            self.parse_alias_member();
        } else {
            self.bump();
        }

        match self.current() {
            kind if kind.is_doc_tag() => self.parse_tag(),
            LuaTokenKind::DocDescription => {
                let m = self.mark();
                self.bump();
                m.complete(self, LuaSyntaxKind::DocDescription);
            }
            LuaTokenKind::DocTrivia => self.bump(),
            _ => {}
        }

        if !self.at(LuaTokenKind::DocLineEnd) {
            self.push_error(format!("unexpected '{}' in doc comment", self.current_text()));
            self.switch_to_description();
            self.bump();
        }
    }

    fn parse_alias_member(&mut self) {
        let checkpoint = self.checkpoint();
        let m = self.mark();
        self.bump();
        let result = self.parse_type().and_then(|_| {
            self.parse_description();
            Ok(())
        });
        match result {
            Ok(()) => {
                m.complete(self, LuaSyntaxKind::DocAliasMember);
            }
            Err(error) => {
                self.rollback(checkpoint);
                self.bump();
                self.recover(error);
            }
        }
    }

    fn parse_tag(&mut self) {
        let checkpoint = self.checkpoint();
        let tag = self.current();
        let m = self.mark();
        self.bump();
        match self.parse_tag_body(tag) {
            Ok(kind) => {
                m.complete(self, kind);
            }
            Err(error) => {
                self.rollback(checkpoint);
                let m = self.mark();
                self.bump();
                self.recover(error);
                m.complete(self, LuaSyntaxKind::DocTagOther);
            }
        }
    }

    /// Records `error` and swallows the rest of the line as a description.
    fn recover(&mut self, error: DocError) {
        self.events.push(MarkEvent::Error {
            message: error.message,
            range: error.range,
        });
        self.switch_to_description();
        if self.at(LuaTokenKind::DocDescription) {
            let m = self.mark();
            self.bump();
            m.complete(self, LuaSyntaxKind::DocDescription);
        }
    }

    fn parse_tag_body(&mut self, tag: LuaTokenKind) -> DocResult<LuaSyntaxKind> {
        let kind = match tag {
            LuaTokenKind::TagClass => {
                self.parse_class_like()?;
                LuaSyntaxKind::DocTagClass
            }
            LuaTokenKind::TagInterface => {
                self.parse_class_like()?;
                LuaSyntaxKind::DocTagInterface
            }
            LuaTokenKind::TagEnum => {
                self.parse_attributes()?;
                self.expect(LuaTokenKind::Name)?;
                if self.eat(LuaTokenKind::Colon) {
                    self.parse_type()?;
                }
                self.parse_description();
                LuaSyntaxKind::DocTagEnum
            }
            LuaTokenKind::TagAlias => {
                self.parse_alias()?;
                LuaSyntaxKind::DocTagAlias
            }
            LuaTokenKind::TagField => {
                self.parse_field()?;
                LuaSyntaxKind::DocTagField
            }
            LuaTokenKind::TagParam => {
                if !self.eat(LuaTokenKind::Dots) {
                    self.expect(LuaTokenKind::Name)?;
                }
                self.eat(LuaTokenKind::DocQuestion);
                self.parse_type()?;
                self.parse_description();
                LuaSyntaxKind::DocTagParam
            }
            LuaTokenKind::TagReturn => {
                self.parse_returns()?;
                LuaSyntaxKind::DocTagReturn
            }
            LuaTokenKind::TagType => {
                self.parse_type()?;
                while self.eat(LuaTokenKind::Comma) {
                    self.parse_type()?;
                }
                self.parse_description();
                LuaSyntaxKind::DocTagType
            }
            LuaTokenKind::TagGeneric => {
                self.parse_generic_params()?;
                self.parse_description();
                LuaSyntaxKind::DocTagGeneric
            }
            LuaTokenKind::TagOverload => {
                self.parse_type()?;
                self.parse_description();
                LuaSyntaxKind::DocTagOverload
            }
            LuaTokenKind::TagDiagnostic => {
                self.parse_diagnostic()?;
                LuaSyntaxKind::DocTagDiagnostic
            }
            LuaTokenKind::TagMapping => {
                self.expect(LuaTokenKind::Name)?;
                self.parse_description();
                LuaSyntaxKind::DocTagMapping
            }
            LuaTokenKind::TagVersion => {
                self.parse_versions()?;
                self.parse_description();
                LuaSyntaxKind::DocTagVersion
            }
            LuaTokenKind::TagOperator => {
                self.parse_operator()?;
                LuaSyntaxKind::DocTagOperator
            }
            LuaTokenKind::TagSource => {
                self.parse_free_text();
                LuaSyntaxKind::DocTagSource
            }
            LuaTokenKind::TagDeprecated => {
                self.parse_free_text();
                LuaSyntaxKind::DocTagDeprecated
            }
            LuaTokenKind::TagAsync => {
                self.parse_description();
                LuaSyntaxKind::DocTagAsync
            }
            LuaTokenKind::TagNodiscard => {
                self.parse_description();
                LuaSyntaxKind::DocTagNodiscard
            }
            LuaTokenKind::TagMeta => {
                self.parse_free_text();
                LuaSyntaxKind::DocTagMeta
            }
            LuaTokenKind::TagVisibility => {
                self.parse_description();
                LuaSyntaxKind::DocTagVisibility
            }
            _ => {
                self.parse_free_text();
                LuaSyntaxKind::DocTagOther
            }
        };
        Ok(kind)
    }

    /// `[(attr, ...)] Name [<T, U: Base>] [: Super, ...]`
    fn parse_class_like(&mut self) -> DocResult<()> {
        self.parse_attributes()?;
        self.expect(LuaTokenKind::Name)?;
        if self.at(LuaTokenKind::Lt) {
            self.parse_generic_decl_list()?;
        }
        if self.eat(LuaTokenKind::Colon) {
            let m = self.mark();
            self.parse_type()?;
            while self.eat(LuaTokenKind::Comma) {
                self.parse_type()?;
            }
            m.complete(self, LuaSyntaxKind::DocSuperList);
        }
        self.parse_description();
        Ok(())
    }

    fn parse_attributes(&mut self) -> DocResult<()> {
        if !self.at(LuaTokenKind::LeftParen) {
            return Ok(());
        }
        let m = self.mark();
        self.bump();
        loop {
            self.expect(LuaTokenKind::Name)?;
            if !self.eat(LuaTokenKind::Comma) {
                break;
            }
        }
        self.expect(LuaTokenKind::RightParen)?;
        m.complete(self, LuaSyntaxKind::DocAttribute);
        Ok(())
    }

    fn parse_generic_decl_list(&mut self) -> DocResult<()> {
        let m = self.mark();
        self.bump();
        self.parse_generic_params()?;
        self.expect(LuaTokenKind::Gt)?;
        m.complete(self, LuaSyntaxKind::DocGenericDeclList);
        Ok(())
    }

    /// `T [: Constraint], ...`
    fn parse_generic_params(&mut self) -> DocResult<()> {
        loop {
            let m = self.mark();
            self.expect(LuaTokenKind::Name)?;
            if self.eat(LuaTokenKind::Colon) {
                self.nested(|p| p.parse_type())?;
            }
            m.complete(self, LuaSyntaxKind::DocGenericParam);
            if !self.eat(LuaTokenKind::Comma) {
                return Ok(());
            }
        }
    }

    fn parse_alias(&mut self) -> DocResult<()> {
        self.expect(LuaTokenKind::Name)?;
        if self.at(LuaTokenKind::Lt) {
            self.parse_generic_decl_list()?;
        }
        if !self.at(LuaTokenKind::DocLineEnd) && !self.at(LuaTokenKind::DocHash) {
            self.parse_type()?;
        }
        self.parse_description();

        while self.next_line_continues_alias() {
            self.next_line();
            self.parse_alias_member();
            if !self.at(LuaTokenKind::DocLineEnd) {
                return self.error("unexpected text after alias member");
            }
        }
        Ok(())
    }

    /// `[visibility] name[?] type` or `[visibility] [KeyType] type`.
    ///
    /// A visibility word may also be a field name (`@field private integer`),
    /// so the long form is tried first and rolled back on failure.
    fn parse_field(&mut self) -> DocResult<()> {
        if self.at(LuaTokenKind::Name) && VISIBILITY_WORDS.contains(&self.current_text()) {
            let checkpoint = self.checkpoint();
            let m = self.mark();
            self.bump();
            m.complete(self, LuaSyntaxKind::DocVisibility);
            if self.parse_field_rest().is_ok() {
                return Ok(());
            }
            self.rollback(checkpoint);
        }
        self.parse_field_rest()
    }

    fn parse_field_rest(&mut self) -> DocResult<()> {
        if self.eat(LuaTokenKind::LeftBracket) {
            self.nested(|p| p.parse_type())?;
            self.expect(LuaTokenKind::RightBracket)?;
        } else {
            self.expect(LuaTokenKind::Name)?;
        }
        self.eat(LuaTokenKind::DocQuestion);
        self.parse_type()?;
        self.parse_description();
        Ok(())
    }

    /// `type [name], type [name] [# description]`
    fn parse_returns(&mut self) -> DocResult<()> {
        loop {
            let m = self.mark();
            self.parse_type()?;
            if self.at(LuaTokenKind::Name) {
                self.bump();
            }
            m.complete(self, LuaSyntaxKind::DocNamedReturn);
            if !self.eat(LuaTokenKind::Comma) {
                break;
            }
        }
        self.parse_description();
        Ok(())
    }

    /// `action[: code, code]`
    fn parse_diagnostic(&mut self) -> DocResult<()> {
        self.expect(LuaTokenKind::Name)?;
        if self.eat(LuaTokenKind::Colon) {
            let m = self.mark();
            loop {
                self.expect(LuaTokenKind::Name)?;
                if !self.eat(LuaTokenKind::Comma) {
                    break;
                }
            }
            m.complete(self, LuaSyntaxKind::DocDiagnosticCodeList);
        }
        Ok(())
    }

    /// `>5.1, JIT`
    fn parse_versions(&mut self) -> DocResult<()> {
        loop {
            let m = self.mark();
            if !self.eat(LuaTokenKind::Gt) {
                self.eat(LuaTokenKind::Lt);
            }
            match self.current() {
                LuaTokenKind::Name | LuaTokenKind::Float | LuaTokenKind::Int => self.bump(),
                _ => return self.error("expected a version"),
            }
            m.complete(self, LuaSyntaxKind::DocVersion);
            if !self.eat(LuaTokenKind::Comma) {
                return Ok(());
            }
        }
    }

    /// `name[(Operand)]: Result`
    fn parse_operator(&mut self) -> DocResult<()> {
        self.expect(LuaTokenKind::Name)?;
        if self.eat(LuaTokenKind::LeftParen) {
            let m = self.mark();
            if !self.at(LuaTokenKind::RightParen) {
                loop {
                    self.nested(|p| p.parse_type())?;
                    if !self.eat(LuaTokenKind::Comma) {
                        break;
                    }
                }
            }
            m.complete(self, LuaSyntaxKind::DocTypeList);
            self.expect(LuaTokenKind::RightParen)?;
        }
        if self.eat(LuaTokenKind::Colon) {
            self.parse_type()?;
        }
        self.parse_description();
        Ok(())
    }

    /// Optional trailing description, with or without a leading `#`.
    fn parse_description(&mut self) {
        match self.current() {
            LuaTokenKind::DocLineEnd => {}
            LuaTokenKind::DocHash => {
                let m = self.mark();
                self.bump();
                self.switch_to_description();
                self.eat(LuaTokenKind::DocDescription);
                m.complete(self, LuaSyntaxKind::DocDescription);
            }
            _ => self.parse_free_text(),
        }
    }

    fn parse_free_text(&mut self) {
        self.switch_to_description();
        if self.at(LuaTokenKind::DocDescription) {
            let m = self.mark();
            self.bump();
            m.complete(self, LuaSyntaxKind::DocDescription);
        }
    }

    // ─── types ─────────────────────────────────────────────────────────

    fn parse_type(&mut self) -> DocResult<CompleteMarker> {
        let first = self.parse_single_type()?;
        if !self.at(LuaTokenKind::DocOr) {
            return Ok(first);
        }
        let m = first.precede(self);
        while self.eat(LuaTokenKind::DocOr) {
            self.parse_single_type()?;
        }
        Ok(m.complete(self, LuaSyntaxKind::TypeUnion))
    }

    fn parse_single_type(&mut self) -> DocResult<CompleteMarker> {
        let mut ty = self.parse_primary_type()?;
        loop {
            ty = match self.current() {
                LuaTokenKind::LeftBracket => {
                    let m = ty.precede(self);
                    self.bump();
                    self.expect(LuaTokenKind::RightBracket)?;
                    m.complete(self, LuaSyntaxKind::TypeArray)
                }
                LuaTokenKind::DocQuestion => {
                    let m = ty.precede(self);
                    self.bump();
                    m.complete(self, LuaSyntaxKind::TypeNullable)
                }
                _ => return Ok(ty),
            };
        }
    }

    fn parse_primary_type(&mut self) -> DocResult<CompleteMarker> {
        let m = self.mark();
        let kind = match self.current() {
            LuaTokenKind::Name => match self.current_text() {
                "true" | "false" => {
                    self.bump();
                    LuaSyntaxKind::TypeLiteral
                }
                "fun" => {
                    self.bump();
                    if self.at(LuaTokenKind::LeftParen) {
                        self.parse_fun_type()?;
                        LuaSyntaxKind::TypeFun
                    } else {
                        LuaSyntaxKind::TypeName
                    }
                }
                _ => {
                    self.bump();
                    if self.at(LuaTokenKind::Lt) {
                        self.bump();
                        self.nested(|p| {
                            p.parse_type()?;
                            while p.eat(LuaTokenKind::Comma) {
                                p.parse_type()?;
                            }
                            Ok(())
                        })?;
                        self.expect(LuaTokenKind::Gt)?;
                        LuaSyntaxKind::TypeGeneric
                    } else {
                        LuaSyntaxKind::TypeName
                    }
                }
            },
            LuaTokenKind::String | LuaTokenKind::Int | LuaTokenKind::Float => {
                self.bump();
                LuaSyntaxKind::TypeLiteral
            }
            LuaTokenKind::LeftParen => {
                self.bump();
                self.nested(|p| p.parse_type())?;
                self.expect(LuaTokenKind::RightParen)?;
                LuaSyntaxKind::TypeParen
            }
            LuaTokenKind::LeftBracket => {
                self.bump();
                self.nested(|p| {
                    if !p.at(LuaTokenKind::RightBracket) {
                        p.parse_type()?;
                        while p.eat(LuaTokenKind::Comma) {
                            p.parse_type()?;
                        }
                    }
                    Ok(())
                })?;
                self.expect(LuaTokenKind::RightBracket)?;
                LuaSyntaxKind::TypeTuple
            }
            LuaTokenKind::LeftBrace => {
                self.bump();
                self.nested(|p| p.parse_object_fields())?;
                self.expect(LuaTokenKind::RightBrace)?;
                LuaSyntaxKind::TypeObject
            }
            LuaTokenKind::Dots => {
                self.bump();
                if matches!(
                    self.current(),
                    LuaTokenKind::Name | LuaTokenKind::LeftParen | LuaTokenKind::LeftBrace
                ) {
                    self.parse_single_type()?;
                }
                LuaSyntaxKind::TypeVariadic
            }
            _ => return self.error(format!("expected a type, found '{}'", self.current())),
        };
        Ok(m.complete(self, kind))
    }

    /// `(a: T, b?: U, ...: V): R1, R2`
    fn parse_fun_type(&mut self) -> DocResult<()> {
        self.bump();
        if !self.at(LuaTokenKind::RightParen) {
            loop {
                let m = self.mark();
                if !self.eat(LuaTokenKind::Dots) {
                    self.expect(LuaTokenKind::Name)?;
                }
                self.eat(LuaTokenKind::DocQuestion);
                if self.eat(LuaTokenKind::Colon) {
                    self.nested(|p| p.parse_type())?;
                }
                m.complete(self, LuaSyntaxKind::DocFuncParam);
                if !self.eat(LuaTokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(LuaTokenKind::RightParen)?;

        if self.eat(LuaTokenKind::Colon) {
            self.nested(|p| p.parse_type())?;
            if self.type_depth == 0 {
                while self.eat(LuaTokenKind::Comma) {
                    self.nested(|p| p.parse_type())?;
                }
            }
        }
        Ok(())
    }

    fn parse_object_fields(&mut self) -> DocResult<()> {
        while !self.at(LuaTokenKind::RightBrace) {
            let m = self.mark();
            match self.current() {
                LuaTokenKind::Name | LuaTokenKind::Int | LuaTokenKind::String => self.bump(),
                LuaTokenKind::LeftBracket => {
                    self.bump();
                    self.parse_type()?;
                    self.expect(LuaTokenKind::RightBracket)?;
                }
                _ => return self.error("expected a field name"),
            }
            self.eat(LuaTokenKind::DocQuestion);
            self.expect(LuaTokenKind::Colon)?;
            self.parse_type()?;
            m.complete(self, LuaSyntaxKind::DocObjectField);
            if !self.eat(LuaTokenKind::Comma) {
                break;
            }
        }
        Ok(())
    }
}
