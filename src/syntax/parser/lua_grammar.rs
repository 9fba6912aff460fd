use super::{CompleteMarker, LuaParser, Marker, MarkerEventContainer};
use crate::syntax::{BinaryOperator, LuaSyntaxKind, LuaTokenKind, UnaryOperator, UNARY_PRIORITY};

pub(super) fn parse_chunk(p: &mut LuaParser) {
    let m = p.mark();
    parse_block_inner(p, true);
    m.complete(p, LuaSyntaxKind::Chunk);
}

fn block_follow(kind: LuaTokenKind) -> bool {
    matches!(
        kind,
        LuaTokenKind::Eof
            | LuaTokenKind::End
            | LuaTokenKind::Else
            | LuaTokenKind::ElseIf
            | LuaTokenKind::Until
    )
}

fn parse_block(p: &mut LuaParser) {
    parse_block_inner(p, false);
}

/// At the top level a stray `end` or `until` is reported and skipped so the
/// rest of the file still parses.
fn parse_block_inner(p: &mut LuaParser, top_level: bool) {
    let m = p.mark();
    loop {
        let current = p.current();
        if block_follow(current) {
            if !top_level || current == LuaTokenKind::Eof {
                p.flush_comments();
                break;
            }
            let stray = p.mark();
            p.bump();
            stray.fail(p, LuaSyntaxKind::EmptyStat, format!("unexpected '{current}'"));
            continue;
        }
        let doc = p.leading_comments();
        let stat = p.mark();
        if let Some(doc) = doc {
            p.emit_comment(&doc);
        }
        parse_stat(p, stat);
    }
    m.complete(p, LuaSyntaxKind::Block);
}

fn parse_stat(p: &mut LuaParser, m: Marker) {
    let kind = match p.current() {
        LuaTokenKind::Semicolon => {
            p.bump();
            LuaSyntaxKind::EmptyStat
        }
        LuaTokenKind::If => parse_if(p),
        LuaTokenKind::While => {
            p.bump();
            parse_expr_or_error(p);
            p.expect(LuaTokenKind::Do);
            parse_block(p);
            p.expect(LuaTokenKind::End);
            LuaSyntaxKind::WhileStat
        }
        LuaTokenKind::Do => {
            p.bump();
            parse_block(p);
            p.expect(LuaTokenKind::End);
            LuaSyntaxKind::DoStat
        }
        LuaTokenKind::For => parse_for(p),
        LuaTokenKind::Repeat => {
            p.bump();
            parse_block(p);
            p.expect(LuaTokenKind::Until);
            parse_expr_or_error(p);
            LuaSyntaxKind::RepeatStat
        }
        LuaTokenKind::Function => parse_func_stat(p),
        LuaTokenKind::Local => parse_local(p),
        LuaTokenKind::DbColon => {
            p.bump();
            p.expect(LuaTokenKind::Name);
            p.expect(LuaTokenKind::DbColon);
            LuaSyntaxKind::LabelStat
        }
        LuaTokenKind::Return => {
            p.bump();
            if !block_follow(p.current()) && !p.at(LuaTokenKind::Semicolon) {
                parse_expr_list(p);
            }
            p.eat(LuaTokenKind::Semicolon);
            LuaSyntaxKind::ReturnStat
        }
        LuaTokenKind::Break => {
            p.bump();
            LuaSyntaxKind::BreakStat
        }
        LuaTokenKind::Goto => {
            p.bump();
            p.expect(LuaTokenKind::Name);
            LuaSyntaxKind::GotoStat
        }
        LuaTokenKind::Name | LuaTokenKind::LeftParen => parse_expr_stat(p),
        other => {
            p.bump();
            p.trailing_comment();
            m.fail(p, LuaSyntaxKind::EmptyStat, format!("unexpected '{other}'"));
            return;
        }
    };
    p.trailing_comment();
    m.complete(p, kind);
}

fn parse_if(p: &mut LuaParser) -> LuaSyntaxKind {
    p.bump();
    parse_expr_or_error(p);
    p.expect(LuaTokenKind::Then);
    parse_block(p);
    loop {
        match p.current() {
            LuaTokenKind::ElseIf => {
                let m = p.mark();
                p.bump();
                parse_expr_or_error(p);
                p.expect(LuaTokenKind::Then);
                parse_block(p);
                m.complete(p, LuaSyntaxKind::ElseIfClause);
            }
            LuaTokenKind::Else => {
                let m = p.mark();
                p.bump();
                parse_block(p);
                m.complete(p, LuaSyntaxKind::ElseClause);
            }
            _ => break,
        }
    }
    p.expect(LuaTokenKind::End);
    LuaSyntaxKind::IfStat
}

fn parse_for(p: &mut LuaParser) -> LuaSyntaxKind {
    p.bump();
    parse_param_name(p);
    let kind = if p.eat(LuaTokenKind::Assign) {
        parse_expr_or_error(p);
        p.expect(LuaTokenKind::Comma);
        parse_expr_or_error(p);
        if p.eat(LuaTokenKind::Comma) {
            parse_expr_or_error(p);
        }
        LuaSyntaxKind::ForStat
    } else {
        while p.eat(LuaTokenKind::Comma) {
            parse_param_name(p);
        }
        p.expect(LuaTokenKind::In);
        parse_expr_list(p);
        LuaSyntaxKind::ForRangeStat
    };
    p.expect(LuaTokenKind::Do);
    parse_block(p);
    p.expect(LuaTokenKind::End);
    kind
}

fn parse_param_name(p: &mut LuaParser) {
    let m = p.mark();
    if p.at(LuaTokenKind::Name) || p.at(LuaTokenKind::Dots) {
        p.bump();
        m.complete(p, LuaSyntaxKind::ParamName);
    } else {
        m.fail(p, LuaSyntaxKind::ParamName, "expected a name");
    }
}

/// `function a.b.c:m() ... end`
fn parse_func_stat(p: &mut LuaParser) -> LuaSyntaxKind {
    p.bump();
    let m = p.mark();
    if !p.expect(LuaTokenKind::Name) {
        m.undo(p);
        parse_closure_body(p);
        return LuaSyntaxKind::FuncStat;
    }
    let mut name = m.complete(p, LuaSyntaxKind::NameExpr);
    while p.at(LuaTokenKind::Dot) || p.at(LuaTokenKind::Colon) {
        let is_method = p.at(LuaTokenKind::Colon);
        let m = name.precede(p);
        p.bump();
        p.expect(LuaTokenKind::Name);
        name = m.complete(p, LuaSyntaxKind::IndexExpr);
        if is_method {
            break;
        }
    }
    parse_closure_body(p);
    LuaSyntaxKind::FuncStat
}

fn parse_local(p: &mut LuaParser) -> LuaSyntaxKind {
    p.bump();
    if p.eat(LuaTokenKind::Function) {
        let m = p.mark();
        p.expect(LuaTokenKind::Name);
        m.complete(p, LuaSyntaxKind::LocalName);
        parse_closure_body(p);
        return LuaSyntaxKind::LocalFuncStat;
    }

    loop {
        let m = p.mark();
        p.expect(LuaTokenKind::Name);
        if p.at(LuaTokenKind::Lt) {
            let attr = p.mark();
            p.bump();
            p.expect(LuaTokenKind::Name);
            p.expect(LuaTokenKind::Gt);
            attr.complete(p, LuaSyntaxKind::Attribute);
        }
        m.complete(p, LuaSyntaxKind::LocalName);
        if !p.eat(LuaTokenKind::Comma) {
            break;
        }
    }
    if p.eat(LuaTokenKind::Assign) {
        parse_expr_list(p);
    }
    LuaSyntaxKind::LocalStat
}

fn parse_expr_stat(p: &mut LuaParser) -> LuaSyntaxKind {
    let Some(first) = parse_suffixed_expr(p) else {
        return LuaSyntaxKind::EmptyStat;
    };
    if p.at(LuaTokenKind::Assign) || p.at(LuaTokenKind::Comma) {
        while p.eat(LuaTokenKind::Comma) {
            if parse_suffixed_expr(p).is_none() {
                break;
            }
        }
        p.expect(LuaTokenKind::Assign);
        parse_expr_list(p);
        return LuaSyntaxKind::AssignStat;
    }
    if first.kind(p) != LuaSyntaxKind::CallExpr {
        p.push_error("syntax error near expression, expected a call or an assignment");
    }
    LuaSyntaxKind::CallExprStat
}

fn parse_expr_list(p: &mut LuaParser) {
    parse_expr_or_error(p);
    while p.eat(LuaTokenKind::Comma) {
        parse_expr_or_error(p);
    }
}

fn parse_expr_or_error(p: &mut LuaParser) {
    if parse_expr(p).is_none() {
        p.push_error("expected expression");
    }
}

pub(super) fn parse_expr(p: &mut LuaParser) -> Option<CompleteMarker> {
    parse_sub_expr(p, 0)
}

fn parse_sub_expr(p: &mut LuaParser, limit: u8) -> Option<CompleteMarker> {
    let mut lhs = if UnaryOperator::from_token(p.current()).is_some() {
        let m = p.mark();
        p.bump();
        if parse_sub_expr(p, UNARY_PRIORITY).is_none() {
            p.push_error("expected expression after unary operator");
        }
        m.complete(p, LuaSyntaxKind::UnaryExpr)
    } else {
        parse_simple_expr(p)?
    };

    while let Some(op) = BinaryOperator::from_token(p.current()) {
        let (left, right) = op.priority();
        if left <= limit {
            break;
        }
        let m = lhs.precede(p);
        p.bump();
        if parse_sub_expr(p, right).is_none() {
            p.push_error("expected expression after binary operator");
        }
        lhs = m.complete(p, LuaSyntaxKind::BinaryExpr);
    }
    Some(lhs)
}

fn parse_simple_expr(p: &mut LuaParser) -> Option<CompleteMarker> {
    match p.current() {
        LuaTokenKind::Int
        | LuaTokenKind::Float
        | LuaTokenKind::String
        | LuaTokenKind::LongString
        | LuaTokenKind::Nil
        | LuaTokenKind::True
        | LuaTokenKind::False
        | LuaTokenKind::Dots => {
            let m = p.mark();
            p.bump();
            Some(m.complete(p, LuaSyntaxKind::LiteralExpr))
        }
        LuaTokenKind::LeftBrace => Some(parse_table(p)),
        LuaTokenKind::Function => {
            let m = p.mark();
            p.bump();
            parse_closure_inner(p);
            Some(m.complete(p, LuaSyntaxKind::ClosureExpr))
        }
        _ => parse_suffixed_expr(p),
    }
}

fn parse_primary_expr(p: &mut LuaParser) -> Option<CompleteMarker> {
    match p.current() {
        LuaTokenKind::Name => {
            let m = p.mark();
            p.bump();
            Some(m.complete(p, LuaSyntaxKind::NameExpr))
        }
        LuaTokenKind::LeftParen => {
            let m = p.mark();
            p.bump();
            parse_expr_or_error(p);
            p.expect(LuaTokenKind::RightParen);
            Some(m.complete(p, LuaSyntaxKind::ParenExpr))
        }
        _ => None,
    }
}

fn parse_suffixed_expr(p: &mut LuaParser) -> Option<CompleteMarker> {
    let mut expr = parse_primary_expr(p)?;
    loop {
        expr = match p.current() {
            LuaTokenKind::Dot => {
                let m = expr.precede(p);
                p.bump();
                p.expect(LuaTokenKind::Name);
                m.complete(p, LuaSyntaxKind::IndexExpr)
            }
            LuaTokenKind::LeftBracket => {
                let m = expr.precede(p);
                p.bump();
                parse_expr_or_error(p);
                p.expect(LuaTokenKind::RightBracket);
                m.complete(p, LuaSyntaxKind::IndexExpr)
            }
            LuaTokenKind::Colon => {
                let m = expr.precede(p);
                p.bump();
                p.expect(LuaTokenKind::Name);
                let index = m.complete(p, LuaSyntaxKind::IndexExpr);
                let call = index.precede(p);
                parse_call_args(p);
                call.complete(p, LuaSyntaxKind::CallExpr)
            }
            LuaTokenKind::LeftParen
            | LuaTokenKind::String
            | LuaTokenKind::LongString
            | LuaTokenKind::LeftBrace => {
                let m = expr.precede(p);
                parse_call_args(p);
                m.complete(p, LuaSyntaxKind::CallExpr)
            }
            _ => return Some(expr),
        };
    }
}

fn parse_call_args(p: &mut LuaParser) {
    let m = p.mark();
    match p.current() {
        LuaTokenKind::LeftParen => {
            p.bump();
            if !p.at(LuaTokenKind::RightParen) {
                parse_expr_list(p);
            }
            p.expect(LuaTokenKind::RightParen);
        }
        LuaTokenKind::String | LuaTokenKind::LongString => {
            let literal = p.mark();
            p.bump();
            literal.complete(p, LuaSyntaxKind::LiteralExpr);
        }
        LuaTokenKind::LeftBrace => {
            parse_table(p);
        }
        _ => p.push_error("expected call arguments"),
    }
    m.complete(p, LuaSyntaxKind::CallArgList);
}

fn parse_table(p: &mut LuaParser) -> CompleteMarker {
    let m = p.mark();
    p.bump();
    loop {
        if p.at(LuaTokenKind::RightBrace) || p.at(LuaTokenKind::Eof) {
            p.flush_comments();
            break;
        }
        let doc = p.leading_comments();
        let field = p.mark();
        if let Some(doc) = doc {
            p.emit_comment(&doc);
        }
        parse_table_field(p);
        let has_separator = p.eat(LuaTokenKind::Comma) || p.eat(LuaTokenKind::Semicolon);
        p.trailing_comment();
        field.complete(p, LuaSyntaxKind::TableField);
        if !has_separator {
            break;
        }
    }
    p.expect(LuaTokenKind::RightBrace);
    m.complete(p, LuaSyntaxKind::TableExpr)
}

fn parse_table_field(p: &mut LuaParser) {
    match p.current() {
        LuaTokenKind::LeftBracket => {
            p.bump();
            parse_expr_or_error(p);
            p.expect(LuaTokenKind::RightBracket);
            p.expect(LuaTokenKind::Assign);
            parse_expr_or_error(p);
        }
        LuaTokenKind::Name if p.peek_next() == LuaTokenKind::Assign => {
            p.bump();
            p.bump();
            parse_expr_or_error(p);
        }
        _ => parse_expr_or_error(p),
    }
}

fn parse_closure_body(p: &mut LuaParser) {
    let m = p.mark();
    parse_closure_inner(p);
    m.complete(p, LuaSyntaxKind::ClosureExpr);
}

fn parse_closure_inner(p: &mut LuaParser) {
    let params = p.mark();
    if p.expect(LuaTokenKind::LeftParen) {
        if !p.at(LuaTokenKind::RightParen) {
            loop {
                parse_param_name(p);
                if !p.eat(LuaTokenKind::Comma) {
                    break;
                }
            }
        }
        p.expect(LuaTokenKind::RightParen);
    }
    params.complete(p, LuaSyntaxKind::ParamList);
    parse_block(p);
    p.expect(LuaTokenKind::End);
}
