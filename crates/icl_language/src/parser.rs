//! The ICL parser.
//!
//! Hybrid recursive descent: statements and blocks are parsed by dedicated
//! methods, expressions by Pratt-style precedence climbing over a binding
//! power table. Precedence, low to high:
//!
//! | Level | Operators |
//! |-------|-----------|
//! | 1 | `\|\|` |
//! | 2 | `&&` |
//! | 3 | `==` `!=` |
//! | 4 | `<` `<=` `>` `>=` |
//! | 5 | `+` `-` |
//! | 6 | `*` `/` `%` |
//! | 7 | unary `!` `-` `+` |
//! | 8 | postfix call |
//!
//! All binary operators are left-associative. The conditional form is
//! strictly `if EXPR ? { … } [: { … }]`, the loop form strictly
//! `loop IDENT in EXPR .. EXPR { … }`. The `@` call prefix is accepted and
//! carried into the AST as telemetry with no semantic effect.
//!
//! ## Error recovery
//!
//! A parse failure inside a block records its diagnostic and skips to the
//! next statement boundary (`;`, `}`, or a statement-starting keyword), then
//! parsing continues. `parse_program` returns either the full AST or the
//! aggregated diagnostics — never a partial success.

use crate::arena_ctx::AstContext;
use crate::ast::{BinaryOp, Block, Callee, Expr, FnBody, Param, Stmt, TypeAnnotation, UnaryOp};
use crate::token::{Token, TokenKind};
use icl_base::{codes, Diagnostic, DiagnosticList, Span};

type ParseResult<T> = Result<T, Diagnostic>;

fn binary_op(kind: TokenKind) -> Option<(BinaryOp, u8)> {
    Some(match kind {
        TokenKind::OrOr => (BinaryOp::Or, 1),
        TokenKind::AndAnd => (BinaryOp::And, 2),
        TokenKind::EqEq => (BinaryOp::Eq, 3),
        TokenKind::NotEq => (BinaryOp::NotEq, 3),
        TokenKind::Lt => (BinaryOp::Lt, 4),
        TokenKind::LtEq => (BinaryOp::LtEq, 4),
        TokenKind::Gt => (BinaryOp::Gt, 4),
        TokenKind::GtEq => (BinaryOp::GtEq, 4),
        TokenKind::Plus => (BinaryOp::Add, 5),
        TokenKind::Minus => (BinaryOp::Sub, 5),
        TokenKind::Star => (BinaryOp::Mul, 6),
        TokenKind::Slash => (BinaryOp::Div, 6),
        TokenKind::Percent => (BinaryOp::Mod, 6),
        _ => return None,
    })
}

/// Token-stream cursor producing the arena AST.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    ctx: AstContext<'a>,
    diagnostics: DiagnosticList,
}

impl<'a> Parser<'a> {
    /// `tokens` must be `Eof`-terminated, as produced by the lexer.
    pub fn new(tokens: Vec<Token>, ctx: AstContext<'a>) -> Self {
        debug_assert!(matches!(
            tokens.last().map(|t| t.kind),
            Some(TokenKind::Eof)
        ));
        Parser {
            tokens,
            pos: 0,
            ctx,
            diagnostics: DiagnosticList::new(),
        }
    }

    /// Parses a whole program: statements with optional `;` separators.
    pub fn parse_program(mut self) -> Result<Vec<Stmt<'a>>, DiagnosticList> {
        let mut stmts = Vec::new();
        self.skip_semicolons();
        while !self.at_end() {
            let before = self.pos;
            match self.parse_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(diag) => {
                    self.diagnostics.push(diag);
                    self.synchronize();
                    if self.pos == before && !self.at_end() {
                        self.pos += 1;
                    }
                }
            }
            self.skip_semicolons();
        }
        if self.diagnostics.has_errors() {
            Err(self.diagnostics)
        } else {
            log::trace!("parsed {} top-level statements", stmts.len());
            Ok(stmts)
        }
    }

    // ─── Cursor helpers ─────────────────────────────────────────────────

    fn peek(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let found = self.peek();
            Err(Diagnostic::error(
                codes::PAR_EXPECTED_FORM,
                format!(
                    "expected {} in {}, found {}",
                    kind.describe(),
                    context,
                    found.kind.describe()
                ),
            )
            .with_span(found.span))
        }
    }

    fn skip_semicolons(&mut self) {
        while self.check(TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// Skips to the next statement boundary after a parse failure.
    fn synchronize(&mut self) {
        while !self.at_end() {
            if self.check(TokenKind::Semicolon) {
                self.advance();
                return;
            }
            if self.check(TokenKind::RBrace) {
                return;
            }
            self.advance();
            if matches!(
                self.peek().kind,
                TokenKind::Fn | TokenKind::If | TokenKind::Loop | TokenKind::Ret | TokenKind::Hash
            ) {
                return;
            }
        }
    }

    // ─── Statements ─────────────────────────────────────────────────────

    fn parse_statement(&mut self) -> ParseResult<Stmt<'a>> {
        match self.peek().kind {
            TokenKind::Fn => self.parse_fn_def(),
            TokenKind::If => self.parse_if(),
            TokenKind::Loop => self.parse_loop(),
            TokenKind::Ret => self.parse_return(),
            TokenKind::Hash => self.parse_macro(),
            TokenKind::Ident if self.at_assignment() => self.parse_assignment(),
            _ => {
                let expr = self.parse_expr()?;
                Ok(Stmt::ExprStmt {
                    expr,
                    span: expr.span(),
                })
            }
        }
    }

    fn at_assignment(&self) -> bool {
        self.peek_kind_at(1) == TokenKind::Assign
            || (self.peek_kind_at(1) == TokenKind::Colon
                && self.peek_kind_at(2) == TokenKind::Ident
                && self.peek_kind_at(3) == TokenKind::Assign)
    }

    fn parse_assignment(&mut self) -> ParseResult<Stmt<'a>> {
        let name = self.advance();
        let annotation = if self.check(TokenKind::Colon) {
            self.advance();
            Some(self.parse_annotation("assignment annotation")?)
        } else {
            None
        };
        self.expect(TokenKind::Assign, "assignment")?;
        let value = self.parse_expr()?;
        Ok(Stmt::Assign {
            name: name.lexeme,
            annotation,
            value,
            span: name.span.merge(value.span()),
        })
    }

    fn parse_annotation(&mut self, context: &str) -> ParseResult<TypeAnnotation> {
        let token = self.expect(TokenKind::Ident, context)?;
        Ok(TypeAnnotation {
            name: token.lexeme,
            span: token.span,
        })
    }

    fn parse_fn_def(&mut self) -> ParseResult<Stmt<'a>> {
        let kw = self.advance();
        let name = self.expect(TokenKind::Ident, "function definition")?;
        self.expect(TokenKind::LParen, "function parameter list")?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen, "function parameter list")?;
        let ret = if self.check(TokenKind::Colon) {
            self.advance();
            Some(self.parse_annotation("return annotation")?)
        } else {
            None
        };
        if self.check(TokenKind::FatArrow) {
            self.advance();
            let body = self.parse_expr()?;
            return Ok(Stmt::FnDef {
                name: name.lexeme,
                params,
                ret,
                body: FnBody::Expr(body),
                span: kw.span.merge(body.span()),
            });
        }
        if self.check(TokenKind::LBrace) {
            let (block, block_span) = self.parse_block()?;
            return Ok(Stmt::FnDef {
                name: name.lexeme,
                params,
                ret,
                body: FnBody::Block(block),
                span: kw.span.merge(block_span),
            });
        }
        let found = self.peek();
        Err(Diagnostic::error(
            codes::PAR_EXPECTED_FORM,
            format!(
                "expected '=>' or '{{' after function signature, found {}",
                found.kind.describe()
            ),
        )
        .with_span(found.span)
        .with_hint("function bodies are 'fn name(params) => expr' or 'fn name(params) { … }'"))
    }

    fn parse_params(&mut self) -> ParseResult<&'a [Param]> {
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let name = self.expect(TokenKind::Ident, "parameter list")?;
                let mut span = name.span;
                let annotation = if self.check(TokenKind::Colon) {
                    self.advance();
                    let ann = self.parse_annotation("parameter annotation")?;
                    span = span.merge(ann.span);
                    Some(ann)
                } else {
                    None
                };
                params.push(Param {
                    name: name.lexeme,
                    annotation,
                    span,
                });
                if self.check(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        Ok(self.ctx.alloc_params(params))
    }

    fn parse_if(&mut self) -> ParseResult<Stmt<'a>> {
        let kw = self.advance();
        let cond = self.parse_expr()?;
        if !self.check(TokenKind::Question) {
            let found = self.peek();
            return Err(Diagnostic::error(
                codes::PAR_EXPECTED_FORM,
                format!("expected '?' after condition, found {}", found.kind.describe()),
            )
            .with_span(found.span)
            .with_hint("the conditional form is 'if EXPR ? { … } [: { … }]'"));
        }
        self.advance();
        let (then_block, mut end_span) = self.parse_block()?;
        let else_block = if self.check(TokenKind::Colon) {
            self.advance();
            let (block, span) = self.parse_block()?;
            end_span = span;
            Some(block)
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_block,
            else_block,
            span: kw.span.merge(end_span),
        })
    }

    fn parse_loop(&mut self) -> ParseResult<Stmt<'a>> {
        let kw = self.advance();
        let var = self.expect(TokenKind::Ident, "loop header")?;
        self.expect(TokenKind::In, "loop header")?;
        let start = self.parse_expr()?;
        self.expect(TokenKind::DotDot, "loop range")?;
        let end = self.parse_expr()?;
        let (body, body_span) = self.parse_block()?;
        Ok(Stmt::Loop {
            var: var.lexeme,
            start,
            end,
            body,
            span: kw.span.merge(body_span),
        })
    }

    fn parse_return(&mut self) -> ParseResult<Stmt<'a>> {
        let kw = self.advance();
        if self.peek().kind.starts_expression() {
            let value = self.parse_expr()?;
            Ok(Stmt::Return {
                value: Some(value),
                span: kw.span.merge(value.span()),
            })
        } else {
            Ok(Stmt::Return {
                value: None,
                span: kw.span,
            })
        }
    }

    fn parse_macro(&mut self) -> ParseResult<Stmt<'a>> {
        let hash = self.advance();
        let name = self.expect(TokenKind::Ident, "macro statement")?;
        let (args, args_span) = self.parse_call_args("macro arguments")?;
        Ok(Stmt::Macro {
            name: name.lexeme,
            args,
            span: hash.span.merge(args_span),
        })
    }

    /// Parses `{ … }`, recovering at statement boundaries inside the block.
    fn parse_block(&mut self) -> ParseResult<(Block<'a>, Span)> {
        let open = self.expect(TokenKind::LBrace, "block")?;
        let mut stmts = Vec::new();
        self.skip_semicolons();
        while !self.check(TokenKind::RBrace) {
            if self.at_end() {
                return Err(Diagnostic::error(
                    codes::PAR_EXPECTED_FORM,
                    "unclosed block: expected '}'",
                )
                .with_span(open.span));
            }
            let before = self.pos;
            match self.parse_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(diag) => {
                    self.diagnostics.push(diag);
                    self.synchronize();
                    if self.pos == before && !self.at_end() && !self.check(TokenKind::RBrace) {
                        self.pos += 1;
                    }
                }
            }
            self.skip_semicolons();
        }
        let close = self.advance();
        Ok((self.ctx.alloc_stmts(stmts), open.span.merge(close.span)))
    }

    // ─── Expressions ────────────────────────────────────────────────────

    fn parse_expr(&mut self) -> ParseResult<&'a Expr<'a>> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_bp: u8) -> ParseResult<&'a Expr<'a>> {
        let mut left = self.parse_unary()?;
        while let Some((op, bp)) = binary_op(self.peek().kind) {
            if bp < min_bp {
                break;
            }
            self.advance();
            // bp + 1: left-associative.
            let right = self.parse_binary(bp + 1)?;
            left = self.ctx.binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<&'a Expr<'a>> {
        let op = match self.peek().kind {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Pos),
            _ => None,
        };
        if let Some(op) = op {
            let token = self.advance();
            let operand = self.parse_unary()?;
            return Ok(self.ctx.unary(op, token.span, operand));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ParseResult<&'a Expr<'a>> {
        let primary = self.parse_primary()?;
        if !self.check(TokenKind::LParen) {
            return Ok(primary);
        }
        let callee = match primary {
            Expr::Ident { name, .. } => Callee::Named(*name),
            Expr::Lambda { .. } => Callee::Lambda(primary),
            Expr::Group { .. } if matches!(primary.ungrouped(), Expr::Lambda { .. }) => {
                Callee::Lambda(primary)
            }
            _ => {
                return Err(Diagnostic::error(
                    codes::PAR_EXPECTED_FORM,
                    "call target must be a function name or lambda",
                )
                .with_span(primary.span()));
            }
        };
        let (args, args_span) = self.parse_call_args("call arguments")?;
        let call = self.ctx.alloc_expr(Expr::Call {
            callee,
            args,
            at_prefixed: false,
            span: primary.span().merge(args_span),
        });
        if self.check(TokenKind::LParen) {
            return Err(Diagnostic::error(
                codes::PAR_EXPECTED_FORM,
                "chained calls are not supported",
            )
            .with_span(self.peek().span)
            .with_hint("assign the result to a name before calling it"));
        }
        Ok(call)
    }

    fn parse_primary(&mut self) -> ParseResult<&'a Expr<'a>> {
        let token = self.peek();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                Ok(self.ctx.alloc_expr(Expr::Number {
                    text: token.lexeme,
                    span: token.span,
                }))
            }
            TokenKind::Str => {
                self.advance();
                Ok(self.ctx.alloc_expr(Expr::Str {
                    value: token.lexeme,
                    span: token.span,
                }))
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                Ok(self.ctx.alloc_expr(Expr::Bool {
                    value: token.kind == TokenKind::True,
                    span: token.span,
                }))
            }
            TokenKind::Ident => {
                self.advance();
                Ok(self.ctx.alloc_expr(Expr::Ident {
                    name: token.lexeme,
                    span: token.span,
                }))
            }
            TokenKind::Lam => self.parse_lambda(),
            TokenKind::At => {
                let at = self.advance();
                let name = self.expect(TokenKind::Ident, "'@' call")?;
                if !self.check(TokenKind::LParen) {
                    let found = self.peek();
                    return Err(Diagnostic::error(
                        codes::PAR_EXPECTED_FORM,
                        format!(
                            "expected '(' after '@'-prefixed name, found {}",
                            found.kind.describe()
                        ),
                    )
                    .with_span(found.span)
                    .with_hint("the '@' prefix marks a call: '@name(args)'"));
                }
                let (args, args_span) = self.parse_call_args("call arguments")?;
                Ok(self.ctx.alloc_expr(Expr::Call {
                    callee: Callee::Named(name.lexeme),
                    args,
                    at_prefixed: true,
                    span: at.span.merge(args_span),
                }))
            }
            TokenKind::LParen => {
                let open = self.advance();
                let inner = self.parse_expr()?;
                let close = self.expect(TokenKind::RParen, "parenthesized expression")?;
                Ok(self.ctx.alloc_expr(Expr::Group {
                    inner,
                    span: open.span.merge(close.span),
                }))
            }
            _ => Err(Diagnostic::error(
                codes::PAR_UNEXPECTED_TOKEN,
                format!("unexpected {} in expression", token.kind.describe()),
            )
            .with_span(token.span)),
        }
    }

    fn parse_lambda(&mut self) -> ParseResult<&'a Expr<'a>> {
        let kw = self.advance();
        self.expect(TokenKind::LParen, "lambda parameter list")?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen, "lambda parameter list")?;
        let ret = if self.check(TokenKind::Colon) {
            self.advance();
            Some(self.parse_annotation("lambda return annotation")?)
        } else {
            None
        };
        self.expect(TokenKind::FatArrow, "lambda body")?;
        let body = self.parse_expr()?;
        Ok(self.ctx.alloc_expr(Expr::Lambda {
            params,
            ret,
            body,
            span: kw.span.merge(body.span()),
        }))
    }

    /// Parses `( expr, … )`, returning the argument slice and closing span.
    fn parse_call_args(&mut self, context: &str) -> ParseResult<(&'a [&'a Expr<'a>], Span)> {
        let open = self.expect(TokenKind::LParen, context)?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.check(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RParen, context)?;
        Ok((self.ctx.alloc_args(args), open.span.merge(close.span)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Param, Stmt};
    use crate::lexer::Lexer;
    use icl_base::{Arena, Interner};

    fn parse_with<'a>(
        source: &str,
        ctx: AstContext<'a>,
        interner: &mut Interner,
    ) -> Result<Vec<Stmt<'a>>, DiagnosticList> {
        let tokens = Lexer::new(source, interner).tokenize()?;
        Parser::new(tokens, ctx).parse_program()
    }

    macro_rules! arenas {
        ($ctx:ident) => {
            let exprs: Arena<Expr> = Arena::new();
            let stmts: Arena<Stmt> = Arena::new();
            let params: Arena<Param> = Arena::new();
            let expr_refs: Arena<&Expr> = Arena::new();
            let $ctx = AstContext::new(&exprs, &stmts, &params, &expr_refs);
        };
    }

    #[test]
    fn parses_assignment_with_annotation() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let program = parse_with("x : Num := 1 + 2;", ctx, &mut interner).unwrap();
        assert_eq!(program.len(), 1);
        match &program[0] {
            Stmt::Assign {
                name, annotation, value, ..
            } => {
                assert_eq!(interner.resolve(*name), "x");
                let ann = annotation.expect("annotation");
                assert_eq!(interner.resolve(ann.name), "Num");
                assert!(matches!(value, Expr::Binary { op: BinaryOp::Add, .. }));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn precedence_nests_multiplication_tighter() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let program = parse_with("x := 1 + 2 * 3;", ctx, &mut interner).unwrap();
        match &program[0] {
            Stmt::Assign { value, .. } => match value {
                Expr::Binary {
                    op: BinaryOp::Add,
                    right,
                    ..
                } => {
                    assert!(matches!(right, Expr::Binary { op: BinaryOp::Mul, .. }));
                }
                other => panic!("expected addition at root, got {:?}", other),
            },
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn binary_operators_are_left_associative() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let program = parse_with("x := 1 - 2 - 3;", ctx, &mut interner).unwrap();
        match &program[0] {
            Stmt::Assign { value, .. } => match value {
                Expr::Binary {
                    op: BinaryOp::Sub,
                    left,
                    ..
                } => {
                    assert!(matches!(left, Expr::Binary { op: BinaryOp::Sub, .. }));
                }
                other => panic!("expected subtraction at root, got {:?}", other),
            },
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn grouping_is_preserved_as_a_node() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let program = parse_with("x := a * (b + c);", ctx, &mut interner).unwrap();
        match &program[0] {
            Stmt::Assign { value, .. } => match value {
                Expr::Binary { right, .. } => {
                    assert!(matches!(right, Expr::Group { .. }));
                }
                _ => panic!("expected binary"),
            },
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn parses_expression_bodied_function() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let program =
            parse_with("fn add(a:Num,b:Num):Num => a+b;", ctx, &mut interner).unwrap();
        match &program[0] {
            Stmt::FnDef {
                name, params, ret, body, ..
            } => {
                assert_eq!(interner.resolve(*name), "add");
                assert_eq!(params.len(), 2);
                assert!(ret.is_some());
                assert!(matches!(body, FnBody::Expr(_)));
            }
            other => panic!("expected fn def, got {:?}", other),
        }
    }

    #[test]
    fn parses_block_bodied_function() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let program = parse_with("fn f(x) { ret x; }", ctx, &mut interner).unwrap();
        match &program[0] {
            Stmt::FnDef { body: FnBody::Block(block), .. } => {
                assert_eq!(block.len(), 1);
                assert!(matches!(block[0], Stmt::Return { value: Some(_), .. }));
            }
            other => panic!("expected block fn, got {:?}", other),
        }
    }

    #[test]
    fn parses_conditional_with_else() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let program =
            parse_with("if true ? { x := 1; } : { x := 2; }", ctx, &mut interner).unwrap();
        match &program[0] {
            Stmt::If {
                then_block,
                else_block,
                ..
            } => {
                assert_eq!(then_block.len(), 1);
                assert_eq!(else_block.unwrap().len(), 1);
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn conditional_without_question_is_par002() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let err = parse_with("if true { x := 1; }", ctx, &mut interner).unwrap_err();
        assert!(err.iter().any(|d| d.code == "PAR002"));
    }

    #[test]
    fn parses_loop_over_range() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let program =
            parse_with("loop i in 0..3 { sum := sum + i; }", ctx, &mut interner).unwrap();
        match &program[0] {
            Stmt::Loop { var, body, .. } => {
                assert_eq!(interner.resolve(*var), "i");
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected loop, got {:?}", other),
        }
    }

    #[test]
    fn at_prefix_is_preserved_as_metadata() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let program = parse_with("x := @add(2,3); y := add(2,3);", ctx, &mut interner).unwrap();
        match &program[0] {
            Stmt::Assign { value, .. } => match value {
                Expr::Call { at_prefixed, .. } => assert!(at_prefixed),
                _ => panic!("expected call"),
            },
            _ => panic!("expected assignment"),
        }
        match &program[1] {
            Stmt::Assign { value, .. } => match value {
                Expr::Call { at_prefixed, .. } => assert!(!at_prefixed),
                _ => panic!("expected call"),
            },
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn parses_lambda_expression() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let program =
            parse_with("f := lam(x:Num):Num => x * 2;", ctx, &mut interner).unwrap();
        match &program[0] {
            Stmt::Assign { value, .. } => {
                assert!(matches!(value, Expr::Lambda { .. }));
            }
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn grouped_lambda_is_callable() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let program = parse_with("x := (lam(n) => n + 1)(5);", ctx, &mut interner).unwrap();
        match &program[0] {
            Stmt::Assign { value, .. } => match value {
                Expr::Call { callee, args, .. } => {
                    assert!(matches!(callee, Callee::Lambda(_)));
                    assert_eq!(args.len(), 1);
                }
                other => panic!("expected call, got {:?}", other),
            },
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn parses_macro_statement() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let program = parse_with("#echo(x + 1);", ctx, &mut interner).unwrap();
        match &program[0] {
            Stmt::Macro { name, args, .. } => {
                assert_eq!(interner.resolve(*name), "echo");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected macro, got {:?}", other),
        }
    }

    #[test]
    fn recovery_collects_multiple_errors() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let err = parse_with("x := ; y := 1; z := *;", ctx, &mut interner).unwrap_err();
        assert!(err.len() >= 2, "expected both errors, got: {}", err);
    }

    #[test]
    fn recovery_inside_block_continues_after_boundary() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let err = parse_with(
            "fn f() { x := ; y := 1; } z := *;",
            ctx,
            &mut interner,
        )
        .unwrap_err();
        assert!(err.len() >= 2);
    }

    #[test]
    fn statements_do_not_require_semicolons() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let program = parse_with("x := 1\ny := 2", ctx, &mut interner).unwrap();
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn chained_calls_are_rejected() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let err = parse_with("x := f(1)(2);", ctx, &mut interner).unwrap_err();
        assert!(err.iter().any(|d| d.code == "PAR002"));
    }

    #[test]
    fn bare_return_parses_without_value() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let program = parse_with("fn f() { ret; }", ctx, &mut interner).unwrap();
        match &program[0] {
            Stmt::FnDef { body: FnBody::Block(block), .. } => {
                assert!(matches!(block[0], Stmt::Return { value: None, .. }));
            }
            _ => panic!("expected fn"),
        }
    }
}
