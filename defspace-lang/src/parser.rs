use crate::ast::{
    BinaryOp, Block, CallArg, Expr, ExprKind, FnDef, Literal, Param, Program, Stmt, UnaryOp,
};
use crate::error::{LangError, Result, Span};
use crate::lexer::{SpannedToken, Token};
use std::rc::Rc;

static EOF: SpannedToken = SpannedToken {
    token: Token::Eof,
    span: Span { start: 0, end: 0 },
};

/// Recursive-descent parser for definition files
pub struct Parser<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [SpannedToken]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Peek at current token
    fn peek(&self) -> &'a SpannedToken {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &'a SpannedToken {
        let tokens: &'a [SpannedToken] = self.tokens;
        tokens
            .get(self.pos + n)
            .or_else(|| tokens.last())
            .unwrap_or(&EOF)
    }

    /// Advance to next token
    fn advance(&mut self) -> &'a SpannedToken {
        let token = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Check if current token matches expected
    fn check(&self, expected: &Token) -> bool {
        std::mem::discriminant(&self.peek().token) == std::mem::discriminant(expected)
    }

    /// Consume token if it matches
    fn consume(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expect a token, error if not found
    fn expect(&mut self, expected: Token) -> Result<&'a SpannedToken> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            let found = self.peek();
            Err(LangError::ParserError {
                span: found.span,
                message: format!("Expected {:?}, found {:?}", expected, found.token),
            })
        }
    }

    fn expect_identifier(&mut self) -> Result<(String, Span)> {
        let token = self.peek();
        match &token.token {
            Token::Identifier(name) => {
                self.advance();
                Ok((name.clone(), token.span))
            }
            other => Err(LangError::ParserError {
                span: token.span,
                message: format!("Expected identifier, found {:?}", other),
            }),
        }
    }

    /// Check if at end of input
    fn is_eof(&self) -> bool {
        matches!(self.peek().token, Token::Eof)
    }

    /// Parse the entire input as a program
    pub fn parse(&mut self) -> Result<Program> {
        let mut stmts = Vec::new();
        while !self.is_eof() {
            if self.consume(&Token::Semicolon) {
                continue;
            }
            stmts.push(self.parse_stmt()?);
        }
        Ok(Program { stmts })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        let stmt = match &self.peek().token {
            Token::Import => self.parse_import()?,
            Token::Let => self.parse_let()?,
            Token::Fn if matches!(self.peek_nth(1).token, Token::Identifier(_)) => {
                Stmt::FnDecl(Rc::new(self.parse_fn(true)?))
            }
            Token::Return => self.parse_return()?,
            Token::While => self.parse_while()?,
            Token::For => self.parse_for()?,
            _ => {
                let expr = self.parse_expr()?;
                if self.check(&Token::Eq) {
                    self.parse_assign(expr)?
                } else {
                    Stmt::Expr(expr)
                }
            }
        };
        self.consume(&Token::Semicolon);
        Ok(stmt)
    }

    fn parse_import(&mut self) -> Result<Stmt> {
        let start = self.expect(Token::Import)?.span;
        let (first, mut end) = self.expect_identifier()?;
        let mut path = vec![first];
        while self.consume(&Token::Dot) {
            let (segment, span) = self.expect_identifier()?;
            path.push(segment);
            end = span;
        }
        let alias = if self.consume(&Token::As) {
            let (alias, span) = self.expect_identifier()?;
            end = span;
            Some(alias)
        } else {
            None
        };
        Ok(Stmt::Import {
            path,
            alias,
            span: start.to(end),
        })
    }

    fn parse_let(&mut self) -> Result<Stmt> {
        let start = self.expect(Token::Let)?.span;
        let (name, _) = self.expect_identifier()?;
        self.expect(Token::Eq)?;
        let value = self.parse_expr()?;
        let span = start.to(value.span);
        Ok(Stmt::Let { name, value, span })
    }

    fn parse_assign(&mut self, target: Expr) -> Result<Stmt> {
        if !matches!(
            target.kind,
            ExprKind::Ident(_) | ExprKind::Attr { .. } | ExprKind::Index { .. }
        ) {
            return Err(LangError::ParserError {
                span: target.span,
                message: "Invalid assignment target".to_string(),
            });
        }
        self.expect(Token::Eq)?;
        let value = self.parse_expr()?;
        let span = target.span.to(value.span);
        Ok(Stmt::Assign {
            target,
            value,
            span,
        })
    }

    fn parse_return(&mut self) -> Result<Stmt> {
        let start = self.expect(Token::Return)?.span;
        if matches!(
            self.peek().token,
            Token::RBrace | Token::Semicolon | Token::Eof
        ) {
            return Ok(Stmt::Return {
                value: None,
                span: start,
            });
        }
        let value = self.parse_expr()?;
        let span = start.to(value.span);
        Ok(Stmt::Return {
            value: Some(value),
            span,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt> {
        let start = self.expect(Token::While)?.span;
        let condition = self.parse_expr()?;
        let body = self.parse_block()?;
        let span = start.to(body.span);
        Ok(Stmt::While {
            condition,
            body,
            span,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt> {
        let start = self.expect(Token::For)?.span;
        let (var, _) = self.expect_identifier()?;
        self.expect(Token::In)?;
        let iterable = self.parse_expr()?;
        let body = self.parse_block()?;
        let span = start.to(body.span);
        Ok(Stmt::For {
            var,
            iterable,
            body,
            span,
        })
    }

    /// `fn name(params) { body }`, or `fn (params) { body }` when anonymous
    fn parse_fn(&mut self, named: bool) -> Result<FnDef> {
        let start = self.expect(Token::Fn)?.span;
        let name = if named {
            Some(self.expect_identifier()?.0)
        } else {
            None
        };

        self.expect(Token::LParen)?;
        let mut params: Vec<Param> = Vec::new();
        while !self.check(&Token::RParen) && !self.is_eof() {
            let (param_name, span) = self.expect_identifier()?;
            if params.iter().any(|p| p.name == param_name) {
                return Err(LangError::ParserError {
                    span,
                    message: format!("Duplicate parameter '{}'", param_name),
                });
            }
            let default = if self.consume(&Token::Eq) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            if default.is_none() && params.iter().any(|p| p.default.is_some()) {
                return Err(LangError::ParserError {
                    span,
                    message: format!(
                        "Parameter '{}' without default follows a parameter with one",
                        param_name
                    ),
                });
            }
            params.push(Param {
                name: param_name,
                default,
                span,
            });
            if !self.consume(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen)?;

        let mut body = self.parse_block()?;
        let doc = match body.stmts.first() {
            Some(Stmt::Expr(Expr {
                kind: ExprKind::Literal(Literal::String(doc)),
                ..
            })) if body.stmts.len() > 1 => Some(doc.clone()),
            _ => None,
        };
        if doc.is_some() {
            body.stmts.remove(0);
        }

        let span = start.to(body.span);
        Ok(FnDef {
            name,
            params,
            body,
            doc,
            span,
        })
    }

    fn parse_block(&mut self) -> Result<Block> {
        let start = self.expect(Token::LBrace)?.span;
        let mut stmts = Vec::new();
        while !self.check(&Token::RBrace) && !self.is_eof() {
            if self.consume(&Token::Semicolon) {
                continue;
            }
            stmts.push(self.parse_stmt()?);
        }
        let end = self.expect(Token::RBrace)?.span;
        Ok(Block {
            stmts,
            span: start.to(end),
        })
    }

    /// Parse an expression
    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        let span = lhs.span.to(rhs.span);
        Expr::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        )
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.consume(&Token::OrOr) {
            let rhs = self.parse_and()?;
            lhs = Self::binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.consume(&Token::AndAnd) {
            let rhs = self.parse_equality()?;
            lhs = Self::binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.peek().token {
                Token::EqEq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = Self::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek().token {
                Token::Lt => BinaryOp::Lt,
                Token::Le => BinaryOp::Le,
                Token::Gt => BinaryOp::Gt,
                Token::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = Self::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().token {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Self::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().token {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Self::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.peek().token {
            Token::Minus => UnaryOp::Neg,
            Token::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        let start = self.advance().span;
        let operand = self.parse_unary()?;
        let span = start.to(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().token {
                Token::LParen => {
                    self.advance();
                    let args = self.parse_call_args()?;
                    let end = self.expect(Token::RParen)?.span;
                    let span = expr.span.to(end);
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                Token::Dot => {
                    self.advance();
                    let (name, end) = self.expect_identifier()?;
                    let span = expr.span.to(end);
                    expr = Expr::new(
                        ExprKind::Attr {
                            object: Box::new(expr),
                            name,
                        },
                        span,
                    );
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    let end = self.expect(Token::RBracket)?.span;
                    let span = expr.span.to(end);
                    expr = Expr::new(
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<Vec<CallArg>> {
        let mut args: Vec<CallArg> = Vec::new();
        while !self.check(&Token::RParen) && !self.is_eof() {
            let keyword = match (&self.peek().token, &self.peek_nth(1).token) {
                (Token::Identifier(name), Token::Eq) => Some(name.clone()),
                _ => None,
            };
            if keyword.is_some() {
                self.advance();
                self.advance();
            } else if args.iter().any(|a| a.name.is_some()) {
                return Err(LangError::ParserError {
                    span: self.peek().span,
                    message: "Positional argument follows keyword argument".to_string(),
                });
            }
            let value = self.parse_expr()?;
            args.push(CallArg {
                name: keyword,
                value,
            });
            if !self.consume(&Token::Comma) {
                break;
            }
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.peek();
        let literal = match &token.token {
            Token::IntLiteral(i) => Some(Literal::Int(*i)),
            Token::FloatLiteral(f) => Some(Literal::Float(*f)),
            Token::StringLiteral(s) => Some(Literal::String(s.clone())),
            Token::True => Some(Literal::Bool(true)),
            Token::False => Some(Literal::Bool(false)),
            Token::None => Some(Literal::None),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(Expr::new(ExprKind::Literal(literal), token.span));
        }

        match &token.token {
            Token::Identifier(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Ident(name.clone()), token.span))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => self.parse_list(),
            Token::LBrace => self.parse_map(),
            Token::Fn => {
                let def = self.parse_fn(false)?;
                let span = def.span;
                Ok(Expr::new(ExprKind::Fn(Rc::new(def)), span))
            }
            Token::If => self.parse_if(),
            other => Err(LangError::ParserError {
                span: token.span,
                message: format!("Unexpected token {:?}", other),
            }),
        }
    }

    fn parse_list(&mut self) -> Result<Expr> {
        let start = self.expect(Token::LBracket)?.span;
        let mut items = Vec::new();
        while !self.check(&Token::RBracket) && !self.is_eof() {
            items.push(self.parse_expr()?);
            if !self.consume(&Token::Comma) {
                break;
            }
        }
        let end = self.expect(Token::RBracket)?.span;
        Ok(Expr::new(ExprKind::List(items), start.to(end)))
    }

    fn parse_map(&mut self) -> Result<Expr> {
        let start = self.expect(Token::LBrace)?.span;
        let mut entries = Vec::new();
        while !self.check(&Token::RBrace) && !self.is_eof() {
            let token = self.advance();
            let key = match &token.token {
                Token::Identifier(key) | Token::StringLiteral(key) => key.clone(),
                other => {
                    return Err(LangError::ParserError {
                        span: token.span,
                        message: format!("Expected map key, found {:?}", other),
                    });
                }
            };
            self.expect(Token::Colon)?;
            let value = self.parse_expr()?;
            entries.push((key, value));
            if !self.consume(&Token::Comma) {
                break;
            }
        }
        let end = self.expect(Token::RBrace)?.span;
        Ok(Expr::new(ExprKind::Map(entries), start.to(end)))
    }

    fn parse_if(&mut self) -> Result<Expr> {
        let start = self.expect(Token::If)?.span;
        let condition = self.parse_expr()?;
        let then_branch = self.parse_block()?;
        let mut end = then_branch.span;

        let else_branch = if self.consume(&Token::Else) {
            let block = if self.check(&Token::If) {
                let nested = self.parse_if()?;
                let span = nested.span;
                Block {
                    stmts: vec![Stmt::Expr(nested)],
                    span,
                }
            } else {
                self.parse_block()?
            };
            end = block.span;
            Some(block)
        } else {
            None
        };

        Ok(Expr::new(
            ExprKind::If {
                condition: Box::new(condition),
                then_branch,
                else_branch,
            },
            start.to(end),
        ))
    }
}

/// Parse tokens into a program
pub fn parse(tokens: &[SpannedToken]) -> Result<Program> {
    let mut parser = Parser::new(tokens);
    parser.parse()
}
