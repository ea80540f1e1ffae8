use thiserror::Error;

use crate::ast::*;
use crate::lexer::{Lexer, Token, TokenKind, TokenValue};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Parse error [{line}:{col}]: {msg}")]
    Error {
        msg: String,
        line: usize,
        col: usize,
    },
}

/// Recursive-descent parser with exactly one token of lookahead, pulled
/// lazily from the lexer. Any mismatch aborts the whole parse; there is no
/// recovery.
pub struct Parser {
    lexer: Lexer,
    current: Token,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Self {
        let current = lexer.next_token();
        Parser { lexer, current }
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError::Error {
            msg: msg.into(),
            line: self.current.line,
            col: self.current.col,
        }
    }

    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current, next)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn expect(&mut self, kind: TokenKind, msg: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        if self.check(TokenKind::Error) {
            return Err(self.error(self.current.lexeme.clone()));
        }
        Err(self.error(format!("{}, found {}", msg, self.current.kind)))
    }

    fn expect_ident(&mut self, msg: &str) -> Result<String, ParseError> {
        let tok = self.expect(TokenKind::Ident, msg)?;
        match tok.value {
            TokenValue::Str(s) => Ok(s),
            _ => Ok(tok.lexeme),
        }
    }

    /// Parse the whole program into the top-level block.
    pub fn parse(&mut self) -> Result<Block, ParseError> {
        let mut block = Block::default();
        while !self.check(TokenKind::Eof) {
            block.stmts.push(self.parse_statement()?);
        }
        Ok(block)
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------
    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.current.kind {
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Var => self.parse_var_decl(),
            TokenKind::Func => self.parse_func_decl(),
            TokenKind::Loop => self.parse_loop(),
            TokenKind::If => self.parse_if(),
            TokenKind::Print | TokenKind::Println => self.parse_print(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => self.parse_break(),
            TokenKind::Error => Err(self.error(self.current.lexeme.clone())),
            _ => self.parse_expr_statement(),
        }
    }

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.expect(TokenKind::LBrace, "Expected '{' to start block")?;
        let mut block = Block::default();

        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            block.stmts.push(self.parse_statement()?);
        }

        self.expect(TokenKind::RBrace, "Expected '}' to end block")?;
        Ok(block)
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Var, "Expected 'var' keyword")?;
        let name = self.expect_ident("Expected variable name")?;

        // `var x[]` declares an array; without an initializer it defaults to
        // an empty array literal.
        let mut is_array = false;
        if self.matches(TokenKind::LBracket) {
            self.expect(TokenKind::RBracket, "Expected ']' after '['")?;
            is_array = true;
        }

        let init = if self.matches(TokenKind::Assign) {
            Some(self.parse_expression()?)
        } else if is_array {
            Some(Expr::Array(Vec::new()))
        } else {
            None
        };

        self.expect(
            TokenKind::Semicolon,
            "Expected ';' after variable declaration",
        )?;
        Ok(Stmt::VarDecl { name, init })
    }

    fn parse_func_decl(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Func, "Expected 'func' keyword")?;
        let name = self.expect_ident("Expected function name")?;

        self.expect(TokenKind::LParen, "Expected '(' after function name")?;
        let params = self.parse_parameters()?;
        self.expect(TokenKind::RParen, "Expected ')' after parameters")?;

        let body = if self.check(TokenKind::LBrace) {
            self.parse_block()?
        } else {
            self.expect(
                TokenKind::Semicolon,
                "Expected ';' or block after function declaration",
            )?;
            Block::default()
        };

        Ok(Stmt::FuncDecl { name, params, body })
    }

    fn parse_parameters(&mut self) -> Result<Vec<String>, ParseError> {
        let mut params = Vec::new();

        if !self.check(TokenKind::RParen) {
            loop {
                params.push(self.expect_ident("Expected parameter name")?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }

        Ok(params)
    }

    /// A `loop` with no parenthesised head is an infinite loop. A head holds
    /// an optional init (`var` declaration or a bare `;`), an optional
    /// condition and an optional increment; a head that starts with an
    /// expression is a condition-only loop.
    fn parse_loop(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Loop, "Expected 'loop' keyword")?;

        let mut init = None;
        let mut condition = None;
        let mut increment = None;

        if self.matches(TokenKind::LParen) {
            if !self.check(TokenKind::RParen) {
                if self.check(TokenKind::Var) || self.check(TokenKind::Semicolon) {
                    if self.check(TokenKind::Var) {
                        // The var declaration consumes its own ';'.
                        init = Some(Box::new(self.parse_var_decl()?));
                    } else {
                        self.advance();
                    }

                    if !self.check(TokenKind::Semicolon) && !self.check(TokenKind::RParen) {
                        condition = Some(self.parse_expression()?);
                    }

                    if self.matches(TokenKind::Semicolon) && !self.check(TokenKind::RParen) {
                        increment = Some(self.parse_expression()?);
                    }
                } else {
                    condition = Some(self.parse_expression()?);
                }
            }

            self.expect(TokenKind::RParen, "Expected ')' after loop head")?;
        }

        let body = self.parse_block()?;
        Ok(Stmt::Loop {
            init,
            condition,
            increment,
            body,
        })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::If, "Expected 'if' keyword")?;
        self.expect(TokenKind::LParen, "Expected '(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen, "Expected ')' after condition")?;

        let then_branch = self.parse_block()?;

        // `else if` nests the inner if inside a synthetic one-statement block.
        let else_branch = if self.matches(TokenKind::Else) {
            if self.check(TokenKind::If) {
                Some(Block {
                    stmts: vec![self.parse_if()?],
                })
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// `print`/`println` come in two shapes: a string form (leading string
    /// literal with `+` concatenations folded left, trailing `;` required for
    /// `print` and optional for `println`) and a parenthesised argument list
    /// that always ends with `;`.
    fn parse_print(&mut self) -> Result<Stmt, ParseError> {
        let newline = self.check(TokenKind::Println);
        self.advance();

        if self.check(TokenKind::Str) {
            let tok = self.advance();
            let text = match tok.value {
                TokenValue::Str(s) => s,
                _ => tok.lexeme,
            };
            let mut expr = Expr::Literal(Literal::Str(text));

            while self.matches(TokenKind::Plus) {
                expr = Expr::Binary {
                    op: BinOp::Add,
                    left: Box::new(expr),
                    right: Box::new(self.parse_expression()?),
                };
            }

            if newline {
                self.matches(TokenKind::Semicolon);
            } else {
                self.expect(TokenKind::Semicolon, "Expected ';' after print statement")?;
            }

            return Ok(Stmt::Print {
                newline,
                direct: None,
                args: vec![expr],
            });
        }

        self.expect(TokenKind::LParen, "Expected '(' or string after print")?;
        let args = if self.check(TokenKind::RParen) {
            Vec::new()
        } else {
            self.parse_expression_list()?
        };
        self.expect(TokenKind::RParen, "Expected ')' after print arguments")?;
        self.expect(TokenKind::Semicolon, "Expected ';' after print statement")?;

        Ok(Stmt::Print {
            newline,
            direct: None,
            args,
        })
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Return, "Expected 'return' keyword")?;

        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        self.expect(TokenKind::Semicolon, "Expected ';' after return statement")?;
        Ok(Stmt::Return(value))
    }

    fn parse_break(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Break, "Expected 'break' keyword")?;
        self.expect(TokenKind::Semicolon, "Expected ';' after 'break'")?;
        Ok(Stmt::Break)
    }

    fn parse_expr_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.parse_expression()?;
        self.expect(TokenKind::Semicolon, "Expected ';' after expression")?;
        Ok(Stmt::Expr(expr))
    }

    // -------------------------------------------------------------------------
    // Expressions, precedence encoded by the recursion order
    // -------------------------------------------------------------------------
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_logical_or()?;

        // Right-associative: recurse instead of looping.
        if self.matches(TokenKind::Assign) {
            let right = self.parse_assignment()?;
            return Ok(Expr::Binary {
                op: BinOp::Assign,
                left: Box::new(expr),
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_logical_and()?;

        while self.matches(TokenKind::Or) {
            let right = self.parse_logical_and()?;
            expr = Expr::Binary {
                op: BinOp::Or,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_equality()?;

        while self.matches(TokenKind::And) {
            let right = self.parse_equality()?;
            expr = Expr::Binary {
                op: BinOp::And,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_comparison()?;

        loop {
            let op = match self.current.kind {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::Neq => BinOp::Neq,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_term()?;

        loop {
            let op = match self.current.kind {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Lte => BinOp::Lte,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Gte => BinOp::Gte,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_factor()?;

        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_unary()?;

        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.current.kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_primary(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.current.kind {
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }
            TokenKind::Number => {
                let tok = self.advance();
                let n = match tok.value {
                    TokenValue::Num(n) => n,
                    _ => 0.0,
                };
                Ok(Expr::Literal(Literal::Num(n)))
            }
            TokenKind::Str => {
                let tok = self.advance();
                let s = match tok.value {
                    TokenValue::Str(s) => s,
                    _ => tok.lexeme,
                };
                Ok(Expr::Literal(Literal::Str(s)))
            }
            TokenKind::Ident => {
                let name = self.expect_ident("Expected identifier")?;
                self.parse_postfix(Expr::Ident(name))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "Expected ')' after expression")?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                self.advance();
                self.parse_array_literal()
            }
            TokenKind::Error => Err(self.error(self.current.lexeme.clone())),
            _ => Err(self.error(format!("Expected expression, found {}", self.current.kind))),
        }
    }

    /// Postfix chain after a primary: calls, indexing and property access
    /// compose in source order to arbitrary depth (`a[0].b`, `a.b[0]`,
    /// `f(x)[1].length`).
    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, ParseError> {
        loop {
            if self.matches(TokenKind::LParen) {
                let args = if self.check(TokenKind::RParen) {
                    Vec::new()
                } else {
                    self.parse_expression_list()?
                };
                self.expect(TokenKind::RParen, "Expected ')' after arguments")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else if self.matches(TokenKind::LBracket) {
                let index = self.parse_expression()?;
                self.expect(TokenKind::RBracket, "Expected ']' after array index")?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.matches(TokenKind::Dot) {
                let name = self.expect_ident("Expected property name after '.'")?;
                expr = Expr::Property {
                    target: Box::new(expr),
                    name,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ParseError> {
        let mut elements = Vec::new();

        if self.matches(TokenKind::RBracket) {
            return Ok(Expr::Array(elements));
        }

        loop {
            elements.push(self.parse_expression()?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }

        self.expect(TokenKind::RBracket, "Expected ']' after array elements")?;
        Ok(Expr::Array(elements))
    }

    fn parse_expression_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = vec![self.parse_expression()?];
        while self.matches(TokenKind::Comma) {
            args.push(self.parse_expression()?);
        }
        Ok(args)
    }
}
