use std::mem;

use crate::ast::{CondOp, MathOp, Node};
use crate::errors::Pl0Error;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// Recursive-descent parser with a single token of lookahead. Owns the lexer
/// and pulls one token at a time; syntax errors are accumulated and only the
/// first one is reported.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    peek: Token,
    errors: Vec<Pl0Error>,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Self {
        let peek = lexer.scan();
        Self {
            lexer,
            peek,
            errors: Vec::new(),
        }
    }

    /// Parses `block "."`. Returns the Program node, or None after printing
    /// the first recorded syntax error.
    pub fn parse(&mut self) -> Option<Node> {
        let block = self.parse_block();
        self.expect(&TokenKind::Dot);
        if let Some(err) = self.errors.first() {
            println!("{}", err);
            return None;
        }
        Some(Node::Program(Box::new(block)))
    }

    fn advance(&mut self) {
        self.peek = self.lexer.scan();
    }

    /// Consumes the lookahead if its tag matches (payloads are ignored) and
    /// reports whether it did.
    fn accept(&mut self, kind: &TokenKind) -> bool {
        if mem::discriminant(&self.peek.kind) == mem::discriminant(kind) {
            self.advance();
            return true;
        }
        false
    }

    /// `accept`, plus minimal recovery on mismatch: record a syntax error at
    /// the offending token and skip past it.
    fn expect(&mut self, kind: &TokenKind) -> bool {
        let matched = self.accept(kind);
        if !matched {
            self.record_error();
            self.advance();
        }
        matched
    }

    fn record_error(&mut self) {
        self.errors.push(Pl0Error::SyntaxError {
            found: self.peek.kind.to_string(),
            line: self.peek.line,
        });
    }

    /// Wraps the lookahead in a Terminal node when it is an identifier or an
    /// integer. Callers expect() the same token right after; on mismatch the
    /// placeholder never outlives the failed parse.
    fn terminal_from_lookahead(&self) -> Node {
        match self.peek.kind {
            TokenKind::Ident(_) | TokenKind::Number(_) => Node::Terminal(self.peek.clone()),
            _ => Node::Terminal(Token::new(TokenKind::Number(0), self.peek.line)),
        }
    }

    /// block = [const] [var] {procedure} statement. Missing optional clauses
    /// still yield empty nodes so Block children sit at fixed positions.
    fn parse_block(&mut self) -> Node {
        let consts = self.parse_const();
        let vars = self.parse_var();
        let procedures = self.parse_procedures();
        let statement = self.parse_statement();
        Node::Block {
            consts: Box::new(consts),
            vars: Box::new(vars),
            procedures: Box::new(procedures),
            statement: Box::new(statement),
            symbols: None,
        }
    }

    fn parse_const(&mut self) -> Node {
        let mut entries = Vec::new();
        if !self.accept(&TokenKind::Const) {
            return Node::Const(entries);
        }
        loop {
            let name = self.terminal_from_lookahead();
            self.expect(&TokenKind::Ident(String::new()));
            self.expect(&TokenKind::Equal);
            let value = self.terminal_from_lookahead();
            self.expect(&TokenKind::Number(0));
            entries.push(Node::Assignment {
                target: Box::new(name),
                expr: Box::new(value),
            });
            if !self.accept(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::Semicolon);
        Node::Const(entries)
    }

    fn parse_var(&mut self) -> Node {
        let mut names = Vec::new();
        if !self.accept(&TokenKind::Var) {
            return Node::Var(names);
        }
        loop {
            let name = self.terminal_from_lookahead();
            self.expect(&TokenKind::Ident(String::new()));
            names.push(name);
            if !self.accept(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::Semicolon);
        Node::Var(names)
    }

    fn parse_procedures(&mut self) -> Node {
        let mut procedures = Vec::new();
        if !self.accept(&TokenKind::Procedure) {
            return Node::ProcedureParent(procedures);
        }
        loop {
            let name = self.terminal_from_lookahead();
            self.expect(&TokenKind::Ident(String::new()));
            self.expect(&TokenKind::Semicolon);
            let block = self.parse_block();
            self.expect(&TokenKind::Semicolon);
            procedures.push(Node::Procedure {
                name: Box::new(name),
                block: Box::new(block),
            });
            if !self.accept(&TokenKind::Procedure) {
                break;
            }
        }
        Node::ProcedureParent(procedures)
    }

    fn parse_statement(&mut self) -> Node {
        if matches!(self.peek.kind, TokenKind::Ident(_)) {
            let target = self.terminal_from_lookahead();
            self.advance();
            self.expect(&TokenKind::Assign);
            let expr = self.parse_expression();
            return Node::Assignment {
                target: Box::new(target),
                expr: Box::new(expr),
            };
        }
        if self.accept(&TokenKind::Call) {
            let name = self.terminal_from_lookahead();
            self.expect(&TokenKind::Ident(String::new()));
            return Node::Call(Box::new(name));
        }
        if self.accept(&TokenKind::Begin) {
            return self.parse_begin();
        }
        if self.accept(&TokenKind::If) {
            let condition = self.parse_condition();
            self.expect(&TokenKind::Then);
            let body = self.parse_statement();
            return Node::IfThen {
                condition: Box::new(condition),
                body: Box::new(body),
            };
        }
        if self.accept(&TokenKind::While) {
            let condition = self.parse_condition();
            self.expect(&TokenKind::Do);
            let body = self.parse_statement();
            return Node::WhileDo {
                condition: Box::new(condition),
                body: Box::new(body),
            };
        }
        if self.accept(&TokenKind::Exclamation) {
            let expr = self.parse_expression();
            return Node::Print(Box::new(expr));
        }
        // A statement is required wherever this is called from.
        self.record_error();
        Node::Begin(Vec::new())
    }

    /// At least one statement; further ones only while the lookahead can
    /// start a statement, each terminated by ';'.
    fn parse_begin(&mut self) -> Node {
        let mut statements = Vec::new();
        loop {
            statements.push(self.parse_statement());
            self.expect(&TokenKind::Semicolon);
            if !self.statement_ahead() {
                break;
            }
        }
        self.expect(&TokenKind::End);
        Node::Begin(statements)
    }

    fn statement_ahead(&self) -> bool {
        matches!(
            self.peek.kind,
            TokenKind::Ident(_)
                | TokenKind::Call
                | TokenKind::Begin
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Exclamation
        )
    }

    fn parse_condition(&mut self) -> Node {
        if self.accept(&TokenKind::Odd) {
            let expr = self.parse_expression();
            return Node::Odd(Box::new(expr));
        }
        let left = self.parse_expression();
        let op = if self.accept(&TokenKind::Equal) {
            CondOp::Equal
        } else if self.accept(&TokenKind::Hash) {
            CondOp::NotEqual
        } else if self.accept(&TokenKind::LessThan) {
            CondOp::LessThan
        } else if self.accept(&TokenKind::GreaterThan) {
            CondOp::GreaterThan
        } else if self.accept(&TokenKind::LessThanEqual) {
            CondOp::LessThanEqual
        } else {
            self.expect(&TokenKind::GreaterThanEqual);
            CondOp::GreaterThanEqual
        };
        let right = self.parse_expression();
        Node::Cond {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Math chains are built left-leaning; a leading '-' becomes `0 - term`
    /// and a leading '+' is dropped.
    fn parse_expression(&mut self) -> Node {
        let mut expr = if self.accept(&TokenKind::Minus) {
            let zero = Node::Terminal(Token::new(TokenKind::Number(0), self.peek.line));
            Node::Math {
                op: MathOp::Minus,
                left: Box::new(zero),
                right: Box::new(self.parse_term()),
            }
        } else {
            self.accept(&TokenKind::Plus);
            self.parse_term()
        };
        loop {
            let op = if self.accept(&TokenKind::Plus) {
                MathOp::Plus
            } else if self.accept(&TokenKind::Minus) {
                MathOp::Minus
            } else {
                break;
            };
            let rhs = self.parse_term();
            expr = Node::Math {
                op,
                left: Box::new(expr),
                right: Box::new(rhs),
            };
        }
        expr
    }

    fn parse_term(&mut self) -> Node {
        let mut term = self.parse_factor();
        loop {
            let op = if self.accept(&TokenKind::Multiply) {
                MathOp::Multiply
            } else if self.accept(&TokenKind::Divide) {
                MathOp::Divide
            } else {
                break;
            };
            let rhs = self.parse_factor();
            term = Node::Math {
                op,
                left: Box::new(term),
                right: Box::new(rhs),
            };
        }
        term
    }

    fn parse_factor(&mut self) -> Node {
        if matches!(self.peek.kind, TokenKind::Ident(_) | TokenKind::Number(_)) {
            let node = Node::Terminal(self.peek.clone());
            self.advance();
            return node;
        }
        if self.accept(&TokenKind::LParen) {
            let expr = self.parse_expression();
            self.expect(&TokenKind::RParen);
            return expr;
        }
        // Nothing that can start a factor; record the error and leave an
        // inert zero so the tree stays total.
        self.record_error();
        Node::Terminal(Token::new(TokenKind::Number(0), self.peek.line))
    }
}
