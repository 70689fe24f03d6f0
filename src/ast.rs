/*
*              pl0mips -- PL/0 to MIPS compiler.
*
* program   = block "." ;
* block     = [ "CONST" ident "=" number { "," ident "=" number } ";" ]
*             [ "VAR" ident { "," ident } ";" ]
*             { "PROCEDURE" ident ";" block ";" } statement ;
* statement = ident ":=" expression
*           | "CALL" ident
*           | "!" expression
*           | "BEGIN" statement { ";" statement } "END"
*           | "IF" condition "THEN" statement
*           | "WHILE" condition "DO" statement ;
* condition = "ODD" expression | expression ( comparator ) expression ;
* expression = [ "+" | "-" ] term { ( "+" | "-" ) term } ;
* term      = factor { ( "*" | "/" ) factor } ;
* factor    = ident | number | "(" expression ")" ;
* comparator = "=" | "#" | "<" | ">" | "<=" | ">=" ;
*/

use crate::symboltable::SymbolTable;
use crate::token::{Token, TokenKind};

/// Comparison operator carried by a condition node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondOp {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
}

/// Arithmetic operator carried by a math node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Plus,
    Minus,
    Multiply,
    Divide,
}

/// One variant per syntactic construct, each carrying exactly the children
/// that construct has. The tree is built by the parser, annotated by the
/// analyzer (symbol tables on blocks), and read-only during code generation.
#[derive(Debug)]
pub enum Node {
    /// The root: exactly one Block child.
    Program(Box<Node>),
    /// Four children at fixed positions. `symbols` is installed by the analyzer.
    Block {
        consts: Box<Node>,
        vars: Box<Node>,
        procedures: Box<Node>,
        statement: Box<Node>,
        symbols: Option<SymbolTable>,
    },
    /// Zero or more Assignment entries, each ident := integer.
    Const(Vec<Node>),
    /// Zero or more Terminal identifiers, in declaration order.
    Var(Vec<Node>),
    /// Zero or more Procedure children, in source order.
    ProcedureParent(Vec<Node>),
    Procedure {
        name: Box<Node>,
        block: Box<Node>,
    },
    Call(Box<Node>),
    Begin(Vec<Node>),
    IfThen {
        condition: Box<Node>,
        body: Box<Node>,
    },
    WhileDo {
        condition: Box<Node>,
        body: Box<Node>,
    },
    Odd(Box<Node>),
    Cond {
        op: CondOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Math {
        op: MathOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// A statement, and also the form of each CONST entry.
    Assignment {
        target: Box<Node>,
        expr: Box<Node>,
    },
    /// Leaf carrying an identifier or integer token.
    Terminal(Token),
    Print(Box<Node>),
}

impl Node {
    /// The token of a Terminal node.
    pub fn terminal_token(&self) -> Option<&Token> {
        match self {
            Node::Terminal(token) => Some(token),
            _ => None,
        }
    }

    /// Lexeme of a Terminal identifier node.
    pub fn ident_lexeme(&self) -> Option<&str> {
        match self.terminal_token() {
            Some(Token {
                kind: TokenKind::Ident(lexeme),
                ..
            }) => Some(lexeme),
            _ => None,
        }
    }

    /// Value of a Terminal integer node.
    pub fn integer_value(&self) -> Option<i64> {
        match self.terminal_token() {
            Some(Token {
                kind: TokenKind::Number(value),
                ..
            }) => Some(*value),
            _ => None,
        }
    }

    /// Number of variables declared directly by this node: the length of a
    /// Var list, or of the Var child when called on a Block.
    pub fn var_count(&self) -> usize {
        match self {
            Node::Var(names) => names.len(),
            Node::Block { vars, .. } => vars.var_count(),
            _ => 0,
        }
    }
}
