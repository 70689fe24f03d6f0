use crate::ast::Node;
use crate::errors::Pl0Error;
use crate::parser::Parser;
use crate::symboltable::{SymbolKey, SymbolKind, SymbolTable, SymbolValue};
use crate::token::Token;

/// Semantic analysis: installs one symbol table per block, then validates
/// every identifier use against the stack of visible scopes.
pub struct Analyzer<'a> {
    parser: Parser<'a>,
    errors: Vec<Pl0Error>,
}

impl<'a> Analyzer<'a> {
    pub fn new(parser: Parser<'a>) -> Self {
        Self {
            parser,
            errors: Vec::new(),
        }
    }

    /// Drives the owned parser and runs both passes. Returns the annotated
    /// tree, or None after printing every semantic error found.
    pub fn analyze(&mut self) -> Option<Node> {
        let mut ast = self.parser.parse()?;
        if let Node::Program(block) = &mut ast {
            Self::load_symbol_tables(block);
        }
        self.check_program(&ast);
        if !self.errors.is_empty() {
            for err in &self.errors {
                println!("{}", err);
            }
            return None;
        }
        Some(ast)
    }

    /// First pass. All declarations of a block sit in its header, so each
    /// scope fills in one sweep before recursing into nested procedures.
    fn load_symbol_tables(node: &mut Node) {
        let Node::Block {
            consts,
            vars,
            procedures,
            symbols,
            ..
        } = node
        else {
            return;
        };
        let mut table = SymbolTable::new();
        if let Node::Const(entries) = consts.as_ref() {
            for entry in entries {
                if let Node::Assignment { target, expr } = entry {
                    if let (Some(name), Some(value)) =
                        (target.ident_lexeme(), expr.integer_value())
                    {
                        table.put(
                            SymbolKey::new(SymbolKind::Constant, name),
                            SymbolValue {
                                value,
                                ..Default::default()
                            },
                        );
                    }
                }
            }
        }
        if let Node::Var(names) = vars.as_ref() {
            for (order, name_node) in names.iter().enumerate() {
                if let Some(name) = name_node.ident_lexeme() {
                    table.put(
                        SymbolKey::new(SymbolKind::Integer, name),
                        SymbolValue {
                            order,
                            ..Default::default()
                        },
                    );
                }
            }
        }
        if let Node::ProcedureParent(list) = procedures.as_mut() {
            for procedure in list.iter_mut() {
                if let Node::Procedure { name, block } = procedure {
                    if let Some(name) = name.ident_lexeme() {
                        table.put(
                            SymbolKey::new(SymbolKind::Procedure, name),
                            SymbolValue {
                                num_vars: block.var_count(),
                                ..Default::default()
                            },
                        );
                    }
                    Self::load_symbol_tables(block);
                }
            }
        }
        *symbols = Some(table);
    }

    fn check_program(&mut self, node: &Node) {
        if let Node::Program(block) = node {
            let mut scopes = Vec::new();
            self.check_block(block, &mut scopes);
        }
    }

    fn check_block<'n>(&mut self, node: &'n Node, scopes: &mut Vec<&'n SymbolTable>) {
        let Node::Block {
            vars,
            procedures,
            statement,
            symbols,
            ..
        } = node
        else {
            return;
        };
        let Some(table) = symbols else { return };
        scopes.push(table);
        self.check_vars(vars, scopes);
        self.check_procedures(procedures, scopes);
        self.check_statement(statement, scopes);
        scopes.pop();
    }

    /// A variable that shares its name with a visible constant would be
    /// ambiguous at every use site.
    fn check_vars(&mut self, node: &Node, scopes: &[&SymbolTable]) {
        let Node::Var(names) = node else { return };
        for name_node in names {
            if let Some(token) = name_node.terminal_token() {
                if let Some(name) = name_node.ident_lexeme() {
                    if Self::find_symbol(SymbolKind::Constant, name, scopes) {
                        self.report_collision(name, token);
                    }
                }
            }
        }
    }

    fn check_procedures<'n>(&mut self, node: &'n Node, scopes: &mut Vec<&'n SymbolTable>) {
        let Node::ProcedureParent(list) = node else {
            return;
        };
        for procedure in list {
            if let Node::Procedure { name, block } = procedure {
                if let (Some(token), Some(lexeme)) =
                    (name.terminal_token(), name.ident_lexeme())
                {
                    if !Self::find_symbol(SymbolKind::Procedure, lexeme, scopes) {
                        self.report_undefined(lexeme, token);
                    }
                }
                self.check_block(block, scopes);
            }
        }
    }

    fn check_statement(&mut self, node: &Node, scopes: &[&SymbolTable]) {
        match node {
            Node::Assignment { target, expr } => {
                self.check_expression(expr, scopes);
                if let (Some(token), Some(name)) =
                    (target.terminal_token(), target.ident_lexeme())
                {
                    if !Self::find_symbol(SymbolKind::Integer, name, scopes) {
                        self.report_undefined(name, token);
                    }
                }
            }
            Node::Call(name) => {
                if let (Some(token), Some(lexeme)) =
                    (name.terminal_token(), name.ident_lexeme())
                {
                    if !Self::find_symbol(SymbolKind::Procedure, lexeme, scopes) {
                        self.report_undefined(lexeme, token);
                    }
                }
            }
            Node::Begin(statements) => {
                for statement in statements {
                    self.check_statement(statement, scopes);
                }
            }
            Node::IfThen { condition, body } | Node::WhileDo { condition, body } => {
                self.check_condition(condition, scopes);
                self.check_statement(body, scopes);
            }
            Node::Print(expr) => {
                self.check_expression(expr, scopes);
            }
            _ => {}
        }
    }

    fn check_condition(&mut self, node: &Node, scopes: &[&SymbolTable]) {
        match node {
            Node::Cond { left, right, .. } => {
                self.check_expression(left, scopes);
                self.check_expression(right, scopes);
            }
            Node::Odd(expr) => {
                self.check_expression(expr, scopes);
            }
            _ => {}
        }
    }

    /// Identifiers inside expressions must name either a variable or a
    /// constant; integer leaves need no check.
    fn check_expression(&mut self, node: &Node, scopes: &[&SymbolTable]) {
        match node {
            Node::Terminal(token) => {
                if let Some(name) = node.ident_lexeme() {
                    if !Self::find_symbol(SymbolKind::Integer, name, scopes)
                        && !Self::find_symbol(SymbolKind::Constant, name, scopes)
                    {
                        self.report_undefined(name, token);
                    }
                }
            }
            Node::Math { left, right, .. } => {
                self.check_expression(left, scopes);
                self.check_expression(right, scopes);
            }
            _ => {}
        }
    }

    /// Searches the scope stack from the innermost table outward.
    fn find_symbol(kind: SymbolKind, name: &str, scopes: &[&SymbolTable]) -> bool {
        let key = SymbolKey::new(kind, name);
        scopes.iter().rev().any(|table| table.contains(&key))
    }

    fn report_undefined(&mut self, name: &str, token: &Token) {
        self.errors.push(Pl0Error::UndefinedSymbol {
            name: name.to_string(),
            line: token.line,
        });
    }

    fn report_collision(&mut self, name: &str, token: &Token) {
        self.errors.push(Pl0Error::SymbolAlreadyDefined {
            name: name.to_string(),
            line: token.line,
        });
    }
}
