use crate::analyzer::Analyzer;
use crate::ast::{CondOp, MathOp, Node};
use crate::errors::{Pl0Error, Pl0Result};
use crate::symboltable::{SymbolKey, SymbolKind, SymbolTable, SymbolValue};
use crate::token::TokenKind;

/// Emits SPIM-flavored MIPS assembly for an analyzed program into an
/// in-memory buffer. Writing the buffer to a file is the caller's concern,
/// which keeps the generator testable against plain strings.
///
/// Every activation record carries both a dynamic link (the caller's frame
/// pointer, used to restore `$fp` on return) and a static link (the frame of
/// the lexically enclosing procedure, used to reach non-local variables).
/// `4($fp)` names the static-link slot; locals live at `$fp`, `$fp - 4`, ...
/// in declaration order. Expressions evaluate on the operand stack: a push
/// stores at `0($sp)` and decrements, a pop increments and loads.
pub struct CodeGenerator<'a> {
    analyzer: Analyzer<'a>,
    buf: String,
    label_count: usize,
}

/// Walks the scope stack innermost-out. The returned distance counts how
/// many static links separate the current frame from the declaring one.
fn resolve(scopes: &[SymbolTable], key: &SymbolKey) -> Option<(usize, SymbolValue)> {
    for (distance, table) in scopes.iter().rev().enumerate() {
        if let Some(value) = table.get(key) {
            return Some((distance, value.clone()));
        }
    }
    None
}

impl<'a> CodeGenerator<'a> {
    pub fn new(analyzer: Analyzer<'a>) -> Self {
        Self {
            analyzer,
            buf: String::with_capacity(4096),
            label_count: 0,
        }
    }

    /// Drives the owned analyzer and generates the program. If any earlier
    /// stage failed (diagnostics already printed), the buffer stays empty.
    pub fn generate(&mut self) -> Pl0Result<()> {
        let ast = match self.analyzer.analyze() {
            Some(ast) => ast,
            None => return Ok(()),
        };
        self.generate_program(&ast)
    }

    pub fn output(&self) -> &str {
        &self.buf
    }

    /// Procedures are laid out first, then `main` sets up the outermost
    /// frame, zero-initializes the top-level variables, runs the top-level
    /// statement and exits through syscall 10.
    fn generate_program(&mut self, node: &Node) -> Pl0Result<()> {
        let Node::Program(block) = node else {
            return Err(Pl0Error::codegen_error("expected a program node at the root"));
        };
        let Node::Block {
            vars,
            procedures,
            statement,
            symbols,
            ..
        } = block.as_ref()
        else {
            return Err(Pl0Error::codegen_error("program node without a block child"));
        };
        let table = symbols
            .clone()
            .ok_or_else(|| Pl0Error::codegen_error("block is missing its symbol table"))?;
        let mut scopes = vec![table];
        self.assign_procedure_labels(procedures, &mut scopes)?;
        self.generate_procedures(procedures, &mut scopes)?;
        self.emit_label("main");
        self.emit_move("$fp", "$sp");
        for _ in 0..vars.var_count() {
            self.emit_load_int("$a0", 0);
            self.emit_push("$a0");
        }
        self.generate_statement(statement, &scopes)?;
        self.emit_load_int("$v0", 10);
        self.emit_syscall();
        Ok(())
    }

    /// Fixes the label of every procedure declared by a block before any of
    /// their bodies are generated, so a body may call a sibling that is
    /// declared after it.
    fn assign_procedure_labels(
        &mut self,
        node: &Node,
        scopes: &mut [SymbolTable],
    ) -> Pl0Result<()> {
        let Node::ProcedureParent(list) = node else {
            return Ok(());
        };
        for procedure in list {
            let Node::Procedure { name, .. } = procedure else {
                continue;
            };
            let Some(name) = name.ident_lexeme() else {
                continue;
            };
            let label = self.new_label("procedure");
            let key = SymbolKey::new(SymbolKind::Procedure, name);
            let value = scopes
                .last_mut()
                .and_then(|table| table.get_mut(&key))
                .ok_or_else(|| {
                    Pl0Error::codegen_error(format!("procedure '{}' missing from its scope", name))
                })?;
            value.label = label;
        }
        Ok(())
    }

    /// Emits the definition of each procedure and, recursively, its nested
    /// procedures. Stack setup for an invocation happens at the CALL site;
    /// here the body only parks `$ra` and tears the frame down on the way
    /// out. Nested procedures sit between the entry and the body label, with
    /// a jump over them so they never run by fall-through.
    fn generate_procedures(
        &mut self,
        node: &Node,
        scopes: &mut Vec<SymbolTable>,
    ) -> Pl0Result<()> {
        let Node::ProcedureParent(list) = node else {
            return Ok(());
        };
        for procedure in list {
            let Node::Procedure { name, block } = procedure else {
                continue;
            };
            let Node::Block {
                procedures,
                statement,
                symbols,
                ..
            } = block.as_ref()
            else {
                continue;
            };
            let lexeme = name
                .ident_lexeme()
                .ok_or_else(|| Pl0Error::codegen_error("procedure without a name"))?;
            let key = SymbolKey::new(SymbolKind::Procedure, lexeme);
            let value = scopes
                .last()
                .and_then(|table| table.get(&key))
                .cloned()
                .ok_or_else(|| {
                    Pl0Error::codegen_error(format!(
                        "procedure '{}' missing from its scope",
                        lexeme
                    ))
                })?;
            let body_label = format!("{}_body", value.label);
            let done_label = format!("{}_done", value.label);
            self.emit_label(&value.label);
            self.emit_push("$ra");
            self.emit_jump(&body_label);
            let table = symbols
                .clone()
                .ok_or_else(|| Pl0Error::codegen_error("block is missing its symbol table"))?;
            scopes.push(table);
            self.assign_procedure_labels(procedures, scopes)?;
            self.generate_procedures(procedures, scopes)?;
            self.emit_label(&body_label);
            self.generate_statement(statement, scopes)?;
            self.emit_label(&done_label);
            // Unwind: restore $ra, drop the locals and both links, restore
            // the caller's frame pointer.
            self.emit_load_word("$ra", "$sp", 4);
            self.emit_add_unsigned("$sp", "$sp", 4 * value.num_vars + 12);
            self.emit_load_word("$fp", "$sp", 0);
            self.emit_jump_return();
            scopes.pop();
        }
        Ok(())
    }

    fn generate_statement(&mut self, node: &Node, scopes: &[SymbolTable]) -> Pl0Result<()> {
        match node {
            Node::Assignment { target, expr } => {
                let name = target.ident_lexeme().ok_or_else(|| {
                    Pl0Error::codegen_error("assignment without an identifier target")
                })?;
                let key = SymbolKey::new(SymbolKind::Integer, name);
                let (distance, value) = resolve(scopes, &key).ok_or_else(|| {
                    Pl0Error::codegen_error(format!("undefined variable '{}'", name))
                })?;
                self.generate_expression(expr, scopes)?;
                self.emit_pop("$a0");
                self.load_frame_address("$t0", distance, value.order);
                self.emit_store_word("$a0", "$t0", 0);
            }
            Node::Call(name) => {
                let lexeme = name
                    .ident_lexeme()
                    .ok_or_else(|| Pl0Error::codegen_error("call without a target name"))?;
                let key = SymbolKey::new(SymbolKind::Procedure, lexeme);
                let (distance, value) = resolve(scopes, &key).ok_or_else(|| {
                    Pl0Error::codegen_error(format!("undefined procedure '{}'", lexeme))
                })?;
                // Dynamic link.
                self.emit_push("$fp");
                // Static link: chase one level per scope between the caller
                // and the callee's declaration. At distance zero the callee
                // is declared right here and inherits this frame.
                self.emit_move("$a0", "$fp");
                for _ in 0..distance {
                    self.emit_load_word("$a0", "$a0", 4);
                }
                self.emit_push("$a0");
                self.emit_move("$fp", "$sp");
                // One zeroed slot per local, in declaration order.
                for _ in 0..value.num_vars {
                    self.emit_load_int("$a0", 0);
                    self.emit_push("$a0");
                }
                self.emit_jump_and_link(&value.label);
            }
            Node::Begin(statements) => {
                for statement in statements {
                    self.generate_statement(statement, scopes)?;
                }
            }
            Node::IfThen { condition, body } => {
                let label = self.new_label("if");
                let done_label = format!("{}_done", label);
                self.generate_condition(condition, &label, scopes)?;
                self.emit_jump(&done_label);
                self.emit_label(&label);
                self.generate_statement(body, scopes)?;
                self.emit_label(&done_label);
            }
            Node::WhileDo { condition, body } => {
                let head_label = self.new_label("while");
                let body_label = format!("{}_body", head_label);
                let done_label = self.new_label("done");
                self.emit_label(&head_label);
                self.generate_condition(condition, &body_label, scopes)?;
                self.emit_jump(&done_label);
                self.emit_label(&body_label);
                self.generate_statement(body, scopes)?;
                self.emit_jump(&head_label);
                self.emit_label(&done_label);
            }
            Node::Print(expr) => {
                self.generate_expression(expr, scopes)?;
                self.emit_pop("$a0");
                self.emit_load_int("$v0", 1);
                self.emit_syscall();
                // Follow the integer with a newline character.
                self.emit_load_int("$a0", 10);
                self.emit_load_int("$v0", 11);
                self.emit_syscall();
            }
            _ => return Err(Pl0Error::codegen_error("malformed statement node")),
        }
        Ok(())
    }

    /// Branches to `target` when the condition holds and falls through
    /// otherwise. Operands pop right-into-$t0, left-into-$t1; the strict
    /// inequalities reduce to a sign test on the difference.
    fn generate_condition(
        &mut self,
        node: &Node,
        target: &str,
        scopes: &[SymbolTable],
    ) -> Pl0Result<()> {
        match node {
            Node::Odd(expr) => {
                self.generate_expression(expr, scopes)?;
                self.emit_pop("$t0");
                self.emit_and_immediate("$t0", "$t0", 1);
                self.emit_branch_gtz("$t0", target);
            }
            Node::Cond { op, left, right } => {
                self.generate_expression(left, scopes)?;
                self.generate_expression(right, scopes)?;
                self.emit_pop("$t0");
                self.emit_pop("$t1");
                match op {
                    CondOp::Equal => self.emit_branch_eq("$t1", "$t0", target),
                    CondOp::NotEqual => self.emit_branch_ne("$t1", "$t0", target),
                    CondOp::LessThan => {
                        self.emit_sub("$t0", "$t0", "$t1");
                        self.emit_branch_gtz("$t0", target);
                    }
                    CondOp::GreaterThan => {
                        self.emit_sub("$t0", "$t1", "$t0");
                        self.emit_branch_gtz("$t0", target);
                    }
                    CondOp::LessThanEqual => {
                        self.emit_sub("$t0", "$t0", "$t1");
                        self.emit_branch_gez("$t0", target);
                    }
                    CondOp::GreaterThanEqual => {
                        self.emit_sub("$t0", "$t1", "$t0");
                        self.emit_branch_gez("$t0", target);
                    }
                }
            }
            _ => return Err(Pl0Error::codegen_error("malformed condition node")),
        }
        Ok(())
    }

    /// Evaluates an expression and leaves its result on the operand stack.
    fn generate_expression(&mut self, node: &Node, scopes: &[SymbolTable]) -> Pl0Result<()> {
        match node {
            Node::Terminal(token) => match &token.kind {
                TokenKind::Number(value) => {
                    self.emit_load_int("$a0", *value);
                    self.emit_push("$a0");
                }
                TokenKind::Ident(name) => {
                    let key = SymbolKey::new(SymbolKind::Integer, name);
                    if let Some((distance, value)) = resolve(scopes, &key) {
                        self.load_frame_address("$a0", distance, value.order);
                        self.emit_load_word("$a0", "$a0", 0);
                        self.emit_push("$a0");
                    } else {
                        // Not a variable, so analysis proved it a constant;
                        // the value is inlined as an immediate.
                        let key = SymbolKey::new(SymbolKind::Constant, name);
                        let (_, value) = resolve(scopes, &key).ok_or_else(|| {
                            Pl0Error::codegen_error(format!("undefined identifier '{}'", name))
                        })?;
                        self.emit_load_int("$a0", value.value);
                        self.emit_push("$a0");
                    }
                }
                _ => return Err(Pl0Error::codegen_error("malformed terminal node")),
            },
            Node::Math { op, left, right } => {
                self.generate_expression(left, scopes)?;
                self.generate_expression(right, scopes)?;
                self.emit_pop("$t0");
                self.emit_pop("$t1");
                match op {
                    MathOp::Plus => self.emit_add("$t0", "$t0", "$t1"),
                    MathOp::Minus => self.emit_sub("$t0", "$t1", "$t0"),
                    MathOp::Multiply => {
                        self.emit_mult("$t0", "$t1");
                        self.emit_move_from_lo("$t0");
                    }
                    MathOp::Divide => {
                        self.emit_div("$t1", "$t0");
                        self.emit_move_from_lo("$t0");
                    }
                }
                self.emit_push("$t0");
            }
            _ => return Err(Pl0Error::codegen_error("malformed expression node")),
        }
        Ok(())
    }

    /// Loads into `dest` the address of the variable declared `distance`
    /// scopes up at slot `order`: chase the static link once per scope, then
    /// index the slot.
    fn load_frame_address(&mut self, dest: &str, distance: usize, order: usize) {
        self.emit_move(dest, "$fp");
        for _ in 0..distance {
            self.emit_load_word(dest, dest, 4);
        }
        self.emit_sub_unsigned(dest, dest, 4 * order);
    }

    /// Seeds unique labels from one monotonically increasing counter shared
    /// by every label family.
    fn new_label(&mut self, base: &str) -> String {
        let label = format!("{}{}", base, self.label_count);
        self.label_count += 1;
        label
    }

    // Instruction emitters. One instruction per line, indented; labels sit
    // at column zero.

    fn emit(&mut self, instruction: &str) {
        self.buf.push_str("    ");
        self.buf.push_str(instruction);
        self.buf.push('\n');
    }

    fn emit_label(&mut self, label: &str) {
        self.buf.push_str(label);
        self.buf.push_str(":\n");
    }

    /// Push: store at the stack top, then grow downward.
    fn emit_push(&mut self, reg: &str) {
        self.emit_store_word(reg, "$sp", 0);
        self.emit_sub_unsigned("$sp", "$sp", 4);
    }

    /// Pop: shrink, then load what the matching push stored.
    fn emit_pop(&mut self, reg: &str) {
        self.emit_add_unsigned("$sp", "$sp", 4);
        self.emit_load_word(reg, "$sp", 0);
    }

    fn emit_load_int(&mut self, t: &str, imm: i64) {
        self.emit(&format!("li {}, {}", t, imm));
    }

    fn emit_load_word(&mut self, t: &str, s: &str, offset: usize) {
        self.emit(&format!("lw {}, {}({})", t, offset, s));
    }

    fn emit_store_word(&mut self, t: &str, s: &str, offset: usize) {
        self.emit(&format!("sw {}, {}({})", t, offset, s));
    }

    fn emit_move(&mut self, t: &str, s: &str) {
        self.emit(&format!("move {}, {}", t, s));
    }

    fn emit_add(&mut self, d: &str, s: &str, t: &str) {
        self.emit(&format!("add {}, {}, {}", d, s, t));
    }

    fn emit_sub(&mut self, d: &str, s: &str, t: &str) {
        self.emit(&format!("sub {}, {}, {}", d, s, t));
    }

    fn emit_mult(&mut self, s: &str, t: &str) {
        self.emit(&format!("mult {}, {}", s, t));
    }

    fn emit_div(&mut self, s: &str, t: &str) {
        self.emit(&format!("div {}, {}", s, t));
    }

    fn emit_move_from_lo(&mut self, d: &str) {
        self.emit(&format!("mflo {}", d));
    }

    fn emit_add_unsigned(&mut self, d: &str, s: &str, imm: usize) {
        self.emit(&format!("addu {}, {}, {}", d, s, imm));
    }

    fn emit_sub_unsigned(&mut self, d: &str, s: &str, imm: usize) {
        self.emit(&format!("subu {}, {}, {}", d, s, imm));
    }

    fn emit_and_immediate(&mut self, t: &str, s: &str, imm: i64) {
        self.emit(&format!("andi {}, {}, {}", t, s, imm));
    }

    fn emit_branch_eq(&mut self, s: &str, t: &str, label: &str) {
        self.emit(&format!("beq {}, {}, {}", s, t, label));
    }

    fn emit_branch_ne(&mut self, s: &str, t: &str, label: &str) {
        self.emit(&format!("bne {}, {}, {}", s, t, label));
    }

    fn emit_branch_gtz(&mut self, s: &str, label: &str) {
        self.emit(&format!("bgtz {}, {}", s, label));
    }

    fn emit_branch_gez(&mut self, s: &str, label: &str) {
        self.emit(&format!("bgez {}, {}", s, label));
    }

    fn emit_jump(&mut self, label: &str) {
        self.emit(&format!("j {}", label));
    }

    fn emit_jump_and_link(&mut self, label: &str) {
        self.emit(&format!("jal {}", label));
    }

    fn emit_jump_return(&mut self) {
        self.emit("jr $ra");
    }

    fn emit_syscall(&mut self) {
        self.emit("syscall");
    }
}
