use pl0mips::analyzer::Analyzer;
use pl0mips::codegen::CodeGenerator;
use pl0mips::lexer::Lexer;
use pl0mips::parser::Parser;

// Helper function to run the whole pipeline and return the assembly text.
fn compile(source: &str) -> String {
    let parser = Parser::new(Lexer::new(source));
    let analyzer = Analyzer::new(parser);
    let mut codegen = CodeGenerator::new(analyzer);
    codegen.generate().expect("code generation should succeed");
    codegen.output().to_string()
}

// A minimal assignment, pinned instruction by instruction: frame setup,
// one zeroed local, push/pop around the store, exit syscall.
#[test]
fn test_golden_simple_assignment() {
    let asm = compile("VAR x; BEGIN x := 3; END.");
    let expected = "\
main:
    move $fp, $sp
    li $a0, 0
    sw $a0, 0($sp)
    subu $sp, $sp, 4
    li $a0, 3
    sw $a0, 0($sp)
    subu $sp, $sp, 4
    addu $sp, $sp, 4
    lw $a0, 0($sp)
    move $t0, $fp
    subu $t0, $t0, 0
    sw $a0, 0($t0)
    li $v0, 10
    syscall
";
    assert_eq!(asm, expected);
}

// One procedure writing an outer variable: the call site builds both links,
// the body chases the static link once, the epilogue drops links plus $ra.
#[test]
fn test_golden_procedure_call() {
    let asm = compile("VAR x; PROCEDURE p; x := 1; BEGIN CALL p; END.");
    let expected = "\
procedure0:
    sw $ra, 0($sp)
    subu $sp, $sp, 4
    j procedure0_body
procedure0_body:
    li $a0, 1
    sw $a0, 0($sp)
    subu $sp, $sp, 4
    addu $sp, $sp, 4
    lw $a0, 0($sp)
    move $t0, $fp
    lw $t0, 4($t0)
    subu $t0, $t0, 0
    sw $a0, 0($t0)
procedure0_done:
    lw $ra, 4($sp)
    addu $sp, $sp, 12
    lw $fp, 0($sp)
    jr $ra
main:
    move $fp, $sp
    li $a0, 0
    sw $a0, 0($sp)
    subu $sp, $sp, 4
    sw $fp, 0($sp)
    subu $sp, $sp, 4
    move $a0, $fp
    sw $a0, 0($sp)
    subu $sp, $sp, 4
    move $fp, $sp
    jal procedure0
    li $v0, 10
    syscall
";
    assert_eq!(asm, expected);
}

#[test]
fn test_golden_print() {
    let asm = compile("! 7.");
    let expected = "\
main:
    move $fp, $sp
    li $a0, 7
    sw $a0, 0($sp)
    subu $sp, $sp, 4
    addu $sp, $sp, 4
    lw $a0, 0($sp)
    li $v0, 1
    syscall
    li $a0, 10
    li $v0, 11
    syscall
    li $v0, 10
    syscall
";
    assert_eq!(asm, expected);
}

#[test]
fn test_static_link_chased_once_per_scope() {
    let asm = compile("VAR x; PROCEDURE outer; PROCEDURE inner; x := 42; CALL inner; CALL outer.");
    // inner writes a variable two scopes up: two static-link loads.
    assert!(
        asm.contains("    move $t0, $fp\n    lw $t0, 4($t0)\n    lw $t0, 4($t0)\n    subu $t0, $t0, 0\n"),
        "inner should chase the static link twice to reach x:\n{}",
        asm
    );
    // Procedures are numbered in layout order, nested after their parent.
    assert!(asm.contains("procedure0:"), "outer should get procedure0");
    assert!(asm.contains("procedure1:"), "inner should get procedure1");
    assert!(
        asm.contains("jal procedure1"),
        "outer's body should call inner"
    );
    // The entry jump skips over the nested definition.
    let entry = asm.find("procedure0:").expect("outer label");
    let jump = asm.find("j procedure0_body").expect("jump over nested");
    let nested = asm.find("procedure1:").expect("inner label");
    let body = asm.find("procedure0_body:").expect("outer body label");
    assert!(entry < jump && jump < nested && nested < body);
}

#[test]
fn test_call_zeroes_locals_and_epilogue_drops_them() {
    let asm = compile("VAR x; PROCEDURE p; VAR a, b; BEGIN a := 1; b := 2; END; BEGIN CALL p; x := 1; END.");
    // Two locals and two link slots: 4*2 + 12 bytes torn down on return.
    assert!(
        asm.contains("addu $sp, $sp, 20"),
        "epilogue should drop locals and links:\n{}",
        asm
    );
    // Locals sit at the frame pointer in declaration order.
    assert!(asm.contains("subu $t0, $t0, 0"), "slot of a");
    assert!(asm.contains("subu $t0, $t0, 4"), "slot of b");
    // The call site zero-initializes both locals after setting $fp.
    let fp = asm.find("move $fp, $sp").expect("frame setup");
    let zeroed = asm[fp..].matches("li $a0, 0").count();
    assert!(zeroed >= 2, "both locals should be zeroed at the call site");
}

#[test]
fn test_condition_operators() {
    let cases: &[(&str, &str)] = &[
        ("=", "beq $t1, $t0, if0"),
        ("#", "bne $t1, $t0, if0"),
        ("<", "sub $t0, $t0, $t1\n    bgtz $t0, if0"),
        (">", "sub $t0, $t1, $t0\n    bgtz $t0, if0"),
        ("<=", "sub $t0, $t0, $t1\n    bgez $t0, if0"),
        (">=", "sub $t0, $t1, $t0\n    bgez $t0, if0"),
    ];
    for (op, expected) in cases {
        let asm = compile(&format!("VAR x; BEGIN IF 1 {} 2 THEN x := 1; END.", op));
        assert!(
            asm.contains(expected),
            "operator {:?} should emit {:?}:\n{}",
            op,
            expected,
            asm
        );
        assert!(asm.contains("j if0_done"), "fall-through jumps to done");
        assert!(asm.contains("if0:"), "true branch label");
        assert!(asm.contains("if0_done:"), "done label");
    }
}

#[test]
fn test_odd_condition() {
    let asm = compile("VAR x; BEGIN IF ODD x THEN x := 1; END.");
    assert!(
        asm.contains("andi $t0, $t0, 1\n    bgtz $t0, if0"),
        "ODD should mask the low bit and branch:\n{}",
        asm
    );
}

#[test]
fn test_while_loop_labels() {
    let asm = compile("VAR x; BEGIN WHILE x < 10 DO x := x + 1; END.");
    assert!(asm.contains("while0:"), "loop head label");
    assert!(asm.contains("bgtz $t0, while0_body"), "condition branches to the body");
    assert!(asm.contains("j done1"), "false path leaves the loop");
    assert!(asm.contains("while0_body:"), "body label");
    assert!(asm.contains("j while0"), "body jumps back to the head");
    assert!(asm.contains("done1:"), "exit label");
}

#[test]
fn test_arithmetic_operators() {
    let asm = compile("VAR x; BEGIN x := 6 * 7; END.");
    assert!(asm.contains("mult $t0, $t1\n    mflo $t0"), "multiplication:\n{}", asm);

    let asm = compile("VAR x; BEGIN x := 7 / 2; END.");
    assert!(asm.contains("div $t1, $t0\n    mflo $t0"), "division is left/right:\n{}", asm);

    let asm = compile("VAR x; BEGIN x := 7 - 2; END.");
    assert!(asm.contains("sub $t0, $t1, $t0"), "subtraction is left-right:\n{}", asm);

    let asm = compile("VAR x; BEGIN x := 7 + 2; END.");
    assert!(asm.contains("add $t0, $t0, $t1"), "addition:\n{}", asm);
}

#[test]
fn test_unary_minus_evaluates_zero_minus_term() {
    let asm = compile("VAR x; BEGIN x := -5; END.");
    assert!(asm.contains("li $a0, 0"), "the synthetic zero operand");
    assert!(asm.contains("li $a0, 5"), "the negated term");
    assert!(asm.contains("sub $t0, $t1, $t0"), "zero minus term");
}

#[test]
fn test_constants_are_inlined() {
    let asm = compile("CONST c = 7; VAR x; BEGIN x := c; END.");
    assert!(asm.contains("li $a0, 7"), "the constant value is an immediate");
    // No frame access is ever emitted for a constant identifier.
    assert!(
        !asm.contains("lw $a0, 0($a0)"),
        "no variable load should appear:\n{}",
        asm
    );
}

#[test]
fn test_shadowed_constant_uses_inner_value() {
    let asm = compile(
        "CONST a = 1; VAR x; PROCEDURE p; CONST a = 3; VAR y; BEGIN y := a; END; \
         BEGIN CALL p; x := a; END.",
    );
    let body_start = asm.find("procedure0_body:").expect("procedure body");
    let body_end = asm.find("procedure0_done:").expect("procedure end");
    let body = &asm[body_start..body_end];
    assert!(body.contains("li $a0, 3"), "inner body inlines the inner constant:\n{}", body);
    let main_start = asm.find("main:").expect("main label");
    assert!(
        asm[main_start..].contains("li $a0, 1"),
        "main inlines the outer constant:\n{}",
        asm
    );
}

// The squaring loop from the end-to-end scenarios: one procedure, a while
// loop in main, labels drawn from the shared counter in layout order.
#[test]
fn test_square_scenario_layout() {
    let asm = compile(
        "VAR x, squ; PROCEDURE square; BEGIN squ := x * x; END; \
         BEGIN x := 1; WHILE x <= 10 DO BEGIN CALL square; x := x + 1; END; END.",
    );
    assert!(asm.contains("procedure0:"), "square gets the first label");
    assert!(asm.contains("jal procedure0"), "the loop calls square");
    assert!(asm.contains("while1:"), "the loop head follows the counter");
    assert!(asm.contains("while1_body:"), "loop body label");
    assert!(asm.contains("done2:"), "loop exit label");
    // squ := x * x inside square: x is one scope up at slot 0, squ at slot 1.
    assert!(asm.contains("lw $a0, 4($a0)"), "reads chase the static link");
    assert!(asm.contains("subu $t0, $t0, 4"), "squ is the second slot");
}

#[test]
fn test_no_output_after_semantic_failure() {
    let parser = Parser::new(Lexer::new("BEGIN x := 3; END."));
    let analyzer = Analyzer::new(parser);
    let mut codegen = CodeGenerator::new(analyzer);
    codegen.generate().expect("failure upstream is not a codegen error");
    assert!(codegen.output().is_empty(), "nothing is emitted for a rejected program");
}

#[test]
fn test_no_output_after_syntax_failure() {
    let parser = Parser::new(Lexer::new("VAR x; BEGIN x := 3; END"));
    let analyzer = Analyzer::new(parser);
    let mut codegen = CodeGenerator::new(analyzer);
    codegen.generate().expect("failure upstream is not a codegen error");
    assert!(codegen.output().is_empty(), "nothing is emitted for a rejected program");
}

// The net $sp change across a full procedure call is zero: every push is
// matched by a pop or covered by the epilogue's bulk adjustment. Only
// main's own locals stay on the stack, since exit ends the process.
#[test]
fn test_stack_adjustments_balance() {
    let asm = compile("VAR x; PROCEDURE p; x := 1; BEGIN CALL p; END.");
    let pushes = asm.matches("subu $sp, $sp, 4").count();
    let pops = asm.matches("addu $sp, $sp, 4\n").count();
    // The 12-byte epilogue adjustment covers three pushes: $ra, static
    // link and dynamic link (the procedure has no locals of its own).
    let bulk = asm.matches("addu $sp, $sp, 12").count();
    let main_locals = 1;
    assert_eq!(
        pushes,
        pops + 3 * bulk + main_locals,
        "frame bytes pushed must equal bytes dropped plus main's frame:\n{}",
        asm
    );
}
