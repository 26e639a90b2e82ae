//! Unit tests for RV32 code generation

use minicc_core::compiler::codegen::CodeGenerator;
use minicc_core::compiler::ir::builder::lower;
use minicc_core::compiler::optimizer::{OptimizationLevel, Optimizer};
use minicc_core::compiler::parser::parse;

fn emit(source: &str) -> String {
    let unit = parse(source).expect("source should parse");
    let program = lower(&unit).expect("source should lower");
    CodeGenerator::generate(&program).expect("codegen should succeed")
}

fn emit_optimized(source: &str) -> String {
    let unit = parse(source).expect("source should parse");
    let mut program = lower(&unit).expect("source should lower");
    Optimizer::new(OptimizationLevel::Aggressive).optimize(&mut program);
    CodeGenerator::generate(&program).expect("codegen should succeed")
}

/// Extract every frame size from `addi sp, sp, -N` prologue lines.
fn frame_sizes(asm: &str) -> Vec<i32> {
    asm.lines()
        .filter_map(|line| line.trim().strip_prefix("addi sp, sp, -"))
        .filter_map(|n| n.parse::<i32>().ok())
        .collect()
}

#[test]
fn test_identity_return_structure() {
    let asm = emit("int main() { return 0; }");
    assert!(asm.contains("  .text\n"));
    assert!(asm.contains("  .globl main\n"));
    assert!(asm.contains("main:\n"));
    assert!(asm.contains("  ret\n"));
    // Leaf frame: 12 saved registers only, already 16-byte aligned.
    assert!(asm.contains("  addi sp, sp, -48\n"), "asm:\n{}", asm);
    assert!(asm.contains("  addi sp, sp, 48\n"));
}

#[test]
fn test_entry_label_is_elided() {
    let asm = emit("int main() { return 0; }");
    assert!(!asm.contains("\nentry:"), "the entry block has no label:\n{}", asm);
}

#[test]
fn test_frame_sizes_are_16_byte_aligned() {
    let sources = [
        "int main() { return 0; }",
        "int add(int a, int b) { return a + b; } int main() { return add(2, 3); }",
        "int main() { int a = 1; int b = 2; int c = 3; return a + b * c; }",
    ];
    for source in sources {
        for size in frame_sizes(&emit(source)) {
            assert_eq!(size % 16, 0, "frame of {} is aligned", source);
            assert!(size >= 48, "frame holds the callee-saved area");
        }
    }
}

#[test]
fn test_callee_saved_registers_are_saved_and_restored() {
    let asm = emit("int main() { return 0; }");
    for k in 0..12 {
        assert!(
            asm.contains(&format!("  sw s{},", k)),
            "s{} is saved in the prologue:\n{}",
            k,
            asm
        );
        assert!(
            asm.contains(&format!("  lw s{},", k)),
            "s{} is restored in the epilogue:\n{}",
            k,
            asm
        );
    }
}

#[test]
fn test_folded_constant_reaches_a0() {
    // 1 + 2 * 3 - 4 == 3
    let asm = emit_optimized("int main() { return 1 + 2 * 3 - 4; }");
    assert!(asm.contains("  li a0, 3\n"), "asm:\n{}", asm);
}

#[test]
fn test_branching_shape() {
    let asm = emit("int main() { int a = 5; if (a > 3) return 1; else return 0; }");
    assert!(asm.contains("  sgt t2, t0, t1\n"), "a > 3 compiles to sgt:\n{}", asm);
    assert!(asm.contains("  beqz t0, else_0\n"), "false path branches:\n{}", asm);
    assert!(asm.contains("  j then_0\n"));
    assert!(asm.contains("then_0:\n"));
    assert!(asm.contains("else_0:\n"));
}

#[test]
fn test_constant_branch_is_gone_after_optimization() {
    let asm = emit_optimized("int main() { if (1) { return 7; } else { return 9; } }");
    assert!(!asm.contains("beqz"), "no conditional branch remains:\n{}", asm);
    assert!(asm.contains("  j then_0\n"));
    assert!(!asm.contains("else_0:"), "the untaken block is gone:\n{}", asm);
    assert!(asm.contains("  li a0, 7\n"));
}

#[test]
fn test_loop_shape() {
    let asm =
        emit("int main() { int s = 0; int i = 0; while (i < 10) { i = i + 1; if (i == 5) continue; if (i == 8) break; s = s + i; } return s; }");
    assert!(asm.contains("while_entry_0:\n"));
    assert!(asm.contains("while_body_0:\n"));
    assert!(asm.contains("while_end_0:\n"));
    assert!(asm.contains("  j while_entry_0\n"), "back edge and continue:\n{}", asm);
    assert!(asm.contains("  j while_end_0\n"), "break:\n{}", asm);
    assert!(asm.contains("  slt t2, t0, t1\n"), "i < 10:\n{}", asm);
}

#[test]
fn test_call_obeys_the_convention() {
    let asm = emit("int add(int a, int b) { return a + b; } int main() { return add(2, 3); }");
    // Callee preamble.
    assert!(asm.contains("  .globl add\n"));
    assert!(asm.contains("add:\n"));
    // Caller: arguments in a0/a1, then call, then ra reload, then result.
    assert!(asm.contains("  call add\n"));
    assert!(asm.contains("  sw ra,"), "ra is saved by the caller's prologue:\n{}", asm);
    assert!(asm.contains("  lw ra,"), "ra is reloaded after the call:\n{}", asm);
    let call_pos = asm.find("  call add").unwrap();
    let reload_pos = asm.find("  lw ra,").unwrap();
    assert!(reload_pos > call_pos, "ra reload follows the call");
    // The return value comes back out of a0.
    assert!(asm.contains("  mv") || asm.contains("  sw a0,"), "a0 lands somewhere:\n{}", asm);
}

#[test]
fn test_leaf_function_skips_the_ra_slot() {
    let asm = emit("int main() { return 0; }");
    assert!(!asm.contains("ra,"), "a leaf never touches ra:\n{}", asm);
}

#[test]
fn test_inlined_call_site_emits_no_call() {
    let asm = emit_optimized(
        "int add(int a, int b) { return a + b; } int main() { return add(2, 3); }",
    );
    let main_section = asm
        .split("main:")
        .nth(1)
        .expect("main body exists");
    assert!(!main_section.contains("call add"), "call was inlined:\n{}", asm);
}

#[test]
fn test_more_than_eight_arguments_spill_to_the_outgoing_area() {
    let source = "int sum(int a, int b, int c, int d, int e, int f, int g, int h, int i) {\n\
                  return a + i;\n\
                  }\n\
                  int main() { return sum(1, 2, 3, 4, 5, 6, 7, 8, 9); }";
    let asm = emit(source);
    // The ninth argument travels through the caller's outgoing area at 0(sp).
    assert!(asm.contains("  sw t5, 0(sp)\n") || asm.contains(", 0(sp)\n"), "asm:\n{}", asm);
    // The callee frame leaves room for it: outgoing area forces a bigger,
    // still aligned frame in the caller.
    for size in frame_sizes(&asm) {
        assert_eq!(size % 16, 0);
    }
    assert!(asm.contains("  call sum\n"));
}

#[test]
fn test_spills_hit_the_stack_when_the_bank_overflows() {
    // Thirteen simultaneously-live slots exceed s0..s11.
    let source = "int main() {\n\
                  int a1 = 1; int a2 = 2; int a3 = 3; int a4 = 4; int a5 = 5;\n\
                  int a6 = 6; int a7 = 7; int a8 = 8; int a9 = 9; int a10 = 10;\n\
                  int a11 = 11; int a12 = 12; int a13 = 13;\n\
                  return a1 + a2 + a3 + a4 + a5 + a6 + a7 + a8 + a9 + a10 + a11 + a12 + a13;\n\
                  }";
    let asm = emit(source);
    let sizes = frame_sizes(&asm);
    assert_eq!(sizes.len(), 1);
    assert!(
        sizes[0] > 48,
        "the frame grows beyond the save area for spill slots: {}",
        sizes[0]
    );
    assert_eq!(sizes[0] % 16, 0);
}

#[test]
fn test_void_function_returns_without_touching_a0() {
    let asm = emit("void noop() { return; } int main() { noop(); return 0; }");
    let noop_section: &str = asm.split("noop:").nth(1).unwrap().split(".text").next().unwrap();
    assert!(!noop_section.contains("a0"), "void return leaves a0 alone:\n{}", noop_section);
    assert!(noop_section.contains("  ret\n"));
}
