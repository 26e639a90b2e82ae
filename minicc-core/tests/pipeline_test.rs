//! Integration tests for the whole pipeline

use minicc_core::compiler::optimizer::InlineLimits;
use minicc_core::compiler::pipeline::{CompilerPipeline, OutputKind, PipelineOptions};

fn run(source: &str, kind: OutputKind) -> (String, minicc_core::compiler::pipeline::PipelineStats)
{
    CompilerPipeline::run(source, kind, &PipelineOptions::default()).expect("pipeline succeeds")
}

#[test]
fn test_ast_mode() {
    let (out, _) = run("int main() { return 0; }", OutputKind::Ast);
    assert!(out.starts_with("CompUnitAST {"));
    assert!(out.contains("FuncDefAST {"));
}

#[test]
fn test_ir_mode() {
    let (out, stats) = run("int main() { return 0; }", OutputKind::Ir);
    assert!(out.contains("fun @main(): i32 {"));
    assert!(out.contains("%entry:"));
    assert_eq!(stats.functions, 1);
    assert!(!stats.optimized);
}

#[test]
fn test_optimized_ir_mode_shrinks_the_program() {
    let source = "int main() { return 1 + 2 * 3 - 4; }";
    let (_, plain) = run(source, OutputKind::Ir);
    let (out, optimized) = run(source, OutputKind::OptimizedIr);
    assert!(optimized.optimized);
    assert!(
        optimized.instructions < plain.instructions,
        "folding removed instructions: {} -> {}",
        plain.instructions,
        optimized.instructions
    );
    assert!(out.contains("ret 3"));
}

#[test]
fn test_asm_modes() {
    let source = "int main() { int a = 5; if (a > 3) return 1; else return 0; }";
    let (asm, _) = run(source, OutputKind::Asm);
    assert!(asm.contains("  .globl main"));
    assert!(asm.contains("beqz"));

    let source = "int main() { if (1) { return 7; } else { return 9; } }";
    let (asm, _) = run(source, OutputKind::OptimizedAsm);
    assert!(!asm.contains("beqz"));
    assert!(asm.contains("  li a0, 7"));
}

#[test]
fn test_loop_scenario_compiles_in_every_mode() {
    let source = "int main() { int s = 0; int i = 0;\n\
                  while (i < 10) { i = i + 1; if (i == 5) continue; if (i == 8) break; s = s + i; }\n\
                  return s; }";
    for kind in [
        OutputKind::Ast,
        OutputKind::Ir,
        OutputKind::OptimizedIr,
        OutputKind::Asm,
        OutputKind::OptimizedAsm,
    ] {
        let (out, _) = run(source, kind);
        assert!(!out.is_empty());
    }
}

#[test]
fn test_two_frame_call_scenario() {
    let source = "int add(int a, int b) { return a + b; } int main() { return add(2, 3); }";
    let (asm, _) = run(source, OutputKind::Asm);
    assert!(asm.contains("  call add"));

    let (ir, _) = run(source, OutputKind::OptimizedIr);
    let main_section = ir.split("fun @main").nth(1).expect("main exists");
    assert!(
        !main_section.contains("call @add"),
        "default limits inline the call: {}",
        ir
    );
}

#[test]
fn test_conservative_inline_limits() {
    let source = "int add3(int a, int b, int c) { return a + b + c; }\n\
                  int main() { return add3(1, 2, 3); }";
    let conservative = PipelineOptions {
        inline_limits: InlineLimits::CONSERVATIVE,
        ..Default::default()
    };
    let (ir, _) =
        CompilerPipeline::run(source, OutputKind::OptimizedIr, &conservative).unwrap();
    let main_section = ir.split("fun @main").nth(1).expect("main exists");
    assert!(
        main_section.contains("call @add3"),
        "nine instructions exceed the conservative budget: {}",
        ir
    );
}

#[test]
fn test_short_circuit_option() {
    let source = "int main() { int a = 0; int b = 1; return a && b; }";
    let options = PipelineOptions {
        short_circuit: true,
        ..Default::default()
    };
    let (ir, _) = CompilerPipeline::run(source, OutputKind::Ir, &options).unwrap();
    assert!(ir.contains("%sc_end_0:"), "short-circuit lowering kicks in: {}", ir);
}

#[test]
fn test_errors_propagate() {
    assert!(CompilerPipeline::run(
        "int main( { return 0; }",
        OutputKind::Asm,
        &PipelineOptions::default()
    )
    .is_err());

    assert!(CompilerPipeline::run(
        "int main() { return missing; }",
        OutputKind::Asm,
        &PipelineOptions::default()
    )
    .is_err());
}

#[test]
fn test_stats_serialize_to_json() {
    let (_, stats) = run("int main() { return 0; }", OutputKind::Ir);
    let json = serde_json::to_string(&stats).expect("stats serialize");
    assert!(json.contains("\"functions\":1"));
}
