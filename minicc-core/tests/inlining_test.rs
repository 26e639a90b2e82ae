//! Unit tests for the function inliner

use minicc_core::compiler::ir::builder::lower;
use minicc_core::compiler::ir::instruction::{Program, Value};
use minicc_core::compiler::optimizer::{
    ConstantPropagation, InlineLimits, InlineOptimizer, OptimizationLevel, Optimizer,
};
use minicc_core::compiler::parser::parse;

fn lowered(source: &str) -> Program {
    let unit = parse(source).expect("source should parse");
    lower(&unit).expect("source should lower")
}

fn has_call(program: &Program, func_name: &str, callee: &str) -> bool {
    program
        .get_function(func_name)
        .into_iter()
        .flat_map(|f| f.bbs.iter())
        .flat_map(|bb| bb.insts.iter())
        .any(|inst| matches!(inst, Value::Call { callee: c, .. } if c == callee))
}

#[test]
fn test_small_straightline_callee_is_inlined() {
    let source = "int add(int a, int b) { return a + b; } int main() { return add(2, 3); }";
    let mut program = lowered(source);
    Optimizer::new(OptimizationLevel::Aggressive).optimize(&mut program);

    assert!(
        !has_call(&program, "@main", "@add"),
        "the call site vanishes: {}",
        program
    );
    let text = program.to_string();
    assert!(text.contains("%inline_"), "cloned names are renamed: {}", text);
    assert!(text.contains("%ret_val_"), "return goes through a slot: {}", text);
}

#[test]
fn test_inlined_body_reads_the_call_arguments() {
    let source = "int add(int a, int b) { return a + b; } int main() { return add(2, 3); }";
    let mut program = lowered(source);
    // Constant propagation first turns the arguments into literals.
    ConstantPropagation::optimize(&mut program);
    let mut inliner = InlineOptimizer::new(1, 10);
    inliner.optimize(&mut program);

    let text = program.to_string();
    assert!(
        text.contains("store 2, %inline_") && text.contains("store 3, %inline_"),
        "arguments flow into the cloned parameter slots: {}",
        text
    );
}

#[test]
fn test_inliner_works_without_prior_constprop() {
    let source = "int add(int a, int b) { return a + b; } int main() { return add(2, 3); }";
    let mut program = lowered(source);
    let mut inliner = InlineOptimizer::new(1, 10);
    inliner.optimize(&mut program);
    assert!(!has_call(&program, "@main", "@add"));
}

#[test]
fn test_recursive_callee_is_rejected() {
    let source = "int fact(int n) { if (n < 2) return 1; return n * fact(n - 1); }\n\
                  int main() { return fact(5); }";
    let mut program = lowered(source);
    Optimizer::new(OptimizationLevel::Aggressive).optimize(&mut program);
    assert!(
        has_call(&program, "@main", "@fact"),
        "branching recursive callee stays a call"
    );
    assert!(has_call(&program, "@fact", "@fact"), "self-call survives");
}

#[test]
fn test_oversized_callee_is_rejected() {
    // Nine instructions fit the default budget but not the conservative one.
    let source = "int add3(int a, int b, int c) { return a + b + c; }\n\
                  int main() { return add3(1, 2, 3); }";

    let mut inlined = lowered(source);
    let mut default_inliner = InlineOptimizer::new(1, InlineLimits::DEFAULT.size);
    default_inliner.optimize(&mut inlined);
    assert!(!has_call(&inlined, "@main", "@add3"), "size 9 fits the default limit");

    let mut kept = lowered(source);
    let mut conservative = InlineOptimizer::new(1, InlineLimits::CONSERVATIVE.size);
    conservative.optimize(&mut kept);
    assert!(has_call(&kept, "@main", "@add3"), "size 9 exceeds the conservative limit");
}

#[test]
fn test_arity_mismatch_is_rejected() {
    let source = "int add(int a, int b) { return a + b; } int main() { return add(1); }";
    let mut program = lowered(source);
    let mut inliner = InlineOptimizer::new(1, 10);
    inliner.optimize(&mut program);
    assert!(
        has_call(&program, "@main", "@add"),
        "mismatched arity is left to the call"
    );
}

#[test]
fn test_callee_with_control_flow_is_rejected() {
    let source = "int pick(int c) { if (c) { return 1; } return 0; }\n\
                  int main() { return pick(1); }";
    let mut program = lowered(source);
    let mut inliner = InlineOptimizer::new(1, 100);
    inliner.optimize(&mut program);
    assert!(
        has_call(&program, "@main", "@pick"),
        "callees with branches are not cloned"
    );
}

#[test]
fn test_void_callee_inlines_to_nothing_but_its_body() {
    let source = "void noop() { return; } int main() { noop(); return 0; }";
    let mut program = lowered(source);
    let mut inliner = InlineOptimizer::new(1, 10);
    inliner.optimize(&mut program);
    assert!(!has_call(&program, "@main", "@noop"), "void call vanishes");
    assert!(
        !program.to_string().contains("%ret_val_"),
        "no return slot for a void callee"
    );
}

#[test]
fn test_terminators_survive_inlining() {
    let source = "int add(int a, int b) { return a + b; } int main() { return add(2, 3); }";
    let mut program = lowered(source);
    let mut inliner = InlineOptimizer::new(1, 10);
    inliner.optimize(&mut program);
    for func in &program.funcs {
        for bb in &func.bbs {
            assert!(
                bb.insts.last().map_or(false, Value::is_terminator),
                "block {} still ends in a terminator",
                bb.name
            );
        }
    }
}

#[test]
fn test_running_twice_is_idempotent() {
    let source = "int add(int a, int b) { return a + b; }\n\
                  int fact(int n) { if (n < 2) return 1; return n * fact(n - 1); }\n\
                  int main() { return add(2, 3) + fact(4); }";
    let mut once = lowered(source);
    let mut inliner = InlineOptimizer::new(1, 10);
    inliner.optimize(&mut once);

    let mut twice = once.clone();
    let mut second = InlineOptimizer::new(1, 10);
    second.optimize(&mut twice);
    assert_eq!(once, twice, "a second run with the same limits is a no-op");
}
