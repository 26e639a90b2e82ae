//! Unit tests for live variable analysis

use minicc_core::compiler::analysis::control_flow::ControlFlowGraph;
use minicc_core::compiler::analysis::liveness::{LivenessAnalyzer, LiveInterval};
use minicc_core::compiler::ir::builder::lower;
use minicc_core::compiler::ir::instruction::Function;
use minicc_core::compiler::parser::parse;

fn lowered_main(source: &str) -> Function {
    let unit = parse(source).expect("source should parse");
    let program = lower(&unit).expect("source should lower");
    program.funcs.into_iter().next().expect("one function")
}

const LOOP_SOURCE: &str =
    "int main() { int i = 0; while (i < 10) { i = i + 1; } return i; }";

#[test]
fn test_cfg_successors_of_a_loop() {
    let func = lowered_main(LOOP_SOURCE);
    let cfg = ControlFlowGraph::build(&func);

    assert_eq!(cfg.succs("%entry"), ["%while_entry_0"]);
    assert_eq!(
        cfg.succs("%while_entry_0"),
        ["%while_body_0", "%while_end_0"]
    );
    assert_eq!(cfg.succs("%while_body_0"), ["%while_entry_0"]);

    let mut entry_preds: Vec<&str> = cfg
        .preds("%while_entry_0")
        .iter()
        .map(|s| s.as_str())
        .collect();
    entry_preds.sort_unstable();
    assert_eq!(entry_preds, ["%entry", "%while_body_0"]);
}

#[test]
fn test_def_use_sets() {
    let func = lowered_main(LOOP_SOURCE);
    let analysis = LivenessAnalyzer::analyze(&func);

    // The loop condition reads the slot before any definition in its block.
    assert!(analysis.uses["%while_entry_0"].contains("@SYM_TABLE_1_i"));
    // The entry block defines the slot and its initializer temporary.
    assert!(analysis.def["%entry"].contains("@SYM_TABLE_1_i"));
    assert!(analysis.def["%entry"].contains("%0"));
    // Everything the entry reads it first defines, so no upward-exposed uses.
    assert!(analysis.uses["%entry"].is_empty());
}

#[test]
fn test_live_in_out_around_the_back_edge() {
    let func = lowered_main(LOOP_SOURCE);
    let analysis = LivenessAnalyzer::analyze(&func);

    assert!(
        analysis.live_in["%while_entry_0"].contains("@SYM_TABLE_1_i"),
        "the loop variable is live into the condition block"
    );
    assert!(
        analysis.live_out["%entry"].contains("@SYM_TABLE_1_i"),
        "and live out of the block that initializes it"
    );
    assert!(
        analysis.live_out["%while_body_0"].contains("@SYM_TABLE_1_i"),
        "and live around the back edge"
    );
}

#[test]
fn test_live_interval_spans_the_loop() {
    let func = lowered_main(LOOP_SOURCE);
    let analysis = LivenessAnalyzer::analyze(&func);

    let interval = analysis
        .live_intervals
        .iter()
        .find(|iv| iv.var_name == "@SYM_TABLE_1_i")
        .expect("the slot has an interval");
    // Global indices: the alloc is the second entry instruction; the slot
    // stays live through the loop body's closing jump.
    assert_eq!(interval.start, 1);
    assert!(interval.end >= 10, "interval covers the loop: {:?}", interval);
}

#[test]
fn test_intervals_are_sorted_and_dead_defs_collapse() {
    let func = lowered_main("int main() { int unused = 1; return 0; }");
    let analysis = LivenessAnalyzer::analyze(&func);

    let starts: Vec<usize> = analysis.live_intervals.iter().map(|iv| iv.start).collect();
    let mut sorted = starts.clone();
    sorted.sort_unstable();
    assert_eq!(starts, sorted, "intervals come in start order");

    // The unused slot is written once and never read again: its interval
    // ends right at the store.
    let slot = analysis
        .live_intervals
        .iter()
        .find(|iv| iv.var_name == "@SYM_TABLE_1_unused")
        .expect("slot interval exists");
    assert!(slot.end <= slot.start + 1, "dead slot has a degenerate interval");
}

#[test]
fn test_parameters_get_no_intervals() {
    let func = lowered_main("int add(int a, int b) { return a + b; }");
    let analysis = LivenessAnalyzer::analyze(&func);
    assert!(
        analysis
            .live_intervals
            .iter()
            .all(|iv| iv.var_name != "%a" && iv.var_name != "%b"),
        "formal parameters are pinned by the backend, not allocated"
    );
}

#[test]
fn test_interval_overlap_predicate() {
    let a = LiveInterval {
        var_name: "a".to_string(),
        start: 0,
        end: 4,
    };
    let b = LiveInterval {
        var_name: "b".to_string(),
        start: 4,
        end: 9,
    };
    let c = LiveInterval {
        var_name: "c".to_string(),
        start: 5,
        end: 6,
    };
    assert!(a.overlaps(&b), "touching endpoints overlap");
    assert!(!a.overlaps(&c));
    assert!(b.overlaps(&c));
}
