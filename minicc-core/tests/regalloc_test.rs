//! Unit tests for the linear-scan register allocator

use minicc_core::compiler::analysis::liveness::{LiveInterval, LivenessAnalysis};
use minicc_core::compiler::codegen::regalloc::{RegisterAllocator, REGISTER_BANK};

fn interval(name: &str, start: usize, end: usize) -> LiveInterval {
    LiveInterval {
        var_name: name.to_string(),
        start,
        end,
    }
}

fn analysis_with(intervals: Vec<LiveInterval>) -> LivenessAnalysis {
    LivenessAnalysis {
        live_intervals: intervals,
        ..Default::default()
    }
}

#[test]
fn test_disjoint_intervals_reuse_the_first_register() {
    let liveness = analysis_with(vec![
        interval("a", 0, 1),
        interval("b", 2, 3),
        interval("c", 4, 5),
    ]);
    let allocation = RegisterAllocator::allocate(&liveness);

    assert_eq!(allocation.max_spill_slots, 0);
    for name in ["a", "b", "c"] {
        assert_eq!(
            allocation.var_to_reg.get(name).map(String::as_str),
            Some("s0"),
            "expired registers are reused lowest-first"
        );
    }
}

#[test]
fn test_overlapping_intervals_get_distinct_registers() {
    let liveness = analysis_with((0..12).map(|i| interval(&format!("v{}", i), i, 40)).collect());
    let allocation = RegisterAllocator::allocate(&liveness);

    assert_eq!(allocation.max_spill_slots, 0, "twelve values fit the bank");
    let mut seen: Vec<&String> = allocation.var_to_reg.values().collect();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), 12, "no register is handed out twice");
}

#[test]
fn test_thirteenth_overlapping_value_spills() {
    let liveness =
        analysis_with((0..13).map(|i| interval(&format!("v{}", i), i, 40)).collect());
    let allocation = RegisterAllocator::allocate(&liveness);

    assert_eq!(allocation.max_spill_slots, 1);
    assert_eq!(allocation.spilled_vars.len(), 1);
    assert_eq!(allocation.var_to_reg.len(), 12);
}

#[test]
fn test_spill_prefers_the_interval_ending_last() {
    // Twelve long-lived values occupy the bank; a shorter value arrives.
    let mut intervals: Vec<LiveInterval> =
        (0..12).map(|i| interval(&format!("long{}", i), 0, 100)).collect();
    intervals.push(interval("short", 12, 20));
    let allocation = RegisterAllocator::allocate(&analysis_with(intervals));

    // The short interval wins a register; one long interval moves to a slot.
    assert!(
        allocation.var_to_reg.contains_key("short"),
        "the interval ending first keeps a register"
    );
    assert_eq!(allocation.spilled_vars.len(), 1);
    assert!(
        allocation.spilled_vars[0].starts_with("long"),
        "a long interval is demoted: {:?}",
        allocation.spilled_vars
    );
    assert_eq!(allocation.var_to_spill_slot[&allocation.spilled_vars[0]], 0);
}

#[test]
fn test_current_interval_spills_when_it_ends_last() {
    let mut intervals: Vec<LiveInterval> =
        (0..12).map(|i| interval(&format!("short{}", i), 0, 50)).collect();
    intervals.push(interval("long", 10, 99));
    let allocation = RegisterAllocator::allocate(&analysis_with(intervals));

    assert!(
        allocation.var_to_spill_slot.contains_key("long"),
        "the latest-ending interval spills itself"
    );
    assert!(!allocation.var_to_reg.contains_key("long"));
    assert_eq!(allocation.max_spill_slots, 1);
}

#[test]
fn test_no_overlapping_intervals_share_a_register() {
    // A mixed workload: staggered lifetimes, some disjoint, some nested.
    let intervals: Vec<LiveInterval> = (0..30)
        .map(|i| interval(&format!("v{}", i), i, i + (i % 7) * 5))
        .collect();
    let allocation = RegisterAllocator::allocate(&analysis_with(intervals.clone()));

    for a in &intervals {
        for b in &intervals {
            if a.var_name == b.var_name || !a.overlaps(b) {
                continue;
            }
            if let (Some(ra), Some(rb)) = (
                allocation.var_to_reg.get(&a.var_name),
                allocation.var_to_reg.get(&b.var_name),
            ) {
                assert_ne!(
                    ra, rb,
                    "{} [{}, {}] and {} [{}, {}] overlap but share {}",
                    a.var_name, a.start, a.end, b.var_name, b.start, b.end, ra
                );
            }
        }
    }

    // Every value lands somewhere, exactly once.
    for iv in &intervals {
        let in_reg = allocation.var_to_reg.contains_key(&iv.var_name);
        let in_slot = allocation.var_to_spill_slot.contains_key(&iv.var_name);
        assert!(in_reg ^ in_slot, "{} has exactly one home", iv.var_name);
    }
}

#[test]
fn test_register_bank_is_the_callee_saved_set() {
    assert_eq!(REGISTER_BANK.len(), 12);
    assert_eq!(REGISTER_BANK[0], "s0");
    assert_eq!(REGISTER_BANK[11], "s11");
}
