//! Linear-Scan Register Allocation
//!
//! Poletto–Sarkar linear scan over the live intervals produced by liveness
//! analysis. The register bank is the RV32 callee-saved set `s0..s11`, so
//! allocated values survive calls without caller-side spills.
//!
//! # Algorithm
//! Intervals are visited in start order. At each interval:
//! 1. Expire every active interval ending before the current start, returning
//!    its register to the free set.
//! 2. If a register is free, assign the lowest-numbered one and insert the
//!    interval into the active list (kept ordered by end position).
//! 3. Otherwise spill: the active interval with the greatest end either
//!    donates its register to the current interval and moves to a stack slot
//!    (when it ends later), or the current interval takes the next stack slot
//!    itself.
//!
//! Stack slots are numbered from zero; the emitter places slot `i` at
//! `spill_base + 4 * i` in the frame.

use crate::compiler::analysis::liveness::{LiveInterval, LivenessAnalysis};
use std::collections::BTreeSet;
use std::collections::HashMap;

/// The allocatable register bank: RV32 callee-saved registers.
pub const REGISTER_BANK: [&str; 12] = [
    "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11",
];

/// Result of register allocation for one function.
#[derive(Debug, Clone, Default)]
pub struct RegisterAllocation {
    /// Value name -> assigned register name.
    pub var_to_reg: HashMap<String, String>,
    /// Value name -> spill slot number (0-based).
    pub var_to_spill_slot: HashMap<String, usize>,
    /// Spilled value names, in spill order.
    pub spilled_vars: Vec<String>,
    /// Number of stack slots the spills need.
    pub max_spill_slots: usize,
}

/// Linear-scan register allocator.
pub struct RegisterAllocator;

impl RegisterAllocator {
    /// Allocate registers for the intervals in `liveness`.
    pub fn allocate(liveness: &LivenessAnalysis) -> RegisterAllocation {
        let mut allocation = RegisterAllocation::default();
        let intervals: &[LiveInterval] = &liveness.live_intervals;

        // Bank indices keep the choice deterministic: the free set always
        // hands out the lowest-numbered register.
        let mut free_regs: BTreeSet<usize> = (0..REGISTER_BANK.len()).collect();
        // Active intervals (indices into `intervals`), ordered by end.
        let mut active: Vec<usize> = Vec::new();
        let mut assigned_reg: Vec<Option<usize>> = vec![None; intervals.len()];

        for i in 0..intervals.len() {
            Self::expire_old_intervals(
                intervals,
                intervals[i].start,
                &mut active,
                &mut free_regs,
                &assigned_reg,
            );

            if let Some(&reg) = free_regs.iter().next() {
                free_regs.remove(&reg);
                assigned_reg[i] = Some(reg);
                allocation
                    .var_to_reg
                    .insert(intervals[i].var_name.clone(), REGISTER_BANK[reg].to_string());
                active.push(i);
                active.sort_by_key(|&j| intervals[j].end);
            } else {
                Self::spill_at_interval(intervals, i, &mut active, &mut assigned_reg, &mut allocation);
            }
        }

        allocation
    }

    /// Release every active interval that ended before `current_start`.
    fn expire_old_intervals(
        intervals: &[LiveInterval],
        current_start: usize,
        active: &mut Vec<usize>,
        free_regs: &mut BTreeSet<usize>,
        assigned_reg: &[Option<usize>],
    ) {
        active.retain(|&j| {
            if intervals[j].end < current_start {
                if let Some(reg) = assigned_reg[j] {
                    free_regs.insert(reg);
                }
                false
            } else {
                true
            }
        });
    }

    /// Handle the no-free-register case for interval `current`.
    fn spill_at_interval(
        intervals: &[LiveInterval],
        current: usize,
        active: &mut Vec<usize>,
        assigned_reg: &mut [Option<usize>],
        allocation: &mut RegisterAllocation,
    ) {
        // The active list is ordered by end, so the spill candidate with the
        // greatest end is last.
        let candidate = active.last().copied();

        match candidate {
            Some(j) if intervals[j].end > intervals[current].end => {
                // The candidate outlives the current interval: hand its
                // register over and demote the candidate to a stack slot.
                let reg = assigned_reg[j].take();
                assigned_reg[current] = reg;
                if let Some(reg) = reg {
                    allocation.var_to_reg.insert(
                        intervals[current].var_name.clone(),
                        REGISTER_BANK[reg].to_string(),
                    );
                }
                allocation.var_to_reg.remove(&intervals[j].var_name);

                let slot = allocation.max_spill_slots;
                allocation.max_spill_slots += 1;
                allocation
                    .var_to_spill_slot
                    .insert(intervals[j].var_name.clone(), slot);
                allocation.spilled_vars.push(intervals[j].var_name.clone());

                active.pop();
                active.push(current);
                active.sort_by_key(|&k| intervals[k].end);
            }
            _ => {
                // The current interval spills; it never enters the active
                // list.
                let slot = allocation.max_spill_slots;
                allocation.max_spill_slots += 1;
                allocation
                    .var_to_spill_slot
                    .insert(intervals[current].var_name.clone(), slot);
                allocation
                    .spilled_vars
                    .push(intervals[current].var_name.clone());
            }
        }
    }
}
