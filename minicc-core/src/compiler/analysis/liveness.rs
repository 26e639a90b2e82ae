//! Live Variable Analysis
//!
//! Classical backward dataflow over the control flow graph:
//!
//! - **def/use per block**: a name is in `use` when it is read before any
//!   definition in the block; `def` collects the names the block produces.
//! - **live-in/out**: iterate `LiveOut[B] = ⋃ LiveIn[S]`,
//!   `LiveIn[B] = use[B] ∪ (LiveOut[B] \ def[B])` to a fixed point, visiting
//!   blocks in reverse order for faster convergence.
//! - **per-instruction liveness**: walk each block backward from its
//!   `LiveOut`, recording the live-after set at every instruction index.
//! - **live intervals**: for every name defined inside the function
//!   (formal parameters are excluded; the backend pins them to argument
//!   registers), `start` is the global index of its first definition and
//!   `end` the greatest global index at which it is live. A value that is
//!   live nowhere gets `end = start`.
//!
//! Instruction indices are global across the function, numbering blocks in
//! declaration order.

use crate::compiler::analysis::control_flow::ControlFlowGraph;
use crate::compiler::ir::instruction::{Function, Operand, Value};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

/// Live interval of a single name, in global instruction indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveInterval {
    pub var_name: String,
    /// Index of the first defining instruction.
    pub start: usize,
    /// Greatest index at which the name is live.
    pub end: usize,
}

impl LiveInterval {
    /// Whether two intervals overlap.
    pub fn overlaps(&self, other: &LiveInterval) -> bool {
        !(self.end < other.start || other.end < self.start)
    }
}

/// Results of live variable analysis for one function.
#[derive(Debug, Clone, Default)]
pub struct LivenessAnalysis {
    /// Names defined per block.
    pub def: HashMap<String, HashSet<String>>,
    /// Names used before definition per block.
    pub uses: HashMap<String, HashSet<String>>,
    /// Live names at block entry.
    pub live_in: HashMap<String, HashSet<String>>,
    /// Live names at block exit.
    pub live_out: HashMap<String, HashSet<String>>,
    /// Live-after set per global instruction index.
    pub live_at_instruction: HashMap<usize, HashSet<String>>,
    /// Intervals sorted by start position.
    pub live_intervals: Vec<LiveInterval>,
}

/// Live variable analyzer.
pub struct LivenessAnalyzer;

impl LivenessAnalyzer {
    /// Run the full analysis on `func`.
    pub fn analyze(func: &Function) -> LivenessAnalysis {
        let cfg = ControlFlowGraph::build(func);
        let mut analysis = LivenessAnalysis::default();

        Self::compute_def_use(func, &mut analysis);
        Self::compute_live_in_out(func, &cfg, &mut analysis);
        Self::compute_instruction_liveness(func, &mut analysis);
        Self::compute_live_intervals(func, &mut analysis);

        analysis
    }

    /// Name defined by `inst`, if any.
    ///
    /// Producers are `Alloc`, `Load`, `Binary` and named `Call` instructions.
    pub fn defined_var(inst: &Value) -> Option<&str> {
        inst.def_name()
    }

    /// Names used by `inst`.
    ///
    /// Users are the name-carrying operands: `Load.src`, `Store.value` and
    /// `Store.dest`, `Binary.lhs`/`rhs`, `Branch.cond`, `Return.value` and
    /// every `Call` argument. Literal operands contribute nothing.
    pub fn used_vars(inst: &Value) -> SmallVec<[&str; 4]> {
        let mut used: SmallVec<[&str; 4]> = SmallVec::new();
        match inst {
            Value::Load { src, .. } => Self::push_name(&mut used, src),
            Value::Store { value, dest } => {
                Self::push_name(&mut used, value);
                Self::push_name(&mut used, dest);
            }
            Value::Binary { lhs, rhs, .. } => {
                Self::push_name(&mut used, lhs);
                Self::push_name(&mut used, rhs);
            }
            Value::Branch { cond, .. } => Self::push_name(&mut used, cond),
            Value::Return { value } => {
                if let Some(value) = value {
                    Self::push_name(&mut used, value);
                }
            }
            Value::Call { args, .. } => {
                for arg in args {
                    Self::push_name(&mut used, arg);
                }
            }
            Value::Alloc { .. } | Value::Jump { .. } => {}
        }
        used
    }

    fn push_name<'a>(used: &mut SmallVec<[&'a str; 4]>, operand: &'a Operand) {
        if let Operand::VarRef(name) = operand {
            used.push(name.as_str());
        }
    }

    fn compute_def_use(func: &Function, analysis: &mut LivenessAnalysis) {
        for bb in &func.bbs {
            let mut def: HashSet<String> = HashSet::new();
            let mut uses: HashSet<String> = HashSet::new();

            for inst in &bb.insts {
                // Uses first: only upward-exposed reads count.
                for var in Self::used_vars(inst) {
                    if !def.contains(var) {
                        uses.insert(var.to_string());
                    }
                }
                if let Some(var) = Self::defined_var(inst) {
                    def.insert(var.to_string());
                }
            }

            analysis.def.insert(bb.name.clone(), def);
            analysis.uses.insert(bb.name.clone(), uses);
        }
    }

    fn compute_live_in_out(
        func: &Function,
        cfg: &ControlFlowGraph,
        analysis: &mut LivenessAnalysis,
    ) {
        for bb in &func.bbs {
            analysis.live_in.insert(bb.name.clone(), HashSet::new());
            analysis.live_out.insert(bb.name.clone(), HashSet::new());
        }

        let mut changed = true;
        while changed {
            changed = false;

            for bb in func.bbs.iter().rev() {
                let mut out: HashSet<String> = HashSet::new();
                for succ in cfg.succs(&bb.name) {
                    if let Some(live_in) = analysis.live_in.get(succ) {
                        out.extend(live_in.iter().cloned());
                    }
                }

                let def = &analysis.def[&bb.name];
                let mut live_in: HashSet<String> = analysis.uses[&bb.name].clone();
                for var in &out {
                    if !def.contains(var) {
                        live_in.insert(var.clone());
                    }
                }

                if live_in != analysis.live_in[&bb.name] || out != analysis.live_out[&bb.name] {
                    changed = true;
                    analysis.live_in.insert(bb.name.clone(), live_in);
                    analysis.live_out.insert(bb.name.clone(), out);
                }
            }
        }
    }

    fn compute_instruction_liveness(func: &Function, analysis: &mut LivenessAnalysis) {
        // First global index of each block, numbering in declaration order.
        let mut block_start: usize = 0;
        for bb in &func.bbs {
            let mut live: HashSet<String> = analysis.live_out[&bb.name].clone();
            for (offset, inst) in bb.insts.iter().enumerate().rev() {
                let index = block_start + offset;
                analysis.live_at_instruction.insert(index, live.clone());
                if let Some(var) = Self::defined_var(inst) {
                    live.remove(var);
                }
                for var in Self::used_vars(inst) {
                    live.insert(var.to_string());
                }
            }
            block_start += bb.insts.len();
        }
    }

    fn compute_live_intervals(func: &Function, analysis: &mut LivenessAnalysis) {
        let mut first_def: HashMap<String, usize> = HashMap::new();
        let mut intervals: Vec<LiveInterval> = Vec::new();

        let mut index: usize = 0;
        for bb in &func.bbs {
            for inst in &bb.insts {
                if let Some(var) = Self::defined_var(inst) {
                    if !first_def.contains_key(var) {
                        first_def.insert(var.to_string(), index);
                        intervals.push(LiveInterval {
                            var_name: var.to_string(),
                            start: index,
                            end: index,
                        });
                    }
                }
                index += 1;
            }
        }

        let mut last_live: HashMap<&str, usize> = HashMap::new();
        for (index, live) in &analysis.live_at_instruction {
            for var in live {
                let entry = last_live.entry(var.as_str()).or_insert(*index);
                if *index > *entry {
                    *entry = *index;
                }
            }
        }

        for interval in &mut intervals {
            if let Some(&end) = last_live.get(interval.var_name.as_str()) {
                if end > interval.start {
                    interval.end = end;
                }
            }
        }

        // Pushed in first-definition order, so already ascending by start;
        // the sort keeps the invariant explicit for downstream consumers.
        intervals.sort_by_key(|interval| interval.start);
        analysis.live_intervals = intervals;
    }
}
