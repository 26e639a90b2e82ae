//! Control Flow Analysis
//!
//! Builds the control flow graph of a function from its block terminators.
//!
//! # Successor Rules
//! - `Branch`: two successors, by label
//! - `Jump`: one successor
//! - Anything else (including `Return` and a missing terminator): the
//!   textually next block, if any
//!
//! Predecessors are the inverse relation. Blocks are identified by label; the
//! graph also records each label's index in declaration order so passes can
//! work with dense indices.

use crate::compiler::ir::instruction::{Function, Value};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Control flow graph of one function.
#[derive(Debug, Clone, Default)]
pub struct ControlFlowGraph {
    /// Block labels in declaration order.
    pub order: Vec<String>,
    /// Label -> index in `order`.
    pub block_index: HashMap<String, usize>,
    /// Successor labels per block.
    /// Most blocks have at most two successors (branch), so the edge lists
    /// stay inline.
    pub successors: HashMap<String, SmallVec<[String; 2]>>,
    /// Predecessor labels per block.
    pub predecessors: HashMap<String, SmallVec<[String; 2]>>,
}

impl ControlFlowGraph {
    /// Build the CFG for `func`.
    pub fn build(func: &Function) -> Self {
        let mut cfg = ControlFlowGraph::default();

        for (i, bb) in func.bbs.iter().enumerate() {
            cfg.order.push(bb.name.clone());
            cfg.block_index.insert(bb.name.clone(), i);
            cfg.successors.insert(bb.name.clone(), SmallVec::new());
            cfg.predecessors.insert(bb.name.clone(), SmallVec::new());
        }

        for (i, bb) in func.bbs.iter().enumerate() {
            let mut targets: SmallVec<[String; 2]> = SmallVec::new();
            match bb.insts.last() {
                Some(Value::Branch {
                    true_label,
                    false_label,
                    ..
                }) => {
                    targets.push(true_label.clone());
                    targets.push(false_label.clone());
                }
                Some(Value::Jump { target }) => {
                    targets.push(target.clone());
                }
                _ => {
                    if i + 1 < func.bbs.len() {
                        targets.push(func.bbs[i + 1].name.clone());
                    }
                }
            }
            for target in targets {
                // Targets outside the function are ignored rather than
                // invented; passes keep branch targets intra-function.
                if !cfg.block_index.contains_key(&target) {
                    continue;
                }
                if let Some(succs) = cfg.successors.get_mut(&bb.name) {
                    succs.push(target.clone());
                }
                if let Some(preds) = cfg.predecessors.get_mut(&target) {
                    preds.push(bb.name.clone());
                }
            }
        }

        cfg
    }

    /// Successors of `label` (empty slice if unknown).
    pub fn succs(&self, label: &str) -> &[String] {
        self.successors.get(label).map_or(&[], |s| s.as_slice())
    }

    /// Predecessors of `label` (empty slice if unknown).
    pub fn preds(&self, label: &str) -> &[String] {
        self.predecessors.get(label).map_or(&[], |p| p.as_slice())
    }
}
