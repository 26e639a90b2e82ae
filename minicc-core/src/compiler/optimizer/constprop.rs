//! Constant Propagation
//!
//! Forward may-analysis over the function's CFG followed by a rewrite pass.
//!
//! # Lattice
//! Each value name (including store destinations) maps to `Unknown` or
//! `Const(i32)`. A name absent from a table is `Unknown` at joins.
//!
//! # Algorithm
//! 1. Build block successors/predecessors from terminators (fall-through to
//!    the next block when a block does not end in a branch or jump).
//! 2. Work-list dataflow: the meet at block entry keeps a binding only when
//!    every predecessor OUT agrees on the same constant; the transfer walks
//!    the block, folding binaries and tracking store/load effects.
//! 3. Rewrite: constantize operands from the block's IN state, drop foldable
//!    `Binary`/`Load` instructions, turn constant-condition `Branch`es into
//!    `Jump`s, prune blocks that became unreachable, and trim anything that
//!    follows a block's first `Return` or `Jump`.
//!
//! The pass is infallible: whenever a precondition fails (non-constant
//! operand, division by zero) it preserves the instruction unchanged.
//! Folding uses two's-complement i32 semantics, so a folded result always
//! equals what the instruction would have produced at run time.

use crate::compiler::ir::instruction::{BinaryOp, Function, Operand, Program, Value};
use bitvec::prelude::*;
use std::collections::{HashMap, VecDeque};

/// Constant value lattice element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConstVal {
    Unknown,
    Const(i32),
}

/// Constant propagation + branch simplification + unreachable block pruning.
pub struct ConstantPropagation;

impl ConstantPropagation {
    /// Optimize every function of `program` in place.
    pub fn optimize(program: &mut Program) {
        for func in &mut program.funcs {
            Self::optimize_function(func);
        }
    }

    fn optimize_function(func: &mut Function) {
        let n = func.bbs.len();
        if n == 0 {
            return;
        }

        let mut bb_index: HashMap<String, usize> = HashMap::new();
        for (i, bb) in func.bbs.iter().enumerate() {
            bb_index.insert(bb.name.clone(), i);
        }

        // Successors/predecessors by block position.
        let mut succs: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, bb) in func.bbs.iter().enumerate() {
            match bb.insts.last() {
                Some(Value::Branch {
                    true_label,
                    false_label,
                    ..
                }) => {
                    if let Some(&t) = bb_index.get(true_label) {
                        succs[i].push(t);
                        preds[t].push(i);
                    }
                    if let Some(&f) = bb_index.get(false_label) {
                        succs[i].push(f);
                        preds[f].push(i);
                    }
                }
                Some(Value::Jump { target }) => {
                    if let Some(&t) = bb_index.get(target) {
                        succs[i].push(t);
                        preds[t].push(i);
                    }
                }
                // A return never falls through; a fabricated edge here would
                // keep dead branch targets alive during pruning.
                Some(Value::Return { .. }) => {}
                _ => {
                    if i + 1 < n {
                        succs[i].push(i + 1);
                        preds[i + 1].push(i);
                    }
                }
            }
        }

        // Work-list dataflow to a fixed point.
        let mut table_in: Vec<HashMap<String, ConstVal>> = vec![HashMap::new(); n];
        let mut table_out: Vec<HashMap<String, ConstVal>> = vec![HashMap::new(); n];
        let mut queue: VecDeque<usize> = (0..n).collect();
        let mut in_queue: BitVec = bitvec![1; n];

        while let Some(b) = queue.pop_front() {
            in_queue.set(b, false);

            let mut new_in: HashMap<String, ConstVal> = HashMap::new();
            if let Some((&first, rest)) = preds[b].split_first() {
                new_in = table_out[first].clone();
                for &p in rest {
                    for (key, val) in new_in.iter_mut() {
                        let other = table_out[p].get(key).copied().unwrap_or(ConstVal::Unknown);
                        *val = Self::meet(*val, other);
                    }
                }
            }

            let new_out = Self::transfer(&new_in, &func.bbs[b].insts);
            table_in[b] = new_in;
            if new_out != table_out[b] {
                table_out[b] = new_out;
                for &s in &succs[b] {
                    if !in_queue[s] {
                        queue.push_back(s);
                        in_queue.set(s, true);
                    }
                }
            }
        }

        // Rewrite phase.
        let mut alive: BitVec = bitvec![1; n];
        for b in 0..n {
            if !alive[b] {
                continue;
            }
            let mut env = table_in[b].clone();
            let mut new_insts: Vec<Value> = Vec::with_capacity(func.bbs[b].insts.len());

            for mut inst in func.bbs[b].insts.drain(..) {
                Self::replace_operands(&mut inst, &env);

                match inst {
                    Value::Binary {
                        ref name,
                        op,
                        ref lhs,
                        ref rhs,
                    } => {
                        if let (Some(l), Some(r)) = (lhs.as_integer(), rhs.as_integer()) {
                            if let Some(result) = Self::fold_binary(op, l, r) {
                                env.insert(name.clone(), ConstVal::Const(result));
                                continue;
                            }
                        }
                        env.remove(name);
                        new_insts.push(inst);
                    }
                    Value::Store {
                        ref value,
                        ref dest,
                    } => {
                        // Stores always survive; only the tracked slot value
                        // changes.
                        if let Some(dest_name) = dest.name() {
                            match value.as_integer() {
                                Some(v) => {
                                    env.insert(dest_name.to_string(), ConstVal::Const(v));
                                }
                                None => {
                                    env.remove(dest_name);
                                }
                            }
                        }
                        new_insts.push(inst);
                    }
                    Value::Load { ref name, ref src } => {
                        if let Some(v) = Self::resolve(&env, src) {
                            env.insert(name.clone(), ConstVal::Const(v));
                            continue;
                        }
                        env.remove(name);
                        new_insts.push(inst);
                    }
                    Value::Branch {
                        ref cond,
                        ref true_label,
                        ref false_label,
                    } => {
                        if let Some(c) = cond.as_integer() {
                            let (taken, untaken) = if c != 0 {
                                (true_label.clone(), false_label.clone())
                            } else {
                                (false_label.clone(), true_label.clone())
                            };
                            // The untaken block dies only when this edge was
                            // its sole way in.
                            if untaken != taken {
                                if let Some(&u) = bb_index.get(&untaken) {
                                    if preds[u].iter().all(|&p| p == b) {
                                        alive.set(u, false);
                                    }
                                }
                            }
                            new_insts.push(Value::Jump { target: taken });
                        } else {
                            new_insts.push(inst);
                        }
                    }
                    Value::Call { ref name, .. } => {
                        if let Some(name) = name {
                            env.remove(name);
                        }
                        new_insts.push(inst);
                    }
                    Value::Alloc { ref name } => {
                        env.remove(name);
                        new_insts.push(inst);
                    }
                    _ => new_insts.push(inst),
                }
            }

            func.bbs[b].insts = new_insts;
        }

        // Prune unreachable blocks.
        let mut keep = alive.into_iter();
        func.bbs.retain(|_| keep.next().unwrap_or(true));

        // Trim dead code after the first return or jump of each block.
        for bb in &mut func.bbs {
            if let Some(pos) = bb
                .insts
                .iter()
                .position(|inst| matches!(inst, Value::Return { .. } | Value::Jump { .. }))
            {
                bb.insts.truncate(pos + 1);
            }
        }
    }

    fn meet(a: ConstVal, b: ConstVal) -> ConstVal {
        match (a, b) {
            (ConstVal::Const(x), ConstVal::Const(y)) if x == y => ConstVal::Const(x),
            _ => ConstVal::Unknown,
        }
    }

    /// Constant value of `operand` under `env`, if known.
    fn resolve(env: &HashMap<String, ConstVal>, operand: &Operand) -> Option<i32> {
        match operand {
            Operand::Integer(v) => Some(*v),
            Operand::VarRef(name) => match env.get(name) {
                Some(ConstVal::Const(v)) => Some(*v),
                _ => None,
            },
        }
    }

    /// Transfer function of one block: thread the constant table through its
    /// instructions.
    fn transfer(
        table_in: &HashMap<String, ConstVal>,
        insts: &[Value],
    ) -> HashMap<String, ConstVal> {
        let mut tbl = table_in.clone();
        for inst in insts {
            // A new definition always invalidates the old binding first.
            if let Some(dest) = inst.def_name() {
                tbl.remove(dest);
            }

            match inst {
                Value::Binary { name, op, lhs, rhs } => {
                    if let (Some(l), Some(r)) =
                        (Self::resolve(&tbl, lhs), Self::resolve(&tbl, rhs))
                    {
                        if let Some(result) = Self::fold_binary(*op, l, r) {
                            tbl.insert(name.clone(), ConstVal::Const(result));
                        }
                    }
                }
                Value::Store { value, dest } => {
                    if let Some(dest_name) = dest.name() {
                        match Self::resolve(&tbl, value) {
                            Some(v) => {
                                tbl.insert(dest_name.to_string(), ConstVal::Const(v));
                            }
                            None => {
                                tbl.remove(dest_name);
                            }
                        }
                    }
                }
                Value::Load { name, src } => {
                    if let Some(v) = Self::resolve(&tbl, src) {
                        tbl.insert(name.clone(), ConstVal::Const(v));
                    }
                }
                _ => {}
            }
        }
        tbl
    }

    /// Fold a binary operation over two constants.
    ///
    /// Two's-complement i32 arithmetic; division and remainder by zero are
    /// not foldable (the instruction is preserved). Shift amounts take the
    /// low five bits, matching RV32 shift instructions.
    fn fold_binary(op: BinaryOp, lhs: i32, rhs: i32) -> Option<i32> {
        let result = match op {
            BinaryOp::Add => lhs.wrapping_add(rhs),
            BinaryOp::Sub => lhs.wrapping_sub(rhs),
            BinaryOp::Mul => lhs.wrapping_mul(rhs),
            BinaryOp::Div => {
                if rhs == 0 {
                    return None;
                }
                lhs.wrapping_div(rhs)
            }
            BinaryOp::Mod => {
                if rhs == 0 {
                    return None;
                }
                lhs.wrapping_rem(rhs)
            }
            BinaryOp::Eq => (lhs == rhs) as i32,
            BinaryOp::Ne => (lhs != rhs) as i32,
            BinaryOp::Lt => (lhs < rhs) as i32,
            BinaryOp::Le => (lhs <= rhs) as i32,
            BinaryOp::Gt => (lhs > rhs) as i32,
            BinaryOp::Ge => (lhs >= rhs) as i32,
            BinaryOp::And => lhs & rhs,
            BinaryOp::Or => lhs | rhs,
            BinaryOp::Xor => lhs ^ rhs,
            BinaryOp::Shl => lhs.wrapping_shl(rhs as u32 & 31),
            BinaryOp::Shr => ((lhs as u32).wrapping_shr(rhs as u32 & 31)) as i32,
            BinaryOp::Sar => lhs.wrapping_shr(rhs as u32 & 31),
        };
        Some(result)
    }

    /// Replace every operand that resolves to a constant with a literal.
    fn replace_operands(inst: &mut Value, env: &HashMap<String, ConstVal>) {
        let constantize = |operand: &mut Operand| {
            if let Some(v) = Self::resolve(env, operand) {
                *operand = Operand::Integer(v);
            }
        };
        match inst {
            Value::Binary { lhs, rhs, .. } => {
                constantize(lhs);
                constantize(rhs);
            }
            Value::Store { value, .. } => constantize(value),
            Value::Load { src, .. } => constantize(src),
            Value::Branch { cond, .. } => constantize(cond),
            Value::Call { args, .. } => {
                for arg in args {
                    constantize(arg);
                }
            }
            Value::Return { value } => {
                if let Some(value) = value {
                    constantize(value);
                }
            }
            Value::Alloc { .. } | Value::Jump { .. } => {}
        }
    }
}
