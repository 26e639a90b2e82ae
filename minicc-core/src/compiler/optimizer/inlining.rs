//! Function Inlining
//!
//! Replaces qualifying call sites with a renamed copy of the callee's body.
//!
//! # Eligibility
//! A call is inlined only when every check passes:
//! - the callee is known and not currently being inlined (no recursion)
//! - the inline depth is under `depth_limit`
//! - the callee's instruction count is at most `size_limit`
//! - the call's argument count matches the callee's arity
//! - the callee has at most three basic blocks and contains only
//!   straight-line instructions (`Alloc`/`Load`/`Store`/`Binary`/`Return`);
//!   callees with internal control flow or nested calls are rejected rather
//!   than cloned
//!
//! # Cloning
//! Defined names are renamed to fresh `%inline_<n>` identifiers through a
//! per-call substitution map; parameter references are remapped to the call's
//! argument operands. A `Return v` becomes a store of `v` into a freshly
//! allocated `%ret_val_<n>` slot, and after the body a `Load` moves that slot
//! into the original call's result name.

use crate::compiler::ir::instruction::{Function, Operand, Program, Value};
use std::collections::{HashMap, HashSet};

/// Function inliner with depth and size limits.
pub struct InlineOptimizer {
    /// Maximum transitive inline depth.
    depth_limit: usize,
    /// Maximum callee size in instructions.
    size_limit: usize,
    /// Current inline nesting depth.
    current_depth: usize,
    /// Callees currently being inlined (recursion guard).
    in_progress: HashSet<String>,
    /// Counter behind `%inline_<n>` and `%ret_val_<n>` names.
    temp_counter: usize,
}

impl InlineOptimizer {
    pub fn new(depth_limit: usize, size_limit: usize) -> Self {
        Self {
            depth_limit,
            size_limit,
            current_depth: 0,
            in_progress: HashSet::new(),
            temp_counter: 0,
        }
    }

    /// Inline qualifying call sites across `program`.
    pub fn optimize(&mut self, program: &mut Program) {
        // Callee bodies are snapshotted up front so the result does not
        // depend on function order.
        let index: HashMap<String, Function> = program
            .funcs
            .iter()
            .map(|f| (f.name.clone(), f.clone()))
            .collect();

        for func in &mut program.funcs {
            self.optimize_function(func, &index);
        }
    }

    fn optimize_function(&mut self, func: &mut Function, index: &HashMap<String, Function>) {
        for bb in &mut func.bbs {
            let mut new_insts: Vec<Value> = Vec::with_capacity(bb.insts.len());

            for inst in bb.insts.drain(..) {
                if let Value::Call {
                    ref name,
                    ref callee,
                    ref args,
                    ..
                } = inst
                {
                    if let Some(callee_func) = index.get(callee) {
                        if self.can_inline_call(args.len(), callee_func) {
                            let inlined =
                                self.inline_function_call(name.as_deref(), args, callee_func);
                            new_insts.extend(inlined);
                            continue;
                        }
                    }
                }
                new_insts.push(inst);
            }

            bb.insts = new_insts;
        }
    }

    /// Whether `callee` qualifies for inlining at a site with `arg_count`
    /// arguments.
    fn can_inline_call(&self, arg_count: usize, callee: &Function) -> bool {
        if self.in_progress.contains(&callee.name) {
            return false;
        }
        if self.current_depth >= self.depth_limit {
            return false;
        }
        if callee.inst_count() > self.size_limit {
            return false;
        }
        if arg_count != callee.param_count() {
            return false;
        }
        if callee.bbs.len() > 3 {
            return false;
        }
        // Only straight-line bodies are cloned; the block heuristic alone
        // would let label-carrying instructions through.
        for bb in &callee.bbs {
            for inst in &bb.insts {
                match inst {
                    Value::Alloc { .. }
                    | Value::Load { .. }
                    | Value::Store { .. }
                    | Value::Binary { .. }
                    | Value::Return { .. } => {}
                    _ => return false,
                }
            }
        }
        true
    }

    /// Clone `callee`'s body for one call site.
    fn inline_function_call(
        &mut self,
        result_name: Option<&str>,
        args: &[Operand],
        callee: &Function,
    ) -> Vec<Value> {
        self.current_depth += 1;
        self.in_progress.insert(callee.name.clone());

        // Parameter names map to the call's argument operands.
        let param_map: HashMap<&str, &Operand> = callee
            .params
            .iter()
            .filter_map(|p| args.get(p.index).map(|arg| (p.name.as_str(), arg)))
            .collect();
        let mut var_mapping: HashMap<String, String> = HashMap::new();
        let mut ret_slot: Option<String> = None;
        let mut inlined: Vec<Value> = Vec::new();

        for bb in &callee.bbs {
            for inst in &bb.insts {
                match inst {
                    Value::Alloc { name } => {
                        let new_name = self.fresh_inline_name();
                        var_mapping.insert(name.clone(), new_name.clone());
                        inlined.push(Value::Alloc { name: new_name });
                    }
                    Value::Load { name, src } => {
                        let src = self.map_operand(src, &var_mapping, &param_map);
                        let new_name = self.fresh_inline_name();
                        var_mapping.insert(name.clone(), new_name.clone());
                        inlined.push(Value::Load {
                            name: new_name,
                            src,
                        });
                    }
                    Value::Store { value, dest } => {
                        let value = self.map_operand(value, &var_mapping, &param_map);
                        let dest = self.map_operand(dest, &var_mapping, &param_map);
                        inlined.push(Value::Store { value, dest });
                    }
                    Value::Binary { name, op, lhs, rhs } => {
                        let lhs = self.map_operand(lhs, &var_mapping, &param_map);
                        let rhs = self.map_operand(rhs, &var_mapping, &param_map);
                        let new_name = self.fresh_inline_name();
                        var_mapping.insert(name.clone(), new_name.clone());
                        inlined.push(Value::Binary {
                            name: new_name,
                            op: *op,
                            lhs,
                            rhs,
                        });
                    }
                    Value::Return { value } => {
                        if let Some(value) = value {
                            let value = self.map_operand(value, &var_mapping, &param_map);
                            let slot = format!("%ret_val_{}", self.temp_counter);
                            self.temp_counter += 1;
                            inlined.push(Value::Alloc { name: slot.clone() });
                            inlined.push(Value::Store {
                                value,
                                dest: Operand::VarRef(slot.clone()),
                            });
                            ret_slot = Some(slot);
                        }
                        // A void return clones to nothing.
                    }
                    // Unreachable: can_inline_call rejects everything else.
                    _ => {}
                }
            }
        }

        if let (Some(result_name), Some(ret_slot)) = (result_name, ret_slot) {
            inlined.push(Value::Load {
                name: result_name.to_string(),
                src: Operand::VarRef(ret_slot),
            });
        }

        self.current_depth -= 1;
        self.in_progress.remove(&callee.name);
        inlined
    }

    /// Rewrite an operand through the substitution map, falling back to the
    /// parameter-to-argument map.
    fn map_operand(
        &self,
        operand: &Operand,
        var_mapping: &HashMap<String, String>,
        param_map: &HashMap<&str, &Operand>,
    ) -> Operand {
        match operand {
            Operand::Integer(_) => operand.clone(),
            Operand::VarRef(name) => {
                if let Some(mapped) = var_mapping.get(name) {
                    Operand::VarRef(mapped.clone())
                } else if let Some(arg) = param_map.get(name.as_str()) {
                    (*arg).clone()
                } else {
                    operand.clone()
                }
            }
        }
    }

    fn fresh_inline_name(&mut self) -> String {
        let name = format!("%inline_{}", self.temp_counter);
        self.temp_counter += 1;
        name
    }
}
