//! RV32 Code Generation
//!
//! Emits RV32I assembly from optimized IR plus the register allocator's
//! output. Each function gets a `.text`/`.globl` preamble, a prologue, its
//! basic blocks (entry label elided) and an epilogue folded into every `ret`.
//!
//! # Frame layout (low to high addresses, all offsets from `sp`)
//! 1. Outgoing-argument area: `max(0, max_call_arity - 8) * 4` bytes
//! 2. Spill area: `max_spill_slots * 4` bytes
//! 3. Callee-saved save area: `12 * 4` bytes (`s0..s11`)
//! 4. `ra` save slot (4 bytes) when the function calls others
//!
//! The total is rounded up to a multiple of 16.
//!
//! # Calling convention
//! Arguments 0..7 travel in `a0..a7`, the rest in the caller's
//! outgoing-argument area at `0(sp)`, `4(sp)`, ... . `ra` is reloaded from
//! its save slot immediately after every call so nested calls stay safe. The
//! return value moves through `a0`.
//!
//! # Instruction selection
//! Binary operations load both operands into `t0`/`t1`, compute into `t2`
//! and store `t2` to the result location. Comparisons combine `sub` with
//! `seqz`/`snez`, or `slt`/`sgt` with an optional `seqz`.

pub mod position;
pub mod regalloc;

use crate::compiler::analysis::liveness::LivenessAnalyzer;
use crate::compiler::error::CompilerError;
use crate::compiler::ir::instruction::{BinaryOp, Function, Operand, Program, Value};
use position::{move_value, Position};
use regalloc::{RegisterAllocator, REGISTER_BANK};
use std::collections::HashMap;
use std::fmt::Write;

/// RV32 assembly generator.
pub struct CodeGenerator;

impl CodeGenerator {
    /// Emit assembly for a whole program.
    pub fn generate(program: &Program) -> Result<String, CompilerError> {
        let mut output = String::new();
        for func in &program.funcs {
            output.push_str("  .text\n");
            let _ = writeln!(output, "  .globl {}", strip_prefix(&func.name));
            let mut emitter = FunctionEmitter::new(func);
            output.push_str(&emitter.emit()?);
            output.push('\n');
        }
        Ok(output)
    }
}

/// Strip the IR naming-space prefix (`@` on functions, `%` on labels) for
/// assembly.
fn strip_prefix(name: &str) -> &str {
    name.strip_prefix('@')
        .or_else(|| name.strip_prefix('%'))
        .unwrap_or(name)
}

/// Per-function frame geometry, all offsets relative to the adjusted `sp`.
#[derive(Debug, Clone, Copy)]
struct FrameLayout {
    /// Total frame size, 16-byte aligned.
    stack_size: i32,
    /// Base of the spill area.
    spill_base: i32,
    /// Base of the `s0..s11` save area.
    save_base: i32,
    /// Offset of the `ra` save slot, when the function makes calls.
    ra_offset: Option<i32>,
}

impl FrameLayout {
    fn compute(max_call_arity: usize, max_spill_slots: usize, calls_others: bool) -> Self {
        let outgoing_size = 4 * max_call_arity.saturating_sub(8) as i32;
        let spill_base = outgoing_size;
        let save_base = spill_base + 4 * max_spill_slots as i32;
        let ra_space = if calls_others { 4 } else { 0 };
        let raw = save_base + 4 * REGISTER_BANK.len() as i32 + ra_space;
        let stack_size = (raw + 15) & !15;
        let ra_offset = calls_others.then_some(save_base + 4 * REGISTER_BANK.len() as i32);
        Self {
            stack_size,
            spill_base,
            save_base,
            ra_offset,
        }
    }

    /// Save slot of callee-saved register `k` (`s<k>`).
    fn saved_reg_offset(&self, k: usize) -> i32 {
        self.save_base + 4 * k as i32
    }
}

/// Emitter for one function.
struct FunctionEmitter<'a> {
    func: &'a Function,
    frame: FrameLayout,
    /// Value name -> location.
    locations: HashMap<String, Position>,
}

impl<'a> FunctionEmitter<'a> {
    fn new(func: &'a Function) -> Self {
        let liveness = LivenessAnalyzer::analyze(func);
        let allocation = RegisterAllocator::allocate(&liveness);

        let mut calls_others = false;
        let mut max_call_arity: usize = 0;
        for bb in &func.bbs {
            for inst in &bb.insts {
                if let Value::Call { args, .. } = inst {
                    calls_others = true;
                    max_call_arity = max_call_arity.max(args.len());
                }
            }
        }

        let frame = FrameLayout::compute(max_call_arity, allocation.max_spill_slots, calls_others);

        let mut locations: HashMap<String, Position> = HashMap::new();
        for (var, reg) in &allocation.var_to_reg {
            locations.insert(var.clone(), Position::reg(reg.clone()));
        }
        for (var, slot) in &allocation.var_to_spill_slot {
            locations.insert(
                var.clone(),
                Position::Mem {
                    offset: frame.spill_base + 4 * *slot as i32,
                },
            );
        }
        // Parameter values live where the caller put them: a0..a7, then the
        // caller's outgoing-argument area just above this frame.
        for param in &func.params {
            let position = if param.index < 8 {
                Position::reg(format!("a{}", param.index))
            } else {
                Position::Mem {
                    offset: frame.stack_size + 4 * (param.index as i32 - 8),
                }
            };
            locations.insert(param.name.clone(), position);
        }

        Self {
            func,
            frame,
            locations,
        }
    }

    /// Location of an operand.
    fn operand_position(&self, operand: &Operand) -> Result<Position, CompilerError> {
        match operand {
            Operand::Integer(v) => Ok(Position::Imm(*v)),
            Operand::VarRef(name) => self.value_position(name),
        }
    }

    /// Location of a named value.
    fn value_position(&self, name: &str) -> Result<Position, CompilerError> {
        self.locations
            .get(name)
            .cloned()
            .ok_or_else(|| CompilerError::CodegenError(format!("no location for value '{}'", name)))
    }

    fn emit(&mut self) -> Result<String, CompilerError> {
        let mut out = String::new();
        let _ = writeln!(out, "{}:", strip_prefix(&self.func.name));

        self.emit_prologue(&mut out)?;

        for bb in &self.func.bbs {
            if bb.name != "%entry" {
                let _ = writeln!(out, "{}:", strip_prefix(&bb.name));
            }
            for inst in &bb.insts {
                self.emit_value(&mut out, inst)?;
            }
        }

        Ok(out)
    }

    fn emit_prologue(&self, out: &mut String) -> Result<(), CompilerError> {
        let size = self.frame.stack_size;
        if size == 0 {
            return Ok(());
        }
        if (-2048..2048).contains(&size) {
            let _ = writeln!(out, "  addi sp, sp, -{}", size);
        } else {
            let _ = writeln!(out, "  li t6, {}", -size);
            out.push_str("  add sp, sp, t6\n");
        }

        if let Some(ra_offset) = self.frame.ra_offset {
            move_value(out, &Position::reg("ra"), &Position::Mem { offset: ra_offset })?;
        }

        for (k, reg) in REGISTER_BANK.iter().enumerate() {
            move_value(
                out,
                &Position::reg(*reg),
                &Position::Mem {
                    offset: self.frame.saved_reg_offset(k),
                },
            )?;
        }
        Ok(())
    }

    fn emit_value(&self, out: &mut String, inst: &Value) -> Result<(), CompilerError> {
        match inst {
            // The allocation's slot comes from the register allocator; no
            // assembly here.
            Value::Alloc { .. } => Ok(()),
            Value::Load { name, src } => {
                let src = self.operand_position(src)?;
                let dst = self.value_position(name)?;
                move_value(out, &src, &dst)
            }
            Value::Store { value, dest } => {
                let src = self.operand_position(value)?;
                let dst = self.operand_position(dest)?;
                move_value(out, &src, &dst)
            }
            Value::Binary { name, op, lhs, rhs } => self.emit_binary(out, name, *op, lhs, rhs),
            Value::Call { name, callee, args, .. } => self.emit_call(out, name.as_deref(), callee, args),
            Value::Return { value } => self.emit_return(out, value.as_ref()),
            Value::Branch {
                cond,
                true_label,
                false_label,
            } => {
                let cond = self.operand_position(cond)?;
                move_value(out, &cond, &Position::reg("t0"))?;
                let _ = writeln!(out, "  beqz t0, {}", strip_prefix(false_label));
                let _ = writeln!(out, "  j {}", strip_prefix(true_label));
                Ok(())
            }
            Value::Jump { target } => {
                let _ = writeln!(out, "  j {}", strip_prefix(target));
                Ok(())
            }
        }
    }

    fn emit_binary(
        &self,
        out: &mut String,
        name: &str,
        op: BinaryOp,
        lhs: &Operand,
        rhs: &Operand,
    ) -> Result<(), CompilerError> {
        let lhs = self.operand_position(lhs)?;
        let rhs = self.operand_position(rhs)?;
        move_value(out, &lhs, &Position::reg("t0"))?;
        move_value(out, &rhs, &Position::reg("t1"))?;

        match op {
            BinaryOp::Add => out.push_str("  add t2, t0, t1\n"),
            BinaryOp::Sub => out.push_str("  sub t2, t0, t1\n"),
            BinaryOp::Mul => out.push_str("  mul t2, t0, t1\n"),
            BinaryOp::Div => out.push_str("  div t2, t0, t1\n"),
            BinaryOp::Mod => out.push_str("  rem t2, t0, t1\n"),
            BinaryOp::Eq => {
                out.push_str("  sub t2, t0, t1\n");
                out.push_str("  seqz t2, t2\n");
            }
            BinaryOp::Ne => {
                out.push_str("  sub t2, t0, t1\n");
                out.push_str("  snez t2, t2\n");
            }
            BinaryOp::Lt => out.push_str("  slt t2, t0, t1\n"),
            BinaryOp::Le => {
                out.push_str("  sgt t2, t0, t1\n");
                out.push_str("  seqz t2, t2\n");
            }
            BinaryOp::Gt => out.push_str("  sgt t2, t0, t1\n"),
            BinaryOp::Ge => {
                out.push_str("  slt t2, t0, t1\n");
                out.push_str("  seqz t2, t2\n");
            }
            BinaryOp::And => out.push_str("  and t2, t0, t1\n"),
            BinaryOp::Or => out.push_str("  or t2, t0, t1\n"),
            BinaryOp::Xor => out.push_str("  xor t2, t0, t1\n"),
            BinaryOp::Shl => out.push_str("  sll t2, t0, t1\n"),
            BinaryOp::Shr => out.push_str("  srl t2, t0, t1\n"),
            BinaryOp::Sar => out.push_str("  sra t2, t0, t1\n"),
        }

        let dst = self.value_position(name)?;
        move_value(out, &Position::reg("t2"), &dst)
    }

    fn emit_call(
        &self,
        out: &mut String,
        name: Option<&str>,
        callee: &str,
        args: &[Operand],
    ) -> Result<(), CompilerError> {
        for (i, arg) in args.iter().enumerate() {
            let src = self.operand_position(arg)?;
            if i < 8 {
                move_value(out, &src, &Position::reg(format!("a{}", i)))?;
            } else {
                move_value(
                    out,
                    &src,
                    &Position::Mem {
                        offset: 4 * (i as i32 - 8),
                    },
                )?;
            }
        }

        let _ = writeln!(out, "  call {}", strip_prefix(callee));

        // Reload ra right away so a later nested call cannot observe a
        // clobbered return address.
        if let Some(ra_offset) = self.frame.ra_offset {
            move_value(out, &Position::Mem { offset: ra_offset }, &Position::reg("ra"))?;
        }

        if let Some(name) = name {
            let dst = self.value_position(name)?;
            move_value(out, &Position::reg("a0"), &dst)?;
        }
        Ok(())
    }

    /// Epilogue, folded into every `ret`.
    ///
    /// The return value moves to `a0` while the frame is still intact (it
    /// may live in a callee-saved register or a spill slot), then `s0..s11`
    /// come back, then `sp`.
    fn emit_return(&self, out: &mut String, value: Option<&Operand>) -> Result<(), CompilerError> {
        if let Some(value) = value {
            let src = self.operand_position(value)?;
            move_value(out, &src, &Position::reg("a0"))?;
        }

        for (k, reg) in REGISTER_BANK.iter().enumerate() {
            move_value(
                out,
                &Position::Mem {
                    offset: self.frame.saved_reg_offset(k),
                },
                &Position::reg(*reg),
            )?;
        }

        let size = self.frame.stack_size;
        if size != 0 {
            if (-2048..2048).contains(&size) {
                let _ = writeln!(out, "  addi sp, sp, {}", size);
            } else {
                let _ = writeln!(out, "  li t6, {}", size);
                out.push_str("  add sp, sp, t6\n");
            }
        }

        out.push_str("  ret\n");
        Ok(())
    }
}
