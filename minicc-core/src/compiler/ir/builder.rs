//! IR Builder - AST to IR Lowering
//!
//! Walks the AST in a strict left-to-right, depth-first order and emits
//! three-address IR. All state lives in the builder: the scoped symbol table,
//! the temporary/label counters and the loop context stack. The temporary
//! counter resets per function so that printed IR is stable across
//! compilation units; label and scope counters are monotonic for the whole
//! program.
//!
//! # Naming
//! - Temporaries: `%0`, `%1`, ... (fresh per expression node)
//! - Variable slots: `@SYM_TABLE_<scope>_<ident>` (shadowing resolved by the
//!   scope number)
//! - Functions: `@<ident>`
//! - Block labels: `%entry`, `%then_<k>`, `%else_<k>`, `%end_<k>`,
//!   `%while_entry_<k>`, `%while_body_<k>`, `%while_end_<k>`
//!
//! # `&&` / `||`
//! By default both operands are evaluated and combined with the bitwise
//! `and`/`or` opcode, so `1 && 2` evaluates to 0. The
//! [`LoweringOptions::short_circuit`] flag switches to a branch-based
//! lowering that skips the right operand when the left one decides the
//! result; it is never enabled implicitly.

use crate::compiler::ast::{
    AddExp, Block, CompUnit, EqExp, Exp, FuncCall, FuncDef, LAndExp, LOrExp, MulExp, PrimaryExp,
    RelExp, Stmt, UnaryExp,
};
use crate::compiler::error::CompilerError;
use crate::compiler::ir::instruction::{
    BasicBlock, BinaryOp, FuncArgRef, Function, Operand, Program, Type, Value,
};
use crate::compiler::symtab::{SymbolKind, SymbolTable};

/// Lowering configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoweringOptions {
    /// Lower `&&`/`||` with short-circuit control flow instead of the
    /// compatible bitwise `and`/`or` lowering.
    pub short_circuit: bool,
}

/// Lower a parsed compilation unit into an IR [`Program`].
pub fn lower(unit: &CompUnit) -> Result<Program, CompilerError> {
    lower_with_options(unit, LoweringOptions::default())
}

/// Lower with explicit [`LoweringOptions`].
pub fn lower_with_options(
    unit: &CompUnit,
    options: LoweringOptions,
) -> Result<Program, CompilerError> {
    let mut builder = IrBuilder::new(options);
    builder.lower_comp_unit(unit)
}

/// AST-to-IR lowering context.
///
/// Owns the symbol table and every counter the translation needs, so two
/// builders never interfere.
struct IrBuilder {
    options: LoweringOptions,
    symtab: SymbolTable,
    /// Temporary counter, reset at every function.
    tmp: usize,
    /// `if` label counter, monotonic across the program.
    if_n: usize,
    /// `while` label counter, monotonic across the program.
    while_n: usize,
    /// Short-circuit label counter (only used with `short_circuit`).
    sc_n: usize,
    /// Enclosing loops, innermost last: (entry label, end label).
    loop_stack: Vec<(String, String)>,
    /// Blocks finished so far in the current function.
    blocks: Vec<BasicBlock>,
    /// Block currently receiving instructions.
    current: BasicBlock,
    /// Return type of the function being lowered.
    current_ret: Type,
    /// Unmangled name of the function being lowered (for diagnostics).
    current_func: String,
}

impl IrBuilder {
    fn new(options: LoweringOptions) -> Self {
        Self {
            options,
            symtab: SymbolTable::new(),
            tmp: 0,
            if_n: 0,
            while_n: 0,
            sc_n: 0,
            loop_stack: Vec::new(),
            blocks: Vec::new(),
            current: BasicBlock::new("%entry"),
            current_ret: Type::Unit,
            current_func: String::new(),
        }
    }

    /// Fresh `%N` temporary name.
    fn fresh_tmp(&mut self) -> String {
        let name = format!("%{}", self.tmp);
        self.tmp += 1;
        name
    }

    /// Append an instruction to the current block.
    ///
    /// Instructions after a terminator are unreachable and silently dropped,
    /// keeping every block single-terminated.
    fn push_inst(&mut self, inst: Value) {
        if !self.current.is_terminated() {
            self.current.add_inst(inst);
        }
    }

    /// Finish the current block and start a new one labelled `label`.
    fn start_block(&mut self, label: String) {
        let finished = std::mem::replace(&mut self.current, BasicBlock::new(label));
        self.blocks.push(finished);
    }

    fn lower_comp_unit(&mut self, unit: &CompUnit) -> Result<Program, CompilerError> {
        let mut program = Program::new();
        self.symtab.enter_scope(); // global scope
        for func_def in &unit.func_defs {
            let func = self.lower_func_def(func_def)?;
            program.add_function(func);
        }
        self.symtab.exit_scope();
        Ok(program)
    }

    fn lower_func_def(&mut self, func_def: &FuncDef) -> Result<Function, CompilerError> {
        let (ret_type, kind) = match func_def.func_type.as_str() {
            "int" => (Type::Int32, SymbolKind::IntFunction),
            "void" => (Type::Unit, SymbolKind::VoidFunction),
            other => return Err(CompilerError::UnsupportedType(other.to_string())),
        };
        if self.symtab.exist_sym_in_current_scope(&func_def.ident) {
            return Err(CompilerError::Redeclaration(func_def.ident.clone()));
        }
        // Visible before the body is lowered, so recursion resolves.
        self.symtab
            .insert_sym(&func_def.ident, kind, func_def.params.len() as i32);

        let func_type = Type::Function {
            params: vec![Type::Int32; func_def.params.len()],
            ret: Box::new(ret_type.clone()),
        };
        let mut func = Function::new(format!("@{}", func_def.ident), func_type);

        self.tmp = 0;
        self.blocks.clear();
        self.current = BasicBlock::new("%entry");
        self.current_ret = ret_type;
        self.current_func = func_def.ident.clone();

        // Function scope holds the parameters.
        self.symtab.enter_scope();
        for (index, param) in func_def.params.iter().enumerate() {
            if param.ty != "int" {
                return Err(CompilerError::UnsupportedType(param.ty.clone()));
            }
            if self.symtab.exist_sym_in_current_scope(&param.ident) {
                return Err(CompilerError::Redeclaration(param.ident.clone()));
            }
            self.symtab.insert_sym(&param.ident, SymbolKind::Var, 0);
            let arg_name = format!("%{}", param.ident);
            func.add_param(FuncArgRef {
                index,
                name: arg_name.clone(),
            });
            // Spill each incoming argument into its named slot; the backend
            // binds the argument name to a0..a7 or the caller's frame.
            let slot = format!("@{}{}", self.symtab.get_scope_number(), param.ident);
            self.push_inst(Value::Alloc { name: slot.clone() });
            self.push_inst(Value::Store {
                value: Operand::VarRef(arg_name),
                dest: Operand::VarRef(slot),
            });
        }

        for stmt in &func_def.block.stmts {
            self.lower_stmt(stmt)?;
        }
        self.symtab.exit_scope();

        // A body may fall off its end (or leave an empty join block behind);
        // close it out so every block ends in a terminator.
        if !self.current.is_terminated() {
            let value = match self.current_ret {
                Type::Int32 => Some(Operand::Integer(0)),
                _ => None,
            };
            self.push_inst(Value::Return { value });
        }

        let last = std::mem::replace(&mut self.current, BasicBlock::new("%entry"));
        self.blocks.push(last);
        for bb in self.blocks.drain(..) {
            func.add_basic_block(bb);
        }
        Ok(func)
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), CompilerError> {
        match stmt {
            Stmt::Return(exp) => {
                let value = match exp {
                    Some(exp) => {
                        let name = self.lower_exp(exp)?;
                        Some(Operand::VarRef(name))
                    }
                    None => {
                        if self.current_ret.is_int32() {
                            return Err(CompilerError::MissingReturnValue(
                                self.current_func.clone(),
                            ));
                        }
                        None
                    }
                };
                self.push_inst(Value::Return { value });
            }
            Stmt::VarDecl { ident, exp } => {
                let tmp = self.lower_exp(exp)?;
                if self.symtab.exist_sym_in_current_scope(ident) {
                    return Err(CompilerError::Redeclaration(ident.clone()));
                }
                self.symtab.insert_sym(ident, SymbolKind::Var, 0);
                let slot = format!("@{}{}", self.symtab.get_scope_number(), ident);
                self.push_inst(Value::Alloc { name: slot.clone() });
                self.push_inst(Value::Store {
                    value: Operand::VarRef(tmp),
                    dest: Operand::VarRef(slot),
                });
            }
            Stmt::Assign { lval, exp } => {
                let tmp = self.lower_exp(exp)?;
                let slot = self.lookup_var_slot(&lval.ident)?;
                self.push_inst(Value::Store {
                    value: Operand::VarRef(tmp),
                    dest: Operand::VarRef(slot),
                });
            }
            Stmt::Exp(exp) => {
                self.lower_exp(exp)?;
            }
            Stmt::Block(block) => self.lower_block(block)?,
            Stmt::Empty => {}
            Stmt::If {
                cond,
                then_stmt,
                else_stmt,
            } => self.lower_if(cond, then_stmt, else_stmt.as_deref())?,
            Stmt::While { cond, body } => self.lower_while(cond, body)?,
            Stmt::Break => {
                let end = self
                    .loop_stack
                    .last()
                    .ok_or_else(|| CompilerError::OutsideLoop("break".to_string()))?
                    .1
                    .clone();
                self.push_inst(Value::Jump { target: end });
            }
            Stmt::Continue => {
                let entry = self
                    .loop_stack
                    .last()
                    .ok_or_else(|| CompilerError::OutsideLoop("continue".to_string()))?
                    .0
                    .clone();
                self.push_inst(Value::Jump { target: entry });
            }
        }
        Ok(())
    }

    fn lower_block(&mut self, block: &Block) -> Result<(), CompilerError> {
        self.symtab.enter_scope();
        for stmt in &block.stmts {
            self.lower_stmt(stmt)?;
        }
        self.symtab.exit_scope();
        Ok(())
    }

    fn lower_if(
        &mut self,
        cond: &Exp,
        then_stmt: &Stmt,
        else_stmt: Option<&Stmt>,
    ) -> Result<(), CompilerError> {
        let k = self.if_n;
        self.if_n += 1;
        let then_label = format!("%then_{}", k);
        let else_label = format!("%else_{}", k);
        let end_label = format!("%end_{}", k);

        let cond_name = self.lower_exp(cond)?;
        let false_target = if else_stmt.is_some() {
            else_label.clone()
        } else {
            end_label.clone()
        };
        self.push_inst(Value::Branch {
            cond: Operand::VarRef(cond_name),
            true_label: then_label.clone(),
            false_label: false_target,
        });

        self.start_block(then_label);
        self.lower_stmt(then_stmt)?;
        if !self.current.is_terminated() {
            self.push_inst(Value::Jump {
                target: end_label.clone(),
            });
        }

        if let Some(else_stmt) = else_stmt {
            self.start_block(else_label);
            self.lower_stmt(else_stmt)?;
            if !self.current.is_terminated() {
                self.push_inst(Value::Jump {
                    target: end_label.clone(),
                });
            }
        }

        self.start_block(end_label);
        Ok(())
    }

    fn lower_while(&mut self, cond: &Exp, body: &Stmt) -> Result<(), CompilerError> {
        let k = self.while_n;
        self.while_n += 1;
        let entry_label = format!("%while_entry_{}", k);
        let body_label = format!("%while_body_{}", k);
        let end_label = format!("%while_end_{}", k);

        self.push_inst(Value::Jump {
            target: entry_label.clone(),
        });
        self.start_block(entry_label.clone());
        let cond_name = self.lower_exp(cond)?;
        self.push_inst(Value::Branch {
            cond: Operand::VarRef(cond_name),
            true_label: body_label.clone(),
            false_label: end_label.clone(),
        });

        self.start_block(body_label);
        self.loop_stack.push((entry_label.clone(), end_label.clone()));
        self.lower_stmt(body)?;
        self.loop_stack.pop();
        if !self.current.is_terminated() {
            self.push_inst(Value::Jump {
                target: entry_label,
            });
        }

        self.start_block(end_label);
        Ok(())
    }

    /// Resolve a variable reference to its mangled slot name.
    fn lookup_var_slot(&self, ident: &str) -> Result<String, CompilerError> {
        let (tag, info) = self.symtab.query_sym(ident);
        if info.kind != SymbolKind::Var {
            return Err(CompilerError::UnboundIdentifier(ident.to_string()));
        }
        Ok(format!("@{}{}", tag, ident))
    }

    // Expression lowering. Every helper returns the name holding the result.

    fn lower_exp(&mut self, exp: &Exp) -> Result<String, CompilerError> {
        self.lower_lor_exp(&exp.lor)
    }

    fn lower_lor_exp(&mut self, exp: &LOrExp) -> Result<String, CompilerError> {
        match exp {
            LOrExp::LAnd(inner) => self.lower_land_exp(inner),
            LOrExp::LOr { lhs, rhs } => {
                if self.options.short_circuit {
                    return self.lower_short_circuit_or(lhs, rhs);
                }
                let lhs_name = self.lower_lor_exp(lhs)?;
                let rhs_name = self.lower_land_exp(rhs)?;
                Ok(self.emit_binary(BinaryOp::Or, lhs_name, rhs_name))
            }
        }
    }

    fn lower_land_exp(&mut self, exp: &LAndExp) -> Result<String, CompilerError> {
        match exp {
            LAndExp::Eq(inner) => self.lower_eq_exp(inner),
            LAndExp::LAnd { lhs, rhs } => {
                if self.options.short_circuit {
                    return self.lower_short_circuit_and(lhs, rhs);
                }
                let lhs_name = self.lower_land_exp(lhs)?;
                let rhs_name = self.lower_eq_exp(rhs)?;
                Ok(self.emit_binary(BinaryOp::And, lhs_name, rhs_name))
            }
        }
    }

    /// Branch-based `||` lowering: the right operand is evaluated only when
    /// the left one is zero. The 0/1 result lives in a dedicated slot.
    fn lower_short_circuit_or(
        &mut self,
        lhs: &LOrExp,
        rhs: &LAndExp,
    ) -> Result<String, CompilerError> {
        let k = self.sc_n;
        self.sc_n += 1;
        let rhs_label = format!("%sc_rhs_{}", k);
        let end_label = format!("%sc_end_{}", k);
        let slot = format!("%sc_{}", k);

        let lhs_name = self.lower_lor_exp(lhs)?;
        let lhs_bool = self.emit_binary_imm(BinaryOp::Ne, Operand::Integer(0), lhs_name);
        self.push_inst(Value::Alloc { name: slot.clone() });
        self.push_inst(Value::Store {
            value: Operand::VarRef(lhs_bool.clone()),
            dest: Operand::VarRef(slot.clone()),
        });
        self.push_inst(Value::Branch {
            cond: Operand::VarRef(lhs_bool),
            true_label: end_label.clone(),
            false_label: rhs_label.clone(),
        });

        self.start_block(rhs_label);
        let rhs_name = self.lower_land_exp(rhs)?;
        let rhs_bool = self.emit_binary_imm(BinaryOp::Ne, Operand::Integer(0), rhs_name);
        self.push_inst(Value::Store {
            value: Operand::VarRef(rhs_bool),
            dest: Operand::VarRef(slot.clone()),
        });
        self.push_inst(Value::Jump {
            target: end_label.clone(),
        });

        self.start_block(end_label);
        Ok(slot)
    }

    /// Branch-based `&&` lowering: the right operand is evaluated only when
    /// the left one is nonzero.
    fn lower_short_circuit_and(
        &mut self,
        lhs: &LAndExp,
        rhs: &EqExp,
    ) -> Result<String, CompilerError> {
        let k = self.sc_n;
        self.sc_n += 1;
        let rhs_label = format!("%sc_rhs_{}", k);
        let end_label = format!("%sc_end_{}", k);
        let slot = format!("%sc_{}", k);

        let lhs_name = self.lower_land_exp(lhs)?;
        let lhs_bool = self.emit_binary_imm(BinaryOp::Ne, Operand::Integer(0), lhs_name);
        self.push_inst(Value::Alloc { name: slot.clone() });
        self.push_inst(Value::Store {
            value: Operand::VarRef(lhs_bool.clone()),
            dest: Operand::VarRef(slot.clone()),
        });
        self.push_inst(Value::Branch {
            cond: Operand::VarRef(lhs_bool),
            true_label: rhs_label.clone(),
            false_label: end_label.clone(),
        });

        self.start_block(rhs_label);
        let rhs_name = self.lower_eq_exp(rhs)?;
        let rhs_bool = self.emit_binary_imm(BinaryOp::Ne, Operand::Integer(0), rhs_name);
        self.push_inst(Value::Store {
            value: Operand::VarRef(rhs_bool),
            dest: Operand::VarRef(slot.clone()),
        });
        self.push_inst(Value::Jump {
            target: end_label.clone(),
        });

        self.start_block(end_label);
        Ok(slot)
    }

    fn lower_eq_exp(&mut self, exp: &EqExp) -> Result<String, CompilerError> {
        match exp {
            EqExp::Rel(inner) => self.lower_rel_exp(inner),
            EqExp::Eq { lhs, op, rhs } => {
                let lhs_name = self.lower_eq_exp(lhs)?;
                let rhs_name = self.lower_rel_exp(rhs)?;
                let op = if op == "==" { BinaryOp::Eq } else { BinaryOp::Ne };
                Ok(self.emit_binary(op, lhs_name, rhs_name))
            }
        }
    }

    fn lower_rel_exp(&mut self, exp: &RelExp) -> Result<String, CompilerError> {
        match exp {
            RelExp::Add(inner) => self.lower_add_exp(inner),
            RelExp::Rel { lhs, op, rhs } => {
                let lhs_name = self.lower_rel_exp(lhs)?;
                let rhs_name = self.lower_add_exp(rhs)?;
                let op = match op.as_str() {
                    "<" => BinaryOp::Lt,
                    ">" => BinaryOp::Gt,
                    "<=" => BinaryOp::Le,
                    _ => BinaryOp::Ge,
                };
                Ok(self.emit_binary(op, lhs_name, rhs_name))
            }
        }
    }

    fn lower_add_exp(&mut self, exp: &AddExp) -> Result<String, CompilerError> {
        match exp {
            AddExp::Mul(inner) => self.lower_mul_exp(inner),
            AddExp::Add { lhs, op, rhs } => {
                let lhs_name = self.lower_add_exp(lhs)?;
                let rhs_name = self.lower_mul_exp(rhs)?;
                let op = if op == "+" { BinaryOp::Add } else { BinaryOp::Sub };
                Ok(self.emit_binary(op, lhs_name, rhs_name))
            }
        }
    }

    fn lower_mul_exp(&mut self, exp: &MulExp) -> Result<String, CompilerError> {
        match exp {
            MulExp::Unary(inner) => self.lower_unary_exp(inner),
            MulExp::Mul { lhs, op, rhs } => {
                let lhs_name = self.lower_mul_exp(lhs)?;
                let rhs_name = self.lower_unary_exp(rhs)?;
                let op = match op.as_str() {
                    "*" => BinaryOp::Mul,
                    "/" => BinaryOp::Div,
                    _ => BinaryOp::Mod,
                };
                Ok(self.emit_binary(op, lhs_name, rhs_name))
            }
        }
    }

    fn lower_unary_exp(&mut self, exp: &UnaryExp) -> Result<String, CompilerError> {
        match exp {
            UnaryExp::Primary(inner) => self.lower_primary_exp(inner),
            UnaryExp::Unary { op, exp } => {
                let operand = self.lower_unary_exp(exp)?;
                match op.as_str() {
                    "+" => Ok(operand),
                    "-" => Ok(self.emit_binary_imm(BinaryOp::Sub, Operand::Integer(0), operand)),
                    _ => Ok(self.emit_binary_imm(BinaryOp::Eq, Operand::Integer(0), operand)),
                }
            }
            UnaryExp::Call(call) => self.lower_func_call(call),
        }
    }

    fn lower_primary_exp(&mut self, exp: &PrimaryExp) -> Result<String, CompilerError> {
        match exp {
            PrimaryExp::Paren(inner) => self.lower_exp(inner),
            // Normalize literals to named temporaries; constant propagation
            // folds the `add 0, n` away.
            PrimaryExp::Number(value) => {
                let name = self.fresh_tmp();
                self.push_inst(Value::Binary {
                    name: name.clone(),
                    op: BinaryOp::Add,
                    lhs: Operand::Integer(0),
                    rhs: Operand::Integer(*value),
                });
                Ok(name)
            }
            PrimaryExp::LVal(lval) => self.lookup_var_slot(&lval.ident),
        }
    }

    fn lower_func_call(&mut self, call: &FuncCall) -> Result<String, CompilerError> {
        let (_, info) = self.symtab.query_sym(&call.ident);
        let ret_type = match info.kind {
            SymbolKind::IntFunction => Type::Int32,
            SymbolKind::VoidFunction => Type::Unit,
            SymbolKind::Var => return Err(CompilerError::NotAFunction(call.ident.clone())),
            SymbolKind::Undefined => {
                return Err(CompilerError::UndeclaredFunction(call.ident.clone()))
            }
        };

        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            let name = self.lower_exp(arg)?;
            args.push(Operand::VarRef(name));
        }

        let name = if ret_type.is_int32() {
            Some(self.fresh_tmp())
        } else {
            None
        };
        let result = name.clone().unwrap_or_default();
        self.push_inst(Value::Call {
            name,
            callee: format!("@{}", call.ident),
            args,
            ret_type,
        });
        Ok(result)
    }

    /// Emit a binary instruction over two named operands.
    fn emit_binary(&mut self, op: BinaryOp, lhs: String, rhs: String) -> String {
        let name = self.fresh_tmp();
        self.push_inst(Value::Binary {
            name: name.clone(),
            op,
            lhs: Operand::VarRef(lhs),
            rhs: Operand::VarRef(rhs),
        });
        name
    }

    /// Emit a binary instruction with a literal left operand.
    fn emit_binary_imm(&mut self, op: BinaryOp, lhs: Operand, rhs: String) -> String {
        let name = self.fresh_tmp();
        self.push_inst(Value::Binary {
            name: name.clone(),
            op,
            lhs,
            rhs: Operand::VarRef(rhs),
        });
        name
    }
}
