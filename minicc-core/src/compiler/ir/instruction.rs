//! Intermediate Representation (IR) Instructions
//!
//! This module defines the intermediate representation produced by lowering
//! and consumed by the optimization passes and the RV32 backend.
//!
//! # IR Design
//! The IR is designed to be:
//! - **Simple**: a small set of three-address instructions
//! - **Optimizable**: operands are replaceable values, so constant folding is
//!   literal substitution
//! - **Block-structured**: every basic block ends in exactly one terminator
//!
//! # Naming
//! Two naming spaces exist. Local temporaries and parameter values carry `%`
//! prefixed names (`%0`, `%1`, `%inline_3`); function labels and named stack
//! allocations carry `@` prefixed names (`@main`, `@SYM_TABLE_1_x`). Operands
//! reference prior definitions by name; there are no pointers between
//! instructions, so ownership is a strict tree rooted at [`Program`].

use std::fmt;

/// A type in the IR.
///
/// Equality is structural (derived `PartialEq`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// 32-bit signed integer.
    Int32,
    /// Empty result, carried by statement-like instructions.
    Unit,
    /// Function type with parameter types and return type.
    Function { params: Vec<Type>, ret: Box<Type> },
}

impl Type {
    pub fn is_int32(&self) -> bool {
        matches!(self, Type::Int32)
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Type::Unit)
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function { .. })
    }

    /// Return type of a function type; `None` for non-function types.
    pub fn return_type(&self) -> Option<&Type> {
        match self {
            Type::Function { ret, .. } => Some(ret),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int32 => write!(f, "i32"),
            Type::Unit => write!(f, "()"),
            Type::Function { params, ret } => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, "): {}", ret)
            }
        }
    }
}

/// An instruction operand: an integer literal or a reference to a prior
/// definition by name.
///
/// Keeping literals and references in one sum type lets constant propagation
/// fold a value by replacing the operand in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Literal `i32` value, e.g. `255`.
    Integer(i32),
    /// Textual reference to a parameter, allocation or temporary.
    VarRef(String),
}

impl Operand {
    /// Referenced name, if this operand is a reference.
    pub fn name(&self) -> Option<&str> {
        match self {
            Operand::Integer(_) => None,
            Operand::VarRef(name) => Some(name),
        }
    }

    /// Literal value, if this operand is an integer.
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Operand::Integer(v) => Some(*v),
            Operand::VarRef(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Integer(v) => write!(f, "{}", v),
            Operand::VarRef(name) => write!(f, "{}", name),
        }
    }
}

/// Formal parameter of a function.
///
/// The name belongs to the `%` naming space and is bound to the incoming
/// argument register (or caller stack slot) by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncArgRef {
    /// Zero-based parameter index.
    pub index: usize,
    /// Parameter value name.
    pub name: String,
}

impl fmt::Display for FuncArgRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: i32", self.name)
    }
}

/// Binary operation codes.
///
/// Relational operators produce `i32` 0/1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BinaryOp {
    Ne = 0,
    Eq = 1,
    Gt = 2,
    Lt = 3,
    Ge = 4,
    Le = 5,
    Add = 6,
    Sub = 7,
    Mul = 8,
    Div = 9,
    Mod = 10,
    And = 11,
    Or = 12,
    Xor = 13,
    Shl = 14,
    Shr = 15,
    Sar = 16,
}

impl BinaryOp {
    /// Lowercase mnemonic used by the IR printer.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            BinaryOp::Ne => "ne",
            BinaryOp::Eq => "eq",
            BinaryOp::Gt => "gt",
            BinaryOp::Lt => "lt",
            BinaryOp::Ge => "ge",
            BinaryOp::Le => "le",
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Shl => "shl",
            BinaryOp::Shr => "shr",
            BinaryOp::Sar => "sar",
        }
    }
}

/// An IR instruction.
///
/// # Instruction Categories
/// - **Memory**: `Alloc`, `Load`, `Store`
/// - **Arithmetic**: `Binary`
/// - **Calls**: `Call`
/// - **Terminators**: `Return`, `Branch`, `Jump`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Reserve one `i32` stack slot; the result is the address name.
    Alloc { name: String },
    /// Read the slot referenced by `src` into `name`.
    Load { name: String, src: Operand },
    /// Write `value` into the slot referenced by `dest`. No result.
    Store { value: Operand, dest: Operand },
    /// Three-address arithmetic/relational operation.
    Binary {
        name: String,
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    },
    /// Call `callee` with `args`. `name` is absent iff `ret_type` is `Unit`.
    Call {
        name: Option<String>,
        callee: String,
        args: Vec<Operand>,
        ret_type: Type,
    },
    /// Terminator: return from the function, with a value unless the
    /// function's return type is `Unit`.
    Return { value: Option<Operand> },
    /// Terminator: two-way conditional branch. A zero condition takes the
    /// false label.
    Branch {
        cond: Operand,
        true_label: String,
        false_label: String,
    },
    /// Terminator: unconditional jump.
    Jump { target: String },
}

impl Value {
    /// Name defined by this instruction, if any.
    ///
    /// Definitions are produced by `Alloc`, `Load`, `Binary` and named `Call`
    /// instructions; everything else defines nothing.
    pub fn def_name(&self) -> Option<&str> {
        match self {
            Value::Alloc { name } => Some(name),
            Value::Load { name, .. } => Some(name),
            Value::Binary { name, .. } => Some(name),
            Value::Call { name, .. } => name.as_deref(),
            _ => None,
        }
    }

    /// Whether this instruction ends a basic block.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Value::Return { .. } | Value::Branch { .. } | Value::Jump { .. }
        )
    }

    /// Result type of this instruction.
    pub fn ty(&self) -> Type {
        match self {
            Value::Alloc { .. } | Value::Load { .. } | Value::Binary { .. } => Type::Int32,
            Value::Call { ret_type, .. } => ret_type.clone(),
            Value::Store { .. }
            | Value::Return { .. }
            | Value::Branch { .. }
            | Value::Jump { .. } => Type::Unit,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Alloc { name } => write!(f, "  {} = alloc i32", name),
            Value::Load { name, src } => write!(f, "  {} = load {}", name, src),
            Value::Store { value, dest } => write!(f, "  store {}, {}", value, dest),
            Value::Binary { name, op, lhs, rhs } => {
                write!(f, "  {} = {} {}, {}", name, op.mnemonic(), lhs, rhs)
            }
            Value::Call {
                name, callee, args, ..
            } => {
                write!(f, "  ")?;
                if let Some(name) = name {
                    write!(f, "{} = ", name)?;
                }
                write!(f, "call {}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Value::Return { value } => {
                write!(f, "  ret")?;
                if let Some(value) = value {
                    write!(f, " {}", value)?;
                }
                Ok(())
            }
            Value::Branch {
                cond,
                true_label,
                false_label,
            } => write!(f, "  br {}, {}, {}", cond, true_label, false_label),
            Value::Jump { target } => write!(f, "  jump {}", target),
        }
    }
}

/// A basic block: a label plus a straight-line instruction sequence.
///
/// A well-formed block's last instruction is a terminator; passes must
/// preserve this after every rewrite. Block labels begin with `%`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    /// Block label, `%` prefixed (`%entry`, `%then_0`, ...).
    pub name: String,
    /// Instructions in execution order.
    pub insts: Vec<Value>,
}

impl BasicBlock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            insts: Vec::new(),
        }
    }

    pub fn add_inst(&mut self, inst: Value) {
        self.insts.push(inst);
    }

    /// Whether the block already ends in a terminator.
    pub fn is_terminated(&self) -> bool {
        self.insts.last().map_or(false, Value::is_terminator)
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.name)?;
        for inst in &self.insts {
            writeln!(f, "{}", inst)?;
        }
        Ok(())
    }
}

/// An IR function: name, type, formal parameters and basic blocks in
/// declaration order. The first block is the entry (named `%entry`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Function label, `@` prefixed.
    pub name: String,
    /// Function type ([`Type::Function`]).
    pub ty: Type,
    /// Formal parameters in declaration order.
    pub params: Vec<FuncArgRef>,
    /// Basic blocks; the entry block comes first.
    pub bbs: Vec<BasicBlock>,
}

impl Function {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            params: Vec::new(),
            bbs: Vec::new(),
        }
    }

    pub fn add_param(&mut self, param: FuncArgRef) {
        self.params.push(param);
    }

    pub fn add_basic_block(&mut self, bb: BasicBlock) {
        self.bbs.push(bb);
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Declared return type.
    pub fn return_type(&self) -> &Type {
        self.ty.return_type().unwrap_or(&Type::Unit)
    }

    /// Total instruction count across all blocks.
    pub fn inst_count(&self) -> usize {
        self.bbs.iter().map(|bb| bb.insts.len()).sum()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fun {}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        writeln!(f, "): {} {{", self.return_type())?;
        for bb in &self.bbs {
            write!(f, "{}", bb)?;
        }
        writeln!(f, "}}")
    }
}

/// A whole program: functions in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub funcs: Vec<Function>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, func: Function) {
        self.funcs.push(func);
    }

    /// Look up a function by its `@` prefixed name.
    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.funcs.iter().find(|f| f.name == name)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for func in &self.funcs {
            writeln!(f, "{}", func)?;
        }
        Ok(())
    }
}
