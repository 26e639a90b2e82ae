//! Intermediate Representation
//!
//! The IR is a typed, block-structured three-address representation shared by
//! the lowering pass, the optimizers and the RV32 backend.

pub mod builder;
pub mod instruction;

// Re-export commonly used types
pub use instruction::{
    BasicBlock, BinaryOp, FuncArgRef, Function, Operand, Program, Type, Value,
};
