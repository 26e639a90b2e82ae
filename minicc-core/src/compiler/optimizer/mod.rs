//! Optimization Passes
//!
//! This module provides the optimization pipeline over the IR.
//!
//! # Optimization Passes
//! - **Constant Propagation**: forward dataflow constant propagation with
//!   folding, branch simplification and unreachable block pruning
//! - **Function Inlining**: substitute small, straight-line callees at their
//!   call sites
//!
//! # Optimization Levels
//! - **None**: leave the IR untouched
//! - **Basic**: constant propagation only
//! - **Aggressive**: constant propagation, then inlining (depth 1, size 10)
//!
//! The conservative preset (size 6) is kept for callers that want inlining
//! with a tighter size budget.

pub mod constprop;
pub mod inlining;

use crate::compiler::ir::instruction::Program;
pub use constprop::ConstantPropagation;
pub use inlining::InlineOptimizer;

/// Optimization level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationLevel {
    /// No optimizations
    None,
    /// Basic optimizations (constant propagation)
    Basic,
    /// All optimizations (constant propagation + inlining)
    Aggressive,
}

/// Inlining limits: transitive depth and callee size in instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineLimits {
    pub depth: usize,
    pub size: usize,
}

impl InlineLimits {
    /// Default limits of the aggressive level.
    pub const DEFAULT: InlineLimits = InlineLimits { depth: 1, size: 10 };
    /// Conservative limits: only very small callees are inlined.
    pub const CONSERVATIVE: InlineLimits = InlineLimits { depth: 1, size: 6 };
}

/// Optimizer applying the configured passes in order.
pub struct Optimizer {
    constant_propagation: bool,
    function_inlining: bool,
    inline_limits: InlineLimits,
}

impl Optimizer {
    /// Create a new optimizer with the specified level.
    pub fn new(level: OptimizationLevel) -> Self {
        match level {
            OptimizationLevel::None => Self {
                constant_propagation: false,
                function_inlining: false,
                inline_limits: InlineLimits::DEFAULT,
            },
            OptimizationLevel::Basic => Self {
                constant_propagation: true,
                function_inlining: false,
                inline_limits: InlineLimits::DEFAULT,
            },
            OptimizationLevel::Aggressive => Self {
                constant_propagation: true,
                function_inlining: true,
                inline_limits: InlineLimits::DEFAULT,
            },
        }
    }

    /// Override the inlining limits.
    pub fn with_inline_limits(mut self, limits: InlineLimits) -> Self {
        self.inline_limits = limits;
        self
    }

    /// Run the configured passes over `program` in place.
    pub fn optimize(&self, program: &mut Program) {
        if self.constant_propagation {
            log::debug!("running constant propagation");
            ConstantPropagation::optimize(program);
        }

        if self.function_inlining {
            log::debug!(
                "running inliner (depth limit {}, size limit {})",
                self.inline_limits.depth,
                self.inline_limits.size
            );
            let mut inliner = InlineOptimizer::new(self.inline_limits.depth, self.inline_limits.size);
            inliner.optimize(program);
        }
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(OptimizationLevel::Basic)
    }
}
