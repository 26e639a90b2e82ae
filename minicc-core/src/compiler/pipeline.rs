//! Compilation Pipeline
//!
//! Orchestrates the full compilation in stage order: parse, lower to IR,
//! optimize, and emit RV32 assembly. Each stage is logged, and simple
//! statistics are collected for the CLI's `--stats` output.
//!
//! The pipeline is a pure function from source text to output text: it never
//! touches the filesystem and fails atomically with the first error.

use crate::compiler::codegen::CodeGenerator;
use crate::compiler::ir::builder::{lower_with_options, LoweringOptions};
use crate::compiler::ir::instruction::Program;
use crate::compiler::optimizer::{InlineLimits, OptimizationLevel, Optimizer};
use crate::compiler::parser;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// What the pipeline should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Indented AST dump.
    Ast,
    /// IR as lowered, unoptimized.
    Ir,
    /// IR after the optimization passes.
    OptimizedIr,
    /// RV32 assembly from unoptimized IR.
    Asm,
    /// RV32 assembly from optimized IR.
    OptimizedAsm,
}

/// Pipeline configuration.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Inlining limits used by the optimizing modes.
    pub inline_limits: InlineLimits,
    /// Short-circuit lowering of `&&`/`||` (off by default for
    /// compatibility with the bitwise lowering).
    pub short_circuit: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            inline_limits: InlineLimits::DEFAULT,
            short_circuit: false,
        }
    }
}

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineStats {
    pub functions: usize,
    pub basic_blocks: usize,
    pub instructions: usize,
    pub optimized: bool,
}

impl PipelineStats {
    fn of_program(program: &Program, optimized: bool) -> Self {
        Self {
            functions: program.funcs.len(),
            basic_blocks: program.funcs.iter().map(|f| f.bbs.len()).sum(),
            instructions: program.funcs.iter().map(|f| f.inst_count()).sum(),
            optimized,
        }
    }
}

/// Compilation pipeline orchestrator.
pub struct CompilerPipeline;

impl CompilerPipeline {
    /// Compile `source` into the requested output.
    ///
    /// # Errors
    /// Returns the first front-end, lowering or code generation error.
    pub fn run(
        source: &str,
        kind: OutputKind,
        options: &PipelineOptions,
    ) -> Result<(String, PipelineStats)> {
        log::info!("parsing source ({} bytes)", source.len());
        let unit = parser::parse(source)?;

        if kind == OutputKind::Ast {
            let mut out = String::new();
            unit.dump(&mut out, 0);
            return Ok((out, PipelineStats::default()));
        }

        log::info!("lowering to IR");
        let lowering = LoweringOptions {
            short_circuit: options.short_circuit,
        };
        let mut program = lower_with_options(&unit, lowering)?;

        let optimized = matches!(kind, OutputKind::OptimizedIr | OutputKind::OptimizedAsm);
        if optimized {
            log::info!("optimizing IR");
            Optimizer::new(OptimizationLevel::Aggressive)
                .with_inline_limits(options.inline_limits)
                .optimize(&mut program);
        }

        let stats = PipelineStats::of_program(&program, optimized);
        log::info!(
            "{} function(s), {} block(s), {} instruction(s)",
            stats.functions,
            stats.basic_blocks,
            stats.instructions
        );

        let output = match kind {
            OutputKind::Ir | OutputKind::OptimizedIr => program.to_string(),
            _ => {
                log::info!("emitting RV32 assembly");
                CodeGenerator::generate(&program)?
            }
        };

        Ok((output, stats))
    }
}
