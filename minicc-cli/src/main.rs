// CLI application
use anyhow::Context;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use minicc_core::compiler::optimizer::InlineLimits;
use minicc_core::compiler::pipeline::{CompilerPipeline, OutputKind, PipelineOptions};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "minicc")]
#[command(about = "MiniC compiler targeting RV32 assembly")]
#[command(version)]
struct Cli {
    /// Source file; standard input when omitted
    input: Option<PathBuf>,

    /// What to emit
    #[arg(long, value_enum, default_value_t = Emit::Asm)]
    emit: Emit,

    /// Use the conservative inlining size budget
    #[arg(long)]
    conservative_inline: bool,

    /// Lower `&&`/`||` with short-circuit control flow
    #[arg(long)]
    short_circuit: bool,

    /// Print pipeline statistics as JSON on stderr
    #[arg(long)]
    stats: bool,

    /// Show a progress spinner
    #[arg(long)]
    progress: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Indented AST dump
    Ast,
    /// Unoptimized IR
    Ir,
    /// Optimized IR
    OptIr,
    /// RV32 assembly
    Asm,
    /// RV32 assembly from optimized IR
    OptAsm,
}

impl From<Emit> for OutputKind {
    fn from(emit: Emit) -> Self {
        match emit {
            Emit::Ast => OutputKind::Ast,
            Emit::Ir => OutputKind::Ir,
            Emit::OptIr => OutputKind::OptimizedIr,
            Emit::Asm => OutputKind::Asm,
            Emit::OptAsm => OutputKind::OptimizedAsm,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let source = match &cli.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read standard input")?;
            buffer
        }
    };

    let options = PipelineOptions {
        inline_limits: if cli.conservative_inline {
            InlineLimits::CONSERVATIVE
        } else {
            InlineLimits::DEFAULT
        },
        short_circuit: cli.short_circuit,
    };

    let pb = cli.progress.then(|| create_progress_bar("Compiling..."));
    let (output, stats) = CompilerPipeline::run(&source, cli.emit.into(), &options)?;
    if let Some(pb) = pb {
        pb.finish_with_message("Compilation complete");
    }

    print!("{}", output);

    if cli.stats {
        eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    }

    Ok(())
}

fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb
}
