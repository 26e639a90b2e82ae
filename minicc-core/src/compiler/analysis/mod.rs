//! Analysis Module
//!
//! Static analyses over the IR: control flow graph construction and
//! live-variable analysis. Both operate per function and feed the register
//! allocator and the optimization passes.

pub mod control_flow;
pub mod liveness;

// Re-export commonly used types
pub use control_flow::ControlFlowGraph;
pub use liveness::{LiveInterval, LivenessAnalysis, LivenessAnalyzer};
