//! Compiler Error Handling
//!
//! This module provides the error types for the compiler using `thiserror`.
//!
//! # Error Categories
//! - **Front-end errors**: lexing and parsing failures
//! - **Lowering errors**: semantic violations found while building IR
//! - **Code generation errors**: malformed IR reaching the backend
//!
//! All errors are fatal: the compiler is a pure function from source text to
//! either a diagnostic or output text, with no retries and no partial output.

use thiserror::Error;

/// Compiler error types.
///
/// Uses `thiserror` for zero-cost error handling with detailed error messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompilerError {
    /// Lexical error.
    ///
    /// Occurs when the source text contains a character sequence that is not
    /// part of any MiniC token.
    #[error("lexical error at line {line}: {message}")]
    LexError { line: usize, message: String },

    /// Parse error.
    ///
    /// Occurs when the token stream does not match the MiniC grammar.
    #[error("parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Unsupported type in a declaration or signature (`int`/`void` only).
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Redeclaration of a name in the same scope.
    #[error("redeclaration of '{0}' in the same scope")]
    Redeclaration(String),

    /// Reference to an identifier with no visible declaration.
    #[error("use of unbound identifier '{0}'")]
    UnboundIdentifier(String),

    /// `return;` inside a function whose return type is `int`.
    #[error("function '{0}' must return a value")]
    MissingReturnValue(String),

    /// Call to a name that was never declared.
    #[error("call to undeclared function '{0}'")]
    UndeclaredFunction(String),

    /// Call to a symbol that is not a function.
    #[error("'{0}' is not a function")]
    NotAFunction(String),

    /// `break`/`continue` with no enclosing `while`.
    #[error("'{0}' outside of a loop")]
    OutsideLoop(String),

    /// Code generation error.
    ///
    /// Occurs when the backend meets IR it cannot translate (an instruction
    /// kind at a statement position it has no handler for, or an operand with
    /// no assigned location).
    #[error("code generation error: {0}")]
    CodegenError(String),
}
