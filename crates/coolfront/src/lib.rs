//! A front end for COOL: scanning, LR(1) parsing and semantic analysis.

pub mod ast;
pub mod diagnostics;
pub mod grammar;
pub mod lexer;
pub mod pipeline;
pub mod semantic;

pub use crate::{
    diagnostics::{Diagnostic, ErrorKind, Position},
    pipeline::{compile, Analysis, CompileError, Config},
};
