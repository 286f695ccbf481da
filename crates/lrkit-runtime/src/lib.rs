//! Runtime implementation of the table-driven LR(1) parser.

pub mod definition;
pub mod parser;
pub mod replay;

pub use crate::{
    definition::{ParseAction, ParseTable},
    parser::{parse, Derivation, Operation, ParseError, Parser, Token},
    replay::{replay, Reducer, ReplayError},
};
