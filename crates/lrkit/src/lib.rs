//! An LR(1) parser generator.
//!
//! A grammar declared with [`Grammar::define`] is turned into a canonical
//! LR(1) automaton and then into a [`ParseTable`], which can be driven by
//! the shift-reduce engine in `lrkit-runtime`.

pub mod first_follow;
pub mod grammar;
pub mod lr1;
pub mod table;
pub mod types;
mod util;

pub use crate::{
    grammar::{Grammar, GrammarDef, GrammarDefError, NonterminalID, RuleID, SymbolID, TerminalID},
    table::ParseTable,
};
