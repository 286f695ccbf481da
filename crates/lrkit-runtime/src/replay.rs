//! Rebuilding parse results from a recorded derivation.

use crate::{
    definition::ParseTable,
    parser::{Derivation, Operation},
};
use std::fmt;

/// The semantic actions invoked while replaying a derivation.
pub trait Reducer<TRule, TTok> {
    /// The value built for every grammar symbol.
    type Value;

    /// The error type returned from the actions.
    type Error;

    /// Convert a shifted token into a value.
    fn shift(&mut self, token: &TTok) -> Result<Self::Value, Self::Error>;

    /// Build the value of the left-hand side of `rule` from the values of its
    /// right-hand side, in source order.
    fn reduce(&mut self, rule: TRule, args: Vec<Self::Value>) -> Result<Self::Value, Self::Error>;
}

/// Replay the operations recorded in `derivation` bottom-up and return the
/// value of the root symbol.
pub fn replay<TDef, TTok, R>(
    definition: &TDef,
    derivation: &Derivation<TDef::Rule>,
    tokens: &[TTok],
    reducer: &mut R,
) -> Result<R::Value, ReplayError<R::Error>>
where
    TDef: ParseTable,
    R: Reducer<TDef::Rule, TTok>,
    R::Error: fmt::Debug + fmt::Display,
{
    let mut stack: Vec<R::Value> = vec![];
    let mut tokens = tokens.iter();
    let mut reductions = derivation.reductions.iter();

    for operation in &derivation.operations {
        match operation {
            Operation::Shift => {
                let token = tokens.next().ok_or(ReplayError::TokensExhausted)?;
                stack.push(reducer.shift(token).map_err(ReplayError::Action)?);
            }
            Operation::Reduce => {
                let rule = *reductions.next().ok_or(ReplayError::ReductionsExhausted)?;
                let (_, n) = definition.production(rule);
                if n > stack.len() {
                    return Err(ReplayError::StackUnderflow);
                }
                let args = stack.split_off(stack.len() - n);
                stack.push(reducer.reduce(rule, args).map_err(ReplayError::Action)?);
            }
        }
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(root), true) => Ok(root),
        (root, _) => Err(ReplayError::UnexpectedRoots {
            count: stack.len() + usize::from(root.is_some()),
        }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReplayError<E>
where
    E: fmt::Debug + fmt::Display,
{
    #[error("reduction action failed: {}", _0)]
    Action(E),

    #[error("the derivation shifts more tokens than given")]
    TokensExhausted,

    #[error("the derivation has fewer reductions than reduce operations")]
    ReductionsExhausted,

    #[error("not enough values on the stack for a reduction")]
    StackUnderflow,

    #[error("expected exactly one root value, found {}", count)]
    UnexpectedRoots { count: usize },
}
