//! Parser.

use crate::definition::{ParseAction, ParseTable};
use std::fmt;

/// A trait for abstracting token symbols.
pub trait Token<TTerm> {
    /// Return the terminal symbol corresponding to this token.
    fn to_index(&self) -> TTerm;
}

/// The kind of step performed by the parser.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operation {
    Shift,
    Reduce,
}

/// The result of a successful parse.
///
/// `reductions` lists the applied production rules in reduction order, and
/// `operations` records every shift/reduce step, so that the parse tree can
/// be rebuilt afterwards with [`replay`](crate::replay::replay).
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation<TRule> {
    pub reductions: Vec<TRule>,
    pub operations: Vec<Operation>,
}

/// The shift-reduce parser driven by a parse table.
#[derive(Debug)]
pub struct Parser<TDef>
where
    TDef: ParseTable,
{
    definition: TDef,
    state_stack: Vec<TDef::State>,
    cursor: usize,
    reductions: Vec<TDef::Rule>,
    operations: Vec<Operation>,
}

impl<TDef> Parser<TDef>
where
    TDef: ParseTable,
    TDef::State: fmt::Debug,
{
    /// Create an instance of `Parser` using the specified parse table.
    pub fn new(definition: TDef) -> Self {
        let initial_state = definition.initial_state();
        Self {
            definition,
            state_stack: vec![initial_state],
            cursor: 0,
            reductions: vec![],
            operations: vec![],
        }
    }

    /// Run the automaton over `tokens` until it accepts or gets stuck.
    ///
    /// The token sequence must be terminated by a token that maps to the
    /// end-of-input terminal.
    pub fn parse<'t, TTok>(
        mut self,
        tokens: &'t [TTok],
    ) -> Result<Derivation<TDef::Rule>, ParseError<'t, TTok, TDef::State>>
    where
        TTok: Token<TDef::Terminal> + fmt::Debug,
    {
        loop {
            let current = *self.state_stack.last().ok_or(ParseError::EmptyStack)?;
            let lookahead = tokens
                .get(self.cursor)
                .ok_or(ParseError::UnexpectedEOI)?;

            match self.definition.action(current, lookahead.to_index()) {
                Some(ParseAction::Shift(next)) => {
                    self.state_stack.push(next);
                    self.cursor += 1;
                    self.operations.push(Operation::Shift);
                }

                Some(ParseAction::Reduce(rule)) => {
                    let (left, n) = self.definition.production(rule);
                    // the bottom of the stack is the initial state and is never popped.
                    if n >= self.state_stack.len() {
                        return Err(ParseError::EmptyStack);
                    }
                    self.state_stack.truncate(self.state_stack.len() - n);

                    let top = *self.state_stack.last().ok_or(ParseError::EmptyStack)?;
                    let next = self
                        .definition
                        .goto(top, left)
                        .ok_or(ParseError::MissingGoto { state: top })?;
                    self.state_stack.push(next);
                    self.reductions.push(rule);
                    self.operations.push(Operation::Reduce);
                }

                Some(ParseAction::Accept) => {
                    return Ok(Derivation {
                        reductions: self.reductions,
                        operations: self.operations,
                    });
                }

                None => {
                    return Err(ParseError::UnexpectedToken {
                        token: lookahead,
                        position: self.cursor,
                        state: current,
                    });
                }
            }
        }
    }
}

/// Parse `tokens` with the specified parse table.
pub fn parse<'t, TDef, TTok>(
    definition: TDef,
    tokens: &'t [TTok],
) -> Result<Derivation<TDef::Rule>, ParseError<'t, TTok, TDef::State>>
where
    TDef: ParseTable,
    TDef::State: fmt::Debug,
    TTok: Token<TDef::Terminal> + fmt::Debug,
{
    Parser::new(definition).parse(tokens)
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError<'t, TTok, TState>
where
    TTok: fmt::Debug,
    TState: fmt::Debug,
{
    /// The table has no entry for the lookahead token in the current state.
    #[error("unexpected token at position {}", position)]
    UnexpectedToken {
        token: &'t TTok,
        position: usize,
        state: TState,
    },

    #[error("unexpected EOI")]
    UnexpectedEOI,

    #[error("missing goto entry in state {:?}", state)]
    MissingGoto { state: TState },

    #[error("empty state stack")]
    EmptyStack,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    // S' := S
    // S  := '(' S ')' | 'x'
    #[derive(Debug)]
    pub(crate) struct Parens;

    pub(crate) const EOI: u8 = 0;
    pub(crate) const LPAREN: u8 = 1;
    pub(crate) const RPAREN: u8 = 2;
    pub(crate) const X: u8 = 3;

    impl ParseTable for Parens {
        type State = u8;
        type Terminal = u8;
        type Nonterminal = ();
        type Rule = u8;

        fn initial_state(&self) -> u8 {
            0
        }

        fn action(&self, current: u8, lookahead: u8) -> Option<ParseAction<u8, u8>> {
            use ParseAction::*;
            match (current, lookahead) {
                (0 | 2, LPAREN) => Some(Shift(2)),
                (0 | 2, X) => Some(Shift(3)),
                (1, EOI) => Some(Accept),
                (3, RPAREN | EOI) => Some(Reduce(1)),
                (4, RPAREN) => Some(Shift(5)),
                (5, RPAREN | EOI) => Some(Reduce(0)),
                _ => None,
            }
        }

        fn goto(&self, current: u8, _: ()) -> Option<u8> {
            match current {
                0 => Some(1),
                2 => Some(4),
                _ => None,
            }
        }

        fn production(&self, rule: u8) -> ((), usize) {
            match rule {
                0 => ((), 3),
                _ => ((), 1),
            }
        }
    }

    impl Token<u8> for (u8, char) {
        fn to_index(&self) -> u8 {
            self.0
        }
    }

    pub(crate) fn tokenize(input: &str) -> Vec<(u8, char)> {
        input
            .chars()
            .map(|ch| match ch {
                '(' => (LPAREN, ch),
                ')' => (RPAREN, ch),
                _ => (X, ch),
            })
            .chain(Some((EOI, '$')))
            .collect()
    }

    #[test]
    fn accepts_nested_parens() {
        let tokens = tokenize("((x))");
        let derivation = parse(&Parens, &tokens).unwrap();

        assert_eq!(derivation.reductions, vec![1, 0, 0]);
        use Operation::*;
        assert_eq!(
            derivation.operations,
            vec![Shift, Shift, Shift, Reduce, Shift, Reduce, Shift, Reduce]
        );
    }

    #[test]
    fn reports_offending_token() {
        let tokens = tokenize("(x");
        match parse(&Parens, &tokens) {
            Err(ParseError::UnexpectedToken {
                token,
                position,
                state,
            }) => {
                assert_eq!(*token, (EOI, '$'));
                assert_eq!(position, 2);
                assert_eq!(state, 4);
            }
            res => panic!("unexpected result: {:?}", res),
        }
    }

    #[test]
    fn missing_end_of_input() {
        let tokens = vec![(X, 'x')];
        assert!(matches!(
            parse(&Parens, &tokens),
            Err(ParseError::UnexpectedEOI)
        ));
    }
}
