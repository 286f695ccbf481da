//! Parse table definition.

/// The trait for abstracting a generated LR(1) parse table.
pub trait ParseTable {
    /// The number to identify the state of LR(1) automaton.
    type State: Copy;

    /// The number to identify the terminal symbols.
    type Terminal: Copy;

    /// The number to identify the nonterminal symbols.
    type Nonterminal: Copy;

    /// The number to identify the production rules.
    type Rule: Copy;

    /// Return the initial state number.
    fn initial_state(&self) -> Self::State;

    /// Return the action registered for the specified state and lookahead symbol.
    ///
    /// `None` means that the lookahead symbol is not acceptable in this state.
    fn action(
        &self,
        current: Self::State,
        lookahead: Self::Terminal,
    ) -> Option<ParseAction<Self::State, Self::Rule>>;

    /// Return the state to transition after reducing to `symbol` in the state `current`.
    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State>;

    /// Return the left-hand side and the length of right-hand side of a production rule.
    fn production(&self, rule: Self::Rule) -> (Self::Nonterminal, usize);
}

impl<T: ?Sized> ParseTable for &T
where
    T: ParseTable,
{
    type State = T::State;
    type Terminal = T::Terminal;
    type Nonterminal = T::Nonterminal;
    type Rule = T::Rule;

    fn initial_state(&self) -> Self::State {
        (**self).initial_state()
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Self::Terminal,
    ) -> Option<ParseAction<Self::State, Self::Rule>> {
        (**self).action(current, lookahead)
    }

    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State> {
        (**self).goto(current, symbol)
    }

    fn production(&self, rule: Self::Rule) -> (Self::Nonterminal, usize) {
        (**self).production(rule)
    }
}

impl<T: ?Sized> ParseTable for std::sync::Arc<T>
where
    T: ParseTable,
{
    type State = T::State;
    type Terminal = T::Terminal;
    type Nonterminal = T::Nonterminal;
    type Rule = T::Rule;

    fn initial_state(&self) -> Self::State {
        (**self).initial_state()
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Self::Terminal,
    ) -> Option<ParseAction<Self::State, Self::Rule>> {
        (**self).action(current, lookahead)
    }

    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State> {
        (**self).goto(current, symbol)
    }

    fn production(&self, rule: Self::Rule) -> (Self::Nonterminal, usize) {
        (**self).production(rule)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseAction<TState, TRule> {
    Shift(TState),
    Reduce(TRule),
    Accept,
}
