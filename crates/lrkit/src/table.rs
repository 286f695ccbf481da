//! Parsing table derived from the LR(1) automaton.

use crate::{
    first_follow::FirstSets,
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    lr1::{Automaton, StateID},
    types::Map,
    util::display_fn,
};
use lrkit_runtime::definition::ParseAction;
use std::fmt;

/// An entry of the ACTION table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),
    /// Reduce to the specified production rule.
    Reduce(RuleID),
    Accept,
}

/// A table cell that received more than one distinct value.
#[derive(Debug)]
pub struct Conflict<'t> {
    pub state: StateID,
    pub terminal: TerminalID,
    /// The registered actions, the first of which is the one in effect.
    pub actions: &'t [Action],
}

#[derive(Debug)]
pub struct ParseTable {
    // Every cell keeps all of its registered values, but only the first
    // one is ever consulted.
    actions: Map<StateID, Map<TerminalID, Vec<Action>>>,
    gotos: Map<StateID, Map<NonterminalID, Vec<StateID>>>,
    productions: Map<RuleID, (NonterminalID, usize)>,
    is_lr1: bool,
}

impl ParseTable {
    /// Derive the parsing table of `grammar` via its canonical LR(1) automaton.
    pub fn generate<A>(grammar: &Grammar<A>) -> Self {
        let firsts = FirstSets::compute(grammar);
        let automaton = Automaton::generate(grammar, &firsts);
        Self::from_automaton(grammar, &automaton)
    }

    pub fn from_automaton<A>(grammar: &Grammar<A>, automaton: &Automaton) -> Self {
        let mut table = Self {
            actions: Map::default(),
            gotos: Map::default(),
            productions: grammar
                .rules
                .values()
                .map(|rule| (rule.id(), (rule.left(), rule.right().len())))
                .collect(),
            is_lr1: true,
        };

        for (id, state) in automaton.states() {
            table.actions.insert(id, Map::default());
            table.gotos.insert(id, Map::default());

            for (core, lookaheads) in state.items() {
                let rule = grammar.rule(core.rule);
                match rule.right().get(core.marker) {
                    None if core.rule == RuleID::ACCEPT => {
                        table.register_action(id, TerminalID::EOI, Action::Accept);
                    }
                    None => {
                        for lookahead in lookaheads.iter() {
                            table.register_action(id, lookahead, Action::Reduce(core.rule));
                        }
                    }
                    Some(SymbolID::T(t)) => {
                        if let Some(next) = state.transition(SymbolID::T(*t)) {
                            table.register_action(id, *t, Action::Shift(next));
                        }
                    }
                    Some(SymbolID::N(n)) => {
                        if let Some(next) = state.transition(SymbolID::N(*n)) {
                            table.register_goto(id, *n, next);
                        }
                    }
                }
            }
        }

        for conflict in table.conflicts() {
            tracing::warn!(
                state = %conflict.state,
                lookahead = %grammar.terminals[&conflict.terminal],
                actions = ?conflict.actions,
                "conflicting actions in parsing table"
            );
        }

        table
    }

    /// Register an action and return whether the cell was previously empty.
    ///
    /// The first registered value stays in effect.
    pub fn register_action(
        &mut self,
        state: StateID,
        terminal: TerminalID,
        action: Action,
    ) -> bool {
        let cell = self
            .actions
            .entry(state)
            .or_default()
            .entry(terminal)
            .or_default();
        let was_empty = cell.is_empty();
        if !cell.contains(&action) {
            cell.push(action);
        }
        self.is_lr1 &= cell.len() == 1;
        was_empty
    }

    /// Register a goto entry and return whether the cell was previously empty.
    pub fn register_goto(&mut self, state: StateID, symbol: NonterminalID, next: StateID) -> bool {
        let cell = self
            .gotos
            .entry(state)
            .or_default()
            .entry(symbol)
            .or_default();
        let was_empty = cell.is_empty();
        if !cell.contains(&next) {
            cell.push(next);
        }
        self.is_lr1 &= cell.len() == 1;
        was_empty
    }

    /// Return `true` if no cell ever received a second, different value.
    pub fn is_lr1(&self) -> bool {
        self.is_lr1
    }

    pub fn num_states(&self) -> usize {
        self.actions.len()
    }

    /// The action in effect for the given state and lookahead symbol.
    pub fn action(&self, state: StateID, terminal: TerminalID) -> Option<Action> {
        self.actions.get(&state)?.get(&terminal)?.first().copied()
    }

    pub fn goto(&self, state: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.gotos.get(&state)?.get(&symbol)?.first().copied()
    }

    /// Enumerate the ACTION cells holding more than one value.
    pub fn conflicts(&self) -> impl Iterator<Item = Conflict<'_>> + '_ {
        self.actions.iter().flat_map(|(state, row)| {
            row.iter()
                .filter(|(_, cell)| cell.len() > 1)
                .map(move |(terminal, cell)| Conflict {
                    state: *state,
                    terminal: *terminal,
                    actions: &cell[..],
                })
        })
    }

    pub fn display<'g, A>(&'g self, g: &'g Grammar<A>) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, (state, row)) in self.actions.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:02}", state)?;
                writeln!(f, "## actions")?;
                for (terminal, cell) in row {
                    let token = &g.terminals[terminal];
                    for (j, action) in cell.iter().enumerate() {
                        let mark = if j == 0 { "" } else { "  (ignored)" };
                        match action {
                            Action::Shift(next) => {
                                writeln!(f, "- {} => shift({:02}){}", token, next, mark)?
                            }
                            Action::Reduce(rule) => writeln!(
                                f,
                                "- {} => reduce({}){}",
                                token,
                                g.rule(*rule).display(g),
                                mark
                            )?,
                            Action::Accept => writeln!(f, "- {} => accept{}", token, mark)?,
                        }
                    }
                }
                writeln!(f, "## gotos")?;
                if let Some(gotos) = self.gotos.get(state) {
                    for (symbol, cell) in gotos {
                        for next in cell {
                            writeln!(f, "- {} => goto({:02})", g.nonterminals[symbol], next)?;
                        }
                    }
                }
            }
            Ok(())
        })
    }
}

impl lrkit_runtime::definition::ParseTable for ParseTable {
    type State = StateID;
    type Terminal = TerminalID;
    type Nonterminal = NonterminalID;
    type Rule = RuleID;

    fn initial_state(&self) -> StateID {
        StateID::START
    }

    fn action(
        &self,
        current: StateID,
        lookahead: TerminalID,
    ) -> Option<ParseAction<StateID, RuleID>> {
        self.action(current, lookahead).map(|action| match action {
            Action::Shift(next) => ParseAction::Shift(next),
            Action::Reduce(rule) => ParseAction::Reduce(rule),
            Action::Accept => ParseAction::Accept,
        })
    }

    fn goto(&self, current: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.goto(current, symbol)
    }

    fn production(&self, rule: RuleID) -> (NonterminalID, usize) {
        // every rule of the grammar is registered by `from_automaton`.
        self.productions[&rule]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    #[test]
    fn first_writer_wins() {
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(a)], ())?;
            Ok(())
        })
        .unwrap();
        let a = g.terminals.values().find(|t| t.name() == "a").unwrap().id();
        let mut table = ParseTable::generate(&g);
        assert!(table.is_lr1());

        let state = StateID::START;
        let before = table.action(state, a);
        assert!(matches!(before, Some(Action::Shift(..))));

        // the same value again does not make the cell inconsistent.
        assert!(!table.register_action(state, a, before.unwrap()));
        assert!(table.is_lr1());

        let rule = g.rules_of(g.start_symbol).next().unwrap().id();
        assert!(!table.register_action(state, a, Action::Reduce(rule)));
        assert!(!table.is_lr1());
        assert_eq!(table.action(state, a), before);
        assert_eq!(table.conflicts().count(), 1);
    }

    #[test]
    fn accepts_on_end_of_input() {
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(a)], ())?;
            Ok(())
        })
        .unwrap();
        let table = ParseTable::generate(&g);
        let after_s = table.goto(StateID::START, g.start_symbol).unwrap();
        assert_eq!(table.action(after_s, TerminalID::EOI), Some(Action::Accept));
    }

    #[test]
    fn productions_of_every_rule() {
        use lrkit_runtime::definition::ParseTable as _;

        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            let l = g.nonterminal("L")?;
            g.rule(s, [N(l)], ())?;
            g.rule(l, [N(l), T(a)], ())?;
            g.rule(l, [], ())?;
            Ok(())
        })
        .unwrap();
        let table = ParseTable::generate(&g);
        for rule in g.rules.values() {
            assert_eq!(
                table.production(rule.id()),
                (rule.left(), rule.right().len())
            );
        }
    }
}
