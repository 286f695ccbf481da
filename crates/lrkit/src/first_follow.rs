//! Calculation of FIRST and FOLLOW sets.

use crate::{
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    types::{Map, TerminalSet},
};

/// The FIRST set of a symbol or a string of symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirstSet {
    pub terminals: TerminalSet,
    /// Whether the empty string can be derived.
    pub epsilon: bool,
}

impl FirstSet {
    /// Merge `other` into this set and return whether anything was added.
    fn absorb(&mut self, other: &FirstSet) -> bool {
        let mut changed = self.terminals.union_with(&other.terminals);
        if other.epsilon && !self.epsilon {
            self.epsilon = true;
            changed = true;
        }
        changed
    }

    /// Return whether this set contains every element of `other`.
    pub fn is_superset(&self, other: &FirstSet) -> bool {
        self.terminals.is_superset(&other.terminals) && (self.epsilon || !other.epsilon)
    }
}

#[derive(Debug, Clone)]
pub struct FirstSets {
    symbols: Map<SymbolID, FirstSet>,
    // FIRST of the right-hand side of each production.
    productions: Map<RuleID, FirstSet>,
}

impl FirstSets {
    /// Create the initial state of the fixpoint iteration, where
    /// `FIRST(t) = {t}` for every terminal and all other sets are empty.
    pub fn new<A>(grammar: &Grammar<A>) -> Self {
        let mut symbols = Map::default();
        for id in grammar.terminals.keys() {
            symbols.insert(
                SymbolID::T(*id),
                FirstSet {
                    terminals: Some(*id).into_iter().collect(),
                    epsilon: false,
                },
            );
        }
        for id in grammar.nonterminals.keys() {
            symbols.insert(SymbolID::N(*id), FirstSet::default());
        }
        let productions = grammar
            .rules
            .keys()
            .map(|id| (*id, FirstSet::default()))
            .collect();
        Self {
            symbols,
            productions,
        }
    }

    /// Compute the FIRST sets of every symbol until no set grows.
    pub fn compute<A>(grammar: &Grammar<A>) -> Self {
        let mut sets = Self::new(grammar);
        let mut rounds = 0;
        while sets.propagate(grammar) {
            rounds += 1;
        }
        tracing::trace!(rounds, "FIRST sets reached fixpoint");
        sets
    }

    /// Run a single round of propagation over all productions.
    ///
    /// Returns `true` if any set has grown.
    pub fn propagate<A>(&mut self, grammar: &Grammar<A>) -> bool {
        let mut changed = false;
        for rule in grammar.rules.values() {
            let local = self.first_of(rule.right());
            if let Some(memo) = self.productions.get_mut(&rule.id()) {
                changed |= memo.absorb(&local);
            }
            if let Some(left) = self.symbols.get_mut(&SymbolID::N(rule.left())) {
                changed |= left.absorb(&local);
            }
        }
        changed
    }

    /// `FIRST(symbol)`
    pub fn get(&self, symbol: SymbolID) -> Option<&FirstSet> {
        self.symbols.get(&symbol)
    }

    /// `FIRST` of the right-hand side of a production.
    pub fn of_rule(&self, rule: RuleID) -> Option<&FirstSet> {
        self.productions.get(&rule)
    }

    /// `FIRST(X1 X2 ... Xn)`
    ///
    /// The result contains epsilon iff every symbol is nullable, including
    /// the case of the empty string.
    pub fn first_of(&self, symbols: &[SymbolID]) -> FirstSet {
        let mut res = FirstSet::default();
        for symbol in symbols {
            let Some(first) = self.symbols.get(symbol) else {
                return res;
            };
            res.terminals.union_with(&first.terminals);
            if !first.epsilon {
                return res;
            }
        }
        res.epsilon = true;
        res
    }

    /// `FIRST(beta x1) ∪ ... ∪ FIRST(beta xk)` for the lookaheads `x1 ... xk`.
    pub fn first_with_lookaheads(
        &self,
        beta: &[SymbolID],
        lookaheads: &TerminalSet,
    ) -> TerminalSet {
        let FirstSet {
            mut terminals,
            epsilon,
        } = self.first_of(beta);
        if epsilon {
            terminals.union_with(lookaheads);
        }
        terminals
    }

    pub fn is_nullable(&self, symbol: SymbolID) -> bool {
        self.symbols.get(&symbol).map_or(false, |f| f.epsilon)
    }

    /// Return whether each set in `self` contains the corresponding set in `other`.
    pub fn is_superset(&self, other: &FirstSets) -> bool {
        other.symbols.iter().all(|(symbol, set)| {
            self.symbols
                .get(symbol)
                .map_or(false, |mine| mine.is_superset(set))
        })
    }
}

#[derive(Debug, Clone)]
pub struct FollowSets {
    sets: Map<NonterminalID, TerminalSet>,
}

impl FollowSets {
    /// Create the initial state of the fixpoint iteration, where only the
    /// start symbol is followed by the end of input.
    pub fn new<A>(grammar: &Grammar<A>) -> Self {
        let mut sets: Map<NonterminalID, TerminalSet> = grammar
            .nonterminals
            .keys()
            .map(|id| (*id, TerminalSet::default()))
            .collect();
        for id in [NonterminalID::START, grammar.start_symbol] {
            if let Some(set) = sets.get_mut(&id) {
                set.insert(TerminalID::EOI);
            }
        }
        Self { sets }
    }

    pub fn compute<A>(grammar: &Grammar<A>, firsts: &FirstSets) -> Self {
        let mut sets = Self::new(grammar);
        while sets.propagate(grammar, firsts) {}
        sets
    }

    /// Run a single round of propagation over all productions.
    ///
    /// For each `X -> alpha Y beta`, `FIRST(beta)` is added to `FOLLOW(Y)`,
    /// and `FOLLOW(X)` as well when `beta` is nullable.
    pub fn propagate<A>(&mut self, grammar: &Grammar<A>, firsts: &FirstSets) -> bool {
        let mut changed = false;
        for rule in grammar.rules.values() {
            let right = rule.right();
            for (i, symbol) in right.iter().enumerate() {
                let SymbolID::N(y) = symbol else {
                    continue;
                };
                let beta = firsts.first_of(&right[i + 1..]);
                let mut added = beta.terminals;
                if beta.epsilon {
                    if let Some(follow_x) = self.sets.get(&rule.left()) {
                        added.union_with(follow_x);
                    }
                }
                if let Some(follow_y) = self.sets.get_mut(y) {
                    changed |= follow_y.union_with(&added);
                }
            }
        }
        changed
    }

    /// `FOLLOW(symbol)`
    pub fn get(&self, symbol: NonterminalID) -> Option<&TerminalSet> {
        self.sets.get(&symbol)
    }

    pub fn is_superset(&self, other: &FollowSets) -> bool {
        other.sets.iter().all(|(id, set)| {
            self.sets
                .get(id)
                .map_or(false, |mine| mine.is_superset(set))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    // E := T E'
    // E' := + T E' | ε
    // T := F T'
    // T' := * F T' | ε
    // F := ( E ) | id
    fn expr_grammar() -> Grammar {
        Grammar::define(|g| {
            let plus = g.terminal("PLUS")?;
            let star = g.terminal("STAR")?;
            let lparen = g.terminal("LPAREN")?;
            let rparen = g.terminal("RPAREN")?;
            let id = g.terminal("ID")?;

            let e = g.nonterminal("E")?;
            let e2 = g.nonterminal("E2")?;
            let t = g.nonterminal("T")?;
            let t2 = g.nonterminal("T2")?;
            let f = g.nonterminal("F")?;

            g.rule(e, [N(t), N(e2)], ())?;
            g.rule(e2, [T(plus), N(t), N(e2)], ())?;
            g.rule(e2, [], ())?;
            g.rule(t, [N(f), N(t2)], ())?;
            g.rule(t2, [T(star), N(f), N(t2)], ())?;
            g.rule(t2, [], ())?;
            g.rule(f, [T(lparen), N(e), T(rparen)], ())?;
            g.rule(f, [T(id)], ())?;
            Ok(())
        })
        .unwrap()
    }

    fn terminal(g: &Grammar, name: &str) -> TerminalID {
        g.terminals
            .values()
            .find(|t| t.name() == name)
            .map(|t| t.id())
            .unwrap()
    }

    fn nonterminal(g: &Grammar, name: &str) -> NonterminalID {
        g.nonterminals
            .values()
            .find(|n| n.name() == name)
            .map(|n| n.id())
            .unwrap()
    }

    fn names(g: &Grammar, set: &TerminalSet) -> Vec<String> {
        let mut names: Vec<_> = set.iter().map(|t| g.terminals[&t].name().to_owned()).collect();
        names.sort();
        names
    }

    #[test]
    fn first_of_terminal_is_itself() {
        let g = expr_grammar();
        let firsts = FirstSets::compute(&g);
        for id in g.terminals.keys() {
            let first = firsts.get(T(*id)).unwrap();
            assert_eq!(first.terminals.iter().collect::<Vec<_>>(), vec![*id]);
            assert!(!first.epsilon);
        }
    }

    #[test]
    fn first_sets() {
        let g = expr_grammar();
        let firsts = FirstSets::compute(&g);

        let e = firsts.get(N(nonterminal(&g, "E"))).unwrap();
        assert_eq!(names(&g, &e.terminals), ["ID", "LPAREN"]);
        assert!(!e.epsilon);

        let e2 = firsts.get(N(nonterminal(&g, "E2"))).unwrap();
        assert_eq!(names(&g, &e2.terminals), ["PLUS"]);
        assert!(e2.epsilon);

        assert!(firsts.first_of(&[]).epsilon);
        let t2 = nonterminal(&g, "T2");
        let e2 = nonterminal(&g, "E2");
        let both = firsts.first_of(&[N(t2), N(e2)]);
        assert_eq!(names(&g, &both.terminals), ["PLUS", "STAR"]);
        assert!(both.epsilon);
    }

    #[test]
    fn follow_sets() {
        let g = expr_grammar();
        let firsts = FirstSets::compute(&g);
        let follows = FollowSets::compute(&g, &firsts);

        let follow = |name: &str| names(&g, follows.get(nonterminal(&g, name)).unwrap());
        assert_eq!(follow("E"), ["$", "RPAREN"]);
        assert_eq!(follow("E2"), ["$", "RPAREN"]);
        assert_eq!(follow("T"), ["$", "PLUS", "RPAREN"]);
        assert_eq!(follow("F"), ["$", "PLUS", "RPAREN", "STAR"]);
        assert!(follows.get(nonterminal(&g, "T2")).unwrap().contains(terminal(&g, "PLUS")));
    }

    #[test]
    fn propagation_is_monotone() {
        let g = expr_grammar();

        let mut firsts = FirstSets::new(&g);
        let mut rounds = 0;
        loop {
            let before = firsts.clone();
            let changed = firsts.propagate(&g);
            assert!(firsts.is_superset(&before));
            if !changed {
                break;
            }
            rounds += 1;
            assert!(rounds < 100, "FIRST sets did not converge");
        }

        let mut follows = FollowSets::new(&g);
        let mut rounds = 0;
        loop {
            let before = follows.clone();
            let changed = follows.propagate(&g, &firsts);
            assert!(follows.is_superset(&before));
            if !changed {
                break;
            }
            rounds += 1;
            assert!(rounds < 100, "FOLLOW sets did not converge");
        }
    }
}
