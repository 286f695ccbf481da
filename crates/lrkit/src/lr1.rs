//! The implementation of canonical LR(1) automaton.

use crate::{
    first_follow::FirstSets,
    grammar::{Grammar, RuleID, SymbolID, TerminalID},
    types::{Map, TerminalSet},
    util::display_fn,
};
use std::{
    collections::{BTreeMap, VecDeque},
    fmt,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID {
    raw: u32,
}

impl StateID {
    pub const START: Self = Self::new(0);

    const fn new(raw: u32) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u32 {
        self.raw
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

// LR(1) item
// X: Y1 Y2 ... Yn という構文規則があったとき、それにマーカ位置を付与したもの
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LRItemCore {
    pub rule: RuleID,
    pub marker: usize,
}

impl LRItemCore {
    pub fn display<'g, A>(&'g self, g: &'g Grammar<A>) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let rule = g.rule(self.rule);
            write!(f, "({} :=", g.nonterminals[&rule.left()])?;
            for (i, symbol) in rule.right().iter().enumerate() {
                if i == self.marker {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if self.marker == rule.right().len() {
                f.write_str(" .")?;
            }
            f.write_str(")")
        })
    }
}

/// An item set, where items sharing the same core are merged and their
/// lookahead symbols are united.
pub type LRItemSet = BTreeMap<LRItemCore, TerminalSet>;

type Kernel = Vec<(LRItemCore, TerminalSet)>;

#[derive(Debug)]
pub struct State {
    items: LRItemSet,
    transitions: Map<SymbolID, StateID>,
}

impl State {
    /// Return the items in this state, including its closure.
    pub fn items(&self) -> impl Iterator<Item = (&LRItemCore, &TerminalSet)> + '_ {
        self.items.iter()
    }

    /// Return the successor states, keyed by the transition symbol.
    pub fn transitions(&self) -> impl Iterator<Item = (SymbolID, StateID)> + '_ {
        self.transitions.iter().map(|(symbol, next)| (*symbol, *next))
    }

    pub fn transition(&self, symbol: SymbolID) -> Option<StateID> {
        self.transitions.get(&symbol).copied()
    }
}

/// The canonical collection of LR(1) item sets.
#[derive(Debug)]
pub struct Automaton {
    states: Map<StateID, State>,
}

impl Automaton {
    /// Build the automaton breadth-first, starting from
    /// `closure({[$start := . S, $]})`.
    pub fn generate<A>(grammar: &Grammar<A>, firsts: &FirstSets) -> Self {
        let builder = Builder { grammar, firsts };

        let mut kernels: Map<Kernel, StateID> = Map::default();
        let mut pending: VecDeque<(StateID, LRItemSet)> = VecDeque::new();
        let mut states = Map::default();

        let mut start = LRItemSet::new();
        start.insert(
            LRItemCore {
                rule: RuleID::ACCEPT,
                marker: 0,
            },
            Some(TerminalID::EOI).into_iter().collect(),
        );
        kernels.insert(kernel_key(&start), StateID::START);
        pending.push_back((StateID::START, start));

        while let Some((id, mut items)) = pending.pop_front() {
            builder.closure(&mut items);

            let mut transitions = Map::default();
            for (symbol, kernel) in builder.goto(&items) {
                let key = kernel_key(&kernel);
                let next = match kernels.get(&key) {
                    Some(next) => *next,
                    None => {
                        let next = StateID::new(kernels.len() as u32);
                        kernels.insert(key, next);
                        pending.push_back((next, kernel));
                        next
                    }
                };
                transitions.insert(symbol, next);
            }

            states.insert(id, State { items, transitions });
        }
        // states are discovered in id order but completed in queue order.
        states.sort_keys();

        tracing::debug!(states = states.len(), "constructed LR(1) automaton");

        Self { states }
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &State)> + '_ {
        self.states.iter().map(|(id, state)| (*id, state))
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[&id]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn display<'g, A>(&'g self, g: &'g Grammar<A>) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, (id, state)) in self.states().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:02}", id)?;
                writeln!(f, "## item_sets")?;
                for (core, lookaheads) in state.items() {
                    write!(f, "- {}  [", core.display(g))?;
                    for (i, lookahead) in lookaheads.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" ")?;
                        }
                        write!(f, "{}", g.terminals[&lookahead])?;
                    }
                    f.write_str("]\n")?;
                }
                writeln!(f, "## transitions")?;
                for (symbol, next) in state.transitions() {
                    writeln!(f, "- {} => {:02}", g.symbol_name(symbol), next)?;
                }
            }
            Ok(())
        })
    }
}

fn kernel_key(items: &LRItemSet) -> Kernel {
    items
        .iter()
        .map(|(core, lookaheads)| (*core, lookaheads.clone()))
        .collect()
}

struct Builder<'g, A> {
    grammar: &'g Grammar<A>,
    firsts: &'g FirstSets,
}

impl<A> Builder<'_, A> {
    /// クロージャ展開
    fn closure(&self, items: &mut LRItemSet) {
        let mut changed = true;
        while changed {
            changed = false;

            let mut added: Map<LRItemCore, TerminalSet> = Map::default();
            for (core, lookaheads) in &*items {
                let rule = self.grammar.rule(core.rule);

                // [X -> ... @ Y beta]
                let (y_symbol, beta) = match &rule.right()[core.marker..] {
                    [SymbolID::N(y_symbol), beta @ ..] => (*y_symbol, beta),
                    _ => continue,
                };

                let x = self.firsts.first_with_lookaheads(beta, lookaheads);
                for rule in self.grammar.rules_of(y_symbol) {
                    added
                        .entry(LRItemCore {
                            rule: rule.id(),
                            marker: 0,
                        })
                        .or_default()
                        .union_with(&x);
                }
            }

            for (core, lookaheads) in added {
                let entry = items.entry(core).or_insert_with(|| {
                    changed = true;
                    TerminalSet::default()
                });
                changed |= entry.union_with(&lookaheads);
            }
        }
    }

    /// 指定したLRアイテム集合から遷移先のLRアイテム集合（未展開）とラベルを抽出する
    fn goto(&self, items: &LRItemSet) -> Map<SymbolID, LRItemSet> {
        let mut kernels: Map<SymbolID, LRItemSet> = Map::default();
        for (core, lookaheads) in items {
            let rule = self.grammar.rule(core.rule);
            let Some(label) = rule.right().get(core.marker) else {
                continue;
            };
            kernels
                .entry(*label)
                .or_default()
                .entry(LRItemCore {
                    marker: core.marker + 1,
                    ..*core
                })
                .or_default()
                .union_with(lookaheads);
        }
        kernels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    // S := C C
    // C := c C | d
    fn dragon_grammar() -> Grammar {
        Grammar::define(|g| {
            let c = g.terminal("c")?;
            let d = g.terminal("d")?;
            let s = g.nonterminal("S")?;
            let cc = g.nonterminal("C")?;
            g.rule(s, [N(cc), N(cc)], ())?;
            g.rule(cc, [T(c), N(cc)], ())?;
            g.rule(cc, [T(d)], ())?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn canonical_collection_size() {
        let g = dragon_grammar();
        let firsts = FirstSets::compute(&g);
        let automaton = Automaton::generate(&g, &firsts);
        // the canonical LR(1) collection of this grammar has ten item sets.
        assert_eq!(automaton.len(), 10);
        let ids: Vec<_> = automaton.states().map(|(id, _)| id.into_raw()).collect();
        assert_eq!(ids, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn closure_merges_lookaheads() {
        let g = dragon_grammar();
        let firsts = FirstSets::compute(&g);
        let automaton = Automaton::generate(&g, &firsts);

        let start = automaton.state(StateID::START);
        // $start := . S, S := . C C, C := . c C, C := . d
        assert_eq!(start.items().count(), 4);
        for (core, lookaheads) in start.items() {
            let rule = g.rule(core.rule);
            let mut names: Vec<_> = lookaheads
                .iter()
                .map(|t| g.terminals[&t].name().to_owned())
                .collect();
            names.sort();
            if rule.left() == g.start_symbol || core.rule == RuleID::ACCEPT {
                assert_eq!(names, ["$"]);
            } else {
                assert_eq!(names, ["c", "d"]);
            }
        }
    }

    #[test]
    fn identical_kernels_share_state() {
        let g = dragon_grammar();
        let firsts = FirstSets::compute(&g);
        let automaton = Automaton::generate(&g, &firsts);

        let c = g.terminals.values().find(|t| t.name() == "c").unwrap().id();
        let first = automaton.state(StateID::START).transition(T(c)).unwrap();
        // shifting `c` again from the target state loops back to itself.
        assert_eq!(automaton.state(first).transition(T(c)), Some(first));
    }
}
