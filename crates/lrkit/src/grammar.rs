//! Grammar types.

use crate::{types::Map, util::display_fn};
use std::{borrow::Cow, fmt, marker::PhantomData};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}
impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self::new(raw)
    }
}

#[derive(Debug)]
pub struct Terminal {
    id: TerminalID,
    name: Cow<'static, str>,
}
impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}
impl NonterminalID {
    /// Reserved symbol used as the start symbol of the augmented grammar.
    pub const START: Self = Self::new(0);
    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }
}

#[derive(Debug)]
pub struct Nonterminal {
    id: NonterminalID,
    name: Cow<'static, str>,
}
impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}

impl RuleID {
    /// The production of the augmented start symbol, `$start := S`.
    pub const ACCEPT: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }
}

impl fmt::Display for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// The type that represents a production rule in grammar, together with the
/// reduction action attached to it.
#[derive(Debug)]
pub struct Rule<A> {
    id: RuleID,
    left: NonterminalID,
    right: Vec<SymbolID>,
    action: Option<A>,
}
impl<A> Rule<A> {
    pub fn id(&self) -> RuleID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production.
    ///
    /// An empty slice denotes an epsilon production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    /// Return the reduction action, or `None` for the augmented start production.
    pub fn action(&self) -> Option<&A> {
        self.action.as_ref()
    }

    // `"LHS := R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar<A>) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} :=", g.nonterminals[&self.left()])?;
            if self.right.is_empty() {
                f.write_str(" ε")?;
            }
            for symbol in self.right() {
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            Ok(())
        })
    }
}

/// The grammar definition used to derive the parser tables.
#[derive(Debug)]
#[non_exhaustive]
pub struct Grammar<A = ()> {
    pub terminals: Map<TerminalID, Terminal>,
    pub nonterminals: Map<NonterminalID, Nonterminal>,
    pub rules: Map<RuleID, Rule<A>>,
    pub start_symbol: NonterminalID,
}

impl<A> fmt::Display for Grammar<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            writeln!(f, "{}", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## rules:")?;
        for rule in self.rules.values() {
            writeln!(f, "{}", rule.display(self))?;
        }

        Ok(())
    }
}

impl<A> Grammar<A> {
    /// Define a grammar using the specified function.
    ///
    /// The returned grammar is augmented with the production `$start := S`,
    /// where `S` is the start symbol specified in the definition.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef<'_, A>) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            rules: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_rule_id: RuleID::OFFSET,
            _marker: PhantomData,
        };

        def.terminals.insert(
            TerminalID::EOI,
            Terminal {
                id: TerminalID::EOI,
                name: Cow::Borrowed("$"),
            },
        );
        def.nonterminals.insert(
            NonterminalID::START,
            Nonterminal {
                id: NonterminalID::START,
                name: Cow::Borrowed("$start"),
            },
        );

        f(&mut def)?;

        def.end()
    }

    pub fn rule(&self, id: RuleID) -> &Rule<A> {
        &self.rules[&id]
    }

    /// Iterate over the production rules whose left-hand side is `symbol`.
    pub fn rules_of(&self, symbol: NonterminalID) -> impl Iterator<Item = &Rule<A>> + '_ {
        self.rules.values().filter(move |rule| rule.left() == symbol)
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminals[&t].name(),
            SymbolID::N(n) => self.nonterminals[&n].name(),
        }
    }

    /// Iterate over all symbols, terminals first.
    pub fn symbols(&self) -> impl Iterator<Item = SymbolID> + '_ {
        self.terminals
            .keys()
            .map(|t| SymbolID::T(*t))
            .chain(self.nonterminals.keys().map(|n| SymbolID::N(*n)))
    }
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef<'def, A> {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule<A>>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_rule_id: u16,
    _marker: PhantomData<&'def mut ()>,
}

impl<'def, A> GrammarDef<'def, A> {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarDefError> {
        verify_name(name)?;
        if self.terminals.values().any(|t| t.name() == name)
            || self.nonterminals.values().any(|n| n.name() == name)
        {
            return Err(GrammarDefError::DuplicateSymbol {
                name: name.to_owned(),
            });
        }

        let id = TerminalID::new(self.next_terminal_id);
        self.next_terminal_id += 1;

        self.terminals.insert(
            id,
            Terminal {
                id,
                name: Cow::Owned(name.to_owned()),
            },
        );

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarDefError> {
        verify_name(name)?;
        if self.terminals.values().any(|t| t.name() == name)
            || self.nonterminals.values().any(|n| n.name() == name)
        {
            return Err(GrammarDefError::DuplicateSymbol {
                name: name.to_owned(),
            });
        }

        let id = NonterminalID::new(self.next_nonterminal_id);
        self.next_nonterminal_id += 1;

        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: Cow::Owned(name.to_owned()),
            },
        );

        Ok(id)
    }

    /// Specify a production rule and its reduction action into this grammer.
    ///
    /// An empty `right` declares an epsilon production.
    pub fn rule<I>(
        &mut self,
        left: NonterminalID,
        right: I,
        action: A,
    ) -> Result<RuleID, GrammarDefError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        if left == NonterminalID::START || !self.nonterminals.contains_key(&left) {
            return Err(GrammarDefError::UnknownSymbol);
        }
        let right: Vec<SymbolID> = right.into_iter().collect();
        for symbol in &right {
            let known = match symbol {
                SymbolID::T(t) => *t != TerminalID::EOI && self.terminals.contains_key(t),
                SymbolID::N(n) => *n != NonterminalID::START && self.nonterminals.contains_key(n),
            };
            if !known {
                return Err(GrammarDefError::UnknownSymbol);
            }
        }
        if self
            .rules
            .values()
            .any(|rule| rule.left == left && rule.right == right)
        {
            return Err(GrammarDefError::DuplicateRule {
                left: self.nonterminals[&left].name().to_owned(),
            });
        }

        let id = RuleID::new(self.next_rule_id);
        self.next_rule_id += 1;
        self.rules.insert(
            id,
            Rule {
                id,
                left,
                right,
                action: Some(action),
            },
        );

        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarDefError> {
        if symbol == NonterminalID::START || !self.nonterminals.contains_key(&symbol) {
            return Err(GrammarDefError::UnknownSymbol);
        }
        self.start.replace(symbol);
        Ok(())
    }

    fn end(mut self) -> Result<Grammar<A>, GrammarDefError> {
        // 指定されていない場合は最初に登録されたnonterminal symbolを用いる
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .find(|id| **id != NonterminalID::START)
                .copied()
                .ok_or(GrammarDefError::EmptyNonterminals)?,
        };

        self.rules.insert(
            RuleID::ACCEPT,
            Rule {
                id: RuleID::ACCEPT,
                left: NonterminalID::START,
                right: vec![SymbolID::N(start)],
                action: None,
            },
        );
        // keep the augmented production at the front.
        self.rules.sort_keys();

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            rules: self.rules,
            start_symbol: start,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("incorrect symbol name: `{}'", name)]
    InvalidName { name: String },

    #[error("the symbol `{}' has already been declared", name)]
    DuplicateSymbol { name: String },

    #[error("the symbol has not been declared in this grammar")]
    UnknownSymbol,

    #[error("duplicate production rule detected for `{}'", left)]
    DuplicateRule { left: String },

    #[error("empty nonterminal symbols")]
    EmptyNonterminals,
}

fn verify_name(name: &str) -> Result<(), GrammarDefError> {
    if name.is_empty() || name.starts_with('$') || name.chars().any(char::is_whitespace) {
        return Err(GrammarDefError::InvalidName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    #[test]
    fn augments_start_symbol() {
        let grammar = Grammar::define(|g| {
            let num = g.terminal("NUM")?;
            let e = g.nonterminal("E")?;
            g.rule(e, [T(num)], ())?;
            Ok(())
        })
        .unwrap();

        let accept = grammar.rule(RuleID::ACCEPT);
        assert_eq!(accept.left(), NonterminalID::START);
        assert_eq!(accept.right(), &[N(grammar.start_symbol)]);
        assert!(accept.action().is_none());
        assert_eq!(
            grammar
                .rules
                .values()
                .filter(|rule| rule.left() == NonterminalID::START)
                .count(),
            1
        );
        assert_eq!(grammar.rules.keys().next(), Some(&RuleID::ACCEPT));
    }

    #[test]
    fn rejects_duplicates() {
        let res = Grammar::<()>::define(|g| {
            g.terminal("A")?;
            g.terminal("A")?;
            Ok(())
        });
        assert!(matches!(res, Err(GrammarDefError::DuplicateSymbol { .. })));

        let res = Grammar::define(|g| {
            let a = g.terminal("A")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(a)], ())?;
            g.rule(s, [T(a)], ())?;
            Ok(())
        });
        assert!(matches!(res, Err(GrammarDefError::DuplicateRule { .. })));
    }

    #[test]
    fn displays_epsilon_rule() {
        let grammar = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            g.rule(s, [], ())?;
            Ok(())
        })
        .unwrap();
        let rule = grammar.rules_of(grammar.start_symbol).next().unwrap();
        assert_eq!(rule.display(&grammar).to_string(), "S := ε");
    }
}
