use lrkit::{grammar::SymbolID::*, Grammar, ParseTable, TerminalID};
use lrkit_runtime::{parse, ParseError, Token};

mod grammars {
    use super::*;

    // E := E + T | T
    // T := T * F | F
    // F := ( E ) | n
    pub fn arithmetic() -> Grammar {
        Grammar::define(|g| {
            let plus = g.terminal("PLUS")?;
            let star = g.terminal("STAR")?;
            let lparen = g.terminal("LPAREN")?;
            let rparen = g.terminal("RPAREN")?;
            let num = g.terminal("NUM")?;

            let expr = g.nonterminal("EXPR")?;
            let term = g.nonterminal("TERM")?;
            let factor = g.nonterminal("FACTOR")?;

            g.start_symbol(expr)?;
            g.rule(expr, [N(expr), T(plus), N(term)], ())?;
            g.rule(expr, [N(term)], ())?;
            g.rule(term, [N(term), T(star), N(factor)], ())?;
            g.rule(term, [N(factor)], ())?;
            g.rule(factor, [T(lparen), N(expr), T(rparen)], ())?;
            g.rule(factor, [T(num)], ())?;
            Ok(())
        })
        .unwrap()
    }

    // E := E + E | n
    pub fn ambiguous() -> Grammar {
        Grammar::define(|g| {
            let plus = g.terminal("PLUS")?;
            let num = g.terminal("NUM")?;
            let expr = g.nonterminal("EXPR")?;
            g.rule(expr, [N(expr), T(plus), N(expr)], ())?;
            g.rule(expr, [T(num)], ())?;
            Ok(())
        })
        .unwrap()
    }

    // S := if S | if S else S | x
    pub fn dangling_else() -> Grammar {
        Grammar::define(|g| {
            let if_ = g.terminal("IF")?;
            let else_ = g.terminal("ELSE")?;
            let x = g.terminal("X")?;
            let stmt = g.nonterminal("STMT")?;
            g.rule(stmt, [T(if_), N(stmt)], ())?;
            g.rule(stmt, [T(if_), N(stmt), T(else_), N(stmt)], ())?;
            g.rule(stmt, [T(x)], ())?;
            Ok(())
        })
        .unwrap()
    }

    // L := L x | ε
    pub fn left_recursive_list() -> Grammar {
        Grammar::define(|g| {
            let x = g.terminal("X")?;
            let list = g.nonterminal("LIST")?;
            g.rule(list, [N(list), T(x)], ())?;
            g.rule(list, [], ())?;
            Ok(())
        })
        .unwrap()
    }

    // S := a A d | b B d | a B e | b A e
    // A := c
    // B := c
    //
    // LR(1) but not LALR(1).
    pub fn not_lalr() -> Grammar {
        Grammar::define(|g| {
            let a = g.terminal("a")?;
            let b = g.terminal("b")?;
            let c = g.terminal("c")?;
            let d = g.terminal("d")?;
            let e = g.terminal("e")?;
            let s = g.nonterminal("S")?;
            let aa = g.nonterminal("A")?;
            let bb = g.nonterminal("B")?;
            g.rule(s, [T(a), N(aa), T(d)], ())?;
            g.rule(s, [T(b), N(bb), T(d)], ())?;
            g.rule(s, [T(a), N(bb), T(e)], ())?;
            g.rule(s, [T(b), N(aa), T(e)], ())?;
            g.rule(aa, [T(c)], ())?;
            g.rule(bb, [T(c)], ())?;
            Ok(())
        })
        .unwrap()
    }
}

macro_rules! define_tests {
    ($($name:ident => $is_lr1:expr),*$(,)?) => {$(
        #[test]
        fn $name() {
            let grammar = grammars::$name();
            let table = ParseTable::generate(&grammar);
            assert_eq!(table.is_lr1(), $is_lr1, "{}", table.display(&grammar));
        }
    )*};
}

define_tests! {
    arithmetic => true,
    ambiguous => false,
    dangling_else => false,
    left_recursive_list => true,
    not_lalr => true,
}

#[derive(Debug)]
struct Tok(TerminalID);

impl Token<TerminalID> for Tok {
    fn to_index(&self) -> TerminalID {
        self.0
    }
}

fn tokenize(grammar: &Grammar, input: &str) -> Vec<Tok> {
    let find = |name: &str| {
        grammar
            .terminals
            .values()
            .find(|t| t.name() == name)
            .map(|t| t.id())
            .unwrap()
    };
    input
        .split_whitespace()
        .map(|word| match word {
            "+" => Tok(find("PLUS")),
            "*" => Tok(find("STAR")),
            "(" => Tok(find("LPAREN")),
            ")" => Tok(find("RPAREN")),
            _ => Tok(find("NUM")),
        })
        .chain(Some(Tok(TerminalID::EOI)))
        .collect()
}

#[test]
fn parse_arithmetic() {
    let grammar = grammars::arithmetic();
    let table = ParseTable::generate(&grammar);

    let tokens = tokenize(&grammar, "1 + 2 * 3");
    let derivation = parse(&table, &tokens).unwrap();

    let reductions: Vec<String> = derivation
        .reductions
        .iter()
        .map(|rule| grammar.rule(*rule).display(&grammar).to_string())
        .collect();
    assert_eq!(
        reductions,
        [
            "FACTOR := NUM",
            "TERM := FACTOR",
            "EXPR := TERM",
            "FACTOR := NUM",
            "TERM := FACTOR",
            "FACTOR := NUM",
            "TERM := TERM STAR FACTOR",
            "EXPR := EXPR PLUS TERM",
        ]
    );
    assert_eq!(
        derivation.operations.len(),
        tokens.len() - 1 + derivation.reductions.len()
    );
}

#[test]
fn parse_error_reports_position() {
    let grammar = grammars::arithmetic();
    let table = ParseTable::generate(&grammar);

    let tokens = tokenize(&grammar, "1 + * 3");
    match parse(&table, &tokens) {
        Err(ParseError::UnexpectedToken { position, .. }) => assert_eq!(position, 2),
        res => panic!("unexpected result: {:?}", res),
    }
}
