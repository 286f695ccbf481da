//! The COOL grammar and the reduction actions building the syntax tree.

use crate::{
    ast::{
        AttrDecl, BinOp, CaseBranch, ClassDecl, Expr, ExprKind, Feature, Ident, LetBinding,
        MethodDecl, Param, Program,
    },
    diagnostics::{Diagnostic, ErrorKind},
    lexer::{Token, TokenKind},
};
use lrkit::{
    grammar::SymbolID::{self, N, T},
    types::Map,
    Grammar, GrammarDefError, ParseTable, RuleID, TerminalID,
};
use lrkit_runtime::{parse, replay, ParseError, Reducer};
use std::{fmt, sync::OnceLock};

/// The intermediate values built during reductions.
#[derive(Debug)]
pub enum Value {
    Token(Token),
    Program(Program),
    Classes(Vec<ClassDecl>),
    Class(ClassDecl),
    Features(Vec<Feature>),
    Feature(Feature),
    Params(Vec<Param>),
    Param(Param),
    Expr(Expr),
    Exprs(Vec<Expr>),
    Bindings(Vec<LetBinding>),
    Binding(LetBinding),
    Branches(Vec<CaseBranch>),
    Call(CallSuffix),
}

/// `.method(args)` or `@Cast.method(args)`, waiting for its receiver.
#[derive(Debug)]
pub struct CallSuffix {
    cast: Option<Ident>,
    method: Ident,
    args: Vec<Expr>,
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("unexpected value on the stack (expected: {})", _0)]
    UnexpectedValue(&'static str),

    #[error("no reduction action for rule {}", _0)]
    MissingAction(RuleID),
}

/// The values of the right-hand side of a production, in source order.
pub struct Args {
    values: std::vec::IntoIter<Value>,
}

macro_rules! accessors {
    ($($method:ident => $Variant:ident($ty:ty);)*) => {
        impl Args {$(
            fn $method(&mut self) -> Result<$ty, ActionError> {
                match self.values.next() {
                    Some(Value::$Variant(v)) => Ok(v),
                    _ => Err(ActionError::UnexpectedValue(stringify!($Variant))),
                }
            }
        )*}
    };
}

accessors! {
    token => Token(Token);
    classes => Classes(Vec<ClassDecl>);
    class => Class(ClassDecl);
    features => Features(Vec<Feature>);
    feature => Feature(Feature);
    params => Params(Vec<Param>);
    param => Param(Param);
    expr => Expr(Expr);
    exprs => Exprs(Vec<Expr>);
    bindings => Bindings(Vec<LetBinding>);
    binding => Binding(LetBinding);
    branches => Branches(Vec<CaseBranch>);
    call => Call(CallSuffix);
}

impl Args {
    /// Discard a punctuation or keyword token.
    fn skip(&mut self) -> Result<(), ActionError> {
        self.token().map(drop)
    }

    fn ident(&mut self) -> Result<Ident, ActionError> {
        let token = self.token()?;
        Ok(Ident {
            pos: token.pos(),
            name: token.lexeme,
        })
    }
}

/// The reduction action attached to each production.
pub type Action = fn(&mut Args) -> Result<Value, ActionError>;

fn expr(kind: ExprKind, pos: crate::ast::Position) -> Result<Value, ActionError> {
    Ok(Value::Expr(Expr::new(kind, pos)))
}

fn binary(a: &mut Args, op: BinOp) -> Result<Value, ActionError> {
    let lhs = a.expr()?;
    a.skip()?;
    let rhs = a.expr()?;
    let pos = lhs.pos;
    expr(
        ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        pos,
    )
}

fn prepend<T>(head: T, mut tail: Vec<T>) -> Vec<T> {
    tail.insert(0, head);
    tail
}

fn unescape(lexeme: &str) -> String {
    let inner = lexeme
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(lexeme);
    let mut res = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            res.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => res.push('\n'),
            Some('t') => res.push('\t'),
            Some('b') => res.push('\u{8}'),
            Some('f') => res.push('\u{c}'),
            Some(other) => res.push(other),
            None => {}
        }
    }
    res
}

/// Declare the COOL grammar.
///
/// Returns the grammar together with the terminal symbol of each token kind.
pub fn cool_grammar() -> Result<(Grammar<Action>, Map<TokenKind, TerminalID>), GrammarDefError> {
    let mut terminals: Map<TokenKind, TerminalID> = Map::default();

    let grammar = Grammar::<Action>::define(|g| {
        for kind in TokenKind::TERMINALS {
            terminals.insert(*kind, g.terminal(kind.name())?);
        }
        terminals.insert(TokenKind::Eof, TerminalID::EOI);
        let t = |kind: TokenKind| -> SymbolID { T(terminals[&kind]) };
        use TokenKind as K;

        let program = g.nonterminal("program")?;
        let class_list = g.nonterminal("class-list")?;
        let def_class = g.nonterminal("def-class")?;
        let feature_list = g.nonterminal("feature-list")?;
        let feature = g.nonterminal("feature")?;
        let param_list = g.nonterminal("param-list")?;
        let param = g.nonterminal("param")?;
        let expr_ = g.nonterminal("expr")?;
        let expr_list = g.nonterminal("expr-list")?;
        let let_list = g.nonterminal("let-list")?;
        let let_binding = g.nonterminal("let-binding")?;
        let case_list = g.nonterminal("case-list")?;
        let truth_expr = g.nonterminal("truth-expr")?;
        let comp_expr = g.nonterminal("comp-expr")?;
        let arith = g.nonterminal("arith")?;
        let term = g.nonterminal("term")?;
        let factor = g.nonterminal("factor")?;
        let factor_2 = g.nonterminal("factor-2")?;
        let factor_3 = g.nonterminal("factor-3")?;
        let func_call = g.nonterminal("func-call")?;
        let arg_list = g.nonterminal("arg-list")?;
        let atom = g.nonterminal("atom")?;
        let member_call = g.nonterminal("member-call")?;

        g.start_symbol(program)?;

        // program
        g.rule(program, [N(class_list)], |a| {
            Ok(Value::Program(Program {
                classes: a.classes()?,
            }))
        })?;

        g.rule(class_list, [N(def_class), N(class_list)], |a| {
            let head = a.class()?;
            Ok(Value::Classes(prepend(head, a.classes()?)))
        })?;
        g.rule(class_list, [N(def_class)], |a| {
            Ok(Value::Classes(vec![a.class()?]))
        })?;

        g.rule(
            def_class,
            [
                t(K::Class),
                t(K::TypeIdent),
                t(K::LBrace),
                N(feature_list),
                t(K::RBrace),
                t(K::Semicolon),
            ],
            |a| {
                let keyword = a.token()?;
                let name = a.ident()?;
                a.skip()?;
                Ok(Value::Class(ClassDecl {
                    name,
                    parent: None,
                    features: a.features()?,
                    pos: keyword.pos(),
                }))
            },
        )?;
        g.rule(
            def_class,
            [
                t(K::Class),
                t(K::TypeIdent),
                t(K::Inherits),
                t(K::TypeIdent),
                t(K::LBrace),
                N(feature_list),
                t(K::RBrace),
                t(K::Semicolon),
            ],
            |a| {
                let keyword = a.token()?;
                let name = a.ident()?;
                a.skip()?;
                let parent = a.ident()?;
                a.skip()?;
                Ok(Value::Class(ClassDecl {
                    name,
                    parent: Some(parent),
                    features: a.features()?,
                    pos: keyword.pos(),
                }))
            },
        )?;

        // features
        g.rule(feature_list, [N(feature), N(feature_list)], |a| {
            let head = a.feature()?;
            Ok(Value::Features(prepend(head, a.features()?)))
        })?;
        g.rule(feature_list, [], |_| Ok(Value::Features(vec![])))?;

        g.rule(
            feature,
            [t(K::ObjectIdent), t(K::Colon), t(K::TypeIdent), t(K::Semicolon)],
            |a| {
                let name = a.ident()?;
                a.skip()?;
                let ty = a.ident()?;
                Ok(Value::Feature(Feature::Attribute(AttrDecl {
                    name,
                    ty,
                    init: None,
                })))
            },
        )?;
        g.rule(
            feature,
            [
                t(K::ObjectIdent),
                t(K::Colon),
                t(K::TypeIdent),
                t(K::Assign),
                N(expr_),
                t(K::Semicolon),
            ],
            |a| {
                let name = a.ident()?;
                a.skip()?;
                let ty = a.ident()?;
                a.skip()?;
                Ok(Value::Feature(Feature::Attribute(AttrDecl {
                    name,
                    ty,
                    init: Some(a.expr()?),
                })))
            },
        )?;
        g.rule(
            feature,
            [
                t(K::ObjectIdent),
                t(K::LParen),
                N(param_list),
                t(K::RParen),
                t(K::Colon),
                t(K::TypeIdent),
                t(K::LBrace),
                N(expr_),
                t(K::RBrace),
                t(K::Semicolon),
            ],
            |a| {
                let name = a.ident()?;
                a.skip()?;
                let params = a.params()?;
                a.skip()?;
                a.skip()?;
                let ret = a.ident()?;
                a.skip()?;
                Ok(Value::Feature(Feature::Method(MethodDecl {
                    name,
                    params,
                    ret,
                    body: a.expr()?,
                })))
            },
        )?;
        g.rule(
            feature,
            [
                t(K::ObjectIdent),
                t(K::LParen),
                t(K::RParen),
                t(K::Colon),
                t(K::TypeIdent),
                t(K::LBrace),
                N(expr_),
                t(K::RBrace),
                t(K::Semicolon),
            ],
            |a| {
                let name = a.ident()?;
                a.skip()?;
                a.skip()?;
                a.skip()?;
                let ret = a.ident()?;
                a.skip()?;
                Ok(Value::Feature(Feature::Method(MethodDecl {
                    name,
                    params: vec![],
                    ret,
                    body: a.expr()?,
                })))
            },
        )?;

        g.rule(param_list, [N(param)], |a| Ok(Value::Params(vec![a.param()?])))?;
        g.rule(param_list, [N(param), t(K::Comma), N(param_list)], |a| {
            let head = a.param()?;
            a.skip()?;
            Ok(Value::Params(prepend(head, a.params()?)))
        })?;
        g.rule(
            param,
            [t(K::ObjectIdent), t(K::Colon), t(K::TypeIdent)],
            |a| {
                let name = a.ident()?;
                a.skip()?;
                Ok(Value::Param(Param {
                    name,
                    ty: a.ident()?,
                }))
            },
        )?;

        // expressions
        g.rule(
            expr_,
            [
                t(K::If),
                N(expr_),
                t(K::Then),
                N(expr_),
                t(K::Else),
                N(expr_),
                t(K::Fi),
            ],
            |a| {
                let keyword = a.token()?;
                let cond = a.expr()?;
                a.skip()?;
                let then = a.expr()?;
                a.skip()?;
                let els = a.expr()?;
                expr(
                    ExprKind::If {
                        cond: Box::new(cond),
                        then: Box::new(then),
                        els: Box::new(els),
                    },
                    keyword.pos(),
                )
            },
        )?;
        g.rule(
            expr_,
            [t(K::While), N(expr_), t(K::Loop), N(expr_), t(K::Pool)],
            |a| {
                let keyword = a.token()?;
                let cond = a.expr()?;
                a.skip()?;
                let body = a.expr()?;
                expr(
                    ExprKind::While {
                        cond: Box::new(cond),
                        body: Box::new(body),
                    },
                    keyword.pos(),
                )
            },
        )?;
        g.rule(
            expr_,
            [t(K::LBrace), N(expr_list), t(K::RBrace)],
            |a| {
                let brace = a.token()?;
                expr(ExprKind::Block(a.exprs()?), brace.pos())
            },
        )?;
        g.rule(
            expr_,
            [t(K::Let), N(let_list), t(K::In), N(expr_)],
            |a| {
                let keyword = a.token()?;
                let bindings = a.bindings()?;
                a.skip()?;
                let body = a.expr()?;
                expr(
                    ExprKind::Let {
                        bindings,
                        body: Box::new(body),
                    },
                    keyword.pos(),
                )
            },
        )?;
        g.rule(
            expr_,
            [t(K::Case), N(expr_), t(K::Of), N(case_list), t(K::Esac)],
            |a| {
                let keyword = a.token()?;
                let scrutinee = a.expr()?;
                a.skip()?;
                let branches = a.branches()?;
                expr(
                    ExprKind::Case {
                        scrutinee: Box::new(scrutinee),
                        branches,
                    },
                    keyword.pos(),
                )
            },
        )?;
        g.rule(
            expr_,
            [t(K::ObjectIdent), t(K::Assign), N(expr_)],
            |a| {
                let name = a.ident()?;
                a.skip()?;
                let value = a.expr()?;
                let pos = name.pos;
                expr(
                    ExprKind::Assign {
                        name,
                        value: Box::new(value),
                    },
                    pos,
                )
            },
        )?;
        g.rule(expr_, [N(truth_expr)], |a| Ok(Value::Expr(a.expr()?)))?;

        g.rule(expr_list, [N(expr_), t(K::Semicolon)], |a| {
            Ok(Value::Exprs(vec![a.expr()?]))
        })?;
        g.rule(
            expr_list,
            [N(expr_), t(K::Semicolon), N(expr_list)],
            |a| {
                let head = a.expr()?;
                a.skip()?;
                Ok(Value::Exprs(prepend(head, a.exprs()?)))
            },
        )?;

        // let bindings
        g.rule(let_list, [N(let_binding)], |a| {
            Ok(Value::Bindings(vec![a.binding()?]))
        })?;
        g.rule(
            let_list,
            [N(let_binding), t(K::Comma), N(let_list)],
            |a| {
                let head = a.binding()?;
                a.skip()?;
                Ok(Value::Bindings(prepend(head, a.bindings()?)))
            },
        )?;
        g.rule(
            let_binding,
            [t(K::ObjectIdent), t(K::Colon), t(K::TypeIdent)],
            |a| {
                let name = a.ident()?;
                a.skip()?;
                Ok(Value::Binding(LetBinding {
                    name,
                    ty: Some(a.ident()?),
                    init: None,
                }))
            },
        )?;
        g.rule(
            let_binding,
            [
                t(K::ObjectIdent),
                t(K::Colon),
                t(K::TypeIdent),
                t(K::Assign),
                N(expr_),
            ],
            |a| {
                let name = a.ident()?;
                a.skip()?;
                let ty = a.ident()?;
                a.skip()?;
                Ok(Value::Binding(LetBinding {
                    name,
                    ty: Some(ty),
                    init: Some(a.expr()?),
                }))
            },
        )?;
        g.rule(
            let_binding,
            [t(K::ObjectIdent), t(K::Assign), N(expr_)],
            |a| {
                let name = a.ident()?;
                a.skip()?;
                Ok(Value::Binding(LetBinding {
                    name,
                    ty: None,
                    init: Some(a.expr()?),
                }))
            },
        )?;
        g.rule(let_binding, [t(K::ObjectIdent)], |a| {
            Ok(Value::Binding(LetBinding {
                name: a.ident()?,
                ty: None,
                init: None,
            }))
        })?;

        // case branches
        g.rule(
            case_list,
            [
                t(K::ObjectIdent),
                t(K::Colon),
                t(K::TypeIdent),
                t(K::DArrow),
                N(expr_),
                t(K::Semicolon),
            ],
            |a| {
                let name = a.ident()?;
                a.skip()?;
                let ty = a.ident()?;
                a.skip()?;
                let body = a.expr()?;
                Ok(Value::Branches(vec![CaseBranch { name, ty, body }]))
            },
        )?;
        g.rule(
            case_list,
            [
                t(K::ObjectIdent),
                t(K::Colon),
                t(K::TypeIdent),
                t(K::DArrow),
                N(expr_),
                t(K::Semicolon),
                N(case_list),
            ],
            |a| {
                let name = a.ident()?;
                a.skip()?;
                let ty = a.ident()?;
                a.skip()?;
                let body = a.expr()?;
                a.skip()?;
                let rest = a.branches()?;
                Ok(Value::Branches(prepend(CaseBranch { name, ty, body }, rest)))
            },
        )?;

        // operators
        g.rule(truth_expr, [t(K::Not), N(truth_expr)], |a| {
            let keyword = a.token()?;
            expr(ExprKind::Not(Box::new(a.expr()?)), keyword.pos())
        })?;
        g.rule(truth_expr, [N(comp_expr)], |a| Ok(Value::Expr(a.expr()?)))?;

        g.rule(comp_expr, [N(comp_expr), t(K::LessEqual), N(arith)], |a| {
            binary(a, BinOp::LessEqual)
        })?;
        g.rule(comp_expr, [N(comp_expr), t(K::Less), N(arith)], |a| {
            binary(a, BinOp::Less)
        })?;
        g.rule(comp_expr, [N(comp_expr), t(K::Equal), N(arith)], |a| {
            binary(a, BinOp::Equal)
        })?;
        g.rule(comp_expr, [N(arith)], |a| Ok(Value::Expr(a.expr()?)))?;

        g.rule(arith, [N(arith), t(K::Plus), N(term)], |a| {
            binary(a, BinOp::Add)
        })?;
        g.rule(arith, [N(arith), t(K::Minus), N(term)], |a| {
            binary(a, BinOp::Sub)
        })?;
        g.rule(arith, [N(term)], |a| Ok(Value::Expr(a.expr()?)))?;

        g.rule(term, [N(term), t(K::Star), N(factor)], |a| {
            binary(a, BinOp::Mul)
        })?;
        g.rule(term, [N(term), t(K::Slash), N(factor)], |a| {
            binary(a, BinOp::Div)
        })?;
        g.rule(term, [N(factor)], |a| Ok(Value::Expr(a.expr()?)))?;

        g.rule(factor, [t(K::IsVoid), N(factor_2)], |a| {
            let keyword = a.token()?;
            expr(ExprKind::IsVoid(Box::new(a.expr()?)), keyword.pos())
        })?;
        g.rule(factor, [N(factor_2)], |a| Ok(Value::Expr(a.expr()?)))?;

        g.rule(factor_2, [t(K::Tilde), N(factor_3)], |a| {
            let tilde = a.token()?;
            expr(ExprKind::Complement(Box::new(a.expr()?)), tilde.pos())
        })?;
        g.rule(factor_2, [N(factor_3)], |a| Ok(Value::Expr(a.expr()?)))?;

        // dispatch
        g.rule(factor_3, [N(factor_3), N(func_call)], |a| {
            let receiver = a.expr()?;
            let CallSuffix { cast, method, args } = a.call()?;
            let pos = receiver.pos;
            expr(
                ExprKind::Dispatch {
                    receiver: Some(Box::new(receiver)),
                    cast,
                    method,
                    args,
                },
                pos,
            )
        })?;
        g.rule(factor_3, [N(atom)], |a| Ok(Value::Expr(a.expr()?)))?;

        g.rule(
            func_call,
            [
                t(K::Dot),
                t(K::ObjectIdent),
                t(K::LParen),
                N(arg_list),
                t(K::RParen),
            ],
            |a| {
                a.skip()?;
                let method = a.ident()?;
                a.skip()?;
                Ok(Value::Call(CallSuffix {
                    cast: None,
                    method,
                    args: a.exprs()?,
                }))
            },
        )?;
        g.rule(
            func_call,
            [t(K::Dot), t(K::ObjectIdent), t(K::LParen), t(K::RParen)],
            |a| {
                a.skip()?;
                Ok(Value::Call(CallSuffix {
                    cast: None,
                    method: a.ident()?,
                    args: vec![],
                }))
            },
        )?;
        g.rule(
            func_call,
            [
                t(K::At),
                t(K::TypeIdent),
                t(K::Dot),
                t(K::ObjectIdent),
                t(K::LParen),
                N(arg_list),
                t(K::RParen),
            ],
            |a| {
                a.skip()?;
                let cast = a.ident()?;
                a.skip()?;
                let method = a.ident()?;
                a.skip()?;
                Ok(Value::Call(CallSuffix {
                    cast: Some(cast),
                    method,
                    args: a.exprs()?,
                }))
            },
        )?;
        g.rule(
            func_call,
            [
                t(K::At),
                t(K::TypeIdent),
                t(K::Dot),
                t(K::ObjectIdent),
                t(K::LParen),
                t(K::RParen),
            ],
            |a| {
                a.skip()?;
                let cast = a.ident()?;
                a.skip()?;
                Ok(Value::Call(CallSuffix {
                    cast: Some(cast),
                    method: a.ident()?,
                    args: vec![],
                }))
            },
        )?;

        g.rule(arg_list, [N(expr_)], |a| Ok(Value::Exprs(vec![a.expr()?])))?;
        g.rule(arg_list, [N(expr_), t(K::Comma), N(arg_list)], |a| {
            let head = a.expr()?;
            a.skip()?;
            Ok(Value::Exprs(prepend(head, a.exprs()?)))
        })?;

        // atoms
        g.rule(atom, [N(member_call)], |a| Ok(Value::Expr(a.expr()?)))?;
        g.rule(atom, [t(K::New), t(K::TypeIdent)], |a| {
            let keyword = a.token()?;
            expr(ExprKind::New(a.ident()?), keyword.pos())
        })?;
        g.rule(atom, [t(K::LParen), N(expr_), t(K::RParen)], |a| {
            a.skip()?;
            Ok(Value::Expr(a.expr()?))
        })?;
        g.rule(atom, [t(K::ObjectIdent)], |a| {
            let Ident { name, pos } = a.ident()?;
            expr(ExprKind::Identifier(name), pos)
        })?;
        g.rule(atom, [t(K::Integer)], |a| {
            let token = a.token()?;
            // out-of-range literals were already reported by the scanner.
            let value = token.lexeme.parse().unwrap_or(i64::MAX);
            expr(ExprKind::Int(value), token.pos())
        })?;
        g.rule(atom, [t(K::Str)], |a| {
            let token = a.token()?;
            expr(ExprKind::Str(unescape(&token.lexeme)), token.pos())
        })?;
        g.rule(atom, [t(K::True)], |a| {
            let token = a.token()?;
            expr(ExprKind::Bool(true), token.pos())
        })?;
        g.rule(atom, [t(K::False)], |a| {
            let token = a.token()?;
            expr(ExprKind::Bool(false), token.pos())
        })?;

        g.rule(
            member_call,
            [t(K::ObjectIdent), t(K::LParen), N(arg_list), t(K::RParen)],
            |a| {
                let method = a.ident()?;
                a.skip()?;
                let pos = method.pos;
                expr(
                    ExprKind::Dispatch {
                        receiver: None,
                        cast: None,
                        method,
                        args: a.exprs()?,
                    },
                    pos,
                )
            },
        )?;
        g.rule(
            member_call,
            [t(K::ObjectIdent), t(K::LParen), t(K::RParen)],
            |a| {
                let method = a.ident()?;
                let pos = method.pos;
                expr(
                    ExprKind::Dispatch {
                        receiver: None,
                        cast: None,
                        method,
                        args: vec![],
                    },
                    pos,
                )
            },
        )?;

        Ok(())
    })?;

    Ok((grammar, terminals))
}

/// A token paired with its terminal symbol, as consumed by the parser.
#[derive(Debug)]
struct Input<'t> {
    token: &'t Token,
    terminal: TerminalID,
}

impl lrkit_runtime::Token<TerminalID> for Input<'_> {
    fn to_index(&self) -> TerminalID {
        self.terminal
    }
}

struct AstBuilder<'g> {
    grammar: &'g Grammar<Action>,
}

impl<'t> Reducer<RuleID, Input<'t>> for AstBuilder<'_> {
    type Value = Value;
    type Error = ActionError;

    fn shift(&mut self, input: &Input<'t>) -> Result<Value, ActionError> {
        Ok(Value::Token(input.token.clone()))
    }

    fn reduce(&mut self, rule: RuleID, args: Vec<Value>) -> Result<Value, ActionError> {
        let action = self
            .grammar
            .rule(rule)
            .action()
            .ok_or(ActionError::MissingAction(rule))?;
        action(&mut Args {
            values: args.into_iter(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    /// The offending token, reported at its position.
    #[error("{}", _0)]
    UnexpectedToken(Diagnostic),

    #[error("malformed parser state: {}", _0)]
    Internal(String),
}

/// The parser of COOL programs, holding the grammar and its parsing table.
pub struct CoolParser {
    grammar: Grammar<Action>,
    table: ParseTable,
    terminals: Map<TokenKind, TerminalID>,
}

impl fmt::Debug for CoolParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoolParser")
            .field("num_rules", &self.grammar.rules.len())
            .field("num_states", &self.table.num_states())
            .field("is_lr1", &self.table.is_lr1())
            .finish()
    }
}

static SHARED: OnceLock<Result<CoolParser, GrammarDefError>> = OnceLock::new();

impl CoolParser {
    /// Build the grammar and derive its parsing table.
    pub fn new() -> Result<Self, GrammarDefError> {
        let span = tracing::debug_span!("build_cool_parser");
        let _entered = span.enter();

        let (grammar, terminals) = cool_grammar()?;
        let table = ParseTable::generate(&grammar);
        tracing::debug!(
            rules = grammar.rules.len(),
            states = table.num_states(),
            is_lr1 = table.is_lr1(),
            "parsing table is ready"
        );
        Ok(Self {
            grammar,
            table,
            terminals,
        })
    }

    /// Return the parser shared by the whole process, building it on first use.
    pub fn shared() -> Result<&'static CoolParser, &'static GrammarDefError> {
        SHARED.get_or_init(CoolParser::new).as_ref()
    }

    pub fn grammar(&self) -> &Grammar<Action> {
        &self.grammar
    }

    pub fn table(&self) -> &ParseTable {
        &self.table
    }

    /// Parse `tokens`, which must be terminated by an end-of-input token.
    pub fn parse(&self, tokens: &[Token]) -> Result<Program, SyntaxError> {
        let inputs: Vec<Input<'_>> = tokens
            .iter()
            .map(|token| Input {
                token,
                terminal: self
                    .terminals
                    .get(&token.kind)
                    .copied()
                    .unwrap_or(TerminalID::EOI),
            })
            .collect();

        let derivation = match parse(&self.table, &inputs) {
            Ok(derivation) => derivation,
            Err(ParseError::UnexpectedToken { token, state, .. }) => {
                tracing::debug!(%state, lexeme = %token.token.lexeme, "syntax error");
                return Err(SyntaxError::UnexpectedToken(Diagnostic::new(
                    token.token.pos(),
                    ErrorKind::ParseError(token.token.lexeme.clone()),
                )));
            }
            Err(err) => return Err(SyntaxError::Internal(err.to_string())),
        };
        tracing::trace!(reductions = derivation.reductions.len(), "accepted");

        let mut builder = AstBuilder {
            grammar: &self.grammar,
        };
        match replay(&self.table, &derivation, &inputs, &mut builder) {
            Ok(Value::Program(program)) => Ok(program),
            Ok(other) => Err(SyntaxError::Internal(format!(
                "unexpected root value: {:?}",
                other
            ))),
            Err(err) => Err(SyntaxError::Internal(err.to_string())),
        }
    }
}
