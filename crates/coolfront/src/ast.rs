//! Syntax tree of COOL programs.

pub use crate::diagnostics::Position;
use crate::semantic::types::TypeId;

/// An identifier or a type name, together with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub classes: Vec<ClassDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Ident,
    pub parent: Option<Ident>,
    pub features: Vec<Feature>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Attribute(AttrDecl),
    Method(MethodDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrDecl {
    pub name: Ident,
    pub ty: Ident,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: Ident,
    pub params: Vec<Param>,
    pub ret: Ident,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: Ident,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Position,
    /// Filled in by the type checker and refined by inference.
    pub static_type: Option<TypeId>,
}

impl Expr {
    pub fn new(kind: ExprKind, pos: Position) -> Self {
        Self {
            kind,
            pos,
            static_type: None,
        }
    }
}

/// `id [: TYPE] [<- expr]` in a `let` expression.
///
/// An omitted type annotation is inferred.
#[derive(Debug, Clone, PartialEq)]
pub struct LetBinding {
    pub name: Ident,
    pub ty: Option<Ident>,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseBranch {
    pub name: Ident,
    pub ty: Ident,
    pub body: Expr,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Less,
    LessEqual,
    Equal,
}

impl BinOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Assign {
        name: Ident,
        value: Box<Expr>,
    },
    /// `method(args)`, `receiver.method(args)` or `receiver@Cast.method(args)`.
    Dispatch {
        receiver: Option<Box<Expr>>,
        cast: Option<Ident>,
        method: Ident,
        args: Vec<Expr>,
    },
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        els: Box<Expr>,
    },
    While {
        cond: Box<Expr>,
        body: Box<Expr>,
    },
    Block(Vec<Expr>),
    Let {
        bindings: Vec<LetBinding>,
        body: Box<Expr>,
    },
    Case {
        scrutinee: Box<Expr>,
        branches: Vec<CaseBranch>,
    },
    New(Ident),
    IsVoid(Box<Expr>),
    Not(Box<Expr>),
    Complement(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Identifier(String),
    Int(i64),
    Str(String),
    Bool(bool),
}
