//! Assigns a static type to every expression and builds the scope tree.
//!
//! Scopes are created in visiting order:
//!
//! * the root has one child per class, holding the class's own attributes
//!   followed by the inherited ones;
//! * a class scope has one child per feature, holding `self` and then the
//!   method parameters;
//! * a block opens one child scope, a `let` one nested scope per binding and
//!   a `case` one scope per branch.
//!
//! Every other expression evaluates its operands in the current scope, from
//! left to right. The type inferer replays this order exactly, and so does
//! [`verify`], which checks the program again once inference has resolved the
//! `AUTO_TYPE` declarations.

use super::{
    scope::{Scope, ScopeCursor, ScopeDrift, ScopeId, VarId},
    types::{Context, TypeId, VariableInfo},
};
use crate::{
    ast::{
        AttrDecl, BinOp, CaseBranch, ClassDecl, Expr, ExprKind, Feature, Ident, LetBinding,
        MethodDecl, Program,
    },
    diagnostics::{Diagnostic, ErrorKind, Position},
};
use lrkit::types::Map;

pub fn check(
    program: &mut Program,
    classes: &[Option<TypeId>],
    context: &Context,
    errors: &mut Vec<Diagnostic>,
) -> Scope {
    let mut scope = Scope::new();
    let class_scopes = open_class_scopes(context, &mut scope, classes);

    let mut checker = TypeChecker::new(context, errors, Scopes::Build(&mut scope));
    for ((decl, id), class_scope) in program
        .classes
        .iter_mut()
        .zip(classes)
        .filter_map(|(decl, id)| Some((decl, (*id)?)))
        .zip(class_scopes)
    {
        checker.visit_class(decl, id, class_scope);
    }

    scope
}

/// Check `program` again over the scope tree left by inference.
///
/// Declarations are read from the resolved variables and signatures, so the
/// violations hidden behind `AUTO_TYPE` during the first check are reported.
pub fn verify(
    program: &mut Program,
    classes: &[Option<TypeId>],
    context: &Context,
    scope: &Scope,
    errors: &mut Vec<Diagnostic>,
) -> Result<(), ScopeDrift> {
    let mut checker = TypeChecker::new(
        context,
        errors,
        Scopes::Replay {
            tree: scope,
            cursor: ScopeCursor::new(),
            drift: None,
        },
    );
    for (decl, id) in program
        .classes
        .iter_mut()
        .zip(classes)
        .filter_map(|(decl, id)| Some((decl, (*id)?)))
    {
        let class_scope = checker.open(ScopeId::ROOT);
        checker.visit_class(decl, id, class_scope);
        checker.close();
    }

    match checker.scopes {
        Scopes::Replay {
            drift: Some(err), ..
        } => Err(err),
        Scopes::Replay { tree, cursor, .. } => cursor.finish(tree),
        Scopes::Build(..) => Ok(()),
    }
}

/// Create the scope of every class, holding its own attributes followed by
/// the inherited ones.
fn open_class_scopes(
    context: &Context,
    scope: &mut Scope,
    classes: &[Option<TypeId>],
) -> Vec<ScopeId> {
    let mut slots: Map<TypeId, Vec<VarId>> = Map::default();
    let mut scopes = vec![];
    for id in classes.iter().flatten() {
        scopes.push((*id, scope.create_child(ScopeId::ROOT)));
        let vars = context
            .ty(*id)
            .attributes
            .iter()
            .map(|attr| scope.alloc_variable(VariableInfo::new(attr.name.clone(), attr.ty)))
            .collect();
        slots.insert(*id, vars);
    }

    for (id, class_scope) in &scopes {
        for owner in context.ancestors(*id) {
            for var in slots.get(&owner).into_iter().flatten() {
                scope.attach(*class_scope, *var);
            }
        }
    }

    scopes.into_iter().map(|(_, scope)| scope).collect()
}

enum Scopes<'a> {
    /// Create the scopes while visiting.
    Build(&'a mut Scope),
    /// Walk an existing tree in creation order.
    Replay {
        tree: &'a Scope,
        cursor: ScopeCursor,
        drift: Option<ScopeDrift>,
    },
}

struct TypeChecker<'a> {
    context: &'a Context,
    errors: &'a mut Vec<Diagnostic>,
    scopes: Scopes<'a>,
    current_type: TypeId,
    current_feature: String,
}

impl<'a> TypeChecker<'a> {
    fn new(context: &'a Context, errors: &'a mut Vec<Diagnostic>, scopes: Scopes<'a>) -> Self {
        Self {
            context,
            errors,
            scopes,
            current_type: TypeId::OBJECT,
            current_feature: String::new(),
        }
    }

    fn tree(&self) -> &Scope {
        match &self.scopes {
            Scopes::Build(tree) => tree,
            Scopes::Replay { tree, .. } => tree,
        }
    }

    /// Move into the next child scope of `parent`.
    fn open(&mut self, parent: ScopeId) -> ScopeId {
        match &mut self.scopes {
            Scopes::Build(tree) => tree.create_child(parent),
            Scopes::Replay {
                tree,
                cursor,
                drift,
            } => match cursor.enter(tree) {
                Ok(id) => id,
                Err(err) => {
                    drift.get_or_insert(err);
                    parent
                }
            },
        }
    }

    fn close(&mut self) {
        if let Scopes::Replay {
            tree,
            cursor,
            drift,
        } = &mut self.scopes
        {
            if let Err(err) = cursor.leave(tree) {
                drift.get_or_insert(err);
            }
        }
    }

    /// Declare the `index`-th local of `scope`, returning its type. A replayed
    /// tree already holds the variable, possibly with an inferred type.
    fn declare(&mut self, scope: ScopeId, index: usize, info: VariableInfo) -> TypeId {
        match &mut self.scopes {
            Scopes::Build(tree) => {
                let ty = info.ty;
                tree.define_variable(scope, info);
                ty
            }
            Scopes::Replay { tree, .. } => tree
                .locals(scope)
                .get(index)
                .map_or(info.ty, |var| tree.var(*var).ty),
        }
    }

    fn report(&mut self, pos: Position, kind: ErrorKind) {
        tracing::trace!(%pos, %kind, "semantic error");
        self.errors.push(Diagnostic::new(pos, kind));
    }

    fn expect_conform(&mut self, ty: TypeId, expected: TypeId, pos: Position) {
        if !self.context.conforms_to(ty, expected) {
            self.report(
                pos,
                ErrorKind::IncompatibleTypes {
                    from: self.context.name(ty).to_owned(),
                    to: self.context.name(expected).to_owned(),
                },
            );
        }
    }

    fn resolve_self(&self, ty: TypeId) -> TypeId {
        if ty == TypeId::SELF_TYPE {
            self.current_type
        } else {
            ty
        }
    }

    /// Resolve a type name whose errors were already reported by the builder.
    fn declared_type(&self, ty: &Ident) -> TypeId {
        let id = self.context.get_type(&ty.name).unwrap_or(TypeId::ERROR);
        self.resolve_self(id)
    }

    fn visit_class(&mut self, decl: &mut ClassDecl, id: TypeId, class_scope: ScopeId) {
        self.current_type = id;

        for feature in &mut decl.features {
            let feature_scope = self.open(class_scope);
            self.declare(feature_scope, 0, VariableInfo::new("self", id));

            match feature {
                Feature::Attribute(attr) => {
                    self.current_feature = attr.name.name.clone();
                    let declared = self.attribute_type(attr);
                    if let Some(init) = &mut attr.init {
                        let ty = self.visit(init, feature_scope);
                        self.expect_conform(ty, declared, init.pos);
                    }
                }
                Feature::Method(method) => {
                    self.current_feature = method.name.name.clone();
                    for (i, param) in method.params.iter().enumerate() {
                        let ty = match self.context.get_type(&param.ty.name) {
                            Ok(TypeId::SELF_TYPE) | Err(..) => TypeId::ERROR,
                            Ok(ty) => ty,
                        };
                        self.declare(
                            feature_scope,
                            i + 1,
                            VariableInfo::new(param.name.name.clone(), ty),
                        );
                    }
                    let ret = self.return_type(method);
                    let ty = self.visit(&mut method.body, feature_scope);
                    self.expect_conform(ty, ret, method.body.pos);
                }
            }
            self.close();
        }
    }

    /// The declared type of an attribute, as resolved in the context.
    fn attribute_type(&self, attr: &AttrDecl) -> TypeId {
        let resolved = self
            .context
            .ty(self.current_type)
            .attributes
            .iter()
            .find(|a| a.name == attr.name.name && a.pos == attr.name.pos)
            .map(|a| self.resolve_self(a.ty));
        resolved.unwrap_or_else(|| self.declared_type(&attr.ty))
    }

    /// The declared return type of a method, as resolved in the context.
    fn return_type(&self, method: &MethodDecl) -> TypeId {
        let resolved = self
            .context
            .ty(self.current_type)
            .methods
            .get(&method.name.name)
            .filter(|m| m.pos == method.name.pos)
            .map(|m| self.resolve_self(m.ret.ty));
        resolved.unwrap_or_else(|| self.declared_type(&method.ret))
    }

    fn visit(&mut self, expr: &mut Expr, scope: ScopeId) -> TypeId {
        let pos = expr.pos;
        let ty = match &mut expr.kind {
            ExprKind::Int(..) => TypeId::INT,
            ExprKind::Str(..) => TypeId::STRING,
            ExprKind::Bool(..) => TypeId::BOOL,

            ExprKind::Identifier(name) => match self.tree().find_variable(scope, name) {
                Some(var) => self.resolve_self(self.tree().var(var).ty),
                None => {
                    let kind = ErrorKind::VariableNotDefined {
                        name: name.clone(),
                        scope: self.current_feature.clone(),
                    };
                    self.report(pos, kind);
                    TypeId::ERROR
                }
            },

            ExprKind::Assign { name, value } => {
                let ty = self.visit(value, scope);
                if name.name == "self" {
                    self.report(name.pos, ErrorKind::SelfReadOnly);
                } else {
                    match self.tree().find_variable(scope, &name.name) {
                        Some(var) => {
                            let declared = self.resolve_self(self.tree().var(var).ty);
                            self.expect_conform(ty, declared, value.pos);
                        }
                        None => {
                            let kind = ErrorKind::VariableNotDefined {
                                name: name.name.clone(),
                                scope: self.current_feature.clone(),
                            };
                            self.report(name.pos, kind);
                        }
                    }
                }
                ty
            }

            ExprKind::Dispatch {
                receiver,
                cast,
                method,
                args,
            } => {
                let receiver_ty = match receiver {
                    Some(receiver) => self.visit(receiver, scope),
                    None => self.current_type,
                };
                let lookup = match cast {
                    None => receiver_ty,
                    Some(cast) => match self.context.get_type(&cast.name) {
                        Err(err) => {
                            self.report(cast.pos, err.into());
                            TypeId::ERROR
                        }
                        Ok(ty) if !ty.is_concrete() => {
                            self.report(
                                cast.pos,
                                ErrorKind::IllegalSelfType {
                                    ty: cast.name.clone(),
                                    usage: "a static dispatch type",
                                },
                            );
                            TypeId::ERROR
                        }
                        Ok(ty) => {
                            self.expect_conform(receiver_ty, ty, cast.pos);
                            ty
                        }
                    },
                };
                self.visit_call(lookup, receiver_ty, method, args, scope)
            }

            ExprKind::If { cond, then, els } => {
                let cond_ty = self.visit(cond, scope);
                self.expect_conform(cond_ty, TypeId::BOOL, cond.pos);
                let then_ty = self.visit(then, scope);
                let els_ty = self.visit(els, scope);
                self.context.union(then_ty, els_ty)
            }

            ExprKind::While { cond, body } => {
                let cond_ty = self.visit(cond, scope);
                self.expect_conform(cond_ty, TypeId::BOOL, cond.pos);
                self.visit(body, scope);
                TypeId::OBJECT
            }

            ExprKind::Block(exprs) => {
                let inner = self.open(scope);
                let mut ty = TypeId::OBJECT;
                for expr in exprs {
                    ty = self.visit(expr, inner);
                }
                self.close();
                ty
            }

            ExprKind::Let { bindings, body } => {
                let inner = self.visit_bindings(bindings, scope);
                let ty = self.visit(body, inner);
                for _ in 0..bindings.len() {
                    self.close();
                }
                ty
            }

            ExprKind::Case {
                scrutinee,
                branches,
            } => {
                self.visit(scrutinee, scope);
                self.visit_branches(branches, scope)
            }

            ExprKind::New(ty) => match self.context.get_type(&ty.name) {
                Ok(TypeId::SELF_TYPE) => self.current_type,
                Ok(TypeId::AUTO_TYPE) => {
                    self.report(
                        ty.pos,
                        ErrorKind::IllegalSelfType {
                            ty: ty.name.clone(),
                            usage: "an instantiated type",
                        },
                    );
                    TypeId::ERROR
                }
                Ok(id) => id,
                Err(err) => {
                    self.report(ty.pos, err.into());
                    TypeId::ERROR
                }
            },

            ExprKind::IsVoid(operand) => {
                self.visit(operand, scope);
                TypeId::BOOL
            }

            ExprKind::Not(operand) => {
                let ty = self.visit(operand, scope);
                self.expect_conform(ty, TypeId::BOOL, operand.pos);
                TypeId::BOOL
            }

            ExprKind::Complement(operand) => {
                let ty = self.visit(operand, scope);
                self.expect_conform(ty, TypeId::INT, operand.pos);
                TypeId::INT
            }

            ExprKind::Binary { op, lhs, rhs } => {
                let left = self.visit(lhs, scope);
                let right = self.visit(rhs, scope);
                let valid = match op {
                    BinOp::Equal => {
                        // comparing a primitive with a non-primitive is an error.
                        !left.is_concrete()
                            || !right.is_concrete()
                            || [TypeId::INT, TypeId::STRING, TypeId::BOOL]
                                .into_iter()
                                .all(|p| {
                                    self.context.conforms_to(left, p)
                                        == self.context.conforms_to(right, p)
                                })
                    }
                    _ => {
                        self.context.conforms_to(left, TypeId::INT)
                            && self.context.conforms_to(right, TypeId::INT)
                    }
                };
                if !valid {
                    let kind = ErrorKind::InvalidOperation {
                        left: self.context.name(left).to_owned(),
                        right: self.context.name(right).to_owned(),
                    };
                    self.report(pos, kind);
                }
                if op.is_arithmetic() {
                    TypeId::INT
                } else {
                    TypeId::BOOL
                }
            }
        };

        expr.static_type = Some(ty);
        ty
    }

    fn visit_call(
        &mut self,
        lookup: TypeId,
        receiver_ty: TypeId,
        method: &Ident,
        args: &mut [Expr],
        scope: ScopeId,
    ) -> TypeId {
        let signature = if lookup.is_concrete() {
            self.context
                .get_method(lookup, &method.name)
                .map(|(_, m)| (m.params.iter().map(|p| p.ty).collect::<Vec<_>>(), m.ret.ty))
        } else {
            None
        };

        let failure = match &signature {
            _ if !lookup.is_concrete() => Some(lookup),
            None => {
                let kind = ErrorKind::MethodNotDefined {
                    name: method.name.clone(),
                    class: self.context.name(lookup).to_owned(),
                };
                self.report(method.pos, kind);
                Some(TypeId::ERROR)
            }
            Some((params, _)) if params.len() != args.len() => {
                let kind = ErrorKind::ArityMismatch {
                    method: method.name.clone(),
                    class: self.context.name(lookup).to_owned(),
                    expected: params.len(),
                    found: args.len(),
                };
                self.report(method.pos, kind);
                Some(TypeId::ERROR)
            }
            Some(..) => None,
        };

        match (failure, signature) {
            (None, Some((params, ret))) => {
                for (arg, param) in args.iter_mut().zip(params) {
                    let ty = self.visit(arg, scope);
                    self.expect_conform(ty, param, arg.pos);
                }
                if ret == TypeId::SELF_TYPE {
                    receiver_ty
                } else {
                    ret
                }
            }
            (failure, _) => {
                for arg in args {
                    self.visit(arg, scope);
                }
                failure.unwrap_or(TypeId::ERROR)
            }
        }
    }

    /// Bind every variable in its own nested scope and return the innermost one.
    fn visit_bindings(&mut self, bindings: &mut [LetBinding], scope: ScopeId) -> ScopeId {
        let mut current = scope;
        for binding in bindings {
            let declared = match &binding.ty {
                None => TypeId::AUTO_TYPE,
                Some(ty) => match self.context.get_type(&ty.name) {
                    Ok(id) => self.resolve_self(id),
                    Err(err) => {
                        self.report(ty.pos, err.into());
                        TypeId::ERROR
                    }
                },
            };
            let init = match &mut binding.init {
                Some(init) => Some((self.visit(init, current), init.pos)),
                None => None,
            };
            current = self.open(current);
            let declared = self.declare(
                current,
                0,
                VariableInfo::new(binding.name.name.clone(), declared),
            );
            if let Some((ty, pos)) = init {
                self.expect_conform(ty, declared, pos);
            }
        }
        current
    }

    fn visit_branches(&mut self, branches: &mut [CaseBranch], scope: ScopeId) -> TypeId {
        let mut seen = vec![];
        let mut result: Option<TypeId> = None;
        for branch in branches {
            let ty = match self.context.get_type(&branch.ty.name) {
                Err(err) => {
                    self.report(branch.ty.pos, err.into());
                    TypeId::ERROR
                }
                Ok(ty) if !ty.is_concrete() => {
                    self.report(
                        branch.ty.pos,
                        ErrorKind::IllegalSelfType {
                            ty: branch.ty.name.clone(),
                            usage: "a case branch type",
                        },
                    );
                    TypeId::ERROR
                }
                Ok(ty) if seen.contains(&ty) => {
                    self.report(
                        branch.ty.pos,
                        ErrorKind::DuplicateCaseBranch(branch.ty.name.clone()),
                    );
                    ty
                }
                Ok(ty) => {
                    seen.push(ty);
                    ty
                }
            };

            let inner = self.open(scope);
            self.declare(inner, 0, VariableInfo::new(branch.name.name.clone(), ty));
            let body_ty = self.visit(&mut branch.body, inner);
            self.close();
            result = Some(match result {
                Some(acc) => self.context.union(acc, body_ty),
                None => body_ty,
            });
        }
        result.unwrap_or(TypeId::ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grammar::CoolParser,
        lexer::tokenize,
        semantic::{builder::build, collector::collect},
    };

    struct Checked {
        program: Program,
        context: Context,
        scope: Scope,
        errors: Vec<Diagnostic>,
    }

    fn check_source(source: &str) -> Checked {
        let tokens = tokenize(source);
        let mut program = CoolParser::shared().unwrap().parse(&tokens.tokens).unwrap();
        let mut context = Context::new();
        let mut errors = vec![];
        let classes = collect(&program, &mut context, &mut errors);
        build(&program, &classes, &mut context, &mut errors);
        let scope = check(&mut program, &classes, &context, &mut errors);
        Checked {
            program,
            context,
            scope,
            errors,
        }
    }

    fn method_body(checked: &Checked, class: usize, feature: usize) -> &Expr {
        match &checked.program.classes[class].features[feature] {
            Feature::Method(method) => &method.body,
            Feature::Attribute(attr) => attr.init.as_ref().unwrap(),
        }
    }

    fn kinds(errors: &[Diagnostic]) -> Vec<&ErrorKind> {
        errors.iter().map(|e| &e.kind).collect()
    }

    #[test]
    fn well_typed_program() {
        let checked = check_source(
            r#"class Main inherits IO {
                count: Int <- 0;
                main(): Object {{
                    while count < 10 loop count <- count + 1 pool;
                    if count = 10 then out_string("done") else out_int(count) fi;
                    let s: String <- "abc" in s.concat(s).length();
                    case self of io: IO => io; o: Object => o; esac;
                }};
            };"#,
        );
        assert!(checked.errors.is_empty(), "{:?}", checked.errors);
        let body = method_body(&checked, 0, 1);
        assert_eq!(body.static_type, Some(TypeId::OBJECT));
        let ExprKind::Block(exprs) = &body.kind else {
            panic!("expected a block");
        };
        let main = checked.context.get_type("Main").unwrap();
        let types: Vec<_> = exprs.iter().map(|e| e.static_type).collect();
        assert_eq!(
            types,
            [
                Some(TypeId::OBJECT),
                Some(main),
                Some(TypeId::INT),
                Some(TypeId::OBJECT),
            ]
        );
    }

    #[test]
    fn reports_conversions_and_operators() {
        let checked = check_source(
            r#"class Main {
                main(): Int { 1 + "a" };
                f(): Bool { if 1 then true else false fi };
                g(): Bool { 1 = "a" };
                h(): Bool { 1 = 2 };
            };"#,
        );
        assert_eq!(
            kinds(&checked.errors),
            [
                &ErrorKind::InvalidOperation {
                    left: "Int".into(),
                    right: "String".into()
                },
                &ErrorKind::IncompatibleTypes {
                    from: "Int".into(),
                    to: "Bool".into()
                },
                &ErrorKind::InvalidOperation {
                    left: "Int".into(),
                    right: "String".into()
                },
            ]
        );
        assert_eq!(checked.errors[0].pos, Position::new(2, 31));
    }

    #[test]
    fn self_is_read_only() {
        let checked = check_source(
            "class A { };\nclass Main { main(): Object { self <- new A }; };",
        );
        assert_eq!(kinds(&checked.errors), [&ErrorKind::SelfReadOnly]);
        assert_eq!(checked.errors[0].pos, Position::new(2, 31));
    }

    #[test]
    fn undefined_names() {
        let checked = check_source(
            "class Main { main(): Object { { x; y <- 1; self.nope(); new Nope; } }; };",
        );
        assert_eq!(
            kinds(&checked.errors),
            [
                &ErrorKind::VariableNotDefined {
                    name: "x".into(),
                    scope: "main".into()
                },
                &ErrorKind::VariableNotDefined {
                    name: "y".into(),
                    scope: "main".into()
                },
                &ErrorKind::MethodNotDefined {
                    name: "nope".into(),
                    class: "Main".into()
                },
                &ErrorKind::TypeNotFound("Nope".into()),
            ]
        );
    }

    #[test]
    fn arity_mismatch_types_call_as_error() {
        let checked = check_source(
            "class Main { f(a: Int): Int { a }; main(): Object { f(1, 2) }; };",
        );
        assert_eq!(
            kinds(&checked.errors),
            [&ErrorKind::ArityMismatch {
                method: "f".into(),
                class: "Main".into(),
                expected: 1,
                found: 2
            }]
        );
        assert_eq!(method_body(&checked, 0, 1).static_type, Some(TypeId::ERROR));
    }

    #[test]
    fn static_dispatch() {
        let checked = check_source(
            "class A { f(): SELF_TYPE { self }; };
            class B inherits A { };
            class Main { main(): Object { { (new B)@A.f(); (new A)@B.f(); } }; };",
        );
        assert_eq!(
            kinds(&checked.errors),
            [&ErrorKind::IncompatibleTypes {
                from: "A".into(),
                to: "B".into()
            }]
        );
        let ExprKind::Block(exprs) = &method_body(&checked, 2, 0).kind else {
            panic!("expected a block");
        };
        // a SELF_TYPE result takes the type of the receiver.
        let b = checked.context.get_type("B").unwrap();
        assert_eq!(exprs[0].static_type, Some(b));
    }

    #[test]
    fn case_branches() {
        let checked = check_source(
            "class Main { main(): Object { case 1 of a: Int => a; b: Int => b; c: SELF_TYPE => c; esac }; };",
        );
        assert_eq!(
            kinds(&checked.errors),
            [
                &ErrorKind::DuplicateCaseBranch("Int".into()),
                &ErrorKind::IllegalSelfType {
                    ty: "SELF_TYPE".into(),
                    usage: "a case branch type"
                },
            ]
        );
    }

    #[test]
    fn scope_layout() {
        let checked = check_source(
            "class A { a: Int; };
            class Main inherits A {
                b: Int <- a;
                main(): Object { let x: Int <- 1, y: Int <- x in { x + y; } };
            };",
        );
        assert!(checked.errors.is_empty(), "{:?}", checked.errors);
        let scope = &checked.scope;
        let classes = scope.children(ScopeId::ROOT);
        assert_eq!(classes.len(), 2);

        // own attributes come before the inherited ones.
        let names = |id: ScopeId| -> Vec<String> {
            scope
                .locals(id)
                .iter()
                .map(|v| scope.var(*v).name.clone())
                .collect()
        };
        assert_eq!(names(classes[1]), ["b", "a"]);
        assert_eq!(scope.locals(classes[0])[0], scope.locals(classes[1])[1]);

        let features = scope.children(classes[1]);
        assert_eq!(features.len(), 2);
        assert_eq!(names(features[1]), ["self"]);

        // let x -> let y -> block
        let x = scope.children(features[1])[0];
        let y = scope.children(x)[0];
        let block = scope.children(y)[0];
        assert_eq!((names(x), names(y)), (vec!["x".to_owned()], vec!["y".to_owned()]));
        assert!(scope.children(block).is_empty());
    }

    #[test]
    fn verify_replays_the_tree() {
        let source = r#"class Main {
            main(): Object { let x: Int <- "s" in { case x of y: Int => y; esac; } };
        };"#;
        let tokens = tokenize(source);
        let mut program = CoolParser::shared().unwrap().parse(&tokens.tokens).unwrap();
        let mut context = Context::new();
        let mut errors = vec![];
        let classes = collect(&program, &mut context, &mut errors);
        build(&program, &classes, &mut context, &mut errors);
        let scope = check(&mut program, &classes, &context, &mut errors);
        assert_eq!(errors.len(), 1);

        let mut replayed = vec![];
        verify(&mut program, &classes, &context, &scope, &mut replayed).unwrap();
        assert_eq!(replayed, errors);

        let err = verify(&mut program, &classes, &context, &Scope::new(), &mut vec![]);
        assert_eq!(
            err,
            Err(ScopeDrift::MissingChild {
                parent: ScopeId::ROOT
            })
        );
    }
}
